//! Orchestration of cross-origin requests: classification, preflight,
//! resource-sharing checks on responses, and redirect authorization.
//!
//! The manager never owns a request. Callers hand it a [`SharedRequest`] and
//! keep it alive; the manager's registries only hold weak references, keyed
//! by [`RequestId`]. Entries whose request was dropped are pruned when a new
//! request arrives, when a registry is searched and when the preflight cache
//! is invalidated; a pruned preflight has its loader cancelled.
//!
//! Two registries exist because the network layer may start following a
//! redirect before the security layer hears about it. `check_redirect`
//! correlates such an early notification with the right in-flight request:
//! first through the requests activated by `handle_request`, then through
//! the hops the network layer already followed. An allowed redirect moves
//! the request's entries to the URL it now loads.

use crate::constants::{WILDCARD, header};
use crate::header_list::{is_single_value, parse_max_age, parse_token_list, split_list};
use crate::options::{ManagerOptions, ValidationError};
use crate::origin::to_origin_string;
use crate::preflight_cache::{CachedValue, PreflightCache};
use crate::request::{CrossOriginRequest, RequestId, RequestStatus, SharedRequest};
use crate::result::{AccessDecision, CheckOutcome, CorsError, FailureReason};
#[cfg(feature = "strict-failure")]
use crate::services::CookieStore;
use crate::services::{
    FailureLogger, HeaderAccessor, PreflightLoader, PreflightRequest, TracingLogger,
};
use crate::util::{equals_ignore_case, is_simple_method};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Instant;
use url::Url;

/// Single-shot continuation for [`CrossOriginManager::handle_request`].
pub type CheckCallback = Box<dyn FnOnce(CheckOutcome)>;

/// Handle for abandoning a preflight that is still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CancelToken(RequestId);

impl CancelToken {
    pub fn request_id(&self) -> RequestId {
        self.0
    }
}

/// How `handle_request` left things.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDisposition {
    /// The callback has already run.
    Completed,
    /// A preflight is in flight; the callback runs from
    /// [`CrossOriginManager::handle_preflight_response`].
    Pending(CancelToken),
}

/// Answer to the network layer's `check_redirect` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectCheck {
    /// An in-flight cross-origin request owns the redirected URL.
    pub matched: bool,
    pub allowed: bool,
}

struct RegistryEntry {
    url: Url,
    request: Weak<RefCell<CrossOriginRequest>>,
}

struct PendingPreflight {
    request: Weak<RefCell<CrossOriginRequest>>,
    target_url: Url,
    callback: CheckCallback,
}

pub struct CrossOriginManager {
    options: ManagerOptions,
    cache: PreflightCache,
    loader: Box<dyn PreflightLoader>,
    logger: Box<dyn FailureLogger>,
    #[cfg(feature = "strict-failure")]
    cookies: Option<Box<dyn CookieStore>>,
    active_requests: IndexMap<RequestId, RegistryEntry>,
    network_redirects: IndexMap<RequestId, RegistryEntry>,
    pending_preflights: IndexMap<RequestId, PendingPreflight>,
}

impl CrossOriginManager {
    pub fn new(
        options: ManagerOptions,
        loader: impl PreflightLoader + 'static,
    ) -> Result<Self, ValidationError> {
        options.validate()?;
        Ok(Self {
            cache: PreflightCache::from_options(&options),
            options,
            loader: Box::new(loader),
            logger: Box::new(TracingLogger),
            #[cfg(feature = "strict-failure")]
            cookies: None,
            active_requests: IndexMap::new(),
            network_redirects: IndexMap::new(),
            pending_preflights: IndexMap::new(),
        })
    }

    pub fn with_logger(mut self, logger: impl FailureLogger + 'static) -> Self {
        self.logger = Box::new(logger);
        self
    }

    #[cfg(feature = "strict-failure")]
    pub fn with_cookie_store(mut self, cookies: impl CookieStore + 'static) -> Self {
        self.cookies = Some(Box::new(cookies));
        self
    }

    pub fn options(&self) -> &ManagerOptions {
        &self.options
    }

    pub fn preflight_cache(&self) -> &PreflightCache {
        &self.cache
    }

    /// Starts the security check for a request in `Initial` state.
    ///
    /// Simple requests and requests fully covered by cached grants are
    /// activated at once and `callback` runs before this returns. Otherwise
    /// a preflight is started and `callback` runs later, from
    /// [`Self::handle_preflight_response`]. A request that is waiting on a
    /// redirect decision gets that decision instead.
    ///
    /// When this returns `Err`, `callback` has been dropped without running.
    pub fn handle_request(
        &mut self,
        request: &SharedRequest,
        origin_url: &Url,
        target_url: &Url,
        callback: CheckCallback,
    ) -> Result<RequestDisposition, CorsError> {
        self.prune_dropped();
        let mut req = request.borrow_mut();

        if req.in_redirect {
            req.in_redirect = false;
            let allowed = req.allows_redirect();
            tracing::debug!(request = %req.id(), allowed, "resuming after redirect check");
            drop(req);
            callback(CheckOutcome::Success { allowed });
            return Ok(RequestDisposition::Completed);
        }

        if req.status() != RequestStatus::Initial {
            return Err(CorsError::InvalidState {
                expected: RequestStatus::Initial,
                actual: req.status(),
            });
        }

        tracing::debug!(
            request = %req.id(),
            origin = %origin_url,
            target = %target_url,
            method = req.method(),
            simple = req.is_simple(),
            "cross-origin request"
        );

        if !self.requires_preflight(&req) {
            self.activate(request, &mut req, target_url);
            drop(req);
            callback(CheckOutcome::Success { allowed: true });
            return Ok(RequestDisposition::Completed);
        }

        let preflight = Self::preflight_request(&req);
        req.set_status(RequestStatus::PreflightActive);
        if let Err(err) = self.loader.start(&preflight) {
            tracing::warn!(request = %req.id(), error = %err, "preflight loader failed to start");
            req.set_status(RequestStatus::ErrorNetwork);
            return Err(CorsError::LoaderStart(err.to_string()));
        }

        let id = req.id();
        self.pending_preflights.insert(
            id,
            PendingPreflight {
                request: Rc::downgrade(request),
                target_url: target_url.clone(),
                callback,
            },
        );
        Ok(RequestDisposition::Pending(CancelToken(id)))
    }

    /// `true` when the request needs an `OPTIONS` round-trip before it may
    /// be sent: forced by the caller, or a non-simple method or header that
    /// no live cache entry covers.
    pub fn requires_preflight(&self, request: &CrossOriginRequest) -> bool {
        if request.requires_preflight() {
            return true;
        }

        let method = request.method();
        if !is_simple_method(method) && !self.cache.method_match(request, method) {
            return true;
        }

        request
            .non_simple_headers()
            .any(|name| !self.cache.header_match(request, name))
    }

    /// Describes the preflight for `request`. Header names are lowercased
    /// and sorted so that equal requests produce equal preflights.
    pub fn preflight_request(request: &CrossOriginRequest) -> PreflightRequest {
        let mut names: Vec<&str> = request.non_simple_headers().collect();
        names.sort_unstable();

        PreflightRequest {
            id: request.id(),
            url: request.url().clone(),
            origin: request.origin().to_string(),
            request_method: request.method().to_string(),
            request_headers: (!names.is_empty()).then(|| names.join(",")),
        }
    }

    /// The resource-sharing check applied to any cross-origin response.
    /// Depends on nothing but the request and the response headers.
    pub fn resource_sharing_check(
        request: &CrossOriginRequest,
        response_url: &Url,
        headers: &dyn HeaderAccessor,
    ) -> Result<(), FailureReason> {
        let allow_origin = headers
            .header_value(response_url, header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .ok_or(FailureReason::MissingAllowOrigin)?;

        let mut values = split_list(&allow_origin);
        let value = values.next().ok_or(FailureReason::MissingAllowOrigin)?;
        if values.next().is_some() {
            return Err(FailureReason::MultipleAllowOrigin);
        }

        if !request.with_credentials() && value == WILDCARD {
            return Ok(());
        }

        if value != request.origin() {
            return Err(FailureReason::NoMatchAllowOrigin);
        }

        if request.with_credentials() {
            let credentials_allowed = headers
                .header_value(response_url, header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
                .is_some_and(|value| {
                    is_single_value(&value) && value.trim().eq_ignore_ascii_case("true")
                });
            if !credentials_allowed {
                return Err(FailureReason::InvalidAllowCredentials);
            }
        }

        Ok(())
    }

    /// Consumes the response to a preflight started by `handle_request`.
    ///
    /// On success the grants are cached, the request moves through
    /// `PreflightComplete` to `Active`, and the pending callback is told it
    /// may proceed. On denial the request's cached grants are purged, it
    /// becomes `ErrorNetwork`, and the callback is told it may not.
    pub fn handle_preflight_response(
        &mut self,
        request: &SharedRequest,
        headers: &dyn HeaderAccessor,
    ) -> Result<AccessDecision, CorsError> {
        let mut req = request.borrow_mut();
        if req.status() != RequestStatus::PreflightActive {
            return Err(CorsError::InvalidState {
                expected: RequestStatus::PreflightActive,
                actual: req.status(),
            });
        }

        let id = req.id();
        let pending = self.pending_preflights.shift_remove(&id);
        let evaluated = self.evaluate_preflight(&mut req, headers);

        let outcome = match &evaluated {
            Ok(AccessDecision::Allowed) => {
                req.set_status(RequestStatus::PreflightComplete);
                let target = pending
                    .as_ref()
                    .map_or_else(|| req.url().clone(), |pending| pending.target_url.clone());
                self.activate(request, &mut req, &target);
                CheckOutcome::Success { allowed: true }
            }
            Ok(AccessDecision::Denied(_)) => CheckOutcome::Success { allowed: false },
            Err(err) => {
                req.set_status(RequestStatus::ErrorNetwork);
                CheckOutcome::Failure(err.clone())
            }
        };
        drop(req);

        if let Some(pending) = pending {
            (pending.callback)(outcome);
        }
        evaluated
    }

    fn evaluate_preflight(
        &mut self,
        req: &mut CrossOriginRequest,
        headers: &dyn HeaderAccessor,
    ) -> Result<AccessDecision, CorsError> {
        let url = req.url().clone();

        if let Err(reason) = Self::resource_sharing_check(req, &url, headers) {
            return Ok(self.deny(req, "preflight", &url, reason, true));
        }

        let allow_methods = headers
            .header_value(&url, header::ACCESS_CONTROL_ALLOW_METHODS)
            .unwrap_or_default();
        let Some(methods) = parse_token_list(&allow_methods) else {
            tracing::debug!(value = %allow_methods, "malformed Access-Control-Allow-Methods");
            return Ok(self.deny(req, "preflight", &url, FailureReason::MethodNotAllowed, true));
        };
        if !is_simple_method(req.method()) && !methods.contains(&req.method()) {
            return Ok(self.deny(req, "preflight", &url, FailureReason::MethodNotAllowed, true));
        }

        let allow_headers = headers
            .header_value(&url, header::ACCESS_CONTROL_ALLOW_HEADERS)
            .unwrap_or_default();
        let Some(header_names) = parse_token_list(&allow_headers) else {
            tracing::debug!(value = %allow_headers, "malformed Access-Control-Allow-Headers");
            return Ok(self.deny(req, "preflight", &url, FailureReason::HeaderNotAllowed, true));
        };
        let headers_covered = req.non_simple_headers().all(|name| {
            header_names
                .iter()
                .any(|allowed| equals_ignore_case(allowed, name))
        });
        if !headers_covered {
            return Ok(self.deny(req, "preflight", &url, FailureReason::HeaderNotAllowed, true));
        }

        if self.cache.allow_updates(req) {
            let requested = headers
                .header_value(&url, header::ACCESS_CONTROL_MAX_AGE)
                .and_then(|value| parse_max_age(&value));
            let max_age = self.cache.max_age_for(requested);
            let grants: Vec<CachedValue> = methods
                .iter()
                .map(|method| CachedValue::method(method))
                .chain(header_names.iter().map(|name| CachedValue::header(name)))
                .collect();
            self.cache.update_at(grants, req, max_age, Instant::now())?;
        }

        tracing::debug!(request = %req.id(), url = %url, "preflight granted");
        Ok(AccessDecision::Allowed)
    }

    /// Final check on the actual response. The request leaves the
    /// registries whatever the outcome.
    ///
    /// A failed check only denies access when the response's own origin
    /// differs from the request origin; a same-origin response that fails
    /// the check is let through with nothing but the simple response
    /// headers exposed.
    pub fn verify_cross_origin_access(
        &mut self,
        request: &SharedRequest,
        response_url: &Url,
        headers: &dyn HeaderAccessor,
    ) -> Result<AccessDecision, CorsError> {
        let mut req = request.borrow_mut();
        if req.status() != RequestStatus::Active {
            return Err(CorsError::InvalidState {
                expected: RequestStatus::Active,
                actual: req.status(),
            });
        }
        self.deregister(req.id());

        if let Err(reason) = Self::resource_sharing_check(&req, response_url, headers) {
            if to_origin_string(response_url) != req.origin() {
                return Ok(self.deny(&mut req, "response", response_url, reason, true));
            }
            tracing::debug!(
                request = %req.id(),
                %reason,
                "sharing check failed on a same-origin response, allowing"
            );
            req.set_status(RequestStatus::Successful);
            return Ok(AccessDecision::Allowed);
        }

        if let Some(expose) =
            headers.header_value(response_url, header::ACCESS_CONTROL_EXPOSE_HEADERS)
        {
            match parse_token_list(&expose) {
                Some(names) => {
                    for name in names {
                        if headers.header_value(response_url, name).is_some() {
                            req.add_exposed_header(name);
                        }
                    }
                }
                None => tracing::debug!(
                    value = %expose,
                    "malformed Access-Control-Expose-Headers, exposing nothing"
                ),
            }
        }

        req.set_status(RequestStatus::Successful);
        Ok(AccessDecision::Allowed)
    }

    /// Decides whether `request` may follow a redirect to `moved_to`.
    /// `headers` belong to the redirect response itself.
    ///
    /// The decision is remembered on the request, so that a later
    /// `handle_request` for it reports the same answer.
    pub fn handle_redirect(
        &mut self,
        request: &SharedRequest,
        moved_to: &Url,
        headers: &dyn HeaderAccessor,
    ) -> Result<AccessDecision, CorsError> {
        let mut req = request.borrow_mut();
        if req.status().is_terminal() {
            return Err(CorsError::InvalidState {
                expected: RequestStatus::Active,
                actual: req.status(),
            });
        }

        let decision = self.evaluate_redirect(&mut req, moved_to, headers);
        req.in_redirect = true;
        req.allow_redirect = decision.is_allowed();
        if decision.is_allowed() {
            self.track_redirect(request, req.id(), moved_to);
        }
        Ok(decision)
    }

    fn evaluate_redirect(
        &mut self,
        req: &mut CrossOriginRequest,
        moved_to: &Url,
        headers: &dyn HeaderAccessor,
    ) -> AccessDecision {
        if moved_to.scheme() != req.url().scheme() {
            return self.deny(req, "redirect", moved_to, FailureReason::UnsupportedScheme, false);
        }

        if req.redirects().len() >= self.options.max_redirects || !req.check_redirect(moved_to) {
            return self.deny(req, "redirect", moved_to, FailureReason::RedirectLoop, false);
        }

        if !moved_to.username().is_empty() || moved_to.password().is_some() {
            return self.deny(req, "redirect", moved_to, FailureReason::UserinfoRedirect, false);
        }

        let current = req.url().clone();
        if let Err(reason) = Self::resource_sharing_check(req, &current, headers) {
            return self.deny(req, "redirect", &current, reason, false);
        }

        req.add_redirect(moved_to);
        req.mark_redirect_verification();
        req.prepare_request_url(Some(moved_to));
        tracing::debug!(request = %req.id(), from = %current, to = %moved_to, "redirect allowed");
        AccessDecision::Allowed
    }

    /// Called by the network layer before it follows a redirect from `url`
    /// on its own. Unmatched URLs are not cross-origin requests and are
    /// left to the caller.
    pub fn check_redirect(
        &mut self,
        url: &Url,
        moved_to: &Url,
        headers: &dyn HeaderAccessor,
    ) -> Result<RedirectCheck, CorsError> {
        let Some(request) = self.find_registered(url) else {
            return Ok(RedirectCheck {
                matched: false,
                allowed: false,
            });
        };

        let decision = self.handle_redirect(&request, moved_to, headers)?;
        Ok(RedirectCheck {
            matched: true,
            allowed: decision.is_allowed(),
        })
    }

    /// Abandons an in-flight preflight. The loader is detached, the
    /// callback is dropped unrun, and the request ends `ErrorAborted`.
    pub fn cancel(&mut self, token: CancelToken) -> Result<(), CorsError> {
        let id = token.request_id();
        let pending = self
            .pending_preflights
            .shift_remove(&id)
            .ok_or(CorsError::UnknownPreflight(id))?;

        self.loader.cancel(id);
        self.deregister(id);
        if let Some(request) = pending.request.upgrade() {
            let mut req = request.borrow_mut();
            if !req.status().is_terminal() {
                req.set_status(RequestStatus::ErrorAborted);
            }
        }
        tracing::debug!(request = %id, "preflight cancelled");
        Ok(())
    }

    pub fn invalidate_preflight_cache(&mut self, expire_all: bool) {
        self.prune_dropped();
        self.cache.invalidate(expire_all);
    }

    pub fn is_registered(&self, id: RequestId) -> bool {
        self.active_requests.contains_key(&id) || self.network_redirects.contains_key(&id)
    }

    pub fn has_pending_preflight(&self, id: RequestId) -> bool {
        self.pending_preflights.contains_key(&id)
    }

    fn activate(&mut self, shared: &SharedRequest, req: &mut CrossOriginRequest, target_url: &Url) {
        req.set_status(RequestStatus::Active);
        self.active_requests.insert(
            req.id(),
            RegistryEntry {
                url: req.url().clone(),
                request: Rc::downgrade(shared),
            },
        );
        req.prepare_request_url(Some(target_url));
    }

    fn deregister(&mut self, id: RequestId) {
        self.active_requests.shift_remove(&id);
        self.network_redirects.shift_remove(&id);
    }

    /// Points the request's registry entries at the URL it now loads, so
    /// the next hop reported by the network layer is matched.
    fn track_redirect(&mut self, shared: &SharedRequest, id: RequestId, moved_to: &Url) {
        if let Some(entry) = self.active_requests.get_mut(&id) {
            entry.url = moved_to.clone();
        }
        self.network_redirects.insert(
            id,
            RegistryEntry {
                url: moved_to.clone(),
                request: Rc::downgrade(shared),
            },
        );
    }

    fn find_registered(&mut self, url: &Url) -> Option<SharedRequest> {
        self.prune_dropped();

        self.active_requests
            .values()
            .chain(self.network_redirects.values().rev())
            .find(|entry| entry.url.as_str() == url.as_str())
            .and_then(|entry| entry.request.upgrade())
    }

    /// Forgets requests their owners dropped. A dropped request with a
    /// preflight in flight has its loader detached and its callback
    /// discarded.
    fn prune_dropped(&mut self) {
        self.active_requests
            .retain(|_, entry| entry.request.strong_count() > 0);
        self.network_redirects
            .retain(|_, entry| entry.request.strong_count() > 0);

        let orphaned: Vec<RequestId> = self
            .pending_preflights
            .iter()
            .filter(|(_, pending)| pending.request.strong_count() == 0)
            .map(|(id, _)| *id)
            .collect();
        for id in orphaned {
            self.pending_preflights.shift_remove(&id);
            self.loader.cancel(id);
            tracing::debug!(request = %id, "preflight dropped with its request");
        }
    }

    fn deny(
        &mut self,
        req: &mut CrossOriginRequest,
        context: &str,
        url: &Url,
        reason: FailureReason,
        purge_cache: bool,
    ) -> AccessDecision {
        if purge_cache {
            self.cache.remove_origin_requests(req.origin(), req.url());
        }
        if !req.status().is_terminal() {
            req.set_status(RequestStatus::ErrorNetwork);
        }
        self.deregister(req.id());
        self.logger.log_failure(context, url, reason);
        self.forget_cookies(req.url());

        AccessDecision::Denied(reason)
    }

    #[cfg(feature = "strict-failure")]
    fn forget_cookies(&mut self, url: &Url) {
        if let Some(cookies) = self.cookies.as_mut() {
            cookies.remove_cookies_by_url(url);
        }
    }

    #[cfg(not(feature = "strict-failure"))]
    fn forget_cookies(&mut self, _url: &Url) {}
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod manager_test;
