use crate::constants::header;
use crate::origin::request_origin;
use crate::util::{
    is_forbidden_request_header, is_simple_method, is_simple_request_header,
    is_simple_response_header, normalize_lower,
};
use indexmap::{IndexMap, IndexSet};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use url::{Position, Url};

/// A request shared between its owner and the manager's registries.
/// The registries only keep weak references.
pub type SharedRequest = Rc<RefCell<CrossOriginRequest>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a cross-origin request. Declaration order is the only
/// direction a request may move in:
///
/// `Initial -> Active`, or `Initial -> PreflightActive -> PreflightComplete -> Active`,
/// then one of the terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RequestStatus {
    Initial,
    PreflightActive,
    PreflightComplete,
    Active,
    Successful,
    ErrorAborted,
    ErrorNetwork,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestStatus::Successful | RequestStatus::ErrorAborted | RequestStatus::ErrorNetwork
        )
    }
}

/// How the network layer should treat a redirect of this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedirectMode {
    /// Every hop must pass a cross-origin check before it is followed.
    Verify,
    /// Same-origin request may be redirected cross-origin, with credentials.
    AllowSimpleCrossOrigin,
    /// Same-origin request may be redirected cross-origin, anonymously.
    AllowSimpleCrossOriginAnon,
    /// Same-origin request may not leave its origin through a redirect.
    DenySimpleCrossOrigin,
}

impl RedirectMode {
    pub fn for_request(is_simple: bool, is_anonymous: bool) -> Self {
        match (is_simple, is_anonymous) {
            (true, true) => RedirectMode::AllowSimpleCrossOriginAnon,
            (true, false) => RedirectMode::AllowSimpleCrossOrigin,
            (false, _) => RedirectMode::DenySimpleCrossOrigin,
        }
    }
}

/// What the network layer needs to send the actual request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    pub url: Url,
    pub origin_header: String,
    pub redirect_mode: RedirectMode,
}

/// One cross-origin attempt, from classification to its final verdict.
#[derive(Debug)]
pub struct CrossOriginRequest {
    id: RequestId,
    origin: String,
    method: String,
    origin_url: Url,
    request_url: Url,
    url: Url,
    headers: IndexMap<String, String>,
    non_simple_headers: IndexSet<String>,
    with_credentials: bool,
    is_anonymous: bool,
    requires_preflight: bool,
    has_non_simple_content_type: bool,
    redirects: Vec<Url>,
    exposed_headers: IndexSet<String>,
    status: RequestStatus,
    redirect_mode: RedirectMode,
    prepared: Option<PreparedRequest>,
    pub(crate) allow_redirect: bool,
    pub(crate) in_redirect: bool,
}

impl CrossOriginRequest {
    pub fn make(
        origin_url: &Url,
        request_url: &Url,
        method: &str,
        with_credentials: bool,
        is_anonymous: bool,
    ) -> Self {
        let origin = request_origin(origin_url, is_anonymous);
        let method = method.trim().to_string();
        let redirect_mode = RedirectMode::for_request(is_simple_method(&method), is_anonymous);

        tracing::trace!(%origin, url = %request_url, %method, "cross-origin request created");

        Self {
            id: RequestId::next(),
            origin,
            method,
            origin_url: origin_url.clone(),
            request_url: request_url.clone(),
            url: request_url.clone(),
            headers: IndexMap::new(),
            non_simple_headers: IndexSet::new(),
            with_credentials,
            is_anonymous,
            requires_preflight: false,
            has_non_simple_content_type: false,
            redirects: Vec::new(),
            exposed_headers: IndexSet::new(),
            status: RequestStatus::Initial,
            redirect_mode,
            prepared: None,
            allow_redirect: false,
            in_redirect: false,
        }
    }

    pub fn into_shared(self) -> SharedRequest {
        Rc::new(RefCell::new(self))
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    /// `scheme://host[:port]` of the requesting context, or `"null"`.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn origin_url(&self) -> &Url {
        &self.origin_url
    }

    /// Target as first requested, before any redirect.
    pub fn request_url(&self) -> &Url {
        &self.request_url
    }

    /// Current target; follows redirects.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn with_credentials(&self) -> bool {
        self.with_credentials
    }

    pub fn is_anonymous(&self) -> bool {
        self.is_anonymous
    }

    pub fn set_method(&mut self, method: &str) {
        self.method = method.trim().to_string();
        self.refresh_redirect_mode();
    }

    /// Records a request header and reclassifies the request.
    ///
    /// Forbidden headers are dropped and reported with `false`; they never
    /// reach the network and never influence classification.
    pub fn add_header(&mut self, name: &str, value: &str) -> bool {
        let name = name.trim();
        if is_forbidden_request_header(name) {
            tracing::debug!(request = %self.id, header = name, "ignoring forbidden request header");
            return false;
        }

        let key = normalize_lower(name);
        if !is_simple_request_header(name, value) {
            if name.eq_ignore_ascii_case(header::CONTENT_TYPE) {
                self.has_non_simple_content_type = true;
            }
            self.non_simple_headers.insert(key.clone());
        }
        self.headers.entry(key).or_insert_with(|| name.to_string());
        self.refresh_redirect_mode();
        true
    }

    /// Header names as first added.
    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.headers.values().map(String::as_str)
    }

    /// Lowercased names of headers that keep the request from being simple.
    pub fn non_simple_headers(&self) -> impl Iterator<Item = &str> {
        self.non_simple_headers.iter().map(String::as_str)
    }

    pub fn has_non_simple_content_type(&self) -> bool {
        self.has_non_simple_content_type
    }

    /// Simple method and only simple headers.
    pub fn is_simple(&self) -> bool {
        is_simple_method(&self.method) && self.non_simple_headers.is_empty()
    }

    /// Forces a preflight even for a simple request.
    pub fn set_preflight_required(&mut self) {
        self.requires_preflight = true;
    }

    pub fn requires_preflight(&self) -> bool {
        self.requires_preflight
    }

    /// `true` when following `url` would not revisit any URL of the chain,
    /// the initial target included. Fragments are ignored.
    pub fn check_redirect(&self, url: &Url) -> bool {
        let candidate = &url[..Position::AfterQuery];
        std::iter::once(&self.request_url)
            .chain(self.redirects.iter())
            .all(|visited| &visited[..Position::AfterQuery] != candidate)
    }

    /// Appends `url` to the redirect chain and retargets the request.
    pub fn add_redirect(&mut self, url: &Url) -> bool {
        if !self.check_redirect(url) {
            return false;
        }
        self.redirects.push(url.clone());
        self.url = url.clone();
        true
    }

    pub fn redirects(&self) -> &[Url] {
        &self.redirects
    }

    pub fn redirect_mode(&self) -> RedirectMode {
        self.redirect_mode
    }

    pub(crate) fn mark_redirect_verification(&mut self) {
        self.redirect_mode = RedirectMode::Verify;
    }

    fn refresh_redirect_mode(&mut self) {
        if self.redirect_mode != RedirectMode::Verify {
            self.redirect_mode = RedirectMode::for_request(self.is_simple(), self.is_anonymous);
        }
    }

    /// Result of the latest redirect check.
    pub fn allows_redirect(&self) -> bool {
        self.allow_redirect
    }

    /// Attaches the `Origin` header for the outgoing request. Calling it
    /// again replaces the previous decoration.
    pub fn prepare_request_url(&mut self, url_override: Option<&Url>) -> &PreparedRequest {
        let url = url_override.unwrap_or(&self.url).clone();
        self.prepared.insert(PreparedRequest {
            url,
            origin_header: self.origin.clone(),
            redirect_mode: self.redirect_mode,
        })
    }

    pub fn prepared(&self) -> Option<&PreparedRequest> {
        self.prepared.as_ref()
    }

    pub(crate) fn add_exposed_header(&mut self, name: &str) {
        self.exposed_headers.insert(normalize_lower(name.trim()));
    }

    /// Whether a script may read response header `name`.
    pub fn can_expose_response_header(&self, name: &str) -> bool {
        let name = name.trim();
        is_simple_response_header(name) || self.exposed_headers.contains(&normalize_lower(name))
    }

    /// Restricts a raw CRLF separated header block to the lines a script
    /// may see.
    pub fn filter_response_headers(&self, raw: &str) -> String {
        raw.split(['\r', '\n'])
            .filter(|line| {
                line.split_once(':')
                    .is_some_and(|(name, _)| self.can_expose_response_header(name))
            })
            .collect::<Vec<_>>()
            .join("\r\n")
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    /// Moves the request forward. Moving backwards, or out of a terminal
    /// state, is a programming error: it asserts in debug builds and is
    /// ignored otherwise.
    pub fn set_status(&mut self, status: RequestStatus) -> bool {
        if status == self.status {
            return true;
        }

        let legal = status > self.status && !self.status.is_terminal();
        if !legal {
            tracing::error!(
                request = %self.id,
                from = ?self.status,
                to = ?status,
                "rejected cross-origin status transition"
            );
            debug_assert!(legal, "status may not move backwards");
            return false;
        }

        tracing::trace!(request = %self.id, from = ?self.status, to = ?status, "status change");
        self.status = status;
        true
    }

    pub fn is_active(&self) -> bool {
        self.status == RequestStatus::Active
    }

    pub fn is_network_error(&self) -> bool {
        self.status == RequestStatus::ErrorNetwork
    }

    /// `Some(allowed)` once the request reached a terminal state.
    pub fn has_completed(&self) -> Option<bool> {
        match self.status {
            RequestStatus::Successful => Some(true),
            RequestStatus::ErrorAborted | RequestStatus::ErrorNetwork => Some(false),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "request_test.rs"]
mod request_test;
