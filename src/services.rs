//! Collaborators the manager consumes but does not implement: response
//! header lookup, the network loader for preflights, the diagnostic log and
//! (optionally) the cookie store.

use crate::constants::{header, method};
use crate::request::RequestId;
use crate::result::FailureReason;
use std::error::Error;
use url::Url;

/// Read access to the headers of a received response.
pub trait HeaderAccessor {
    /// Returns the field value for `name` on the response for `url`, with
    /// repeated fields folded into one comma-separated value.
    fn header_value(&self, url: &Url, name: &str) -> Option<String>;
}

impl<T: HeaderAccessor + ?Sized> HeaderAccessor for &T {
    fn header_value(&self, url: &Url, name: &str) -> Option<String> {
        (**self).header_value(url, name)
    }
}

/// Description of the `OPTIONS` request sent ahead of a non-simple request.
/// Never carries credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightRequest {
    pub id: RequestId,
    pub url: Url,
    pub origin: String,
    pub request_method: String,
    /// Lowercased, sorted, comma-joined non-simple header names.
    pub request_headers: Option<String>,
}

impl PreflightRequest {
    pub fn method(&self) -> &'static str {
        method::OPTIONS
    }

    /// Header fields to put on the wire, in send order.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            (header::ORIGIN, self.origin.clone()),
            (
                header::ACCESS_CONTROL_REQUEST_METHOD,
                self.request_method.clone(),
            ),
        ];
        if let Some(names) = &self.request_headers {
            headers.push((header::ACCESS_CONTROL_REQUEST_HEADERS, names.clone()));
        }
        headers
    }
}

pub type LoaderError = Box<dyn Error + Send + Sync>;

/// Issues preflight requests on behalf of the manager.
///
/// `start` must return without waiting for the response. Once the response
/// headers are in, the embedder hands them to
/// [`handle_preflight_response`] from a later turn of its event loop.
///
/// [`handle_preflight_response`]: crate::CrossOriginManager::handle_preflight_response
pub trait PreflightLoader {
    fn start(&mut self, preflight: &PreflightRequest) -> Result<(), LoaderError>;

    /// Detaches the loader for `id`; a response arriving later is dropped.
    fn cancel(&mut self, id: RequestId);
}

/// Developer-facing sink for denied cross-origin attempts.
pub trait FailureLogger {
    fn log_failure(&self, context: &str, url: &Url, reason: FailureReason);
}

/// Default logger, reporting through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl FailureLogger for TracingLogger {
    fn log_failure(&self, context: &str, url: &Url, reason: FailureReason) {
        tracing::warn!(
            target: "cors_guard::failure",
            context,
            url = %url,
            %reason,
            "cross-origin access denied"
        );
    }
}

/// Cookie storage hook used to drop cookies set by a response that failed a
/// cross-origin check.
#[cfg(feature = "strict-failure")]
pub trait CookieStore {
    fn remove_cookies_by_url(&mut self, url: &Url);
}
