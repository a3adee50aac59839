use cors_guard::{
    FailureLogger, FailureReason, HeaderAccessor, LoaderError, PreflightLoader, PreflightRequest,
    RequestId, ResponseHeaders,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use url::Url;

/// Loader that records preflights instead of sending them. Clones share
/// their records, so a test keeps one clone and hands the other to the
/// manager.
#[derive(Clone, Default)]
pub struct RecordingLoader {
    started: Rc<RefCell<Vec<PreflightRequest>>>,
    cancelled: Rc<RefCell<Vec<RequestId>>>,
    refuse: Rc<RefCell<Option<String>>>,
}

impl RecordingLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refusing(message: &str) -> Self {
        let loader = Self::default();
        *loader.refuse.borrow_mut() = Some(message.to_string());
        loader
    }

    pub fn started(&self) -> Vec<PreflightRequest> {
        self.started.borrow().clone()
    }

    pub fn last(&self) -> PreflightRequest {
        self.started
            .borrow()
            .last()
            .cloned()
            .expect("a preflight was started")
    }

    pub fn cancelled(&self) -> Vec<RequestId> {
        self.cancelled.borrow().clone()
    }
}

impl PreflightLoader for RecordingLoader {
    fn start(&mut self, preflight: &PreflightRequest) -> Result<(), LoaderError> {
        if let Some(message) = self.refuse.borrow().as_ref() {
            return Err(message.clone().into());
        }
        self.started.borrow_mut().push(preflight.clone());
        Ok(())
    }

    fn cancel(&mut self, id: RequestId) {
        self.cancelled.borrow_mut().push(id);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedFailure {
    pub context: String,
    pub url: String,
    pub reason: FailureReason,
}

#[derive(Clone, Default)]
pub struct RecordingLogger {
    failures: Rc<RefCell<Vec<LoggedFailure>>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> Vec<LoggedFailure> {
        self.failures.borrow().clone()
    }

    pub fn reasons(&self) -> Vec<FailureReason> {
        self.failures
            .borrow()
            .iter()
            .map(|failure| failure.reason)
            .collect()
    }
}

impl FailureLogger for RecordingLogger {
    fn log_failure(&self, context: &str, url: &Url, reason: FailureReason) {
        self.failures.borrow_mut().push(LoggedFailure {
            context: context.to_string(),
            url: url.to_string(),
            reason,
        });
    }
}

/// Response headers for several responses, looked up by response URL.
#[derive(Debug, Default, Clone)]
pub struct UrlHeaders {
    responses: HashMap<String, ResponseHeaders>,
}

impl UrlHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, headers: ResponseHeaders) -> Self {
        self.responses.insert(url.to_string(), headers);
        self
    }
}

impl HeaderAccessor for UrlHeaders {
    fn header_value(&self, url: &Url, name: &str) -> Option<String> {
        self.responses
            .get(url.as_str())
            .and_then(|headers| headers.get(name))
            .map(str::to_owned)
    }
}

#[cfg(feature = "strict-failure")]
#[derive(Clone, Default)]
pub struct RecordingCookieStore {
    removed: Rc<RefCell<Vec<String>>>,
}

#[cfg(feature = "strict-failure")]
impl RecordingCookieStore {
    pub fn removed(&self) -> Vec<String> {
        self.removed.borrow().clone()
    }
}

#[cfg(feature = "strict-failure")]
impl cors_guard::CookieStore for RecordingCookieStore {
    fn remove_cookies_by_url(&mut self, url: &Url) {
        self.removed.borrow_mut().push(url.to_string());
    }
}
