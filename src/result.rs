use crate::options::ValidationError;
use crate::request::{RequestId, RequestStatus};
use thiserror::Error;

/// Why a cross-origin check refused access.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    #[error("missing Access-Control-Allow-Origin header")]
    MissingAllowOrigin,
    #[error("Access-Control-Allow-Origin carries more than one value")]
    MultipleAllowOrigin,
    #[error("Access-Control-Allow-Origin does not match the request origin")]
    NoMatchAllowOrigin,
    #[error("Access-Control-Allow-Credentials is missing or not \"true\"")]
    InvalidAllowCredentials,
    #[error("request method not allowed by Access-Control-Allow-Methods")]
    MethodNotAllowed,
    #[error("request header not allowed by Access-Control-Allow-Headers")]
    HeaderNotAllowed,
    #[error("redirect changes the URL scheme")]
    UnsupportedScheme,
    #[error("redirect revisits a URL already in the redirect chain")]
    RedirectLoop,
    #[error("redirect URL carries userinfo")]
    UserinfoRedirect,
}

/// Outcome of a manager check that ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allowed,
    Denied(FailureReason),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allowed)
    }

    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            AccessDecision::Allowed => None,
            AccessDecision::Denied(reason) => Some(*reason),
        }
    }
}

impl From<Result<(), FailureReason>> for AccessDecision {
    fn from(value: Result<(), FailureReason>) -> Self {
        match value {
            Ok(()) => AccessDecision::Allowed,
            Err(reason) => AccessDecision::Denied(reason),
        }
    }
}

/// Delivered exactly once to the callback passed to `handle_request`.
#[derive(Debug)]
pub enum CheckOutcome {
    /// The check finished; `allowed` says whether the actual request may go out.
    Success { allowed: bool },
    /// The check could not be carried out.
    Failure(CorsError),
}

/// Errors that are not protocol denials.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CorsError {
    #[error("request is {actual:?}, expected {expected:?}")]
    InvalidState {
        expected: RequestStatus,
        actual: RequestStatus,
    },
    #[error("preflight loader failed to start: {0}")]
    LoaderStart(String),
    #[error("no preflight in flight for request {0}")]
    UnknownPreflight(RequestId),
    #[error("out of memory while updating cross-origin state")]
    ResourceExhausted,
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
