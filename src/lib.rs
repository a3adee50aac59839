pub mod constants;
pub mod header_list;
mod headers;
mod manager;
mod options;
mod origin;
mod preflight_cache;
mod request;
mod result;
mod services;
mod util;

pub use headers::ResponseHeaders;
pub use manager::{
    CancelToken, CheckCallback, CrossOriginManager, RedirectCheck, RequestDisposition,
};
pub use options::{
    DEFAULT_CACHE_SIZE, DEFAULT_MAX_AGE, DEFAULT_MAX_REDIRECTS, MAXIMUM_MAX_AGE, ManagerOptions,
    ValidationError,
};
pub use origin::{request_origin, same_origin, to_origin_string};
pub use preflight_cache::{CachedValue, PreflightCache, PreflightCacheEntry};
pub use request::{
    CrossOriginRequest, PreparedRequest, RedirectMode, RequestId, RequestStatus, SharedRequest,
};
pub use result::{AccessDecision, CheckOutcome, CorsError, FailureReason};
#[cfg(feature = "strict-failure")]
pub use services::CookieStore;
pub use services::{
    FailureLogger, HeaderAccessor, LoaderError, PreflightLoader, PreflightRequest, TracingLogger,
};
pub use util::{
    is_forbidden_request_header, is_http_token, is_simple_method, is_simple_request_header,
    is_simple_response_header,
};

#[doc(hidden)]
pub use util::{equals_ignore_case, normalize_lower};
