use crate::constants::NULL_ORIGIN;
use url::Url;

/// Serializes the origin of `url` as `scheme://host[:port]`.
///
/// The host is compared case-insensitively because the URL parser already
/// lowercases it, and the scheme's default port is left out. URLs without a
/// tuple origin (`data:`, `file:`, opaque schemes) serialize as `"null"`.
pub fn to_origin_string(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// The origin string a request made from `url` carries in its `Origin` header.
pub fn request_origin(url: &Url, anonymous: bool) -> String {
    if anonymous {
        NULL_ORIGIN.to_string()
    } else {
        to_origin_string(url)
    }
}

/// `true` when both URLs share scheme, host and port.
pub fn same_origin(a: &Url, b: &Url) -> bool {
    let origin = a.origin();
    origin.is_tuple() && origin == b.origin()
}

#[cfg(test)]
#[path = "origin_test.rs"]
mod origin_test;
