use crate::constants::{header, method, mime};

const FORBIDDEN_REQUEST_HEADERS: &[&str] = &[
    "Accept-Charset",
    "Accept-Encoding",
    "Access-Control-Request-Headers",
    "Access-Control-Request-Method",
    "Connection",
    "Content-Length",
    "Cookie",
    "Cookie2",
    "Date",
    "DNT",
    "Expect",
    "Host",
    "Keep-Alive",
    "Origin",
    "Referer",
    "TE",
    "Trailer",
    "Transfer-Encoding",
    "Upgrade",
    "User-Agent",
    "Via",
];

const FORBIDDEN_REQUEST_HEADER_PREFIXES: &[&str] = &["Proxy-", "Sec-"];

const SIMPLE_RESPONSE_HEADERS: &[&str] = &[
    header::CACHE_CONTROL,
    header::CONTENT_LANGUAGE,
    header::CONTENT_TYPE,
    header::EXPIRES,
    header::LAST_MODIFIED,
    header::PRAGMA,
];

#[doc(hidden)]
pub fn normalize_lower(value: &str) -> String {
    if value.is_ascii() {
        let mut owned = value.to_owned();
        owned.make_ascii_lowercase();
        owned
    } else {
        value.to_lowercase()
    }
}

#[doc(hidden)]
pub fn equals_ignore_case(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }

    if a.is_ascii() && b.is_ascii() {
        return a.eq_ignore_ascii_case(b);
    }

    normalize_lower(a) == normalize_lower(b)
}

/// Returns `true` when `value` matches the RFC 2616 `token` production.
pub fn is_http_token(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(is_token_byte)
}

pub(crate) fn is_token_byte(byte: u8) -> bool {
    matches!(
        byte,
        b'0'..=b'9'
            | b'A'..=b'Z'
            | b'a'..=b'z'
            | b'!'
            | b'#'
            | b'$'
            | b'%'
            | b'&'
            | b'\''
            | b'*'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~'
    )
}

/// GET, HEAD and POST never require a preflight on their own.
pub fn is_simple_method(value: &str) -> bool {
    matches!(value, method::GET | method::HEAD | method::POST)
}

/// Classifies one request header. `Content-Type` is only simple for the three
/// form-compatible media types; parameters such as `charset` are ignored.
pub fn is_simple_request_header(name: &str, value: &str) -> bool {
    if name.eq_ignore_ascii_case(header::ACCEPT)
        || name.eq_ignore_ascii_case(header::ACCEPT_LANGUAGE)
        || name.eq_ignore_ascii_case(header::CONTENT_LANGUAGE)
    {
        return true;
    }

    if name.eq_ignore_ascii_case(header::CONTENT_TYPE) {
        let media_type = value.split(';').next().unwrap_or_default().trim();
        return [mime::FORM_URLENCODED, mime::MULTIPART_FORM_DATA, mime::TEXT_PLAIN]
            .iter()
            .any(|simple| media_type.eq_ignore_ascii_case(simple));
    }

    false
}

/// Header names a script may always read from a cross-origin response.
pub fn is_simple_response_header(name: &str) -> bool {
    SIMPLE_RESPONSE_HEADERS
        .iter()
        .any(|simple| simple.eq_ignore_ascii_case(name))
}

/// Header names a script is never allowed to set on an outgoing request.
pub fn is_forbidden_request_header(name: &str) -> bool {
    let name = name.trim();
    FORBIDDEN_REQUEST_HEADERS
        .iter()
        .any(|forbidden| forbidden.eq_ignore_ascii_case(name))
        || FORBIDDEN_REQUEST_HEADER_PREFIXES.iter().any(|prefix| {
            name.len() >= prefix.len()
                && name.is_char_boundary(prefix.len())
                && name[..prefix.len()].eq_ignore_ascii_case(prefix)
        })
}

#[cfg(test)]
#[path = "util_test.rs"]
mod util_test;
