use super::*;

mod normalize_lower {
    use super::*;

    #[test]
    fn should_return_ascii_lowercase_when_input_ascii_then_use_fast_path() {
        let result = normalize_lower("X-CusTom");

        assert_eq!(result, "x-custom");
    }

    #[test]
    fn should_return_unicode_lowercase_when_input_unicode_then_preserve_characters() {
        let result = normalize_lower("ÜBER");

        assert_eq!(result, "über");
    }
}

mod equals_ignore_case {
    use super::*;

    #[test]
    fn should_return_true_when_ascii_values_match_case_insensitively_then_detect_equality() {
        assert!(equals_ignore_case("Content-Type", "content-TYPE"));
    }

    #[test]
    fn should_return_false_when_values_differ_then_detect_inequality() {
        assert!(!equals_ignore_case("X-Custom", "X-Custom2"));
    }

    #[test]
    fn should_return_true_when_unicode_values_match_case_insensitively_then_detect_equality() {
        assert!(equals_ignore_case("TÉST", "tést"));
    }
}

mod is_http_token {
    use super::*;

    #[test]
    fn should_return_true_when_value_contains_valid_token_characters_then_accept_value() {
        assert!(is_http_token("X-Custom"));
        assert!(is_http_token("PUT"));
        assert!(is_http_token("*"));
    }

    #[test]
    fn should_return_false_when_value_contains_separator_then_reject_value() {
        assert!(!is_http_token("X-Custom,"));
        assert!(!is_http_token("a b"));
        assert!(!is_http_token("\"quoted\""));
        assert!(!is_http_token("Header:Value"));
    }

    #[test]
    fn should_return_false_when_value_empty_then_reject_value() {
        assert!(!is_http_token(""));
    }
}

mod is_simple_method {
    use super::*;

    #[test]
    fn should_accept_get_head_post() {
        assert!(is_simple_method("GET"));
        assert!(is_simple_method("HEAD"));
        assert!(is_simple_method("POST"));
    }

    #[test]
    fn should_reject_other_methods_and_lowercase_spellings() {
        assert!(!is_simple_method("PUT"));
        assert!(!is_simple_method("DELETE"));
        assert!(!is_simple_method("OPTIONS"));
        assert!(!is_simple_method("get"));
    }
}

mod is_simple_request_header {
    use super::*;

    #[test]
    fn should_accept_whitelisted_names_regardless_of_value() {
        assert!(is_simple_request_header("accept", "application/json"));
        assert!(is_simple_request_header("Accept-Language", "en"));
        assert!(is_simple_request_header("CONTENT-LANGUAGE", "de"));
    }

    #[test]
    fn should_accept_form_content_types_with_parameters() {
        assert!(is_simple_request_header("Content-Type", "text/plain"));
        assert!(is_simple_request_header(
            "content-type",
            "text/plain; charset=utf-8"
        ));
        assert!(is_simple_request_header(
            "Content-Type",
            "Multipart/Form-Data; boundary=xyz"
        ));
        assert!(is_simple_request_header(
            "Content-Type",
            "application/x-www-form-urlencoded"
        ));
    }

    #[test]
    fn should_reject_other_content_types() {
        assert!(!is_simple_request_header("Content-Type", "application/json"));
        assert!(!is_simple_request_header("Content-Type", "text/plainx"));
    }

    #[test]
    fn should_reject_custom_headers() {
        assert!(!is_simple_request_header("X-Custom", "1"));
        assert!(!is_simple_request_header("Authorization", "Bearer x"));
    }
}

mod is_simple_response_header {
    use super::*;

    #[test]
    fn should_accept_the_six_simple_response_headers() {
        for name in [
            "Cache-Control",
            "content-language",
            "Content-Type",
            "EXPIRES",
            "Last-Modified",
            "Pragma",
        ] {
            assert!(is_simple_response_header(name), "{name} should be simple");
        }
    }

    #[test]
    fn should_reject_other_response_headers() {
        assert!(!is_simple_response_header("Set-Cookie"));
        assert!(!is_simple_response_header("X-Request-Id"));
        assert!(!is_simple_response_header("Content-Length"));
    }
}

mod is_forbidden_request_header {
    use super::*;

    #[test]
    fn should_detect_listed_names_case_insensitively() {
        assert!(is_forbidden_request_header("origin"));
        assert!(is_forbidden_request_header("Cookie"));
        assert!(is_forbidden_request_header("ACCESS-CONTROL-REQUEST-METHOD"));
        assert!(is_forbidden_request_header("dnt"));
    }

    #[test]
    fn should_detect_reserved_prefixes() {
        assert!(is_forbidden_request_header("Proxy-Authorization"));
        assert!(is_forbidden_request_header("sec-fetch-mode"));
    }

    #[test]
    fn should_allow_ordinary_headers() {
        assert!(!is_forbidden_request_header("X-Custom"));
        assert!(!is_forbidden_request_header("Content-Type"));
        assert!(!is_forbidden_request_header("Se"));
        assert!(!is_forbidden_request_header("Secret"));
    }
}
