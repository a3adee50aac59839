use super::*;

fn url(value: &str) -> Url {
    Url::parse(value).expect("valid url")
}

mod to_origin_string {
    use super::*;

    #[test]
    fn should_drop_path_query_and_fragment() {
        let origin = to_origin_string(&url("https://a.example/path/x?q=1#frag"));

        assert_eq!(origin, "https://a.example");
    }

    #[test]
    fn should_suppress_default_port() {
        assert_eq!(
            to_origin_string(&url("https://a.example:443/")),
            "https://a.example"
        );
        assert_eq!(to_origin_string(&url("http://a.example:80/")), "http://a.example");
    }

    #[test]
    fn should_keep_non_default_port() {
        assert_eq!(
            to_origin_string(&url("https://a.example:8443/")),
            "https://a.example:8443"
        );
    }

    #[test]
    fn should_lowercase_host() {
        assert_eq!(
            to_origin_string(&url("https://A.Example/Path")),
            "https://a.example"
        );
    }

    #[test]
    fn should_return_null_for_opaque_origins() {
        assert_eq!(to_origin_string(&url("data:text/plain,hi")), "null");
    }
}

mod request_origin {
    use super::*;

    #[test]
    fn should_return_null_when_anonymous() {
        assert_eq!(request_origin(&url("https://a.example/"), true), "null");
    }

    #[test]
    fn should_return_serialized_origin_when_not_anonymous() {
        assert_eq!(
            request_origin(&url("https://a.example/app"), false),
            "https://a.example"
        );
    }
}

mod same_origin {
    use super::*;

    #[test]
    fn should_match_when_only_path_differs() {
        assert!(same_origin(
            &url("https://a.example/one"),
            &url("https://a.example:443/two?x")
        ));
    }

    #[test]
    fn should_not_match_when_scheme_host_or_port_differs() {
        let base = url("https://a.example/");

        assert!(!same_origin(&base, &url("http://a.example/")));
        assert!(!same_origin(&base, &url("https://b.example/")));
        assert!(!same_origin(&base, &url("https://a.example:444/")));
    }

    #[test]
    fn should_never_match_opaque_origins() {
        let data = url("data:text/plain,hi");

        assert!(!same_origin(&data, &data));
    }
}
