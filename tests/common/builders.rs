use super::mocks::{RecordingLoader, RecordingLogger};
use cors_guard::constants::method;
use cors_guard::{CrossOriginManager, CrossOriginRequest, ManagerOptions, SharedRequest};
use url::Url;

pub const PAGE: &str = "https://a.example/app/index.html";
pub const ORIGIN: &str = "https://a.example";
pub const TARGET: &str = "https://b.example/api/items";

pub fn url(value: &str) -> Url {
    Url::parse(value).expect("valid url")
}

pub struct RequestBuilder {
    origin_url: String,
    target: String,
    method: String,
    headers: Vec<(String, String)>,
    credentials: bool,
    anonymous: bool,
    force_preflight: bool,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            origin_url: PAGE.to_string(),
            target: TARGET.to_string(),
            method: method::GET.to_string(),
            headers: Vec::new(),
            credentials: false,
            anonymous: false,
            force_preflight: false,
        }
    }

    pub fn from_page(mut self, page: &str) -> Self {
        self.origin_url = page.to_string();
        self
    }

    pub fn to(mut self, target: &str) -> Self {
        self.target = target.to_string();
        self
    }

    pub fn method(mut self, method: &str) -> Self {
        self.method = method.to_string();
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn credentials(mut self, enabled: bool) -> Self {
        self.credentials = enabled;
        self
    }

    pub fn anonymous(mut self, enabled: bool) -> Self {
        self.anonymous = enabled;
        self
    }

    pub fn force_preflight(mut self) -> Self {
        self.force_preflight = true;
        self
    }

    pub fn build(self) -> CrossOriginRequest {
        let mut request = CrossOriginRequest::make(
            &url(&self.origin_url),
            &url(&self.target),
            &self.method,
            self.credentials,
            self.anonymous,
        );
        for (name, value) in &self.headers {
            request.add_header(name, value);
        }
        if self.force_preflight {
            request.set_preflight_required();
        }
        request
    }

    pub fn shared(self) -> SharedRequest {
        self.build().into_shared()
    }
}

pub fn request() -> RequestBuilder {
    RequestBuilder::new()
}

pub struct Fixture {
    pub manager: CrossOriginManager,
    pub loader: RecordingLoader,
    pub logger: RecordingLogger,
}

pub fn fixture() -> Fixture {
    fixture_with(ManagerOptions::default(), RecordingLoader::new())
}

pub fn fixture_with(options: ManagerOptions, loader: RecordingLoader) -> Fixture {
    super::init_tracing();
    let logger = RecordingLogger::new();
    let manager = CrossOriginManager::new(options, loader.clone())
        .expect("valid manager options")
        .with_logger(logger.clone());
    Fixture {
        manager,
        loader,
        logger,
    }
}
