use oauth::Endpoints;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN_PATH: &str = "/api/oauth2/token";
pub const USER_PATH: &str = "/api/users/@me";

/// A mock Discord API built on `wiremock`. Serves the token and user
/// endpoints with configurable behavior.
pub struct MockDiscord {
    server: MockServer,
}

impl MockDiscord {
    /// Start a new mock server on a random available port.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Endpoints pointing at this server.
    pub fn endpoints(&self) -> Endpoints {
        Endpoints::with_base(&self.server.uri())
    }

    /// `POST /api/oauth2/token` answers 200 with `body`.
    pub async fn mock_token(&self, body: serde_json::Value) {
        self.mock_token_status(200, body).await;
    }

    /// `POST /api/oauth2/token` answers `status` with `body`.
    pub async fn mock_token_status(&self, status: u16, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_json(&body))
            .mount(&self.server)
            .await;
    }

    /// `GET /api/users/@me` answers 200 with `body` for `Bearer <token>` only.
    pub async fn mock_user(&self, token: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(USER_PATH))
            .and(header("authorization", format!("Bearer {}", token).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&self.server)
            .await;
    }

    /// `GET /api/users/@me` answers `status` with an empty body.
    pub async fn mock_user_status(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path(USER_PATH))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Number of requests the server has seen.
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .expect("request recording enabled")
            .len()
    }

    /// Form parameters of the last request to the token endpoint.
    pub async fn last_token_form(&self) -> Vec<(String, String)> {
        let requests = self
            .server
            .received_requests()
            .await
            .expect("request recording enabled");
        let last = requests
            .iter()
            .rev()
            .find(|r| r.url.path() == TOKEN_PATH)
            .expect("expected a token request");
        let body = String::from_utf8(last.body.clone()).expect("body should be UTF-8");
        reqwest::Url::parse(&format!("http://form.invalid/?{}", body))
            .expect("form body should parse as a query")
            .query_pairs()
            .into_owned()
            .collect()
    }
}
