//! Mock JWKS endpoints
//!
//! Thin helpers over `wiremock` that serve `{"keys": [...]}` documents.

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the helpers mount the key set on.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Start a mock server serving `keys`.
pub async fn start_jwks_server(keys: &[Value]) -> MockServer {
    let server = MockServer::start().await;
    mount_jwks(&server, keys, None).await;
    server
}

/// Serve `keys` at [`JWKS_PATH`], optionally with a `Cache-Control` header.
pub async fn mount_jwks(server: &MockServer, keys: &[Value], cache_control: Option<&str>) {
    let mut response = ResponseTemplate::new(200).set_body_json(json!({ "keys": keys }));
    if let Some(cache_control) = cache_control {
        response = response.insert_header("cache-control", cache_control);
    }

    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Serve a fixed status and raw body at [`JWKS_PATH`].
pub async fn mount_jwks_failure(server: &MockServer, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

/// Full key set URL of a mock server.
pub fn jwks_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), JWKS_PATH)
}
