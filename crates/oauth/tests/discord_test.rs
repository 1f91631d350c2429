mod common;

use common::mock_server::MockDiscord;
use oauth::{AuthError, CodeGrant, DiscordProvider, IdentityProvider, Profile};

fn provider(server: &MockDiscord) -> DiscordProvider {
    DiscordProvider::new("client-123", "secret-456").with_endpoints(server.endpoints())
}

fn grant(code: &str) -> CodeGrant {
    CodeGrant {
        code: code.into(),
        code_verifier: "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk".into(),
        redirect_uri: "http://127.0.0.1:53134/authleiber".into(),
    }
}

#[tokio::test]
async fn exchange_posts_full_form_and_returns_token() {
    let server = MockDiscord::start().await;
    server
        .mock_token(serde_json::json!({
            "access_token": "tok1",
            "token_type": "Bearer",
            "expires_in": 604800,
            "scope": "identify"
        }))
        .await;

    let token = provider(&server).exchange_code(&grant("xyz")).await.unwrap();
    assert_eq!(token, "tok1");

    let form = server.last_token_form().await;
    let expect = [
        ("client_id", "client-123"),
        ("client_secret", "secret-456"),
        ("grant_type", "authorization_code"),
        ("code", "xyz"),
        ("redirect_uri", "http://127.0.0.1:53134/authleiber"),
        ("code_verifier", "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
    ];
    for (key, value) in expect {
        assert!(
            form.contains(&(key.to_string(), value.to_string())),
            "missing {}={} in {:?}",
            key,
            value,
            form
        );
    }
}

#[tokio::test]
async fn invalid_code_is_rejected() {
    let server = MockDiscord::start().await;
    server
        .mock_token_status(
            400,
            serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Invalid \"code\" in request."
            }),
        )
        .await;

    let err = provider(&server).exchange_code(&grant("bad")).await.unwrap_err();
    match err {
        AuthError::Rejected { status, error, .. } => {
            assert_eq!(status, 400);
            assert_eq!(error, "invalid_grant");
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn error_payload_with_ok_status_is_rejected() {
    let server = MockDiscord::start().await;
    server
        .mock_token(serde_json::json!({ "error": "invalid_request" }))
        .await;

    let err = provider(&server).exchange_code(&grant("xyz")).await.unwrap_err();
    assert!(matches!(err, AuthError::Rejected { ref error, .. } if error == "invalid_request"));
}

#[tokio::test]
async fn token_response_without_token_is_malformed() {
    let server = MockDiscord::start().await;
    server.mock_token(serde_json::json!({ "token_type": "Bearer" })).await;

    let err = provider(&server).exchange_code(&grant("xyz")).await.unwrap_err();
    assert!(matches!(err, AuthError::MalformedResponse(_)));
}

#[tokio::test]
async fn unreachable_token_endpoint_is_a_network_error() {
    // Nothing listens on the discard port
    let provider = DiscordProvider::new("client-123", "secret-456")
        .with_endpoints(oauth::Endpoints::with_base("http://127.0.0.1:9"));

    let err = provider.exchange_code(&grant("xyz")).await.unwrap_err();
    assert!(matches!(err, AuthError::Network(_)));
}

#[tokio::test]
async fn profile_is_fetched_with_bearer_token() {
    let server = MockDiscord::start().await;
    server
        .mock_user(
            "tok1",
            serde_json::json!({
                "id": "2",
                "username": "alice",
                "avatar": "a_hash",
                "discriminator": "0"
            }),
        )
        .await;

    let profile = provider(&server).fetch_profile("tok1").await.unwrap();
    assert_eq!(
        profile,
        Profile {
            id: "2".into(),
            username: "alice".into(),
            avatar_hash: Some("a_hash".into()),
        }
    );
    assert_eq!(
        profile.avatar_url(),
        "https://cdn.discordapp.com/avatars/2/a_hash.png"
    );
}

#[tokio::test]
async fn profile_non_success_is_a_failure() {
    let server = MockDiscord::start().await;
    server.mock_user_status(401).await;

    let err = provider(&server).fetch_profile("expired").await.unwrap_err();
    assert!(matches!(err, AuthError::Rejected { status: 401, .. }));
}

#[tokio::test]
async fn profile_with_unexpected_shape_is_malformed() {
    let server = MockDiscord::start().await;
    server
        .mock_user("tok1", serde_json::json!({ "message": "hello" }))
        .await;

    let err = provider(&server).fetch_profile("tok1").await.unwrap_err();
    assert!(matches!(err, AuthError::MalformedResponse(_)));
}
