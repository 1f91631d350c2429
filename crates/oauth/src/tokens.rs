//! Authorization code exchange

use serde::Deserialize;
use tracing::{debug, error, info};

use crate::error::{AuthError, Result};

/// Everything the token endpoint needs for one `authorization_code` grant
#[derive(Debug, Clone)]
pub struct CodeGrant {
    pub code: String,
    pub code_verifier: String,
    /// Must be byte-identical to the redirect URI sent with the authorization request
    pub redirect_uri: String,
}

/// Client credentials presented to the token endpoint
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Response body from the token endpoint; success and error share one shape
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Exchanges an authorization code for an access token
///
/// Performs exactly one `POST`; failures are returned, never retried.
pub async fn exchange_code(
    client: &reqwest::Client,
    token_url: &str,
    credentials: &ClientCredentials,
    grant: &CodeGrant,
) -> Result<String> {
    if grant.code.is_empty() {
        return Err(AuthError::InvalidInput("authorization code is empty".to_string()));
    }

    info!("Exchanging authorization code for an access token");

    let response = client
        .post(token_url)
        .form(&[
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", grant.code.as_str()),
            ("redirect_uri", grant.redirect_uri.as_str()),
            ("code_verifier", grant.code_verifier.as_str()),
        ])
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    debug!("Token endpoint answered {}", status);

    let parsed = serde_json::from_str::<TokenResponse>(&body);

    if !status.is_success() {
        let (error, description) = match parsed {
            Ok(TokenResponse {
                error: Some(error),
                error_description,
                ..
            }) => (error, error_description),
            _ => (status.to_string(), Some(body)),
        };
        error!("Token exchange rejected: {}", error);
        return Err(AuthError::Rejected {
            status: status.as_u16(),
            error,
            description,
        });
    }

    let token_response = parsed
        .map_err(|e| AuthError::MalformedResponse(format!("token response is not JSON: {}", e)))?;

    match token_response {
        TokenResponse {
            access_token: Some(token),
            ..
        } if !token.is_empty() => Ok(token),
        TokenResponse {
            error: Some(error),
            error_description,
            ..
        } => {
            error!("Token exchange rejected: {}", error);
            Err(AuthError::Rejected {
                status: status.as_u16(),
                error,
                description: error_description,
            })
        }
        _ => Err(AuthError::MalformedResponse(
            "token response has no access_token".to_string(),
        )),
    }
}
