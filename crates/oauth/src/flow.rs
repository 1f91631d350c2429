//! OAuth 2.0 Authorization Code flow with PKCE: the consent half
//!
//! 1. Generate PKCE code verifier/challenge and CSRF state
//! 2. Listen for the OAuth redirect on a loopback address
//! 3. Open the browser on the provider's consent page
//! 4. Turn the redirect into a [`ConsentOutcome`]
//!
//! Trading the code for a token lives in [`crate::tokens`].

use async_trait::async_trait;
use axum::{
    extract::Query,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error, info, warn};

use crate::constants::{DISCORD_AUTH_URL, DISCORD_SCOPES};
use crate::error::{AuthError, Result};
use crate::pkce;

/// Builds the loopback redirect URI for a scheme identifier
pub fn make_redirect_uri(scheme: &str, port: u16) -> String {
    format!("http://127.0.0.1:{}/{}", port, scheme)
}

/// Static client registration: who we are and where the provider sends the user back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRegistration {
    pub client_id: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl ClientRegistration {
    pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            scopes: DISCORD_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Whether a login attempt can be started with this registration
    pub fn is_complete(&self) -> bool {
        !self.client_id.trim().is_empty() && !self.redirect_uri.trim().is_empty()
    }

    /// Creates a fresh request with new PKCE parameters and state
    pub fn new_request(&self) -> AuthorizationRequest {
        let (verifier, challenge) = pkce::generate_pkce();
        AuthorizationRequest {
            client_id: self.client_id.clone(),
            redirect_uri: self.redirect_uri.clone(),
            scopes: self.scopes.clone(),
            state: pkce::generate_state(),
            code_verifier: verifier,
            code_challenge: challenge,
        }
    }
}

/// One login attempt's worth of authorization parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub client_id: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub state: String,
    pub code_verifier: String,
    pub code_challenge: String,
}

impl AuthorizationRequest {
    /// Returns the authorization URL to open in the browser
    pub fn authorization_url(&self, authorize_endpoint: &str) -> String {
        let scopes = self.scopes.join(" ");
        format!(
            "{}?client_id={}&response_type=code&redirect_uri={}&scope={}&state={}&code_challenge={}&code_challenge_method=S256",
            authorize_endpoint,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&scopes),
            &self.state,
            &self.code_challenge,
        )
    }
}

/// Result of the interactive consent step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsentOutcome {
    /// The provider redirected back with an authorization code
    Success { code: String },
    /// The user declined on the provider's consent page
    Cancelled,
    /// Anything else that stopped the consent step
    Error(String),
}

/// Query parameters from the OAuth redirect
#[derive(Debug, Default, serde::Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl CallbackParams {
    fn into_outcome(self, expected_state: &str) -> ConsentOutcome {
        // Validate state to prevent CSRF
        if self.state.as_deref() != Some(expected_state) {
            warn!("OAuth callback received with invalid state");
            return ConsentOutcome::Error("invalid OAuth state".to_string());
        }

        if let Some(error) = self.error {
            if error == "access_denied" {
                info!("User cancelled the consent step");
                return ConsentOutcome::Cancelled;
            }
            let description = self.error_description.unwrap_or_default();
            error!("OAuth error: {} {}", error, description);
            return ConsentOutcome::Error(format!("{}: {}", error, description));
        }

        match self.code {
            Some(code) if !code.is_empty() => ConsentOutcome::Success { code },
            _ => ConsentOutcome::Error("no authorization code in callback".to_string()),
        }
    }
}

/// A bound loopback listener waiting for exactly one OAuth redirect
pub struct CallbackListener {
    listener: TcpListener,
    path: String,
    expected_state: String,
}

impl CallbackListener {
    /// Binds the host/port named by the request's redirect URI
    ///
    /// Binding happens before the browser opens so the redirect can never
    /// arrive at a closed port.
    pub async fn bind(request: &AuthorizationRequest) -> Result<Self> {
        let url = reqwest::Url::parse(&request.redirect_uri)
            .map_err(|e| AuthError::InvalidInput(format!("bad redirect URI {}: {}", request.redirect_uri, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| AuthError::InvalidInput(format!("redirect URI has no host: {}", request.redirect_uri)))?
            .to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| AuthError::InvalidInput(format!("redirect URI has no port: {}", request.redirect_uri)))?;

        let listener = TcpListener::bind((host.as_str(), port)).await.map_err(|e| {
            AuthError::Callback(format!(
                "failed to bind OAuth callback port {}: {}. Is another instance running?",
                port, e
            ))
        })?;

        debug!("OAuth callback listener bound on {}:{}", host, port);

        Ok(Self {
            listener,
            path: url.path().to_string(),
            expected_state: request.state.clone(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| AuthError::Callback(e.to_string()))
    }

    /// Serves the redirect path until the first callback arrives
    pub async fn wait(self) -> ConsentOutcome {
        let CallbackListener {
            listener,
            path,
            expected_state,
        } = self;
        let (tx, rx) = oneshot::channel::<ConsentOutcome>();
        let tx = Arc::new(Mutex::new(Some(tx)));

        let app = Router::new().route(
            &path,
            get(move |Query(params): Query<CallbackParams>| {
                let tx = tx.clone();
                let expected_state = expected_state.clone();
                async move {
                    let outcome = params.into_outcome(&expected_state);
                    let page = match outcome {
                        ConsentOutcome::Success { .. } => SUCCESS_HTML,
                        _ => ERROR_HTML,
                    };
                    // Later hits (favicon retries, reloads) find the sender gone
                    if let Some(tx) = tx.lock().await.take() {
                        let _ = tx.send(outcome);
                    }
                    Html(page).into_response()
                }
            }),
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        info!("OAuth callback server listening on {}", path);

        tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = server.await {
                error!("OAuth callback server error: {}", e);
            }
        });

        let outcome = rx
            .await
            .unwrap_or_else(|_| ConsentOutcome::Error("OAuth callback channel closed unexpectedly".to_string()));

        let _ = shutdown_tx.send(());
        outcome
    }
}

/// The interactive step that turns an authorization request into a code
#[async_trait]
pub trait ConsentPrompt: Send + Sync {
    async fn prompt(&self, request: &AuthorizationRequest) -> ConsentOutcome;
}

/// Opens the provider consent page in the system browser
pub struct BrowserConsent {
    authorize_endpoint: String,
    launcher: fn(&str) -> std::io::Result<()>,
}

fn open_in_browser(url: &str) -> std::io::Result<()> {
    open::that(url)
}

impl BrowserConsent {
    pub fn new() -> Self {
        Self::with_endpoint(DISCORD_AUTH_URL)
    }

    pub fn with_endpoint(authorize_endpoint: impl Into<String>) -> Self {
        Self {
            authorize_endpoint: authorize_endpoint.into(),
            launcher: open_in_browser,
        }
    }

    /// Replaces the browser launcher (headless environments, tests)
    pub fn with_launcher(mut self, launcher: fn(&str) -> std::io::Result<()>) -> Self {
        self.launcher = launcher;
        self
    }
}

impl Default for BrowserConsent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConsentPrompt for BrowserConsent {
    async fn prompt(&self, request: &AuthorizationRequest) -> ConsentOutcome {
        let listener = match CallbackListener::bind(request).await {
            Ok(listener) => listener,
            Err(e) => return ConsentOutcome::Error(e.to_string()),
        };

        let url = request.authorization_url(&self.authorize_endpoint);
        info!("Opening browser for Discord consent");
        if let Err(e) = (self.launcher)(&url) {
            error!("Failed to open browser: {}", e);
            return ConsentOutcome::Error(format!("failed to open browser: {}", e));
        }

        listener.wait().await
    }
}

/// HTML shown on successful OAuth callback
const SUCCESS_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Authleiber - Login Successful</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            display: flex;
            justify-content: center;
            align-items: center;
            height: 100vh;
            margin: 0;
            background: #5865F2;
            color: white;
        }
        h1 { margin: 0 0 10px 0; }
        p { opacity: 0.8; }
    </style>
</head>
<body>
    <div>
        <h1>Login Successful</h1>
        <p>You can close this window and return to Authleiber.</p>
    </div>
</body>
</html>"#;

/// HTML shown on OAuth error
const ERROR_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Authleiber - Login Failed</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            display: flex;
            justify-content: center;
            align-items: center;
            height: 100vh;
            margin: 0;
            background: #2e1a1a;
            color: white;
        }
        h1 { margin: 0 0 10px 0; }
        p { opacity: 0.8; }
    </style>
</head>
<body>
    <div>
        <h1>Login Failed</h1>
        <p>Return to Authleiber to try again.</p>
    </div>
</body>
</html>"#;
