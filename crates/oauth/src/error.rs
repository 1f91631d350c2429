//! Error taxonomy for the login flow

use thiserror::Error;

/// Errors raised while talking to the provider or the session store
#[derive(Debug, Error)]
pub enum AuthError {
    /// The request never produced an HTTP response
    #[error("network request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The provider answered with an error payload
    #[error("provider rejected the request ({status}): {error}{}", describe(.description))]
    Rejected {
        status: u16,
        error: String,
        description: Option<String>,
    },

    /// The provider answered successfully but the body was unusable
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    /// Reading or writing local session state failed
    #[error("session store failure: {0}")]
    Store(String),

    /// The loopback redirect listener could not be started or served
    #[error("callback listener failed: {0}")]
    Callback(String),

    /// Caller supplied an argument the provider would reject anyway
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl AuthError {
    /// Builds a `Store` error from anything displayable
    pub fn store(err: impl std::fmt::Display) -> Self {
        AuthError::Store(err.to_string())
    }
}

fn describe(description: &Option<String>) -> String {
    match description {
        Some(d) => format!(" - {d}"),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
