//! The provider's network surface: code exchange and profile lookup

use async_trait::async_trait;

use crate::constants::{DISCORD_TOKEN_URL, DISCORD_USER_URL};
use crate::error::Result;
use crate::profile::{self, Profile};
use crate::tokens::{self, ClientCredentials, CodeGrant};

/// Network calls made after consent
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Trades an authorization code for an access token
    async fn exchange_code(&self, grant: &CodeGrant) -> Result<String>;

    /// Fetches the profile of the token's owner
    async fn fetch_profile(&self, access_token: &str) -> Result<Profile>;
}

/// Token and user endpoints, overridable for tests and proxies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub token_url: String,
    pub user_url: String,
}

impl Endpoints {
    /// Endpoints rooted at `base`, using Discord's paths
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            token_url: format!("{}/api/oauth2/token", base),
            user_url: format!("{}/api/users/@me", base),
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            token_url: DISCORD_TOKEN_URL.to_string(),
            user_url: DISCORD_USER_URL.to_string(),
        }
    }
}

/// Discord implementation of [`IdentityProvider`]
pub struct DiscordProvider {
    http: reqwest::Client,
    credentials: ClientCredentials,
    endpoints: Endpoints,
}

impl DiscordProvider {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials: ClientCredentials {
                client_id: client_id.into(),
                client_secret: client_secret.into(),
            },
            endpoints: Endpoints::default(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }
}

#[async_trait]
impl IdentityProvider for DiscordProvider {
    async fn exchange_code(&self, grant: &CodeGrant) -> Result<String> {
        tokens::exchange_code(&self.http, &self.endpoints.token_url, &self.credentials, grant).await
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<Profile> {
        profile::fetch_profile(&self.http, &self.endpoints.user_url, access_token).await
    }
}
