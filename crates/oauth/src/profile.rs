//! Authenticated user profile

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::constants::{DEFAULT_AVATAR_URL, DISCORD_CDN_URL};
use crate::error::{AuthError, Result};

/// Snapshot of the user taken once per login
///
/// Field names follow Discord's user object so the stored record and the
/// API response share one format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub username: String,
    #[serde(rename = "avatar", default, skip_serializing_if = "Option::is_none")]
    pub avatar_hash: Option<String>,
}

impl Profile {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            avatar_hash: None,
        }
    }

    /// CDN URL of the user's avatar, or the stock avatar when none is set
    pub fn avatar_url(&self) -> String {
        match self.avatar_hash.as_deref() {
            Some(hash) if !hash.is_empty() => {
                format!("{}/avatars/{}/{}.png", DISCORD_CDN_URL, self.id, hash)
            }
            _ => DEFAULT_AVATAR_URL.to_string(),
        }
    }
}

/// Fetches the profile of the user owning `access_token`
pub async fn fetch_profile(client: &reqwest::Client, user_url: &str, access_token: &str) -> Result<Profile> {
    let response = client.get(user_url).bearer_auth(access_token).send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        error!("Profile fetch failed with {}", status);
        return Err(AuthError::Rejected {
            status: status.as_u16(),
            error: status.to_string(),
            description: (!body.is_empty()).then_some(body),
        });
    }

    let body = response.text().await?;
    let profile: Profile = serde_json::from_str(&body)
        .map_err(|e| AuthError::MalformedResponse(format!("profile response: {}", e)))?;

    info!("Fetched profile for {}", profile.username);
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avatar_url_uses_cdn_when_hash_present() {
        let mut profile = Profile::new("80351110224678912", "nelly");
        profile.avatar_hash = Some("8342729096ea3675442027381ff50dfe".into());
        assert_eq!(
            profile.avatar_url(),
            "https://cdn.discordapp.com/avatars/80351110224678912/8342729096ea3675442027381ff50dfe.png"
        );
    }

    #[test]
    fn avatar_url_falls_back_to_default() {
        assert_eq!(Profile::new("1", "bob").avatar_url(), DEFAULT_AVATAR_URL);
    }

    #[test]
    fn deserializes_discord_user_object() {
        let profile: Profile = serde_json::from_str(
            r#"{"id":"2","username":"alice","avatar":null,"discriminator":"0","global_name":"Alice"}"#,
        )
        .unwrap();
        assert_eq!(profile, Profile::new("2", "alice"));
    }

    #[test]
    fn stored_record_without_avatar_loads() {
        let profile: Profile = serde_json::from_str(r#"{"id":"1","username":"bob"}"#).unwrap();
        assert_eq!(profile.username, "bob");
        assert!(profile.avatar_hash.is_none());
    }
}
