//! OAuth constants for the Discord application
//!
//! Endpoint URLs follow Discord's OAuth2 documentation.

/// Scopes requested during login
pub const DISCORD_SCOPES: &[&str] = &["identify"];

/// Discord OAuth authorization endpoint
pub const DISCORD_AUTH_URL: &str = "https://discord.com/api/oauth2/authorize";

/// Discord OAuth token exchange endpoint
pub const DISCORD_TOKEN_URL: &str = "https://discord.com/api/oauth2/token";

/// Discord endpoint returning the authenticated user
pub const DISCORD_USER_URL: &str = "https://discord.com/api/users/@me";

/// Discord CDN serving user avatars
pub const DISCORD_CDN_URL: &str = "https://cdn.discordapp.com";

/// Avatar shown for users without a custom one
pub const DEFAULT_AVATAR_URL: &str =
    "https://ia800305.us.archive.org/31/items/discordprofilepictures/discordblue.png";

// =============================================================================
// Session store keys
// =============================================================================

/// Key holding the raw access token
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Key holding the serialized profile
pub const USER_KEY: &str = "user";
