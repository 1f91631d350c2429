//! Discord OAuth 2.0 login for Authleiber
//!
//! This crate implements the Authorization Code flow with PKCE against
//! Discord, fetches the logged-in user's profile and keeps the resulting
//! session in a local key-value store. [`SessionController`] ties the steps
//! together as an explicit state machine.

pub mod constants;
pub mod error;
pub mod flow;
pub mod pkce;
pub mod profile;
pub mod provider;
pub mod session;
pub mod storage;
pub mod tokens;

pub use error::{AuthError, Result};
pub use flow::{AuthorizationRequest, BrowserConsent, ClientRegistration, ConsentOutcome, ConsentPrompt};
pub use profile::Profile;
pub use provider::{DiscordProvider, Endpoints, IdentityProvider};
pub use session::{Command, Session, SessionController, SessionEvent, SessionState};
pub use storage::{FileStore, KeyValueStore, KeyringStore, MemoryStore, SessionStore};
pub use tokens::{ClientCredentials, CodeGrant};
