//! Login session state machine
//!
//! ```text
//! LoggedOut ─initiate─▶ AuthorizationPending ─code─▶ Exchanging ─token─▶ FetchingProfile ─profile─▶ LoggedIn
//!     ▲                         │ cancel/error          │ error                │ error                  │
//!     └─────────────────────────┴───────────────────────┴──────────────────────┴──────── logout ────────┘
//! ```
//!
//! [`SessionController`] owns the state and the [`SessionStore`]. It never
//! awaits: events go in, and at most one [`Command`] comes out for the caller
//! to run (see [`execute`]), whose result is fed back as the next event.

use tracing::{debug, error, info, warn};

use crate::error::AuthError;
use crate::flow::{AuthorizationRequest, ClientRegistration, ConsentOutcome, ConsentPrompt};
use crate::profile::Profile;
use crate::provider::IdentityProvider;
use crate::storage::SessionStore;
use crate::tokens::CodeGrant;

/// An authenticated user together with the token that proved it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub user: Profile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    AuthorizationPending,
    Exchanging,
    FetchingProfile { access_token: String },
    LoggedIn(Session),
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::LoggedOut => "LoggedOut",
            SessionState::AuthorizationPending => "AuthorizationPending",
            SessionState::Exchanging => "Exchanging",
            SessionState::FetchingProfile { .. } => "FetchingProfile",
            SessionState::LoggedIn(_) => "LoggedIn",
        }
    }

    /// `LoggedIn` and `LoggedOut` wait for the user; everything else waits for I/O
    pub fn is_stable(&self) -> bool {
        matches!(self, SessionState::LoggedOut | SessionState::LoggedIn(_))
    }
}

/// Everything that can move the state machine
#[derive(Debug)]
pub enum SessionEvent {
    Initiate,
    ConsentCompleted(ConsentOutcome),
    ExchangeSucceeded { access_token: String },
    ExchangeFailed(AuthError),
    ProfileFetched(Profile),
    ProfileFailed(AuthError),
    Logout,
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Initiate => "Initiate",
            SessionEvent::ConsentCompleted(_) => "ConsentCompleted",
            SessionEvent::ExchangeSucceeded { .. } => "ExchangeSucceeded",
            SessionEvent::ExchangeFailed(_) => "ExchangeFailed",
            SessionEvent::ProfileFetched(_) => "ProfileFetched",
            SessionEvent::ProfileFailed(_) => "ProfileFailed",
            SessionEvent::Logout => "Logout",
        }
    }
}

/// Asynchronous work requested by the controller
#[derive(Debug, Clone)]
pub enum Command {
    PromptConsent(AuthorizationRequest),
    ExchangeCode(CodeGrant),
    FetchProfile { access_token: String },
}

/// Owns the login flow state and the only code allowed to change it
pub struct SessionController {
    state: SessionState,
    registration: ClientRegistration,
    request: Option<AuthorizationRequest>,
    store: SessionStore,
}

impl SessionController {
    /// Starts in `LoggedOut`; call [`restore`](Self::restore) to pick up a stored session
    pub fn new(registration: ClientRegistration, store: SessionStore) -> Self {
        let mut controller = Self {
            state: SessionState::LoggedOut,
            registration,
            request: None,
            store,
        };
        controller.enter_logged_out();
        controller
    }

    /// Loads a stored session without touching the network
    pub fn restore(&mut self) {
        match self.store.load() {
            Ok(Some(session)) => {
                info!("Restored session for {}", session.user.username);
                self.request = None;
                self.state = SessionState::LoggedIn(session);
            }
            Ok(None) => self.enter_logged_out(),
            Err(e) => {
                error!("Failed to load stored session: {}", e);
                self.enter_logged_out();
            }
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            SessionState::LoggedIn(session) => Some(session),
            _ => None,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// True when the login trigger should be enabled
    pub fn can_initiate(&self) -> bool {
        self.state == SessionState::LoggedOut && self.request.is_some()
    }

    /// Applies one event and returns the follow-up work, if any
    pub fn handle(&mut self, event: SessionEvent) -> Option<Command> {
        debug!("{} in state {}", event.name(), self.state.name());

        let state = std::mem::replace(&mut self.state, SessionState::LoggedOut);
        match (state, event) {
            (SessionState::LoggedOut, SessionEvent::Initiate) => match self.request.clone() {
                Some(request) => {
                    info!("Starting Discord login");
                    self.state = SessionState::AuthorizationPending;
                    Some(Command::PromptConsent(request))
                }
                None => {
                    warn!("Login requested but client registration is incomplete");
                    None
                }
            },

            (SessionState::AuthorizationPending, SessionEvent::ConsentCompleted(outcome)) => match outcome {
                ConsentOutcome::Success { code } => self.begin_exchange(code),
                ConsentOutcome::Cancelled => {
                    info!("Login cancelled by user");
                    self.enter_logged_out();
                    None
                }
                ConsentOutcome::Error(message) => {
                    error!("Consent step failed: {}", message);
                    self.enter_logged_out();
                    None
                }
            },

            (SessionState::Exchanging, SessionEvent::ExchangeSucceeded { access_token }) => {
                if access_token.is_empty() {
                    error!("Token exchange returned an empty access token");
                    self.enter_logged_out();
                    return None;
                }
                self.state = SessionState::FetchingProfile {
                    access_token: access_token.clone(),
                };
                Some(Command::FetchProfile { access_token })
            }

            (SessionState::Exchanging, SessionEvent::ExchangeFailed(e)) => {
                error!("Failed to exchange authorization code: {}", e);
                self.enter_logged_out();
                None
            }

            (SessionState::FetchingProfile { access_token }, SessionEvent::ProfileFetched(user)) => {
                let session = Session { access_token, user };
                match self.store.save(&session) {
                    Ok(()) => {
                        info!("Logged in as {}", session.user.username);
                        self.state = SessionState::LoggedIn(session);
                    }
                    Err(e) => {
                        error!("Failed to persist session: {}", e);
                        self.enter_logged_out();
                    }
                }
                None
            }

            (SessionState::FetchingProfile { .. }, SessionEvent::ProfileFailed(e)) => {
                error!("Failed to fetch user profile: {}", e);
                self.enter_logged_out();
                None
            }

            (SessionState::LoggedIn(session), SessionEvent::Logout) => {
                if let Err(e) = self.store.clear() {
                    error!("Failed to clear stored session: {}", e);
                }
                info!("Logged out {}", session.user.username);
                self.enter_logged_out();
                None
            }

            (state, event) => {
                warn!("Ignoring {} in state {}", event.name(), state.name());
                self.state = state;
                None
            }
        }
    }

    /// Runs events and their commands until the state machine is stable again
    pub async fn drive(
        &mut self,
        event: SessionEvent,
        provider: &dyn IdentityProvider,
        consent: &dyn ConsentPrompt,
    ) -> &SessionState {
        let mut next = self.handle(event);
        while let Some(command) = next {
            let event = execute(command, provider, consent).await;
            next = self.handle(event);
        }
        &self.state
    }

    fn begin_exchange(&mut self, code: String) -> Option<Command> {
        // The request is spent whatever the exchange result
        let Some(request) = self.request.take() else {
            error!("Authorization code received without a pending request");
            self.enter_logged_out();
            return None;
        };
        if code.is_empty() {
            error!("Consent returned an empty authorization code");
            self.enter_logged_out();
            return None;
        }

        self.state = SessionState::Exchanging;
        Some(Command::ExchangeCode(CodeGrant {
            code,
            code_verifier: request.code_verifier,
            redirect_uri: request.redirect_uri,
        }))
    }

    fn enter_logged_out(&mut self) {
        self.state = SessionState::LoggedOut;
        self.request = if self.registration.is_complete() {
            Some(self.registration.new_request())
        } else {
            None
        };
    }
}

/// Runs one command against the provider and reports its result as an event
pub async fn execute(
    command: Command,
    provider: &dyn IdentityProvider,
    consent: &dyn ConsentPrompt,
) -> SessionEvent {
    match command {
        Command::PromptConsent(request) => SessionEvent::ConsentCompleted(consent.prompt(&request).await),
        Command::ExchangeCode(grant) => match provider.exchange_code(&grant).await {
            Ok(access_token) => SessionEvent::ExchangeSucceeded { access_token },
            Err(e) => SessionEvent::ExchangeFailed(e),
        },
        Command::FetchProfile { access_token } => match provider.fetch_profile(&access_token).await {
            Ok(profile) => SessionEvent::ProfileFetched(profile),
            Err(e) => SessionEvent::ProfileFailed(e),
        },
    }
}
