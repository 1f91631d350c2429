//! Application state and update logic

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use oauth::{session, Command, ConsentPrompt, IdentityProvider, SessionController, SessionEvent, SessionState};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::Stdout;
use std::sync::Arc;
use std::time::Duration;

use crate::event::{AppEvent, EventReceiver, EventSender};
use crate::ui;

/// Log entry with level
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: String,
    pub message: String,
    pub level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
}

/// Active input mode
#[derive(Debug, Clone, PartialEq)]
pub enum InputMode {
    Normal,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Username,
    Password,
}

/// The two text fields on the login screen
///
/// They are editable but never sent anywhere: Discord authenticates the
/// user on its own consent page.
#[derive(Debug, Clone)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub focus: LoginField,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            focus: LoginField::Username,
        }
    }
}

impl LoginForm {
    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            LoginField::Username => &mut self.username,
            LoginField::Password => &mut self.password,
        }
    }

    fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            LoginField::Username => LoginField::Password,
            LoginField::Password => LoginField::Username,
        };
    }
}

/// What the main panel shows, derived from the session state
#[derive(Debug, Clone, PartialEq)]
pub enum Screen<'a> {
    Login {
        username: &'a str,
        password: &'a str,
        focus: LoginField,
        login_enabled: bool,
    },
    Pending {
        status: &'static str,
    },
    Profile {
        username: &'a str,
        avatar_url: String,
    },
}

/// Main application state
pub struct App {
    /// Is the application running?
    pub running: bool,
    /// Owner of the login flow
    pub controller: SessionController,
    /// Login form fields
    pub form: LoginForm,
    /// Log buffer
    pub logs: Vec<LogEntry>,
    /// Log scroll position
    pub log_scroll: usize,
    /// Current input mode
    pub input_mode: InputMode,
    /// Client id and secret are configured
    pub credentials_ready: bool,
    provider: Arc<dyn IdentityProvider>,
    consent: Arc<dyn ConsentPrompt>,
    events: EventSender,
}

impl App {
    /// Create a new App instance around an already restored controller
    pub fn new(
        controller: SessionController,
        provider: Arc<dyn IdentityProvider>,
        consent: Arc<dyn ConsentPrompt>,
        events: EventSender,
        credentials_ready: bool,
    ) -> Self {
        let mut app = Self {
            running: true,
            controller,
            form: LoginForm::default(),
            logs: Vec::new(),
            log_scroll: 0,
            input_mode: InputMode::Normal,
            credentials_ready,
            provider,
            consent,
            events,
        };

        app.log_info("Authleiber started");
        match app.controller.session().map(|s| s.user.username.clone()) {
            Some(username) => app.log_success(format!("Restored session for {}", username)),
            None if !app.credentials_ready => {
                app.log_warning("Discord client id/secret not configured; login disabled")
            }
            None => app.log_info("Press [Enter] to continue with Discord"),
        }

        app
    }

    /// Get current timestamp
    fn now() -> String {
        chrono::Local::now().format("%H:%M:%S").to_string()
    }

    /// Add a log entry with level
    fn log_with_level(&mut self, message: impl Into<String>, level: LogLevel) {
        self.logs.push(LogEntry {
            timestamp: Self::now(),
            message: message.into(),
            level,
        });
        // Auto-scroll to bottom (keep last 5 visible)
        if self.logs.len() > 5 {
            self.log_scroll = self.logs.len().saturating_sub(5);
        }
    }

    pub fn log_info(&mut self, message: impl Into<String>) {
        self.log_with_level(message, LogLevel::Info);
    }

    pub fn log_success(&mut self, message: impl Into<String>) {
        self.log_with_level(message, LogLevel::Success);
    }

    pub fn log_warning(&mut self, message: impl Into<String>) {
        self.log_with_level(message, LogLevel::Warning);
    }

    /// Whether the login button accepts presses
    pub fn login_enabled(&self) -> bool {
        self.credentials_ready && self.controller.can_initiate()
    }

    pub fn screen(&self) -> Screen<'_> {
        match self.controller.state() {
            SessionState::LoggedOut => Screen::Login {
                username: &self.form.username,
                password: &self.form.password,
                focus: self.form.focus,
                login_enabled: self.login_enabled(),
            },
            SessionState::AuthorizationPending => Screen::Pending {
                status: "Waiting for Discord authorization...",
            },
            SessionState::Exchanging => Screen::Pending {
                status: "Exchanging authorization code...",
            },
            SessionState::FetchingProfile { .. } => Screen::Pending {
                status: "Fetching profile...",
            },
            SessionState::LoggedIn(session) => Screen::Profile {
                username: &session.user.username,
                avatar_url: session.user.avatar_url(),
            },
        }
    }

    /// Run the main event loop
    pub async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
        mut events: EventReceiver,
    ) -> Result<()> {
        let tick_rate = Duration::from_millis(100);

        while self.running {
            // Draw UI
            terminal.draw(|frame| ui::render(frame, self))?;

            if event::poll(tick_rate)? {
                if let Event::Key(key) = event::read()? {
                    // Only handle key press events (not release)
                    if key.kind == KeyEventKind::Press {
                        self.handle_event(AppEvent::Key(key));
                    }
                }
            }

            // Results from background login steps
            while let Ok(event) = events.try_recv() {
                self.handle_event(event);
            }
        }

        Ok(())
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Session(event) => self.dispatch(event),
        }
    }

    /// Feeds one event to the controller and runs whatever it asks for
    fn dispatch(&mut self, event: SessionEvent) {
        let was_pending = !self.controller.state().is_stable();

        if let Some(command) = self.controller.handle(event) {
            self.spawn(command);
        }

        match self.controller.state() {
            SessionState::LoggedIn(session) if was_pending => {
                let message = format!("Logged in as {}", session.user.username);
                self.form = LoginForm::default();
                self.log_success(message);
            }
            SessionState::LoggedOut if was_pending => self.log_warning("Login did not complete"),
            SessionState::Exchanging => self.log_info("Authorization received"),
            _ => {}
        }
    }

    /// Runs a controller command in the background; its result comes back as an event
    fn spawn(&self, command: Command) {
        let provider = Arc::clone(&self.provider);
        let consent = Arc::clone(&self.consent);
        let events = self.events.clone();

        tokio::spawn(async move {
            let event = session::execute(command, provider.as_ref(), consent.as_ref()).await;
            let _ = events.send(AppEvent::Session(event));
        });
    }

    /// Handle keyboard input
    fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.quit();
            return;
        }

        if self.input_mode == InputMode::Help {
            // Any key exits help
            self.input_mode = InputMode::Normal;
            return;
        }

        match key.code {
            KeyCode::Esc => self.quit(),
            KeyCode::F(1) => self.input_mode = InputMode::Help,
            KeyCode::PageUp => {
                self.log_scroll = self.log_scroll.saturating_sub(1);
            }
            KeyCode::PageDown => {
                if self.log_scroll < self.logs.len().saturating_sub(1) {
                    self.log_scroll += 1;
                }
            }
            code => match self.controller.state() {
                SessionState::LoggedOut => self.handle_login_key(code),
                SessionState::LoggedIn(_) => self.handle_profile_key(code),
                _ => {}
            },
        }
    }

    /// Keys on the login form
    fn handle_login_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => self.form.toggle_focus(),
            KeyCode::Backspace => {
                self.form.focused_mut().pop();
            }
            KeyCode::Char(c) => self.form.focused_mut().push(c),
            KeyCode::Enter => {
                if self.login_enabled() {
                    self.log_info("Opening Discord in your browser...");
                    self.dispatch(SessionEvent::Initiate);
                } else {
                    self.log_warning("Login is not available yet");
                }
            }
            _ => {}
        }
    }

    /// Keys on the profile view
    fn handle_profile_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('l') | KeyCode::Char('L') => {
                self.dispatch(SessionEvent::Logout);
                self.log_info("Logged out");
            }
            KeyCode::Char('q') | KeyCode::Char('Q') => self.quit(),
            KeyCode::Char('?') => self.input_mode = InputMode::Help,
            _ => {}
        }
    }

    fn quit(&mut self) {
        self.log_info("Shutting down...");
        self.running = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::create_channel;
    use async_trait::async_trait;
    use oauth::{
        AuthError, AuthorizationRequest, ClientRegistration, CodeGrant, ConsentOutcome, KeyValueStore, MemoryStore,
        Profile, SessionStore,
    };
    use ratatui::backend::TestBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl IdentityProvider for CountingProvider {
        async fn exchange_code(&self, grant: &CodeGrant) -> oauth::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if grant.code == "xyz" {
                Ok("tok1".into())
            } else {
                Err(AuthError::Rejected {
                    status: 400,
                    error: "invalid_grant".into(),
                    description: None,
                })
            }
        }

        async fn fetch_profile(&self, access_token: &str) -> oauth::Result<Profile> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(access_token, "tok1");
            Ok(Profile::new("2", "alice"))
        }
    }

    struct CodeConsent(&'static str);

    #[async_trait]
    impl ConsentPrompt for CodeConsent {
        async fn prompt(&self, _request: &AuthorizationRequest) -> ConsentOutcome {
            ConsentOutcome::Success { code: self.0.into() }
        }
    }

    fn app_with(backend: MemoryStore, client_id: &str) -> (App, Arc<CountingProvider>, EventReceiver) {
        let registration = ClientRegistration::new(client_id, "http://127.0.0.1:53134/authleiber");
        let mut controller = SessionController::new(registration, SessionStore::new(backend));
        controller.restore();

        let provider = Arc::new(CountingProvider::default());
        let (tx, rx) = create_channel();
        let app = App::new(
            controller,
            provider.clone(),
            Arc::new(CodeConsent("xyz")),
            tx,
            !client_id.is_empty(),
        );
        (app, provider, rx)
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn bob_store() -> MemoryStore {
        let backend = MemoryStore::new();
        backend.set("access_token", "abc").unwrap();
        backend.set("user", r#"{"id":"1","username":"bob"}"#).unwrap();
        backend
    }

    fn rendered_text(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        terminal.draw(|frame| ui::render(frame, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    /// Feeds background results back until the flow settles
    async fn settle(app: &mut App, rx: &mut EventReceiver) {
        while !app.controller.state().is_stable() {
            let event = rx.recv().await.expect("background task reports back");
            app.handle_event(event);
        }
    }

    #[test]
    fn stored_session_launches_into_profile() {
        let (app, provider, _rx) = app_with(bob_store(), "client-123");

        match app.screen() {
            Screen::Profile { username, avatar_url } => {
                assert_eq!(username, "bob");
                assert_eq!(avatar_url, oauth::constants::DEFAULT_AVATAR_URL);
            }
            other => panic!("expected profile, got {:?}", other),
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert!(rendered_text(&app).contains("bob"));
    }

    #[test]
    fn empty_store_launches_into_login_form() {
        let (app, _provider, _rx) = app_with(MemoryStore::new(), "client-123");

        assert_eq!(
            app.screen(),
            Screen::Login {
                username: "",
                password: "",
                focus: LoginField::Username,
                login_enabled: true,
            }
        );
        assert!(rendered_text(&app).contains("Continue with Discord"));
    }

    #[test]
    fn login_button_disabled_without_client_id() {
        let (mut app, _provider, _rx) = app_with(MemoryStore::new(), "");

        assert!(matches!(app.screen(), Screen::Login { login_enabled: false, .. }));
        app.handle_event(key(KeyCode::Enter));
        assert_eq!(app.controller.state(), &SessionState::LoggedOut);
    }

    #[test]
    fn typing_fills_focused_field() {
        let (mut app, _provider, _rx) = app_with(MemoryStore::new(), "client-123");

        app.handle_event(key(KeyCode::Char('b')));
        app.handle_event(key(KeyCode::Char('o')));
        app.handle_event(key(KeyCode::Tab));
        app.handle_event(key(KeyCode::Char('x')));
        app.handle_event(key(KeyCode::Backspace));
        app.handle_event(key(KeyCode::Char('y')));

        assert_eq!(app.form.username, "bo");
        assert_eq!(app.form.password, "y");
        // Password is masked on screen
        let text = rendered_text(&app);
        assert!(text.contains("[ bo ]"));
        assert!(text.contains("[ *_ ]"));
    }

    #[tokio::test]
    async fn enter_runs_login_to_profile() {
        let (mut app, provider, mut rx) = app_with(MemoryStore::new(), "client-123");

        app.handle_event(key(KeyCode::Enter));
        assert!(matches!(app.screen(), Screen::Pending { .. }));
        assert!(!app.login_enabled());

        settle(&mut app, &mut rx).await;

        assert!(matches!(app.screen(), Screen::Profile { username: "alice", .. }));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        let stored = app.controller.store().load().unwrap().unwrap();
        assert_eq!(stored.access_token, "tok1");
        assert_eq!(stored.user.username, "alice");
    }

    #[test]
    fn logout_key_clears_session() {
        let (mut app, _provider, _rx) = app_with(bob_store(), "client-123");

        app.handle_event(key(KeyCode::Char('l')));

        assert!(matches!(app.screen(), Screen::Login { .. }));
        assert_eq!(app.controller.store().load().unwrap(), None);
        assert_eq!(app.controller.store().backend().get("access_token").unwrap(), None);
        assert_eq!(app.controller.store().backend().get("user").unwrap(), None);
    }

    #[test]
    fn question_mark_on_login_form_is_typed() {
        let (mut app, _provider, _rx) = app_with(MemoryStore::new(), "client-123");

        app.handle_event(key(KeyCode::Char('?')));
        assert_eq!(app.form.username, "?");
        assert_eq!(app.input_mode, InputMode::Normal);

        app.handle_event(key(KeyCode::F(1)));
        assert_eq!(app.input_mode, InputMode::Help);
        let text = rendered_text(&app);
        assert!(!text.contains("F1/?"));
        assert!(text.contains("(profile view)"));
    }

    #[test]
    fn escape_quits() {
        let (mut app, _provider, _rx) = app_with(MemoryStore::new(), "client-123");
        app.handle_event(key(KeyCode::Esc));
        assert!(!app.running);
    }
}
