//! Authleiber TUI - Discord login screen
//!
//! This is the main entry point for the TUI application.
//! It loads the config, restores any stored session, sets up the terminal
//! and runs the event loop.

mod app;
mod event;
mod ui;

use anyhow::{Context, Result};
use app::App;
use common::config::{Config, StorageConfig, StoreBackend};
use common::platform;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use oauth::flow::make_redirect_uri;
use oauth::{
    BrowserConsent, ClientRegistration, DiscordProvider, FileStore, KeyValueStore, KeyringStore, MemoryStore,
    SessionController, SessionStore,
};
use ratatui::prelude::*;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn, Level};

/// Creates the log file and its directory
fn prepare_log_file(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    Ok(())
}

/// Initialize logging to file (not stdout, since we're using the terminal)
fn init_logging(config: &Config) {
    let level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let path: PathBuf = config.logging.file.clone().unwrap_or_else(platform::get_log_path);
    // Raw mode is not on yet, so stderr still reaches the user
    if let Err(e) = prepare_log_file(&path) {
        eprintln!("authleiber: logging disabled, cannot open {}: {}", path.display(), e);
    }

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .with_writer(move || -> Box<dyn Write> {
            match std::fs::OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => Box::new(file),
                Err(_) => Box::new(io::sink()),
            }
        })
        .init();
}

/// Opens the configured session backend
fn open_backend(storage: &StorageConfig) -> oauth::Result<Box<dyn KeyValueStore>> {
    let backend: Box<dyn KeyValueStore> = match storage.backend {
        StoreBackend::File => match &storage.path {
            Some(path) => Box::new(FileStore::at(path)?),
            None => Box::new(FileStore::new()?),
        },
        StoreBackend::Keyring => {
            if cfg!(not(feature = "keyring-native")) {
                warn!("Built without keyring-native, only keyring's mock backend is available");
            }
            Box::new(KeyringStore::open()?)
        }
        StoreBackend::Memory => Box::new(MemoryStore::new()),
    };
    Ok(backend)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_logging(&config);
    info!("Authleiber starting on {}", platform::get_os_name());

    let discord = &config.discord;
    let registration = ClientRegistration::new(
        discord.client_id.clone(),
        make_redirect_uri(&discord.redirect_scheme, discord.callback_port),
    )
    .with_scopes(discord.scopes.iter().cloned());

    let backend = match open_backend(&config.storage) {
        Ok(backend) => backend,
        Err(e) => {
            error!("Session store unavailable, falling back to memory: {}", e);
            Box::new(MemoryStore::new())
        }
    };

    let mut controller = SessionController::new(registration, SessionStore::from_boxed(backend));
    controller.restore();

    let provider = Arc::new(DiscordProvider::new(discord.client_id.clone(), discord.client_secret.clone()));
    let consent = Arc::new(BrowserConsent::new());
    let (tx, rx) = event::create_channel();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(controller, provider, consent, tx, discord.has_credentials());
    let result = app.run(&mut terminal, rx).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        error!("TUI exited with error: {:?}", err);
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }

    info!("Authleiber exited");
    Ok(())
}
