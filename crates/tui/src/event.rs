//! Event handling for the TUI
//!
//! Keyboard input and the results of background login work arrive through
//! the same [`AppEvent`] type, so the session controller only ever changes
//! on the main loop.

use crossterm::event::KeyEvent;
use oauth::SessionEvent;
use tokio::sync::mpsc;

/// Event types the app can receive
#[derive(Debug)]
pub enum AppEvent {
    /// Keyboard input
    Key(KeyEvent),
    /// A background login step finished
    Session(SessionEvent),
}

/// Event sender for background tasks
pub type EventSender = mpsc::UnboundedSender<AppEvent>;
/// Event receiver for the main loop
pub type EventReceiver = mpsc::UnboundedReceiver<AppEvent>;

/// Create an event channel
pub fn create_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
