//! UI rendering functions
//!
//! This module contains all the Ratatui rendering logic for the TUI.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::border,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, InputMode, LogLevel, LoginField, Screen};

/// Discord blurple
const ACCENT_COLOR: Color = Color::Rgb(0x58, 0x65, 0xF2);
const SUCCESS_COLOR: Color = Color::Green;
const WARNING_COLOR: Color = Color::Yellow;
const MUTED_COLOR: Color = Color::DarkGray;

/// Render the entire UI
pub fn render(frame: &mut Frame, app: &App) {
    // Main layout: Header, Content, Logs, Footer
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Header
            Constraint::Min(12),    // Login form or profile
            Constraint::Length(7),  // Logs
            Constraint::Length(3),  // Help footer
        ])
        .split(frame.area());

    let screen = app.screen();

    render_header(frame, &screen, chunks[0]);
    match &screen {
        Screen::Login {
            username,
            password,
            focus,
            login_enabled,
        } => render_login(frame, username, password, *focus, *login_enabled, chunks[1]),
        Screen::Pending { status } => render_pending(frame, status, chunks[1]),
        Screen::Profile { username, avatar_url } => render_profile(frame, username, avatar_url, chunks[1]),
    }
    render_logs(frame, app, chunks[2]);
    render_footer(frame, &screen, chunks[3]);

    if app.input_mode == InputMode::Help {
        render_help_overlay(frame);
    }
}

/// Render the header with session status
fn render_header(frame: &mut Frame, screen: &Screen, area: Rect) {
    let (status_text, status_color) = match screen {
        Screen::Login { .. } => ("● Logged out", MUTED_COLOR),
        Screen::Pending { .. } => ("◐ Signing in...", WARNING_COLOR),
        Screen::Profile { .. } => ("● Logged in", SUCCESS_COLOR),
    };

    let header = Paragraph::new(Line::from(vec![
        Span::raw("  Status: "),
        Span::styled(status_text, Style::default().fg(status_color).add_modifier(Modifier::BOLD)),
    ]))
    .block(
        Block::default()
            .title(format!(" Authleiber v{} ", env!("CARGO_PKG_VERSION")))
            .title_style(Style::default().fg(ACCENT_COLOR).add_modifier(Modifier::BOLD))
            .borders(Borders::ALL)
            .border_set(border::ROUNDED)
            .border_style(Style::default().fg(ACCENT_COLOR)),
    );

    frame.render_widget(header, area);
}

/// Render one labelled text field
fn input_line<'a>(label: &'a str, value: String, focused: bool) -> Line<'a> {
    let value_style = if focused {
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    let mut spans = vec![
        Span::styled(format!("  {:<10}", label), Style::default().fg(ACCENT_COLOR)),
        Span::styled("[ ", Style::default().fg(ACCENT_COLOR)),
        Span::styled(value, value_style),
    ];
    if focused {
        spans.push(Span::styled("_", Style::default().fg(ACCENT_COLOR).add_modifier(Modifier::SLOW_BLINK)));
    }
    spans.push(Span::styled(" ]", Style::default().fg(ACCENT_COLOR)));
    Line::from(spans)
}

/// Render the login form
fn render_login(
    frame: &mut Frame,
    username: &str,
    password: &str,
    focus: LoginField,
    login_enabled: bool,
    area: Rect,
) {
    let button_style = if login_enabled {
        Style::default().fg(Color::White).bg(ACCENT_COLOR).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(MUTED_COLOR)
    };

    let text = vec![
        Line::from(""),
        input_line("Username", username.to_string(), focus == LoginField::Username),
        Line::from(""),
        input_line("Password", "*".repeat(password.chars().count()), focus == LoginField::Password),
        Line::from(""),
        Line::from(""),
        Line::from(Span::styled("  ◆ Continue with Discord  ", button_style)).alignment(Alignment::Center),
    ];

    let form = Paragraph::new(text).block(
        Block::default()
            .title(" Login ")
            .title_style(Style::default().fg(Color::White))
            .borders(Borders::ALL)
            .border_set(border::ROUNDED)
            .border_style(Style::default().fg(MUTED_COLOR)),
    );

    frame.render_widget(form, area);
}

/// Render the in-flight login status
fn render_pending(frame: &mut Frame, status: &str, area: Rect) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled(status, Style::default().fg(WARNING_COLOR).add_modifier(Modifier::BOLD))),
        Line::from(""),
        Line::from(Span::styled(
            "Finish signing in from your browser.",
            Style::default().fg(MUTED_COLOR),
        )),
    ];

    let pending = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title(" Login ")
                .borders(Borders::ALL)
                .border_set(border::ROUNDED)
                .border_style(Style::default().fg(WARNING_COLOR)),
        );

    frame.render_widget(pending, area);
}

/// Render the profile view
fn render_profile(frame: &mut Frame, username: &str, avatar_url: &str, area: Rect) {
    let text = vec![
        Line::from(""),
        Line::from(vec![
            Span::raw("  Avatar: "),
            Span::styled(avatar_url, Style::default().fg(MUTED_COLOR)),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::raw("  "),
            Span::styled(username, Style::default().fg(ACCENT_COLOR).add_modifier(Modifier::BOLD)),
        ]),
    ];

    let profile = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(" Profile ")
                .title_style(Style::default().fg(Color::White))
                .title(Line::from(" [L] Logout ").alignment(Alignment::Right))
                .borders(Borders::ALL)
                .border_set(border::ROUNDED)
                .border_style(Style::default().fg(ACCENT_COLOR)),
        );

    frame.render_widget(profile, area);
}

/// Render the log viewer with colored levels
fn render_logs(frame: &mut Frame, app: &App, area: Rect) {
    let visible_height = area.height.saturating_sub(2) as usize;

    let log_lines: Vec<Line> = app
        .logs
        .iter()
        .skip(app.log_scroll)
        .take(visible_height)
        .map(|entry| {
            let (level_icon, level_color) = match entry.level {
                LogLevel::Info => ("•", MUTED_COLOR),
                LogLevel::Success => ("✓", SUCCESS_COLOR),
                LogLevel::Warning => ("⚠", WARNING_COLOR),
            };

            Line::from(vec![
                Span::styled(format!(" [{}] ", entry.timestamp), Style::default().fg(MUTED_COLOR)),
                Span::styled(format!("{} ", level_icon), Style::default().fg(level_color)),
                Span::styled(entry.message.clone(), Style::default().fg(Color::White)),
            ])
        })
        .collect();

    let logs = Paragraph::new(log_lines).block(
        Block::default()
            .title(" Logs ")
            .title_style(Style::default().fg(Color::White))
            .borders(Borders::ALL)
            .border_set(border::ROUNDED)
            .border_style(Style::default().fg(MUTED_COLOR)),
    );

    frame.render_widget(logs, area);
}

/// Render the help footer
fn render_footer(frame: &mut Frame, screen: &Screen, area: Rect) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(ACCENT_COLOR).add_modifier(Modifier::BOLD));

    let help_text = match screen {
        Screen::Login { .. } => Line::from(vec![
            key(" [Tab]"),
            Span::raw(" switch field "),
            key("[Enter]"),
            Span::raw(" continue with Discord "),
            key("[F1]"),
            Span::raw(" help "),
            key("[Esc]"),
            Span::raw(" quit"),
        ]),
        Screen::Pending { .. } => Line::from(vec![
            Span::styled(" Waiting for Discord ", Style::default().fg(WARNING_COLOR)),
            key("[Esc]"),
            Span::raw(" quit"),
        ]),
        Screen::Profile { .. } => Line::from(vec![
            key(" [L]"),
            Span::raw("ogout "),
            key("[?]"),
            Span::raw(" help "),
            key("[Q]"),
            Span::raw("uit"),
        ]),
    };

    let footer = Paragraph::new(help_text).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_set(border::ROUNDED)
            .border_style(Style::default().fg(MUTED_COLOR)),
    );

    frame.render_widget(footer, area);
}

/// Render help overlay
fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect(60, 60, frame.area());

    // Clear the background
    frame.render_widget(Clear, area);

    let entry = |k: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {:<8}", k), Style::default().fg(ACCENT_COLOR)),
            Span::raw(what),
        ])
    };

    let help_text = vec![
        Line::from(""),
        Line::from(Span::styled("  Keybindings", Style::default().fg(ACCENT_COLOR).add_modifier(Modifier::BOLD))),
        Line::from(""),
        entry("Enter", "Continue with Discord (opens browser)"),
        entry("Tab", "Switch between form fields"),
        entry("L", "Log out (profile view)"),
        Line::from(""),
        entry("PgUp/Dn", "Scroll logs"),
        entry("F1", "Show this help"),
        entry("?", "Show this help (profile view)"),
        entry("Esc", "Quit application"),
        Line::from(""),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(" Help ")
                .title_style(Style::default().fg(ACCENT_COLOR).add_modifier(Modifier::BOLD))
                .borders(Borders::ALL)
                .border_set(border::DOUBLE)
                .border_style(Style::default().fg(ACCENT_COLOR)),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(help, area);
}

/// Helper to create a centered rect
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
