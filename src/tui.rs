//! TUI (Terminal User Interface) module for the Witty Guessing Game
//!
//! This module provides an interactive terminal interface using Ratatui.
//!
//! # Architecture
//! - `GuessInput`: the single-line numeric text field and its key handling
//! - `TuiInterface`: rendering and the event loop behind `GameInterface`
//!
//! # Screen flow
//! The screen follows the game flags: typing a guess, waiting on commentary
//! while loading, and after a correct guess ENTER starts a new game.

use crate::game_state::{GameInterface, GameState, UserAction};
use crate::{debug_log, info_log};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use std::io;
use std::time::Duration;

const MAX_INPUT_DIGITS: usize = 3;
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

// Style constants for consistent UI
const HEADER_STYLE: Style = Style::new().fg(Color::Cyan).add_modifier(Modifier::BOLD);
const ERROR_STYLE: Style = Style::new().fg(Color::Red);
const SUCCESS_STYLE: Style = Style::new().fg(Color::Green).add_modifier(Modifier::BOLD);
const INFO_STYLE: Style = Style::new().fg(Color::Yellow).add_modifier(Modifier::BOLD);
const MESSAGE_STYLE: Style = Style::new().fg(Color::Cyan);
const COMMENTARY_STYLE: Style = Style::new().fg(Color::Magenta).add_modifier(Modifier::ITALIC);

/// The numeric text field. Accepts ASCII digits only, like a number input.
#[derive(Debug, Default)]
pub struct GuessInput {
    text: String,
    error_message: String,
}

impl GuessInput {
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.error_message.clear();
    }

    /// Applies one key press. Returns an action when the key completes one.
    pub fn handle_key(&mut self, key: KeyEvent, is_over: bool) -> Option<UserAction> {
        self.error_message.clear();

        if key.code == KeyCode::Esc {
            return Some(UserAction::Exit);
        }
        if key.modifiers.contains(KeyModifiers::ALT) || key.modifiers.contains(KeyModifiers::CONTROL) {
            debug_log!("handle_key() - Ignoring key with modifier: {:?}", key.modifiers);
            return None;
        }

        if is_over {
            return match key.code {
                KeyCode::Enter | KeyCode::Char('n' | 'N') => Some(UserAction::NewGame),
                _ => None,
            };
        }

        match key.code {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                if self.text.len() < MAX_INPUT_DIGITS {
                    self.text.push(c);
                }
                None
            }
            KeyCode::Char(c) => {
                self.error_message = format!("Only digits are allowed! ('{c}' is not a digit)");
                None
            }
            KeyCode::Backspace => {
                self.text.pop();
                None
            }
            KeyCode::Enter => Some(UserAction::Guess(std::mem::take(&mut self.text))),
            _ => None,
        }
    }
}

/// Pulls events from `next_queued` until it reports none left, dropping them.
///
/// Returns how many were discarded.
fn discard_queued<E, F>(mut next_queued: F) -> io::Result<usize>
where
    F: FnMut() -> io::Result<Option<E>>,
{
    let mut discarded = 0;
    while next_queued()?.is_some() {
        discarded += 1;
    }
    Ok(discarded)
}

fn next_queued_event() -> io::Result<Option<Event>> {
    if event::poll(Duration::ZERO)? {
        event::read().map(Some)
    } else {
        Ok(None)
    }
}

/// Context for rendering the UI - groups related parameters to avoid too many function arguments.
struct RenderContext<'a> {
    state: &'a GameState,
    input: &'a GuessInput,
}

/// Main TUI interface component.
///
/// Manages terminal rendering, input handling, and game state display.
pub struct TuiInterface {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    input: GuessInput,
}

impl TuiInterface {
    pub fn new() -> Result<Self, io::Error> {
        info_log!("TuiInterface::new() - Initializing TUI");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, cursor::Hide)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        info_log!("Terminal setup complete");

        Ok(Self {
            terminal,
            input: GuessInput::default(),
        })
    }

    pub fn cleanup(&mut self) -> Result<(), io::Error> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)?;
        Ok(())
    }

    fn draw(&mut self, state: &GameState) -> Result<(), io::Error> {
        let ctx = RenderContext {
            state,
            input: &self.input,
        };
        self.terminal.draw(|f| Self::render_static(f, &ctx))?;
        Ok(())
    }

    fn draw_or_log(&mut self, state: &GameState) {
        if let Err(e) = self.draw(state) {
            debug_log!("Draw error: {}", e);
        }
    }

    fn render_static(f: &mut Frame, ctx: &RenderContext) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4), // Title + subtitle
                Constraint::Length(3), // Input
                Constraint::Min(6),    // Feedback panel
                Constraint::Length(3), // Attempts
                Constraint::Length(3), // Instructions
            ])
            .split(f.area());

        Self::render_title(f, chunks[0]);
        Self::render_input(f, chunks[1], ctx.state, ctx.input);
        Self::render_feedback(f, chunks[2], ctx.state, ctx.input.error_message());
        Self::render_attempts(f, chunks[3], ctx.state);
        Self::render_instructions(f, chunks[4], ctx.state);
    }

    fn render_title(f: &mut Frame, area: Rect) {
        let lines = vec![
            Line::from(Span::styled("The Witty Guessing Game", HEADER_STYLE)),
            Line::from("I'm thinking of a number between 1 and 100."),
        ];
        let title = Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
        f.render_widget(title, area);
    }

    fn render_input(f: &mut Frame, area: Rect, state: &GameState, input: &GuessInput) {
        let disabled = state.is_over() || state.is_loading();
        let (text, style) = if state.is_loading() {
            (state.pending_guess().to_string(), Style::default().fg(Color::DarkGray))
        } else if disabled {
            (String::new(), Style::default().fg(Color::DarkGray))
        } else if input.text().is_empty() {
            ("Your guess...".to_string(), Style::default().fg(Color::DarkGray))
        } else {
            (format!("{}_", input.text()), Style::default().fg(Color::White))
        };

        let paragraph = Paragraph::new(text)
            .style(style)
            .block(Block::default().title("Guess").borders(Borders::ALL));
        f.render_widget(paragraph, area);
    }

    fn render_feedback(f: &mut Frame, area: Rect, state: &GameState, error_message: &str) {
        let mut lines = Vec::new();

        if !state.status_message().is_empty() {
            let style = if state.is_over() { SUCCESS_STYLE } else { MESSAGE_STYLE };
            lines.push(Line::from(Span::styled(state.status_message(), style)));
            lines.push(Line::from(""));
        }

        if state.is_loading() {
            lines.push(Line::from(Span::styled("Thinking...", INFO_STYLE)));
        } else if !state.commentary().is_empty() {
            lines.push(Line::from(Span::styled(state.commentary(), COMMENTARY_STYLE)));
        }

        if !error_message.is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(error_message, ERROR_STYLE)));
        }

        let paragraph = Paragraph::new(lines)
            .block(Block::default().title("Feedback").borders(Borders::ALL))
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
    }

    fn render_attempts(f: &mut Frame, area: Rect, state: &GameState) {
        let line = Line::from(vec![
            Span::raw("Attempts: "),
            Span::styled(state.attempts().to_string(), HEADER_STYLE),
        ]);
        let paragraph = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        f.render_widget(paragraph, area);
    }

    fn render_instructions(f: &mut Frame, area: Rect, state: &GameState) {
        let text = if state.is_loading() {
            "Waiting for the host..."
        } else if state.is_over() {
            "ENTER: Play Again | ESC: Quit"
        } else {
            "Type a number | ENTER: Guess | ESC: Quit"
        };

        let paragraph = Paragraph::new(text)
            .style(Style::default().fg(Color::Gray))
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(paragraph, area);
    }

    fn handle_input(&mut self, state: &GameState) -> Result<Option<UserAction>, io::Error> {
        if !event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            return Ok(None);
        }

        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                debug_log!("handle_input() - Key event: {:?}", key.code);
                Ok(self.input.handle_key(key, state.is_over()))
            }
            other => {
                debug_log!("handle_input() - Ignoring event: {:?}", other);
                Ok(None)
            }
        }
    }
}

impl GameInterface for TuiInterface {
    fn display_new_game(&mut self, state: &GameState) {
        self.input.clear();
        self.draw_or_log(state);
    }

    fn read_action(&mut self, state: &GameState) -> Option<UserAction> {
        loop {
            if self.draw(state).is_err() {
                info_log!("read_action() - Draw failed, returning Exit");
                return Some(UserAction::Exit);
            }

            match self.handle_input(state) {
                Ok(Some(action)) => {
                    info_log!("read_action() - Action received: {:?}", action);
                    return Some(action);
                }
                Ok(None) => {}
                Err(e) => {
                    log::warn!("Error reading terminal input: {e}");
                    return Some(UserAction::Exit);
                }
            }
        }
    }

    fn display_loading(&mut self, state: &GameState) {
        self.draw_or_log(state);
    }

    fn display_result(&mut self, state: &GameState) {
        // Keys pressed while loading were queued by the terminal; drop them.
        match discard_queued(next_queued_event) {
            Ok(discarded) => {
                debug_log!("display_result() - Discarded {} queued events", discarded);
            }
            Err(e) => {
                debug_log!("display_result() - Failed to discard queued events: {}", e);
            }
        }
        self.draw_or_log(state);
    }

    fn display_exit_message(&mut self) {
        info_log!("TuiInterface - Exiting");
    }
}

impl Drop for TuiInterface {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}
