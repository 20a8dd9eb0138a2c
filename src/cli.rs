use crate::feedback::{
    DEFAULT_GEMINI_ENDPOINT, DEFAULT_GEMINI_MODEL, DEFAULT_OLLAMA_ENDPOINT, DEFAULT_OLLAMA_MODEL,
    FeedbackClient, FeedbackError, GeminiConfig, OllamaConfig,
};
use crate::game_state::{GameInterface, GameState, UserAction};
use crate::logging::{LogDestination, default_log_path};
use clap::{Parser, ValueEnum};
use std::io::BufRead;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum InterfaceKind {
    /// Full-screen terminal interface
    Tui,
    /// Line-oriented prompts on stdin/stdout
    Cli,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    Gemini,
    Ollama,
    /// No commentary service; every guess gets the fallback line
    Off,
}

/// The Witty Guessing Game: find a number between 1 and 100
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(long, value_enum, default_value_t = InterfaceKind::Tui)]
    pub interface: InterfaceKind,

    /// Commentary backend
    #[arg(long, value_enum, default_value_t = Backend::Gemini)]
    pub backend: Backend,

    /// Override the backend endpoint URL
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Override the backend model name
    #[arg(long)]
    pub model: Option<String>,

    /// API key for the Gemini backend
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Per-request timeout for commentary, in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Seed for the target number generator
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log file used by the terminal interface
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn feedback_client(&self) -> Result<FeedbackClient, FeedbackError> {
        let timeout = Duration::from_secs(self.timeout_secs);
        match self.backend {
            Backend::Gemini => FeedbackClient::gemini(
                GeminiConfig {
                    endpoint: self
                        .endpoint
                        .clone()
                        .unwrap_or_else(|| DEFAULT_GEMINI_ENDPOINT.to_string()),
                    model: self
                        .model
                        .clone()
                        .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                    api_key: self.api_key.clone().filter(|key| !key.trim().is_empty()),
                },
                timeout,
            ),
            Backend::Ollama => FeedbackClient::ollama(
                OllamaConfig {
                    endpoint: self
                        .endpoint
                        .clone()
                        .unwrap_or_else(|| DEFAULT_OLLAMA_ENDPOINT.to_string()),
                    model: self
                        .model
                        .clone()
                        .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
                },
                timeout,
            ),
            Backend::Off => Ok(FeedbackClient::disabled()),
        }
    }

    /// The terminal interface owns the screen, so it logs to a file.
    #[must_use]
    pub fn log_destination(&self) -> LogDestination {
        match self.interface {
            InterfaceKind::Cli => LogDestination::Stderr,
            InterfaceKind::Tui => self
                .log_file
                .clone()
                .or_else(default_log_path)
                .map_or(LogDestination::Off, LogDestination::File),
        }
    }
}

#[must_use]
pub fn parse_cli() -> Cli {
    Cli::parse()
}

pub fn read_action<R: BufRead>(reader: &mut R, state: &GameState) -> Option<UserAction> {
    if state.is_over() {
        println!("\nPress ENTER (or type 'next') to play again, or 'exit' to quit:");
    } else {
        println!("\nEnter your guess (1-100), or 'exit' to quit:");
    }

    let mut input = String::new();
    match reader.read_line(&mut input) {
        Ok(0) => return Some(UserAction::Exit),
        Ok(_) => {}
        Err(e) => {
            log::warn!("Failed to read input: {e}");
            return Some(UserAction::Exit);
        }
    }
    let input = input.trim();

    match input.to_lowercase().as_str() {
        "exit" => Some(UserAction::Exit),
        "next" => Some(UserAction::NewGame),
        "" if state.is_over() => Some(UserAction::NewGame),
        _ if state.is_over() => {
            println!("The game is over. Press ENTER for a new game.");
            None
        }
        _ => Some(UserAction::Guess(input.to_string())),
    }
}

pub fn display_new_game() {
    println!("The Witty Guessing Game");
    println!("I'm thinking of a number between 1 and 100.");
}

pub fn display_loading() {
    println!("Thinking...");
}

pub fn display_result(state: &GameState) {
    println!("{}", state.status_message());
    if !state.commentary().is_empty() {
        println!("{}", state.commentary());
    }
    println!("Attempts: {}", state.attempts());
}

pub fn display_exit_message() {
    println!("Exiting.");
}

/// CLI implementation of the `GameInterface` trait over any `BufRead`.
pub struct CliInterface<R: BufRead> {
    reader: R,
}

impl<R: BufRead> CliInterface<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> GameInterface for CliInterface<R> {
    fn display_new_game(&mut self, _state: &GameState) {
        display_new_game();
    }

    fn read_action(&mut self, state: &GameState) -> Option<UserAction> {
        read_action(&mut self.reader, state)
    }

    fn display_loading(&mut self, _state: &GameState) {
        display_loading();
    }

    fn display_result(&mut self, state: &GameState) {
        display_result(state);
    }

    fn display_exit_message(&mut self) {
        display_exit_message();
    }
}
