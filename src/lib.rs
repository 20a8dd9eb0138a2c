// Library interface for witty-guess
// This allows integration tests to access internal modules

pub mod cli;
pub mod feedback;
pub mod game_state;
pub mod logging;
pub mod tui;

// Re-export commonly used items for easier testing
pub use feedback::{FeedbackClient, FeedbackError, FeedbackRequest, FeedbackService};
pub use game_state::{
    FALLBACK_COMMENTARY, Game, GameInterface, GameState, INVALID_INPUT_MESSAGE, InputError,
    Outcome, Submission, UserAction, game_loop,
};
