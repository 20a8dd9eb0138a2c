use crate::feedback::{FeedbackRequest, FeedbackService};
use crate::{debug_log, info_log};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Deref, DerefMut};

pub const MIN_GUESS: u32 = 1;
pub const MAX_GUESS: u32 = 100;

pub const INVALID_INPUT_MESSAGE: &str = "Please enter a number between 1 and 100.";
pub const FALLBACK_COMMENTARY: &str = "My circuits are buzzing... try another guess!";

/// Where a guess landed relative to the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    High,
    Low,
    Correct,
}

impl Outcome {
    #[must_use]
    pub fn classify(guess: u32, target: u32) -> Self {
        match guess.cmp(&target) {
            Ordering::Greater => Self::High,
            Ordering::Less => Self::Low,
            Ordering::Equal => Self::Correct,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Low => "low",
            Self::Correct => "correct",
        }
    }

    fn status_message(self, attempts: u32) -> String {
        match self {
            Self::High => "Too high! Try a lower number.".to_string(),
            Self::Low => "Too low! Try a higher number.".to_string(),
            Self::Correct => format!("You got it in {attempts} attempts!"),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("'{0}' is not a whole number")]
    NotANumber(String),
    #[error("{0} is outside the range 1-100")]
    OutOfRange(i64),
}

/// Parses the text field content into a guess in `1..=100`.
pub fn parse_guess(text: &str) -> Result<u32, InputError> {
    let trimmed = text.trim();
    let value: i64 = trimmed
        .parse()
        .map_err(|_| InputError::NotANumber(trimmed.to_string()))?;
    u32::try_from(value)
        .ok()
        .filter(|guess| (MIN_GUESS..=MAX_GUESS).contains(guess))
        .ok_or(InputError::OutOfRange(value))
}

/// Everything a surface needs to render one game.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameState {
    target: u32,
    attempts: u32,
    is_over: bool,
    pending_guess: String,
    outcome: Option<Outcome>,
    status_message: String,
    commentary: String,
    is_loading: bool,
}

impl GameState {
    fn new(target: u32) -> Self {
        Self {
            target,
            attempts: 0,
            is_over: false,
            pending_guess: String::new(),
            outcome: None,
            status_message: String::new(),
            commentary: String::new(),
            is_loading: false,
        }
    }

    #[must_use]
    pub fn target(&self) -> u32 {
        self.target
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn is_over(&self) -> bool {
        self.is_over
    }

    #[must_use]
    pub fn pending_guess(&self) -> &str {
        &self.pending_guess
    }

    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    #[must_use]
    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    #[must_use]
    pub fn commentary(&self) -> &str {
        &self.commentary
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }
}

/// Holds the loading flag for as long as it lives.
///
/// Dropping it, on any path including a cancelled await, clears the flag and
/// the pending guess text.
struct Loading<'a> {
    state: &'a mut GameState,
}

impl<'a> Loading<'a> {
    fn enter(state: &'a mut GameState) -> Self {
        state.is_loading = true;
        Self { state }
    }
}

impl Deref for Loading<'_> {
    type Target = GameState;

    fn deref(&self) -> &GameState {
        self.state
    }
}

impl DerefMut for Loading<'_> {
    fn deref_mut(&mut self) -> &mut GameState {
        self.state
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.state.is_loading = false;
        self.state.pending_guess.clear();
    }
}

/// Result of one `submit_guess` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Submission {
    Evaluated(Outcome),
    Rejected(InputError),
    /// The game is already over; only a new game can follow.
    Ignored,
}

/// Game state controller: the only owner and mutator of `GameState`.
pub struct Game {
    state: GameState,
    rng: StdRng,
}

impl Game {
    #[must_use]
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    /// Builds a game around a known target in `1..=100`.
    pub fn with_target(target: u32) -> Result<Self, InputError> {
        if !(MIN_GUESS..=MAX_GUESS).contains(&target) {
            return Err(InputError::OutOfRange(i64::from(target)));
        }
        Ok(Self {
            state: GameState::new(target),
            rng: StdRng::seed_from_u64(u64::from(target)),
        })
    }

    fn from_rng(mut rng: StdRng) -> Self {
        let target = rng.random_range(MIN_GUESS..=MAX_GUESS);
        Self {
            state: GameState::new(target),
            rng,
        }
    }

    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Replaces the current game with a fresh one.
    pub fn start_game(&mut self) {
        let target = self.rng.random_range(MIN_GUESS..=MAX_GUESS);
        self.state = GameState::new(target);
        info_log!("start_game() - New target drawn");
    }

    /// Validates and scores `text`, then asks `service` for commentary.
    ///
    /// `on_loading` runs once, after the outcome is decided and while the
    /// feedback request is outstanding.
    pub async fn submit_guess<S, F>(&mut self, text: &str, service: &S, on_loading: F) -> Submission
    where
        S: FeedbackService,
        F: FnOnce(&GameState),
    {
        if self.state.is_over {
            debug_log!("submit_guess() - Game over, ignoring '{}'", text);
            return Submission::Ignored;
        }
        self.state.pending_guess.clear();
        self.state.pending_guess.push_str(text);

        let guess = match parse_guess(text) {
            Ok(guess) => guess,
            Err(err) => {
                info_log!("submit_guess() - Rejected input: {}", err);
                self.state.status_message = INVALID_INPUT_MESSAGE.to_string();
                self.state.commentary.clear();
                return Submission::Rejected(err);
            }
        };

        self.state.attempts = self.state.attempts.saturating_add(1);
        let outcome = Outcome::classify(guess, self.state.target);
        self.state.outcome = Some(outcome);
        self.state.is_over = outcome == Outcome::Correct;
        self.state.status_message = outcome.status_message(self.state.attempts);
        info_log!(
            "submit_guess() - Guess {} is {} (attempt {})",
            guess,
            outcome,
            self.state.attempts
        );

        let request = FeedbackRequest {
            guess,
            target: self.state.target,
            attempts: self.state.attempts,
            outcome,
        };

        let mut loading = Loading::enter(&mut self.state);
        on_loading(&*loading);
        loading.commentary = match service.witty_feedback(&request).await {
            Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
            Ok(_) => {
                log::warn!("Feedback service returned a blank reply");
                FALLBACK_COMMENTARY.to_string()
            }
            Err(err) => {
                log::warn!("Failed to get witty feedback: {err}");
                FALLBACK_COMMENTARY.to_string()
            }
        };
        drop(loading);

        Submission::Evaluated(outcome)
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserAction {
    Guess(String),
    NewGame,
    Exit,
}

/// A surface the game loop can drive: the terminal UI or the plain CLI.
pub trait GameInterface {
    fn display_new_game(&mut self, state: &GameState);
    /// `None` means nothing actionable happened yet; the loop asks again.
    fn read_action(&mut self, state: &GameState) -> Option<UserAction>;
    fn display_loading(&mut self, state: &GameState);
    fn display_result(&mut self, state: &GameState);
    fn display_exit_message(&mut self);
}

pub async fn game_loop<I, S>(game: &mut Game, interface: &mut I, service: &S)
where
    I: GameInterface,
    S: FeedbackService,
{
    interface.display_new_game(game.state());

    loop {
        let Some(action) = interface.read_action(game.state()) else {
            continue;
        };
        debug_log!("game_loop() - Action: {:?}", action);

        match action {
            UserAction::Exit => {
                interface.display_exit_message();
                break;
            }
            UserAction::NewGame => {
                game.start_game();
                interface.display_new_game(game.state());
            }
            UserAction::Guess(text) => {
                let submission = game
                    .submit_guess(&text, service, |state| interface.display_loading(state))
                    .await;
                if submission == Submission::Ignored {
                    continue;
                }
                interface.display_result(game.state());
            }
        }
    }
}
