//! Core RL types for the animal shogi environment

use animal_shogi_engine::{ActionId, Color, State};

/// Reward value (float)
pub type Reward = f32;

/// Error types for Environment::step()
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StepError {
    /// step() called after the episode has already terminated
    EpisodeDone,

    /// ActionId outside the action space; not a representable action.
    /// Note that an *illegal* (but representable) action is not an error:
    /// the engine resolves it as a forfeiture, ending the episode.
    InvalidActionId(ActionId),
}

/// The result of either reset() or step() in an environment
#[derive(Clone, Debug)]
pub struct EnvStep {
    /// Full engine state after the transition; safe to hold as a snapshot.
    pub state: State,

    /// Reward per player for the most recent transition, indexed by
    /// `Color::index`. Zero-sum: `rewards[1] == -rewards[0]`.
    /// For reset(), all zeros.
    pub rewards: [Reward; 2],

    /// True if the episode has terminated
    pub done: bool,

    /// The player whose turn it is *after* this step
    pub current_player: Color,

    /// Mask over the discrete action space:
    /// legal_action_mask[id] == true if that ActionId is legal
    /// for `current_player` in this state. All false once done.
    pub legal_action_mask: Vec<bool>,

    /// The last action taken, if any. For reset(), None.
    pub last_action: Option<ActionId>,
}
