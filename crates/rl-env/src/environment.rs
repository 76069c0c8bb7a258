//! RL Environment trait and AnimalShogiEnv implementation

use animal_shogi_engine::{self as engine, ActionId, State, ACTION_SPACE_SIZE};
use rand::Rng;

use super::{Agent, AgentInput, EnvStep, Reward, StepError};

/// Generic environment interface for RL
pub trait Environment {
    /// Reset the environment to a fresh episode (new game).
    ///
    /// Returns the first EnvStep, representing the initial state prior
    /// to any actions.
    fn reset(&mut self) -> EnvStep;

    /// Apply an action for the current player, advance the environment
    /// by one step, and return the resulting EnvStep.
    ///
    /// A representable but illegal action is not an error: the engine
    /// resolves it as a forfeiture and the episode ends.
    fn step(&mut self, action: ActionId) -> Result<EnvStep, StepError>;
}

/// Animal shogi RL environment over the rules engine.
///
/// The game is fully deterministic, so unlike stochastic environments
/// neither reset nor step takes a random source.
pub struct AnimalShogiEnv {
    /// Underlying engine state
    pub state: State,

    /// Last action applied (ActionId), if any
    pub last_action: Option<ActionId>,

    /// Whether this episode has ended
    pub done: bool,
}

impl AnimalShogiEnv {
    /// Create a new environment. Not initialized until reset() is called.
    pub fn new() -> Self {
        Self {
            state: engine::init(),
            last_action: None,
            done: true, // not initialized until reset
        }
    }

    /// Build the legal action mask for the current state
    pub fn build_legal_action_mask(&self) -> Vec<bool> {
        let legal = engine::legal_actions(&self.state);
        (0..ACTION_SPACE_SIZE as ActionId)
            .map(|id| legal.contains(id))
            .collect()
    }

    fn env_step(&self, rewards: [Reward; 2]) -> EnvStep {
        let legal_action_mask = if self.done {
            vec![false; ACTION_SPACE_SIZE]
        } else {
            self.build_legal_action_mask()
        };
        EnvStep {
            state: self.state.clone(),
            rewards,
            done: self.done,
            current_player: self.state.turn,
            legal_action_mask,
            last_action: self.last_action,
        }
    }
}

impl Default for AnimalShogiEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for AnimalShogiEnv {
    fn reset(&mut self) -> EnvStep {
        self.state = engine::init();
        self.last_action = None;
        self.done = false;
        self.env_step([0.0; 2])
    }

    fn step(&mut self, action: ActionId) -> Result<EnvStep, StepError> {
        if self.done {
            return Err(StepError::EpisodeDone);
        }
        if action as usize >= ACTION_SPACE_SIZE {
            return Err(StepError::InvalidActionId(action));
        }

        let outcome = engine::step(&self.state, action)
            .expect("in-range ids never hit an engine error");

        self.state = outcome.state;
        self.done = outcome.terminated;
        self.last_action = Some(action);

        // Engine reward is from the first player's perspective; zero-sum.
        let reward = outcome.reward as Reward;
        Ok(self.env_step([reward, -reward]))
    }
}

/// Record of one self-play episode
#[derive(Clone, Debug)]
pub struct EpisodeLog {
    /// Actions in play order
    pub actions: Vec<ActionId>,

    /// Rewards of the final transition, per player
    pub final_rewards: [Reward; 2],

    /// True if the step cap was reached before the game ended
    pub truncated: bool,
}

/// Run one self-play episode with the given agent.
///
/// `max_steps` caps the episode: the game has no repetition or draw rule,
/// so unguided play is not guaranteed to terminate.
pub fn self_play_episode<A: Agent>(
    env: &mut AnimalShogiEnv,
    agent: &mut A,
    rng: &mut impl Rng,
    max_steps: usize,
) -> EpisodeLog {
    let mut step = env.reset();
    let mut log = EpisodeLog {
        actions: Vec::new(),
        final_rewards: [0.0; 2],
        truncated: false,
    };

    while !step.done {
        if log.actions.len() >= max_steps {
            log.truncated = true;
            break;
        }

        let input = AgentInput {
            state: &step.state,
            legal_action_mask: &step.legal_action_mask,
            current_player: step.current_player,
        };
        let action = agent.select_action(&input, rng);

        let next = env.step(action).expect("agent actions are in range");
        log.actions.push(action);
        log.final_rewards = next.rewards;
        step = next;
    }

    log
}
