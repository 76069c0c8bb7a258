//! Agent API for action selection

use rand::Rng;

use animal_shogi_engine::{ActionId, Color, State};

/// Inputs provided to an agent when selecting an action
pub struct AgentInput<'a> {
    /// Engine state for the player whose turn it is
    pub state: &'a State,

    /// Mask over action IDs:
    /// legal_action_mask[id] == true if the action is legal
    pub legal_action_mask: &'a [bool],

    /// The player whose turn it is
    pub current_player: Color,
}

/// Trait for anything that can choose actions in the environment:
/// random policy, scripted policy, or human input.
pub trait Agent {
    /// Choose a legal action given the current state and legal-action mask.
    ///
    /// Requirement:
    /// - Must only return ActionIds for which legal_action_mask[id as usize] == true.
    /// - May use rng for exploration.
    fn select_action(&mut self, input: &AgentInput, rng: &mut impl Rng) -> ActionId;
}

/// Random agent that uniformly samples from legal actions
#[derive(Clone, Debug, Default)]
pub struct RandomAgent;

impl RandomAgent {
    pub fn new() -> Self {
        Self
    }
}

impl Agent for RandomAgent {
    fn select_action(&mut self, input: &AgentInput, rng: &mut impl Rng) -> ActionId {
        let legal_ids: Vec<ActionId> = input
            .legal_action_mask
            .iter()
            .enumerate()
            .filter(|(_, &legal)| legal)
            .map(|(id, _)| id as ActionId)
            .collect();

        assert!(
            !legal_ids.is_empty(),
            "No legal actions available for agent"
        );

        let idx = rng.random_range(0..legal_ids.len());
        legal_ids[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AnimalShogiEnv, Environment};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_agent_selects_legal_action() {
        let mut env = AnimalShogiEnv::new();
        let mut rng = StdRng::seed_from_u64(42);
        let step = env.reset();

        let mut agent = RandomAgent::new();
        let input = AgentInput {
            state: &step.state,
            legal_action_mask: &step.legal_action_mask,
            current_player: step.current_player,
        };

        for _ in 0..100 {
            let action = agent.select_action(&input, &mut rng);
            assert!(
                step.legal_action_mask[action as usize],
                "Random agent should select a legal action"
            );
        }
    }
}
