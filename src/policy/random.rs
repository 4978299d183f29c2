//! Random policy for testing and baselines.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::trait_::Policy;
use crate::types::{AgentAction, TaskAction};

/// Uniformly random action selection.
///
/// Each agent independently draws movement deltas in `[-1, 1]` and a random
/// task action. Seeded, so evaluation runs are reproducible. Used for sanity
/// checks and as a lower-bound baseline.
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    /// Creates a random policy with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Policy for RandomPolicy {
    fn select_actions(&mut self, observations: &[Vec<f64>]) -> Vec<AgentAction> {
        (0..observations.len())
            .map(|_| AgentAction {
                move_x: self.rng.gen_range(-1.0..=1.0),
                move_z: self.rng.gen_range(-1.0..=1.0),
                rotate: self.rng.gen_range(-1.0..=1.0),
                task: TaskAction::from_code(self.rng.gen_range(0..=4))
                    .unwrap_or(TaskAction::Continue),
            })
            .collect()
    }

    fn name(&self) -> &str {
        "random"
    }
}
