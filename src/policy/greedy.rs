//! Scripted greedy baseline.

use super::trait_::Policy;
use crate::observation::{POSE_FEATURE_DIM, TASK_FEATURE_DIM};
use crate::types::{AgentAction, TaskAction};

/// Task-greedy baseline: attempt Deliver every tick while carrying,
/// Pickup otherwise.
///
/// Reads only the carrying flag from the observation, so it needs the
/// layout's workstation count to locate that slot. No movement; useful as
/// a stationary upper bound on task-action reward near a busy spawn point.
pub struct GreedyPolicy {
    carrying_slot: usize,
}

impl GreedyPolicy {
    /// Creates a greedy policy for a layout with `num_workstations`
    /// workstations.
    pub fn new(num_workstations: usize) -> Self {
        // Carrying flag sits after the pose block, the workstation
        // distances, and the task-id slot.
        Self {
            carrying_slot: POSE_FEATURE_DIM + num_workstations + TASK_FEATURE_DIM - 1,
        }
    }
}

impl Policy for GreedyPolicy {
    fn select_actions(&mut self, observations: &[Vec<f64>]) -> Vec<AgentAction> {
        observations
            .iter()
            .map(|obs| {
                let carrying = obs.get(self.carrying_slot).copied().unwrap_or(0.0) > 0.5;
                AgentAction {
                    task: if carrying {
                        TaskAction::Deliver
                    } else {
                        TaskAction::Pickup
                    },
                    ..AgentAction::default()
                }
            })
            .collect()
    }

    fn name(&self) -> &str {
        "greedy"
    }
}
