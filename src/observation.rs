//! Observation encoding for the factory environment.
//!
//! Builds the fixed-order per-agent feature vector consumed by the external
//! action-decision source. Layout (length `6 + W + 2 + 3 + B` for W
//! workstations and B belts):
//!
//! ```text
//! [pos.x, pos.y, pos.z, rot.x, rot.y, rot.z]
//! ++ [dist_to_workstation_1 .. dist_to_workstation_W]   (normalized)
//! ++ [task_id / 4, carrying]
//! ++ [efficiency / 100, completed / 100, step / max_steps]
//! ++ [belt_load_1 .. belt_load_B]
//! ```
//!
//! The order is fixed at layout-construction time and must match exactly
//! between producer and consumer.

use crate::agent::Agent;
use crate::config::FactoryConfig;
use crate::layout::FactoryLayout;

/// Number of features encoding the agent's own pose.
pub const POSE_FEATURE_DIM: usize = 6;
/// Number of features encoding task state (task id + carrying flag).
pub const TASK_FEATURE_DIM: usize = 2;
/// Number of features encoding per-agent metrics.
pub const METRIC_FEATURE_DIM: usize = 3;

/// Builds observation vectors for agents.
pub struct ObservationBuilder;

impl ObservationBuilder {
    /// Observation length for a given layout.
    pub fn observation_dim(layout: &FactoryLayout) -> usize {
        POSE_FEATURE_DIM
            + layout.num_workstations()
            + TASK_FEATURE_DIM
            + METRIC_FEATURE_DIM
            + layout.num_belts()
    }

    /// Builds the observation vector for one agent.
    pub fn build(agent: &Agent, layout: &FactoryLayout, config: &FactoryConfig) -> Vec<f64> {
        let mut obs = Vec::with_capacity(Self::observation_dim(layout));

        // Own pose
        obs.push(agent.position.x);
        obs.push(agent.position.y);
        obs.push(agent.position.z);
        obs.push(agent.rotation.x);
        obs.push(agent.rotation.y);
        obs.push(agent.rotation.z);

        // Normalized distance to each workstation, in registration order.
        // d/(1+d) maps [0, inf) into [0, 1) without a world-size parameter.
        for position in layout.workstation_positions() {
            let d = agent.position.distance_to(&position);
            obs.push(d / (1.0 + d));
        }

        // Task state
        obs.push(agent.current_task.id() as f64 / 4.0);
        obs.push(if agent.is_carrying() { 1.0 } else { 0.0 });

        // Per-agent metrics
        obs.push(agent.efficiency_score / 100.0);
        obs.push(agent.products_completed as f64 / 100.0);
        obs.push(agent.step_count as f64 / config.max_steps as f64);

        // Belt loads
        for belt in &layout.belts {
            obs.push(belt.load());
        }

        obs
    }

    /// Builds observations for all agents.
    pub fn build_all(
        agents: &[Agent],
        layout: &FactoryLayout,
        config: &FactoryConfig,
    ) -> Vec<Vec<f64>> {
        agents
            .iter()
            .map(|a| Self::build(a, layout, config))
            .collect()
    }
}
