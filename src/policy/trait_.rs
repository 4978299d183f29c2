//! Policy trait for the factory environment.

use crate::types::AgentAction;

/// A policy that selects one action per agent from their observations.
///
/// Stands in for the external action-decision source during evaluation.
pub trait Policy: Send + Sync {
    /// Selects one action per agent given their observations.
    ///
    /// # Arguments
    ///
    /// * `observations` - Per-agent observation vectors
    ///   (from [`crate::ObservationBuilder`])
    fn select_actions(&mut self, observations: &[Vec<f64>]) -> Vec<AgentAction>;

    /// Returns a human-readable name for this policy.
    fn name(&self) -> &str;
}
