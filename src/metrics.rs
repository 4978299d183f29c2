//! Metrics aggregation, anomaly detection, and telemetry.
//!
//! The environment produces a [`MetricsSnapshot`] by value on a fixed
//! cadence and hands it to a [`TelemetrySink`]; the core never blocks on or
//! retries delivery — transport failures are the sink's problem.

use std::fmt;

use crate::agent::Agent;
use crate::environment::FactoryEnv;
use crate::layout::FactoryLayout;
use crate::policy::Policy;
use crate::types::TerminationReason;

/// Global efficiency below this value flags an anomaly.
pub const EFFICIENCY_ANOMALY_THRESHOLD: f64 = 70.0;
/// Agent speed below this value flags a suspected stuck agent.
pub const STUCK_SPEED_THRESHOLD: f64 = 0.1;

/// A point-in-time read of aggregate factory state.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsSnapshot {
    /// Overall efficiency in `[0, 100]`.
    pub efficiency: f64,
    /// Products completed this episode.
    pub total_products_completed: u32,
    /// Running mean completion time in simulated seconds.
    pub average_completion_time: f64,
    /// Registered agents.
    pub active_agent_count: usize,
    /// Products currently in the active set.
    pub active_product_count: usize,
    /// Simulated time of the snapshot.
    pub timestamp: f64,
}

/// Destination for metrics snapshots.
///
/// `emit` receives the snapshot by value and must not block the simulation;
/// any buffering, retries, or transport concerns live behind this trait.
pub trait TelemetrySink {
    fn emit(&mut self, snapshot: MetricsSnapshot);
}

/// Sink that records every snapshot in memory. Used in tests and demos.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub snapshots: Vec<MetricsSnapshot>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TelemetrySink for MemorySink {
    fn emit(&mut self, snapshot: MetricsSnapshot) {
        self.snapshots.push(snapshot);
    }
}

/// Coarse anomaly signal: true if any of
///
/// 1. global efficiency is below 70,
/// 2. any agent's speed is below 0.1 (suspected stuck agent),
/// 3. any processing station's queue exceeds its backlog threshold.
///
/// This is a deliberate OR-combination, not a scored or prioritized signal.
pub fn detect_anomalies(efficiency: f64, agents: &[Agent], layout: &FactoryLayout) -> bool {
    if efficiency < EFFICIENCY_ANOMALY_THRESHOLD {
        return true;
    }
    if agents.iter().any(|a| a.speed() < STUCK_SPEED_THRESHOLD) {
        return true;
    }
    layout.processing_stations.iter().any(|s| s.is_backlogged())
}

/// Aggregated rollout metrics over multiple evaluation episodes.
#[derive(Debug, Clone)]
pub struct EvaluationMetrics {
    /// Mean per-agent cumulative reward per episode.
    pub mean_reward: f64,
    /// Mean products completed per episode.
    pub mean_products_completed: f64,
    /// Mean final overall efficiency per episode.
    pub mean_efficiency: f64,
    /// Episodes ended by a hazard.
    pub hazard_terminations: usize,
    /// Episodes ended by budget exhaustion.
    pub budget_terminations: usize,
    /// Number of episodes evaluated.
    pub n_episodes: usize,
}

impl EvaluationMetrics {
    /// Rolls out a policy for `n_episodes` and aggregates the results.
    ///
    /// This is evaluation only; no optimizer state is touched.
    pub fn evaluate(env: &mut FactoryEnv, policy: &mut dyn Policy, n_episodes: usize) -> Self {
        let mut total_reward = 0.0;
        let mut total_completed = 0.0;
        let mut total_efficiency = 0.0;
        let mut hazard_terminations = 0;
        let mut budget_terminations = 0;

        for _ in 0..n_episodes {
            let mut obs = env.reset();
            loop {
                let actions = policy.select_actions(&obs);
                let result = env.step(&actions);
                obs = result.observations;
                if result.done {
                    match result.termination {
                        Some(TerminationReason::Hazard) => hazard_terminations += 1,
                        Some(TerminationReason::BudgetExhausted) | None => {
                            budget_terminations += 1
                        }
                    }
                    break;
                }
            }

            let n_agents = env.agents().len().max(1) as f64;
            total_reward +=
                env.agents().iter().map(|a| a.cumulative_reward).sum::<f64>() / n_agents;
            total_completed += env.total_products_completed() as f64;
            total_efficiency += env.overall_efficiency();
        }

        let n = n_episodes.max(1) as f64;
        Self {
            mean_reward: total_reward / n,
            mean_products_completed: total_completed / n,
            mean_efficiency: total_efficiency / n,
            hazard_terminations,
            budget_terminations,
            n_episodes,
        }
    }
}

impl fmt::Display for EvaluationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Evaluation ({} episodes) ===", self.n_episodes)?;
        writeln!(f, "  Mean reward:        {:.3}", self.mean_reward)?;
        writeln!(
            f,
            "  Mean completed:     {:.1}",
            self.mean_products_completed
        )?;
        writeln!(f, "  Mean efficiency:    {:.1}", self.mean_efficiency)?;
        writeln!(
            f,
            "  Terminations:       {} hazard / {} budget",
            self.hazard_terminations, self.budget_terminations
        )
    }
}
