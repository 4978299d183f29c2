//! Reward constants and per-step shaping.
//!
//! Sparse task rewards use the fixed deltas below; the dense shaping terms
//! are scaled by the coefficients in [`FactoryConfig`]. Note the deliberate
//! asymmetry: a failed Process attempt carries no penalty while the other
//! task failures do.

use crate::config::FactoryConfig;

/// Reward for successfully picking up a product.
pub const PICKUP_SUCCESS: f64 = 0.1;
/// Penalty for attempting pickup while already carrying.
pub const PICKUP_WHILE_CARRYING: f64 = -0.05;
/// Reward for a delivery accepted by a station.
pub const DELIVER_SUCCESS: f64 = 1.0;
/// Penalty for attempting delivery with no accepting station in range.
pub const DELIVER_NO_STATION: f64 = -0.02;
/// Penalty for attempting delivery while not carrying.
pub const DELIVER_NOT_CARRYING: f64 = -0.05;
/// Reward for a processing station accepting a product.
pub const PROCESS_SUCCESS: f64 = 0.5;
/// Reward for a passed quality check.
pub const QUALITY_PASS: f64 = 0.3;
/// Penalty for a failed quality check.
pub const QUALITY_FAIL: f64 = -0.2;
/// Terminal penalty for entering a hazard region.
pub const HAZARD_PENALTY: f64 = -1.0;
/// Non-terminal penalty for touching a wall or obstacle.
pub const OBSTACLE_PENALTY: f64 = -0.1;
/// Velocity magnitude above this multiple of nominal speed is overspeed.
pub const OVERSPEED_FACTOR: f64 = 1.5;

/// Computes the dense per-step shaping reward.
pub struct RewardShaper;

impl RewardShaper {
    /// Shaping applied every step regardless of the discrete action:
    ///
    /// 1. Small bonus proportional to the remaining episode-time fraction.
    /// 2. Small bonus inversely proportional to the distance to the nearest
    ///    workstation.
    /// 3. Small penalty when velocity exceeds `1.5 x` nominal move speed
    ///    (discourages oscillation exploits).
    pub fn shaping(
        config: &FactoryConfig,
        step_count: u32,
        nearest_workstation_dist: Option<f64>,
        speed: f64,
    ) -> f64 {
        let mut reward = 0.0;

        let remaining = 1.0 - (step_count as f64 / config.max_steps as f64).min(1.0);
        reward += config.reward_time_bonus * remaining;

        if let Some(dist) = nearest_workstation_dist {
            reward += config.reward_proximity_bonus / (1.0 + dist);
        }

        if speed > OVERSPEED_FACTOR * config.move_speed {
            reward -= config.reward_overspeed_penalty;
        }

        reward
    }
}
