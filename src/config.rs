//! Configuration for the factory environment.

use crate::error::FactoryError;
use crate::types::Vec3;

/// Configuration for the factory floor environment.
///
/// Controls the episode budget, product spawning, interaction radii,
/// movement dynamics, reward shaping, and the metrics cadence.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FactoryConfig {
    // --- Episode ---
    /// Step budget per episode.
    pub max_steps: u32,
    /// Duration of one tick in simulated seconds.
    pub delta_t: f64,

    // --- Product spawning ---
    /// Maximum number of simultaneously active products.
    pub max_products: usize,
    /// Seconds between product spawns (at most one per interval).
    pub product_spawn_interval: f64,
    /// Candidate spawn points, chosen uniformly at random.
    pub spawn_points: Vec<Vec3>,

    // --- Agent dynamics ---
    /// Nominal movement speed (units per second).
    pub move_speed: f64,
    /// Rotation speed (degrees per second).
    pub rotate_speed: f64,

    // --- Interaction radii ---
    /// Radius within which a product can be picked up.
    pub pickup_radius: f64,
    /// Radius within which a station can be delivered to or processed at.
    pub station_radius: f64,

    // --- Reward shaping ---
    /// Per-step bonus scaled by remaining episode-time fraction.
    pub reward_time_bonus: f64,
    /// Per-step bonus inversely proportional to nearest-workstation distance.
    pub reward_proximity_bonus: f64,
    /// Per-step penalty when velocity exceeds 1.5x nominal move speed.
    pub reward_overspeed_penalty: f64,

    // --- Metrics ---
    /// Seconds of simulated time between metrics snapshots.
    pub metrics_interval: f64,
}

impl FactoryConfig {
    /// Validates the configuration, failing fast on anything that would
    /// silently degrade the simulation.
    pub fn validate(&self) -> Result<(), FactoryError> {
        if self.spawn_points.is_empty() {
            return Err(FactoryError::NoSpawnPoints);
        }
        if self.max_products == 0 {
            return Err(FactoryError::NonPositiveMaxProducts(self.max_products));
        }
        if self.product_spawn_interval <= 0.0 {
            return Err(FactoryError::NonPositiveSpawnInterval(
                self.product_spawn_interval,
            ));
        }
        if self.max_steps == 0 {
            return Err(FactoryError::NonPositiveMaxSteps(self.max_steps));
        }
        if self.move_speed <= 0.0 {
            return Err(FactoryError::NonPositiveMoveSpeed(self.move_speed));
        }
        if self.metrics_interval <= 0.0 {
            return Err(FactoryError::NonPositiveMetricsInterval(
                self.metrics_interval,
            ));
        }
        Ok(())
    }

    /// Target completion rate in products per minute implied by the spawn
    /// interval. Used as the denominator of the global efficiency ratio.
    pub fn target_rate_per_minute(&self) -> f64 {
        60.0 / self.product_spawn_interval
    }
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            max_steps: 1000,
            delta_t: 0.02,
            max_products: 10,
            product_spawn_interval: 5.0,
            spawn_points: vec![
                Vec3::new(-8.0, 0.0, -8.0),
                Vec3::new(8.0, 0.0, -8.0),
                Vec3::new(0.0, 0.0, -10.0),
            ],
            move_speed: 5.0,
            rotate_speed: 180.0,
            pickup_radius: 2.0,
            station_radius: 3.0,
            reward_time_bonus: 0.001,
            reward_proximity_bonus: 0.01,
            reward_overspeed_penalty: 0.01,
            metrics_interval: 2.0,
        }
    }
}
