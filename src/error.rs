//! Error taxonomy for the factory core.
//!
//! Only configuration problems are surfaced as `Result` errors; everything
//! that can go wrong at runtime (invalid actions, ownership races, duplicate
//! completion signals) is absorbed as a no-op or a reward penalty so that a
//! training loop is never torn down mid-episode.

use thiserror::Error;

/// Errors raised while constructing or validating a factory environment.
///
/// These are fatal at construction time and must never silently degrade.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FactoryError {
    #[error("Layout must define at least one product spawn point")]
    NoSpawnPoints,

    #[error("max_products must be positive (got {0})")]
    NonPositiveMaxProducts(usize),

    #[error("product_spawn_interval must be positive (got {0})")]
    NonPositiveSpawnInterval(f64),

    #[error("max_steps must be positive (got {0})")]
    NonPositiveMaxSteps(u32),

    #[error("move_speed must be positive (got {0})")]
    NonPositiveMoveSpeed(f64),

    #[error("metrics_interval must be positive (got {0})")]
    NonPositiveMetricsInterval(f64),

    #[error("Layout must register at least one delivery station")]
    NoDeliveryStations,

    #[error("Station ID already registered: {0}")]
    DuplicateStationId(String),
}
