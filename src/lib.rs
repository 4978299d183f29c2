//! factory-twin - Factory floor simulation core for reinforcement learning.
//!
//! Simulates mobile agents that pick up, process, quality-check, and deliver
//! products under a fixed episode budget. The crate is the deterministic,
//! replayable step function at the heart of a digital-twin training loop:
//! it produces per-agent observation vectors and scalar rewards, and emits
//! aggregate metrics snapshots on a fixed cadence for external telemetry.
//!
//! Rendering, physics, network transport, and the RL optimizer itself are
//! external collaborators; the core only needs positions, distances, an
//! action source, and a [`metrics::TelemetrySink`].

pub mod agent;
pub mod config;
pub mod environment;
pub mod error;
pub mod layout;
pub mod metrics;
pub mod observation;
pub mod policy;
pub mod product;
pub mod reward;
pub mod station;
pub mod types;

pub use agent::Agent;
pub use config::FactoryConfig;
pub use environment::{FactoryEnv, StepResult};
pub use error::FactoryError;
pub use layout::FactoryLayout;
pub use metrics::{MemorySink, MetricsSnapshot, TelemetrySink};
pub use observation::ObservationBuilder;
pub use policy::{GreedyPolicy, Policy, RandomPolicy};
pub use product::{Product, ProductState};
pub use station::{ConveyorBelt, DeliveryStation, ProcessingStation};
pub use types::{AgentAction, AgentTask, ProductType, TaskAction, TerminationReason, Vec3};

/// Identifier type used for agents, products, and stations.
pub type Id = String;

/// Generates a new unique identifier (UUID v4).
pub fn generate_id() -> Id {
    uuid::Uuid::new_v4().to_string()
}
