//! Agent state and movement dynamics.
//!
//! An agent owns its pose, task state, reward accumulator, and (at most one)
//! carried product. Task execution against products and stations is
//! coordinated by the environment, which owns those collections; the agent
//! itself only knows how to move, accrue reward, and reset for a new
//! episode.

use crate::config::FactoryConfig;
use crate::types::{AgentAction, AgentTask, Vec3};
use crate::Id;

/// State of a single agent on the factory floor.
#[derive(Debug, Clone)]
pub struct Agent {
    /// Unique identifier.
    pub id: Id,
    /// Current position.
    pub position: Vec3,
    /// Current rotation (Euler degrees; only yaw changes).
    pub rotation: Vec3,
    /// Velocity over the last tick (units per second).
    pub velocity: Vec3,
    /// Current task state, following the last effective task action.
    pub current_task: AgentTask,
    /// Cumulative reward this episode.
    pub cumulative_reward: f64,
    /// Products delivered this episode.
    pub products_completed: u32,
    /// Steps taken this episode.
    pub step_count: u32,
    /// Throughput-normalized efficiency score (not bounded to 100).
    pub efficiency_score: f64,
    /// Spawn pose restored at episode start.
    spawn_position: Vec3,
    spawn_rotation: Vec3,
    /// ID of the exclusively owned product, if carrying.
    carried: Option<Id>,
}

impl Agent {
    /// Creates an agent at its spawn position.
    pub fn new(id: Id, spawn_position: Vec3) -> Self {
        Self {
            id,
            position: spawn_position,
            rotation: Vec3::origin(),
            velocity: Vec3::origin(),
            current_task: AgentTask::Idle,
            cumulative_reward: 0.0,
            products_completed: 0,
            step_count: 0,
            efficiency_score: 0.0,
            spawn_position,
            spawn_rotation: Vec3::origin(),
            carried: None,
        }
    }

    /// Returns true iff this agent owns a product.
    pub fn is_carrying(&self) -> bool {
        self.carried.is_some()
    }

    /// The carried product's ID, if any.
    pub fn carried_product(&self) -> Option<&Id> {
        self.carried.as_ref()
    }

    /// Takes exclusive ownership of a product.
    pub fn pick_up(&mut self, product_id: Id) {
        debug_assert!(self.carried.is_none(), "agent already carrying");
        self.carried = Some(product_id);
    }

    /// Releases ownership of the carried product, returning its ID.
    pub fn release_product(&mut self) -> Option<Id> {
        self.carried.take()
    }

    /// Applies the continuous movement/rotation deltas for one tick and
    /// updates the tracked velocity from the actual displacement.
    pub fn apply_movement(&mut self, action: &AgentAction, config: &FactoryConfig) {
        let dx = action.move_x * config.move_speed * config.delta_t;
        let dz = action.move_z * config.move_speed * config.delta_t;
        self.position.x += dx;
        self.position.z += dz;
        self.rotation.y += action.rotate * config.rotate_speed * config.delta_t;
        self.velocity = Vec3::new(dx / config.delta_t, 0.0, dz / config.delta_t);
    }

    /// Current speed (velocity magnitude) in units per second.
    pub fn speed(&self) -> f64 {
        self.velocity.magnitude()
    }

    /// Adds a reward delta to the episode accumulator.
    pub fn add_reward(&mut self, delta: f64) {
        self.cumulative_reward += delta;
    }

    /// Recomputes the throughput-normalized efficiency score:
    /// `(completed / max(1, steps/100)) x 100`.
    ///
    /// This is a rate, not a percentage; it can exceed 100.
    pub fn update_efficiency_score(&mut self) {
        let window = (self.step_count as f64 / 100.0).max(1.0);
        self.efficiency_score = self.products_completed as f64 / window * 100.0;
    }

    /// Resets the agent for a new episode: spawn pose, zeroed counters and
    /// reward, task back to Idle. Returns the ID of any carried product so
    /// the environment can destroy it.
    pub fn begin_episode(&mut self) -> Option<Id> {
        self.position = self.spawn_position;
        self.rotation = self.spawn_rotation;
        self.velocity = Vec3::origin();
        self.current_task = AgentTask::Idle;
        self.cumulative_reward = 0.0;
        self.products_completed = 0;
        self.step_count = 0;
        self.efficiency_score = 0.0;
        self.carried.take()
    }
}
