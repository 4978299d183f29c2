//! Core types for the factory simulation.
//!
//! Defines product types, task actions, spatial vectors, and episode
//! termination signals used throughout the simulation core.

use std::fmt;

/// Kind of product flowing through the factory.
///
/// Assigned uniformly at random when a product spawns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ProductType {
    Widget,
    Gadget,
    Component,
    Assembly,
}

impl ProductType {
    /// Returns all product types in order.
    pub fn all() -> [ProductType; 4] {
        [
            ProductType::Widget,
            ProductType::Gadget,
            ProductType::Component,
            ProductType::Assembly,
        ]
    }

    /// Returns the index of this type.
    pub fn index(&self) -> usize {
        match self {
            ProductType::Widget => 0,
            ProductType::Gadget => 1,
            ProductType::Component => 2,
            ProductType::Assembly => 3,
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductType::Widget => write!(f, "widget"),
            ProductType::Gadget => write!(f, "gadget"),
            ProductType::Component => write!(f, "component"),
            ProductType::Assembly => write!(f, "assembly"),
        }
    }
}

/// Discrete task action an agent can attempt on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TaskAction {
    /// No task side effect this tick.
    #[default]
    Continue,
    Pickup,
    Deliver,
    Process,
    QualityCheck,
}

impl TaskAction {
    /// Decodes a raw discrete action code.
    ///
    /// Codes outside `0..=4` yield `None`; the caller clamps to
    /// [`TaskAction::Continue`] rather than failing, so an out-of-range
    /// action from an external policy can never crash the loop.
    pub fn from_code(code: u32) -> Option<TaskAction> {
        match code {
            0 => Some(TaskAction::Continue),
            1 => Some(TaskAction::Pickup),
            2 => Some(TaskAction::Deliver),
            3 => Some(TaskAction::Process),
            4 => Some(TaskAction::QualityCheck),
            _ => None,
        }
    }

    /// Returns the numeric code for this action.
    pub fn code(&self) -> u32 {
        match self {
            TaskAction::Continue => 0,
            TaskAction::Pickup => 1,
            TaskAction::Deliver => 2,
            TaskAction::Process => 3,
            TaskAction::QualityCheck => 4,
        }
    }
}

/// Current task an agent's state machine is in.
///
/// Follows the last task action attempted, whether or not it had an
/// effect; exposed (normalized) in the observation vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentTask {
    #[default]
    Idle,
    Pickup,
    Deliver,
    Process,
    QualityCheck,
}

impl AgentTask {
    /// Returns the numeric id of this task (0=Idle .. 4=QualityCheck).
    pub fn id(&self) -> u32 {
        match self {
            AgentTask::Idle => 0,
            AgentTask::Pickup => 1,
            AgentTask::Deliver => 2,
            AgentTask::Process => 3,
            AgentTask::QualityCheck => 4,
        }
    }
}

/// One full action for one agent on one tick.
///
/// Continuous components are movement/rotation deltas in `[-1, 1]`; the
/// discrete component selects the task action. `Default` is zero movement
/// plus `Continue`, which is also what a late or absent action decays to.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AgentAction {
    pub move_x: f64,
    pub move_z: f64,
    pub rotate: f64,
    pub task: TaskAction,
}

impl AgentAction {
    /// Creates an action from raw continuous values and a discrete code.
    ///
    /// Non-finite continuous components are zeroed; unknown discrete codes
    /// clamp to [`TaskAction::Continue`] with a warning.
    pub fn from_raw(continuous: [f64; 3], discrete: u32) -> Self {
        let sanitize = |v: f64| if v.is_finite() { v } else { 0.0 };
        let task = TaskAction::from_code(discrete).unwrap_or_else(|| {
            log::warn!("invalid discrete action code {discrete}, clamping to Continue");
            TaskAction::Continue
        });
        Self {
            move_x: sanitize(continuous[0]),
            move_z: sanitize(continuous[1]),
            rotate: sanitize(continuous[2]),
            task,
        }
    }
}

/// Why an episode ended.
///
/// Distinguished so a trainer can tell truncation (budget) from a true
/// terminal failure (hazard).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TerminationReason {
    /// Step budget exhausted; no penalty applied.
    BudgetExhausted,
    /// An agent entered a hazard region.
    Hazard,
}

/// A 3D position or displacement on the factory floor.
///
/// Movement happens on the XZ plane; Y is carried through for the
/// observation vector but never changed by the core.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Creates a new vector.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Origin (0, 0, 0).
    pub fn origin() -> Self {
        Self::default()
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Euclidean length of this vector.
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}
