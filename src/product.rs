//! Product lifecycle state machine.

use rand::Rng;

use crate::types::{ProductType, Vec3};
use crate::Id;

/// Minimum rolled quality for a product to pass its quality check.
const QUALITY_PASS_THRESHOLD: f64 = 0.2;

/// Lifecycle state of a product.
///
/// ```text
/// Spawned -> AvailableForPickup -> Carried -> Processed / QualityChecked
///                                         \-> Delivered | Destroyed
/// ```
///
/// `Delivered` and `Destroyed` are terminal; a product in either state has
/// already been removed from all active collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductState {
    Spawned,
    AvailableForPickup,
    Carried,
    Processed,
    QualityChecked,
    Delivered,
    Destroyed,
}

/// A unit of work flowing through the factory.
///
/// Created by the environment's spawner, mutated by the agent carrying it
/// and the stations it is presented to, destroyed on delivery or episode
/// reset. At most one agent owns a product at a time; `Carried`,
/// `Processed`, and `QualityChecked` all imply exclusive ownership.
#[derive(Debug, Clone)]
pub struct Product {
    /// Unique identifier.
    pub id: Id,
    /// Product type, assigned uniformly at random at spawn.
    pub product_type: ProductType,
    /// Current lifecycle state.
    pub state: ProductState,
    /// Position on the factory floor (the carrier's position while carried).
    pub position: Vec3,
    /// Quality rolled at spawn; drives the pass/fail quality check.
    pub quality: f64,
    /// Simulated time at which this product spawned.
    pub spawned_at: f64,
}

impl Product {
    /// Spawns a new product at the given point with a random type and quality.
    pub fn spawn<R: Rng>(rng: &mut R, position: Vec3, now: f64) -> Self {
        let types = ProductType::all();
        let product_type = types[rng.gen_range(0..types.len())];
        Self {
            id: crate::generate_id(),
            product_type,
            state: ProductState::AvailableForPickup,
            position,
            quality: rng.gen::<f64>(),
            spawned_at: now,
        }
    }

    /// Returns true if this product can currently be picked up.
    pub fn is_available(&self) -> bool {
        self.state == ProductState::AvailableForPickup
    }

    /// Returns true if an agent currently owns this product.
    pub fn is_owned(&self) -> bool {
        matches!(
            self.state,
            ProductState::Carried | ProductState::Processed | ProductState::QualityChecked
        )
    }

    /// Runs the product's own pass/fail quality policy.
    ///
    /// Deterministic: the outcome is fixed by the quality rolled at spawn,
    /// so replays with the same seed check identically.
    pub fn passes_quality_check(&self) -> bool {
        self.quality >= QUALITY_PASS_THRESHOLD
    }

    /// Completion time in simulated seconds if delivered at `now`.
    pub fn completion_time(&self, now: f64) -> f64 {
        (now - self.spawned_at).max(0.0)
    }
}
