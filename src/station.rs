//! Workstations and conveyor belts.
//!
//! Stations never take permanent ownership of a product: they either accept
//! it (the product leaves agent ownership and becomes Processed/Delivered)
//! or reject it (ownership unchanged).

use crate::product::{Product, ProductState};
use crate::types::Vec3;
use crate::Id;

/// Queue length above which a processing station counts as backlogged
/// for anomaly detection.
pub const QUEUE_BACKLOG_THRESHOLD: usize = 5;

/// A station that processes carried products.
///
/// Accepts a product when its internal queue has room; the queue drains
/// at a fixed service interval as simulated time advances.
#[derive(Debug, Clone)]
pub struct ProcessingStation {
    pub id: Id,
    pub position: Vec3,
    /// Items currently queued for processing.
    queue_len: usize,
    /// Maximum queue length before the station rejects.
    pub capacity: usize,
    /// Seconds to service one queued item.
    pub service_interval: f64,
    service_timer: f64,
}

impl ProcessingStation {
    /// Creates a station with the given queue capacity and service interval.
    pub fn new(id: Id, position: Vec3, capacity: usize, service_interval: f64) -> Self {
        Self {
            id,
            position,
            queue_len: 0,
            capacity,
            service_interval,
            service_timer: 0.0,
        }
    }

    /// Current queue length.
    pub fn queue_len(&self) -> usize {
        self.queue_len
    }

    /// Attempts to process a carried product.
    ///
    /// On acceptance the product transitions to `Processed` and one slot is
    /// taken in the queue; the agent keeps ownership. Rejects when the queue
    /// is full or the product is not currently carried.
    pub fn try_process(&mut self, product: &mut Product) -> bool {
        if product.state != ProductState::Carried || self.queue_len >= self.capacity {
            return false;
        }
        self.queue_len += 1;
        product.state = ProductState::Processed;
        true
    }

    /// Advances the station clock, draining one queued item per elapsed
    /// service interval.
    pub fn tick(&mut self, delta_t: f64) {
        if self.queue_len == 0 {
            self.service_timer = 0.0;
            return;
        }
        self.service_timer += delta_t;
        while self.service_timer >= self.service_interval && self.queue_len > 0 {
            self.service_timer -= self.service_interval;
            self.queue_len -= 1;
        }
    }

    /// Returns true if the queue exceeds the backlog threshold.
    pub fn is_backlogged(&self) -> bool {
        self.queue_len > QUEUE_BACKLOG_THRESHOLD
    }

    /// Clears the queue and service clock for a new episode.
    pub fn reset(&mut self) {
        self.queue_len = 0;
        self.service_timer = 0.0;
    }
}

/// Which products a delivery station accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcceptancePolicy {
    /// Accept any carried product regardless of processing state.
    #[default]
    AnyProduct,
    /// Accept only products that have been processed or quality-checked.
    ProcessedOnly,
}

/// A delivery point that completes products.
#[derive(Debug, Clone)]
pub struct DeliveryStation {
    pub id: Id,
    pub position: Vec3,
    pub acceptance: AcceptancePolicy,
}

impl DeliveryStation {
    /// Creates a delivery station accepting any product.
    pub fn new(id: Id, position: Vec3) -> Self {
        Self {
            id,
            position,
            acceptance: AcceptancePolicy::AnyProduct,
        }
    }

    /// Creates a delivery station with an explicit acceptance policy.
    pub fn with_policy(id: Id, position: Vec3, acceptance: AcceptancePolicy) -> Self {
        Self {
            id,
            position,
            acceptance,
        }
    }

    /// Evaluates the acceptance predicate against an offered product.
    pub fn accepts(&self, product: &Product) -> bool {
        match self.acceptance {
            AcceptancePolicy::AnyProduct => matches!(
                product.state,
                ProductState::Carried | ProductState::Processed | ProductState::QualityChecked
            ),
            AcceptancePolicy::ProcessedOnly => matches!(
                product.state,
                ProductState::Processed | ProductState::QualityChecked
            ),
        }
    }

    /// Episode reset hook. Delivery stations hold no state.
    pub fn reset(&mut self) {}
}

/// A passive conveyor belt reporting a load fraction.
///
/// No control logic; the host integration sets the load, the core reads it
/// into observations and resets it between episodes.
#[derive(Debug, Clone)]
pub struct ConveyorBelt {
    pub id: Id,
    load: f64,
}

impl ConveyorBelt {
    /// Creates an idle belt.
    pub fn new(id: Id) -> Self {
        Self { id, load: 0.0 }
    }

    /// Current load fraction in `[0, 1]`.
    pub fn load(&self) -> f64 {
        self.load
    }

    /// Sets the load fraction, clamped to `[0, 1]`.
    pub fn set_load(&mut self, load: f64) {
        self.load = load.clamp(0.0, 1.0);
    }

    /// Clears the load for a new episode.
    pub fn reset(&mut self) {
        self.load = 0.0;
    }
}
