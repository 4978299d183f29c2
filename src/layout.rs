//! Factory floor layout: explicit entity registries and radius queries.
//!
//! Replaces runtime scene scanning with registries fixed at construction
//! time. The layout answers the spatial questions the core needs (what is
//! within radius R of point P, by role) with a plain distance scan over the
//! registered entities, which keeps queries deterministic.

use crate::error::FactoryError;
use crate::station::{ConveyorBelt, DeliveryStation, ProcessingStation};
use crate::types::Vec3;

/// A spherical region of the floor (hazard zone or wall/obstacle footprint).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub center: Vec3,
    pub radius: f64,
}

impl Region {
    pub fn new(center: Vec3, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Returns true if `point` lies inside this region.
    pub fn contains(&self, point: &Vec3) -> bool {
        self.center.distance_to(point) <= self.radius
    }
}

/// Registries of every station, belt, and region on the floor.
///
/// Workstation order is fixed at registration time (processing stations
/// first, then delivery stations) and determines the distance slots of the
/// observation vector.
#[derive(Debug, Clone, Default)]
pub struct FactoryLayout {
    pub processing_stations: Vec<ProcessingStation>,
    pub delivery_stations: Vec<DeliveryStation>,
    pub belts: Vec<ConveyorBelt>,
    pub hazards: Vec<Region>,
    pub obstacles: Vec<Region>,
}

impl FactoryLayout {
    /// Creates an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a processing station, rejecting duplicate IDs.
    pub fn add_processing_station(
        &mut self,
        station: ProcessingStation,
    ) -> Result<(), FactoryError> {
        if self.station_id_taken(&station.id) {
            return Err(FactoryError::DuplicateStationId(station.id.clone()));
        }
        self.processing_stations.push(station);
        Ok(())
    }

    /// Registers a delivery station, rejecting duplicate IDs.
    pub fn add_delivery_station(&mut self, station: DeliveryStation) -> Result<(), FactoryError> {
        if self.station_id_taken(&station.id) {
            return Err(FactoryError::DuplicateStationId(station.id.clone()));
        }
        self.delivery_stations.push(station);
        Ok(())
    }

    /// Registers a conveyor belt.
    pub fn add_belt(&mut self, belt: ConveyorBelt) {
        self.belts.push(belt);
    }

    /// Registers a hazard region. Entering one terminates the episode.
    pub fn add_hazard(&mut self, region: Region) {
        self.hazards.push(region);
    }

    /// Registers a wall/obstacle region. Contact penalizes but does not
    /// terminate.
    pub fn add_obstacle(&mut self, region: Region) {
        self.obstacles.push(region);
    }

    fn station_id_taken(&self, id: &str) -> bool {
        self.processing_stations.iter().any(|s| s.id == id)
            || self.delivery_stations.iter().any(|s| s.id == id)
    }

    /// Validates that every required collaborator is present.
    pub fn validate(&self) -> Result<(), FactoryError> {
        if self.delivery_stations.is_empty() {
            return Err(FactoryError::NoDeliveryStations);
        }
        Ok(())
    }

    /// Total number of workstations (processing + delivery).
    pub fn num_workstations(&self) -> usize {
        self.processing_stations.len() + self.delivery_stations.len()
    }

    /// Number of registered conveyor belts.
    pub fn num_belts(&self) -> usize {
        self.belts.len()
    }

    /// Positions of all workstations in observation order.
    pub fn workstation_positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.processing_stations
            .iter()
            .map(|s| s.position)
            .chain(self.delivery_stations.iter().map(|s| s.position))
    }

    /// Distance from `point` to the nearest workstation, if any exist.
    pub fn nearest_workstation_distance(&self, point: &Vec3) -> Option<f64> {
        self.workstation_positions()
            .map(|p| p.distance_to(point))
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }

    /// Indices of delivery stations within `radius` of `point`, in
    /// registration order.
    pub fn delivery_stations_in_range(&self, point: &Vec3, radius: f64) -> Vec<usize> {
        self.delivery_stations
            .iter()
            .enumerate()
            .filter(|(_, s)| s.position.distance_to(point) <= radius)
            .map(|(i, _)| i)
            .collect()
    }

    /// Indices of processing stations within `radius` of `point`, in
    /// registration order.
    pub fn processing_stations_in_range(&self, point: &Vec3, radius: f64) -> Vec<usize> {
        self.processing_stations
            .iter()
            .enumerate()
            .filter(|(_, s)| s.position.distance_to(point) <= radius)
            .map(|(i, _)| i)
            .collect()
    }

    /// Returns true if `point` lies inside any hazard region.
    pub fn in_hazard(&self, point: &Vec3) -> bool {
        self.hazards.iter().any(|r| r.contains(point))
    }

    /// Returns true if `point` touches any wall or obstacle.
    pub fn in_obstacle(&self, point: &Vec3) -> bool {
        self.obstacles.iter().any(|r| r.contains(point))
    }

    /// Resets every station and belt for a new episode.
    pub fn reset(&mut self) {
        for s in &mut self.processing_stations {
            s.reset();
        }
        for s in &mut self.delivery_stations {
            s.reset();
        }
        for b in &mut self.belts {
            b.reset();
        }
    }
}
