use super::DistanceMetric;
use crate::engine::ConstraintId;

/// A room in which a lecture can take place, together with the preference of the lecture for it.
#[derive(Clone, Debug)]
pub struct RoomLocation {
    id: u64,
    name: String,
    building_id: Option<u64>,
    preference: i32,
    size: u32,
    coordinates: Option<(f64, f64)>,
    ignore_too_far: bool,
    pub(crate) room_constraint: Option<ConstraintId>,
    pub(crate) enforced: bool,
}

impl RoomLocation {
    pub fn new(id: u64, name: impl Into<String>, size: u32) -> RoomLocation {
        RoomLocation {
            id,
            name: name.into(),
            building_id: None,
            preference: 0,
            size,
            coordinates: None,
            ignore_too_far: false,
            room_constraint: None,
            enforced: false,
        }
    }

    pub fn with_preference(mut self, preference: i32) -> Self {
        self.preference = preference;
        self
    }

    pub fn with_building(mut self, building_id: u64) -> Self {
        self.building_id = Some(building_id);
        self
    }

    pub fn with_coordinates(mut self, x: f64, y: f64) -> Self {
        self.coordinates = Some((x, y));
        self
    }

    /// Distances from and to this room are ignored.
    pub fn with_ignore_too_far(mut self, ignore_too_far: bool) -> Self {
        self.ignore_too_far = ignore_too_far;
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn building_id(&self) -> Option<u64> {
        self.building_id
    }

    pub fn preference(&self) -> i32 {
        self.preference
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.coordinates
    }

    pub fn ignore_too_far(&self) -> bool {
        self.ignore_too_far
    }

    /// The room constraint which guards the occupancy of this room, if any.
    pub fn room_constraint(&self) -> Option<ConstraintId> {
        self.room_constraint
    }

    /// Whether the occupancy of the room is enforced; rooms without an enforced room constraint
    /// can be shared freely.
    pub fn is_enforced(&self) -> bool {
        self.enforced
    }

    pub fn distance_in_meters(&self, metric: &DistanceMetric, other: &RoomLocation) -> f64 {
        if self.id == other.id || self.ignore_too_far || other.ignore_too_far {
            return 0.0;
        }
        metric.distance_in_meters(self.id, self.coordinates, other.id, other.coordinates)
    }

    pub fn distance_in_minutes(&self, metric: &DistanceMetric, other: &RoomLocation) -> i32 {
        if self.id == other.id || self.ignore_too_far || other.ignore_too_far {
            return 0;
        }
        metric.distance_in_minutes(self.id, self.coordinates, other.id, other.coordinates)
    }
}

impl PartialEq for RoomLocation {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
