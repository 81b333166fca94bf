use std::fmt::Display;
use std::fmt::Formatter;

use itertools::Itertools;

use super::DistanceMetric;
use super::LectureId;
use super::RoomLocation;
use super::TimeLocation;
use crate::basic_types::preference::is_prohibited;
use crate::basic_types::preference::LEVEL_PROHIBITED;
use crate::basic_types::preference::LEVEL_REQUIRED;

/// Identifies a placement by its lecture and its position in the domain of that lecture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlacementId {
    pub lecture: LectureId,
    pub index: u32,
}

/// A value of a lecture: a time and the rooms in which the lecture takes place at that time.
///
/// Placements are created once, when the domain of their lecture is built, and are immutable
/// afterwards; the derived penalties are computed at that moment.
#[derive(Clone, Debug)]
pub struct Placement {
    id: PlacementId,
    time: TimeLocation,
    rooms: Vec<RoomLocation>,
    pub(crate) room_size: u32,
    pub(crate) time_penalty: f64,
    pub(crate) room_penalty: i32,
    pub(crate) too_big_room_preference: i32,
}

impl Placement {
    pub(crate) fn new(id: PlacementId, time: TimeLocation, rooms: Vec<RoomLocation>) -> Placement {
        Placement {
            id,
            time,
            rooms,
            room_size: 0,
            time_penalty: 0.0,
            room_penalty: 0,
            too_big_room_preference: 0,
        }
    }

    pub fn id(&self) -> PlacementId {
        self.id
    }

    pub fn lecture(&self) -> LectureId {
        self.id.lecture
    }

    pub fn time(&self) -> &TimeLocation {
        &self.time
    }

    pub fn rooms(&self) -> &[RoomLocation] {
        &self.rooms
    }

    pub fn nr_rooms(&self) -> usize {
        self.rooms.len()
    }

    /// Anything but exactly one room is treated as a multi-room placement.
    pub fn is_multi_room(&self) -> bool {
        self.rooms.len() != 1
    }

    pub fn has_room(&self, room_id: u64) -> bool {
        self.rooms.iter().any(|room| room.id() == room_id)
    }

    pub fn room(&self, room_id: u64) -> Option<&RoomLocation> {
        self.rooms.iter().find(|room| room.id() == room_id)
    }

    pub fn room_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.rooms.iter().map(RoomLocation::id)
    }

    pub fn same_rooms(&self, other: &Placement) -> bool {
        self.rooms.len() == other.rooms.len()
            && self.rooms.iter().all(|room| other.has_room(room.id()))
    }

    /// Whether the two placements have an enforced room in common.
    pub fn share_rooms(&self, other: &Placement) -> bool {
        self.rooms
            .iter()
            .any(|room| room.is_enforced() && other.has_room(room.id()))
    }

    pub fn nr_different_rooms(&self, other: &Placement) -> usize {
        self.rooms
            .iter()
            .filter(|room| !other.has_room(room.id()))
            .count()
    }

    pub fn same_time(&self, other: &Placement) -> bool {
        self.time.same_time(&other.time)
    }

    /// The size available to the lecture: the sum of the rooms when the attendance is split
    /// among them, otherwise the smallest room.
    pub fn room_size(&self) -> u32 {
        self.room_size
    }

    pub fn sum_room_preference(&self) -> i32 {
        self.rooms.iter().map(RoomLocation::preference).sum()
    }

    pub fn is_room_prohibited(&self) -> bool {
        self.rooms
            .iter()
            .any(|room| is_prohibited(room.preference()))
    }

    pub fn is_time_prohibited(&self) -> bool {
        is_prohibited(self.time.preference())
    }

    /// 2 if the rooms exceed the strongly discouraged size of the lecture, 1 if they exceed the
    /// discouraged size, otherwise 0.
    pub fn too_big_room_preference(&self) -> i32 {
        self.too_big_room_preference
    }

    /// The normalized time preference relative to the best time of the lecture.
    pub fn time_penalty(&self) -> f64 {
        self.time_penalty
    }

    /// The room preference relative to the best room of the lecture.
    pub fn room_penalty(&self) -> i32 {
        self.room_penalty
    }

    pub(crate) fn compute_penalties(&mut self, time_bounds: (f64, f64), room_bounds: (i32, i32)) {
        let mut normalized = self.time.normalized_preference();
        if self.time.preference() < LEVEL_REQUIRED / 2 {
            normalized = time_bounds.0;
        } else if self.time.preference() > LEVEL_PROHIBITED / 2 {
            normalized = time_bounds.1;
        }
        self.time_penalty = normalized - time_bounds.0;

        if self.rooms.is_empty() {
            self.room_penalty = 0;
        } else {
            let preference = self
                .sum_room_preference()
                .clamp(LEVEL_REQUIRED, LEVEL_PROHIBITED);
            let preference = if preference < LEVEL_REQUIRED / 2 {
                room_bounds.0
            } else if preference > LEVEL_PROHIBITED / 2 {
                room_bounds.1
            } else {
                preference
            };
            self.room_penalty = preference - room_bounds.0;
        }
    }

    /// The largest distance between any room of `self` and any room of `other`.
    pub fn distance_in_meters(&self, metric: &DistanceMetric, other: &Placement) -> f64 {
        rooms_distance_in_meters(metric, &self.rooms, &other.rooms)
    }

    /// The largest travel time between any room of `self` and any room of `other`.
    pub fn distance_in_minutes(&self, metric: &DistanceMetric, other: &Placement) -> i32 {
        rooms_distance_in_minutes(metric, &self.rooms, &other.rooms)
    }
}

pub(crate) fn rooms_distance_in_meters(
    metric: &DistanceMetric,
    first: &[RoomLocation],
    second: &[RoomLocation],
) -> f64 {
    first
        .iter()
        .cartesian_product(second)
        .map(|(a, b)| a.distance_in_meters(metric, b))
        .fold(0.0, f64::max)
}

pub(crate) fn rooms_distance_in_minutes(
    metric: &DistanceMetric,
    first: &[RoomLocation],
    second: &[RoomLocation],
) -> i32 {
    first
        .iter()
        .cartesian_product(second)
        .map(|(a, b)| a.distance_in_minutes(metric, b))
        .max()
        .unwrap_or(0)
}

impl PartialEq for Placement {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Display for Placement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.time)?;
        for (index, room) in self.rooms.iter().enumerate() {
            write!(f, "{}{}", if index == 0 { " " } else { ", " }, room.name())?;
        }
        Ok(())
    }
}
