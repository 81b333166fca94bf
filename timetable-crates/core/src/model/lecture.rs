use std::collections::BTreeMap;

use super::Placement;
use super::PlacementId;
use super::RoomLocation;
use super::TimeLocation;
use crate::containers::HashMap;
use crate::containers::HashSet;
use crate::containers::StorageKey;
use crate::engine::ConstraintId;

/// Identifies a lecture of a [`TimetableModel`](super::TimetableModel).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LectureId(pub(crate) u32);

impl StorageKey for LectureId {
    fn index(&self) -> usize {
        self.0 as usize
    }

    fn create_from_index(index: usize) -> Self {
        LectureId(index as u32)
    }
}

impl std::fmt::Display for LectureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// The description of a lecture handed to the [`ModelBuilder`](super::ModelBuilder).
#[derive(Clone, Debug)]
pub struct LectureSpec {
    pub class_id: u64,
    pub name: String,
    pub subpart_id: Option<u64>,
    pub department: Option<u64>,
    pub min_class_limit: u32,
    pub max_class_limit: u32,
    pub room_to_limit_ratio: f64,
    pub nr_rooms: usize,
    pub split_attendance: bool,
    pub weight: f64,
    pub committed: bool,
    /// The candidate placements, a time together with the rooms used at that time.
    pub domain: Vec<(TimeLocation, Vec<RoomLocation>)>,
    /// Index into `domain` of the placement of the initial solution.
    pub initial: Option<usize>,
    /// Class id of the parent class, if this lecture is a child in a split hierarchy.
    pub parent: Option<u64>,
    /// The course offering and its configuration the class belongs to.
    pub configuration: Option<(u64, u64)>,
}

impl LectureSpec {
    pub fn new(class_id: u64, name: impl Into<String>) -> LectureSpec {
        LectureSpec {
            class_id,
            name: name.into(),
            subpart_id: None,
            department: None,
            min_class_limit: 0,
            max_class_limit: 0,
            room_to_limit_ratio: 1.0,
            nr_rooms: 1,
            split_attendance: false,
            weight: 1.0,
            committed: false,
            domain: vec![],
            initial: None,
            parent: None,
            configuration: None,
        }
    }

    pub fn with_class_limit(mut self, min: u32, max: u32) -> Self {
        self.min_class_limit = min;
        self.max_class_limit = max;
        self
    }

    pub fn with_subpart(mut self, subpart_id: u64) -> Self {
        self.subpart_id = Some(subpart_id);
        self
    }

    pub fn with_department(mut self, department: u64) -> Self {
        self.department = Some(department);
        self
    }

    pub fn with_nr_rooms(mut self, nr_rooms: usize) -> Self {
        self.nr_rooms = nr_rooms;
        self
    }

    pub fn with_room_to_limit_ratio(mut self, ratio: f64) -> Self {
        self.room_to_limit_ratio = ratio;
        self
    }

    pub fn with_split_attendance(mut self, split_attendance: bool) -> Self {
        self.split_attendance = split_attendance;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_parent(mut self, parent_class_id: u64) -> Self {
        self.parent = Some(parent_class_id);
        self
    }

    pub fn with_configuration(mut self, offering_id: u64, configuration_id: u64) -> Self {
        self.configuration = Some((offering_id, configuration_id));
        self
    }

    pub fn with_placement(mut self, time: TimeLocation, rooms: Vec<RoomLocation>) -> Self {
        self.domain.push((time, rooms));
        self
    }

    /// Uses the placement at `index` of the domain as the initial placement.
    pub fn with_initial(mut self, index: usize) -> Self {
        self.initial = Some(index);
        self
    }

    /// Fixes the lecture at its initial placement.
    pub fn committed(mut self) -> Self {
        self.committed = true;
        self
    }
}

/// A class meeting which has to be placed: the variable of the search.
#[derive(Clone, Debug)]
pub struct Lecture {
    pub(crate) id: LectureId,
    pub(crate) class_id: u64,
    pub(crate) name: String,
    pub(crate) subpart_id: Option<u64>,
    pub(crate) department: Option<u64>,
    pub(crate) min_class_limit: u32,
    pub(crate) max_class_limit: u32,
    pub(crate) room_to_limit_ratio: f64,
    pub(crate) nr_rooms: usize,
    pub(crate) split_attendance: bool,
    pub(crate) weight: f64,
    pub(crate) committed: bool,
    pub(crate) domain: Vec<Placement>,
    pub(crate) initial: Option<PlacementId>,
    pub(crate) parent: Option<LectureId>,
    pub(crate) configuration: Option<(u64, u64)>,
    /// Children grouped by their scheduling subpart.
    pub(crate) children: BTreeMap<u64, Vec<LectureId>>,
    pub(crate) same_subpart_lectures: Vec<LectureId>,

    pub(crate) constraints: Vec<ConstraintId>,
    pub(crate) hard_constraints: Vec<ConstraintId>,
    pub(crate) weakening_constraints: Vec<ConstraintId>,
    pub(crate) jenrl_constraints: Vec<ConstraintId>,
    pub(crate) jenrl_with: HashMap<LectureId, ConstraintId>,
    pub(crate) instructor_constraints: Vec<ConstraintId>,
    pub(crate) group_constraints: Vec<ConstraintId>,
    /// Group constraints with a required or prohibited preference which are nevertheless soft.
    pub(crate) hard_group_soft_constraints: Vec<ConstraintId>,
    pub(crate) can_share_room_constraints: Vec<ConstraintId>,
    pub(crate) flexible_constraints: Vec<ConstraintId>,
    pub(crate) spread_constraints: Vec<ConstraintId>,
    pub(crate) department_spread_constraint: Option<ConstraintId>,
    pub(crate) can_share_room_with: HashSet<LectureId>,
    pub(crate) ignore_student_conflicts_with: HashSet<LectureId>,

    pub(crate) min_max_time_preference: (f64, f64),
    pub(crate) min_max_room_preference: (i32, i32),
    pub(crate) max_achievable_class_limit: u32,
    pub(crate) min_weeks: usize,
}

impl Lecture {
    pub fn id(&self) -> LectureId {
        self.id
    }

    pub fn class_id(&self) -> u64 {
        self.class_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subpart_id(&self) -> Option<u64> {
        self.subpart_id
    }

    pub fn offering_id(&self) -> Option<u64> {
        self.configuration.map(|(offering, _)| offering)
    }

    pub fn configuration_id(&self) -> Option<u64> {
        self.configuration.map(|(_, configuration)| configuration)
    }

    pub fn department(&self) -> Option<u64> {
        self.department
    }

    pub fn min_class_limit(&self) -> u32 {
        self.min_class_limit
    }

    pub fn max_class_limit(&self) -> u32 {
        self.max_class_limit
    }

    pub fn room_to_limit_ratio(&self) -> f64 {
        self.room_to_limit_ratio
    }

    pub fn nr_rooms(&self) -> usize {
        self.nr_rooms
    }

    pub fn is_split_attendance(&self) -> bool {
        self.split_attendance
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    pub fn domain(&self) -> &[Placement] {
        &self.domain
    }

    pub fn placement(&self, index: u32) -> &Placement {
        &self.domain[index as usize]
    }

    pub fn initial(&self) -> Option<PlacementId> {
        self.initial
    }

    pub fn parent(&self) -> Option<LectureId> {
        self.parent
    }

    pub fn children(&self) -> &BTreeMap<u64, Vec<LectureId>> {
        &self.children
    }

    pub fn has_any_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn same_subpart_lectures(&self) -> &[LectureId] {
        &self.same_subpart_lectures
    }

    /// A lecture is a single section when no other lecture shares its scheduling subpart.
    pub fn is_single_section(&self) -> bool {
        self.same_subpart_lectures.len() <= 1
    }

    pub fn constraints(&self) -> &[ConstraintId] {
        &self.constraints
    }

    pub fn hard_constraints(&self) -> &[ConstraintId] {
        &self.hard_constraints
    }

    pub fn weakening_constraints(&self) -> &[ConstraintId] {
        &self.weakening_constraints
    }

    pub fn jenrl_constraints(&self) -> &[ConstraintId] {
        &self.jenrl_constraints
    }

    /// The joint enrollment constraint between this lecture and `other`, if there is one.
    pub fn jenrl_constraint(&self, other: LectureId) -> Option<ConstraintId> {
        self.jenrl_with.get(&other).copied()
    }

    pub fn instructor_constraints(&self) -> &[ConstraintId] {
        &self.instructor_constraints
    }

    pub fn group_constraints(&self) -> &[ConstraintId] {
        &self.group_constraints
    }

    pub fn hard_group_soft_constraints(&self) -> &[ConstraintId] {
        &self.hard_group_soft_constraints
    }

    pub fn can_share_room_constraints(&self) -> &[ConstraintId] {
        &self.can_share_room_constraints
    }

    pub fn flexible_constraints(&self) -> &[ConstraintId] {
        &self.flexible_constraints
    }

    pub fn spread_constraints(&self) -> &[ConstraintId] {
        &self.spread_constraints
    }

    pub fn department_spread_constraint(&self) -> Option<ConstraintId> {
        self.department_spread_constraint
    }

    pub fn can_share_room(&self) -> bool {
        !self.can_share_room_constraints.is_empty()
    }

    /// A lecture can always share a room with itself.
    pub fn can_share_room_with(&self, other: LectureId) -> bool {
        other == self.id || self.can_share_room_with.contains(&other)
    }

    pub fn is_to_ignore_student_conflicts_with(&self, other: LectureId) -> bool {
        self.ignore_student_conflicts_with.contains(&other)
    }

    /// The smallest and the largest normalized time preference of the domain, ignoring hard
    /// preferences.
    pub fn min_max_time_preference(&self) -> (f64, f64) {
        self.min_max_time_preference
    }

    pub fn min_max_room_preference(&self) -> (i32, i32) {
        self.min_max_room_preference
    }

    pub fn max_achievable_class_limit(&self) -> u32 {
        self.max_achievable_class_limit
    }

    /// The smallest number of weeks spanned by any time of the domain.
    pub fn min_weeks(&self) -> usize {
        self.min_weeks
    }

    pub fn min_room_use(&self) -> u32 {
        if self.nr_rooms == 0 {
            0
        } else {
            (self.min_class_limit as f64 * self.room_to_limit_ratio).round() as u32
        }
    }

    pub fn max_room_use(&self) -> u32 {
        if self.nr_rooms == 0 {
            0
        } else {
            (self.max_class_limit as f64 * self.room_to_limit_ratio).round() as u32
        }
    }

    pub fn discouraged_room_size(&self) -> u32 {
        (1.25 * self.max_room_use() as f64).round() as u32
    }

    pub fn strongly_discouraged_room_size(&self) -> u32 {
        (1.5 * self.max_room_use() as f64).round() as u32
    }

    /// The distinct times of the domain.
    pub fn time_locations(&self) -> Vec<&TimeLocation> {
        let mut times: Vec<&TimeLocation> = Vec::new();
        for placement in &self.domain {
            if !times.iter().any(|time| time.same_time(placement.time())) {
                times.push(placement.time());
            }
        }
        times
    }

    /// The distinct rooms of the domain.
    pub fn room_locations(&self) -> Vec<&RoomLocation> {
        let mut rooms: Vec<&RoomLocation> = Vec::new();
        for room in self.domain.iter().flat_map(Placement::rooms) {
            if !rooms.iter().any(|known| known.id() == room.id()) {
                rooms.push(room);
            }
        }
        rooms
    }
}

impl std::fmt::Display for Lecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
