use super::SlotResource;
use crate::containers::HashMap;
use crate::engine::Assignment;
use crate::engine::AssignmentValues;
use crate::engine::ConflictSet;
use crate::engine::ConstraintContext;
use crate::engine::ConstraintId;
use crate::engine::CriterionKind;
use crate::engine::Criteria;
use crate::model::Lecture;
use crate::model::LectureId;
use crate::model::Placement;
use crate::model::PlacementId;
use crate::model::TimeLocation;
use crate::model::TimetableModel;
use crate::model::DAY_CODES;
use crate::model::SLOTS_PER_DAY;

const SLOTS_PER_DAY_USIZE: usize = SLOTS_PER_DAY as usize;

/// How a slot of a room may be used by the departments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotUsage {
    /// Nobody may use the slot.
    NotAvailable,
    /// Only lectures of the given department may use the slot.
    Department(u64),
}

/// Restricts the slots of a room; slots without an entry are free for everybody.
#[derive(Clone, Debug, Default)]
pub struct RoomSharingModel {
    slots: HashMap<usize, SlotUsage>,
}

impl RoomSharingModel {
    pub fn set(&mut self, day: usize, start_slot: usize, length: usize, usage: SlotUsage) {
        for slot in start_slot..start_slot + length {
            let _ = self.slots.insert(day * SLOTS_PER_DAY_USIZE + slot, usage);
        }
    }

    pub fn is_not_available(&self, slot: usize) -> bool {
        matches!(self.slots.get(&slot), Some(SlotUsage::NotAvailable))
    }

    /// Whether a lecture of `department` may use every slot of `time`.
    pub fn is_available(&self, time: &TimeLocation, department: Option<u64>) -> bool {
        time.slots().all(|slot| match self.slots.get(&slot) {
            None => true,
            Some(SlotUsage::NotAvailable) => false,
            Some(SlotUsage::Department(owner)) => department.is_none_or(|dept| dept == *owner),
        })
    }
}

/// Ensures that a room is used by at most one lecture at a time, unless the lectures may share the
/// room and fit into it together.
///
/// A room can be partitioned: a partition cannot be used while its parent room is used and vice
/// versa. Rooms which are not enforced never produce conflicts, but their occupancy is still
/// tracked for the broken time pattern criterion.
#[derive(Clone, Debug)]
pub struct RoomConstraint {
    pub(crate) room_id: u64,
    pub(crate) name: String,
    pub(crate) building_id: Option<u64>,
    pub(crate) capacity: u32,
    pub(crate) enforced: bool,
    pub(crate) coordinates: Option<(f64, f64)>,
    pub(crate) ignore_too_far: bool,
    pub(crate) sharing_model: Option<RoomSharingModel>,
    pub(crate) not_available: Vec<TimeLocation>,
    pub(crate) parent: Option<ConstraintId>,
    pub(crate) partitions: Vec<ConstraintId>,
    pub(crate) day_of_week_offset: usize,
    pub(crate) lectures: Vec<LectureId>,
}

/// The placements in a room, per slot of the week.
#[derive(Clone, Debug, PartialEq)]
pub struct RoomContext {
    resource: SlotResource,
    broken_time_patterns: f64,
}

impl RoomContext {
    pub fn placements(&self, slot: usize) -> &[PlacementId] {
        self.resource.placements(slot)
    }

    fn is_empty(&self, day: usize, slot: usize) -> bool {
        self.resource.is_empty(day * SLOTS_PER_DAY_USIZE + slot)
    }

    /// Whether the slot is empty, ignoring the placements of `lecture` if it is the only user.
    fn is_empty_without(&self, day: usize, slot: usize, lecture: LectureId) -> bool {
        let assigned = self.resource.placements(day * SLOTS_PER_DAY_USIZE + slot);
        assigned.is_empty() || (assigned.len() == 1 && assigned[0].lecture == lecture)
    }

    /// Counts the empty slots which break a Monday-Wednesday-Friday or a Tuesday-Thursday pattern.
    fn count_broken_time_patterns(&self) -> usize {
        let mut count = 0;
        for slot in 0..SLOTS_PER_DAY_USIZE {
            for day in 0..5 {
                if !self.is_empty(day, slot) {
                    continue;
                }
                let broken = match day {
                    0 => !self.is_empty(2, slot) && !self.is_empty(4, slot),
                    1 => !self.is_empty(3, slot),
                    2 => !self.is_empty(0, slot) && !self.is_empty(4, slot),
                    3 => !self.is_empty(1, slot),
                    4 => !self.is_empty(0, slot) && !self.is_empty(2, slot),
                    _ => false,
                };
                if broken {
                    count += 1;
                }
            }
        }
        count
    }

    /// The change in broken time patterns of the room caused by `placement`.
    fn count_broken_time_patterns_of(&self, placement: &Placement) -> i32 {
        const MWF: u32 = DAY_CODES[0] | DAY_CODES[2] | DAY_CODES[4];
        const TTH: u32 = DAY_CODES[1] | DAY_CODES[3];

        let lecture = placement.lecture();
        let empty = |day: usize, slot: usize| self.is_empty_without(day, slot, lecture);
        let time = placement.time();
        let start = time.start_slot().rem_euclid(SLOTS_PER_DAY) as usize;
        let slots = start..start + time.length() as usize;
        let days = time.day_code();
        let mut count = 0;

        let mwf = days & MWF;
        if mwf != 0 && mwf != MWF {
            for s in slots.clone() {
                if mwf == DAY_CODES[0] && empty(0, s) {
                    count += i32::from(empty(2, s) != empty(4, s));
                    count -= i32::from(!empty(2, s) && !empty(4, s));
                } else if mwf == DAY_CODES[2] && empty(2, s) {
                    count += i32::from(empty(0, s) != empty(4, s));
                    count -= i32::from(!empty(0, s) && !empty(4, s));
                } else if mwf == DAY_CODES[4] && empty(4, s) {
                    count += i32::from(empty(0, s) != empty(2, s));
                    count -= i32::from(!empty(0, s) && !empty(2, s));
                } else if mwf == (DAY_CODES[0] | DAY_CODES[2]) && empty(0, s) && empty(2, s) {
                    count += i32::from(empty(4, s));
                } else if mwf == (DAY_CODES[2] | DAY_CODES[4]) && empty(2, s) && empty(4, s) {
                    count += i32::from(empty(0, s));
                } else if mwf == (DAY_CODES[0] | DAY_CODES[4]) && empty(0, s) && empty(4, s) {
                    count += i32::from(empty(2, s));
                }
            }
        }

        let tth = days & TTH;
        if tth != 0 && tth != TTH {
            for s in slots {
                count += i32::from(empty(1, s) && empty(3, s));
                if tth == DAY_CODES[1] && empty(1, s) && !empty(3, s) {
                    count -= 1;
                }
                if tth == DAY_CODES[3] && empty(3, s) && !empty(1, s) {
                    count -= 1;
                }
            }
        }
        count
    }

    fn update_broken_time_patterns(&mut self, criteria: &mut Criteria) {
        criteria.inc(CriterionKind::BrokenTimePatterns, -self.broken_time_patterns);
        self.broken_time_patterns = self.count_broken_time_patterns() as f64 / 6.0;
        criteria.inc(CriterionKind::BrokenTimePatterns, self.broken_time_patterns);
    }
}

impl RoomConstraint {
    pub fn room_id(&self) -> u64 {
        self.room_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn building_id(&self) -> Option<u64> {
        self.building_id
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.coordinates
    }

    pub fn ignore_too_far(&self) -> bool {
        self.ignore_too_far
    }

    pub fn is_enforced(&self) -> bool {
        self.enforced
    }

    pub fn parent(&self) -> Option<ConstraintId> {
        self.parent
    }

    pub fn partitions(&self) -> &[ConstraintId] {
        &self.partitions
    }

    pub(crate) fn create_context(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        criteria: &mut Criteria,
    ) -> RoomContext {
        let mut context = RoomContext {
            resource: SlotResource::default(),
            broken_time_patterns: 0.0,
        };
        for &lecture in &self.lectures {
            let Some(placement) = values.placement(model, lecture) else {
                continue;
            };
            if placement.has_room(self.room_id) {
                context.resource.add(placement);
            }
        }
        context.broken_time_patterns = context.count_broken_time_patterns() as f64 / 6.0;
        criteria.inc(
            CriterionKind::BrokenTimePatterns,
            context.broken_time_patterns,
        );
        context
    }

    pub(crate) fn assigned(
        &self,
        context: &mut RoomContext,
        criteria: &mut Criteria,
        placement: &Placement,
    ) {
        if !placement.has_room(self.room_id) {
            return;
        }
        context.resource.add(placement);
        context.update_broken_time_patterns(criteria);
    }

    pub(crate) fn unassigned(
        &self,
        context: &mut RoomContext,
        criteria: &mut Criteria,
        placement: &Placement,
    ) {
        if !placement.has_room(self.room_id) {
            return;
        }
        context.resource.remove(placement);
        context.update_broken_time_patterns(criteria);
    }

    fn context_of(assignment: &Assignment, constraint: ConstraintId) -> &RoomContext {
        match assignment.context(constraint) {
            ConstraintContext::Room(context) => context,
            _ => unreachable!("a room constraint always has a room context"),
        }
    }

    /// Visits the placements which prevent `placement` from being assigned; the visitor returns
    /// `true` to stop the search, in which case this method returns `true` as well.
    fn visit_conflicts(
        &self,
        id: ConstraintId,
        model: &TimetableModel,
        assignment: &Assignment,
        placement: &Placement,
        visitor: &mut impl FnMut(PlacementId) -> bool,
    ) -> bool {
        if !self.enforced || !placement.has_room(self.room_id) {
            return false;
        }
        let current = assignment.value(placement.lecture());

        if let Some(parent_id) = self.parent {
            if model.room_constraint(parent_id).is_some_and(|parent| parent.enforced) {
                let context = Self::context_of(assignment, parent_id);
                let mut shared = Vec::new();
                if self.visit_context(model, context, current, placement, &mut shared, visitor) {
                    return true;
                }
            }
        }

        let mut shared = Vec::new();
        for &partition_id in &self.partitions {
            if !model
                .room_constraint(partition_id)
                .is_some_and(|partition| partition.enforced)
            {
                continue;
            }
            let context = Self::context_of(assignment, partition_id);
            if self.visit_context(model, context, current, placement, &mut shared, visitor) {
                return true;
            }
        }

        let context = Self::context_of(assignment, id);
        let mut shared = Vec::new();
        self.visit_context(model, context, current, placement, &mut shared, visitor)
    }

    fn visit_context(
        &self,
        model: &TimetableModel,
        context: &RoomContext,
        current: Option<PlacementId>,
        placement: &Placement,
        shared: &mut Vec<PlacementId>,
        visitor: &mut impl FnMut(PlacementId) -> bool,
    ) -> bool {
        let lecture = model.lecture(placement.lecture());
        for slot in placement.time().slots() {
            for &other_id in context.placements(slot) {
                let other = model.placement(other_id);
                if !other.time().share_weeks(placement.time())
                    || Some(other_id) == current
                    || shared.contains(&other_id)
                {
                    continue;
                }
                if lecture.can_share_room_with(other_id.lecture)
                    && self.check_room_size(model, placement, shared, Some(other))
                {
                    shared.push(other_id);
                    continue;
                }
                if visitor(other_id) {
                    return true;
                }
            }
        }
        false
    }

    pub(crate) fn compute_conflicts(
        &self,
        id: ConstraintId,
        model: &TimetableModel,
        assignment: &Assignment,
        placement: &Placement,
        conflicts: &mut ConflictSet,
    ) {
        let _ = self.visit_conflicts(id, model, assignment, placement, &mut |conflict| {
            let _ = conflicts.insert(conflict);
            false
        });
    }

    pub(crate) fn in_conflict(
        &self,
        id: ConstraintId,
        model: &TimetableModel,
        assignment: &Assignment,
        placement: &Placement,
    ) -> bool {
        self.visit_conflicts(id, model, assignment, placement, &mut |_| true)
    }

    /// Whether `placement`, the placements in `shared` and `extra` fit into the room together on
    /// every date and slot on which they meet.
    pub fn check_room_size(
        &self,
        model: &TimetableModel,
        placement: &Placement,
        shared: &[PlacementId],
        extra: Option<&Placement>,
    ) -> bool {
        let offset = self.day_of_week_offset;
        let time = placement.time();
        let own_use = model.lecture(placement.lecture()).max_room_use();

        for date in time.dates(offset) {
            if let Some(extra) = extra {
                if !extra.time().has_date(date, offset) {
                    continue;
                }
            }
            for slot in time.start_slot()..time.end_slot() {
                let mut size = own_use;
                if let Some(extra) = extra {
                    let extra_time = extra.time();
                    if extra_time.start_slot() <= slot && slot < extra_time.end_slot() {
                        size += model.lecture(extra.lecture()).max_room_use();
                    } else {
                        continue;
                    }
                }
                for &other_id in shared {
                    let other = model.placement(other_id);
                    let other_time = other.time();
                    if other_time.has_date(date, offset)
                        && other_time.start_slot() <= slot
                        && slot < other_time.end_slot()
                    {
                        size += model.lecture(other_id.lecture).max_room_use();
                    }
                }
                if size > self.capacity {
                    return false;
                }
            }
        }
        true
    }

    /// Whether the two placements can be assigned at the same time without violating this room.
    pub fn is_consistent(&self, model: &TimetableModel, first: &Placement, second: &Placement) -> bool {
        if !self.enforced {
            return true;
        }
        let clash = |first: &Placement, second: &Placement| {
            first.time().has_intersection(second.time())
                && (!model
                    .lecture(first.lecture())
                    .can_share_room_with(second.lecture())
                    || model.lecture(first.lecture()).max_room_use()
                        + model.lecture(second.lecture()).max_room_use()
                        > self.capacity)
        };

        if let Some(parent) = self.parent.and_then(|parent| model.room_constraint(parent)) {
            let uses_both = |a: &Placement, b: &Placement| {
                a.has_room(self.room_id) && b.has_room(parent.room_id)
            };
            if (uses_both(first, second) || uses_both(second, first)) && clash(first, second) {
                return false;
            }
        }
        !(first.has_room(self.room_id) && second.has_room(self.room_id) && clash(first, second))
    }

    /// Whether the lecture can use the room at `time`, given the blocked times of the room, its
    /// parent and its partitions and the room sharing model.
    pub fn is_available(&self, model: &TimetableModel, lecture: &Lecture, time: &TimeLocation) -> bool {
        let blocked = |room: &RoomConstraint| {
            room.enforced
                && room
                    .not_available
                    .iter()
                    .any(|other| other.has_intersection(time))
        };
        if blocked(self) {
            return false;
        }
        if self
            .parent
            .and_then(|parent| model.room_constraint(parent))
            .is_some_and(blocked)
        {
            return false;
        }
        if self
            .partitions
            .iter()
            .filter_map(|&partition| model.room_constraint(partition))
            .any(blocked)
        {
            return false;
        }
        self.sharing_model
            .as_ref()
            .is_none_or(|sharing| sharing.is_available(time, lecture.department()))
    }

    /// Whether `slot` can be used at all.
    pub fn is_slot_available(&self, slot: usize) -> bool {
        if self.enforced
            && self
                .not_available
                .iter()
                .any(|time| time.slots().any(|blocked| blocked == slot))
        {
            return false;
        }
        self.sharing_model
            .as_ref()
            .is_none_or(|sharing| !sharing.is_not_available(slot))
    }

    /// The change of the broken time patterns of this room if `placement` were assigned.
    pub(crate) fn broken_time_patterns_of(&self, context: &RoomContext, placement: &Placement) -> f64 {
        if !placement.has_room(self.room_id) {
            return 0.0;
        }
        context.count_broken_time_patterns_of(placement) as f64 / 6.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::TestRandom;
    use crate::model::tests::two_lectures_one_room;
    use crate::model::ModelBuilder;
    use crate::model::LectureSpec;
    use crate::model::RoomLocation;
    use crate::model::RoomSpec;

    fn room_of(model: &TimetableModel) -> (ConstraintId, &RoomConstraint) {
        model
            .constraint_ids()
            .find_map(|id| model.room_constraint(id).map(|room| (id, room)))
            .unwrap()
    }

    #[test]
    fn overlapping_placements_in_the_same_room_conflict() {
        let model = two_lectures_one_room();
        let mut assignment = model.create_assignment();
        let mut lectures = model.lecture_ids();
        let first = lectures.next().unwrap();
        let second = lectures.next().unwrap();
        let mut random = TestRandom::default();
        let _ = assignment.assign(&model, PlacementId { lecture: first, index: 0 }, &mut random);

        let (id, room) = room_of(&model);
        let candidate = model.placement(PlacementId {
            lecture: second,
            index: 0,
        });
        let mut conflicts = ConflictSet::default();
        room.compute_conflicts(id, &model, &assignment, candidate, &mut conflicts);

        assert!(room.in_conflict(id, &model, &assignment, candidate));
        assert!(conflicts.contains(&PlacementId {
            lecture: first,
            index: 0
        }));
        assert!(!room.is_consistent(
            &model,
            candidate,
            model.placement(PlacementId {
                lecture: first,
                index: 0
            })
        ));
    }

    #[test]
    fn non_overlapping_placements_do_not_conflict() {
        let model = two_lectures_one_room();
        let mut assignment = model.create_assignment();
        let mut lectures = model.lecture_ids();
        let first = lectures.next().unwrap();
        let second = lectures.next().unwrap();
        let mut random = TestRandom::default();
        let _ = assignment.assign(&model, PlacementId { lecture: first, index: 0 }, &mut random);

        let (id, room) = room_of(&model);
        let candidate = model.placement(PlacementId {
            lecture: second,
            index: 1,
        });

        assert!(!room.in_conflict(id, &model, &assignment, candidate));
    }

    #[test]
    fn lectures_which_can_share_the_room_fit_within_its_capacity() {
        let time = TimeLocation::new(DAY_CODES[0], 96, 12);
        let room = RoomLocation::new(1, "A", 30);
        let model = ModelBuilder::default()
            .with_room(RoomSpec::new(1, "A", 30))
            .with_lecture(
                LectureSpec::new(1, "L1")
                    .with_class_limit(10, 10)
                    .with_placement(time.clone(), vec![room.clone()]),
            )
            .with_lecture(
                LectureSpec::new(2, "L2")
                    .with_class_limit(15, 15)
                    .with_placement(time.clone(), vec![room.clone()]),
            )
            .with_lecture(
                LectureSpec::new(3, "L3")
                    .with_class_limit(10, 10)
                    .with_placement(time, vec![room]),
            )
            .with_group_constraint(1, "CAN_SHARE_ROOM", "R", &[1, 2, 3])
            .build()
            .unwrap();
        let mut assignment = model.create_assignment();
        let mut random = TestRandom::default();
        let ids = model.lecture_ids().collect::<Vec<_>>();

        let first = assignment.assign(&model, PlacementId { lecture: ids[0], index: 0 }, &mut random);
        let second = assignment.assign(&model, PlacementId { lecture: ids[1], index: 0 }, &mut random);
        assert!(first.is_empty());
        assert!(second.is_empty());

        // 10 + 15 + 10 exceeds the capacity of 30
        let (id, room) = room_of(&model);
        let third = model.placement(PlacementId {
            lecture: ids[2],
            index: 0,
        });
        assert!(room.in_conflict(id, &model, &assignment, third));
    }

    #[test]
    fn a_partition_cannot_be_used_together_with_its_parent() {
        let time = TimeLocation::new(DAY_CODES[1], 100, 6);
        let model = ModelBuilder::default()
            .with_room(RoomSpec::new(1, "Hall", 100))
            .with_room(RoomSpec::new(2, "Hall A", 50).with_parent(1))
            .with_lecture(
                LectureSpec::new(1, "L1")
                    .with_class_limit(40, 40)
                    .with_placement(time.clone(), vec![RoomLocation::new(1, "Hall", 100)]),
            )
            .with_lecture(
                LectureSpec::new(2, "L2")
                    .with_class_limit(20, 20)
                    .with_placement(time, vec![RoomLocation::new(2, "Hall A", 50)]),
            )
            .build()
            .unwrap();
        let mut assignment = model.create_assignment();
        let mut random = TestRandom::default();
        let ids = model.lecture_ids().collect::<Vec<_>>();

        let _ = assignment.assign(&model, PlacementId { lecture: ids[0], index: 0 }, &mut random);
        let conflicts = assignment.conflicts(
            &model,
            model.placement(PlacementId {
                lecture: ids[1],
                index: 0,
            }),
            &mut random,
        );

        assert!(conflicts.contains(&PlacementId {
            lecture: ids[0],
            index: 0
        }));
    }

    #[test]
    fn broken_time_patterns_are_maintained_incrementally() {
        let model = ModelBuilder::default()
            .with_room(RoomSpec::new(1, "A", 30))
            .with_lecture(LectureSpec::new(1, "MW").with_class_limit(10, 10).with_placement(
                TimeLocation::new(DAY_CODES[0] | DAY_CODES[2], 120, 12),
                vec![RoomLocation::new(1, "A", 30)],
            ))
            .build()
            .unwrap();
        let mut assignment = model.create_assignment();
        let mut random = TestRandom::default();
        let lecture = model.lecture_ids().next().unwrap();
        let placement = PlacementId { lecture, index: 0 };

        let (id, room) = room_of(&model);
        let ConstraintContext::Room(context) = assignment.context(id) else {
            panic!("expected a room context")
        };
        let expected = room.broken_time_patterns_of(context, model.placement(placement));

        let _ = assignment.assign(&model, placement, &mut random);

        // Monday and Wednesday are used, Friday is empty for each of the 12 slots
        assert_eq!(
            assignment.criteria().value(CriterionKind::BrokenTimePatterns),
            12.0 / 6.0
        );
        assert_eq!(expected, 12.0 / 6.0);
    }

    #[test]
    fn the_sharing_model_blocks_slots_of_other_departments() {
        let mut sharing = RoomSharingModel::default();
        sharing.set(0, 96, 12, SlotUsage::Department(7));
        sharing.set(1, 96, 12, SlotUsage::NotAvailable);

        let monday = TimeLocation::new(DAY_CODES[0], 96, 6);
        let tuesday = TimeLocation::new(DAY_CODES[1], 96, 6);

        assert!(sharing.is_available(&monday, Some(7)));
        assert!(!sharing.is_available(&monday, Some(8)));
        assert!(!sharing.is_available(&tuesday, Some(7)));
        assert!(sharing.is_not_available(SLOTS_PER_DAY_USIZE + 100));
    }
}
