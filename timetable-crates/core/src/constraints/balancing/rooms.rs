use log::debug;

use super::count_unassignment;
use super::SpreadOptions;
use crate::containers::HashMap;
use crate::containers::HashSet;
use crate::engine::Assignment;
use crate::engine::AssignmentValues;
use crate::engine::ConflictSet;
use crate::engine::ConstraintContext;
use crate::engine::ConstraintId;
use crate::model::LectureId;
use crate::model::Placement;
use crate::model::PlacementId;
use crate::model::TimetableModel;

/// Keeps the lectures in as few rooms as possible.
///
/// The limit starts at the number of rooms the lectures need anyway: the rooms of committed
/// lectures and of lectures with a single room, or the largest number of rooms the domains need at
/// the same time on average.
#[derive(Clone, Debug)]
pub struct MinimizeRoomsConstraint {
    pub(crate) unassignments_to_weaken: u64,
    /// Only the part of the week is used, to estimate the limit.
    pub(crate) window: SpreadOptions,
    pub(crate) lectures: Vec<LectureId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MinimizeRoomsContext {
    used_rooms: HashMap<u64, HashSet<LectureId>>,
    limit: usize,
    unassignments: u64,
}

impl MinimizeRoomsContext {
    pub fn nr_used_rooms(&self) -> usize {
        self.used_rooms.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl MinimizeRoomsConstraint {
    pub fn lectures(&self) -> &[LectureId] {
        &self.lectures
    }

    pub fn is_hard(&self) -> bool {
        self.unassignments_to_weaken > 0
    }

    /// The number of rooms which the lectures cannot avoid using.
    pub fn estimate_limit(&self, model: &TimetableModel) -> usize {
        let mut mandatory_rooms: HashSet<_> = HashSet::default();
        let mut histogram = self.window.grid(0.0);
        for &lecture in &self.lectures {
            let lecture = model.lecture(lecture);
            if lecture.nr_rooms() == 0 {
                continue;
            }
            let room_locations = lecture.room_locations();
            if lecture.is_committed() || room_locations.len() == 1 {
                mandatory_rooms.extend(room_locations.iter().map(|room| room.id()));
            }
            let domain = lecture.domain();
            for placement in domain {
                for (slot, day) in self.window.cells(placement.time()) {
                    histogram[slot][day] += lecture.nr_rooms() as f64 / domain.len() as f64;
                }
            }
        }
        let max_average_rooms = histogram
            .iter()
            .flatten()
            .map(|&value| value.ceil() as usize)
            .max()
            .unwrap_or(0);
        mandatory_rooms.len().max(max_average_rooms).max(1)
    }

    pub(crate) fn create_context(&self, model: &TimetableModel, values: &AssignmentValues) -> MinimizeRoomsContext {
        let mut context = MinimizeRoomsContext {
            used_rooms: HashMap::default(),
            limit: 0,
            unassignments: 0,
        };
        for &lecture in &self.lectures {
            if let Some(placement) = values.placement(model, lecture) {
                self.assigned(model, &mut context, placement);
            }
        }
        context.limit = context.used_rooms.len().max(self.estimate_limit(model));
        context
    }

    pub(crate) fn assigned(&self, model: &TimetableModel, context: &mut MinimizeRoomsContext, placement: &Placement) {
        if model.lecture(placement.lecture()).nr_rooms() == 0 {
            return;
        }
        for room in placement.room_ids() {
            let _ = context
                .used_rooms
                .entry(room)
                .or_default()
                .insert(placement.lecture());
        }
    }

    pub(crate) fn unassigned(&self, model: &TimetableModel, context: &mut MinimizeRoomsContext, placement: &Placement) {
        if model.lecture(placement.lecture()).nr_rooms() == 0 {
            return;
        }
        for room in placement.room_ids() {
            if let Some(lectures) = context.used_rooms.get_mut(&room) {
                let _ = lectures.remove(&placement.lecture());
                if lectures.is_empty() {
                    let _ = context.used_rooms.remove(&room);
                }
            }
        }
    }

    /// By how many rooms the limit would be exceeded if `placement` replaced the current
    /// placement of its lecture.
    pub fn over_limit(
        &self,
        model: &TimetableModel,
        context: &MinimizeRoomsContext,
        values: &AssignmentValues,
        placement: &Placement,
    ) -> usize {
        if !self.is_hard() {
            return 0;
        }
        let lecture = model.lecture(placement.lecture());
        if lecture.nr_rooms() == 0
            || lecture.is_committed()
            || lecture.room_locations().len() == lecture.nr_rooms()
        {
            return 0;
        }
        let used = context.used_rooms.len();
        if used + lecture.nr_rooms() <= context.limit {
            return 0;
        }

        let mut released: Vec<u64> = values
            .placement(model, lecture.id())
            .filter(|current| current.id() != placement.id())
            .map(|current| current.room_ids().collect())
            .unwrap_or_default();
        let mut usage = used;
        for room in placement.room_ids() {
            if let Some(position) = released.iter().position(|&other| other == room) {
                let _ = released.swap_remove(position);
            } else if !context.used_rooms.contains_key(&room) {
                usage += 1;
            }
        }
        for room in released {
            if context.used_rooms.get(&room).is_some_and(|lectures| lectures.len() == 1) {
                usage -= 1;
            }
        }

        if usage <= used || usage <= context.limit {
            0
        } else {
            usage - context.limit
        }
    }

    pub(crate) fn compute_conflicts(
        &self,
        id: ConstraintId,
        model: &TimetableModel,
        assignment: &Assignment,
        placement: &Placement,
        conflicts: &mut ConflictSet,
    ) {
        let context = Self::context_of(assignment, id);
        let over = self.over_limit(model, context, assignment.values(), placement);
        if over == 0 {
            return;
        }

        let mut adepts: Vec<(u64, Vec<PlacementId>)> = context
            .used_rooms
            .iter()
            .filter(|(room, lectures)| {
                !placement.has_room(**room)
                    && lectures
                        .iter()
                        .all(|&lecture| !model.lecture(lecture).is_committed())
            })
            .map(|(&room, lectures)| {
                let placements = lectures
                    .iter()
                    .filter(|&&lecture| lecture != placement.lecture())
                    .filter_map(|&lecture| assignment.value(lecture))
                    .filter(|other| !conflicts.contains(other))
                    .collect();
                (room, placements)
            })
            .collect();

        if adepts.len() < over {
            let _ = conflicts.insert(placement.id());
            return;
        }
        adepts.sort_by_key(|(room, placements)| (placements.len(), *room));
        for (_, placements) in adepts.into_iter().take(over) {
            conflicts.extend(placements);
        }
    }

    pub(crate) fn in_conflict(
        &self,
        id: ConstraintId,
        model: &TimetableModel,
        assignment: &Assignment,
        placement: &Placement,
    ) -> bool {
        let context = Self::context_of(assignment, id);
        self.over_limit(model, context, assignment.values(), placement) > 0
    }

    pub(crate) fn weaken(&self, context: &mut MinimizeRoomsContext) {
        if count_unassignment(&mut context.unassignments, self.unassignments_to_weaken) {
            context.limit += 1;
            debug!("minimize used rooms: limit raised to {}", context.limit);
        }
    }

    pub(crate) fn weaken_for(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        context: &mut MinimizeRoomsContext,
        placement: &Placement,
    ) {
        let over = self.over_limit(model, context, values, placement);
        if over > 0 {
            context.limit += over;
            debug!("minimize used rooms: limit raised to {} for {placement}", context.limit);
        }
    }

    pub(crate) fn context_of(assignment: &Assignment, constraint: ConstraintId) -> &MinimizeRoomsContext {
        match assignment.context(constraint) {
            ConstraintContext::MinimizeRooms(context) => context,
            _ => unreachable!("a minimize rooms constraint always has its own context"),
        }
    }
}

impl std::fmt::Display for MinimizeRoomsConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Minimize number of used rooms")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::TestRandom;
    use crate::model::LectureSpec;
    use crate::model::ModelBuilder;
    use crate::model::RoomLocation;
    use crate::model::TimeLocation;
    use crate::model::DAY_CODES;

    /// Two lectures which can each meet in room 1 or in room 2, at different times.
    fn two_rooms_model() -> TimetableModel {
        let morning = TimeLocation::new(DAY_CODES[0], 96, 12);
        let afternoon = TimeLocation::new(DAY_CODES[0], 150, 12);
        let room = |id| RoomLocation::new(id, format!("R{id}"), 20);
        ModelBuilder::default()
            .with_lecture(
                LectureSpec::new(1, "L1")
                    .with_class_limit(10, 10)
                    .with_placement(morning.clone(), vec![room(1)])
                    .with_placement(afternoon.clone(), vec![room(2)]),
            )
            .with_lecture(
                LectureSpec::new(2, "L2")
                    .with_class_limit(10, 10)
                    .with_placement(afternoon, vec![room(1)])
                    .with_placement(morning, vec![room(2)]),
            )
            .with_minimize_rooms(&[1, 2])
            .build()
            .unwrap()
    }

    fn minimize_rooms_of(model: &TimetableModel) -> (ConstraintId, &MinimizeRoomsConstraint) {
        model
            .constraint_ids()
            .find_map(|id| model.minimize_rooms_constraint(id).map(|c| (id, c)))
            .unwrap()
    }

    fn placement_id(model: &TimetableModel, lecture: usize, index: u32) -> PlacementId {
        PlacementId {
            lecture: model.lecture_ids().nth(lecture).unwrap(),
            index,
        }
    }

    #[test]
    fn the_limit_is_the_average_number_of_rooms_needed_at_once() {
        let model = two_rooms_model();
        let (id, constraint) = minimize_rooms_of(&model);
        let assignment = model.create_assignment();

        assert_eq!(constraint.estimate_limit(&model), 1);
        assert_eq!(MinimizeRoomsConstraint::context_of(&assignment, id).limit(), 1);
    }

    #[test]
    fn a_second_room_evicts_the_lectures_of_the_first() {
        let model = two_rooms_model();
        let (id, constraint) = minimize_rooms_of(&model);
        let mut assignment = model.create_assignment();
        let mut random = TestRandom::default();
        let _ = assignment.assign(&model, placement_id(&model, 0, 0), &mut random);

        let same_room = model.placement(placement_id(&model, 1, 0));
        assert!(!constraint.in_conflict(id, &model, &assignment, same_room));

        let other_room = model.placement(placement_id(&model, 1, 1));
        assert!(constraint.in_conflict(id, &model, &assignment, other_room));
        let mut conflicts = ConflictSet::default();
        constraint.compute_conflicts(id, &model, &assignment, other_room, &mut conflicts);
        assert_eq!(conflicts.len(), 1);
        assert!(conflicts.contains(&placement_id(&model, 0, 0)));
    }

    #[test]
    fn moving_a_lecture_to_a_new_room_releases_its_old_room() {
        let model = two_rooms_model();
        let (id, constraint) = minimize_rooms_of(&model);
        let mut assignment = model.create_assignment();
        let mut random = TestRandom::default();
        let _ = assignment.assign(&model, placement_id(&model, 0, 0), &mut random);

        let moved = model.placement(placement_id(&model, 0, 1));
        assert!(!constraint.in_conflict(id, &model, &assignment, moved));
    }

    #[test]
    fn weakening_for_a_placement_raises_the_limit() {
        let model = two_rooms_model();
        let (id, constraint) = minimize_rooms_of(&model);
        let mut assignment = model.create_assignment();
        let mut random = TestRandom::default();
        let _ = assignment.assign(&model, placement_id(&model, 0, 0), &mut random);

        let other_room = model.placement(placement_id(&model, 1, 1));
        assignment.weaken_for(&model, id, other_room);

        assert_eq!(MinimizeRoomsConstraint::context_of(&assignment, id).limit(), 2);
        assert!(!constraint.in_conflict(id, &model, &assignment, other_room));
        let conflicts = assignment.assign(&model, other_room.id(), &mut random);
        assert!(conflicts.is_empty());
        assert_eq!(
            MinimizeRoomsConstraint::context_of(&assignment, id).nr_used_rooms(),
            2
        );
    }
}
