use log::trace;

use super::ConflictSet;
use super::ConstraintContext;
use super::ConstraintId;
use super::CriterionKind;
use super::Criteria;
use crate::basic_types::Random;
use crate::constraints::jenrl::StudentConflictKinds;
use crate::containers::KeyedVec;
use crate::model::LectureId;
use crate::model::Placement;
use crate::model::PlacementId;
use crate::model::TimetableModel;
use crate::timetable_asserts::timetable_assert_eq_simple;
use crate::timetable_asserts::timetable_assert_moderate;
use crate::timetable_asserts::timetable_assert_simple;

/// The value of an assigned lecture together with the iteration in which it was assigned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssignedValue {
    pub placement: PlacementId,
    pub iteration: u64,
}

/// The placements of the lectures of an [`Assignment`].
#[derive(Clone, Debug, Default)]
pub struct AssignmentValues {
    values: KeyedVec<LectureId, Option<AssignedValue>>,
    nr_assigned: usize,
}

impl AssignmentValues {
    fn new(nr_lectures: usize) -> AssignmentValues {
        AssignmentValues {
            values: KeyedVec::with_len(nr_lectures, None),
            nr_assigned: 0,
        }
    }

    pub fn value(&self, lecture: LectureId) -> Option<PlacementId> {
        self.values[lecture].map(|assigned| assigned.placement)
    }

    pub fn assigned_value(&self, lecture: LectureId) -> Option<AssignedValue> {
        self.values[lecture]
    }

    /// The placement of `lecture`, looked up in the domain of the lecture in `model`.
    pub fn placement<'model>(
        &self,
        model: &'model TimetableModel,
        lecture: LectureId,
    ) -> Option<&'model Placement> {
        self.value(lecture).map(|id| model.placement(id))
    }

    pub fn is_assigned(&self, lecture: LectureId) -> bool {
        self.values[lecture].is_some()
    }

    /// Whether the lecture of `placement` currently holds exactly that placement.
    pub fn holds(&self, placement: PlacementId) -> bool {
        self.value(placement.lecture) == Some(placement)
    }

    pub fn nr_lectures(&self) -> usize {
        self.values.len()
    }

    pub fn nr_assigned(&self) -> usize {
        self.nr_assigned
    }

    pub fn nr_unassigned(&self) -> usize {
        self.values.len() - self.nr_assigned
    }

    pub fn assigned_lectures(&self) -> impl Iterator<Item = LectureId> + '_ {
        self.values
            .enumerate()
            .filter(|(_, value)| value.is_some())
            .map(|(lecture, _)| lecture)
    }

    pub fn unassigned_lectures(&self) -> impl Iterator<Item = LectureId> + '_ {
        self.values
            .enumerate()
            .filter(|(_, value)| value.is_none())
            .map(|(lecture, _)| lecture)
    }

    fn set(&mut self, lecture: LectureId, value: Option<AssignedValue>) {
        match (self.values[lecture].is_some(), value.is_some()) {
            (false, true) => self.nr_assigned += 1,
            (true, false) => self.nr_assigned -= 1,
            _ => {}
        }
        self.values[lecture] = value;
    }
}

/// A (partial) solution of a [`TimetableModel`].
///
/// Next to the placements of the lectures, an assignment owns the context of every constraint of
/// the model and the totals of every criterion; both are updated incrementally whenever a lecture
/// is assigned or unassigned. Cloning an assignment forks it: the clone can be modified
/// independently of the original.
#[derive(Clone, Debug)]
pub struct Assignment {
    values: AssignmentValues,
    contexts: KeyedVec<ConstraintId, ConstraintContext>,
    criteria: Criteria,
    nr_assignments: KeyedVec<LectureId, u32>,
    iteration: u64,
}

impl Assignment {
    /// Creates an empty assignment of `model`; use [`TimetableModel::create_assignment`] to also
    /// place the committed lectures.
    pub(crate) fn empty(model: &TimetableModel) -> Assignment {
        let values = AssignmentValues::new(model.nr_lectures());
        let mut criteria = Criteria::default();
        let contexts = model
            .constraints()
            .iter()
            .map(|constraint| constraint.create_context(model, &values, &mut criteria))
            .collect();

        Assignment {
            values,
            contexts,
            criteria,
            nr_assignments: KeyedVec::with_len(model.nr_lectures(), 0),
            iteration: 0,
        }
    }

    pub fn values(&self) -> &AssignmentValues {
        &self.values
    }

    pub fn value(&self, lecture: LectureId) -> Option<PlacementId> {
        self.values.value(lecture)
    }

    pub fn placement<'model>(
        &self,
        model: &'model TimetableModel,
        lecture: LectureId,
    ) -> Option<&'model Placement> {
        self.values.placement(model, lecture)
    }

    pub fn nr_assigned(&self) -> usize {
        self.values.nr_assigned()
    }

    pub fn nr_unassigned(&self) -> usize {
        self.values.nr_unassigned()
    }

    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    pub fn context(&self, constraint: ConstraintId) -> &ConstraintContext {
        &self.contexts[constraint]
    }

    /// How many times the lecture has been assigned so far.
    pub fn nr_assignments(&self, lecture: LectureId) -> u32 {
        self.nr_assignments[lecture]
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn set_iteration(&mut self, iteration: u64) {
        self.iteration = iteration;
    }

    /// Collects the placements which have to be unassigned before `placement` can be assigned,
    /// according to every hard constraint of its lecture.
    ///
    /// The set contains `placement` itself when a constraint cannot make room for it at all.
    pub fn conflicts(
        &self,
        model: &TimetableModel,
        placement: &Placement,
        random: &mut dyn Random,
    ) -> ConflictSet {
        let mut conflicts = ConflictSet::default();
        for &constraint_id in model.hard_constraints_of(placement.lecture()) {
            model.constraint(constraint_id).compute_conflicts(
                constraint_id,
                model,
                self,
                placement,
                &mut conflicts,
                random,
            );
        }
        conflicts
    }

    /// Whether some hard constraint would have to unassign another lecture if `placement` were
    /// assigned.
    pub fn in_conflict(&self, model: &TimetableModel, placement: &Placement) -> bool {
        model
            .hard_constraints_of(placement.lecture())
            .any(|&constraint_id| {
                model
                    .constraint(constraint_id)
                    .in_conflict(constraint_id, model, self, placement)
            })
    }

    /// Assigns `placement`, unassigning the current value of its lecture and every conflicting
    /// placement first.
    ///
    /// Returns the placements which were unassigned because of conflicts. When the conflicts
    /// contain `placement` itself, nothing is changed.
    pub fn assign(
        &mut self,
        model: &TimetableModel,
        placement: PlacementId,
        random: &mut dyn Random,
    ) -> ConflictSet {
        let conflicts = self.conflicts(model, model.placement(placement), random);
        if conflicts.contains(&placement) {
            return conflicts;
        }
        for conflict in conflicts.iter() {
            timetable_assert_moderate!(
                !model.lecture(conflict.lecture).is_committed(),
                "A committed lecture cannot be in conflict"
            );
            if self.values.holds(*conflict) {
                let _ = self.unassign(model, conflict.lecture);
            }
        }
        let _ = self.unassign(model, placement.lecture);
        self.assign_unchecked(model, placement);
        conflicts
    }

    /// Assigns `placement` without looking for conflicts; the lecture has to be unassigned.
    pub(crate) fn assign_unchecked(&mut self, model: &TimetableModel, placement_id: PlacementId) {
        self.nr_assignments[placement_id.lecture] += 1;
        self.place(
            model,
            AssignedValue {
                placement: placement_id,
                iteration: self.iteration,
            },
        );
    }

    /// Gives the lecture the value `value` without looking for conflicts and without counting it
    /// as an assignment of the lecture; tentative moves use it to change and restore values.
    pub(crate) fn set_value(
        &mut self,
        model: &TimetableModel,
        lecture: LectureId,
        value: Option<AssignedValue>,
    ) {
        let _ = self.unassign(model, lecture);
        if let Some(value) = value {
            timetable_assert_eq_simple!(value.placement.lecture, lecture);
            self.place(model, value);
        }
    }

    fn place(&mut self, model: &TimetableModel, value: AssignedValue) {
        let placement_id = value.placement;
        let lecture = placement_id.lecture;
        timetable_assert_simple!(!self.values.is_assigned(lecture));
        trace!("assign {} := {}", model.lecture(lecture), model.placement(placement_id));

        let placement = model.placement(placement_id);
        let delta = placement_criteria(model, &self.values, placement);
        self.criteria.add(&delta);

        self.values.set(lecture, Some(value));

        for &constraint_id in model.constraints_of(lecture) {
            model.constraint(constraint_id).assigned(
                model,
                &self.values,
                &mut self.contexts[constraint_id],
                &mut self.criteria,
                placement,
            );
        }
    }

    /// Unassigns the lecture, returning the placement it held.
    pub fn unassign(&mut self, model: &TimetableModel, lecture: LectureId) -> Option<PlacementId> {
        let placement_id = self.values.value(lecture)?;
        timetable_assert_moderate!(
            !model.lecture(lecture).is_committed(),
            "Committed lectures are never unassigned"
        );
        trace!("unassign {} := {}", model.lecture(lecture), model.placement(placement_id));

        let placement = model.placement(placement_id);
        self.values.set(lecture, None);

        let delta = placement_criteria(model, &self.values, placement);
        for (kind, value) in delta.iter() {
            self.criteria.inc(kind, -value);
        }

        for &constraint_id in model.constraints_of(lecture) {
            model.constraint(constraint_id).unassigned(
                model,
                &self.values,
                &mut self.contexts[constraint_id],
                &mut self.criteria,
                placement,
            );
        }
        Some(placement_id)
    }

    /// Relaxes the weakening constraint.
    pub fn weaken(&mut self, model: &TimetableModel, constraint: ConstraintId) {
        model.constraint(constraint).weaken(
            model,
            &self.values,
            &mut self.contexts[constraint],
            &mut self.criteria,
        );
    }

    /// Relaxes the weakening constraint so that `placement` is no longer in conflict with it.
    pub fn weaken_for(
        &mut self,
        model: &TimetableModel,
        constraint: ConstraintId,
        placement: &Placement,
    ) {
        model.constraint(constraint).weaken_for(
            model,
            &self.values,
            &mut self.contexts[constraint],
            &mut self.criteria,
            placement,
        );
    }

    pub(crate) fn context_and_criteria_mut(
        &mut self,
        constraint: ConstraintId,
    ) -> (&mut ConstraintContext, &mut Criteria) {
        (&mut self.contexts[constraint], &mut self.criteria)
    }

    /// Recomputes every total from scratch, by re-creating the constraint contexts of the current
    /// placements and re-evaluating every placement.
    pub fn recompute_criteria(&self, model: &TimetableModel) -> Criteria {
        let mut criteria = Criteria::default();
        let mut values = AssignmentValues::new(model.nr_lectures());
        let mut contexts: KeyedVec<ConstraintId, ConstraintContext> = model
            .constraints()
            .iter()
            .map(|constraint| constraint.create_context(model, &values, &mut criteria))
            .collect();

        for lecture in self.values.assigned_lectures() {
            let Some(assigned) = self.values.assigned_value(lecture) else {
                continue;
            };
            let placement = model.placement(assigned.placement);
            criteria.add(&placement_criteria(model, &values, placement));
            values.set(lecture, Some(assigned));
            for &constraint_id in model.constraints_of(lecture) {
                model.constraint(constraint_id).assigned(
                    model,
                    &values,
                    &mut contexts[constraint_id],
                    &mut criteria,
                    placement,
                );
            }
        }
        criteria
    }
}

/// The contribution of `placement` to the criteria which depend on single placements: time, room
/// and too big room preferences, perturbations and student conflicts with the lectures assigned in
/// `values`.
pub(crate) fn placement_criteria(
    model: &TimetableModel,
    values: &AssignmentValues,
    placement: &Placement,
) -> Criteria {
    let mut criteria = Criteria::default();
    let lecture = model.lecture(placement.lecture());

    if !lecture.is_committed() {
        criteria.inc(
            CriterionKind::TimePreferences,
            lecture.weight() * placement.time().normalized_preference(),
        );
        criteria.inc(
            CriterionKind::RoomPreferences,
            placement.sum_room_preference() as f64,
        );
    }
    criteria.inc(
        CriterionKind::TooBigRooms,
        placement.too_big_room_preference() as f64,
    );
    if lecture
        .initial()
        .is_some_and(|initial| initial != placement.id())
    {
        criteria.inc(CriterionKind::Perturbations, 1.0);
    }

    for (&other, &jenrl) in lecture.jenrl_with.iter() {
        let Some(other_placement) = values.placement(model, other) else {
            continue;
        };
        let kinds = StudentConflictKinds::between(model, placement, other_placement);
        if kinds.is_empty() {
            continue;
        }
        let weight = model.jenrl_weight(jenrl);
        for kind in kinds.iter() {
            criteria.inc(kind, weight);
        }
    }

    criteria
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::two_lectures_one_room;
    use crate::model::InstructorSpec;
    use crate::model::LectureSpec;
    use crate::model::ModelBuilder;
    use crate::model::RoomLocation;
    use crate::model::RoomSpec;
    use crate::model::TimeLocation;
    use crate::model::DAY_CODES;

    #[test]
    fn assigning_updates_the_values() {
        let model = two_lectures_one_room();
        let mut assignment = model.create_assignment();
        let first = model.lecture_ids().next().unwrap();

        assignment.assign_unchecked(
            &model,
            PlacementId {
                lecture: first,
                index: 0,
            },
        );

        assert_eq!(assignment.nr_assigned(), 1);
        assert_eq!(assignment.nr_assignments(first), 1);
        assert_eq!(
            assignment.value(first),
            Some(PlacementId {
                lecture: first,
                index: 0
            })
        );
    }

    #[test]
    fn unassigning_restores_the_criteria() {
        let model = two_lectures_one_room();
        let mut assignment = model.create_assignment();
        let before = assignment.criteria().clone();
        let first = model.lecture_ids().next().unwrap();

        assignment.assign_unchecked(
            &model,
            PlacementId {
                lecture: first,
                index: 1,
            },
        );
        let _ = assignment.unassign(&model, first);

        assert!(assignment.criteria().approx_eq(&before, 1e-9));
        assert_eq!(assignment.nr_assigned(), 0);
    }

    #[test]
    fn assigning_a_conflicting_placement_unassigns_the_other_lecture() {
        let model = two_lectures_one_room();
        let mut assignment = model.create_assignment();
        let mut lectures = model.lecture_ids();
        let first = lectures.next().unwrap();
        let second = lectures.next().unwrap();
        let mut random = crate::basic_types::TestRandom::default();

        let _ = assignment.assign(
            &model,
            PlacementId {
                lecture: first,
                index: 0,
            },
            &mut random,
        );
        let conflicts = assignment.assign(
            &model,
            PlacementId {
                lecture: second,
                index: 0,
            },
            &mut random,
        );

        assert!(conflicts.contains(&PlacementId {
            lecture: first,
            index: 0
        }));
        assert!(!assignment.values().is_assigned(first));
        assert!(assignment.values().is_assigned(second));
    }

    /// Lectures 1 and 2 share a room and an instructor, and prefer to be taught on one day.
    fn shared_room_and_instructor() -> TimetableModel {
        let room = RoomLocation::new(1, "A", 30);
        let lecture = |class_id: u64| {
            LectureSpec::new(class_id, format!("L{class_id}"))
                .with_class_limit(20, 20)
                .with_placement(TimeLocation::new(DAY_CODES[0], 96, 12), vec![room.clone()])
                .with_placement(TimeLocation::new(DAY_CODES[1], 96, 12), vec![room.clone()])
        };
        ModelBuilder::default()
            .with_room(RoomSpec::new(1, "A", 30))
            .with_instructor(InstructorSpec::new(1, "Instructor").with_lectures(&[1, 2]))
            .with_lecture(lecture(1))
            .with_lecture(lecture(2))
            .with_group_constraint(1, "SAME_DAYS", "-1", &[1, 2])
            .with_flexible_constraint(1, "Student", "_MaxDays:1_", "1", &[1, 2])
            .build()
            .unwrap()
    }

    fn contexts(model: &TimetableModel, assignment: &Assignment) -> Vec<ConstraintContext> {
        model
            .constraint_ids()
            .map(|constraint| assignment.context(constraint).clone())
            .collect()
    }

    #[test]
    fn unassigning_restores_every_constraint_context() {
        let model = shared_room_and_instructor();
        let mut assignment = model.create_assignment();
        let mut lectures = model.lecture_ids();
        let first = lectures.next().unwrap();
        let second = lectures.next().unwrap();
        let mut random = crate::basic_types::TestRandom::default();
        let _ = assignment.assign(
            &model,
            PlacementId {
                lecture: first,
                index: 0,
            },
            &mut random,
        );
        let before = contexts(&model, &assignment);
        let criteria_before = assignment.criteria().clone();

        let conflicts = assignment.assign(
            &model,
            PlacementId {
                lecture: second,
                index: 1,
            },
            &mut random,
        );
        assert!(conflicts.is_empty());
        assert_ne!(contexts(&model, &assignment), before);
        let _ = assignment.unassign(&model, second);

        assert_eq!(contexts(&model, &assignment), before);
        assert!(assignment.criteria().approx_eq(&criteria_before, 1e-9));
    }

    #[test]
    fn a_cloned_assignment_is_independent_of_the_original() {
        let model = shared_room_and_instructor();
        let mut assignment = model.create_assignment();
        let mut lectures = model.lecture_ids();
        let first = lectures.next().unwrap();
        let second = lectures.next().unwrap();
        let mut random = crate::basic_types::TestRandom::default();
        let placed = PlacementId {
            lecture: first,
            index: 0,
        };
        let _ = assignment.assign(&model, placed, &mut random);
        let before = contexts(&model, &assignment);
        let criteria_before = assignment.criteria().clone();

        let mut fork = assignment.clone();
        let _ = fork.unassign(&model, first);
        let _ = fork.assign(
            &model,
            PlacementId {
                lecture: second,
                index: 1,
            },
            &mut random,
        );
        fork.set_iteration(10);

        assert_eq!(assignment.value(first), Some(placed));
        assert_eq!(assignment.value(second), None);
        assert_eq!(assignment.iteration(), 0);
        assert_eq!(contexts(&model, &assignment), before);
        assert!(assignment.criteria().approx_eq(&criteria_before, 1e-9));
        assert_ne!(contexts(&model, &fork), before);
        assert_eq!(fork.value(first), None);
    }

    #[test]
    fn criteria_match_a_recomputation() {
        let model = two_lectures_one_room();
        let mut assignment = model.create_assignment();
        let mut lectures = model.lecture_ids();
        let first = lectures.next().unwrap();
        let second = lectures.next().unwrap();
        let mut random = crate::basic_types::TestRandom::default();

        for (lecture, index) in [(first, 1), (second, 0), (first, 0)] {
            let _ = assignment.assign(&model, PlacementId { lecture, index }, &mut random);
        }

        assert!(assignment
            .criteria()
            .approx_eq(&assignment.recompute_criteria(&model), 1e-9));
    }
}
