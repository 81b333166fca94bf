use enumset::EnumSet;
use enumset::EnumSetType;

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
use crate::model::TimetableModel;
use crate::model::SLOT_LENGTH_MIN;

/// The variants of student conflicts which are counted separately by the criteria.
#[derive(Debug, EnumSetType)]
pub enum StudentConflictKind {
    Soft,
    Hard,
    Committed,
    Distance,
}

impl StudentConflictKind {
    pub fn criterion(self) -> CriterionKind {
        match self {
            StudentConflictKind::Soft => CriterionKind::StudentConflict,
            StudentConflictKind::Hard => CriterionKind::HardStudentConflict,
            StudentConflictKind::Committed => CriterionKind::CommittedStudentConflict,
            StudentConflictKind::Distance => CriterionKind::DistanceStudentConflict,
        }
    }
}

/// The student conflict criteria to which a pair of placements contributes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StudentConflictKinds(EnumSet<StudentConflictKind>);

impl StudentConflictKinds {
    pub fn between(model: &TimetableModel, first: &Placement, second: &Placement) -> StudentConflictKinds {
        let l1 = model.lecture(first.lecture());
        let l2 = model.lecture(second.lecture());
        if l1.is_to_ignore_student_conflicts_with(l2.id()) {
            return StudentConflictKinds::default();
        }

        let distance = distance_conflict(model, first, second);
        let conflict = distance || overlaps(model, first, second);
        let uncommitted = !l1.is_committed() && !l2.is_committed();
        let committed = l1.is_committed() != l2.is_committed();

        let mut kinds = EnumSet::empty();
        if uncommitted && conflict {
            let _ = kinds.insert(StudentConflictKind::Soft);
            if l1.is_single_section() && l2.is_single_section() {
                let _ = kinds.insert(StudentConflictKind::Hard);
            }
        }
        if committed && conflict {
            let _ = kinds.insert(StudentConflictKind::Committed);
        }
        if uncommitted && distance {
            let _ = kinds.insert(StudentConflictKind::Distance);
        }
        StudentConflictKinds(kinds)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, kind: StudentConflictKind) -> bool {
        self.0.contains(kind)
    }

    /// The criteria of the contained kinds.
    pub fn iter(&self) -> impl Iterator<Item = CriterionKind> {
        self.0.iter().map(StudentConflictKind::criterion)
    }
}

/// The placements overlap in time and at least one of the lectures is not committed.
pub fn overlaps(model: &TimetableModel, first: &Placement, second: &Placement) -> bool {
    first.time().has_intersection(second.time())
        && !(model.lecture(first.lecture()).is_committed()
            && model.lecture(second.lecture()).is_committed())
}

/// Students cannot get from one placement to the other in time.
pub fn distance_conflict(model: &TimetableModel, first: &Placement, second: &Placement) -> bool {
    if model.lecture(first.lecture()).is_committed() && model.lecture(second.lecture()).is_committed()
    {
        return false;
    }
    let (t1, t2) = (first.time(), second.time());
    if !t1.share_days(t2) || !t1.share_weeks(t2) {
        return false;
    }
    let metric = model.distance_metric();
    let minutes = || first.distance_in_minutes(metric, second);
    if metric.compute_distance_conflicts_between_non_btb_classes() {
        if t1.end_slot() <= t2.start_slot() {
            return minutes() > t1.break_time() + SLOT_LENGTH_MIN * (t2.start_slot() - t1.end_slot());
        }
        if t2.end_slot() <= t1.start_slot() {
            return minutes() > t2.break_time() + SLOT_LENGTH_MIN * (t1.start_slot() - t2.end_slot());
        }
    } else {
        if t1.end_slot() == t2.start_slot() {
            return minutes() > t1.break_time();
        }
        if t2.end_slot() == t1.start_slot() {
            return minutes() > t2.break_time();
        }
    }
    false
}

/// The two placements, taken together, span more slots of a day than the work day limit allows.
pub fn workday_conflict(slots_limit: i32, first: &Placement, second: &Placement) -> bool {
    if slots_limit <= 0 {
        return false;
    }
    let (t1, t2) = (first.time(), second.time());
    if !t1.share_days(t2) || !t1.share_weeks(t2) {
        return false;
    }
    let span = t1.end_slot().max(t2.end_slot()) - t1.start_slot().min(t2.start_slot());
    span > slots_limit
}

/// Joint enrollment between two lectures: the (fractional) number of students attending both.
///
/// The constraint is soft until the weight exceeds a fraction of the smaller class limit, after
/// which the two lectures may no longer be placed in conflict with each other. The fraction is
/// raised whenever the constraint is weakened.
#[derive(Clone, Debug)]
pub struct JenrlConstraint {
    pub(crate) first: LectureId,
    pub(crate) second: LectureId,
    pub(crate) weight: f64,
    pub(crate) max_conflicts: f64,
    pub(crate) max_conflicts_weaken: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct JenrlContext {
    /// Whether the two lectures are currently placed in conflict.
    conflicting: bool,
    limit: Option<f64>,
    twiggle: f64,
}

impl JenrlContext {
    pub fn is_conflicting(&self) -> bool {
        self.conflicting
    }

    pub fn limit(&self) -> Option<f64> {
        self.limit
    }

    pub fn is_over_limit(&self, weight: f64) -> bool {
        self.limit.is_some_and(|limit| weight > limit)
    }
}

impl JenrlConstraint {
    pub fn first(&self) -> LectureId {
        self.first
    }

    pub fn second(&self) -> LectureId {
        self.second
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// The other lecture of the constraint.
    pub fn another(&self, lecture: LectureId) -> LectureId {
        if lecture == self.first {
            self.second
        } else {
            self.first
        }
    }

    fn min_class_limit(&self, model: &TimetableModel) -> f64 {
        model
            .lecture(self.first)
            .max_class_limit()
            .min(model.lecture(self.second).max_class_limit()) as f64
    }

    fn limit_for(&self, model: &TimetableModel, max_conflicts: f64) -> Option<f64> {
        (0.0..1.0)
            .contains(&max_conflicts)
            .then(|| self.min_class_limit(model) * max_conflicts)
    }

    /// Whether the two placements would cause a student conflict which counts for the hard part
    /// of this constraint.
    pub fn is_in_conflict(model: &TimetableModel, first: &Placement, second: &Placement) -> bool {
        !model
            .lecture(first.lecture())
            .is_to_ignore_student_conflicts_with(second.lecture())
            && (distance_conflict(model, first, second)
                || overlaps(model, first, second)
                || workday_conflict(model.student_workday_limit(), first, second))
    }

    pub(crate) fn create_context(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        _criteria: &mut Criteria,
    ) -> JenrlContext {
        let conflicting = match (
            values.placement(model, self.first),
            values.placement(model, self.second),
        ) {
            (Some(first), Some(second)) => Self::is_in_conflict(model, first, second),
            _ => false,
        };
        JenrlContext {
            conflicting,
            limit: self.limit_for(model, self.max_conflicts),
            twiggle: 0.0,
        }
    }

    pub(crate) fn assigned(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        context: &mut JenrlContext,
        placement: &Placement,
    ) {
        if context.conflicting {
            return;
        }
        if let Some(other) = values.placement(model, self.another(placement.lecture())) {
            context.conflicting = Self::is_in_conflict(model, placement, other);
        }
    }

    pub(crate) fn unassigned(&self, context: &mut JenrlContext) {
        context.conflicting = false;
    }

    fn context_of(assignment: &Assignment, constraint: ConstraintId) -> &JenrlContext {
        match assignment.context(constraint) {
            ConstraintContext::Jenrl(context) => context,
            _ => unreachable!("a joint enrollment constraint always has a jenrl context"),
        }
    }

    fn conflicting_placement<'model>(
        &self,
        id: ConstraintId,
        model: &'model TimetableModel,
        assignment: &Assignment,
        placement: &Placement,
    ) -> Option<&'model Placement> {
        let context = Self::context_of(assignment, id);
        if !context.is_over_limit(self.weight) || model.lecture(placement.lecture()).is_committed() {
            return None;
        }
        let other = self.another(placement.lecture());
        if model.lecture(other).is_committed() {
            return None;
        }
        assignment
            .placement(model, other)
            .filter(|other| Self::is_in_conflict(model, placement, other))
    }

    pub(crate) fn compute_conflicts(
        &self,
        id: ConstraintId,
        model: &TimetableModel,
        assignment: &Assignment,
        placement: &Placement,
        conflicts: &mut ConflictSet,
    ) {
        if let Some(other) = self.conflicting_placement(id, model, assignment, placement) {
            let _ = conflicts.insert(other.id());
        }
    }

    pub(crate) fn in_conflict(
        &self,
        id: ConstraintId,
        model: &TimetableModel,
        assignment: &Assignment,
        placement: &Placement,
    ) -> bool {
        self.conflicting_placement(id, model, assignment, placement)
            .is_some()
    }

    pub fn is_consistent(&self, model: &TimetableModel, first: &Placement, second: &Placement) -> bool {
        !Self::is_in_conflict(model, first, second)
    }

    /// Raises the fraction of the smaller class limit above which the constraint becomes hard.
    pub(crate) fn weaken(&self, model: &TimetableModel, context: &mut JenrlContext) {
        context.twiggle += self.max_conflicts_weaken;
        context.limit = self.limit_for(model, self.max_conflicts + context.twiggle);
    }

    /// Raises the limit just enough for `placement` not to be in conflict with this constraint.
    pub(crate) fn weaken_for(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        context: &mut JenrlContext,
        placement: &Placement,
    ) {
        let conflict = context.is_over_limit(self.weight)
            && !model.lecture(placement.lecture()).is_committed()
            && values
                .placement(model, self.another(placement.lecture()))
                .is_some_and(|other| {
                    !model.lecture(other.lecture()).is_committed()
                        && Self::is_in_conflict(model, placement, other)
                });
        if !conflict {
            return;
        }
        let max_conflicts = self.max_conflicts + context.twiggle;
        context.twiggle = (self.weight + 0.00001) / self.min_class_limit(model) - max_conflicts;
        context.limit = self.limit_for(model, max_conflicts + context.twiggle);
    }

    /// Changes the weight by `delta`, keeping the student conflict criteria and the hard limit of
    /// the context consistent; `kinds` are the student conflicts between the current placements of
    /// the two lectures.
    pub(crate) fn change_weight(
        &mut self,
        min_class_limit: f64,
        kinds: StudentConflictKinds,
        context: &mut JenrlContext,
        criteria: &mut Criteria,
        delta: f64,
    ) {
        let hard = context.is_over_limit(self.weight);
        self.weight += delta;
        for kind in kinds.iter() {
            criteria.inc(kind, delta);
        }
        if delta > 0.0 {
            if !hard && context.is_over_limit(self.weight) && context.conflicting {
                if let Some(limit) = context.limit.as_mut() {
                    *limit += delta;
                }
            }
        } else if hard && !context.is_over_limit(self.weight) {
            let max_conflicts = self.max_conflicts + context.twiggle;
            context.limit = if (0.0..1.0).contains(&max_conflicts) {
                context
                    .limit
                    .map(|limit| (min_class_limit * max_conflicts).max(limit + delta))
            } else {
                None
            };
        }
    }

    /// The joint enrollment counted if `placement` were assigned to its lecture.
    pub fn jenrl_of(&self, model: &TimetableModel, values: &AssignmentValues, placement: &Placement) -> f64 {
        values
            .placement(model, self.another(placement.lecture()))
            .filter(|other| Self::is_in_conflict(model, placement, other))
            .map_or(0.0, |_| self.weight.round())
    }

    pub(crate) fn min_class_limit_of(first: &Lecture, second: &Lecture) -> f64 {
        first.max_class_limit().min(second.max_class_limit()) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::Properties;
    use crate::basic_types::TestRandom;
    use crate::model::LectureSpec;
    use crate::model::ModelBuilder;
    use crate::model::PlacementId;
    use crate::model::RoomLocation;
    use crate::model::TimeLocation;
    use crate::model::DAY_CODES;

    fn jenrl_model(max_conflicts: f64, weight: f64) -> TimetableModel {
        let room = RoomLocation::new(1, "A", 50);
        let mut builder = ModelBuilder::default()
            .with_properties(Properties::default().set("General.JenrlMaxConflicts", max_conflicts));
        for class_id in [1, 2] {
            builder = builder.with_lecture(
                LectureSpec::new(class_id, format!("L{class_id}"))
                    .with_class_limit(10, 10)
                    .with_placement(TimeLocation::new(DAY_CODES[0], 96, 12), vec![room.clone()])
                    .with_placement(TimeLocation::new(DAY_CODES[1], 96, 12), vec![room.clone()]),
            );
        }
        builder.with_joint_enrollment(1, 2, weight).build().unwrap()
    }

    fn jenrl_of(model: &TimetableModel) -> ConstraintId {
        model
            .constraint_ids()
            .find(|&id| model.jenrl_constraint(id).is_some())
            .unwrap()
    }

    fn context(assignment: &Assignment, id: ConstraintId) -> &JenrlContext {
        JenrlConstraint::context_of(assignment, id)
    }

    #[test]
    fn a_ratio_of_one_never_makes_the_constraint_hard() {
        let model = jenrl_model(1.0, 5.0);
        let assignment = model.create_assignment();
        let id = jenrl_of(&model);

        assert_eq!(context(&assignment, id).limit(), None);
        assert!(!context(&assignment, id).is_over_limit(5.0));
    }

    #[test]
    fn a_lower_ratio_makes_the_constraint_hard_once_the_weight_exceeds_it() {
        let mut model = jenrl_model(0.5, 5.0);
        let mut assignment = model.create_assignment();
        let id = jenrl_of(&model);

        assert_eq!(context(&assignment, id).limit(), Some(5.0));
        assert!(!context(&assignment, id).is_over_limit(model.jenrl_weight(id)));

        model.inc_jenrl(&mut assignment, id, 1.0);

        assert!(context(&assignment, id).is_over_limit(model.jenrl_weight(id)));
    }

    #[test]
    fn a_hard_jenrl_evicts_the_overlapping_lecture() {
        let model = jenrl_model(0.1, 5.0);
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

        let elsewhere = model.placement(PlacementId {
            lecture: ids[1],
            index: 1,
        });
        assert!(!assignment.in_conflict(&model, elsewhere));
    }

    #[test]
    fn weakening_for_a_placement_removes_the_conflict() {
        let model = jenrl_model(0.1, 5.0);
        let mut assignment = model.create_assignment();
        let mut random = TestRandom::default();
        let ids = model.lecture_ids().collect::<Vec<_>>();
        let _ = assignment.assign(&model, PlacementId { lecture: ids[0], index: 0 }, &mut random);
        let id = jenrl_of(&model);
        let candidate = model.placement(PlacementId {
            lecture: ids[1],
            index: 0,
        });

        assignment.weaken_for(&model, id, candidate);

        assert!(!assignment.in_conflict(&model, candidate));
    }

    #[test]
    fn changing_the_weight_updates_the_student_conflicts() {
        let mut model = jenrl_model(1.0, 2.0);
        let mut assignment = model.create_assignment();
        let mut random = TestRandom::default();
        let ids = model.lecture_ids().collect::<Vec<_>>();
        let _ = assignment.assign(&model, PlacementId { lecture: ids[0], index: 0 }, &mut random);
        let _ = assignment.assign(&model, PlacementId { lecture: ids[1], index: 0 }, &mut random);
        assert_eq!(
            assignment.criteria().value(CriterionKind::StudentConflict),
            2.0
        );

        let id = jenrl_of(&model);
        model.inc_jenrl(&mut assignment, id, 1.5);
        model.dec_jenrl(&mut assignment, id, 0.5);

        assert_eq!(
            assignment.criteria().value(CriterionKind::StudentConflict),
            3.0
        );
        assert!(assignment
            .criteria()
            .approx_eq(&assignment.recompute_criteria(&model), 1e-9));
    }

    #[test]
    fn the_workday_limit_spans_both_placements() {
        let model = jenrl_model(1.0, 1.0);
        let ids = model.lecture_ids().collect::<Vec<_>>();
        let first = model.placement(PlacementId {
            lecture: ids[0],
            index: 0,
        });
        let second = model.placement(PlacementId {
            lecture: ids[1],
            index: 0,
        });

        assert!(workday_conflict(10, first, second));
        assert!(!workday_conflict(12, first, second));
        assert!(!workday_conflict(-1, first, second));
    }
}
