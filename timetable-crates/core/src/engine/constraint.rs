use super::Assignment;
use super::AssignmentValues;
use super::ConflictSet;
use super::ConstraintId;
use super::CriterionKind;
use super::Criteria;
use crate::basic_types::Random;
use crate::constraints::ExtendedStudentConflicts;
use crate::constraints::FlexibleConstraint;
use crate::constraints::FlexibleContext;
use crate::constraints::GroupConstraint;
use crate::constraints::GroupContext;
use crate::constraints::InstructorConstraint;
use crate::constraints::InstructorContext;
use crate::constraints::InstructorFairness;
use crate::constraints::InstructorFairnessContext;
use crate::constraints::JenrlConstraint;
use crate::constraints::JenrlContext;
use crate::constraints::MinimizeRoomsConstraint;
use crate::constraints::MinimizeRoomsContext;
use crate::constraints::MinimizeTimeGroupsConstraint;
use crate::constraints::MinimizeTimeGroupsContext;
use crate::constraints::RoomConstraint;
use crate::constraints::RoomContext;
use crate::constraints::SpreadConstraint;
use crate::constraints::SpreadContext;
use crate::model::LectureId;
use crate::model::Placement;
use crate::model::TimetableModel;

/// A constraint of a [`TimetableModel`].
///
/// The set of constraints is closed, so that the hot loops of the search dispatch on the variant
/// once instead of going through a trait object for every lecture they touch. The state which a
/// constraint maintains for an [`Assignment`] lives in the matching [`ConstraintContext`].
#[derive(Clone, Debug)]
pub enum Constraint {
    Room(RoomConstraint),
    Instructor(InstructorConstraint),
    Jenrl(JenrlConstraint),
    Group(GroupConstraint),
    Flexible(FlexibleConstraint),
    Spread(SpreadConstraint),
    MinimizeRooms(MinimizeRoomsConstraint),
    MinimizeTimeGroups(MinimizeTimeGroupsConstraint),
    InstructorFairness(InstructorFairness),
    ExtendedStudentConflicts(ExtendedStudentConflicts),
}

/// The per-assignment state of a [`Constraint`]; the variant always matches the constraint.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstraintContext {
    Room(RoomContext),
    Instructor(InstructorContext),
    Jenrl(JenrlContext),
    Group(GroupContext),
    Flexible(FlexibleContext),
    Spread(SpreadContext),
    MinimizeRooms(MinimizeRoomsContext),
    MinimizeTimeGroups(MinimizeTimeGroupsContext),
    InstructorFairness(InstructorFairnessContext),
    ExtendedStudentConflicts,
}

impl Constraint {
    /// Whether the constraint may produce conflicts; soft constraints only contribute to the
    /// criteria.
    pub fn is_hard(&self) -> bool {
        match self {
            Constraint::Room(room) => room.is_enforced(),
            Constraint::Instructor(instructor) => !instructor.is_soft(),
            Constraint::Jenrl(_) | Constraint::ExtendedStudentConflicts(_) => true,
            Constraint::Group(group) => group.is_hard(),
            Constraint::Flexible(flexible) => flexible.is_hard(),
            Constraint::Spread(spread) => spread.is_hard(),
            Constraint::MinimizeRooms(rooms) => rooms.is_hard(),
            Constraint::MinimizeTimeGroups(groups) => groups.is_hard(),
            Constraint::InstructorFairness(_) => false,
        }
    }

    /// Whether the constraint can be relaxed when the search gets stuck on it.
    pub fn is_weakening(&self) -> bool {
        match self {
            Constraint::Room(_)
            | Constraint::Instructor(_)
            | Constraint::Group(_)
            | Constraint::InstructorFairness(_)
            | Constraint::ExtendedStudentConflicts(_) => false,
            Constraint::Jenrl(_) => true,
            Constraint::Flexible(flexible) => flexible.is_weakening(),
            Constraint::Spread(spread) => spread.is_hard(),
            Constraint::MinimizeRooms(rooms) => rooms.is_hard(),
            Constraint::MinimizeTimeGroups(groups) => groups.is_hard(),
        }
    }

    pub(crate) fn create_context(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        criteria: &mut Criteria,
    ) -> ConstraintContext {
        match self {
            Constraint::Room(room) => {
                ConstraintContext::Room(room.create_context(model, values, criteria))
            }
            Constraint::Instructor(instructor) => {
                ConstraintContext::Instructor(instructor.create_context(model, values, criteria))
            }
            Constraint::Jenrl(jenrl) => {
                ConstraintContext::Jenrl(jenrl.create_context(model, values, criteria))
            }
            Constraint::Group(group) => {
                ConstraintContext::Group(group.create_context(model, values, criteria))
            }
            Constraint::Flexible(flexible) => {
                ConstraintContext::Flexible(flexible.create_context(model, values, criteria))
            }
            Constraint::Spread(spread) => {
                ConstraintContext::Spread(spread.create_context(model, values, criteria))
            }
            Constraint::MinimizeRooms(rooms) => {
                ConstraintContext::MinimizeRooms(rooms.create_context(model, values))
            }
            Constraint::MinimizeTimeGroups(groups) => {
                ConstraintContext::MinimizeTimeGroups(groups.create_context(model, values))
            }
            Constraint::InstructorFairness(fairness) => ConstraintContext::InstructorFairness(
                fairness.create_context(model, values, criteria),
            ),
            Constraint::ExtendedStudentConflicts(_) => ConstraintContext::ExtendedStudentConflicts,
        }
    }

    /// Updates the context after `placement` was assigned; `values` already contain it.
    pub(crate) fn assigned(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        context: &mut ConstraintContext,
        criteria: &mut Criteria,
        placement: &Placement,
    ) {
        match (self, context) {
            (Constraint::Room(room), ConstraintContext::Room(context)) => {
                room.assigned(context, criteria, placement)
            }
            (Constraint::Instructor(instructor), ConstraintContext::Instructor(context)) => {
                instructor.assigned(model, values, context, criteria, placement)
            }
            (Constraint::Jenrl(jenrl), ConstraintContext::Jenrl(context)) => {
                jenrl.assigned(model, values, context, placement)
            }
            (Constraint::Group(group), ConstraintContext::Group(context)) => {
                group.assigned(model, values, context, criteria)
            }
            (Constraint::Flexible(flexible), ConstraintContext::Flexible(context)) => {
                flexible.assigned(model, values, context, criteria, placement)
            }
            (Constraint::Spread(spread), ConstraintContext::Spread(context)) => {
                spread.assigned(context, criteria, placement)
            }
            (Constraint::MinimizeRooms(rooms), ConstraintContext::MinimizeRooms(context)) => {
                rooms.assigned(model, context, placement)
            }
            (
                Constraint::MinimizeTimeGroups(groups),
                ConstraintContext::MinimizeTimeGroups(context),
            ) => groups.assigned(context, placement),
            (
                Constraint::InstructorFairness(fairness),
                ConstraintContext::InstructorFairness(context),
            ) => fairness.assigned(model, values, context, criteria, placement),
            (Constraint::ExtendedStudentConflicts(_), ConstraintContext::ExtendedStudentConflicts) => {}
            _ => unreachable!("the context of a constraint always matches the constraint"),
        }
    }

    /// Updates the context after `placement` was unassigned; `values` no longer contain it.
    pub(crate) fn unassigned(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        context: &mut ConstraintContext,
        criteria: &mut Criteria,
        placement: &Placement,
    ) {
        match (self, context) {
            (Constraint::Room(room), ConstraintContext::Room(context)) => {
                room.unassigned(context, criteria, placement)
            }
            (Constraint::Instructor(instructor), ConstraintContext::Instructor(context)) => {
                instructor.unassigned(model, values, context, criteria, placement)
            }
            (Constraint::Jenrl(jenrl), ConstraintContext::Jenrl(context)) => {
                jenrl.unassigned(context)
            }
            (Constraint::Group(group), ConstraintContext::Group(context)) => {
                group.unassigned(model, values, context, criteria)
            }
            (Constraint::Flexible(flexible), ConstraintContext::Flexible(context)) => {
                flexible.unassigned(model, values, context, criteria, placement)
            }
            (Constraint::Spread(spread), ConstraintContext::Spread(context)) => {
                spread.unassigned(context, criteria, placement)
            }
            (Constraint::MinimizeRooms(rooms), ConstraintContext::MinimizeRooms(context)) => {
                rooms.unassigned(model, context, placement)
            }
            (
                Constraint::MinimizeTimeGroups(groups),
                ConstraintContext::MinimizeTimeGroups(context),
            ) => groups.unassigned(context, placement),
            (
                Constraint::InstructorFairness(fairness),
                ConstraintContext::InstructorFairness(context),
            ) => fairness.unassigned(model, values, context, criteria, placement),
            (Constraint::ExtendedStudentConflicts(_), ConstraintContext::ExtendedStudentConflicts) => {}
            _ => unreachable!("the context of a constraint always matches the constraint"),
        }
    }

    /// Adds to `conflicts` the placements which have to be unassigned for `placement` to be
    /// assigned; `placement` itself is added when no such set exists.
    pub(crate) fn compute_conflicts(
        &self,
        id: ConstraintId,
        model: &TimetableModel,
        assignment: &Assignment,
        placement: &Placement,
        conflicts: &mut ConflictSet,
        random: &mut dyn Random,
    ) {
        match self {
            Constraint::Room(room) => {
                room.compute_conflicts(id, model, assignment, placement, conflicts)
            }
            Constraint::Instructor(instructor) => {
                instructor.compute_conflicts(id, model, assignment, placement, conflicts)
            }
            Constraint::Jenrl(jenrl) => {
                jenrl.compute_conflicts(id, model, assignment, placement, conflicts)
            }
            Constraint::Group(group) => {
                group.compute_conflicts(id, model, assignment, placement, conflicts, random)
            }
            Constraint::Flexible(flexible) => {
                flexible.compute_conflicts(id, model, assignment, placement, conflicts, random)
            }
            Constraint::Spread(spread) => {
                spread.compute_conflicts(id, model, assignment, placement, conflicts, random)
            }
            Constraint::MinimizeRooms(rooms) => {
                rooms.compute_conflicts(id, model, assignment, placement, conflicts)
            }
            Constraint::MinimizeTimeGroups(groups) => {
                groups.compute_conflicts(id, model, assignment, placement, conflicts)
            }
            Constraint::ExtendedStudentConflicts(extended) => {
                extended.compute_conflicts(model, assignment, placement, conflicts)
            }
            Constraint::InstructorFairness(_) => {}
        }
    }

    /// Whether [`Constraint::compute_conflicts`] would report anything for `placement`.
    pub(crate) fn in_conflict(
        &self,
        id: ConstraintId,
        model: &TimetableModel,
        assignment: &Assignment,
        placement: &Placement,
    ) -> bool {
        match self {
            Constraint::Room(room) => room.in_conflict(id, model, assignment, placement),
            Constraint::Instructor(instructor) => {
                instructor.in_conflict(id, model, assignment, placement)
            }
            Constraint::Jenrl(jenrl) => jenrl.in_conflict(id, model, assignment, placement),
            Constraint::Group(group) => group.in_conflict(id, model, assignment, placement),
            Constraint::Flexible(flexible) => flexible.in_conflict(id, model, assignment, placement),
            Constraint::Spread(spread) => spread.in_conflict(id, assignment, placement),
            Constraint::MinimizeRooms(rooms) => rooms.in_conflict(id, model, assignment, placement),
            Constraint::MinimizeTimeGroups(groups) => {
                groups.in_conflict(id, model, assignment, placement)
            }
            Constraint::ExtendedStudentConflicts(extended) => {
                extended.in_conflict(model, assignment, placement)
            }
            Constraint::InstructorFairness(_) => false,
        }
    }

    /// Whether the two placements can be assigned together as far as this constraint is
    /// concerned. Balancing constraints never rule out a pair.
    pub fn is_consistent(&self, model: &TimetableModel, first: &Placement, second: &Placement) -> bool {
        match self {
            Constraint::Room(room) => room.is_consistent(model, first, second),
            Constraint::Instructor(instructor) => instructor.is_consistent(model, first, second),
            Constraint::Jenrl(jenrl) => jenrl.is_consistent(model, first, second),
            Constraint::Group(group) => group.is_consistent(model, first, second),
            Constraint::Flexible(flexible) => flexible.is_consistent(model, first, second),
            Constraint::ExtendedStudentConflicts(extended) => {
                extended.is_consistent(model, first, second)
            }
            Constraint::Spread(_)
            | Constraint::MinimizeRooms(_)
            | Constraint::MinimizeTimeGroups(_)
            | Constraint::InstructorFairness(_) => true,
        }
    }

    /// Relaxes a weakening constraint a little; called whenever the search cannot find a value
    /// for one of its lectures.
    pub(crate) fn weaken(
        &self,
        model: &TimetableModel,
        _values: &AssignmentValues,
        context: &mut ConstraintContext,
        _criteria: &mut Criteria,
    ) {
        match (self, context) {
            (Constraint::Jenrl(jenrl), ConstraintContext::Jenrl(context)) => {
                jenrl.weaken(model, context)
            }
            (Constraint::Spread(spread), ConstraintContext::Spread(context)) => spread.weaken(context),
            (Constraint::MinimizeRooms(rooms), ConstraintContext::MinimizeRooms(context)) => {
                rooms.weaken(context)
            }
            (
                Constraint::MinimizeTimeGroups(groups),
                ConstraintContext::MinimizeTimeGroups(context),
            ) => groups.weaken(context),
            _ => {}
        }
    }

    /// Relaxes a weakening constraint just enough for `placement` not to be in conflict with it.
    pub(crate) fn weaken_for(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        context: &mut ConstraintContext,
        _criteria: &mut Criteria,
        placement: &Placement,
    ) {
        match (self, context) {
            (Constraint::Jenrl(jenrl), ConstraintContext::Jenrl(context)) => {
                jenrl.weaken_for(model, values, context, placement)
            }
            (Constraint::Flexible(flexible), ConstraintContext::Flexible(context)) => {
                flexible.weaken_for(model, values, context, placement)
            }
            (Constraint::Spread(spread), ConstraintContext::Spread(context)) => {
                spread.weaken_for(context, placement)
            }
            (Constraint::MinimizeRooms(rooms), ConstraintContext::MinimizeRooms(context)) => {
                rooms.weaken_for(model, values, context, placement)
            }
            (
                Constraint::MinimizeTimeGroups(groups),
                ConstraintContext::MinimizeTimeGroups(context),
            ) => groups.weaken_for(model, context, placement),
            _ => {}
        }
    }

    /// Adds to `criteria` how much the totals maintained by this constraint would change if
    /// `placement` were assigned.
    pub(crate) fn marginal_criteria(
        &self,
        id: ConstraintId,
        model: &TimetableModel,
        assignment: &Assignment,
        placement: &Placement,
        criteria: &mut Criteria,
    ) {
        let values = assignment.values();
        match (self, assignment.context(id)) {
            (Constraint::Room(room), ConstraintContext::Room(context)) => criteria.inc(
                CriterionKind::BrokenTimePatterns,
                room.broken_time_patterns_of(context, placement),
            ),
            (Constraint::Instructor(instructor), ConstraintContext::Instructor(context)) => {
                instructor.marginal_criteria(model, values, context, placement, criteria)
            }
            (Constraint::Group(group), _) => criteria.inc(
                CriterionKind::DistributionPreferences,
                group.preference_of(model, values, placement) as f64,
            ),
            (Constraint::Flexible(flexible), _) => criteria.inc(
                CriterionKind::FlexibleConstraint,
                flexible.preference_of(model, values, placement),
            ),
            (Constraint::Spread(spread), ConstraintContext::Spread(context)) => criteria.inc(
                spread.criterion(),
                spread.penalty_of(context, placement) as f64,
            ),
            _ => {}
        }
    }

    /// The lectures whose assignments the constraint observes.
    pub fn lectures(&self) -> Vec<LectureId> {
        match self {
            Constraint::Room(room) => room.lectures.clone(),
            Constraint::Instructor(instructor) => instructor.lectures().to_vec(),
            Constraint::Jenrl(jenrl) => vec![jenrl.first(), jenrl.second()],
            Constraint::Group(group) => group.lectures().to_vec(),
            Constraint::Flexible(flexible) => flexible.lectures().to_vec(),
            Constraint::Spread(spread) => spread.lectures().to_vec(),
            Constraint::MinimizeRooms(rooms) => rooms.lectures().to_vec(),
            Constraint::MinimizeTimeGroups(groups) => groups.lectures().to_vec(),
            Constraint::InstructorFairness(fairness) => fairness.lectures().to_vec(),
            Constraint::ExtendedStudentConflicts(extended) => extended.lectures().to_vec(),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Constraint::Room(room) => room.name().to_owned(),
            Constraint::Instructor(instructor) => instructor.name().to_owned(),
            Constraint::Jenrl(jenrl) => format!("Jenrl {} {}", jenrl.first(), jenrl.second()),
            Constraint::Group(group) => group.to_string(),
            Constraint::Flexible(flexible) => flexible.to_string(),
            Constraint::Spread(spread) => spread.to_string(),
            Constraint::MinimizeRooms(rooms) => rooms.to_string(),
            Constraint::MinimizeTimeGroups(groups) => groups.to_string(),
            Constraint::InstructorFairness(_) => "Instructor Fairness".to_owned(),
            Constraint::ExtendedStudentConflicts(extended) => extended.to_string(),
        }
    }
}
