use super::DistanceMetric;
use super::Lecture;
use super::LectureId;
use super::Placement;
use super::PlacementId;
use super::WeekCode;
use crate::basic_types::Properties;
use crate::constraints::jenrl::StudentConflictKinds;
use crate::constraints::BalancingOptions;
use crate::constraints::FlexibleConstraint;
use crate::constraints::FlexibleOptions;
use crate::constraints::GroupConstraint;
use crate::constraints::GroupOptions;
use crate::constraints::InstructorConstraint;
use crate::constraints::InstructorOptions;
use crate::constraints::JenrlConstraint;
use crate::constraints::MinimizeRoomsConstraint;
use crate::constraints::MinimizeTimeGroupsConstraint;
use crate::constraints::RoomConstraint;
use crate::constraints::SpreadConstraint;
use crate::containers::HashMap;
use crate::containers::KeyedVec;
use crate::engine::Assignment;
use crate::engine::Constraint;
use crate::engine::ConstraintContext;
use crate::engine::ConstraintId;

/// A timetabling problem: the lectures with their domains and the constraints between them.
///
/// The model is immutable during the search (apart from the joint enrollment weights, see
/// [`TimetableModel::inc_jenrl`]); all the state of a search lives in an [`Assignment`], created
/// by [`TimetableModel::create_assignment`]. Models are created by the
/// [`ModelBuilder`](super::ModelBuilder).
#[derive(Debug)]
pub struct TimetableModel {
    pub(crate) lectures: KeyedVec<LectureId, Lecture>,
    pub(crate) constraints: KeyedVec<ConstraintId, Constraint>,
    pub(crate) lecture_by_class: HashMap<u64, LectureId>,
    pub(crate) properties: Properties,
    pub(crate) distance_metric: DistanceMetric,
    pub(crate) group_options: GroupOptions,
    pub(crate) flexible_options: FlexibleOptions,
    pub(crate) balancing_options: BalancingOptions,
    pub(crate) instructor_options: InstructorOptions,
    pub(crate) weeks: Vec<WeekCode>,
    pub(crate) student_workday_limit: i32,
}

impl TimetableModel {
    pub fn lecture(&self, lecture: LectureId) -> &Lecture {
        &self.lectures[lecture]
    }

    pub fn lectures(&self) -> impl Iterator<Item = &Lecture> {
        self.lectures.iter()
    }

    pub fn lecture_ids(&self) -> impl Iterator<Item = LectureId> + '_ {
        self.lectures.keys()
    }

    pub fn nr_lectures(&self) -> usize {
        self.lectures.len()
    }

    /// The lecture created for the class with the given id.
    pub fn lecture_by_class_id(&self, class_id: u64) -> Option<LectureId> {
        self.lecture_by_class.get(&class_id).copied()
    }

    pub fn placement(&self, placement: PlacementId) -> &Placement {
        self.lectures[placement.lecture].placement(placement.index)
    }

    /// Creates an assignment in which only the committed lectures are placed, at their initial
    /// placements.
    pub fn create_assignment(&self) -> Assignment {
        let mut assignment = Assignment::empty(self);
        for lecture in self.lectures.iter().filter(|lecture| lecture.is_committed()) {
            if let Some(initial) = lecture.initial() {
                assignment.assign_unchecked(self, initial);
            }
        }
        assignment
    }

    pub fn constraint(&self, constraint: ConstraintId) -> &Constraint {
        &self.constraints[constraint]
    }

    pub fn constraint_ids(&self) -> impl Iterator<Item = ConstraintId> + '_ {
        self.constraints.keys()
    }

    pub fn nr_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub(crate) fn constraints(&self) -> &KeyedVec<ConstraintId, Constraint> {
        &self.constraints
    }

    /// Every constraint which is notified when `lecture` is (un)assigned.
    pub fn constraints_of(&self, lecture: LectureId) -> impl Iterator<Item = &ConstraintId> {
        self.lectures[lecture].constraints.iter()
    }

    /// The constraints of `lecture` which can produce conflicts.
    pub fn hard_constraints_of(&self, lecture: LectureId) -> impl Iterator<Item = &ConstraintId> {
        self.lectures[lecture].hard_constraints.iter()
    }

    /// The hard constraints of `lecture` which can be relaxed when the search gets stuck.
    pub fn weakening_constraints_of(&self, lecture: LectureId) -> impl Iterator<Item = &ConstraintId> {
        self.lectures[lecture].weakening_constraints.iter()
    }

    pub fn room_constraint(&self, constraint: ConstraintId) -> Option<&RoomConstraint> {
        match &self.constraints[constraint] {
            Constraint::Room(room) => Some(room),
            _ => None,
        }
    }

    pub fn instructor_constraint(&self, constraint: ConstraintId) -> Option<&InstructorConstraint> {
        match &self.constraints[constraint] {
            Constraint::Instructor(instructor) => Some(instructor),
            _ => None,
        }
    }

    pub fn jenrl_constraint(&self, constraint: ConstraintId) -> Option<&JenrlConstraint> {
        match &self.constraints[constraint] {
            Constraint::Jenrl(jenrl) => Some(jenrl),
            _ => None,
        }
    }

    pub fn group_constraint(&self, constraint: ConstraintId) -> Option<&GroupConstraint> {
        match &self.constraints[constraint] {
            Constraint::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn flexible_constraint(&self, constraint: ConstraintId) -> Option<&FlexibleConstraint> {
        match &self.constraints[constraint] {
            Constraint::Flexible(flexible) => Some(flexible),
            _ => None,
        }
    }

    pub fn spread_constraint(&self, constraint: ConstraintId) -> Option<&SpreadConstraint> {
        match &self.constraints[constraint] {
            Constraint::Spread(spread) => Some(spread),
            _ => None,
        }
    }

    pub fn minimize_rooms_constraint(&self, constraint: ConstraintId) -> Option<&MinimizeRoomsConstraint> {
        match &self.constraints[constraint] {
            Constraint::MinimizeRooms(rooms) => Some(rooms),
            _ => None,
        }
    }

    pub fn minimize_time_groups_constraint(
        &self,
        constraint: ConstraintId,
    ) -> Option<&MinimizeTimeGroupsConstraint> {
        match &self.constraints[constraint] {
            Constraint::MinimizeTimeGroups(groups) => Some(groups),
            _ => None,
        }
    }

    /// The weight of a joint enrollment constraint, `0` for any other constraint.
    pub fn jenrl_weight(&self, constraint: ConstraintId) -> f64 {
        self.jenrl_constraint(constraint)
            .map_or(0.0, JenrlConstraint::weight)
    }

    /// Adds `delta` students to the joint enrollment `constraint`, keeping the student conflict
    /// criteria of `assignment` and the hard limit of its context consistent.
    pub fn inc_jenrl(&mut self, assignment: &mut Assignment, constraint: ConstraintId, delta: f64) {
        let Some(jenrl) = self.jenrl_constraint(constraint) else {
            return;
        };
        let (first, second) = (jenrl.first(), jenrl.second());
        let min_class_limit =
            JenrlConstraint::min_class_limit_of(self.lecture(first), self.lecture(second));
        let kinds = match (
            assignment.placement(self, first),
            assignment.placement(self, second),
        ) {
            (Some(p1), Some(p2)) => StudentConflictKinds::between(self, p1, p2),
            _ => StudentConflictKinds::default(),
        };

        let (context, criteria) = assignment.context_and_criteria_mut(constraint);
        let ConstraintContext::Jenrl(context) = context else {
            unreachable!("a joint enrollment constraint always has a jenrl context")
        };
        if let Constraint::Jenrl(jenrl) = &mut self.constraints[constraint] {
            jenrl.change_weight(min_class_limit, kinds, context, criteria, delta);
        }
    }

    /// Removes `delta` students from the joint enrollment `constraint`.
    pub fn dec_jenrl(&mut self, assignment: &mut Assignment, constraint: ConstraintId, delta: f64) {
        self.inc_jenrl(assignment, constraint, -delta);
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn distance_metric(&self) -> &DistanceMetric {
        &self.distance_metric
    }

    pub fn group_options(&self) -> &GroupOptions {
        &self.group_options
    }

    pub fn flexible_options(&self) -> &FlexibleOptions {
        &self.flexible_options
    }

    pub fn balancing_options(&self) -> &BalancingOptions {
        &self.balancing_options
    }

    pub fn instructor_options(&self) -> &InstructorOptions {
        &self.instructor_options
    }

    /// The weeks of the term, each a set of (at most seven) days.
    pub fn weeks(&self) -> &[WeekCode] {
        &self.weeks
    }

    /// The maximal number of slots between the start of the first and the end of the last class
    /// of a student on a day; non-positive when unlimited.
    pub fn student_workday_limit(&self) -> i32 {
        self.student_workday_limit
    }
}
