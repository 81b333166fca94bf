use crate::containers::HashMap;
use crate::engine::AssignmentValues;
use crate::engine::CriterionKind;
use crate::engine::Criteria;
use crate::model::LectureId;
use crate::model::Placement;
use crate::model::TimetableModel;

/// Spreads the time preferences evenly over the instructors.
///
/// The penalty of an instructor is the time preference of their assigned classes above the best
/// time preference each of their classes could get, per assigned class. The criterion
/// [`CriterionKind::InstructorFairness`] is the sum of the absolute differences between these
/// penalties and their mean; it only counts for complete solutions.
///
/// The constraint observes every lecture of the model, so that it notices when the solution
/// becomes (in)complete.
#[derive(Clone, Debug)]
pub struct InstructorFairness {
    /// For each lecture, the indices of its instructors.
    pub(crate) instructors_of: HashMap<LectureId, Vec<usize>>,
    /// Per instructor, the sum of the best time preferences of their classes.
    pub(crate) best_values: Vec<f64>,
    pub(crate) lectures: Vec<LectureId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InstructorFairnessContext {
    values: Vec<f64>,
    nr_classes: Vec<u32>,
    /// The value currently added to the criterion.
    contribution: f64,
}

impl InstructorFairnessContext {
    /// The penalty of the instructor with the given index.
    pub fn penalty(&self, fairness: &InstructorFairness, instructor: usize) -> f64 {
        match self.nr_classes[instructor] {
            0 => 0.0,
            nr_classes => (self.values[instructor] - fairness.best_values[instructor]) / nr_classes as f64,
        }
    }

    pub fn contribution(&self) -> f64 {
        self.contribution
    }
}

impl InstructorFairness {
    pub fn lectures(&self) -> &[LectureId] {
        &self.lectures
    }

    pub fn nr_instructors(&self) -> usize {
        self.best_values.len()
    }

    /// The part of the time preference criterion caused by `placement`.
    pub(crate) fn time_value(model: &TimetableModel, placement: &Placement) -> f64 {
        let lecture = model.lecture(placement.lecture());
        if lecture.is_committed() {
            0.0
        } else {
            lecture.weight() * placement.time().normalized_preference()
        }
    }

    pub(crate) fn create_context(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        criteria: &mut Criteria,
    ) -> InstructorFairnessContext {
        let mut context = InstructorFairnessContext {
            values: vec![0.0; self.nr_instructors()],
            nr_classes: vec![0; self.nr_instructors()],
            contribution: 0.0,
        };
        for lecture in values.assigned_lectures() {
            if let Some(placement) = values.placement(model, lecture) {
                self.add(model, &mut context, placement, 1.0);
            }
        }
        self.refresh(values, &mut context, criteria);
        context
    }

    pub(crate) fn assigned(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        context: &mut InstructorFairnessContext,
        criteria: &mut Criteria,
        placement: &Placement,
    ) {
        self.add(model, context, placement, 1.0);
        self.refresh(values, context, criteria);
    }

    pub(crate) fn unassigned(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        context: &mut InstructorFairnessContext,
        criteria: &mut Criteria,
        placement: &Placement,
    ) {
        self.add(model, context, placement, -1.0);
        self.refresh(values, context, criteria);
    }

    fn add(
        &self,
        model: &TimetableModel,
        context: &mut InstructorFairnessContext,
        placement: &Placement,
        sign: f64,
    ) {
        let Some(instructors) = self.instructors_of.get(&placement.lecture()) else {
            return;
        };
        let value = Self::time_value(model, placement);
        for &instructor in instructors {
            context.values[instructor] += sign * value;
            if sign > 0.0 {
                context.nr_classes[instructor] += 1;
            } else {
                context.nr_classes[instructor] -= 1;
            }
        }
    }

    fn refresh(
        &self,
        values: &AssignmentValues,
        context: &mut InstructorFairnessContext,
        criteria: &mut Criteria,
    ) {
        let contribution = if values.nr_unassigned() == 0 {
            self.objective(context)
        } else {
            0.0
        };
        criteria.inc(
            CriterionKind::InstructorFairness,
            contribution - context.contribution,
        );
        context.contribution = contribution;
    }

    /// The sum of the absolute differences between the penalties of the instructors and their
    /// mean.
    pub fn objective(&self, context: &InstructorFairnessContext) -> f64 {
        if self.nr_instructors() == 0 {
            return 0.0;
        }
        let penalties = (0..self.nr_instructors())
            .map(|instructor| context.penalty(self, instructor))
            .collect::<Vec<_>>();
        let mean = penalties.iter().sum::<f64>() / penalties.len() as f64;
        penalties.iter().map(|penalty| (penalty - mean).abs()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::Properties;
    use crate::engine::ConstraintContext;
    use crate::model::InstructorSpec;
    use crate::model::LectureSpec;
    use crate::model::ModelBuilder;
    use crate::model::PlacementId;
    use crate::model::RoomLocation;
    use crate::model::RoomSpec;
    use crate::model::TimeLocation;
    use crate::model::DAY_CODES;

    /// Two instructors with one class each; the first placement of either class is preferred
    /// (-1), the second one is neutral.
    fn two_instructors() -> TimetableModel {
        let room = RoomLocation::new(1, "A", 30);
        let mut builder = ModelBuilder::default()
            .with_properties(
                Properties::default().set("General.AdditionalCriteria", "InstructorFairness"),
            )
            .with_room(RoomSpec::new(1, "A", 30))
            .with_instructor(InstructorSpec::new(1, "Smith").with_lectures(&[1]))
            .with_instructor(InstructorSpec::new(2, "Jones").with_lectures(&[2]));
        for (class_id, day) in [(1, 0), (2, 1)] {
            builder = builder.with_lecture(
                LectureSpec::new(class_id, format!("L{class_id}"))
                    .with_class_limit(20, 20)
                    .with_placement(
                        TimeLocation::new(DAY_CODES[day], 96, 12).with_preference(-1, -1.0),
                        vec![room.clone()],
                    )
                    .with_placement(
                        TimeLocation::new(DAY_CODES[day], 180, 12),
                        vec![room.clone()],
                    ),
            );
        }
        builder.build().unwrap()
    }

    fn fairness_context<'a>(
        model: &'a TimetableModel,
        assignment: &'a crate::engine::Assignment,
    ) -> (&'a InstructorFairness, &'a InstructorFairnessContext) {
        model
            .constraint_ids()
            .find_map(|id| match (model.constraint(id), assignment.context(id)) {
                (crate::engine::Constraint::InstructorFairness(fairness), ConstraintContext::InstructorFairness(context)) => {
                    Some((fairness, context))
                }
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn unequal_penalties_count_once_the_solution_is_complete() {
        let model = two_instructors();
        let mut assignment = model.create_assignment();
        let ids = model.lecture_ids().collect::<Vec<_>>();

        assignment.assign_unchecked(&model, PlacementId { lecture: ids[0], index: 0 });
        assert_eq!(
            assignment.criteria().value(CriterionKind::InstructorFairness),
            0.0
        );

        assignment.assign_unchecked(&model, PlacementId { lecture: ids[1], index: 1 });
        let (fairness, context) = fairness_context(&model, &assignment);
        assert_eq!(context.penalty(fairness, 0), 0.0);
        assert_eq!(context.penalty(fairness, 1), 1.0);
        // the mean penalty is 0.5, both instructors are 0.5 away from it
        assert!(
            (assignment.criteria().value(CriterionKind::InstructorFairness) - 1.0).abs() < 1e-9
        );
        assert!(assignment
            .criteria()
            .approx_eq(&assignment.recompute_criteria(&model), 1e-9));
    }

    #[test]
    fn equal_penalties_are_fair() {
        let model = two_instructors();
        let mut assignment = model.create_assignment();
        let ids = model.lecture_ids().collect::<Vec<_>>();

        assignment.assign_unchecked(&model, PlacementId { lecture: ids[0], index: 1 });
        assignment.assign_unchecked(&model, PlacementId { lecture: ids[1], index: 1 });

        assert_eq!(
            assignment.criteria().value(CriterionKind::InstructorFairness),
            0.0
        );
    }

    #[test]
    fn an_incomplete_solution_drops_the_criterion() {
        let model = two_instructors();
        let mut assignment = model.create_assignment();
        let ids = model.lecture_ids().collect::<Vec<_>>();
        assignment.assign_unchecked(&model, PlacementId { lecture: ids[0], index: 0 });
        assignment.assign_unchecked(&model, PlacementId { lecture: ids[1], index: 1 });

        let _ = assignment.unassign(&model, ids[1]);

        assert_eq!(
            assignment.criteria().value(CriterionKind::InstructorFairness),
            0.0
        );
        assert!(assignment
            .criteria()
            .approx_eq(&assignment.recompute_criteria(&model), 1e-9));
    }

    #[test]
    fn the_fairness_constraint_is_only_created_when_enabled() {
        let model = crate::model::tests::two_lectures_one_room();

        assert!(model
            .constraint_ids()
            .all(|id| !matches!(model.constraint(id), crate::engine::Constraint::InstructorFairness(_))));
    }
}
