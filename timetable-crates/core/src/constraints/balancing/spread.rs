use log::debug;

use super::count_unassignment;
use super::SpreadOptions;
use crate::basic_types::Random;
use crate::containers::HashSet;
use crate::engine::Assignment;
use crate::engine::ConflictSet;
use crate::engine::ConstraintContext;
use crate::engine::ConstraintId;
use crate::engine::CriterionKind;
use crate::engine::Criteria;
use crate::engine::AssignmentValues;
use crate::model::LectureId;
use crate::model::Placement;
use crate::model::PlacementId;
use crate::model::TimeLocation;
use crate::model::TimetableModel;

/// Spreads the lectures of a scheduling subpart (or of a department) over the times of the week.
///
/// Every cell (slot and day) of the balanced part of the week gets a limit on the number of
/// lectures meeting in it, derived from how often the domains of the lectures cover it. The
/// constraint counts the lectures above those limits; it is hard while it can be weakened and
/// only ever allows the penalty it had when the search started plus what weakening added.
#[derive(Clone, Debug)]
pub struct SpreadConstraint {
    pub(crate) name: String,
    pub(crate) department: Option<u64>,
    pub(crate) options: SpreadOptions,
    pub(crate) lectures: Vec<LectureId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpreadContext {
    courses: Vec<Vec<HashSet<PlacementId>>>,
    max_courses: Vec<Vec<usize>>,
    current_penalty: i32,
    max_allowed_penalty: i32,
    unassignments: u64,
}

impl SpreadContext {
    pub fn current_penalty(&self) -> i32 {
        self.current_penalty
    }

    pub fn max_allowed_penalty(&self) -> i32 {
        self.max_allowed_penalty
    }

    /// The limit of a cell, relative to the first day slot and the first work day.
    pub fn max_courses(&self, slot: usize, day: usize) -> usize {
        self.max_courses[slot][day]
    }

    /// The number of lectures other than `excluded` meeting in a cell.
    fn nr_courses(&self, slot: usize, day: usize, excluded: Option<LectureId>) -> usize {
        self.courses[slot][day]
            .iter()
            .filter(|placement| Some(placement.lecture) != excluded)
            .count()
    }
}

impl SpreadConstraint {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn department(&self) -> Option<u64> {
        self.department
    }

    pub fn lectures(&self) -> &[LectureId] {
        &self.lectures
    }

    pub fn options(&self) -> &SpreadOptions {
        &self.options
    }

    /// A spread constraint works as a hard constraint as long as it can be weakened.
    pub fn is_hard(&self) -> bool {
        self.options.unassignments_to_weaken > 0
    }

    /// The criterion to which the penalty of the constraint is added.
    pub fn criterion(&self) -> CriterionKind {
        if self.department.is_some() {
            CriterionKind::DepartmentBalancingPenalty
        } else {
            CriterionKind::SameSubpartBalancingPenalty
        }
    }

    /// The limits of the cells, from the histogram of the domains of the lectures.
    fn max_courses(&self, model: &TimetableModel) -> Vec<Vec<usize>> {
        let options = &self.options;
        let mut histogram = options.grid(0.0);
        let mut total_used_slots = 0;
        for &lecture in &self.lectures {
            let domain = model.lecture(lecture).domain();
            let Some(first) = domain.first() else {
                continue;
            };
            total_used_slots += first.time().length() as usize * first.time().nr_meetings();
            for placement in domain {
                for (slot, day) in options.cells(placement.time()) {
                    histogram[slot][day] += 1.0 / domain.len() as f64;
                }
            }
        }

        let threshold = options.spread_factor * total_used_slots as f64
            / (options.nr_days() * options.nr_slots()).max(1) as f64;
        histogram
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|value| {
                        let limit = if value <= threshold {
                            options.spread_factor * value
                        } else {
                            value
                        };
                        (0.999 + limit) as usize
                    })
                    .collect()
            })
            .collect()
    }

    pub(crate) fn create_context(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        criteria: &mut Criteria,
    ) -> SpreadContext {
        let mut courses = self.options.grid(HashSet::default());
        for &lecture in &self.lectures {
            let Some(placement) = values.placement(model, lecture) else {
                continue;
            };
            for (slot, day) in self.options.cells(placement.time()) {
                let _ = courses[slot][day].insert(placement.id());
            }
        }
        let max_courses = self.max_courses(model);
        let current_penalty = courses
            .iter()
            .zip(&max_courses)
            .flat_map(|(row, limits)| row.iter().zip(limits))
            .map(|(cell, &limit)| cell.len().saturating_sub(limit) as i32)
            .sum();
        criteria.inc(self.criterion(), current_penalty as f64);
        SpreadContext {
            courses,
            max_courses,
            current_penalty,
            max_allowed_penalty: current_penalty,
            unassignments: 0,
        }
    }

    pub(crate) fn assigned(&self, context: &mut SpreadContext, criteria: &mut Criteria, placement: &Placement) {
        let before = context.current_penalty;
        for (slot, day) in self.options.cells(placement.time()) {
            let _ = context.courses[slot][day].insert(placement.id());
            if context.courses[slot][day].len() > context.max_courses[slot][day] {
                context.current_penalty += 1;
            }
        }
        criteria.inc(self.criterion(), (context.current_penalty - before) as f64);
    }

    pub(crate) fn unassigned(&self, context: &mut SpreadContext, criteria: &mut Criteria, placement: &Placement) {
        let before = context.current_penalty;
        for (slot, day) in self.options.cells(placement.time()) {
            if context.courses[slot][day].len() > context.max_courses[slot][day] {
                context.current_penalty -= 1;
            }
            let _ = context.courses[slot][day].remove(&placement.id());
        }
        criteria.inc(self.criterion(), (context.current_penalty - before) as f64);
    }

    /// The number of cells of `placement` which are already full without its lecture, i.e. the
    /// increase of the penalty if it were assigned.
    pub fn penalty_of(&self, context: &SpreadContext, placement: &Placement) -> i32 {
        self.options
            .cells(placement.time())
            .filter(|&(slot, day)| {
                context.nr_courses(slot, day, Some(placement.lecture())) >= context.max_courses[slot][day]
            })
            .count() as i32
    }

    /// Adds a time to the counts, returning by how much the penalty grew.
    fn try_assign(&self, context: &SpreadContext, time: &TimeLocation, nr_courses: &mut [Vec<usize>]) -> i32 {
        let mut penalty = 0;
        for (slot, day) in self.options.cells(time) {
            nr_courses[slot][day] += 1;
            if nr_courses[slot][day] > context.max_courses[slot][day] {
                penalty += 1;
            }
        }
        penalty
    }

    /// Removes a time from the counts, returning by how much the penalty shrank.
    fn try_unassign(&self, context: &SpreadContext, time: &TimeLocation, nr_courses: &mut [Vec<usize>]) -> i32 {
        let mut improvement = 0;
        for (slot, day) in self.options.cells(time) {
            if nr_courses[slot][day] > context.max_courses[slot][day] {
                improvement += 1;
            }
            nr_courses[slot][day] = nr_courses[slot][day].saturating_sub(1);
        }
        improvement
    }

    pub(crate) fn compute_conflicts(
        &self,
        id: ConstraintId,
        model: &TimetableModel,
        assignment: &Assignment,
        placement: &Placement,
        conflicts: &mut ConflictSet,
        random: &mut dyn Random,
    ) {
        if !self.is_hard() {
            return;
        }
        let context = Self::context_of(assignment, id);
        let mut penalty = context.current_penalty + self.penalty_of(context, placement);
        if penalty <= context.max_allowed_penalty {
            return;
        }

        let lecture = placement.lecture();
        let mut nr_courses: Vec<Vec<usize>> = (0..self.options.nr_slots())
            .map(|slot| {
                (0..self.options.nr_days())
                    .map(|day| context.nr_courses(slot, day, Some(lecture)))
                    .collect()
            })
            .collect();
        let _ = self.try_assign(context, placement.time(), &mut nr_courses);

        for &other in &self.lectures {
            if other == lecture {
                continue;
            }
            if let Some(current) = assignment.value(other) {
                if conflicts.contains(&current) {
                    penalty -= self.try_unassign(context, model.placement(current).time(), &mut nr_courses);
                }
            }
            if penalty <= context.max_allowed_penalty {
                return;
            }
        }

        let mut adepts: Vec<PlacementId> = self
            .options
            .cells(placement.time())
            .filter(|&(slot, day)| nr_courses[slot][day] >= context.max_courses[slot][day])
            .flat_map(|(slot, day)| context.courses[slot][day].iter().copied())
            .filter(|adept| {
                adept.lecture != lecture
                    && !conflicts.contains(adept)
                    && !model.lecture(adept.lecture).is_committed()
            })
            .collect();
        adepts.sort();
        adepts.dedup();

        while penalty > context.max_allowed_penalty {
            let Some(index) = random.choose_index(adepts.len()) else {
                let _ = conflicts.insert(placement.id());
                return;
            };
            let adept = adepts.swap_remove(index);
            let _ = conflicts.insert(adept);
            penalty -= self.try_unassign(context, model.placement(adept).time(), &mut nr_courses);
        }
    }

    pub(crate) fn in_conflict(&self, id: ConstraintId, assignment: &Assignment, placement: &Placement) -> bool {
        if !self.is_hard() {
            return false;
        }
        let context = Self::context_of(assignment, id);
        context.current_penalty + self.penalty_of(context, placement) > context.max_allowed_penalty
    }

    pub(crate) fn weaken(&self, context: &mut SpreadContext) {
        if count_unassignment(&mut context.unassignments, self.options.unassignments_to_weaken) {
            context.max_allowed_penalty += 1;
            debug!(
                "{}: allowed penalty raised to {}",
                self.name, context.max_allowed_penalty
            );
        }
    }

    /// Raises the allowed penalty so that `placement` fits.
    pub(crate) fn weaken_for(&self, context: &mut SpreadContext, placement: &Placement) {
        if !self.is_hard() {
            return;
        }
        let penalty = context.current_penalty + self.penalty_of(context, placement);
        if penalty > context.max_allowed_penalty {
            context.max_allowed_penalty = penalty;
            debug!("{}: allowed penalty raised to {penalty} for {placement}", self.name);
        }
    }

    pub(crate) fn context_of(assignment: &Assignment, constraint: ConstraintId) -> &SpreadContext {
        match assignment.context(constraint) {
            ConstraintContext::Spread(context) => context,
            _ => unreachable!("a spread constraint always has a spread context"),
        }
    }
}

impl std::fmt::Display for SpreadConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Time Spread {}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::Properties;
    use crate::basic_types::TestRandom;
    use crate::model::LectureSpec;
    use crate::model::ModelBuilder;
    use crate::model::RoomLocation;
    use crate::model::DAY_CODES;

    /// Three sections which can each meet at two times of a Monday; the histogram allows two of
    /// them at the same time.
    fn spread_model(unassignments_to_weaken: u64) -> TimetableModel {
        let mut builder = ModelBuilder::default().with_properties(
            Properties::default()
                .set("Spread.SpreadFactor", 1.0)
                .set("Spread.Unassignments2Weaken", unassignments_to_weaken),
        );
        for class_id in 1..=3 {
            builder = builder.with_lecture(
                LectureSpec::new(class_id, format!("L{class_id}"))
                    .with_class_limit(10, 10)
                    .with_subpart(1)
                    .with_nr_rooms(0)
                    .with_placement(TimeLocation::new(DAY_CODES[0], 96, 12), vec![])
                    .with_placement(TimeLocation::new(DAY_CODES[0], 120, 12), vec![]),
            );
        }
        builder.with_spread_constraint("subpart 1", &[1, 2, 3]).build().unwrap()
    }

    fn spread_of(model: &TimetableModel) -> (ConstraintId, &SpreadConstraint) {
        model
            .constraint_ids()
            .find_map(|id| model.spread_constraint(id).map(|spread| (id, spread)))
            .unwrap()
    }

    fn placement(model: &TimetableModel, lecture: usize, index: u32) -> &Placement {
        let lecture = model.lecture_ids().nth(lecture).unwrap();
        model.placement(PlacementId { lecture, index })
    }

    #[test]
    fn the_limits_follow_the_histogram_of_the_domains() {
        let model = spread_model(50);
        let (id, _) = spread_of(&model);
        let assignment = model.create_assignment();
        let context = SpreadConstraint::context_of(&assignment, id);

        // every section covers a cell of both times with probability 1/2
        assert_eq!(context.max_courses(6, 0), 2);
        assert_eq!(context.max_courses(30, 0), 2);
        assert_eq!(context.max_courses(0, 0), 0);
        assert_eq!(context.current_penalty(), 0);
    }

    #[test]
    fn a_full_time_evicts_one_of_its_lectures() {
        let model = spread_model(50);
        let (id, spread) = spread_of(&model);
        let mut assignment = model.create_assignment();
        let mut random = TestRandom {
            usizes: vec![0],
            ..Default::default()
        };
        let _ = assignment.assign(&model, placement(&model, 0, 0).id(), &mut random);
        let _ = assignment.assign(&model, placement(&model, 1, 0).id(), &mut random);

        let third = placement(&model, 2, 0);
        assert!(spread.in_conflict(id, &assignment, third));
        let mut conflicts = ConflictSet::default();
        spread.compute_conflicts(id, &model, &assignment, third, &mut conflicts, &mut random);

        assert_eq!(conflicts.len(), 1);
        assert!(conflicts.contains(&placement(&model, 0, 0).id()));
        assert!(!spread.in_conflict(id, &assignment, placement(&model, 2, 1)));
    }

    #[test]
    fn a_soft_spread_only_counts_the_penalty() {
        let model = spread_model(0);
        let (id, spread) = spread_of(&model);
        let mut assignment = model.create_assignment();
        let mut random = TestRandom::default();
        for lecture in 0..3 {
            let conflicts = assignment.assign(&model, placement(&model, lecture, 0).id(), &mut random);
            assert!(conflicts.is_empty());
        }

        // the third lecture is above the limit in each of its 12 cells
        assert_eq!(SpreadConstraint::context_of(&assignment, id).current_penalty(), 12);
        assert_eq!(
            assignment.criteria().value(CriterionKind::SameSubpartBalancingPenalty),
            12.0
        );
        assert!(!spread.is_hard());
        assert!(assignment
            .criteria()
            .approx_eq(&assignment.recompute_criteria(&model), 1e-9));
    }

    #[test]
    fn weakening_for_a_placement_allows_it() {
        let model = spread_model(50);
        let (id, spread) = spread_of(&model);
        let mut assignment = model.create_assignment();
        let mut random = TestRandom::default();
        let _ = assignment.assign(&model, placement(&model, 0, 0).id(), &mut random);
        let _ = assignment.assign(&model, placement(&model, 1, 0).id(), &mut random);

        let third = placement(&model, 2, 0);
        assignment.weaken_for(&model, id, third);

        assert!(!spread.in_conflict(id, &assignment, third));
        assert_eq!(
            SpreadConstraint::context_of(&assignment, id).max_allowed_penalty(),
            12
        );
    }
}
