//! A [`TerminationCondition`] is polled by the [`Solver`] before every iteration, with the current
//! assignment. It indicates when the search should stop, even though a better solution might still
//! be found. The [`Solver`] uses a [`GeneralTermination`], which combines a [`TimeBudget`], an
//! [`IterationBudget`] and stopping once every lecture is assigned.
//!
//! [`Solver`]: super::Solver
mod general_termination;
mod iteration_budget;
mod time_budget;

pub use general_termination::GeneralTermination;
pub use general_termination::StopReason;
pub use iteration_budget::IterationBudget;
pub use time_budget::TimeBudget;

use crate::engine::Assignment;

/// The central trait that defines a termination condition. A termination condition determines when
/// the solver should give up searching for better solutions.
pub trait TerminationCondition {
    /// Returns `true` when the search of `assignment` should stop, `false` otherwise.
    fn should_stop(&mut self, assignment: &Assignment) -> bool;
    fn iteration_has_been_made(&mut self) {}
}

impl<T: TerminationCondition> TerminationCondition for Option<T> {
    fn should_stop(&mut self, assignment: &Assignment) -> bool {
        match self {
            Some(t) => t.should_stop(assignment),
            None => false,
        }
    }

    fn iteration_has_been_made(&mut self) {
        if let Some(t) = self {
            t.iteration_has_been_made()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::basic_types::TestRandom;
    use crate::model::tests::two_lectures_one_room;
    use crate::model::PlacementId;

    #[test]
    fn the_iteration_limit_stops_the_search() {
        let model = two_lectures_one_room();
        let assignment = model.create_assignment();
        let mut termination = GeneralTermination::new(
            Some(TimeBudget::starting_now(Duration::from_secs(3600))),
            Some(IterationBudget::new(2)),
            true,
        );

        assert!(!termination.should_stop(&assignment));
        termination.iteration_has_been_made();
        assert!(!termination.should_stop(&assignment));
        termination.iteration_has_been_made();
        assert!(termination.should_stop(&assignment));
        assert_eq!(termination.reason(), Some(StopReason::IterationLimit));
        assert_eq!(termination.iteration_budget().map(|budget| budget.remaining()), Some(0));
    }

    #[test]
    fn a_complete_assignment_stops_the_search_only_when_requested() {
        let model = two_lectures_one_room();
        let mut assignment = model.create_assignment();
        let mut random = TestRandom::default();
        for (lecture, index) in model.lecture_ids().zip([0, 1]) {
            let _ = assignment.assign(&model, PlacementId { lecture, index }, &mut random);
        }
        assert_eq!(assignment.nr_unassigned(), 0);

        let mut continuing = GeneralTermination::new(None, None, false);
        assert!(!continuing.should_stop(&assignment));
        assert_eq!(continuing.reason(), None);

        let mut stopping = GeneralTermination::new(None, Some(IterationBudget::new(0)), true);
        assert!(stopping.should_stop(&assignment));
        assert_eq!(stopping.reason(), Some(StopReason::Complete));
    }

    #[test]
    fn an_absent_condition_never_stops() {
        let model = two_lectures_one_room();
        let mut termination: Option<IterationBudget> = None;
        termination.iteration_has_been_made();

        assert!(!termination.should_stop(&model.create_assignment()));
    }

    #[test]
    fn an_exhausted_time_budget_stays_exhausted() {
        let model = two_lectures_one_room();
        let mut termination =
            GeneralTermination::new(Some(TimeBudget::starting_now(Duration::ZERO)), None, false);

        assert!(termination.should_stop(&model.create_assignment()));
        assert_eq!(termination.reason(), Some(StopReason::TimeOut));
        let budget = termination.time_budget().unwrap();
        assert!(budget.was_exhausted());
        assert_eq!(budget.remaining(), Duration::ZERO);
    }

    #[test]
    fn a_generous_time_budget_has_time_remaining() {
        let mut budget = TimeBudget::starting_now(Duration::from_secs(3600));

        assert!(!budget.is_exhausted());
        assert!(!budget.was_exhausted());
        assert!(budget.remaining() > Duration::from_secs(3000));
        assert_eq!(
            TimeBudget::starting_now(Duration::MAX).remaining(),
            Duration::MAX
        );
    }
}
