use std::fmt::Display;
use std::fmt::Formatter;

use log::debug;

use super::IterationBudget;
use super::TerminationCondition;
use super::TimeBudget;
use crate::engine::Assignment;

/// What made a [`GeneralTermination`] stop the search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Complete,
    IterationLimit,
    TimeOut,
}

impl Display for StopReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Complete => write!(f, "every lecture is assigned"),
            StopReason::IterationLimit => write!(f, "the iteration limit is reached"),
            StopReason::TimeOut => write!(f, "the time limit is reached"),
        }
    }
}

/// The termination of a [`Solver`](crate::solver::Solver) search as configured by the
/// [`SolverOptions`](crate::solver::SolverOptions).
///
/// The search stops once every lecture is assigned (if requested), once the iteration budget is
/// used up, or once the time budget runs out, checked in that order. The first reason found is
/// kept, and the termination keeps triggering afterwards.
#[derive(Clone, Copy, Debug)]
pub struct GeneralTermination {
    time_budget: Option<TimeBudget>,
    iteration_budget: Option<IterationBudget>,
    stop_when_complete: bool,
    reason: Option<StopReason>,
}

impl GeneralTermination {
    pub fn new(
        time_budget: Option<TimeBudget>,
        iteration_budget: Option<IterationBudget>,
        stop_when_complete: bool,
    ) -> GeneralTermination {
        GeneralTermination {
            time_budget,
            iteration_budget,
            stop_when_complete,
            reason: None,
        }
    }

    /// Why the search was stopped, if it was.
    pub fn reason(&self) -> Option<StopReason> {
        self.reason
    }

    pub fn time_budget(&self) -> Option<&TimeBudget> {
        self.time_budget.as_ref()
    }

    pub fn iteration_budget(&self) -> Option<&IterationBudget> {
        self.iteration_budget.as_ref()
    }
}

impl TerminationCondition for GeneralTermination {
    fn should_stop(&mut self, assignment: &Assignment) -> bool {
        if self.reason.is_none() {
            self.reason = if self.stop_when_complete && assignment.nr_unassigned() == 0 {
                Some(StopReason::Complete)
            } else if self.iteration_budget.should_stop(assignment) {
                Some(StopReason::IterationLimit)
            } else if self.time_budget.should_stop(assignment) {
                Some(StopReason::TimeOut)
            } else {
                None
            };
            if let Some(reason) = self.reason {
                debug!(
                    "Stopping the search in iteration {}: {reason}",
                    assignment.iteration()
                );
            }
        }
        self.reason.is_some()
    }

    fn iteration_has_been_made(&mut self) {
        self.iteration_budget.iteration_has_been_made();
    }
}
