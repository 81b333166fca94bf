use super::TerminationCondition;
use crate::engine::Assignment;

/// A [`TerminationCondition`] which triggers once the solver has performed the given number of
/// iterations (`Termination.MaxIters`).
///
/// Only the iterations of the current search count, regardless of
/// [`Assignment::iteration`] of the assignment it starts from.
#[derive(Debug, Copy, Clone)]
pub struct IterationBudget {
    budget: u64,
    num_iterations: u64,
}

impl IterationBudget {
    pub fn new(budget: u64) -> Self {
        Self {
            budget,
            num_iterations: 0,
        }
    }

    pub fn remaining(&self) -> u64 {
        self.budget.saturating_sub(self.num_iterations)
    }
}

impl TerminationCondition for IterationBudget {
    fn should_stop(&mut self, _: &Assignment) -> bool {
        self.num_iterations >= self.budget
    }

    fn iteration_has_been_made(&mut self) {
        self.num_iterations += 1;
    }
}
