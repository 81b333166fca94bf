use std::time::Duration;
use std::time::Instant;

use super::TerminationCondition;
use crate::engine::Assignment;

/// A limit on the wall-clock time of a search, measured from its creation.
///
/// It bounds the whole search (`Termination.TimeOut`) as well as a single suggestion search
/// (`Neighbour.SuggestionTimeout`). A budget stays exhausted once it has run out.
#[derive(Clone, Copy, Debug)]
pub struct TimeBudget {
    /// `None` if the budget reaches beyond what an [`Instant`] can represent.
    deadline: Option<Instant>,
    exhausted: bool,
}

impl TimeBudget {
    pub fn starting_now(budget: Duration) -> TimeBudget {
        TimeBudget {
            deadline: Instant::now().checked_add(budget),
            exhausted: false,
        }
    }

    /// The time left before the budget runs out.
    pub fn remaining(&self) -> Duration {
        if self.exhausted {
            return Duration::ZERO;
        }
        self.deadline.map_or(Duration::MAX, |deadline| {
            deadline.saturating_duration_since(Instant::now())
        })
    }

    /// Checks the clock and reports whether the budget has run out.
    pub fn is_exhausted(&mut self) -> bool {
        if !self.exhausted {
            self.exhausted = self
                .deadline
                .is_some_and(|deadline| Instant::now() >= deadline);
        }
        self.exhausted
    }

    /// Whether the budget was found to be exhausted by an earlier [`TimeBudget::is_exhausted`],
    /// without looking at the clock.
    pub fn was_exhausted(&self) -> bool {
        self.exhausted
    }
}

impl TerminationCondition for TimeBudget {
    fn should_stop(&mut self, _: &Assignment) -> bool {
        self.is_exhausted()
    }
}
