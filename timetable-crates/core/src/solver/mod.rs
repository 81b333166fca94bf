//! Contains the [`Solver`], which runs the iterative forward search over an [`Assignment`] until a
//! [`TerminationCondition`] triggers.
//!
//! Each iteration asks a [`NeighbourSelection`] for a move, applies it to the assignment, and
//! saves the solution when the [`TimetableComparator`] deems it better than the best one found so
//! far. The search never undoes a move; it is the best solution which is returned.
mod solver_statistics;
pub mod termination;

use std::time::Duration;
use std::time::Instant;

use log::debug;
use log::info;
use log::trace;
pub use solver_statistics::SolverStatistics;
use termination::GeneralTermination;
use termination::IterationBudget;
use termination::TerminationCondition;
use termination::TimeBudget;

use crate::basic_types::Properties;
use crate::basic_types::PropertyError;
use crate::basic_types::Random;
use crate::engine::Assignment;
use crate::heuristics::Neighbour;
use crate::heuristics::NeighbourSelection;
use crate::heuristics::TimetableComparator;
use crate::model::TimetableModel;
use crate::statistics::log_statistic_postfix;
use crate::statistics::should_log_statistics;
use crate::statistics::Statistic;
use crate::statistics::StatisticLogger;
use crate::timetable_asserts::print_timetable_assert_warning_message;
use crate::timetable_asserts::timetable_assert_advanced;

/// Options which determine when the [`Solver`] stops.
///
/// Recognised keys: `Termination.TimeOut` (seconds, 1800; negative for no limit),
/// `Termination.MaxIters` (-1 for no limit) and `Termination.StopWhenComplete` (false).
#[derive(Clone, Copy, Debug)]
pub struct SolverOptions {
    pub time_out: Option<Duration>,
    pub max_iterations: Option<u64>,
    /// Stop as soon as every lecture is assigned.
    pub stop_when_complete: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions::from_properties(&Properties::default())
            .unwrap_or_else(|_| unreachable!("the defaults are valid"))
    }
}

impl SolverOptions {
    pub fn from_properties(properties: &Properties) -> Result<SolverOptions, PropertyError> {
        let time_out = properties.get_f64("Termination.TimeOut", 1800.0)?;
        let max_iterations = properties.get_i32("Termination.MaxIters", -1)?;
        Ok(SolverOptions {
            time_out: (time_out >= 0.0).then(|| Duration::from_secs_f64(time_out)),
            max_iterations: u64::try_from(max_iterations).ok(),
            stop_when_complete: properties.get_bool("Termination.StopWhenComplete", false)?,
        })
    }

    /// Creates the [`TerminationCondition`] described by the options; the time budget starts now.
    pub fn termination(&self) -> GeneralTermination {
        GeneralTermination::new(
            self.time_out.map(TimeBudget::starting_now),
            self.max_iterations.map(IterationBudget::new),
            self.stop_when_complete,
        )
    }
}

/// The outcome of [`Solver::solve`].
#[derive(Clone, Debug)]
pub struct SolveResult {
    best: Assignment,
    best_iteration: u64,
    statistics: SolverStatistics,
}

impl SolveResult {
    /// The best solution found; the initial assignment if no better solution was found.
    pub fn best(&self) -> &Assignment {
        &self.best
    }

    pub fn into_best(self) -> Assignment {
        self.best
    }

    /// The iteration in which the best solution was found.
    pub fn best_iteration(&self) -> u64 {
        self.best_iteration
    }

    pub fn statistics(&self) -> &SolverStatistics {
        &self.statistics
    }
}

/// Runs the iterative forward search.
///
/// # Example
/// ```rust
/// # use rand::rngs::SmallRng;
/// # use rand::SeedableRng;
/// # use timetable_core::heuristics::StandardNeighbourSelection;
/// # use timetable_core::model::*;
/// # use timetable_core::solver::Solver;
/// # use timetable_core::Properties;
/// let room = RoomLocation::new(1, "A", 30);
/// let model = ModelBuilder::default()
///     .with_room(RoomSpec::new(1, "A", 30))
///     .with_lecture(
///         LectureSpec::new(1, "Lecture")
///             .with_class_limit(20, 20)
///             .with_placement(TimeLocation::new(DAY_CODES[0], 96, 12), vec![room]),
///     )
///     .build()
///     .unwrap();
///
/// let properties = Properties::default().set("Termination.MaxIters", 10);
/// let mut solver = Solver::from_properties(&properties).unwrap();
/// let mut assignment = model.create_assignment();
/// let mut termination = solver.options().termination();
/// let result = solver.solve(
///     &model,
///     &mut assignment,
///     &mut StandardNeighbourSelection::default(),
///     &mut termination,
///     &mut SmallRng::seed_from_u64(42),
/// );
///
/// assert_eq!(result.best().nr_unassigned(), 0);
/// ```
#[derive(Debug)]
pub struct Solver {
    options: SolverOptions,
    comparator: TimetableComparator,
}

impl Default for Solver {
    fn default() -> Self {
        Solver::new(SolverOptions::default(), TimetableComparator::default())
    }
}

impl Solver {
    pub fn new(options: SolverOptions, comparator: TimetableComparator) -> Solver {
        print_timetable_assert_warning_message!();
        Solver {
            options,
            comparator,
        }
    }

    pub fn from_properties(properties: &Properties) -> Result<Solver, PropertyError> {
        Ok(Solver::new(
            SolverOptions::from_properties(properties)?,
            TimetableComparator::from_properties(properties)?,
        ))
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// Improves `assignment` until `termination` triggers; [`SolverOptions::termination`] also
    /// triggers once every lecture is assigned if [`SolverOptions::stop_when_complete`] is set.
    ///
    /// The assignment is left in the state of the last iteration; the best solution is returned
    /// as part of the [`SolveResult`].
    pub fn solve(
        &mut self,
        model: &TimetableModel,
        assignment: &mut Assignment,
        neighbour_selection: &mut impl NeighbourSelection,
        termination: &mut impl TerminationCondition,
        random: &mut dyn Random,
    ) -> SolveResult {
        let started_at = Instant::now();
        let mut statistics = SolverStatistics::default();
        info!(
            "Starting the search with {} of {} lectures assigned",
            assignment.nr_assigned(),
            model.nr_lectures()
        );

        let mut best = assignment.clone();
        let mut best_key = (
            assignment.nr_unassigned(),
            self.comparator.current_value(assignment),
        );
        let mut best_iteration = assignment.iteration();

        loop {
            if termination.should_stop(assignment) {
                debug!("Termination condition triggered");
                break;
            }

            let iteration = assignment.iteration() + 1;
            assignment.set_iteration(iteration);
            statistics.iterations += 1;

            if let Some(neighbour) =
                neighbour_selection.select_neighbour(model, assignment, random)
            {
                trace!("Iteration {iteration}: {neighbour}");
                if matches!(neighbour, Neighbour::Suggestion { .. }) {
                    statistics.suggestion_moves += 1;
                }
                let conflicts = neighbour.apply(model, assignment, random);
                let nr_assigned = neighbour
                    .placements()
                    .iter()
                    .filter(|&&placement| assignment.values().holds(placement))
                    .count();
                if nr_assigned > 0 {
                    statistics.assignments += nr_assigned as u64;
                    statistics.unassignments += conflicts.len() as u64;
                }
            }
            termination.iteration_has_been_made();

            timetable_assert_advanced!(
                assignment
                    .criteria()
                    .approx_eq(&assignment.recompute_criteria(model), 1e-6),
                "The incremental criteria diverged from the recomputed criteria"
            );

            let value = self.comparator.current_value(assignment);
            if self
                .comparator
                .is_better_than_best(assignment.nr_unassigned(), value, Some(best_key))
            {
                best = assignment.clone();
                best_key = (assignment.nr_unassigned(), value);
                best_iteration = iteration;
                statistics.best_saves += 1;
                info!(
                    "New best solution in iteration {iteration}: {} unassigned, value {value:.2}",
                    best_key.0
                );
            }
        }

        statistics.elapsed_time_ms = started_at.elapsed().as_millis() as u64;
        info!(
            "Search finished after {} iterations: best solution has {} unassigned, value {:.2}",
            statistics.iterations, best_key.0, best_key.1
        );

        SolveResult {
            best,
            best_iteration,
            statistics,
        }
    }

    /// Logs the statistics of a search using the statistic logger, followed by the number of
    /// unassigned lectures and the criteria of the best solution.
    pub fn log_statistics(&self, result: &SolveResult) {
        if should_log_statistics() {
            let logger = StatisticLogger::new("solver");
            result.statistics.log(logger.clone());
            let best = logger.attach_to_prefix("best");
            best.attach_to_prefix("iteration")
                .log_value(result.best_iteration);
            best.attach_to_prefix("unassigned")
                .log_value(result.best.nr_unassigned());
            best.attach_to_prefix("value")
                .log_value(self.comparator.current_value(&result.best));
            best.log_criteria(result.best.criteria());
            log_statistic_postfix();
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::*;
    use crate::heuristics::FixCompleteSolutionNeighbourSelection;
    use crate::heuristics::StandardNeighbourSelection;
    use crate::model::tests::two_lectures_one_room;
    use crate::solver::termination::StopReason;

    #[test]
    fn negative_limits_are_absent() {
        let properties = Properties::default()
            .set("Termination.TimeOut", -1)
            .set("Termination.MaxIters", -1);

        let options = SolverOptions::from_properties(&properties).unwrap();

        assert_eq!(options.time_out, None);
        assert_eq!(options.max_iterations, None);
    }

    #[test]
    fn the_search_stops_when_complete() {
        let model = two_lectures_one_room();
        let properties = Properties::default()
            .set("Termination.StopWhenComplete", true)
            .set("Termination.MaxIters", 1000);
        let mut solver = Solver::from_properties(&properties).unwrap();
        let mut assignment = model.create_assignment();
        let mut termination = solver.options().termination();

        let result = solver.solve(
            &model,
            &mut assignment,
            &mut StandardNeighbourSelection::default(),
            &mut termination,
            &mut SmallRng::seed_from_u64(1),
        );

        assert_eq!(result.best().nr_unassigned(), 0);
        assert_eq!(assignment.nr_unassigned(), 0);
        assert!(result.statistics().iterations < 1000);
        assert!(result.statistics().best_saves >= 1);
        assert_eq!(termination.reason(), Some(StopReason::Complete));
    }

    #[test]
    fn the_iteration_budget_bounds_the_search() {
        let model = two_lectures_one_room();
        let properties = Properties::default().set("Termination.MaxIters", 5);
        let mut solver = Solver::from_properties(&properties).unwrap();
        let mut assignment = model.create_assignment();
        let mut termination = solver.options().termination();

        let result = solver.solve(
            &model,
            &mut assignment,
            &mut StandardNeighbourSelection::default(),
            &mut termination,
            &mut SmallRng::seed_from_u64(1),
        );

        assert_eq!(result.statistics().iterations, 5);
        assert_eq!(assignment.iteration(), 5);
        assert_eq!(termination.reason(), Some(StopReason::IterationLimit));
    }

    #[test]
    fn fixing_best_solutions_keeps_the_search_consistent() {
        let model = two_lectures_one_room();
        let properties = Properties::default().set("Termination.MaxIters", 200);
        let mut solver = Solver::from_properties(&properties).unwrap();
        let mut assignment = model.create_assignment();
        let mut termination = solver.options().termination();
        let mut neighbour_selection = FixCompleteSolutionNeighbourSelection::from_properties(
            &properties,
            StandardNeighbourSelection::default(),
        )
        .unwrap();

        let result = solver.solve(
            &model,
            &mut assignment,
            &mut neighbour_selection,
            &mut termination,
            &mut SmallRng::seed_from_u64(3),
        );

        assert_eq!(result.best().nr_unassigned(), 0);
        assert!(assignment
            .criteria()
            .approx_eq(&assignment.recompute_criteria(&model), 1e-9));
    }
}
