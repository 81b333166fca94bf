use crate::create_statistics_struct;

create_statistics_struct!(
    /// Structure responsible for storing several statistics of the search performed by the
    /// [`Solver`](super::Solver).
    SolverStatistics {
        /// The number of iterations of the search
        iterations: u64,
        /// The number of placements assigned by the selected neighbours
        assignments: u64,
        /// The number of placements unassigned because they were in conflict with a neighbour
        unassignments: u64,
        /// The number of times a new best solution was saved
        best_saves: u64,
        /// The number of neighbours which were suggestions
        suggestion_moves: u64,
        /// The amount of time which is spent in the search, in milliseconds
        elapsed_time_ms: u64,
});
