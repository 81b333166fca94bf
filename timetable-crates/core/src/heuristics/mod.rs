//! Contains the heuristics which drive the local search over an [`Assignment`].
//!
//! Each iteration of the [`Solver`] asks a [`NeighbourSelection`] for a [`Neighbour`]: the
//! [`StandardNeighbourSelection`] picks a lecture with a [`LectureSelection`] and a placement for
//! it with a [`ValueSelection`], while [`NeighbourSelectionWithSuggestions`] occasionally
//! searches for a short sequence of moves instead. [`TimeSwap`] and [`RoomSwap`] move a lecture
//! to another time or room and re-place what it displaces, and
//! [`FixCompleteSolutionNeighbourSelection`] polishes every new best solution of the selection it
//! wraps. Solutions are compared using a [`TimetableComparator`].
//!
//! [`Assignment`]: crate::engine::Assignment
//! [`Solver`]: crate::solver::Solver
mod comparator;
mod fix_complete_solution_neighbour_selection;
mod heuristic_selector;
mod lecture_selection;
mod neighbour;
mod neighbour_selection_with_suggestions;
mod standard_neighbour_selection;
mod swap;
mod tabu_list;
mod undo_guard;
mod value_selection;

pub use comparator::TimetableComparator;
pub use fix_complete_solution_neighbour_selection::FixCompleteSolutionNeighbourSelection;
pub use heuristic_selector::Element;
pub use heuristic_selector::HeuristicSelector;
pub use lecture_selection::LectureSelection;
pub use neighbour::Neighbour;
pub use neighbour::NeighbourSelection;
pub use neighbour_selection_with_suggestions::NeighbourSelectionWithSuggestions;
pub use standard_neighbour_selection::StandardNeighbourSelection;
pub use swap::RandomSwap;
pub use swap::RoomSwap;
pub use swap::SameRooms;
pub use swap::SameTime;
pub use swap::SwapAlternatives;
pub use swap::TimeSwap;
pub use value_selection::ValueSelection;
