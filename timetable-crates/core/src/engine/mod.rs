//! The incremental state of a search: the [`Assignment`] of the lectures, the per-assignment
//! contexts of the constraints and the running totals of the [`Criteria`].
mod assignment;
mod constraint;
mod criteria;

pub use assignment::AssignedValue;
pub use assignment::Assignment;
pub use assignment::AssignmentValues;
pub(crate) use assignment::placement_criteria;
pub use constraint::Constraint;
pub use constraint::ConstraintContext;
pub use criteria::Criteria;
pub use criteria::CriterionKind;

use crate::containers::HashSet;
use crate::containers::StorageKey;
use crate::model::PlacementId;

/// The placements which have to be unassigned before a placement can be assigned.
pub type ConflictSet = HashSet<PlacementId>;

/// Identifies a constraint of a [`TimetableModel`](crate::model::TimetableModel), and its context
/// within every [`Assignment`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintId(u32);

impl StorageKey for ConstraintId {
    fn index(&self) -> usize {
        self.0 as usize
    }

    fn create_from_index(index: usize) -> Self {
        ConstraintId(index as u32)
    }
}

impl std::fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "C{}", self.0)
    }
}
