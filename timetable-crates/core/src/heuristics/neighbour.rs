use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;

use crate::basic_types::Random;
use crate::engine::Assignment;
use crate::engine::ConflictSet;
use crate::model::PlacementId;
use crate::model::TimetableModel;

/// A change of the current assignment proposed by a [`NeighbourSelection`].
#[derive(Clone, Debug, PartialEq)]
pub enum Neighbour {
    /// Assigns a single placement, unassigning whatever is in conflict with it.
    Simple { placement: PlacementId },
    /// Moves several lectures at once; the value is the value of the solution after the move.
    Suggestion {
        placements: Vec<PlacementId>,
        value: f64,
    },
}

impl Neighbour {
    /// The placements which the neighbour assigns.
    pub fn placements(&self) -> &[PlacementId] {
        match self {
            Neighbour::Simple { placement } => std::slice::from_ref(placement),
            Neighbour::Suggestion { placements, .. } => placements,
        }
    }

    /// Performs the move, returning the placements which were unassigned because of conflicts.
    pub fn apply(
        &self,
        model: &TimetableModel,
        assignment: &mut Assignment,
        random: &mut dyn Random,
    ) -> ConflictSet {
        match self {
            Neighbour::Simple { placement } => assignment.assign(model, *placement, random),
            Neighbour::Suggestion { placements, .. } => {
                for placement in placements {
                    let _ = assignment.unassign(model, placement.lecture);
                }
                let mut conflicts = ConflictSet::default();
                for &placement in placements {
                    conflicts.extend(assignment.assign(model, placement, random));
                }
                conflicts
            }
        }
    }
}

impl Display for Neighbour {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Neighbour::Simple { placement } => {
                write!(f, "{} := {}", placement.lecture, placement.index)
            }
            Neighbour::Suggestion { placements, value } => {
                write!(f, "Suggestion{{value={value}:")?;
                for placement in placements {
                    write!(f, " {} := {}", placement.lecture, placement.index)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Proposes the next move of the search.
pub trait NeighbourSelection: Debug {
    /// Returns the next move, or [`None`] if no move could be found in this iteration.
    fn select_neighbour(
        &mut self,
        model: &TimetableModel,
        assignment: &mut Assignment,
        random: &mut dyn Random,
    ) -> Option<Neighbour>;
}
