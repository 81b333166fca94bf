use std::time::Duration;

use log::debug;

use super::Neighbour;
use super::NeighbourSelection;
use super::StandardNeighbourSelection;
use super::undo_guard::UndoGuard;
use super::TimetableComparator;
use crate::basic_types::Properties;
use crate::basic_types::PropertyError;
use crate::basic_types::Random;
use crate::containers::HashMap;
use crate::engine::Assignment;
use crate::model::LectureId;
use crate::model::Placement;
use crate::model::PlacementId;
use crate::model::TimetableModel;
use crate::solver::termination::TimeBudget;

/// A [`StandardNeighbourSelection`] which occasionally looks for a "suggestion": a sequence of
/// reassignments, found by a bounded backtracking search, which places the selected lecture and
/// re-places every lecture it displaces.
///
/// A suggestion search of depth `d` (from `Neighbour.SuggestionDepth` down to 2) is started with
/// probability `p^(d-1)`, where `p` is `Neighbour.SuggestionProbabilityAllAssigned` for a complete
/// solution and `Neighbour.SuggestionProbability` otherwise. A search explores at most `d` changes
/// and stops after `Neighbour.SuggestionTimeout` milliseconds (0 for no limit). A suggestion is
/// only returned if it assigns more lectures, or as many lectures with a lower value, than the
/// current solution; otherwise the standard selection is used.
#[derive(Debug)]
pub struct NeighbourSelectionWithSuggestions {
    standard: StandardNeighbourSelection,
    suggestion_probability: f64,
    suggestion_probability_all_assigned: f64,
    suggestion_timeout: Duration,
    suggestion_depth: usize,
}

impl Default for NeighbourSelectionWithSuggestions {
    fn default() -> Self {
        NeighbourSelectionWithSuggestions::from_properties(&Properties::default())
            .unwrap_or_else(|_| unreachable!("the defaults are valid"))
    }
}

impl NeighbourSelectionWithSuggestions {
    pub fn from_properties(
        properties: &Properties,
    ) -> Result<NeighbourSelectionWithSuggestions, PropertyError> {
        Ok(NeighbourSelectionWithSuggestions {
            standard: StandardNeighbourSelection::from_properties(properties)?,
            suggestion_probability: properties.get_f64("Neighbour.SuggestionProbability", 0.1)?,
            suggestion_probability_all_assigned: properties
                .get_f64("Neighbour.SuggestionProbabilityAllAssigned", 0.5)?,
            suggestion_timeout: Duration::from_millis(
                properties.get_u64("Neighbour.SuggestionTimeout", 500)?,
            ),
            suggestion_depth: properties.get_u32("Neighbour.SuggestionDepth", 4)? as usize,
        })
    }

    /// Searches for the best suggestion which places `lecture` differently, changing at most
    /// `depth` lectures. The assignment is the same as before once this returns.
    pub fn select_suggestion(
        &self,
        model: &TimetableModel,
        assignment: &mut Assignment,
        lecture: LectureId,
        depth: usize,
        random: &mut dyn Random,
    ) -> Option<Neighbour> {
        let comparator = self.standard.comparator();
        let mut search = SuggestionSearch {
            base_value: comparator.current_value(assignment),
            base_nr_assigned: assignment.nr_assigned(),
            undo: UndoGuard::new(model, assignment),
            comparator,
            random,
            budget: (!self.suggestion_timeout.is_zero())
                .then(|| TimeBudget::starting_now(self.suggestion_timeout)),
            best: None,
        };
        search.backtrack(
            Some(lecture),
            &mut HashMap::default(),
            &mut HashMap::default(),
            depth,
        );
        if search.timed_out() {
            debug!("Suggestion search for {} timed out", model.lecture(lecture));
        }
        search.best
    }
}

impl NeighbourSelection for NeighbourSelectionWithSuggestions {
    fn select_neighbour(
        &mut self,
        model: &TimetableModel,
        assignment: &mut Assignment,
        random: &mut dyn Random,
    ) -> Option<Neighbour> {
        let probability = if assignment.nr_unassigned() == 0 {
            self.suggestion_probability_all_assigned
        } else {
            self.suggestion_probability
        };

        let mut neighbour = None;
        for depth in (2..=self.suggestion_depth).rev() {
            if random.generate_f64() < probability.powi(depth as i32 - 1) {
                if let Some(lecture) = self.standard.select_lecture(model, assignment, random) {
                    neighbour = self.select_suggestion(model, assignment, lecture, depth, random);
                }
                break;
            }
        }
        if let Some(neighbour) = &neighbour {
            debug!("Selected {neighbour}");
        }
        neighbour.or_else(|| self.standard.select_neighbour(model, assignment, random))
    }
}

#[derive(Debug)]
struct SuggestionSearch<'a> {
    undo: UndoGuard<'a>,
    comparator: &'a TimetableComparator,
    random: &'a mut dyn Random,
    base_value: f64,
    base_nr_assigned: usize,
    /// Absent if the search has no time limit.
    budget: Option<TimeBudget>,
    best: Option<Neighbour>,
}

impl SuggestionSearch<'_> {
    fn check_timeout(&mut self) -> bool {
        self.budget.as_mut().is_some_and(TimeBudget::is_exhausted)
    }

    fn timed_out(&self) -> bool {
        self.budget.as_ref().is_some_and(TimeBudget::was_exhausted)
    }

    fn backtrack(
        &mut self,
        initial: Option<LectureId>,
        resolved: &mut HashMap<LectureId, PlacementId>,
        to_resolve: &mut HashMap<LectureId, PlacementId>,
        depth: usize,
    ) {
        let nr_unassigned = to_resolve.len();
        if initial.is_none() && nr_unassigned == 0 {
            self.record_if_improving(resolved);
            return;
        }
        if depth == 0 || self.check_timeout() {
            return;
        }

        let lectures = match initial {
            Some(lecture) => vec![lecture],
            None => {
                let mut lectures = to_resolve.keys().copied().collect::<Vec<_>>();
                lectures.sort_unstable();
                lectures
            }
        };
        let model = self.undo.model;
        for lecture in lectures {
            if self.timed_out() {
                break;
            }
            if resolved.contains_key(&lecture) {
                continue;
            }
            let domain = model.lecture(lecture).domain();
            let Some(offset) = self.random.choose_index(domain.len()) else {
                continue;
            };
            for index in 0..domain.len() {
                if self.timed_out() {
                    break;
                }
                let placement = &domain[(index + offset) % domain.len()];
                self.try_placement(placement, resolved, to_resolve, nr_unassigned, depth);
            }
        }
    }

    fn try_placement(
        &mut self,
        placement: &Placement,
        resolved: &mut HashMap<LectureId, PlacementId>,
        to_resolve: &mut HashMap<LectureId, PlacementId>,
        nr_unassigned: usize,
        depth: usize,
    ) {
        let model = self.undo.model;
        let lecture = placement.lecture();
        let id = placement.id();
        if self.undo.assignment.value(lecture) == Some(id)
            || is_hard(model, self.undo.assignment, placement)
        {
            return;
        }
        let mut conflicts = self
            .undo
            .assignment
            .conflicts(model, placement, self.random);
        if conflicts.contains(&id) {
            return;
        }
        conflicts.retain(|conflict| {
            conflict.lecture != lecture && self.undo.assignment.values().holds(*conflict)
        });
        if nr_unassigned + conflicts.len() > depth
            || conflicts.iter().any(|conflict| {
                model.lecture(conflict.lecture).is_committed()
                    || resolved.contains_key(&conflict.lecture)
            })
        {
            return;
        }

        let checkpoint = self.undo.checkpoint();
        for conflict in conflicts.iter() {
            self.undo.change(conflict.lecture, None);
        }
        self.undo.change(lecture, Some(id));
        for conflict in conflicts.iter() {
            let _ = to_resolve.insert(conflict.lecture, *conflict);
        }
        let resolved_conflict = to_resolve.remove(&lecture);
        let _ = resolved.insert(lecture, id);

        self.backtrack(None, resolved, to_resolve, depth - 1);

        let _ = resolved.remove(&lecture);
        self.undo.undo_to(checkpoint);
        for conflict in conflicts.iter() {
            let _ = to_resolve.remove(&conflict.lecture);
        }
        if let Some(resolved_conflict) = resolved_conflict {
            let _ = to_resolve.insert(lecture, resolved_conflict);
        }
    }

    fn record_if_improving(&mut self, resolved: &HashMap<LectureId, PlacementId>) {
        let assignment = &*self.undo.assignment;
        let nr_assigned = assignment.nr_assigned();
        let value = self.comparator.current_value(assignment);
        let improving = nr_assigned > self.base_nr_assigned
            || (nr_assigned == self.base_nr_assigned && self.base_value > value);
        if !improving {
            return;
        }
        let better_than_best = match &self.best {
            Some(Neighbour::Suggestion {
                value: best_value, ..
            }) => *best_value >= value,
            _ => true,
        };
        if better_than_best {
            let mut placements = resolved.values().copied().collect::<Vec<_>>();
            placements.sort_unstable();
            self.best = Some(Neighbour::Suggestion { placements, value });
        }
    }
}

/// Whether the placement is prohibited, or would violate a required or prohibited distribution
/// constraint which is not enforced by conflicts.
fn is_hard(model: &TimetableModel, assignment: &Assignment, placement: &Placement) -> bool {
    if placement.is_time_prohibited() || placement.is_room_prohibited() {
        return true;
    }
    model
        .lecture(placement.lecture())
        .hard_group_soft_constraints()
        .iter()
        .filter_map(|&constraint| model.group_constraint(constraint))
        .any(|group| group.preference_of(model, assignment.values(), placement) > 0)
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::*;
    use crate::model::tests::two_lectures_one_room;

    #[test]
    fn a_suggestion_moves_the_blocking_lecture() {
        let model = two_lectures_one_room();
        let mut assignment = model.create_assignment();
        let mut lectures = model.lecture_ids();
        let first = lectures.next().unwrap();
        let second = lectures.next().unwrap();
        assignment.assign_unchecked(
            &model,
            PlacementId {
                lecture: first,
                index: 0,
            },
        );
        let selection = NeighbourSelectionWithSuggestions::default();
        let mut random = SmallRng::seed_from_u64(42);

        let suggestion = selection.select_suggestion(&model, &mut assignment, second, 2, &mut random);

        let Some(Neighbour::Suggestion { placements, .. }) = suggestion else {
            panic!("expected a suggestion, got {suggestion:?}");
        };
        assert!(placements.iter().any(|placement| placement.lecture == second));
        assert_eq!(assignment.nr_assigned(), 1);
    }

    #[test]
    fn the_assignment_is_restored_after_the_search() {
        let model = two_lectures_one_room();
        let mut assignment = model.create_assignment();
        let first = model.lecture_ids().next().unwrap();
        assignment.assign_unchecked(
            &model,
            PlacementId {
                lecture: first,
                index: 0,
            },
        );
        let values_before = assignment
            .values()
            .assigned_lectures()
            .map(|lecture| assignment.value(lecture))
            .collect::<Vec<_>>();
        let criteria_before = assignment.criteria().clone();
        let selection = NeighbourSelectionWithSuggestions::default();
        let mut random = SmallRng::seed_from_u64(7);

        for lecture in model.lecture_ids() {
            let _ = selection.select_suggestion(&model, &mut assignment, lecture, 4, &mut random);
        }

        let values_after = assignment
            .values()
            .assigned_lectures()
            .map(|lecture| assignment.value(lecture))
            .collect::<Vec<_>>();
        assert_eq!(values_before, values_after);
        assert!(assignment.criteria().approx_eq(&criteria_before, 1e-9));
        assert_eq!(assignment.nr_assignments(first), 1);
    }
}
