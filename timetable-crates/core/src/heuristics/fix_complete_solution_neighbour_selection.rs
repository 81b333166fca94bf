use log::debug;
use log::info;

use super::Neighbour;
use super::NeighbourSelection;
use super::NeighbourSelectionWithSuggestions;
use super::TimetableComparator;
use crate::basic_types::Properties;
use crate::basic_types::PropertyError;
use crate::basic_types::Random;
use crate::engine::Assignment;
use crate::model::LectureId;
use crate::model::TimetableModel;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    /// Moves lectures to the best placement which is not in conflict.
    Improve,
    /// Looks for suggestions of depth two; only for complete solutions.
    Suggest,
}

/// Wraps another [`NeighbourSelection`] and, whenever the search finds a new best solution,
/// passes over every lecture to fix what the search left behind.
///
/// The first pass moves each lecture to the best placement which causes no conflict; if the
/// solution is complete, a second pass looks for suggestions which move each lecture together
/// with one other lecture without making the solution worse. The passes run for every new best
/// complete solution found at least `General.CompleteSolutionFixInterval` (1) iterations after the
/// last passes, and for a new best incomplete solution found at least
/// `General.IncompleteSolutionFixInterval` (5000) iterations after the last passes, the latter
/// only until a complete solution has been found. A negative interval disables the passes, zero
/// runs them only once.
#[derive(Debug)]
pub struct FixCompleteSolutionNeighbourSelection<P> {
    parent: P,
    suggestions: NeighbourSelectionWithSuggestions,
    comparator: TimetableComparator,
    complete_fix_interval: i64,
    incomplete_fix_interval: i64,
    last_complete_fix: Option<u64>,
    last_incomplete_fix: Option<u64>,
    /// The best solution observed so far, as the number of unassigned lectures and the value.
    best: Option<(usize, f64)>,
    phase: Phase,
    /// The lectures still to be visited by the current pass, in reverse order.
    pending: Vec<LectureId>,
}

impl<P: NeighbourSelection> FixCompleteSolutionNeighbourSelection<P> {
    pub fn from_properties(
        properties: &Properties,
        parent: P,
    ) -> Result<FixCompleteSolutionNeighbourSelection<P>, PropertyError> {
        Ok(FixCompleteSolutionNeighbourSelection {
            parent,
            suggestions: NeighbourSelectionWithSuggestions::from_properties(properties)?,
            comparator: TimetableComparator::from_properties(properties)?,
            complete_fix_interval: properties
                .get_i32("General.CompleteSolutionFixInterval", 1)?
                .into(),
            incomplete_fix_interval: properties
                .get_i32("General.IncompleteSolutionFixInterval", 5000)?
                .into(),
            last_complete_fix: None,
            last_incomplete_fix: None,
            best: None,
            phase: Phase::Idle,
            pending: vec![],
        })
    }

    pub fn parent(&self) -> &P {
        &self.parent
    }

    /// Whether the current solution improves on every solution observed before.
    fn observe(&mut self, assignment: &Assignment) -> bool {
        let key = (
            assignment.nr_unassigned(),
            self.comparator.current_value(assignment),
        );
        let improves = self
            .comparator
            .is_better_than_best(key.0, key.1, self.best);
        if improves {
            self.best = Some(key);
        }
        improves
    }

    fn is_best_complete(&self) -> bool {
        self.best.is_some_and(|(nr_unassigned, _)| nr_unassigned == 0)
    }

    /// Whether enough iterations passed since the last passes; `last` of [`None`] counts as
    /// iteration -1 when `run_first` is false.
    fn is_due(interval: i64, last: Option<u64>, iteration: u64, run_first: bool) -> bool {
        match (interval, last) {
            (interval, _) if interval < 0 => false,
            (0, last) => last.is_none(),
            (_, None) if run_first => true,
            (interval, last) => {
                let last = last.map_or(-1, |last| last as i64);
                iteration as i64 - last >= interval
            }
        }
    }

    fn start_pass(&mut self, model: &TimetableModel, phase: Phase) {
        self.phase = phase;
        self.pending = model.lecture_ids().collect();
        self.pending.reverse();
    }

    fn next_phase(&mut self, model: &TimetableModel, assignment: &Assignment) {
        match self.phase {
            Phase::Idle => {
                info!("Fixing solution...");
                self.start_pass(model, Phase::Improve);
            }
            Phase::Improve if assignment.nr_unassigned() == 0 => {
                info!("Fixing complete solution...");
                self.start_pass(model, Phase::Suggest);
            }
            Phase::Improve => {
                self.last_incomplete_fix = Some(assignment.iteration());
                self.phase = Phase::Idle;
                self.pending.clear();
            }
            Phase::Suggest => {
                self.last_complete_fix = Some(assignment.iteration());
                self.phase = Phase::Idle;
                self.pending.clear();
            }
        }
    }

    /// The best placement of `lecture` which causes no conflict, if it is better than the
    /// current one.
    fn improve(
        &self,
        model: &TimetableModel,
        assignment: &Assignment,
        lecture: LectureId,
    ) -> Option<Neighbour> {
        let current = assignment.placement(model, lecture)?;
        let current_value = self.comparator.placement_value(model, assignment, current);
        let (best, best_value) = model
            .lecture(lecture)
            .domain()
            .iter()
            .filter(|placement| placement.id() != current.id())
            .filter(|placement| !assignment.in_conflict(model, placement))
            .map(|placement| {
                (
                    placement,
                    self.comparator.placement_value(model, assignment, placement),
                )
            })
            .fold(None, |best: Option<(_, f64)>, (placement, value)| match best {
                Some((_, best_value)) if best_value <= value => best,
                _ => Some((placement, value)),
            })?;
        (best_value < current_value).then(|| Neighbour::Simple {
            placement: best.id(),
        })
    }
}

impl<P: NeighbourSelection> NeighbourSelection for FixCompleteSolutionNeighbourSelection<P> {
    fn select_neighbour(
        &mut self,
        model: &TimetableModel,
        assignment: &mut Assignment,
        random: &mut dyn Random,
    ) -> Option<Neighbour> {
        let is_best_now = self.observe(assignment);
        if self.phase == Phase::Idle {
            let iteration = assignment.iteration();
            let due = if assignment.nr_unassigned() == 0 {
                Self::is_due(
                    self.complete_fix_interval,
                    self.last_complete_fix,
                    iteration,
                    true,
                )
            } else if !self.is_best_complete() {
                Self::is_due(
                    self.incomplete_fix_interval,
                    self.last_incomplete_fix,
                    iteration,
                    false,
                )
            } else {
                false
            };
            if !due {
                return self.parent.select_neighbour(model, assignment, random);
            }
            if is_best_now {
                self.next_phase(model, assignment);
            }
        }

        while self.phase != Phase::Idle {
            let Some(lecture) = self.pending.pop() else {
                self.next_phase(model, assignment);
                continue;
            };
            let neighbour = match self.phase {
                Phase::Improve => self.improve(model, assignment, lecture),
                _ => self
                    .suggestions
                    .select_suggestion(model, assignment, lecture, 2, random)
                    .filter(|neighbour| match neighbour {
                        Neighbour::Suggestion { value, .. } => {
                            *value <= self.comparator.current_value(assignment)
                        }
                        Neighbour::Simple { .. } => true,
                    }),
            };
            if let Some(neighbour) = neighbour {
                debug!("Fixing {}: {neighbour}", model.lecture(lecture));
                return Some(neighbour);
            }
        }
        self.parent.select_neighbour(model, assignment, random)
    }
}
