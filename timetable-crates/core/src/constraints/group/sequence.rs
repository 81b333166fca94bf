use super::GroupConstraint;
use super::GroupFlag;
use super::Scenario;
use crate::containers::HashSet;
use crate::engine::ConflictSet;
use crate::model::Placement;
use crate::model::SLOTS_PER_DAY;

const DAY: usize = SLOTS_PER_DAY as usize;

/// Whether a gap of `total_gap` slots can be split into gaps of `gap_min..=gap_max` slots by
/// placing some of the remaining lectures, each with one of its lengths, in between.
///
/// The lectures used to fill the gap are removed from `lengths`, so that a later gap of the same
/// sequence cannot be filled with them again; `lengths` is unchanged when the gap cannot be filled.
fn can_fill(total_gap: i32, gap_min: i32, gap_max: i32, lengths: &mut Vec<Vec<i32>>) -> bool {
    if gap_min <= total_gap && total_gap <= gap_max {
        return true;
    }
    if total_gap < 2 * gap_min {
        return false;
    }
    for index in 0..lengths.len() {
        let candidates = lengths.remove(index);
        let fits = (gap_min..=gap_max).any(|gap| {
            candidates
                .iter()
                .any(|&length| can_fill(total_gap - gap - length, gap_min, gap_max, lengths))
        });
        if fits {
            return true;
        }
        lengths.insert(index, candidates);
    }
    false
}

impl GroupConstraint {
    fn prefers_sequence(&self) -> bool {
        self.required || (!self.prohibited && self.preference < 0)
    }

    fn discourages_sequence(&self) -> bool {
        self.prohibited || (!self.required && self.preference > 0)
    }

    /// Checks the placements of the scenario as one day-long sequence.
    ///
    /// Without `conflicts` any overlap fails the check. With `conflicts`, an overlapping
    /// placement which is not part of the overrides is added to the conflicts instead, and the
    /// placements already in the conflicts are treated as unassigned.
    pub(super) fn is_satisfied_sequence_check(
        &self,
        scenario: Scenario<'_>,
        mut conflicts: Option<&mut ConflictSet>,
    ) -> bool {
        if !self.kind.is(GroupFlag::BackToBack) {
            return true;
        }
        let (gap_min, gap_max) = (self.kind.min(), self.kind.max());
        let mut lengths: Vec<Vec<i32>> = Vec::new();
        let mut day: Vec<Option<&Placement>> = vec![None; DAY];
        let mut nr_lectures = 0;

        for &lecture in &self.lectures {
            let placement = scenario.placement_of(lecture).filter(|placement| {
                !conflicts
                    .as_deref()
                    .is_some_and(|conflicts| conflicts.contains(&placement.id()))
            });
            let Some(placement) = placement else {
                let candidates = scenario
                    .model
                    .lecture(lecture)
                    .time_locations()
                    .iter()
                    .map(|time| time.length())
                    .collect::<HashSet<_>>();
                if !candidates.is_empty() {
                    lengths.push(candidates.into_iter().collect());
                }
                continue;
            };

            let start = placement.time().start_slot() as usize;
            let end = (placement.time().end_slot() as usize).min(DAY);
            for slot in start..end {
                let Some(other) = day[slot] else {
                    continue;
                };
                let Some(conflicts) = conflicts.as_deref_mut() else {
                    return false;
                };
                if !scenario.is_overridden(lecture) {
                    let _ = conflicts.insert(placement.id());
                } else if !scenario.is_overridden(other.lecture()) {
                    let _ = conflicts.insert(other.id());
                }
            }
            day[start..end].fill(Some(placement));
            nr_lectures += 1;
        }
        if nr_lectures <= 1 {
            return true;
        }

        let preferred = self.prefers_sequence();
        if !preferred && !self.discourages_sequence() {
            return true;
        }

        let end_of = |placement: &Placement| placement.time().end_slot() as usize;
        let Some(mut slot) = day.iter().flatten().next().map(|&placement| end_of(placement))
        else {
            return true;
        };
        nr_lectures -= 1;
        while nr_lectures > 0 {
            let mut gap = 0;
            while slot < DAY && day[slot].is_none() {
                gap += 1;
                slot += 1;
            }
            if slot >= DAY {
                break;
            }
            let fits = if preferred {
                can_fill(gap, gap_min, gap_max, &mut lengths)
            } else {
                (gap_min != 0 && can_fill(gap, 0, gap_min - 1, &mut lengths))
                    || (gap_max < SLOTS_PER_DAY
                        && can_fill(gap, gap_max + 1, SLOTS_PER_DAY, &mut lengths))
            };
            if !fits {
                return false;
            }
            if let Some(next) = day[slot] {
                slot = end_of(next);
            }
            nr_lectures -= 1;
        }
        true
    }

    /// Looks for the smallest set of assigned placements whose removal makes the sequence valid,
    /// preferring sets which contain fewer of the overriding placements.
    fn is_satisfied_recursive(
        &self,
        scenario: Scenario<'_>,
        index: usize,
        conflicts: &mut ConflictSet,
        new_conflicts: &mut ConflictSet,
        best: Option<ConflictSet>,
    ) -> Option<ConflictSet> {
        if index == self.lectures.len() && new_conflicts.is_empty() {
            return best;
        }
        if self.is_satisfied_sequence_check(scenario, Some(conflicts)) {
            let Some(best) = best else {
                return Some(new_conflicts.clone());
            };
            let count_in = |set: &ConflictSet| {
                scenario
                    .overrides
                    .iter()
                    .filter_map(|&(_, placement)| placement)
                    .filter(|placement| set.contains(&placement.id()))
                    .count()
            };
            let (in_best, in_new) = (count_in(&best), count_in(new_conflicts));
            if in_new < in_best || (in_new == in_best && new_conflicts.len() < best.len()) {
                return Some(new_conflicts.clone());
            }
            return Some(best);
        }
        if index == self.lectures.len() {
            return best;
        }

        let best = self.is_satisfied_recursive(scenario, index + 1, conflicts, new_conflicts, best);
        let Some(placement) = scenario.placement_of(self.lectures[index]) else {
            return best;
        };
        if conflicts.contains(&placement.id()) {
            return best;
        }
        let _ = conflicts.insert(placement.id());
        let _ = new_conflicts.insert(placement.id());
        let best = self.is_satisfied_recursive(scenario, index + 1, conflicts, new_conflicts, best);
        let _ = new_conflicts.remove(&placement.id());
        let _ = conflicts.remove(&placement.id());
        best
    }

    /// Whether the placements form a valid sequence; with `conflicts`, the fewest placements which
    /// need to be unassigned for that are added to them, and `false` means no such set exists.
    pub(super) fn is_satisfied_sequence(
        &self,
        scenario: Scenario<'_>,
        conflicts: Option<&mut ConflictSet>,
    ) -> bool {
        let Some(conflicts) = conflicts else {
            return self.is_satisfied_sequence_check(scenario, None);
        };
        let mut new_conflicts = ConflictSet::default();
        match self.is_satisfied_recursive(scenario, 0, conflicts, &mut new_conflicts, None) {
            Some(best) => {
                conflicts.extend(best);
                true
            }
            None => false,
        }
    }
}
