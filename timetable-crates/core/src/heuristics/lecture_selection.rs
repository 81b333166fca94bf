use super::tabu_list::TabuList;
use super::TimetableComparator;
use crate::basic_types::Properties;
use crate::basic_types::PropertyError;
use crate::basic_types::Random;
use crate::engine::Assignment;
use crate::engine::CriterionKind;
use crate::model::LectureId;
use crate::model::TimetableModel;

/// Selects the lecture which the search changes next.
///
/// While some lectures are unassigned, one of them is selected: lectures which have been assigned
/// more than `Lecture.VariableChanceIteration` times lose their chance of being picked by the
/// random walk, otherwise a roulette wheel (or a strict minimum) over the domain size, the number
/// of values without conflicts, the number of assignments, the number of constraints and the
/// conflicts of the initial value decides. Once the solution is complete, the assigned lecture
/// with the worst contribution to the value of the solution is selected from a random subset.
///
/// Recently selected lectures are kept in a tabu list of `Lecture.TabuSize` entries.
#[derive(Debug)]
pub struct LectureSelection {
    roulette_wheel_selection: bool,
    random_walk_probability: f64,
    domain_size_weight: f64,
    good_values_weight: f64,
    nr_assignments_weight: f64,
    constraints_weight: f64,
    initial_assignment_weight: f64,
    subset_selection: bool,
    subset_part: f64,
    subset_min_size: usize,
    variable_chance_iteration: u32,
    variable_chance_probability: f64,
    mpp: bool,
    tabu: TabuList<LectureId>,
}

impl Default for LectureSelection {
    fn default() -> Self {
        LectureSelection::from_properties(&Properties::default())
            .unwrap_or_else(|_| unreachable!("the defaults are valid"))
    }
}

impl LectureSelection {
    pub fn from_properties(properties: &Properties) -> Result<LectureSelection, PropertyError> {
        let mpp = properties.get_bool("General.MPP", false)?;
        let random_walk = properties.get_bool("General.RandomWalk", true)?;
        Ok(LectureSelection {
            roulette_wheel_selection: properties.get_bool("Lecture.RouletteWheelSelection", true)?,
            random_walk_probability: if random_walk {
                properties.get_f64("Lecture.RandomWalkProb", 1.0)?
            } else {
                0.0
            },
            domain_size_weight: properties.get_f64("Lecture.DomainSizeWeight", 30.0)?,
            good_values_weight: properties.get_f64("Lecture.NrGoodValuesWeight", 8.0)?,
            nr_assignments_weight: properties.get_f64("Lecture.NrAssignmentsWeight", 10.0)?,
            constraints_weight: properties.get_f64("Lecture.NrConstraintsWeight", 0.0)?,
            initial_assignment_weight: if mpp {
                properties.get_f64("Lecture.InitialAssignmentWeight", 20.0)?
            } else {
                0.0
            },
            subset_selection: properties.get_bool("Lecture.SelectionSubSet", true)?,
            subset_part: properties.get_f64("Lecture.SelectionSubSetPart", 0.2)?,
            subset_min_size: properties.get_u32("Lecture.SelectionSubSetMinSize", 10)? as usize,
            variable_chance_iteration: properties.get_u32("Lecture.VariableChanceIteration", 1000)?,
            variable_chance_probability: properties.get_f64("Lecture.VariableChanceProb", 0.05)?,
            mpp,
            tabu: TabuList::new(properties.get_u32("Lecture.TabuSize", 20)? as usize),
        })
    }

    /// Selects a lecture, [`None`] if there is no lecture which can be changed.
    pub fn select_lecture(
        &mut self,
        model: &TimetableModel,
        assignment: &Assignment,
        comparator: &TimetableComparator,
        random: &mut dyn Random,
    ) -> Option<LectureId> {
        if assignment.nr_unassigned() == 0 {
            self.select_assigned(model, assignment, comparator, random)
        } else {
            self.select_unassigned(model, assignment, random)
        }
    }

    fn select_assigned(
        &mut self,
        model: &TimetableModel,
        assignment: &Assignment,
        comparator: &TimetableComparator,
        random: &mut dyn Random,
    ) -> Option<LectureId> {
        let movable = |lecture: &LectureId| !model.lecture(*lecture).is_committed();
        let mut lectures = Vec::new();
        if self.mpp && assignment.criteria().value(CriterionKind::Perturbations) > 0.0 {
            lectures = assignment
                .values()
                .assigned_lectures()
                .filter(movable)
                .filter(|&lecture| {
                    model
                        .lecture(lecture)
                        .initial()
                        .is_some_and(|initial| assignment.value(lecture) != Some(initial))
                })
                .collect::<Vec<_>>();
        }
        if lectures.is_empty() {
            lectures = assignment
                .values()
                .assigned_lectures()
                .filter(movable)
                .collect();
        }
        if lectures.is_empty() {
            return None;
        }

        if random.generate_bool(self.random_walk_probability) {
            return random.choose(&lectures).copied();
        }

        let candidates = if self.subset_selection {
            sub_set(&lectures, self.subset_part, self.subset_min_size, random)
        } else {
            lectures.clone()
        };

        let mut worst = Vec::new();
        let mut worst_value = i64::MIN;
        let mut worst_room_and_group = i32::MIN;
        for lecture in candidates {
            if self.tabu.contains(&lecture) {
                continue;
            }
            let Some(placement) = assignment.placement(model, lecture) else {
                continue;
            };
            let value = (100.0 * comparator.placement_value(model, assignment, placement)).round()
                as i64;
            let group_preference = model
                .lecture(lecture)
                .group_constraints()
                .iter()
                .filter_map(|&constraint| model.group_constraint(constraint))
                .map(|group| group.current_preference(model, assignment.values()))
                .sum::<i32>();
            let room_and_group = placement.sum_room_preference() + group_preference;

            if worst.is_empty()
                || value > worst_value
                || (value == worst_value && room_and_group > worst_room_and_group)
            {
                worst.clear();
                worst.push(lecture);
                worst_value = value;
                worst_room_and_group = room_and_group;
            } else if value == worst_value && room_and_group == worst_room_and_group {
                worst.push(lecture);
            }
        }

        let selected = random
            .choose(&worst)
            .or_else(|| random.choose(&lectures))
            .copied()?;
        self.tabu.push(selected);
        Some(selected)
    }

    fn select_unassigned(
        &mut self,
        model: &TimetableModel,
        assignment: &Assignment,
        random: &mut dyn Random,
    ) -> Option<LectureId> {
        let unassigned = assignment
            .values()
            .unassigned_lectures()
            .collect::<Vec<_>>();

        if self.variable_chance_iteration > 0 {
            let with_chance = unassigned
                .iter()
                .copied()
                .filter(|&lecture| assignment.nr_assignments(lecture) <= self.variable_chance_iteration)
                .collect::<Vec<_>>();
            if with_chance.is_empty()
                && assignment.nr_assigned() > 0
                && random.generate_bool(self.variable_chance_probability)
            {
                let assigned = assignment
                    .values()
                    .assigned_lectures()
                    .filter(|&lecture| !model.lecture(lecture).is_committed())
                    .collect::<Vec<_>>();
                if let Some(&lecture) = random.choose(&assigned) {
                    return Some(lecture);
                }
            }
            if random.generate_bool(self.random_walk_probability) {
                let pool = if with_chance.is_empty() {
                    &unassigned
                } else {
                    &with_chance
                };
                return random.choose(pool).copied();
            }
        } else if random.generate_bool(self.random_walk_probability) {
            return random.choose(&unassigned).copied();
        }

        let candidates = if self.subset_selection {
            sub_set(&unassigned, self.subset_part, self.subset_min_size, random)
        } else {
            unassigned.clone()
        };
        let candidates = candidates
            .into_iter()
            .filter(|lecture| !self.tabu.contains(lecture))
            .map(|lecture| LectureStatistics::of(model, assignment, lecture, self, random))
            .collect::<Vec<_>>();

        let selected = if self.roulette_wheel_selection {
            self.roulette_wheel(&candidates, random)
        } else {
            self.strict_minimum(&candidates, random)
        };
        let selected = selected.or_else(|| random.choose(&unassigned).copied())?;
        self.tabu.push(selected);
        Some(selected)
    }

    fn roulette_wheel(
        &self,
        candidates: &[LectureStatistics],
        random: &mut dyn Random,
    ) -> Option<LectureId> {
        let max_domain_size = candidates.iter().map(|c| c.domain_size).max().unwrap_or(0);
        let max_good_values = candidates.iter().map(|c| c.good_values).max().unwrap_or(0);
        let max_constraints = candidates.iter().map(|c| c.nr_constraints).max().unwrap_or(0);
        let max_assignments = candidates.iter().map(|c| c.nr_assignments).max().unwrap_or(0);

        let mut total_points = 0;
        let mut wheel = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let points = (self.domain_size_weight
                * ratio(max_domain_size - candidate.domain_size, max_domain_size)
                + self.good_values_weight
                    * ratio(max_good_values - candidate.good_values, max_good_values)
                + self.nr_assignments_weight
                    * ratio(candidate.nr_assignments as usize, max_assignments as usize)
                + self.constraints_weight
                    * ratio(max_constraints - candidate.nr_constraints, max_constraints)
                + self.initial_assignment_weight * candidate.initial_conflicts as f64)
                .round() as usize;
            if points > 0 {
                total_points += points;
                wheel.push((candidate.lecture, total_points));
            }
        }
        if total_points == 0 {
            return None;
        }

        let spin = random.generate_usize_in_range(0..total_points);
        wheel
            .into_iter()
            .find(|&(_, cumulative)| cumulative > spin)
            .map(|(lecture, _)| lecture)
    }

    fn strict_minimum(
        &self,
        candidates: &[LectureStatistics],
        random: &mut dyn Random,
    ) -> Option<LectureId> {
        let goodness = |candidate: &LectureStatistics| {
            (self.domain_size_weight * candidate.domain_size as f64
                + self.good_values_weight * candidate.good_values as f64
                + self.nr_assignments_weight * candidate.nr_assignments as f64
                + self.constraints_weight * candidate.nr_constraints as f64
                + self.initial_assignment_weight * candidate.initial_conflicts as f64)
                as i64
        };
        let best = candidates.iter().map(goodness).min()?;
        let best_lectures = candidates
            .iter()
            .filter(|candidate| goodness(candidate) == best)
            .map(|candidate| candidate.lecture)
            .collect::<Vec<_>>();
        random.choose(&best_lectures).copied()
    }
}

/// The quantities which the selection of an unassigned lecture is based on.
#[derive(Debug)]
struct LectureStatistics {
    lecture: LectureId,
    domain_size: usize,
    good_values: usize,
    nr_constraints: usize,
    nr_assignments: u32,
    initial_conflicts: usize,
}

impl LectureStatistics {
    fn of(
        model: &TimetableModel,
        assignment: &Assignment,
        lecture_id: LectureId,
        selection: &LectureSelection,
        random: &mut dyn Random,
    ) -> LectureStatistics {
        let lecture = model.lecture(lecture_id);
        let good_values = if selection.good_values_weight != 0.0 {
            lecture
                .domain()
                .iter()
                .filter(|placement| !assignment.in_conflict(model, placement))
                .count()
        } else {
            0
        };
        let initial_conflicts = match lecture.initial() {
            Some(initial) if selection.initial_assignment_weight != 0.0 => assignment
                .conflicts(model, model.placement(initial), random)
                .len(),
            _ => 0,
        };

        LectureStatistics {
            lecture: lecture_id,
            domain_size: lecture.domain().len(),
            good_values,
            nr_constraints: lecture.constraints().len(),
            nr_assignments: assignment.nr_assignments(lecture_id),
            initial_conflicts,
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// A random subset of `part` of the elements, with at least `min_size` elements.
pub(crate) fn sub_set<T: Copy>(
    elements: &[T],
    part: f64,
    min_size: usize,
    random: &mut dyn Random,
) -> Vec<T> {
    if elements.len() <= min_size || part >= 1.0 {
        return elements.to_vec();
    }
    let mut subset = elements.to_vec();
    let size = subset.len();
    let nr_selected = min_size.max((part * size as f64) as usize);
    for index in 0..nr_selected {
        let other = random.generate_usize_in_range(index..size);
        subset.swap(index, other);
    }
    subset.truncate(nr_selected);
    subset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::TestRandom;
    use crate::model::tests::two_lectures_one_room;
    use crate::model::PlacementId;

    #[test]
    fn the_random_walk_picks_an_unassigned_lecture() {
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
        let mut selection = LectureSelection::default();
        let mut random = TestRandom {
            bools: vec![true],
            usizes: vec![0],
            ..Default::default()
        };

        let selected =
            selection.select_lecture(&model, &assignment, &TimetableComparator::default(), &mut random);

        assert_eq!(selected, Some(second));
    }

    #[test]
    fn lectures_without_points_fall_back_to_a_random_choice() {
        let model = two_lectures_one_room();
        let assignment = model.create_assignment();
        let properties = Properties::default()
            .set("Lecture.RandomWalkProb", 0.0)
            .set("Lecture.VariableChanceIteration", 0)
            .set("Lecture.NrGoodValuesWeight", 0.0)
            .set("Lecture.NrAssignmentsWeight", 0.0);
        let mut selection = LectureSelection::from_properties(&properties).unwrap();
        // Both lectures have the same domain size, so no lecture gets any points.
        let mut random = TestRandom {
            bools: vec![false],
            usizes: vec![1],
            ..Default::default()
        };
        let selected =
            selection.select_lecture(&model, &assignment, &TimetableComparator::default(), &mut random);

        assert_eq!(selected, model.lecture_ids().nth(1));
    }

    #[test]
    fn a_complete_solution_selects_the_worst_lecture() {
        let model = two_lectures_one_room();
        let mut assignment = model.create_assignment();
        let mut lectures = model.lecture_ids();
        let first = lectures.next().unwrap();
        let second = lectures.next().unwrap();
        assignment.assign_unchecked(
            &model,
            PlacementId {
                lecture: first,
                index: 1,
            },
        );
        assignment.assign_unchecked(
            &model,
            PlacementId {
                lecture: second,
                index: 1,
            },
        );
        let properties = Properties::default().set("Lecture.RandomWalkProb", 0.0);
        let mut selection = LectureSelection::from_properties(&properties).unwrap();
        // Both lectures contribute equally, the tie is broken by the random choice.
        let mut random = TestRandom {
            bools: vec![false],
            usizes: vec![0],
            ..Default::default()
        };

        let selected =
            selection.select_lecture(&model, &assignment, &TimetableComparator::default(), &mut random);

        assert_eq!(selected, Some(first));
    }

    #[test]
    fn sub_sets_keep_the_minimal_size() {
        let elements = (0..20).collect::<Vec<_>>();
        let mut random = TestRandom {
            usizes: (0..10).collect(),
            ..Default::default()
        };

        let subset = sub_set(&elements, 0.2, 10, &mut random);

        assert_eq!(subset, (0..10).collect::<Vec<_>>());
    }
}
