use super::tabu_list::TabuList;
use super::HeuristicSelector;
use super::TimetableComparator;
use crate::basic_types::Properties;
use crate::basic_types::PropertyError;
use crate::basic_types::Random;
use crate::engine::Assignment;
use crate::engine::CriterionKind;
use crate::model::LectureId;
use crate::model::PlacementId;
use crate::model::TimetableModel;

/// Selects a placement for a lecture.
///
/// Every placement of the domain other than the current one is scored by
/// `Value.WeightConflicts × |conflicts| + Value.WeightValue × value`, where the value is the
/// weighted change of the criteria; placements which are in conflict with themselves are skipped.
/// One of the placements with the lowest score is chosen at random. With probability
/// `Value.RandomWalkProb` a random placement is returned instead, and in minimal perturbation mode
/// (`General.MPP`) the initial placement is preferred with probability
/// `Value.InitialSelectionProb` or whenever more than `Value.MPPLimit` lectures are perturbed.
#[derive(Debug)]
pub struct ValueSelection {
    random_walk_probability: f64,
    weight_conflicts: f64,
    weight_value: f64,
    mpp: bool,
    mpp_limit: i64,
    initial_selection_probability: f64,
    weight_delta_initial_assignments: f64,
    tabu: TabuList<PlacementId>,
}

impl Default for ValueSelection {
    fn default() -> Self {
        ValueSelection::from_properties(&Properties::default())
            .unwrap_or_else(|_| unreachable!("the defaults are valid"))
    }
}

impl ValueSelection {
    pub fn from_properties(properties: &Properties) -> Result<ValueSelection, PropertyError> {
        let mpp = properties.get_bool("General.MPP", false)?;
        let (mpp_limit, initial_selection_probability, weight_delta_initial_assignments) = if mpp {
            (
                properties.get_i32("Value.MPPLimit", -1)? as i64,
                properties.get_f64("Value.InitialSelectionProb", 0.75)?,
                properties.get_f64("Value.WeightDeltaInitialAssignments", 0.0)?,
            )
        } else {
            (-1, 0.0, 0.0)
        };

        Ok(ValueSelection {
            random_walk_probability: properties.get_f64("Value.RandomWalkProb", 0.0)?,
            weight_conflicts: properties.get_f64("Value.WeightConflicts", 1.0)?,
            weight_value: properties.get_f64("Value.WeightValue", 0.0)?,
            mpp,
            mpp_limit,
            initial_selection_probability,
            weight_delta_initial_assignments,
            tabu: TabuList::new(properties.get_u32("Value.Tabu", 0)? as usize),
        })
    }

    /// Selects a placement of `lecture`, [`None`] if every placement is ruled out.
    pub fn select_value(
        &mut self,
        model: &TimetableModel,
        assignment: &Assignment,
        lecture_id: LectureId,
        comparator: &TimetableComparator,
        random: &mut dyn Random,
    ) -> Option<PlacementId> {
        let lecture = model.lecture(lecture_id);
        let nr_perturbations = assignment.criteria().value(CriterionKind::Perturbations) as i64;

        if self.mpp {
            if let Some(initial) = lecture.initial() {
                if assignment.nr_unassigned() == 0 && nr_perturbations <= self.mpp_limit {
                    self.mpp_limit = nr_perturbations - 1;
                }
                if self.mpp_limit >= 0 && nr_perturbations > self.mpp_limit {
                    return Some(initial);
                }
                if random.generate_bool(self.initial_selection_probability) {
                    return Some(initial);
                }
            }
        }

        let domain = lecture.domain();
        if random.generate_bool(self.random_walk_probability) {
            return random.choose(domain).map(|placement| placement.id());
        }
        if domain.len() == 1 {
            return Some(domain[0].id());
        }

        let current = assignment.value(lecture_id);
        let mut selector = HeuristicSelector::new([0.0]);
        for placement in domain {
            let id = placement.id();
            if self.tabu.contains(&id) || current == Some(id) {
                continue;
            }
            let conflicts = assignment.conflicts(model, placement, random);
            if conflicts.contains(&id) {
                continue;
            }

            let mut delta_initial_assignments = 0;
            if self.mpp && self.weight_delta_initial_assignments != 0.0 {
                delta_initial_assignments -= conflicts
                    .iter()
                    .filter(|conflict| model.lecture(conflict.lecture).initial().is_some())
                    .count() as i64;
                if lecture.initial().is_some_and(|initial| initial != id) {
                    delta_initial_assignments += 1;
                }
                if self.mpp_limit >= 0
                    && nr_perturbations + delta_initial_assignments > self.mpp_limit
                {
                    continue;
                }
            }

            let mut weighted_sum = self.weight_delta_initial_assignments
                * delta_initial_assignments as f64
                + self.weight_conflicts * conflicts.len() as f64;
            if self.weight_value != 0.0 {
                weighted_sum +=
                    self.weight_value * comparator.placement_value(model, assignment, placement);
            }
            let _ = selector.add(vec![weighted_sum], id);
        }

        let best = selector
            .selection()
            .into_iter()
            .map(|element| element.into_object())
            .collect::<Vec<_>>();
        match random.choose(&best).copied() {
            Some(selected) => {
                self.tabu.push(selected);
                Some(selected)
            }
            None => {
                if let Some(placement) = random.choose(domain) {
                    self.tabu.push(placement.id());
                }
                None
            }
        }
    }
}
