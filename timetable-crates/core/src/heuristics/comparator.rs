use enum_map::EnumMap;

use crate::basic_types::Properties;
use crate::basic_types::PropertyError;
use crate::engine::placement_criteria;
use crate::engine::Assignment;
use crate::engine::Criteria;
use crate::engine::CriterionKind;
use crate::model::Placement;
use crate::model::TimetableModel;

/// Compares solutions of a [`TimetableModel`].
///
/// A solution with fewer unassigned lectures is always better; among solutions with the same
/// number of unassigned lectures the one with the lower value is better, where the value is a
/// weighted sum of the [`Criteria`] totals.
///
/// Recognised keys (all under `Comparator.`): `UselessSlotWeight` (0.0, weight of the broken time
/// patterns), `TimePreferenceWeight` (1.0), `RoomPreferenceWeight` (0.1), `ContrPreferenceWeight`
/// (1.0), `StudentConflictWeight` (0.2), `HardStudentConflictWeight` (1.0),
/// `DistStudentConflictWeight` (0.0), `TooBigRoomWeight` (0.0),
/// `DistanceInstructorPreferenceWeight` (1.0), `PerturbationPenaltyWeight` (1.0, only used with
/// `General.MPP`), `DeptSpreadPenaltyWeight` (1.0), `SpreadPenaltyWeight` (1.0),
/// `CommitedStudentConflictWeight` (1.0), `FlexibleConstraintWeight` (1.0),
/// `InstructorConflictWeight` (100.0) and `InstructorFairnessPreferenceWeight` (1.0); the missed
/// lunch breaks are weighted by `InstructorLunch.Weight` (0.3). When
/// `General.SwitchStudents` is false, hard student conflicts are not weighted separately and the
/// student conflict weight defaults to 1.0.
#[derive(Clone, Debug)]
pub struct TimetableComparator {
    weights: EnumMap<CriterionKind, f64>,
}

impl Default for TimetableComparator {
    fn default() -> Self {
        TimetableComparator::from_properties(&Properties::default())
            .unwrap_or_else(|_| unreachable!("the defaults are valid"))
    }
}

impl TimetableComparator {
    pub fn from_properties(properties: &Properties) -> Result<TimetableComparator, PropertyError> {
        let mut weights = EnumMap::default();

        weights[CriterionKind::BrokenTimePatterns] =
            properties.get_f64("Comparator.UselessSlotWeight", 0.0)?;
        weights[CriterionKind::TimePreferences] =
            properties.get_f64("Comparator.TimePreferenceWeight", 1.0)?;
        weights[CriterionKind::RoomPreferences] =
            properties.get_f64("Comparator.RoomPreferenceWeight", 0.1)?;
        weights[CriterionKind::DistributionPreferences] =
            properties.get_f64("Comparator.ContrPreferenceWeight", 1.0)?;
        if properties.get_bool("General.SwitchStudents", true)? {
            weights[CriterionKind::HardStudentConflict] =
                properties.get_f64("Comparator.HardStudentConflictWeight", 1.0)?;
            weights[CriterionKind::StudentConflict] =
                properties.get_f64("Comparator.StudentConflictWeight", 0.2)?;
        } else {
            weights[CriterionKind::StudentConflict] =
                properties.get_f64("Comparator.StudentConflictWeight", 1.0)?;
        }
        weights[CriterionKind::DistanceStudentConflict] =
            properties.get_f64("Comparator.DistStudentConflictWeight", 0.0)?;
        weights[CriterionKind::TooBigRooms] =
            properties.get_f64("Comparator.TooBigRoomWeight", 0.0)?;
        weights[CriterionKind::BackToBackInstructorPreferences] =
            properties.get_f64("Comparator.DistanceInstructorPreferenceWeight", 1.0)?;
        if properties.get_bool("General.MPP", false)? {
            weights[CriterionKind::Perturbations] =
                properties.get_f64("Comparator.PerturbationPenaltyWeight", 1.0)?;
        }
        weights[CriterionKind::DepartmentBalancingPenalty] =
            properties.get_f64("Comparator.DeptSpreadPenaltyWeight", 1.0)?;
        weights[CriterionKind::SameSubpartBalancingPenalty] =
            properties.get_f64("Comparator.SpreadPenaltyWeight", 1.0)?;
        weights[CriterionKind::CommittedStudentConflict] =
            properties.get_f64("Comparator.CommitedStudentConflictWeight", 1.0)?;
        weights[CriterionKind::FlexibleConstraint] =
            properties.get_f64("Comparator.FlexibleConstraintWeight", 1.0)?;
        weights[CriterionKind::InstructorConflict] =
            properties.get_f64("Comparator.InstructorConflictWeight", 100.0)?;
        weights[CriterionKind::InstructorLunchBreak] =
            properties.get_f64("InstructorLunch.Weight", 0.3)?;
        weights[CriterionKind::InstructorFairness] =
            properties.get_f64("Comparator.InstructorFairnessPreferenceWeight", 1.0)?;

        Ok(TimetableComparator { weights })
    }

    pub fn weight(&self, kind: CriterionKind) -> f64 {
        self.weights[kind]
    }

    /// The weighted sum of the totals.
    pub fn value(&self, criteria: &Criteria) -> f64 {
        criteria
            .iter()
            .filter(|(kind, _)| self.weights[*kind] != 0.0)
            .map(|(kind, value)| self.weights[kind] * value)
            .sum()
    }

    /// The value of the current solution of `assignment`.
    pub fn current_value(&self, assignment: &Assignment) -> f64 {
        self.value(assignment.criteria())
    }

    /// Whether a solution with `nr_unassigned` unassigned lectures and value `value` is better
    /// than the best solution found so far, [`None`] if there is none yet.
    pub fn is_better_than_best(
        &self,
        nr_unassigned: usize,
        value: f64,
        best: Option<(usize, f64)>,
    ) -> bool {
        match best {
            None => true,
            Some((best_unassigned, _)) if best_unassigned != nr_unassigned => {
                nr_unassigned < best_unassigned
            }
            Some((_, best_value)) => value < best_value,
        }
    }

    /// How much the totals would change if `placement` were assigned, its lecture being
    /// unassigned first. For the value of an assigned lecture this is its contribution to the
    /// current solution.
    pub fn placement_criteria(
        &self,
        model: &TimetableModel,
        assignment: &Assignment,
        placement: &Placement,
    ) -> Criteria {
        let mut criteria = placement_criteria(model, assignment.values(), placement);
        for &constraint_id in model.constraints_of(placement.lecture()) {
            model.constraint(constraint_id).marginal_criteria(
                constraint_id,
                model,
                assignment,
                placement,
                &mut criteria,
            );
        }
        criteria
    }

    /// The weighted value of [`TimetableComparator::placement_criteria`].
    pub fn placement_value(
        &self,
        model: &TimetableModel,
        assignment: &Assignment,
        placement: &Placement,
    ) -> f64 {
        self.value(&self.placement_criteria(model, assignment, placement))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fewer_unassigned_lectures_always_win() {
        let comparator = TimetableComparator::default();

        assert!(comparator.is_better_than_best(1, 1000.0, Some((2, -1000.0))));
        assert!(!comparator.is_better_than_best(3, -1000.0, Some((2, 1000.0))));
    }

    #[test]
    fn ties_are_broken_by_a_strictly_lower_value() {
        let comparator = TimetableComparator::default();

        assert!(comparator.is_better_than_best(0, 1.0, Some((0, 2.0))));
        assert!(!comparator.is_better_than_best(0, 2.0, Some((0, 2.0))));
        assert!(comparator.is_better_than_best(5, 2.0, None));
    }

    #[test]
    fn value_is_the_weighted_sum_of_the_totals() {
        let comparator = TimetableComparator::default();
        let mut criteria = Criteria::default();
        criteria.inc(CriterionKind::TimePreferences, 2.0);
        criteria.inc(CriterionKind::RoomPreferences, 10.0);
        criteria.inc(CriterionKind::StudentConflict, 5.0);
        criteria.inc(CriterionKind::TooBigRooms, 7.0);

        assert!((comparator.value(&criteria) - (2.0 + 1.0 + 1.0)).abs() < 1e-9);
    }

    #[test]
    fn switching_students_off_changes_the_student_weights() {
        let properties = Properties::default().set("General.SwitchStudents", false);

        let comparator = TimetableComparator::from_properties(&properties).unwrap();

        assert_eq!(comparator.weight(CriterionKind::StudentConflict), 1.0);
        assert_eq!(comparator.weight(CriterionKind::HardStudentConflict), 0.0);
    }

    #[test]
    fn perturbations_are_only_weighted_in_mpp_mode() {
        let regular = TimetableComparator::default();
        let mpp =
            TimetableComparator::from_properties(&Properties::default().set("General.MPP", true))
                .unwrap();

        assert_eq!(regular.weight(CriterionKind::Perturbations), 0.0);
        assert_eq!(mpp.weight(CriterionKind::Perturbations), 1.0);
    }

    #[test]
    fn malformed_weights_are_reported() {
        let properties = Properties::default().set("Comparator.TimePreferenceWeight", "heavy");

        assert!(TimetableComparator::from_properties(&properties).is_err());
    }
}
