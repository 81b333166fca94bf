use enum_map::Enum;
use enum_map::EnumMap;

/// The soft terms of the objective.
///
/// Every term is kept as a running total by the [`Assignment`](super::Assignment); the
/// [`TimetableComparator`](crate::heuristics::TimetableComparator) combines them into the value of
/// a solution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Enum)]
pub enum CriterionKind {
    /// Joint enrollments of lectures in conflict, neither of which is committed.
    StudentConflict,
    /// Student conflicts between two single-section lectures.
    HardStudentConflict,
    /// Student conflicts between a committed and a non-committed lecture.
    CommittedStudentConflict,
    /// Student conflicts caused by the distance between back-to-back lectures.
    DistanceStudentConflict,
    TimePreferences,
    RoomPreferences,
    TooBigRooms,
    /// Empty slots which break a Monday-Wednesday-Friday or Tuesday-Thursday pattern of a room.
    BrokenTimePatterns,
    DistributionPreferences,
    BackToBackInstructorPreferences,
    DepartmentBalancingPenalty,
    SameSubpartBalancingPenalty,
    /// Lectures placed differently than in the initial solution.
    Perturbations,
    FlexibleConstraint,
    /// Overlapping classes of instructors whose constraint is soft.
    InstructorConflict,
    /// Missed lunch breaks of the instructors.
    InstructorLunchBreak,
    InstructorFairness,
}

/// Running totals of every [`CriterionKind`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Criteria {
    totals: EnumMap<CriterionKind, f64>,
}

impl Criteria {
    pub fn value(&self, kind: CriterionKind) -> f64 {
        self.totals[kind]
    }

    pub fn iter(&self) -> impl Iterator<Item = (CriterionKind, f64)> + '_ {
        self.totals.iter().map(|(kind, value)| (kind, *value))
    }

    pub(crate) fn inc(&mut self, kind: CriterionKind, delta: f64) {
        self.totals[kind] += delta;
    }

    /// Adds every total of `other` to the totals of `self`.
    pub(crate) fn add(&mut self, other: &Criteria) {
        for (kind, value) in other.iter() {
            self.inc(kind, value);
        }
    }

    /// Whether every total is within `tolerance` of the total in `other`.
    pub fn approx_eq(&self, other: &Criteria, tolerance: f64) -> bool {
        self.iter()
            .all(|(kind, value)| (value - other.value(kind)).abs() <= tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_accumulate_per_kind() {
        let mut criteria = Criteria::default();
        criteria.inc(CriterionKind::TimePreferences, 2.5);
        criteria.inc(CriterionKind::TimePreferences, -1.0);
        criteria.inc(CriterionKind::StudentConflict, 3.0);

        assert_eq!(criteria.value(CriterionKind::TimePreferences), 1.5);
        assert_eq!(criteria.value(CriterionKind::StudentConflict), 3.0);
        assert_eq!(criteria.value(CriterionKind::RoomPreferences), 0.0);
    }

    #[test]
    fn adding_criteria_sums_every_kind() {
        let mut first = Criteria::default();
        first.inc(CriterionKind::TooBigRooms, 1.0);
        let mut second = Criteria::default();
        second.inc(CriterionKind::TooBigRooms, 2.0);
        second.inc(CriterionKind::Perturbations, 1.0);

        first.add(&second);

        assert!(first.approx_eq(
            &[
                (CriterionKind::TooBigRooms, 3.0),
                (CriterionKind::Perturbations, 1.0)
            ]
            .into_iter()
            .fold(Criteria::default(), |mut criteria, (kind, value)| {
                criteria.inc(kind, value);
                criteria
            }),
            1e-9
        ));
    }
}
