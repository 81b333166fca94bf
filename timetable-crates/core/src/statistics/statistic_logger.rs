use std::fmt::Display;

use convert_case::Case;
use convert_case::Casing;

use super::statistic_logging::log_statistic;
use crate::engine::Criteria;
use crate::engine::CriterionKind;

/// Logs the statistics of a search under a common name, such as `solver`. Every statistic of the
/// search extends that name with its own, e.g. `solver_iterations` or
/// `solver_best_time_preferences`.
#[derive(Debug, Default, Clone)]
pub struct StatisticLogger {
    name_prefix: String,
}

impl StatisticLogger {
    pub fn new(name_prefix: impl Display) -> Self {
        Self {
            name_prefix: name_prefix.to_string(),
        }
    }

    pub fn attach_to_prefix(&self, addition_to_prefix: impl Display) -> Self {
        Self {
            name_prefix: format!("{}_{}", self.name_prefix, addition_to_prefix),
        }
    }

    pub fn log_value(&self, value: impl Display) {
        log_statistic(&self.name_prefix, value);
    }

    /// Logs the total of every criterion, named after the criterion in snake case.
    pub fn log_criteria(&self, criteria: &Criteria) {
        for (kind, value) in criteria.iter() {
            self.attach_to_prefix(criterion_name(kind)).log_value(value);
        }
    }
}

fn criterion_name(kind: CriterionKind) -> String {
    format!("{kind:?}").to_case(Case::Snake)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statistic_names_extend_the_prefix() {
        let logger = StatisticLogger::new("solver")
            .attach_to_prefix("best")
            .attach_to_prefix(criterion_name(CriterionKind::TimePreferences));

        assert_eq!(logger.name_prefix, "solver_best_time_preferences");
    }

    #[test]
    fn criteria_are_named_in_snake_case() {
        assert_eq!(
            criterion_name(CriterionKind::BackToBackInstructorPreferences),
            "back_to_back_instructor_preferences"
        );
        assert_eq!(criterion_name(CriterionKind::TooBigRooms), "too_big_rooms");
    }
}
