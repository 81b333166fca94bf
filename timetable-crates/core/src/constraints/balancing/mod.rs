//! Balancing constraints keep a group of lectures from piling up in the same times or rooms: the
//! limits are derived from the domains of the lectures and are raised whenever the search gets
//! stuck on them.
mod rooms;
mod spread;
mod time_groups;

pub use rooms::MinimizeRoomsConstraint;
pub use rooms::MinimizeRoomsContext;
pub use spread::SpreadConstraint;
pub use spread::SpreadContext;
pub use time_groups::GroupOfTime;
pub use time_groups::MinimizeTimeGroupsConstraint;
pub use time_groups::MinimizeTimeGroupsContext;
pub use time_groups::TimeGroupsPreset;

use crate::basic_types::Properties;
use crate::basic_types::PropertyError;
use crate::model::TimeLocation;
use crate::model::DAY_CODES;
use crate::model::NR_DAYS;

/// The part of the week which is balanced and how strictly.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpreadOptions {
    /// How far above the average usage of a cell its limit may be.
    pub spread_factor: f64,
    /// After how many unassignments the allowed penalty is raised by one; `0` makes the
    /// constraint soft.
    pub unassignments_to_weaken: u64,
    pub first_day_slot: i32,
    pub last_day_slot: i32,
    pub first_work_day: usize,
    /// The last work day, at least the first work day (a week may wrap around Sunday).
    pub last_work_day: usize,
}

impl SpreadOptions {
    fn from_properties(
        properties: &Properties,
        prefix: &str,
        default_unassignments_to_weaken: u64,
    ) -> Result<SpreadOptions, PropertyError> {
        let first_work_day = properties.get_u32("General.FirstWorkDay", 0)? as usize;
        let mut last_work_day = properties.get_u32("General.LastWorkDay", 4)? as usize;
        if last_work_day < first_work_day {
            last_work_day += NR_DAYS;
        }
        Ok(SpreadOptions {
            spread_factor: properties.get_f64(&format!("{prefix}.SpreadFactor"), 1.2)?,
            unassignments_to_weaken: properties.get_u64(
                &format!("{prefix}.Unassignments2Weaken"),
                default_unassignments_to_weaken,
            )?,
            first_day_slot: properties.get_i32("General.FirstDaySlot", 90)?,
            last_day_slot: properties.get_i32("General.LastDaySlot", 209)?,
            first_work_day,
            last_work_day,
        })
    }

    pub fn nr_slots(&self) -> usize {
        (self.last_day_slot - self.first_day_slot + 1).max(0) as usize
    }

    pub fn nr_days(&self) -> usize {
        self.last_work_day - self.first_work_day + 1
    }

    /// The cells (slot, day) of the balanced part of the week covered by `time`, relative to the
    /// first day slot and the first work day.
    pub(crate) fn cells<'a>(&'a self, time: &'a TimeLocation) -> impl Iterator<Item = (usize, usize)> + 'a {
        let first = time.start_slot().max(self.first_day_slot);
        let last = (time.start_slot() + time.length() - 1).min(self.last_day_slot);
        (first..=last).flat_map(move |slot| {
            (self.first_work_day..=self.last_work_day)
                .filter(move |&day| time.day_code() & DAY_CODES[day % NR_DAYS] != 0)
                .map(move |day| {
                    (
                        (slot - self.first_day_slot) as usize,
                        day - self.first_work_day,
                    )
                })
        })
    }

    pub(crate) fn grid<T: Clone>(&self, value: T) -> Vec<Vec<T>> {
        vec![vec![value; self.nr_days()]; self.nr_slots()]
    }
}

/// Settings of every balancing constraint of a model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BalancingOptions {
    /// Spread of the lectures of a scheduling subpart.
    pub spread: SpreadOptions,
    /// Spread of the lectures of a department.
    pub department_spread: SpreadOptions,
    /// Whether every department gets a spread constraint.
    pub department_balancing: bool,
    pub minimize_rooms_unassignments_to_weaken: u64,
    pub minimize_time_groups_unassignments_to_weaken: u64,
}

impl Default for BalancingOptions {
    fn default() -> Self {
        BalancingOptions::from_properties(&Properties::default())
            .unwrap_or_else(|_| unreachable!("the defaults are valid"))
    }
}

impl BalancingOptions {
    pub fn from_properties(properties: &Properties) -> Result<BalancingOptions, PropertyError> {
        Ok(BalancingOptions {
            spread: SpreadOptions::from_properties(properties, "Spread", 50)?,
            department_spread: SpreadOptions::from_properties(properties, "DeptBalancing", 0)?,
            department_balancing: properties.get_bool("General.DeptBalancing", true)?,
            minimize_rooms_unassignments_to_weaken: properties
                .get_u64("MinimizeNumberOfUsedRooms.Unassignments2Weaken", 250)?,
            minimize_time_groups_unassignments_to_weaken: properties
                .get_u64("MinimizeNumberOfUsedGroupsOfTime.Unassignments2Weaken", 250)?,
        })
    }
}

/// Raises a limit by one every `unassignments_to_weaken` calls; returns whether it should be
/// raised now.
pub(crate) fn count_unassignment(unassignments: &mut u64, unassignments_to_weaken: u64) -> bool {
    *unassignments += 1;
    unassignments_to_weaken > 0 && *unassignments % unassignments_to_weaken == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_defaults_follow_the_configuration_keys() {
        let options = BalancingOptions::default();
        assert_eq!(options.spread.unassignments_to_weaken, 50);
        assert_eq!(options.department_spread.unassignments_to_weaken, 0);
        assert_eq!(options.spread.first_day_slot, 90);
        assert_eq!(options.spread.last_day_slot, 209);
        assert_eq!(options.spread.nr_days(), 5);
        assert_eq!(options.minimize_rooms_unassignments_to_weaken, 250);
    }

    #[test]
    fn a_week_may_wrap_around() {
        let properties = Properties::default()
            .set("General.FirstWorkDay", 5)
            .set("General.LastWorkDay", 1);
        let options = BalancingOptions::from_properties(&properties).unwrap();
        assert_eq!(options.spread.last_work_day, 8);
        assert_eq!(options.spread.nr_days(), 4);
    }

    #[test]
    fn cells_are_clipped_to_the_balanced_part_of_the_day() {
        let options = BalancingOptions::default().spread;
        let time = TimeLocation::new(DAY_CODES[0] | DAY_CODES[2], 88, 4);
        let cells = options.cells(&time).collect::<Vec<_>>();
        assert_eq!(cells, vec![(0, 0), (0, 2), (1, 0), (1, 2)]);

        let evening = TimeLocation::new(DAY_CODES[0], 210, 12);
        assert_eq!(options.cells(&evening).count(), 0);
    }

    #[test]
    fn unassignments_raise_the_limit_periodically() {
        let mut unassignments = 0;
        let raised = (0..6)
            .filter(|_| count_unassignment(&mut unassignments, 3))
            .count();
        assert_eq!(raised, 2);
        assert!(!count_unassignment(&mut unassignments, 0));
    }
}
