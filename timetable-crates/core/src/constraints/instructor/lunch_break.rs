use crate::basic_types::Properties;
use crate::basic_types::PropertyError;
use crate::constraints::SlotResource;
use crate::model::Placement;
use crate::model::TimeLocation;
use crate::model::TimetableModel;
use crate::model::WeekCode;
use crate::model::DAY_CODES;
use crate::model::NR_DAYS;
use crate::model::SLOTS_PER_DAY;

/// The break every instructor should get around noon on each day they teach.
///
/// An instructor misses the break on a day of a week when the longest run of free slots within
/// `[start_slot, end_slot)` is shorter than `length` slots. The penalty of an instructor is the
/// number of missed breaks over all days and weeks, raised to `multiplier`.
///
/// Recognised keys: `InstructorLunch.StartSlot` (132, i.e. 11:00), `InstructorLunch.EndSlot`
/// (162, i.e. 13:30), `InstructorLunch.Length` (6 slots) and `InstructorLunch.Multiplier` (1.2).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LunchBreak {
    pub start_slot: i32,
    pub end_slot: i32,
    pub length: i32,
    pub multiplier: f64,
}

impl Default for LunchBreak {
    fn default() -> Self {
        LunchBreak::from_properties(&Properties::default())
            .unwrap_or_else(|_| unreachable!("the defaults are valid"))
    }
}

impl LunchBreak {
    pub fn from_properties(properties: &Properties) -> Result<LunchBreak, PropertyError> {
        Ok(LunchBreak {
            start_slot: properties.get_i32("InstructorLunch.StartSlot", (11 * 60) / 5)?,
            end_slot: properties.get_i32("InstructorLunch.EndSlot", (13 * 60 + 30) / 5)?,
            length: properties.get_i32("InstructorLunch.Length", 30 / 5)?,
            multiplier: properties.get_f64("InstructorLunch.Multiplier", 1.2)?,
        })
    }

    /// Whether a class at `time` can take away a part of the break.
    pub fn touches(&self, time: &TimeLocation) -> bool {
        time.start_slot() <= self.end_slot && time.end_slot() > self.start_slot
    }

    pub(crate) fn penalty(&self, violations: &[u32; NR_DAYS]) -> f64 {
        let total: u32 = violations.iter().sum();
        (total as f64).powf(self.multiplier)
    }

    /// The number of weeks in which the instructor using `resource` misses the break on `day`.
    pub(crate) fn day_violations(
        &self,
        model: &TimetableModel,
        resource: &SlotResource,
        day: usize,
    ) -> u32 {
        self.count_violations(model, day, |slot, week| {
            resource
                .placements(slot)
                .iter()
                .any(|&id| model.placement(id).time().share_weeks_with(week))
        })
    }

    /// Like [`LunchBreak::day_violations`], but as if `placement` replaced the current placement
    /// of its lecture.
    pub(crate) fn day_violations_with(
        &self,
        model: &TimetableModel,
        resource: &SlotResource,
        day: usize,
        placement: &Placement,
    ) -> u32 {
        let time = placement.time();
        let day_start = day * SLOTS_PER_DAY as usize;
        let meets_on_day = time.day_code() & DAY_CODES[day] != 0;
        self.count_violations(model, day, |slot, week| {
            let in_placement = meets_on_day
                && (time.start_slot() as usize..time.end_slot() as usize)
                    .contains(&(slot - day_start))
                && time.share_weeks_with(week);
            in_placement
                || resource.placements(slot).iter().any(|&id| {
                    let other = model.placement(id);
                    other.lecture() != placement.lecture() && other.time().share_weeks_with(week)
                })
        })
    }

    fn count_violations(
        &self,
        model: &TimetableModel,
        day: usize,
        is_busy: impl Fn(usize, &WeekCode) -> bool,
    ) -> u32 {
        let day_start = day * SLOTS_PER_DAY as usize;
        let start = self.start_slot.max(0) as usize;
        let end = self.end_slot.clamp(0, SLOTS_PER_DAY) as usize;
        let mut violations = 0;
        for week in model.weeks() {
            let mut longest = 0;
            let mut current = 0;
            for slot in start..end {
                if is_busy(day_start + slot, week) {
                    current = 0;
                } else {
                    current += 1;
                    longest = longest.max(current);
                }
            }
            if longest < self.length {
                violations += 1;
            }
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_default_break_is_half_an_hour_between_eleven_and_half_past_one() {
        let lunch = LunchBreak::default();

        assert_eq!((lunch.start_slot, lunch.end_slot, lunch.length), (132, 162, 6));
        assert_eq!(lunch.multiplier, 1.2);
    }

    #[test]
    fn only_classes_around_noon_touch_the_break() {
        let lunch = LunchBreak::default();

        assert!(lunch.touches(&TimeLocation::new(64, 120, 18)));
        assert!(lunch.touches(&TimeLocation::new(64, 162, 12)));
        assert!(!lunch.touches(&TimeLocation::new(64, 96, 36)));
        assert!(!lunch.touches(&TimeLocation::new(64, 174, 12)));
    }

    #[test]
    fn the_penalty_grows_faster_than_the_violations() {
        let lunch = LunchBreak::default();
        let mut violations = [0; NR_DAYS];
        assert_eq!(lunch.penalty(&violations), 0.0);

        violations[0] = 1;
        violations[2] = 1;
        assert!((lunch.penalty(&violations) - 2f64.powf(1.2)).abs() < 1e-9);
    }
}
