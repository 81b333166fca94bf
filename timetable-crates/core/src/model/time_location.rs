use std::fmt::Display;
use std::fmt::Formatter;

use fixedbitset::FixedBitSet;

/// Number of slots in a day; a slot is [`SLOT_LENGTH_MIN`] minutes long.
pub const SLOTS_PER_DAY: i32 = 288;
pub const SLOT_LENGTH_MIN: i32 = 5;
/// The time of the first slot of a day, in minutes after midnight.
pub const FIRST_SLOT_TIME_MIN: i32 = 0;
pub const NR_DAYS: usize = 7;
/// Number of working days in a week.
pub const NR_DAYS_WEEK: usize = 5;
/// Day codes, Monday first.
pub const DAY_CODES: [u32; NR_DAYS] = [64, 32, 16, 8, 4, 2, 1];
pub const DAY_CODE_ALL: u32 = 127;
pub const DAY_CODE_WEEK: u32 = 124;
pub const DAY_NAMES_SHORT: [&str; NR_DAYS] = ["M", "T", "W", "Th", "F", "S", "Su"];

/// Converts a number of hours into the closest number of slots.
pub fn hours_to_slots(hours: f64) -> i32 {
    (12.0 * hours).round() as i32
}

/// The dates of the term at which a time location meets, one bit per day of the term.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct WeekCode(FixedBitSet);

impl WeekCode {
    /// A week code covering every day of a year.
    pub fn full_year() -> WeekCode {
        let mut bits = FixedBitSet::with_capacity(366);
        bits.insert_range(..);
        WeekCode(bits)
    }

    pub fn with_capacity(nr_days: usize) -> WeekCode {
        WeekCode(FixedBitSet::with_capacity(nr_days))
    }

    /// Parses a date pattern of `0`s and `1`s, one character per day.
    pub fn from_pattern(pattern: &str) -> WeekCode {
        let mut bits = FixedBitSet::with_capacity(pattern.len());
        pattern
            .chars()
            .enumerate()
            .filter(|(_, c)| *c == '1')
            .for_each(|(index, _)| bits.insert(index));
        WeekCode(bits)
    }

    pub fn from_dates(dates: impl IntoIterator<Item = usize>) -> WeekCode {
        let mut bits = FixedBitSet::default();
        for date in dates {
            if date >= bits.len() {
                bits.grow(date + 1);
            }
            bits.insert(date);
        }
        WeekCode(bits)
    }

    pub fn get(&self, date: usize) -> bool {
        self.0.contains(date)
    }

    pub fn insert(&mut self, date: usize) {
        if date >= self.0.len() {
            self.0.grow(date + 1);
        }
        self.0.insert(date);
    }

    pub fn intersects(&self, other: &WeekCode) -> bool {
        !self.0.is_disjoint(&other.0)
    }

    pub fn dates(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.ones()
    }

    pub fn first(&self) -> Option<usize> {
        self.0.ones().next()
    }

    pub fn last(&self) -> Option<usize> {
        self.0.ones().last()
    }

    pub fn cardinality(&self) -> usize {
        self.0.count_ones(..)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_clear()
    }

    /// The number of days the code can hold.
    pub fn capacity(&self) -> usize {
        self.0.len()
    }

    pub fn union_with(&mut self, other: &WeekCode) {
        if other.0.len() > self.0.len() {
            self.0.grow(other.0.len());
        }
        self.0.union_with(&other.0);
    }

    /// The number of dates set in `start..end`.
    pub fn count_in(&self, start: usize, end: usize) -> usize {
        let end = end.min(self.0.len());
        if start >= end {
            0
        } else {
            self.0.count_ones(start..end)
        }
    }
}

/// A time at which a lecture can take place: a start slot and a length repeated on every day of
/// the day code, in every date of the week code.
#[derive(Clone, Debug)]
pub struct TimeLocation {
    day_code: u32,
    start_slot: i32,
    length: i32,
    break_time: i32,
    preference: i32,
    normalized_preference: f64,
    nr_meetings: usize,
    week_code: WeekCode,
    time_pattern_id: Option<u64>,
    date_pattern_id: Option<u64>,
    date_pattern_name: String,
    date_pattern_preference: i32,
}

impl TimeLocation {
    /// Creates a time meeting every day of `day_code` at `start_slot` for `length` slots, every
    /// day of the year.
    pub fn new(day_code: u32, start_slot: i32, length: i32) -> TimeLocation {
        TimeLocation {
            day_code,
            start_slot,
            length,
            break_time: 0,
            preference: 0,
            normalized_preference: 0.0,
            nr_meetings: DAY_CODES
                .iter()
                .filter(|&&code| day_code & code != 0)
                .count(),
            week_code: WeekCode::full_year(),
            time_pattern_id: None,
            date_pattern_id: None,
            date_pattern_name: "not set".to_owned(),
            date_pattern_preference: 0,
        }
    }

    pub fn with_preference(mut self, preference: i32, normalized_preference: f64) -> Self {
        self.preference = preference;
        self.normalized_preference = normalized_preference;
        self
    }

    pub fn with_break_time(mut self, break_time: i32) -> Self {
        self.break_time = break_time;
        self
    }

    pub fn with_time_pattern(mut self, time_pattern_id: u64) -> Self {
        self.time_pattern_id = Some(time_pattern_id);
        self
    }

    pub fn with_date_pattern(
        mut self,
        date_pattern_id: Option<u64>,
        name: impl Into<String>,
        week_code: WeekCode,
        preference: i32,
    ) -> Self {
        self.date_pattern_id = date_pattern_id;
        self.date_pattern_name = name.into();
        self.week_code = week_code;
        self.date_pattern_preference = preference;
        self
    }

    pub fn day_code(&self) -> u32 {
        self.day_code
    }

    pub fn start_slot(&self) -> i32 {
        self.start_slot
    }

    pub fn length(&self) -> i32 {
        self.length
    }

    /// The first slot after the end of a meeting.
    pub fn end_slot(&self) -> i32 {
        self.start_slot + self.length
    }

    pub fn break_time(&self) -> i32 {
        self.break_time
    }

    pub fn preference(&self) -> i32 {
        self.preference
    }

    pub fn normalized_preference(&self) -> f64 {
        self.normalized_preference
    }

    pub fn nr_meetings(&self) -> usize {
        self.nr_meetings
    }

    pub fn week_code(&self) -> &WeekCode {
        &self.week_code
    }

    pub fn time_pattern_id(&self) -> Option<u64> {
        self.time_pattern_id
    }

    pub fn date_pattern_id(&self) -> Option<u64> {
        self.date_pattern_id
    }

    pub fn date_pattern_name(&self) -> &str {
        &self.date_pattern_name
    }

    pub fn date_pattern_preference(&self) -> i32 {
        self.date_pattern_preference
    }

    pub fn share_days(&self, other: &TimeLocation) -> bool {
        self.day_code & other.day_code != 0
    }

    pub fn nr_shared_days(&self, other: &TimeLocation) -> usize {
        (self.day_code & other.day_code).count_ones() as usize
    }

    pub fn share_hours(&self, other: &TimeLocation) -> bool {
        self.end_slot() > other.start_slot && other.end_slot() > self.start_slot
    }

    pub fn nr_shared_hours(&self, other: &TimeLocation) -> i32 {
        let end = self.end_slot().min(other.end_slot());
        let start = self.start_slot.max(other.start_slot);
        (end - start).max(0)
    }

    pub fn share_weeks(&self, other: &TimeLocation) -> bool {
        self.week_code.intersects(&other.week_code)
    }

    pub fn share_weeks_with(&self, week_code: &WeekCode) -> bool {
        self.week_code.intersects(week_code)
    }

    pub fn has_intersection(&self, other: &TimeLocation) -> bool {
        self.share_days(other) && self.share_hours(other) && self.share_weeks(other)
    }

    pub fn has_day(&self, date: usize) -> bool {
        self.week_code.get(date)
    }

    /// The indices (Monday = 0) of the days of the week of the day code.
    pub fn days(&self) -> impl Iterator<Item = usize> + '_ {
        (0..NR_DAYS).filter(|&day| self.day_code & DAY_CODES[day] != 0)
    }

    /// The slot of the week at which each meeting starts.
    pub fn start_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.days()
            .map(|day| (day as i32 * SLOTS_PER_DAY + self.start_slot) as usize)
    }

    /// Every slot of the week the time occupies.
    pub fn slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.start_slots()
            .flat_map(|start| (0..self.length as usize).map(move |offset| start + offset))
    }

    /// Whether `date` is set in the week code and falls on a day of the day code.
    fn meets_on(&self, date: usize, day_of_week_offset: usize) -> bool {
        self.day_code & DAY_CODES[(date + day_of_week_offset) % NR_DAYS] != 0
    }

    /// The dates on which the time actually meets.
    pub fn dates(&self, day_of_week_offset: usize) -> impl Iterator<Item = usize> + '_ {
        self.week_code
            .dates()
            .filter(move |&date| self.meets_on(date, day_of_week_offset))
    }

    pub fn first_meeting(&self, day_of_week_offset: usize) -> Option<usize> {
        self.dates(day_of_week_offset).next()
    }

    pub fn last_meeting(&self, day_of_week_offset: usize) -> Option<usize> {
        self.dates(day_of_week_offset).last()
    }

    pub fn count_dates(&self, day_of_week_offset: usize) -> usize {
        self.dates(day_of_week_offset).count()
    }

    pub fn has_date(&self, date: usize, day_of_week_offset: usize) -> bool {
        self.week_code.get(date) && self.meets_on(date, day_of_week_offset)
    }

    /// Whether the time meets on the given day of the week of the given week; without a week only
    /// the day code is checked.
    pub fn has_date_in_week(
        &self,
        day_of_week: usize,
        week: Option<&WeekCode>,
        day_of_week_offset: usize,
    ) -> bool {
        if self.day_code & DAY_CODES[day_of_week] == 0 {
            return false;
        }
        let Some(week) = week else {
            return true;
        };
        let Some(first_date) = week.first() else {
            return false;
        };
        let dow = (first_date + day_of_week_offset) % NR_DAYS;
        let date = first_date + (NR_DAYS - dow + day_of_week) % NR_DAYS;
        week.get(date) && self.week_code.get(date)
    }

    /// Whether the time meets on a date of `week_code` that falls on a day of `day_code`.
    pub fn overlaps(
        &self,
        day_code: u32,
        week_code: Option<&WeekCode>,
        day_of_week_offset: usize,
    ) -> bool {
        if self.day_code & day_code == 0 {
            return false;
        }
        let Some(week_code) = week_code else {
            return true;
        };
        week_code.dates().any(|date| {
            let code = DAY_CODES[(date + day_of_week_offset) % NR_DAYS];
            day_code & code != 0 && self.day_code & code != 0 && self.week_code.get(date)
        })
    }

    /// Number of weeks of the date pattern, computed from the number of dates it spans.
    pub fn nr_weeks(&self) -> usize {
        self.nr_weeks_between(0, self.week_code.capacity())
    }

    pub fn nr_weeks_between(&self, start_day: usize, end_day: usize) -> usize {
        match self.week_code.count_in(start_day, end_day) {
            0 => 0,
            1..=7 => 1,
            cardinality => (5 + cardinality) / 6,
        }
    }

    /// The number of weeks between the first and the last date of the week code.
    pub fn week_span(&self) -> usize {
        match (self.week_code.first(), self.week_code.last()) {
            (Some(first), Some(last)) => 1 + (last - first) / NR_DAYS,
            _ => 0,
        }
    }

    pub fn day_header(&self) -> String {
        self.days().map(|day| DAY_NAMES_SHORT[day]).collect()
    }

    pub fn start_time_header(&self) -> String {
        time_header(self.start_slot * SLOT_LENGTH_MIN + FIRST_SLOT_TIME_MIN)
    }

    pub fn end_time_header(&self) -> String {
        time_header(self.end_slot() * SLOT_LENGTH_MIN + FIRST_SLOT_TIME_MIN - self.break_time)
    }

    /// Two times are the same when they share start, length, days and both patterns.
    pub fn same_time(&self, other: &TimeLocation) -> bool {
        self.start_slot == other.start_slot
            && self.length == other.length
            && self.day_code == other.day_code
            && self.time_pattern_id == other.time_pattern_id
            && self.date_pattern_id == other.date_pattern_id
    }
}

fn time_header(minutes: i32) -> String {
    format!("{}:{:02}", minutes / 60, minutes % 60)
}

impl Display for TimeLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.day_header(), self.start_time_header())
    }
}
