use super::GroupConstraint;
use super::GroupOptions;
use super::PairCheck;
use crate::constraints::jenrl;
use crate::constraints::jenrl::JenrlConstraint;
use crate::engine::AssignmentValues;
use crate::model::Placement;
use crate::model::TimeLocation;
use crate::model::TimetableModel;
use crate::model::DAY_CODES;
use crate::model::NR_DAYS;
use crate::model::SLOTS_PER_DAY;
use crate::model::SLOT_LENGTH_MIN;

/// The days of one time are a subset of the days of the other.
pub(super) fn same_days(first: &TimeLocation, second: &TimeLocation) -> bool {
    let common = first.day_code() & second.day_code();
    common == first.day_code() || common == second.day_code()
}

/// The shorter of the two times lies within the longer one.
pub(super) fn same_hours(first: &TimeLocation, second: &TimeLocation) -> bool {
    let (short, long) = if first.length() > second.length() {
        (second, first)
    } else {
        (first, second)
    };
    short.start_slot() >= long.start_slot() && short.end_slot() <= long.end_slot()
}

pub(super) fn same_room_and_overlaps(first: &Placement, second: &Placement) -> bool {
    first.share_rooms(second) && first.time().has_intersection(second.time())
}

/// The first and the last day of the day code, counted from the first work day; `-1` when there
/// is none.
fn day_range(day_code: u32, first_work_day: usize) -> (i32, i32) {
    let mut range = (-1, -1);
    for i in 0..NR_DAYS {
        if day_code & DAY_CODES[(i + first_work_day) % NR_DAYS] != 0 {
            if range.0 < 0 {
                range.0 = i as i32;
            }
            range.1 = i as i32;
        }
    }
    range
}

/// The first and the last date of the week code, as signed numbers; `-1` when there is none.
fn week_range(time: &TimeLocation) -> (i64, i64) {
    let code = time.week_code();
    (
        code.first().map_or(-1, |date| date as i64),
        code.last().map_or(-1, |date| date as i64),
    )
}

fn is_back_to_back_weeks(first: &TimeLocation, second: &TimeLocation) -> bool {
    if first.share_weeks(second) {
        return false;
    }
    let (f1, e1) = week_range(first);
    let (f2, e2) = week_range(second);
    if e1 < f2 {
        f2 - e1 < 7
    } else if e2 < f1 {
        f1 - e2 < 7
    } else {
        false
    }
}

fn is_max_week_span(first: &TimeLocation, second: &TimeLocation, nr_weeks: usize) -> bool {
    if first.share_weeks(second) {
        return false;
    }
    if is_back_to_back_weeks(first, second) {
        return true;
    }
    let (f1, e1) = week_range(first);
    let (f2, e2) = week_range(second);
    if e1 < f2 {
        (3 + e2 - f1) / 7 <= nr_weeks as i64
    } else if e2 < f1 {
        (3 + e1 - f2) / 7 <= nr_weeks as i64
    } else {
        false
    }
}

fn is_not_back_to_back_weeks(first: &TimeLocation, second: &TimeLocation) -> bool {
    if first.share_weeks(second) {
        return false;
    }
    let (f1, e1) = week_range(first);
    let (f2, e2) = week_range(second);
    if e1 < f2 {
        f2 - e1 >= 7
    } else if e2 < f1 {
        f1 - e2 >= 7
    } else {
        false
    }
}

fn is_online(options: &GroupOptions, placement: &Placement) -> bool {
    if placement.rooms().is_empty() {
        return options.online_room.is_match("");
    }
    placement
        .rooms()
        .iter()
        .all(|room| options.online_room.is_match(room.name()))
}

impl GroupOptions {
    fn is_back_to_back_days(&self, first: &TimeLocation, second: &TimeLocation) -> bool {
        let (f1, e1) = day_range(first.day_code(), self.first_work_day);
        let (f2, e2) = day_range(second.day_code(), self.first_work_day);
        e1 + 1 == f2 || e2 + 1 == f1
    }

    fn is_nr_days_between_greater_than_one(
        &self,
        first: &TimeLocation,
        second: &TimeLocation,
    ) -> bool {
        let (f1, e1) = day_range(first.day_code(), self.first_work_day);
        let (f2, e2) = day_range(second.day_code(), self.first_work_day);
        e1 - f2 > 2 || e2 - f1 > 2
    }

    /// The first day of `second` comes `gap` work days after the last day of `first`.
    fn is_days_after(&self, first: &TimeLocation, second: &TimeLocation, gap: i32) -> bool {
        let (_, e1) = day_range(first.day_code(), self.first_work_day);
        let (f2, _) = day_range(second.day_code(), self.first_work_day);
        (e1 + gap) % self.nr_work_days as i32 == f2
    }

    /// `second` meets on a day directly following a meeting of `first`.
    pub(super) fn is_next_day(&self, first: &TimeLocation, second: &TimeLocation) -> bool {
        let offset = self.day_of_week_offset;
        if self.precedence_consider_date_patterns {
            return first
                .dates(offset)
                .any(|date| second.has_date(date + 1, offset));
        }
        (0..NR_DAYS).any(|i| {
            let day = (i + self.first_work_day) % NR_DAYS;
            first.day_code() & DAY_CODES[day] != 0
                && second.day_code() & DAY_CODES[(day + 1) % NR_DAYS] != 0
        })
    }

    fn is_different_dates(&self, first: &TimeLocation, second: &TimeLocation) -> bool {
        if !first.share_days(second) || !first.share_weeks(second) {
            return true;
        }
        let offset = self.day_of_week_offset;
        !first.dates(offset).any(|date| second.has_date(date, offset))
    }

    fn is_same_dates(&self, first: &TimeLocation, second: &TimeLocation) -> bool {
        if !first.share_days(second) || !first.share_weeks(second) {
            return false;
        }
        let offset = self.day_of_week_offset;
        let (less, more) = if first.count_dates(offset) > second.count_dates(offset) {
            (second, first)
        } else {
            (first, second)
        };
        less.dates(offset).all(|date| more.has_date(date, offset))
    }

    fn next_date(&self, time: &TimeLocation, after: Option<usize>) -> Option<usize> {
        time.dates(self.day_of_week_offset)
            .find(|&date| after.is_none_or(|after| date > after))
    }
}

impl GroupConstraint {
    /// The pair of times ordered as the lectures are listed in the constraint, or in the reverse
    /// order if `first_goes_first` is not set.
    fn ordered<'a>(
        &self,
        first: &'a Placement,
        second: &'a Placement,
        first_goes_first: bool,
    ) -> (&'a TimeLocation, &'a TimeLocation) {
        let in_order = self.position_of(first) < self.position_of(second);
        if in_order == first_goes_first {
            (first.time(), second.time())
        } else {
            (second.time(), first.time())
        }
    }

    fn position_of(&self, placement: &Placement) -> Option<usize> {
        self.lectures
            .iter()
            .position(|&lecture| lecture == placement.lecture())
    }

    /// The times ordered as in the constraint, and whether the two lectures directly follow each
    /// other in that order.
    fn ordered_following<'a>(
        &self,
        first: &'a Placement,
        second: &'a Placement,
    ) -> (&'a TimeLocation, &'a TimeLocation, bool) {
        let p1 = self.position_of(first);
        let p2 = self.position_of(second);
        if p1 < p2 {
            let following = matches!((p1, p2), (Some(a), Some(b)) if a + 1 == b);
            (first.time(), second.time(), following)
        } else {
            let following = matches!((p1, p2), (Some(a), Some(b)) if b + 1 == a);
            (second.time(), first.time(), following)
        }
    }

    fn is_precedence(
        &self,
        options: &GroupOptions,
        first: &Placement,
        second: &Placement,
        first_goes_first: bool,
        consider_date_patterns: bool,
    ) -> bool {
        let (t1, t2) = self.ordered(first, second, first_goes_first);
        let offset = options.day_of_week_offset;
        if consider_date_patterns && options.precedence_consider_date_patterns {
            let same_date_pattern = match t1.date_pattern_id() {
                Some(id) => Some(id) == t2.date_pattern_id(),
                None => t1.week_code() == t2.week_code(),
            };
            if options.precedence_skip_same_date_pattern_check || !same_date_pattern {
                let m1 = t1.first_meeting(offset);
                let m2 = t2.first_meeting(offset);
                if m1 != m2 {
                    return m1 < m2;
                }
            }
        }
        if options.first_work_day != 0 {
            for i in 0..NR_DAYS {
                let code = DAY_CODES[(i + options.first_work_day) % NR_DAYS];
                let a = t1.day_code() & code != 0;
                let b = t2.day_code() & code != 0;
                match (a, b) {
                    (false, true) => return false,
                    (true, false) => return true,
                    (true, true) => return t1.end_slot() <= t2.start_slot(),
                    (false, false) => {}
                }
            }
        }
        match (t1.start_slots().next(), t2.start_slots().next()) {
            (Some(s1), Some(s2)) => s1 as i32 + t1.length() <= s2 as i32,
            _ => false,
        }
    }

    fn is_following_day(
        &self,
        options: &GroupOptions,
        first: &Placement,
        second: &Placement,
        first_goes_first: bool,
        gap: i32,
    ) -> bool {
        let (t1, t2) = self.ordered(first, second, first_goes_first);
        options.is_days_after(t1, t2, gap)
    }

    fn is_following_weeks(&self, first: &Placement, second: &Placement, btb: bool) -> bool {
        let (t1, t2, following) = self.ordered_following(first, second);
        if t1.share_weeks(t2) {
            return false;
        }
        let (_, e1) = week_range(t1);
        let (s2, _) = week_range(t2);
        if e1 >= s2 {
            return false;
        }
        if !btb {
            s2 - e1 >= 7
        } else if following {
            s2 - e1 < 7
        } else {
            true
        }
    }

    fn is_following_dates(
        &self,
        options: &GroupOptions,
        first: &Placement,
        second: &Placement,
        btb: bool,
    ) -> bool {
        let (t1, t2, following) = self.ordered_following(first, second);
        let mut d1 = options.next_date(t1, None);
        let mut d2 = options.next_date(t2, None);
        while let Some(date1) = d1 {
            let Some(date2) = d2 else {
                return false;
            };
            let d1_next = options.next_date(t1, Some(date1));
            let d2_next = options.next_date(t2, Some(date2));
            if date1 >= date2 {
                return false;
            }
            if d1_next.is_some_and(|next| date2 >= next) {
                return false;
            }
            if !btb && date1 + 1 == date2 {
                return false;
            }
            if btb && following && date1 + 1 != date2 {
                return false;
            }
            d1 = d1_next;
            d2 = d2_next;
        }
        d2.is_none()
    }

    /// Children of non-overlapping parents cannot overlap, and lectures of the same subpart
    /// cannot overlap when their parents in the constraint do not.
    fn is_children_not_overlap(
        &self,
        model: &TimetableModel,
        values: Option<&AssignmentValues>,
        first: &Placement,
        second: &Placement,
    ) -> bool {
        let Some(values) = values else {
            return true;
        };
        let l1 = model.lecture(first.lecture());
        let l2 = model.lecture(second.lecture());
        if l1.subpart_id() != l2.subpart_id() {
            return true;
        }
        let overlap = first.time().has_intersection(second.time());

        if overlap {
            if let (Some(parent1), Some(parent2)) = (l1.parent(), l2.parent()) {
                if self.lectures.contains(&parent1) && self.lectures.contains(&parent2) {
                    let p1 = values.placement(model, parent1);
                    let p2 = values.placement(model, parent2);
                    if let (Some(p1), Some(p2)) = (p1, p2) {
                        if !p1.time().has_intersection(p2.time()) {
                            return false;
                        }
                    }
                }
            }
            return true;
        }

        for (subpart, children1) in l1.children() {
            let Some(children2) = l2.children().get(subpart) else {
                continue;
            };
            for &c1 in children1 {
                let Some(p1) = values.placement(model, c1) else {
                    continue;
                };
                for &c2 in children2 {
                    let Some(p2) = values.placement(model, c2) else {
                        continue;
                    };
                    if model.lecture(c1).subpart_id() != model.lecture(c2).subpart_id() {
                        continue;
                    }
                    if p1.time().has_intersection(p2.time()) {
                        return false;
                    }
                }
            }
        }
        true
    }

    fn is_same_instructor(model: &TimetableModel, first: &Placement, second: &Placement) -> bool {
        let (t1, t2) = (first.time(), second.time());
        if !t1.share_days(t2) || !t1.share_weeks(t2) {
            return true;
        }
        if t1.share_hours(t2) {
            return false;
        }
        let metric = model.distance_metric();
        if t1.end_slot() == t2.start_slot() || t2.end_slot() == t1.start_slot() {
            if first.distance_in_meters(metric, second) > metric.instructor_prohibited_limit() {
                return false;
            }
        } else if metric.compute_distance_conflicts_between_non_btb_classes() {
            let minutes = first.distance_in_minutes(metric, second);
            if t1.end_slot() < t2.start_slot()
                && minutes > t1.break_time() + SLOT_LENGTH_MIN * (t2.start_slot() - t1.end_slot())
            {
                return false;
            }
            if t2.end_slot() < t1.start_slot()
                && minutes > t2.break_time() + SLOT_LENGTH_MIN * (t1.start_slot() - t2.end_slot())
            {
                return false;
            }
        }
        true
    }

    fn is_day_break(
        &self,
        model: &TimetableModel,
        options: &GroupOptions,
        first: &Placement,
        second: &Placement,
    ) -> bool {
        let (min, max) = (self.kind.min(), self.kind.max());
        let (t1, t2) = (first.time(), second.time());
        let metric = model.distance_metric();
        if SLOTS_PER_DAY + t2.start_slot() - t1.end_slot() < min {
            if options.is_next_day(t1, t2) {
                return max >= 0 && first.distance_in_minutes(metric, second) <= max;
            }
        } else if SLOTS_PER_DAY + t1.start_slot() - t2.end_slot() < min
            && options.is_next_day(t2, t1)
        {
            return max >= 0 && second.distance_in_minutes(metric, first) <= max;
        }
        true
    }

    /// Whether the pair fulfils the type when the constraint is required or preferred.
    pub(super) fn check_satisfied(
        &self,
        model: &TimetableModel,
        values: Option<&AssignmentValues>,
        first: &Placement,
        second: &Placement,
    ) -> bool {
        let options = model.group_options();
        let (t1, t2) = (first.time(), second.time());
        match self.kind.check() {
            PairCheck::None => true,
            PairCheck::SameTime => same_hours(t1, t2),
            PairCheck::SameDays => same_days(t1, t2),
            PairCheck::BackToBack => first.same_rooms(second) && same_days(t1, t2),
            PairCheck::BackToBackTime => same_days(t1, t2),
            PairCheck::DifferentTime => !t1.has_intersection(t2),
            PairCheck::SameStart => t1.start_slot() == t2.start_slot(),
            PairCheck::SameRoom => first.same_rooms(second),
            PairCheck::SameStudents => !JenrlConstraint::is_in_conflict(model, first, second),
            PairCheck::SameInstructor => Self::is_same_instructor(model, first, second),
            PairCheck::Precedence => self.is_precedence(options, first, second, true, true),
            PairCheck::BackToBackDay => !same_days(t1, t2) && options.is_back_to_back_days(t1, t2),
            PairCheck::MeetWith => {
                first.same_rooms(second) && same_hours(t1, t2) && same_days(t1, t2)
            }
            PairCheck::MoreThanOneDayBetween => {
                !same_days(t1, t2) && options.is_nr_days_between_greater_than_one(t1, t2)
            }
            PairCheck::ChildrenNotOverlap => {
                self.is_children_not_overlap(model, values, first, second)
            }
            PairCheck::FollowingDay => self.is_following_day(options, first, second, true, 1),
            PairCheck::EveryOtherDay => self.is_following_day(options, first, second, true, 2),
            PairCheck::SameWeeks => t1.week_code() == t2.week_code(),
            PairCheck::BackToBackPrecedence => {
                self.is_precedence(options, first, second, true, false) && same_days(t1, t2)
            }
            PairCheck::SameDaysTime => same_hours(t1, t2) && same_days(t1, t2),
            PairCheck::SameDaysRoomTime => {
                same_hours(t1, t2) && same_days(t1, t2) && first.same_rooms(second)
            }
            PairCheck::WorkDay => {
                !t1.share_days(t2)
                    || !t1.share_weeks(t2)
                    || t1.end_slot().max(t2.end_slot()) - t1.start_slot().min(t2.start_slot())
                        <= self.kind.max()
            }
            PairCheck::MeetWithWeeks => {
                first.same_rooms(second)
                    && same_hours(t1, t2)
                    && same_days(t1, t2)
                    && t1.week_code() == t2.week_code()
            }
            PairCheck::MinGap => {
                let gap = self.kind.min();
                !t1.share_days(t2)
                    || !t1.share_weeks(t2)
                    || t1.end_slot() + gap <= t2.start_slot()
                    || t2.end_slot() + gap <= t1.start_slot()
            }
            PairCheck::BackToBackWeeks => {
                if self.lectures.len() <= 2 {
                    is_back_to_back_weeks(t1, t2)
                } else {
                    let total_weeks = self
                        .lectures
                        .iter()
                        .map(|&lecture| model.lecture(lecture).min_weeks())
                        .sum();
                    is_max_week_span(t1, t2, total_weeks)
                }
            }
            PairCheck::FollowingWeeks => self.is_following_weeks(first, second, true),
            PairCheck::SameDates => options.is_same_dates(t1, t2),
            PairCheck::SameDaysRoomStart => {
                t1.start_slot() == t2.start_slot() && same_days(t1, t2) && first.same_rooms(second)
            }
            PairCheck::DayBreak => self.is_day_break(model, options, first, second),
            PairCheck::OnlineRoom => {
                !t1.share_days(t2)
                    || !t1.share_weeks(t2)
                    || is_online(options, first) == is_online(options, second)
            }
            PairCheck::SameDaysTimeWeeks => {
                same_hours(t1, t2) && same_days(t1, t2) && t1.week_code() == t2.week_code()
            }
            PairCheck::SameStudentsNoDistance => {
                model
                    .lecture(first.lecture())
                    .is_to_ignore_student_conflicts_with(second.lecture())
                    || !jenrl::overlaps(model, first, second)
            }
            PairCheck::FollowingDates => self.is_following_dates(options, first, second, true),
        }
    }

    /// Whether the pair fulfils the type when the constraint is prohibited or discouraged.
    pub(super) fn check_violated(&self, model: &TimetableModel, first: &Placement, second: &Placement) -> bool {
        let options = model.group_options();
        let (t1, t2) = (first.time(), second.time());
        match self.kind.check() {
            PairCheck::SameTime => !t1.share_hours(t2),
            PairCheck::SameDays => !t1.share_days(t2),
            PairCheck::BackToBack => first.same_rooms(second) && same_days(t1, t2),
            PairCheck::BackToBackTime => same_days(t1, t2),
            PairCheck::DifferentTime => t1.has_intersection(t2),
            PairCheck::SameStart => t1.start_slot() != t2.start_slot(),
            PairCheck::SameRoom => !first.same_rooms(second),
            PairCheck::Precedence => self.is_precedence(options, first, second, false, true),
            PairCheck::BackToBackDay => {
                !same_days(t1, t2) && !options.is_back_to_back_days(t1, t2)
            }
            PairCheck::MoreThanOneDayBetween => {
                !same_days(t1, t2) && !options.is_nr_days_between_greater_than_one(t1, t2)
            }
            PairCheck::FollowingDay => self.is_following_day(options, first, second, false, 1),
            PairCheck::EveryOtherDay => self.is_following_day(options, first, second, false, 2),
            PairCheck::SameWeeks => !t1.share_weeks(t2),
            PairCheck::BackToBackPrecedence => {
                self.is_precedence(options, first, second, false, false) && same_days(t1, t2)
            }
            PairCheck::SameDaysTime => !t1.share_hours(t2) || !t1.share_days(t2),
            PairCheck::SameDaysRoomTime | PairCheck::SameDaysRoomStart => {
                !t1.share_hours(t2) || !t1.share_days(t2) || !first.same_rooms(second)
            }
            PairCheck::BackToBackWeeks => is_not_back_to_back_weeks(t1, t2),
            PairCheck::FollowingWeeks => self.is_following_weeks(first, second, false),
            PairCheck::SameDates => options.is_different_dates(t1, t2),
            PairCheck::SameDaysTimeWeeks => {
                !t1.share_hours(t2) || !t1.share_days(t2) || !t1.share_weeks(t2)
            }
            PairCheck::FollowingDates => self.is_following_dates(options, first, second, false),
            PairCheck::None
            | PairCheck::SameStudents
            | PairCheck::SameInstructor
            | PairCheck::MeetWith
            | PairCheck::ChildrenNotOverlap
            | PairCheck::WorkDay
            | PairCheck::MeetWithWeeks
            | PairCheck::MinGap
            | PairCheck::DayBreak
            | PairCheck::OnlineRoom
            | PairCheck::SameStudentsNoDistance => true,
        }
    }

    /// Whether the two placements agree with the constraint: checked with
    /// [`Self::check_satisfied`] for required and preferred constraints, and with
    /// [`Self::check_violated`] for prohibited and discouraged ones.
    pub fn is_satisfied_pair(
        &self,
        model: &TimetableModel,
        values: Option<&AssignmentValues>,
        first: &Placement,
        second: &Placement,
    ) -> bool {
        if self.required || (!self.prohibited && self.preference <= 0) {
            self.check_satisfied(model, values, first, second)
        } else {
            self.check_violated(model, first, second)
        }
    }
}
