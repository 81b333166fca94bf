use std::fmt::Display;

use enumset::enum_set;
use enumset::EnumSet;
use enumset::EnumSetType;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::basic_types::ReferenceError;
use crate::model::hours_to_slots;
use crate::model::SLOTS_PER_DAY;

/// Properties of a group constraint type which change how the constraint is evaluated.
#[derive(Debug, EnumSetType)]
pub enum GroupFlag {
    /// The lectures are checked as a sequence within a day, using the minimal and maximal gap of
    /// the type.
    BackToBack,
    /// The lectures may be placed in the same room at the same time.
    CanShareRoom,
    /// The lectures may use at most the maximal number of slots of the type in a day.
    MaxHoursADay,
    /// Student conflicts between the lectures are ignored.
    IgnoreStudents,
}

/// The pairwise check a group constraint type applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PairCheck {
    SameTime,
    SameDays,
    BackToBack,
    BackToBackTime,
    DifferentTime,
    SameStart,
    SameRoom,
    SameStudents,
    SameInstructor,
    /// No pairwise check at all.
    None,
    Precedence,
    BackToBackDay,
    MeetWith,
    MoreThanOneDayBetween,
    ChildrenNotOverlap,
    FollowingDay,
    EveryOtherDay,
    SameWeeks,
    BackToBackPrecedence,
    SameDaysTime,
    SameDaysRoomTime,
    WorkDay,
    MeetWithWeeks,
    MinGap,
    BackToBackWeeks,
    FollowingWeeks,
    SameDates,
    SameDaysRoomStart,
    DayBreak,
    OnlineRoom,
    SameDaysTimeWeeks,
    SameStudentsNoDistance,
    FollowingDates,
}

/// A group constraint type: what is checked, together with its parameters.
///
/// For back-to-back types `min` and `max` are the minimal and maximal gap between two
/// consecutive lectures in slots, for `MAX_HRS_DAY` and `WORKDAY` types `max` is the number of
/// slots, and for `DAYBREAK` `min` is the break in slots and `max` the travel time in minutes which
/// triggers the check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupConstraintType {
    reference: String,
    name: String,
    check: PairCheck,
    min: i32,
    max: i32,
    flags: EnumSet<GroupFlag>,
}

struct TypeDefinition {
    reference: &'static str,
    name: &'static str,
    check: PairCheck,
    min: i32,
    max: i32,
    flags: EnumSet<GroupFlag>,
}

const fn def(
    reference: &'static str,
    name: &'static str,
    check: PairCheck,
    min: i32,
    max: i32,
    flags: EnumSet<GroupFlag>,
) -> TypeDefinition {
    TypeDefinition {
        reference,
        name,
        check,
        min,
        max,
        flags,
    }
}

const NO_FLAGS: EnumSet<GroupFlag> = EnumSet::empty();
const BTB: EnumSet<GroupFlag> = enum_set!(GroupFlag::BackToBack);
const SHARE: EnumSet<GroupFlag> = enum_set!(GroupFlag::CanShareRoom);
const MAX_HRS: EnumSet<GroupFlag> = enum_set!(GroupFlag::MaxHoursADay);
const IGNORE: EnumSet<GroupFlag> = enum_set!(GroupFlag::IgnoreStudents);
const DAY: i32 = SLOTS_PER_DAY;

#[rustfmt::skip]
const DEFINITIONS: &[TypeDefinition] = &[
    def("SAME_TIME", "Same Time", PairCheck::SameTime, 0, 0, NO_FLAGS),
    def("SAME_DAYS", "Same Days", PairCheck::SameDays, 0, 0, NO_FLAGS),
    def("BTB", "Back-To-Back & Same Room", PairCheck::BackToBack, 0, 0, BTB),
    def("BTB_TIME", "Back-To-Back", PairCheck::BackToBackTime, 0, 0, BTB),
    def("DIFF_TIME", "Different Time", PairCheck::DifferentTime, 0, 0, NO_FLAGS),
    def("NHB(1)", "1 Hour Between", PairCheck::BackToBackTime, 10, 12, BTB),
    def("NHB(2)", "2 Hours Between", PairCheck::BackToBackTime, 20, 24, BTB),
    def("NHB(3)", "3 Hours Between", PairCheck::BackToBackTime, 30, 36, BTB),
    def("NHB(4)", "4 Hours Between", PairCheck::BackToBackTime, 40, 48, BTB),
    def("NHB(5)", "5 Hours Between", PairCheck::BackToBackTime, 50, 60, BTB),
    def("NHB(6)", "6 Hours Between", PairCheck::BackToBackTime, 60, 72, BTB),
    def("NHB(7)", "7 Hours Between", PairCheck::BackToBackTime, 70, 84, BTB),
    def("NHB(8)", "8 Hours Between", PairCheck::BackToBackTime, 80, 96, BTB),
    def("SAME_START", "Same Start Time", PairCheck::SameStart, 0, 0, NO_FLAGS),
    def("SAME_ROOM", "Same Room", PairCheck::SameRoom, 0, 0, NO_FLAGS),
    def("NHB_GTE(1)", "At Least 1 Hour Between", PairCheck::BackToBackTime, 6, DAY, BTB),
    def("NHB_LT(6)", "Less Than 6 Hours Between", PairCheck::BackToBackTime, 0, 72, BTB),
    def("NHB(1.5)", "1.5 Hour Between", PairCheck::BackToBackTime, 15, 18, BTB),
    def("NHB(4.5)", "4.5 Hours Between", PairCheck::BackToBackTime, 45, 54, BTB),
    def("SAME_STUDENTS", "Same Students", PairCheck::SameStudents, 0, 0, NO_FLAGS),
    def("SAME_INSTR", "Same Instructor", PairCheck::SameInstructor, 0, 0, NO_FLAGS),
    def("CAN_SHARE_ROOM", "Can Share Room", PairCheck::None, 0, 0, SHARE),
    def("PRECEDENCE", "Precedence", PairCheck::Precedence, 0, 0, NO_FLAGS),
    def("BTB_DAY", "Back-To-Back Day", PairCheck::BackToBackDay, 0, 0, NO_FLAGS),
    def("MEET_WITH", "Meet Together", PairCheck::MeetWith, 0, 0, SHARE),
    def("NDB_GT_1", "More Than 1 Day Between", PairCheck::MoreThanOneDayBetween, 0, 0, NO_FLAGS),
    def("CH_NOTOVERLAP", "Children Cannot Overlap", PairCheck::ChildrenNotOverlap, 0, 0, NO_FLAGS),
    def("FOLLOWING_DAY", "Next Day", PairCheck::FollowingDay, 0, 0, NO_FLAGS),
    def("EVERY_OTHER_DAY", "Two Days After", PairCheck::EveryOtherDay, 0, 0, NO_FLAGS),
    def("MAX_HRS_DAY(3)", "At Most 3 Hours A Day", PairCheck::None, 36, 36, MAX_HRS),
    def("MAX_HRS_DAY(4)", "At Most 4 Hours A Day", PairCheck::None, 48, 48, MAX_HRS),
    def("MAX_HRS_DAY(5)", "At Most 5 Hours A Day", PairCheck::None, 60, 60, MAX_HRS),
    def("MAX_HRS_DAY(6)", "At Most 6 Hours A Day", PairCheck::None, 72, 72, MAX_HRS),
    def("MAX_HRS_DAY(7)", "At Most 7 Hours A Day", PairCheck::None, 84, 84, MAX_HRS),
    def("MAX_HRS_DAY(8)", "At Most 8 Hours A Day", PairCheck::None, 96, 96, MAX_HRS),
    def("MAX_HRS_DAY(9)", "At Most 9 Hours A Day", PairCheck::None, 108, 108, MAX_HRS),
    def("MAX_HRS_DAY(10)", "At Most 10 Hours A Day", PairCheck::None, 120, 120, MAX_HRS),
    def("SAME_WEEKS", "Same Weeks", PairCheck::SameWeeks, 0, 0, NO_FLAGS),
    def("LINKED_SECTIONS", "Linked Classes", PairCheck::SameStudents, 0, 0, NO_FLAGS),
    def("BTB_PRECEDENCE", "Back-To-Back Precedence", PairCheck::BackToBackPrecedence, 0, 0, BTB),
    def("SAME_D_T", "Same Days-Time", PairCheck::SameDaysTime, 0, 0, NO_FLAGS),
    def("SAME_D_R_T", "Same Days-Room-Time", PairCheck::SameDaysRoomTime, 0, 0, NO_FLAGS),
    def("WORKDAY(6)", "6 Hour Work Day", PairCheck::WorkDay, 72, 72, NO_FLAGS),
    def("WORKDAY(7)", "7 Hour Work Day", PairCheck::WorkDay, 84, 84, NO_FLAGS),
    def("WORKDAY(8)", "8 Hour Work Day", PairCheck::WorkDay, 96, 96, NO_FLAGS),
    def("WORKDAY(9)", "9 Hour Work Day", PairCheck::WorkDay, 108, 108, NO_FLAGS),
    def("WORKDAY(10)", "10 Hour Work Day", PairCheck::WorkDay, 120, 120, NO_FLAGS),
    def("WORKDAY(11)", "11 Hour Work Day", PairCheck::WorkDay, 132, 132, NO_FLAGS),
    def("WORKDAY(12)", "12 Hour Work Day", PairCheck::WorkDay, 144, 144, NO_FLAGS),
    def("WORKDAY(4)", "4 Hour Work Day", PairCheck::WorkDay, 48, 48, NO_FLAGS),
    def("WORKDAY(5)", "5 Hour Work Day", PairCheck::WorkDay, 60, 60, NO_FLAGS),
    def("MEET_WITH_WEEKS", "Meet Together & Same Weeks", PairCheck::MeetWithWeeks, 0, 0, SHARE),
    def("BTB_WEEKS", "Back-To-Back Weeks", PairCheck::BackToBackWeeks, 0, 0, NO_FLAGS),
    def("FOLLOWING_WEEKS", "Following Weeks", PairCheck::FollowingWeeks, 0, 0, NO_FLAGS),
    def("SAME_DATES", "Same Dates", PairCheck::SameDates, 0, 0, NO_FLAGS),
    def("SAME_DAY_ROOM_START", "Same Days-Room-Start", PairCheck::SameDaysRoomStart, 0, 0, NO_FLAGS),
    def("ONLINE_ROOM", "Online/Offline Room", PairCheck::OnlineRoom, 0, 0, NO_FLAGS),
    def("SAME_DTW", "Same Days-Time-Weeks", PairCheck::SameDaysTimeWeeks, 0, 0, NO_FLAGS),
    def("SAME_STUD_NODST", "Same Students No Distance", PairCheck::SameStudentsNoDistance, 0, 0, NO_FLAGS),
    def("DIFF_TIME_IGN_STUDS", "Different Time + Ignore Student Conflicts", PairCheck::DifferentTime, 0, 0, IGNORE),
    def("FOLLOWING_DATES", "Following Dates", PairCheck::FollowingDates, 0, 0, NO_FLAGS),
];

static MAX_HOURS_A_DAY: Lazy<Regex> = Lazy::new(|| regex(r"MAX_HRS_DAY\(([0-9\.]+)\)"));
static WORK_DAY: Lazy<Regex> = Lazy::new(|| regex(r"WORKDAY\(([0-9\.]+)\)"));
static MIN_GAP: Lazy<Regex> = Lazy::new(|| regex(r"MIN_GAP\(([0-9\.]+)\)"));
static DAY_BREAK: Lazy<Regex> = Lazy::new(|| regex(r"DAYBREAK\(([0-9\.]+),(-?[0-9]+)\)"));

/// Compiles a pattern which has to match the whole reference.
fn regex(pattern: &str) -> Regex {
    match Regex::new(&format!("^{pattern}$")) {
        Ok(regex) => regex,
        Err(error) => unreachable!("the reference grammars are valid regular expressions: {error}"),
    }
}

fn parse_number<T: std::str::FromStr>(reference: &str, parameter: &str) -> Result<T, ReferenceError> {
    parameter
        .parse::<T>()
        .map_err(|_| ReferenceError::InvalidParameter {
            reference: reference.to_owned(),
            parameter: parameter.to_owned(),
        })
}

impl GroupConstraintType {
    /// Parses a reference such as `SAME_TIME`, `NHB(3)` or `MAX_HRS_DAY(5.5)`.
    pub fn parse(reference: &str) -> Result<GroupConstraintType, ReferenceError> {
        let reference = reference.trim();
        if let Some(definition) = DEFINITIONS.iter().find(|def| def.reference == reference) {
            return Ok(GroupConstraintType {
                reference: definition.reference.to_owned(),
                name: definition.name.to_owned(),
                check: definition.check,
                min: definition.min,
                max: definition.max,
                flags: definition.flags,
            });
        }

        let parametrized = |check, min, max, flags, name: String| GroupConstraintType {
            reference: reference.to_owned(),
            name,
            check,
            min,
            max,
            flags,
        };

        if let Some(captures) = MAX_HOURS_A_DAY.captures(reference) {
            let hours = &captures[1];
            let slots = hours_to_slots(parse_number::<f64>(reference, hours)?);
            return Ok(parametrized(
                PairCheck::None,
                slots,
                slots,
                MAX_HRS,
                format!("At Most {hours} Hours A Day"),
            ));
        }
        if let Some(captures) = WORK_DAY.captures(reference) {
            let hours = &captures[1];
            let slots = hours_to_slots(parse_number::<f64>(reference, hours)?);
            return Ok(parametrized(
                PairCheck::WorkDay,
                slots,
                slots,
                NO_FLAGS,
                format!("{hours} Hour Work Day"),
            ));
        }
        if let Some(captures) = MIN_GAP.captures(reference) {
            let hours = &captures[1];
            let slots = hours_to_slots(parse_number::<f64>(reference, hours)?);
            return Ok(parametrized(
                PairCheck::MinGap,
                slots,
                slots,
                NO_FLAGS,
                format!("At Least {hours} Hours Between Classes"),
            ));
        }
        if let Some(captures) = DAY_BREAK.captures(reference) {
            let slots = hours_to_slots(parse_number::<f64>(reference, &captures[1])?);
            let minutes = parse_number::<i32>(reference, &captures[2])?;
            let mut name = format!("Daybreak of {} hours", slots as f64 / 12.0);
            if minutes >= 0 {
                name.push_str(&format!(" when over {minutes} mins"));
            }
            return Ok(parametrized(PairCheck::DayBreak, slots, minutes, NO_FLAGS, name));
        }

        Err(ReferenceError::UnknownGroupConstraint(reference.to_owned()))
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check(&self) -> PairCheck {
        self.check
    }

    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn is(&self, flag: GroupFlag) -> bool {
        self.flags.contains(flag)
    }

    /// The references of every type which does not take a parameter.
    pub fn plain_references() -> impl Iterator<Item = &'static str> {
        DEFINITIONS.iter().map(|definition| definition.reference)
    }
}

impl Display for GroupConstraintType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_plain_reference_parses() {
        for reference in GroupConstraintType::plain_references() {
            let parsed = GroupConstraintType::parse(reference).unwrap();
            assert_eq!(parsed.reference(), reference);
        }
    }

    #[test]
    fn hour_gaps_are_parsed_into_slots() {
        let nhb = GroupConstraintType::parse("NHB(3)").unwrap();
        assert_eq!((nhb.min(), nhb.max()), (30, 36));
        assert!(nhb.is(GroupFlag::BackToBack));

        let gte = GroupConstraintType::parse("NHB_GTE(1)").unwrap();
        assert_eq!((gte.min(), gte.max()), (6, SLOTS_PER_DAY));
    }

    #[test]
    fn parametrized_references_are_parsed() {
        let max_hours = GroupConstraintType::parse("MAX_HRS_DAY(5.5)").unwrap();
        assert_eq!((max_hours.min(), max_hours.max()), (66, 66));
        assert!(max_hours.is(GroupFlag::MaxHoursADay));
        assert_eq!(max_hours.name(), "At Most 5.5 Hours A Day");

        let work_day = GroupConstraintType::parse("WORKDAY(7.5)").unwrap();
        assert_eq!(work_day.check(), PairCheck::WorkDay);
        assert_eq!(work_day.max(), 90);

        let min_gap = GroupConstraintType::parse("MIN_GAP(1.5)").unwrap();
        assert_eq!((min_gap.check(), min_gap.min()), (PairCheck::MinGap, 18));

        let day_break = GroupConstraintType::parse("DAYBREAK(1.5,90)").unwrap();
        assert_eq!((day_break.min(), day_break.max()), (18, 90));
        assert_eq!(day_break.name(), "Daybreak of 1.5 hours when over 90 mins");
    }

    #[test]
    fn a_plain_reference_takes_precedence_over_the_grammar() {
        let parsed = GroupConstraintType::parse("MAX_HRS_DAY(5)").unwrap();
        assert_eq!(parsed.name(), "At Most 5 Hours A Day");
        assert_eq!(parsed.max(), 60);
    }

    #[test]
    fn unknown_references_are_rejected() {
        assert_eq!(
            GroupConstraintType::parse("SAME_EVERYTHING"),
            Err(ReferenceError::UnknownGroupConstraint(
                "SAME_EVERYTHING".to_owned()
            ))
        );
        assert!(GroupConstraintType::parse("MAX_HRS_DAY(x)").is_err());
    }

    #[test]
    fn flags_mark_room_sharing_and_ignored_students() {
        assert!(GroupConstraintType::parse("MEET_WITH")
            .unwrap()
            .is(GroupFlag::CanShareRoom));
        assert!(GroupConstraintType::parse("DIFF_TIME_IGN_STUDS")
            .unwrap()
            .is(GroupFlag::IgnoreStudents));
        assert!(!GroupConstraintType::parse("SAME_TIME")
            .unwrap()
            .is(GroupFlag::CanShareRoom));
    }
}
