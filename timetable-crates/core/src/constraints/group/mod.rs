//! Distribution constraints between a group of lectures, such as "same time", "back-to-back" or
//! "at most 6 hours a day".
mod kind;
mod pair;
mod sequence;

pub use kind::GroupConstraintType;
pub use kind::GroupFlag;
pub use kind::PairCheck;
use log::debug;
use regex::Regex;

use self::pair::same_room_and_overlaps;
use crate::basic_types::preference::is_prohibited;
use crate::basic_types::preference::is_required;
use crate::basic_types::preference::preference_to_level;
use crate::basic_types::Properties;
use crate::basic_types::PropertyError;
use crate::basic_types::Random;
use crate::basic_types::ReferenceError;
use crate::containers::HashSet;
use crate::engine::Assignment;
use crate::engine::AssignmentValues;
use crate::engine::ConflictSet;
use crate::engine::Constraint;
use crate::engine::ConstraintContext;
use crate::engine::ConstraintId;
use crate::engine::CriterionKind;
use crate::engine::Criteria;
use crate::model::LectureId;
use crate::model::Placement;
use crate::model::PlacementId;
use crate::model::TimeLocation;
use crate::model::TimetableModel;
use crate::model::WeekCode;
use crate::model::DAY_CODES;
use crate::model::NR_DAYS;

/// How the number of slots a day is counted for the `MAX_HRS_DAY` types.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MaxHoursMode {
    /// Per date on which the lectures meet.
    Precise,
    /// Per day of the week within every week of the term.
    #[default]
    DatePatterns,
    /// Per day of the week, ignoring the weeks.
    DayCode,
}

/// Settings shared by every group constraint of a model.
#[derive(Clone, Debug)]
pub struct GroupOptions {
    pub day_of_week_offset: usize,
    pub precedence_consider_date_patterns: bool,
    pub precedence_skip_same_date_pattern_check: bool,
    pub forward_check_max_depth: i32,
    pub forward_check_max_domain_size: usize,
    pub max_hours_mode: MaxHoursMode,
    pub first_work_day: usize,
    /// Number of work days in a week, between 1 and 7.
    pub nr_work_days: usize,
    /// Rooms whose name matches are online rooms.
    pub online_room: Regex,
}

impl Default for GroupOptions {
    fn default() -> Self {
        GroupOptions {
            day_of_week_offset: 0,
            precedence_consider_date_patterns: true,
            precedence_skip_same_date_pattern_check: true,
            forward_check_max_depth: 2,
            forward_check_max_domain_size: 1000,
            max_hours_mode: MaxHoursMode::DatePatterns,
            first_work_day: 0,
            nr_work_days: 5,
            online_room: full_match("(?i)ONLINE|").unwrap_or_else(|_| unreachable!()),
        }
    }
}

fn full_match(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}

impl GroupOptions {
    pub fn from_properties(properties: &Properties) -> Result<GroupOptions, PropertyError> {
        let max_hours_mode = if properties.get_bool("MaxNHoursADay.PreciseComputation", false)? {
            MaxHoursMode::Precise
        } else if properties.get_bool("MaxNHoursADay.ConsiderDatePatterns", true)? {
            MaxHoursMode::DatePatterns
        } else {
            MaxHoursMode::DayCode
        };

        let first_work_day = properties.get_i32("General.FirstWorkDay", 0)?;
        let last_work_day = properties.get_i32("General.LastWorkDay", 4)?;
        let mut nr_work_days = last_work_day - first_work_day + 1;
        if nr_work_days <= 0 {
            nr_work_days += NR_DAYS as i32;
        }
        if nr_work_days > NR_DAYS as i32 {
            nr_work_days -= NR_DAYS as i32;
        }

        let online_room = properties.get_string("General.OnlineRoom", "(?i)ONLINE|");
        let online_room = full_match(&online_room).map_err(|_| PropertyError {
            key: "General.OnlineRoom".to_owned(),
            value: online_room.clone(),
            expected: "a regular expression",
        })?;

        Ok(GroupOptions {
            day_of_week_offset: properties.get_u32("DatePattern.DayOfWeekOffset", 0)? as usize,
            precedence_consider_date_patterns: properties
                .get_bool("Precedence.ConsiderDatePatterns", true)?,
            precedence_skip_same_date_pattern_check: properties
                .get_bool("Precedence.SkipSameDatePatternCheck", true)?,
            forward_check_max_depth: properties.get_i32("ForwardCheck.MaxDepth", 2)?,
            forward_check_max_domain_size: properties.get_u32("ForwardCheck.MaxDomainSize", 1000)?
                as usize,
            max_hours_mode,
            first_work_day: first_work_day.rem_euclid(NR_DAYS as i32) as usize,
            nr_work_days: nr_work_days as usize,
            online_room,
        })
    }
}

/// The placements of the lectures of a constraint: those of an assignment (if any), with the
/// placements of some lectures replaced.
#[derive(Clone, Copy)]
struct Scenario<'a> {
    model: &'a TimetableModel,
    values: Option<&'a AssignmentValues>,
    overrides: &'a [(LectureId, Option<&'a Placement>)],
}

impl<'a> Scenario<'a> {
    fn is_overridden(&self, lecture: LectureId) -> bool {
        self.overrides.iter().any(|&(other, _)| other == lecture)
    }

    fn placement_of(&self, lecture: LectureId) -> Option<&'a Placement> {
        if let Some(&(_, placement)) = self.overrides.iter().find(|&&(other, _)| other == lecture) {
            return placement;
        }
        self.values
            .and_then(|values| values.placement(self.model, lecture))
    }
}

/// A day for which the slots used by the lectures are counted.
#[derive(Clone, Copy, Debug)]
enum Day<'a> {
    /// A day of the week, optionally restricted to one week of the term.
    OfWeek(u32, Option<&'a WeekCode>),
    /// A date of the term.
    Date(usize),
}

impl Day<'_> {
    fn contains(&self, time: &TimeLocation, day_of_week_offset: usize) -> bool {
        match *self {
            Day::OfWeek(day_code, week) => {
                time.day_code() & day_code != 0
                    && week.is_none_or(|week| time.share_weeks_with(week))
            }
            Day::Date(date) => time.has_date(date, day_of_week_offset),
        }
    }
}

/// A distribution constraint of a [`GroupConstraintType`] between a list of lectures.
///
/// A required or prohibited constraint is hard; otherwise its preference is added to the
/// `DistributionPreferences` criterion for every violated pair of lectures.
#[derive(Clone, Debug)]
pub struct GroupConstraint {
    pub(crate) distribution_id: u64,
    pub(crate) kind: GroupConstraintType,
    pub(crate) preference: i32,
    pub(crate) required: bool,
    pub(crate) prohibited: bool,
    pub(crate) lectures: Vec<LectureId>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GroupContext {
    last_preference: i32,
}

impl GroupContext {
    /// The current contribution of the constraint to the `DistributionPreferences` criterion.
    pub fn preference(&self) -> i32 {
        self.last_preference
    }
}

impl GroupConstraint {
    /// Creates a constraint from a type reference (e.g. `BTB`) and a preference (`R`, `P` or a
    /// number).
    pub fn new(
        distribution_id: u64,
        reference: &str,
        preference: &str,
        lectures: Vec<LectureId>,
    ) -> Result<GroupConstraint, ReferenceError> {
        let kind = GroupConstraintType::parse(reference)?;
        let level = preference_to_level(preference)?;
        Ok(GroupConstraint {
            distribution_id,
            kind,
            preference: level,
            required: is_required(level),
            prohibited: is_prohibited(level),
            lectures,
        })
    }

    pub fn distribution_id(&self) -> u64 {
        self.distribution_id
    }

    pub fn kind(&self) -> &GroupConstraintType {
        &self.kind
    }

    pub fn preference(&self) -> i32 {
        self.preference
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_prohibited(&self) -> bool {
        self.prohibited
    }

    pub fn is_hard(&self) -> bool {
        self.required || self.prohibited
    }

    pub fn lectures(&self) -> &[LectureId] {
        &self.lectures
    }

    pub fn can_share_room(&self) -> bool {
        self.kind.is(GroupFlag::CanShareRoom)
    }

    fn nr_assigned(&self, values: &AssignmentValues) -> usize {
        self.lectures
            .iter()
            .filter(|&&lecture| values.is_assigned(lecture))
            .count()
    }

    /// Number of distinct slots the lectures of the scenario use on `day`, skipping the
    /// placements in `conflicts`.
    fn nr_slots_a_day(
        &self,
        scenario: Scenario<'_>,
        day: Day<'_>,
        conflicts: Option<&ConflictSet>,
    ) -> i32 {
        let offset = scenario.model.group_options().day_of_week_offset;
        let mut slots: HashSet<_> = HashSet::default();
        for &lecture in &self.lectures {
            let Some(placement) = scenario.placement_of(lecture) else {
                continue;
            };
            if conflicts.is_some_and(|conflicts| conflicts.contains(&placement.id())) {
                continue;
            }
            let time = placement.time();
            if day.contains(time, offset) {
                slots.extend(time.start_slot()..time.end_slot());
            }
        }
        slots.len() as i32
    }

    /// Every day of the week within every week of the term.
    fn weekly_days(model: &TimetableModel) -> impl Iterator<Item = Day<'_>> + '_ {
        DAY_CODES.iter().flat_map(move |&day_code| {
            model
                .weeks()
                .iter()
                .map(move |week| Day::OfWeek(day_code, Some(week)))
        })
    }

    /// The days on which assigning `placement` may exceed the maximal number of slots.
    fn days_affected_by<'m>(&self, model: &'m TimetableModel, placement: &Placement) -> Vec<Day<'m>> {
        let options = model.group_options();
        match options.max_hours_mode {
            MaxHoursMode::Precise => placement
                .time()
                .dates(options.day_of_week_offset)
                .map(Day::Date)
                .collect(),
            MaxHoursMode::DatePatterns => Self::weekly_days(model)
                .filter(|day| match day {
                    Day::OfWeek(_, Some(week)) => placement.time().share_weeks_with(week),
                    _ => true,
                })
                .collect(),
            MaxHoursMode::DayCode => DAY_CODES
                .iter()
                .map(|&day_code| Day::OfWeek(day_code, None))
                .collect(),
        }
    }

    /// Number of slots over the maximum, summed over `days`.
    fn slots_over(&self, scenario: Scenario<'_>, days: &[Day<'_>]) -> i32 {
        days.iter()
            .map(|&day| (self.nr_slots_a_day(scenario, day, None) - self.kind.max()).max(0))
            .sum()
    }

    fn over_preference(&self, over: i32) -> i32 {
        if over > 0 {
            self.preference.abs() * over / 12
        } else {
            -self.preference.abs()
        }
    }

    fn violated_preference(&self, nr_violated: usize) -> i32 {
        if nr_violated > 0 {
            self.preference.abs() * nr_violated as i32
        } else {
            -self.preference.abs()
        }
    }

    /// The preference of the constraint in the current assignment: `0` for a hard constraint,
    /// `-|preference|` if it is satisfied, and `|preference|` times the number of violations
    /// otherwise.
    pub fn current_preference(&self, model: &TimetableModel, values: &AssignmentValues) -> i32 {
        if self.is_hard() {
            return 0;
        }
        if self.nr_assigned(values) < 2 {
            return -self.preference.abs();
        }
        let scenario = Scenario {
            model,
            values: Some(values),
            overrides: &[],
        };

        if self.kind.is(GroupFlag::MaxHoursADay) {
            let options = model.group_options();
            let days: Vec<Day<'_>> = match options.max_hours_mode {
                MaxHoursMode::Precise => {
                    let mut dates = self
                        .lectures
                        .iter()
                        .filter_map(|&lecture| values.placement(model, lecture))
                        .flat_map(|placement| placement.time().dates(options.day_of_week_offset))
                        .collect::<Vec<_>>();
                    dates.sort_unstable();
                    dates.dedup();
                    dates.into_iter().map(Day::Date).collect()
                }
                MaxHoursMode::DatePatterns => Self::weekly_days(model).collect(),
                MaxHoursMode::DayCode => DAY_CODES
                    .iter()
                    .map(|&day_code| Day::OfWeek(day_code, None))
                    .collect(),
            };
            return self.over_preference(self.slots_over(scenario, &days));
        }

        let assigned = self
            .lectures
            .iter()
            .filter_map(|&lecture| values.placement(model, lecture))
            .collect::<Vec<_>>();
        let mut nr_violated = 0;
        for (index, first) in assigned.iter().enumerate() {
            for second in &assigned[index + 1..] {
                if !self.is_satisfied_pair(model, Some(values), first, second) {
                    nr_violated += 1;
                }
            }
        }
        if self.kind.is(GroupFlag::BackToBack) {
            let mut conflicts = ConflictSet::default();
            if self.is_satisfied_sequence(scenario, Some(&mut conflicts)) {
                nr_violated += conflicts.len();
            } else {
                nr_violated = self.lectures.len();
            }
        }
        self.violated_preference(nr_violated)
    }

    /// The change of [`Self::current_preference`] if `placement` were assigned.
    pub fn preference_of(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        placement: &Placement,
    ) -> i32 {
        if self.is_hard() {
            return 0;
        }
        let lecture = placement.lecture();
        let newly_assigned = usize::from(!values.is_assigned(lecture));
        if self.nr_assigned(values) + newly_assigned < 2 {
            return 0;
        }
        let assign = [(lecture, Some(placement))];
        let unassign = [(lecture, None)];
        let after = Scenario {
            model,
            values: Some(values),
            overrides: &assign,
        };
        let before = Scenario {
            model,
            values: Some(values),
            overrides: &unassign,
        };

        if self.kind.is(GroupFlag::MaxHoursADay) {
            let options = model.group_options();
            let days: Vec<Day<'_>> = match options.max_hours_mode {
                MaxHoursMode::Precise => placement
                    .time()
                    .dates(options.day_of_week_offset)
                    .map(Day::Date)
                    .collect(),
                MaxHoursMode::DatePatterns => Self::weekly_days(model).collect(),
                MaxHoursMode::DayCode => DAY_CODES
                    .iter()
                    .map(|&day_code| Day::OfWeek(day_code, None))
                    .collect(),
            };
            return self.over_preference(self.slots_over(after, &days))
                - self.over_preference(self.slots_over(before, &days));
        }

        let mut violated_after = 0;
        let mut violated_before = 0;
        for (index, &l1) in self.lectures.iter().enumerate() {
            for &l2 in &self.lectures[index + 1..] {
                if let (Some(p1), Some(p2)) = (before.placement_of(l1), before.placement_of(l2)) {
                    if !self.is_satisfied_pair(model, Some(values), p1, p2) {
                        violated_before += 1;
                    }
                }
                if let (Some(p1), Some(p2)) = (after.placement_of(l1), after.placement_of(l2)) {
                    if !self.is_satisfied_pair(model, Some(values), p1, p2) {
                        violated_after += 1;
                    }
                }
            }
        }
        if self.kind.is(GroupFlag::BackToBack) {
            let mut conflicts = ConflictSet::default();
            if self.is_satisfied_sequence(after, Some(&mut conflicts)) {
                violated_after += conflicts.len();
            } else {
                violated_after = self.lectures.len();
            }
            let mut previous = ConflictSet::default();
            if self.is_satisfied_sequence(before, Some(&mut previous)) {
                violated_before += previous.len();
            } else {
                violated_before = self.lectures.len();
            }
        }
        self.violated_preference(violated_after) - self.violated_preference(violated_before)
    }

    pub(crate) fn create_context(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        criteria: &mut Criteria,
    ) -> GroupContext {
        let mut context = GroupContext::default();
        self.update_criterion(model, values, &mut context, criteria);
        context
    }

    fn update_criterion(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        context: &mut GroupContext,
        criteria: &mut Criteria,
    ) {
        if self.is_hard() {
            return;
        }
        criteria.inc(
            CriterionKind::DistributionPreferences,
            -context.last_preference as f64,
        );
        context.last_preference = self.current_preference(model, values) + self.preference.abs();
        criteria.inc(
            CriterionKind::DistributionPreferences,
            context.last_preference as f64,
        );
    }

    pub(crate) fn assigned(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        context: &mut GroupContext,
        criteria: &mut Criteria,
    ) {
        self.update_criterion(model, values, context, criteria);
    }

    pub(crate) fn unassigned(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        context: &mut GroupContext,
        criteria: &mut Criteria,
    ) {
        self.update_criterion(model, values, context, criteria);
    }

    /// Randomly unassigns lectures meeting on a day on which `placement` would exceed the
    /// maximal number of slots, until the day is within the limit; `placement` itself becomes a
    /// conflict if that is not possible.
    fn evict_over_max_hours(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        placement: &Placement,
        conflicts: &mut ConflictSet,
        random: &mut dyn Random,
    ) {
        let overrides = [(placement.lecture(), Some(placement))];
        let scenario = Scenario {
            model,
            values: Some(values),
            overrides: &overrides,
        };
        let offset = model.group_options().day_of_week_offset;
        let max = self.kind.max();

        for day in self.days_affected_by(model, placement) {
            if self.nr_slots_a_day(scenario, day, Some(conflicts)) <= max {
                continue;
            }
            let mut adepts = self
                .lectures
                .iter()
                .filter(|&&lecture| {
                    lecture != placement.lecture() && !model.lecture(lecture).is_committed()
                })
                .filter_map(|&lecture| values.placement(model, lecture))
                .filter(|other| {
                    !conflicts.contains(&other.id()) && day.contains(other.time(), offset)
                })
                .map(Placement::id)
                .collect::<Vec<_>>();
            loop {
                let Some(index) = random.choose_index(adepts.len()) else {
                    let _ = conflicts.insert(placement.id());
                    break;
                };
                let _ = conflicts.insert(adepts.swap_remove(index));
                if self.nr_slots_a_day(scenario, day, Some(conflicts)) <= max {
                    break;
                }
            }
        }
    }

    fn exceeds_max_hours(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        placement: &Placement,
    ) -> bool {
        let overrides = [(placement.lecture(), Some(placement))];
        let scenario = Scenario {
            model,
            values: Some(values),
            overrides: &overrides,
        };
        self.days_affected_by(model, placement)
            .into_iter()
            .any(|day| self.nr_slots_a_day(scenario, day, None) > self.kind.max())
    }

    pub(crate) fn compute_conflicts(
        &self,
        id: ConstraintId,
        model: &TimetableModel,
        assignment: &Assignment,
        placement: &Placement,
        conflicts: &mut ConflictSet,
        random: &mut dyn Random,
    ) {
        if !self.is_hard() {
            return;
        }
        let values = assignment.values();
        for &lecture in &self.lectures {
            if lecture == placement.lecture() {
                continue;
            }
            let Some(current) = values.placement(model, lecture) else {
                continue;
            };
            if !self.is_satisfied_pair(model, Some(values), current, placement) {
                let _ = conflicts.insert(current.id());
            }
        }

        if self.kind.is(GroupFlag::BackToBack) {
            let overrides = [(placement.lecture(), Some(placement))];
            let scenario = Scenario {
                model,
                values: Some(values),
                overrides: &overrides,
            };
            if !self.is_satisfied_sequence(scenario, Some(conflicts)) {
                let _ = conflicts.insert(placement.id());
            }
        }

        if self.kind.is(GroupFlag::MaxHoursADay) {
            self.evict_over_max_hours(model, values, placement, conflicts, random);
        }

        let depth = model.group_options().forward_check_max_depth - 1;
        self.forward_check(
            id,
            model,
            assignment,
            placement,
            conflicts,
            &mut Vec::new(),
            depth,
            random,
        );
    }

    /// The lectures of the constraint which are not assigned yet need a value compatible with
    /// `placement`; if some has none, `placement` is a conflict. A lecture with a single
    /// compatible value has that value propagated into its other hard constraints.
    #[allow(clippy::too_many_arguments, reason = "the search state is passed explicitly")]
    pub(crate) fn forward_check(
        &self,
        id: ConstraintId,
        model: &TimetableModel,
        assignment: &Assignment,
        placement: &Placement,
        conflicts: &mut ConflictSet,
        ignore: &mut Vec<ConstraintId>,
        depth: i32,
        random: &mut dyn Random,
    ) {
        if depth < 0 {
            return;
        }
        ignore.push(id);
        self.forward_check_lectures(model, assignment, placement, conflicts, ignore, depth, random);
        let _ = ignore.pop();
    }

    #[allow(clippy::too_many_arguments, reason = "the search state is passed explicitly")]
    fn forward_check_lectures(
        &self,
        model: &TimetableModel,
        assignment: &Assignment,
        placement: &Placement,
        conflicts: &mut ConflictSet,
        ignore: &mut Vec<ConstraintId>,
        depth: i32,
        random: &mut dyn Random,
    ) {
        let options = model.group_options();
        let values = assignment.values();
        let mut needed_size: Vec<PlacementId> = Vec::new();

        for &lecture_id in &self.lectures {
            if conflicts.contains(&placement.id()) {
                break;
            }
            if lecture_id == placement.lecture() {
                continue;
            }
            if let Some(current) = values.placement(model, lecture_id) {
                if self.is_satisfied_pair(model, Some(values), placement, current) {
                    if self.can_share_room() && same_room_and_overlaps(placement, current) {
                        needed_size.push(current.id());
                    }
                    continue;
                }
                let _ = conflicts.insert(current.id());
            }

            let domain = model.lecture(lecture_id).domain();
            if domain.len() >= options.forward_check_max_domain_size || domain.is_empty() {
                return;
            }
            let Some((support, nr_supports, shares_room)) =
                self.find_supports(model, values, placement, domain)
            else {
                let _ = conflicts.insert(placement.id());
                return;
            };
            if shares_room {
                needed_size.push(support.id());
            }

            if nr_supports == 1 {
                for &other_id in model.hard_constraints_of(lecture_id) {
                    let other = model.constraint(other_id);
                    if other.is_weakening() {
                        continue;
                    }
                    if let Constraint::Group(group) = other {
                        if depth > 0 && !ignore.contains(&other_id) {
                            group.forward_check(
                                other_id,
                                model,
                                assignment,
                                support,
                                conflicts,
                                ignore,
                                depth - 1,
                                random,
                            );
                        }
                    } else {
                        other.compute_conflicts(other_id, model, assignment, support, conflicts, random);
                    }
                }
                if conflicts.contains(&support.id()) {
                    let _ = conflicts.insert(placement.id());
                }
            }
        }

        if self.can_share_room() && !needed_size.is_empty() {
            for room in placement.rooms() {
                let Some(room_constraint) = room
                    .room_constraint()
                    .and_then(|room_id| model.room_constraint(room_id))
                else {
                    continue;
                };
                if !room_constraint.check_room_size(model, placement, &needed_size, None) {
                    debug!(
                        "{} does not fit all the lectures of {}",
                        room.name(),
                        self.kind
                    );
                    let _ = conflicts.insert(placement.id());
                }
            }
        }
    }

    /// Looks for values of a lecture compatible with `placement`: returns the first one, the
    /// number of them (counting at most two), and whether all of them share a room with
    /// `placement` at an overlapping time.
    fn find_supports<'m>(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        placement: &Placement,
        domain: &'m [Placement],
    ) -> Option<(&'m Placement, usize, bool)> {
        let mut shares_room = self.can_share_room();
        let mut support = None;
        let mut nr_supports = 0;
        for other in domain {
            if nr_supports < 2 {
                if self.is_satisfied_pair(model, Some(values), placement, other) {
                    if support.is_none() {
                        support = Some(other);
                    }
                    nr_supports += 1;
                    if shares_room && !same_room_and_overlaps(placement, other) {
                        shares_room = false;
                    }
                }
            } else if shares_room
                && !same_room_and_overlaps(placement, other)
                && self.is_satisfied_pair(model, Some(values), placement, other)
            {
                shares_room = false;
            }
            if nr_supports > 1 && !shares_room {
                break;
            }
        }
        support.map(|support| (support, nr_supports, shares_room))
    }

    pub(crate) fn in_conflict(
        &self,
        id: ConstraintId,
        model: &TimetableModel,
        assignment: &Assignment,
        placement: &Placement,
    ) -> bool {
        if !self.is_hard() {
            return false;
        }
        let values = assignment.values();
        for &lecture in &self.lectures {
            if lecture == placement.lecture() {
                continue;
            }
            if let Some(current) = values.placement(model, lecture) {
                if !self.is_satisfied_pair(model, Some(values), current, placement) {
                    return true;
                }
            }
        }
        if self.kind.is(GroupFlag::BackToBack) {
            let overrides = [(placement.lecture(), Some(placement))];
            let scenario = Scenario {
                model,
                values: Some(values),
                overrides: &overrides,
            };
            if !self.is_satisfied_sequence(scenario, None) {
                return true;
            }
        }
        if self.kind.is(GroupFlag::MaxHoursADay) && self.exceeds_max_hours(model, values, placement)
        {
            return true;
        }
        let depth = model.group_options().forward_check_max_depth - 1;
        !self.is_supported(id, model, assignment, placement, &mut Vec::new(), depth)
    }

    /// The boolean counterpart of [`Self::forward_check`]: whether every lecture of the
    /// constraint still has a value compatible with `placement`.
    fn is_supported(
        &self,
        id: ConstraintId,
        model: &TimetableModel,
        assignment: &Assignment,
        placement: &Placement,
        ignore: &mut Vec<ConstraintId>,
        depth: i32,
    ) -> bool {
        if depth < 0 {
            return true;
        }
        ignore.push(id);
        let supported = self.are_lectures_supported(model, assignment, placement, ignore, depth);
        let _ = ignore.pop();
        supported
    }

    fn are_lectures_supported(
        &self,
        model: &TimetableModel,
        assignment: &Assignment,
        placement: &Placement,
        ignore: &mut Vec<ConstraintId>,
        depth: i32,
    ) -> bool {
        let options = model.group_options();
        let values = assignment.values();
        let mut needed_size = model.lecture(placement.lecture()).max_room_use();

        for &lecture_id in &self.lectures {
            if lecture_id == placement.lecture() {
                continue;
            }
            let lecture = model.lecture(lecture_id);
            if let Some(current) = values.placement(model, lecture_id) {
                if !self.is_satisfied_pair(model, Some(values), placement, current) {
                    return false;
                }
                if self.can_share_room() && same_room_and_overlaps(placement, current) {
                    needed_size += lecture.max_room_use();
                }
                continue;
            }

            let domain = lecture.domain();
            if domain.len() >= options.forward_check_max_domain_size || domain.is_empty() {
                return true;
            }
            let Some((support, nr_supports, shares_room)) =
                self.find_supports(model, values, placement, domain)
            else {
                return false;
            };
            if shares_room {
                needed_size += lecture.max_room_use();
            }

            if nr_supports == 1 {
                for &other_id in model.hard_constraints_of(lecture_id) {
                    let other = model.constraint(other_id);
                    if other.is_weakening() {
                        continue;
                    }
                    let supported = if let Constraint::Group(group) = other {
                        depth <= 0
                            || ignore.contains(&other_id)
                            || group.is_supported(other_id, model, assignment, support, ignore, depth - 1)
                    } else {
                        !other.in_conflict(other_id, model, assignment, support)
                    };
                    if !supported {
                        return false;
                    }
                }
            }
        }

        !(self.can_share_room() && needed_size > placement.room_size())
    }

    /// Whether the two placements can be assigned together.
    pub fn is_consistent(&self, model: &TimetableModel, first: &Placement, second: &Placement) -> bool {
        if !self.is_hard() {
            return true;
        }
        if !self.is_satisfied_pair(model, None, first, second) {
            return false;
        }
        let overrides = [
            (first.lecture(), Some(first)),
            (second.lecture(), Some(second)),
        ];
        let scenario = Scenario {
            model,
            values: None,
            overrides: &overrides,
        };
        if self.kind.is(GroupFlag::BackToBack) && !self.is_satisfied_sequence(scenario, None) {
            return false;
        }
        if self.kind.is(GroupFlag::MaxHoursADay) {
            let options = model.group_options();
            let days: Vec<Day<'_>> = match options.max_hours_mode {
                MaxHoursMode::Precise => first
                    .time()
                    .dates(options.day_of_week_offset)
                    .filter(|&date| second.time().has_date(date, options.day_of_week_offset))
                    .map(Day::Date)
                    .collect(),
                MaxHoursMode::DatePatterns => Self::weekly_days(model)
                    .filter(|day| match day {
                        Day::OfWeek(_, Some(week)) => {
                            first.time().share_weeks_with(week) || second.time().share_weeks_with(week)
                        }
                        _ => true,
                    })
                    .collect(),
                MaxHoursMode::DayCode => DAY_CODES
                    .iter()
                    .map(|&day_code| Day::OfWeek(day_code, None))
                    .collect(),
            };
            if days
                .into_iter()
                .any(|day| self.nr_slots_a_day(scenario, day, None) > self.kind.max())
            {
                return false;
            }
        }
        true
    }

    /// Whether a soft constraint is currently satisfied; hard constraints always are, as their
    /// violations are prevented by conflicts.
    pub fn is_satisfied(&self, model: &TimetableModel, values: &AssignmentValues) -> bool {
        self.is_hard()
            || self.nr_assigned(values) < 2
            || self.preference == 0
            || self.current_preference(model, values) < 0
    }

    pub(crate) fn context_of(assignment: &Assignment, constraint: ConstraintId) -> &GroupContext {
        match assignment.context(constraint) {
            ConstraintContext::Group(context) => context,
            _ => unreachable!("a group constraint always has a group context"),
        }
    }
}

impl std::fmt::Display for GroupConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} between {} lectures", self.kind, self.lectures.len())
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::*;
    use crate::basic_types::TestRandom;
    use crate::model::LectureSpec;
    use crate::model::ModelBuilder;
    use crate::model::RoomLocation;
    use crate::model::DAY_CODES;

    fn room() -> RoomLocation {
        RoomLocation::new(1, "A", 50)
    }

    fn lecture(class_id: u64, times: &[(u32, i32)]) -> LectureSpec {
        times.iter().fold(
            LectureSpec::new(class_id, format!("L{class_id}")).with_class_limit(10, 10),
            |spec, &(day_code, start)| {
                spec.with_placement(TimeLocation::new(day_code, start, 12), vec![room()])
            },
        )
    }

    fn group_of(model: &TimetableModel) -> (ConstraintId, &GroupConstraint) {
        model
            .constraint_ids()
            .find_map(|id| model.group_constraint(id).map(|gc| (id, gc)))
            .unwrap()
    }

    fn placement(model: &TimetableModel, lecture: usize, index: u32) -> &Placement {
        let lecture = model.lecture_ids().nth(lecture).unwrap();
        model.placement(PlacementId { lecture, index })
    }

    const MONDAY: u32 = DAY_CODES[0];
    const TUESDAY: u32 = DAY_CODES[1];

    #[test]
    fn a_required_constraint_evicts_the_lecture_it_disagrees_with() {
        let model = ModelBuilder::default()
            .with_lecture(lecture(1, &[(MONDAY, 96), (MONDAY, 120)]))
            .with_lecture(lecture(2, &[(MONDAY, 96), (MONDAY, 120)]))
            .with_group_constraint(1, "SAME_TIME", "R", &[1, 2])
            .build()
            .unwrap();
        let (id, group) = group_of(&model);
        let mut assignment = model.create_assignment();
        let mut random = TestRandom::default();
        let first = placement(&model, 0, 0).id();
        let _ = assignment.assign(&model, first, &mut random);

        let mut conflicts = ConflictSet::default();
        group.compute_conflicts(id, &model, &assignment, placement(&model, 1, 1), &mut conflicts, &mut random);
        assert!(conflicts.contains(&first));
        assert!(!conflicts.contains(&placement(&model, 1, 1).id()));

        let mut conflicts = ConflictSet::default();
        group.compute_conflicts(id, &model, &assignment, placement(&model, 1, 0), &mut conflicts, &mut random);
        assert!(conflicts.is_empty());
    }

    #[test]
    fn the_satisfied_pair_agrees_with_the_sign_of_the_preference() {
        let build = |preference: &str| {
            ModelBuilder::default()
                .with_lecture(lecture(1, &[(MONDAY, 96)]))
                .with_lecture(lecture(2, &[(MONDAY, 96), (TUESDAY, 96)]))
                .with_group_constraint(1, "DIFF_TIME", preference, &[1, 2])
                .build()
                .unwrap()
        };

        let required = build("R");
        let (_, group) = group_of(&required);
        let p1 = placement(&required, 0, 0);
        assert!(!group.is_satisfied_pair(&required, None, p1, placement(&required, 1, 0)));
        assert!(group.is_satisfied_pair(&required, None, p1, placement(&required, 1, 1)));

        let prohibited = build("P");
        let (_, group) = group_of(&prohibited);
        let p1 = placement(&prohibited, 0, 0);
        assert!(group.is_satisfied_pair(&prohibited, None, p1, placement(&prohibited, 1, 0)));
        assert!(!group.is_satisfied_pair(&prohibited, None, p1, placement(&prohibited, 1, 1)));
    }

    #[test]
    fn a_lecture_without_a_compatible_value_rejects_the_placement() {
        let model = ModelBuilder::default()
            .with_lecture(lecture(1, &[(MONDAY, 96)]))
            .with_lecture(lecture(2, &[(MONDAY, 96), (MONDAY, 120)]))
            .with_group_constraint(1, "SAME_TIME", "R", &[1, 2])
            .build()
            .unwrap();
        let (id, group) = group_of(&model);
        let assignment = model.create_assignment();
        let mut random = TestRandom::default();

        let unsupported = placement(&model, 1, 1);
        let mut conflicts = ConflictSet::default();
        group.compute_conflicts(id, &model, &assignment, unsupported, &mut conflicts, &mut random);
        assert!(conflicts.contains(&unsupported.id()));
        assert!(group.in_conflict(id, &model, &assignment, unsupported));
        assert!(!group.in_conflict(id, &model, &assignment, placement(&model, 1, 0)));
    }

    #[test]
    fn back_to_back_evicts_the_lecture_leaving_a_gap() {
        let model = ModelBuilder::default()
            .with_lecture(lecture(1, &[(MONDAY, 96)]))
            .with_lecture(lecture(2, &[(MONDAY, 108), (MONDAY, 132)]))
            .with_group_constraint(1, "BTB", "R", &[1, 2])
            .build()
            .unwrap();
        let (id, group) = group_of(&model);
        let mut assignment = model.create_assignment();
        let mut random = TestRandom::default();
        let first = placement(&model, 0, 0).id();
        let _ = assignment.assign(&model, first, &mut random);

        let mut conflicts = ConflictSet::default();
        group.compute_conflicts(id, &model, &assignment, placement(&model, 1, 0), &mut conflicts, &mut random);
        assert!(conflicts.is_empty());

        let with_gap = placement(&model, 1, 1);
        let mut conflicts = ConflictSet::default();
        group.compute_conflicts(id, &model, &assignment, with_gap, &mut conflicts, &mut random);
        assert!(conflicts.contains(&first));
        assert!(!conflicts.contains(&with_gap.id()));
    }

    #[test]
    fn an_unassigned_lecture_fills_a_single_gap_of_the_sequence() {
        let build = |preference: &str| {
            ModelBuilder::default()
                .with_lecture(lecture(1, &[(MONDAY, 90)]))
                .with_lecture(lecture(2, &[(MONDAY, 134)]))
                .with_lecture(lecture(3, &[(TUESDAY, 90)]))
                .with_lecture(lecture(4, &[(MONDAY, 178)]))
                .with_group_constraint(1, "NHB(1)", preference, &[1, 2, 3, 4])
                .build()
                .unwrap()
        };
        let assign_all_but_third = |model: &TimetableModel| {
            let mut assignment = model.create_assignment();
            for lecture in [0, 1, 3] {
                assignment.assign_unchecked(model, placement(model, lecture, 0).id());
            }
            assignment
        };

        let required = build("R");
        let (_, group) = group_of(&required);
        let assignment = assign_all_but_third(&required);
        let scenario = Scenario {
            model: &required,
            values: Some(assignment.values()),
            overrides: &[],
        };
        assert!(!group.is_satisfied_sequence(scenario, None));

        let preferred = build("-2");
        let (_, group) = group_of(&preferred);
        let assignment = assign_all_but_third(&preferred);
        assert!(group.current_preference(&preferred, assignment.values()) > 0);
        assert!(!group.is_satisfied(&preferred, assignment.values()));
    }

    #[test]
    fn max_hours_a_day_evicts_until_the_day_fits() {
        let model = ModelBuilder::default()
            .with_lecture(lecture(1, &[(MONDAY, 96)]))
            .with_lecture(lecture(2, &[(MONDAY, 120)]))
            .with_lecture(lecture(3, &[(MONDAY, 144), (TUESDAY, 144)]))
            .with_group_constraint(1, "MAX_HRS_DAY(2)", "R", &[1, 2, 3])
            .build()
            .unwrap();
        let (id, group) = group_of(&model);
        let mut assignment = model.create_assignment();
        let mut random = SmallRng::seed_from_u64(42);
        let _ = assignment.assign(&model, placement(&model, 0, 0).id(), &mut random);
        let _ = assignment.assign(&model, placement(&model, 1, 0).id(), &mut random);
        assert_eq!(assignment.nr_assigned(), 2);

        let monday = placement(&model, 2, 0);
        let mut conflicts = ConflictSet::default();
        group.compute_conflicts(id, &model, &assignment, monday, &mut conflicts, &mut random);
        assert_eq!(conflicts.len(), 1);
        assert!(!conflicts.contains(&monday.id()));

        let mut conflicts = ConflictSet::default();
        group.compute_conflicts(id, &model, &assignment, placement(&model, 2, 1), &mut conflicts, &mut random);
        assert!(conflicts.is_empty());
    }

    #[test]
    fn a_soft_constraint_maintains_the_distribution_preferences() {
        let model = ModelBuilder::default()
            .with_lecture(lecture(1, &[(MONDAY, 96)]))
            .with_lecture(lecture(2, &[(MONDAY, 120), (TUESDAY, 120)]))
            .with_group_constraint(1, "SAME_DAYS", "-1", &[1, 2])
            .build()
            .unwrap();
        let (id, group) = group_of(&model);
        let mut assignment = model.create_assignment();
        let mut random = TestRandom::default();
        let _ = assignment.assign(&model, placement(&model, 0, 0).id(), &mut random);
        let distribution = |assignment: &Assignment| {
            assignment
                .criteria()
                .value(CriterionKind::DistributionPreferences)
        };
        assert_eq!(distribution(&assignment), 0.0);

        let tuesday = placement(&model, 1, 1);
        assert_eq!(group.preference_of(&model, assignment.values(), tuesday), 2);
        let _ = assignment.assign(&model, tuesday.id(), &mut random);
        assert_eq!(distribution(&assignment), 2.0);
        assert_eq!(GroupConstraint::context_of(&assignment, id).preference(), 2);
        assert!(!group.is_satisfied(&model, assignment.values()));

        let _ = assignment.assign(&model, placement(&model, 1, 0).id(), &mut random);
        assert_eq!(distribution(&assignment), 0.0);
        assert!(assignment
            .recompute_criteria(&model)
            .approx_eq(assignment.criteria(), 1e-9));
    }

    #[test]
    fn consistency_only_concerns_hard_constraints() {
        let model = ModelBuilder::default()
            .with_lecture(lecture(1, &[(MONDAY, 96)]))
            .with_lecture(lecture(2, &[(MONDAY, 96), (MONDAY, 120)]))
            .with_group_constraint(1, "SAME_START", "R", &[1, 2])
            .with_group_constraint(2, "SAME_START", "2", &[1, 2])
            .build()
            .unwrap();
        let p1 = placement(&model, 0, 0);
        let p2 = placement(&model, 1, 1);
        let groups = model
            .constraint_ids()
            .filter_map(|id| model.group_constraint(id))
            .collect::<Vec<_>>();
        assert_eq!(groups.len(), 2);
        assert!(!groups[0].is_consistent(&model, p1, p2));
        assert!(groups[1].is_consistent(&model, p1, p2));
    }
}
