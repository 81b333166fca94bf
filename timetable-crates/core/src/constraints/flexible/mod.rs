//! Flexible constraints limit how the lectures of a group spread over the days and weeks of the
//! term: the number of breaks or holes in a day, the length of blocks, a break within a time
//! window, and the number of days, half-days, weeks or consecutive days used.
mod blocks;
mod buckets;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::basic_types::preference::is_required;
use crate::basic_types::preference::preference_to_level;
use crate::basic_types::Properties;
use crate::basic_types::PropertyError;
use crate::basic_types::Random;
use crate::basic_types::ReferenceError;
use crate::containers::HashMap;
use crate::containers::HashSet;
use crate::engine::Assignment;
use crate::engine::AssignmentValues;
use crate::engine::ConflictSet;
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
use crate::model::SLOT_LENGTH_MIN;

/// Settings shared by every flexible constraint of a model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlexibleOptions {
    /// Evaluate the limits for every week of the term separately.
    pub check_weeks: bool,
    /// Decide whether a time meets on a day from its dates instead of its day code.
    pub precise_date_computation: bool,
    /// The first slot of the afternoon.
    pub half_day_slot: i32,
    pub day_of_week_offset: usize,
}

impl Default for FlexibleOptions {
    fn default() -> Self {
        FlexibleOptions {
            check_weeks: false,
            precise_date_computation: false,
            half_day_slot: 144,
            day_of_week_offset: 0,
        }
    }
}

impl FlexibleOptions {
    pub fn from_properties(properties: &Properties) -> Result<FlexibleOptions, PropertyError> {
        Ok(FlexibleOptions {
            check_weeks: properties.get_bool("FlexibleConstraint.CheckWeeks", false)?,
            precise_date_computation: properties
                .get_bool("FlexibleConstraint.PreciseDateComputation", false)?,
            half_day_slot: properties.get_i32("General.HalfDaySlot", 144)?,
            day_of_week_offset: properties.get_u32("DatePattern.DayOfWeekOffset", 0)? as usize,
        })
    }

    /// Whether `time` meets on a day of `day_code`, within `week` if given.
    fn meets(&self, time: &TimeLocation, day_code: u32, week: Option<&WeekCode>) -> bool {
        if self.precise_date_computation {
            time.overlaps(day_code, week, self.day_of_week_offset)
        } else {
            time.day_code() & day_code != 0 && week.is_none_or(|week| time.share_weeks_with(week))
        }
    }
}

/// The kind of a [`FlexibleConstraint`] with its parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlexibleKind {
    /// At most `max_blocks` blocks a day, a block being lectures separated by at most `max_gap`
    /// slots.
    MaxBreaks { max_blocks: usize, max_gap: i32 },
    /// No block longer than `max_length` slots, a block being lectures separated by at most
    /// `max_gap` slots.
    MaxBlock { max_length: i32, max_gap: i32 },
    /// Every day leaves `length` consecutive free slots between the slots `start` and `end`.
    Break { start: i32, end: i32, length: i32 },
    /// At most `max_holes` free slots between the first and the last lecture of a day.
    MaxHoles { max_holes: i32 },
    MaxDays { max: usize },
    /// At most `max` weeks with a meeting on a day of `day_code`; a day code of zero matches every
    /// day.
    MaxWeeks { max: usize, day_code: u32 },
    MaxHalfDays { max: usize },
    MaxConsecutiveDays { max: usize },
}

static MAX_BREAKS: Lazy<Regex> = Lazy::new(|| reference_regex("MaxBreaks", 2));
static MAX_BLOCK: Lazy<Regex> = Lazy::new(|| reference_regex("MaxBlock", 2));
static BREAK: Lazy<Regex> = Lazy::new(|| reference_regex("Break", 3));
static MAX_WEEKS: Lazy<Regex> = Lazy::new(|| reference_regex("MaxWeeks", 2));
static MAX_DAYS: Lazy<Regex> = Lazy::new(|| reference_regex("MaxDays", 1));
static MAX_HOLES: Lazy<Regex> = Lazy::new(|| reference_regex("MaxHoles", 1));
static MAX_HALF_DAYS: Lazy<Regex> = Lazy::new(|| reference_regex("MaxHalfDays", 1));
static MAX_CONSECUTIVE_DAYS: Lazy<Regex> = Lazy::new(|| reference_regex("MaxConsDays", 1));

fn reference_regex(name: &str, nr_parameters: usize) -> Regex {
    let parameters = ":([0-9]+)".repeat(nr_parameters);
    Regex::new(&format!("(?i)_({name}){parameters}_")).unwrap_or_else(|_| unreachable!())
}

impl FlexibleKind {
    /// Parses a reference such as `_MaxBreaks:2:30_` or `_MaxDays:3_`.
    ///
    /// Lengths and gaps are given in minutes, except for the window of `_Break:start:end:length_`
    /// which is given in slots of the day.
    pub fn parse(reference: &str) -> Result<FlexibleKind, ReferenceError> {
        let parameter = |captures: &regex::Captures<'_>, index: usize| {
            let text = &captures[index + 1];
            text.parse::<u32>()
                .map_err(|_| ReferenceError::InvalidParameter {
                    reference: reference.to_owned(),
                    parameter: text.to_owned(),
                })
        };

        if let Some(captures) = MAX_BREAKS.captures(reference) {
            let max_breaks = parameter(&captures, 1)?;
            let min_break = parameter(&captures, 2)? as i32;
            return Ok(FlexibleKind::MaxBreaks {
                max_blocks: 1 + max_breaks as usize,
                max_gap: min_break / SLOT_LENGTH_MIN,
            });
        }
        if let Some(captures) = MAX_BLOCK.captures(reference) {
            return Ok(FlexibleKind::MaxBlock {
                max_length: parameter(&captures, 1)? as i32 / SLOT_LENGTH_MIN,
                max_gap: parameter(&captures, 2)? as i32 / SLOT_LENGTH_MIN,
            });
        }
        if let Some(captures) = BREAK.captures(reference) {
            return Ok(FlexibleKind::Break {
                start: parameter(&captures, 1)? as i32,
                end: parameter(&captures, 2)? as i32,
                length: parameter(&captures, 3)? as i32 / SLOT_LENGTH_MIN,
            });
        }
        if let Some(captures) = MAX_WEEKS.captures(reference) {
            return Ok(FlexibleKind::MaxWeeks {
                max: parameter(&captures, 1)? as usize,
                day_code: parameter(&captures, 2)?,
            });
        }
        if let Some(captures) = MAX_DAYS.captures(reference) {
            return Ok(FlexibleKind::MaxDays {
                max: parameter(&captures, 1)? as usize,
            });
        }
        if let Some(captures) = MAX_HOLES.captures(reference) {
            return Ok(FlexibleKind::MaxHoles {
                max_holes: parameter(&captures, 1)? as i32 / SLOT_LENGTH_MIN,
            });
        }
        if let Some(captures) = MAX_HALF_DAYS.captures(reference) {
            return Ok(FlexibleKind::MaxHalfDays {
                max: parameter(&captures, 1)? as usize,
            });
        }
        if let Some(captures) = MAX_CONSECUTIVE_DAYS.captures(reference) {
            return Ok(FlexibleKind::MaxConsecutiveDays {
                max: parameter(&captures, 1)? as usize,
            });
        }
        Err(ReferenceError::UnknownFlexibleConstraint(
            reference.to_owned(),
        ))
    }

    pub fn name(&self) -> &'static str {
        match self {
            FlexibleKind::MaxBreaks { .. } => "Max Breaks",
            FlexibleKind::MaxBlock { .. } => "Max Block",
            FlexibleKind::Break { .. } => "Break",
            FlexibleKind::MaxHoles { .. } => "Max Holes",
            FlexibleKind::MaxDays { .. } => "Max Days",
            FlexibleKind::MaxWeeks { .. } => "Max Weeks",
            FlexibleKind::MaxHalfDays { .. } => "Max Half-Days",
            FlexibleKind::MaxConsecutiveDays { .. } => "Max Consecutive Days",
        }
    }

    /// The kinds whose hard variant is relaxed instead of making the search stuck.
    fn is_weakening(&self) -> bool {
        matches!(
            self,
            FlexibleKind::MaxBreaks { .. } | FlexibleKind::MaxHoles { .. }
        )
    }

    fn uses_buckets(&self) -> bool {
        !matches!(
            self,
            FlexibleKind::MaxBreaks { .. }
                | FlexibleKind::MaxHoles { .. }
                | FlexibleKind::MaxBlock { .. }
                | FlexibleKind::Break { .. }
        )
    }
}

/// The placements of the lectures of a constraint: those of an assignment (if any), with the
/// placements of some lectures replaced and the placements in `conflicts` left out.
#[derive(Clone, Copy)]
struct View<'a> {
    model: &'a TimetableModel,
    values: Option<&'a AssignmentValues>,
    overrides: &'a [(LectureId, Option<&'a Placement>)],
    conflicts: Option<&'a ConflictSet>,
}

impl<'a> View<'a> {
    fn placement_of(&self, lecture: LectureId) -> Option<&'a Placement> {
        let placement = match self.overrides.iter().find(|&&(other, _)| other == lecture) {
            Some(&(_, placement)) => placement,
            None => self
                .values
                .and_then(|values| values.placement(self.model, lecture)),
        };
        placement.filter(|placement| {
            !self
                .conflicts
                .is_some_and(|conflicts| conflicts.contains(&placement.id()))
        })
    }

    fn with_conflicts(self, conflicts: &'a ConflictSet) -> View<'a> {
        View {
            conflicts: Some(conflicts),
            ..self
        }
    }
}

/// Lecture to bucket membership, for each group of weeks.
type BucketTable = Vec<Vec<HashSet<LectureId>>>;

#[derive(Clone, Debug, PartialEq)]
enum FlexibleState {
    /// The placements which have been allowed to break the limit, until their lecture is
    /// reassigned.
    Breaks { weak: HashMap<LectureId, PlacementId> },
    /// The number of holes allowed per day code and week group, if raised above the limit.
    Holes { allowed: HashMap<(u32, usize), i32> },
    Buckets(BucketTable),
    /// Nothing is kept; the days of a placement are evaluated from the assignment.
    Daily,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FlexibleContext {
    last_preference: f64,
    state: FlexibleState,
}

impl FlexibleContext {
    /// The current contribution of the constraint to the `FlexibleConstraint` criterion.
    pub fn preference(&self) -> f64 {
        self.last_preference
    }
}

/// A limit on how a group of lectures uses days and weeks.
///
/// A required constraint is hard; any other constraint adds its preference times the number of
/// violations to the `FlexibleConstraint` criterion.
#[derive(Clone, Debug)]
pub struct FlexibleConstraint {
    pub(crate) id: u64,
    pub(crate) owner: String,
    pub(crate) reference: String,
    pub(crate) kind: FlexibleKind,
    pub(crate) preference: i32,
    pub(crate) required: bool,
    pub(crate) lectures: Vec<LectureId>,
}

impl FlexibleConstraint {
    pub fn new(
        id: u64,
        owner: impl Into<String>,
        reference: &str,
        preference: &str,
        lectures: Vec<LectureId>,
    ) -> Result<FlexibleConstraint, ReferenceError> {
        let kind = FlexibleKind::parse(reference)?;
        let level = preference_to_level(preference)?;
        Ok(FlexibleConstraint {
            id,
            owner: owner.into(),
            reference: reference.to_owned(),
            kind,
            preference: level,
            required: is_required(level),
            lectures,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn kind(&self) -> FlexibleKind {
        self.kind
    }

    pub fn preference(&self) -> i32 {
        self.preference
    }

    pub fn is_hard(&self) -> bool {
        self.required
    }

    pub fn is_weakening(&self) -> bool {
        self.is_hard() && self.kind.is_weakening()
    }

    pub fn lectures(&self) -> &[LectureId] {
        &self.lectures
    }

    /// The groups of weeks within which the limits apply: every week of the model when weeks are
    /// checked, otherwise the whole term at once.
    fn week_groups(model: &TimetableModel) -> Vec<Option<&WeekCode>> {
        if model.flexible_options().check_weeks {
            model.weeks().iter().map(Some).collect()
        } else {
            vec![None]
        }
    }

    /// The placements of the view meeting on a day of `day_code` within `week`.
    fn relevant<'a>(&self, view: View<'a>, day_code: u32, week: Option<&WeekCode>) -> Vec<&'a Placement> {
        let options = view.model.flexible_options();
        self.lectures
            .iter()
            .filter_map(|&lecture| view.placement_of(lecture))
            .filter(|placement| options.meets(placement.time(), day_code, week))
            .collect()
    }

    /// The violations of the constraint in the view, which is `0` when it is satisfied.
    fn nr_violations(&self, view: View<'_>, table: Option<&BucketTable>) -> f64 {
        match self.kind {
            FlexibleKind::MaxBreaks {
                max_blocks,
                max_gap,
            } => self.breaks_violations(view, max_blocks, max_gap),
            FlexibleKind::MaxHoles { max_holes } => self.holes_violations(view, max_holes),
            FlexibleKind::MaxBlock {
                max_length,
                max_gap,
            } => self.max_block_violations(view, max_length, max_gap),
            FlexibleKind::Break { start, end, length } => {
                self.break_violations(view, start, end, length)
            }
            _ => match table {
                Some(table) => self.buckets_violations(view.model, table, None, &HashSet::default()),
                None => {
                    let table = self.bucket_table(view);
                    self.buckets_violations(view.model, &table, None, &HashSet::default())
                }
            },
        }
    }

    fn violations_to_preference(&self, violations: f64) -> f64 {
        let preference = self.preference.abs() as f64;
        if violations == 0.0 {
            -preference
        } else {
            preference * violations
        }
    }

    /// The preference of the constraint in the current assignment: `0` for a hard constraint,
    /// `-|preference|` if it is satisfied, and `|preference|` times the violations otherwise.
    pub fn current_preference(&self, model: &TimetableModel, values: &AssignmentValues) -> f64 {
        if self.is_hard() {
            return 0.0;
        }
        let view = View {
            model,
            values: Some(values),
            overrides: &[],
            conflicts: None,
        };
        self.violations_to_preference(self.nr_violations(view, None))
    }

    /// The change of [`Self::current_preference`] if `placement` were assigned.
    pub fn preference_of(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        placement: &Placement,
    ) -> f64 {
        if self.is_hard() {
            return 0.0;
        }
        let overrides = [(placement.lecture(), Some(placement))];
        let after = View {
            model,
            values: Some(values),
            overrides: &overrides,
            conflicts: None,
        };
        self.violations_to_preference(self.nr_violations(after, None))
            - self.current_preference(model, values)
    }

    pub(crate) fn create_context(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        criteria: &mut Criteria,
    ) -> FlexibleContext {
        let state = match self.kind {
            FlexibleKind::MaxBreaks { .. } => FlexibleState::Breaks {
                weak: HashMap::default(),
            },
            FlexibleKind::MaxHoles { .. } => FlexibleState::Holes {
                allowed: HashMap::default(),
            },
            FlexibleKind::MaxBlock { .. } | FlexibleKind::Break { .. } => FlexibleState::Daily,
            _ => FlexibleState::Buckets(self.bucket_table(View {
                model,
                values: Some(values),
                overrides: &[],
                conflicts: None,
            })),
        };
        let mut context = FlexibleContext {
            last_preference: 0.0,
            state,
        };
        self.update_criterion(model, values, &mut context, criteria);
        context
    }

    fn update_criterion(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        context: &mut FlexibleContext,
        criteria: &mut Criteria,
    ) {
        if self.is_hard() {
            return;
        }
        let view = View {
            model,
            values: Some(values),
            overrides: &[],
            conflicts: None,
        };
        let table = match &context.state {
            FlexibleState::Buckets(table) => Some(table),
            _ => None,
        };
        let violations = self.nr_violations(view, table);
        criteria.inc(CriterionKind::FlexibleConstraint, -context.last_preference);
        context.last_preference =
            self.violations_to_preference(violations) + self.preference.abs() as f64;
        criteria.inc(CriterionKind::FlexibleConstraint, context.last_preference);
    }

    pub(crate) fn assigned(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        context: &mut FlexibleContext,
        criteria: &mut Criteria,
        placement: &Placement,
    ) {
        match &mut context.state {
            FlexibleState::Breaks { weak } => {
                let _ = weak.remove(&placement.lecture());
            }
            FlexibleState::Holes { .. } | FlexibleState::Daily => {}
            FlexibleState::Buckets(table) => self.add_to_buckets(model, table, placement),
        }
        self.update_criterion(model, values, context, criteria);
    }

    pub(crate) fn unassigned(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        context: &mut FlexibleContext,
        criteria: &mut Criteria,
        placement: &Placement,
    ) {
        if let FlexibleState::Buckets(table) = &mut context.state {
            Self::remove_from_buckets(table, placement.lecture());
        }
        self.update_criterion(model, values, context, criteria);
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
        let context = Self::context_of(assignment, id);
        let values = assignment.values();
        match (self.kind, &context.state) {
            (
                FlexibleKind::MaxBreaks {
                    max_blocks,
                    max_gap,
                },
                FlexibleState::Breaks { weak },
            ) => {
                if self.is_weakened(values, weak, placement) {
                    return;
                }
                self.evict_blocks(model, values, placement, max_blocks, max_gap, conflicts, random);
            }
            (FlexibleKind::MaxHoles { max_holes }, FlexibleState::Holes { allowed }) => {
                self.evict_holes(model, values, placement, max_holes, allowed, conflicts, random);
            }
            (
                FlexibleKind::MaxBlock {
                    max_length,
                    max_gap,
                },
                FlexibleState::Daily,
            ) => {
                self.evict_long_blocks(model, values, placement, max_length, max_gap, conflicts, random);
            }
            (FlexibleKind::Break { start, end, length }, FlexibleState::Daily) => {
                self.evict_for_break(model, values, placement, (start, end, length), conflicts, random);
            }
            (_, FlexibleState::Buckets(table)) => {
                self.evict_buckets(model, values, table, placement, conflicts, random);
            }
            _ => unreachable!("the state of a flexible context matches its kind"),
        }
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
        let context = Self::context_of(assignment, id);
        let values = assignment.values();
        match (self.kind, &context.state) {
            (
                FlexibleKind::MaxBreaks {
                    max_blocks,
                    max_gap,
                },
                FlexibleState::Breaks { weak },
            ) => {
                !self.is_weakened(values, weak, placement)
                    && self.exceeds_blocks(model, values, placement, max_blocks, max_gap)
            }
            (FlexibleKind::MaxHoles { max_holes }, FlexibleState::Holes { allowed }) => {
                self.exceeds_holes(model, values, placement, max_holes, allowed)
            }
            (
                FlexibleKind::MaxBlock {
                    max_length,
                    max_gap,
                },
                FlexibleState::Daily,
            ) => self.exceeds_max_block(model, values, placement, max_length, max_gap),
            (FlexibleKind::Break { start, end, length }, FlexibleState::Daily) => {
                self.blocks_break(model, values, placement, (start, end, length))
            }
            (_, FlexibleState::Buckets(table)) => {
                self.buckets_measure(model, table, Some(placement), &HashSet::default())
                    > self.bucket_limit()
            }
            _ => unreachable!("the state of a flexible context matches its kind"),
        }
    }

    /// Whether the two placements can be assigned together.
    pub fn is_consistent(&self, model: &TimetableModel, first: &Placement, second: &Placement) -> bool {
        if !self.is_hard() || !self.kind.uses_buckets() {
            return true;
        }
        let overrides = [
            (first.lecture(), Some(first)),
            (second.lecture(), Some(second)),
        ];
        let table = self.bucket_table(View {
            model,
            values: None,
            overrides: &overrides,
            conflicts: None,
        });
        self.buckets_measure(model, &table, None, &HashSet::default()) <= self.bucket_limit()
    }

    /// Allows `placement` to break the limit of the constraint.
    pub(crate) fn weaken_for(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        context: &mut FlexibleContext,
        placement: &Placement,
    ) {
        if !self.is_hard() {
            return;
        }
        match (self.kind, &mut context.state) {
            (FlexibleKind::MaxBreaks { .. }, FlexibleState::Breaks { weak }) => {
                debug!("{self}: allowing {placement} to break the limit");
                let _ = weak.insert(placement.lecture(), placement.id());
            }
            (FlexibleKind::MaxHoles { max_holes }, FlexibleState::Holes { allowed }) => {
                self.raise_allowed_holes(model, values, placement, max_holes, allowed);
            }
            _ => {}
        }
    }

    /// Whether the constraint is satisfied in the current assignment.
    pub fn is_satisfied(&self, model: &TimetableModel, values: &AssignmentValues) -> bool {
        let view = View {
            model,
            values: Some(values),
            overrides: &[],
            conflicts: None,
        };
        self.nr_violations(view, None) == 0.0
    }

    pub(crate) fn context_of(assignment: &Assignment, constraint: ConstraintId) -> &FlexibleContext {
        match assignment.context(constraint) {
            ConstraintContext::Flexible(context) => context,
            _ => unreachable!("a flexible constraint always has a flexible context"),
        }
    }
}

impl std::fmt::Display for FlexibleConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.owner, self.kind.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn references_are_parsed_case_insensitively() {
        assert_eq!(
            FlexibleKind::parse("_MaxBreaks:2:30_").unwrap(),
            FlexibleKind::MaxBreaks {
                max_blocks: 3,
                max_gap: 6
            }
        );
        assert_eq!(
            FlexibleKind::parse("_maxweeks:3:64_").unwrap(),
            FlexibleKind::MaxWeeks {
                max: 3,
                day_code: 64
            }
        );
        assert_eq!(
            FlexibleKind::parse("_MaxHoles:120_").unwrap(),
            FlexibleKind::MaxHoles { max_holes: 24 }
        );
        assert_eq!(
            FlexibleKind::parse("_MaxDays:2_").unwrap(),
            FlexibleKind::MaxDays { max: 2 }
        );
        assert_eq!(
            FlexibleKind::parse("_MaxHalfDays:4_").unwrap(),
            FlexibleKind::MaxHalfDays { max: 4 }
        );
        assert_eq!(
            FlexibleKind::parse("_MaxConsDays:3_").unwrap(),
            FlexibleKind::MaxConsecutiveDays { max: 3 }
        );
        assert_eq!(
            FlexibleKind::parse("_MaxBlock:120:10_").unwrap(),
            FlexibleKind::MaxBlock {
                max_length: 24,
                max_gap: 2
            }
        );
        assert_eq!(
            FlexibleKind::parse("_Break:132:162:30_").unwrap(),
            FlexibleKind::Break {
                start: 132,
                end: 162,
                length: 6
            }
        );
    }

    #[test]
    fn a_break_is_not_mistaken_for_max_breaks() {
        assert!(matches!(
            FlexibleKind::parse("_MaxBreaks:1:30_").unwrap(),
            FlexibleKind::MaxBreaks { .. }
        ));
        assert!(matches!(
            FlexibleKind::parse("_break:132:162:30_").unwrap(),
            FlexibleKind::Break { .. }
        ));
        assert!(FlexibleKind::parse("_Break:132:162_").is_err());
    }

    #[test]
    fn unknown_references_are_rejected() {
        assert!(matches!(
            FlexibleKind::parse("_MaxLunches:2_"),
            Err(ReferenceError::UnknownFlexibleConstraint(_))
        ));
        assert!(FlexibleKind::parse("MaxDays:2").is_err());
    }

    #[test]
    fn options_are_read_from_properties() {
        let properties = Properties::default()
            .set("FlexibleConstraint.CheckWeeks", true)
            .set("General.HalfDaySlot", 150);
        let options = FlexibleOptions::from_properties(&properties).unwrap();
        assert!(options.check_weeks);
        assert!(!options.precise_date_computation);
        assert_eq!(options.half_day_slot, 150);
    }
}
