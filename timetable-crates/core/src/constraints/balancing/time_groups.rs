use log::debug;

use super::count_unassignment;
use crate::containers::HashSet;
use crate::engine::Assignment;
use crate::engine::AssignmentValues;
use crate::engine::ConflictSet;
use crate::engine::ConstraintContext;
use crate::engine::ConstraintId;
use crate::model::LectureId;
use crate::model::Placement;
use crate::model::PlacementId;
use crate::model::TimeLocation;
use crate::model::TimetableModel;
use crate::model::DAY_CODES;
use crate::model::DAY_CODE_ALL;
use crate::model::SLOT_LENGTH_MIN;

/// A block of the day (on some days of the week) used by a
/// [`MinimizeTimeGroupsConstraint`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupOfTime {
    pub start_slot: i32,
    /// Exclusive.
    pub end_slot: i32,
    pub day_code: u32,
}

impl GroupOfTime {
    pub fn new(start_slot: i32, end_slot: i32, day_code: u32) -> GroupOfTime {
        GroupOfTime {
            start_slot,
            end_slot,
            day_code,
        }
    }

    /// The number of slots of the group over the week.
    pub fn size(&self) -> i32 {
        let nr_days = DAY_CODES
            .iter()
            .filter(|&&day| self.day_code & day != 0)
            .count() as i32;
        (self.end_slot - self.start_slot) * nr_days
    }

    pub fn overlaps(&self, time: &TimeLocation) -> bool {
        if time.day_code() & self.day_code == 0 {
            return false;
        }
        let end = self.end_slot.min(time.start_slot() + time.length());
        let start = self.start_slot.max(time.start_slot());
        end > start
    }
}

fn time_to_slot(hour: i32, minute: i32) -> i32 {
    (hour * 60 + minute) / SLOT_LENGTH_MIN
}

/// The divisions of the day between 7:30 and 17:30 into blocks of equal length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeGroupsPreset {
    /// Two blocks of five hours.
    TwoOfFiveHours,
    /// 7:30 to 10:30, 10:30 to 14:30 and 14:30 to 17:30.
    ThreeOfThreeHours,
    FiveOfTwoHours,
    TenOfOneHour,
}

impl TimeGroupsPreset {
    pub fn name(&self) -> &'static str {
        match self {
            TimeGroupsPreset::TwoOfFiveHours => "2x5h",
            TimeGroupsPreset::ThreeOfThreeHours => "3x3h",
            TimeGroupsPreset::FiveOfTwoHours => "5x2h",
            TimeGroupsPreset::TenOfOneHour => "10x1h",
        }
    }

    pub fn groups(&self) -> Vec<GroupOfTime> {
        let boundaries: &[(i32, i32)] = match self {
            TimeGroupsPreset::TwoOfFiveHours => &[(7, 30), (12, 30), (17, 30)],
            TimeGroupsPreset::ThreeOfThreeHours => &[(7, 30), (10, 30), (14, 30), (17, 30)],
            TimeGroupsPreset::FiveOfTwoHours => {
                &[(7, 30), (9, 30), (11, 30), (13, 30), (15, 30), (17, 30)]
            }
            TimeGroupsPreset::TenOfOneHour => &[
                (7, 30),
                (8, 30),
                (9, 30),
                (10, 30),
                (11, 30),
                (12, 30),
                (13, 30),
                (14, 30),
                (15, 30),
                (16, 30),
                (17, 30),
            ],
        };
        boundaries
            .windows(2)
            .map(|window| {
                GroupOfTime::new(
                    time_to_slot(window[0].0, window[0].1),
                    time_to_slot(window[1].0, window[1].1),
                    DAY_CODE_ALL,
                )
            })
            .collect()
    }
}

/// Keeps the lectures in as few groups of time as possible.
#[derive(Clone, Debug)]
pub struct MinimizeTimeGroupsConstraint {
    pub(crate) name: String,
    pub(crate) groups: Vec<GroupOfTime>,
    pub(crate) unassignments_to_weaken: u64,
    pub(crate) lectures: Vec<LectureId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MinimizeTimeGroupsContext {
    usage: Vec<HashSet<PlacementId>>,
    limit: usize,
    unassignments: u64,
}

impl MinimizeTimeGroupsContext {
    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn current_usage(&self) -> usize {
        self.usage.iter().filter(|usage| !usage.is_empty()).count()
    }
}

impl MinimizeTimeGroupsConstraint {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn groups(&self) -> &[GroupOfTime] {
        &self.groups
    }

    pub fn lectures(&self) -> &[LectureId] {
        &self.lectures
    }

    pub fn is_hard(&self) -> bool {
        self.unassignments_to_weaken > 0
    }

    /// The number of groups needed to fit the lectures, and at least the number of groups the
    /// most compact time of any lecture overlaps.
    pub fn estimate_limit(&self, model: &TimetableModel) -> usize {
        let Some(first_group) = self.groups.first() else {
            return 0;
        };
        let mut nr_slots_used = 0;
        let mut min_groups_used: Option<usize> = None;
        for &lecture in &self.lectures {
            let times = model.lecture(lecture).time_locations();
            if let Some(first) = times.first() {
                nr_slots_used += first.length() as usize * first.nr_meetings();
            }
            let min_this_lecture = times
                .iter()
                .map(|time| self.groups.iter().filter(|group| group.overlaps(time)).count())
                .min();
            if let Some(min_this_lecture) = min_this_lecture {
                min_groups_used =
                    Some(min_groups_used.map_or(min_this_lecture, |min| min.min(min_this_lecture)));
            }
        }
        let by_size = (nr_slots_used as f64 / first_group.size().max(1) as f64).ceil() as usize;
        by_size.max(1).max(min_groups_used.unwrap_or(0))
    }

    pub(crate) fn create_context(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
    ) -> MinimizeTimeGroupsContext {
        let mut context = MinimizeTimeGroupsContext {
            usage: vec![HashSet::default(); self.groups.len()],
            limit: 0,
            unassignments: 0,
        };
        for &lecture in &self.lectures {
            if let Some(placement) = values.placement(model, lecture) {
                self.assigned(&mut context, placement);
            }
        }
        context.limit = context.current_usage().max(self.estimate_limit(model));
        context
    }

    pub(crate) fn assigned(&self, context: &mut MinimizeTimeGroupsContext, placement: &Placement) {
        for (group, usage) in self.groups.iter().zip(&mut context.usage) {
            if group.overlaps(placement.time()) {
                let _ = usage.insert(placement.id());
            }
        }
    }

    pub(crate) fn unassigned(&self, context: &mut MinimizeTimeGroupsContext, placement: &Placement) {
        for (group, usage) in self.groups.iter().zip(&mut context.usage) {
            if group.overlaps(placement.time()) {
                let _ = usage.remove(&placement.id());
            }
        }
    }

    /// By how many groups the limit would be exceeded if `placement` replaced the current
    /// placement of its lecture.
    pub fn over_limit(
        &self,
        model: &TimetableModel,
        context: &MinimizeTimeGroupsContext,
        placement: &Placement,
    ) -> usize {
        if !self.is_hard() || model.lecture(placement.lecture()).is_committed() {
            return 0;
        }
        let usage = self
            .groups
            .iter()
            .zip(&context.usage)
            .filter(|(group, usage)| {
                group.overlaps(placement.time())
                    || usage.iter().any(|other| other.lecture != placement.lecture())
            })
            .count();
        usage.saturating_sub(context.limit)
    }

    pub(crate) fn compute_conflicts(
        &self,
        id: ConstraintId,
        model: &TimetableModel,
        assignment: &Assignment,
        placement: &Placement,
        conflicts: &mut ConflictSet,
    ) {
        let context = Self::context_of(assignment, id);
        let over = self.over_limit(model, context, placement);
        if over == 0 {
            return;
        }

        let mut adepts: Vec<(usize, Vec<PlacementId>)> = self
            .groups
            .iter()
            .zip(&context.usage)
            .enumerate()
            .filter(|(_, (group, usage))| !group.overlaps(placement.time()) && !usage.is_empty())
            .filter(|(_, (_, usage))| {
                usage
                    .iter()
                    .all(|other| !model.lecture(other.lecture).is_committed())
            })
            .map(|(index, (_, usage))| {
                let placements = usage
                    .iter()
                    .filter(|&&other| other.lecture != placement.lecture() && !conflicts.contains(&other))
                    .copied()
                    .collect();
                (index, placements)
            })
            .collect();

        if adepts.len() < over {
            let _ = conflicts.insert(placement.id());
            return;
        }
        adepts.sort_by_key(|(index, placements)| (placements.len(), *index));
        for (_, placements) in adepts.into_iter().take(over) {
            conflicts.extend(placements);
        }
    }

    pub(crate) fn in_conflict(
        &self,
        id: ConstraintId,
        model: &TimetableModel,
        assignment: &Assignment,
        placement: &Placement,
    ) -> bool {
        self.over_limit(model, Self::context_of(assignment, id), placement) > 0
    }

    pub(crate) fn weaken(&self, context: &mut MinimizeTimeGroupsContext) {
        if count_unassignment(&mut context.unassignments, self.unassignments_to_weaken) {
            context.limit += 1;
            debug!("{self}: limit raised to {}", context.limit);
        }
    }

    pub(crate) fn weaken_for(
        &self,
        model: &TimetableModel,
        context: &mut MinimizeTimeGroupsContext,
        placement: &Placement,
    ) {
        let over = self.over_limit(model, context, placement);
        if over > 0 {
            context.limit += over;
            debug!("{self}: limit raised to {} for {placement}", context.limit);
        }
    }

    pub(crate) fn context_of(assignment: &Assignment, constraint: ConstraintId) -> &MinimizeTimeGroupsContext {
        match assignment.context(constraint) {
            ConstraintContext::MinimizeTimeGroups(context) => context,
            _ => unreachable!("a minimize time groups constraint always has its own context"),
        }
    }
}

impl std::fmt::Display for MinimizeTimeGroupsConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MIN_GRUSE({})", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::TestRandom;
    use crate::model::LectureSpec;
    use crate::model::ModelBuilder;

    #[test]
    fn presets_cover_the_day_from_half_past_seven() {
        let groups = TimeGroupsPreset::ThreeOfThreeHours.groups();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].start_slot, 90);
        assert_eq!(groups[1].start_slot, 126);
        assert_eq!(groups[2].end_slot, 210);
        assert_eq!(TimeGroupsPreset::TenOfOneHour.groups().len(), 10);
        assert_eq!(TimeGroupsPreset::TwoOfFiveHours.groups()[0].size(), 60 * 7);
    }

    #[test]
    fn a_time_overlaps_a_group_only_on_shared_days() {
        let group = GroupOfTime::new(90, 150, DAY_CODES[0]);
        assert!(group.overlaps(&TimeLocation::new(DAY_CODES[0], 140, 12)));
        assert!(!group.overlaps(&TimeLocation::new(DAY_CODES[1], 140, 12)));
        assert!(!group.overlaps(&TimeLocation::new(DAY_CODES[0], 150, 12)));
    }

    /// Two lectures, each either in the morning or in the afternoon.
    fn two_groups_model() -> TimetableModel {
        let morning = TimeLocation::new(DAY_CODES[0], 96, 12);
        let afternoon = TimeLocation::new(DAY_CODES[0], 160, 12);
        let mut builder = ModelBuilder::default();
        for class_id in 1..=2 {
            builder = builder.with_lecture(
                LectureSpec::new(class_id, format!("L{class_id}"))
                    .with_nr_rooms(0)
                    .with_placement(morning.clone(), vec![])
                    .with_placement(afternoon.clone(), vec![]),
            );
        }
        builder
            .with_minimize_time_groups(TimeGroupsPreset::TwoOfFiveHours, &[1, 2])
            .build()
            .unwrap()
    }

    #[test]
    fn a_second_group_evicts_the_lectures_of_the_first() {
        let model = two_groups_model();
        let (id, constraint) = model
            .constraint_ids()
            .find_map(|id| model.minimize_time_groups_constraint(id).map(|c| (id, c)))
            .unwrap();
        let mut assignment = model.create_assignment();
        assert_eq!(MinimizeTimeGroupsConstraint::context_of(&assignment, id).limit(), 1);

        let mut lectures = model.lecture_ids();
        let first = lectures.next().unwrap();
        let second = lectures.next().unwrap();
        let mut random = TestRandom::default();
        let morning = PlacementId {
            lecture: first,
            index: 0,
        };
        let _ = assignment.assign(&model, morning, &mut random);

        let also_morning = model.placement(PlacementId {
            lecture: second,
            index: 0,
        });
        assert!(!constraint.in_conflict(id, &model, &assignment, also_morning));

        let afternoon = model.placement(PlacementId {
            lecture: second,
            index: 1,
        });
        let mut conflicts = ConflictSet::default();
        constraint.compute_conflicts(id, &model, &assignment, afternoon, &mut conflicts);
        assert_eq!(conflicts.into_iter().collect::<Vec<_>>(), vec![morning]);

        // the first lecture may move on its own
        let moved = model.placement(PlacementId {
            lecture: first,
            index: 1,
        });
        assert!(!constraint.in_conflict(id, &model, &assignment, moved));
    }
}
