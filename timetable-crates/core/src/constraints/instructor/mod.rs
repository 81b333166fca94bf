mod fairness;
mod lunch_break;

pub use fairness::InstructorFairness;
pub use fairness::InstructorFairnessContext;
pub use lunch_break::LunchBreak;

use super::slot_resource::SLOTS_PER_WEEK;
use super::SlotResource;
use crate::basic_types::Properties;
use crate::basic_types::PropertyError;
use crate::basic_types::preference::LEVEL_DISCOURAGED;
use crate::basic_types::preference::LEVEL_NEUTRAL;
use crate::basic_types::preference::LEVEL_PROHIBITED;
use crate::basic_types::preference::LEVEL_STRONGLY_DISCOURAGED;
use crate::containers::HashSet;
use crate::engine::Assignment;
use crate::engine::AssignmentValues;
use crate::engine::ConflictSet;
use crate::engine::ConstraintContext;
use crate::engine::ConstraintId;
use crate::engine::CriterionKind;
use crate::engine::Criteria;
use crate::model::rooms_distance_in_meters;
use crate::model::rooms_distance_in_minutes;
use crate::model::DistanceMetric;
use crate::model::LectureId;
use crate::model::Placement;
use crate::model::PlacementId;
use crate::model::RoomLocation;
use crate::model::TimeLocation;
use crate::model::TimetableModel;
use crate::model::NR_DAYS;
use crate::model::SLOTS_PER_DAY;
use crate::model::SLOT_LENGTH_MIN;

/// The optional instructor criteria, enabled by listing them in `General.AdditionalCriteria`
/// (separated by semicolons, e.g. `InstructorLunchBreak;InstructorFairness`).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InstructorOptions {
    /// Penalise instructors who teach through the lunch break.
    pub lunch_break: Option<LunchBreak>,
    /// Spread the time preferences evenly over the instructors.
    pub fairness: bool,
}

impl InstructorOptions {
    pub fn from_properties(properties: &Properties) -> Result<InstructorOptions, PropertyError> {
        let criteria = properties.get_string("General.AdditionalCriteria", "");
        let enabled = |name: &str| {
            criteria
                .split([';', ','])
                .filter_map(|criterion| criterion.trim().rsplit('.').next())
                .any(|criterion| criterion == name)
        };
        Ok(InstructorOptions {
            lunch_break: enabled("InstructorLunchBreak")
                .then(|| LunchBreak::from_properties(properties))
                .transpose()?,
            fairness: enabled("InstructorFairness"),
        })
    }
}

/// A time at which an instructor cannot teach, optionally in the given rooms (e.g. a class taught
/// outside of the problem being solved).
#[derive(Clone, Debug)]
pub struct InstructorUnavailability {
    pub time: TimeLocation,
    pub rooms: Vec<RoomLocation>,
}

/// Something which takes place at a time in some rooms.
#[derive(Clone, Copy)]
struct Meeting<'a> {
    time: &'a TimeLocation,
    rooms: &'a [RoomLocation],
}

impl<'a> From<&'a Placement> for Meeting<'a> {
    fn from(placement: &'a Placement) -> Self {
        Meeting {
            time: placement.time(),
            rooms: placement.rooms(),
        }
    }
}

impl<'a> From<&'a InstructorUnavailability> for Meeting<'a> {
    fn from(unavailability: &'a InstructorUnavailability) -> Self {
        Meeting {
            time: &unavailability.time,
            rooms: &unavailability.rooms,
        }
    }
}

impl<'a> Meeting<'a> {
    fn meters_to(&self, metric: &DistanceMetric, other: &Meeting<'_>) -> f64 {
        rooms_distance_in_meters(metric, self.rooms, other.rooms)
    }

    fn minutes_to(&self, metric: &DistanceMetric, other: &Meeting<'_>) -> i32 {
        rooms_distance_in_minutes(metric, self.rooms, other.rooms)
    }

    fn is_back_to_back(&self, other: &Meeting<'_>) -> bool {
        self.time.end_slot() == other.time.start_slot() || other.time.end_slot() == self.time.start_slot()
    }

    /// Returns the two meetings ordered in time, together with the gap between them in minutes,
    /// if one of them ends strictly before the other one starts.
    fn ordered_with_gap(self, other: Meeting<'a>) -> Option<(Meeting<'a>, Meeting<'a>, i32)> {
        if self.time.end_slot() < other.time.start_slot() {
            let gap = SLOT_LENGTH_MIN * (other.time.start_slot() - self.time.end_slot());
            Some((self, other, gap))
        } else if other.time.end_slot() < self.time.start_slot() {
            let gap = SLOT_LENGTH_MIN * (self.time.start_slot() - other.time.end_slot());
            Some((other, self, gap))
        } else {
            None
        }
    }

    fn shares_days_and_weeks(&self, other: &Meeting<'_>) -> bool {
        self.time.share_days(other.time) && self.time.share_weeks(other.time)
    }
}

/// Ensures that an instructor teaches at most one class at a time and penalises (or prohibits)
/// classes which follow each other in distant buildings.
///
/// A soft instructor never causes conflicts; instead, the number of its classes which would be in
/// conflict is counted by [`CriterionKind::InstructorConflict`].
#[derive(Clone, Debug)]
pub struct InstructorConstraint {
    pub(crate) resource_id: u64,
    pub(crate) name: String,
    pub(crate) ignore_distances: bool,
    pub(crate) soft: bool,
    pub(crate) unavailabilities: Vec<InstructorUnavailability>,
    pub(crate) lectures: Vec<LectureId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InstructorContext {
    resource: SlotResource,
    preference: i32,
    /// Classes in conflict; always zero for a hard instructor.
    conflicts: u32,
    /// Per day of the week, the number of weeks in which the lunch break is missed.
    lunch_violations: [u32; NR_DAYS],
    lunch_penalty: f64,
}

impl InstructorContext {
    pub fn placements(&self, slot: usize) -> &[PlacementId] {
        self.resource.placements(slot)
    }

    /// The back-to-back distance preference of the instructor.
    pub fn preference(&self) -> i32 {
        self.preference
    }

    pub fn conflicts(&self) -> u32 {
        self.conflicts
    }

    pub fn lunch_violations(&self) -> &[u32; NR_DAYS] {
        &self.lunch_violations
    }

    pub fn lunch_penalty(&self) -> f64 {
        self.lunch_penalty
    }
}

impl InstructorConstraint {
    pub fn resource_id(&self) -> u64 {
        self.resource_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ignore_distances(&self) -> bool {
        self.ignore_distances
    }

    pub fn is_soft(&self) -> bool {
        self.soft
    }

    pub fn unavailabilities(&self) -> &[InstructorUnavailability] {
        &self.unavailabilities
    }

    /// The largest preference the instructor can have.
    pub fn worst_preference(&self) -> i32 {
        LEVEL_STRONGLY_DISCOURAGED * (self.lectures.len() as i32 - 1)
    }

    /// Whether the lecture can be taught at `placement` given the unavailabilities of the
    /// instructor.
    pub fn is_available(&self, metric: &DistanceMetric, placement: &Placement) -> bool {
        let meeting = Meeting::from(placement);
        for unavailability in &self.unavailabilities {
            let other = Meeting::from(unavailability);
            if other.time.has_intersection(meeting.time) {
                return false;
            }
            if self.ignore_distances || !meeting.shares_days_and_weeks(&other) {
                continue;
            }
            if meeting.is_back_to_back(&other) {
                if meeting.meters_to(metric, &other) > metric.instructor_prohibited_limit() {
                    return false;
                }
            } else if metric.compute_distance_conflicts_between_non_btb_classes() {
                if let Some((first, second, gap)) = meeting.ordered_with_gap(other) {
                    if first.minutes_to(metric, &second) > first.time.break_time() + gap {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// The distance preference between two placements of the instructor.
    pub fn distance_preference(&self, metric: &DistanceMetric, first: &Placement, second: &Placement) -> i32 {
        self.meeting_preference(metric, first.into(), second.into())
    }

    fn meeting_preference(&self, metric: &DistanceMetric, first: Meeting<'_>, second: Meeting<'_>) -> i32 {
        if !first.shares_days_and_weeks(&second) {
            return LEVEL_NEUTRAL;
        }
        if first.is_back_to_back(&second) {
            let distance = first.meters_to(metric, &second);
            if distance <= metric.instructor_no_preference_limit() {
                return LEVEL_NEUTRAL;
            }
            if distance <= metric.instructor_discouraged_limit() {
                return LEVEL_DISCOURAGED;
            }
            if self.ignore_distances || distance <= metric.instructor_prohibited_limit() {
                return LEVEL_STRONGLY_DISCOURAGED;
            }
            return LEVEL_PROHIBITED;
        }
        if metric.compute_distance_conflicts_between_non_btb_classes() {
            if let Some((before, after, gap)) = first.ordered_with_gap(second) {
                let minutes = before.minutes_to(metric, &after);
                if minutes > before.time.break_time() + gap {
                    return self.too_far_preference();
                }
                if minutes as f64 >= metric.instructor_long_travel_in_minutes() {
                    return LEVEL_STRONGLY_DISCOURAGED;
                }
                if minutes > gap {
                    return LEVEL_DISCOURAGED;
                }
            }
        }
        LEVEL_NEUTRAL
    }

    fn too_far_preference(&self) -> i32 {
        if self.ignore_distances {
            LEVEL_STRONGLY_DISCOURAGED
        } else {
            LEVEL_PROHIBITED
        }
    }

    /// Whether the two placements can be taught by the instructor; always true when soft.
    pub fn is_consistent(&self, model: &TimetableModel, first: &Placement, second: &Placement) -> bool {
        if self.soft {
            return true;
        }
        if model
            .lecture(first.lecture())
            .can_share_room_with(second.lecture())
            && first.same_rooms(second)
        {
            return true;
        }
        if first.time().has_intersection(second.time()) {
            return false;
        }
        self.distance_preference(model.distance_metric(), first, second) != LEVEL_PROHIBITED
    }

    pub(crate) fn create_context(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        criteria: &mut Criteria,
    ) -> InstructorContext {
        let mut context = InstructorContext {
            resource: SlotResource::default(),
            preference: 0,
            conflicts: 0,
            lunch_violations: [0; NR_DAYS],
            lunch_penalty: 0.0,
        };
        for &lecture in &self.lectures {
            if let Some(placement) = values.placement(model, lecture) {
                context.resource.add(placement);
            }
        }
        context.preference = self.count_preference(model, values, &context);
        criteria.inc(
            CriterionKind::BackToBackInstructorPreferences,
            context.preference as f64,
        );
        if self.soft {
            context.conflicts = self.count_conflicts(model, values, &context);
            criteria.inc(CriterionKind::InstructorConflict, context.conflicts as f64);
        }
        if let Some(lunch) = model.instructor_options().lunch_break {
            for day in 0..NR_DAYS {
                context.lunch_violations[day] = lunch.day_violations(model, &context.resource, day);
            }
            context.lunch_penalty = lunch.penalty(&context.lunch_violations);
            criteria.inc(CriterionKind::InstructorLunchBreak, context.lunch_penalty);
        }
        context
    }

    pub(crate) fn assigned(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        context: &mut InstructorContext,
        criteria: &mut Criteria,
        placement: &Placement,
    ) {
        context.resource.add(placement);
        self.update_criteria(model, values, context, criteria, placement);
    }

    pub(crate) fn unassigned(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        context: &mut InstructorContext,
        criteria: &mut Criteria,
        placement: &Placement,
    ) {
        context.resource.remove(placement);
        self.update_criteria(model, values, context, criteria, placement);
    }

    fn update_criteria(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        context: &mut InstructorContext,
        criteria: &mut Criteria,
        placement: &Placement,
    ) {
        let kind = CriterionKind::BackToBackInstructorPreferences;
        criteria.inc(kind, -(context.preference as f64));
        context.preference = self.count_preference(model, values, context);
        criteria.inc(kind, context.preference as f64);

        if self.soft {
            let kind = CriterionKind::InstructorConflict;
            criteria.inc(kind, -(context.conflicts as f64));
            context.conflicts = self.count_conflicts(model, values, context);
            criteria.inc(kind, context.conflicts as f64);
        }

        if let Some(lunch) = model.instructor_options().lunch_break {
            if lunch.touches(placement.time()) {
                for day in placement.time().days() {
                    context.lunch_violations[day] =
                        lunch.day_violations(model, &context.resource, day);
                }
                let kind = CriterionKind::InstructorLunchBreak;
                criteria.inc(kind, -context.lunch_penalty);
                context.lunch_penalty = lunch.penalty(&context.lunch_violations);
                criteria.inc(kind, context.lunch_penalty);
            }
        }
    }

    /// The number of assigned classes of a soft instructor which are in conflict.
    fn count_conflicts(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        context: &InstructorContext,
    ) -> u32 {
        self.lectures
            .iter()
            .filter_map(|&lecture| values.placement(model, lecture))
            .filter(|placement| self.is_conflicting(model, values, context, placement))
            .count() as u32
    }

    /// Whether `placement` is unavailable or clashes with another class of the instructor.
    fn is_conflicting(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        context: &InstructorContext,
        placement: &Placement,
    ) -> bool {
        !self.is_available(model.distance_metric(), placement)
            || self.visit_conflicts_in(model, values, context, placement, &mut |_| true)
    }

    /// How the instructor criteria would change if `placement` were assigned; for the lunch
    /// break this is the change in the number of missed breaks, not in the penalty.
    pub(crate) fn marginal_criteria(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        context: &InstructorContext,
        placement: &Placement,
        criteria: &mut Criteria,
    ) {
        criteria.inc(
            CriterionKind::BackToBackInstructorPreferences,
            self.preference_of(model, values, context, placement) as f64,
        );
        if self.soft && self.is_conflicting(model, values, context, placement) {
            criteria.inc(CriterionKind::InstructorConflict, 1.0);
        }
        if let Some(lunch) = model.instructor_options().lunch_break {
            if lunch.touches(placement.time()) {
                for day in placement.time().days() {
                    let violations =
                        lunch.day_violations_with(model, &context.resource, day, placement);
                    criteria.inc(
                        CriterionKind::InstructorLunchBreak,
                        violations as f64 - context.lunch_violations[day] as f64,
                    );
                }
            }
        }
    }

    /// Sums the distance preferences of every pair of back-to-back placements of the instructor.
    fn count_preference(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        context: &InstructorContext,
    ) -> i32 {
        let metric = model.distance_metric();
        let mut preference = 0;
        let mut checked: HashSet<(PlacementId, PlacementId)> = HashSet::default();

        for slot in 1..SLOTS_PER_WEEK {
            if slot % SLOTS_PER_DAY as usize == 0 {
                continue;
            }
            for &placement_id in context.placements(slot) {
                let placement = model.placement(placement_id);
                for previous in context
                    .resource
                    .placements_sharing_weeks(model, slot - 1, placement)
                {
                    if previous.lecture() == placement.lecture()
                        || !checked.insert((previous.id(), placement.id()))
                    {
                        continue;
                    }
                    let distance = previous.distance_in_meters(metric, placement);
                    if distance > metric.instructor_discouraged_limit() {
                        preference += LEVEL_STRONGLY_DISCOURAGED;
                    } else if distance > metric.instructor_no_preference_limit() {
                        preference += LEVEL_DISCOURAGED;
                    }
                }
            }
        }

        if metric.compute_distance_conflicts_between_non_btb_classes() {
            for &lecture in &self.lectures {
                let Some(placement) = values.placement(model, lecture) else {
                    continue;
                };
                let meeting = Meeting::from(placement);
                let mut before: Option<Meeting<'_>> = None;
                for &other in &self.lectures {
                    if other == lecture {
                        continue;
                    }
                    let Some(other_placement) = values.placement(model, other) else {
                        continue;
                    };
                    let other_meeting = Meeting::from(other_placement);
                    if !meeting.shares_days_and_weeks(&other_meeting) {
                        continue;
                    }
                    if other_meeting.time.end_slot() < meeting.time.start_slot() {
                        let gap = SLOT_LENGTH_MIN
                            * (meeting.time.start_slot() - other_meeting.time.end_slot());
                        let minutes = meeting.minutes_to(metric, &other_meeting);
                        if minutes > other_meeting.time.break_time() + gap {
                            preference += self.too_far_preference();
                        } else if minutes > gap {
                            preference += LEVEL_DISCOURAGED;
                        }
                    }
                    before = latest_before(before, other_meeting, meeting);
                }
                for unavailability in &self.unavailabilities {
                    let other_meeting = Meeting::from(unavailability);
                    if meeting.shares_days_and_weeks(&other_meeting) {
                        before = latest_before(before, other_meeting, meeting);
                    }
                }
                if before.is_some_and(|before| {
                    before.minutes_to(metric, &meeting) as f64
                        > metric.instructor_long_travel_in_minutes()
                }) {
                    preference += LEVEL_STRONGLY_DISCOURAGED;
                }
            }
        }
        preference
    }

    /// The distance preference the instructor would have with the other assigned placements if
    /// `placement` were assigned.
    pub(crate) fn preference_of(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        context: &InstructorContext,
        placement: &Placement,
    ) -> i32 {
        let metric = model.distance_metric();
        let mut preference = 0;
        let mut checked: HashSet<PlacementId> = HashSet::default();

        for adjacent in self.adjacent_slots(placement) {
            for other in context
                .resource
                .placements_sharing_weeks(model, adjacent, placement)
            {
                if other.lecture() == placement.lecture() || !checked.insert(other.id()) {
                    continue;
                }
                let distance = placement.distance_in_meters(metric, other);
                if distance > metric.instructor_no_preference_limit()
                    && distance <= metric.instructor_discouraged_limit()
                {
                    preference += LEVEL_DISCOURAGED;
                }
                if distance > metric.instructor_discouraged_limit()
                    && (self.ignore_distances || distance <= metric.instructor_prohibited_limit())
                {
                    preference += LEVEL_STRONGLY_DISCOURAGED;
                }
                if !self.ignore_distances && distance > metric.instructor_prohibited_limit() {
                    preference += LEVEL_PROHIBITED;
                }
            }
        }

        if metric.compute_distance_conflicts_between_non_btb_classes() {
            let meeting = Meeting::from(placement);
            let mut before: Option<Meeting<'_>> = None;
            let mut after: Option<Meeting<'_>> = None;
            for &other in &self.lectures {
                if other == placement.lecture() {
                    continue;
                }
                let Some(other_placement) = values.placement(model, other) else {
                    continue;
                };
                let other_meeting = Meeting::from(other_placement);
                if !meeting.shares_days_and_weeks(&other_meeting) {
                    continue;
                }
                if let Some((first, second, gap)) = meeting.ordered_with_gap(other_meeting) {
                    let minutes = first.minutes_to(metric, &second);
                    if minutes > first.time.break_time() + gap {
                        preference += self.too_far_preference();
                    } else if minutes > gap {
                        preference += LEVEL_DISCOURAGED;
                    }
                }
                before = latest_before(before, other_meeting, meeting);
                after = earliest_after(after, other_meeting, meeting);
            }
            for unavailability in &self.unavailabilities {
                let other_meeting = Meeting::from(unavailability);
                if meeting.shares_days_and_weeks(&other_meeting) {
                    before = latest_before(before, other_meeting, meeting);
                    after = earliest_after(after, other_meeting, meeting);
                }
            }
            let long_travel = |first: &Meeting<'_>, second: &Meeting<'_>| {
                first.minutes_to(metric, second) as f64 > metric.instructor_long_travel_in_minutes()
            };
            if before.is_some_and(|before| long_travel(&before, &meeting)) {
                preference += LEVEL_STRONGLY_DISCOURAGED;
            }
            if after.is_some_and(|after| long_travel(&after, &meeting)) {
                preference += LEVEL_STRONGLY_DISCOURAGED;
            }
            if let (Some(before), Some(after)) = (before, after) {
                if long_travel(&before, &after) {
                    preference -= LEVEL_STRONGLY_DISCOURAGED;
                }
            }
        }
        preference
    }

    /// The slots just before and just after each meeting of the placement, on the same day.
    fn adjacent_slots<'a>(&self, placement: &'a Placement) -> impl Iterator<Item = usize> + 'a {
        let length = placement.time().length() as usize;
        let day_slots = SLOTS_PER_DAY as usize;
        placement.time().start_slots().flat_map(move |start| {
            let previous = (start > 0 && (start - 1) / day_slots == start / day_slots)
                .then(|| start - 1);
            let next = ((start + length) / day_slots == start / day_slots).then_some(start + length);
            previous.into_iter().chain(next)
        })
    }

    fn context_of(assignment: &Assignment, constraint: ConstraintId) -> &InstructorContext {
        match assignment.context(constraint) {
            ConstraintContext::Instructor(context) => context,
            _ => unreachable!("an instructor constraint always has an instructor context"),
        }
    }

    fn visit_conflicts(
        &self,
        id: ConstraintId,
        model: &TimetableModel,
        assignment: &Assignment,
        placement: &Placement,
        visitor: &mut impl FnMut(PlacementId) -> bool,
    ) -> bool {
        if self.soft {
            return false;
        }
        let context = Self::context_of(assignment, id);
        self.visit_conflicts_in(model, assignment.values(), context, placement, visitor)
    }

    fn visit_conflicts_in(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        context: &InstructorContext,
        placement: &Placement,
        visitor: &mut impl FnMut(PlacementId) -> bool,
    ) -> bool {
        let metric = model.distance_metric();
        let lecture = model.lecture(placement.lecture());
        let current = values.value(placement.lecture());
        let shares = |other: &Placement| {
            lecture.can_share_room_with(other.lecture()) && other.same_rooms(placement)
        };

        for slot in placement.time().slots() {
            for other in context
                .resource
                .placements_sharing_weeks(model, slot, placement)
            {
                if Some(other.id()) == current || shares(other) {
                    continue;
                }
                if visitor(other.id()) {
                    return true;
                }
            }
        }

        if self.ignore_distances {
            return false;
        }

        for adjacent in self.adjacent_slots(placement) {
            for other in context
                .resource
                .placements_sharing_weeks(model, adjacent, placement)
            {
                if other.lecture() == placement.lecture() || shares(other) {
                    continue;
                }
                if placement.distance_in_meters(metric, other) > metric.instructor_prohibited_limit()
                    && visitor(other.id())
                {
                    return true;
                }
            }
        }

        if metric.compute_distance_conflicts_between_non_btb_classes() {
            let meeting = Meeting::from(placement);
            for &other in &self.lectures {
                if other == placement.lecture() {
                    continue;
                }
                let Some(other_placement) = values.placement(model, other) else {
                    continue;
                };
                let other_meeting = Meeting::from(other_placement);
                if !meeting.shares_days_and_weeks(&other_meeting) {
                    continue;
                }
                if let Some((first, second, gap)) = meeting.ordered_with_gap(other_meeting) {
                    if first.minutes_to(metric, &second) > first.time.break_time() + gap
                        && visitor(other_placement.id())
                    {
                        return true;
                    }
                }
            }
        }
        false
    }

    pub(crate) fn compute_conflicts(
        &self,
        id: ConstraintId,
        model: &TimetableModel,
        assignment: &Assignment,
        placement: &Placement,
        conflicts: &mut ConflictSet,
    ) {
        let _ = self.visit_conflicts(id, model, assignment, placement, &mut |conflict| {
            let _ = conflicts.insert(conflict);
            false
        });
    }

    pub(crate) fn in_conflict(
        &self,
        id: ConstraintId,
        model: &TimetableModel,
        assignment: &Assignment,
        placement: &Placement,
    ) -> bool {
        self.visit_conflicts(id, model, assignment, placement, &mut |_| true)
    }

    pub fn lectures(&self) -> &[LectureId] {
        &self.lectures
    }
}

/// Keeps the meeting which ends before `meeting` starts and starts the latest.
fn latest_before<'a>(
    current: Option<Meeting<'a>>,
    candidate: Meeting<'a>,
    meeting: Meeting<'_>,
) -> Option<Meeting<'a>> {
    if candidate.time.end_slot() > meeting.time.start_slot() {
        return current;
    }
    match current {
        Some(current) if current.time.start_slot() >= candidate.time.start_slot() => Some(current),
        _ => Some(candidate),
    }
}

/// Keeps the meeting which starts after `meeting` ends and starts the earliest.
fn earliest_after<'a>(
    current: Option<Meeting<'a>>,
    candidate: Meeting<'a>,
    meeting: Meeting<'_>,
) -> Option<Meeting<'a>> {
    if meeting.time.end_slot() > candidate.time.start_slot() {
        return current;
    }
    match current {
        Some(current) if current.time.start_slot() <= candidate.time.start_slot() => Some(current),
        _ => Some(candidate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::TestRandom;
    use crate::model::InstructorSpec;
    use crate::model::LectureSpec;
    use crate::model::Ellipsoid;
    use crate::model::ModelBuilder;
    use crate::model::DAY_CODES;

    fn instructor_model(distance: f64) -> TimetableModel {
        let near = RoomLocation::new(1, "A", 50).with_coordinates(0.0, 0.0);
        let far = RoomLocation::new(2, "B", 50).with_coordinates(distance, 0.0);
        ModelBuilder::default()
            .with_distance_metric(DistanceMetric::new(Ellipsoid::Legacy))
            .with_lecture(
                LectureSpec::new(1, "L1")
                    .with_class_limit(20, 20)
                    .with_placement(TimeLocation::new(DAY_CODES[0], 96, 12), vec![near.clone()]),
            )
            .with_lecture(
                LectureSpec::new(2, "L2")
                    .with_class_limit(20, 20)
                    .with_placement(TimeLocation::new(DAY_CODES[0], 96, 12), vec![near.clone()])
                    .with_placement(TimeLocation::new(DAY_CODES[0], 108, 12), vec![near])
                    .with_placement(TimeLocation::new(DAY_CODES[0], 108, 12), vec![far]),
            )
            .with_instructor(InstructorSpec::new(7, "Smith").with_lectures(&[1, 2]))
            .build()
            .unwrap()
    }

    fn instructor_of(model: &TimetableModel) -> (ConstraintId, &InstructorConstraint) {
        model
            .constraint_ids()
            .find_map(|id| model.instructor_constraint(id).map(|ic| (id, ic)))
            .unwrap()
    }

    #[test]
    fn the_same_time_is_a_conflict_and_a_different_time_is_not() {
        let model = instructor_model(0.0);
        let mut assignment = model.create_assignment();
        let mut random = TestRandom::default();
        let ids = model.lecture_ids().collect::<Vec<_>>();
        let _ = assignment.assign(&model, PlacementId { lecture: ids[0], index: 0 }, &mut random);
        let (id, instructor) = instructor_of(&model);

        let same_time = model.placement(PlacementId {
            lecture: ids[1],
            index: 0,
        });
        let next_time = model.placement(PlacementId {
            lecture: ids[1],
            index: 1,
        });

        assert!(instructor.in_conflict(id, &model, &assignment, same_time));
        assert!(!instructor.in_conflict(id, &model, &assignment, next_time));
    }

    #[test]
    fn distant_back_to_back_classes_are_prohibited() {
        // legacy coordinates: 30 units exceeds the prohibited limit of 20
        let model = instructor_model(30.0);
        let mut assignment = model.create_assignment();
        let mut random = TestRandom::default();
        let ids = model.lecture_ids().collect::<Vec<_>>();
        let _ = assignment.assign(&model, PlacementId { lecture: ids[0], index: 0 }, &mut random);
        let (id, instructor) = instructor_of(&model);

        let far = model.placement(PlacementId {
            lecture: ids[1],
            index: 2,
        });
        let mut conflicts = ConflictSet::default();
        instructor.compute_conflicts(id, &model, &assignment, far, &mut conflicts);

        assert_eq!(conflicts.len(), 1);
        assert_eq!(
            instructor.distance_preference(
                model.distance_metric(),
                model.placement(PlacementId {
                    lecture: ids[0],
                    index: 0
                }),
                far
            ),
            LEVEL_PROHIBITED
        );
    }

    #[test]
    fn distance_tiers_follow_the_limits() {
        for (distance, expected) in [
            (0.0, LEVEL_NEUTRAL),
            (4.0, LEVEL_DISCOURAGED),
            (15.0, LEVEL_STRONGLY_DISCOURAGED),
            (25.0, LEVEL_PROHIBITED),
        ] {
            let model = instructor_model(distance);
            let (_, instructor) = instructor_of(&model);
            let ids = model.lecture_ids().collect::<Vec<_>>();
            let first = model.placement(PlacementId {
                lecture: ids[0],
                index: 0,
            });
            let second = model.placement(PlacementId {
                lecture: ids[1],
                index: 2,
            });

            assert_eq!(
                instructor.distance_preference(model.distance_metric(), first, second),
                expected,
                "distance {distance}"
            );
        }
    }

    #[test]
    fn the_back_to_back_preference_is_maintained_incrementally() {
        let model = instructor_model(15.0);
        let mut assignment = model.create_assignment();
        let mut random = TestRandom::default();
        let ids = model.lecture_ids().collect::<Vec<_>>();
        let _ = assignment.assign(&model, PlacementId { lecture: ids[0], index: 0 }, &mut random);
        let _ = assignment.assign(&model, PlacementId { lecture: ids[1], index: 2 }, &mut random);

        assert_eq!(
            assignment
                .criteria()
                .value(CriterionKind::BackToBackInstructorPreferences),
            LEVEL_STRONGLY_DISCOURAGED as f64
        );

        let _ = assignment.unassign(&model, ids[1]);
        assert_eq!(
            assignment
                .criteria()
                .value(CriterionKind::BackToBackInstructorPreferences),
            0.0
        );
    }

    #[test]
    fn unavailable_times_are_not_available() {
        let model = instructor_model(0.0);
        let (_, instructor) = instructor_of(&model);
        let mut blocked = instructor.clone();
        blocked.unavailabilities.push(InstructorUnavailability {
            time: TimeLocation::new(DAY_CODES[0], 100, 6),
            rooms: vec![],
        });
        let ids = model.lecture_ids().collect::<Vec<_>>();

        assert!(!blocked.is_available(
            model.distance_metric(),
            model.placement(PlacementId {
                lecture: ids[0],
                index: 0
            })
        ));
        assert!(blocked.is_available(
            model.distance_metric(),
            model.placement(PlacementId {
                lecture: ids[1],
                index: 1
            })
        ));
    }

    /// Two classes of a soft instructor who is not available at 9:10 on Mondays.
    fn soft_instructor_model(soft: bool) -> TimetableModel {
        let room = RoomLocation::new(1, "A", 50);
        let mut instructor = InstructorSpec::new(7, "Smith")
            .with_lectures(&[1, 2])
            .with_unavailability(TimeLocation::new(DAY_CODES[0], 110, 4), vec![]);
        if soft {
            instructor = instructor.soft();
        }
        ModelBuilder::default()
            .with_lecture(
                LectureSpec::new(1, "L1")
                    .with_class_limit(20, 20)
                    .with_placement(TimeLocation::new(DAY_CODES[0], 96, 12), vec![room.clone()]),
            )
            .with_lecture(
                LectureSpec::new(2, "L2")
                    .with_class_limit(20, 20)
                    .with_placement(TimeLocation::new(DAY_CODES[0], 96, 12), vec![room.clone()])
                    .with_placement(TimeLocation::new(DAY_CODES[0], 108, 12), vec![room]),
            )
            .with_instructor(instructor)
            .build()
            .unwrap()
    }

    #[test]
    fn a_soft_instructor_counts_overlaps_instead_of_conflicting() {
        let model = soft_instructor_model(true);
        let mut assignment = model.create_assignment();
        let ids = model.lecture_ids().collect::<Vec<_>>();
        let (id, instructor) = instructor_of(&model);
        assert!(!model.constraint(id).is_hard());
        assignment.assign_unchecked(&model, PlacementId { lecture: ids[0], index: 0 });

        let same_time = model.placement(PlacementId {
            lecture: ids[1],
            index: 0,
        });
        assert!(!instructor.in_conflict(id, &model, &assignment, same_time));
        assert_eq!(
            crate::heuristics::TimetableComparator::default()
                .placement_criteria(&model, &assignment, same_time)
                .value(CriterionKind::InstructorConflict),
            1.0
        );

        assignment.assign_unchecked(&model, same_time.id());
        assert_eq!(
            assignment.criteria().value(CriterionKind::InstructorConflict),
            2.0
        );
        assert!(assignment
            .criteria()
            .approx_eq(&assignment.recompute_criteria(&model), 1e-9));

        let _ = assignment.unassign(&model, ids[1]);
        assert_eq!(
            assignment.criteria().value(CriterionKind::InstructorConflict),
            0.0
        );
    }

    #[test]
    fn soft_instructors_keep_their_unavailable_placements() {
        let hard = soft_instructor_model(false);
        let soft = soft_instructor_model(true);
        let lecture: fn(&TimetableModel) -> &crate::model::Lecture = |model| model.lecture(model.lecture_by_class_id(2).unwrap());

        assert_eq!(lecture(&hard).domain().len(), 1);
        assert_eq!(lecture(&soft).domain().len(), 2);

        let mut assignment = soft.create_assignment();
        assignment.assign_unchecked(&soft, PlacementId { lecture: lecture(&soft).id(), index: 1 });
        assert_eq!(
            assignment.criteria().value(CriterionKind::InstructorConflict),
            1.0
        );
    }

    fn lunch_model() -> TimetableModel {
        let room = RoomLocation::new(1, "A", 50);
        ModelBuilder::default()
            .with_properties(
                Properties::default()
                    .set("General.AdditionalCriteria", "InstructorLunchBreak")
                    .set("DatePattern.Default", "1111111"),
            )
            .with_lecture(
                LectureSpec::new(1, "L1")
                    .with_class_limit(20, 20)
                    .with_placement(TimeLocation::new(DAY_CODES[0], 132, 30), vec![room.clone()])
                    .with_placement(TimeLocation::new(DAY_CODES[0], 96, 12), vec![room.clone()]),
            )
            .with_lecture(
                LectureSpec::new(2, "L2")
                    .with_class_limit(20, 20)
                    .with_placement(TimeLocation::new(DAY_CODES[1], 126, 12), vec![room]),
            )
            .with_instructor(InstructorSpec::new(7, "Smith").with_lectures(&[1, 2]))
            .build()
            .unwrap()
    }

    #[test]
    fn teaching_through_lunch_is_penalised_until_unassigned() {
        let model = lunch_model();
        let mut assignment = model.create_assignment();
        let ids = model.lecture_ids().collect::<Vec<_>>();
        let (id, _) = instructor_of(&model);

        assignment.assign_unchecked(&model, PlacementId { lecture: ids[0], index: 0 });
        assert_eq!(
            assignment.criteria().value(CriterionKind::InstructorLunchBreak),
            1.0
        );
        match assignment.context(id) {
            ConstraintContext::Instructor(context) => {
                assert_eq!(context.lunch_violations()[0], 1);
                assert_eq!(context.lunch_violations()[1], 0);
            }
            _ => unreachable!(),
        }

        // 10:30 to 11:30 on Tuesday leaves two hours for lunch
        assignment.assign_unchecked(&model, PlacementId { lecture: ids[1], index: 0 });
        assert_eq!(
            assignment.criteria().value(CriterionKind::InstructorLunchBreak),
            1.0
        );

        let _ = assignment.unassign(&model, ids[0]);
        assert_eq!(
            assignment.criteria().value(CriterionKind::InstructorLunchBreak),
            0.0
        );
        assert!(assignment
            .criteria()
            .approx_eq(&assignment.recompute_criteria(&model), 1e-9));
    }

    #[test]
    fn a_morning_class_keeps_the_lunch_break() {
        let model = lunch_model();
        let assignment = model.create_assignment();
        let ids = model.lecture_ids().collect::<Vec<_>>();
        let comparator = crate::heuristics::TimetableComparator::default();

        let through_lunch = model.placement(PlacementId { lecture: ids[0], index: 0 });
        let morning = model.placement(PlacementId { lecture: ids[0], index: 1 });

        assert_eq!(
            comparator
                .placement_criteria(&model, &assignment, through_lunch)
                .value(CriterionKind::InstructorLunchBreak),
            1.0
        );
        assert_eq!(
            comparator
                .placement_criteria(&model, &assignment, morning)
                .value(CriterionKind::InstructorLunchBreak),
            0.0
        );
    }

    #[test]
    fn additional_criteria_are_read_from_the_configuration() {
        let options = InstructorOptions::from_properties(&Properties::default().set(
            "General.AdditionalCriteria",
            "org.cpsolver.coursett.criteria.additional.InstructorLunchBreak;InstructorFairness",
        ))
        .unwrap();

        assert_eq!(options.lunch_break, Some(LunchBreak::default()));
        assert!(options.fairness);
        assert_eq!(
            InstructorOptions::from_properties(&Properties::default()).unwrap(),
            InstructorOptions::default()
        );
    }
}
