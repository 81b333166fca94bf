use super::FlexibleConstraint;
use super::View;
use crate::basic_types::Random;
use crate::containers::HashMap;
use crate::engine::AssignmentValues;
use crate::engine::ConflictSet;
use crate::model::LectureId;
use crate::model::Placement;
use crate::model::PlacementId;
use crate::model::TimeLocation;
use crate::model::TimetableModel;
use crate::model::WeekCode;
use crate::model::DAY_CODES;

/// Placements of a day which follow each other with gaps of at most the maximal gap.
#[derive(Debug)]
pub(super) struct Block<'a> {
    start: i32,
    end: i32,
    placements: Vec<&'a Placement>,
}

impl Block<'_> {
    fn contains(&self, placement: &Placement) -> bool {
        self.placements.iter().any(|other| other.id() == placement.id())
    }

    fn length(&self) -> i32 {
        self.end - self.start
    }
}

/// Merges the placements into blocks; a placement joins the first block it starts in or at most
/// `max_gap` slots after.
pub(super) fn merge_to_blocks(mut placements: Vec<&Placement>, max_gap: i32) -> Vec<Block<'_>> {
    placements.sort_by_key(|placement| (placement.time().start_slot(), placement.time().length()));
    let mut blocks: Vec<Block<'_>> = Vec::new();
    for placement in placements {
        let (start, end) = (placement.time().start_slot(), placement.time().end_slot());
        let block = blocks.iter_mut().find(|block| {
            block.start == start || (block.start <= start && start <= block.end + max_gap)
        });
        match block {
            Some(block) => {
                block.end = block.end.max(end);
                block.placements.push(placement);
            }
            None => blocks.push(Block {
                start,
                end,
                placements: vec![placement],
            }),
        }
    }
    blocks
}

/// Number of free slots between the first and the last of the placements.
pub(super) fn count_holes(mut placements: Vec<&Placement>) -> i32 {
    placements.sort_by_key(|placement| placement.time().start_slot());
    let mut holes = 0;
    let mut last_end: Option<i32> = None;
    for placement in placements {
        let (start, end) = (placement.time().start_slot(), placement.time().end_slot());
        if let Some(last) = last_end {
            holes += (start - last).max(0);
        }
        last_end = Some(last_end.map_or(end, |last| last.max(end)));
    }
    holes
}

fn overlaps_window(time: &TimeLocation, start: i32, end: i32) -> bool {
    time.start_slot() < end && start < time.end_slot()
}

/// Whether `length` consecutive slots between `start` and `end` are free of the placements.
pub(super) fn has_break(mut placements: Vec<&Placement>, start: i32, end: i32, length: i32) -> bool {
    placements.sort_by_key(|placement| placement.time().start_slot());
    let mut free_from = start;
    for placement in placements {
        if placement.time().start_slot().min(end) - free_from >= length {
            return true;
        }
        free_from = free_from.max(placement.time().end_slot());
    }
    end - free_from >= length
}

impl FlexibleConstraint {
    /// The (day code, week group) pairs on which `placement` meets.
    fn days_of<'m>(
        &self,
        model: &'m TimetableModel,
        placement: &Placement,
    ) -> Vec<(u32, usize, Option<&'m WeekCode>)> {
        let options = model.flexible_options();
        let groups = Self::week_groups(model);
        placement
            .time()
            .days()
            .flat_map(|day| {
                let day_code = DAY_CODES[day];
                groups
                    .iter()
                    .enumerate()
                    .filter(move |&(_, week)| options.meets(placement.time(), day_code, *week))
                    .map(move |(index, &week)| (day_code, index, week))
            })
            .collect()
    }

    pub(super) fn breaks_violations(&self, view: View<'_>, max_blocks: usize, max_gap: i32) -> f64 {
        let groups = Self::week_groups(view.model);
        let mut violations = 0;
        for &day_code in &DAY_CODES {
            for &week in &groups {
                let nr_blocks = merge_to_blocks(self.relevant(view, day_code, week), max_gap).len();
                if nr_blocks > max_blocks {
                    violations += (nr_blocks - max_blocks).pow(2);
                }
            }
        }
        violations as f64
    }

    pub(super) fn holes_violations(&self, view: View<'_>, max_holes: i32) -> f64 {
        let groups = Self::week_groups(view.model);
        let mut over = 0;
        for &day_code in &DAY_CODES {
            for &week in &groups {
                over += (count_holes(self.relevant(view, day_code, week)) - max_holes).max(0);
            }
        }
        over as f64 / (12.0 * groups.len() as f64)
    }

    pub(super) fn max_block_violations(&self, view: View<'_>, max_length: i32, max_gap: i32) -> f64 {
        let groups = Self::week_groups(view.model);
        let mut over = 0;
        for &day_code in &DAY_CODES {
            for &week in &groups {
                over += merge_to_blocks(self.relevant(view, day_code, week), max_gap)
                    .iter()
                    .map(|block| (block.length() - max_length).max(0))
                    .sum::<i32>();
            }
        }
        over as f64 / (12.0 * groups.len() as f64)
    }

    /// The number of days without the break, averaged over the groups of weeks.
    pub(super) fn break_violations(&self, view: View<'_>, start: i32, end: i32, length: i32) -> f64 {
        let groups = Self::week_groups(view.model);
        let mut missing = 0;
        for &day_code in &DAY_CODES {
            for &week in &groups {
                if !has_break(self.relevant(view, day_code, week), start, end, length) {
                    missing += 1;
                }
            }
        }
        missing as f64 / groups.len() as f64
    }

    /// A weakened placement does not cause any conflicts until every other lecture of the
    /// constraint is assigned.
    pub(super) fn is_weakened(
        &self,
        values: &AssignmentValues,
        weak: &HashMap<LectureId, PlacementId>,
        placement: &Placement,
    ) -> bool {
        weak.get(&placement.lecture()) == Some(&placement.id())
            && self
                .lectures
                .iter()
                .any(|&lecture| lecture != placement.lecture() && !values.is_assigned(lecture))
    }

    /// Unassigns randomly chosen smallest blocks until every day of `placement` has at most
    /// `max_blocks` blocks.
    #[allow(clippy::too_many_arguments, reason = "the search state is passed explicitly")]
    pub(super) fn evict_blocks(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        placement: &Placement,
        max_blocks: usize,
        max_gap: i32,
        conflicts: &mut ConflictSet,
        random: &mut dyn Random,
    ) {
        let overrides = [(placement.lecture(), Some(placement))];
        let base = View {
            model,
            values: Some(values),
            overrides: &overrides,
            conflicts: None,
        };
        for (day_code, _, week) in self.days_of(model, placement) {
            loop {
                let evicted: Option<Vec<PlacementId>> = {
                    let relevant = self.relevant(base.with_conflicts(conflicts), day_code, week);
                    let blocks = merge_to_blocks(relevant, max_gap);
                    if blocks.len() <= max_blocks {
                        break;
                    }
                    let candidates = blocks
                        .iter()
                        .filter(|block| {
                            !block.contains(placement)
                                && block.placements.iter().all(|other| {
                                    !model.lecture(other.lecture()).is_committed()
                                })
                        })
                        .collect::<Vec<_>>();
                    let smallest = candidates.iter().map(|block| block.placements.len()).min();
                    let adepts = candidates
                        .into_iter()
                        .filter(|block| Some(block.placements.len()) == smallest)
                        .collect::<Vec<_>>();
                    random
                        .choose(&adepts)
                        .map(|block| block.placements.iter().map(|other| other.id()).collect())
                };
                match evicted {
                    Some(evicted) => conflicts.extend(evicted),
                    None => {
                        let _ = conflicts.insert(placement.id());
                        return;
                    }
                }
            }
        }
    }

    pub(super) fn exceeds_blocks(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        placement: &Placement,
        max_blocks: usize,
        max_gap: i32,
    ) -> bool {
        let overrides = [(placement.lecture(), Some(placement))];
        let view = View {
            model,
            values: Some(values),
            overrides: &overrides,
            conflicts: None,
        };
        self.days_of(model, placement)
            .into_iter()
            .any(|(day_code, _, week)| {
                merge_to_blocks(self.relevant(view, day_code, week), max_gap).len() > max_blocks
            })
    }

    /// Unassigns randomly chosen placements of the block of `placement` until, on each of its days,
    /// that block is at most `max_length` slots long.
    #[allow(clippy::too_many_arguments, reason = "the search state is passed explicitly")]
    pub(super) fn evict_long_blocks(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        placement: &Placement,
        max_length: i32,
        max_gap: i32,
        conflicts: &mut ConflictSet,
        random: &mut dyn Random,
    ) {
        let overrides = [(placement.lecture(), Some(placement))];
        let base = View {
            model,
            values: Some(values),
            overrides: &overrides,
            conflicts: None,
        };
        for (day_code, _, week) in self.days_of(model, placement) {
            loop {
                let evicted: Option<PlacementId> = {
                    let relevant = self.relevant(base.with_conflicts(conflicts), day_code, week);
                    let blocks = merge_to_blocks(relevant, max_gap);
                    let Some(block) = blocks
                        .iter()
                        .find(|block| block.contains(placement) && block.length() > max_length)
                    else {
                        break;
                    };
                    let adepts = block
                        .placements
                        .iter()
                        .filter(|other| {
                            other.lecture() != placement.lecture()
                                && !model.lecture(other.lecture()).is_committed()
                        })
                        .map(|other| other.id())
                        .collect::<Vec<_>>();
                    random.choose(&adepts).copied()
                };
                match evicted {
                    Some(evicted) => {
                        let _ = conflicts.insert(evicted);
                    }
                    None => {
                        let _ = conflicts.insert(placement.id());
                        return;
                    }
                }
            }
        }
    }

    pub(super) fn exceeds_max_block(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        placement: &Placement,
        max_length: i32,
        max_gap: i32,
    ) -> bool {
        let overrides = [(placement.lecture(), Some(placement))];
        let view = View {
            model,
            values: Some(values),
            overrides: &overrides,
            conflicts: None,
        };
        self.days_of(model, placement)
            .into_iter()
            .any(|(day_code, _, week)| {
                merge_to_blocks(self.relevant(view, day_code, week), max_gap)
                    .iter()
                    .any(|block| block.contains(placement) && block.length() > max_length)
            })
    }

    /// Unassigns randomly chosen placements meeting within the window until every day of
    /// `placement` has its break again. A placement outside of the window causes no conflicts.
    pub(super) fn evict_for_break(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        placement: &Placement,
        (start, end, length): (i32, i32, i32),
        conflicts: &mut ConflictSet,
        random: &mut dyn Random,
    ) {
        if !overlaps_window(placement.time(), start, end) {
            return;
        }
        let overrides = [(placement.lecture(), Some(placement))];
        let base = View {
            model,
            values: Some(values),
            overrides: &overrides,
            conflicts: None,
        };
        for (day_code, _, week) in self.days_of(model, placement) {
            loop {
                let evicted: Option<PlacementId> = {
                    let relevant = self.relevant(base.with_conflicts(conflicts), day_code, week);
                    if has_break(relevant.clone(), start, end, length) {
                        break;
                    }
                    let adepts = relevant
                        .iter()
                        .filter(|other| {
                            other.lecture() != placement.lecture()
                                && overlaps_window(other.time(), start, end)
                                && !model.lecture(other.lecture()).is_committed()
                        })
                        .map(|other| other.id())
                        .collect::<Vec<_>>();
                    random.choose(&adepts).copied()
                };
                match evicted {
                    Some(evicted) => {
                        let _ = conflicts.insert(evicted);
                    }
                    None => {
                        let _ = conflicts.insert(placement.id());
                        return;
                    }
                }
            }
        }
    }

    /// Whether assigning `placement` leaves one of its days without the break.
    pub(super) fn blocks_break(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        placement: &Placement,
        (start, end, length): (i32, i32, i32),
    ) -> bool {
        if !overlaps_window(placement.time(), start, end) {
            return false;
        }
        let overrides = [(placement.lecture(), Some(placement))];
        let view = View {
            model,
            values: Some(values),
            overrides: &overrides,
            conflicts: None,
        };
        self.days_of(model, placement)
            .into_iter()
            .any(|(day_code, _, week)| {
                !has_break(self.relevant(view, day_code, week), start, end, length)
            })
    }

    fn allowed_holes(allowed: &HashMap<(u32, usize), i32>, max_holes: i32, key: (u32, usize)) -> i32 {
        allowed.get(&key).map_or(max_holes, |&raised| raised.max(max_holes))
    }

    /// Unassigns randomly chosen placements whose removal does not increase the holes, until every
    /// day of `placement` is within the allowed number of holes.
    #[allow(clippy::too_many_arguments, reason = "the search state is passed explicitly")]
    pub(super) fn evict_holes(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        placement: &Placement,
        max_holes: i32,
        allowed: &HashMap<(u32, usize), i32>,
        conflicts: &mut ConflictSet,
        random: &mut dyn Random,
    ) {
        let overrides = [(placement.lecture(), Some(placement))];
        let base = View {
            model,
            values: Some(values),
            overrides: &overrides,
            conflicts: None,
        };
        for (day_code, group, week) in self.days_of(model, placement) {
            let limit = Self::allowed_holes(allowed, max_holes, (day_code, group));
            loop {
                let evicted: Option<PlacementId> = {
                    let relevant = self.relevant(base.with_conflicts(conflicts), day_code, week);
                    let penalty = count_holes(relevant.clone());
                    if penalty <= limit {
                        break;
                    }
                    let adepts = relevant
                        .iter()
                        .filter(|other| {
                            other.lecture() != placement.lecture()
                                && !model.lecture(other.lecture()).is_committed()
                        })
                        .filter(|other| {
                            let rest = relevant
                                .iter()
                                .copied()
                                .filter(|remaining| remaining.id() != other.id())
                                .collect();
                            count_holes(rest) <= penalty
                        })
                        .map(|other| other.id())
                        .collect::<Vec<_>>();
                    random.choose(&adepts).copied()
                };
                match evicted {
                    Some(evicted) => {
                        let _ = conflicts.insert(evicted);
                    }
                    None => {
                        let _ = conflicts.insert(placement.id());
                        return;
                    }
                }
            }
        }
    }

    pub(super) fn exceeds_holes(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        placement: &Placement,
        max_holes: i32,
        allowed: &HashMap<(u32, usize), i32>,
    ) -> bool {
        let overrides = [(placement.lecture(), Some(placement))];
        let view = View {
            model,
            values: Some(values),
            overrides: &overrides,
            conflicts: None,
        };
        self.days_of(model, placement)
            .into_iter()
            .any(|(day_code, group, week)| {
                count_holes(self.relevant(view, day_code, week))
                    > Self::allowed_holes(allowed, max_holes, (day_code, group))
            })
    }

    /// Raises the allowed number of holes on the days of `placement` to what assigning it causes.
    pub(super) fn raise_allowed_holes(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        placement: &Placement,
        max_holes: i32,
        allowed: &mut HashMap<(u32, usize), i32>,
    ) {
        let overrides = [(placement.lecture(), Some(placement))];
        let view = View {
            model,
            values: Some(values),
            overrides: &overrides,
            conflicts: None,
        };
        for (day_code, group, week) in self.days_of(model, placement) {
            let holes = count_holes(self.relevant(view, day_code, week));
            if holes > Self::allowed_holes(allowed, max_holes, (day_code, group)) {
                let _ = allowed.insert((day_code, group), holes);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::TestRandom;
    use crate::engine::ConstraintId;
    use crate::model::LectureSpec;
    use crate::model::ModelBuilder;
    use crate::model::RoomLocation;

    const MONDAY: u32 = DAY_CODES[0];

    fn lecture(class_id: u64, times: &[i32]) -> LectureSpec {
        times.iter().fold(
            LectureSpec::new(class_id, format!("L{class_id}")).with_class_limit(10, 10),
            |spec, &start| {
                spec.with_placement(
                    TimeLocation::new(MONDAY, start, 12),
                    vec![RoomLocation::new(class_id, format!("R{class_id}"), 20)],
                )
            },
        )
    }

    fn placement(model: &TimetableModel, lecture: usize, index: u32) -> &Placement {
        let lecture = model.lecture_ids().nth(lecture).unwrap();
        model.placement(PlacementId { lecture, index })
    }

    fn flexible_of(model: &TimetableModel) -> (ConstraintId, &FlexibleConstraint) {
        model
            .constraint_ids()
            .find_map(|id| model.flexible_constraint(id).map(|fc| (id, fc)))
            .unwrap()
    }

    #[test]
    fn blocks_merge_placements_within_the_gap() {
        let model = ModelBuilder::default()
            .with_lecture(lecture(1, &[96]))
            .with_lecture(lecture(2, &[114]))
            .with_lecture(lecture(3, &[150]))
            .build()
            .unwrap();
        let placements = (0..3).map(|l| placement(&model, l, 0)).collect::<Vec<_>>();

        // 96..108, 114..126 and 150..162
        assert_eq!(merge_to_blocks(placements.clone(), 6).len(), 2);
        assert_eq!(merge_to_blocks(placements.clone(), 5).len(), 3);
        assert_eq!(count_holes(placements), 6 + 24);
    }

    #[test]
    fn a_break_needs_consecutive_free_slots_in_the_window() {
        let model = ModelBuilder::default()
            .with_lecture(lecture(1, &[132]))
            .with_lecture(lecture(2, &[150]))
            .build()
            .unwrap();
        let placements = (0..2).map(|l| placement(&model, l, 0)).collect::<Vec<_>>();

        // 144..150 is free
        assert!(has_break(placements.clone(), 132, 162, 6));
        assert!(!has_break(placements.clone(), 132, 162, 7));
        assert!(has_break(placements, 120, 162, 12));
    }

    #[test]
    fn max_block_evicts_from_a_too_long_block() {
        let model = ModelBuilder::default()
            .with_lecture(lecture(1, &[96]))
            .with_lecture(lecture(2, &[108]))
            .with_lecture(lecture(3, &[120, 150]))
            .with_flexible_constraint(1, "Student", "_MaxBlock:120:10_", "R", &[1, 2, 3])
            .build()
            .unwrap();
        let (id, flexible) = flexible_of(&model);
        let mut assignment = model.create_assignment();
        let mut random = TestRandom {
            usizes: vec![0],
            ..Default::default()
        };
        let _ = assignment.assign(&model, placement(&model, 0, 0).id(), &mut random);
        let _ = assignment.assign(&model, placement(&model, 1, 0).id(), &mut random);

        assert!(!flexible.in_conflict(id, &model, &assignment, placement(&model, 2, 1)));

        // 96..132 is one block of 36 slots
        let adjacent = placement(&model, 2, 0);
        assert!(flexible.in_conflict(id, &model, &assignment, adjacent));
        let mut conflicts = ConflictSet::default();
        flexible.compute_conflicts(id, &model, &assignment, adjacent, &mut conflicts, &mut random);
        assert_eq!(conflicts.len(), 1);
        assert!(!conflicts.contains(&adjacent.id()));
    }

    #[test]
    fn soft_max_block_counts_the_slots_over_the_limit() {
        let model = ModelBuilder::default()
            .with_lecture(lecture(1, &[96]))
            .with_lecture(lecture(2, &[108]))
            .with_lecture(lecture(3, &[120]))
            .with_flexible_constraint(1, "Student", "_MaxBlock:120:10_", "1", &[1, 2, 3])
            .build()
            .unwrap();
        let mut assignment = model.create_assignment();
        let mut random = TestRandom::default();
        for l in 0..3 {
            let _ = assignment.assign(&model, placement(&model, l, 0).id(), &mut random);
        }
        let (_, flexible) = flexible_of(&model);

        assert_eq!(flexible.current_preference(&model, assignment.values()), 1.0);
        assert!(!flexible.is_satisfied(&model, assignment.values()));
    }

    #[test]
    fn a_lecture_taking_the_break_evicts_another_lecture_of_the_window() {
        let model = ModelBuilder::default()
            .with_lecture(lecture(1, &[132]))
            .with_lecture(lecture(2, &[144, 168]))
            .with_lecture(lecture(3, &[150]))
            .with_flexible_constraint(1, "Student", "_Break:132:162:30_", "R", &[1, 2, 3])
            .build()
            .unwrap();
        let (id, flexible) = flexible_of(&model);
        let mut assignment = model.create_assignment();
        let mut random = TestRandom {
            usizes: vec![0],
            ..Default::default()
        };
        let _ = assignment.assign(&model, placement(&model, 0, 0).id(), &mut random);
        let _ = assignment.assign(&model, placement(&model, 2, 0).id(), &mut random);
        assert!(flexible.is_satisfied(&model, assignment.values()));

        assert!(!flexible.in_conflict(id, &model, &assignment, placement(&model, 1, 1)));

        let in_break = placement(&model, 1, 0);
        assert!(flexible.in_conflict(id, &model, &assignment, in_break));
        let mut conflicts = ConflictSet::default();
        flexible.compute_conflicts(id, &model, &assignment, in_break, &mut conflicts, &mut random);
        assert_eq!(conflicts.len(), 1);
        assert!(!conflicts.contains(&in_break.id()));
    }

    #[test]
    fn max_breaks_evicts_a_separate_block() {
        let model = ModelBuilder::default()
            .with_lecture(lecture(1, &[96]))
            .with_lecture(lecture(2, &[108]))
            .with_lecture(lecture(3, &[180, 120]))
            .with_flexible_constraint(1, "Student", "_MaxBreaks:0:30_", "R", &[1, 2, 3])
            .build()
            .unwrap();
        let (id, flexible) = flexible_of(&model);
        let mut assignment = model.create_assignment();
        let mut random = TestRandom {
            usizes: vec![0],
            ..Default::default()
        };
        let _ = assignment.assign(&model, placement(&model, 0, 0).id(), &mut random);
        let _ = assignment.assign(&model, placement(&model, 1, 0).id(), &mut random);

        let adjacent = placement(&model, 2, 1);
        assert!(!flexible.in_conflict(id, &model, &assignment, adjacent));

        let late = placement(&model, 2, 0);
        assert!(flexible.in_conflict(id, &model, &assignment, late));
        let mut conflicts = ConflictSet::default();
        flexible.compute_conflicts(id, &model, &assignment, late, &mut conflicts, &mut random);
        assert_eq!(conflicts.len(), 2);
        assert!(!conflicts.contains(&late.id()));
    }

    #[test]
    fn a_weakened_placement_is_accepted_while_lectures_are_unassigned() {
        let model = ModelBuilder::default()
            .with_lecture(lecture(1, &[96]))
            .with_lecture(lecture(2, &[180]))
            .with_lecture(lecture(3, &[108]))
            .with_flexible_constraint(1, "Student", "_MaxBreaks:0:30_", "R", &[1, 2, 3])
            .build()
            .unwrap();
        let (id, flexible) = flexible_of(&model);
        let mut assignment = model.create_assignment();
        let mut random = TestRandom::default();
        let _ = assignment.assign(&model, placement(&model, 0, 0).id(), &mut random);

        let late = placement(&model, 1, 0);
        assert!(flexible.in_conflict(id, &model, &assignment, late));
        assignment.weaken_for(&model, id, late);
        assert!(!flexible.in_conflict(id, &model, &assignment, late));
    }

    #[test]
    fn max_holes_evicts_the_lecture_causing_the_hole() {
        let model = ModelBuilder::default()
            .with_lecture(lecture(1, &[96]))
            .with_lecture(lecture(2, &[108, 150]))
            .with_flexible_constraint(1, "Student", "_MaxHoles:60_", "R", &[1, 2])
            .build()
            .unwrap();
        let (id, flexible) = flexible_of(&model);
        let mut assignment = model.create_assignment();
        let mut random = TestRandom {
            usizes: vec![0],
            ..Default::default()
        };
        let _ = assignment.assign(&model, placement(&model, 0, 0).id(), &mut random);

        assert!(!flexible.in_conflict(id, &model, &assignment, placement(&model, 1, 0)));

        // 108..150 is a hole of 42 slots, more than 12
        let late = placement(&model, 1, 1);
        assert!(flexible.in_conflict(id, &model, &assignment, late));
        let mut conflicts = ConflictSet::default();
        flexible.compute_conflicts(id, &model, &assignment, late, &mut conflicts, &mut random);
        assert_eq!(
            conflicts.into_iter().collect::<Vec<_>>(),
            vec![placement(&model, 0, 0).id()]
        );
    }

    #[test]
    fn soft_max_breaks_counts_squared_violations() {
        let model = ModelBuilder::default()
            .with_lecture(lecture(1, &[96]))
            .with_lecture(lecture(2, &[150]))
            .with_lecture(lecture(3, &[200]))
            .with_flexible_constraint(1, "Student", "_MaxBreaks:0:30_", "1", &[1, 2, 3])
            .build()
            .unwrap();
        let mut assignment = model.create_assignment();
        let mut random = TestRandom::default();
        for l in 0..3 {
            let _ = assignment.assign(&model, placement(&model, l, 0).id(), &mut random);
        }
        let (_, flexible) = flexible_of(&model);

        // three blocks where one is allowed
        assert_eq!(flexible.current_preference(&model, assignment.values()), 4.0);
        assert_eq!(
            assignment
                .criteria()
                .value(crate::engine::CriterionKind::FlexibleConstraint),
            5.0
        );
    }
}
