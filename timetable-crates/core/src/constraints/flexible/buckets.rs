use super::BucketTable;
use super::FlexibleConstraint;
use super::FlexibleKind;
use super::FlexibleOptions;
use super::View;
use crate::basic_types::Random;
use crate::containers::HashSet;
use crate::engine::AssignmentValues;
use crate::engine::ConflictSet;
use crate::model::LectureId;
use crate::model::Placement;
use crate::model::TimeLocation;
use crate::model::TimetableModel;
use crate::model::WeekCode;
use crate::model::DAY_CODES;
use crate::model::NR_DAYS;

/// Number of members of every bucket, per group of weeks.
type BucketCounts = Vec<Vec<usize>>;

impl FlexibleConstraint {
    pub(super) fn bucket_limit(&self) -> usize {
        match self.kind {
            FlexibleKind::MaxDays { max }
            | FlexibleKind::MaxWeeks { max, .. }
            | FlexibleKind::MaxHalfDays { max }
            | FlexibleKind::MaxConsecutiveDays { max } => max,
            FlexibleKind::MaxBreaks { .. }
            | FlexibleKind::MaxHoles { .. }
            | FlexibleKind::MaxBlock { .. }
            | FlexibleKind::Break { .. } => {
                unreachable!("only the day and week limits use buckets")
            }
        }
    }

    fn empty_table(&self, model: &TimetableModel) -> BucketTable {
        let (nr_groups, nr_buckets) = match self.kind {
            FlexibleKind::MaxWeeks { .. } => (1, model.weeks().len()),
            FlexibleKind::MaxHalfDays { .. } => (Self::week_groups(model).len(), 2 * NR_DAYS),
            _ => (Self::week_groups(model).len(), NR_DAYS),
        };
        vec![vec![HashSet::default(); nr_buckets]; nr_groups]
    }

    fn meets_on_day(
        options: &FlexibleOptions,
        time: &TimeLocation,
        day: usize,
        week: Option<&WeekCode>,
    ) -> bool {
        if options.precise_date_computation {
            time.has_date_in_week(day, week, options.day_of_week_offset)
        } else {
            time.day_code() & DAY_CODES[day] != 0
                && week.is_none_or(|week| time.share_weeks_with(week))
        }
    }

    /// The (group, bucket) pairs `time` belongs to.
    fn buckets_of(&self, model: &TimetableModel, time: &TimeLocation) -> Vec<(usize, usize)> {
        let options = model.flexible_options();
        if let FlexibleKind::MaxWeeks { day_code, .. } = self.kind {
            return model
                .weeks()
                .iter()
                .enumerate()
                .filter(|(_, week)| {
                    (day_code == 0 || time.day_code() & day_code != 0)
                        && time.share_weeks_with(week)
                })
                .map(|(bucket, _)| (0, bucket))
                .collect();
        }
        let half_days = matches!(self.kind, FlexibleKind::MaxHalfDays { .. });
        let afternoon = usize::from(time.start_slot() >= options.half_day_slot);
        Self::week_groups(model)
            .into_iter()
            .enumerate()
            .flat_map(|(group, week)| {
                (0..NR_DAYS)
                    .filter(move |&day| Self::meets_on_day(options, time, day, week))
                    .map(move |day| {
                        if half_days {
                            (group, 2 * day + afternoon)
                        } else {
                            (group, day)
                        }
                    })
            })
            .collect()
    }

    pub(super) fn bucket_table(&self, view: View<'_>) -> BucketTable {
        let mut table = self.empty_table(view.model);
        for &lecture in &self.lectures {
            if let Some(placement) = view.placement_of(lecture) {
                self.add_to_buckets(view.model, &mut table, placement);
            }
        }
        table
    }

    pub(super) fn add_to_buckets(
        &self,
        model: &TimetableModel,
        table: &mut BucketTable,
        placement: &Placement,
    ) {
        for (group, bucket) in self.buckets_of(model, placement.time()) {
            let _ = table[group][bucket].insert(placement.lecture());
        }
    }

    pub(super) fn remove_from_buckets(table: &mut BucketTable, lecture: LectureId) {
        for members in table.iter_mut().flatten() {
            let _ = members.remove(&lecture);
        }
    }

    /// Counts the members of every bucket, leaving out the `excluded` lectures and moving the
    /// lecture of `candidate` into the buckets of the candidate.
    fn bucket_counts(
        &self,
        model: &TimetableModel,
        table: &BucketTable,
        candidate: Option<&Placement>,
        excluded: &HashSet<LectureId>,
    ) -> BucketCounts {
        let moved = candidate.map(Placement::lecture);
        let mut counts: BucketCounts = table
            .iter()
            .map(|group| {
                group
                    .iter()
                    .map(|members| {
                        members
                            .iter()
                            .filter(|&&lecture| !excluded.contains(&lecture) && moved != Some(lecture))
                            .count()
                    })
                    .collect()
            })
            .collect();
        if let Some(candidate) = candidate {
            for (group, bucket) in self.buckets_of(model, candidate.time()) {
                counts[group][bucket] += 1;
            }
        }
        counts
    }

    /// The number of used buckets of a group, or the span between the first and the last used day
    /// for consecutive days.
    fn group_measure(&self, counts: &[usize]) -> usize {
        let mut used = counts
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count > 0)
            .map(|(bucket, _)| bucket);
        if matches!(self.kind, FlexibleKind::MaxConsecutiveDays { .. }) {
            let Some(first) = used.next() else {
                return 0;
            };
            let last = used.last().unwrap_or(first);
            last - first + 1
        } else {
            used.count()
        }
    }

    pub(super) fn buckets_measure(
        &self,
        model: &TimetableModel,
        table: &BucketTable,
        candidate: Option<&Placement>,
        excluded: &HashSet<LectureId>,
    ) -> usize {
        self.bucket_counts(model, table, candidate, excluded)
            .iter()
            .map(|group| self.group_measure(group))
            .max()
            .unwrap_or(0)
    }

    pub(super) fn buckets_violations(
        &self,
        model: &TimetableModel,
        table: &BucketTable,
        candidate: Option<&Placement>,
        excluded: &HashSet<LectureId>,
    ) -> f64 {
        let max = self.bucket_limit();
        self.bucket_counts(model, table, candidate, excluded)
            .iter()
            .map(|group| self.group_measure(group).saturating_sub(max))
            .sum::<usize>() as f64
    }

    /// The buckets whose members can be unassigned to bring a group over the limit closer to it:
    /// the least populated buckets, or the first or the last used day for consecutive days.
    fn adept_buckets(
        &self,
        model: &TimetableModel,
        table: &BucketTable,
        counts: &BucketCounts,
        candidate: &Placement,
        excluded: &HashSet<LectureId>,
    ) -> Vec<(usize, usize)> {
        let candidate_buckets = self.buckets_of(model, candidate.time());
        let max = self.bucket_limit();
        let evictable = |group: usize, bucket: usize| {
            counts[group][bucket] > 0
                && !candidate_buckets.contains(&(group, bucket))
                && table[group][bucket].iter().all(|&lecture| {
                    excluded.contains(&lecture) || !model.lecture(lecture).is_committed()
                })
        };
        let over_groups = counts
            .iter()
            .enumerate()
            .filter(|(_, group)| self.group_measure(group) > max)
            .map(|(group, _)| group);

        if matches!(self.kind, FlexibleKind::MaxConsecutiveDays { .. }) {
            let mut adepts = Vec::new();
            for group in over_groups {
                let used = counts[group]
                    .iter()
                    .enumerate()
                    .filter(|&(_, &count)| count > 0)
                    .map(|(bucket, _)| bucket)
                    .collect::<Vec<_>>();
                for end in [used.first(), used.last()].into_iter().flatten() {
                    if evictable(group, *end) && !adepts.contains(&(group, *end)) {
                        adepts.push((group, *end));
                    }
                }
            }
            return adepts;
        }

        let candidates = over_groups
            .flat_map(|group| (0..counts[group].len()).map(move |bucket| (group, bucket)))
            .filter(|&(group, bucket)| evictable(group, bucket))
            .collect::<Vec<_>>();
        let smallest = candidates
            .iter()
            .map(|&(group, bucket)| counts[group][bucket])
            .min();
        candidates
            .into_iter()
            .filter(|&(group, bucket)| Some(counts[group][bucket]) == smallest)
            .collect()
    }

    /// Unassigns the members of randomly chosen buckets until `placement` keeps every group
    /// within the limit; `placement` itself becomes a conflict if that is not possible.
    pub(super) fn evict_buckets(
        &self,
        model: &TimetableModel,
        values: &AssignmentValues,
        table: &BucketTable,
        placement: &Placement,
        conflicts: &mut ConflictSet,
        random: &mut dyn Random,
    ) {
        let max = self.bucket_limit();
        let mut excluded = conflicts
            .iter()
            .filter(|conflict| values.holds(**conflict))
            .map(|conflict| conflict.lecture)
            .collect::<HashSet<_>>();
        while !conflicts.contains(&placement.id()) {
            let counts = self.bucket_counts(model, table, Some(placement), &excluded);
            if counts.iter().all(|group| self.group_measure(group) <= max) {
                return;
            }
            let adepts = self.adept_buckets(model, table, &counts, placement, &excluded);
            let Some(&(group, bucket)) = random.choose(&adepts) else {
                let _ = conflicts.insert(placement.id());
                return;
            };
            for &lecture in &table[group][bucket] {
                if lecture == placement.lecture() || excluded.contains(&lecture) {
                    continue;
                }
                if let Some(value) = values.value(lecture) {
                    let _ = conflicts.insert(value);
                }
                let _ = excluded.insert(lecture);
            }
        }
    }
}
