use std::collections::BTreeMap;

use log::debug;
use regex::Regex;

use crate::basic_types::Properties;
use crate::basic_types::PropertyError;
use crate::containers::HashMap;
use crate::containers::HashSet;
use crate::engine::Assignment;
use crate::engine::ConflictSet;
use crate::model::Lecture;
use crate::model::LectureId;
use crate::model::Placement;
use crate::model::StudentSpec;
use crate::model::TimetableModel;

use super::jenrl::distance_conflict;
use super::jenrl::overlaps;

/// Recognised keys: `General.ExtendedStudentConflicts` (false) enables the constraint,
/// `ExtendedStudentConflicts.IgnoreClasses` is a regular expression matched against the whole
/// class name and `ExtendedStudentConflicts.CheckSameCourse` (true) lets two classes of the same
/// course conflict when a student can take both.
#[derive(Clone, Debug)]
pub struct ExtendedStudentConflictOptions {
    pub enabled: bool,
    pub ignore_classes: Option<Regex>,
    pub check_same_course: bool,
}

impl Default for ExtendedStudentConflictOptions {
    fn default() -> Self {
        ExtendedStudentConflictOptions::from_properties(&Properties::default())
            .unwrap_or_else(|_| unreachable!("the defaults are valid"))
    }
}

impl ExtendedStudentConflictOptions {
    pub fn from_properties(
        properties: &Properties,
    ) -> Result<ExtendedStudentConflictOptions, PropertyError> {
        let ignore_classes = properties.get_string("ExtendedStudentConflicts.IgnoreClasses", "");
        let ignore_classes = if ignore_classes.is_empty() {
            None
        } else {
            Some(
                Regex::new(&format!("^(?:{ignore_classes})$")).map_err(|_| PropertyError {
                    key: "ExtendedStudentConflicts.IgnoreClasses".to_owned(),
                    value: ignore_classes.clone(),
                    expected: "a regular expression",
                })?,
            )
        };
        Ok(ExtendedStudentConflictOptions {
            enabled: properties.get_bool("General.ExtendedStudentConflicts", false)?,
            ignore_classes,
            check_same_course: properties.get_bool("ExtendedStudentConflicts.CheckSameCourse", true)?,
        })
    }

    fn is_ignored(&self, lecture: &Lecture) -> bool {
        self.ignore_classes
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(lecture.name()))
    }
}

/// Prevents student conflicts between classes which have no joint enrollment, based on the
/// course demands of the students.
///
/// Two classes are watched when at least two students request both of their courses and one of
/// them can attend both classes. Watched classes may neither overlap nor be too far apart for a
/// back-to-back meeting. Committed classes are never watched.
#[derive(Clone, Debug)]
pub struct ExtendedStudentConflicts {
    pub(crate) pairs: HashMap<LectureId, Vec<LectureId>>,
    pub(crate) lectures: Vec<LectureId>,
}

impl ExtendedStudentConflicts {
    /// Finds the watched pairs among the lectures of `model`.
    pub(crate) fn new(
        model: &TimetableModel,
        students: &[StudentSpec],
        options: &ExtendedStudentConflictOptions,
    ) -> ExtendedStudentConflicts {
        let candidates = model
            .lectures()
            .filter(|lecture| !lecture.is_committed() && lecture.offering_id().is_some())
            .collect::<Vec<_>>();
        let cannot_enroll = students
            .iter()
            .map(|student| {
                student
                    .cannot_enroll
                    .iter()
                    .filter_map(|&class_id| model.lecture_by_class_id(class_id))
                    .collect::<HashSet<_>>()
            })
            .collect::<Vec<_>>();

        let mut common_students: HashMap<(u64, u64), Vec<usize>> = HashMap::default();
        let mut pairs: HashMap<LectureId, Vec<LectureId>> = HashMap::default();
        for (index, first) in candidates.iter().enumerate() {
            for second in &candidates[index + 1..] {
                let (Some(o1), Some(o2)) = (first.offering_id(), second.offering_id()) else {
                    continue;
                };
                if first.is_to_ignore_student_conflicts_with(second.id()) {
                    continue;
                }
                if o1 == o2 && !can_take_together(model, options, first, second) {
                    continue;
                }
                if options.is_ignored(first) && options.is_ignored(second) {
                    continue;
                }
                let common = common_students.entry((o1.min(o2), o1.max(o2))).or_insert_with(|| {
                    students
                        .iter()
                        .enumerate()
                        .filter(|(_, student)| {
                            student.offerings.contains(&o1) && student.offerings.contains(&o2)
                        })
                        .map(|(index, _)| index)
                        .collect()
                });
                if common.len() <= 1 {
                    continue;
                }
                let attends_both = common.iter().any(|&student| {
                    can_enroll(model, &cannot_enroll[student], first)
                        && can_enroll(model, &cannot_enroll[student], second)
                });
                if attends_both {
                    pairs.entry(first.id()).or_default().push(second.id());
                    pairs.entry(second.id()).or_default().push(first.id());
                }
            }
        }

        let mut lectures = pairs.keys().copied().collect::<Vec<_>>();
        lectures.sort();
        debug!(
            "Watching {} pairs of classes for extended student conflicts",
            pairs.values().map(Vec::len).sum::<usize>() / 2
        );
        ExtendedStudentConflicts { pairs, lectures }
    }

    pub fn lectures(&self) -> &[LectureId] {
        &self.lectures
    }

    /// The lectures which may not conflict with `lecture`.
    pub fn watched_with(&self, lecture: LectureId) -> &[LectureId] {
        self.pairs.get(&lecture).map_or(&[], Vec::as_slice)
    }

    fn is_in_conflict(model: &TimetableModel, first: &Placement, second: &Placement) -> bool {
        overlaps(model, first, second) || distance_conflict(model, first, second)
    }

    fn conflicting<'model>(
        &'model self,
        model: &'model TimetableModel,
        assignment: &'model Assignment,
        placement: &'model Placement,
    ) -> impl Iterator<Item = &'model Placement> + 'model {
        self.watched_with(placement.lecture())
            .iter()
            .filter_map(move |&other| assignment.placement(model, other))
            .filter(move |other| Self::is_in_conflict(model, placement, other))
    }

    pub(crate) fn compute_conflicts(
        &self,
        model: &TimetableModel,
        assignment: &Assignment,
        placement: &Placement,
        conflicts: &mut ConflictSet,
    ) {
        for other in self.conflicting(model, assignment, placement) {
            let _ = conflicts.insert(other.id());
        }
    }

    pub(crate) fn in_conflict(
        &self,
        model: &TimetableModel,
        assignment: &Assignment,
        placement: &Placement,
    ) -> bool {
        self.conflicting(model, assignment, placement)
            .next()
            .is_some()
    }

    pub fn is_consistent(&self, model: &TimetableModel, first: &Placement, second: &Placement) -> bool {
        !self.watched_with(first.lecture()).contains(&second.lecture())
            || !Self::is_in_conflict(model, first, second)
    }
}

impl std::fmt::Display for ExtendedStudentConflicts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Extended Student Conflicts")
    }
}

fn ancestors<'model>(
    model: &'model TimetableModel,
    lecture: &'model Lecture,
) -> impl Iterator<Item = &'model Lecture> {
    std::iter::successors(Some(lecture), |lecture| {
        lecture.parent().map(|parent| model.lecture(parent))
    })
}

/// A student can attend the lecture unless they cannot enroll in it or in one of its parents.
fn can_enroll(model: &TimetableModel, cannot_enroll: &HashSet<LectureId>, lecture: &Lecture) -> bool {
    ancestors(model, lecture).all(|lecture| !cannot_enroll.contains(&lecture.id()))
}

/// Whether a student of the course can take both classes of the course.
///
/// The classes have to be of different subparts of the same configuration, and the second class
/// and its parents have to agree with the first class, its parents and the top-level classes
/// which are the only class of their subpart.
fn can_take_together(
    model: &TimetableModel,
    options: &ExtendedStudentConflictOptions,
    first: &Lecture,
    second: &Lecture,
) -> bool {
    if !options.check_same_course
        || first.subpart_id() == second.subpart_id()
        || first.configuration_id() != second.configuration_id()
    {
        return false;
    }

    let mut must_take = ancestors(model, first)
        .map(|lecture| (lecture.subpart_id(), lecture.class_id()))
        .collect::<HashMap<_, _>>();
    let mut top_lectures: BTreeMap<Option<u64>, Vec<&Lecture>> = BTreeMap::new();
    for lecture in model.lectures().filter(|lecture| {
        lecture.parent().is_none() && lecture.configuration_id() == first.configuration_id()
    }) {
        top_lectures
            .entry(lecture.subpart_id())
            .or_default()
            .push(lecture);
    }
    for (subpart, lectures) in top_lectures {
        if let [only] = lectures.as_slice() {
            let _ = must_take.insert(subpart, only.class_id());
        }
    }

    ancestors(model, second).all(|lecture| {
        must_take
            .get(&lecture.subpart_id())
            .map_or(true, |&class_id| class_id == lecture.class_id())
    })
}
