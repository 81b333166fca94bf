use std::collections::BTreeMap;

use log::debug;
use log::warn;

use super::DistanceMetric;
use super::Lecture;
use super::LectureId;
use super::LectureSpec;
use super::Placement;
use super::PlacementId;
use super::RoomLocation;
use super::TimeLocation;
use super::TimetableModel;
use super::WeekCode;
use crate::basic_types::preference::is_soft_bound;
use crate::basic_types::ModelError;
use crate::basic_types::Properties;
use crate::constraints::BalancingOptions;
use crate::constraints::ExtendedStudentConflictOptions;
use crate::constraints::ExtendedStudentConflicts;
use crate::constraints::FlexibleConstraint;
use crate::constraints::FlexibleOptions;
use crate::constraints::GroupConstraint;
use crate::constraints::GroupFlag;
use crate::constraints::GroupOptions;
use crate::constraints::InstructorConstraint;
use crate::constraints::InstructorFairness;
use crate::constraints::InstructorOptions;
use crate::constraints::InstructorUnavailability;
use crate::constraints::JenrlConstraint;
use crate::constraints::MinimizeRoomsConstraint;
use crate::constraints::MinimizeTimeGroupsConstraint;
use crate::constraints::PairCheck;
use crate::constraints::RoomConstraint;
use crate::constraints::RoomSharingModel;
use crate::constraints::SpreadConstraint;
use crate::constraints::TimeGroupsPreset;
use crate::containers::HashMap;
use crate::containers::HashSet;
use crate::containers::KeyedVec;
use crate::containers::StorageKey;
use crate::engine::Constraint;
use crate::engine::ConstraintId;

/// A room of the problem; every room which is added becomes a [`RoomConstraint`].
#[derive(Clone, Debug)]
pub struct RoomSpec {
    pub id: u64,
    pub name: String,
    pub capacity: u32,
    /// The room of which this room is a partition.
    pub parent: Option<u64>,
    pub building_id: Option<u64>,
    pub coordinates: Option<(f64, f64)>,
    pub ignore_too_far: bool,
    /// Rooms which are not enforced can be used by any number of lectures at a time.
    pub enforced: bool,
    pub sharing_model: Option<RoomSharingModel>,
    pub not_available: Vec<TimeLocation>,
}

impl RoomSpec {
    pub fn new(id: u64, name: impl Into<String>, capacity: u32) -> RoomSpec {
        RoomSpec {
            id,
            name: name.into(),
            capacity,
            parent: None,
            building_id: None,
            coordinates: None,
            ignore_too_far: false,
            enforced: true,
            sharing_model: None,
            not_available: vec![],
        }
    }

    pub fn with_parent(mut self, parent_id: u64) -> Self {
        self.parent = Some(parent_id);
        self
    }

    pub fn with_building(mut self, building_id: u64) -> Self {
        self.building_id = Some(building_id);
        self
    }

    pub fn with_coordinates(mut self, x: f64, y: f64) -> Self {
        self.coordinates = Some((x, y));
        self
    }

    pub fn with_ignore_too_far(mut self, ignore_too_far: bool) -> Self {
        self.ignore_too_far = ignore_too_far;
        self
    }

    pub fn unenforced(mut self) -> Self {
        self.enforced = false;
        self
    }

    pub fn with_sharing_model(mut self, sharing_model: RoomSharingModel) -> Self {
        self.sharing_model = Some(sharing_model);
        self
    }

    /// Blocks the room at `time`, e.g. for a class which is not part of the problem.
    pub fn with_not_available(mut self, time: TimeLocation) -> Self {
        self.not_available.push(time);
        self
    }
}

/// An instructor teaching some of the lectures; becomes an [`InstructorConstraint`].
#[derive(Clone, Debug)]
pub struct InstructorSpec {
    pub id: u64,
    pub name: String,
    /// Class ids of the taught lectures.
    pub lectures: Vec<u64>,
    pub ignore_distances: bool,
    pub unavailabilities: Vec<InstructorUnavailability>,
    /// A soft instructor may teach overlapping classes, which are then penalised.
    pub soft: bool,
}

impl InstructorSpec {
    pub fn new(id: u64, name: impl Into<String>) -> InstructorSpec {
        InstructorSpec {
            id,
            name: name.into(),
            lectures: vec![],
            ignore_distances: false,
            unavailabilities: vec![],
            soft: false,
        }
    }

    pub fn with_lectures(mut self, class_ids: &[u64]) -> Self {
        self.lectures.extend_from_slice(class_ids);
        self
    }

    pub fn with_ignore_distances(mut self, ignore_distances: bool) -> Self {
        self.ignore_distances = ignore_distances;
        self
    }

    pub fn with_unavailability(mut self, time: TimeLocation, rooms: Vec<RoomLocation>) -> Self {
        self.unavailabilities
            .push(InstructorUnavailability { time, rooms });
        self
    }

    pub fn soft(mut self) -> Self {
        self.soft = true;
        self
    }
}

/// A student with their course demands; only used for the [`ExtendedStudentConflicts`].
#[derive(Clone, Debug)]
pub struct StudentSpec {
    pub id: u64,
    /// Ids of the requested course offerings.
    pub offerings: Vec<u64>,
    /// Class ids of the classes the student cannot attend, e.g. because of a reservation.
    pub cannot_enroll: Vec<u64>,
}

impl StudentSpec {
    pub fn new(id: u64) -> StudentSpec {
        StudentSpec {
            id,
            offerings: vec![],
            cannot_enroll: vec![],
        }
    }

    pub fn with_offerings(mut self, offering_ids: &[u64]) -> Self {
        self.offerings.extend_from_slice(offering_ids);
        self
    }

    pub fn with_cannot_enroll(mut self, class_ids: &[u64]) -> Self {
        self.cannot_enroll.extend_from_slice(class_ids);
        self
    }
}

#[derive(Clone, Debug)]
struct DistributionSpec {
    id: u64,
    owner: Option<String>,
    reference: String,
    preference: String,
    classes: Vec<u64>,
}

/// Collects the lectures, resources and distribution preferences of a problem and turns them into
/// a [`TimetableModel`].
///
/// Lectures and constraints refer to each other through class ids; [`ModelBuilder::build`]
/// resolves them, removes the placements which the rooms and instructors make impossible and
/// derives the per-lecture data the search relies on.
#[derive(Clone, Debug, Default)]
pub struct ModelBuilder {
    properties: Properties,
    distance_metric: Option<DistanceMetric>,
    lectures: Vec<LectureSpec>,
    rooms: Vec<RoomSpec>,
    instructors: Vec<InstructorSpec>,
    students: Vec<StudentSpec>,
    joint_enrollments: Vec<(u64, u64, f64)>,
    groups: Vec<DistributionSpec>,
    flexibles: Vec<DistributionSpec>,
    spreads: Vec<(String, Vec<u64>)>,
    minimize_rooms: Vec<Vec<u64>>,
    minimize_time_groups: Vec<(TimeGroupsPreset, Vec<u64>)>,
}

impl ModelBuilder {
    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    /// Uses `distance_metric` instead of the one configured by the properties.
    pub fn with_distance_metric(mut self, distance_metric: DistanceMetric) -> Self {
        self.distance_metric = Some(distance_metric);
        self
    }

    pub fn with_lecture(mut self, lecture: LectureSpec) -> Self {
        self.lectures.push(lecture);
        self
    }

    pub fn with_room(mut self, room: RoomSpec) -> Self {
        self.rooms.push(room);
        self
    }

    pub fn with_instructor(mut self, instructor: InstructorSpec) -> Self {
        self.instructors.push(instructor);
        self
    }

    pub fn with_student(mut self, student: StudentSpec) -> Self {
        self.students.push(student);
        self
    }

    /// Adds a joint enrollment of `weight` students between two classes.
    pub fn with_joint_enrollment(mut self, first: u64, second: u64, weight: f64) -> Self {
        self.joint_enrollments.push((first, second, weight));
        self
    }

    pub fn with_group_constraint(
        mut self,
        distribution_id: u64,
        reference: &str,
        preference: &str,
        class_ids: &[u64],
    ) -> Self {
        self.groups.push(DistributionSpec {
            id: distribution_id,
            owner: None,
            reference: reference.to_owned(),
            preference: preference.to_owned(),
            classes: class_ids.to_vec(),
        });
        self
    }

    pub fn with_flexible_constraint(
        mut self,
        id: u64,
        owner: &str,
        reference: &str,
        preference: &str,
        class_ids: &[u64],
    ) -> Self {
        self.flexibles.push(DistributionSpec {
            id,
            owner: Some(owner.to_owned()),
            reference: reference.to_owned(),
            preference: preference.to_owned(),
            classes: class_ids.to_vec(),
        });
        self
    }

    /// Spreads the classes over the week, typically the classes of one scheduling subpart.
    pub fn with_spread_constraint(mut self, name: &str, class_ids: &[u64]) -> Self {
        self.spreads.push((name.to_owned(), class_ids.to_vec()));
        self
    }

    pub fn with_minimize_rooms(mut self, class_ids: &[u64]) -> Self {
        self.minimize_rooms.push(class_ids.to_vec());
        self
    }

    pub fn with_minimize_time_groups(mut self, preset: TimeGroupsPreset, class_ids: &[u64]) -> Self {
        self.minimize_time_groups.push((preset, class_ids.to_vec()));
        self
    }

    pub fn build(self) -> Result<TimetableModel, ModelError> {
        let properties = self.properties;
        let distance_metric = match self.distance_metric {
            Some(metric) => metric,
            None => DistanceMetric::from_properties(&properties)?,
        };
        let group_options = GroupOptions::from_properties(&properties)?;
        let flexible_options = FlexibleOptions::from_properties(&properties)?;
        let balancing_options = BalancingOptions::from_properties(&properties)?;
        let instructor_options = InstructorOptions::from_properties(&properties)?;
        let extended_options = ExtendedStudentConflictOptions::from_properties(&properties)?;
        let max_conflicts = properties.get_f64("General.JenrlMaxConflicts", 1.0)?;
        let max_conflicts_weaken = properties.get_f64("General.JenrlMaxConflictsWeaken", 0.001)?;
        let student_workday_limit = properties.get_i32("StudentConflict.WorkDayLimit", -1)?;

        let mut constraints: KeyedVec<ConstraintId, Constraint> = KeyedVec::default();

        let mut room_by_id: HashMap<u64, ConstraintId> = HashMap::default();
        for room in &self.rooms {
            let id = constraints.push(Constraint::Room(RoomConstraint {
                room_id: room.id,
                name: room.name.clone(),
                building_id: room.building_id,
                capacity: room.capacity,
                enforced: room.enforced,
                coordinates: room.coordinates,
                ignore_too_far: room.ignore_too_far,
                sharing_model: room.sharing_model.clone(),
                not_available: room.not_available.clone(),
                parent: None,
                partitions: vec![],
                day_of_week_offset: group_options.day_of_week_offset,
                lectures: vec![],
            }));
            let _ = room_by_id.insert(room.id, id);
        }
        for room in &self.rooms {
            let Some(parent) = room.parent else {
                continue;
            };
            let parent_id = *room_by_id
                .get(&parent)
                .ok_or(ModelError::UnknownRoom(parent))?;
            let id = room_by_id[&room.id];
            if let Constraint::Room(partition) = &mut constraints[id] {
                partition.parent = Some(parent_id);
            }
            if let Constraint::Room(parent) = &mut constraints[parent_id] {
                parent.partitions.push(id);
            }
        }

        let lecture_by_class: HashMap<u64, LectureId> = self
            .lectures
            .iter()
            .enumerate()
            .map(|(index, spec)| (spec.class_id, LectureId::create_from_index(index)))
            .collect();

        let mut lectures: KeyedVec<LectureId, Lecture> = KeyedVec::default();
        for spec in self.lectures {
            let id = lectures.next_key();
            let parent = spec
                .parent
                .map(|class_id| resolve_one(&lecture_by_class, class_id))
                .transpose()?;
            let lecture = new_lecture(id, spec, parent, |room_id| {
                room_by_id.get(&room_id).map(|&constraint| {
                    let enforced = match &constraints[constraint] {
                        Constraint::Room(room) => room.enforced,
                        _ => false,
                    };
                    (constraint, enforced)
                })
            });
            let _ = lectures.push(lecture);
        }

        for instructor in self.instructors {
            let _ = constraints.push(Constraint::Instructor(InstructorConstraint {
                resource_id: instructor.id,
                name: instructor.name,
                ignore_distances: instructor.ignore_distances,
                unavailabilities: instructor.unavailabilities,
                soft: instructor.soft,
                lectures: resolve(&lecture_by_class, &instructor.lectures)?,
            }));
        }

        for (first, second, weight) in self.joint_enrollments {
            let _ = constraints.push(Constraint::Jenrl(JenrlConstraint {
                first: resolve_one(&lecture_by_class, first)?,
                second: resolve_one(&lecture_by_class, second)?,
                weight,
                max_conflicts,
                max_conflicts_weaken,
            }));
        }

        // Lectures meeting with an earlier lecture are left out of the department balancing.
        let mut meets_with_another: HashSet<LectureId> = HashSet::default();
        for group in self.groups {
            let constraint = GroupConstraint::new(
                group.id,
                &group.reference,
                &group.preference,
                resolve(&lecture_by_class, &group.classes)?,
            )?;
            if matches!(
                constraint.kind().check(),
                PairCheck::MeetWith | PairCheck::MeetWithWeeks
            ) {
                meets_with_another.extend(constraint.lectures().iter().skip(1));
            }
            let _ = constraints.push(Constraint::Group(constraint));
        }

        for flexible in self.flexibles {
            let _ = constraints.push(Constraint::Flexible(FlexibleConstraint::new(
                flexible.id,
                flexible.owner.unwrap_or_default(),
                &flexible.reference,
                &flexible.preference,
                resolve(&lecture_by_class, &flexible.classes)?,
            )?));
        }

        for (name, classes) in self.spreads {
            let _ = constraints.push(Constraint::Spread(SpreadConstraint {
                name,
                department: None,
                options: balancing_options.spread,
                lectures: resolve(&lecture_by_class, &classes)?,
            }));
        }

        if balancing_options.department_balancing {
            let mut by_department: BTreeMap<u64, Vec<LectureId>> = BTreeMap::new();
            for lecture in lectures.iter() {
                if let Some(department) = lecture.department {
                    if !meets_with_another.contains(&lecture.id) {
                        by_department
                            .entry(department)
                            .or_default()
                            .push(lecture.id);
                    }
                }
            }
            for (department, department_lectures) in by_department {
                let _ = constraints.push(Constraint::Spread(SpreadConstraint {
                    name: format!("Department {department}"),
                    department: Some(department),
                    options: balancing_options.department_spread,
                    lectures: department_lectures,
                }));
            }
        }

        for classes in self.minimize_rooms {
            let _ = constraints.push(Constraint::MinimizeRooms(MinimizeRoomsConstraint {
                unassignments_to_weaken: balancing_options.minimize_rooms_unassignments_to_weaken,
                window: balancing_options.spread,
                lectures: resolve(&lecture_by_class, &classes)?,
            }));
        }

        for (preset, classes) in self.minimize_time_groups {
            let _ = constraints.push(Constraint::MinimizeTimeGroups(MinimizeTimeGroupsConstraint {
                name: preset.name().to_owned(),
                groups: preset.groups(),
                unassignments_to_weaken: balancing_options
                    .minimize_time_groups_unassignments_to_weaken,
                lectures: resolve(&lecture_by_class, &classes)?,
            }));
        }

        let mut model = TimetableModel {
            lectures,
            constraints,
            lecture_by_class,
            properties,
            distance_metric,
            group_options,
            flexible_options,
            balancing_options,
            instructor_options,
            weeks: vec![],
            student_workday_limit,
        };

        attach_constraints(&mut model);
        filter_domains(&mut model)?;
        attach_room_constraints(&mut model);
        derive_lecture_data(&mut model);
        if instructor_options.fairness {
            let fairness = instructor_fairness(&model);
            add_constraint(&mut model, Constraint::InstructorFairness(fairness));
        }
        if extended_options.enabled {
            let extended = ExtendedStudentConflicts::new(&model, &self.students, &extended_options);
            add_constraint(&mut model, Constraint::ExtendedStudentConflicts(extended));
        }
        model.weeks = compute_weeks(&model);

        debug!(
            "Built a model of {} lectures and {} constraints",
            model.nr_lectures(),
            model.nr_constraints()
        );
        Ok(model)
    }
}

fn resolve_one(lecture_by_class: &HashMap<u64, LectureId>, class_id: u64) -> Result<LectureId, ModelError> {
    lecture_by_class
        .get(&class_id)
        .copied()
        .ok_or(ModelError::UnknownLecture(class_id))
}

fn resolve(lecture_by_class: &HashMap<u64, LectureId>, class_ids: &[u64]) -> Result<Vec<LectureId>, ModelError> {
    class_ids
        .iter()
        .map(|&class_id| resolve_one(lecture_by_class, class_id))
        .collect()
}

/// Creates the lecture with its domain; `room_constraint` looks up the constraint of a room and
/// whether it is enforced.
fn new_lecture(
    id: LectureId,
    spec: LectureSpec,
    parent: Option<LectureId>,
    room_constraint: impl Fn(u64) -> Option<(ConstraintId, bool)>,
) -> Lecture {
    let nr_placements = spec.domain.len();
    let domain = spec
        .domain
        .into_iter()
        .enumerate()
        .map(|(index, (time, rooms))| {
            let rooms = rooms
                .into_iter()
                .map(|mut room| {
                    if let Some((constraint, enforced)) = room_constraint(room.id()) {
                        room.room_constraint = Some(constraint);
                        room.enforced = enforced;
                    }
                    room
                })
                .collect();
            Placement::new(
                PlacementId {
                    lecture: id,
                    index: index as u32,
                },
                time,
                rooms,
            )
        })
        .collect();

    Lecture {
        id,
        class_id: spec.class_id,
        name: spec.name,
        subpart_id: spec.subpart_id,
        department: spec.department,
        min_class_limit: spec.min_class_limit,
        max_class_limit: spec.max_class_limit,
        room_to_limit_ratio: spec.room_to_limit_ratio,
        nr_rooms: spec.nr_rooms,
        split_attendance: spec.split_attendance,
        weight: spec.weight,
        committed: spec.committed,
        domain,
        initial: spec
            .initial
            .filter(|&index| index < nr_placements)
            .map(|index| PlacementId {
                lecture: id,
                index: index as u32,
            }),
        parent,
        configuration: spec.configuration,
        children: BTreeMap::new(),
        same_subpart_lectures: vec![],
        constraints: vec![],
        hard_constraints: vec![],
        weakening_constraints: vec![],
        jenrl_constraints: vec![],
        jenrl_with: HashMap::default(),
        instructor_constraints: vec![],
        group_constraints: vec![],
        hard_group_soft_constraints: vec![],
        can_share_room_constraints: vec![],
        flexible_constraints: vec![],
        spread_constraints: vec![],
        department_spread_constraint: None,
        can_share_room_with: HashSet::default(),
        ignore_student_conflicts_with: HashSet::default(),
        min_max_time_preference: (0.0, 0.0),
        min_max_room_preference: (0, 0),
        max_achievable_class_limit: 0,
        min_weeks: 0,
    }
}

/// Adds a constraint derived from the finished lectures and registers it with them.
fn add_constraint(model: &mut TimetableModel, constraint: Constraint) {
    let lectures = constraint.lectures();
    let id = model.constraints.push(constraint);
    for lecture in lectures {
        attach(model, lecture, id);
    }
}

/// Collects the classes of every instructor together with the best time preferences they can
/// get; lectures without an instructor are observed as well.
fn instructor_fairness(model: &TimetableModel) -> InstructorFairness {
    let mut instructors_of: HashMap<LectureId, Vec<usize>> = HashMap::default();
    let mut best_values = vec![];
    let instructors = model
        .constraints
        .iter()
        .filter_map(|constraint| match constraint {
            Constraint::Instructor(instructor) => Some(instructor),
            _ => None,
        });
    for (index, instructor) in instructors.enumerate() {
        let mut best = 0.0;
        for &lecture in instructor.lectures() {
            instructors_of.entry(lecture).or_default().push(index);
            best += model
                .lecture(lecture)
                .domain()
                .iter()
                .map(|placement| InstructorFairness::time_value(model, placement))
                .fold(f64::INFINITY, f64::min);
        }
        best_values.push(best);
    }
    InstructorFairness {
        instructors_of,
        best_values,
        lectures: model.lecture_ids().collect(),
    }
}

/// Registers every constraint, apart from the room constraints, with its lectures.
fn attach_constraints(model: &mut TimetableModel) {
    let mut attachments = vec![];
    for (id, constraint) in model.constraints.enumerate() {
        if matches!(constraint, Constraint::Room(_)) {
            continue;
        }
        for lecture in constraint.lectures() {
            attachments.push((lecture, id));
        }
    }
    for (lecture, id) in attachments {
        attach(model, lecture, id);
    }
}

fn attach(model: &mut TimetableModel, lecture_id: LectureId, id: ConstraintId) {
    let constraint = &model.constraints[id];
    let lecture = &mut model.lectures[lecture_id];
    if lecture.constraints.contains(&id) {
        return;
    }
    lecture.constraints.push(id);
    if constraint.is_hard() {
        lecture.hard_constraints.push(id);
        if constraint.is_weakening() {
            lecture.weakening_constraints.push(id);
        }
    }

    match constraint {
        Constraint::Room(_) => {}
        Constraint::Instructor(_) => lecture.instructor_constraints.push(id),
        Constraint::Jenrl(jenrl) => {
            lecture.jenrl_constraints.push(id);
            let _ = lecture.jenrl_with.insert(jenrl.another(lecture_id), id);
        }
        Constraint::Group(group) => {
            if group.can_share_room() {
                lecture.can_share_room_constraints.push(id);
                lecture.can_share_room_with.extend(
                    group
                        .lectures()
                        .iter()
                        .filter(|&&other| other != lecture_id),
                );
            } else {
                lecture.group_constraints.push(id);
                if group.is_required() || group.is_prohibited() {
                    lecture.hard_group_soft_constraints.push(id);
                }
            }
            if group.kind().is(GroupFlag::IgnoreStudents) {
                lecture.ignore_student_conflicts_with.extend(
                    group
                        .lectures()
                        .iter()
                        .filter(|&&other| other != lecture_id),
                );
            }
        }
        Constraint::Flexible(_) => lecture.flexible_constraints.push(id),
        Constraint::Spread(spread) => {
            if spread.department.is_some() {
                lecture.department_spread_constraint = Some(id);
            } else {
                lecture.spread_constraints.push(id);
            }
        }
        Constraint::MinimizeRooms(_)
        | Constraint::MinimizeTimeGroups(_)
        | Constraint::InstructorFairness(_)
        | Constraint::ExtendedStudentConflicts(_) => {}
    }
}

/// Whether the rooms and the instructors of the lecture can be used at `placement`; soft
/// instructors never rule out a placement.
fn is_available(model: &TimetableModel, lecture: &Lecture, placement: &Placement) -> bool {
    let rooms_available = placement
        .rooms()
        .iter()
        .filter_map(|room| room.room_constraint())
        .filter_map(|id| model.room_constraint(id))
        .all(|room| room.is_available(model, lecture, placement.time()));
    rooms_available
        && lecture
            .instructor_constraints
            .iter()
            .filter_map(|&id| model.instructor_constraint(id))
            .filter(|instructor| !instructor.is_soft())
            .all(|instructor| instructor.is_available(model.distance_metric(), placement))
}

/// Removes the unavailable placements from the domains of the lectures which are not committed.
fn filter_domains(model: &mut TimetableModel) -> Result<(), ModelError> {
    let kept: Vec<Vec<usize>> = model
        .lectures
        .iter()
        .map(|lecture| {
            (0..lecture.domain.len())
                .filter(|&index| {
                    lecture.committed || is_available(model, lecture, &lecture.domain[index])
                })
                .collect()
        })
        .collect();

    for (lecture, kept) in model.lectures.iter_mut().zip(kept) {
        if lecture.committed {
            if lecture.initial.is_none() {
                return Err(ModelError::CommittedWithoutPlacement(lecture.name.clone()));
            }
            continue;
        }
        if kept.len() < lecture.domain.len() {
            debug!(
                "{} of {} placements of {} are not available",
                lecture.domain.len() - kept.len(),
                lecture.domain.len(),
                lecture.name
            );
        }
        let initial = lecture.initial.map(|initial| initial.index as usize);
        lecture.initial = None;
        let domain = std::mem::take(&mut lecture.domain);
        for (new_index, &old_index) in kept.iter().enumerate() {
            let old = &domain[old_index];
            let id = PlacementId {
                lecture: lecture.id,
                index: new_index as u32,
            };
            lecture
                .domain
                .push(Placement::new(id, old.time().clone(), old.rooms().to_vec()));
            if initial == Some(old_index) {
                lecture.initial = Some(id);
            }
        }
        if initial.is_some() && lecture.initial.is_none() {
            warn!("The initial placement of {} is not available", lecture.name);
        }
        if lecture.domain.is_empty() {
            return Err(ModelError::EmptyDomain(lecture.name.clone()));
        }
    }
    Ok(())
}

/// Registers the room constraints with the lectures which can use their rooms.
fn attach_room_constraints(model: &mut TimetableModel) {
    let mut attachments = vec![];
    for lecture in model.lectures.iter() {
        let mut rooms: Vec<ConstraintId> = lecture
            .domain
            .iter()
            .flat_map(Placement::rooms)
            .filter_map(|room| room.room_constraint())
            .collect();
        rooms.sort();
        rooms.dedup();
        attachments.extend(rooms.into_iter().map(|room| (lecture.id, room)));
    }
    for (lecture, room) in attachments {
        if let Constraint::Room(constraint) = &mut model.constraints[room] {
            constraint.lectures.push(lecture);
        }
        attach(model, lecture, room);
    }
}

/// Derives the subpart structure, the preference bounds and the penalties of the placements.
fn derive_lecture_data(model: &mut TimetableModel) {
    let mut by_subpart: HashMap<u64, Vec<LectureId>> = HashMap::default();
    let mut children: Vec<(LectureId, u64, LectureId)> = vec![];
    for lecture in model.lectures.iter() {
        if let Some(subpart) = lecture.subpart_id {
            by_subpart.entry(subpart).or_default().push(lecture.id);
        }
        if let Some(parent) = lecture.parent {
            children.push((parent, lecture.subpart_id.unwrap_or(0), lecture.id));
        }
    }
    for (parent, subpart, child) in children {
        model.lectures[parent]
            .children
            .entry(subpart)
            .or_default()
            .push(child);
    }

    for lecture in model.lectures.iter_mut() {
        lecture.same_subpart_lectures = match lecture.subpart_id {
            Some(subpart) => by_subpart[&subpart].clone(),
            None => vec![lecture.id],
        };

        lecture.min_max_time_preference = bounds(
            lecture
                .domain
                .iter()
                .filter(|placement| is_soft_bound(placement.time().preference() as f64))
                .map(|placement| placement.time().normalized_preference()),
        )
        .unwrap_or((0.0, 0.0));
        lecture.min_max_room_preference = bounds(
            lecture
                .domain
                .iter()
                .filter(|placement| !placement.rooms().is_empty())
                .map(|placement| placement.sum_room_preference())
                .filter(|&preference| is_soft_bound(preference as f64)),
        )
        .unwrap_or((0, 0));

        let discouraged = lecture.discouraged_room_size();
        let strongly_discouraged = lecture.strongly_discouraged_room_size();
        let split_attendance = lecture.split_attendance;
        let time_bounds = lecture.min_max_time_preference;
        let room_bounds = lecture.min_max_room_preference;
        for placement in lecture.domain.iter_mut() {
            placement.room_size = room_size(placement, split_attendance);
            placement.too_big_room_preference = if placement.rooms().is_empty() {
                0
            } else if placement.room_size > strongly_discouraged {
                2
            } else if placement.room_size > discouraged {
                1
            } else {
                0
            };
            placement.compute_penalties(time_bounds, room_bounds);
        }

        lecture.min_weeks = lecture
            .domain
            .iter()
            .map(|placement| placement.time().nr_weeks())
            .min()
            .unwrap_or(0);
    }

    let mut achievable: KeyedVec<LectureId, Option<u32>> =
        KeyedVec::with_len(model.nr_lectures(), None);
    for lecture in model.lecture_ids() {
        let _ = max_achievable_class_limit(model, lecture, &mut achievable);
    }
    for (lecture, limit) in model.lectures.iter_mut().zip(achievable.iter()) {
        lecture.max_achievable_class_limit = limit.unwrap_or(lecture.max_class_limit);
    }
}

fn bounds<T: PartialOrd + Copy>(values: impl Iterator<Item = T>) -> Option<(T, T)> {
    values.fold(None, |bounds, value| match bounds {
        None => Some((value, value)),
        Some((min, max)) => Some((
            if value < min { value } else { min },
            if value > max { value } else { max },
        )),
    })
}

fn room_size(placement: &Placement, split_attendance: bool) -> u32 {
    let sizes = placement.rooms().iter().map(|room| room.size());
    if split_attendance {
        sizes.sum()
    } else {
        sizes.min().unwrap_or(0)
    }
}

/// The largest class limit the lecture can reach given its rooms and the limits of its children,
/// but at least its minimal class limit.
fn max_achievable_class_limit(
    model: &TimetableModel,
    lecture_id: LectureId,
    achievable: &mut KeyedVec<LectureId, Option<u32>>,
) -> u32 {
    if let Some(limit) = achievable[lecture_id] {
        return limit;
    }
    let lecture = model.lecture(lecture_id);
    let mut limit = lecture.max_class_limit;
    if lecture.nr_rooms > 0 && lecture.room_to_limit_ratio > 0.0 {
        let max_room_size = lecture
            .domain
            .iter()
            .map(|placement| placement.room_size)
            .max()
            .unwrap_or(0);
        limit = limit.min((max_room_size as f64 / lecture.room_to_limit_ratio).floor() as u32);
    }
    for subpart_children in lecture.children.values() {
        let children_limit = subpart_children
            .iter()
            .map(|&child| max_achievable_class_limit(model, child, achievable))
            .sum::<u32>();
        limit = limit.min(children_limit);
    }
    let limit = limit.max(lecture.min_class_limit);
    achievable[lecture_id] = Some(limit);
    limit
}

/// Splits the days of the term into weeks of seven days each.
///
/// The term is given by `DatePattern.CustomDatePattern` or `DatePattern.Default`; when neither is
/// set it is the union of the dates of every time of every lecture.
fn compute_weeks(model: &TimetableModel) -> Vec<WeekCode> {
    let pattern = model
        .properties
        .get("DatePattern.CustomDatePattern")
        .or_else(|| model.properties.get("DatePattern.Default"));
    let term = match pattern {
        Some(pattern) => WeekCode::from_pattern(pattern),
        None => {
            let mut term = WeekCode::default();
            for placement in model.lectures().flat_map(Lecture::domain) {
                term.union_with(placement.time().week_code());
            }
            term
        }
    };

    let mut weeks: Vec<WeekCode> = vec![];
    for (index, date) in term.dates().enumerate() {
        if index % 7 == 0 {
            weeks.push(WeekCode::with_capacity(term.capacity()));
        }
        if let Some(week) = weeks.last_mut() {
            week.insert(date);
        }
    }
    if weeks.is_empty() {
        weeks.push(WeekCode::full_year());
    }
    weeks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::ReferenceError;
    use crate::constraints::SlotUsage;
    use crate::model::DAY_CODES;

    fn monday(start: i32) -> TimeLocation {
        TimeLocation::new(DAY_CODES[0], start, 12)
    }

    #[test]
    fn unknown_classes_are_reported() {
        let result = ModelBuilder::default()
            .with_lecture(LectureSpec::new(1, "L1").with_placement(monday(96), vec![]))
            .with_joint_enrollment(1, 2, 1.0)
            .build();

        assert!(matches!(result, Err(ModelError::UnknownLecture(2))));
    }

    #[test]
    fn malformed_references_fail_the_build() {
        let result = ModelBuilder::default()
            .with_lecture(LectureSpec::new(1, "L1").with_placement(monday(96), vec![]))
            .with_group_constraint(1, "SAME_LUNCH", "R", &[1])
            .build();

        assert!(matches!(
            result,
            Err(ModelError::Reference(ReferenceError::UnknownGroupConstraint(_)))
        ));
    }

    #[test]
    fn unavailable_placements_are_removed_and_the_initial_placement_is_remapped() {
        let room = RoomLocation::new(1, "A", 30);
        let model = ModelBuilder::default()
            .with_room(RoomSpec::new(1, "A", 30).with_not_available(monday(96)))
            .with_lecture(
                LectureSpec::new(1, "L1")
                    .with_class_limit(10, 10)
                    .with_placement(monday(96), vec![room.clone()])
                    .with_placement(monday(120), vec![room])
                    .with_initial(1),
            )
            .build()
            .unwrap();
        let lecture = model.lecture(model.lecture_by_class_id(1).unwrap());

        assert_eq!(lecture.domain().len(), 1);
        assert_eq!(lecture.domain()[0].time().start_slot(), 120);
        assert_eq!(
            lecture.initial(),
            Some(PlacementId {
                lecture: lecture.id(),
                index: 0
            })
        );
    }

    #[test]
    fn a_lecture_without_available_placements_is_an_error() {
        let mut sharing = RoomSharingModel::default();
        sharing.set(0, 96, 12, SlotUsage::NotAvailable);
        let result = ModelBuilder::default()
            .with_room(RoomSpec::new(1, "A", 30).with_sharing_model(sharing))
            .with_lecture(
                LectureSpec::new(1, "L1")
                    .with_placement(monday(96), vec![RoomLocation::new(1, "A", 30)]),
            )
            .build();

        assert!(matches!(result, Err(ModelError::EmptyDomain(_))));
    }

    #[test]
    fn committed_lectures_need_an_initial_placement() {
        let result = ModelBuilder::default()
            .with_lecture(
                LectureSpec::new(1, "L1")
                    .with_placement(monday(96), vec![])
                    .committed(),
            )
            .build();

        assert!(matches!(result, Err(ModelError::CommittedWithoutPlacement(_))));
    }

    #[test]
    fn room_constraints_are_attached_to_the_lectures_using_the_room() {
        let room = RoomLocation::new(1, "A", 30);
        let model = ModelBuilder::default()
            .with_room(RoomSpec::new(1, "A", 30))
            .with_room(RoomSpec::new(2, "B", 30))
            .with_lecture(
                LectureSpec::new(1, "L1").with_placement(monday(96), vec![room.clone()]),
            )
            .with_lecture(LectureSpec::new(2, "L2").with_placement(monday(96), vec![room]))
            .build()
            .unwrap();
        let rooms = model
            .constraint_ids()
            .filter_map(|id| model.room_constraint(id).map(|room| (id, room)))
            .collect::<Vec<_>>();

        assert_eq!(rooms[0].1.lectures.len(), 2);
        assert!(rooms[1].1.lectures.is_empty());
        for lecture in model.lectures() {
            assert_eq!(lecture.constraints(), &[rooms[0].0]);
            assert_eq!(lecture.hard_constraints(), &[rooms[0].0]);
            assert_eq!(
                lecture.domain()[0].rooms()[0].room_constraint(),
                Some(rooms[0].0)
            );
        }
    }

    #[test]
    fn group_constraints_derive_room_sharing_and_ignored_conflicts() {
        let model = ModelBuilder::default()
            .with_lecture(LectureSpec::new(1, "L1").with_placement(monday(96), vec![]))
            .with_lecture(LectureSpec::new(2, "L2").with_placement(monday(96), vec![]))
            .with_group_constraint(1, "CAN_SHARE_ROOM", "R", &[1, 2])
            .with_group_constraint(2, "DIFF_TIME_IGN_STUDS", "R", &[1, 2])
            .with_group_constraint(3, "SAME_TIME", "P", &[1, 2])
            .build()
            .unwrap();
        let first = model.lecture_by_class_id(1).unwrap();
        let second = model.lecture_by_class_id(2).unwrap();
        let lecture = model.lecture(first);

        assert!(lecture.can_share_room_with(second));
        assert!(lecture.is_to_ignore_student_conflicts_with(second));
        assert!(!lecture.is_to_ignore_student_conflicts_with(first));
        assert_eq!(lecture.can_share_room_constraints().len(), 1);
        assert_eq!(lecture.group_constraints().len(), 2);
        assert_eq!(lecture.hard_group_soft_constraints().len(), 2);
    }

    #[test]
    fn subparts_and_class_limits_are_derived() {
        let small = RoomLocation::new(1, "Small", 15);
        let large = RoomLocation::new(2, "Large", 40);
        let model = ModelBuilder::default()
            .with_lecture(
                LectureSpec::new(1, "Lec")
                    .with_subpart(10)
                    .with_class_limit(20, 60)
                    .with_placement(monday(96), vec![large]),
            )
            .with_lecture(
                LectureSpec::new(2, "Lab 1")
                    .with_subpart(20)
                    .with_parent(1)
                    .with_class_limit(10, 20)
                    .with_placement(monday(120), vec![small.clone()]),
            )
            .with_lecture(
                LectureSpec::new(3, "Lab 2")
                    .with_subpart(20)
                    .with_parent(1)
                    .with_class_limit(10, 20)
                    .with_placement(monday(144), vec![small]),
            )
            .build()
            .unwrap();
        let parent = model.lecture(model.lecture_by_class_id(1).unwrap());
        let lab = model.lecture(model.lecture_by_class_id(2).unwrap());

        assert_eq!(lab.same_subpart_lectures().len(), 2);
        assert!(!lab.is_single_section());
        assert!(parent.is_single_section());
        assert_eq!(parent.children()[&20].len(), 2);
        // each lab fits 15 students, the lecture room 40
        assert_eq!(lab.max_achievable_class_limit(), 15);
        assert_eq!(parent.max_achievable_class_limit(), 30);
    }

    #[test]
    fn department_spread_skips_lectures_meeting_with_another() {
        let model = ModelBuilder::default()
            .with_lecture(
                LectureSpec::new(1, "L1")
                    .with_department(5)
                    .with_placement(monday(96), vec![]),
            )
            .with_lecture(
                LectureSpec::new(2, "L2")
                    .with_department(5)
                    .with_placement(monday(96), vec![]),
            )
            .with_group_constraint(1, "MEET_WITH", "R", &[1, 2])
            .build()
            .unwrap();
        let first = model.lecture(model.lecture_by_class_id(1).unwrap());
        let second = model.lecture(model.lecture_by_class_id(2).unwrap());

        assert!(first.department_spread_constraint().is_some());
        assert!(second.department_spread_constraint().is_none());
    }

    #[test]
    fn weeks_follow_the_default_date_pattern() {
        let model = ModelBuilder::default()
            .with_properties(Properties::default().set("DatePattern.Default", "0111111111111110"))
            .with_lecture(LectureSpec::new(1, "L1").with_placement(monday(96), vec![]))
            .build()
            .unwrap();

        assert_eq!(model.weeks().len(), 2);
        assert_eq!(model.weeks()[0].dates().collect::<Vec<_>>(), (1..8).collect::<Vec<_>>());
        assert_eq!(model.weeks()[1].dates().collect::<Vec<_>>(), (8..15).collect::<Vec<_>>());
    }
}
