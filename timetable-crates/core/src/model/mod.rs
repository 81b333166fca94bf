//! The timetabling problem: lectures (the variables), their placements (the values) and the
//! [`TimetableModel`] holding them together with the constraints between them.
mod builder;
mod distance_metric;
mod lecture;
mod placement;
mod room_location;
mod time_location;
mod timetable_model;

pub use builder::InstructorSpec;
pub use builder::ModelBuilder;
pub use builder::RoomSpec;
pub use builder::StudentSpec;
pub use distance_metric::DistanceMetric;
pub use distance_metric::Ellipsoid;
pub use lecture::Lecture;
pub use lecture::LectureId;
pub use lecture::LectureSpec;
pub(crate) use placement::rooms_distance_in_meters;
pub(crate) use placement::rooms_distance_in_minutes;
pub use placement::Placement;
pub use placement::PlacementId;
pub use room_location::RoomLocation;
pub use time_location::*;
pub use timetable_model::TimetableModel;

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Two lectures which can only use one room; the first placements of the lectures overlap,
    /// the second placement of each lecture does not overlap with anything.
    pub(crate) fn two_lectures_one_room() -> TimetableModel {
        let room = RoomLocation::new(1, "A", 30);
        ModelBuilder::default()
            .with_room(RoomSpec::new(1, "A", 30))
            .with_lecture(
                LectureSpec::new(1, "L1")
                    .with_class_limit(20, 20)
                    .with_placement(TimeLocation::new(DAY_CODES[0], 96, 12), vec![room.clone()])
                    .with_placement(TimeLocation::new(DAY_CODES[1], 96, 12), vec![room.clone()]),
            )
            .with_lecture(
                LectureSpec::new(2, "L2")
                    .with_class_limit(20, 20)
                    .with_placement(TimeLocation::new(DAY_CODES[0], 96, 12), vec![room.clone()])
                    .with_placement(TimeLocation::new(DAY_CODES[2], 96, 12), vec![room]),
            )
            .build()
            .unwrap_or_else(|error| panic!("the model is valid: {error}"))
    }

    #[test]
    fn committed_lectures_start_assigned() {
        let room = RoomLocation::new(1, "A", 30);
        let model = ModelBuilder::default()
            .with_lecture(
                LectureSpec::new(1, "Fixed")
                    .with_placement(TimeLocation::new(DAY_CODES[0], 96, 12), vec![room.clone()])
                    .with_placement(TimeLocation::new(DAY_CODES[1], 96, 12), vec![room])
                    .with_initial(1)
                    .committed(),
            )
            .build()
            .unwrap();
        let lecture = model.lecture_ids().next().unwrap();

        let assignment = model.create_assignment();

        assert_eq!(
            assignment.value(lecture),
            Some(PlacementId { lecture, index: 1 })
        );
        assert_eq!(assignment.nr_unassigned(), 0);
    }

    #[test]
    fn placements_are_looked_up_by_id() {
        let model = two_lectures_one_room();
        let second = model.lecture_by_class_id(2).unwrap();

        let placement = model.placement(PlacementId {
            lecture: second,
            index: 1,
        });

        assert_eq!(placement.time().day_code(), DAY_CODES[2]);
        assert_eq!(placement.lecture(), second);
    }
}
