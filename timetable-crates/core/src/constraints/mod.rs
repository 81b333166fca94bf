//! The constraints of a timetabling model.
//!
//! Every constraint is a plain value owned by the [`TimetableModel`](crate::model::TimetableModel)
//! together with a context type holding the state it maintains for an
//! [`Assignment`](crate::engine::Assignment). The resource constraints ([`RoomConstraint`] and
//! [`InstructorConstraint`]) prevent double bookings, the [`JenrlConstraint`] counts student
//! conflicts, the [`GroupConstraint`]s and [`FlexibleConstraint`]s express distribution
//! preferences and the balancing constraints spread lectures over times and rooms. The
//! [`ExtendedStudentConflicts`] keep apart classes which students are likely to take together even
//! without a joint enrollment, and [`InstructorFairness`] evens out the time preferences of the
//! instructors.
mod balancing;
mod extended_student_conflicts;
mod flexible;
mod group;
mod instructor;
pub mod jenrl;
mod room;
mod slot_resource;

pub use balancing::BalancingOptions;
pub use balancing::GroupOfTime;
pub use balancing::MinimizeRoomsConstraint;
pub use balancing::MinimizeRoomsContext;
pub use balancing::MinimizeTimeGroupsConstraint;
pub use balancing::MinimizeTimeGroupsContext;
pub use balancing::SpreadConstraint;
pub use balancing::SpreadContext;
pub use balancing::SpreadOptions;
pub use balancing::TimeGroupsPreset;
pub use extended_student_conflicts::ExtendedStudentConflictOptions;
pub use extended_student_conflicts::ExtendedStudentConflicts;
pub use flexible::FlexibleConstraint;
pub use flexible::FlexibleContext;
pub use flexible::FlexibleKind;
pub use flexible::FlexibleOptions;
pub use group::GroupConstraint;
pub use group::GroupConstraintType;
pub use group::GroupContext;
pub use group::GroupFlag;
pub use group::GroupOptions;
pub use group::MaxHoursMode;
pub use group::PairCheck;
pub use instructor::InstructorConstraint;
pub use instructor::InstructorContext;
pub use instructor::InstructorFairness;
pub use instructor::InstructorFairnessContext;
pub use instructor::InstructorOptions;
pub use instructor::InstructorUnavailability;
pub use instructor::LunchBreak;
pub use jenrl::JenrlConstraint;
pub use jenrl::JenrlContext;
pub use jenrl::StudentConflictKind;
pub use jenrl::StudentConflictKinds;
pub use room::RoomConstraint;
pub use room::RoomContext;
pub use room::RoomSharingModel;
pub use room::SlotUsage;
pub(crate) use slot_resource::SlotResource;
