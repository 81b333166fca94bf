//! # Timetable core
//! The core of an iterative forward search solver for university course timetabling: lectures are
//! given a placement (a time and a set of rooms) such that every hard constraint holds while the
//! weighted soft criteria are as low as possible.
//!
//! A problem is described by a [`model::TimetableModel`], created with a [`model::ModelBuilder`]
//! from lectures, rooms, instructors, joint enrollments and distribution constraints. The current
//! solution is an [`engine::Assignment`] which keeps the state of every constraint up-to-date
//! incrementally. A [`solver::Solver`] improves the assignment one move at a time, using the
//! [`heuristics`] to select the moves:
//! ```rust
//! # use rand::rngs::SmallRng;
//! # use rand::SeedableRng;
//! # use timetable_core::heuristics::NeighbourSelectionWithSuggestions;
//! # use timetable_core::model::*;
//! # use timetable_core::solver::Solver;
//! # use timetable_core::Properties;
//! let room = RoomLocation::new(1, "A", 40);
//! let model = ModelBuilder::default()
//!     .with_room(RoomSpec::new(1, "A", 40))
//!     .with_lecture(
//!         LectureSpec::new(1, "Algebra")
//!             .with_class_limit(30, 30)
//!             .with_placement(TimeLocation::new(DAY_CODES[0], 96, 12), vec![room.clone()])
//!             .with_placement(TimeLocation::new(DAY_CODES[1], 96, 12), vec![room.clone()]),
//!     )
//!     .with_lecture(
//!         LectureSpec::new(2, "Calculus")
//!             .with_class_limit(30, 30)
//!             .with_placement(TimeLocation::new(DAY_CODES[0], 96, 12), vec![room]),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let properties = Properties::default()
//!     .set("Termination.MaxIters", 100)
//!     .set("Termination.StopWhenComplete", true);
//! let mut solver = Solver::from_properties(&properties).unwrap();
//! let mut neighbour_selection = NeighbourSelectionWithSuggestions::from_properties(&properties).unwrap();
//! let mut assignment = model.create_assignment();
//! let mut termination = solver.options().termination();
//!
//! let result = solver.solve(
//!     &model,
//!     &mut assignment,
//!     &mut neighbour_selection,
//!     &mut termination,
//!     &mut SmallRng::seed_from_u64(42),
//! );
//! assert_eq!(result.best().nr_unassigned(), 0);
//! ```
//!
//! Every component is configured through [`Properties`], a flat map of named values; each
//! component documents the keys it recognises.
pub(crate) mod basic_types;
pub mod containers;
pub(crate) mod timetable_asserts;

pub mod constraints;
pub mod engine;
pub mod heuristics;
pub mod model;
pub mod solver;
pub mod statistics;

pub use convert_case;
pub use rand;

pub use crate::basic_types::preference;
pub use crate::basic_types::ModelError;
pub use crate::basic_types::Properties;
pub use crate::basic_types::PropertyError;
pub use crate::basic_types::Random;
pub use crate::basic_types::ReferenceError;
pub use crate::engine::Assignment;
pub use crate::model::ModelBuilder;
pub use crate::model::TimetableModel;
pub use crate::solver::Solver;
