use std::fmt::Debug;
use std::marker::PhantomData;
use std::time::Duration;

use super::undo_guard::UndoGuard;
use super::Neighbour;
use super::NeighbourSelection;
use super::TimetableComparator;
use crate::basic_types::Properties;
use crate::basic_types::PropertyError;
use crate::basic_types::Random;
use crate::engine::Assignment;
use crate::model::LectureId;
use crate::model::Placement;
use crate::model::PlacementId;
use crate::model::TimetableModel;
use crate::solver::termination::TimeBudget;

/// Which placements of a lecture a [`RandomSwap`] may move it to.
pub trait SwapAlternatives: Debug {
    fn is_alternative(current: &Placement, candidate: &Placement) -> bool;
}

/// Another time in the same rooms.
#[derive(Clone, Copy, Debug, Default)]
pub struct SameRooms;

impl SwapAlternatives for SameRooms {
    fn is_alternative(current: &Placement, candidate: &Placement) -> bool {
        candidate.time().preference() <= 50
            && !candidate.time().same_time(current.time())
            && candidate.same_rooms(current)
    }
}

/// Another room at the same time; only for lectures in a single room.
#[derive(Clone, Copy, Debug, Default)]
pub struct SameTime;

impl SwapAlternatives for SameTime {
    fn is_alternative(current: &Placement, candidate: &Placement) -> bool {
        match (current.rooms(), candidate.rooms()) {
            ([current_room], [candidate_room]) => {
                candidate_room.preference() <= 50
                    && candidate_room.id() != current_room.id()
                    && candidate.time().same_time(current.time())
                    && candidate.time().week_code() == current.time().week_code()
            }
            _ => false,
        }
    }
}

/// Moves an assigned lecture to another time, re-timing the lectures it displaces.
pub type TimeSwap = RandomSwap<SameRooms>;
/// Moves an assigned lecture to another room, moving the lectures it displaces to other rooms.
pub type RoomSwap = RandomSwap<SameTime>;

/// Moves a random assigned lecture to one of its alternatives (see [`SwapAlternatives`]) and
/// tries to move every lecture this displaces to one of their alternatives as well, so that the
/// move leaves no lecture unassigned.
///
/// Each displaced lecture gets at most `RandomSwap.MaxAttempts` (3) alternatives, as does the
/// moved lecture when it displaces others; a swap gives up after `RandomSwap.TimeLimit`
/// milliseconds (200, 0 for no limit). In hill climbing mode only moves which do not make the
/// solution worse are returned.
#[derive(Debug)]
pub struct RandomSwap<A> {
    comparator: TimetableComparator,
    max_attempts: usize,
    time_limit: Option<Duration>,
    hill_climbing: bool,
    alternatives: PhantomData<A>,
}

impl<A: SwapAlternatives> Default for RandomSwap<A> {
    fn default() -> Self {
        RandomSwap::from_properties(&Properties::default())
            .unwrap_or_else(|_| unreachable!("the defaults are valid"))
    }
}

impl<A: SwapAlternatives> RandomSwap<A> {
    pub fn from_properties(properties: &Properties) -> Result<RandomSwap<A>, PropertyError> {
        let time_limit = properties.get_u64("RandomSwap.TimeLimit", 200)?;
        Ok(RandomSwap {
            comparator: TimetableComparator::from_properties(properties)?,
            max_attempts: properties.get_u32("RandomSwap.MaxAttempts", 3)? as usize,
            time_limit: (time_limit > 0).then(|| Duration::from_millis(time_limit)),
            hill_climbing: false,
            alternatives: PhantomData,
        })
    }

    pub fn with_hill_climbing(mut self, hill_climbing: bool) -> Self {
        self.hill_climbing = hill_climbing;
        self
    }

    pub fn comparator(&self) -> &TimetableComparator {
        &self.comparator
    }

    fn alternatives(model: &TimetableModel, current: &Placement) -> Vec<PlacementId> {
        model
            .lecture(current.lecture())
            .domain()
            .iter()
            .filter(|candidate| A::is_alternative(current, candidate))
            .map(Placement::id)
            .collect()
    }

    /// Looks for a move of `lecture`, which has to be assigned.
    fn select_move(
        &self,
        model: &TimetableModel,
        assignment: &mut Assignment,
        lecture: LectureId,
        base_value: f64,
        random: &mut dyn Random,
    ) -> Option<Neighbour> {
        let current = assignment.placement(model, lecture)?;
        let candidates = Self::alternatives(model, current);
        let offset = random.choose_index(candidates.len())?;
        let mut budget = self.time_limit.map(TimeBudget::starting_now);
        let mut attempts = 0;

        for index in 0..candidates.len() {
            let candidate = model.placement(candidates[(index + offset) % candidates.len()]);
            let mut conflicts = assignment.conflicts(model, candidate, random);
            if conflicts.contains(&candidate.id()) {
                continue;
            }
            conflicts.retain(|conflict| {
                conflict.lecture != lecture && assignment.values().holds(*conflict)
            });
            if conflicts.is_empty() {
                let delta = self.comparator.placement_value(model, assignment, candidate)
                    - self.comparator.placement_value(model, assignment, current);
                if !self.hill_climbing || delta <= 0.0 {
                    return Some(Neighbour::Simple {
                        placement: candidate.id(),
                    });
                }
                continue;
            }
            if conflicts
                .iter()
                .any(|conflict| model.lecture(conflict.lecture).is_committed())
            {
                continue;
            }

            let mut conflicts = conflicts.into_iter().collect::<Vec<_>>();
            conflicts.sort_unstable();
            let mut search = SwapSearch {
                undo: UndoGuard::new(model, assignment),
                swap: self,
                random: &mut *random,
                budget: budget.as_mut(),
                base_value,
            };
            for conflict in &conflicts {
                search.undo.change(conflict.lecture, None);
            }
            search.undo.change(lecture, Some(candidate.id()));
            let mut placements = vec![candidate.id()];
            let delta = search.resolve(&conflicts, 0, &mut placements);
            drop(search);
            attempts += 1;

            if let Some(delta) = delta {
                placements.sort_unstable();
                return Some(Neighbour::Suggestion {
                    placements,
                    value: base_value + delta,
                });
            }
            if attempts >= self.max_attempts {
                break;
            }
        }
        None
    }
}

impl<A: SwapAlternatives> NeighbourSelection for RandomSwap<A> {
    fn select_neighbour(
        &mut self,
        model: &TimetableModel,
        assignment: &mut Assignment,
        random: &mut dyn Random,
    ) -> Option<Neighbour> {
        let lectures = model.lecture_ids().collect::<Vec<_>>();
        let offset = random.choose_index(lectures.len())?;
        let base_value = self.comparator.current_value(assignment);
        for index in 0..lectures.len() {
            let lecture = lectures[(index + offset) % lectures.len()];
            if model.lecture(lecture).is_committed() || !assignment.values().is_assigned(lecture) {
                continue;
            }
            if let Some(neighbour) =
                self.select_move(model, assignment, lecture, base_value, random)
            {
                return Some(neighbour);
            }
        }
        None
    }
}

struct SwapSearch<'a, A> {
    undo: UndoGuard<'a>,
    swap: &'a RandomSwap<A>,
    random: &'a mut dyn Random,
    budget: Option<&'a mut TimeBudget>,
    base_value: f64,
}

impl<A: SwapAlternatives> SwapSearch<'_, A> {
    /// Moves the lectures of `conflicts[index..]`, which are unassigned, to alternatives of their
    /// previous placements. Returns the change of the value once every lecture is placed, adding
    /// the chosen placements to `placements`.
    fn resolve(
        &mut self,
        conflicts: &[PlacementId],
        index: usize,
        placements: &mut Vec<PlacementId>,
    ) -> Option<f64> {
        let Some(&conflict) = conflicts.get(index) else {
            return Some(self.swap.comparator.current_value(self.undo.assignment) - self.base_value);
        };
        let model = self.undo.model;
        let candidates = RandomSwap::<A>::alternatives(model, model.placement(conflict));
        let offset = self.random.choose_index(candidates.len())?;
        let mut attempts = 0;

        for position in 0..candidates.len() {
            let candidate = model.placement(candidates[(position + offset) % candidates.len()]);
            if self.undo.assignment.in_conflict(model, candidate) {
                continue;
            }
            let checkpoint = self.undo.checkpoint();
            self.undo.change(conflict.lecture, Some(candidate.id()));
            let delta = self.resolve(conflicts, index + 1, placements);
            self.undo.undo_to(checkpoint);
            attempts += 1;

            if let Some(delta) = delta {
                if !self.swap.hill_climbing || delta <= 0.0 {
                    placements.push(candidate.id());
                    return Some(delta);
                }
            }
            if attempts >= self.swap.max_attempts
                || self.budget.as_mut().is_some_and(|budget| budget.is_exhausted())
            {
                break;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::*;
    use crate::engine::CriterionKind;
    use crate::model::LectureSpec;
    use crate::model::ModelBuilder;
    use crate::model::RoomLocation;
    use crate::model::RoomSpec;
    use crate::model::TimeLocation;
    use crate::model::DAY_CODES;

    /// Two lectures sharing one room, each either on Monday or on Tuesday; the first lecture
    /// prefers Monday when `preferred` is set.
    fn two_days_one_room(preferred: bool) -> TimetableModel {
        let room = RoomLocation::new(1, "A", 30);
        let monday = TimeLocation::new(DAY_CODES[0], 96, 12);
        let tuesday = TimeLocation::new(DAY_CODES[1], 96, 12);
        let first_monday = if preferred {
            monday.clone().with_preference(-1, -1.0)
        } else {
            monday.clone()
        };
        ModelBuilder::default()
            .with_room(RoomSpec::new(1, "A", 30))
            .with_lecture(
                LectureSpec::new(1, "L1")
                    .with_class_limit(20, 20)
                    .with_placement(first_monday, vec![room.clone()])
                    .with_placement(tuesday.clone(), vec![room.clone()]),
            )
            .with_lecture(
                LectureSpec::new(2, "L2")
                    .with_class_limit(20, 20)
                    .with_placement(monday, vec![room.clone()])
                    .with_placement(tuesday, vec![room]),
            )
            .build()
            .unwrap()
    }

    fn placed(model: &TimetableModel, first: u32, second: u32) -> Assignment {
        let mut assignment = model.create_assignment();
        let ids = model.lecture_ids().collect::<Vec<_>>();
        assignment.assign_unchecked(model, PlacementId { lecture: ids[0], index: first });
        assignment.assign_unchecked(model, PlacementId { lecture: ids[1], index: second });
        assignment
    }

    #[test]
    fn a_time_swap_exchanges_the_days_of_two_lectures() {
        let model = two_days_one_room(false);
        let mut assignment = placed(&model, 0, 1);
        let ids = model.lecture_ids().collect::<Vec<_>>();
        let criteria_before = assignment.criteria().clone();
        let mut swap = TimeSwap::default();
        let value_before = swap.comparator().current_value(&assignment);

        let neighbour =
            swap.select_neighbour(&model, &mut assignment, &mut SmallRng::seed_from_u64(3));

        assert_eq!(
            neighbour,
            Some(Neighbour::Suggestion {
                placements: vec![
                    PlacementId { lecture: ids[0], index: 1 },
                    PlacementId { lecture: ids[1], index: 0 },
                ],
                value: value_before,
            })
        );
        assert_eq!(assignment.value(ids[0]).map(|placement| placement.index), Some(0));
        assert!(assignment.criteria().approx_eq(&criteria_before, 1e-9));
    }

    #[test]
    fn hill_climbing_rejects_a_worsening_swap() {
        let model = two_days_one_room(true);
        let mut assignment = placed(&model, 0, 1);
        assert_eq!(
            assignment.criteria().value(CriterionKind::TimePreferences),
            -1.0
        );

        let mut climbing = TimeSwap::default().with_hill_climbing(true);
        let neighbour =
            climbing.select_neighbour(&model, &mut assignment, &mut SmallRng::seed_from_u64(3));
        assert_eq!(neighbour, None);

        let mut swap = TimeSwap::default();
        let value_before = swap.comparator().current_value(&assignment);
        let neighbour =
            swap.select_neighbour(&model, &mut assignment, &mut SmallRng::seed_from_u64(3));
        let Some(Neighbour::Suggestion { value, .. }) = neighbour else {
            panic!("expected a swap, got {neighbour:?}");
        };
        // the first lecture loses its preferred day
        assert!((value - value_before - 1.0).abs() < 1e-9);
    }

    #[test]
    fn a_free_alternative_is_a_simple_move() {
        let model = two_days_one_room(false);
        let mut assignment = model.create_assignment();
        let first = model.lecture_ids().next().unwrap();
        assignment.assign_unchecked(&model, PlacementId { lecture: first, index: 0 });

        let neighbour = TimeSwap::default().select_neighbour(
            &model,
            &mut assignment,
            &mut SmallRng::seed_from_u64(1),
        );

        assert_eq!(
            neighbour,
            Some(Neighbour::Simple {
                placement: PlacementId { lecture: first, index: 1 }
            })
        );
    }

    #[test]
    fn a_room_swap_exchanges_the_rooms_of_two_lectures() {
        let rooms = [RoomLocation::new(1, "A", 30), RoomLocation::new(2, "B", 30)];
        let monday = TimeLocation::new(DAY_CODES[0], 96, 12);
        let mut builder = ModelBuilder::default()
            .with_room(RoomSpec::new(1, "A", 30))
            .with_room(RoomSpec::new(2, "B", 30));
        for class_id in [1, 2] {
            builder = builder.with_lecture(
                LectureSpec::new(class_id, format!("L{class_id}"))
                    .with_class_limit(20, 20)
                    .with_placement(monday.clone(), vec![rooms[0].clone()])
                    .with_placement(monday.clone(), vec![rooms[1].clone()]),
            );
        }
        let model = builder.build().unwrap();
        let mut assignment = placed(&model, 0, 1);
        let ids = model.lecture_ids().collect::<Vec<_>>();

        let neighbour = RoomSwap::default().select_neighbour(
            &model,
            &mut assignment,
            &mut SmallRng::seed_from_u64(5),
        );

        let Some(Neighbour::Suggestion { placements, .. }) = neighbour else {
            panic!("expected a swap, got {neighbour:?}");
        };
        assert_eq!(
            placements,
            vec![
                PlacementId { lecture: ids[0], index: 1 },
                PlacementId { lecture: ids[1], index: 0 },
            ]
        );
    }

    #[test]
    fn other_times_are_no_room_alternatives() {
        let room = RoomLocation::new(1, "A", 30);
        let other = RoomLocation::new(2, "B", 30);
        let placement = |index, day: usize, room: &RoomLocation| {
            Placement::new(
                PlacementId {
                    lecture: LectureId(0),
                    index,
                },
                TimeLocation::new(DAY_CODES[day], 96, 12),
                vec![room.clone()],
            )
        };
        let current = placement(0, 0, &room);

        assert!(SameTime::is_alternative(&current, &placement(1, 0, &other)));
        assert!(!SameTime::is_alternative(&current, &placement(2, 1, &other)));
        assert!(!SameTime::is_alternative(&current, &placement(3, 0, &room)));
        assert!(SameRooms::is_alternative(&current, &placement(4, 1, &room)));
        assert!(!SameRooms::is_alternative(&current, &placement(5, 1, &other)));
    }
}
