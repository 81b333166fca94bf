use log::debug;

use super::LectureSelection;
use super::Neighbour;
use super::NeighbourSelection;
use super::TimetableComparator;
use super::ValueSelection;
use crate::basic_types::Properties;
use crate::basic_types::PropertyError;
use crate::basic_types::Random;
use crate::engine::Assignment;
use crate::model::LectureId;
use crate::model::PlacementId;
use crate::model::TimetableModel;

/// Selects a lecture with a [`LectureSelection`] and a placement for it with a
/// [`ValueSelection`].
///
/// When no placement can be selected, every hard weakening constraint of the lecture is weakened
/// so that the search does not get stuck on it; otherwise the weakening constraints which are in
/// conflict with the selected placement are weakened just enough to admit it.
#[derive(Debug)]
pub struct StandardNeighbourSelection {
    lecture_selection: LectureSelection,
    value_selection: ValueSelection,
    comparator: TimetableComparator,
}

impl Default for StandardNeighbourSelection {
    fn default() -> Self {
        StandardNeighbourSelection {
            lecture_selection: LectureSelection::default(),
            value_selection: ValueSelection::default(),
            comparator: TimetableComparator::default(),
        }
    }
}

impl StandardNeighbourSelection {
    pub fn new(
        lecture_selection: LectureSelection,
        value_selection: ValueSelection,
        comparator: TimetableComparator,
    ) -> StandardNeighbourSelection {
        StandardNeighbourSelection {
            lecture_selection,
            value_selection,
            comparator,
        }
    }

    pub fn from_properties(
        properties: &Properties,
    ) -> Result<StandardNeighbourSelection, PropertyError> {
        Ok(StandardNeighbourSelection::new(
            LectureSelection::from_properties(properties)?,
            ValueSelection::from_properties(properties)?,
            TimetableComparator::from_properties(properties)?,
        ))
    }

    pub fn comparator(&self) -> &TimetableComparator {
        &self.comparator
    }

    pub fn select_lecture(
        &mut self,
        model: &TimetableModel,
        assignment: &Assignment,
        random: &mut dyn Random,
    ) -> Option<LectureId> {
        let lecture =
            self.lecture_selection
                .select_lecture(model, assignment, &self.comparator, random);
        match lecture {
            None => debug!("No lecture selected."),
            Some(lecture) if model.lecture(lecture).domain().is_empty() => {
                debug!("Lecture {} has no values.", model.lecture(lecture));
                return None;
            }
            _ => {}
        }
        lecture
    }

    pub fn select_value(
        &mut self,
        model: &TimetableModel,
        assignment: &mut Assignment,
        lecture: LectureId,
        random: &mut dyn Random,
    ) -> Option<PlacementId> {
        let Some(value) =
            self.value_selection
                .select_value(model, assignment, lecture, &self.comparator, random)
        else {
            debug!("No value selected for lecture {}.", model.lecture(lecture));
            for &constraint in model.weakening_constraints_of(lecture) {
                if model.constraint(constraint).is_hard() {
                    assignment.weaken(model, constraint);
                }
            }
            return None;
        };

        let placement = model.placement(value);
        for &constraint in model.weakening_constraints_of(lecture) {
            if model
                .constraint(constraint)
                .in_conflict(constraint, model, assignment, placement)
            {
                debug!(
                    "Weakening {} for {placement}",
                    model.constraint(constraint).name()
                );
                assignment.weaken_for(model, constraint, placement);
            }
        }
        Some(value)
    }
}

impl NeighbourSelection for StandardNeighbourSelection {
    fn select_neighbour(
        &mut self,
        model: &TimetableModel,
        assignment: &mut Assignment,
        random: &mut dyn Random,
    ) -> Option<Neighbour> {
        let lecture = self.select_lecture(model, assignment, random)?;
        let placement = self.select_value(model, assignment, lecture, random)?;
        Some(Neighbour::Simple { placement })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::TestRandom;
    use crate::model::tests::two_lectures_one_room;

    #[test]
    fn a_random_lecture_gets_its_best_value() {
        let model = two_lectures_one_room();
        let mut assignment = model.create_assignment();
        let mut lectures = model.lecture_ids();
        let first = lectures.next().unwrap();
        let second = lectures.next().unwrap();
        assignment.assign_unchecked(
            &model,
            PlacementId {
                lecture: first,
                index: 0,
            },
        );
        let mut selection = StandardNeighbourSelection::default();
        // The random walk of the lecture selection picks the only unassigned lecture, the value
        // selection does not walk and picks among the placements without conflicts.
        let mut random = TestRandom {
            bools: vec![true, false],
            usizes: vec![0, 0],
            ..Default::default()
        };

        let neighbour = selection.select_neighbour(&model, &mut assignment, &mut random);

        assert_eq!(
            neighbour,
            Some(Neighbour::Simple {
                placement: PlacementId {
                    lecture: second,
                    index: 1
                }
            })
        );
    }
}
