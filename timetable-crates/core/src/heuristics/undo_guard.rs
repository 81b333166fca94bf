use crate::basic_types::Trail;
use crate::engine::AssignedValue;
use crate::engine::Assignment;
use crate::model::LectureId;
use crate::model::PlacementId;
use crate::model::TimetableModel;

/// Reverts every change recorded on its trail when dropped, so that the assignment is restored on
/// every exit path of a tentative search.
#[derive(Debug)]
pub(super) struct UndoGuard<'a> {
    pub(super) model: &'a TimetableModel,
    pub(super) assignment: &'a mut Assignment,
    /// The previous value of every lecture changed by the search.
    trail: Trail<(LectureId, Option<AssignedValue>)>,
}

impl<'a> UndoGuard<'a> {
    pub(super) fn new(model: &'a TimetableModel, assignment: &'a mut Assignment) -> UndoGuard<'a> {
        UndoGuard {
            model,
            assignment,
            trail: Trail::default(),
        }
    }

    /// Opens a new level on the trail; [`UndoGuard::undo_to`] with the returned checkpoint
    /// reverts the changes made after this call.
    pub(super) fn checkpoint(&mut self) -> usize {
        let checkpoint = self.trail.get_checkpoint();
        self.trail.new_checkpoint();
        checkpoint
    }

    /// Assigns `placement` to `lecture`, or unassigns it for [`None`], without computing
    /// conflicts.
    pub(super) fn change(&mut self, lecture: LectureId, placement: Option<PlacementId>) {
        let previous = self.assignment.values().assigned_value(lecture);
        self.trail.push((lecture, previous));
        let iteration = self.assignment.iteration();
        self.assignment.set_value(
            self.model,
            lecture,
            placement.map(|placement| AssignedValue {
                placement,
                iteration,
            }),
        );
    }

    pub(super) fn undo_to(&mut self, checkpoint: usize) {
        for (lecture, previous) in self.trail.synchronise(checkpoint) {
            self.assignment.set_value(self.model, lecture, previous);
        }
    }
}

impl Drop for UndoGuard<'_> {
    fn drop(&mut self) {
        for (lecture, previous) in self.trail.drain_all() {
            self.assignment.set_value(self.model, lecture, previous);
        }
    }
}
