use std::iter::Rev;
use std::ops::Deref;
use std::vec::Drain;

use crate::timetable_asserts::timetable_assert_simple;

/// An undo log divided into checkpoints.
///
/// The suggestion search records every tentative change on the trail and, when a branch has been
/// explored, synchronises back to the checkpoint it started from; the drained entries are given
/// in reverse order so that they can be undone one by one.
#[derive(Clone, Debug)]
pub(crate) struct Trail<T> {
    current_checkpoint: usize,
    /// At index i is the position where the i-th checkpoint ends (exclusive) on the trail
    trail_delimiter: Vec<usize>,
    trail: Vec<T>,
}

// We explicitly implement the Default and not as a macro, because we want to avoid imposing Default
// on the generic type T.
impl<T> Default for Trail<T> {
    fn default() -> Self {
        Trail {
            current_checkpoint: Default::default(),
            trail_delimiter: Default::default(),
            trail: Default::default(),
        }
    }
}

impl<T> Trail<T> {
    pub(crate) fn new_checkpoint(&mut self) {
        self.current_checkpoint += 1;
        self.trail_delimiter.push(self.trail.len());
    }

    pub(crate) fn get_checkpoint(&self) -> usize {
        self.current_checkpoint
    }

    pub(crate) fn synchronise(&mut self, new_checkpoint: usize) -> Rev<Drain<'_, T>> {
        timetable_assert_simple!(new_checkpoint < self.current_checkpoint);

        let new_trail_len = self.trail_delimiter[new_checkpoint];

        self.current_checkpoint = new_checkpoint;
        self.trail_delimiter.truncate(new_checkpoint);
        self.trail.drain(new_trail_len..).rev()
    }

    pub(crate) fn push(&mut self, elem: T) {
        self.trail.push(elem)
    }

    /// Removes every entry, returning them in reverse order of insertion.
    pub(crate) fn drain_all(&mut self) -> Rev<Drain<'_, T>> {
        self.current_checkpoint = 0;
        self.trail_delimiter.clear();
        self.trail.drain(..).rev()
    }
}

impl<T> Deref for Trail<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.trail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pushed_values_are_observed_through_indexing() {
        let mut trail = Trail::default();

        let expected = [1, 2, 3, 4];
        for &elem in expected.iter() {
            trail.push(elem);
        }

        assert_eq!(&expected, trail.deref());
    }

    #[test]
    fn synchronising_removes_elements_beyond_checkpoint() {
        let mut trail = Trail::default();

        trail.new_checkpoint();
        trail.push(1);
        let _ = trail.synchronise(0);

        assert!(trail.is_empty());
        assert_eq!(trail.get_checkpoint(), 0);
    }

    #[test]
    fn undone_elements_are_given_in_reverse_order() {
        let mut trail = Trail::default();
        trail.push(1);

        trail.new_checkpoint();
        trail.push(2);
        trail.new_checkpoint();
        trail.push(3);
        trail.new_checkpoint();
        trail.push(4);

        let popped = trail.synchronise(1).collect::<Vec<_>>();
        assert_eq!(vec![4, 3], popped);
        assert_eq!(&[1, 2], trail.deref());
    }

    #[test]
    fn draining_everything_resets_the_checkpoints() {
        let mut trail = Trail::default();
        trail.push(1);
        trail.new_checkpoint();
        trail.push(2);

        let drained = trail.drain_all().collect::<Vec<_>>();

        assert_eq!(vec![2, 1], drained);
        assert_eq!(trail.get_checkpoint(), 0);
    }
}
