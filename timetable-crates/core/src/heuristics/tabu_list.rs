/// A ring of the most recently selected elements; a capacity of zero disables it.
#[derive(Clone, Debug)]
pub(crate) struct TabuList<T> {
    capacity: usize,
    entries: Vec<T>,
    position: usize,
}

impl<T: PartialEq> TabuList<T> {
    pub(crate) fn new(capacity: usize) -> TabuList<T> {
        TabuList {
            capacity,
            entries: Vec::with_capacity(capacity),
            position: 0,
        }
    }

    pub(crate) fn contains(&self, element: &T) -> bool {
        self.entries.contains(element)
    }

    /// Records `element`, overwriting the oldest entry once the list is full.
    pub(crate) fn push(&mut self, element: T) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.position {
            self.entries.push(element);
        } else {
            self.entries[self.position] = element;
        }
        self.position = (self.position + 1) % self.capacity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_oldest_entry_is_overwritten() {
        let mut tabu = TabuList::new(2);
        tabu.push(1);
        tabu.push(2);
        tabu.push(3);

        assert!(!tabu.contains(&1));
        assert!(tabu.contains(&2));
        assert!(tabu.contains(&3));
    }

    #[test]
    fn an_empty_capacity_disables_the_list() {
        let mut tabu = TabuList::new(0);
        tabu.push(1);

        assert!(!tabu.contains(&1));
    }
}
