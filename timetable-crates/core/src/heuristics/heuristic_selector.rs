/// A candidate admitted by a [`HeuristicSelector`] together with its values, one per level.
#[derive(Clone, Debug)]
pub struct Element<T> {
    values: Vec<f64>,
    object: T,
}

impl<T> Element<T> {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn object(&self) -> &T {
        &self.object
    }

    pub fn into_object(self) -> T {
        self.object
    }
}

/// Filters candidates on several levels of values (lower is better).
///
/// A candidate is kept on a level when its value is at most the best value of that level
/// increased by the threshold of the level; for a negative best value the bound is
/// `best * (1 - threshold)`, otherwise `best * (1 + threshold)`. The first level is applied while
/// the candidates are added, the other levels by [`HeuristicSelector::selection`], each relative
/// to the best value among the survivors of the previous level.
#[derive(Clone, Debug)]
pub struct HeuristicSelector<T> {
    thresholds: Vec<f64>,
    elements: Vec<Element<T>>,
    best_first_level: Option<f64>,
}

fn bound(best: f64, threshold: f64) -> f64 {
    if best < 0.0 {
        best * (1.0 - threshold)
    } else {
        best * (1.0 + threshold)
    }
}

impl<T> HeuristicSelector<T> {
    pub fn new(thresholds: impl Into<Vec<f64>>) -> HeuristicSelector<T> {
        HeuristicSelector {
            thresholds: thresholds.into(),
            elements: Vec::new(),
            best_first_level: None,
        }
    }

    /// The largest first level value a candidate may have in order to be admitted; [`None`] when
    /// nothing was added yet.
    pub fn first_level_threshold(&self) -> Option<f64> {
        let threshold = self.thresholds.first().copied().unwrap_or(0.0);
        self.best_first_level.map(|best| bound(best, threshold))
    }

    /// Offers a candidate; returns whether it was admitted.
    ///
    /// A new best first level value evicts the admitted candidates which are no longer within
    /// the threshold.
    pub fn add(&mut self, values: Vec<f64>, object: T) -> bool {
        let Some(&first) = values.first() else {
            return false;
        };
        if self.best_first_level.is_none_or(|best| first < best) {
            self.best_first_level = Some(first);
            if let Some(threshold) = self.first_level_threshold() {
                self.elements.retain(|element| element.values[0] <= threshold);
            }
        }
        if self
            .first_level_threshold()
            .is_some_and(|threshold| first > threshold)
        {
            return false;
        }
        self.elements.push(Element { values, object });
        true
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The admitted candidates which survive every level.
    pub fn selection(self) -> Vec<Element<T>> {
        let mut selection = self.elements;
        for (level, &threshold) in self.thresholds.iter().enumerate() {
            let best = selection
                .iter()
                .filter_map(|element| element.values.get(level).copied())
                .fold(None, |best: Option<f64>, value| {
                    Some(best.map_or(value, |best| best.min(value)))
                });
            let Some(best) = best else {
                break;
            };
            let limit = bound(best, threshold);
            selection.retain(|element| {
                element
                    .values
                    .get(level)
                    .is_none_or(|&value| value <= limit)
            });
        }
        selection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn survivors_are_within_the_thresholds_of_every_level() {
        let mut selector = HeuristicSelector::new([0.1, 0.1]);
        let candidates = [
            ("a", [10.0, 50.0]),
            ("b", [10.5, 40.0]),
            ("c", [11.0, 43.0]),
            ("d", [11.5, 10.0]),
            ("e", [12.0, 44.0]),
        ];
        for (name, values) in candidates {
            let _ = selector.add(values.to_vec(), name);
        }

        let selection = selector.selection();

        let names = selection.iter().map(|e| *e.object()).collect::<Vec<_>>();
        assert_eq!(names, vec!["b", "c"]);
        for element in &selection {
            assert!(element.values()[0] <= 10.0 * 1.1);
            assert!(element.values()[1] <= 40.0 * 1.1);
        }
    }

    #[test]
    fn a_new_best_evicts_candidates_outside_the_threshold() {
        let mut selector = HeuristicSelector::new([0.1]);

        assert!(selector.add(vec![20.0], 1));
        assert!(selector.add(vec![21.0], 2));
        assert!(selector.add(vec![10.0], 3));
        assert!(!selector.add(vec![12.0], 4));

        assert_eq!(selector.len(), 1);
        let threshold = selector.first_level_threshold().unwrap();
        assert!((threshold - 11.0).abs() < 1e-9);
    }

    #[test]
    fn negative_values_tighten_the_bound() {
        let mut selector = HeuristicSelector::new([0.1]);

        let _ = selector.add(vec![-10.0], "best");
        let _ = selector.add(vec![-9.5], "close");
        let _ = selector.add(vec![-8.0], "far");

        let names = selector
            .selection()
            .into_iter()
            .map(Element::into_object)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["best", "close"]);
    }

    #[test]
    fn zero_thresholds_keep_the_ties() {
        let mut selector = HeuristicSelector::new([0.0]);
        let _ = selector.add(vec![3.0], 'x');
        let _ = selector.add(vec![2.0], 'y');
        let _ = selector.add(vec![2.0], 'z');
        let _ = selector.add(vec![4.0], 'w');

        let names = selector
            .selection()
            .into_iter()
            .map(Element::into_object)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!['y', 'z']);
    }
}
