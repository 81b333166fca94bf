use std::fmt::Debug;
use std::ops::Range;

use rand::Rng;
use rand::SeedableRng;

use crate::timetable_asserts::timetable_assert_moderate;

/// Abstraction for randomness, in order to swap out different source of randomness.
///
/// Every randomised decision of the search (tie-breaking, random walks, roulette wheels and random
/// evictions) draws from a handle of this type which is passed down explicitly, one per search
/// thread.
///
/// # Testing
/// We have also created an implementation of this trait which takes as input a list of `usize`s and
/// `bool`s and returns them in that order. This allows the user to define deterministic test-cases
/// while the implementation makes use of an implementation of the [`Random`] trait.
pub trait Random: Debug {
    /// Generates a bool with probability `probability` of being true. It should hold that
    /// `probability ∈ [0, 1]`, this method will panic if this is not the case.
    ///
    /// # Example
    /// ```rust
    /// # use rand::rngs::SmallRng;
    /// # use rand::SeedableRng;
    /// # use timetable_core::Random;
    /// let mut rng = SmallRng::seed_from_u64(42);
    /// let coin_flip_outcome = rng.generate_bool(0.5);
    /// assert!(coin_flip_outcome || !coin_flip_outcome);
    /// ```
    fn generate_bool(&mut self, probability: f64) -> bool;

    /// Generates a random usize in the provided range with equal probability; this can be seen as
    /// sampling from a uniform distribution in the range `[range.start, range.end)`
    ///
    /// # Example
    /// ```rust
    /// # use rand::rngs::SmallRng;
    /// # use rand::SeedableRng;
    /// # use timetable_core::Random;
    /// let mut rng = SmallRng::seed_from_u64(42);
    /// let elements = vec!["This", "is", "a", "test"];
    /// let selected_index = rng.generate_usize_in_range(0..elements.len());
    /// assert!(selected_index < elements.len());
    /// ```
    fn generate_usize_in_range(&mut self, range: Range<usize>) -> usize;

    /// Generate a random float in the range 0..1.
    fn generate_f64(&mut self) -> f64;

    /// Given a slice of weights, select the index with `weight` weighted probability compared to
    /// the other weights.
    fn get_weighted_choice(&mut self, weights: &[f64]) -> Option<usize>;
}

impl dyn Random + '_ {
    /// Selects a uniformly random element of the slice, [`None`] if it is empty.
    pub fn choose<'a, T>(&mut self, elements: &'a [T]) -> Option<&'a T> {
        if elements.is_empty() {
            None
        } else {
            Some(&elements[self.generate_usize_in_range(0..elements.len())])
        }
    }

    /// Selects a uniformly random index into a collection of `len` elements, [`None`] if it is
    /// empty.
    pub fn choose_index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            None
        } else {
            Some(self.generate_usize_in_range(0..len))
        }
    }
}

// We provide a blanket implementation of the trait for any type which implements `SeedableRng`,
// `Rng` and `Debug` to ensure that we can use any "regular" random generator where we expect an
// implementation of Random.
impl<T> Random for T
where
    T: SeedableRng + Rng + Debug,
{
    fn generate_bool(&mut self, probability: f64) -> bool {
        timetable_assert_moderate!(
            (0.0..=1.0).contains(&probability),
            "It should hold that 0.0 <= {probability} <= 1.0"
        );

        self.gen_bool(probability)
    }

    fn generate_usize_in_range(&mut self, range: Range<usize>) -> usize {
        self.gen_range(range)
    }

    fn generate_f64(&mut self) -> f64 {
        self.gen_range(0.0..1.0)
    }

    fn get_weighted_choice(&mut self, weights: &[f64]) -> Option<usize> {
        if weights.is_empty() {
            return None;
        }

        let sum = weights.iter().sum::<f64>();
        let spin = self.generate_f64() * sum;

        let mut i: usize = 0;
        let mut accumulated_weights = weights[0];

        while accumulated_weights <= spin && i + 1 < weights.len() {
            i += 1;
            accumulated_weights += weights[i];
        }

        Some(i)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cmp::Ordering;
    use std::ops::Range;

    use super::Random;
    use crate::timetable_asserts::timetable_assert_simple;

    /// A test "random" generator which takes as input a list of elements of [`usize`], [`f64`] and
    /// [`bool`] and returns them in order. If more values are attempted to be generated than are
    /// provided then this will result in panicking.
    #[derive(Debug)]
    pub(crate) struct TestRandom {
        pub(crate) usizes: Vec<usize>,
        pub(crate) floats: Vec<f64>,
        pub(crate) bools: Vec<bool>,
        pub(crate) weighted_choice: fn(&[f64]) -> Option<usize>,
    }

    impl Default for TestRandom {
        fn default() -> Self {
            TestRandom {
                weighted_choice: |_| unimplemented!(),
                usizes: vec![],
                floats: vec![],
                bools: vec![],
            }
        }
    }

    impl Random for TestRandom {
        fn generate_bool(&mut self, probability: f64) -> bool {
            let selected = self.bools.remove(0);
            timetable_assert_simple!(
                if matches!(probability.partial_cmp(&1.0), Some(Ordering::Equal)) {
                    selected
                } else if matches!(probability.partial_cmp(&0.0), Some(Ordering::Equal)) {
                    !selected
                } else {
                    true
                },
                "The probability is {probability} but the selected value is {selected}, this should not be possible, please ensure that your test cases are correctly defined"
            );
            selected
        }

        fn generate_usize_in_range(&mut self, range: Range<usize>) -> usize {
            let selected = self.usizes.remove(0);
            timetable_assert_simple!(
                range.contains(&selected),
                "The selected element by `TestRandom` ({selected}) is not in the provided range ({range:?}) and thus should not be returned, please ensure that your test cases are correctly defined"
            );
            selected
        }

        fn generate_f64(&mut self) -> f64 {
            self.floats.remove(0)
        }

        fn get_weighted_choice(&mut self, weights: &[f64]) -> Option<usize> {
            (self.weighted_choice)(weights)
        }
    }

    #[test]
    fn weighted_choice_follows_the_spin() {
        use rand::rngs::SmallRng;
        use rand::SeedableRng;

        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..100 {
            let choice = rng.get_weighted_choice(&[0.0, 1.0, 0.0]);
            assert_eq!(choice, Some(1));
        }
        assert_eq!(rng.get_weighted_choice(&[]), None);
    }

    #[test]
    fn choose_returns_none_for_empty_slices() {
        let mut random = TestRandom {
            usizes: vec![1],
            ..Default::default()
        };
        let random: &mut dyn Random = &mut random;

        assert_eq!(random.choose::<u32>(&[]), None);
        assert_eq!(random.choose(&[4, 5, 6]), Some(&5));
    }
}
