//! Deterministic train/validation/test partitioning.
//!
//! Every rating draws one uniform number from a seeded `StdRng`, in input
//! order, and lands in the bucket whose cumulative fraction range contains
//! it. The same seed and the same rating sequence always give the same
//! partition, and each bucket keeps the relative order of the input.

use crate::error::{Result, TrainingError};
use data_loader::Rating;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Allowed deviation of the fraction sum from 1.0
const SUM_TOLERANCE: f64 = 1e-9;

/// Fractions of the ratings assigned to each partition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitFractions {
    pub training: f64,
    pub validation: f64,
    pub testing: f64,
}

impl SplitFractions {
    pub fn new(training: f64, validation: f64, testing: f64) -> Self {
        Self {
            training,
            validation,
            testing,
        }
    }

    /// Check that every fraction is finite and non-negative and that they sum to 1
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("training", self.training),
            ("validation", self.validation),
            ("testing", self.testing),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(TrainingError::InvalidConfiguration(format!(
                    "{} fraction must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        let sum = self.training + self.validation + self.testing;
        if (sum - 1.0).abs() > SUM_TOLERANCE {
            return Err(TrainingError::InvalidConfiguration(format!(
                "split fractions must sum to 1.0, got {}",
                sum
            )));
        }
        Ok(())
    }

    /// Bucket for a uniform draw in [0, 1).
    ///
    /// Draws past the last cumulative bound (possible when the fractions sum
    /// to slightly less than 1) go to the last bucket with a non-zero fraction.
    fn bucket(&self, draw: f64) -> Bucket {
        if draw < self.training {
            Bucket::Training
        } else if draw < self.training + self.validation {
            Bucket::Validation
        } else if self.testing > 0.0 {
            Bucket::Testing
        } else if self.validation > 0.0 {
            Bucket::Validation
        } else {
            Bucket::Training
        }
    }
}

impl Default for SplitFractions {
    fn default() -> Self {
        Self::new(0.6, 0.2, 0.2)
    }
}

#[derive(Debug, Clone, Copy)]
enum Bucket {
    Training,
    Validation,
    Testing,
}

/// Three disjoint rating sets whose union is the partitioned input
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    pub training: Vec<Rating>,
    pub validation: Vec<Rating>,
    pub testing: Vec<Rating>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.training.len() + self.validation.len() + self.testing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Training followed by validation ratings
    pub fn training_and_validation(&self) -> Vec<Rating> {
        let mut ratings = Vec::with_capacity(self.training.len() + self.validation.len());
        ratings.extend_from_slice(&self.training);
        ratings.extend_from_slice(&self.validation);
        ratings
    }

    /// All three sets concatenated in training, validation, testing order
    pub fn all(&self) -> Vec<Rating> {
        let mut ratings = self.training_and_validation();
        ratings.extend_from_slice(&self.testing);
        ratings
    }
}

/// Partition `ratings` into training, validation and testing sets.
///
/// Fails with `InvalidConfiguration` when the fractions are unusable or when a
/// set with a non-zero fraction ends up empty.
pub fn partition(ratings: &[Rating], fractions: SplitFractions, seed: u64) -> Result<Partition> {
    fractions.validate()?;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut result = Partition::default();

    for rating in ratings {
        match fractions.bucket(rng.random::<f64>()) {
            Bucket::Training => result.training.push(*rating),
            Bucket::Validation => result.validation.push(*rating),
            Bucket::Testing => result.testing.push(*rating),
        }
    }

    for (name, fraction, set) in [
        ("training", fractions.training, &result.training),
        ("validation", fractions.validation, &result.validation),
        ("testing", fractions.testing, &result.testing),
    ] {
        if fraction > 0.0 && set.is_empty() {
            return Err(TrainingError::InvalidConfiguration(format!(
                "{} set is empty although its fraction is {}",
                name, fraction
            )));
        }
    }

    info!(
        "Training: {}, validation: {}, test: {}",
        result.training.len(),
        result.validation.len(),
        result.testing.len()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratings(n: u32) -> Vec<Rating> {
        (0..n)
            .map(|i| Rating {
                user_id: i % 17,
                movie_id: i,
                rating: 1.0 + (i % 5) as f64,
                timestamp: i as i64,
            })
            .collect()
    }

    #[test]
    fn test_partition_is_disjoint_and_complete() {
        let input = ratings(1000);
        let split = partition(&input, SplitFractions::default(), 12345).unwrap();

        assert_eq!(split.len(), input.len());
        let mut seen: Vec<u32> = split.all().iter().map(|r| r.movie_id).collect();
        seen.sort_unstable();
        let expected: Vec<u32> = (0..1000).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_partition_preserves_input_order() {
        let input = ratings(500);
        let split = partition(&input, SplitFractions::default(), 7).unwrap();
        for set in [&split.training, &split.validation, &split.testing] {
            assert!(set.windows(2).all(|w| w[0].movie_id < w[1].movie_id));
        }
    }

    #[test]
    fn test_same_seed_same_partition() {
        let input = ratings(300);
        let a = partition(&input, SplitFractions::default(), 42).unwrap();
        let b = partition(&input, SplitFractions::default(), 42).unwrap();
        let c = partition(&input, SplitFractions::default(), 43).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_proportions_are_roughly_respected() {
        let input = ratings(10_000);
        let split = partition(&input, SplitFractions::default(), 12345).unwrap();
        let share = split.training.len() as f64 / input.len() as f64;
        assert!((share - 0.6).abs() < 0.03, "training share {}", share);
    }

    #[test]
    fn test_zero_fraction_set_stays_empty() {
        let input = ratings(200);
        let split = partition(&input, SplitFractions::new(0.8, 0.2, 0.0), 1).unwrap();
        assert!(split.testing.is_empty());
        assert_eq!(split.training.len() + split.validation.len(), 200);

        let split = partition(&input, SplitFractions::new(1.0, 0.0, 0.0), 1).unwrap();
        assert_eq!(split.training.len(), 200);
    }

    #[test]
    fn test_invalid_fractions_are_rejected() {
        let input = ratings(10);
        for fractions in [
            SplitFractions::new(0.5, 0.2, 0.2),
            SplitFractions::new(1.2, -0.1, -0.1),
            SplitFractions::new(f64::NAN, 0.5, 0.5),
        ] {
            assert!(matches!(
                partition(&input, fractions, 1),
                Err(TrainingError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn test_empty_set_with_nonzero_fraction_fails() {
        assert!(matches!(
            partition(&[], SplitFractions::default(), 1),
            Err(TrainingError::InvalidConfiguration(_))
        ));
        let one = ratings(1);
        assert!(partition(&one, SplitFractions::default(), 1).is_err());
    }
}
