//! Threshold color scale.
//!
//! Bucket `i` covers `[t[i], t[i+1])`. The first bucket also takes everything
//! below `t[1]` and the last one everything from `t[n-1]` upward, so every
//! value lands in exactly one bucket.

use thiserror::Error;

/// Index into the threshold table.
pub type Bucket = usize;

#[derive(Error, Debug, PartialEq)]
pub enum ScaleError {
    #[error("at least one threshold is required")]
    Empty,

    #[error("threshold {index} is not finite")]
    NonFinite { index: usize },

    #[error("thresholds must be strictly ascending (index {index})")]
    NotAscending { index: usize },

    #[error("{colors} colors given for {thresholds} thresholds")]
    ColorCount { thresholds: usize, colors: usize },
}

#[derive(Debug, Clone)]
pub struct ColorClassifier {
    thresholds: Vec<f64>,
    colors: Vec<String>,
}

impl ColorClassifier {
    pub fn new(thresholds: Vec<f64>, colors: Vec<String>) -> Result<Self, ScaleError> {
        if thresholds.is_empty() {
            return Err(ScaleError::Empty);
        }
        if let Some(index) = thresholds.iter().position(|t| !t.is_finite()) {
            return Err(ScaleError::NonFinite { index });
        }
        if let Some(index) = thresholds.windows(2).position(|w| w[0] >= w[1]) {
            return Err(ScaleError::NotAscending { index: index + 1 });
        }
        if colors.len() != thresholds.len() {
            return Err(ScaleError::ColorCount {
                thresholds: thresholds.len(),
                colors: colors.len(),
            });
        }
        Ok(ColorClassifier { thresholds, colors })
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    pub fn bucket_count(&self) -> usize {
        self.thresholds.len()
    }

    /// Closed-lower, open-upper bucketing. NaN falls into bucket 0.
    pub fn classify(&self, value: f64) -> Bucket {
        self.thresholds
            .partition_point(|t| *t <= value)
            .saturating_sub(1)
    }

    pub fn color(&self, bucket: Bucket) -> &str {
        let last = self.colors.len() - 1;
        &self.colors[bucket.min(last)]
    }

    pub fn color_for(&self, value: f64) -> &str {
        self.color(self.classify(value))
    }

    /// Numeric range of `bucket`, with the open ends replaced by the domain bounds.
    pub fn extent_of(&self, bucket: Bucket, domain_min: f64, domain_max: f64) -> (f64, f64) {
        let last = self.thresholds.len() - 1;
        let bucket = bucket.min(last);
        let lower = if bucket == 0 {
            domain_min
        } else {
            self.thresholds[bucket]
        };
        let upper = if bucket == last {
            domain_max
        } else {
            self.thresholds[bucket + 1]
        };
        (lower, upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BLUES_9;

    fn decile_scale() -> ColorClassifier {
        ColorClassifier::new(
            (0..9).map(|i| i as f64 * 10.0).collect(),
            BLUES_9.iter().map(|c| c.to_string()).collect(),
        )
        .unwrap()
    }

    #[test]
    fn classifies_documented_examples() {
        let scale = decile_scale();
        assert_eq!(scale.classify(10.0), 1);
        assert_eq!(scale.classify(9.99), 0);
        assert_eq!(scale.classify(85.0), 8);
    }

    #[test]
    fn boundary_values_start_their_bucket() {
        let scale = decile_scale();
        for (i, t) in scale.thresholds().iter().enumerate().skip(1) {
            assert_eq!(scale.classify(*t), i);
            assert_eq!(scale.classify(*t - 1e-9), i - 1);
        }
    }

    #[test]
    fn total_over_extremes() {
        let scale = decile_scale();
        assert_eq!(scale.classify(-1000.0), 0);
        assert_eq!(scale.classify(f64::NEG_INFINITY), 0);
        assert_eq!(scale.classify(f64::INFINITY), 8);
        assert_eq!(scale.classify(f64::NAN), 0);
    }

    #[test]
    fn monotonic_over_ascending_values() {
        let scale = decile_scale();
        let mut previous = 0;
        let mut v = -20.0;
        while v < 120.0 {
            let bucket = scale.classify(v);
            assert!(bucket >= previous, "bucket decreased at {}", v);
            previous = bucket;
            v += 0.37;
        }
        assert_eq!(previous, 8);
    }

    #[test]
    fn extent_contains_classified_value() {
        let scale = decile_scale();
        let (min, max) = (0.0, 75.1);
        for v in [0.0, 3.5, 10.0, 19.99, 42.0, 69.9, 70.0] {
            let (lo, hi) = scale.extent_of(scale.classify(v), min, max);
            assert!(lo <= v && v < hi, "{} not in [{}, {})", v, lo, hi);
        }
    }

    #[test]
    fn extent_substitutes_open_ends() {
        let scale = decile_scale();
        assert_eq!(scale.extent_of(0, -5.0, 90.0), (-5.0, 10.0));
        assert_eq!(scale.extent_of(4, -5.0, 90.0), (40.0, 50.0));
        assert_eq!(scale.extent_of(8, -5.0, 90.0), (80.0, 90.0));
    }

    #[test]
    fn colors_follow_buckets() {
        let scale = decile_scale();
        assert_eq!(scale.color_for(0.0), "#f7fbff");
        assert_eq!(scale.color_for(25.0), "#c6dbef");
        assert_eq!(scale.color_for(99.0), "#08306b");
    }

    #[test]
    fn rejects_invalid_tables() {
        let colors = |n: usize| vec!["#000000".to_string(); n];
        assert_eq!(
            ColorClassifier::new(vec![], colors(0)).unwrap_err(),
            ScaleError::Empty
        );
        assert_eq!(
            ColorClassifier::new(vec![0.0, 10.0, 10.0], colors(3)).unwrap_err(),
            ScaleError::NotAscending { index: 2 }
        );
        assert_eq!(
            ColorClassifier::new(vec![0.0, f64::NAN], colors(2)).unwrap_err(),
            ScaleError::NonFinite { index: 1 }
        );
        assert_eq!(
            ColorClassifier::new(vec![0.0, 1.0], colors(3)).unwrap_err(),
            ScaleError::ColorCount {
                thresholds: 2,
                colors: 3
            }
        );
    }
}
