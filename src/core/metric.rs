use serde::{Deserialize, Serialize};

/// Index value for profile entries that never received a candidate.
pub const NO_MATCH: usize = usize::MAX;

/// What the values of a profile mean, and therefore which direction is "better".
///
/// Distance profiles hold z-normalized Euclidean distances (lower is better,
/// sentinel `+Inf`). Correlation profiles hold Pearson correlations (higher is
/// better, sentinel `-Inf`). The two are interchangeable via
/// `d = sqrt(2 * m * (1 - r))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    Distance,
    Correlation,
}

impl Metric {
    /// Value of an entry that has not been matched yet.
    #[inline]
    pub fn sentinel(self) -> f64 {
        match self {
            Metric::Distance => f64::INFINITY,
            Metric::Correlation => f64::NEG_INFINITY,
        }
    }

    /// Whether `candidate` strictly improves on `current`.
    ///
    /// Ties keep the current entry. NaN never improves anything.
    #[inline(always)]
    pub fn is_better(self, candidate: f64, current: f64) -> bool {
        match self {
            Metric::Distance => candidate < current,
            Metric::Correlation => candidate > current,
        }
    }

    /// Whether `value` is this metric's unmatched marker.
    #[inline]
    pub fn is_sentinel(self, value: f64) -> bool {
        value == self.sentinel()
    }
}

/// Convert a Pearson correlation to z-normalized Euclidean distance.
#[inline]
pub fn corr_to_dist(corr: f64, m: usize) -> f64 {
    if Metric::Correlation.is_sentinel(corr) {
        return Metric::Distance.sentinel();
    }
    (2.0 * m as f64 * (1.0 - corr.clamp(-1.0, 1.0))).max(0.0).sqrt()
}

/// Convert a z-normalized Euclidean distance to a Pearson correlation.
#[inline]
pub fn dist_to_corr(dist: f64, m: usize) -> f64 {
    if Metric::Distance.is_sentinel(dist) {
        return Metric::Correlation.sentinel();
    }
    1.0 - dist * dist / (2.0 * m as f64)
}

/// Bring raw algorithm output into the representation requested by the caller.
///
/// Values are moved into correlation space, clamped to `[-1, 1]`, optionally
/// remapped to `|r|`, and converted back to distances when `euclidean` is set.
/// Distance output that needs no remapping is left untouched so the exact
/// algorithm values survive. Sentinels are preserved in either space.
pub fn finalize_values(
    values: &mut [f64],
    source: Metric,
    m: usize,
    euclidean: bool,
    remap_negative_corr: bool,
) -> Metric {
    if source == Metric::Distance && euclidean && !remap_negative_corr {
        return Metric::Distance;
    }

    for v in values.iter_mut() {
        let mut corr = match source {
            Metric::Distance => dist_to_corr(*v, m),
            Metric::Correlation => *v,
        };
        if !Metric::Correlation.is_sentinel(corr) {
            corr = corr.clamp(-1.0, 1.0);
            if remap_negative_corr {
                corr = corr.abs();
            }
        }
        *v = if euclidean {
            corr_to_dist(corr, m)
        } else {
            corr
        };
    }

    if euclidean {
        Metric::Distance
    } else {
        Metric::Correlation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_better_of_each_metric() {
        assert!(Metric::Distance.is_better(1.0, 2.0));
        assert!(!Metric::Distance.is_better(2.0, 2.0));
        assert!(Metric::Correlation.is_better(0.9, 0.5));
        assert!(!Metric::Correlation.is_better(0.5, 0.5));
        assert!(!Metric::Distance.is_better(f64::NAN, f64::INFINITY));
        assert!(!Metric::Correlation.is_better(f64::NAN, f64::NEG_INFINITY));
    }

    #[test]
    fn test_sentinel_detection() {
        assert!(Metric::Distance.is_sentinel(f64::INFINITY));
        assert!(!Metric::Distance.is_sentinel(f64::NEG_INFINITY));
        assert!(Metric::Correlation.is_sentinel(f64::NEG_INFINITY));
        assert!(!Metric::Correlation.is_sentinel(-1.0));
    }

    #[test]
    fn test_corr_dist_conversion() {
        let m = 8;
        assert!(corr_to_dist(1.0, m).abs() < 1e-12);
        assert!((corr_to_dist(-1.0, m) - (32.0_f64).sqrt()).abs() < 1e-12);
        // Out-of-range correlations are clamped
        assert!(corr_to_dist(1.0 + 1e-9, m).abs() < 1e-12);

        for &r in &[-0.7, 0.0, 0.3, 0.99] {
            let back = dist_to_corr(corr_to_dist(r, m), m);
            assert!((back - r).abs() < 1e-12, "r={r} came back as {back}");
        }
    }

    #[test]
    fn test_sentinels_survive_conversion() {
        assert!(corr_to_dist(f64::NEG_INFINITY, 4).is_infinite());
        assert_eq!(dist_to_corr(f64::INFINITY, 4), f64::NEG_INFINITY);

        let mut vals = vec![f64::NEG_INFINITY, 0.5];
        let metric = finalize_values(&mut vals, Metric::Correlation, 4, true, false);
        assert_eq!(metric, Metric::Distance);
        assert_eq!(vals[0], f64::INFINITY);
        assert!((vals[1] - 2.0).abs() < 1e-12); // sqrt(8 * 0.5)
    }

    #[test]
    fn test_finalize_remaps_negative_correlation() {
        let mut vals = vec![-0.8, 0.4, -1.5];
        let metric = finalize_values(&mut vals, Metric::Correlation, 4, false, true);
        assert_eq!(metric, Metric::Correlation);
        assert!((vals[0] - 0.8).abs() < 1e-12);
        assert!((vals[1] - 0.4).abs() < 1e-12);
        assert!((vals[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_finalize_distance_passthrough() {
        let mut vals = vec![0.25, f64::INFINITY];
        let metric = finalize_values(&mut vals, Metric::Distance, 4, true, false);
        assert_eq!(metric, Metric::Distance);
        assert_eq!(vals, vec![0.25, f64::INFINITY]);
    }
}
