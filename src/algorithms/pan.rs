use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::algorithms::batch::default_parallelism;
use crate::core::error::{ProfileError, Result};
use crate::core::matrix_profile::{validate_series, Algorithm, ComputeOptions, MatrixProfile};
use crate::core::metric::Metric;

/// Options for [`PanMatrixProfile::compute`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanOptions {
    /// Smallest subsequence length, at least 2.
    pub lower_m: usize,
    /// Largest subsequence length, inclusive.
    pub upper_m: usize,
    /// Fraction of window sizes to visit, in (0, 1]. Visited in binary-split order.
    pub sample: f64,
    pub parallelism: usize,
    pub euclidean: bool,
    pub remap_negative_corr: bool,
    pub exclusion_denom: usize,
}

impl Default for PanOptions {
    fn default() -> Self {
        Self {
            lower_m: 4,
            upper_m: 32,
            sample: 1.0,
            parallelism: default_parallelism(),
            euclidean: true,
            remap_negative_corr: false,
            exclusion_denom: 2,
        }
    }
}

impl PanOptions {
    pub fn new(lower_m: usize, upper_m: usize) -> Self {
        Self {
            lower_m,
            upper_m,
            ..Self::default()
        }
    }

    fn window_options(&self) -> ComputeOptions {
        ComputeOptions {
            algorithm: Algorithm::Mpx,
            sample: 1.0,
            parallelism: self.parallelism,
            euclidean: self.euclidean,
            remap_negative_corr: self.remap_negative_corr,
            exclusion_denom: self.exclusion_denom,
            seed: None,
        }
    }
}

/// Window sizes `lower..=upper` in binary-split order.
///
/// The midpoint comes first, then the midpoints of each half breadth-first, so
/// any prefix of the order spreads across the whole range.
pub fn binary_split(lower: usize, upper: usize) -> Vec<usize> {
    let mut order = Vec::with_capacity(upper.saturating_sub(lower) + 1);
    let mut queue = VecDeque::new();
    if lower <= upper {
        queue.push_back((lower, upper));
    }
    while let Some((lo, hi)) = queue.pop_front() {
        let mid = lo + (hi - lo) / 2;
        order.push(mid);
        if mid > lo {
            queue.push_back((lo, mid - 1));
        }
        if mid < hi {
            queue.push_back((mid + 1, hi));
        }
    }
    order
}

/// Matrix profiles of the same join across a range of subsequence lengths.
///
/// Row `k` holds the profile for window `lower_m + k`; rows for windows a sampled
/// sweep did not reach stay empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanMatrixProfile {
    a: Vec<f64>,
    b: Option<Vec<f64>>,
    lower_m: usize,
    metric: Metric,
    profiles: Vec<Vec<f64>>,
    indices: Vec<Vec<usize>>,
    order: Vec<usize>,
}

impl PanMatrixProfile {
    /// Create an empty pan profile for `a` joined with `b`, or with itself.
    pub fn new(a: &[f64], b: Option<&[f64]>) -> Result<Self> {
        validate_series("A", a)?;
        if let Some(b) = b {
            validate_series("B", b)?;
        }
        Ok(Self {
            a: a.to_vec(),
            b: b.map(<[f64]>::to_vec),
            lower_m: 0,
            metric: Metric::Distance,
            profiles: Vec::new(),
            indices: Vec::new(),
            order: Vec::new(),
        })
    }

    /// Sweep MPX over `lower_m..=upper_m`, replacing any previous rows.
    ///
    /// Every window gets its own [`MatrixProfile`] and statistics. Stops at the
    /// first window that fails.
    pub fn compute(&mut self, opts: &PanOptions) -> Result<()> {
        let shortest = self
            .b
            .as_ref()
            .map_or(self.a.len(), |b| self.a.len().min(b.len()));
        if opts.lower_m < 2 {
            return Err(ProfileError::InvalidWindow {
                m: opts.lower_m,
                len: shortest,
            });
        }
        if opts.upper_m < opts.lower_m || opts.upper_m > shortest {
            return Err(ProfileError::InvalidWindow {
                m: opts.upper_m,
                len: shortest,
            });
        }
        if opts.sample.is_nan() || opts.sample <= 0.0 {
            return Err(ProfileError::InvalidSample(opts.sample));
        }

        let order = binary_split(opts.lower_m, opts.upper_m);
        let count = order.len();
        let keep = ((opts.sample.min(1.0) * count as f64).ceil() as usize).clamp(1, count);
        debug!(
            lower_m = opts.lower_m,
            upper_m = opts.upper_m,
            windows = keep,
            "pan matrix profile sweep"
        );

        self.lower_m = opts.lower_m;
        self.profiles = vec![Vec::new(); count];
        self.indices = vec![Vec::new(); count];
        self.order.clear();

        let window_opts = opts.window_options();
        for &m in &order[..keep] {
            debug!(m, "pan window");
            let mut mp = MatrixProfile::new(&self.a, self.b.as_deref(), m)?;
            mp.compute(&window_opts)?;

            let row = m - self.lower_m;
            self.metric = mp.metric();
            self.profiles[row] = mp.profile;
            self.indices[row] = mp.profile_index;
            self.order.push(m);
        }
        Ok(())
    }

    /// Profile and index for `window`, if the last sweep visited it.
    pub fn row(&self, window: usize) -> Option<(&[f64], &[usize])> {
        let k = window.checked_sub(self.lower_m)?;
        let profile = self.profiles.get(k)?;
        if profile.is_empty() {
            return None;
        }
        Some((profile, &self.indices[k]))
    }

    /// Window sizes covered by the rows, visited or not.
    pub fn windows(&self) -> std::ops::RangeInclusive<usize> {
        self.lower_m..=self.lower_m + self.profiles.len().saturating_sub(1)
    }

    pub fn profiles(&self) -> &[Vec<f64>] {
        &self.profiles
    }

    pub fn indices(&self) -> &[Vec<usize>] {
        &self.indices
    }

    /// Windows in the order they were computed.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chaotic(n: usize) -> Vec<f64> {
        (0..n).map(|i| ((i * i) as f64 * 0.37).sin()).collect()
    }

    #[test]
    fn test_binary_split_order() {
        assert_eq!(binary_split(3, 5), vec![4, 3, 5]);
        assert_eq!(binary_split(10, 16), vec![13, 11, 15, 10, 12, 14, 16]);
        assert_eq!(binary_split(7, 7), vec![7]);
        assert!(binary_split(8, 7).is_empty());

        let mut all = binary_split(2, 40);
        all.sort_unstable();
        assert_eq!(all, (2..=40).collect::<Vec<_>>());
    }

    #[test]
    fn test_pan_rows_match_single_window() {
        let ts = chaotic(80);
        let mut pan = PanMatrixProfile::new(&ts, None).unwrap();
        let mut opts = PanOptions::new(6, 12);
        opts.parallelism = 2;
        pan.compute(&opts).unwrap();

        assert_eq!(pan.windows(), 6..=12);
        assert_eq!(pan.order(), &[9, 7, 11, 6, 8, 10, 12]);
        for m in 6..=12 {
            let mut mp = MatrixProfile::new(&ts, None, m).unwrap();
            mp.compute(&opts.window_options()).unwrap();
            let (profile, index) = pan.row(m).unwrap();
            assert_eq!(profile, mp.profile());
            assert_eq!(index, mp.profile_index());
        }
    }

    #[test]
    fn test_pan_sample_visits_midpoints_first() {
        let ts = chaotic(60);
        let mut pan = PanMatrixProfile::new(&ts, None).unwrap();
        let mut opts = PanOptions::new(4, 10);
        opts.sample = 0.3;
        pan.compute(&opts).unwrap();

        // ceil(0.3 * 7) = 3 windows
        assert_eq!(pan.order(), &[7, 5, 9]);
        assert!(pan.row(7).is_some());
        assert!(pan.row(4).is_none());
        assert!(pan.row(11).is_none());
        assert!(pan.row(3).is_none());
        assert_eq!(pan.profiles().len(), 7);
        assert!(pan.profiles()[0].is_empty());
    }

    #[test]
    fn test_pan_validation() {
        let ts = chaotic(20);
        let mut pan = PanMatrixProfile::new(&ts, None).unwrap();
        assert_eq!(
            pan.compute(&PanOptions::new(1, 5)),
            Err(ProfileError::InvalidWindow { m: 1, len: 20 })
        );
        assert_eq!(
            pan.compute(&PanOptions::new(4, 21)),
            Err(ProfileError::InvalidWindow { m: 21, len: 20 })
        );
        let mut opts = PanOptions::new(4, 6);
        opts.sample = 0.0;
        assert_eq!(pan.compute(&opts), Err(ProfileError::InvalidSample(0.0)));
        assert!(PanMatrixProfile::new(&[], None).is_err());
    }

    #[test]
    fn test_pan_ab_join() {
        let a = chaotic(50);
        let b: Vec<f64> = (0..40).map(|i| (i as f64 * 0.9).cos()).collect();
        let mut pan = PanMatrixProfile::new(&a, Some(&b)).unwrap();
        pan.compute(&PanOptions::new(5, 8)).unwrap();
        for m in 5..=8 {
            let (profile, index) = pan.row(m).unwrap();
            assert_eq!(profile.len(), a.len() - m + 1);
            assert!(index.iter().all(|&j| j <= b.len() - m));
        }
    }
}
