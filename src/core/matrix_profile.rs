use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::algorithms::batch::{default_parallelism, JoinInput, JoinOutput};
use crate::algorithms::mass::{cross_correlate, distance_row};
use crate::algorithms::{mpx, stamp, stmp, stomp};
use crate::core::error::{ProfileError, Result};
use crate::core::metric::{finalize_values, Metric, NO_MATCH};
use crate::core::stats::{window_moments, SeriesCache};

/// Matrix profile computation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Brute force: one MASS call per query. Reference implementation.
    Stmp,
    /// Randomized anytime sampling of query rows.
    Stamp,
    /// Ordered rows with the O(1) dot-product recurrence.
    Stomp,
    /// Correlation-diagonal sweep without per-row FFTs.
    Mpx,
}

impl Algorithm {
    /// Representation the algorithm produces before finalisation.
    pub fn native_metric(self) -> Metric {
        match self {
            Algorithm::Mpx => Metric::Correlation,
            _ => Metric::Distance,
        }
    }
}

/// Options for [`MatrixProfile::compute`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeOptions {
    pub algorithm: Algorithm,
    /// Fraction of query rows visited by STAMP, in (0, 1]. Ignored by the others.
    pub sample: f64,
    /// Number of workers (and batches).
    pub parallelism: usize,
    /// Report z-normalized Euclidean distances instead of Pearson correlations.
    pub euclidean: bool,
    /// Report each merged entry as `|r|`, so an anti-correlated best match reads
    /// as a strong one. Neighbors are still chosen by signed correlation.
    pub remap_negative_corr: bool,
    /// Self-join exclusion radius is `m / exclusion_denom`.
    pub exclusion_denom: usize,
    /// Seed for the STAMP permutation. `None` draws from the OS.
    pub seed: Option<u64>,
}

impl Default for ComputeOptions {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Mpx,
            sample: 1.0,
            parallelism: default_parallelism(),
            euclidean: true,
            remap_negative_corr: false,
            exclusion_denom: 2,
            seed: None,
        }
    }
}

impl ComputeOptions {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            ..Self::default()
        }
    }

    /// Compute the self-join exclusion radius for subsequence length `m`.
    pub fn exclusion_zone(&self, m: usize) -> usize {
        m / self.exclusion_denom.max(1)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.parallelism == 0 {
            return Err(ProfileError::InvalidInput(
                "parallelism must be at least 1".into(),
            ));
        }
        if self.exclusion_denom == 0 {
            return Err(ProfileError::InvalidInput(
                "exclusion_denom must be at least 1".into(),
            ));
        }
        if self.algorithm == Algorithm::Stamp && (self.sample.is_nan() || self.sample <= 0.0) {
            return Err(ProfileError::InvalidSample(self.sample));
        }
        Ok(())
    }
}

/// Best value found so far for each subsequence, and the neighbor achieving it.
///
/// This is the unit of work exchanged between workers and the merge step.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialProfile {
    pub metric: Metric,
    pub values: Vec<f64>,
    pub indices: Vec<usize>,
}

impl PartialProfile {
    /// Create a profile of `len` unmatched entries.
    pub fn new(len: usize, metric: Metric) -> Self {
        Self {
            metric,
            values: vec![metric.sentinel(); len],
            indices: vec![NO_MATCH; len],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Update entry `idx` if `value` strictly improves on it.
    #[inline(always)]
    pub fn update(&mut self, idx: usize, value: f64, neighbor: usize) {
        if self.metric.is_better(value, self.values[idx]) {
            self.values[idx] = value;
            self.indices[idx] = neighbor;
        }
    }

    /// Merge another profile into this one, keeping the better entry element-wise.
    ///
    /// An empty `other` is a no-op. Ties keep the current entry.
    pub fn merge(&mut self, other: &PartialProfile) {
        if other.is_empty() {
            return;
        }
        debug_assert_eq!(self.len(), other.len());
        debug_assert_eq!(self.metric, other.metric);
        for i in 0..self.len().min(other.len()) {
            self.update(i, other.values[i], other.indices[i]);
        }
    }
}

/// A matrix profile of one series against itself, or of series A against B.
///
/// `profile[i]` is the best match in `B` for the subsequence of `A` starting at
/// `i`, and `profile_index[i]` is where that match starts. AB-joins also carry
/// the reverse direction in `profile_b` / `profile_index_b`.
///
/// # Examples
///
/// ```
/// use mprofile::{Algorithm, ComputeOptions, MatrixProfile};
///
/// let ts = vec![0.0, 0.99, 1.0, 0.0, 0.0, 0.98, 1.0, 0.0, 0.0, 0.96, 1.0, 0.0];
/// let mut mp = MatrixProfile::new(&ts, None, 4).unwrap();
/// mp.compute(&ComputeOptions::new(Algorithm::Stomp)).unwrap();
/// assert_eq!(mp.profile().len(), ts.len() - 4 + 1);
/// assert_eq!(mp.profile_index()[0], 4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixProfile {
    pub(crate) a: Vec<f64>,
    /// `None` for self-joins.
    pub(crate) b: Option<Vec<f64>>,
    pub(crate) m: usize,
    pub(crate) exclusion_zone: usize,
    pub(crate) metric: Metric,
    pub(crate) profile: Vec<f64>,
    pub(crate) profile_index: Vec<usize>,
    pub(crate) profile_b: Vec<f64>,
    pub(crate) profile_index_b: Vec<usize>,
}

pub(crate) fn validate_series(name: &str, ts: &[f64]) -> Result<()> {
    if ts.is_empty() {
        return Err(ProfileError::InvalidInput(format!("series {name} is empty")));
    }
    if let Some(pos) = ts.iter().position(|x| !x.is_finite()) {
        return Err(ProfileError::InvalidInput(format!(
            "series {name} has a non-finite value at {pos}"
        )));
    }
    Ok(())
}

impl MatrixProfile {
    /// Create a matrix profile for `a` joined with `b`, or with itself when `b` is `None`.
    ///
    /// Only requires `2 <= m <= min(len(a), len(b))`; the stricter self-join bound
    /// of the row-based algorithms is checked by [`compute`](Self::compute).
    pub fn new(a: &[f64], b: Option<&[f64]>, m: usize) -> Result<Self> {
        validate_series("A", a)?;
        if let Some(b) = b {
            validate_series("B", b)?;
        }
        let shortest = b.map_or(a.len(), |b| a.len().min(b.len()));
        if m < 2 || m > shortest {
            return Err(ProfileError::InvalidWindow { m, len: shortest });
        }

        let n_a = a.len() - m + 1;
        let n_b = b.map_or(0, |b| b.len() - m + 1);
        let metric = Metric::Distance;
        Ok(Self {
            a: a.to_vec(),
            b: b.map(<[f64]>::to_vec),
            m,
            exclusion_zone: if b.is_none() { m / 2 } else { 0 },
            metric,
            profile: vec![metric.sentinel(); n_a],
            profile_index: vec![NO_MATCH; n_a],
            profile_b: vec![metric.sentinel(); n_b],
            profile_index_b: vec![NO_MATCH; n_b],
        })
    }

    /// Compute (or recompute) the profile in place.
    ///
    /// Worker errors do not stop the other workers: every batch is merged and the
    /// error reported by the last failing batch is returned. The profile then holds
    /// whatever the batches managed to compute.
    pub fn compute(&mut self, opts: &ComputeOptions) -> Result<()> {
        opts.validate()?;
        let m = self.m;
        if opts.algorithm != Algorithm::Mpx && self.self_join() && 2 * m >= self.a.len() {
            return Err(ProfileError::InvalidWindow {
                m,
                len: self.a.len(),
            });
        }

        let zone = if self.self_join() {
            opts.exclusion_zone(m)
        } else {
            0
        };
        let input = JoinInput {
            a: &self.a,
            b: self.b(),
            m,
            self_join: self.self_join(),
            exclusion_zone: zone,
        };
        debug!(
            algorithm = ?opts.algorithm,
            len_a = input.a.len(),
            len_b = input.b.len(),
            m,
            self_join = input.self_join,
            parallelism = opts.parallelism,
            "computing matrix profile"
        );

        let mut out = JoinOutput::new(&input, opts.algorithm.native_metric());
        let status = match opts.algorithm {
            Algorithm::Stmp => stmp::stmp(&input, &mut out),
            Algorithm::Stamp => stamp::stamp(
                &input,
                opts.sample.min(1.0),
                opts.parallelism,
                opts.seed,
                &mut out,
            ),
            Algorithm::Stomp => stomp::stomp(&input, opts.parallelism, &mut out),
            Algorithm::Mpx => mpx::mpx(&input, opts.parallelism, &mut out),
        };

        self.exclusion_zone = zone;
        self.store(out, opts);
        status
    }

    fn store(&mut self, out: JoinOutput, opts: &ComputeOptions) {
        let m = self.m;
        let JoinOutput { profile, reverse } = out;

        let mut values = profile.values;
        self.metric = finalize_values(
            &mut values,
            profile.metric,
            m,
            opts.euclidean,
            opts.remap_negative_corr,
        );
        self.profile = values;
        self.profile_index = profile.indices;

        match reverse {
            Some(rev) => {
                let mut values = rev.values;
                finalize_values(
                    &mut values,
                    rev.metric,
                    m,
                    opts.euclidean,
                    opts.remap_negative_corr,
                );
                self.profile_b = values;
                self.profile_index_b = rev.indices;
            }
            None => {
                self.profile_b.clear();
                self.profile_index_b.clear();
            }
        }
    }

    fn check_query(&self, idx: usize) -> Result<()> {
        let n_b = self.b().len() - self.m + 1;
        if idx >= n_b {
            return Err(ProfileError::IndexOutOfRange { index: idx, len: n_b });
        }
        Ok(())
    }

    /// Sliding dot product of the `B` subsequence at `idx` against every subsequence of `A`.
    pub fn cross_correlation(&self, idx: usize) -> Result<Vec<f64>> {
        self.check_query(idx)?;
        let cache = SeriesCache::new(&self.a, self.m)?;
        cross_correlate(&self.b()[idx..idx + self.m], &cache)
    }

    /// Z-normalized distance profile of the `B` subsequence at `idx` against `A`.
    ///
    /// For self-joins the exclusion zone around `idx` is set to `+Inf`.
    pub fn distance_profile(&self, idx: usize) -> Result<Vec<f64>> {
        self.check_query(idx)?;
        let cache = SeriesCache::new(&self.a, self.m)?;
        let query = &self.b()[idx..idx + self.m];
        let query_stats = match &self.b {
            None => (cache.stats.mean[idx], cache.stats.std[idx]),
            Some(_) => window_moments(query),
        };
        let zone = self.self_join().then_some(self.exclusion_zone);
        distance_row(query, idx, query_stats, &cache, zone)
    }

    /// Primary series.
    pub fn a(&self) -> &[f64] {
        &self.a
    }

    /// Reference series (the primary series for self-joins).
    pub fn b(&self) -> &[f64] {
        self.b.as_deref().unwrap_or(&self.a)
    }

    /// Subsequence length.
    pub fn m(&self) -> usize {
        self.m
    }

    pub fn self_join(&self) -> bool {
        self.b.is_none()
    }

    /// Exclusion radius used by the last computation (0 for AB-joins).
    pub fn exclusion_zone(&self) -> usize {
        self.exclusion_zone
    }

    /// Whether the profile holds distances or correlations.
    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn profile(&self) -> &[f64] {
        &self.profile
    }

    pub fn profile_index(&self) -> &[usize] {
        &self.profile_index
    }

    /// Best match in `A` of each subsequence of `B`. Empty for self-joins.
    pub fn profile_b(&self) -> &[f64] {
        &self.profile_b
    }

    pub fn profile_index_b(&self) -> &[usize] {
        &self.profile_index_b
    }
}
