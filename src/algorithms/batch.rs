use tracing::warn;

use crate::algorithms::mass::distance_row;
use crate::core::error::{ProfileError, Result};
use crate::core::matrix_profile::PartialProfile;
use crate::core::metric::Metric;
use crate::core::stats::{RollingStats, SeriesCache};

/// Worker count used when the caller does not choose one.
pub(crate) fn default_parallelism() -> usize {
    #[cfg(feature = "parallel")]
    {
        rayon::current_num_threads().max(1)
    }
    #[cfg(not(feature = "parallel"))]
    {
        1
    }
}

/// Borrowed view of a join handed to every algorithm.
///
/// `a` indexes the profile, `b` supplies the queries. For self-joins both point
/// at the same series.
#[derive(Debug, Clone, Copy)]
pub(crate) struct JoinInput<'a> {
    pub a: &'a [f64],
    pub b: &'a [f64],
    pub m: usize,
    pub self_join: bool,
    pub exclusion_zone: usize,
}

impl<'a> JoinInput<'a> {
    /// Subsequences in `a`.
    pub fn n_a(&self) -> usize {
        self.a.len() - self.m + 1
    }

    /// Subsequences in `b`.
    pub fn n_b(&self) -> usize {
        self.b.len() - self.m + 1
    }

    /// Build the shared MASS state for row-based algorithms.
    pub fn prepare(&self) -> Result<RowContext<'a>> {
        let cache = SeriesCache::new(self.a, self.m)?;
        let query_stats = if self.self_join {
            cache.stats.clone()
        } else {
            RollingStats::compute(self.b, self.m)?
        };
        Ok(RowContext {
            input: *self,
            cache,
            query_stats,
        })
    }
}

/// Cached FFT of `a` plus the rolling statistics of every query in `b`.
///
/// Read-only once built, so workers share it by reference.
pub(crate) struct RowContext<'a> {
    pub input: JoinInput<'a>,
    pub cache: SeriesCache,
    pub query_stats: RollingStats,
}

impl RowContext<'_> {
    pub fn query(&self, j: usize) -> &[f64] {
        &self.input.b[j..j + self.input.m]
    }

    pub fn stats_of(&self, j: usize) -> (f64, f64) {
        (self.query_stats.mean[j], self.query_stats.std[j])
    }

    /// Exclusion radius to apply around a row, if any.
    pub fn exclusion(&self) -> Option<usize> {
        self.input
            .self_join
            .then_some(self.input.exclusion_zone)
    }

    /// Distance row of query `j` against every subsequence of `a`, via MASS.
    pub fn row(&self, j: usize) -> Result<Vec<f64>> {
        distance_row(
            self.query(j),
            j,
            self.stats_of(j),
            &self.cache,
            self.exclusion(),
        )
    }
}

/// Profile (and reverse profile, for AB-joins) being filled by an algorithm.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct JoinOutput {
    pub profile: PartialProfile,
    pub reverse: Option<PartialProfile>,
}

impl JoinOutput {
    pub fn new(input: &JoinInput<'_>, metric: Metric) -> Self {
        Self {
            profile: PartialProfile::new(input.n_a(), metric),
            reverse: (!input.self_join).then(|| PartialProfile::new(input.n_b(), metric)),
        }
    }
}

/// What one worker hands back: its local profiles and the error that stopped it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BatchResult {
    pub profile: PartialProfile,
    pub reverse: Option<PartialProfile>,
    pub err: Option<ProfileError>,
}

impl BatchResult {
    pub fn new(input: &JoinInput<'_>, metric: Metric) -> Self {
        let JoinOutput { profile, reverse } = JoinOutput::new(input, metric);
        Self {
            profile,
            reverse,
            err: None,
        }
    }

    /// A batch that had no work assigned.
    pub fn empty(metric: Metric) -> Self {
        Self {
            profile: PartialProfile::new(0, metric),
            reverse: None,
            err: None,
        }
    }

    /// Record how the batch ended. Partial results are kept either way.
    pub fn finish(mut self, status: Result<()>) -> Self {
        self.err = status.err();
        self
    }
}

/// Fold a distance row for query `j` into the profile, and its best entry into `reverse[j]`.
#[inline]
pub(crate) fn absorb_row(
    row: &[f64],
    j: usize,
    profile: &mut PartialProfile,
    reverse: Option<&mut PartialProfile>,
) {
    for (i, &d) in row.iter().enumerate() {
        profile.update(i, d, j);
    }
    if let Some(reverse) = reverse {
        let metric = reverse.metric;
        let mut best = metric.sentinel();
        let mut best_idx = None;
        for (i, &d) in row.iter().enumerate() {
            if metric.is_better(d, best) {
                best = d;
                best_idx = Some(i);
            }
        }
        if let Some(i) = best_idx {
            reverse.update(j, best, i);
        }
    }
}

/// Split `n` items into `n_batches` contiguous chunks of `ceil(n / n_batches)`.
///
/// Trailing batches may be empty when the items run out.
pub(crate) fn chunk_range(n: usize, n_batches: usize, batch: usize) -> std::ops::Range<usize> {
    let chunk = n.div_ceil(n_batches.max(1));
    let start = (batch * chunk).min(n);
    let end = (start + chunk).min(n);
    start..end
}

/// Run `n_batches` independent workers and collect their results in batch order.
///
/// With the `parallel` feature the batches run on rayon's global pool when it
/// has exactly `parallelism` threads, and on a pool built for the call otherwise.
#[cfg_attr(not(feature = "parallel"), allow(unused_variables))]
pub(crate) fn run_batches<F>(parallelism: usize, n_batches: usize, work: F) -> Result<Vec<BatchResult>>
where
    F: Fn(usize) -> BatchResult + Send + Sync,
{
    #[cfg(feature = "parallel")]
    if parallelism > 1 && n_batches > 1 {
        use rayon::prelude::*;

        if parallelism == rayon::current_num_threads() {
            return Ok((0..n_batches).into_par_iter().map(&work).collect());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(parallelism)
            .build()
            .map_err(|e| ProfileError::WorkerPool(e.to_string()))?;
        return Ok(pool.install(|| (0..n_batches).into_par_iter().map(&work).collect()));
    }

    Ok((0..n_batches).map(work).collect())
}

/// Merge every batch into `out`, in batch order.
///
/// All batches are merged even when some failed. The returned error is the one
/// from the last failing batch.
pub(crate) fn merge_batches(out: &mut JoinOutput, results: Vec<BatchResult>) -> Result<()> {
    let mut status = Ok(());
    for (batch, result) in results.into_iter().enumerate() {
        out.profile.merge(&result.profile);
        if let (Some(rev), Some(local)) = (out.reverse.as_mut(), result.reverse.as_ref()) {
            rev.merge(local);
        }
        if let Some(err) = result.err {
            warn!(batch, error = %err, "matrix profile batch failed");
            status = Err(err);
        }
    }
    status
}
