use std::fmt;
use std::sync::Arc;

use realfft::num_complex::Complex;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};

use crate::core::error::{ProfileError, Result};

/// Prefix-sum variances below this fraction of `E[x^2]` are recomputed directly.
const CANCELLATION_TOL: f64 = 1e-8;

/// A window whose std is within a few ULPs of its mean is treated as constant.
#[inline]
fn is_constant(sigma: f64, mu: f64) -> bool {
    sigma <= 4.0 * f64::EPSILON * mu.abs()
}

fn check_window(len: usize, m: usize) -> Result<()> {
    if m <= 1 || m > len {
        return Err(ProfileError::InvalidWindow { m, len });
    }
    Ok(())
}

/// Mean and std of `window`, computed directly. Std is exactly 0 for constant windows.
pub(crate) fn window_moments(window: &[f64]) -> (f64, f64) {
    let m_f = window.len() as f64;
    let mu = window.iter().sum::<f64>() / m_f;
    let var = window.iter().map(|x| (x - mu) * (x - mu)).sum::<f64>() / m_f;
    let sigma = var.sqrt();
    if is_constant(sigma, mu) {
        (mu, 0.0)
    } else {
        (mu, sigma)
    }
}

/// Rolling mean and standard deviation for all subsequences of length `m`.
///
/// Computed in one pass over cumulative sums and sums-of-squares. Windows where
/// the prefix-sum variance is dominated by cancellation are recomputed directly,
/// so constant windows always report a std of exactly zero.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingStats {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
    /// Whether any subsequence is constant (has std == 0).
    pub has_constant: bool,
}

impl RollingStats {
    /// Compute rolling statistics for subsequences of length `m`.
    pub fn compute(ts: &[f64], m: usize) -> Result<Self> {
        check_window(ts.len(), m)?;

        let n = ts.len();
        let n_subs = n - m + 1;

        let mut cumsum = vec![0.0; n + 1];
        let mut cumsum_sq = vec![0.0; n + 1];
        for i in 0..n {
            cumsum[i + 1] = cumsum[i] + ts[i];
            cumsum_sq[i + 1] = cumsum_sq[i] + ts[i] * ts[i];
        }

        let mut stats = Self {
            mean: Vec::with_capacity(n_subs),
            std: Vec::with_capacity(n_subs),
            has_constant: false,
        };

        let m_f = m as f64;
        for i in 0..n_subs {
            let mean_sq = (cumsum_sq[i + m] - cumsum_sq[i]) / m_f;
            let mu = (cumsum[i + m] - cumsum[i]) / m_f;
            let var = (mean_sq - mu * mu).max(0.0);
            if var <= CANCELLATION_TOL * mean_sq {
                let (mu, sigma) = window_moments(&ts[i..i + m]);
                stats.push(mu, sigma);
            } else {
                stats.push(mu, var.sqrt());
            }
        }

        Ok(stats)
    }

    /// Extend rolling statistics by one new subsequence after appending a point.
    ///
    /// Costs O(m) instead of the O(n) of a full recompute.
    pub fn extend(&mut self, ts: &[f64], m: usize) -> Result<()> {
        check_window(ts.len(), m)?;
        let (mu, sigma) = window_moments(&ts[ts.len() - m..]);
        self.push(mu, sigma);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    fn push(&mut self, mu: f64, sigma: f64) {
        self.mean.push(mu);
        self.std.push(sigma);
        if sigma == 0.0 {
            self.has_constant = true;
        }
    }
}

/// Rolling statistics for the correlation-diagonal (MPX) sweep.
///
/// - `mean[i]`: compensated (two-sum) rolling mean.
/// - `inv_norm[i]`: `1 / sqrt(sum((x - mean[i])^2))` over window `i`, 0 for constant windows.
/// - `df[i]`, `dg[i]`: first-difference terms that move the centred cross product
///   from one cell of a diagonal to the next. Index 0 holds 0.
#[derive(Debug, Clone)]
pub struct MovingStats {
    pub mean: Vec<f64>,
    pub inv_norm: Vec<f64>,
    pub df: Vec<f64>,
    pub dg: Vec<f64>,
    pub has_constant: bool,
}

#[inline(always)]
fn two_sum(a: f64, b: f64) -> (f64, f64) {
    let s = a + b;
    let bb = s - a;
    (s, (a - (s - bb)) + (b - bb))
}

/// Rolling window sums with error-free transformation of every add and subtract.
fn rolling_sum_2s(ts: &[f64], m: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(ts.len() - m + 1);
    let mut accum = ts[0];
    let mut resid = 0.0;
    for &x in &ts[1..m] {
        let (s, e) = two_sum(accum, x);
        accum = s;
        resid += e;
    }
    out.push(accum + resid);

    for i in m..ts.len() {
        let (p, q) = two_sum(accum, -ts[i - m]);
        let (s, e) = two_sum(p, ts[i]);
        accum = s;
        resid += q + e;
        out.push(accum + resid);
    }
    out
}

impl MovingStats {
    /// One O(n) pass: two-sum means, the difference terms, then the centred sum of
    /// squares rolled forward by `2 * df[k] * dg[k]`.
    pub fn compute(ts: &[f64], m: usize) -> Result<Self> {
        check_window(ts.len(), m)?;
        let n_subs = ts.len() - m + 1;
        let m_f = m as f64;

        let mean: Vec<f64> = rolling_sum_2s(ts, m).into_iter().map(|s| s / m_f).collect();

        let mut df = vec![0.0; n_subs];
        let mut dg = vec![0.0; n_subs];
        for k in 1..n_subs {
            df[k] = 0.5 * (ts[k + m - 1] - ts[k - 1]);
            dg[k] = (ts[k + m - 1] - mean[k]) + (ts[k - 1] - mean[k - 1]);
        }

        let centred_ss = |k: usize| -> f64 {
            let mu = mean[k];
            ts[k..k + m].iter().map(|x| (x - mu) * (x - mu)).sum()
        };

        let mut has_constant = false;
        let mut inv_norm = Vec::with_capacity(n_subs);
        let mut ss = 0.0;
        let mut scale: f64 = 0.0;
        for k in 0..n_subs {
            ss = if k == 0 {
                centred_ss(0)
            } else {
                ss + 2.0 * df[k] * dg[k]
            };
            scale = scale.max(ss).max(m_f * mean[k] * mean[k]);
            // Rolled sums lose the exact zero of flat windows to cancellation
            if ss <= CANCELLATION_TOL * scale {
                ss = centred_ss(k);
            }

            if is_constant((ss / m_f).sqrt(), mean[k]) {
                has_constant = true;
                inv_norm.push(0.0);
            } else {
                inv_norm.push(1.0 / ss.sqrt());
            }
        }

        Ok(Self {
            mean,
            inv_norm,
            df,
            dg,
            has_constant,
        })
    }
}

/// Rolling statistics plus the forward FFT of a reference series.
///
/// Built once per `(series, m)` and shared read-only by every MASS query and
/// every worker. The FFT plans are kept so queries don't re-plan.
#[derive(Clone)]
pub struct SeriesCache {
    pub stats: RollingStats,
    pub(crate) spectrum: Vec<Complex<f64>>,
    pub(crate) forward: Arc<dyn RealToComplex<f64>>,
    pub(crate) inverse: Arc<dyn ComplexToReal<f64>>,
    len: usize,
    m: usize,
}

impl SeriesCache {
    pub fn new(ts: &[f64], m: usize) -> Result<Self> {
        let stats = RollingStats::compute(ts, m)?;
        Self::with_stats(ts, m, stats)
    }

    /// Build the cache around statistics the caller already holds.
    pub fn with_stats(ts: &[f64], m: usize, stats: RollingStats) -> Result<Self> {
        check_window(ts.len(), m)?;
        if stats.len() != ts.len() - m + 1 {
            return Err(ProfileError::InvalidInput(format!(
                "statistics cover {} windows, series has {}",
                stats.len(),
                ts.len() - m + 1
            )));
        }

        let n = ts.len();
        let mut planner = RealFftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(n);
        let inverse = planner.plan_fft_inverse(n);

        let mut buf = ts.to_vec();
        let mut spectrum = forward.make_output_vec();
        forward.process(&mut buf, &mut spectrum)?;

        Ok(Self {
            stats,
            spectrum,
            forward,
            inverse,
            len: n,
            m,
        })
    }

    /// Length of the cached series.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn m(&self) -> usize {
        self.m
    }

    /// Number of subsequences of length `m`.
    pub fn n_subs(&self) -> usize {
        self.len - self.m + 1
    }
}

impl fmt::Debug for SeriesCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeriesCache")
            .field("len", &self.len)
            .field("m", &self.m)
            .field("has_constant", &self.stats.has_constant)
            .finish_non_exhaustive()
    }
}
