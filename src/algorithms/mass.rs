use crate::algorithms::common::apply_exclusion_zone;
use crate::core::error::{ProfileError, Result};
use crate::core::stats::{window_moments, SeriesCache};

/// Sliding dot product of `query` against every window of the cached series.
///
/// The query is reversed and zero-padded to the series length, transformed,
/// multiplied with the cached spectrum and transformed back. Lags `m-1..n` of
/// the circular convolution are exactly the sliding dot products, so the result
/// has length `n - m + 1`. O(n log n).
pub fn cross_correlate(query: &[f64], cache: &SeriesCache) -> Result<Vec<f64>> {
    let m = query.len();
    let n = cache.len();
    if m == 0 || m > n {
        return Err(ProfileError::InvalidWindow { m, len: n });
    }

    let mut padded = vec![0.0; n];
    for (dst, &q) in padded.iter_mut().zip(query.iter().rev()) {
        *dst = q;
    }

    let mut spectrum = cache.forward.make_output_vec();
    cache.forward.process(&mut padded, &mut spectrum)?;

    for (q, t) in spectrum.iter_mut().zip(cache.spectrum.iter()) {
        *q *= *t;
    }
    // DC (and Nyquist, for even n) must be purely real for the inverse transform.
    spectrum[0].im = 0.0;
    if n % 2 == 0 {
        if let Some(last) = spectrum.last_mut() {
            last.im = 0.0;
        }
    }

    let mut out = vec![0.0; n];
    cache.inverse.process(&mut spectrum, &mut out)?;

    // realfft inverse is unnormalized
    let norm = 1.0 / n as f64;
    Ok(out[m - 1..].iter().map(|&x| x * norm).collect())
}

/// Z-normalized Euclidean distance from a dot product and both windows' statistics.
///
/// `sqrt(2m * |1 - (dot - m*mu_r*mu_q) / (m*sd_r*sd_q)|)`. A reference window with
/// zero std cannot be matched and yields `+Inf`.
#[inline(always)]
pub fn dot_to_distance(dot: f64, m: usize, mu_r: f64, sd_r: f64, mu_q: f64, sd_q: f64) -> f64 {
    if sd_r == 0.0 {
        return f64::INFINITY;
    }
    let m_f = m as f64;
    let r = (dot - m_f * mu_r * mu_q) / (m_f * sd_r * sd_q);
    (2.0 * m_f * (1.0 - r).abs()).sqrt()
}

/// Convert a row of dot products into distances in place.
///
/// Fails with `ZeroVariance` when the query itself is constant.
pub(crate) fn dots_to_distances(
    dots: &mut [f64],
    query_idx: usize,
    (mu_q, sd_q): (f64, f64),
    cache: &SeriesCache,
) -> Result<()> {
    if sd_q == 0.0 {
        return Err(ProfileError::ZeroVariance { index: query_idx });
    }
    let m = cache.m();
    let stats = &cache.stats;
    for (i, d) in dots.iter_mut().enumerate() {
        *d = dot_to_distance(*d, m, stats.mean[i], stats.std[i], mu_q, sd_q);
    }
    Ok(())
}

/// Full MASS row: distance profile of one query window against the cached series.
///
/// `query_idx` names the query in errors and, when `exclusion` is set, is the
/// centre of the self-join exclusion zone.
pub(crate) fn distance_row(
    query: &[f64],
    query_idx: usize,
    query_stats: (f64, f64),
    cache: &SeriesCache,
    exclusion: Option<usize>,
) -> Result<Vec<f64>> {
    if query_stats.1 == 0.0 {
        return Err(ProfileError::ZeroVariance { index: query_idx });
    }
    let mut row = cross_correlate(query, cache)?;
    dots_to_distances(&mut row, query_idx, query_stats, cache)?;
    if let Some(zone) = exclusion {
        apply_exclusion_zone(&mut row, query_idx, zone);
    }
    Ok(row)
}

/// Compute the z-normalized distance profile of `query` against every window of `ts`.
///
/// Mueen's Algorithm for Similarity Search. Returns `ts.len() - query.len() + 1`
/// distances.
///
/// # Errors
/// `InvalidWindow` when the query is shorter than 2 or longer than `ts`;
/// `ZeroVariance` when the query is constant.
pub fn mass(query: &[f64], ts: &[f64]) -> Result<Vec<f64>> {
    let cache = SeriesCache::new(ts, query.len())?;
    distance_row(query, 0, window_moments(query), &cache, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::common::sliding_dot_product;

    #[test]
    fn test_cross_correlate_ones() {
        let t = vec![1.0; 5];
        let cache = SeriesCache::new(&t, 2).unwrap();
        let dots = cross_correlate(&[1.0, 1.0], &cache).unwrap();
        assert_eq!(dots.len(), 4);
        for d in dots {
            assert!((d - 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_cross_correlate_matches_direct() {
        for (n, m) in [(7, 3), (64, 10), (101, 17), (500, 50)] {
            let ts: Vec<f64> = (0..n).map(|i| (i as f64 * 0.1).sin() + 0.01 * i as f64).collect();
            let cache = SeriesCache::new(&ts, m).unwrap();
            let q = &ts[n / 3..n / 3 + m];
            let fft = cross_correlate(q, &cache).unwrap();
            let naive = sliding_dot_product(q, &ts);
            assert_eq!(naive.len(), fft.len());
            for (i, (a, b)) in naive.iter().zip(fft.iter()).enumerate() {
                assert!(
                    (a - b).abs() < 1e-8,
                    "Mismatch at {i} (n={n}, m={m}): naive={a}, fft={b}"
                );
            }
        }
    }

    #[test]
    fn test_mass_self_match() {
        let ts: Vec<f64> = (0..200)
            .map(|i| (i as f64 * 2.0 * std::f64::consts::PI / 50.0).sin())
            .collect();
        let query = &ts[50..80];

        let dp = mass(query, &ts).unwrap();
        assert_eq!(dp.len(), ts.len() - 30 + 1);
        assert!(dp[50] < 1e-3, "Self-match distance should be ~0, got {}", dp[50]);
        // Same phase one period later
        assert!(dp[100] < 1e-3);
    }

    #[test]
    fn test_mass_constant_query_fails() {
        let ts: Vec<f64> = (0..100).map(|i| (i as f64 * 0.1).sin()).collect();
        let query = vec![5.0; 10];
        assert_eq!(
            mass(&query, &ts),
            Err(ProfileError::ZeroVariance { index: 0 })
        );
    }

    #[test]
    fn test_mass_constant_reference_window_is_unmatched() {
        let mut ts: Vec<f64> = (0..40).map(|i| (i as f64 * 0.4).sin()).collect();
        for v in &mut ts[10..20] {
            *v = 2.0;
        }
        let dp = mass(&ts[0..5], &ts).unwrap();
        assert!(dp[12].is_infinite());
        assert!(dp[0].is_finite());
    }

    #[test]
    fn test_mass_distances_bounded() {
        let ts: Vec<f64> = (0..300)
            .map(|i| (i as f64 * 0.1).sin() + (i as f64 * 0.03).cos())
            .collect();
        let m = 20;
        let dp = mass(&ts[10..30], &ts).unwrap();
        let upper = (4.0 * m as f64).sqrt() + 1e-9;
        for (i, &d) in dp.iter().enumerate() {
            assert!(d >= 0.0 && d <= upper, "Distance at {i} out of range: {d}");
        }
    }

    #[test]
    fn test_mass_invalid_query() {
        let ts = vec![1.0, 2.0, 3.0];
        assert!(matches!(
            mass(&[1.0, 2.0, 3.0, 4.0], &ts),
            Err(ProfileError::InvalidWindow { .. })
        ));
        assert!(matches!(
            mass(&[1.0], &ts),
            Err(ProfileError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn test_distance_row_exclusion() {
        let ts: Vec<f64> = (0..60).map(|i| (i as f64 * 0.3).sin()).collect();
        let cache = SeriesCache::new(&ts, 6).unwrap();
        let stats = (cache.stats.mean[20], cache.stats.std[20]);
        let row = distance_row(&ts[20..26], 20, stats, &cache, Some(3)).unwrap();
        for (i, &d) in row.iter().enumerate() {
            assert_eq!(d.is_infinite(), (17..=23).contains(&i), "index {i}: {d}");
        }
    }
}
