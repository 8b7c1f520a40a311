use tracing::{debug, trace};

use crate::algorithms::mass::distance_row;
use crate::core::error::{ProfileError, Result};
use crate::core::matrix_profile::MatrixProfile;
use crate::core::metric::{dist_to_corr, Metric, NO_MATCH};
use crate::core::stats::{window_moments, RollingStats, SeriesCache};

impl MatrixProfile {
    /// Append `values` to `A` one at a time, keeping the profile exact.
    ///
    /// Each sample adds one subsequence. Its distance profile (via MASS) improves
    /// every earlier entry it beats and fills the new trailing slot. For AB-joins
    /// the new window is queried against `B` and also improves `profile_b`.
    ///
    /// # Errors
    /// Stops at the first failing sample (non-finite value, constant window).
    /// Samples before it stay applied. A finite failing sample stays appended and
    /// its subsequence keeps an unmatched slot, so later updates can continue.
    pub fn update(&mut self, values: &[f64]) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        debug!(
            values = values.len(),
            len_a = self.a.len(),
            m = self.m,
            self_join = self.self_join(),
            "streaming update"
        );

        match self.b.take() {
            None => self.update_self_join(values),
            Some(b) => {
                let status = self.update_ab_join(&b, values);
                self.b = Some(b);
                status
            }
        }
    }

    fn update_self_join(&mut self, values: &[f64]) -> Result<()> {
        let m = self.m;
        let zone = self.exclusion_zone;
        let mut stats = RollingStats::compute(&self.a, m)?;

        for &value in values {
            self.push_sample(value)?;
            self.grow();
            stats.extend(&self.a, m)?;
            let cache = SeriesCache::with_stats(&self.a, m, stats)?;

            let new = cache.n_subs() - 1;
            let query_stats = (cache.stats.mean[new], cache.stats.std[new]);
            let mut row = distance_row(&self.a[new..], new, query_stats, &cache, Some(zone))?;
            self.to_stored_metric(&mut row);

            for (i, &v) in row[..new].iter().enumerate() {
                if self.metric.is_better(v, self.profile[i]) {
                    self.profile[i] = v;
                    self.profile_index[i] = new;
                }
            }
            let (best, best_idx) = best_of(self.metric, &row);
            self.profile[new] = best;
            self.profile_index[new] = best_idx;
            trace!(index = new, neighbor = best_idx, "appended subsequence");

            stats = cache.stats;
        }
        Ok(())
    }

    fn update_ab_join(&mut self, b: &[f64], values: &[f64]) -> Result<()> {
        let m = self.m;
        let cache = SeriesCache::new(b, m)?;

        for &value in values {
            self.push_sample(value)?;
            self.grow();
            let new = self.a.len() - m;
            let query = &self.a[new..];
            let mut row = distance_row(query, new, window_moments(query), &cache, None)?;
            self.to_stored_metric(&mut row);

            for (j, &v) in row.iter().enumerate() {
                if self.metric.is_better(v, self.profile_b[j]) {
                    self.profile_b[j] = v;
                    self.profile_index_b[j] = new;
                }
            }
            let (best, best_idx) = best_of(self.metric, &row);
            self.profile[new] = best;
            self.profile_index[new] = best_idx;
            trace!(index = new, neighbor = best_idx, "appended subsequence");
        }
        Ok(())
    }

    fn push_sample(&mut self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(ProfileError::InvalidInput(format!(
                "non-finite sample {value} at position {}",
                self.a.len()
            )));
        }
        self.a.push(value);
        Ok(())
    }

    /// Add one unmatched slot to the forward profile, before anything can fail.
    fn grow(&mut self) {
        self.profile.push(self.metric.sentinel());
        self.profile_index.push(NO_MATCH);
    }

    /// MASS yields distances; profiles held as correlations are updated as such.
    fn to_stored_metric(&self, row: &mut [f64]) {
        if self.metric == Metric::Correlation {
            for v in row.iter_mut() {
                *v = dist_to_corr(*v, self.m);
            }
        }
    }
}

/// First best entry of `row` under `metric`, or the sentinel if nothing qualifies.
fn best_of(metric: Metric, row: &[f64]) -> (f64, usize) {
    row.iter()
        .enumerate()
        .fold((metric.sentinel(), NO_MATCH), |(best, idx), (i, &v)| {
            if metric.is_better(v, best) {
                (v, i)
            } else {
                (best, idx)
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::matrix_profile::{Algorithm, ComputeOptions};

    fn chaotic(n: usize, k: f64) -> Vec<f64> {
        (0..n).map(|i| ((i * i) as f64 * k).sin()).collect()
    }

    fn assert_profiles_close(got: &[f64], want: &[f64]) {
        assert_eq!(got.len(), want.len());
        for i in 0..want.len() {
            assert!(
                (got[i] - want[i]).abs() < 1e-6,
                "Mismatch at index {i}: streaming={}, batch={}",
                got[i],
                want[i]
            );
        }
    }

    #[test]
    fn test_update_grow_matches_batch() {
        let full = chaotic(90, 0.37);
        let opts = ComputeOptions::new(Algorithm::Stomp);

        let mut mp = MatrixProfile::new(&full[..40], None, 6).unwrap();
        mp.compute(&opts).unwrap();
        for &v in &full[40..] {
            mp.update(&[v]).unwrap();
        }

        let mut batch = MatrixProfile::new(&full, None, 6).unwrap();
        batch.compute(&opts).unwrap();
        assert_eq!(mp.a(), &full[..]);
        assert_profiles_close(mp.profile(), batch.profile());
    }

    #[test]
    fn test_update_keeps_correlation_form() {
        let full = chaotic(70, 0.41);
        let mut opts = ComputeOptions::new(Algorithm::Mpx);
        opts.euclidean = false;

        let mut mp = MatrixProfile::new(&full[..50], None, 5).unwrap();
        mp.compute(&opts).unwrap();
        mp.update(&full[50..]).unwrap();
        assert_eq!(mp.metric(), Metric::Correlation);

        let mut batch = MatrixProfile::new(&full, None, 5).unwrap();
        batch.compute(&opts).unwrap();
        assert_profiles_close(mp.profile(), batch.profile());
    }

    #[test]
    fn test_update_ab_join_matches_batch() {
        let a = chaotic(60, 0.37);
        let b = chaotic(45, 0.53);
        let opts = ComputeOptions::new(Algorithm::Stmp);

        let mut mp = MatrixProfile::new(&a[..30], Some(&b), 7).unwrap();
        mp.compute(&opts).unwrap();
        mp.update(&a[30..]).unwrap();

        let mut batch = MatrixProfile::new(&a, Some(&b), 7).unwrap();
        batch.compute(&opts).unwrap();
        assert_eq!(mp.b(), &b[..]);
        assert_profiles_close(mp.profile(), batch.profile());
        assert_profiles_close(mp.profile_b(), batch.profile_b());
    }

    #[test]
    fn test_update_rejects_non_finite() {
        let ts = chaotic(30, 0.37);
        let mut mp = MatrixProfile::new(&ts, None, 4).unwrap();
        mp.compute(&ComputeOptions::new(Algorithm::Stomp)).unwrap();

        let status = mp.update(&[0.3, f64::NAN, 0.7]);
        assert!(matches!(status, Err(ProfileError::InvalidInput(_))));
        // The sample before the failure was applied
        assert_eq!(mp.a().len(), 31);
        assert_eq!(mp.profile().len(), 28);
    }

    #[test]
    fn test_update_continues_after_constant_window() {
        let ts = chaotic(40, 0.37);
        let mut mp = MatrixProfile::new(&ts, None, 4).unwrap();
        mp.compute(&ComputeOptions::new(Algorithm::Stomp)).unwrap();

        let status = mp.update(&[2.0; 4]);
        assert_eq!(status, Err(ProfileError::ZeroVariance { index: 40 }));
        assert_eq!(mp.a().len(), 44);
        assert_eq!(mp.profile().len(), 41);
        assert_eq!(mp.profile()[40], f64::INFINITY);
        assert_eq!(mp.profile_index()[40], NO_MATCH);

        mp.update(&[5.0, -1.0]).unwrap();
        assert_eq!(mp.profile().len(), mp.a().len() - 4 + 1);
        assert!(mp.profile()[42].is_finite());
        // The constant window is never anyone's neighbor
        assert!(mp.profile_index().iter().all(|&j| j != 40));
    }

    #[test]
    fn test_update_ab_join_continues_after_constant_window() {
        let a = chaotic(30, 0.37);
        let b = chaotic(25, 0.53);
        let mut mp = MatrixProfile::new(&a, Some(&b), 5).unwrap();
        mp.compute(&ComputeOptions::new(Algorithm::Stmp)).unwrap();

        assert!(mp.update(&[1.5; 5]).is_err());
        assert_eq!(mp.profile().len(), 31);
        assert_eq!(mp.profile_index()[30], NO_MATCH);

        mp.update(&[0.25]).unwrap();
        assert_eq!(mp.profile().len(), 32);
        assert!(mp.profile_index_b().iter().all(|&i| i != 30));
    }

    #[test]
    fn test_best_of_keeps_first() {
        let (v, i) = best_of(Metric::Distance, &[3.0, 1.0, 1.0]);
        assert_eq!((v, i), (1.0, 1));
        let (v, i) = best_of(Metric::Correlation, &[f64::NEG_INFINITY]);
        assert_eq!(i, NO_MATCH);
        assert_eq!(v, f64::NEG_INFINITY);
    }
}
