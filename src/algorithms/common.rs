/// Sliding dot product between a query `q` and every window of `ts`, computed directly.
///
/// Returns `ts.len() - q.len() + 1` values where element `i` is `dot(q, ts[i..i+m])`.
/// O(n*m); used where only one column of dot products is needed.
pub fn sliding_dot_product(q: &[f64], ts: &[f64]) -> Vec<f64> {
    let m = q.len();
    debug_assert!(ts.len() >= m, "Time series shorter than query");
    let n_subs = ts.len() + 1 - m;

    (0..n_subs)
        .map(|i| q.iter().zip(&ts[i..i + m]).map(|(a, b)| a * b).sum())
        .collect()
}

/// Mark the subsequences overlapping `idx` as unmatchable.
///
/// Fills `[idx - zone, idx + zone]` with `+Inf`, clipped to the row.
#[inline]
pub fn apply_exclusion_zone(row: &mut [f64], idx: usize, zone: usize) {
    let lo = idx.saturating_sub(zone).min(row.len());
    let hi = idx.saturating_add(zone).saturating_add(1).min(row.len());
    row[lo..hi].fill(f64::INFINITY);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sliding_dot_product_simple() {
        // dot([1,2], [1,2]) = 5, dot([1,2], [2,3]) = 8, dot([1,2], [3,4]) = 11
        let q = vec![1.0, 2.0];
        let ts = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(sliding_dot_product(&q, &ts), vec![5.0, 8.0, 11.0]);
    }

    #[test]
    fn test_sliding_dot_product_single() {
        let q = vec![3.0, 4.0, 5.0];
        assert_eq!(sliding_dot_product(&q, &q), vec![50.0]);
    }

    #[test]
    fn test_exclusion_zone_middle() {
        let mut profile = vec![1.0; 10];
        apply_exclusion_zone(&mut profile, 5, 2);
        for (i, &val) in profile.iter().enumerate() {
            if (3..=7).contains(&i) {
                assert!(val.is_infinite());
            } else {
                assert_eq!(val, 1.0);
            }
        }
    }

    #[test]
    fn test_exclusion_zone_edges() {
        let mut profile = vec![1.0; 5];
        apply_exclusion_zone(&mut profile, 0, 2);
        assert_eq!(
            profile,
            vec![f64::INFINITY, f64::INFINITY, f64::INFINITY, 1.0, 1.0]
        );

        let mut profile = vec![1.0; 5];
        apply_exclusion_zone(&mut profile, 2, 0);
        assert_eq!(profile, vec![1.0, 1.0, f64::INFINITY, 1.0, 1.0]);

        // Only the part of the zone inside the row is touched
        let mut profile = vec![1.0; 3];
        apply_exclusion_zone(&mut profile, 7, 1);
        assert_eq!(profile, vec![1.0; 3]);
        apply_exclusion_zone(&mut profile, 4, 2);
        assert_eq!(profile, vec![1.0, 1.0, f64::INFINITY]);
    }
}
