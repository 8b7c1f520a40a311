use tracing::trace;

use crate::algorithms::batch::{
    absorb_row, chunk_range, merge_batches, run_batches, BatchResult, JoinInput, JoinOutput,
    RowContext,
};
use crate::algorithms::common::{apply_exclusion_zone, sliding_dot_product};
use crate::algorithms::mass::{cross_correlate, dots_to_distances};
use crate::core::error::Result;
use crate::core::metric::Metric;

/// Compute the matrix profile using the STOMP algorithm.
///
/// STOMP exploits the relationship between consecutive dot products of query
/// `j` (in B) and subsequence `i` (in A):
/// `QT[j][i] = QT[j-1][i-1] - B[j-1]*A[i-1] + B[j+m-1]*A[i+m-1]`
///
/// This gives O(1) updates per cell instead of an FFT per row. Rows are split
/// into `parallelism` contiguous batches; each batch seeds its first row with
/// MASS and walks the recurrence from there.
pub(crate) fn stomp(input: &JoinInput<'_>, parallelism: usize, out: &mut JoinOutput) -> Result<()> {
    let ctx = input.prepare()?;
    // QT[j][0] for every j: the column the recurrence cannot reach.
    let first_col = sliding_dot_product(&input.a[..input.m], input.b);

    let n_b = input.n_b();
    let n_batches = parallelism.max(1);
    let results = run_batches(parallelism, n_batches, |batch| {
        let rows = chunk_range(n_b, n_batches, batch);
        if rows.is_empty() {
            return BatchResult::empty(Metric::Distance);
        }
        trace!(batch, start = rows.start, end = rows.end, "stomp batch");
        let mut local = BatchResult::new(input, Metric::Distance);
        let status = stomp_rows(&ctx, &first_col, rows, &mut local);
        local.finish(status)
    })?;
    merge_batches(out, results)
}

/// Process rows `rows` in order, stopping at the first failing query.
fn stomp_rows(
    ctx: &RowContext<'_>,
    first_col: &[f64],
    rows: std::ops::Range<usize>,
    local: &mut BatchResult,
) -> Result<()> {
    let JoinInput { a, b, m, .. } = ctx.input;
    let mut qt = cross_correlate(ctx.query(rows.start), &ctx.cache)?;
    let mut row = vec![0.0; qt.len()];

    for j in rows.clone() {
        if j > rows.start {
            // Right to left so qt[i - 1] still holds the previous row.
            for i in (1..qt.len()).rev() {
                qt[i] = qt[i - 1] - b[j - 1] * a[i - 1] + b[j + m - 1] * a[i + m - 1];
            }
            qt[0] = first_col[j];
        }

        row.copy_from_slice(&qt);
        dots_to_distances(&mut row, j, ctx.stats_of(j), &ctx.cache)?;
        if let Some(zone) = ctx.exclusion() {
            apply_exclusion_zone(&mut row, j, zone);
        }
        absorb_row(&row, j, &mut local.profile, local.reverse.as_mut());
    }
    Ok(())
}
