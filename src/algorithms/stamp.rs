use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::trace;

use crate::algorithms::batch::{
    absorb_row, chunk_range, merge_batches, run_batches, BatchResult, JoinInput, JoinOutput,
    RowContext,
};
use crate::core::error::Result;
use crate::core::metric::Metric;

/// Anytime matrix profile over a random subset of query rows.
///
/// The query indices `0..n_b` are shuffled once, split into `parallelism`
/// contiguous batches, and each batch evaluates the first
/// `floor(len * sample)` of its indices with MASS. With `sample == 1.0` the
/// result is exact.
///
/// # Arguments
/// * `sample` - Fraction of rows visited, in (0, 1]
/// * `seed` - Fixes the permutation; `None` seeds from the OS
pub(crate) fn stamp(
    input: &JoinInput<'_>,
    sample: f64,
    parallelism: usize,
    seed: Option<u64>,
    out: &mut JoinOutput,
) -> Result<()> {
    let ctx = input.prepare()?;

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };
    let mut order: Vec<usize> = (0..input.n_b()).collect();
    order.shuffle(&mut rng);

    let n_batches = parallelism.max(1);
    let results = run_batches(parallelism, n_batches, |batch| {
        let range = chunk_range(order.len(), n_batches, batch);
        if range.is_empty() {
            return BatchResult::empty(Metric::Distance);
        }
        let rows = &order[range];
        let visit = (rows.len() as f64 * sample).floor() as usize;
        trace!(batch, rows = rows.len(), visit, "stamp batch");

        let mut local = BatchResult::new(input, Metric::Distance);
        let status = sample_rows(&ctx, &rows[..visit.min(rows.len())], &mut local);
        local.finish(status)
    })?;
    merge_batches(out, results)
}

fn sample_rows(ctx: &RowContext<'_>, rows: &[usize], local: &mut BatchResult) -> Result<()> {
    for &j in rows {
        let row = ctx.row(j)?;
        absorb_row(&row, j, &mut local.profile, local.reverse.as_mut());
    }
    Ok(())
}
