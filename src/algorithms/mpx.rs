use std::ops::Range;

use tracing::trace;

use crate::algorithms::batch::{merge_batches, run_batches, BatchResult, JoinInput, JoinOutput};
use crate::core::error::Result;
use crate::core::matrix_profile::PartialProfile;
use crate::core::metric::Metric;
use crate::core::stats::MovingStats;

/// One series and its MPX statistics.
#[derive(Clone, Copy)]
struct Side<'a> {
    ts: &'a [f64],
    stats: &'a MovingStats,
}

/// A diagonal of the correlation matrix.
///
/// `rows` is indexed by the offset along the diagonal, `cols` by `offset + lag`.
/// Self-joins use `Same`; AB-joins sweep `BOverA` (offsets in B, columns in A)
/// and then `AOverB` for the remaining lags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Diagonal {
    Same(usize),
    BOverA(usize),
    AOverB(usize),
}

/// Compute the matrix profile with the MPX correlation-diagonal sweep.
///
/// Walks each diagonal of the correlation matrix with the centred cross product
/// updated in O(1) per cell from the `df`/`dg` difference terms. No FFTs. Output
/// is in correlation space. Diagonals are split into `parallelism` batches of
/// roughly equal cell count.
pub(crate) fn mpx(input: &JoinInput<'_>, parallelism: usize, out: &mut JoinOutput) -> Result<()> {
    let m = input.m;
    let stats_a = MovingStats::compute(input.a, m)?;
    let stats_b = if input.self_join {
        None
    } else {
        Some(MovingStats::compute(input.b, m)?)
    };
    let a = Side {
        ts: input.a,
        stats: &stats_a,
    };
    let b = Side {
        ts: input.b,
        stats: stats_b.as_ref().unwrap_or(&stats_a),
    };
    let n_a = input.n_a();
    let n_b = input.n_b();

    let diagonals: Vec<Diagonal> = if input.self_join {
        let first = (input.exclusion_zone + 1).max(1);
        (first..n_a).map(Diagonal::Same).collect()
    } else {
        (0..n_a)
            .map(Diagonal::BOverA)
            .chain((1..n_b).map(Diagonal::AOverB))
            .collect()
    };
    let diagonal_len = |diag: Diagonal| match diag {
        Diagonal::Same(d) => n_a - d,
        Diagonal::BOverA(d) => (n_a - d).min(n_b),
        Diagonal::AOverB(d) => (n_b - d).min(n_a),
    };

    let lengths: Vec<usize> = diagonals.iter().map(|&d| diagonal_len(d)).collect();
    let ranges = plan_batches(&lengths, parallelism);
    let has_constant = a.stats.has_constant || b.stats.has_constant;
    trace!(
        diagonals = diagonals.len(),
        batches = ranges.len(),
        has_constant,
        "mpx sweep"
    );

    let results = run_batches(parallelism, ranges.len(), |batch| {
        let range = ranges[batch].clone();
        trace!(batch, start = range.start, end = range.end, "mpx batch");
        let mut local = BatchResult::new(input, Metric::Correlation);
        for (&diag, &len) in diagonals[range.clone()].iter().zip(&lengths[range]) {
            if has_constant {
                sweep_diagonal::<true>(diag, len, a, b, &mut local);
            } else {
                sweep_diagonal::<false>(diag, len, a, b, &mut local);
            }
        }
        local
    })?;
    merge_batches(out, results)
}

/// Split consecutive diagonals into at most `n_batches` ranges of similar cell count.
///
/// Long diagonals come first in a self-join, so early ranges hold fewer of them.
/// Batch `k` ends at the first diagonal where the running cell count reaches
/// `k/n` of the total.
fn plan_batches(lengths: &[usize], n_batches: usize) -> Vec<Range<usize>> {
    let n_batches = n_batches.clamp(1, lengths.len().max(1));
    let cells: Vec<usize> = lengths
        .iter()
        .scan(0, |total, &len| {
            *total += len;
            Some(*total)
        })
        .collect();
    let total = cells.last().copied().unwrap_or(0);

    let mut ranges = Vec::with_capacity(n_batches);
    let mut start = 0;
    for k in 1..=n_batches {
        let end = if k == n_batches {
            lengths.len()
        } else {
            let target = total * k / n_batches;
            let reached = cells[start..].partition_point(|&c| c < target);
            (start + reached + 1).min(lengths.len())
        };
        if end > start {
            ranges.push(start..end);
            start = end;
        }
    }
    ranges
}

#[inline(always)]
fn sweep_diagonal<const SKIP_CONSTANT: bool>(
    diag: Diagonal,
    len: usize,
    a: Side<'_>,
    b: Side<'_>,
    local: &mut BatchResult,
) {
    match diag {
        Diagonal::Same(d) => walk::<SKIP_CONSTANT, _>(a, a, d, len, |off, col, corr| {
            local.profile.update(off, corr, col);
            local.profile.update(col, corr, off);
        }),
        Diagonal::BOverA(d) => {
            let (profile, mut reverse) = split(local);
            walk::<SKIP_CONSTANT, _>(b, a, d, len, |off, col, corr| {
                profile.update(col, corr, off);
                if let Some(rev) = reverse.as_deref_mut() {
                    rev.update(off, corr, col);
                }
            })
        }
        Diagonal::AOverB(d) => {
            let (profile, mut reverse) = split(local);
            walk::<SKIP_CONSTANT, _>(a, b, d, len, |off, col, corr| {
                profile.update(off, corr, col);
                if let Some(rev) = reverse.as_deref_mut() {
                    rev.update(col, corr, off);
                }
            })
        }
    }
}

fn split(local: &mut BatchResult) -> (&mut PartialProfile, Option<&mut PartialProfile>) {
    (&mut local.profile, local.reverse.as_mut())
}

/// Walk one diagonal, calling `emit(offset, offset + lag, corr)` for every cell.
///
/// With `SKIP_CONSTANT` set, cells involving a constant window are not emitted.
#[inline(always)]
fn walk<const SKIP_CONSTANT: bool, F>(
    rows: Side<'_>,
    cols: Side<'_>,
    lag: usize,
    len: usize,
    mut emit: F,
) where
    F: FnMut(usize, usize, f64),
{
    if len == 0 {
        return;
    }
    let (rs, cs) = (rows.stats, cols.stats);
    let m = rows.ts.len() + 1 - rs.mean.len();

    let mut c: f64 = (0..m)
        .map(|t| (cols.ts[lag + t] - cs.mean[lag]) * (rows.ts[t] - rs.mean[0]))
        .sum();

    for off in 0..len {
        let col = off + lag;
        if off > 0 {
            c += rs.df[off] * cs.dg[col] + cs.df[col] * rs.dg[off];
        }
        let (ni, nj) = (rs.inv_norm[off], cs.inv_norm[col]);
        if SKIP_CONSTANT && (ni == 0.0 || nj == 0.0) {
            continue;
        }
        emit(off, col, c * ni * nj);
    }
}
