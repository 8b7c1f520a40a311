use crate::algorithms::batch::{absorb_row, JoinInput, JoinOutput};
use crate::core::error::Result;

/// Brute-force matrix profile: one MASS distance row per query, in order.
///
/// O(n_b * n_a log n_a). Slow, but every other algorithm is checked against it.
/// Stops at the first failing query; rows already processed stay in `out`.
pub(crate) fn stmp(input: &JoinInput<'_>, out: &mut JoinOutput) -> Result<()> {
    let ctx = input.prepare()?;
    for j in 0..input.n_b() {
        let row = ctx.row(j)?;
        absorb_row(&row, j, &mut out.profile, out.reverse.as_mut());
    }
    Ok(())
}
