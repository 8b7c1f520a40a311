//! Basic matrix profile computation with mprofile.
//!
//! Computes the z-normalized Euclidean matrix profile of a noisy sine with every
//! exact algorithm and reports the best motif pair and the top discord.
//!
//! Run with: cargo run --release --example basic_matrix_profile

use mprofile::{Algorithm, ComputeOptions, MatrixProfile};

fn main() -> mprofile::Result<()> {
    let n = 500;
    let m = 50;

    let mut ts: Vec<f64> = (0..n)
        .map(|i| {
            let t = i as f64;
            let base = (t * std::f64::consts::TAU / 100.0).sin();
            let noise = ((t * 7.3).sin() * (t * 13.7).cos()) * 0.05;
            base + noise
        })
        .collect();
    // A glitch the profile should flag
    for v in &mut ts[310..330] {
        *v *= -0.5;
    }

    println!("Time series length: {n}");
    println!("Subsequence length: {m}");

    for algorithm in [Algorithm::Stmp, Algorithm::Stomp, Algorithm::Mpx] {
        let mut mp = MatrixProfile::new(&ts, None, m)?;
        mp.compute(&ComputeOptions::new(algorithm))?;

        let finite = || {
            mp.profile()
                .iter()
                .copied()
                .enumerate()
                .filter(|(_, d)| d.is_finite())
        };
        let Some((min_idx, min_dist)) = finite().min_by(|a, b| a.1.total_cmp(&b.1)) else {
            println!("{algorithm:?}: no matches");
            continue;
        };
        let Some((max_idx, max_dist)) = finite().max_by(|a, b| a.1.total_cmp(&b.1)) else {
            continue;
        };

        println!("\n{algorithm:?}");
        println!("  Profile length: {}", mp.profile().len());
        println!(
            "  Best pair: {min_idx} <-> {} (distance {min_dist:.6})",
            mp.profile_index()[min_idx]
        );
        println!("  Top discord: {max_idx} (distance {max_dist:.6})");
    }

    Ok(())
}
