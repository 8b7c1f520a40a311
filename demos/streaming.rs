//! Streaming matrix profile updates.
//!
//! Builds a profile over an initial batch, then appends samples as they arrive.
//! An amplitude change in the stream shows up as a rise in the profile.
//!
//! Run with: cargo run --release --example streaming

use mprofile::{Algorithm, ComputeOptions, MatrixProfile};

fn max_finite(profile: &[f64]) -> f64 {
    profile
        .iter()
        .copied()
        .filter(|d| d.is_finite())
        .fold(f64::NEG_INFINITY, f64::max)
}

fn main() -> mprofile::Result<()> {
    let m = 20;
    let n_initial = 200;
    let signal = |i: usize| {
        (i as f64 * std::f64::consts::TAU / 40.0).sin() + 0.01 * (i as f64 * 1.7).cos()
    };

    let initial: Vec<f64> = (0..n_initial).map(signal).collect();
    let opts = ComputeOptions::new(Algorithm::Stomp);
    let mut mp = MatrixProfile::new(&initial, None, m)?;
    mp.compute(&opts)?;

    println!("Streaming matrix profile");
    println!("========================");
    println!("Initial profile length: {}", mp.profile().len());
    println!("Initial max distance: {:.6}", max_finite(mp.profile()));

    println!("\n--- Streaming 100 normal points ---");
    for i in n_initial..n_initial + 100 {
        mp.update(&[signal(i)])?;
    }
    println!("Profile length: {}", mp.profile().len());
    println!("Max distance: {:.6}", max_finite(mp.profile()));

    println!("\n--- Streaming 50 points at 3x amplitude, mixed with a new shape ---");
    let burst: Vec<f64> = (n_initial + 100..n_initial + 150)
        .map(|i| signal(i) * 3.0 + (i as f64 * 0.9).sin())
        .collect();
    mp.update(&burst)?;

    let profile = mp.profile();
    let (discord, distance) = profile
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, d)| d.is_finite())
        .fold((0, f64::NEG_INFINITY), |acc, (i, d)| {
            if d > acc.1 {
                (i, d)
            } else {
                acc
            }
        });
    println!("Profile length: {}", profile.len());
    println!("Top discord at index {discord} (distance {distance:.4})");

    // Streaming must agree with a batch recompute
    let mut batch = MatrixProfile::new(mp.a(), None, m)?;
    batch.compute(&opts)?;
    let max_diff = mp
        .profile()
        .iter()
        .zip(batch.profile())
        .filter(|(s, b)| s.is_finite() && b.is_finite())
        .map(|(s, b)| (s - b).abs())
        .fold(0.0, f64::max);
    println!("\nStreaming vs batch max difference: {max_diff:.2e}");

    Ok(())
}
