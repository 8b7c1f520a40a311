//! Matrix profile computation for univariate time series.
//!
//! A [`MatrixProfile`] holds, for every subsequence of a series, the distance to
//! its nearest neighbor (in the same series, or in a second one) and where that
//! neighbor starts. Four interchangeable algorithms fill it:
//!
//! - STMP: one MASS distance row per query, the reference result
//! - STAMP: a random sample of MASS rows, for anytime estimates
//! - STOMP: ordered rows with an O(1) dot-product recurrence
//! - MPX: a diagonal sweep of Pearson correlations with no FFTs
//!
//! Profiles can be extended sample by sample with [`MatrixProfile::update`] and
//! swept across window sizes with [`PanMatrixProfile`].
//!
//! # Examples
//!
//! ```
//! use mprofile::{Algorithm, ComputeOptions, MatrixProfile};
//!
//! let ts: Vec<f64> = (0..200).map(|i| ((i * i) as f64 * 0.37).sin()).collect();
//! let mut mp = MatrixProfile::new(&ts, None, 16).unwrap();
//! mp.compute(&ComputeOptions::new(Algorithm::Mpx)).unwrap();
//!
//! // Discord: the subsequence farthest from its nearest neighbor
//! let (discord, _) = mp
//!     .profile()
//!     .iter()
//!     .enumerate()
//!     .filter(|(_, d)| d.is_finite())
//!     .fold((0, f64::MIN), |acc, (i, &d)| if d > acc.1 { (i, d) } else { acc });
//! assert!(discord < mp.profile().len());
//! ```

pub mod algorithms;
pub mod core;

pub use crate::algorithms::mass::{cross_correlate, mass};
pub use crate::algorithms::pan::{binary_split, PanMatrixProfile, PanOptions};
pub use crate::core::error::{ProfileError, Result};
pub use crate::core::matrix_profile::{Algorithm, ComputeOptions, MatrixProfile, PartialProfile};
pub use crate::core::metric::{corr_to_dist, dist_to_corr, Metric, NO_MATCH};
pub use crate::core::stats::{MovingStats, RollingStats, SeriesCache};
