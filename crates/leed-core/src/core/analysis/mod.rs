//! Comparison of computed and measured IV curves.
//!
//! Curves are smoothed with a Lorentzian of the width of the imaginary optical
//! potential, resampled onto a common energy grid and compared through their
//! mean square deviation. The scan over rigid energy shifts lives in
//! [`workflows::rfactor`](crate::workflows::rfactor).

pub mod rfactor;
pub mod smoothing;

pub use rfactor::{RFactorError, hermite_resample, mean_square_error, normalize_mean};
pub use smoothing::lorentzian_smoothing;
