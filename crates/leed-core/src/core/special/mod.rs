//! Special functions used by the multiple-scattering kernels.
//!
//! Spherical Bessel and Hankel functions, complex spherical harmonics with the
//! flat `(l, m)` indexing shared by every angular-momentum matrix in the crate,
//! and the Gaunt coupling coefficients that link angular momenta in the
//! lattice-sum propagators.

pub mod bessel;
pub mod coupling;
pub mod harmonics;

pub use bessel::{hankel1, modified_spherical_bessel_i, spherical_bessel_j};
pub use coupling::{CouplingTable, gaunt, wigner_3j};
pub use harmonics::{
    analytic_conjugate, harmonics_of_vector, lm_count, lm_from_index, lm_index,
    spherical_harmonics,
};
