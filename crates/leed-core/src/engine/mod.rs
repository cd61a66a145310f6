//! # Engine Module
//!
//! This module implements the dynamical LEED calculation: for every energy it
//! turns the read-only surface model into reflected beam intensities.
//!
//! ## Overview
//!
//! Each energy point is independent. The engine updates the energy-dependent
//! scattering state, selects the beams that are not too evanescent, computes
//! the plane-wave scattering matrices of every layer and stacks them by layer
//! doubling, first for the semi-infinite bulk and then for the overlayer. The
//! surface reflection matrix is finally carried through the potential step into
//! the vacuum.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Energy range, incidence, cutoffs, scattering order, failure policy
//! - **Scattering state** ([`state`], [`factors`]) - Complex wavenumber, damping and atomic scattering factors per energy
//! - **Beams** ([`beams`]) - Beam generation, per-energy selection and set grouping
//! - **Lattice sums** ([`lattice_sum`]) - Plane and inter-layer Hankel sums and their propagators
//! - **Layer scattering** ([`composite`]) - Multiple scattering within one (composite) layer
//! - **Layer doubling** ([`doubling`]) - Stacking, bulk doubling and the potential step
//! - **Progress Monitoring** ([`progress`]) - Progress reporting for front-ends
//! - **Error Handling** ([`error`]) - Engine-specific error types
//!
//! ## Key Capabilities
//!
//! - **Parallel energy loop** behind the `parallel` feature
//! - **Composite layers** solved with a partitioned giant matrix
//! - **Propagator caching** for sub-lattice pairs sharing a displacement
//! - **Anisotropic vibrations** through non-diagonal scattering matrices
//! - **Kinematic mode** for fast single-scattering estimates

pub mod beams;
pub mod cache;
pub mod composite;
pub mod config;
pub mod doubling;
pub mod error;
pub mod factors;
pub mod lattice_sum;
pub mod progress;
pub mod state;
pub mod tasks;
