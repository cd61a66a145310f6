//! # Core Module
//!
//! This module provides the stateless foundation of the LEED engine: physical
//! constants, numerical building blocks, data models and file I/O.
//!
//! ## Overview
//!
//! Everything in `core` is free of per-energy state. The [`engine`](crate::engine)
//! layer combines these pieces into the multiple-scattering calculation; the
//! models built here are read-only once a run starts.
//!
//! ## Architecture
//!
//! - **Curve analysis** ([`analysis`]) - Lorentzian smoothing, spline resampling, mean square deviation
//! - **Units and tolerances** ([`constants`]) - Hartree atomic units, conversion factors, numerical tolerances
//! - **Dense complex matrices** ([`linalg`]) - Shape-checked multiply, LU inversion, partitioned block inversion
//! - **Special functions** ([`special`]) - Spherical Bessel/Hankel functions, spherical harmonics, Gaunt coefficients
//! - **Structural models** ([`models`]) - Atoms, layers, crystals, phase-shift tables, beams
//! - **File I/O** ([`io`]) - Phase-shift files, TOML structure documents, IV-curve tables
//!
//! ## Key Capabilities
//!
//! - **Complex-energy special functions** valid for damped (evanescent) waves
//! - **Immutable angular-momentum coupling table** shared across energy workers
//! - **Lossless layer assembly** from flat atom lists, including composite layers
//! - **Thermal vibration models** (isotropic, anisotropic, Debye)

pub mod analysis;
pub mod constants;
pub mod io;
pub mod linalg;
pub mod models;
pub mod special;
