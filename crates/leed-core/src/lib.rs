//! # LEED++ Core Library
//!
//! A dynamical low-energy electron diffraction (LEED) engine computing
//! intensity-versus-energy curves of surface structures with full multiple
//! scattering, composite layers and layer doubling.
//!
//! ## Architectural Philosophy
//!
//! The library is designed with a strict three-layer architecture to ensure a clear separation of concerns,
//! making it modular, testable, and extensible.
//!
//! - **[`core`]: The Foundation.** Contains stateless data models (`SurfaceModel`, `Layer`),
//!   dense complex linear algebra, special functions, the angular-momentum coupling table
//!   and I/O utilities.
//!
//! - **[`engine`]: The Logic Core.** Everything that depends on the energy: the scattering
//!   state, beam selection, lattice sums, composite-layer scattering, layer doubling and the
//!   per-energy task that combines them.
//!
//! - **[`workflows`]: The Public API.** This is the highest-level, user-facing layer. It ties the
//!   `engine` and `core` together to compute complete sets of IV curves, and is the entry
//!   point for front-ends such as the `leed` command-line tool.

pub mod core;
pub mod engine;
pub mod workflows;
