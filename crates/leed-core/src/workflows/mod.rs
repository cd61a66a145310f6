//! # Workflows Module
//!
//! High-level entry points that run a complete LEED calculation.
//!
//! ## Overview
//!
//! A workflow ties the `core` models and the `engine` together: it prepares the
//! run-wide data once (beam list, output beams, angular-momentum coupling
//! table), evaluates every energy point, and merges the results into an
//! energy-ordered intensity table.
//!
//! ## Architecture
//!
//! - **IV Curves** ([`iv_curves`]) - Intensity-versus-energy curves of all
//!   output beams, parallel over energies.
//! - **R-factor** ([`rfactor`]) - Comparison of computed and measured curves
//!   over a scan of rigid energy shifts.
//!
//! ## Key Capabilities
//!
//! - **Deterministic merging** of concurrently computed energy points
//! - **Failure policies** to abort on, or skip, failing energy points
//! - **Progress monitoring** with phase and per-energy reporting

pub mod iv_curves;
pub mod rfactor;
