//! Per-energy computational tasks.
//!
//! A task takes the read-only run inputs (surface model, beam lists, coupling
//! table, configuration) and produces the result for a single energy point.
//! Tasks own no state between energies, so the workflow layer is free to run
//! them in parallel.

pub mod energy;
