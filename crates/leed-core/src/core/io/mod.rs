//! Provides input/output functionality for the crate's file formats.
//!
//! Phase-shift tables and intensity-versus-energy curves share the
//! [`traits::TableFile`] interface; the TOML structure document is turned into a
//! [`SurfaceModel`](crate::core::models::crystal::SurfaceModel) by
//! [`structure::StructureDocument::load_surface`], which also reads the
//! referenced phase-shift files.

pub mod intensities;
pub mod phase_file;
pub mod structure;
pub mod traits;
