//! # Core Models Module
//!
//! Data structures describing the scattering geometry of a surface and the
//! scattering properties of its atoms.
//!
//! ## Overview
//!
//! A run is described by a [`crystal::SurfaceModel`]: the bulk and overlayer
//! [`crystal::Crystal`]s, each an ordered stack of [`layer::Layer`]s (deepest
//! first), plus the [`phase_shift::PhaseShiftSet`] holding one tabulated
//! scattering potential per atom type. These models are assembled once from flat
//! atom lists by [`builder::LayerBuilder`] and are read-only during the energy
//! loop.
//!
//! ## Key Components
//!
//! - [`atom`] - Scattering atom with position, type index and Debye-Waller parameter
//! - [`layer`] - 2-D lattices and layers with their interlayer vectors
//! - [`crystal`] - Bulk/overlayer stacks, optical potential, surface model
//! - [`phase_shift`] - Phase-shift tables, vibration models, T-matrix kinds
//! - [`beam`] - Diffraction beams and the per-energy active beam view
//! - [`builder`] - Layer assembly from raw atom lists
//!
//! ## Usage
//!
//! ```ignore
//! use leedpp::core::models::{atom::Atom, builder::LayerBuilder};
//!
//! let mut builder = LayerBuilder::new(a1, a2, a3);
//! builder.add_bulk_atom(Atom::new(0, Vector3::zeros()));
//! let model = builder.build(phase_shifts)?;
//! ```

pub mod atom;
pub mod beam;
pub mod builder;
pub mod crystal;
pub mod layer;
pub mod phase_shift;
