//! Dense complex linear algebra for scattering matrices.
//!
//! [`matrix::ComplexMatrix`] wraps an `nalgebra` dense matrix and records its
//! numeric (real/complex) and structural (general/square/diagonal) kind.
//! [`block`] adds the partitioned inversion used for composite layers.

pub mod block;
pub mod matrix;

pub use block::invert_partitioned;
pub use matrix::{ComplexMatrix, ElementKind, MatrixError, Structure};
