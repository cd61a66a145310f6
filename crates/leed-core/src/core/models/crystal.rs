use super::layer::{Lattice2, Layer};
use super::phase_shift::PhaseShiftSet;
use nalgebra::{Matrix2, Vector3};

/// Complex optical potential of the crystal, in Hartree.
///
/// The real part is the inner potential (negative), the imaginary part the
/// absorptive damping (positive). Above [`VI_START`](crate::core::constants::VI_START)
/// the damping scales as `(E_r / VI_START)^exponent`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpticalPotential {
    pub real: f64,
    pub imaginary: f64,
    pub exponent: f64,
}

impl Default for OpticalPotential {
    fn default() -> Self {
        Self {
            real: 0.0,
            imaginary: 0.0,
            exponent: 0.0,
        }
    }
}

/// An ordered stack of layers, deepest first.
///
/// Two instances make up a surface: the bulk (1×1 lattice, periodic repeat
/// plus at most one terminal layer) and the overlayer (superstructure lattice,
/// non-periodic).
#[derive(Debug, Clone, PartialEq)]
pub struct Crystal {
    pub layers: Vec<Layer>,
    /// Lattice of the layers' 2-D unit cell.
    pub lattice: Lattice2,
    /// Integer matrix with rows `m1, m2` mapping the 1×1 lattice onto the
    /// superstructure lattice (`b_i = Σ_j m_ij a_j`).
    pub superstructure: Matrix2<f64>,
    pub potential: OpticalPotential,
    /// Smallest `z` spacing between adjacent layers, in Bohr.
    pub min_layer_distance: f64,
}

impl Crystal {
    pub fn num_atoms(&self) -> usize {
        self.layers.iter().map(|l| l.atoms.len()).sum()
    }

    pub fn periodic_layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter().filter(|l| l.periodic)
    }

    /// The non-periodic layer on top of the bulk repeat unit, if any.
    pub fn terminal_layer(&self) -> Option<&Layer> {
        self.layers.iter().find(|l| !l.periodic)
    }

    /// Bulk repeat vector: from the top of the last periodic layer back to the
    /// origin of the first one, one period deeper.
    pub fn repeat_vector(&self) -> Option<Vector3<f64>> {
        self.layers.first().map(|l| l.vec_from_last)
    }
}

/// The complete structural input of a run.
#[derive(Debug, Clone)]
pub struct SurfaceModel {
    pub bulk: Crystal,
    pub overlayer: Crystal,
    pub phase_shifts: PhaseShiftSet,
    /// The 1×1 (bulk) lattice.
    pub lattice: Lattice2,
    /// The superstructure lattice; equal to `lattice` for 1×1 surfaces.
    pub super_lattice: Lattice2,
}

impl SurfaceModel {
    /// Smallest interlayer distance over bulk and overlayer.
    pub fn min_layer_distance(&self) -> f64 {
        let over = if self.overlayer.layers.is_empty() {
            f64::INFINITY
        } else {
            self.overlayer.min_layer_distance
        };
        self.bulk.min_layer_distance.min(over)
    }

    /// Superstructure cell area relative to the 1×1 cell.
    pub fn relative_super_area(&self) -> f64 {
        self.super_lattice.area() / self.lattice.area()
    }
}
