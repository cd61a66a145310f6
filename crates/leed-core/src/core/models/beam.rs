use nalgebra::Vector2;
use num_complex::Complex64;

/// A diffraction channel: one reciprocal-lattice vector of the
/// superstructure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Beam {
    /// Indices in units of the 1×1 reciprocal lattice (fractional for
    /// superstructure beams).
    pub ind_1: f64,
    pub ind_2: f64,
    /// Integer indices in the superstructure reciprocal lattice.
    pub super_1: i32,
    pub super_2: i32,
    /// Reciprocal-lattice vector in 1/Bohr.
    pub g: Vector2<f64>,
    /// Symmetry set: beams of one set differ by a 1×1 reciprocal vector and
    /// couple through the bulk; set 0 holds the integer-order beams.
    pub set: usize,
}

impl Beam {
    /// `true` if the indices match within `tolerance`.
    pub fn matches(&self, ind_1: f64, ind_2: f64, tolerance: f64) -> bool {
        (self.ind_1 - ind_1).abs() < tolerance && (self.ind_2 - ind_2).abs() < tolerance
    }

    /// Human-readable label such as `(1,-1/2)`.
    pub fn label(&self) -> String {
        format!("({},{})", format_index(self.ind_1), format_index(self.ind_2))
    }
}

fn format_index(value: f64) -> String {
    let rounded = value.round();
    if (value - rounded).abs() < 1e-6 {
        return format!("{}", rounded as i64);
    }
    for denominator in 2..=12 {
        let numerator = value * denominator as f64;
        if (numerator - numerator.round()).abs() < 1e-6 {
            return format!("{}/{}", numerator.round() as i64, denominator);
        }
    }
    format!("{value:.4}")
}

/// The energy-independent beam list, ordered by set, then `|g|`, then indices.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BeamList {
    pub beams: Vec<Beam>,
    pub num_sets: usize,
}

impl BeamList {
    pub fn len(&self) -> usize {
        self.beams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beams.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Beam> {
        self.beams.iter()
    }

    /// Position of the beam with the given indices.
    pub fn find(&self, ind_1: f64, ind_2: f64, tolerance: f64) -> Option<usize> {
        self.beams
            .iter()
            .position(|b| b.matches(ind_1, ind_2, tolerance))
    }
}

/// A beam that takes part in the scattering at one energy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveBeam {
    pub beam: Beam,
    /// Parallel wavevector `k_par + g` in 1/Bohr.
    pub k_par: Vector2<f64>,
    /// Perpendicular wavevector inside the crystal, `sqrt(2E − |k_par + g|²)`
    /// with the complex energy; `Im ≥ 0`.
    pub k_z: Complex64,
}

/// The beams active at one energy, grouped contiguously by set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActiveBeams {
    pub beams: Vec<ActiveBeam>,
    /// `set_offsets[s]..set_offsets[s + 1]` is the range of set `s`.
    pub set_offsets: Vec<usize>,
}

impl ActiveBeams {
    pub fn len(&self) -> usize {
        self.beams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beams.is_empty()
    }

    pub fn num_sets(&self) -> usize {
        self.set_offsets.len().saturating_sub(1)
    }

    /// Beams of set `set`, in order.
    pub fn set(&self, set: usize) -> &[ActiveBeam] {
        match (self.set_offsets.get(set), self.set_offsets.get(set + 1)) {
            (Some(&start), Some(&end)) => &self.beams[start..end],
            _ => &[],
        }
    }

    pub fn set_offset(&self, set: usize) -> usize {
        self.set_offsets.get(set).copied().unwrap_or(self.beams.len())
    }
}
