use nalgebra::Vector3;

/// A scattering atom inside a layer.
///
/// Positions are Cartesian in Bohr, with `z` pointing from the bulk toward the
/// vacuum. An atom's position is relative to the origin of the layer that owns
/// it once the layer has been assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Index of the owning layer within its crystal.
    pub layer: usize,
    /// Index into the run's phase-shift set (one entry per distinct
    /// phase-shift file, vibration and T-matrix kind).
    pub scattering_type: usize,
    /// Cartesian position in Bohr.
    pub position: Vector3<f64>,
    /// Mean-square vibrational displacement `<dr²>` in Bohr², the Debye-Waller
    /// parameter of the atom.
    pub mean_square_displacement: f64,
}

impl Atom {
    /// Creates a new atom not yet assigned to a layer.
    ///
    /// # Arguments
    ///
    /// * `scattering_type` - Index of the atom's phase-shift entry.
    /// * `position` - Cartesian position in Bohr.
    pub fn new(scattering_type: usize, position: Vector3<f64>) -> Self {
        Self {
            layer: 0,
            scattering_type,
            position,
            mean_square_displacement: 0.0,
        }
    }

    pub fn with_displacement(mut self, mean_square_displacement: f64) -> Self {
        self.mean_square_displacement = mean_square_displacement;
        self
    }
}
