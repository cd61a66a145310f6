use crate::core::constants::{BOHR_ANGSTROM, GEO_TOLERANCE};
use nalgebra::Vector3;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Prefactor of the Debye-model `<dr²>`, in Bohr² · amu · K.
pub const PREF_DEBWAL: f64 = 1559.04170632481439;

/// Structure of an atom's scattering matrix in angular-momentum space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TMatrixKind {
    /// Diagonal in `(l, m)`, one factor per `l` (isotropic vibrations).
    Diagonal,
    /// Full `(l, m) × (l', m')` matrix (anisotropic vibrations).
    NonDiagonal,
}

impl fmt::Display for TMatrixKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TMatrixKind::Diagonal => write!(f, "diagonal"),
            TMatrixKind::NonDiagonal => write!(f, "non-diagonal"),
        }
    }
}

/// Resolved thermal displacement of an atom type, in Bohr.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Displacement {
    /// `<dr²> = <dx²> + <dy²> + <dz²>` in Bohr².
    pub mean_square: f64,
    /// Per-axis RMS amplitudes `sqrt(<dx²>)`, `sqrt(<dy²>)`, `sqrt(<dz²>)`.
    pub sigma: Vector3<f64>,
}

impl Displacement {
    pub const STATIC: Displacement = Displacement {
        mean_square: 0.0,
        sigma: Vector3::new(0.0, 0.0, 0.0),
    };

    fn approx_eq(&self, other: &Displacement) -> bool {
        (self.mean_square - other.mean_square).abs() < GEO_TOLERANCE
            && (self.sigma - other.sigma).abs().max() < GEO_TOLERANCE
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum VibrationError {
    #[error("Debye temperature must be positive (got {0} K)")]
    DebyeTemperature(f64),
    #[error("Atomic mass must be positive (got {0} amu)")]
    Mass(f64),
    #[error("Sample temperature must not be negative (got {0} K)")]
    Temperature(f64),
}

/// Vibration model of an atom as given in the input (lengths in Å).
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Vibration {
    /// Static atom.
    #[default]
    None,
    /// Isotropic 3-D RMS amplitude.
    #[serde(rename = "dr1")]
    Isotropic { rms: f64 },
    /// Per-axis RMS amplitudes, averaged into a diagonal T-matrix.
    #[serde(rename = "dr3")]
    Axial { x: f64, y: f64, z: f64 },
    /// Per-axis RMS amplitudes with a full non-diagonal T-matrix.
    #[serde(rename = "nd3")]
    Anisotropic { x: f64, y: f64, z: f64 },
    /// Debye model: Debye temperature (K) and atomic mass (amu). The sample
    /// temperature defaults to the run temperature.
    #[serde(rename = "dmt")]
    Debye {
        debye_temperature: f64,
        mass: f64,
        #[serde(default)]
        temperature: Option<f64>,
    },
}

impl Vibration {
    /// Converts the input form into a displacement in Bohr and the T-matrix
    /// kind it implies.
    ///
    /// # Arguments
    ///
    /// * `temperature` - Sample temperature in K, used by the Debye model when
    ///   the vibration does not carry its own.
    ///
    /// # Errors
    ///
    /// Returns [`VibrationError`] for non-physical Debye parameters.
    pub fn resolve(&self, temperature: f64) -> Result<(Displacement, TMatrixKind), VibrationError> {
        let resolved = match *self {
            Vibration::None => (Displacement::STATIC, TMatrixKind::Diagonal),
            Vibration::Isotropic { rms } => {
                let rms = rms / BOHR_ANGSTROM;
                let axis = rms / 3.0_f64.sqrt();
                (
                    Displacement {
                        mean_square: rms * rms,
                        sigma: Vector3::new(axis, axis, axis),
                    },
                    TMatrixKind::Diagonal,
                )
            }
            Vibration::Axial { x, y, z } => (axial(x, y, z), TMatrixKind::Diagonal),
            Vibration::Anisotropic { x, y, z } => (axial(x, y, z), TMatrixKind::NonDiagonal),
            Vibration::Debye {
                debye_temperature,
                mass,
                temperature: own,
            } => {
                let dr2 = debye_mean_square_displacement(
                    debye_temperature,
                    mass,
                    own.unwrap_or(temperature),
                )?;
                let axis = dr2.sqrt() / 3.0_f64.sqrt();
                (
                    Displacement {
                        mean_square: dr2,
                        sigma: Vector3::new(axis, axis, axis),
                    },
                    TMatrixKind::Diagonal,
                )
            }
        };
        Ok(resolved)
    }
}

fn axial(x: f64, y: f64, z: f64) -> Displacement {
    let sigma = Vector3::new(x, y, z) / BOHR_ANGSTROM;
    Displacement {
        mean_square: sigma.norm_squared(),
        sigma,
    }
}

/// Mean-square displacement `<dr²>` (Bohr²) from the Debye model.
///
/// # Arguments
///
/// * `debye_temperature` - Debye temperature in K.
/// * `mass` - Atomic mass in amu.
/// * `temperature` - Sample temperature in K.
///
/// # Errors
///
/// Returns [`VibrationError`] if the Debye temperature or mass is not positive
/// or the temperature is negative.
pub fn debye_mean_square_displacement(
    debye_temperature: f64,
    mass: f64,
    temperature: f64,
) -> Result<f64, VibrationError> {
    if debye_temperature <= 0.0 {
        return Err(VibrationError::DebyeTemperature(debye_temperature));
    }
    if mass <= 0.0 {
        return Err(VibrationError::Mass(mass));
    }
    if temperature < 0.0 {
        return Err(VibrationError::Temperature(temperature));
    }

    let ratio = temperature / debye_temperature;
    let shape = if ratio < 0.125 {
        0.25 + 1.642 * ratio * ratio
    } else if ratio > 8.0 {
        ratio
    } else {
        (0.0625 + ratio * ratio).sqrt()
    };
    Ok(0.5 * PREF_DEBWAL / (mass * debye_temperature) * shape)
}

/// Tabulated phase shifts of one scattering potential, energies in Hartree.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseShiftData {
    pub energies: Vec<f64>,
    /// `shifts[i][l]` is `δ_l` at `energies[i]`.
    pub shifts: Vec<Vec<f64>>,
    pub l_max: usize,
}

impl PhaseShiftData {
    /// Linearly interpolated phase shifts at `energy`.
    ///
    /// Energies outside the table clamp to the nearest tabulated point; the
    /// second return value reports whether clamping happened.
    pub fn interpolate(&self, energy: f64) -> (Vec<f64>, bool) {
        let n = self.energies.len();
        if n == 0 {
            return (vec![0.0; self.l_max + 1], true);
        }
        if energy <= self.energies[0] {
            return (self.shifts[0].clone(), energy < self.energies[0]);
        }
        if energy >= self.energies[n - 1] {
            return (self.shifts[n - 1].clone(), energy > self.energies[n - 1]);
        }

        let upper = self.energies.partition_point(|&e| e < energy);
        let lower = upper - 1;
        let (e0, e1) = (self.energies[lower], self.energies[upper]);
        let w = (energy - e0) / (e1 - e0);
        let shifts = self.shifts[lower]
            .iter()
            .zip(self.shifts[upper].iter())
            .map(|(a, b)| a + w * (b - a))
            .collect();
        (shifts, false)
    }
}

/// A phase-shift table bound to one vibration model and T-matrix kind.
#[derive(Debug, Clone)]
pub struct PhaseShiftTable {
    /// Label of the source (usually the file name).
    pub source: String,
    pub data: Arc<PhaseShiftData>,
    pub displacement: Displacement,
    pub kind: TMatrixKind,
}

impl PhaseShiftTable {
    #[inline]
    pub fn l_max(&self) -> usize {
        self.data.l_max
    }

    /// Phase shifts at `energy` (Hartree), warning when the energy lies outside
    /// the tabulated range.
    pub fn phase_shifts_at(&self, energy: f64) -> Vec<f64> {
        let (shifts, clamped) = self.data.interpolate(energy);
        if clamped {
            warn!(
                source = %self.source,
                energy_ev = energy * crate::core::constants::HARTREE_EV,
                "Energy outside the tabulated phase-shift range; using the nearest edge."
            );
        }
        shifts
    }
}

/// All scattering types of a run. Types are identified by their position.
#[derive(Debug, Clone, Default)]
pub struct PhaseShiftSet {
    tables: Vec<PhaseShiftTable>,
}

impl PhaseShiftSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table, returning the index of an existing entry when one
    /// with the same source, displacement and kind is already present.
    pub fn register(
        &mut self,
        source: &str,
        data: Arc<PhaseShiftData>,
        displacement: Displacement,
        kind: TMatrixKind,
    ) -> usize {
        if let Some(index) = self.tables.iter().position(|t| {
            t.source == source && t.kind == kind && t.displacement.approx_eq(&displacement)
        }) {
            return index;
        }
        self.tables.push(PhaseShiftTable {
            source: source.to_string(),
            data,
            displacement,
            kind,
        });
        self.tables.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&PhaseShiftTable> {
        self.tables.get(index)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhaseShiftTable> {
        self.tables.iter()
    }

    /// Highest angular momentum available from any table.
    pub fn max_l(&self) -> usize {
        self.tables.iter().map(|t| t.l_max()).max().unwrap_or(0)
    }

    pub fn has_non_diagonal(&self) -> bool {
        self.tables.iter().any(|t| t.kind == TMatrixKind::NonDiagonal)
    }
}
