use super::config::{EngineConfig, Incidence, ScatteringOrder};
use super::error::EngineError;
use super::factors::{TypeFactors, type_factors};
use crate::core::constants::{HARTREE_EV, VI_START};
use crate::core::models::crystal::OpticalPotential;
use crate::core::models::phase_shift::PhaseShiftSet;
use crate::core::special::CouplingTable;
use nalgebra::Vector2;
use num_complex::Complex64;
use tracing::trace;

/// Everything that depends on the incident energy, computed once per energy
/// point and then only read.
#[derive(Debug, Clone)]
pub struct ScatteringState {
    /// Vacuum kinetic energy `E_v` (Hartree).
    pub energy: f64,
    /// Real energy inside the crystal, `E_v − V_r`.
    pub energy_r: f64,
    /// Damping, the imaginary part of the complex energy.
    pub energy_i: f64,
    /// Complex wavenumber `sqrt(2(E_r + iE_i))`.
    pub k: Complex64,
    /// Parallel wavevector of the incident beam.
    pub k_in: Vector2<f64>,
    pub l_max: usize,
    pub epsilon: f64,
    pub order: ScatteringOrder,
    /// Scattering factors indexed by scattering type.
    pub factors: Vec<TypeFactors>,
}

impl ScatteringState {
    /// Builds the state for vacuum energy `energy` (Hartree).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NonPositiveEnergy`] when the energy does not
    /// exceed the inner potential.
    pub fn update(
        potential: &OpticalPotential,
        config: &EngineConfig,
        phase_shifts: &PhaseShiftSet,
        coupling: &CouplingTable,
        energy: f64,
    ) -> Result<Self, EngineError> {
        let energy_r = energy - potential.real;
        if energy_r <= 0.0 {
            return Err(EngineError::NonPositiveEnergy {
                energy_ev: energy * HARTREE_EV,
            });
        }
        let energy_i = damping(potential, energy_r);
        let k = (Complex64::new(energy_r, energy_i) * 2.0).sqrt();
        let k_in = incident_k_par(energy, &config.incidence);

        let factors = phase_shifts
            .iter()
            .map(|table| type_factors(table, energy_r, config.l_max, coupling))
            .collect::<Result<Vec<_>, _>>()?;

        trace!(
            energy_ev = energy * HARTREE_EV,
            energy_r,
            energy_i,
            k_re = k.re,
            k_im = k.im,
            "Updated scattering state."
        );

        Ok(Self {
            energy,
            energy_r,
            energy_i,
            k,
            k_in,
            l_max: config.l_max,
            epsilon: config.epsilon,
            order: config.order,
            factors,
        })
    }

    /// Complex energy `E_r + iE_i`.
    #[inline]
    pub fn complex_energy(&self) -> Complex64 {
        Complex64::new(self.energy_r, self.energy_i)
    }

    /// Perpendicular wavevector inside the crystal for parallel wavevector
    /// `k_par`, principal root (`Im ≥ 0`).
    pub fn k_z(&self, k_par: &Vector2<f64>) -> Complex64 {
        (self.complex_energy() * 2.0 - k_par.norm_squared()).sqrt()
    }

    /// Perpendicular wavevector in vacuum, `None` for evanescent beams.
    pub fn vacuum_k_z(&self, k_par: &Vector2<f64>) -> Option<f64> {
        let kz2 = 2.0 * self.energy - k_par.norm_squared();
        (kz2 > 0.0).then(|| kz2.sqrt())
    }

    pub fn type_factors(&self, type_index: usize) -> Result<&TypeFactors, EngineError> {
        self.factors
            .get(type_index)
            .ok_or(EngineError::MissingScatteringType(type_index))
    }
}

/// Imaginary optical potential at real energy `energy_r`.
pub fn damping(potential: &OpticalPotential, energy_r: f64) -> f64 {
    if energy_r < VI_START || potential.exponent == 0.0 {
        potential.imaginary
    } else {
        potential.imaginary * (energy_r / VI_START).powf(potential.exponent)
    }
}

/// Parallel wavevector of the incident beam at vacuum energy `energy`.
pub fn incident_k_par(energy: f64, incidence: &Incidence) -> Vector2<f64> {
    let magnitude = incidence.polar.sin() * (2.0 * energy).sqrt();
    Vector2::new(
        magnitude * incidence.azimuth.cos(),
        magnitude * incidence.azimuth.sin(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::{EnergyRange, EngineConfigBuilder};

    const TOLERANCE: f64 = 1e-12;

    fn potential() -> OpticalPotential {
        OpticalPotential {
            real: -0.5,
            imaginary: 0.1,
            exponent: 0.5,
        }
    }

    fn config(polar: f64, azimuth: f64) -> EngineConfig {
        EngineConfigBuilder::new()
            .energies(EnergyRange { start: 2.0, end: 4.0, step: 1.0 })
            .incidence(Incidence { polar, azimuth })
            .l_max(3)
            .build()
            .unwrap()
    }

    #[test]
    fn update_computes_complex_energy_and_wavevectors() {
        let coupling = CouplingTable::new(3);
        let state = ScatteringState::update(
            &potential(),
            &config(0.3, 0.2),
            &PhaseShiftSet::new(),
            &coupling,
            2.0,
        )
        .unwrap();

        assert!((state.energy_r - 2.5).abs() < TOLERANCE);
        assert!((state.energy_i - 0.1).abs() < TOLERANCE);
        assert!((state.k * state.k - Complex64::new(5.0, 0.2)).norm() < TOLERANCE);
        assert!((state.k_in.norm() - 0.3f64.sin() * 2.0).abs() < TOLERANCE);
        assert!((state.k_in.y / state.k_in.x - 0.2f64.tan()).abs() < TOLERANCE);
        assert!(state.factors.is_empty());
    }

    #[test]
    fn damping_scales_above_threshold() {
        let p = potential();
        assert_eq!(damping(&p, 1.0), 0.1);
        let e = 4.0 * VI_START;
        assert!((damping(&p, e) - 0.2).abs() < TOLERANCE);
    }

    #[test]
    fn energy_below_inner_potential_is_rejected() {
        let coupling = CouplingTable::new(3);
        let p = OpticalPotential { real: 1.0, ..potential() };
        let result =
            ScatteringState::update(&p, &config(0.0, 0.0), &PhaseShiftSet::new(), &coupling, 0.5);
        assert!(matches!(result, Err(EngineError::NonPositiveEnergy { .. })));
    }

    #[test]
    fn k_z_is_damped_and_vacuum_k_z_detects_evanescence() {
        let coupling = CouplingTable::new(3);
        let state = ScatteringState::update(
            &potential(),
            &config(0.0, 0.0),
            &PhaseShiftSet::new(),
            &coupling,
            2.0,
        )
        .unwrap();

        let kz = state.k_z(&Vector2::new(3.0, 0.0));
        assert!(kz.im > 0.0);
        assert!((kz * kz - Complex64::new(5.0 - 9.0, 0.2)).norm() < TOLERANCE);

        let vacuum = state.vacuum_k_z(&Vector2::new(1.0, 0.0)).unwrap();
        assert!((vacuum - 3.0f64.sqrt()).abs() < TOLERANCE);
        assert!(state.vacuum_k_z(&Vector2::new(2.5, 0.0)).is_none());
    }
}
