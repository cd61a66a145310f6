//! Physical constants and numerical tolerances shared across the engine.
//!
//! Internally everything is expressed in Hartree atomic units: lengths in Bohr,
//! energies in Hartree, wavevectors in inverse Bohr.

/// One Hartree in electron volts.
pub const HARTREE_EV: f64 = 27.2113962;
/// One Bohr radius in Angstroms.
pub const BOHR_ANGSTROM: f64 = 0.529177249;

/// Sample temperature (K) assumed when none is given.
pub const DEFAULT_TEMPERATURE: f64 = 300.0;
/// Smallest z-gap (Bohr) between two atoms that still starts a new layer.
pub const MIN_LAYER_DISTANCE: f64 = 1.9;
/// Real energy (Hartree) above which the imaginary optical potential scales with energy.
pub const VI_START: f64 = 3.67493;
/// Height (Bohr) of the non-scattering potential step above the topmost layer.
pub const POTENTIAL_STEP_HEIGHT: f64 = 1.25 / BOHR_ANGSTROM;

/// Energy tolerance in Hartree (~0.027 eV).
pub const E_TOLERANCE: f64 = 1e-3;
/// Geometric tolerance in Bohr.
pub const GEO_TOLERANCE: f64 = 1e-3;
/// Coincidence tolerance for atoms sharing a sub-plane inside a composite layer.
pub const PLANE_TOLERANCE: f64 = 1e-4;
/// Sub-lattices closer than this in z are treated as exactly coplanar.
pub const COPLANAR_TOLERANCE: f64 = 1e-10;
/// Smallest intensity that is reported as non-zero.
pub const INT_TOLERANCE: f64 = 1e-10;
/// Tolerance for parallel wavevectors and beam indices.
pub const K_TOLERANCE: f64 = 1e-4;
/// Default convergence criterion for periodic layer doubling.
pub const LD_TOLERANCE: f64 = 1e-4;
/// Default cap on the number of periodic doublings (2^n periods).
pub const LD_MAX_DOUBLINGS: usize = 16;

/// Converts energies given in eV to Hartree.
#[inline]
pub fn ev_to_hartree(energy_ev: f64) -> f64 {
    energy_ev / HARTREE_EV
}

/// Converts energies given in Hartree to eV.
#[inline]
pub fn hartree_to_ev(energy: f64) -> f64 {
    energy * HARTREE_EV
}

/// Converts lengths given in Angstroms to Bohr.
#[inline]
pub fn angstrom_to_bohr(length: f64) -> f64 {
    length / BOHR_ANGSTROM
}
