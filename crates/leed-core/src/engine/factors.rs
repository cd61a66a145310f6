//! Atomic scattering factors with thermal-vibration corrections.
//!
//! Phase shifts are interpolated at the real energy inside the crystal and
//! turned into `t_l = sin δ_l · e^{iδ_l}`. Vibrating atoms are corrected in one
//! of two ways:
//!
//! - **Diagonal** types use the closed-form isotropic Debye-Waller
//!   renormalisation, which keeps `t` diagonal but mixes angular momenta.
//! - **Non-diagonal** types average `J(−u) · t · J(u)` over an anisotropic
//!   Gaussian displacement `u` with a 5-point Gauss-Hermite product rule,
//!   where `J` translates regular spherical waves.

use crate::core::linalg::{ComplexMatrix, ElementKind, MatrixError};
use crate::core::models::phase_shift::{PhaseShiftTable, TMatrixKind};
use crate::core::special::{
    CouplingTable, gaunt, harmonics_of_vector, lm_count, lm_from_index,
    modified_spherical_bessel_i, spherical_bessel_j,
};
use nalgebra::Vector3;
use num_complex::Complex64;
use std::f64::consts::PI;

const HERMITE_NODES: [f64; 5] = [
    -2.020182870456086,
    -0.958572464613819,
    0.0,
    0.958572464613819,
    2.020182870456086,
];
const HERMITE_WEIGHTS: [f64; 5] = [
    0.019953242059046,
    0.393619323152241,
    0.945308720482942,
    0.393619323152241,
    0.019953242059046,
];

/// Scattering factors of one atom type at one energy.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeFactors {
    /// `t_l` for `l = 0..=l_max`; the matrix is `diag(t_l)` repeated over `m`.
    Diagonal(Vec<Complex64>),
    /// Full `(l_max + 1)² × (l_max + 1)²` matrix.
    NonDiagonal(ComplexMatrix),
}

impl TypeFactors {
    pub fn kind(&self) -> TMatrixKind {
        match self {
            TypeFactors::Diagonal(_) => TMatrixKind::Diagonal,
            TypeFactors::NonDiagonal(_) => TMatrixKind::NonDiagonal,
        }
    }

    /// Expands the factors into a square matrix over `(l, m)` with `l <= l_max`.
    pub fn to_matrix(&self, l_max: usize) -> ComplexMatrix {
        let n = lm_count(l_max);
        match self {
            TypeFactors::Diagonal(t) => {
                let diagonal: Vec<Complex64> = (0..n)
                    .map(|i| {
                        let (l, _) = lm_from_index(i);
                        t.get(l).copied().unwrap_or_default()
                    })
                    .collect();
                ComplexMatrix::diagonal(&diagonal)
            }
            TypeFactors::NonDiagonal(m) => ComplexMatrix::from_fn(n, n, |i, j| {
                if i < m.rows() && j < m.cols() {
                    m[(i, j)]
                } else {
                    Complex64::new(0.0, 0.0)
                }
            }),
        }
    }
}

/// `t_l = sin δ_l · e^{iδ_l}`.
pub fn atomic_t(phase_shifts: &[f64]) -> Vec<Complex64> {
    phase_shifts
        .iter()
        .map(|&delta| Complex64::from_polar(delta.sin(), delta))
        .collect()
}

/// Computes the scattering factors of `table` at real energy `energy_r`
/// (Hartree), up to `l_max`.
pub fn type_factors(
    table: &PhaseShiftTable,
    energy_r: f64,
    l_max: usize,
    coupling: &CouplingTable,
) -> Result<TypeFactors, MatrixError> {
    let mut t = atomic_t(&table.phase_shifts_at(energy_r));
    t.resize(l_max + 1, Complex64::new(0.0, 0.0));
    let k = (2.0 * energy_r).sqrt();

    Ok(match table.kind {
        TMatrixKind::Diagonal if table.displacement.mean_square > 0.0 => TypeFactors::Diagonal(
            diagonal_thermal(&t, table.displacement.mean_square, k, l_max),
        ),
        TMatrixKind::Diagonal => TypeFactors::Diagonal(t),
        TMatrixKind::NonDiagonal => TypeFactors::NonDiagonal(non_diagonal_thermal(
            &t,
            &table.displacement.sigma,
            k,
            l_max,
            coupling,
        )?),
    })
}

/// Isotropic Debye-Waller renormalisation of diagonal factors.
///
/// `t_l(T) = Σ_{l', l''} e^{−x} i_{l''}(x) sqrt(4π(2l'+1)(2l''+1)/(2l+1)) t_{l'}
/// ∫ Y_{l0} Y_{l'0} Y_{l''0}` with `x = <dr²> k² / 3`.
pub fn diagonal_thermal(t: &[Complex64], mean_square: f64, k: f64, l_max: usize) -> Vec<Complex64> {
    let x = mean_square * k * k / 3.0;
    let bessel = modified_spherical_bessel_i(2 * l_max, x);
    let damping = (-x).exp();
    let l_in = t.len().saturating_sub(1).min(l_max);

    (0..=l_max)
        .map(|l| {
            let mut sum = Complex64::new(0.0, 0.0);
            for (lp, &t_lp) in t.iter().enumerate().take(l_in + 1) {
                let l_low = (l as i32 - lp as i32).unsigned_abs() as usize;
                for lpp in (l_low..=(l + lp)).step_by(2) {
                    let g = gaunt(l as i32, 0, lp as i32, 0, lpp as i32, 0);
                    if g == 0.0 {
                        continue;
                    }
                    let weight = (4.0 * PI * ((2 * lp + 1) * (2 * lpp + 1)) as f64
                        / (2 * l + 1) as f64)
                        .sqrt();
                    sum += t_lp * (damping * bessel[lpp] * weight * g);
                }
            }
            sum
        })
        .collect()
}

/// Gaussian average `⟨J(−u) diag(t) J(u)⟩` over displacements with per-axis
/// RMS widths `sigma`.
pub fn non_diagonal_thermal(
    t: &[Complex64],
    sigma: &Vector3<f64>,
    k: f64,
    l_max: usize,
    coupling: &CouplingTable,
) -> Result<ComplexMatrix, MatrixError> {
    let n = lm_count(l_max);
    let diagonal = TypeFactors::Diagonal(t.to_vec()).to_matrix(l_max);
    let norm = 1.0 / PI.sqrt();

    let axis_rule = |s: f64| -> Vec<(f64, f64)> {
        if s.abs() < 1e-12 {
            vec![(0.0, 1.0)]
        } else {
            HERMITE_NODES
                .iter()
                .zip(HERMITE_WEIGHTS.iter())
                .map(|(&x, &w)| (2.0_f64.sqrt() * s * x, w * norm))
                .collect()
        }
    };
    let (rx, ry, rz) = (axis_rule(sigma.x), axis_rule(sigma.y), axis_rule(sigma.z));

    let mut average = ComplexMatrix::zeros(n, n, ElementKind::Complex);
    for &(ux, wx) in &rx {
        for &(uy, wy) in &ry {
            for &(uz, wz) in &rz {
                let u = Vector3::new(ux, uy, uz);
                let forward = translation_matrix(k, &u, l_max, coupling);
                let backward = translation_matrix(k, &(-u), l_max, coupling);
                let weight = Complex64::new(wx * wy * wz, 0.0);
                let term = backward.multiply(&diagonal)?.multiply(&forward)?;
                average = average.add(&term.scale(weight))?;
            }
        }
    }
    Ok(average)
}

/// Regular-wave translation matrix
/// `J_{L'L}(u) = 4π Σ_{L''} i^{l'−l+l''} C(L, L', L'') j_{l''}(k|u|) Y_{L''}(û)`.
pub fn translation_matrix(
    k: f64,
    u: &Vector3<f64>,
    l_max: usize,
    coupling: &CouplingTable,
) -> ComplexMatrix {
    let n = lm_count(l_max);
    let bessel = spherical_bessel_j(2 * l_max, k * u.norm());
    let ylm = harmonics_of_vector(2 * l_max, u);
    let i_pow = [
        Complex64::new(1.0, 0.0),
        Complex64::new(0.0, 1.0),
        Complex64::new(-1.0, 0.0),
        Complex64::new(0.0, -1.0),
    ];

    ComplexMatrix::from_fn(n, n, |row, col| {
        let (lp, _) = lm_from_index(row);
        let (l, _) = lm_from_index(col);
        let mut sum = Complex64::new(0.0, 0.0);
        for &(lpp_index, c) in coupling.coefficients(col, row) {
            let (lpp, _) = lm_from_index(lpp_index);
            let power = (lp as i64 - l as i64 + lpp as i64).rem_euclid(4) as usize;
            sum += i_pow[power] * ylm[lpp_index] * (c * bessel[lpp]);
        }
        sum * (4.0 * PI)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::phase_shift::{Displacement, PhaseShiftData};
    use std::sync::Arc;

    const TOLERANCE: f64 = 1e-10;

    fn t_values() -> Vec<Complex64> {
        atomic_t(&[0.9, 0.5, 0.2, 0.05])
    }

    #[test]
    fn atomic_t_is_unitary_limited() {
        for t in atomic_t(&[0.3, 1.2, -0.7]) {
            // |t - i/2| = 1/2 for real phase shifts.
            assert!(((t - Complex64::new(0.0, 0.5)).norm() - 0.5).abs() < TOLERANCE);
        }
    }

    #[test]
    fn diagonal_thermal_without_vibration_is_identity() {
        let t = t_values();
        let out = diagonal_thermal(&t, 0.0, 3.0, 3);
        for (a, b) in out.iter().zip(t.iter()) {
            assert!((a - b).norm() < TOLERANCE);
        }
    }

    #[test]
    fn diagonal_thermal_damps_s_wave() {
        let t = t_values();
        let out = diagonal_thermal(&t, 0.05, 3.0, 3);
        assert!(out[0].norm() < t[0].norm());
    }

    #[test]
    fn translation_by_zero_is_identity() {
        let coupling = CouplingTable::new(3);
        let j = translation_matrix(2.0, &Vector3::zeros(), 3, &coupling);
        let identity = ComplexMatrix::identity(lm_count(3));
        assert!(j.max_abs_diff(&identity).unwrap() < TOLERANCE);
    }

    #[test]
    fn static_non_diagonal_factors_are_diagonal_t() {
        let coupling = CouplingTable::new(3);
        let t = t_values();
        let out = non_diagonal_thermal(&t, &Vector3::zeros(), 2.0, 3, &coupling).unwrap();
        let expected = TypeFactors::Diagonal(t).to_matrix(3);
        assert!(out.max_abs_diff(&expected).unwrap() < TOLERANCE);
    }

    #[test]
    fn isotropic_average_matches_closed_form_for_s_wave() {
        let l_max = 3;
        let coupling = CouplingTable::new(l_max);
        let t = t_values();
        let (k, s) = (2.0, 0.15);
        let averaged =
            non_diagonal_thermal(&t, &Vector3::new(s, s, s), k, l_max, &coupling).unwrap();
        let closed = diagonal_thermal(&t, 3.0 * s * s, k, l_max);
        let relative = (averaged[(0, 0)] - closed[0]).norm() / closed[0].norm();
        assert!(relative < 1e-3, "relative deviation {relative}");
    }

    #[test]
    fn type_factors_follow_table_kind() {
        let coupling = CouplingTable::new(2);
        let data = Arc::new(PhaseShiftData {
            energies: vec![1.0, 3.0],
            shifts: vec![vec![0.5, 0.2], vec![0.7, 0.4]],
            l_max: 1,
        });
        let diagonal = PhaseShiftTable {
            source: "A".into(),
            data: data.clone(),
            displacement: Displacement::STATIC,
            kind: TMatrixKind::Diagonal,
        };
        let factors = type_factors(&diagonal, 2.0, 2, &coupling).unwrap();
        match &factors {
            TypeFactors::Diagonal(t) => {
                assert_eq!(t.len(), 3);
                assert!((t[0] - Complex64::from_polar(0.6f64.sin(), 0.6)).norm() < TOLERANCE);
                assert_eq!(t[2], Complex64::new(0.0, 0.0));
            }
            other => panic!("unexpected factors {other:?}"),
        }

        let non_diagonal = PhaseShiftTable {
            kind: TMatrixKind::NonDiagonal,
            ..diagonal
        };
        let factors = type_factors(&non_diagonal, 2.0, 2, &coupling).unwrap();
        assert_eq!(factors.kind(), TMatrixKind::NonDiagonal);
        assert_eq!(factors.to_matrix(2).shape(), (9, 9));
    }
}
