//! Lattice sums and the propagators built from them.
//!
//! A propagator `G_{L'L}` carries outgoing waves `L` emitted by every site of
//! one sub-lattice (with Bloch phases `e^{ik·R}`) to regular waves `L'`
//! around a site of another (or the same) sub-lattice. Rows are the receiver
//! index, columns the source index.

use super::error::EngineError;
use crate::core::constants::COPLANAR_TOLERANCE;
use crate::core::linalg::ComplexMatrix;
use crate::core::models::layer::Lattice2;
use crate::core::special::{CouplingTable, hankel1, lm_count, lm_from_index, spherical_harmonics};
use nalgebra::{Vector2, Vector3};
use num_complex::Complex64;
use std::f64::consts::PI;

const I_POWERS: [Complex64; 4] = [
    Complex64::new(1.0, 0.0),
    Complex64::new(0.0, 1.0),
    Complex64::new(-1.0, 0.0),
    Complex64::new(0.0, -1.0),
];

/// Radius of the lattice-sum disc for accuracy `tolerance`.
///
/// Below one, `tolerance` is a relative accuracy and the radius follows from
/// the damping, `−ln(tolerance) / Im k`. Otherwise it is the radius itself.
pub fn summation_radius(k: Complex64, tolerance: f64) -> Result<f64, EngineError> {
    if tolerance >= 1.0 {
        return Ok(tolerance);
    }
    if k.im <= 0.0 {
        return Err(EngineError::NonConvergentDamping { imag_k: k.im });
    }
    Ok(-tolerance.ln() / k.im)
}

/// Lattice points `R` with `|R| <= radius`, excluding the origin, one of
/// each `±R` pair.
fn half_lattice(lattice: &Lattice2, radius: f64) -> Vec<Vector2<f64>> {
    let (b1, b2) = lattice.reciprocal();
    let n1_max = (radius * b1.norm() / (2.0 * PI)).ceil() as i32;
    let n2_max = (radius * b2.norm() / (2.0 * PI)).ceil() as i32;
    let mut points = Vec::new();
    for n1 in 0..=n1_max {
        for n2 in -n2_max..=n2_max {
            if n1 == 0 && n2 <= 0 {
                continue;
            }
            let r = lattice.point(n1, n2);
            if r.norm() <= radius {
                points.push(r);
            }
        }
    }
    points
}

/// Lattice points `R` with `|d − R| <= radius` for the full lattice.
fn shifted_lattice(lattice: &Lattice2, d: &Vector2<f64>, radius: f64) -> Vec<Vector2<f64>> {
    let (b1, b2) = lattice.reciprocal();
    let centre = lattice.fractional(d);
    let span1 = (radius * b1.norm() / (2.0 * PI)).ceil() as i32 + 1;
    let span2 = (radius * b2.norm() / (2.0 * PI)).ceil() as i32 + 1;
    let (c1, c2) = (centre.x.round() as i32, centre.y.round() as i32);
    let mut points = Vec::new();
    for n1 in (c1 - span1)..=(c1 + span1) {
        for n2 in (c2 - span2)..=(c2 + span2) {
            let r = lattice.point(n1, n2);
            if (d - r).norm() <= radius {
                points.push(r);
            }
        }
    }
    points
}

/// Single-plane lattice sum
/// `D_L = Σ_{R≠0} h_l(k|R|) Y_L(−R̂) e^{ik_par·R}` for all `l <= l_max`.
///
/// Sites are summed in `±R` pairs; only `l + m` even survives in a plane.
///
/// # Errors
///
/// [`EngineError::NonConvergentDamping`] if the sum is radius-limited by
/// damping and `Im k <= 0`.
pub fn plane_sum(
    k: Complex64,
    k_par: &Vector2<f64>,
    lattice: &Lattice2,
    l_max: usize,
    tolerance: f64,
) -> Result<Vec<Complex64>, EngineError> {
    let radius = summation_radius(k, tolerance)?;
    let in_plane = spherical_harmonics(
        l_max,
        Complex64::new(0.0, 0.0),
        Complex64::new(1.0, 0.0),
        0.0,
    );
    let mut sums = vec![Complex64::new(0.0, 0.0); lm_count(l_max)];

    for r in half_lattice(lattice, radius) {
        let distance = r.norm();
        let hankel = hankel1(l_max, k * distance);
        let phi = r.y.atan2(r.x);
        let phase = k_par.dot(&r);
        let (cos_term, sin_term) = (2.0 * phase.cos(), 2.0 * phase.sin());
        for (index, sum) in sums.iter_mut().enumerate() {
            let (l, m) = lm_from_index(index);
            if (l as i32 + m) % 2 != 0 {
                continue;
            }
            let pair = if m % 2 == 0 {
                Complex64::new(cos_term, 0.0)
            } else {
                Complex64::new(0.0, -sin_term)
            };
            *sum += hankel[l] * in_plane[index] * Complex64::from_polar(1.0, m as f64 * phi) * pair;
        }
    }
    Ok(sums)
}

/// Lattice sums between two parallel sub-lattices displaced by `d` (from
/// sub-lattice `i` to sub-lattice `j`).
///
/// Returns `(D^{ji}, D^{ij})`: waves from `i` received at `j`, and the
/// reverse. With `v = d − R`,
/// `D^{ji}_L = Σ_R h_l(k|v|) Y_L(v̂) e^{ik_par·R}` and
/// `D^{ij}_L = Σ_R (−1)^l h_l(k|v|) Y_L(v̂) e^{−ik_par·R}`.
/// For coplanar sub-lattices terms with odd `l + m` vanish and are skipped.
pub fn inter_layer_sum(
    k: Complex64,
    k_par: &Vector2<f64>,
    lattice: &Lattice2,
    d: &Vector3<f64>,
    l_max: usize,
    tolerance: f64,
) -> Result<(Vec<Complex64>, Vec<Complex64>), EngineError> {
    let radius = summation_radius(k, tolerance)?;
    let coplanar = d.z.abs() < COPLANAR_TOLERANCE;
    let n = lm_count(l_max);
    let mut forward = vec![Complex64::new(0.0, 0.0); n];
    let mut backward = vec![Complex64::new(0.0, 0.0); n];

    for r in shifted_lattice(lattice, &d.xy(), radius) {
        let v = Vector3::new(d.x - r.x, d.y - r.y, d.z);
        let distance = v.norm();
        if distance < 1e-10 {
            continue;
        }
        let hankel = hankel1(l_max, k * distance);
        let cos_theta = Complex64::new(v.z / distance, 0.0);
        let sin_theta = Complex64::new(v.xy().norm() / distance, 0.0);
        let ylm = spherical_harmonics(l_max, cos_theta, sin_theta, v.y.atan2(v.x));
        let bloch = Complex64::from_polar(1.0, k_par.dot(&r));
        let bloch_back = bloch.conj();

        for index in 0..n {
            let (l, m) = lm_from_index(index);
            if coplanar && (l as i32 + m) % 2 != 0 {
                continue;
            }
            let term = hankel[l] * ylm[index];
            forward[index] += term * bloch;
            let sign = if l % 2 == 0 { 1.0 } else { -1.0 };
            backward[index] += term * bloch_back * sign;
        }
    }
    Ok((forward, backward))
}

/// Expands lattice-sum coefficients `D_{L''}` into the translation matrix
/// `4π Σ_{L''} i^{l'−l+l''} C(L, L', L'') D_{L''}` for `l, l' <= l_max`.
pub fn expand_coefficients(
    sums: &[Complex64],
    l_max: usize,
    coupling: &CouplingTable,
) -> ComplexMatrix {
    let n = lm_count(l_max);
    ComplexMatrix::from_fn(n, n, |row, col| {
        let (lp, _) = lm_from_index(row);
        let (l, _) = lm_from_index(col);
        let mut value = Complex64::new(0.0, 0.0);
        for &(lpp_index, c) in coupling.coefficients(col, row) {
            if let Some(&d) = sums.get(lpp_index) {
                let (lpp, _) = lm_from_index(lpp_index);
                let power = (lp as i64 - l as i64 + lpp as i64).rem_euclid(4) as usize;
                value += I_POWERS[power] * d * c;
            }
        }
        value * (4.0 * PI)
    })
}

/// Propagator matrix `G = −2ik · expand_coefficients(D)`.
pub fn propagator(
    k: Complex64,
    sums: &[Complex64],
    l_max: usize,
    coupling: &CouplingTable,
) -> ComplexMatrix {
    expand_coefficients(sums, l_max, coupling).scale(Complex64::new(0.0, -2.0) * k)
}
