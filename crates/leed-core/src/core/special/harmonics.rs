use nalgebra::Vector3;
use num_complex::Complex64;
use std::f64::consts::PI;

const DIRECTION_EPSILON: f64 = 1e-14;

/// Flat index of `(l, m)` in the `l`-major ordering `(0,0), (1,-1), (1,0), (1,1), ...`.
#[inline]
pub fn lm_index(l: usize, m: i32) -> usize {
    ((l * l + l) as i64 + m as i64) as usize
}

/// Number of `(l, m)` pairs with `l <= l_max`.
#[inline]
pub const fn lm_count(l_max: usize) -> usize {
    (l_max + 1) * (l_max + 1)
}

/// Inverse of [`lm_index`].
pub fn lm_from_index(index: usize) -> (usize, i32) {
    let l = (index as f64).sqrt() as usize;
    let l = if (l + 1) * (l + 1) <= index { l + 1 } else { l };
    let m = index as i64 - (l * l + l) as i64;
    (l, m as i32)
}

/// Complex spherical harmonics `Y_lm` (Condon-Shortley phase) for all
/// `l <= l_max`, in [`lm_index`] order.
///
/// The polar angle enters through `cos θ` and `sin θ` separately, so complex
/// angles (evanescent beam directions) are supported. The azimuth `φ` is real.
pub fn spherical_harmonics(
    l_max: usize,
    cos_theta: Complex64,
    sin_theta: Complex64,
    phi: f64,
) -> Vec<Complex64> {
    let legendre = normalized_legendre(l_max, cos_theta, sin_theta);
    let mut ylm = vec![Complex64::new(0.0, 0.0); lm_count(l_max)];
    for l in 0..=l_max {
        for m in 0..=l {
            let p = legendre[l * (l_max + 1) + m];
            let phase = Complex64::from_polar(1.0, m as f64 * phi);
            let positive = p * phase;
            ylm[lm_index(l, m as i32)] = positive;
            if m > 0 {
                let sign = if m % 2 == 0 { 1.0 } else { -1.0 };
                ylm[lm_index(l, -(m as i32))] = p * phase.conj() * sign;
            }
        }
    }
    ylm
}

/// Spherical harmonics evaluated on the direction of a real vector.
///
/// The zero vector is treated as pointing along `+z`.
pub fn harmonics_of_vector(l_max: usize, v: &Vector3<f64>) -> Vec<Complex64> {
    let r = v.norm();
    let (cos_theta, sin_theta, phi) = if r < DIRECTION_EPSILON {
        (1.0, 0.0, 0.0)
    } else {
        let rho = (v.x * v.x + v.y * v.y).sqrt();
        let phi = if rho < DIRECTION_EPSILON { 0.0 } else { v.y.atan2(v.x) };
        (v.z / r, rho / r, phi)
    };
    spherical_harmonics(
        l_max,
        Complex64::new(cos_theta, 0.0),
        Complex64::new(sin_theta, 0.0),
        phi,
    )
}

/// Analytic conjugate `Y*_lm = (-1)^m Y_{l,-m}`.
///
/// For real angles this is the complex conjugate; for complex polar angles it is
/// the continuation that keeps the addition theorems valid.
pub fn analytic_conjugate(l_max: usize, ylm: &[Complex64]) -> Vec<Complex64> {
    let mut out = vec![Complex64::new(0.0, 0.0); ylm.len()];
    for l in 0..=l_max {
        for m in -(l as i32)..=(l as i32) {
            let sign = if m.rem_euclid(2) == 0 { 1.0 } else { -1.0 };
            out[lm_index(l, m)] = ylm[lm_index(l, -m)] * sign;
        }
    }
    out
}

/// Normalized associated Legendre functions `N_lm P_lm(x)` for `0 <= m <= l`,
/// stored row-major in a `(l_max + 1) x (l_max + 1)` table.
fn normalized_legendre(l_max: usize, x: Complex64, s: Complex64) -> Vec<Complex64> {
    let stride = l_max + 1;
    let zero = Complex64::new(0.0, 0.0);
    let mut p = vec![zero; stride * stride];
    p[0] = Complex64::new(1.0 / (4.0 * PI).sqrt(), 0.0);

    for m in 0..=l_max {
        if m > 0 {
            let factor = -((2 * m + 1) as f64 / (2 * m) as f64).sqrt();
            p[m * stride + m] = p[(m - 1) * stride + (m - 1)] * s * factor;
        }
        if m < l_max {
            p[(m + 1) * stride + m] = p[m * stride + m] * x * ((2 * m + 3) as f64).sqrt();
        }
        for l in (m + 2)..=l_max {
            let a_l = recurrence_coefficient(l, m);
            let a_prev = recurrence_coefficient(l - 1, m);
            p[l * stride + m] =
                (x * p[(l - 1) * stride + m] - p[(l - 2) * stride + m] / a_prev) * a_l;
        }
    }
    p
}

fn recurrence_coefficient(l: usize, m: usize) -> f64 {
    let l2 = (l * l) as f64;
    let m2 = (m * m) as f64;
    ((4.0 * l2 - 1.0) / (l2 - m2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    fn real_angles(l_max: usize, theta: f64, phi: f64) -> Vec<Complex64> {
        spherical_harmonics(
            l_max,
            Complex64::new(theta.cos(), 0.0),
            Complex64::new(theta.sin(), 0.0),
            phi,
        )
    }

    #[test]
    fn index_round_trips_through_lm_pairs() {
        let mut expected = 0;
        for l in 0..6 {
            for m in -(l as i32)..=(l as i32) {
                assert_eq!(lm_index(l, m), expected);
                assert_eq!(lm_from_index(expected), (l, m));
                expected += 1;
            }
        }
        assert_eq!(lm_count(5), expected);
    }

    #[test]
    fn low_orders_match_closed_forms() {
        let (theta, phi) = (0.7_f64, 1.1_f64);
        let y = real_angles(2, theta, phi);
        let y00 = 0.5 / PI.sqrt();
        let y10 = (3.0 / (4.0 * PI)).sqrt() * theta.cos();
        let y11 = Complex64::from_polar(-(3.0 / (8.0 * PI)).sqrt() * theta.sin(), phi);
        let y20 = (5.0 / (16.0 * PI)).sqrt() * (3.0 * theta.cos().powi(2) - 1.0);
        assert!((y[lm_index(0, 0)].re - y00).abs() < TOLERANCE);
        assert!((y[lm_index(1, 0)].re - y10).abs() < TOLERANCE);
        assert!((y[lm_index(1, 1)] - y11).norm() < TOLERANCE);
        assert!((y[lm_index(1, -1)] + y11.conj()).norm() < TOLERANCE);
        assert!((y[lm_index(2, 0)].re - y20).abs() < TOLERANCE);
    }

    #[test]
    fn addition_sum_is_constant_per_l() {
        let y = real_angles(6, 2.1, -0.4);
        for l in 0..=6 {
            let total: f64 = (-(l as i32)..=(l as i32))
                .map(|m| y[lm_index(l, m)].norm_sqr())
                .sum();
            let expected = (2 * l + 1) as f64 / (4.0 * PI);
            assert!((total - expected).abs() < 1e-10, "l = {l}");
        }
    }

    #[test]
    fn analytic_conjugate_equals_conjugate_for_real_angles() {
        let y = real_angles(4, 0.3, 2.5);
        let conj = analytic_conjugate(4, &y);
        for (a, b) in conj.iter().zip(y.iter()) {
            assert!((a - b.conj()).norm() < TOLERANCE);
        }
    }

    #[test]
    fn vector_along_minus_z_gives_parity_of_l() {
        let up = harmonics_of_vector(3, &Vector3::new(0.0, 0.0, 2.0));
        let down = harmonics_of_vector(3, &Vector3::new(0.0, 0.0, -2.0));
        for l in 0..=3 {
            let sign = if l % 2 == 0 { 1.0 } else { -1.0 };
            let i = lm_index(l, 0);
            assert!((down[i] - up[i] * sign).norm() < TOLERANCE);
        }
    }
}
