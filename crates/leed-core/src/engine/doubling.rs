//! Layer doubling: stacking scatterers by renormalised forward scattering.
//!
//! Two scatterers `A` (below) and `B` (above) separated by the vector `v`
//! from the top reference plane of `A` to the origin of `B` combine into one.
//! Between them, beam `g` travelling up picks up
//! `P⁺_g = e^{i(k_g·v_xy + k_z,g v_z)}` and travelling down
//! `P⁻_g = e^{i(−k_g·v_xy + k_z,g v_z)}`. With
//! `Inv1 = (I − R⁺⁻_A P⁻ R⁻⁺_B P⁺)⁻¹` and `Inv2 = (I − R⁻⁺_B P⁺ R⁺⁻_A P⁻)⁻¹`:
//!
//! ```text
//! T⁺⁺ = T⁺⁺_B P⁺ Inv1 T⁺⁺_A
//! R⁻⁺ = R⁻⁺_A + T⁻⁻_A P⁻ R⁻⁺_B P⁺ Inv1 T⁺⁺_A
//! T⁻⁻ = T⁻⁻_A P⁻ Inv2 T⁻⁻_B
//! R⁺⁻ = R⁺⁻_B + T⁺⁺_B P⁺ R⁺⁻_A P⁻ Inv2 T⁻⁻_B
//! ```
//!
//! In single-scattering order both inverses are replaced by the identity.

use super::composite::LayerMatrices;
use super::config::{DoublingConfig, ScatteringOrder};
use super::error::EngineError;
use super::state::ScatteringState;
use crate::core::constants::INT_TOLERANCE;
use crate::core::linalg::{ComplexMatrix, MatrixError};
use crate::core::models::beam::ActiveBeam;
use nalgebra::Vector3;
use num_complex::Complex64;
use tracing::debug;

/// Propagation phases `(P⁺, P⁻)` across `v` for each beam.
pub fn propagation_phases(
    beams: &[ActiveBeam],
    v: &Vector3<f64>,
) -> (Vec<Complex64>, Vec<Complex64>) {
    let i = Complex64::new(0.0, 1.0);
    beams
        .iter()
        .map(|b| {
            let lateral = b.k_par.dot(&v.xy());
            let vertical = b.k_z * v.z;
            (
                (i * (vertical + lateral)).exp(),
                (i * (vertical - lateral)).exp(),
            )
        })
        .unzip()
}

fn scaled_columns(m: &ComplexMatrix, factors: &[Complex64]) -> Result<ComplexMatrix, MatrixError> {
    let mut out = m.clone();
    out.scale_columns(factors)?;
    Ok(out)
}

fn multiple_reflection(
    first: &ComplexMatrix,
    second: &ComplexMatrix,
    order: ScatteringOrder,
) -> Result<Option<ComplexMatrix>, MatrixError> {
    match order {
        ScatteringOrder::Single => Ok(None),
        ScatteringOrder::Full => Ok(Some(first.multiply(second)?.identity_minus()?.invert()?)),
    }
}

fn apply(
    inverse: &Option<ComplexMatrix>,
    rhs: &ComplexMatrix,
) -> Result<ComplexMatrix, MatrixError> {
    match inverse {
        Some(inv) => inv.multiply(rhs),
        None => Ok(rhs.clone()),
    }
}

/// Combines `lower` and `upper` into one scatterer.
pub fn combine(
    lower: &LayerMatrices,
    upper: &LayerMatrices,
    beams: &[ActiveBeam],
    v: &Vector3<f64>,
    order: ScatteringOrder,
) -> Result<LayerMatrices, EngineError> {
    let (p_plus, p_minus) = propagation_phases(beams, v);
    let rb_p = scaled_columns(&upper.rmp, &p_plus)?;
    let ra_m = scaled_columns(&lower.rpm, &p_minus)?;
    let tb_p = scaled_columns(&upper.tpp, &p_plus)?;
    let ta_m = scaled_columns(&lower.tmm, &p_minus)?;

    let inv1 = multiple_reflection(&ra_m, &rb_p, order)?;
    let inner_up = apply(&inv1, &lower.tpp)?;
    let tpp = tb_p.multiply(&inner_up)?;
    let rmp = lower.rmp.add(&ta_m.multiply(&rb_p)?.multiply(&inner_up)?)?;

    let inv2 = multiple_reflection(&rb_p, &ra_m, order)?;
    let inner_down = apply(&inv2, &upper.tmm)?;
    let tmm = ta_m.multiply(&inner_down)?;
    let rpm = upper.rpm.add(&tb_p.multiply(&ra_m)?.multiply(&inner_down)?)?;

    Ok(LayerMatrices { tpp, tmm, rpm, rmp })
}

/// `R⁺⁻` of `upper` stacked on a scatterer known only through its `R⁺⁻`
/// (a semi-infinite bulk).
pub fn combine_reflection(
    lower_rpm: &ComplexMatrix,
    upper: &LayerMatrices,
    beams: &[ActiveBeam],
    v: &Vector3<f64>,
    order: ScatteringOrder,
) -> Result<ComplexMatrix, EngineError> {
    let (p_plus, p_minus) = propagation_phases(beams, v);
    let rb_p = scaled_columns(&upper.rmp, &p_plus)?;
    let ra_m = scaled_columns(lower_rpm, &p_minus)?;
    let tb_p = scaled_columns(&upper.tpp, &p_plus)?;

    let inv2 = multiple_reflection(&rb_p, &ra_m, order)?;
    let inner_down = apply(&inv2, &upper.tmm)?;
    Ok(upper.rpm.add(&tb_p.multiply(&ra_m)?.multiply(&inner_down)?)?)
}

/// Reflection matrix `R⁺⁻` of a semi-infinite stack of `period`, each copy
/// displaced by `v` from the one below.
///
/// The stack is doubled (1, 2, 4, ... periods) until no element of `R⁺⁻`
/// changes by more than `config.tolerance`.
///
/// # Errors
///
/// [`EngineError::ConvergenceFailure`] after `config.max_doublings` doublings.
pub fn double_until_converged(
    period: LayerMatrices,
    beams: &[ActiveBeam],
    v: &Vector3<f64>,
    order: ScatteringOrder,
    config: &DoublingConfig,
) -> Result<ComplexMatrix, EngineError> {
    let mut stack = period;
    let mut change = f64::INFINITY;
    for iteration in 1..=config.max_doublings {
        let doubled = combine(&stack, &stack, beams, v, order)?;
        change = doubled.rpm.max_abs_diff(&stack.rpm)?;
        stack = doubled;
        if change < config.tolerance {
            debug!(iterations = iteration, change, "Bulk doubling converged.");
            return Ok(stack.rpm);
        }
    }
    Err(EngineError::ConvergenceFailure {
        iterations: config.max_doublings,
        change,
    })
}

/// Carries the surface reflection matrix through the final non-scattering
/// step `step` into the vacuum and returns the amplitude of every beam for
/// the incident beam `incident`.
///
/// The amplitudes include the flux factor `sqrt(k_z,g / k_z,inc)` with vacuum
/// perpendicular momenta; beams evanescent in vacuum get zero.
pub fn terminal_potential_step(
    rpm: &ComplexMatrix,
    beams: &[ActiveBeam],
    state: &ScatteringState,
    step: &Vector3<f64>,
    incident: usize,
) -> Result<Vec<Complex64>, EngineError> {
    let (p_plus, p_minus) = propagation_phases(beams, step);
    let incoming = beams
        .get(incident)
        .ok_or_else(|| EngineError::Internal(format!("incident beam {incident} is not active")))?;
    let Some(kz_in) = state.vacuum_k_z(&incoming.k_par) else {
        return Ok(vec![Complex64::new(0.0, 0.0); beams.len()]);
    };

    Ok(beams
        .iter()
        .enumerate()
        .map(|(g, beam)| match state.vacuum_k_z(&beam.k_par) {
            Some(kz) => rpm[(g, incident)] * p_plus[g] * p_minus[incident] * (kz / kz_in).sqrt(),
            None => Complex64::new(0.0, 0.0),
        })
        .collect())
}

/// `|A|²`, with values below [`INT_TOLERANCE`] set to zero.
pub fn intensities(amplitudes: &[Complex64]) -> Vec<f64> {
    amplitudes
        .iter()
        .map(|a| {
            let i = a.norm_sqr();
            if i < INT_TOLERANCE { 0.0 } else { i }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::linalg::ElementKind;
    use crate::core::models::beam::Beam;
    use nalgebra::Vector2;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const TOLERANCE: f64 = 1e-10;

    fn beams() -> Vec<ActiveBeam> {
        [(0.0, 0.0), (0.7, 0.0), (0.0, -0.7), (0.7, 0.7)]
            .iter()
            .map(|&(gx, gy)| {
                let k_par = Vector2::new(0.1 + gx, 0.05 + gy);
                let k_z: Complex64 =
                    (Complex64::new(4.0, 0.3) - Complex64::from(k_par.norm_squared())).sqrt();
                ActiveBeam {
                    beam: Beam {
                        ind_1: gx,
                        ind_2: gy,
                        super_1: 0,
                        super_2: 0,
                        g: Vector2::new(gx, gy),
                        set: 0,
                    },
                    k_par,
                    k_z,
                }
            })
            .collect()
    }

    fn random_matrix(rng: &mut StdRng, n: usize, scale: f64) -> ComplexMatrix {
        ComplexMatrix::from_fn(n, n, |_, _| {
            Complex64::new(rng.gen_range(-scale..scale), rng.gen_range(-scale..scale))
        })
    }

    fn random_layer(rng: &mut StdRng, n: usize) -> LayerMatrices {
        let mut tpp = random_matrix(rng, n, 0.05);
        let mut tmm = random_matrix(rng, n, 0.05);
        let ones = vec![Complex64::new(0.9, 0.1); n];
        tpp.add_to_diagonal(&ones).unwrap();
        tmm.add_to_diagonal(&ones).unwrap();
        LayerMatrices {
            tpp,
            tmm,
            rpm: random_matrix(rng, n, 0.1),
            rmp: random_matrix(rng, n, 0.1),
        }
    }

    #[test]
    fn combination_is_associative() {
        let mut rng = StdRng::seed_from_u64(7);
        let beams = beams();
        let n = beams.len();
        let a = random_layer(&mut rng, n);
        let b = random_layer(&mut rng, n);
        let c = random_layer(&mut rng, n);
        let v_ab = Vector3::new(0.4, -0.3, 2.1);
        let v_bc = Vector3::new(-0.2, 0.5, 1.7);

        let order = ScatteringOrder::Full;
        let ab = combine(&a, &b, &beams, &v_ab, order).unwrap();
        let bc = combine(&b, &c, &beams, &v_bc, order).unwrap();
        let left = combine(&ab, &c, &beams, &v_bc, order).unwrap();
        let right = combine(&a, &bc, &beams, &v_ab, order).unwrap();
        assert!(left.tpp.max_abs_diff(&right.tpp).unwrap() < TOLERANCE);
        assert!(left.tmm.max_abs_diff(&right.tmm).unwrap() < TOLERANCE);
        assert!(left.rpm.max_abs_diff(&right.rpm).unwrap() < TOLERANCE);
        assert!(left.rmp.max_abs_diff(&right.rmp).unwrap() < TOLERANCE);
    }

    #[test]
    fn reflection_only_combination_matches_full_combination() {
        let mut rng = StdRng::seed_from_u64(11);
        let beams = beams();
        let (a, b) = (random_layer(&mut rng, beams.len()), random_layer(&mut rng, beams.len()));
        let v = Vector3::new(0.3, 0.1, 1.9);
        let full = combine(&a, &b, &beams, &v, ScatteringOrder::Full).unwrap();
        let reflection = combine_reflection(&a.rpm, &b, &beams, &v, ScatteringOrder::Full).unwrap();
        assert!(full.rpm.max_abs_diff(&reflection).unwrap() < TOLERANCE);
    }

    #[test]
    fn transparent_spacer_only_shifts_phases() {
        let mut rng = StdRng::seed_from_u64(3);
        let beams = beams();
        let n = beams.len();
        let a = random_layer(&mut rng, n);
        let empty = LayerMatrices {
            tpp: ComplexMatrix::identity(n),
            tmm: ComplexMatrix::identity(n),
            rpm: ComplexMatrix::zeros(n, n, ElementKind::Complex),
            rmp: ComplexMatrix::zeros(n, n, ElementKind::Complex),
        };
        let v = Vector3::new(0.2, 0.0, 1.0);
        let stacked = combine(&a, &empty, &beams, &v, ScatteringOrder::Full).unwrap();
        let (p_plus, _) = propagation_phases(&beams, &v);
        for g in 0..n {
            for h in 0..n {
                assert!((stacked.tpp[(g, h)] - p_plus[g] * a.tpp[(g, h)]).norm() < TOLERANCE);
            }
        }
        assert!(stacked.rmp.max_abs_diff(&a.rmp).unwrap() < TOLERANCE);
    }

    #[test]
    fn non_reflecting_period_converges_immediately() {
        let beams = beams();
        let n = beams.len();
        let period = LayerMatrices {
            tpp: ComplexMatrix::identity(n),
            tmm: ComplexMatrix::identity(n),
            rpm: ComplexMatrix::zeros(n, n, ElementKind::Complex),
            rmp: ComplexMatrix::zeros(n, n, ElementKind::Complex),
        };
        let r = double_until_converged(
            period,
            &beams,
            &Vector3::new(0.0, 0.0, 3.0),
            ScatteringOrder::Full,
            &DoublingConfig { tolerance: 1e-8, max_doublings: 1 },
        )
        .unwrap();
        assert_eq!(r.max_abs(), 0.0);
    }

    #[test]
    fn undamped_reflector_fails_to_converge() {
        let n = 1;
        let beam = ActiveBeam {
            beam: Beam {
                ind_1: 0.0,
                ind_2: 0.0,
                super_1: 0,
                super_2: 0,
                g: Vector2::zeros(),
                set: 0,
            },
            k_par: Vector2::zeros(),
            k_z: Complex64::new(1.3, 0.0),
        };
        let r = ComplexMatrix::from_fn(n, n, |_, _| Complex64::new(0.2, 0.0));
        let period = LayerMatrices {
            tpp: ComplexMatrix::identity(n),
            tmm: ComplexMatrix::identity(n),
            rpm: r.clone(),
            rmp: r,
        };
        let result = double_until_converged(
            period,
            &[beam],
            &Vector3::new(0.0, 0.0, 2.0),
            ScatteringOrder::Single,
            &DoublingConfig { tolerance: 1e-12, max_doublings: 4 },
        );
        assert!(matches!(result, Err(EngineError::ConvergenceFailure { iterations: 4, .. })));
    }

    #[test]
    fn intensities_drop_values_below_floor() {
        let amplitudes = [Complex64::new(0.3, 0.4), Complex64::new(1e-6, 0.0)];
        assert_eq!(intensities(&amplitudes), vec![0.25, 0.0]);
    }
}
