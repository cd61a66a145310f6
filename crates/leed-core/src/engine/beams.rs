//! Beam generation and per-energy selection.
//!
//! Beams are the reciprocal-lattice vectors of the superstructure. They are
//! generated once, at the highest energy of the run, and filtered at every
//! energy by an evanescence cutoff. Beams whose indices differ by a 1×1
//! reciprocal vector form one set; the bulk couples only beams of the same
//! set.

use super::config::EngineConfig;
use super::state::{ScatteringState, incident_k_par};
use crate::core::constants::{K_TOLERANCE, MIN_LAYER_DISTANCE};
use crate::core::models::beam::{ActiveBeam, ActiveBeams, Beam, BeamList};
use crate::core::models::crystal::SurfaceModel;
use nalgebra::Vector2;
use std::cmp::Ordering;
use std::f64::consts::PI;
use tracing::debug;

/// Squared damping allowance `(ln ε / d)²` added to the propagating cutoff.
fn evanescence_allowance(epsilon: f64, min_layer_distance: f64) -> f64 {
    let d = min_layer_distance.max(MIN_LAYER_DISTANCE);
    (epsilon.ln() / d).powi(2)
}

/// Enumerates all beams that can become active during the run.
///
/// The radius covers the highest energy of `config`, measured from the
/// inner potential, plus the evanescence allowance and the incident
/// parallel momentum.
pub fn generate(model: &SurfaceModel, config: &EngineConfig) -> BeamList {
    let energies = config.energies.energies();
    let e_max = energies.last().copied().unwrap_or(config.energies.start);
    let allowance = evanescence_allowance(config.epsilon, model.min_layer_distance());
    let k_par = incident_k_par(e_max, &config.incidence);
    let radius =
        (2.0 * (e_max - model.bulk.potential.real) + allowance).max(0.0).sqrt() + k_par.norm();

    let (b1, b2) = model.super_lattice.reciprocal();
    let bound = |a: &Vector2<f64>| (radius * a.norm() / (2.0 * PI)).ceil() as i32 + 1;
    let (n1_max, n2_max) = (bound(&model.super_lattice.a1), bound(&model.super_lattice.a2));

    let mut candidates = Vec::new();
    for s1 in -n1_max..=n1_max {
        for s2 in -n2_max..=n2_max {
            let g = b1 * s1 as f64 + b2 * s2 as f64;
            if g.norm() > radius + K_TOLERANCE {
                continue;
            }
            let ind_1 = g.dot(&model.lattice.a1) / (2.0 * PI);
            let ind_2 = g.dot(&model.lattice.a2) / (2.0 * PI);
            candidates.push(Beam {
                ind_1,
                ind_2,
                super_1: s1,
                super_2: s2,
                g,
                set: 0,
            });
        }
    }

    let num_sets = assign_sets(&mut candidates);
    candidates.sort_by(|a, b| {
        a.set
            .cmp(&b.set)
            .then_with(|| compare_f64(a.g.norm(), b.g.norm()))
            .then_with(|| compare_f64(a.ind_1, b.ind_1))
            .then_with(|| compare_f64(a.ind_2, b.ind_2))
    });

    debug!(
        beams = candidates.len(),
        sets = num_sets,
        radius,
        "Generated beam list."
    );
    BeamList {
        beams: candidates,
        num_sets,
    }
}

/// Groups beams into cosets of the 1×1 reciprocal lattice. The integer-order
/// coset is set 0; the others are numbered by their shortest member.
fn assign_sets(beams: &mut [Beam]) -> usize {
    let fraction = |x: f64| {
        let f = x - x.floor();
        if f > 1.0 - K_TOLERANCE { 0.0 } else { f }
    };
    let mut cosets: Vec<(f64, f64, f64)> = Vec::new();
    for beam in beams.iter() {
        let (f1, f2) = (fraction(beam.ind_1), fraction(beam.ind_2));
        let norm = beam.g.norm();
        match cosets
            .iter_mut()
            .find(|(c1, c2, _)| (c1 - f1).abs() < K_TOLERANCE && (c2 - f2).abs() < K_TOLERANCE)
        {
            Some(coset) => coset.2 = coset.2.min(norm),
            None => cosets.push((f1, f2, norm)),
        }
    }
    cosets.sort_by(|a, b| {
        let integer_a = a.0.abs() < K_TOLERANCE && a.1.abs() < K_TOLERANCE;
        let integer_b = b.0.abs() < K_TOLERANCE && b.1.abs() < K_TOLERANCE;
        integer_b
            .cmp(&integer_a)
            .then_with(|| compare_f64(a.2, b.2))
            .then_with(|| compare_f64(a.0, b.0))
            .then_with(|| compare_f64(a.1, b.1))
    });

    for beam in beams.iter_mut() {
        let (f1, f2) = (fraction(beam.ind_1), fraction(beam.ind_2));
        beam.set = cosets
            .iter()
            .position(|(c1, c2, _)| (c1 - f1).abs() < K_TOLERANCE && (c2 - f2).abs() < K_TOLERANCE)
            .unwrap_or(0);
    }
    cosets.len()
}

fn compare_f64(a: f64, b: f64) -> Ordering {
    if (a - b).abs() < K_TOLERANCE {
        Ordering::Equal
    } else {
        a.total_cmp(&b)
    }
}

/// Beams that are not too evanescent at the energy of `state`, grouped by set.
pub fn select(beams: &BeamList, state: &ScatteringState, min_layer_distance: f64) -> ActiveBeams {
    let cutoff = 2.0 * state.energy_r + evanescence_allowance(state.epsilon, min_layer_distance);

    let mut active = Vec::new();
    let mut set_offsets = Vec::with_capacity(beams.num_sets + 1);
    for set in 0..beams.num_sets {
        set_offsets.push(active.len());
        for beam in beams.iter().filter(|b| b.set == set) {
            let k_par = state.k_in + beam.g;
            if k_par.norm_squared() < cutoff {
                active.push(ActiveBeam {
                    beam: *beam,
                    k_par,
                    k_z: state.k_z(&k_par),
                });
            }
        }
    }
    set_offsets.push(active.len());

    ActiveBeams {
        beams: active,
        set_offsets,
    }
}

/// The beams of set `set`, in order.
#[inline]
pub fn group_by_set(beams: &ActiveBeams, set: usize) -> &[ActiveBeam] {
    beams.set(set)
}

/// Beams that propagate in vacuum at the final energy of the run; the columns
/// of the intensity table.
pub fn output_beams(beams: &BeamList, config: &EngineConfig) -> BeamList {
    let energies = config.energies.energies();
    let e_final = energies.last().copied().unwrap_or(config.energies.start);
    let k_par = incident_k_par(e_final, &config.incidence);
    let selected: Vec<Beam> = beams
        .iter()
        .filter(|b| (k_par + b.g).norm_squared() <= 2.0 * e_final)
        .copied()
        .collect();
    let num_sets = selected.iter().map(|b| b.set + 1).max().unwrap_or(0);
    BeamList {
        beams: selected,
        num_sets,
    }
}
