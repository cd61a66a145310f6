//! Scattering matrices of one (possibly composite) layer.
//!
//! Each atom of the 2-D unit cell defines a Bravais sub-lattice. Scattering
//! within a sub-lattice is summed exactly through the plane lattice sum;
//! scattering between sub-lattices is solved with one block ("giant") linear
//! system whose off-diagonal blocks couple sub-lattices through inter-layer
//! lattice sums. The angular-momentum solution is finally projected onto the
//! plane-wave beams.

use super::cache::{PropagatorCache, PropagatorPair};
use super::config::ScatteringOrder;
use super::error::EngineError;
use super::factors::TypeFactors;
use super::lattice_sum::{inter_layer_sum, plane_sum, propagator};
use super::state::ScatteringState;
use crate::core::constants::{COPLANAR_TOLERANCE, PLANE_TOLERANCE};
use crate::core::linalg::{ComplexMatrix, ElementKind, invert_partitioned};
use crate::core::models::atom::Atom;
use crate::core::models::beam::ActiveBeam;
use crate::core::models::layer::Layer;
use crate::core::special::{
    CouplingTable, analytic_conjugate, lm_count, lm_from_index, spherical_harmonics,
};
use nalgebra::{Vector2, Vector3};
use num_complex::Complex64;
use std::collections::BTreeMap;
use std::f64::consts::PI;
use tracing::trace;

const I_POWERS: [Complex64; 4] = [
    Complex64::new(1.0, 0.0),
    Complex64::new(0.0, 1.0),
    Complex64::new(-1.0, 0.0),
    Complex64::new(0.0, -1.0),
];

/// Plane-wave transmission and reflection matrices of a layer or stack.
///
/// Indices run over the beams the matrices were built for. `rpm` reflects
/// `−` waves into `+` waves, `rmp` the reverse.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerMatrices {
    pub tpp: ComplexMatrix,
    pub tmm: ComplexMatrix,
    pub rpm: ComplexMatrix,
    pub rmp: ComplexMatrix,
}

/// Computes the scattering matrices of `layer` for `beams`.
///
/// `bloch` is the parallel wavevector used in the lattice sums; any member of
/// the beams' set gives the same sums. `cache` may be shared between layers
/// with the same lattice, energy and Bloch vector.
pub fn scatter_layer(
    state: &ScatteringState,
    layer: &Layer,
    beams: &[ActiveBeam],
    bloch: &Vector2<f64>,
    coupling: &CouplingTable,
    cache: &mut PropagatorCache,
) -> Result<LayerMatrices, EngineError> {
    let l_max = layer_l_max(state, layer)?;
    let n_lm = lm_count(l_max);
    let (atoms, leading) = order_by_sub_plane(&layer.atoms);
    let (z_min, z_max) = layer.z_extent();
    let full = state.order == ScatteringOrder::Full;
    let k = state.k;

    // === Phase 1: Bravais sub-lattices ===
    let bravais = if full {
        let sums = plane_sum(k, bloch, &layer.lattice, 2 * l_max, state.epsilon)?;
        Some(propagator(k, &sums, l_max, coupling))
    } else {
        None
    };
    let mut type_x: BTreeMap<usize, ComplexMatrix> = BTreeMap::new();
    for atom in &atoms {
        if type_x.contains_key(&atom.scattering_type) {
            continue;
        }
        let t_s = state
            .type_factors(atom.scattering_type)?
            .to_matrix(l_max)
            .scale(Complex64::new(-0.5, 0.0) / k);
        let x = match &bravais {
            Some(g) => t_s.multiply(g)?.identity_minus()?.invert()?.multiply(&t_s)?,
            None => t_s,
        };
        type_x.insert(atom.scattering_type, x);
    }
    let sites: Vec<(&Atom, &ComplexMatrix)> = atoms
        .iter()
        .map(|&a| {
            type_x
                .get(&a.scattering_type)
                .map(|x| (a, x))
                .ok_or(EngineError::MissingScatteringType(a.scattering_type))
        })
        .collect::<Result<_, _>>()?;

    // === Phase 2: Inter-sub-lattice multiple scattering ===
    let inverse = if full && atoms.len() > 1 {
        let giant = assemble_giant_matrix(state, layer, &sites, l_max, bloch, coupling, cache)?;
        let parity = parity_split(state, &atoms, leading, l_max);
        Some(invert_partitioned(&giant, leading * n_lm, parity.as_deref())?)
    } else {
        None
    };

    // === Phase 3: Projection onto beams ===
    let area = layer.cell_area();
    let mut amplitudes = Vec::with_capacity(2);
    let mut projections = Vec::with_capacity(2);
    for sign in [1.0, -1.0] {
        let harmonics: Vec<Vec<Complex64>> = beams
            .iter()
            .map(|b| beam_harmonics(b, k, l_max, sign))
            .collect();
        let incoming = incoming_amplitudes(beams, &harmonics, &sites, l_max, sign)?;
        let solved = match &inverse {
            Some(m) => m.multiply(&incoming)?,
            None => incoming,
        };
        amplitudes.push(solved);
        projections.push(outgoing_projection(beams, &harmonics, &sites, l_max, sign, area));
    }
    let (w_plus, w_minus) = (&amplitudes[0], &amplitudes[1]);
    let (l_plus, l_minus) = (&projections[0], &projections[1]);

    let exp_i = |kz: Complex64, z: f64| (Complex64::new(0.0, 1.0) * kz * z).exp();
    let out_plus: Vec<Complex64> = beams.iter().map(|b| exp_i(b.k_z, z_max)).collect();
    let out_minus: Vec<Complex64> = beams.iter().map(|b| exp_i(b.k_z, -z_min)).collect();
    let in_plus: Vec<Complex64> = beams.iter().map(|b| exp_i(b.k_z, -z_min)).collect();
    let in_minus: Vec<Complex64> = beams.iter().map(|b| exp_i(b.k_z, z_max)).collect();
    let unscattered: Vec<Complex64> = beams.iter().map(|b| exp_i(b.k_z, z_max - z_min)).collect();

    let referenced = |product: ComplexMatrix, rows: &[Complex64], cols: &[Complex64]| {
        let mut m = product;
        m.scale_rows(rows)?;
        m.scale_columns(cols)?;
        Ok::<_, EngineError>(m)
    };

    let n = beams.len();
    let (mut tpp, mut tmm) = if full {
        (
            referenced(l_plus.multiply(w_plus)?, &out_plus, &in_plus)?,
            referenced(l_minus.multiply(w_minus)?, &out_minus, &in_minus)?,
        )
    } else {
        (
            ComplexMatrix::zeros(n, n, ElementKind::Complex),
            ComplexMatrix::zeros(n, n, ElementKind::Complex),
        )
    };
    tpp.add_to_diagonal(&unscattered)?;
    tmm.add_to_diagonal(&unscattered)?;
    let rmp = referenced(l_minus.multiply(w_plus)?, &out_minus, &in_plus)?;
    let rpm = referenced(l_plus.multiply(w_minus)?, &out_plus, &in_minus)?;

    trace!(
        layer = layer.index,
        atoms = atoms.len(),
        l_max,
        beams = n,
        "Scattered layer."
    );
    Ok(LayerMatrices { tpp, tmm, rpm, rmp })
}

/// Angular-momentum cutoff of a layer: the highest `l` whose scattering
/// factor reaches `epsilon` for any diagonal type in the layer. Non-diagonal
/// types use the global cutoff.
pub fn layer_l_max(state: &ScatteringState, layer: &Layer) -> Result<usize, EngineError> {
    let mut l_layer = state.l_max.min(1);
    for atom in &layer.atoms {
        match state.type_factors(atom.scattering_type)? {
            TypeFactors::NonDiagonal(_) => return Ok(state.l_max),
            TypeFactors::Diagonal(t) => {
                if let Some(l) = t.iter().rposition(|t| t.norm() >= state.epsilon) {
                    l_layer = l_layer.max(l);
                }
            }
        }
    }
    Ok(l_layer.min(state.l_max))
}

/// Reorders atoms so the most populated sub-plane comes first. Returns the
/// atoms and the size of the leading sub-plane.
fn order_by_sub_plane(atoms: &[Atom]) -> (Vec<&Atom>, usize) {
    let mut planes: Vec<(f64, usize)> = Vec::new();
    for atom in atoms {
        match planes
            .iter_mut()
            .find(|(z, _)| (z - atom.position.z).abs() < PLANE_TOLERANCE)
        {
            Some(plane) => plane.1 += 1,
            None => planes.push((atom.position.z, 1)),
        }
    }
    let Some(&(z_lead, count)) = planes
        .iter()
        .reduce(|best, plane| if plane.1 > best.1 { plane } else { best })
    else {
        return (Vec::new(), 0);
    };

    let in_lead = |a: &&Atom| (a.position.z - z_lead).abs() < PLANE_TOLERANCE;
    let mut ordered: Vec<&Atom> = atoms.iter().filter(in_lead).collect();
    ordered.extend(atoms.iter().filter(|a| !in_lead(a)));
    (ordered, count)
}

/// Parity flags for the leading block, when it decouples by `l + m` parity.
///
/// That requires diagonal scattering factors and a leading sub-plane whose
/// atoms share exactly the same z; atoms merely within [`PLANE_TOLERANCE`]
/// still couple odd and even terms.
fn parity_split(
    state: &ScatteringState,
    atoms: &[&Atom],
    leading: usize,
    l_max: usize,
) -> Option<Vec<bool>> {
    let all_diagonal = atoms.iter().all(|a| {
        matches!(state.factors.get(a.scattering_type), Some(TypeFactors::Diagonal(_)))
    });
    let z_lead = atoms.first()?.position.z;
    let coplanar = atoms[..leading]
        .iter()
        .all(|a| (a.position.z - z_lead).abs() < COPLANAR_TOLERANCE);
    (all_diagonal && coplanar).then(|| parity_flags(leading, l_max))
}

/// `true` for even `l + m` over the leading sub-plane's rows.
fn parity_flags(leading: usize, l_max: usize) -> Vec<bool> {
    let n_lm = lm_count(l_max);
    (0..leading * n_lm)
        .map(|row| {
            let (l, m) = lm_from_index(row % n_lm);
            (l as i32 + m).rem_euclid(2) == 0
        })
        .collect()
}

/// Block matrix with identity diagonal blocks and `−X_i G^{ij}` coupling
/// blocks.
fn assemble_giant_matrix(
    state: &ScatteringState,
    layer: &Layer,
    sites: &[(&Atom, &ComplexMatrix)],
    l_max: usize,
    bloch: &Vector2<f64>,
    coupling: &CouplingTable,
    cache: &mut PropagatorCache,
) -> Result<ComplexMatrix, EngineError> {
    let n_lm = lm_count(l_max);
    let mut giant = ComplexMatrix::identity(sites.len() * n_lm);
    let minus_one = Complex64::new(-1.0, 0.0);

    for (i, &(atom_i, x_i)) in sites.iter().enumerate() {
        for (j, &(atom_j, x_j)) in sites.iter().enumerate().skip(i + 1) {
            let d: Vector3<f64> = atom_j.position - atom_i.position;
            if cache.get(l_max, &d).is_none() {
                let (forward, backward) =
                    inter_layer_sum(state.k, bloch, &layer.lattice, &d, 2 * l_max, state.epsilon)?;
                let pair = PropagatorPair {
                    forward: propagator(state.k, &forward, l_max, coupling),
                    backward: propagator(state.k, &backward, l_max, coupling),
                };
                cache.insert(l_max, &d, pair);
            }
            let pair = cache
                .get(l_max, &d)
                .ok_or_else(|| EngineError::Internal("propagator cache miss".into()))?;

            let block_ij = x_i.multiply(&pair.backward)?.scale(minus_one);
            let block_ji = x_j.multiply(&pair.forward)?.scale(minus_one);
            giant.insert_submatrix(&block_ij, i * n_lm, j * n_lm)?;
            giant.insert_submatrix(&block_ji, j * n_lm, i * n_lm)?;
        }
    }
    Ok(giant)
}

/// `Y_L` along `K^±_g = (k_par, ±k_z)`; complex polar angles for evanescent beams.
fn beam_harmonics(beam: &ActiveBeam, k: Complex64, l_max: usize, sign: f64) -> Vec<Complex64> {
    let cos_theta = beam.k_z * sign / k;
    let sin_theta = Complex64::new(beam.k_par.norm(), 0.0) / k;
    let phi = if beam.k_par.norm() > 0.0 {
        beam.k_par.y.atan2(beam.k_par.x)
    } else {
        0.0
    };
    spherical_harmonics(l_max, cos_theta, sin_theta, phi)
}

/// `e^{iK·r}` for a beam travelling in direction `sign`.
fn plane_wave(beam: &ActiveBeam, sign: f64, r: &Vector3<f64>) -> Complex64 {
    let lateral = Complex64::new(0.0, beam.k_par.dot(&r.xy()));
    let vertical = Complex64::new(0.0, sign * r.z) * beam.k_z;
    (lateral + vertical).exp()
}

/// Amplitudes scattered by each sub-lattice from unit incoming plane waves:
/// `X_a [i^l Y*_L(K̂_g) e^{iK_g·r_a}]`, stacked over atoms.
fn incoming_amplitudes(
    beams: &[ActiveBeam],
    harmonics: &[Vec<Complex64>],
    sites: &[(&Atom, &ComplexMatrix)],
    l_max: usize,
    sign: f64,
) -> Result<ComplexMatrix, EngineError> {
    let n_lm = lm_count(l_max);
    let conjugates: Vec<Vec<Complex64>> =
        harmonics.iter().map(|y| analytic_conjugate(l_max, y)).collect();
    let mut stacked = ComplexMatrix::zeros(sites.len() * n_lm, beams.len(), ElementKind::Complex);
    for (a, (atom, x)) in sites.iter().enumerate() {
        let expansion = ComplexMatrix::from_fn(n_lm, beams.len(), |row, g| {
            let (l, _) = lm_from_index(row);
            I_POWERS[l % 4] * conjugates[g][row] * plane_wave(&beams[g], sign, &atom.position)
        });
        stacked.insert_submatrix(&x.multiply(&expansion)?, a * n_lm, 0)?;
    }
    Ok(stacked)
}

/// Plane-wave content of unit outgoing spherical waves from each sub-lattice:
/// `−16π²i / (A k_z,g') · i^{−l} Y_L(K̂_g') e^{−iK_g'·r_a}`.
fn outgoing_projection(
    beams: &[ActiveBeam],
    harmonics: &[Vec<Complex64>],
    sites: &[(&Atom, &ComplexMatrix)],
    l_max: usize,
    sign: f64,
    area: f64,
) -> ComplexMatrix {
    let n_lm = lm_count(l_max);
    let prefactors: Vec<Complex64> = beams
        .iter()
        .map(|b| Complex64::new(0.0, -16.0 * PI * PI) / (b.k_z * area))
        .collect();
    ComplexMatrix::from_fn(beams.len(), sites.len() * n_lm, |g, col| {
        let (a, row) = (col / n_lm, col % n_lm);
        let (l, _) = lm_from_index(row);
        let phase = plane_wave(&beams[g], sign, &sites[a].0.position).inv();
        prefactors[g] * I_POWERS[(4 - l % 4) % 4] * harmonics[g][row] * phase
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::beam::Beam;
    use crate::core::models::layer::Lattice2;
    use crate::engine::factors::atomic_t;

    const TOLERANCE: f64 = 1e-10;

    fn state(factors: Vec<TypeFactors>, l_max: usize, order: ScatteringOrder) -> ScatteringState {
        let (energy_r, energy_i) = (3.0, 0.25);
        ScatteringState {
            energy: 2.6,
            energy_r,
            energy_i,
            k: (Complex64::new(energy_r, energy_i) * 2.0).sqrt(),
            k_in: Vector2::new(0.12, 0.05),
            l_max,
            epsilon: 1e-4,
            order,
            factors,
        }
    }

    fn active(
        state: &ScatteringState,
        lattice: &Lattice2,
        indices: &[(i32, i32)],
    ) -> Vec<ActiveBeam> {
        let (b1, b2) = lattice.reciprocal();
        indices
            .iter()
            .map(|&(n1, n2)| {
                let g = b1 * n1 as f64 + b2 * n2 as f64;
                let k_par = state.k_in + g;
                ActiveBeam {
                    beam: Beam {
                        ind_1: n1 as f64,
                        ind_2: n2 as f64,
                        super_1: n1,
                        super_2: n2,
                        g,
                        set: 0,
                    },
                    k_par,
                    k_z: state.k_z(&k_par),
                }
            })
            .collect()
    }

    fn layer(atoms: Vec<Atom>, lattice: Lattice2) -> Layer {
        Layer {
            index: 0,
            atoms,
            lattice,
            relative_area: 1.0,
            periodic: true,
            vec_from_last: Vector3::zeros(),
            vec_to_next: Vector3::zeros(),
        }
    }

    fn square() -> Lattice2 {
        Lattice2::new(Vector2::new(4.5, 0.0), Vector2::new(0.0, 4.5))
    }

    #[test]
    fn layer_without_scattering_only_propagates() {
        let silent = TypeFactors::Diagonal(vec![Complex64::new(0.0, 0.0); 3]);
        let state = state(vec![silent], 2, ScatteringOrder::Full);
        let coupling = CouplingTable::new(2);
        let lattice = square();
        let beams = active(&state, &lattice, &[(0, 0), (1, 0), (0, 1), (-1, -1)]);

        let single = layer(vec![Atom::new(0, Vector3::zeros())], lattice);
        let mut cache = PropagatorCache::new();
        let m = scatter_layer(&state, &single, &beams, &state.k_in, &coupling, &mut cache).unwrap();
        let identity = ComplexMatrix::identity(beams.len());
        assert!(m.tpp.max_abs_diff(&identity).unwrap() < TOLERANCE);
        assert!(m.tmm.max_abs_diff(&identity).unwrap() < TOLERANCE);
        assert!(m.rpm.max_abs() < TOLERANCE);
        assert!(m.rmp.max_abs() < TOLERANCE);

        let thick = layer(
            vec![Atom::new(0, Vector3::zeros()), Atom::new(0, Vector3::new(1.0, 1.5, 1.2))],
            lattice,
        );
        let mut cache = PropagatorCache::new();
        let m = scatter_layer(&state, &thick, &beams, &state.k_in, &coupling, &mut cache).unwrap();
        for (g, beam) in beams.iter().enumerate() {
            let expected = (Complex64::new(0.0, 1.2) * beam.k_z).exp();
            assert!((m.tpp[(g, g)] - expected).norm() < TOLERANCE);
            assert!((m.tmm[(g, g)] - expected).norm() < TOLERANCE);
        }
        assert!(m.rpm.max_abs() < TOLERANCE);
    }

    #[test]
    fn single_scattering_reflection_is_kinematic() {
        let t0 = atomic_t(&[0.8])[0];
        let state = state(vec![TypeFactors::Diagonal(vec![t0])], 0, ScatteringOrder::Single);
        let lattice = square();
        let beams = active(&state, &lattice, &[(0, 0), (1, 0), (0, -1)]);
        let single = layer(vec![Atom::new(0, Vector3::zeros())], lattice);

        let coupling = CouplingTable::new(0);
        let mut cache = PropagatorCache::new();
        let m = scatter_layer(&state, &single, &beams, &state.k_in, &coupling, &mut cache).unwrap();
        for (row, beam) in beams.iter().enumerate() {
            let expected =
                Complex64::new(0.0, 2.0 * PI) * t0 / (state.k * lattice.area() * beam.k_z);
            for col in 0..beams.len() {
                assert!((m.rpm[(row, col)] - expected).norm() < TOLERANCE);
                assert!((m.rmp[(row, col)] - expected).norm() < TOLERANCE);
            }
        }
        let identity = ComplexMatrix::identity(beams.len());
        assert!(m.tpp.max_abs_diff(&identity).unwrap() < TOLERANCE);
    }

    #[test]
    fn composite_cell_reproduces_primitive_layer() {
        let t = atomic_t(&[1.1, 0.6, 0.2]);
        let state = state(vec![TypeFactors::Diagonal(t)], 2, ScatteringOrder::Full);
        let coupling = CouplingTable::new(2);
        let primitive = square();
        let doubled = Lattice2::new(primitive.a1 * 2.0, primitive.a2);

        let integer = [(0, 0), (1, 0), (0, 1), (-1, 0), (0, -1)];
        let primitive_beams = active(&state, &primitive, &integer);
        let reference = scatter_layer(
            &state,
            &layer(vec![Atom::new(0, Vector3::zeros())], primitive),
            &primitive_beams,
            &state.k_in,
            &coupling,
            &mut PropagatorCache::new(),
        )
        .unwrap();

        // Same beams in the doubled cell's indexing, plus two half-order beams.
        let doubled_indices = [(0, 0), (2, 0), (0, 1), (-2, 0), (0, -1), (1, 0), (-1, 0)];
        let doubled_beams = active(&state, &doubled, &doubled_indices);
        let atoms = vec![
            Atom::new(0, Vector3::zeros()),
            Atom::new(0, Vector3::new(primitive.a1.x, primitive.a1.y, 0.0)),
        ];
        let composite = scatter_layer(
            &state,
            &layer(atoms, doubled),
            &doubled_beams,
            &state.k_in,
            &coupling,
            &mut PropagatorCache::new(),
        )
        .unwrap();

        for row in 0..integer.len() {
            for col in 0..integer.len() {
                for (a, b) in [
                    (&composite.rpm, &reference.rpm),
                    (&composite.rmp, &reference.rmp),
                    (&composite.tpp, &reference.tpp),
                    (&composite.tmm, &reference.tmm),
                ] {
                    assert!((a[(row, col)] - b[(row, col)]).norm() < 1e-8);
                }
            }
            for half in integer.len()..doubled_indices.len() {
                assert!(composite.rpm[(half, row)].norm() < 1e-8);
                assert!(composite.rmp[(row, half)].norm() < 1e-8);
            }
        }
    }

    #[test]
    fn cutoff_drops_weak_partial_waves() {
        let t = atomic_t(&[0.9, 0.3, 1e-6, 1e-7]);
        let state = state(vec![TypeFactors::Diagonal(t)], 3, ScatteringOrder::Full);
        let l = layer(vec![Atom::new(0, Vector3::zeros())], square());
        assert_eq!(layer_l_max(&state, &l).unwrap(), 1);

        let missing = layer(vec![Atom::new(4, Vector3::zeros())], square());
        assert!(matches!(
            layer_l_max(&state, &missing),
            Err(EngineError::MissingScatteringType(4))
        ));
    }

    #[test]
    fn nearly_coplanar_leading_plane_is_inverted_without_parity_split() {
        let t = atomic_t(&[1.1, 0.6, 0.2]);
        let l_max = 2;
        let state = state(vec![TypeFactors::Diagonal(t.clone())], l_max, ScatteringOrder::Full);
        let coupling = CouplingTable::new(l_max);
        let lattice = Lattice2::new(Vector2::new(9.0, 0.0), Vector2::new(0.0, 4.5));
        let x = TypeFactors::Diagonal(t)
            .to_matrix(l_max)
            .scale(Complex64::new(-0.5, 0.0) / state.k);

        for (dz, split) in [(0.0, true), (5e-5, false), (9e-5, false)] {
            let atoms = vec![
                Atom::new(0, Vector3::zeros()),
                Atom::new(0, Vector3::new(4.5, 0.0, dz)),
            ];
            let (ordered, leading) = order_by_sub_plane(&atoms);
            assert_eq!(leading, 2);

            let parity = parity_split(&state, &ordered, leading, l_max);
            assert_eq!(parity.is_some(), split, "dz = {dz}");

            let sites: Vec<(&Atom, &ComplexMatrix)> = ordered.iter().map(|&a| (a, &x)).collect();
            let giant = assemble_giant_matrix(
                &state,
                &layer(atoms.clone(), lattice),
                &sites,
                l_max,
                &state.k_in,
                &coupling,
                &mut PropagatorCache::new(),
            )
            .unwrap();
            let n_lm = lm_count(l_max);
            let partitioned =
                invert_partitioned(&giant, leading * n_lm, parity.as_deref()).unwrap();
            let full = giant.invert().unwrap();
            assert!(partitioned.max_abs_diff(&full).unwrap() < TOLERANCE, "dz = {dz}");
        }
    }

    #[test]
    fn leading_sub_plane_is_the_most_populated() {
        let atoms = vec![
            Atom::new(0, Vector3::new(0.0, 0.0, 0.0)),
            Atom::new(1, Vector3::new(1.0, 0.0, 1.0)),
            Atom::new(1, Vector3::new(2.0, 0.0, 1.0)),
        ];
        let (ordered, leading) = order_by_sub_plane(&atoms);
        assert_eq!(leading, 2);
        assert_eq!(ordered.len(), 3);
        assert!(ordered[..2].iter().all(|a| a.position.z == 1.0));
        assert_eq!(ordered[2].scattering_type, 0);
    }
}
