use crate::core::constants::{HARTREE_EV, K_TOLERANCE, POTENTIAL_STEP_HEIGHT};
use crate::core::linalg::{ComplexMatrix, ElementKind};
use crate::core::models::beam::{ActiveBeams, BeamList};
use crate::core::models::crystal::{Crystal, SurfaceModel};
use crate::core::models::layer::Layer;
use crate::core::special::CouplingTable;
use crate::engine::beams::{group_by_set, select};
use crate::engine::cache::PropagatorCache;
use crate::engine::composite::{LayerMatrices, scatter_layer};
use crate::engine::config::EngineConfig;
use crate::engine::doubling::{
    combine, combine_reflection, double_until_converged, intensities, terminal_potential_step,
};
use crate::engine::error::EngineError;
use crate::engine::state::ScatteringState;
use nalgebra::Vector3;
use tracing::{debug, instrument};

/// Intensities of the output beams at one energy.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyPoint {
    /// Vacuum energy in Hartree.
    pub energy: f64,
    pub active_beams: usize,
    /// One entry per output beam, in output order.
    pub intensities: Vec<f64>,
}

/// Runs the full scattering calculation at vacuum energy `energy` (Hartree).
///
/// `beams` is the run's complete beam list; `output` the beams whose
/// intensities are reported. Output beams that are not active at this energy
/// get zero intensity.
#[instrument(skip_all, fields(energy_ev = energy * HARTREE_EV))]
pub fn compute_one_energy(
    model: &SurfaceModel,
    beams: &BeamList,
    output: &BeamList,
    coupling: &CouplingTable,
    config: &EngineConfig,
    energy: f64,
) -> Result<EnergyPoint, EngineError> {
    // === Phase 1: Scattering factors ===
    let state = ScatteringState::update(
        &model.bulk.potential,
        config,
        &model.phase_shifts,
        coupling,
        energy,
    )?;

    // === Phase 2: Beam selection ===
    let active = select(beams, &state, model.min_layer_distance());
    if active.is_empty() {
        return Err(EngineError::NoActiveBeams {
            energy_ev: energy * HARTREE_EV,
        });
    }

    // === Phase 3: Semi-infinite bulk, one beam set at a time ===
    let mut reflection = bulk_reflection(&model.bulk, &state, &active, coupling, config)?;

    // === Phase 4: Overlayer ===
    let over = &model.overlayer.layers;
    if let (Some(first), Some(bulk_top)) = (over.first(), model.bulk.layers.last()) {
        let mut cache = PropagatorCache::new();
        let mut v = bulk_top.vec_to_next + first.vec_from_last;
        for layer in over {
            if layer.index > 0 {
                v = layer.vec_from_last;
            }
            let matrices =
                scatter_layer(&state, layer, &active.beams, &state.k_in, coupling, &mut cache)?;
            reflection =
                combine_reflection(&reflection, &matrices, &active.beams, &v, state.order)?;
        }
    }

    // === Phase 5: Potential step and intensities ===
    let step = Vector3::new(0.0, 0.0, POTENTIAL_STEP_HEIGHT);
    let amplitudes = terminal_potential_step(&reflection, &active.beams, &state, &step, 0)?;
    let active_intensities = intensities(&amplitudes);

    let intensities = output
        .iter()
        .map(|beam| {
            active
                .beams
                .iter()
                .position(|a| a.beam.matches(beam.ind_1, beam.ind_2, K_TOLERANCE))
                .map_or(0.0, |i| active_intensities[i])
        })
        .collect();

    Ok(EnergyPoint {
        energy,
        active_beams: active.len(),
        intensities,
    })
}

/// Block-diagonal `R⁺⁻` of the semi-infinite bulk over all active beams.
fn bulk_reflection(
    bulk: &Crystal,
    state: &ScatteringState,
    active: &ActiveBeams,
    coupling: &CouplingTable,
    config: &EngineConfig,
) -> Result<ComplexMatrix, EngineError> {
    let n = active.len();
    let mut reflection = ComplexMatrix::zeros(n, n, ElementKind::Complex);
    let repeat = bulk
        .repeat_vector()
        .ok_or_else(|| EngineError::Internal("the bulk has no layers".into()))?;

    for set in 0..active.num_sets() {
        let beams = group_by_set(active, set);
        let Some(first) = beams.first() else {
            continue;
        };
        let bloch = first.k_par;
        let mut cache = PropagatorCache::new();
        let mut scatter =
            |layer: &Layer| scatter_layer(state, layer, beams, &bloch, coupling, &mut cache);

        let mut period: Option<LayerMatrices> = None;
        for layer in bulk.periodic_layers() {
            let matrices = scatter(layer)?;
            period = Some(match period {
                None => matrices,
                Some(below) => {
                    combine(&below, &matrices, beams, &layer.vec_from_last, state.order)?
                }
            });
        }
        let period = period
            .ok_or_else(|| EngineError::Internal("the bulk has no periodic layer".into()))?;
        let mut r = double_until_converged(period, beams, &repeat, state.order, &config.doubling)?;

        if let Some(terminal) = bulk.terminal_layer() {
            let matrices = scatter(terminal)?;
            r = combine_reflection(&r, &matrices, beams, &terminal.vec_from_last, state.order)?;
        }

        debug!(
            set,
            beams = beams.len(),
            bloch_x = bloch.x,
            bloch_y = bloch.y,
            "Bulk set reflection ready."
        );
        let offset = active.set_offset(set);
        reflection.insert_submatrix(&r, offset, offset)?;
    }
    Ok(reflection)
}
