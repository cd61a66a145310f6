use crate::core::constants::HARTREE_EV;
use crate::core::io::intensities::IvTable;
use crate::core::models::beam::BeamList;
use crate::core::models::crystal::SurfaceModel;
use crate::core::special::CouplingTable;
use crate::engine::beams::{generate, output_beams};
use crate::engine::config::{EngineConfig, FailurePolicy};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::tasks::energy::{EnergyPoint, compute_one_energy};
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Result of a complete run.
#[derive(Debug, Clone)]
pub struct IvCurves {
    /// Intensities of the output beams, one row per computed energy.
    pub table: IvTable,
    /// The output beams, in column order.
    pub beams: BeamList,
    /// Energies (Hartree) dropped under [`FailurePolicy::Skip`], with the reason.
    pub skipped: Vec<(f64, String)>,
}

#[instrument(skip_all, name = "iv_curves_workflow")]
pub fn run(
    model: &SurfaceModel,
    config: &EngineConfig,
    reporter: &ProgressReporter,
) -> Result<IvCurves, EngineError> {
    // === Phase 0: Preparation ===
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    let energies = config.energies.energies();
    let beams = generate(model, config);
    let output = output_beams(&beams, config);
    let coupling = Arc::new(CouplingTable::new(config.l_max));
    info!(
        energies = energies.len(),
        beams = beams.len(),
        output_beams = output.len(),
        l_max = config.l_max,
        order = ?config.order,
        "Prepared run."
    );
    reporter.report(Progress::PhaseFinish);

    // === Phase 1: Energy loop ===
    reporter.report(Progress::PhaseStart {
        name: "Energy Loop",
    });
    reporter.report(Progress::TaskStart {
        total_energies: energies.len() as u64,
    });

    #[cfg(not(feature = "parallel"))]
    let iterator = energies.iter();

    #[cfg(feature = "parallel")]
    let iterator = energies.par_iter();

    let results: Vec<Result<EnergyPoint, EngineError>> = iterator
        .map(|&energy| {
            let result = compute_one_energy(model, &beams, &output, &coupling, config, energy);
            match &result {
                Ok(point) => reporter.report(Progress::EnergyFinished {
                    energy_ev: energy * HARTREE_EV,
                    active_beams: point.active_beams,
                }),
                Err(e) => reporter.report(Progress::EnergySkipped {
                    energy_ev: energy * HARTREE_EV,
                    reason: e.to_string(),
                }),
            }
            result
        })
        .collect();

    reporter.report(Progress::TaskFinish);

    // === Phase 2: Merge in energy order ===
    let mut table = IvTable::new(&output.beams);
    let mut skipped = Vec::new();
    for (&energy, result) in energies.iter().zip(results) {
        match result {
            Ok(point) => table.push(point.energy, point.intensities),
            Err(e) => match config.failure_policy {
                FailurePolicy::Abort => return Err(e),
                FailurePolicy::Skip => {
                    warn!(energy_ev = energy * HARTREE_EV, error = %e, "Skipping energy point.");
                    skipped.push((energy, e.to_string()));
                }
            },
        }
    }
    reporter.report(Progress::PhaseFinish);

    info!(
        computed = table.energies.len(),
        skipped = skipped.len(),
        "IV curve calculation finished."
    );
    Ok(IvCurves {
        table,
        beams: output,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::builder::LayerBuilder;
    use crate::core::models::crystal::OpticalPotential;
    use crate::core::models::phase_shift::{
        Displacement, PhaseShiftData, PhaseShiftSet, TMatrixKind,
    };
    use crate::engine::config::{DoublingConfig, EnergyRange, EngineConfigBuilder, Incidence};
    use nalgebra::Vector3;
    use std::sync::Mutex;

    fn model() -> SurfaceModel {
        let mut phase_shifts = PhaseShiftSet::new();
        phase_shifts.register(
            "test",
            Arc::new(PhaseShiftData {
                energies: vec![0.1, 20.0],
                shifts: vec![vec![0.6, 0.3, 0.1], vec![0.4, 0.5, 0.2]],
                l_max: 2,
            }),
            Displacement::STATIC,
            TMatrixKind::Diagonal,
        );
        let mut builder = LayerBuilder::new(
            Vector3::new(4.7, 0.0, 0.0),
            Vector3::new(0.0, 4.7, 0.0),
            Vector3::new(0.0, 0.0, -3.3),
        );
        builder
            .potential(OpticalPotential {
                real: -0.4,
                imaginary: 0.15,
                exponent: 0.0,
            })
            .add_bulk_atom(Atom::new(0, Vector3::zeros()));
        builder.build(phase_shifts).unwrap()
    }

    fn config(policy: FailurePolicy, doubling: DoublingConfig) -> EngineConfig {
        EngineConfigBuilder::new()
            .energies(EnergyRange { start: 1.5, end: 2.5, step: 0.25 })
            .incidence(Incidence { polar: 0.05, azimuth: 0.0 })
            .l_max(2)
            .doubling(doubling)
            .failure_policy(policy)
            .build()
            .unwrap()
    }

    #[test]
    fn curves_are_ordered_by_energy_and_progress_is_reported() {
        let finished = Mutex::new(0usize);
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::EnergyFinished { .. } = event {
                *finished.lock().unwrap() += 1;
            }
        }));
        let config = config(FailurePolicy::Abort, DoublingConfig::default());
        let curves = run(&model(), &config, &reporter).unwrap();
        drop(reporter);

        assert_eq!(curves.table.energies, config.energies.energies());
        assert_eq!(finished.into_inner().unwrap(), 5);
        assert!(curves.skipped.is_empty());
        assert_eq!(curves.table.beams.len(), curves.beams.len());
        for row in &curves.table.intensities {
            assert_eq!(row.len(), curves.beams.len());
            assert!(row[0] > 0.0);
        }
    }

    #[test]
    fn failure_policy_decides_between_abort_and_skip() {
        let strict = DoublingConfig { tolerance: 1e-14, max_doublings: 1 };
        let result = run(&model(), &config(FailurePolicy::Abort, strict), &ProgressReporter::new());
        assert!(matches!(result, Err(EngineError::ConvergenceFailure { .. })));

        let skip = config(FailurePolicy::Skip, strict);
        let curves = run(&model(), &skip, &ProgressReporter::new()).unwrap();
        assert!(curves.table.energies.is_empty());
        assert_eq!(curves.skipped.len(), 5);
    }
}
