use crate::core::analysis::{
    RFactorError, hermite_resample, lorentzian_smoothing, mean_square_error, normalize_mean,
};
use crate::core::constants::{HARTREE_EV, K_TOLERANCE};
use crate::core::io::intensities::IvTable;
use crate::engine::config::EnergyRange;
use tracing::{debug, info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Parameters of a curve comparison. Energies in Hartree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RFactorOptions {
    /// Half-width of the Lorentzian applied to both curve sets.
    pub width: f64,
    /// Rigid shifts added to the theoretical energies.
    pub shifts: EnergyRange,
    /// Scale each overlapping curve pair to unit mean before comparing.
    pub normalize: bool,
}

/// Deviation of one beam at the optimal shift.
#[derive(Debug, Clone, PartialEq)]
pub struct BeamRFactor {
    pub beam: (f64, f64),
    pub r_factor: f64,
    /// Number of energies in the overlap.
    pub points: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RFactorReport {
    /// Shift (Hartree) with the lowest average deviation.
    pub shift: f64,
    /// Mean of the per-beam deviations at that shift.
    pub average: f64,
    pub beams: Vec<BeamRFactor>,
}

/// A theoretical and an experimental curve of the same beam, both smoothed.
struct CurvePair {
    beam: (f64, f64),
    theory: Vec<(f64, f64)>,
    experiment: Vec<(f64, f64)>,
}

/// Compares computed IV curves against measured ones.
///
/// Beams are matched by their indices. For every shift the theoretical
/// energies are moved rigidly, both curves are cut to their common energy
/// range, the experiment is resampled onto the theoretical grid and the mean
/// square deviation is taken. The shift with the lowest average over all
/// overlapping beams wins.
///
/// # Errors
///
/// Returns an error for invalid options, when no beam is shared by the two
/// tables, or when no shift produces an overlap.
#[instrument(skip_all, name = "rfactor_workflow")]
pub fn run(
    theory: &IvTable,
    experiment: &IvTable,
    options: &RFactorOptions,
) -> Result<RFactorReport, RFactorError> {
    if options.width.is_nan() || options.width <= 0.0 {
        return Err(RFactorError::InvalidParameter {
            name: "width",
            reason: format!("must be positive (got {})", options.width),
        });
    }
    if options.shifts.end < options.shifts.start {
        return Err(RFactorError::InvalidParameter {
            name: "shifts",
            reason: "end lies below start".to_string(),
        });
    }

    let pairs = matched_curves(theory, experiment, options.width);
    if pairs.is_empty() {
        return Err(RFactorError::NoCommonBeams);
    }
    let shifts = options.shifts.energies();
    info!(beams = pairs.len(), shifts = shifts.len(), "Comparing IV curves.");

    #[cfg(not(feature = "parallel"))]
    let iterator = shifts.iter();

    #[cfg(feature = "parallel")]
    let iterator = shifts.par_iter();

    let candidates: Vec<(f64, Vec<BeamRFactor>)> = iterator
        .map(|&shift| (shift, compare_at_shift(&pairs, shift, options.normalize)))
        .collect();

    let best = candidates
        .into_iter()
        .filter(|(_, beams)| !beams.is_empty())
        .map(|(shift, beams)| {
            let average = beams.iter().map(|b| b.r_factor).sum::<f64>() / beams.len() as f64;
            debug!(shift_ev = shift * HARTREE_EV, average, "Evaluated shift.");
            RFactorReport {
                shift,
                average,
                beams,
            }
        })
        .min_by(|a, b| a.average.total_cmp(&b.average))
        .ok_or(RFactorError::NoOverlap)?;

    info!(
        shift_ev = best.shift * HARTREE_EV,
        average = best.average,
        beams = best.beams.len(),
        "Optimal energy shift found."
    );
    Ok(best)
}

fn matched_curves(theory: &IvTable, experiment: &IvTable, width: f64) -> Vec<CurvePair> {
    theory
        .beams
        .iter()
        .enumerate()
        .filter_map(|(t, &beam)| {
            let e = experiment.beams.iter().position(|&(a, b)| {
                (a - beam.0).abs() < K_TOLERANCE && (b - beam.1).abs() < K_TOLERANCE
            })?;
            Some(CurvePair {
                beam,
                theory: lorentzian_smoothing(&theory.curve(t), width),
                experiment: lorentzian_smoothing(&experiment.curve(e), width),
            })
        })
        .collect()
}

/// Per-beam deviations at one shift; beams with fewer than two overlapping
/// points are left out.
fn compare_at_shift(pairs: &[CurvePair], shift: f64, normalize: bool) -> Vec<BeamRFactor> {
    pairs
        .iter()
        .filter_map(|pair| {
            let (first, last) = (pair.experiment.first()?, pair.experiment.last()?);
            let shifted: Vec<(f64, f64)> = pair
                .theory
                .iter()
                .map(|&(e, i)| (e + shift, i))
                .filter(|&(e, _)| e >= first.0 && e <= last.0)
                .collect();
            if shifted.len() < 2 {
                return None;
            }
            let grid: Vec<f64> = shifted.iter().map(|p| p.0).collect();
            let measured = hermite_resample(&pair.experiment, &grid).ok()?;
            let computed: Vec<f64> = shifted.iter().map(|p| p.1).collect();
            let (computed, measured) = if normalize {
                (normalize_mean(&computed), normalize_mean(&measured))
            } else {
                (computed, measured)
            };
            let r_factor = mean_square_error(&measured, &computed).ok()?;
            Some(BeamRFactor {
                beam: pair.beam,
                r_factor,
                points: grid.len(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(beams: &[(f64, f64)], energies: &[f64], f: impl Fn(usize, f64) -> f64) -> IvTable {
        let mut table = IvTable {
            beams: beams.to_vec(),
            ..IvTable::default()
        };
        for &e in energies {
            table.push(e, (0..beams.len()).map(|b| f(b, e)).collect());
        }
        table
    }

    fn grid(start: f64, end: f64, step: f64) -> Vec<f64> {
        EnergyRange { start, end, step }.energies()
    }

    fn peak(center: f64) -> impl Fn(usize, f64) -> f64 {
        move |b, e| 1.0 + (b + 1) as f64 * (-(e - center).powi(2) / 0.02).exp()
    }

    fn options(start: f64, end: f64, step: f64) -> RFactorOptions {
        RFactorOptions {
            width: 0.05,
            shifts: EnergyRange { start, end, step },
            normalize: true,
        }
    }

    #[test]
    fn identical_tables_agree_at_zero_shift() {
        let t = table(&[(0.0, 0.0), (1.0, 0.0)], &grid(1.0, 3.0, 0.05), peak(2.0));
        let report = run(&t, &t, &options(-0.2, 0.2, 0.05)).unwrap();
        assert!(report.shift.abs() < 1e-9);
        assert!(report.average < 1e-20);
        assert_eq!(report.beams.len(), 2);
    }

    #[test]
    fn rigid_energy_offset_is_recovered() {
        let theory = table(&[(0.0, 0.0)], &grid(1.0, 3.0, 0.05), peak(1.9));
        let experiment = table(&[(0.0, 0.0)], &grid(1.0, 3.0, 0.02), peak(2.0));
        let report = run(&theory, &experiment, &options(-0.2, 0.2, 0.05)).unwrap();
        assert!((report.shift - 0.1).abs() < 1e-9, "shift = {}", report.shift);
        assert!(report.average < 1e-3);
    }

    #[test]
    fn beams_are_matched_by_indices_and_column_order_does_not_matter() {
        let energies = grid(1.0, 3.0, 0.05);
        let theory = table(&[(0.0, 0.0), (1.0, 0.0), (0.5, 0.5)], &energies, peak(2.0));
        let swapped = |b: usize, e: f64| peak(2.0)(1 - b, e);
        let experiment = table(&[(1.0, 0.0), (0.0, 0.0)], &energies, swapped);
        let report = run(&theory, &experiment, &options(0.0, 0.0, 0.0)).unwrap();
        assert_eq!(report.beams.len(), 2);
        assert!(report.beams.iter().all(|b| b.beam != (0.5, 0.5)));
        assert!(report.average < 1e-20);
    }

    #[test]
    fn disjoint_tables_are_rejected() {
        let theory = table(&[(0.0, 0.0)], &grid(1.0, 2.0, 0.1), peak(1.5));
        let other_beam = table(&[(2.0, 0.0)], &grid(1.0, 2.0, 0.1), peak(1.5));
        assert_eq!(
            run(&theory, &other_beam, &options(0.0, 0.0, 0.0)),
            Err(RFactorError::NoCommonBeams)
        );

        let later = table(&[(0.0, 0.0)], &grid(5.0, 6.0, 0.1), peak(5.5));
        assert_eq!(
            run(&theory, &later, &options(-0.5, 0.5, 0.25)),
            Err(RFactorError::NoOverlap)
        );
    }

    #[test]
    fn invalid_width_is_rejected() {
        let t = table(&[(0.0, 0.0)], &grid(1.0, 2.0, 0.1), peak(1.5));
        let mut bad = options(0.0, 0.0, 0.0);
        bad.width = 0.0;
        assert!(matches!(
            run(&t, &t, &bad),
            Err(RFactorError::InvalidParameter { name: "width", .. })
        ));
    }
}
