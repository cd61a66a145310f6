use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RFactorError {
    #[error("Curves have different lengths ({0} vs {1})")]
    LengthMismatch(usize, usize),
    #[error("Cannot compare empty curves")]
    Empty,
    #[error("Curve needs at least two points for interpolation (got {0})")]
    TooShort(usize),
    #[error("No beam of the theoretical table appears in the experimental table")]
    NoCommonBeams,
    #[error("Theoretical and experimental curves do not overlap for any energy shift")]
    NoOverlap,
    #[error("Invalid comparison parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Mean square deviation between two intensity vectors on a common grid.
///
/// # Errors
///
/// Returns an error if the vectors are empty or differ in length.
pub fn mean_square_error(reference: &[f64], candidate: &[f64]) -> Result<f64, RFactorError> {
    if reference.len() != candidate.len() {
        return Err(RFactorError::LengthMismatch(reference.len(), candidate.len()));
    }
    if reference.is_empty() {
        return Err(RFactorError::Empty);
    }
    let sum: f64 = reference
        .iter()
        .zip(candidate)
        .map(|(a, b)| (a - b).powi(2))
        .sum();
    Ok(sum / reference.len() as f64)
}

/// Resamples a curve onto `grid` with a cubic Hermite spline.
///
/// Slopes are finite differences of the data (central inside, one-sided at
/// the ends). Grid energies outside the curve take the nearest end value.
///
/// # Errors
///
/// Returns [`RFactorError::TooShort`] for curves with fewer than two points.
pub fn hermite_resample(curve: &[(f64, f64)], grid: &[f64]) -> Result<Vec<f64>, RFactorError> {
    let n = curve.len();
    if n < 2 {
        return Err(RFactorError::TooShort(n));
    }
    let secant = |a: usize, b: usize| (curve[b].1 - curve[a].1) / (curve[b].0 - curve[a].0);
    let slopes: Vec<f64> = (0..n)
        .map(|i| match i {
            0 => secant(0, 1),
            i if i == n - 1 => secant(n - 2, n - 1),
            i => secant(i - 1, i + 1),
        })
        .collect();

    let values = grid
        .iter()
        .map(|&e| {
            if e <= curve[0].0 {
                return curve[0].1;
            }
            if e >= curve[n - 1].0 {
                return curve[n - 1].1;
            }
            let k = curve.partition_point(|p| p.0 <= e).saturating_sub(1).min(n - 2);
            let (e0, y0) = curve[k];
            let (e1, y1) = curve[k + 1];
            let h = e1 - e0;
            let t = (e - e0) / h;
            let (t2, t3) = (t * t, t * t * t);
            (2.0 * t3 - 3.0 * t2 + 1.0) * y0
                + (t3 - 2.0 * t2 + t) * h * slopes[k]
                + (-2.0 * t3 + 3.0 * t2) * y1
                + (t3 - t2) * h * slopes[k + 1]
        })
        .collect();
    Ok(values)
}

/// Scales intensities to unit mean. All-zero curves are returned unchanged.
pub fn normalize_mean(values: &[f64]) -> Vec<f64> {
    let mean = values.iter().sum::<f64>() / values.len().max(1) as f64;
    if mean.abs() < f64::MIN_POSITIVE {
        return values.to_vec();
    }
    values.iter().map(|v| v / mean).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_square_error_of_known_vectors() {
        let mse = mean_square_error(&[1.0, 2.0, 3.0, 4.0], &[1.0, 2.0, 5.0, 2.0]).unwrap();
        assert!((mse - 2.0).abs() < 1e-12);
        assert_eq!(mean_square_error(&[0.5; 3], &[0.5; 3]).unwrap(), 0.0);
    }

    #[test]
    fn mean_square_error_rejects_bad_input() {
        assert_eq!(
            mean_square_error(&[1.0], &[1.0, 2.0]),
            Err(RFactorError::LengthMismatch(1, 2))
        );
        assert_eq!(mean_square_error(&[], &[]), Err(RFactorError::Empty));
    }

    #[test]
    fn hermite_resample_hits_nodes_and_reproduces_lines() {
        let line: Vec<(f64, f64)> = (0..6).map(|i| (i as f64, 2.0 * i as f64 - 1.0)).collect();
        let grid = [0.0, 0.25, 1.5, 3.0, 4.9, 5.0];
        let values = hermite_resample(&line, &grid).unwrap();
        for (e, v) in grid.iter().zip(values) {
            assert!((v - (2.0 * e - 1.0)).abs() < 1e-12, "E = {e}");
        }
    }

    #[test]
    fn hermite_resample_clamps_outside_and_needs_two_points() {
        let curve = [(1.0, 4.0), (2.0, 6.0)];
        let values = hermite_resample(&curve, &[0.0, 3.0]).unwrap();
        assert_eq!(values, vec![4.0, 6.0]);
        assert_eq!(
            hermite_resample(&[(1.0, 4.0)], &[1.0]),
            Err(RFactorError::TooShort(1))
        );
    }

    #[test]
    fn normalization_gives_unit_mean() {
        let scaled = normalize_mean(&[2.0, 4.0, 6.0]);
        assert!((scaled.iter().sum::<f64>() / 3.0 - 1.0).abs() < 1e-12);
        assert_eq!(normalize_mean(&[0.0, 0.0]), vec![0.0, 0.0]);
    }
}
