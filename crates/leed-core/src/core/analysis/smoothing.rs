/// Convolutes an IV curve with a Lorentzian of half-width `width`.
///
/// The curve is given as `(energy, intensity)` pairs on its own energy grid;
/// the result lives on the same grid. Each point is the Lorentzian-weighted
/// mean of all intensities, so a constant curve is left unchanged.
pub fn lorentzian_smoothing(curve: &[(f64, f64)], width: f64) -> Vec<(f64, f64)> {
    let w2 = width * width;
    curve
        .iter()
        .map(|&(e_j, _)| {
            let (norm, sum) = curve.iter().fold((0.0, 0.0), |(norm, sum), &(e_i, i_i)| {
                let weight = w2 / ((e_i - e_j).powi(2) + w2);
                (norm + weight, sum + weight * i_i)
            });
            (e_j, sum / norm)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_curve_is_unchanged() {
        let curve: Vec<(f64, f64)> = (0..20).map(|i| (i as f64 * 0.1, 3.5)).collect();
        for (e, i) in lorentzian_smoothing(&curve, 0.15) {
            assert!((i - 3.5).abs() < 1e-12, "E = {e}");
        }
    }

    #[test]
    fn peak_is_broadened_and_keeps_its_grid() {
        let curve: Vec<(f64, f64)> = (0..41)
            .map(|i| {
                let e = i as f64 * 0.05;
                (e, if i == 20 { 1.0 } else { 0.0 })
            })
            .collect();
        let smoothed = lorentzian_smoothing(&curve, 0.1);

        assert_eq!(smoothed.len(), curve.len());
        assert!(smoothed.iter().zip(&curve).all(|(s, c)| s.0 == c.0));
        assert!(smoothed[20].1 < 1.0);
        assert!(smoothed[19].1 > 0.0 && smoothed[21].1 > 0.0);
        assert!((smoothed[19].1 - smoothed[21].1).abs() < 1e-12);
        assert!(smoothed[20].1 > smoothed[19].1 && smoothed[19].1 > smoothed[15].1);
    }

    #[test]
    fn empty_curve_stays_empty() {
        assert!(lorentzian_smoothing(&[], 0.1).is_empty());
    }
}
