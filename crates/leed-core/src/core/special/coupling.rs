use super::harmonics::{lm_count, lm_from_index, lm_index};
use std::f64::consts::PI;

/// Natural logarithms of `n!` for `n < len`.
fn log_factorials(len: usize) -> Vec<f64> {
    let mut table = Vec::with_capacity(len);
    let mut acc = 0.0;
    table.push(0.0);
    for n in 1..len {
        acc += (n as f64).ln();
        table.push(acc);
    }
    table
}

/// Wigner 3j symbol `(j1 j2 j3; m1 m2 m3)` for integer arguments (Racah formula).
///
/// Returns zero whenever the selection rules are violated.
pub fn wigner_3j(j1: i32, j2: i32, j3: i32, m1: i32, m2: i32, m3: i32) -> f64 {
    if m1 + m2 + m3 != 0 {
        return 0.0;
    }
    if j1 < 0 || j2 < 0 || j3 < 0 {
        return 0.0;
    }
    if m1.abs() > j1 || m2.abs() > j2 || m3.abs() > j3 {
        return 0.0;
    }
    if j3 < (j1 - j2).abs() || j3 > j1 + j2 {
        return 0.0;
    }

    let lf = log_factorials((j1 + j2 + j3 + 2) as usize);
    let f = |n: i32| lf[n as usize];

    let log_triangle = f(j1 + j2 - j3) + f(j1 - j2 + j3) + f(-j1 + j2 + j3) - f(j1 + j2 + j3 + 1);
    let log_prefactor = 0.5
        * (log_triangle
            + f(j1 + m1)
            + f(j1 - m1)
            + f(j2 + m2)
            + f(j2 - m2)
            + f(j3 + m3)
            + f(j3 - m3));

    let k_min = 0.max(j2 - j3 - m1).max(j1 - j3 + m2);
    let k_max = (j1 + j2 - j3).min(j1 - m1).min(j2 + m2);

    let mut sum = 0.0;
    for k in k_min..=k_max {
        let log_denominator = f(k)
            + f(j3 - j2 + k + m1)
            + f(j3 - j1 + k - m2)
            + f(j1 + j2 - j3 - k)
            + f(j1 - k - m1)
            + f(j2 - k + m2);
        let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
        sum += sign * (log_prefactor - log_denominator).exp();
    }

    let phase = if (j1 - j2 - m3).rem_euclid(2) == 0 { 1.0 } else { -1.0 };
    phase * sum
}

/// Gaunt coefficient `∫ Y_{l1 m1} Y_{l2 m2} Y_{l3 m3} dΩ`.
pub fn gaunt(l1: i32, m1: i32, l2: i32, m2: i32, l3: i32, m3: i32) -> f64 {
    if m1 + m2 + m3 != 0 || (l1 + l2 + l3) % 2 != 0 {
        return 0.0;
    }
    let norm = (((2 * l1 + 1) * (2 * l2 + 1) * (2 * l3 + 1)) as f64 / (4.0 * PI)).sqrt();
    norm * wigner_3j(l1, l2, l3, 0, 0, 0) * wigner_3j(l1, l2, l3, m1, m2, m3)
}

/// Sparse table of the coupling coefficients
/// `C(L, L', L'') = ∫ Y_L Y*_{L'} Y*_{L''} dΩ` used by the lattice-sum
/// propagators and the thermal displacement operators.
///
/// Entries exist for `l, l' <= l_max` and `l'' <= 2 l_max`. Only the non-zero
/// terms are stored; for a given pair `m'' = m - m'` and `l + l' + l''` is even.
#[derive(Debug, Clone)]
pub struct CouplingTable {
    l_max: usize,
    entries: Vec<Vec<(usize, f64)>>,
}

impl CouplingTable {
    pub fn new(l_max: usize) -> Self {
        let n = lm_count(l_max);
        let mut entries = Vec::with_capacity(n * n);
        for index in 0..n {
            let (l, m) = lm_from_index(index);
            for index_p in 0..n {
                let (lp, mp) = lm_from_index(index_p);
                let mpp = m - mp;
                let l_low = (l as i32 - lp as i32).unsigned_abs() as usize;
                let mut terms = Vec::new();
                for lpp in (l_low..=(l + lp)).step_by(2) {
                    if mpp.unsigned_abs() as usize > lpp {
                        continue;
                    }
                    let sign = if (mp + mpp).rem_euclid(2) == 0 { 1.0 } else { -1.0 };
                    let value = sign
                        * gaunt(l as i32, m, lp as i32, -mp, lpp as i32, -mpp);
                    if value.abs() > 1e-15 {
                        terms.push((lm_index(lpp, mpp), value));
                    }
                }
                entries.push(terms);
            }
        }
        Self { l_max, entries }
    }

    pub fn l_max(&self) -> usize {
        self.l_max
    }

    /// Non-zero `(L'' index, C(L, L', L''))` terms for the flat indices `L`, `L'`.
    #[inline]
    pub fn coefficients(&self, index: usize, index_p: usize) -> &[(usize, f64)] {
        &self.entries[index * lm_count(self.l_max) + index_p]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    #[test]
    fn three_j_symbols_match_tabulated_values() {
        assert!((wigner_3j(1, 1, 0, 0, 0, 0) + 1.0 / 3.0_f64.sqrt()).abs() < TOLERANCE);
        assert!((wigner_3j(1, 1, 2, 0, 0, 0) - (2.0 / 15.0_f64).sqrt()).abs() < TOLERANCE);
        assert!((wigner_3j(1, 1, 1, 1, -1, 0) - 1.0 / 6.0_f64.sqrt()).abs() < TOLERANCE);
        assert_eq!(wigner_3j(1, 1, 3, 0, 0, 0), 0.0);
        assert_eq!(wigner_3j(2, 1, 1, 1, 1, 0), 0.0);
    }

    #[test]
    fn three_j_orthogonality_holds() {
        let (j1, j2) = (3, 2);
        for j3 in 1..=5 {
            let total: f64 = (-j1..=j1)
                .flat_map(|m1| (-j2..=j2).map(move |m2| (m1, m2)))
                .map(|(m1, m2)| wigner_3j(j1, j2, j3, m1, m2, -m1 - m2).powi(2))
                .sum();
            assert!((total - 1.0).abs() < 1e-10, "j3 = {j3}: {total}");

            for m3 in -j3..=j3 {
                let fixed: f64 = (-j1..=j1)
                    .map(|m1| wigner_3j(j1, j2, j3, m1, -m1 - m3, m3).powi(2))
                    .sum();
                assert!((fixed - 1.0 / (2 * j3 + 1) as f64).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn gaunt_with_monopole_is_orthonormality() {
        let y00 = 1.0 / (4.0 * PI).sqrt();
        assert!((gaunt(2, 1, 2, -1, 0, 0) + y00).abs() < TOLERANCE);
        assert!((gaunt(3, 0, 3, 0, 0, 0) - y00).abs() < TOLERANCE);
    }

    #[test]
    fn table_reproduces_orthonormality_through_l_zero() {
        let table = CouplingTable::new(3);
        let y00 = 1.0 / (4.0 * PI).sqrt();
        for index in 0..lm_count(3) {
            let terms = table.coefficients(index, index);
            let monopole = terms
                .iter()
                .find(|(lpp, _)| *lpp == 0)
                .map(|(_, c)| *c)
                .unwrap_or(0.0);
            assert!((monopole - y00).abs() < TOLERANCE, "index {index}");
        }
    }

    #[test]
    fn table_terms_respect_selection_rules() {
        let table = CouplingTable::new(2);
        for index in 0..lm_count(2) {
            let (l, m) = lm_from_index(index);
            for index_p in 0..lm_count(2) {
                let (lp, mp) = lm_from_index(index_p);
                for &(lpp_index, _) in table.coefficients(index, index_p) {
                    let (lpp, mpp) = lm_from_index(lpp_index);
                    assert_eq!(mpp, m - mp);
                    assert_eq!((l + lp + lpp) % 2, 0);
                    assert!(lpp <= 4);
                }
            }
        }
    }
}
