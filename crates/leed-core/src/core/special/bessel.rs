use num_complex::Complex64;

const SMALL_ARGUMENT: f64 = 1e-12;
const RESCALE_LIMIT: f64 = 1e250;

/// Spherical Hankel functions of the first kind `h_l(z)` for `l = 0..=l_max`.
///
/// `h_0(z) = -i e^{iz} / z`; higher orders follow from the upward recurrence
/// `h_{l+1} = (2l+1)/z h_l - h_{l-1}`, which is stable for `h_l`.
pub fn hankel1(l_max: usize, z: Complex64) -> Vec<Complex64> {
    let i = Complex64::new(0.0, 1.0);
    let mut h = Vec::with_capacity(l_max + 1);
    let exp_iz = (i * z).exp();
    let h0 = -i * exp_iz / z;
    h.push(h0);
    if l_max == 0 {
        return h;
    }
    let h1 = -exp_iz * (z + i) / (z * z);
    h.push(h1);
    for l in 1..l_max {
        let next = h[l] * ((2 * l + 1) as f64) / z - h[l - 1];
        h.push(next);
    }
    h
}

/// Spherical Bessel functions `j_l(x)` for real `x` and `l = 0..=l_max`.
///
/// Uses the upward recurrence when `x > l_max` and Miller's downward recurrence
/// otherwise, normalised against `j_0` or `j_1`.
pub fn spherical_bessel_j(l_max: usize, x: f64) -> Vec<f64> {
    let mut j = vec![0.0; l_max + 1];
    if x.abs() < SMALL_ARGUMENT {
        j[0] = 1.0;
        return j;
    }

    let j0 = x.sin() / x;
    let j1 = x.sin() / (x * x) - x.cos() / x;

    if x > l_max as f64 {
        j[0] = j0;
        if l_max > 0 {
            j[1] = j1;
        }
        for l in 1..l_max {
            j[l + 1] = ((2 * l + 1) as f64) / x * j[l] - j[l - 1];
        }
        return j;
    }

    let start = l_max + 16 + x.abs() as usize;
    let mut upper = 0.0;
    let mut current = 1e-30;
    let mut unnormalised = vec![0.0; start + 1];
    unnormalised[start] = current;
    for l in (1..=start).rev() {
        let lower = ((2 * l + 1) as f64) / x * current - upper;
        upper = current;
        current = lower;
        unnormalised[l - 1] = current;
        if current.abs() > RESCALE_LIMIT {
            let factor = 1.0 / current.abs();
            upper *= factor;
            current *= factor;
            for value in unnormalised.iter_mut().skip(l - 1) {
                *value *= factor;
            }
        }
    }

    let scale = if j0.abs() >= j1.abs() {
        j0 / unnormalised[0]
    } else {
        j1 / unnormalised[1]
    };
    for (l, value) in j.iter_mut().enumerate() {
        *value = unnormalised[l] * scale;
    }
    j
}

/// Modified spherical Bessel functions of the first kind `i_l(x)`, `x >= 0`.
///
/// Downward recurrence `i_{l-1} = i_{l+1} + (2l+1)/x i_l`, normalised against
/// `i_0(x) = sinh(x) / x`.
pub fn modified_spherical_bessel_i(l_max: usize, x: f64) -> Vec<f64> {
    let mut values = vec![0.0; l_max + 1];
    if x.abs() < SMALL_ARGUMENT {
        values[0] = 1.0;
        return values;
    }

    let start = l_max + 16 + x.abs() as usize;
    let mut upper = 0.0;
    let mut current = 1e-30;
    let mut unnormalised = vec![0.0; start + 1];
    unnormalised[start] = current;
    for l in (1..=start).rev() {
        let lower = upper + ((2 * l + 1) as f64) / x * current;
        upper = current;
        current = lower;
        unnormalised[l - 1] = current;
        if current.abs() > RESCALE_LIMIT {
            let factor = 1.0 / current.abs();
            upper *= factor;
            current *= factor;
            for value in unnormalised.iter_mut().skip(l - 1) {
                *value *= factor;
            }
        }
    }

    let i0 = x.sinh() / x;
    let scale = i0 / unnormalised[0];
    for (l, value) in values.iter_mut().enumerate() {
        *value = unnormalised[l] * scale;
    }
    values
}
