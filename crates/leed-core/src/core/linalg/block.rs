use super::matrix::{ComplexMatrix, ElementKind, MatrixError};
use num_complex::Complex64;

/// Inverts a square matrix by partitioning it into a leading `leading x leading`
/// block and the remainder (Schur complement).
///
/// With `M = [[A, B], [C, D]]` and `S = D - C A⁻¹ B`:
///
/// ```text
/// M⁻¹ = [[A⁻¹ + A⁻¹ B S⁻¹ C A⁻¹, -A⁻¹ B S⁻¹],
///        [-S⁻¹ C A⁻¹,             S⁻¹       ]]
/// ```
///
/// If `parity` is given it must have `leading` entries, and the leading block
/// must not couple indices of different parity. The block then splits into two
/// independent systems, each inverted on its own.
///
/// The result equals a full dense inversion within round-off; the partition
/// only reduces the cost when the leading block dominates.
pub fn invert_partitioned(
    matrix: &ComplexMatrix,
    leading: usize,
    parity: Option<&[bool]>,
) -> Result<ComplexMatrix, MatrixError> {
    let n = matrix.rows();
    if matrix.cols() != n {
        return Err(MatrixError::DimensionMismatch {
            operation: "invert_partitioned",
            left: matrix.shape(),
            right: (matrix.cols(), n),
        });
    }
    if leading == 0 {
        return matrix.invert();
    }
    if leading >= n {
        return invert_leading_block(matrix, parity);
    }

    let rest = n - leading;
    let a = matrix.submatrix(0, 0, leading, leading)?;
    let b = matrix.submatrix(0, leading, leading, rest)?;
    let c = matrix.submatrix(leading, 0, rest, leading)?;
    let d = matrix.submatrix(leading, leading, rest, rest)?;

    let a_inv = invert_leading_block(&a, parity)?;
    let a_inv_b = a_inv.multiply(&b)?;
    let c_a_inv = c.multiply(&a_inv)?;
    let schur = d.sub(&c.multiply(&a_inv_b)?)?;
    let s_inv = schur.invert()?;

    let minus_one = Complex64::new(-1.0, 0.0);
    let top_right = a_inv_b.multiply(&s_inv)?.scale(minus_one);
    let bottom_left = s_inv.multiply(&c_a_inv)?.scale(minus_one);
    let top_left = a_inv.sub(&top_right.multiply(&c_a_inv)?)?;

    let mut inverse = ComplexMatrix::zeros(n, n, ElementKind::Complex);
    inverse.insert_submatrix(&top_left, 0, 0)?;
    inverse.insert_submatrix(&top_right, 0, leading)?;
    inverse.insert_submatrix(&bottom_left, leading, 0)?;
    inverse.insert_submatrix(&s_inv, leading, leading)?;
    Ok(inverse)
}

fn invert_leading_block(
    block: &ComplexMatrix,
    parity: Option<&[bool]>,
) -> Result<ComplexMatrix, MatrixError> {
    let Some(flags) = parity.filter(|flags| flags.len() == block.rows()) else {
        return block.invert();
    };

    let (even, odd): (Vec<usize>, Vec<usize>) = (0..flags.len()).partition(|&i| flags[i]);
    if even.is_empty() || odd.is_empty() {
        return block.invert();
    }

    let n = block.rows();
    let mut inverse = ComplexMatrix::zeros(n, n, ElementKind::Complex);
    for group in [&even, &odd] {
        let sub = block
            .as_dmatrix()
            .select_rows(group.iter())
            .select_columns(group.iter());
        let sub_inv = ComplexMatrix::from_dmatrix(sub).invert()?;
        for (a, &i) in group.iter().enumerate() {
            for (b, &j) in group.iter().enumerate() {
                inverse[(i, j)] = sub_inv[(a, b)];
            }
        }
    }
    Ok(inverse)
}
