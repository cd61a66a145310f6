use nalgebra::DMatrix;
use num_complex::Complex64;
use std::ops::{Index, IndexMut};
use thiserror::Error;

/// Numeric kind of the stored elements.
///
/// Storage is always complex; the kind records whether any element carries an
/// imaginary part so that products of two real matrices stay real.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Real,
    Complex,
}

/// Structural kind of a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Structure {
    /// Arbitrary `rows x cols` matrix.
    General,
    /// Square matrix without further structure.
    Square,
    /// Square matrix with only diagonal elements.
    Diagonal,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatrixError {
    #[error("Dimension mismatch in {operation}: {left:?} vs {right:?}")]
    DimensionMismatch {
        operation: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },

    #[error("Inversion of {0:?} matrices is not implemented")]
    Unsupported(Structure),

    #[error("Matrix of order {0} is numerically singular")]
    Singular(usize),

    #[error(
        "Block of size {block:?} at offset ({row_offset}, {col_offset}) does not fit into {target:?}"
    )]
    OutOfBounds {
        block: (usize, usize),
        row_offset: usize,
        col_offset: usize,
        target: (usize, usize),
    },
}

/// Dense complex matrix tagged with its numeric and structural kind.
///
/// All scattering quantities of the engine (t-matrices, propagators, layer
/// transmission and reflection matrices) are expressed in this type. Dense
/// kernels are delegated to `nalgebra`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexMatrix {
    data: DMatrix<Complex64>,
    element: ElementKind,
    structure: Structure,
}

impl ComplexMatrix {
    /// Creates a zero matrix. Square shapes are tagged [`Structure::Square`].
    pub fn zeros(rows: usize, cols: usize, element: ElementKind) -> Self {
        Self {
            data: DMatrix::zeros(rows, cols),
            element,
            structure: Self::structure_for(rows, cols),
        }
    }

    pub fn identity(order: usize) -> Self {
        Self {
            data: DMatrix::identity(order, order),
            element: ElementKind::Real,
            structure: Structure::Square,
        }
    }

    /// Creates a diagonal matrix from its diagonal elements.
    pub fn diagonal(values: &[Complex64]) -> Self {
        let n = values.len();
        let mut data = DMatrix::zeros(n, n);
        for (i, v) in values.iter().enumerate() {
            data[(i, i)] = *v;
        }
        Self {
            data,
            element: Self::element_of(values.iter()),
            structure: Structure::Diagonal,
        }
    }

    pub fn from_fn<F>(rows: usize, cols: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> Complex64,
    {
        Self::from_dmatrix(DMatrix::from_fn(rows, cols, |i, j| f(i, j)))
    }

    pub fn from_dmatrix(data: DMatrix<Complex64>) -> Self {
        let (rows, cols) = data.shape();
        Self {
            element: Self::element_of(data.iter()),
            structure: Self::structure_for(rows, cols),
            data,
        }
    }

    /// Zeroes the matrix in place when the requested shape and kind match,
    /// otherwise replaces the storage with a fresh zero matrix.
    pub fn allocate(&mut self, rows: usize, cols: usize, element: ElementKind) {
        if self.data.shape() == (rows, cols) && self.element == element {
            self.data.fill(Complex64::new(0.0, 0.0));
            self.structure = Self::structure_for(rows, cols);
        } else {
            *self = Self::zeros(rows, cols, element);
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        self.data.shape()
    }

    #[inline]
    pub fn element(&self) -> ElementKind {
        self.element
    }

    #[inline]
    pub fn structure(&self) -> Structure {
        self.structure
    }

    pub fn as_dmatrix(&self) -> &DMatrix<Complex64> {
        &self.data
    }

    pub fn into_dmatrix(self) -> DMatrix<Complex64> {
        self.data
    }

    /// Matrix product `self * rhs`, promoting to complex if either operand is.
    pub fn multiply(&self, rhs: &ComplexMatrix) -> Result<ComplexMatrix, MatrixError> {
        if self.cols() != rhs.rows() {
            return Err(MatrixError::DimensionMismatch {
                operation: "multiply",
                left: self.shape(),
                right: rhs.shape(),
            });
        }
        let data = &self.data * &rhs.data;
        let element = if self.element == ElementKind::Real && rhs.element == ElementKind::Real {
            ElementKind::Real
        } else {
            ElementKind::Complex
        };
        let structure = match (self.structure, rhs.structure) {
            (Structure::Diagonal, Structure::Diagonal) => Structure::Diagonal,
            _ => Self::structure_for(data.nrows(), data.ncols()),
        };
        Ok(Self {
            data,
            element,
            structure,
        })
    }

    /// Inverse of a square, non-diagonal matrix via LU decomposition.
    pub fn invert(&self) -> Result<ComplexMatrix, MatrixError> {
        if self.structure == Structure::Diagonal {
            return Err(MatrixError::Unsupported(Structure::Diagonal));
        }
        if self.rows() != self.cols() {
            return Err(MatrixError::DimensionMismatch {
                operation: "invert",
                left: self.shape(),
                right: (self.cols(), self.rows()),
            });
        }
        let order = self.rows();
        let inverse = self
            .data
            .clone()
            .lu()
            .try_inverse()
            .ok_or(MatrixError::Singular(order))?;
        if inverse.iter().any(|z| !z.re.is_finite() || !z.im.is_finite()) {
            return Err(MatrixError::Singular(order));
        }
        Ok(Self {
            data: inverse,
            element: self.element,
            structure: Structure::Square,
        })
    }

    /// Copies `block` into `self` with its upper-left corner at the given offset.
    pub fn insert_submatrix(
        &mut self,
        block: &ComplexMatrix,
        row_offset: usize,
        col_offset: usize,
    ) -> Result<(), MatrixError> {
        let (rows, cols) = block.shape();
        if row_offset + rows > self.rows() || col_offset + cols > self.cols() {
            return Err(MatrixError::OutOfBounds {
                block: (rows, cols),
                row_offset,
                col_offset,
                target: self.shape(),
            });
        }
        self.data
            .view_mut((row_offset, col_offset), (rows, cols))
            .copy_from(&block.data);
        if block.element == ElementKind::Complex {
            self.element = ElementKind::Complex;
        }
        let stays_diagonal = block.structure == Structure::Diagonal && row_offset == col_offset;
        if self.structure == Structure::Diagonal && !stays_diagonal {
            self.structure = Self::structure_for(self.rows(), self.cols());
        }
        Ok(())
    }

    /// Copies out the block of size `rows x cols` starting at the given offset.
    pub fn submatrix(
        &self,
        row_offset: usize,
        col_offset: usize,
        rows: usize,
        cols: usize,
    ) -> Result<ComplexMatrix, MatrixError> {
        if row_offset + rows > self.rows() || col_offset + cols > self.cols() {
            return Err(MatrixError::OutOfBounds {
                block: (rows, cols),
                row_offset,
                col_offset,
                target: self.shape(),
            });
        }
        Ok(Self::from_dmatrix(
            self.data
                .view((row_offset, col_offset), (rows, cols))
                .clone_owned(),
        ))
    }

    pub fn transpose(&self) -> ComplexMatrix {
        let structure = match self.structure {
            Structure::Diagonal => Structure::Diagonal,
            _ => Self::structure_for(self.cols(), self.rows()),
        };
        Self {
            data: self.data.transpose(),
            element: self.element,
            structure,
        }
    }

    pub fn add(&self, rhs: &ComplexMatrix) -> Result<ComplexMatrix, MatrixError> {
        self.check_same_shape("add", rhs)?;
        Ok(Self::from_dmatrix(&self.data + &rhs.data))
    }

    pub fn sub(&self, rhs: &ComplexMatrix) -> Result<ComplexMatrix, MatrixError> {
        self.check_same_shape("sub", rhs)?;
        Ok(Self::from_dmatrix(&self.data - &rhs.data))
    }

    pub fn scale(&self, factor: Complex64) -> ComplexMatrix {
        Self::from_dmatrix(&self.data * factor)
    }

    /// Returns `I - self` for a square matrix.
    pub fn identity_minus(&self) -> Result<ComplexMatrix, MatrixError> {
        if self.rows() != self.cols() {
            return Err(MatrixError::DimensionMismatch {
                operation: "identity_minus",
                left: self.shape(),
                right: (self.cols(), self.rows()),
            });
        }
        let mut data = -self.data.clone();
        for i in 0..self.rows() {
            data[(i, i)] += Complex64::new(1.0, 0.0);
        }
        Ok(Self::from_dmatrix(data))
    }

    /// Adds `values[i]` to the diagonal element `(i, i)`.
    pub fn add_to_diagonal(&mut self, values: &[Complex64]) -> Result<(), MatrixError> {
        if values.len() > self.rows().min(self.cols()) {
            return Err(MatrixError::DimensionMismatch {
                operation: "add_to_diagonal",
                left: self.shape(),
                right: (values.len(), values.len()),
            });
        }
        for (i, v) in values.iter().enumerate() {
            self.data[(i, i)] += *v;
        }
        if values.iter().any(|v| v.im != 0.0) {
            self.element = ElementKind::Complex;
        }
        Ok(())
    }

    /// Computes `diag(factors) * self` in place.
    pub fn scale_rows(&mut self, factors: &[Complex64]) -> Result<(), MatrixError> {
        if factors.len() != self.rows() {
            return Err(MatrixError::DimensionMismatch {
                operation: "scale_rows",
                left: (factors.len(), factors.len()),
                right: self.shape(),
            });
        }
        for (i, f) in factors.iter().enumerate() {
            let mut row = self.data.row_mut(i);
            row *= *f;
        }
        self.element = ElementKind::Complex;
        Ok(())
    }

    /// Computes `self * diag(factors)` in place.
    pub fn scale_columns(&mut self, factors: &[Complex64]) -> Result<(), MatrixError> {
        if factors.len() != self.cols() {
            return Err(MatrixError::DimensionMismatch {
                operation: "scale_columns",
                left: self.shape(),
                right: (factors.len(), factors.len()),
            });
        }
        for (j, f) in factors.iter().enumerate() {
            let mut col = self.data.column_mut(j);
            col *= *f;
        }
        self.element = ElementKind::Complex;
        Ok(())
    }

    /// Largest element-wise modulus of `self - other`.
    pub fn max_abs_diff(&self, other: &ComplexMatrix) -> Result<f64, MatrixError> {
        self.check_same_shape("max_abs_diff", other)?;
        Ok(self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| (a - b).norm())
            .fold(0.0, f64::max))
    }

    /// Largest element modulus.
    pub fn max_abs(&self) -> f64 {
        self.data.iter().map(|z| z.norm()).fold(0.0, f64::max)
    }

    fn check_same_shape(
        &self,
        operation: &'static str,
        other: &ComplexMatrix,
    ) -> Result<(), MatrixError> {
        if self.shape() != other.shape() {
            return Err(MatrixError::DimensionMismatch {
                operation,
                left: self.shape(),
                right: other.shape(),
            });
        }
        Ok(())
    }

    fn structure_for(rows: usize, cols: usize) -> Structure {
        if rows == cols {
            Structure::Square
        } else {
            Structure::General
        }
    }

    fn element_of<'a>(mut values: impl Iterator<Item = &'a Complex64>) -> ElementKind {
        if values.any(|v| v.im != 0.0) {
            ElementKind::Complex
        } else {
            ElementKind::Real
        }
    }
}

impl Index<(usize, usize)> for ComplexMatrix {
    type Output = Complex64;

    #[inline]
    fn index(&self, index: (usize, usize)) -> &Complex64 {
        &self.data[index]
    }
}

impl IndexMut<(usize, usize)> for ComplexMatrix {
    #[inline]
    fn index_mut(&mut self, index: (usize, usize)) -> &mut Complex64 {
        self.element = ElementKind::Complex;
        &mut self.data[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const TOLERANCE: f64 = 1e-10;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn random_well_conditioned(n: usize, seed: u64) -> ComplexMatrix {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut m = ComplexMatrix::from_fn(n, n, |_, _| {
            c(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0))
        });
        let shift: Vec<Complex64> = (0..n).map(|_| c(n as f64, 0.0)).collect();
        m.add_to_diagonal(&shift).unwrap();
        m
    }

    #[test]
    fn inverse_times_matrix_is_identity() {
        for (n, seed) in [(1, 1), (4, 2), (17, 3), (40, 4)] {
            let a = random_well_conditioned(n, seed);
            let inv = a.invert().unwrap();
            let product = inv.multiply(&a).unwrap();
            let diff = product.max_abs_diff(&ComplexMatrix::identity(n)).unwrap();
            assert!(diff < TOLERANCE, "n = {n}: deviation {diff}");
        }
    }

    #[test]
    fn multiply_rejects_mismatched_dimensions() {
        let a = ComplexMatrix::zeros(2, 3, ElementKind::Complex);
        let b = ComplexMatrix::zeros(2, 3, ElementKind::Complex);
        let err = a.multiply(&b).unwrap_err();
        assert!(matches!(err, MatrixError::DimensionMismatch { .. }));
    }

    #[test]
    fn multiply_keeps_real_and_promotes_mixed_products() {
        let real = ComplexMatrix::identity(3);
        let complex = ComplexMatrix::diagonal(&[c(1.0, 1.0), c(2.0, 0.0), c(0.0, -1.0)]);
        assert_eq!(real.multiply(&real).unwrap().element(), ElementKind::Real);
        let mixed = real.multiply(&complex).unwrap();
        assert_eq!(mixed.element(), ElementKind::Complex);
        assert_eq!(mixed[(2, 2)], c(0.0, -1.0));
    }

    #[test]
    fn invert_rejects_diagonal_and_singular_matrices() {
        let diagonal = ComplexMatrix::diagonal(&[c(1.0, 0.0), c(2.0, 0.0)]);
        assert_eq!(
            diagonal.invert().unwrap_err(),
            MatrixError::Unsupported(Structure::Diagonal)
        );

        let singular = ComplexMatrix::from_fn(2, 2, |_, _| c(1.0, 0.0));
        assert_eq!(singular.invert().unwrap_err(), MatrixError::Singular(2));

        let rectangular = ComplexMatrix::zeros(2, 3, ElementKind::Real);
        assert!(matches!(
            rectangular.invert().unwrap_err(),
            MatrixError::DimensionMismatch { .. }
        ));
    }

    #[test]
    fn insert_submatrix_copies_block_and_checks_bounds() {
        let mut target = ComplexMatrix::zeros(4, 4, ElementKind::Real);
        let block = ComplexMatrix::from_fn(2, 2, |i, j| c((i * 2 + j) as f64, 1.0));
        target.insert_submatrix(&block, 1, 2).unwrap();
        assert_eq!(target[(1, 2)], c(0.0, 1.0));
        assert_eq!(target[(2, 3)], c(3.0, 1.0));
        assert_eq!(target[(0, 0)], c(0.0, 0.0));
        assert_eq!(target.element(), ElementKind::Complex);

        let err = target.insert_submatrix(&block, 3, 0).unwrap_err();
        assert!(matches!(err, MatrixError::OutOfBounds { .. }));
    }

    #[test]
    fn allocate_reuses_storage_of_identical_shape() {
        let mut m = ComplexMatrix::from_fn(3, 2, |_, _| c(5.0, 0.0));
        m.allocate(3, 2, ElementKind::Real);
        assert_eq!(m.shape(), (3, 2));
        assert_eq!(m.max_abs(), 0.0);

        m.allocate(2, 2, ElementKind::Complex);
        assert_eq!(m.shape(), (2, 2));
        assert_eq!(m.structure(), Structure::Square);
        assert_eq!(m.element(), ElementKind::Complex);
    }

    #[test]
    fn transpose_swaps_shape_and_elements() {
        let m = ComplexMatrix::from_fn(2, 3, |i, j| c(i as f64, j as f64));
        let t = m.transpose();
        assert_eq!(t.shape(), (3, 2));
        assert_eq!(t[(2, 1)], m[(1, 2)]);
        assert_eq!(t.structure(), Structure::General);
    }

    #[test]
    fn row_and_column_scaling_match_diagonal_products() {
        let m = random_well_conditioned(3, 9);
        let d = [c(1.0, 2.0), c(-0.5, 0.0), c(0.0, 3.0)];
        let diag = ComplexMatrix::diagonal(&d);

        let mut rows = m.clone();
        rows.scale_rows(&d).unwrap();
        let expected = diag.multiply(&m).unwrap();
        assert!(rows.max_abs_diff(&expected).unwrap() < TOLERANCE);

        let mut cols = m.clone();
        cols.scale_columns(&d).unwrap();
        let expected = m.multiply(&diag).unwrap();
        assert!(cols.max_abs_diff(&expected).unwrap() < TOLERANCE);
    }
}
