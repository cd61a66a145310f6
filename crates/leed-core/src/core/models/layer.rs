use super::atom::Atom;
use nalgebra::{Vector2, Vector3};
use std::f64::consts::PI;

/// A two-dimensional Bravais lattice spanned by `a1` and `a2` (Bohr).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lattice2 {
    pub a1: Vector2<f64>,
    pub a2: Vector2<f64>,
}

impl Lattice2 {
    pub fn new(a1: Vector2<f64>, a2: Vector2<f64>) -> Self {
        Self { a1, a2 }
    }

    /// Signed cross product `a1 × a2`; positive for a right-handed pair.
    #[inline]
    pub fn signed_area(&self) -> f64 {
        self.a1.x * self.a2.y - self.a1.y * self.a2.x
    }

    /// Unit-cell area in Bohr².
    #[inline]
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Returns the lattice with `a1, a2` swapped if needed so that `a1 × a2 > 0`.
    pub fn right_handed(self) -> Self {
        if self.signed_area() < 0.0 {
            Self {
                a1: self.a2,
                a2: self.a1,
            }
        } else {
            self
        }
    }

    /// Reciprocal vectors `b1, b2` with `a_i · b_j = 2π δ_ij`.
    pub fn reciprocal(&self) -> (Vector2<f64>, Vector2<f64>) {
        let det = self.signed_area();
        let factor = 2.0 * PI / det;
        let b1 = Vector2::new(self.a2.y, -self.a2.x) * factor;
        let b2 = Vector2::new(-self.a1.y, self.a1.x) * factor;
        (b1, b2)
    }

    /// Lattice vector `n1 a1 + n2 a2`.
    #[inline]
    pub fn point(&self, n1: i32, n2: i32) -> Vector2<f64> {
        self.a1 * n1 as f64 + self.a2 * n2 as f64
    }

    /// Fractional coordinates of `v` in the `a1, a2` basis.
    pub fn fractional(&self, v: &Vector2<f64>) -> Vector2<f64> {
        let det = self.signed_area();
        Vector2::new(
            (v.x * self.a2.y - v.y * self.a2.x) / det,
            (self.a1.x * v.y - self.a1.y * v.x) / det,
        )
    }

    /// Folds `v` back into the unit cell spanned by `a1, a2`.
    pub fn fold(&self, v: &Vector2<f64>) -> Vector2<f64> {
        let f = self.fractional(v);
        let n1 = f.x.floor();
        let n2 = f.y.floor();
        v - self.a1 * n1 - self.a2 * n2
    }
}

/// One periodic plane (or composite slab) of atoms.
///
/// Atom positions are relative to the layer origin. The interlayer vectors
/// connect reference points of consecutive layers: `vec_from_last` runs from the
/// top reference point of the layer below to this layer's origin, and
/// `vec_to_next` from this layer's top reference point to the next layer's
/// origin (or to the global origin for the topmost bulk layer).
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub index: usize,
    pub atoms: Vec<Atom>,
    /// Lattice of the layer's 2-D unit cell.
    pub lattice: Lattice2,
    /// Unit-cell area relative to the 1×1 cell.
    pub relative_area: f64,
    /// `true` for layers that repeat in the bulk stacking period.
    pub periodic: bool,
    pub vec_from_last: Vector3<f64>,
    pub vec_to_next: Vector3<f64>,
}

impl Layer {
    /// Unit-cell area in Bohr².
    #[inline]
    pub fn cell_area(&self) -> f64 {
        self.lattice.area()
    }

    /// Lowest and highest atomic `z` in the layer.
    pub fn z_extent(&self) -> (f64, f64) {
        self.atoms
            .iter()
            .map(|a| a.position.z)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), z| {
                (lo.min(z), hi.max(z))
            })
    }

    /// Vector from the layer origin to its top reference point
    /// (`(0, 0, z_max)`).
    pub fn top_offset(&self) -> Vector3<f64> {
        let (_, z_max) = self.z_extent();
        Vector3::new(0.0, 0.0, z_max)
    }

    pub fn is_composite(&self) -> bool {
        self.atoms.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    fn hexagonal() -> Lattice2 {
        Lattice2::new(
            Vector2::new(2.0, 0.0),
            Vector2::new(1.0, 3.0_f64.sqrt()),
        )
    }

    #[test]
    fn reciprocal_vectors_are_dual() {
        let lattice = hexagonal();
        let (b1, b2) = lattice.reciprocal();
        assert!((lattice.a1.dot(&b1) - 2.0 * PI).abs() < TOLERANCE);
        assert!((lattice.a2.dot(&b2) - 2.0 * PI).abs() < TOLERANCE);
        assert!(lattice.a1.dot(&b2).abs() < TOLERANCE);
        assert!(lattice.a2.dot(&b1).abs() < TOLERANCE);
    }

    #[test]
    fn right_handed_swaps_left_handed_pair() {
        let left = Lattice2::new(Vector2::new(0.0, 1.0), Vector2::new(1.0, 0.0));
        assert!(left.signed_area() < 0.0);
        let fixed = left.right_handed();
        assert!(fixed.signed_area() > 0.0);
        assert!((fixed.area() - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn fold_maps_into_unit_cell() {
        let lattice = hexagonal();
        let v = lattice.point(3, -2) + Vector2::new(0.25, 0.1);
        let folded = lattice.fold(&v);
        assert!((folded - Vector2::new(0.25, 0.1)).norm() < 1e-10);
    }

    #[test]
    fn z_extent_covers_all_atoms() {
        let layer = Layer {
            index: 0,
            atoms: vec![
                Atom::new(0, Vector3::new(0.0, 0.0, -0.5)),
                Atom::new(0, Vector3::new(1.0, 0.0, 0.7)),
            ],
            lattice: hexagonal(),
            relative_area: 1.0,
            periodic: true,
            vec_from_last: Vector3::zeros(),
            vec_to_next: Vector3::zeros(),
        };
        assert_eq!(layer.z_extent(), (-0.5, 0.7));
        assert!(layer.is_composite());
    }
}
