//! Dense vector: every component materialized.

use std::io::{Read, Write};

use crate::arena::Arena;
use crate::data::{NonZeros, VectorRead};
use crate::io::{RecordError, RecordReader, RecordWriter};

/// Fixed-length vector of `f64` with every component stored.
///
/// Mutating arithmetic takes any [`VectorRead`] operand, so a dense vector
/// accumulates sparse columns without converting them first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DenseVector {
    elm: Arena<f64>,
}

impl DenseVector {
    /// All-zero vector of length `n`.
    pub fn new(n: usize) -> Self {
        let mut elm = Arena::new();
        elm.allocate(n);
        Self { elm }
    }

    /// Vector holding a copy of `values`.
    pub fn from_slice(values: &[f64]) -> Self {
        let mut v = Self::new(values.len());
        v.elm.as_mut_slice().copy_from_slice(values);
        v
    }

    /// Copy of another readable vector, scaled by `coeff`.
    pub fn from_vector(other: &impl VectorRead, coeff: f64) -> Self {
        let mut v = Self::new(other.len());
        v.add(other, coeff);
        v
    }

    // ========================================================================
    // Shape
    // ========================================================================

    /// Re-shape to length `n`, discarding all contents.
    ///
    /// When the length is unchanged this is a plain zero-fill with no
    /// reallocation.
    pub fn reform(&mut self, n: usize) {
        if self.elm.len() == n {
            self.zero_out();
            return;
        }
        self.elm.free();
        self.elm.allocate(n);
    }

    /// Resize to length `n`, keeping the overlapping prefix. New components
    /// are zero; shrinking is allowed.
    pub fn resize(&mut self, n: usize) {
        self.elm.resize(n);
    }

    /// Borrow the components.
    #[inline]
    pub fn values(&self) -> &[f64] {
        self.elm.as_slice()
    }

    /// Mutably borrow the components.
    #[inline]
    pub fn values_mut(&mut self) -> &mut [f64] {
        self.elm.as_mut_slice()
    }

    /// Number of components.
    #[inline]
    pub fn len(&self) -> usize {
        self.elm.len()
    }

    /// True if the vector has no components.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elm.is_empty()
    }

    // ========================================================================
    // Element access
    // ========================================================================

    /// Value of component `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len()`.
    #[inline]
    pub fn get(&self, i: usize) -> f64 {
        self.check_index(i);
        self.elm[i]
    }

    /// Set component `i` to `v`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len()`.
    #[inline]
    pub fn set(&mut self, i: usize, v: f64) {
        self.check_index(i);
        self.elm[i] = v;
    }

    /// Add `delta` to component `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len()`.
    #[inline]
    pub fn add_at(&mut self, i: usize, delta: f64) {
        self.check_index(i);
        self.elm[i] += delta;
    }

    /// Multiply component `i` by `factor`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len()`.
    #[inline]
    pub fn multiply_at(&mut self, i: usize, factor: f64) {
        self.check_index(i);
        self.elm[i] *= factor;
    }

    /// Set every component to `v`.
    pub fn set_all(&mut self, v: f64) {
        self.elm.as_mut_slice().fill(v);
    }

    /// Set every component to zero.
    pub fn zero_out(&mut self) {
        self.elm.as_mut_slice().fill(0.0);
    }

    #[inline]
    fn check_index(&self, i: usize) {
        assert!(
            i < self.elm.len(),
            "index {i} out of range for vector of length {}",
            self.elm.len()
        );
    }

    // ========================================================================
    // Arithmetic
    // ========================================================================

    /// `self += coeff * other`. No-op when `coeff` is zero.
    ///
    /// # Panics
    ///
    /// Panics on length mismatch.
    pub fn add(&mut self, other: &impl VectorRead, coeff: f64) {
        assert_eq!(
            self.elm.len(),
            other.len(),
            "length mismatch in vector add"
        );
        if coeff == 0.0 {
            return;
        }
        for (i, v) in other.non_zeros() {
            self.elm[i] += coeff * v;
        }
    }

    /// Multiply every component by `scalar`. No-op when `scalar` is 1.
    pub fn multiply(&mut self, scalar: f64) {
        if scalar == 1.0 {
            return;
        }
        for v in self.elm.as_mut_slice() {
            *v *= scalar;
        }
    }

    /// Component-wise scale by `other`: multiply, or divide when `inverse`.
    ///
    /// Positions where `other` is zero, implicitly or stored, become zero
    /// (the x/0 = 0 rule), including every position past `other`'s last
    /// non-zero component.
    ///
    /// # Panics
    ///
    /// Panics on length mismatch.
    pub fn scale(&mut self, other: &impl VectorRead, inverse: bool) {
        assert_eq!(
            self.elm.len(),
            other.len(),
            "length mismatch in vector scale"
        );
        let mut next = 0;
        for (i, v) in other.non_zeros() {
            for gap in next..i {
                self.elm[gap] = 0.0;
            }
            if self.elm[i] != 0.0 {
                if inverse {
                    self.elm[i] /= v;
                } else {
                    self.elm[i] *= v;
                }
            }
            next = i + 1;
        }
        for gap in next..self.elm.len() {
            self.elm[gap] = 0.0;
        }
    }

    /// Component-wise scale by a dense vector, with the same x/0 = 0 rule.
    ///
    /// # Panics
    ///
    /// Panics on length mismatch.
    pub fn scale_dense(&mut self, other: &DenseVector, inverse: bool) {
        assert_eq!(
            self.elm.len(),
            other.len(),
            "length mismatch in vector scale"
        );
        for (v, &s) in self.elm.as_mut_slice().iter_mut().zip(other.values()) {
            if *v == 0.0 {
                continue;
            }
            if s == 0.0 {
                *v = 0.0;
            } else if inverse {
                *v /= s;
            } else {
                *v *= s;
            }
        }
    }

    /// Dot product with any readable vector.
    ///
    /// # Panics
    ///
    /// Panics on length mismatch.
    pub fn inner_product(&self, other: &impl VectorRead) -> f64 {
        assert_eq!(
            self.elm.len(),
            other.len(),
            "length mismatch in inner product"
        );
        other.non_zeros().map(|(i, v)| v * self.elm[i]).sum()
    }

    /// Squared L2 norm.
    pub fn self_inner_product(&self) -> f64 {
        self.elm.as_slice().iter().map(|v| v * v).sum()
    }

    /// Sum of components.
    pub fn sum(&self) -> f64 {
        self.elm.as_slice().iter().sum()
    }

    /// Sum of absolute values of components.
    pub fn abs_sum(&self) -> f64 {
        self.elm.as_slice().iter().map(|v| v.abs()).sum()
    }

    /// Divide by the L2 norm, returning the norm. No-op on a zero vector.
    pub fn normalize(&mut self) -> f64 {
        let norm = self.self_inner_product().sqrt();
        if norm != 0.0 {
            for v in self.elm.as_mut_slice() {
                *v /= norm;
            }
        }
        norm
    }

    /// Divide by the component sum, returning the sum. No-op when the sum
    /// is zero.
    pub fn normalize1(&mut self) -> f64 {
        let sum = self.sum();
        if sum != 0.0 {
            for v in self.elm.as_mut_slice() {
                *v /= sum;
            }
        }
        sum
    }

    /// Replace each component by its sign: positive to 1, negative to -1.
    pub fn binarize(&mut self) {
        for v in self.elm.as_mut_slice() {
            if *v > 0.0 {
                *v = 1.0;
            } else if *v < 0.0 {
                *v = -1.0;
            }
        }
    }

    /// Replace each non-zero component by 1.
    pub fn binarize1(&mut self) {
        for v in self.elm.as_mut_slice() {
            if *v != 0.0 {
                *v = 1.0;
            }
        }
    }

    /// Square each component.
    pub fn square(&mut self) {
        for v in self.elm.as_mut_slice() {
            *v *= *v;
        }
    }

    /// Replace each component by its square root.
    ///
    /// # Panics
    ///
    /// Panics on a negative component.
    pub fn sqrt_in_place(&mut self) {
        for v in self.elm.as_mut_slice() {
            assert!(*v >= 0.0, "sqrt of negative component {v}");
            *v = v.sqrt();
        }
    }

    /// Zero out components with absolute value below `min_abs`.
    pub fn cut(&mut self, min_abs: f64) {
        for v in self.elm.as_mut_slice() {
            if v.abs() < min_abs {
                *v = 0.0;
            }
        }
    }

    // ========================================================================
    // Extremes
    // ========================================================================

    /// Largest component and its position; first position wins a tie.
    /// `None` on an empty vector.
    pub fn max(&self) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &v) in self.elm.as_slice().iter().enumerate() {
            if best.map_or(true, |(_, bv)| v > bv) {
                best = Some((i, v));
            }
        }
        best
    }

    /// Smallest component and its position; first position wins a tie.
    /// `None` on an empty vector.
    pub fn min(&self) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &v) in self.elm.as_slice().iter().enumerate() {
            if best.map_or(true, |(_, bv)| v < bv) {
                best = Some((i, v));
            }
        }
        best
    }

    /// Position and signed value of the component with the largest absolute
    /// value; first position wins a tie. `None` on an empty vector.
    pub fn max_abs(&self) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &v) in self.elm.as_slice().iter().enumerate() {
            if best.map_or(true, |(_, bv)| v.abs() > bv.abs()) {
                best = Some((i, v));
            }
        }
        best
    }

    // ========================================================================
    // Archive
    // ========================================================================

    /// Write `[i32 length][length x f64]`.
    pub fn write_to<W: Write>(&self, w: &mut RecordWriter<W>) -> Result<(), RecordError> {
        w.write_i32(self.elm.len() as i32)?;
        for &v in self.elm.as_slice() {
            w.write_f64(v)?;
        }
        Ok(())
    }

    /// Read a vector previously written by [`write_to`](Self::write_to).
    pub fn read_from<R: Read>(r: &mut RecordReader<R>) -> Result<Self, RecordError> {
        let n = r.read_len()?;
        let mut v = Self::new(n);
        for slot in v.elm.as_mut_slice() {
            *slot = r.read_f64()?;
        }
        Ok(v)
    }
}

impl VectorRead for DenseVector {
    #[inline]
    fn len(&self) -> usize {
        self.elm.len()
    }

    #[inline]
    fn get(&self, i: usize) -> f64 {
        DenseVector::get(self, i)
    }

    fn is_zero(&self) -> bool {
        self.elm.as_slice().iter().all(|&v| v == 0.0)
    }

    fn n_non_zero(&self) -> usize {
        self.elm.as_slice().iter().filter(|&&v| v != 0.0).count()
    }

    fn non_zeros(&self) -> NonZeros<'_> {
        NonZeros::over_dense(self.elm.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SparseVector;
    use approx::assert_relative_eq;
    use std::io::Cursor;

    #[test]
    fn new_is_all_zero() {
        let v = DenseVector::new(4);
        assert_eq!(v.len(), 4);
        assert!(v.is_zero());
    }

    #[test]
    fn set_get_identity() {
        let mut v = DenseVector::new(3);
        v.set(1, 2.5);
        assert_eq!(v.get(1), 2.5);
        assert_eq!(v.get(0), 0.0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn set_out_of_range_panics() {
        DenseVector::new(3).set(3, 1.0);
    }

    #[test]
    fn reform_same_length_zero_fills() {
        let mut v = DenseVector::from_slice(&[1.0, 2.0]);
        v.reform(2);
        assert!(v.is_zero());
        assert_eq!(v.len(), 2);
    }

    #[test]
    fn resize_keeps_prefix_and_allows_shrink() {
        let mut v = DenseVector::from_slice(&[1.0, 2.0, 3.0]);
        v.resize(5);
        assert_eq!(v.values(), &[1.0, 2.0, 3.0, 0.0, 0.0]);
        v.resize(2);
        assert_eq!(v.values(), &[1.0, 2.0]);
    }

    #[test]
    fn add_sparse_with_coeff() {
        // accumulating a sparse column into a dense accumulator
        let mut d = DenseVector::from_slice(&[5.0, 10.0, 11.0]);
        let mut s = SparseVector::new(3);
        s.set(0, 2.0);
        s.set(1, 4.0);
        s.set(2, 5.0);
        d.add(&s, 0.5);
        assert_eq!(d.values(), &[6.0, 12.0, 13.5]);
    }

    #[test]
    fn add_with_zero_coeff_is_noop() {
        let mut d = DenseVector::from_slice(&[1.0, 2.0]);
        let s = DenseVector::from_slice(&[9.0, 9.0]);
        d.add(&s, 0.0);
        assert_eq!(d.values(), &[1.0, 2.0]);
    }

    #[test]
    #[should_panic(expected = "length mismatch")]
    fn add_shape_mismatch_panics() {
        let mut d = DenseVector::new(2);
        let s = DenseVector::new(3);
        d.add(&s, 1.0);
    }

    #[test]
    fn scale_by_sparse_zeroes_implicit_positions() {
        let mut d = DenseVector::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let mut s = SparseVector::new(5);
        s.set(1, 2.0);
        s.set(3, 10.0);
        d.scale(&s, false);
        assert_eq!(d.values(), &[0.0, 4.0, 0.0, 40.0, 0.0]);
    }

    #[test]
    fn scale_inverse_divides() {
        let mut d = DenseVector::from_slice(&[8.0, 9.0]);
        let s = DenseVector::from_slice(&[2.0, 3.0]);
        d.scale(&s, true);
        assert_eq!(d.values(), &[4.0, 3.0]);
    }

    #[test]
    fn scale_dense_divide_by_zero_yields_zero() {
        let mut d = DenseVector::from_slice(&[8.0, 9.0]);
        let s = DenseVector::from_slice(&[2.0, 0.0]);
        d.scale_dense(&s, true);
        assert_eq!(d.values(), &[4.0, 0.0]);
    }

    #[test]
    fn inner_product_mixed() {
        let d = DenseVector::from_slice(&[1.0, 2.0, 3.0]);
        let mut s = SparseVector::new(3);
        s.set(0, 4.0);
        s.set(2, -1.0);
        assert_eq!(d.inner_product(&s), 1.0);
        assert_eq!(d.inner_product(&d), 14.0);
    }

    #[test]
    fn normalize_unit_norm() {
        let mut v = DenseVector::from_slice(&[3.0, 4.0]);
        let norm = v.normalize();
        assert_relative_eq!(norm, 5.0);
        assert_relative_eq!(v.self_inner_product(), 1.0);
    }

    #[test]
    fn normalize_zero_vector_is_noop() {
        let mut v = DenseVector::new(3);
        assert_eq!(v.normalize(), 0.0);
        assert!(v.is_zero());
    }

    #[test]
    fn normalize1_divides_by_sum() {
        let mut v = DenseVector::from_slice(&[1.0, 3.0]);
        assert_eq!(v.normalize1(), 4.0);
        assert_eq!(v.values(), &[0.25, 0.75]);
    }

    #[test]
    fn binarize_signs() {
        let mut v = DenseVector::from_slice(&[2.0, -0.5, 0.0]);
        v.binarize();
        assert_eq!(v.values(), &[1.0, -1.0, 0.0]);
        let mut v = DenseVector::from_slice(&[2.0, -0.5, 0.0]);
        v.binarize1();
        assert_eq!(v.values(), &[1.0, 1.0, 0.0]);
    }

    #[test]
    fn cut_drops_small_components() {
        let mut v = DenseVector::from_slice(&[0.1, -0.05, 1.0]);
        v.cut(0.1);
        assert_eq!(v.values(), &[0.1, 0.0, 1.0]);
    }

    #[test]
    #[should_panic(expected = "sqrt of negative")]
    fn sqrt_of_negative_panics() {
        DenseVector::from_slice(&[-1.0]).sqrt_in_place();
    }

    #[test]
    fn extremes_first_index_wins_ties() {
        let v = DenseVector::from_slice(&[2.0, 2.0, -3.0, -3.0]);
        assert_eq!(v.max(), Some((0, 2.0)));
        assert_eq!(v.min(), Some((2, -3.0)));
        assert_eq!(v.max_abs(), Some((2, -3.0)));
        assert_eq!(DenseVector::new(0).max(), None);
    }

    #[test]
    fn archive_roundtrip() {
        let v = DenseVector::from_slice(&[1.5, -2.0, 0.0]);
        let mut buf = Vec::new();
        v.write_to(&mut RecordWriter::new(&mut buf)).unwrap();
        let got = DenseVector::read_from(&mut RecordReader::new(Cursor::new(buf))).unwrap();
        assert_eq!(got, v);
    }
}
