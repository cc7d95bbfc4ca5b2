//! Conversions between the dense containers and `ndarray` types.
//!
//! Downstream numeric code lives on `Array1`/`Array2`; these bridges copy
//! data across without exposing the lazy-column layout.

use ndarray::{Array1, Array2};

use crate::data::{DenseMatrix, DenseVector, VectorRead};

impl DenseVector {
    /// Copy of a 1-d array.
    pub fn from_array1(a: &Array1<f64>) -> Self {
        let mut v = Self::new(a.len());
        for (slot, &x) in v.values_mut().iter_mut().zip(a.iter()) {
            *slot = x;
        }
        v
    }

    /// Owned 1-d array copy.
    pub fn to_array1(&self) -> Array1<f64> {
        Array1::from(self.values().to_vec())
    }
}

impl DenseMatrix {
    /// Copy of a 2-d array, interpreted as `(rows, cols)`. All-zero array
    /// columns stay unmaterialized.
    pub fn from_array2(a: &Array2<f64>) -> Self {
        let (rows, cols) = a.dim();
        let mut m = Self::new(rows, cols);
        for (c, col) in a.columns().into_iter().enumerate() {
            if col.iter().all(|&v| v == 0.0) {
                continue;
            }
            let dst = m.col_mut(c);
            for (r, &v) in col.iter().enumerate() {
                dst.set(r, v);
            }
        }
        m
    }

    /// Owned 2-d array copy with shape `(rows, cols)`.
    pub fn to_array2(&self) -> Array2<f64> {
        let mut a = Array2::zeros((self.rows(), self.n_cols()));
        for c in 0..self.n_cols() {
            for (r, v) in self.col(c).non_zeros() {
                a[[r, c]] = v;
            }
        }
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn vector_roundtrip() {
        let a = array![1.0, 0.0, -2.5];
        let v = DenseVector::from_array1(&a);
        assert_eq!(v.values(), &[1.0, 0.0, -2.5]);
        assert_eq!(v.to_array1(), a);
    }

    #[test]
    fn matrix_roundtrip_skips_zero_columns() {
        let a = array![[1.0, 0.0], [0.0, 0.0], [2.0, 0.0]];
        let m = DenseMatrix::from_array2(&a);
        assert_eq!(m.rows(), 3);
        assert_eq!(m.n_cols(), 2);
        assert!(m.is_col_zero(1));
        assert_eq!(m.n_non_zero_cols(), 1);
        assert_eq!(m.to_array2(), a);
    }
}
