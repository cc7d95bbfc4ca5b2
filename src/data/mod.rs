//! Dense and sparse numeric containers.
//!
//! All element data is `f64`. Vectors are the unit of storage; matrices are
//! ordered collections of column vectors. Sparse containers keep explicit
//! `(index, value)` entries in strictly ascending index order, where a stored
//! value of zero is legal: structurally present, semantically zero.
//!
//! # Reading Across Representations
//!
//! [`VectorRead`] is the shared read contract. Mixed-representation
//! arithmetic (dense += sparse, dense-by-sparse scaling, inner products) is
//! defined against it, so every operation is written once and works for both
//! column kinds. [`NonZeros`] is its forward-only iteration handle: a single
//! pass over the non-zero `(index, value)` pairs in ascending index order.
//!
//! # Faults
//!
//! Out-of-range indices, shape mismatches, and out-of-order bulk loads are
//! contract violations and panic. See the `# Panics` sections on individual
//! methods.

mod dense;
mod dense_matrix;
mod ndarray;
mod sparse;
mod sparse_matrix;

pub use dense::DenseVector;
pub use dense_matrix::DenseMatrix;
pub use sparse::{SparseEntry, SparseVector};
pub use sparse_matrix::SparseMatrix;

/// Read access shared by dense and sparse vectors.
///
/// `non_zeros` yields `(index, value)` pairs with non-zero value in
/// ascending index order; positions it skips are zero, whether implicit
/// (sparse gap) or stored.
pub trait VectorRead {
    /// Logical length of the vector.
    fn len(&self) -> usize;

    /// Value at position `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len()`.
    fn get(&self, i: usize) -> f64;

    /// True if every component is zero.
    fn is_zero(&self) -> bool;

    /// Number of positions holding a non-zero value.
    fn n_non_zero(&self) -> usize;

    /// Single-pass iterator over non-zero `(index, value)` pairs.
    fn non_zeros(&self) -> NonZeros<'_>;

    /// True if the logical length is zero.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Forward-only cursor over the non-zero components of a vector.
///
/// Created by [`VectorRead::non_zeros`]. Restarting means creating a new
/// iterator; there is no rewind.
#[derive(Debug, Clone)]
pub struct NonZeros<'a> {
    inner: NonZerosInner<'a>,
}

#[derive(Debug, Clone)]
enum NonZerosInner<'a> {
    Dense { values: &'a [f64], pos: usize },
    Sparse { entries: &'a [SparseEntry], pos: usize },
}

impl<'a> NonZeros<'a> {
    pub(crate) fn over_dense(values: &'a [f64]) -> Self {
        Self {
            inner: NonZerosInner::Dense { values, pos: 0 },
        }
    }

    pub(crate) fn over_sparse(entries: &'a [SparseEntry]) -> Self {
        Self {
            inner: NonZerosInner::Sparse { entries, pos: 0 },
        }
    }
}

impl Iterator for NonZeros<'_> {
    type Item = (usize, f64);

    fn next(&mut self) -> Option<(usize, f64)> {
        match &mut self.inner {
            NonZerosInner::Dense { values, pos } => {
                while *pos < values.len() {
                    let i = *pos;
                    *pos += 1;
                    if values[i] != 0.0 {
                        return Some((i, values[i]));
                    }
                }
                None
            }
            // Stored zeros are semantically zero and skipped.
            NonZerosInner::Sparse { entries, pos } => {
                while *pos < entries.len() {
                    let e = entries[*pos];
                    *pos += 1;
                    if e.value != 0.0 {
                        return Some((e.index as usize, e.value));
                    }
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_cursor_skips_zeros() {
        let v = DenseVector::from_slice(&[0.0, 2.0, 0.0, -1.0]);
        let got: Vec<_> = v.non_zeros().collect();
        assert_eq!(got, vec![(1, 2.0), (3, -1.0)]);
    }

    #[test]
    fn sparse_cursor_skips_stored_zeros() {
        let mut v = SparseVector::new(10);
        v.set(2, 5.0);
        v.set(4, 0.0);
        v.set(7, 1.5);
        let got: Vec<_> = v.non_zeros().collect();
        assert_eq!(got, vec![(2, 5.0), (7, 1.5)]);
    }

    #[test]
    fn cursor_on_zero_vector_is_empty() {
        let v = DenseVector::new(5);
        assert_eq!(v.non_zeros().count(), 0);
        let s = SparseVector::new(5);
        assert_eq!(s.non_zeros().count(), 0);
    }
}
