//! Sparse matrix: a column collection over [`SparseVector`].

use std::io::{Read, Write};

use crate::arena::SlotArena;
use crate::data::{DenseMatrix, SparseVector, VectorRead};
use crate::io::{RecordError, RecordReader, RecordWriter};

/// Column-major sparse matrix of `f64`.
///
/// Follows the same lazy-column scheme as [`DenseMatrix`]: empty slots read
/// as a shared zero column, and mutation materializes columns on demand.
#[derive(Debug, Clone)]
pub struct SparseMatrix {
    rows: usize,
    cols: SlotArena<SparseVector>,
    zero_col: SparseVector,
}

impl SparseMatrix {
    /// All-zero matrix with `rows` rows and `cols` columns.
    pub fn new(rows: usize, cols: usize) -> Self {
        let mut slots = SlotArena::new();
        slots.allocate(cols);
        Self {
            rows,
            cols: slots,
            zero_col: SparseVector::new(rows),
        }
    }

    /// Matrix with every column materialized in dense mode.
    pub fn new_dense(rows: usize, cols: usize) -> Self {
        let mut m = Self::new(rows, cols);
        for i in 0..cols {
            m.cols.put(i, SparseVector::new_dense(rows));
        }
        m
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.cols.len()
    }

    // ========================================================================
    // Shape
    // ========================================================================

    /// Re-shape, discarding all contents. When the shape is unchanged the
    /// materialized columns drop their entries but keep their storage.
    pub fn reform(&mut self, rows: usize, cols: usize) {
        if self.rows == rows && self.cols.len() == cols {
            for i in 0..cols {
                if let Some(col) = self.cols.get_mut(i) {
                    col.zero_out();
                }
            }
            return;
        }
        self.rows = rows;
        self.cols.free();
        self.cols.allocate(cols);
        self.zero_col = SparseVector::new(rows);
    }

    /// Resize to `cols` columns, keeping the overlapping prefix.
    pub fn resize(&mut self, cols: usize) {
        self.cols.resize(cols);
    }

    /// Resize both dimensions. Rows may only grow; sparse columns do not
    /// shrink.
    ///
    /// # Panics
    ///
    /// Panics if `rows` is smaller than the current row count.
    pub fn resize_both(&mut self, rows: usize, cols: usize) {
        assert!(
            rows >= self.rows,
            "cannot shrink sparse matrix from {} to {rows} rows",
            self.rows
        );
        self.cols.resize(cols);
        if rows != self.rows {
            for i in 0..self.cols.len() {
                if let Some(col) = self.cols.get_mut(i) {
                    col.resize(rows);
                }
            }
            self.rows = rows;
            self.zero_col = SparseVector::new(rows);
        }
    }

    /// Drop every column back to the zero sentinel, keeping the shape.
    pub fn reset(&mut self) {
        for i in 0..self.cols.len() {
            self.cols.take(i);
        }
    }

    /// Release everything; the matrix becomes 0 x 0.
    pub fn destroy(&mut self) {
        self.cols.free();
        self.rows = 0;
        self.zero_col = SparseVector::new(0);
    }

    // ========================================================================
    // Columns
    // ========================================================================

    /// Column `i` for reading. An unmaterialized column reads as the shared
    /// zero column.
    ///
    /// # Panics
    ///
    /// Panics if `i >= n_cols()`.
    #[inline]
    pub fn col(&self, i: usize) -> &SparseVector {
        self.check_col(i);
        self.cols.get(i).unwrap_or(&self.zero_col)
    }

    /// Column `i` for writing, materialized on first access.
    ///
    /// # Panics
    ///
    /// Panics if `i >= n_cols()`.
    pub fn col_mut(&mut self, i: usize) -> &mut SparseVector {
        self.check_col(i);
        let rows = self.rows;
        self.cols.get_or_insert_with(i, || SparseVector::new(rows))
    }

    /// Drop column `i` back to the zero sentinel.
    ///
    /// # Panics
    ///
    /// Panics if `i >= n_cols()`.
    pub fn destroy_col(&mut self, i: usize) {
        self.check_col(i);
        self.cols.take(i);
    }

    /// True if column `i` holds only zeros, stored or implicit.
    pub fn is_col_zero(&self, i: usize) -> bool {
        self.check_col(i);
        self.cols.get(i).map_or(true, |c| c.is_zero())
    }

    #[inline]
    fn check_col(&self, i: usize) {
        assert!(
            i < self.cols.len(),
            "column {i} out of range for matrix with {} columns",
            self.cols.len()
        );
    }

    // ========================================================================
    // Elements
    // ========================================================================

    /// Value at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.col(col).get(row)
    }

    /// Set `(row, col)` to `v`, materializing column and entry as needed.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    pub fn set(&mut self, row: usize, col: usize, v: f64) {
        self.col_mut(col).set(row, v);
    }

    /// Add `delta` to `(row, col)`. A zero `delta` does not materialize
    /// anything.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    pub fn add_at(&mut self, row: usize, col: usize, delta: f64) {
        self.check_col(col);
        assert!(
            row < self.rows,
            "row {row} out of range for matrix with {} rows",
            self.rows
        );
        if delta == 0.0 {
            return;
        }
        self.col_mut(col).add_at(row, delta);
    }

    /// Multiply `(row, col)` by `factor`. An unmaterialized column stays
    /// zero.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    pub fn multiply_at(&mut self, row: usize, col: usize, factor: f64) {
        self.check_col(col);
        assert!(
            row < self.rows,
            "row {row} out of range for matrix with {} rows",
            self.rows
        );
        if let Some(c) = self.cols.get_mut(col) {
            c.multiply_at(row, factor);
        }
    }

    /// Set every element to `v`, materializing all columns in dense mode.
    pub fn set_all(&mut self, v: f64) {
        for i in 0..self.cols.len() {
            self.col_mut(i).set_all(v);
        }
    }

    // ========================================================================
    // Arithmetic
    // ========================================================================

    /// Multiply every stored value by `scalar`.
    pub fn multiply(&mut self, scalar: f64) {
        for i in 0..self.cols.len() {
            if let Some(col) = self.cols.get_mut(i) {
                col.multiply(scalar);
            }
        }
    }

    /// L2-normalize each column in place.
    pub fn normalize(&mut self) {
        for i in 0..self.cols.len() {
            if let Some(col) = self.cols.get_mut(i) {
                col.normalize();
            }
        }
    }

    /// Sum-normalize each column in place.
    pub fn normalize1(&mut self) {
        for i in 0..self.cols.len() {
            if let Some(col) = self.cols.get_mut(i) {
                col.normalize1();
            }
        }
    }

    /// Zero out stored values with absolute value below `min_abs`.
    pub fn cut(&mut self, min_abs: f64) {
        for i in 0..self.cols.len() {
            if let Some(col) = self.cols.get_mut(i) {
                col.cut(min_abs);
            }
        }
    }

    /// Clamp stored values above `cap` down to `cap`.
    ///
    /// # Panics
    ///
    /// Panics unless `cap` is positive.
    pub fn cap(&mut self, cap: f64) {
        assert!(cap > 0.0, "cap must be positive, got {cap}");
        for i in 0..self.cols.len() {
            if let Some(col) = self.cols.get_mut(i) {
                col.cap(cap);
            }
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// True if every element is zero.
    pub fn is_zero(&self) -> bool {
        (0..self.cols.len()).all(|i| self.is_col_zero(i))
    }

    /// Number of columns holding at least one non-zero.
    pub fn n_non_zero_cols(&self) -> usize {
        (0..self.cols.len()).filter(|&i| !self.is_col_zero(i)).count()
    }

    /// Number of non-zero elements.
    pub fn n_non_zero(&self) -> usize {
        self.cols.iter().flatten().map(|c| c.n_non_zero()).sum()
    }

    /// Fraction of non-zero elements.
    pub fn density(&self) -> f64 {
        let total = self.rows * self.cols.len();
        if total == 0 {
            return 0.0;
        }
        self.n_non_zero() as f64 / total as f64
    }

    /// Largest element as `(row, col, value)`. Unless `ignore_zero`, an
    /// unmaterialized column contributes an implicit zero at row 0.
    pub fn max(&self, ignore_zero: bool) -> Option<(usize, usize, f64)> {
        let mut best: Option<(usize, usize, f64)> = None;
        for c in 0..self.cols.len() {
            let candidate = match self.cols.get(c) {
                Some(col) => col.max(ignore_zero),
                None if !ignore_zero && self.rows > 0 => Some((0, 0.0)),
                None => None,
            };
            if let Some((r, v)) = candidate {
                if best.map_or(true, |(_, _, bv)| v > bv) {
                    best = Some((r, c, v));
                }
            }
        }
        best
    }

    /// Smallest element as `(row, col, value)`, mirror of [`max`](Self::max).
    pub fn min(&self, ignore_zero: bool) -> Option<(usize, usize, f64)> {
        let mut best: Option<(usize, usize, f64)> = None;
        for c in 0..self.cols.len() {
            let candidate = match self.cols.get(c) {
                Some(col) => col.min(ignore_zero),
                None if !ignore_zero && self.rows > 0 => Some((0, 0.0)),
                None => None,
            };
            if let Some((r, v)) = candidate {
                if best.map_or(true, |(_, _, bv)| v < bv) {
                    best = Some((r, c, v));
                }
            }
        }
        best
    }

    /// Value-wise equality with another matrix of the same shape. Stored
    /// zeros compare equal to implicit zeros.
    pub fn logical_eq(&self, other: &SparseMatrix) -> bool {
        if self.rows != other.rows || self.cols.len() != other.cols.len() {
            return false;
        }
        (0..self.cols.len()).all(|i| self.col(i).logical_eq(other.col(i)))
    }

    // ========================================================================
    // Conversions
    // ========================================================================

    /// Transposed copy of all columns.
    pub fn transpose(&self) -> SparseMatrix {
        self.transpose_range(0, self.cols.len())
    }

    /// Transposed copy of columns `begin..end`.
    ///
    /// The result has `end - begin` rows (one per selected column) and one
    /// column per row of this matrix. Two passes over the non-zero entries:
    /// a count pass that pre-sizes every destination column, then an
    /// in-order fill, so the whole transpose is linear in non-zeros. Stored
    /// zeros are not carried over.
    ///
    /// # Panics
    ///
    /// Panics unless `begin <= end <= n_cols()`.
    pub fn transpose_range(&self, begin: usize, end: usize) -> SparseMatrix {
        assert!(
            begin <= end && end <= self.cols.len(),
            "column range {begin}..{end} out of range for matrix with {} columns",
            self.cols.len()
        );
        let mut out = SparseMatrix::new(end - begin, self.rows);

        let mut counts = vec![0usize; self.rows];
        for c in begin..end {
            if let Some(col) = self.cols.get(c) {
                for (r, _) in col.non_zeros() {
                    counts[r] += 1;
                }
            }
        }
        for (r, &n) in counts.iter().enumerate() {
            if n > 0 {
                out.col_mut(r).clear_prepare(n);
            }
        }

        for c in begin..end {
            if let Some(col) = self.cols.get(c) {
                for (r, v) in col.non_zeros() {
                    out.col_mut(r).set_in_order(c - begin, v);
                }
            }
        }
        out
    }

    /// Dense copy.
    pub fn to_dense(&self) -> DenseMatrix {
        let mut out = DenseMatrix::new(self.rows, self.cols.len());
        for c in 0..self.cols.len() {
            if let Some(col) = self.cols.get(c) {
                for (r, v) in col.non_zeros() {
                    out.set(r, c, v);
                }
            }
        }
        out
    }

    // ========================================================================
    // Archive
    // ========================================================================

    /// Write `[i32 cols][i32 rows][per column: i32 presence + archive]`.
    pub fn write_to<W: Write>(&self, w: &mut RecordWriter<W>) -> Result<(), RecordError> {
        w.write_i32(self.cols.len() as i32)?;
        w.write_i32(self.rows as i32)?;
        for i in 0..self.cols.len() {
            match self.cols.get(i) {
                Some(col) => {
                    w.write_i32(1)?;
                    col.write_to(w)?;
                }
                None => w.write_i32(0)?,
            }
        }
        Ok(())
    }

    /// Read a matrix previously written by [`write_to`](Self::write_to).
    pub fn read_from<R: Read>(r: &mut RecordReader<R>) -> Result<Self, RecordError> {
        let cols = r.read_len()?;
        let rows = r.read_len()?;
        let mut m = SparseMatrix::new(rows, cols);
        for i in 0..cols {
            if r.read_i32()? != 0 {
                m.cols.put(i, SparseVector::read_from(r)?);
            }
        }
        Ok(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn set_get_through_lazy_columns() {
        let mut m = SparseMatrix::new(5, 3);
        assert_eq!(m.get(4, 2), 0.0);
        m.set(4, 2, 1.5);
        assert_eq!(m.get(4, 2), 1.5);
        assert_eq!(m.n_non_zero_cols(), 1);
    }

    #[test]
    fn transpose_three_by_three() {
        // entries at (0,0)=1, (1,0)=2, (2,2)=3
        let mut m = SparseMatrix::new(3, 3);
        m.set(0, 0, 1.0);
        m.set(1, 0, 2.0);
        m.set(2, 2, 3.0);

        let t = m.transpose();
        assert_eq!(t.rows(), 3);
        assert_eq!(t.n_cols(), 3);
        assert_eq!(t.get(0, 0), 1.0);
        assert_eq!(t.get(0, 1), 2.0);
        assert_eq!(t.get(2, 2), 3.0);
        assert_eq!(t.n_non_zero(), 3);
        assert!(t.transpose().logical_eq(&m));
    }

    #[test]
    fn transpose_single_entry_swaps_row_and_col() {
        let mut m = SparseMatrix::new(3, 3);
        m.set(1, 2, 5.0);
        let t = m.transpose();
        assert_eq!(t.get(2, 1), 5.0);
        for c in 0..3 {
            assert_eq!(m.is_col_zero(c), c != 2);
            assert_eq!(t.is_col_zero(c), c != 1);
        }
    }

    #[test]
    fn transpose_range_selects_columns() {
        let mut m = SparseMatrix::new(2, 4);
        m.set(0, 1, 1.0);
        m.set(1, 2, 2.0);
        let t = m.transpose_range(1, 3);
        // selected columns 1..3 become rows 0..2
        assert_eq!(t.rows(), 2);
        assert_eq!(t.n_cols(), 2);
        assert_eq!(t.get(0, 0), 1.0);
        assert_eq!(t.get(1, 1), 2.0);
    }

    #[test]
    fn transpose_drops_stored_zeros() {
        let mut m = SparseMatrix::new(3, 2);
        m.set(1, 0, 0.0);
        m.set(2, 0, 4.0);
        let t = m.transpose();
        assert_eq!(t.col(1).n_stored(), 0);
        assert!(t.is_col_zero(1));
        assert_eq!(t.get(0, 2), 4.0);
        assert_eq!(t.n_non_zero(), m.n_non_zero());
    }

    #[test]
    fn reform_same_shape_drops_entries() {
        let mut m = SparseMatrix::new(3, 3);
        m.set(0, 0, 1.0);
        m.reform(3, 3);
        assert!(m.is_zero());
        assert_eq!(m.n_cols(), 3);
    }

    #[test]
    #[should_panic(expected = "cannot shrink")]
    fn row_shrink_rejected() {
        SparseMatrix::new(4, 2).resize_both(3, 2);
    }

    #[test]
    fn resize_grows_rows_and_cols() {
        let mut m = SparseMatrix::new(2, 2);
        m.set(1, 1, 2.0);
        m.resize_both(4, 3);
        assert_eq!(m.rows(), 4);
        assert_eq!(m.n_cols(), 3);
        assert_eq!(m.get(1, 1), 2.0);
        m.set(3, 2, 1.0);
        assert_eq!(m.get(3, 2), 1.0);
    }

    #[test]
    fn max_min_with_implicit_zero_columns() {
        let mut m = SparseMatrix::new(2, 2);
        m.set(0, 0, -3.0);
        m.set(1, 0, -1.0);
        // column 1 is unmaterialized: implicit zero at row 0 wins the max
        assert_eq!(m.max(false), Some((0, 1, 0.0)));
        assert_eq!(m.max(true), Some((1, 0, -1.0)));
        assert_eq!(m.min(false), Some((0, 0, -3.0)));
    }

    #[test]
    fn dense_conversion_roundtrip() {
        let mut m = SparseMatrix::new(3, 2);
        m.set(0, 0, 1.0);
        m.set(2, 1, -2.0);
        let d = m.to_dense();
        assert_eq!(d.get(2, 1), -2.0);
        assert!(d.to_sparse().logical_eq(&m));
    }

    #[test]
    fn archive_roundtrip() {
        let mut m = SparseMatrix::new(4, 3);
        m.set(1, 0, 1.0);
        m.set(3, 0, 0.0);
        m.set(2, 2, -5.0);
        let mut buf = Vec::new();
        m.write_to(&mut RecordWriter::new(&mut buf)).unwrap();
        let got = SparseMatrix::read_from(&mut RecordReader::new(Cursor::new(buf))).unwrap();
        assert_eq!(got.rows(), 4);
        assert_eq!(got.n_cols(), 3);
        assert!(got.logical_eq(&m));
        assert_eq!(got.col(0).n_stored(), 2);
        assert!(got.cols.get(1).is_none());
    }

    #[test]
    fn new_dense_materializes_all_columns() {
        let m = SparseMatrix::new_dense(2, 2);
        assert_eq!(m.col(0).n_stored(), 2);
        assert!(m.is_zero());
    }
}
