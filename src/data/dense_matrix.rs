//! Dense matrix: a column collection over [`DenseVector`].

use std::io::{Read, Write};

use crate::arena::SlotArena;
use crate::data::{DenseVector, SparseMatrix, VectorRead};
use crate::io::{RecordError, RecordReader, RecordWriter};

/// Column-major dense matrix of `f64`.
///
/// Columns are materialized lazily: an all-zero column occupies an empty
/// slot, and read access to it yields a shared zero column that is never
/// mutated in place. [`col`](Self::col) therefore always returns a usable
/// vector; [`col_mut`](Self::col_mut) materializes on demand.
///
/// While [locked](Self::lock), every operation that would reallocate the
/// column array panics. Callers holding column references across helper
/// calls use the lock to make accidental reshapes loud.
#[derive(Debug, Clone)]
pub struct DenseMatrix {
    rows: usize,
    cols: SlotArena<DenseVector>,
    zero_col: DenseVector,
    locked: bool,
}

impl DenseMatrix {
    /// All-zero matrix with `rows` rows and `cols` columns.
    pub fn new(rows: usize, cols: usize) -> Self {
        let mut slots = SlotArena::new();
        slots.allocate(cols);
        Self {
            rows,
            cols: slots,
            zero_col: DenseVector::new(rows),
            locked: false,
        }
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
    // Lock
    // ========================================================================

    /// Forbid reallocation of the column array until [`unlock`](Self::unlock).
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Allow reallocation again.
    pub fn unlock(&mut self) {
        self.locked = false;
    }

    #[inline]
    fn check_lock(&self) {
        assert!(!self.locked, "matrix is locked against reallocation");
    }

    // ========================================================================
    // Shape
    // ========================================================================

    /// Re-shape, discarding all contents. When the shape is unchanged the
    /// materialized columns are zero-filled in place with no reallocation.
    ///
    /// # Panics
    ///
    /// Panics if the matrix is locked.
    pub fn reform(&mut self, rows: usize, cols: usize) {
        self.check_lock();
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
        self.zero_col = DenseVector::new(rows);
    }

    /// Resize to `cols` columns, keeping the overlapping prefix.
    ///
    /// # Panics
    ///
    /// Panics if the matrix is locked.
    pub fn resize(&mut self, cols: usize) {
        self.check_lock();
        self.cols.resize(cols);
    }

    /// Resize both dimensions, keeping overlapping contents. New positions
    /// are zero; shrinking is allowed in either dimension.
    ///
    /// # Panics
    ///
    /// Panics if the matrix is locked.
    pub fn resize_both(&mut self, rows: usize, cols: usize) {
        self.check_lock();
        self.cols.resize(cols);
        if rows != self.rows {
            for i in 0..self.cols.len() {
                if let Some(col) = self.cols.get_mut(i) {
                    col.resize(rows);
                }
            }
            self.rows = rows;
            self.zero_col = DenseVector::new(rows);
        }
    }

    /// Drop every column back to the zero sentinel, keeping the shape.
    ///
    /// # Panics
    ///
    /// Panics if the matrix is locked.
    pub fn reset(&mut self) {
        self.check_lock();
        for i in 0..self.cols.len() {
            self.cols.take(i);
        }
    }

    /// Release everything; the matrix becomes 0 x 0.
    ///
    /// # Panics
    ///
    /// Panics if the matrix is locked.
    pub fn destroy(&mut self) {
        self.check_lock();
        self.cols.free();
        self.rows = 0;
        self.zero_col = DenseVector::new(0);
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
    pub fn col(&self, i: usize) -> &DenseVector {
        self.check_col(i);
        self.cols.get(i).unwrap_or(&self.zero_col)
    }

    /// Column `i` for writing, materialized on first access.
    ///
    /// # Panics
    ///
    /// Panics if `i >= n_cols()`.
    pub fn col_mut(&mut self, i: usize) -> &mut DenseVector {
        self.check_col(i);
        let rows = self.rows;
        self.cols.get_or_insert_with(i, || DenseVector::new(rows))
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

    /// True if column `i` holds only zeros.
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

    /// Set `(row, col)` to `v`, materializing the column if needed.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    pub fn set(&mut self, row: usize, col: usize, v: f64) {
        self.col_mut(col).set(row, v);
    }

    /// Add `delta` to `(row, col)`. A zero `delta` is a no-op and does not
    /// materialize the column.
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

    /// Set every element to `v`, materializing all columns.
    pub fn set_all(&mut self, v: f64) {
        for i in 0..self.cols.len() {
            self.col_mut(i).set_all(v);
        }
    }

    // ========================================================================
    // Arithmetic
    // ========================================================================

    /// Multiply every element by `scalar`.
    pub fn multiply(&mut self, scalar: f64) {
        for i in 0..self.cols.len() {
            if let Some(col) = self.cols.get_mut(i) {
                col.multiply(scalar);
            }
        }
    }

    /// `self += coeff * other`, column by column.
    ///
    /// # Panics
    ///
    /// Panics on shape mismatch.
    pub fn add(&mut self, other: &DenseMatrix, coeff: f64) {
        self.check_shape(other.rows, other.n_cols());
        if coeff == 0.0 {
            return;
        }
        for i in 0..self.cols.len() {
            if !other.is_col_zero(i) {
                self.col_mut(i).add(other.col(i), coeff);
            }
        }
    }

    /// `self += coeff * other` for a sparse right-hand side.
    ///
    /// # Panics
    ///
    /// Panics on shape mismatch.
    pub fn add_sparse(&mut self, other: &SparseMatrix, coeff: f64) {
        self.check_shape(other.rows(), other.n_cols());
        if coeff == 0.0 {
            return;
        }
        for i in 0..self.cols.len() {
            if !other.is_col_zero(i) {
                self.col_mut(i).add(other.col(i), coeff);
            }
        }
    }

    /// Scale every column component-wise by `factors`, dividing when
    /// `inverse`. Rows where `factors` is zero become zero.
    ///
    /// # Panics
    ///
    /// Panics if `factors.len() != rows()`.
    pub fn scale(&mut self, factors: &impl VectorRead, inverse: bool) {
        assert_eq!(
            factors.len(),
            self.rows,
            "length mismatch in matrix scale"
        );
        for i in 0..self.cols.len() {
            if let Some(col) = self.cols.get_mut(i) {
                col.scale(factors, inverse);
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

    /// Replace each element by its sign.
    pub fn binarize(&mut self) {
        for i in 0..self.cols.len() {
            if let Some(col) = self.cols.get_mut(i) {
                col.binarize();
            }
        }
    }

    /// Replace each non-zero element by 1.
    pub fn binarize1(&mut self) {
        for i in 0..self.cols.len() {
            if let Some(col) = self.cols.get_mut(i) {
                col.binarize1();
            }
        }
    }

    /// Zero out elements with absolute value below `min_abs`.
    pub fn cut(&mut self, min_abs: f64) {
        for i in 0..self.cols.len() {
            if let Some(col) = self.cols.get_mut(i) {
                col.cut(min_abs);
            }
        }
    }

    fn check_shape(&self, rows: usize, cols: usize) {
        assert!(
            self.rows == rows && self.cols.len() == cols,
            "shape mismatch: {}x{} vs {}x{}",
            self.rows,
            self.cols.len(),
            rows,
            cols
        );
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

    /// Largest element as `(row, col, value)`; earliest column, then
    /// earliest row, wins a tie. `None` on a matrix with no elements.
    pub fn max(&self) -> Option<(usize, usize, f64)> {
        let mut best: Option<(usize, usize, f64)> = None;
        for c in 0..self.cols.len() {
            if let Some((r, v)) = self.col(c).max() {
                if best.map_or(true, |(_, _, bv)| v > bv) {
                    best = Some((r, c, v));
                }
            }
        }
        best
    }

    /// Element-wise equality with another matrix of the same shape.
    pub fn logical_eq(&self, other: &DenseMatrix) -> bool {
        if self.rows != other.rows || self.cols.len() != other.cols.len() {
            return false;
        }
        (0..self.cols.len()).all(|i| self.col(i).values() == other.col(i).values())
    }

    // ========================================================================
    // Conversions
    // ========================================================================

    /// Transposed copy.
    pub fn transpose(&self) -> DenseMatrix {
        let mut out = DenseMatrix::new(self.cols.len(), self.rows);
        for c in 0..self.cols.len() {
            if let Some(col) = self.cols.get(c) {
                for (r, v) in col.non_zeros() {
                    out.set(c, r, v);
                }
            }
        }
        out
    }

    /// Sparse copy holding only the non-zero elements.
    pub fn to_sparse(&self) -> SparseMatrix {
        let mut out = SparseMatrix::new(self.rows, self.cols.len());
        for c in 0..self.cols.len() {
            if self.is_col_zero(c) {
                continue;
            }
            let src = self.col(c);
            let dst = out.col_mut(c);
            dst.clear_prepare(src.n_non_zero());
            for (r, v) in src.non_zeros() {
                dst.set_in_order(r, v);
            }
        }
        out
    }

    /// Dense transposed copy of a sparse matrix.
    pub fn from_sparse_transposed(src: &SparseMatrix) -> DenseMatrix {
        let mut out = DenseMatrix::new(src.n_cols(), src.rows());
        for c in 0..src.n_cols() {
            for (r, v) in src.col(c).non_zeros() {
                out.set(c, r, v);
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
        let mut m = DenseMatrix::new(rows, cols);
        for i in 0..cols {
            if r.read_i32()? != 0 {
                m.cols.put(i, DenseVector::read_from(r)?);
            }
        }
        Ok(m)
    }
}
