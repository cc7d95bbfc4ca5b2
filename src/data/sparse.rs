//! Sparse vector: explicit entries in ascending index order.

use std::io::{Read, Write};

use crate::arena::Arena;
use crate::data::{NonZeros, VectorRead};
use crate::io::{RecordError, RecordReader, RecordWriter};

/// Largest candidate window searched linearly before switching to binary
/// search.
const LINEAR_SEARCH_MAX: usize = 32;

/// Storage growth step: at least 32 entries, at most 4096, otherwise the
/// current entry count (doubling).
fn growth_step(stored: usize) -> usize {
    stored.clamp(32, 4096)
}

/// One stored component of a [`SparseVector`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SparseEntry {
    pub index: u32,
    pub value: f64,
}

/// Fixed-length vector storing only explicit `(index, value)` entries.
///
/// Entries are kept in strictly ascending index order. A stored value of
/// zero is legal: it occupies an entry but reads as zero everywhere the
/// non-zero cursor is used. When every position is materialized the vector
/// is in dense mode and lookups become direct indexing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparseVector {
    elm: Arena<SparseEntry>,
    stored: usize,
    rows: usize,
}

impl SparseVector {
    /// Vector of logical length `n` with no stored entries.
    pub fn new(n: usize) -> Self {
        Self {
            elm: Arena::new(),
            stored: 0,
            rows: n,
        }
    }

    /// Vector of logical length `n` with every position materialized at
    /// zero (dense mode).
    pub fn new_dense(n: usize) -> Self {
        let mut v = Self::new(n);
        v.set_all(0.0);
        v
    }

    /// Copy of another readable vector's non-zero components, scaled by
    /// `coeff`.
    pub fn from_vector(other: &impl VectorRead, coeff: f64) -> Self {
        let mut v = Self::new(other.len());
        v.assign(other, coeff);
        v
    }

    // ========================================================================
    // Shape
    // ========================================================================

    /// Re-shape to logical length `n`, discarding all entries. With
    /// `as_dense` every position is materialized at zero.
    pub fn reform(&mut self, n: usize, as_dense: bool) {
        self.rows = n;
        if as_dense {
            self.set_all(0.0);
        } else {
            self.clear_entries();
        }
    }

    /// Grow the logical length to `n`. Stored entries are unaffected.
    ///
    /// # Panics
    ///
    /// Panics if `n` is smaller than the current length; sparse vectors do
    /// not shrink.
    pub fn resize(&mut self, n: usize) {
        assert!(
            n >= self.rows,
            "cannot shrink sparse vector from {} to {n}",
            self.rows
        );
        self.rows = n;
    }

    /// Discard all entries and reserve room for exactly `n` of them.
    pub fn clear_prepare(&mut self, n: usize) {
        self.stored = 0;
        self.elm.free();
        self.elm.allocate(n.min(self.rows));
    }

    /// Discard all entries and release entry storage. Length is unchanged.
    pub fn clear_entries(&mut self) {
        self.stored = 0;
        self.elm.free();
    }

    /// Logical length.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows
    }

    /// True if the logical length is zero.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Number of stored entries, including stored zeros.
    #[inline]
    pub fn n_stored(&self) -> usize {
        self.stored
    }

    /// The stored entries, in ascending index order.
    #[inline]
    pub fn entries(&self) -> &[SparseEntry] {
        &self.elm.as_slice()[..self.stored]
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Position of `index` among the stored entries, or the insertion point
    /// that keeps the order.
    fn locate(&self, index: usize) -> Result<usize, usize> {
        // Dense mode: index order plus full occupancy make this an identity
        // mapping.
        if self.stored == self.rows {
            return Ok(index);
        }
        if self.stored == 0 {
            return Err(0);
        }
        let entries = self.entries();
        if entries.len() <= LINEAR_SEARCH_MAX {
            for (pos, e) in entries.iter().enumerate() {
                let at = e.index as usize;
                if at == index {
                    return Ok(pos);
                }
                if at > index {
                    return Err(pos);
                }
            }
            return Err(entries.len());
        }
        entries.binary_search_by_key(&index, |e| e.index as usize)
    }

    /// Position of the entry for `index`, inserting a zero entry if absent.
    fn to_insert(&mut self, index: usize) -> usize {
        let at = match self.locate(index) {
            Ok(pos) => return pos,
            Err(pos) => pos,
        };
        if self.stored >= self.elm.len() {
            let cap = (self.elm.len() + growth_step(self.stored)).min(self.rows);
            self.elm.resize(cap);
        }
        let slice = self.elm.as_mut_slice();
        slice.copy_within(at..self.stored, at + 1);
        slice[at] = SparseEntry {
            index: index as u32,
            value: 0.0,
        };
        self.stored += 1;
        at
    }

    #[inline]
    fn check_index(&self, i: usize) {
        assert!(
            i < self.rows,
            "index {i} out of range for vector of length {}",
            self.rows
        );
    }

    // ========================================================================
    // Element access
    // ========================================================================

    /// Set position `i` to `v`, materializing an entry if needed.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len()`.
    pub fn set(&mut self, i: usize, v: f64) {
        self.check_index(i);
        let pos = self.to_insert(i);
        self.elm[pos].value = v;
    }

    /// Add `delta` to position `i`, materializing an entry if needed.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len()`.
    pub fn add_at(&mut self, i: usize, delta: f64) {
        self.check_index(i);
        let pos = self.to_insert(i);
        self.elm[pos].value += delta;
    }

    /// Multiply position `i` by `factor`. An implicit zero stays zero; no
    /// entry is materialized.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len()`.
    pub fn multiply_at(&mut self, i: usize, factor: f64) {
        self.check_index(i);
        if let Ok(pos) = self.locate(i) {
            self.elm[pos].value *= factor;
        }
    }

    /// Append an entry past all existing ones. The fast path for building a
    /// vector in index order: no search, no shifting.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len()` or `i` is not strictly greater than the last
    /// stored index.
    pub fn set_in_order(&mut self, i: usize, v: f64) {
        self.check_index(i);
        if self.stored > 0 {
            let last = self.elm[self.stored - 1].index as usize;
            assert!(
                i > last,
                "out-of-order append: index {i} after {last}"
            );
        }
        if self.stored >= self.elm.len() {
            let cap = (self.elm.len() + growth_step(self.stored)).min(self.rows);
            self.elm.resize(cap);
        }
        self.elm[self.stored] = SparseEntry {
            index: i as u32,
            value: v,
        };
        self.stored += 1;
    }

    /// Replace all entries with `pairs`, which must be in strictly
    /// ascending index order.
    ///
    /// # Panics
    ///
    /// Panics on an out-of-range index or an ordering violation.
    pub fn load(&mut self, pairs: &[(usize, f64)]) {
        self.clear_prepare(pairs.len());
        for &(i, v) in pairs {
            self.set_in_order(i, v);
        }
    }

    /// Replace all entries with `pairs` in any order; sorts by index first.
    ///
    /// # Panics
    ///
    /// Panics on an out-of-range or duplicate index.
    pub fn load_unordered(&mut self, pairs: &[(usize, f64)]) {
        let mut sorted = pairs.to_vec();
        sorted.sort_by_key(|&(i, _)| i);
        self.load(&sorted);
    }

    /// Materialize every position at value `v` (dense mode).
    pub fn set_all(&mut self, v: f64) {
        self.clear_prepare(self.rows);
        for i in 0..self.rows {
            self.elm[i] = SparseEntry {
                index: i as u32,
                value: v,
            };
        }
        self.stored = self.rows;
    }

    /// Drop all stored entries, keeping entry storage for reuse.
    pub fn zero_out(&mut self) {
        self.stored = 0;
    }

    /// Value at position `i`; implicit zeros read as 0.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len()`.
    pub fn get(&self, i: usize) -> f64 {
        self.check_index(i);
        match self.locate(i) {
            Ok(pos) => self.elm[pos].value,
            Err(_) => 0.0,
        }
    }

    // ========================================================================
    // Arithmetic
    // ========================================================================

    /// Replace contents with `coeff * other`, re-shaping to `other`'s
    /// length. Only `other`'s non-zeros are materialized; a zero `coeff`
    /// leaves the vector empty.
    pub fn assign(&mut self, other: &impl VectorRead, coeff: f64) {
        self.rows = other.len();
        if coeff == 0.0 {
            self.clear_entries();
            return;
        }
        self.clear_prepare(other.n_non_zero());
        for (i, v) in other.non_zeros() {
            self.set_in_order(i, coeff * v);
        }
    }

    /// Multiply every stored value by `scalar`. No-op when `scalar` is 1.
    pub fn multiply(&mut self, scalar: f64) {
        if scalar == 1.0 {
            return;
        }
        for e in &mut self.elm.as_mut_slice()[..self.stored] {
            e.value *= scalar;
        }
    }

    /// Multiply each stored value by the factor at its index.
    ///
    /// # Panics
    ///
    /// Panics if `factors.len() != len()`.
    pub fn scale_by_slice(&mut self, factors: &[f64]) {
        assert_eq!(
            factors.len(),
            self.rows,
            "length mismatch in sparse scale"
        );
        for e in &mut self.elm.as_mut_slice()[..self.stored] {
            e.value *= factors[e.index as usize];
        }
    }

    /// Sum of all components.
    pub fn sum(&self) -> f64 {
        self.entries().iter().map(|e| e.value).sum()
    }

    /// Sum of absolute values of all components.
    pub fn abs_sum(&self) -> f64 {
        self.entries().iter().map(|e| e.value.abs()).sum()
    }

    /// Squared L2 norm.
    pub fn self_inner_product(&self) -> f64 {
        self.entries().iter().map(|e| e.value * e.value).sum()
    }

    /// Divide stored values by the L2 norm, returning the norm. No-op on a
    /// zero vector.
    pub fn normalize(&mut self) -> f64 {
        let norm = self.self_inner_product().sqrt();
        if norm != 0.0 {
            for e in &mut self.elm.as_mut_slice()[..self.stored] {
                e.value /= norm;
            }
        }
        norm
    }

    /// Divide stored values by the component sum, returning the sum. No-op
    /// when the sum is zero.
    pub fn normalize1(&mut self) -> f64 {
        let sum = self.sum();
        if sum != 0.0 {
            for e in &mut self.elm.as_mut_slice()[..self.stored] {
                e.value /= sum;
            }
        }
        sum
    }

    /// Zero out stored values with absolute value below `min_abs`. Entries
    /// stay materialized.
    pub fn cut(&mut self, min_abs: f64) {
        for e in &mut self.elm.as_mut_slice()[..self.stored] {
            if e.value.abs() < min_abs {
                e.value = 0.0;
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
        for e in &mut self.elm.as_mut_slice()[..self.stored] {
            if e.value > cap {
                e.value = cap;
            }
        }
    }

    // ========================================================================
    // Extremes
    // ========================================================================

    /// Largest component and its position. With `ignore_zero`, stored zeros
    /// are skipped and implicit zeros never compete.
    ///
    /// Without `ignore_zero`, if no stored value is non-negative and
    /// unmaterialized positions exist, the first such position is reported
    /// as an implicit zero maximum.
    pub fn max(&self, ignore_zero: bool) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for e in self.entries() {
            if ignore_zero && e.value == 0.0 {
                continue;
            }
            if best.map_or(true, |(_, bv)| e.value > bv) {
                best = Some((e.index as usize, e.value));
            }
        }
        if !ignore_zero && best.map_or(true, |(_, bv)| bv < 0.0) && self.stored < self.rows {
            best = Some((self.first_unstored_index(), 0.0));
        }
        best
    }

    /// Smallest component and its position, the mirror of [`max`](Self::max):
    /// without `ignore_zero`, an implicit zero wins when every stored value
    /// is positive and unmaterialized positions exist.
    pub fn min(&self, ignore_zero: bool) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for e in self.entries() {
            if ignore_zero && e.value == 0.0 {
                continue;
            }
            if best.map_or(true, |(_, bv)| e.value < bv) {
                best = Some((e.index as usize, e.value));
            }
        }
        if !ignore_zero && best.map_or(true, |(_, bv)| bv > 0.0) && self.stored < self.rows {
            best = Some((self.first_unstored_index(), 0.0));
        }
        best
    }

    /// Position and signed value of the stored component with the largest
    /// absolute value; `(0, 0.0)` when nothing is stored.
    pub fn max_abs(&self) -> (usize, f64) {
        let mut best: Option<(usize, f64)> = None;
        for e in self.entries() {
            if best.map_or(true, |(_, bv): (usize, f64)| e.value.abs() > bv.abs()) {
                best = Some((e.index as usize, e.value));
            }
        }
        best.unwrap_or((0, 0.0))
    }

    /// Smallest strictly positive component and its position.
    pub fn min_positive(&self) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for e in self.entries() {
            if e.value > 0.0 && best.map_or(true, |(_, bv)| e.value < bv) {
                best = Some((e.index as usize, e.value));
            }
        }
        best
    }

    /// First position with no stored entry. Scans the leading run where
    /// entry indices match their positions; the gap starts right after it.
    fn first_unstored_index(&self) -> usize {
        let entries = self.entries();
        let mut ex = 0;
        while ex < entries.len() && entries[ex].index as usize == ex {
            ex += 1;
        }
        if ex == 0 {
            0
        } else {
            entries[ex - 1].index as usize + 1
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Index of the first non-zero component.
    pub fn first_non_zero_index(&self) -> Option<usize> {
        self.non_zeros().next().map(|(i, _)| i)
    }

    /// Indices of all non-zero components, ascending.
    pub fn non_zero_indices(&self) -> Vec<usize> {
        self.non_zeros().map(|(i, _)| i).collect()
    }

    /// Value-wise equality: same length and same non-zero components.
    /// Stored zeros and implicit zeros compare equal.
    pub fn logical_eq(&self, other: &SparseVector) -> bool {
        self.rows == other.rows && self.non_zeros().eq(other.non_zeros())
    }

    // ========================================================================
    // Archive
    // ========================================================================

    /// Write `[i32 length][i32 storedCount][storedCount x (i32, f64)]`.
    pub fn write_to<W: Write>(&self, w: &mut RecordWriter<W>) -> Result<(), RecordError> {
        w.write_i32(self.rows as i32)?;
        w.write_i32(self.stored as i32)?;
        for e in self.entries() {
            w.write_i32(e.index as i32)?;
            w.write_f64(e.value)?;
        }
        Ok(())
    }

    /// Read a vector previously written by [`write_to`](Self::write_to).
    pub fn read_from<R: Read>(r: &mut RecordReader<R>) -> Result<Self, RecordError> {
        let rows = r.read_len()?;
        let stored = r.read_len()?;
        let mut v = Self::new(rows);
        v.clear_prepare(stored);
        for _ in 0..stored {
            let index = r.read_len()?;
            let value = r.read_f64()?;
            v.set_in_order(index, value);
        }
        Ok(v)
    }
}

impl VectorRead for SparseVector {
    #[inline]
    fn len(&self) -> usize {
        self.rows
    }

    #[inline]
    fn get(&self, i: usize) -> f64 {
        SparseVector::get(self, i)
    }

    fn is_zero(&self) -> bool {
        self.entries().iter().all(|e| e.value == 0.0)
    }

    fn n_non_zero(&self) -> usize {
        self.entries().iter().filter(|e| e.value != 0.0).count()
    }

    fn non_zeros(&self) -> NonZeros<'_> {
        NonZeros::over_sparse(self.entries())
    }
}
