//! Expandable storage primitives backing the container types.
//!
//! Two flavors cover every expandable structure in the crate:
//!
//! - [`Arena<T>`]: a contiguous block of plain values (`Copy + Default`).
//!   Used for dense elements, sparse entry tables, and pool data blobs.
//! - [`SlotArena<T>`]: a block of owned-object slots, each either empty or
//!   holding a `T`. Used for matrix column arrays, where an empty slot
//!   represents an all-zero column.
//!
//! Both grow and shrink only through explicit `resize`; nothing reallocates
//! implicitly. Ownership of a whole block moves between arenas via
//! [`Arena::transfer_from`] without copying elements, and single objects move
//! out of a [`SlotArena`] via [`SlotArena::take`].

/// Owning, resizable block of plain values.
///
/// An `Arena` is either empty (no allocation) or holds exactly `len`
/// elements. `allocate` may only be called on an empty arena; use `resize`
/// to change the size of an occupied one. This keeps every size change an
/// explicit, visible operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Arena<T> {
    buf: Box<[T]>,
}

impl<T: Copy + Default> Arena<T> {
    /// Create an empty arena. Does not allocate.
    pub fn new() -> Self {
        Self {
            buf: Box::new([]),
        }
    }

    /// Allocate a block of `n` default-initialized elements.
    ///
    /// `n == 0` is legal and leaves the arena empty.
    ///
    /// # Panics
    ///
    /// Panics if the arena is already occupied.
    pub fn allocate(&mut self, n: usize) {
        assert!(
            self.buf.is_empty(),
            "arena is occupied: free() before allocate()"
        );
        if n > 0 {
            self.buf = vec![T::default(); n].into_boxed_slice();
        }
    }

    /// Reallocate to `n` elements, preserving the overlapping prefix.
    ///
    /// Elements past the old length are default-initialized. `resize(0)`
    /// is equivalent to `free()`.
    pub fn resize(&mut self, n: usize) {
        if n == self.buf.len() {
            return;
        }
        let mut next = vec![T::default(); n];
        let keep = n.min(self.buf.len());
        next[..keep].copy_from_slice(&self.buf[..keep]);
        self.buf = next.into_boxed_slice();
    }

    /// Release the backing storage.
    pub fn free(&mut self) {
        self.buf = Box::new([]);
    }

    /// Move `other`'s block into this arena without element-wise copying.
    ///
    /// This arena's previous block is released; `other` is left empty.
    pub fn transfer_from(&mut self, other: &mut Self) {
        self.buf = std::mem::take(&mut other.buf);
    }

    /// Number of elements in the block.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if no block is held.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// View the block as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.buf
    }

    /// View the block as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.buf
    }
}

impl<T: Copy + Default> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::ops::Index<usize> for Arena<T> {
    type Output = T;

    #[inline]
    fn index(&self, i: usize) -> &T {
        &self.buf[i]
    }
}

impl<T> std::ops::IndexMut<usize> for Arena<T> {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut T {
        &mut self.buf[i]
    }
}

/// Owning, resizable array of object slots.
///
/// Each slot is either empty or holds an owned `T`. Resizing moves the
/// surviving slots; it never clones the objects inside them.
#[derive(Debug, Clone)]
pub struct SlotArena<T> {
    slots: Box<[Option<T>]>,
}

impl<T> SlotArena<T> {
    /// Create an empty slot array. Does not allocate.
    pub fn new() -> Self {
        Self {
            slots: Box::new([]),
        }
    }

    /// Allocate `n` empty slots.
    ///
    /// # Panics
    ///
    /// Panics if the array is already occupied.
    pub fn allocate(&mut self, n: usize) {
        assert!(
            self.slots.is_empty(),
            "slot arena is occupied: free() before allocate()"
        );
        if n > 0 {
            let mut v = Vec::with_capacity(n);
            v.resize_with(n, || None);
            self.slots = v.into_boxed_slice();
        }
    }

    /// Resize to `n` slots, moving the overlapping prefix.
    ///
    /// New slots are empty; slots past `n` are dropped with their contents.
    pub fn resize(&mut self, n: usize) {
        if n == self.slots.len() {
            return;
        }
        let old = std::mem::take(&mut self.slots);
        let mut next: Vec<Option<T>> = Vec::with_capacity(n);
        for slot in old.into_vec().into_iter().take(n) {
            next.push(slot);
        }
        next.resize_with(n, || None);
        self.slots = next.into_boxed_slice();
    }

    /// Drop all slots and their contents.
    pub fn free(&mut self) {
        self.slots = Box::new([]);
    }

    /// Number of slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if no slots are held.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Borrow the object in slot `i`, if any.
    #[inline]
    pub fn get(&self, i: usize) -> Option<&T> {
        self.slots[i].as_ref()
    }

    /// Mutably borrow the object in slot `i`, if any.
    #[inline]
    pub fn get_mut(&mut self, i: usize) -> Option<&mut T> {
        self.slots[i].as_mut()
    }

    /// Move the object out of slot `i`, leaving the slot empty.
    #[inline]
    pub fn take(&mut self, i: usize) -> Option<T> {
        self.slots[i].take()
    }

    /// Place `value` into slot `i`, dropping any previous occupant, and
    /// borrow it back.
    #[inline]
    pub fn put(&mut self, i: usize, value: T) -> &mut T {
        self.slots[i] = Some(value);
        self.slots[i].as_mut().unwrap()
    }

    /// Mutably borrow slot `i`, materializing it with `init` if empty.
    #[inline]
    pub fn get_or_insert_with(&mut self, i: usize, init: impl FnOnce() -> T) -> &mut T {
        self.slots[i].get_or_insert_with(init)
    }

    /// Iterate over the slots.
    pub fn iter(&self) -> impl Iterator<Item = Option<&T>> {
        self.slots.iter().map(|s| s.as_ref())
    }
}

impl<T> Default for SlotArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_starts_empty() {
        let a: Arena<f64> = Arena::new();
        assert_eq!(a.len(), 0);
        assert!(a.is_empty());
    }

    #[test]
    fn allocate_zero_fills() {
        let mut a: Arena<f64> = Arena::new();
        a.allocate(4);
        assert_eq!(a.as_slice(), &[0.0; 4]);
    }

    #[test]
    #[should_panic(expected = "occupied")]
    fn allocate_twice_panics() {
        let mut a: Arena<i32> = Arena::new();
        a.allocate(2);
        a.allocate(2);
    }

    #[test]
    fn allocate_after_free_is_legal() {
        let mut a: Arena<i32> = Arena::new();
        a.allocate(2);
        a.free();
        a.allocate(3);
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn resize_preserves_prefix() {
        let mut a: Arena<i32> = Arena::new();
        a.allocate(3);
        a.as_mut_slice().copy_from_slice(&[1, 2, 3]);

        a.resize(5);
        assert_eq!(a.as_slice(), &[1, 2, 3, 0, 0]);

        a.resize(2);
        assert_eq!(a.as_slice(), &[1, 2]);
    }

    #[test]
    fn transfer_leaves_source_empty() {
        let mut src: Arena<i32> = Arena::new();
        src.allocate(3);
        src.as_mut_slice().copy_from_slice(&[7, 8, 9]);

        let mut dst: Arena<i32> = Arena::new();
        dst.allocate(1);
        dst.transfer_from(&mut src);

        assert_eq!(dst.as_slice(), &[7, 8, 9]);
        assert!(src.is_empty());
    }

    #[test]
    fn slot_arena_take_and_put() {
        let mut s: SlotArena<String> = SlotArena::new();
        s.allocate(3);
        assert!(s.get(0).is_none());

        s.put(1, "col".to_string());
        assert_eq!(s.get(1).map(String::as_str), Some("col"));

        let taken = s.take(1);
        assert_eq!(taken.as_deref(), Some("col"));
        assert!(s.get(1).is_none());
    }

    #[test]
    fn slot_arena_resize_moves_prefix() {
        let mut s: SlotArena<String> = SlotArena::new();
        s.allocate(2);
        s.put(0, "a".to_string());
        s.put(1, "b".to_string());

        s.resize(4);
        assert_eq!(s.get(0).map(String::as_str), Some("a"));
        assert_eq!(s.get(1).map(String::as_str), Some("b"));
        assert!(s.get(2).is_none());

        s.resize(1);
        assert_eq!(s.len(), 1);
        assert_eq!(s.get(0).map(String::as_str), Some("a"));
    }

    #[test]
    fn iter_walks_slots_in_order() {
        let mut s: SlotArena<i32> = SlotArena::new();
        s.allocate(3);
        s.put(1, 7);
        let got: Vec<_> = s.iter().collect();
        assert_eq!(got, vec![None, Some(&7), None]);
    }

    #[test]
    fn get_or_insert_materializes_once() {
        let mut s: SlotArena<Vec<i32>> = SlotArena::new();
        s.allocate(1);
        s.get_or_insert_with(0, Vec::new).push(5);
        s.get_or_insert_with(0, Vec::new).push(6);
        assert_eq!(s.get(0), Some(&vec![5, 6]));
    }
}
