//! Interning pools for byte and integer sequences.
//!
//! A pool deduplicates variable-length sequences, keeping an occurrence
//! count and an optional integer payload per distinct sequence. Sequences
//! live back to back in one compacted data arena; an entry is an
//! `(offset, length)` view into it.
//!
//! # Lifecycle
//!
//! A pool is either *open* or *committed*. While open, [`put`](Pool::put)
//! deduplicates by linear scan and entries may be rewritten, shortened, or
//! erased. [`commit`](Pool::commit) compacts the data arena and builds a
//! search index; only a committed pool answers [`find`](Pool::find).
//! Appending to a committed pool re-opens it, discarding the index. Entry
//! ids are positions in insertion order and survive `commit`; `reduce` and
//! `erase` renumber the survivors.
//!
//! [`BytePool`] interns byte strings (feature names, categorical tokens);
//! [`IntPool`] interns `i32` sequences (node paths, feature id lists).

use std::io::{Read, Write};

use crate::arena::Arena;
use crate::io::{RecordError, RecordReader, RecordWriter};

/// Pool over byte sequences.
pub type BytePool = Pool<u8>;

/// Pool over `i32` sequences.
pub type IntPool = Pool<i32>;

/// Element types a [`Pool`] can intern. Implemented for `u8` and `i32`.
pub trait PoolElem: Copy + Default + Ord {
    /// Write a run of elements to an archive.
    fn write_run<W: Write>(w: &mut RecordWriter<W>, run: &[Self]) -> Result<(), RecordError>;

    /// Read a run of `n` elements from an archive.
    fn read_run<R: Read>(r: &mut RecordReader<R>, n: usize) -> Result<Vec<Self>, RecordError>;
}

impl PoolElem for u8 {
    fn write_run<W: Write>(w: &mut RecordWriter<W>, run: &[u8]) -> Result<(), RecordError> {
        w.write_bytes(run)
    }

    fn read_run<R: Read>(r: &mut RecordReader<R>, n: usize) -> Result<Vec<u8>, RecordError> {
        let mut buf = vec![0u8; n];
        r.read_bytes(&mut buf)?;
        Ok(buf)
    }
}

impl PoolElem for i32 {
    fn write_run<W: Write>(w: &mut RecordWriter<W>, run: &[i32]) -> Result<(), RecordError> {
        for &v in run {
            w.write_i32(v)?;
        }
        Ok(())
    }

    fn read_run<R: Read>(r: &mut RecordReader<R>, n: usize) -> Result<Vec<i32>, RecordError> {
        let mut buf = Vec::with_capacity(n);
        for _ in 0..n {
            buf.push(r.read_i32()?);
        }
        Ok(buf)
    }
}

/// One interned sequence: a view into the data arena plus its bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct PoolEntry {
    offs: usize,
    len: usize,
    count: u32,
    value: Option<i64>,
}

/// Contiguous run of index positions sharing one sequence length.
#[derive(Debug, Clone, Copy)]
struct LenBucket {
    len: usize,
    begin: usize,
    end: usize,
}

#[derive(Debug, Clone)]
enum State {
    Open,
    Committed {
        /// Entry ids ordered by (length, content).
        sorted: Vec<usize>,
        /// Per-length ranges into `sorted`, ascending by length.
        buckets: Vec<LenBucket>,
    },
}

/// Deduplicating catalog of sequences with counts and payload values.
///
/// See the [module docs](self) for the open/committed lifecycle.
#[derive(Debug, Clone)]
pub struct Pool<T: PoolElem> {
    entries: Vec<PoolEntry>,
    data: Arena<T>,
    data_used: usize,
    state: State,
}

impl<T: PoolElem> Pool<T> {
    /// Empty, open pool.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            data: Arena::new(),
            data_used: 0,
            state: State::Open,
        }
    }

    /// Empty, open pool pre-sized for about `n` entries of `avg_len`
    /// elements each.
    pub fn with_capacity(n: usize, avg_len: usize) -> Self {
        let n = n.max(64);
        let mut data = Arena::new();
        data.allocate(n * avg_len.max(1));
        Self {
            entries: Vec::with_capacity(n),
            data,
            data_used: 0,
            state: State::Open,
        }
    }

    /// Drop all entries and data; the pool is open afterwards.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.data.free();
        self.data_used = 0;
        self.state = State::Open;
    }

    /// [`reset`](Self::reset), then pre-size as
    /// [`with_capacity`](Self::with_capacity) does.
    pub fn reset_with_capacity(&mut self, n: usize, avg_len: usize) {
        *self = Self::with_capacity(n, avg_len);
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no sequences are interned.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True once [`commit`](Self::commit) has run and nothing re-opened the
    /// pool.
    #[inline]
    pub fn is_committed(&self) -> bool {
        matches!(self.state, State::Committed { .. })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The interned sequence of entry `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id >= len()`.
    pub fn get(&self, id: usize) -> &[T] {
        self.check_range(id);
        self.slice(id)
    }

    /// Occurrence count of entry `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id >= len()`.
    pub fn count(&self, id: usize) -> u32 {
        self.check_range(id);
        self.entries[id].count
    }

    /// Payload value of entry `id`, if one was ever supplied.
    ///
    /// # Panics
    ///
    /// Panics if `id >= len()`.
    pub fn value(&self, id: usize) -> Option<i64> {
        self.check_range(id);
        self.entries[id].value
    }

    /// Overwrite the occurrence count of entry `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id >= len()`.
    pub fn set_count(&mut self, id: usize, count: u32) {
        self.check_range(id);
        self.entries[id].count = count;
    }

    /// Overwrite the payload value of entry `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id >= len()`.
    pub fn set_value(&mut self, id: usize, value: i64) {
        self.check_range(id);
        self.entries[id].value = Some(value);
    }

    #[inline]
    fn check_range(&self, id: usize) {
        assert!(
            id < self.entries.len(),
            "entry {id} out of range for pool of {} entries",
            self.entries.len()
        );
    }

    #[inline]
    fn slice(&self, id: usize) -> &[T] {
        let e = self.entries[id];
        &self.data.as_slice()[e.offs..e.offs + e.len]
    }

    // ========================================================================
    // Insertion
    // ========================================================================

    /// Intern `content`, returning its entry id.
    ///
    /// On a duplicate, `count` is added to the existing count and a
    /// `Some` value overwrites the stored one. On a committed pool a
    /// duplicate merges in place and the pool stays committed; a new
    /// sequence re-opens the pool and discards the index.
    pub fn put(&mut self, content: &[T], count: u32, value: Option<i64>) -> usize {
        let hit = if self.is_committed() {
            let found = self.find(content);
            if found.is_none() {
                self.state = State::Open;
            }
            found
        } else {
            self.scan(content)
        };
        if let Some(id) = hit {
            self.entries[id].count += count;
            if value.is_some() {
                self.entries[id].value = value;
            }
            return id;
        }

        let offs = self.reserve(content.len());
        self.data.as_mut_slice()[offs..offs + content.len()].copy_from_slice(content);
        self.entries.push(PoolEntry {
            offs,
            len: content.len(),
            count,
            value,
        });
        self.entries.len() - 1
    }

    /// Replace the sequence of entry `id`, keeping its count and value.
    /// The old bytes become a hole that the next commit compacts away.
    ///
    /// # Panics
    ///
    /// Panics if `id >= len()` or the pool is committed.
    pub fn update(&mut self, id: usize, content: &[T]) {
        self.check_range(id);
        assert!(
            !self.is_committed(),
            "pool is committed: entries cannot be rewritten"
        );
        let offs = self.reserve(content.len());
        self.data.as_mut_slice()[offs..offs + content.len()].copy_from_slice(content);
        self.entries[id].offs = offs;
        self.entries[id].len = content.len();
    }

    /// Truncate the sequence of entry `id` to `new_len` elements.
    ///
    /// # Panics
    ///
    /// Panics if `id >= len()`, the pool is committed, or `new_len`
    /// exceeds the current length.
    pub fn shorten(&mut self, id: usize, new_len: usize) {
        self.check_range(id);
        assert!(
            !self.is_committed(),
            "pool is committed: entries cannot be rewritten"
        );
        assert!(
            new_len <= self.entries[id].len,
            "cannot lengthen entry {id} from {} to {new_len}",
            self.entries[id].len
        );
        self.entries[id].len = new_len;
    }

    /// Remove entry `id`; later entries shift down by one.
    ///
    /// # Panics
    ///
    /// Panics if `id >= len()` or the pool is committed.
    pub fn erase(&mut self, id: usize) {
        self.check_range(id);
        assert!(
            !self.is_committed(),
            "pool is committed: entries cannot be rewritten"
        );
        self.entries.remove(id);
    }

    /// Re-intern every entry of `other` through [`put`](Self::put),
    /// merging counts and values.
    pub fn concat(&mut self, other: &Pool<T>) {
        for id in 0..other.len() {
            let e = other.entries[id];
            self.put(other.slice(id), e.count, e.value);
        }
    }

    /// Linear-scan lookup used while open.
    fn scan(&self, content: &[T]) -> Option<usize> {
        (0..self.entries.len()).find(|&id| self.slice(id) == content)
    }

    /// Make room for `len` more elements, returning their offset.
    fn reserve(&mut self, len: usize) -> usize {
        let needed = self.data_used + len;
        if needed > self.data.len() {
            let cap = needed.max(self.data.len() * 2).max(64);
            self.data.resize(cap);
        }
        let offs = self.data_used;
        self.data_used = needed;
        offs
    }

    // ========================================================================
    // Commit & search
    // ========================================================================

    /// Compact the data arena and build the search index. No-op when
    /// already committed.
    pub fn commit(&mut self) {
        if self.is_committed() {
            return;
        }

        // Compaction: holes left by update/shorten/erase/reduce disappear.
        let live: usize = self.entries.iter().map(|e| e.len).sum();
        let mut packed = Arena::new();
        packed.allocate(live);
        let mut at = 0;
        for e in &mut self.entries {
            packed.as_mut_slice()[at..at + e.len]
                .copy_from_slice(&self.data.as_slice()[e.offs..e.offs + e.len]);
            e.offs = at;
            at += e.len;
        }
        self.data.transfer_from(&mut packed);
        self.data_used = live;

        let mut sorted: Vec<usize> = (0..self.entries.len()).collect();
        sorted.sort_by(|&a, &b| {
            let (sa, sb) = (self.slice(a), self.slice(b));
            sa.len().cmp(&sb.len()).then_with(|| sa.cmp(sb))
        });

        let mut buckets: Vec<LenBucket> = Vec::new();
        for (pos, &id) in sorted.iter().enumerate() {
            let len = self.entries[id].len;
            match buckets.last_mut() {
                Some(b) if b.len == len => b.end = pos + 1,
                _ => buckets.push(LenBucket {
                    len,
                    begin: pos,
                    end: pos + 1,
                }),
            }
        }

        self.state = State::Committed { sorted, buckets };
    }

    /// Entry id of `content`, if interned.
    ///
    /// Prunes to the length bucket, then binary-searches the sorted key
    /// within it.
    ///
    /// # Panics
    ///
    /// Panics if the pool is not committed.
    pub fn find(&self, content: &[T]) -> Option<usize> {
        let State::Committed { sorted, buckets } = &self.state else {
            panic!("pool is not committed: commit() before find()");
        };
        let bucket = buckets
            .binary_search_by_key(&content.len(), |b| b.len)
            .ok()
            .map(|i| buckets[i])?;
        let within = &sorted[bucket.begin..bucket.end];
        within
            .binary_search_by(|&id| self.slice(id).cmp(content))
            .ok()
            .map(|pos| within[pos])
    }

    /// Drop entries whose count is below `min_count`. Survivors are
    /// renumbered in order; the pool re-opens.
    pub fn reduce(&mut self, min_count: u32) {
        self.entries.retain(|e| e.count >= min_count);
        self.state = State::Open;
    }

    // ========================================================================
    // Archive
    // ========================================================================

    /// Write the pool. Layout:
    /// `[i32 entryCount][i32 dataLen][blob][per entry: i32 offs, i32 len,
    /// i32 count, bool hasValue, i64 value]`.
    ///
    /// # Panics
    ///
    /// Panics if the pool is not committed; only compacted pools are
    /// archived.
    pub fn write_to<W: Write>(&self, w: &mut RecordWriter<W>) -> Result<(), RecordError> {
        assert!(
            self.is_committed(),
            "pool is not committed: commit() before archiving"
        );
        w.write_i32(self.entries.len() as i32)?;
        w.write_i32(self.data_used as i32)?;
        T::write_run(w, &self.data.as_slice()[..self.data_used])?;
        for e in &self.entries {
            w.write_i32(e.offs as i32)?;
            w.write_i32(e.len as i32)?;
            w.write_i32(e.count as i32)?;
            w.write_bool(e.value.is_some())?;
            w.write_i64(e.value.unwrap_or(0))?;
        }
        Ok(())
    }

    /// Read a pool previously written by [`write_to`](Self::write_to).
    /// The result is committed and searchable.
    pub fn read_from<R: Read>(r: &mut RecordReader<R>) -> Result<Self, RecordError> {
        let n_entries = r.read_len()?;
        let data_len = r.read_len()?;
        let blob = T::read_run(r, data_len)?;

        let mut pool = Self::new();
        pool.data.allocate(data_len);
        pool.data.as_mut_slice().copy_from_slice(&blob);
        pool.data_used = data_len;
        for _ in 0..n_entries {
            let offs = r.read_len()?;
            let len = r.read_len()?;
            let count = r.read_i32()? as u32;
            let has_value = r.read_bool()?;
            let value = r.read_i64()?;
            pool.entries.push(PoolEntry {
                offs,
                len,
                count,
                value: has_value.then_some(value),
            });
        }
        pool.commit();
        Ok(pool)
    }
}

impl<T: PoolElem> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl BytePool {
    /// Intern a string with count 1 and no payload.
    pub fn put_str(&mut self, s: &str) -> usize {
        self.put(s.as_bytes(), 1, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    #[test]
    fn put_merges_duplicates_and_counts() {
        let mut p = BytePool::new();
        let cat = p.put(b"cat", 1, None);
        let dog = p.put(b"dog", 1, None);
        let again = p.put(b"cat", 1, None);
        assert_eq!(cat, again);
        assert_ne!(cat, dog);
        assert_eq!(p.len(), 2);
        assert_eq!(p.count(cat), 2);
        assert_eq!(p.count(dog), 1);
        assert_eq!(p.get(cat), b"cat");
    }

    #[test]
    fn value_overwrites_only_when_supplied() {
        let mut p = BytePool::new();
        let id = p.put(b"x", 1, Some(7));
        p.put(b"x", 1, None);
        assert_eq!(p.value(id), Some(7));
        p.put(b"x", 1, Some(9));
        assert_eq!(p.value(id), Some(9));
    }

    #[test]
    fn find_after_commit() {
        let mut p = BytePool::new();
        p.put(b"alpha", 1, None);
        p.put(b"beta", 1, None);
        p.put(b"gamma", 1, None);
        p.commit();
        assert!(p.is_committed());
        assert_eq!(p.find(b"beta"), Some(1));
        assert_eq!(p.find(b"delta"), None);
        assert_eq!(p.find(b"alph"), None);
    }

    #[test]
    #[should_panic(expected = "not committed")]
    fn find_on_open_pool_panics() {
        let mut p = BytePool::new();
        p.put(b"x", 1, None);
        p.find(b"x");
    }

    #[test]
    fn put_on_committed_merges_in_place() {
        let mut p = BytePool::new();
        let id = p.put(b"cat", 1, None);
        p.commit();
        let again = p.put(b"cat", 3, None);
        assert_eq!(id, again);
        assert_eq!(p.count(id), 4);
        assert!(p.is_committed());
    }

    #[test]
    fn put_of_new_sequence_reopens() {
        let mut p = BytePool::new();
        p.put(b"cat", 1, None);
        p.commit();
        p.put(b"dog", 1, None);
        assert!(!p.is_committed());
        assert_eq!(p.len(), 2);
        p.commit();
        assert_eq!(p.find(b"dog"), Some(1));
    }

    #[test]
    fn commit_twice_is_noop() {
        let mut p = BytePool::new();
        p.put(b"a", 1, None);
        p.commit();
        p.commit();
        assert_eq!(p.find(b"a"), Some(0));
    }

    #[test]
    fn reduce_keeps_frequent_entries_and_reopens() {
        let mut p = BytePool::new();
        p.put(b"rare", 1, None);
        p.put(b"common", 5, None);
        p.put(b"mid", 3, None);
        p.commit();
        p.reduce(3);
        assert!(!p.is_committed());
        assert_eq!(p.len(), 2);
        assert_eq!(p.get(0), b"common");
        assert_eq!(p.get(1), b"mid");
    }

    #[test]
    fn update_and_shorten_leave_holes_commit_compacts() {
        let mut p = BytePool::new();
        let a = p.put(b"abcdef", 1, None);
        let b = p.put(b"xyz", 1, None);
        p.shorten(a, 3);
        p.update(b, b"qq");
        assert_eq!(p.get(a), b"abc");
        assert_eq!(p.get(b), b"qq");
        p.commit();
        assert_eq!(p.get(a), b"abc");
        assert_eq!(p.get(b), b"qq");
        assert_eq!(p.find(b"qq"), Some(b));
    }

    #[test]
    fn erase_renumbers() {
        let mut p = BytePool::new();
        p.put(b"a", 1, None);
        p.put(b"b", 1, None);
        p.put(b"c", 1, None);
        p.erase(1);
        assert_eq!(p.len(), 2);
        assert_eq!(p.get(1), b"c");
    }

    #[test]
    fn concat_merges_through_put() {
        let mut a = BytePool::new();
        a.put(b"cat", 2, None);
        a.put(b"dog", 1, None);
        let mut b = BytePool::new();
        b.put(b"cat", 3, Some(1));
        b.put(b"emu", 1, None);
        a.concat(&b);
        assert_eq!(a.len(), 3);
        assert_eq!(a.count(0), 5);
        assert_eq!(a.value(0), Some(1));
        assert_eq!(a.get(2), b"emu");
    }

    #[test]
    fn int_pool_interns_sequences() {
        let mut p = IntPool::new();
        let path = p.put(&[3, 1, 4, 1, 5], 1, Some(42));
        p.put(&[3, 1, 4, 1, 5], 1, None);
        p.put(&[2, 7], 1, None);
        assert_eq!(p.len(), 2);
        assert_eq!(p.count(path), 2);
        assert_eq!(p.get(path), &[3, 1, 4, 1, 5]);
        p.commit();
        assert_eq!(p.find(&[2, 7]), Some(1));
        assert_eq!(p.find(&[3, 1, 4]), None);
    }

    #[test]
    fn empty_sequence_is_internable() {
        let mut p = BytePool::new();
        let id = p.put(b"", 1, None);
        p.put(b"", 1, None);
        assert_eq!(p.count(id), 2);
        p.commit();
        assert_eq!(p.find(b""), Some(id));
    }

    #[test]
    #[should_panic(expected = "not committed")]
    fn archiving_open_pool_panics() {
        let mut p = BytePool::new();
        p.put(b"x", 1, None);
        let mut buf = Vec::new();
        let _ = p.write_to(&mut RecordWriter::new(&mut buf));
    }

    #[test]
    fn archive_roundtrip_is_searchable() {
        let mut p = IntPool::new();
        p.put(&[1, 2, 3], 4, Some(-9));
        p.put(&[5], 1, None);
        p.commit();

        let mut buf = Vec::new();
        p.write_to(&mut RecordWriter::new(&mut buf)).unwrap();
        let got = IntPool::read_from(&mut RecordReader::new(Cursor::new(buf))).unwrap();

        assert!(got.is_committed());
        assert_eq!(got.len(), 2);
        assert_eq!(got.get(0), &[1, 2, 3]);
        assert_eq!(got.count(0), 4);
        assert_eq!(got.value(0), Some(-9));
        assert_eq!(got.value(1), None);
        assert_eq!(got.find(&[5]), Some(1));
    }

    proptest! {
        #[test]
        fn find_agrees_with_insertion(
            words in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..8), 1..40)
        ) {
            let mut p = BytePool::new();
            let mut ids = Vec::new();
            for w in &words {
                ids.push(p.put(w, 1, None));
            }
            p.commit();
            for (w, &id) in words.iter().zip(&ids) {
                prop_assert_eq!(p.find(w), Some(id));
            }
        }

        #[test]
        fn counts_accumulate(
            words in prop::collection::vec(prop::sample::select(vec![
                b"aa".to_vec(), b"bb".to_vec(), b"cc".to_vec()
            ]), 0..30)
        ) {
            let mut p = BytePool::new();
            for w in &words {
                p.put(w, 1, None);
            }
            let total: u32 = (0..p.len()).map(|i| p.count(i)).sum();
            prop_assert_eq!(total as usize, words.len());
        }
    }
}
