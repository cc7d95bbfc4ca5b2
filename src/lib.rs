//! grove: numeric containers and interning pools for greedy-forest training.
//!
//! This crate is the storage core of a regularized greedy-forest trainer:
//! the containers that hold feature and target data, the pools that intern
//! categorical tokens, and the binary archive format that persists both.
//!
//! # Key Types
//!
//! - [`DenseVector`] / [`SparseVector`] - one column of numeric data
//! - [`DenseMatrix`] / [`SparseMatrix`] - ordered collections of columns
//! - [`BytePool`] / [`IntPool`] - deduplicating catalogs of byte/int sequences
//! - [`RecordWriter`] / [`RecordReader`] - typed little-endian archive I/O
//! - [`Arena`] / [`SlotArena`] - the expandable storage backing everything
//!
//! # Storage Layout
//!
//! Matrices are column collections: each column is an owned vector, and an
//! all-zero column is represented by an empty slot rather than a materialized
//! vector. Read access always yields a usable (possibly shared zero) column;
//! write access materializes on demand.
//!
//! # Errors
//!
//! Archive I/O returns [`RecordError`]. Contract violations - out-of-range
//! indices, shape mismatches, out-of-order bulk loads, mutating a locked
//! matrix - are programming errors and panic; see the `# Panics` sections
//! on the individual methods.
//!
//! # Threading
//!
//! All containers are single-owner, single-threaded. Hand-off between owners
//! happens only by moving values or via [`Arena::transfer_from`] /
//! [`SlotArena::take`].

pub mod arena;
pub mod data;
pub mod io;
pub mod pool;

pub use arena::{Arena, SlotArena};
pub use data::{
    DenseMatrix, DenseVector, NonZeros, SparseEntry, SparseMatrix, SparseVector, VectorRead,
};
pub use io::{RecordError, RecordReader, RecordWriter, MAGIC};
pub use pool::{BytePool, IntPool};
