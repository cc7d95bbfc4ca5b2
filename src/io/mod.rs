//! Binary record store for persisting containers and pools.
//!
//! Every archive in this crate is a flat stream of typed records: 32-bit
//! integers, one-byte booleans, IEEE-754 doubles, and raw byte runs, all
//! little-endian regardless of host order. There is no compression, no
//! alignment padding, and no self-describing schema; each container knows
//! its own layout.
//!
//! A 4-byte magic marker ([`MAGIC`]) written at the head of a stream lets a
//! reader reject foreign or corrupt files before misreading the payload.

mod record;

pub use record::{RecordError, RecordReader, RecordWriter, MAGIC};
