//! Typed little-endian readers and writers over byte streams.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Marker bytes written at the head of every archive stream.
pub const MAGIC: [u8; 4] = *b"GRV1";

/// Faults raised by the record store.
#[derive(Debug, Error)]
pub enum RecordError {
    /// Opening or creating a named file failed.
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A read or write on the underlying stream failed, including short
    /// reads at end of stream.
    #[error("record i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// Flushing buffered output at the end of a write failed.
    #[error("cannot finish archive: {0}")]
    Close(std::io::Error),

    /// The stream does not begin with the expected marker bytes.
    #[error("bad archive marker: found {found:02x?}")]
    BadMarker { found: [u8; 4] },

    /// A length or offset field is negative; the stream is corrupt.
    #[error("corrupt archive: negative length field {0}")]
    BadLength(i32),
}

// ============================================================================
// Writer
// ============================================================================

/// Typed writer producing the crate's little-endian record format.
#[derive(Debug)]
pub struct RecordWriter<W: Write> {
    inner: W,
}

impl RecordWriter<BufWriter<File>> {
    /// Create (or truncate) the file at `path` and wrap it in a buffered
    /// writer.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, RecordError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| RecordError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> RecordWriter<W> {
    /// Wrap an arbitrary byte sink.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write the 4-byte [`MAGIC`] marker.
    pub fn write_marker(&mut self) -> Result<(), RecordError> {
        self.inner.write_all(&MAGIC)?;
        Ok(())
    }

    /// Write a little-endian i32.
    pub fn write_i32(&mut self, v: i32) -> Result<(), RecordError> {
        self.inner.write_all(&v.to_le_bytes())?;
        Ok(())
    }

    /// Write a little-endian i64.
    pub fn write_i64(&mut self, v: i64) -> Result<(), RecordError> {
        self.inner.write_all(&v.to_le_bytes())?;
        Ok(())
    }

    /// Write a little-endian f64.
    pub fn write_f64(&mut self, v: f64) -> Result<(), RecordError> {
        self.inner.write_all(&v.to_le_bytes())?;
        Ok(())
    }

    /// Write a boolean as a single 0/1 byte.
    pub fn write_bool(&mut self, v: bool) -> Result<(), RecordError> {
        self.inner.write_all(&[u8::from(v)])?;
        Ok(())
    }

    /// Write a raw byte run with no length prefix.
    pub fn write_bytes(&mut self, b: &[u8]) -> Result<(), RecordError> {
        self.inner.write_all(b)?;
        Ok(())
    }

    /// Flush buffered output and release the sink. Surfaces flush failures
    /// that a plain drop would swallow.
    pub fn finish(mut self) -> Result<(), RecordError> {
        self.inner.flush().map_err(RecordError::Close)
    }

    /// Borrow the underlying sink.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }
}

// ============================================================================
// Reader
// ============================================================================

/// Typed reader consuming the crate's little-endian record format.
#[derive(Debug)]
pub struct RecordReader<R: Read> {
    inner: R,
}

impl RecordReader<BufReader<File>> {
    /// Open the file at `path` and wrap it in a buffered reader.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RecordError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| RecordError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> RecordReader<R> {
    /// Wrap an arbitrary byte source.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read 4 bytes and verify they match [`MAGIC`].
    pub fn check_marker(&mut self) -> Result<(), RecordError> {
        let mut found = [0u8; 4];
        self.inner.read_exact(&mut found)?;
        if found != MAGIC {
            return Err(RecordError::BadMarker { found });
        }
        Ok(())
    }

    /// Read a little-endian i32.
    pub fn read_i32(&mut self) -> Result<i32, RecordError> {
        let mut buf = [0u8; 4];
        self.inner.read_exact(&mut buf)?;
        Ok(i32::from_le_bytes(buf))
    }

    /// Read a little-endian i64.
    pub fn read_i64(&mut self) -> Result<i64, RecordError> {
        let mut buf = [0u8; 8];
        self.inner.read_exact(&mut buf)?;
        Ok(i64::from_le_bytes(buf))
    }

    /// Read a little-endian f64.
    pub fn read_f64(&mut self) -> Result<f64, RecordError> {
        let mut buf = [0u8; 8];
        self.inner.read_exact(&mut buf)?;
        Ok(f64::from_le_bytes(buf))
    }

    /// Read a single 0/1 byte as a boolean. Any non-zero byte reads as true.
    pub fn read_bool(&mut self) -> Result<bool, RecordError> {
        let mut buf = [0u8; 1];
        self.inner.read_exact(&mut buf)?;
        Ok(buf[0] != 0)
    }

    /// Read exactly `buf.len()` raw bytes.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), RecordError> {
        self.inner.read_exact(buf)?;
        Ok(())
    }

    /// Read a little-endian i32 length or offset field as `usize`,
    /// rejecting negative values as corruption.
    pub fn read_len(&mut self) -> Result<usize, RecordError> {
        let v = self.read_i32()?;
        if v < 0 {
            return Err(RecordError::BadLength(v));
        }
        Ok(v as usize)
    }

    /// Borrow the underlying source.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }
}

impl<R: Read + Seek> RecordReader<R> {
    /// Seek to absolute offset `offs` and read exactly `buf.len()` raw
    /// bytes there. Later typed reads continue from past the run.
    pub fn seek_read_bytes(&mut self, offs: u64, buf: &mut [u8]) -> Result<(), RecordError> {
        self.inner.seek(SeekFrom::Start(offs))?;
        self.inner.read_exact(buf)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    #[test]
    fn marker_roundtrip() {
        let mut buf = Vec::new();
        let mut w = RecordWriter::new(&mut buf);
        w.write_marker().unwrap();
        w.write_i32(7).unwrap();

        let mut r = RecordReader::new(Cursor::new(buf));
        r.check_marker().unwrap();
        assert_eq!(r.read_i32().unwrap(), 7);
    }

    #[test]
    fn foreign_marker_rejected() {
        let mut r = RecordReader::new(Cursor::new(b"XXXX123".to_vec()));
        match r.check_marker() {
            Err(RecordError::BadMarker { found }) => assert_eq!(&found, b"XXXX"),
            other => panic!("expected BadMarker, got {other:?}"),
        }
    }

    #[test]
    fn short_read_is_io_error() {
        let mut r = RecordReader::new(Cursor::new(vec![1u8, 2]));
        assert!(matches!(r.read_i32(), Err(RecordError::Io(_))));
    }

    #[test]
    fn bool_is_one_byte() {
        let mut buf = Vec::new();
        let mut w = RecordWriter::new(&mut buf);
        w.write_bool(true).unwrap();
        w.write_bool(false).unwrap();
        assert_eq!(buf, vec![1, 0]);
    }

    #[test]
    fn mixed_sequence_roundtrips() {
        let mut buf = Vec::new();
        let mut w = RecordWriter::new(&mut buf);
        w.write_i32(-5).unwrap();
        w.write_f64(2.5).unwrap();
        w.write_bool(true).unwrap();
        w.write_i64(1 << 40).unwrap();
        w.write_bytes(b"abc").unwrap();

        let mut r = RecordReader::new(Cursor::new(buf));
        assert_eq!(r.read_i32().unwrap(), -5);
        assert_eq!(r.read_f64().unwrap(), 2.5);
        assert!(r.read_bool().unwrap());
        assert_eq!(r.read_i64().unwrap(), 1 << 40);
        let mut got = [0u8; 3];
        r.read_bytes(&mut got).unwrap();
        assert_eq!(&got, b"abc");
    }

    #[test]
    fn file_backed_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.bin");

        let mut w = RecordWriter::create(&path).unwrap();
        w.write_marker().unwrap();
        w.write_f64(-0.25).unwrap();
        w.finish().unwrap();

        let mut r = RecordReader::open(&path).unwrap();
        r.check_marker().unwrap();
        assert_eq!(r.read_f64().unwrap(), -0.25);
    }

    #[test]
    fn seek_read_bytes_reads_at_offset() {
        let mut r = RecordReader::new(Cursor::new(b"abcdefgh".to_vec()));
        let mut got = [0u8; 3];
        r.seek_read_bytes(4, &mut got).unwrap();
        assert_eq!(&got, b"efg");
        r.seek_read_bytes(0, &mut got).unwrap();
        assert_eq!(&got, b"abc");
        // later reads continue from past the seeked run
        r.read_bytes(&mut got).unwrap();
        assert_eq!(&got, b"def");
    }

    #[test]
    fn negative_length_field_rejected() {
        let mut buf = Vec::new();
        RecordWriter::new(&mut buf).write_i32(-3).unwrap();
        let mut r = RecordReader::new(Cursor::new(buf));
        assert!(matches!(r.read_len(), Err(RecordError::BadLength(-3))));
    }

    #[test]
    fn open_missing_file_reports_path() {
        let err = RecordReader::open("/nonexistent/records.bin").unwrap_err();
        match err {
            RecordError::Open { path, .. } => {
                assert_eq!(path, PathBuf::from("/nonexistent/records.bin"));
            }
            other => panic!("expected Open, got {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn i32_roundtrip(v in any::<i32>()) {
            let mut buf = Vec::new();
            RecordWriter::new(&mut buf).write_i32(v).unwrap();
            let got = RecordReader::new(Cursor::new(buf)).read_i32().unwrap();
            prop_assert_eq!(v, got);
        }

        #[test]
        fn f64_roundtrip_bitwise(bits in any::<u64>()) {
            let v = f64::from_bits(bits);
            let mut buf = Vec::new();
            RecordWriter::new(&mut buf).write_f64(v).unwrap();
            let got = RecordReader::new(Cursor::new(buf)).read_f64().unwrap();
            prop_assert_eq!(bits, got.to_bits());
        }
    }
}
