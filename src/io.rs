// File-level I/O helpers for DVPL encoding/decoding.
//
// Provides `encode_file()` and `decode_file()` convenience functions that
// read the input fully, run the in-memory codec, and write the result through
// a `BufWriter`. Optionally computes a SHA-256 of the written bytes
// (feature-gated behind `file-io`).

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use thiserror::Error;

#[cfg(feature = "file-io")]
use sha2::Digest;

use crate::codec::backend::Lz4Block;
use crate::codec::decoder::{self, DecodeError};
use crate::codec::encoder::{self, EncodeError, EncodeOptions};
use crate::format::StorageKind;

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `encode_file()` and `decode_file()`.
#[derive(Debug, Clone)]
pub struct FileStats {
    /// Input file size in bytes.
    pub input_size: u64,
    /// Output file size in bytes.
    pub output_size: u64,
    /// Storage kind from the footer that was written (encode) or read (decode).
    pub storage: Option<StorageKind>,
    /// SHA-256 of the written output (if `file-io` feature is enabled).
    pub output_sha256: Option<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for file I/O operations.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

// ---------------------------------------------------------------------------
// Default buffer size
// ---------------------------------------------------------------------------

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

// ---------------------------------------------------------------------------
// encode_file / decode_file
// ---------------------------------------------------------------------------

/// Encode `input_path` into a DVPL container at `output_path`.
pub fn encode_file(
    input_path: &Path,
    output_path: &Path,
    opts: &EncodeOptions,
) -> Result<FileStats, IoError> {
    let input = std::fs::read(input_path)?;
    let encoded = encoder::encode_with(&input, &Lz4Block, opts)?;
    let storage = decoder::inspect(&encoded)?.storage().ok();

    let output_sha256 = write_output(output_path, &encoded)?;

    Ok(FileStats {
        input_size: input.len() as u64,
        output_size: encoded.len() as u64,
        storage,
        output_sha256,
    })
}

/// Decode the DVPL container at `input_path` into `output_path`.
///
/// Nothing is written unless the container validates completely.
pub fn decode_file(input_path: &Path, output_path: &Path) -> Result<FileStats, IoError> {
    let input = std::fs::read(input_path)?;
    let decoded = decoder::decode(&input)?;
    let storage = decoder::inspect(&input)?.storage().ok();

    let output_sha256 = write_output(output_path, &decoded)?;

    Ok(FileStats {
        input_size: input.len() as u64,
        output_size: decoded.len() as u64,
        storage,
        output_sha256,
    })
}

/// Write `data` to `path` (create or truncate) and flush.
///
/// Returns the SHA-256 of the written bytes when `file-io` is enabled.
pub fn write_output(path: &Path, data: &[u8]) -> io::Result<Option<[u8; 32]>> {
    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(BUF_SIZE, file);

    #[cfg(feature = "file-io")]
    let digest = {
        let mut hasher = sha2::Sha256::new();
        let mut hashing_writer = HashingWriter {
            inner: &mut writer,
            hasher: &mut hasher,
        };
        hashing_writer.write_all(data)?;
        Some(hasher.finalize().into())
    };

    #[cfg(not(feature = "file-io"))]
    let digest: Option<[u8; 32]> = {
        writer.write_all(data)?;
        None
    };

    writer.flush()?;
    Ok(digest)
}

// ---------------------------------------------------------------------------
// Hashing writer (used with file-io feature)
// ---------------------------------------------------------------------------

#[cfg(feature = "file-io")]
struct HashingWriter<'a, W: Write> {
    inner: &'a mut W,
    hasher: &'a mut sha2::Sha256,
}

#[cfg(feature = "file-io")]
impl<W: Write> Write for HashingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FOOTER_SIZE;
    use tempfile::tempdir;

    #[test]
    fn encode_decode_file_roundtrip() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("sounds.yaml");
        let packed = dir.path().join("sounds.yaml.dvpl");
        let unpacked = dir.path().join("sounds.copy.yaml");

        let data = b"sounds:\n  - engine\n  - engine\n  - engine\n  - engine\n".repeat(64);
        std::fs::write(&input, &data).unwrap();

        let enc = encode_file(&input, &packed, &EncodeOptions::default()).unwrap();
        assert_eq!(enc.input_size, data.len() as u64);
        assert_eq!(enc.storage, Some(StorageKind::Lz4));
        assert!(enc.output_size < enc.input_size);
        assert_eq!(std::fs::metadata(&packed).unwrap().len(), enc.output_size);

        let dec = decode_file(&packed, &unpacked).unwrap();
        assert_eq!(dec.output_size, data.len() as u64);
        assert_eq!(dec.storage, Some(StorageKind::Lz4));
        assert_eq!(std::fs::read(&unpacked).unwrap(), data);
    }

    #[test]
    fn tiny_file_is_stored_raw() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("a.txt");
        let packed = dir.path().join("a.txt.dvpl");
        std::fs::write(&input, b"hi").unwrap();

        let stats = encode_file(&input, &packed, &EncodeOptions::default()).unwrap();
        assert_eq!(stats.storage, Some(StorageKind::Stored));
        assert_eq!(stats.output_size, (2 + FOOTER_SIZE) as u64);
    }

    #[test]
    fn corrupt_input_writes_nothing() {
        let dir = tempdir().unwrap();
        let packed = dir.path().join("bad.dvpl");
        let out = dir.path().join("bad");
        std::fs::write(&packed, b"definitely not a dvpl container").unwrap();

        let err = decode_file(&packed, &out).unwrap_err();
        assert!(matches!(err, IoError::Decode(DecodeError::InvalidFooter)));
        assert!(!out.exists());
    }

    #[test]
    fn missing_input_is_io_error() {
        let dir = tempdir().unwrap();
        let err = decode_file(&dir.path().join("nope.dvpl"), &dir.path().join("nope"))
            .unwrap_err();
        assert!(matches!(err, IoError::Io(_)));
    }

    #[cfg(feature = "file-io")]
    #[test]
    fn sha256_checksums_computed() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("data.bin");
        let packed = dir.path().join("data.bin.dvpl");
        let unpacked = dir.path().join("data.out");
        std::fs::write(&input, vec![42u8; 4096]).unwrap();

        let enc = encode_file(&input, &packed, &EncodeOptions::default()).unwrap();
        let packed_bytes = std::fs::read(&packed).unwrap();
        let expected: [u8; 32] = sha2::Sha256::digest(&packed_bytes).into();
        assert_eq!(enc.output_sha256, Some(expected));

        let dec = decode_file(&packed, &unpacked).unwrap();
        let expected: [u8; 32] = sha2::Sha256::digest(vec![42u8; 4096]).into();
        assert_eq!(dec.output_sha256, Some(expected));
    }
}
