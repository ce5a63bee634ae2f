// DVPL decoder.
//
// Validation runs in a fixed order so that a damaged footer is reported as
// such instead of surfacing as a later size or checksum error:
//   1. footer present and magic intact
//   2. stored size matches the payload length
//   3. CRC-32 matches
//   4. type-specific decoding (raw / LZ4 / unknown)

use std::io;

use thiserror::Error;

use crate::format::{Footer, StorageKind};

use super::backend::{BlockCompressor, Lz4Block};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum DecodeError {
    /// Buffer shorter than a footer, or footer magic is not `DVPL`.
    #[error("invalid DVPL footer")]
    InvalidFooter,
    /// Footer's stored size disagrees with the payload length.
    #[error("size mismatch: footer says {expected} stored bytes, payload has {actual}")]
    SizeMismatch { expected: u32, actual: usize },
    #[error("CRC-32 mismatch: expected {expected:#010X}, got {actual:#010X}")]
    Crc32Mismatch { expected: u32, actual: u32 },
    /// Type 0 footer whose original and stored sizes differ.
    #[error("stored payload size mismatch: original {original}, stored {compressed}")]
    TypeSizeMismatch { original: u32, compressed: u32 },
    /// LZ4 block decoded to a different length than the footer promised.
    #[error("decoded size mismatch: expected {expected} bytes, got {actual}")]
    DecodeSizeMismatch { expected: u32, actual: usize },
    #[error("unknown DVPL format type {0}")]
    UnknownFormat(u32),
    /// The block decompressor rejected the payload.
    #[error("decompression failed: {0}")]
    Decompression(#[source] io::Error),
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Decode a DVPL buffer using LZ4.
pub fn decode(buffer: &[u8]) -> Result<Vec<u8>, DecodeError> {
    decode_with(buffer, &Lz4Block)
}

/// Decode a DVPL buffer with an explicit block backend.
pub fn decode_with(buffer: &[u8], backend: &dyn BlockCompressor) -> Result<Vec<u8>, DecodeError> {
    let (payload, footer) = Footer::split(buffer)?;

    if payload.len() != footer.compressed_size as usize {
        return Err(DecodeError::SizeMismatch {
            expected: footer.compressed_size,
            actual: payload.len(),
        });
    }

    let actual = crc32fast::hash(payload);
    if actual != footer.crc32 {
        return Err(DecodeError::Crc32Mismatch {
            expected: footer.crc32,
            actual,
        });
    }

    match footer.storage()? {
        StorageKind::Stored => {
            if footer.original_size != footer.compressed_size {
                return Err(DecodeError::TypeSizeMismatch {
                    original: footer.original_size,
                    compressed: footer.compressed_size,
                });
            }
            Ok(payload.to_vec())
        }
        StorageKind::Lz4 | StorageKind::Lz4Legacy => {
            let expected = footer.original_size as usize;
            let decoded = backend
                .decompress_block(payload, expected)
                .map_err(DecodeError::Decompression)?;
            if decoded.len() != expected {
                return Err(DecodeError::DecodeSizeMismatch {
                    expected: footer.original_size,
                    actual: decoded.len(),
                });
            }
            Ok(decoded)
        }
    }
}

/// Parse the footer of a DVPL buffer without validating the payload.
pub fn inspect(buffer: &[u8]) -> Result<Footer, DecodeError> {
    Footer::split(buffer).map(|(_, footer)| footer)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encoder::encode;
    use crate::format::{FOOTER_SIZE, TYPE_LZ4, TYPE_LZ4_LEGACY, TYPE_STORED};

    /// Assemble `payload ++ footer` with a correct CRC for `payload`.
    fn craft(payload: &[u8], original_size: u32, kind: u32) -> Vec<u8> {
        let footer = Footer {
            original_size,
            compressed_size: payload.len() as u32,
            crc32: crc32fast::hash(payload),
            kind,
        };
        let mut buf = payload.to_vec();
        buf.extend_from_slice(&footer.to_bytes());
        buf
    }

    #[test]
    fn decode_hello_world() {
        let buf = encode(b"hello world").unwrap();
        assert_eq!(decode(&buf).unwrap(), b"hello world");
    }

    #[test]
    fn decode_empty() {
        let buf = encode(b"").unwrap();
        assert!(decode(&buf).unwrap().is_empty());
    }

    #[test]
    fn short_buffer_is_invalid_footer() {
        for len in 0..FOOTER_SIZE {
            let buf = vec![0u8; len];
            assert!(matches!(decode(&buf), Err(DecodeError::InvalidFooter)));
        }
    }

    #[test]
    fn bad_magic_is_invalid_footer() {
        let mut buf = encode(b"hello world").unwrap();
        let last = buf.len() - 1;
        buf[last] = b'Q';
        assert!(matches!(decode(&buf), Err(DecodeError::InvalidFooter)));
    }

    #[test]
    fn bad_magic_wins_over_bad_size_and_crc() {
        let mut buf = craft(b"abc", 3, TYPE_STORED);
        buf[7] = 99; // compressed_size
        buf[11] ^= 0xFF; // crc32
        let last = buf.len() - 4;
        buf[last] = b'd';
        assert!(matches!(decode(&buf), Err(DecodeError::InvalidFooter)));
    }

    #[test]
    fn stored_size_mismatch() {
        let mut buf = craft(b"abc", 3, TYPE_STORED);
        buf[7] = 4; // compressed_size
        match decode(&buf) {
            Err(DecodeError::SizeMismatch { expected, actual }) => {
                assert_eq!(expected, 4);
                assert_eq!(actual, 3);
            }
            other => panic!("expected SizeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn size_is_checked_before_crc() {
        let mut buf = craft(b"abc", 3, TYPE_STORED);
        buf[7] = 5;
        buf[0] ^= 1;
        assert!(matches!(decode(&buf), Err(DecodeError::SizeMismatch { .. })));
    }

    #[test]
    fn payload_bit_flip_is_crc_mismatch() {
        let payload = vec![b'z'; 1000];
        let clean = encode(&payload).unwrap();
        let stored = clean.len() - FOOTER_SIZE;
        for byte in [0, stored / 2, stored - 1] {
            for bit in 0..8 {
                let mut buf = clean.clone();
                buf[byte] ^= 1 << bit;
                assert!(matches!(
                    decode(&buf),
                    Err(DecodeError::Crc32Mismatch { .. })
                ));
            }
        }
    }

    #[test]
    fn stored_type_size_mismatch_with_valid_crc() {
        let buf = craft(b"abc", 10, TYPE_STORED);
        match decode(&buf) {
            Err(DecodeError::TypeSizeMismatch {
                original,
                compressed,
            }) => {
                assert_eq!(original, 10);
                assert_eq!(compressed, 3);
            }
            other => panic!("expected TypeSizeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn unknown_type_with_valid_crc() {
        let buf = craft(b"abc", 3, 3);
        assert!(matches!(decode(&buf), Err(DecodeError::UnknownFormat(3))));
    }

    #[test]
    fn crc_is_checked_before_type() {
        let mut buf = craft(b"abc", 3, 9);
        buf[1] ^= 0x40;
        assert!(matches!(decode(&buf), Err(DecodeError::Crc32Mismatch { .. })));
    }

    #[test]
    fn legacy_lz4_type_decodes() {
        let payload = vec![b'q'; 512];
        let block = lz4_flex::block::compress(&payload);
        let buf = craft(&block, 512, TYPE_LZ4_LEGACY);
        assert_eq!(decode(&buf).unwrap(), payload);
    }

    #[test]
    fn lz4_short_output_is_decode_size_mismatch() {
        let payload = vec![b'q'; 512];
        let block = lz4_flex::block::compress(&payload);
        let buf = craft(&block, 600, TYPE_LZ4);
        match decode(&buf) {
            Err(DecodeError::DecodeSizeMismatch { expected, actual }) => {
                assert_eq!(expected, 600);
                assert_eq!(actual, 512);
            }
            other => panic!("expected DecodeSizeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn lz4_garbage_is_decompression_error() {
        let buf = craft(&[0xF0, 0xFF, 0xFF], 64, TYPE_LZ4);
        assert!(matches!(decode(&buf), Err(DecodeError::Decompression(_))));
    }

    #[test]
    fn inspect_returns_footer_only() {
        let buf = encode(&vec![1u8; 256]).unwrap();
        let footer = inspect(&buf).unwrap();
        assert_eq!(footer.kind, TYPE_LZ4);
        assert_eq!(footer.original_size, 256);
        assert!(matches!(inspect(b"short"), Err(DecodeError::InvalidFooter)));
    }
}
