// DVPL encoder.
//
// Compresses a payload with the block backend and appends the footer.
// Payloads that do not shrink are stored raw (type 0); whether a failing
// backend is also absorbed that way depends on `FailurePolicy`.

use std::io;

use thiserror::Error;

use crate::format::{FOOTER_SIZE, Footer, StorageKind};

use super::backend::{BlockCompressor, Lz4Block};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// What to do when the block compressor itself returns an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Store the payload raw, exactly as for incompressible input.
    #[default]
    StoreRaw,
    /// Return [`EncodeError::Compression`] to the caller.
    Propagate,
}

/// Configuration for DVPL encoding.
#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    /// Handling of compressor failures.
    pub policy: FailurePolicy,
}

impl EncodeOptions {
    /// Options that surface compressor failures instead of storing raw.
    pub fn strict() -> Self {
        Self {
            policy: FailurePolicy::Propagate,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum EncodeError {
    /// The block compressor failed and the policy is `Propagate`.
    #[error("compression failed: {0}")]
    Compression(#[source] io::Error),
    /// The footer stores sizes as `u32`.
    #[error("payload of {0} bytes exceeds the 4 GiB footer limit")]
    TooLarge(usize),
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Encode `payload` into a DVPL buffer using LZ4 and default options.
///
/// ```
/// let dvpl = dvpl::codec::encode(b"hello world").unwrap();
/// assert_eq!(dvpl.len(), 31);
/// assert_eq!(&dvpl[dvpl.len() - 4..], b"DVPL");
/// ```
pub fn encode(payload: &[u8]) -> Result<Vec<u8>, EncodeError> {
    encode_with(payload, &Lz4Block, &EncodeOptions::default())
}

/// Encode `payload` with an explicit backend and options.
pub fn encode_with(
    payload: &[u8],
    backend: &dyn BlockCompressor,
    opts: &EncodeOptions,
) -> Result<Vec<u8>, EncodeError> {
    let original_size =
        u32::try_from(payload.len()).map_err(|_| EncodeError::TooLarge(payload.len()))?;

    let compressed = match backend.compress_block(payload) {
        Ok(block) => Some(block),
        Err(e) => match opts.policy {
            FailurePolicy::Propagate => return Err(EncodeError::Compression(e)),
            FailurePolicy::StoreRaw => {
                log::debug!(
                    "{} compression failed ({e}), storing {} bytes raw",
                    backend.name(),
                    payload.len()
                );
                None
            }
        },
    };

    // Only keep the block if it is non-empty and strictly smaller.
    let compressed = compressed.filter(|block| !block.is_empty() && block.len() < payload.len());

    let (stored, kind): (&[u8], StorageKind) = match &compressed {
        Some(block) => (block.as_slice(), StorageKind::Lz4),
        None => (payload, StorageKind::Stored),
    };

    let footer = Footer::describe(stored, original_size, kind);
    let mut out = Vec::with_capacity(stored.len() + FOOTER_SIZE);
    out.extend_from_slice(stored);
    out.extend_from_slice(&footer.to_bytes());
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
