// Block compression primitive used for DVPL payloads.
//
// The codec never compresses anything itself; it calls a `BlockCompressor`
// once per buffer. Built-in implementations:
//   - Lz4Block      (lz4_flex block format, what DVPL type 1/2 payloads use)
//   - NoCompression (passthrough; every payload ends up stored raw)

use std::io;

/// A raw block compressor.
///
/// # Implementing a custom backend
///
/// ```no_run
/// use dvpl::codec::backend::BlockCompressor;
///
/// struct Identity;
///
/// impl BlockCompressor for Identity {
///     fn name(&self) -> &'static str { "identity" }
///     fn compress_block(&self, input: &[u8]) -> std::io::Result<Vec<u8>> {
///         Ok(input.to_vec())
///     }
///     fn decompress_block(&self, input: &[u8], _expected: usize) -> std::io::Result<Vec<u8>> {
///         Ok(input.to_vec())
///     }
/// }
/// ```
pub trait BlockCompressor: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Compress `input` into a single block.
    ///
    /// An empty result or one that is not smaller than `input` makes the
    /// encoder store the payload raw instead.
    fn compress_block(&self, input: &[u8]) -> io::Result<Vec<u8>>;

    /// Decompress a block expected to hold `expected_size` bytes.
    ///
    /// Returns the bytes actually produced; the caller compares the length
    /// against `expected_size`.
    fn decompress_block(&self, input: &[u8], expected_size: usize) -> io::Result<Vec<u8>>;
}

// ---------------------------------------------------------------------------
// LZ4 backend
// ---------------------------------------------------------------------------

/// LZ4 block compressor (no frame, no size prefix).
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Block;

impl BlockCompressor for Lz4Block {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn compress_block(&self, input: &[u8]) -> io::Result<Vec<u8>> {
        Ok(lz4_flex::block::compress(input))
    }

    fn decompress_block(&self, input: &[u8], expected_size: usize) -> io::Result<Vec<u8>> {
        let mut output = vec![0u8; expected_size];
        let written = lz4_flex::block::decompress_into(input, &mut output).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("LZ4 decompression failed: {e}"),
            )
        })?;
        output.truncate(written);
        Ok(output)
    }
}

// ---------------------------------------------------------------------------
// No-compression backend
// ---------------------------------------------------------------------------

/// Passthrough "compressor".
///
/// `compress_block` returns its input unchanged, which is never smaller, so
/// the encoder always falls back to raw storage.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCompression;

impl BlockCompressor for NoCompression {
    fn name(&self) -> &'static str {
        "none"
    }

    fn compress_block(&self, input: &[u8]) -> io::Result<Vec<u8>> {
        Ok(input.to_vec())
    }

    fn decompress_block(&self, input: &[u8], _expected_size: usize) -> io::Result<Vec<u8>> {
        Ok(input.to_vec())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lz4_block_roundtrip() {
        let data: Vec<u8> = b"abcabcabcabc".iter().copied().cycle().take(4096).collect();
        let compressed = Lz4Block.compress_block(&data).unwrap();
        assert!(compressed.len() < data.len());
        let decompressed = Lz4Block.decompress_block(&compressed, data.len()).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn lz4_block_rejects_garbage() {
        // Token asks for 15+ literals that are not there.
        assert!(Lz4Block.decompress_block(&[0xF0, 0xFF, 0xFF], 64).is_err());
    }

    #[test]
    fn lz4_block_rejects_output_larger_than_expected() {
        let data = vec![7u8; 1024];
        let compressed = Lz4Block.compress_block(&data).unwrap();
        assert!(Lz4Block.decompress_block(&compressed, 512).is_err());
    }

    #[test]
    fn lz4_block_reports_short_output() {
        let data = vec![7u8; 1024];
        let compressed = Lz4Block.compress_block(&data).unwrap();
        let out = Lz4Block.decompress_block(&compressed, 2048).unwrap();
        assert_eq!(out.len(), 1024);
    }

    #[test]
    fn no_compression_is_passthrough() {
        assert_eq!(NoCompression.compress_block(b"data").unwrap(), b"data");
        assert_eq!(NoCompression.decompress_block(b"data", 4).unwrap(), b"data");
    }
}
