// DVPL footer layout.
//
// Every DVPL file is `payload ++ footer`, where the footer is a fixed
// 20-byte little-endian trailer:
//
//   offset  0  u32  original (uncompressed) size
//   offset  4  u32  stored payload size
//   offset  8  u32  CRC-32 (IEEE) of the stored payload
//   offset 12  u32  storage type (0 = raw, 1/2 = LZ4 block)
//   offset 16  [u8; 4] magic "DVPL"

use std::fmt;

use crate::codec::decoder::DecodeError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Size of the trailing footer in bytes.
pub const FOOTER_SIZE: usize = 20;

/// Magic bytes closing every footer.
pub const MAGIC: [u8; 4] = *b"DVPL";

/// File extension marking a DVPL container (without the dot).
pub const DVPL_EXTENSION: &str = "dvpl";

/// File name suffix marking a DVPL container.
pub const DVPL_SUFFIX: &str = ".dvpl";

pub const TYPE_STORED: u32 = 0;
pub const TYPE_LZ4_LEGACY: u32 = 1;
pub const TYPE_LZ4: u32 = 2;

// ---------------------------------------------------------------------------
// Storage kind
// ---------------------------------------------------------------------------

/// How the payload in front of the footer is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// Payload stored verbatim (type 0).
    Stored,
    /// LZ4 block, legacy tag (type 1). Decoded, never written.
    Lz4Legacy,
    /// LZ4 block (type 2).
    Lz4,
}

impl StorageKind {
    /// Raw footer tag for this kind.
    pub fn tag(self) -> u32 {
        match self {
            Self::Stored => TYPE_STORED,
            Self::Lz4Legacy => TYPE_LZ4_LEGACY,
            Self::Lz4 => TYPE_LZ4,
        }
    }

    /// Map a raw footer tag to a kind, `None` for unknown tags.
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            TYPE_STORED => Some(Self::Stored),
            TYPE_LZ4_LEGACY => Some(Self::Lz4Legacy),
            TYPE_LZ4 => Some(Self::Lz4),
            _ => None,
        }
    }

    pub fn is_compressed(self) -> bool {
        !matches!(self, Self::Stored)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::Lz4Legacy => "lz4-legacy",
            Self::Lz4 => "lz4",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Footer
// ---------------------------------------------------------------------------

/// Parsed DVPL footer.
///
/// `kind` keeps the raw tag so that footers carrying an unknown type can
/// still be parsed and reported. Use [`Footer::storage`] to interpret it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    /// Size of the payload once decoded.
    pub original_size: u32,
    /// Size of the payload as stored in front of the footer.
    pub compressed_size: u32,
    /// CRC-32 (IEEE) of the stored payload bytes.
    pub crc32: u32,
    /// Raw storage type tag.
    pub kind: u32,
}

impl Footer {
    /// Build the footer describing `stored`, a payload that decodes to
    /// `original_size` bytes.
    ///
    /// Callers guarantee both lengths fit in a `u32`.
    pub fn describe(stored: &[u8], original_size: u32, kind: StorageKind) -> Self {
        Self {
            original_size,
            compressed_size: stored.len() as u32,
            crc32: crc32fast::hash(stored),
            kind: kind.tag(),
        }
    }

    /// Serialize to the 20-byte on-disk form.
    pub fn to_bytes(&self) -> [u8; FOOTER_SIZE] {
        let mut out = [0u8; FOOTER_SIZE];
        out[0..4].copy_from_slice(&self.original_size.to_le_bytes());
        out[4..8].copy_from_slice(&self.compressed_size.to_le_bytes());
        out[8..12].copy_from_slice(&self.crc32.to_le_bytes());
        out[12..16].copy_from_slice(&self.kind.to_le_bytes());
        out[16..20].copy_from_slice(&MAGIC);
        out
    }

    /// Parse a footer from exactly [`FOOTER_SIZE`] bytes.
    ///
    /// Only the length and the magic are checked here. Size, checksum and
    /// type validation belong to the decoder, which runs them in order.
    pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
        let bytes: &[u8; FOOTER_SIZE] = bytes.try_into().map_err(|_| DecodeError::InvalidFooter)?;
        if bytes[16..20] != MAGIC {
            return Err(DecodeError::InvalidFooter);
        }
        Ok(Self {
            original_size: read_u32_le(bytes, 0),
            compressed_size: read_u32_le(bytes, 4),
            crc32: read_u32_le(bytes, 8),
            kind: read_u32_le(bytes, 12),
        })
    }

    /// Split a DVPL buffer into its stored payload and parsed footer.
    pub fn split(buffer: &[u8]) -> Result<(&[u8], Self), DecodeError> {
        if buffer.len() < FOOTER_SIZE {
            return Err(DecodeError::InvalidFooter);
        }
        let (payload, trailer) = buffer.split_at(buffer.len() - FOOTER_SIZE);
        Ok((payload, Self::parse(trailer)?))
    }

    /// Interpret the raw type tag.
    pub fn storage(&self) -> Result<StorageKind, DecodeError> {
        StorageKind::from_tag(self.kind).ok_or(DecodeError::UnknownFormat(self.kind))
    }
}

fn read_u32_le(bytes: &[u8; FOOTER_SIZE], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
