// In-memory DVPL codec.
//
// - `backend`: BlockCompressor: the LZ4 block primitive behind a trait
// - `encoder`: compress-and-wrap with the raw-storage fallback
// - `decoder`: ordered footer/size/CRC/type validation and unwrap
//
// Nothing in here touches the file system.

pub mod backend;
pub mod decoder;
pub mod encoder;

pub use backend::{BlockCompressor, Lz4Block, NoCompression};
pub use decoder::{DecodeError, decode, decode_with, inspect};
pub use encoder::{EncodeError, EncodeOptions, FailurePolicy, encode, encode_with};
