//! dvpl: encoder/decoder and batch converter for DVPL containers.
//!
//! A DVPL file is a payload (stored raw or as an LZ4 block) followed by a
//! 20-byte footer carrying the original size, stored size, CRC-32 and a
//! storage type tag. The crate provides:
//! - Footer layout (`format`)
//! - The in-memory codec (`codec`)
//! - File-oriented helpers (`io`)
//! - Recursive batch conversion (`batch`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```no_run
//! use dvpl::codec;
//!
//! let packed = codec::encode(b"hello world").unwrap();
//! let unpacked = codec::decode(&packed).unwrap();
//! assert_eq!(unpacked, b"hello world");
//! ```
//!
//! Converting a directory tree:
//!
//! ```no_run
//! use dvpl::batch::{self, Direction, ProcessConfig};
//!
//! let config = ProcessConfig::new(Direction::Decompress).keep_originals(true);
//! let report = batch::process(std::path::Path::new("Data"), &config).unwrap();
//! println!("{} files unpacked", report.processed_count());
//! ```

pub mod batch;
pub mod codec;
pub mod format;
pub mod io;

#[cfg(feature = "cli")]
pub mod cli;
