//! Binary codecs for segmentation payloads
//!
//! - `pack`: element packing by type and byte order
//! - `compression`: zlib/zstd with mismatch detection
//! - `lattice`: LatticeCodec (pack, compress, base64) and standalone blobs
//! - `sequence`: uncompressed mesh vertex/normal/triangle encoding

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compression;
pub mod lattice;
pub mod pack;
pub mod sequence;

pub use compression::{Compression, DEFAULT_LEVEL};
pub use lattice::{
    decode_base64_text, lattice_from_array, lattice_from_bytes, LatticeCodec, LatticeHeader,
    BLOB_FORMAT_VERSION, BLOB_MAGIC,
};
pub use sequence::SequenceHeader;
