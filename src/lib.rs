//! sffrw - read/write adapter for EMDB-SFF segmentation files
//!
//! A segmentation is a named set of segments, each carrying exactly one
//! geometry (meshes, shape primitives, or a region of a lattice-backed
//! volume), plus the lattices, transforms and annotations they refer to.
//! The same model is persisted as an XML tree, an HDF5 file, or a JSON
//! document.
//!
//! # Quick Start
//!
//! ```ignore
//! use sffrw::{load, save, Segmentation};
//!
//! let seg = load(Path::new("emd_1014.sff"))?;
//! save(&seg, Path::new("emd_1014.hff"))?;
//! ```
//!
//! # Architecture
//!
//! - `sffrw-core`: the in-memory model, ids, integrity checks, errors
//! - `sffrw-codec`: payload packing, compression and base64
//! - `sffrw-formats`: the three adapters and their configuration

pub use sffrw_codec::{self as codec, Compression, LatticeCodec};
pub use sffrw_core::*;
pub use sffrw_formats::{
    self as formats, adapter_for, load, load_with, save, save_with, Format, FormatAdapter,
    FormatConfig, HffAdapter, JsonAdapter, SffAdapter, CONFIG_FILE_NAME,
};
