//! Format adapters for EMDB-SFF segmentations
//!
//! Three on-disk forms share one in-memory model:
//! - `sff`: schema-validated XML tree (`.sff`, `.xml`)
//! - `hff`: HDF5 file (`.hff`, `.h5`, `.hdf5`)
//! - `json`: JSON document (`.json`)
//!
//! `load`/`save` dispatch on the file extension. Saves go through a
//! temporary file that is renamed into place, so a failed write never
//! leaves a partial file at the target path.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
pub mod config;
pub mod hdf5;
pub mod hff;
pub mod json;
pub mod naming;
pub mod schema;
pub mod sff;
pub mod tree;

pub use adapter::{adapter_for, load, load_with, save, save_with, Format, FormatAdapter};
pub use config::{FormatConfig, CONFIG_FILE_NAME};
pub use hff::HffAdapter;
pub use json::JsonAdapter;
pub use sff::SffAdapter;
