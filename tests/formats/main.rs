//! Format adapter integration tests
//!
//! Save/load cycles through real files for every representation,
//! cross-format equivalence, integrity policy and failure handling.

#[path = "../common/mod.rs"]
mod common;

mod atomic_save;
mod config;
mod corruption;
mod cross_format;
mod identifiers;
mod integrity;
mod properties;
mod round_trip;
mod validation;
