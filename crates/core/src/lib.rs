//! Core types for EMDB-SFF segmentations
//!
//! This crate defines the in-memory model every format adapter reads and
//! writes:
//! - IndexAllocator: per-collection id counter
//! - IdentifiedCollection: ordered, id-indexed entity sequence
//! - Lattice, VolumeStructure, VolumeIndex: typed voxel arrays
//! - Mesh, Shape, ThreeDVolume, ShapeRepresentation: segment geometry
//! - Segment, Segmentation: the aggregate and its annotation batches
//! - DanglingReference: referential-integrity reporting
//! - ApproxEq: tolerance-based model equality
//! - SffError: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod annotation;
pub mod approx;
pub mod collection;
pub mod error;
pub mod geometry;
pub mod index;
pub mod integrity;
pub mod lattice;
pub mod segment;
pub mod segmentation;
pub mod transform;
pub mod types;

pub use annotation::{BiologicalAnnotation, BoundingBox, Colour, ExternalReference, Software};
pub use approx::{ApproxEq, FLOAT_TOLERANCE};
pub use collection::{Identified, IdentifiedCollection};
pub use error::{SffError, SffResult};
pub use geometry::{
    EncodedSequence, Mesh, PrimaryDescriptor, Shape, ShapeGeometry, ShapeKind,
    ShapeRepresentation, ThreeDVolume,
};
pub use index::IndexAllocator;
pub use integrity::DanglingReference;
pub use lattice::{Lattice, VolumeIndex, VolumeStructure};
pub use segment::Segment;
pub use segmentation::{AnnotationScope, Segmentation, SCHEMA_VERSION};
pub use transform::TransformationMatrix;
pub use types::{ElementType, Endianness, Id, Payload};
