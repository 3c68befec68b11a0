//! Cross-collection reference checks
//!
//! Segments point at lattices (volumes), transforms (volumes, meshes,
//! shapes) and other segments (parents). `check_referential_integrity`
//! walks all of them and reports every miss. The check is advisory;
//! `require_referential_integrity` turns a non-empty report into an error.

use crate::error::{SffError, SffResult};
use crate::geometry::ShapeRepresentation;
use crate::segmentation::Segmentation;
use crate::types::Id;
use std::fmt;

/// A reference whose target does not exist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    /// Segment holding the reference
    pub segment_id: Id,
    /// What inside the segment refers out: "segment", "three_d_volume", "mesh" or "shape"
    pub origin_kind: &'static str,
    /// Mesh or shape id when the origin is a nested entity
    pub origin_id: Option<Id>,
    /// Kind of the missing target: "lattice", "transform" or "segment"
    pub target_kind: &'static str,
    /// Missing id
    pub target_id: Id,
}

impl fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "segment {}", self.segment_id)?;
        if self.origin_kind != "segment" {
            write!(f, " {}", self.origin_kind)?;
            if let Some(id) = self.origin_id {
                write!(f, " {}", id)?;
            }
        }
        write!(f, " -> {} {}", self.target_kind, self.target_id)
    }
}

impl Segmentation {
    /// Report every dangling lattice, transform and parent reference
    pub fn check_referential_integrity(&self) -> Vec<DanglingReference> {
        let mut dangling = Vec::new();
        for segment in self.segments.iter() {
            let segment_id = segment.id.unwrap_or_default();
            let mut miss = |origin_kind: &'static str,
                            origin_id: Option<Id>,
                            target_kind: &'static str,
                            target_id: Id| {
                dangling.push(DanglingReference {
                    segment_id,
                    origin_kind,
                    origin_id,
                    target_kind,
                    target_id,
                })
            };

            if let Some(parent) = segment.parent_id {
                if !self.segments.contains_id(parent) {
                    miss("segment", None, "segment", parent);
                }
            }

            match &segment.representation {
                ShapeRepresentation::Volume(volume) => {
                    if !self.lattices.contains_id(volume.lattice_id) {
                        miss("three_d_volume", None, "lattice", volume.lattice_id);
                    }
                    if let Some(t) = volume.transform_id {
                        if !self.transforms.contains_id(t) {
                            miss("three_d_volume", None, "transform", t);
                        }
                    }
                }
                ShapeRepresentation::Meshes(meshes) => {
                    for mesh in meshes.iter() {
                        if let Some(t) = mesh.transform_id {
                            if !self.transforms.contains_id(t) {
                                miss("mesh", mesh.id, "transform", t);
                            }
                        }
                    }
                }
                ShapeRepresentation::Shapes(shapes) => {
                    for shape in shapes.iter() {
                        if !self.transforms.contains_id(shape.transform_id) {
                            miss("shape", shape.id, "transform", shape.transform_id);
                        }
                    }
                }
            }
        }
        dangling
    }

    /// Fail with `DanglingReference` if any reference is dangling
    pub fn require_referential_integrity(&self) -> SffResult<()> {
        let dangling = self.check_referential_integrity();
        if dangling.is_empty() {
            Ok(())
        } else {
            Err(SffError::DanglingReference(dangling))
        }
    }
}
