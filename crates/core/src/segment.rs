//! Segments

use crate::annotation::{BiologicalAnnotation, Colour};
use crate::collection::{identified, IdentifiedCollection};
use crate::geometry::{Mesh, Shape, ShapeRepresentation, ThreeDVolume};
use crate::error::{SffError, SffResult};
use crate::types::Id;

/// One labeled region of a segmentation
///
/// Segment ids start at 1; id 0 stands for the segmentation itself and is
/// the persisted encoding of "no parent", so `Some(0)` is never a valid
/// parent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Segment {
    /// Id within the segmentation's segment collection
    pub id: Option<Id>,
    /// Enclosing segment; `None` for roots
    pub parent_id: Option<Id>,
    /// Biological meaning
    pub biological_annotation: Option<BiologicalAnnotation>,
    /// Display colour
    pub colour: Option<Colour>,
    /// Geometry
    pub representation: ShapeRepresentation,
}

identified!(Segment, "segment", 1);

impl Segment {
    /// Segment with the given geometry
    pub fn new(representation: ShapeRepresentation) -> Self {
        Self {
            representation,
            ..Self::default()
        }
    }

    /// Segment described by meshes
    pub fn from_meshes(meshes: IdentifiedCollection<Mesh>) -> Self {
        Self::new(ShapeRepresentation::Meshes(meshes))
    }

    /// Segment described by shape primitives
    pub fn from_shapes(shapes: IdentifiedCollection<Shape>) -> Self {
        Self::new(ShapeRepresentation::Shapes(shapes))
    }

    /// Segment described by a region of a lattice
    pub fn from_volume(volume: ThreeDVolume) -> Self {
        Self::new(ShapeRepresentation::Volume(volume))
    }

    /// Set the id
    pub fn with_id(mut self, id: Id) -> Self {
        self.id = Some(id);
        self
    }

    /// Nest under another segment
    pub fn with_parent(mut self, parent_id: Id) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Set the colour
    pub fn with_colour(mut self, colour: Colour) -> Self {
        self.colour = Some(colour);
        self
    }

    /// Set the biological annotation
    pub fn with_annotation(mut self, annotation: BiologicalAnnotation) -> Self {
        self.biological_annotation = Some(annotation);
        self
    }

    /// True if the segment has no parent
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Check the fields every format must be able to persist
    pub fn validate(&self) -> SffResult<()> {
        if self.parent_id == Some(0) {
            return Err(SffError::InvalidParent {
                segment_id: self.id,
                parent_id: 0,
            });
        }
        if let Some(colour) = &self.colour {
            colour.validate()?;
        }
        Ok(())
    }
}
