//! Tolerance-based equality
//!
//! Text representations round-trip floats through decimal formatting, so
//! model equality after a save/load cycle compares floating-point fields
//! within `FLOAT_TOLERANCE` (relative, floored at 1.0). Ids, strings,
//! ordering and packed payloads compare exactly.

use crate::annotation::{BiologicalAnnotation, BoundingBox, Colour, ExternalReference, Software};
use crate::collection::{Identified, IdentifiedCollection};
use crate::geometry::{Mesh, Shape, ShapeGeometry, ShapeRepresentation, ThreeDVolume};
use crate::lattice::Lattice;
use crate::segment::Segment;
use crate::segmentation::Segmentation;
use crate::transform::TransformationMatrix;

/// Relative tolerance for float comparison
pub const FLOAT_TOLERANCE: f64 = 1e-6;

/// Equality that tolerates float formatting noise
pub trait ApproxEq {
    /// True if `self` and `other` are equal within tolerance
    fn approx_eq(&self, other: &Self) -> bool;
}

impl ApproxEq for f64 {
    fn approx_eq(&self, other: &Self) -> bool {
        if self.is_nan() || other.is_nan() {
            return self.is_nan() && other.is_nan();
        }
        if self == other {
            return true;
        }
        if self.is_infinite() || other.is_infinite() {
            return false;
        }
        let scale = self.abs().max(other.abs()).max(1.0);
        (self - other).abs() <= FLOAT_TOLERANCE * scale
    }
}

impl ApproxEq for f32 {
    fn approx_eq(&self, other: &Self) -> bool {
        f64::from(*self).approx_eq(&f64::from(*other))
    }
}

impl<T: ApproxEq> ApproxEq for Option<T> {
    fn approx_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.approx_eq(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: ApproxEq> ApproxEq for [T] {
    fn approx_eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.approx_eq(b))
    }
}

impl<T: Identified + ApproxEq> ApproxEq for IdentifiedCollection<T> {
    fn approx_eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|(a, b)| a.id() == b.id() && a.approx_eq(b))
    }
}

/// Types without float fields compare exactly
macro_rules! approx_by_eq {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ApproxEq for $ty {
                fn approx_eq(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

approx_by_eq!(ExternalReference, Software, Mesh, Lattice);

impl ApproxEq for Colour {
    fn approx_eq(&self, other: &Self) -> bool {
        self.to_array()[..].approx_eq(&other.to_array()[..])
    }
}

impl ApproxEq for BoundingBox {
    fn approx_eq(&self, other: &Self) -> bool {
        self.to_array()[..].approx_eq(&other.to_array()[..])
    }
}

impl ApproxEq for TransformationMatrix {
    fn approx_eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.rows() == other.rows()
            && self.cols() == other.cols()
            && self.data().approx_eq(other.data())
    }
}

impl ApproxEq for BiologicalAnnotation {
    fn approx_eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.description == other.description
            && self.number_of_instances == other.number_of_instances
            && self.external_references.approx_eq(&other.external_references)
    }
}

impl ApproxEq for ShapeGeometry {
    fn approx_eq(&self, other: &Self) -> bool {
        if self.kind() != other.kind() {
            return false;
        }
        let a: Vec<f64> = self.dimensions().into_iter().map(|(_, v)| v).collect();
        let b: Vec<f64> = other.dimensions().into_iter().map(|(_, v)| v).collect();
        a[..].approx_eq(&b[..])
    }
}

impl ApproxEq for Shape {
    fn approx_eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.transform_id == other.transform_id
            && self.attribute.approx_eq(&other.attribute)
            && self.geometry.approx_eq(&other.geometry)
    }
}

impl ApproxEq for ThreeDVolume {
    fn approx_eq(&self, other: &Self) -> bool {
        self.lattice_id == other.lattice_id
            && self.transform_id == other.transform_id
            && self.value.approx_eq(&other.value)
    }
}

impl ApproxEq for ShapeRepresentation {
    fn approx_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ShapeRepresentation::Meshes(a), ShapeRepresentation::Meshes(b)) => a.approx_eq(b),
            (ShapeRepresentation::Shapes(a), ShapeRepresentation::Shapes(b)) => a.approx_eq(b),
            (ShapeRepresentation::Volume(a), ShapeRepresentation::Volume(b)) => a.approx_eq(b),
            _ => false,
        }
    }
}

impl ApproxEq for Segment {
    fn approx_eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.parent_id == other.parent_id
            && self
                .biological_annotation
                .approx_eq(&other.biological_annotation)
            && self.colour.approx_eq(&other.colour)
            && self.representation.approx_eq(&other.representation)
    }
}

impl ApproxEq for Segmentation {
    fn approx_eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.version == other.version
            && self.details == other.details
            && self.bounding_box.approx_eq(&other.bounding_box)
            && self.software_list.approx_eq(&other.software_list)
            && self.transforms.approx_eq(&other.transforms)
            && self
                .global_external_references
                .approx_eq(&other.global_external_references)
            && self.segments.approx_eq(&other.segments)
            && self.lattices.approx_eq(&other.lattices)
    }
}
