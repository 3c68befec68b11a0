//! Segment geometry: meshes, shape primitives and lattice-backed volumes
//!
//! A segment carries exactly one `ShapeRepresentation`. The tagged union
//! makes "which geometry is active" structural: there is no separate flag
//! that could disagree with the populated field.

use crate::collection::{identified, IdentifiedCollection};
use crate::error::{SffError, SffResult};
use crate::types::{ElementType, Endianness, Id, Payload};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Meshes
// ============================================================================

/// Packed triples (vertices, normals or triangles) of one element type
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedSequence {
    /// Byte order used when packed
    pub endianness: Endianness,
    data: Payload,
}

impl EncodedSequence {
    /// Wrap a flat payload; its length must be a multiple of 3
    pub fn new(data: impl Into<Payload>) -> SffResult<Self> {
        let data = data.into();
        if data.len() % 3 != 0 {
            return Err(SffError::invalid_shape(
                "encoded sequence",
                format!("{} values do not form whole triples", data.len()),
            ));
        }
        Ok(Self {
            endianness: Endianness::default(),
            data,
        })
    }

    /// Set the byte order
    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    /// Number of triples
    pub fn num_items(&self) -> usize {
        self.data.len() / 3
    }

    /// Element type
    pub fn mode(&self) -> ElementType {
        self.data.element_type()
    }

    /// Flat payload
    pub fn data(&self) -> &Payload {
        &self.data
    }
}

/// Triangulated surface
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    /// Id within the segment's mesh list
    pub id: Option<Id>,
    /// Vertex coordinates, one triple per vertex
    pub vertices: EncodedSequence,
    /// Per-vertex normals
    pub normals: Option<EncodedSequence>,
    /// Vertex indices, one triple per triangle
    pub triangles: EncodedSequence,
    /// Transform applied to the mesh
    pub transform_id: Option<Id>,
}

identified!(Mesh, "mesh");

impl Mesh {
    /// Create a mesh without normals or transform
    pub fn new(vertices: EncodedSequence, triangles: EncodedSequence) -> Self {
        Self {
            id: None,
            vertices,
            normals: None,
            triangles,
            transform_id: None,
        }
    }

    /// Attach normals
    pub fn with_normals(mut self, normals: EncodedSequence) -> Self {
        self.normals = Some(normals);
        self
    }

    /// Reference a transform
    pub fn with_transform(mut self, transform_id: Id) -> Self {
        self.transform_id = Some(transform_id);
        self
    }

    /// Check normals match vertices and triangles index with integers
    pub fn validate(&self) -> SffResult<()> {
        let context = || match self.id {
            Some(id) => format!("mesh {}", id),
            None => "mesh".to_string(),
        };
        if let Some(normals) = &self.normals {
            if normals.num_items() != self.vertices.num_items() {
                return Err(SffError::invalid_shape(
                    context(),
                    format!(
                        "{} normals for {} vertices",
                        normals.num_items(),
                        self.vertices.num_items()
                    ),
                ));
            }
        }
        if self.triangles.mode().is_float() {
            return Err(SffError::invalid_shape(
                context(),
                format!("triangle indices must be integers, got {}", self.triangles.mode()),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Shape primitives
// ============================================================================

/// Concrete primitive kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// Cone
    Cone,
    /// Cuboid
    Cuboid,
    /// Cylinder
    Cylinder,
    /// Ellipsoid
    Ellipsoid,
}

impl ShapeKind {
    /// All kinds
    pub const ALL: [ShapeKind; 4] = [
        ShapeKind::Cone,
        ShapeKind::Cuboid,
        ShapeKind::Cylinder,
        ShapeKind::Ellipsoid,
    ];

    /// Persisted tag
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeKind::Cone => "cone",
            ShapeKind::Cuboid => "cuboid",
            ShapeKind::Cylinder => "cylinder",
            ShapeKind::Ellipsoid => "ellipsoid",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShapeKind {
    type Err = SffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShapeKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| SffError::invalid_shape("shape", format!("unknown shape kind '{}'", s)))
    }
}

/// Dimensions of a primitive, by kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeGeometry {
    /// Cone along its axis
    Cone {
        /// Height
        height: f64,
        /// Radius of the base
        bottom_radius: f64,
    },
    /// Box with edge lengths
    Cuboid {
        /// Length in x
        x: f64,
        /// Length in y
        y: f64,
        /// Length in z
        z: f64,
    },
    /// Right circular cylinder
    Cylinder {
        /// Height
        height: f64,
        /// Diameter
        diameter: f64,
    },
    /// Ellipsoid with axis lengths
    Ellipsoid {
        /// Length in x
        x: f64,
        /// Length in y
        y: f64,
        /// Length in z
        z: f64,
    },
}

impl ShapeGeometry {
    /// Kind tag
    pub fn kind(&self) -> ShapeKind {
        match self {
            ShapeGeometry::Cone { .. } => ShapeKind::Cone,
            ShapeGeometry::Cuboid { .. } => ShapeKind::Cuboid,
            ShapeGeometry::Cylinder { .. } => ShapeKind::Cylinder,
            ShapeGeometry::Ellipsoid { .. } => ShapeKind::Ellipsoid,
        }
    }

    /// Named dimensions in persisted order
    pub fn dimensions(&self) -> Vec<(&'static str, f64)> {
        match *self {
            ShapeGeometry::Cone {
                height,
                bottom_radius,
            } => vec![("height", height), ("bottom_radius", bottom_radius)],
            ShapeGeometry::Cylinder { height, diameter } => {
                vec![("height", height), ("diameter", diameter)]
            }
            ShapeGeometry::Cuboid { x, y, z } | ShapeGeometry::Ellipsoid { x, y, z } => {
                vec![("x", x), ("y", y), ("z", z)]
            }
        }
    }

    /// Rebuild from a kind and a dimension lookup.
    ///
    /// `lookup` returns `None` for a missing dimension, which is reported
    /// as `InvalidShape`.
    pub fn from_dimensions<F>(kind: ShapeKind, mut lookup: F) -> SffResult<Self>
    where
        F: FnMut(&'static str) -> Option<f64>,
    {
        let mut get = |name: &'static str| {
            lookup(name).ok_or_else(|| {
                SffError::invalid_shape(kind.as_str(), format!("missing dimension '{}'", name))
            })
        };
        Ok(match kind {
            ShapeKind::Cone => ShapeGeometry::Cone {
                height: get("height")?,
                bottom_radius: get("bottom_radius")?,
            },
            ShapeKind::Cylinder => ShapeGeometry::Cylinder {
                height: get("height")?,
                diameter: get("diameter")?,
            },
            ShapeKind::Cuboid => ShapeGeometry::Cuboid {
                x: get("x")?,
                y: get("y")?,
                z: get("z")?,
            },
            ShapeKind::Ellipsoid => ShapeGeometry::Ellipsoid {
                x: get("x")?,
                y: get("y")?,
                z: get("z")?,
            },
        })
    }
}

/// Geometric primitive placed by a transform
///
/// Cones, cuboids, cylinders and ellipsoids share one id space within a
/// segment's shape list.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    /// Id within the segment's shape list
    pub id: Option<Id>,
    /// Transform placing the primitive
    pub transform_id: Id,
    /// Extra scalar, e.g. a figure of merit
    pub attribute: Option<f64>,
    /// Kind and dimensions
    pub geometry: ShapeGeometry,
}

identified!(Shape, "shape");

impl Shape {
    /// Create a primitive with no id and no attribute
    pub fn new(geometry: ShapeGeometry, transform_id: Id) -> Self {
        Self {
            id: None,
            transform_id,
            attribute: None,
            geometry,
        }
    }

    /// Cone
    pub fn cone(height: f64, bottom_radius: f64, transform_id: Id) -> Self {
        Self::new(
            ShapeGeometry::Cone {
                height,
                bottom_radius,
            },
            transform_id,
        )
    }

    /// Cuboid
    pub fn cuboid(x: f64, y: f64, z: f64, transform_id: Id) -> Self {
        Self::new(ShapeGeometry::Cuboid { x, y, z }, transform_id)
    }

    /// Cylinder
    pub fn cylinder(height: f64, diameter: f64, transform_id: Id) -> Self {
        Self::new(ShapeGeometry::Cylinder { height, diameter }, transform_id)
    }

    /// Ellipsoid
    pub fn ellipsoid(x: f64, y: f64, z: f64, transform_id: Id) -> Self {
        Self::new(ShapeGeometry::Ellipsoid { x, y, z }, transform_id)
    }

    /// Set the extra attribute
    pub fn with_attribute(mut self, attribute: f64) -> Self {
        self.attribute = Some(attribute);
        self
    }

    /// Kind tag
    pub fn kind(&self) -> ShapeKind {
        self.geometry.kind()
    }
}

impl IdentifiedCollection<Shape> {
    /// Primitives of one kind, in insertion order
    pub fn of_kind(&self, kind: ShapeKind) -> impl Iterator<Item = &Shape> + '_ {
        self.iter().filter(move |s| s.kind() == kind)
    }

    /// Number of primitives of one kind
    pub fn count_of(&self, kind: ShapeKind) -> usize {
        self.of_kind(kind).count()
    }
}

// ============================================================================
// Volumes and the representation union
// ============================================================================

/// Region of a lattice selected by voxel value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThreeDVolume {
    /// Lattice holding the voxels
    pub lattice_id: Id,
    /// Voxel value that belongs to this segment
    pub value: f64,
    /// Transform applied to the volume
    pub transform_id: Option<Id>,
}

impl ThreeDVolume {
    /// Reference `lattice_id` at `value`
    pub fn new(lattice_id: Id, value: f64) -> Self {
        Self {
            lattice_id,
            value,
            transform_id: None,
        }
    }

    /// Reference a transform
    pub fn with_transform(mut self, transform_id: Id) -> Self {
        self.transform_id = Some(transform_id);
        self
    }
}

/// Which representation a segmentation's segments use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimaryDescriptor {
    /// `mesh_list`
    #[default]
    MeshList,
    /// `shape_primitive_list`
    ShapePrimitiveList,
    /// `three_d_volume`
    ThreeDVolume,
}

impl PrimaryDescriptor {
    /// Persisted tag
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimaryDescriptor::MeshList => "mesh_list",
            PrimaryDescriptor::ShapePrimitiveList => "shape_primitive_list",
            PrimaryDescriptor::ThreeDVolume => "three_d_volume",
        }
    }
}

impl fmt::Display for PrimaryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrimaryDescriptor {
    type Err = SffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mesh_list" => Ok(PrimaryDescriptor::MeshList),
            "shape_primitive_list" => Ok(PrimaryDescriptor::ShapePrimitiveList),
            "three_d_volume" => Ok(PrimaryDescriptor::ThreeDVolume),
            other => Err(SffError::schema(
                "primary_descriptor",
                format!("unknown descriptor '{}'", other),
            )),
        }
    }
}

/// The one geometry a segment carries
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeRepresentation {
    /// Triangulated surfaces
    Meshes(IdentifiedCollection<Mesh>),
    /// Geometric primitives
    Shapes(IdentifiedCollection<Shape>),
    /// Labeled region of a lattice
    Volume(ThreeDVolume),
}

impl Default for ShapeRepresentation {
    fn default() -> Self {
        ShapeRepresentation::Meshes(IdentifiedCollection::new())
    }
}

impl ShapeRepresentation {
    /// Empty representation of the given kind; `None` for volumes, which
    /// have no empty form
    pub fn empty(descriptor: PrimaryDescriptor) -> Option<Self> {
        match descriptor {
            PrimaryDescriptor::MeshList => Some(ShapeRepresentation::Meshes(IdentifiedCollection::new())),
            PrimaryDescriptor::ShapePrimitiveList => {
                Some(ShapeRepresentation::Shapes(IdentifiedCollection::new()))
            }
            PrimaryDescriptor::ThreeDVolume => None,
        }
    }

    /// Descriptor tag for this representation
    pub fn descriptor(&self) -> PrimaryDescriptor {
        match self {
            ShapeRepresentation::Meshes(_) => PrimaryDescriptor::MeshList,
            ShapeRepresentation::Shapes(_) => PrimaryDescriptor::ShapePrimitiveList,
            ShapeRepresentation::Volume(_) => PrimaryDescriptor::ThreeDVolume,
        }
    }

    /// Meshes, if this is a mesh list
    pub fn meshes(&self) -> Option<&IdentifiedCollection<Mesh>> {
        match self {
            ShapeRepresentation::Meshes(meshes) => Some(meshes),
            _ => None,
        }
    }

    /// Primitives, if this is a shape list
    pub fn shapes(&self) -> Option<&IdentifiedCollection<Shape>> {
        match self {
            ShapeRepresentation::Shapes(shapes) => Some(shapes),
            _ => None,
        }
    }

    /// Volume, if this is a lattice reference
    pub fn volume(&self) -> Option<&ThreeDVolume> {
        match self {
            ShapeRepresentation::Volume(volume) => Some(volume),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_mesh() -> Mesh {
        Mesh::new(
            EncodedSequence::new(vec![0f32, 0., 0., 1., 0., 0., 0., 1., 0.]).unwrap(),
            EncodedSequence::new(vec![0u32, 1, 2]).unwrap(),
        )
    }

    #[test]
    fn test_encoded_sequence_requires_triples() {
        assert!(EncodedSequence::new(vec![1f32, 2.]).is_err());
        let seq = EncodedSequence::new(vec![1f64; 6]).unwrap();
        assert_eq!(seq.num_items(), 2);
        assert_eq!(seq.mode(), ElementType::Float64);
    }

    #[test]
    fn test_mesh_normals_must_match_vertices() {
        let mesh = triangle_mesh();
        assert!(mesh.validate().is_ok());

        let bad = triangle_mesh().with_normals(EncodedSequence::new(vec![0f32; 3]).unwrap());
        assert!(matches!(bad.validate(), Err(SffError::InvalidShape { .. })));

        let good = triangle_mesh().with_normals(EncodedSequence::new(vec![0f32; 9]).unwrap());
        assert!(good.validate().is_ok());
    }

    #[test]
    fn test_mesh_float_triangles_rejected() {
        let mut mesh = triangle_mesh();
        mesh.triangles = EncodedSequence::new(vec![0f32, 1., 2.]).unwrap();
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn test_shape_variants_share_id_space() {
        let mut shapes = IdentifiedCollection::new();
        shapes.append(Shape::cone(10.0, 2.0, 0)).unwrap();
        shapes.append(Shape::cuboid(1.0, 2.0, 3.0, 0)).unwrap();
        shapes.append(Shape::cone(5.0, 1.0, 1)).unwrap();
        shapes.append(Shape::ellipsoid(1.0, 1.0, 1.0, 1)).unwrap();

        assert_eq!(shapes.ids().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert_eq!(shapes.count_of(ShapeKind::Cone), 2);
        assert_eq!(shapes.count_of(ShapeKind::Cylinder), 0);
        let kinds: Vec<ShapeKind> = shapes.iter().map(Shape::kind).collect();
        assert_eq!(
            kinds,
            vec![
                ShapeKind::Cone,
                ShapeKind::Cuboid,
                ShapeKind::Cone,
                ShapeKind::Ellipsoid
            ]
        );
    }

    #[test]
    fn test_geometry_dimensions_round_trip() {
        for geometry in [
            ShapeGeometry::Cone {
                height: 3.0,
                bottom_radius: 0.5,
            },
            ShapeGeometry::Cylinder {
                height: 2.0,
                diameter: 1.0,
            },
            ShapeGeometry::Cuboid {
                x: 1.0,
                y: 2.0,
                z: 3.0,
            },
            ShapeGeometry::Ellipsoid {
                x: 4.0,
                y: 5.0,
                z: 6.0,
            },
        ] {
            let dims = geometry.dimensions();
            let rebuilt = ShapeGeometry::from_dimensions(geometry.kind(), |name| {
                dims.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
            })
            .unwrap();
            assert_eq!(rebuilt, geometry);
        }
    }

    #[test]
    fn test_geometry_missing_dimension() {
        let err = ShapeGeometry::from_dimensions(ShapeKind::Cylinder, |name| {
            (name == "height").then_some(1.0)
        })
        .unwrap_err();
        assert!(err.to_string().contains("diameter"));
    }

    #[test]
    fn test_primary_descriptor_tags() {
        for d in [
            PrimaryDescriptor::MeshList,
            PrimaryDescriptor::ShapePrimitiveList,
            PrimaryDescriptor::ThreeDVolume,
        ] {
            assert_eq!(d.as_str().parse::<PrimaryDescriptor>().unwrap(), d);
        }
        assert!("contour_list".parse::<PrimaryDescriptor>().is_err());
    }

    #[test]
    fn test_representation_accessors() {
        let rep = ShapeRepresentation::Volume(ThreeDVolume::new(7, 1.0).with_transform(3));
        assert_eq!(rep.descriptor(), PrimaryDescriptor::ThreeDVolume);
        assert_eq!(rep.volume().unwrap().lattice_id, 7);
        assert!(rep.meshes().is_none());
        assert!(ShapeRepresentation::empty(PrimaryDescriptor::ThreeDVolume).is_none());
        assert_eq!(
            ShapeRepresentation::empty(PrimaryDescriptor::ShapePrimitiveList)
                .unwrap()
                .descriptor(),
            PrimaryDescriptor::ShapePrimitiveList
        );
    }
}
