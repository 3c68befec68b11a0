//! Plain JSON tree adapter (`.json`)
//!
//! The document mirrors the XML tree: same field names, same nesting,
//! binary payloads as base64 strings. No schema is enforced; unknown
//! fields are ignored and optional fields may be absent. Referential
//! integrity is checked after load but only logged.

use crate::adapter::{warn_dangling, Format, FormatAdapter, RepresentationParts};
use crate::config::FormatConfig;
use serde::{Deserialize, Serialize};
use sffrw_codec::sequence::{self, SequenceHeader};
use sffrw_codec::{LatticeCodec, LatticeHeader};
use sffrw_core::{
    BiologicalAnnotation, BoundingBox, Colour, EncodedSequence, ExternalReference, Id,
    IdentifiedCollection, Lattice, Mesh, PrimaryDescriptor, Segment, Segmentation, SffError,
    SffResult, Shape, ShapeGeometry, ShapeRepresentation, Software, ThreeDVolume,
    TransformationMatrix, VolumeIndex, VolumeStructure, SCHEMA_VERSION,
};
use std::io::{Read, Write};
use tracing::{debug, info};

// ============================================================================
// Document types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct SegmentationDoc {
    name: String,
    #[serde(default = "default_version")]
    version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(default)]
    primary_descriptor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bounding_box: Option<BoundingBoxDoc>,
    #[serde(default)]
    software_list: Vec<SoftwareDoc>,
    #[serde(default)]
    transform_list: Vec<TransformDoc>,
    #[serde(default)]
    global_external_references: Vec<ExternalReferenceDoc>,
    #[serde(default)]
    segment_list: Vec<SegmentDoc>,
    #[serde(default)]
    lattice_list: Vec<LatticeDoc>,
}

fn default_version() -> String {
    SCHEMA_VERSION.to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct BoundingBoxDoc {
    #[serde(default)]
    xmin: f64,
    xmax: f64,
    #[serde(default)]
    ymin: f64,
    ymax: f64,
    #[serde(default)]
    zmin: f64,
    zmax: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct SoftwareDoc {
    id: Id,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    processing_details: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TransformDoc {
    id: Id,
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ExternalReferenceDoc {
    id: Id,
    resource: String,
    url: String,
    accession: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnnotationDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    external_references: Vec<ExternalReferenceDoc>,
    #[serde(default = "default_instances")]
    number_of_instances: u32,
}

fn default_instances() -> u32 {
    1
}

#[derive(Debug, Serialize, Deserialize)]
struct SegmentDoc {
    id: Id,
    #[serde(default)]
    parent_id: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    biological_annotation: Option<AnnotationDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    colour: Option<[f32; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mesh_list: Option<Vec<MeshDoc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    shape_primitive_list: Option<Vec<ShapeDoc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    three_d_volume: Option<VolumeDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct VolumeDoc {
    lattice_id: Id,
    value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transform_id: Option<Id>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MeshDoc {
    id: Id,
    vertices: SequenceDoc,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    normals: Option<SequenceDoc>,
    triangles: SequenceDoc,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transform_id: Option<Id>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SequenceDoc {
    #[serde(alias = "num_vertices", alias = "num_normals", alias = "num_triangles")]
    num_items: usize,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default = "default_endianness")]
    endianness: String,
    data: String,
}

fn default_endianness() -> String {
    "little".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
enum ShapeDoc {
    Cone {
        id: Id,
        transform_id: Id,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attribute: Option<f64>,
        height: f64,
        bottom_radius: f64,
    },
    Cuboid {
        id: Id,
        transform_id: Id,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attribute: Option<f64>,
        x: f64,
        y: f64,
        z: f64,
    },
    Cylinder {
        id: Id,
        transform_id: Id,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attribute: Option<f64>,
        height: f64,
        diameter: f64,
    },
    Ellipsoid {
        id: Id,
        transform_id: Id,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attribute: Option<f64>,
        x: f64,
        y: f64,
        z: f64,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct LatticeDoc {
    id: Id,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default = "default_endianness")]
    endianness: String,
    size: SizeDoc,
    #[serde(default)]
    start: StartDoc,
    data: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SizeDoc {
    cols: u64,
    rows: u64,
    sections: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StartDoc {
    cols: i64,
    rows: i64,
    sections: i64,
}

// ============================================================================
// Adapter
// ============================================================================

/// Reads and writes the plain JSON tree
#[derive(Debug, Clone, Copy)]
pub struct JsonAdapter {
    codec: LatticeCodec,
    indent: usize,
}

impl Default for JsonAdapter {
    fn default() -> Self {
        Self {
            codec: LatticeCodec::default(),
            indent: 2,
        }
    }
}

impl JsonAdapter {
    /// Adapter using the configured codec and indentation
    pub fn new(config: &FormatConfig) -> SffResult<Self> {
        Ok(Self {
            codec: config.lattice_codec()?,
            indent: config.json_indent,
        })
    }

    /// Render a segmentation as a JSON value
    pub fn to_value(&self, segmentation: &Segmentation) -> SffResult<serde_json::Value> {
        serde_json::to_value(self.to_doc(segmentation)?).map_err(json_error)
    }

    /// Rebuild a segmentation from a JSON value
    pub fn from_value(&self, value: serde_json::Value) -> SffResult<Segmentation> {
        let doc: SegmentationDoc = serde_json::from_value(value).map_err(json_error)?;
        self.from_doc(doc)
    }

    fn to_doc(&self, segmentation: &Segmentation) -> SffResult<SegmentationDoc> {
        Ok(SegmentationDoc {
            name: segmentation.name.clone(),
            version: segmentation.version.clone(),
            details: segmentation.details.clone(),
            primary_descriptor: Some(segmentation.primary_descriptor().as_str().to_string()),
            bounding_box: segmentation.bounding_box.map(|b| BoundingBoxDoc {
                xmin: b.xmin,
                xmax: b.xmax,
                ymin: b.ymin,
                ymax: b.ymax,
                zmin: b.zmin,
                zmax: b.zmax,
            }),
            software_list: segmentation
                .software_list
                .iter()
                .map(|s| SoftwareDoc {
                    id: s.id.unwrap_or_default(),
                    name: s.name.clone(),
                    version: s.version.clone(),
                    processing_details: s.processing_details.clone(),
                })
                .collect(),
            transform_list: segmentation
                .transforms
                .iter()
                .map(|t| TransformDoc {
                    id: t.id.unwrap_or_default(),
                    rows: t.rows(),
                    cols: t.cols(),
                    data: t.data().to_vec(),
                })
                .collect(),
            global_external_references: references_doc(&segmentation.global_external_references),
            segment_list: segmentation.segments.iter().map(segment_doc).collect(),
            lattice_list: segmentation
                .lattices
                .iter()
                .map(|l| self.lattice_doc(l))
                .collect::<SffResult<_>>()?,
        })
    }

    fn lattice_doc(&self, lattice: &Lattice) -> SffResult<LatticeDoc> {
        let id = lattice.id.unwrap_or_default();
        let data = self.codec.encode_base64(lattice)?;
        debug!(
            target: "sffrw::json",
            lattice_id = id,
            mode = %lattice.mode(),
            encoded_len = data.len(),
            "Encoded lattice"
        );
        let size = lattice.size();
        Ok(LatticeDoc {
            id,
            mode: Some(lattice.mode().as_str().to_string()),
            endianness: lattice.endianness.as_str().to_string(),
            size: SizeDoc {
                cols: size.cols,
                rows: size.rows,
                sections: size.sections,
            },
            start: StartDoc {
                cols: lattice.start.cols,
                rows: lattice.start.rows,
                sections: lattice.start.sections,
            },
            data,
        })
    }

    fn from_doc(&self, doc: SegmentationDoc) -> SffResult<Segmentation> {
        let descriptor: PrimaryDescriptor = match &doc.primary_descriptor {
            Some(tag) => tag.parse()?,
            None => PrimaryDescriptor::default(),
        };
        let mut segmentation = Segmentation::new(doc.name);
        segmentation.version = doc.version;
        segmentation.details = doc.details;
        segmentation.bounding_box = doc.bounding_box.map(|b| BoundingBox {
            xmin: b.xmin,
            xmax: b.xmax,
            ymin: b.ymin,
            ymax: b.ymax,
            zmin: b.zmin,
            zmax: b.zmax,
        });
        segmentation.software_list = IdentifiedCollection::from_items(doc.software_list.into_iter().map(|s| {
            Software {
                id: Some(s.id),
                name: s.name,
                version: s.version,
                processing_details: s.processing_details,
            }
        }))?;
        segmentation.transforms = IdentifiedCollection::from_items(
            doc.transform_list
                .into_iter()
                .map(|t| TransformationMatrix::new(t.rows, t.cols, t.data).map(|m| m.with_id(t.id)))
                .collect::<SffResult<Vec<_>>>()?,
        )?;
        segmentation.global_external_references = references(doc.global_external_references)?;
        segmentation.lattices = IdentifiedCollection::from_items(
            doc.lattice_list
                .into_iter()
                .map(|l| self.lattice(l))
                .collect::<SffResult<Vec<_>>>()?,
        )?;
        segmentation.segments = IdentifiedCollection::from_items(
            doc.segment_list
                .into_iter()
                .map(|s| segment(s, descriptor))
                .collect::<SffResult<Vec<_>>>()?,
        )?;
        Ok(segmentation)
    }

    fn lattice(&self, doc: LatticeDoc) -> SffResult<Lattice> {
        let header = LatticeHeader {
            id: Some(doc.id),
            mode: match &doc.mode {
                Some(mode) => mode.parse()?,
                None => Default::default(),
            },
            endianness: doc.endianness.parse()?,
            size: VolumeStructure::new(doc.size.cols, doc.size.rows, doc.size.sections)?,
            start: VolumeIndex::new(doc.start.cols, doc.start.rows, doc.start.sections),
        };
        debug!(
            target: "sffrw::json",
            lattice_id = doc.id,
            mode = %header.mode,
            encoded_len = doc.data.len(),
            "Decoding lattice"
        );
        self.codec.decode_base64(&header, &doc.data)
    }
}

impl FormatAdapter for JsonAdapter {
    fn format(&self) -> Format {
        Format::Json
    }

    fn read_from(&self, reader: &mut dyn Read) -> SffResult<Segmentation> {
        let doc: SegmentationDoc = serde_json::from_reader(reader).map_err(json_error)?;
        info!(
            target: "sffrw::json",
            segments = doc.segment_list.len(),
            lattices = doc.lattice_list.len(),
            "Read JSON document"
        );
        let segmentation = self.from_doc(doc)?;
        warn_dangling(Format::Json, &segmentation);
        Ok(segmentation)
    }

    fn write_to(&self, segmentation: &Segmentation, writer: &mut dyn Write) -> SffResult<()> {
        segmentation.validate()?;
        let doc = self.to_doc(segmentation)?;
        info!(
            target: "sffrw::json",
            segments = doc.segment_list.len(),
            lattices = doc.lattice_list.len(),
            indent = self.indent,
            "Writing JSON document"
        );
        if self.indent == 0 {
            serde_json::to_writer(writer, &doc).map_err(json_error)
        } else {
            let indent = vec![b' '; self.indent];
            let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
            let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
            doc.serialize(&mut serializer).map_err(json_error)
        }
    }
}

fn json_error(e: serde_json::Error) -> SffError {
    if e.is_io() {
        SffError::Io(e.into())
    } else {
        SffError::Json(e.to_string())
    }
}

// ============================================================================
// Conversions
// ============================================================================

fn references_doc(references: &IdentifiedCollection<ExternalReference>) -> Vec<ExternalReferenceDoc> {
    references
        .iter()
        .map(|r| ExternalReferenceDoc {
            id: r.id.unwrap_or_default(),
            resource: r.resource.clone(),
            url: r.url.clone(),
            accession: r.accession.clone(),
            label: r.label.clone(),
            description: r.description.clone(),
        })
        .collect()
}

fn references(docs: Vec<ExternalReferenceDoc>) -> SffResult<IdentifiedCollection<ExternalReference>> {
    IdentifiedCollection::from_items(docs.into_iter().map(|r| ExternalReference {
        id: Some(r.id),
        resource: r.resource,
        url: r.url,
        accession: r.accession,
        label: r.label,
        description: r.description,
    }))
}

fn segment_doc(segment: &Segment) -> SegmentDoc {
    let mut doc = SegmentDoc {
        id: segment.id.unwrap_or_default(),
        parent_id: segment.parent_id.unwrap_or(0),
        biological_annotation: segment.biological_annotation.as_ref().map(|a| AnnotationDoc {
            name: a.name.clone(),
            description: a.description.clone(),
            external_references: references_doc(&a.external_references),
            number_of_instances: a.number_of_instances,
        }),
        colour: segment.colour.map(|c| c.to_array()),
        mesh_list: None,
        shape_primitive_list: None,
        three_d_volume: None,
    };
    match &segment.representation {
        ShapeRepresentation::Meshes(meshes) => {
            doc.mesh_list = Some(meshes.iter().map(mesh_doc).collect());
        }
        ShapeRepresentation::Shapes(shapes) => {
            doc.shape_primitive_list = Some(shapes.iter().map(shape_doc).collect());
        }
        ShapeRepresentation::Volume(volume) => {
            doc.three_d_volume = Some(VolumeDoc {
                lattice_id: volume.lattice_id,
                value: volume.value,
                transform_id: volume.transform_id,
            });
        }
    }
    doc
}

fn mesh_doc(mesh: &Mesh) -> MeshDoc {
    MeshDoc {
        id: mesh.id.unwrap_or_default(),
        vertices: sequence_doc(&mesh.vertices),
        normals: mesh.normals.as_ref().map(sequence_doc),
        triangles: sequence_doc(&mesh.triangles),
        transform_id: mesh.transform_id,
    }
}

fn sequence_doc(sequence: &EncodedSequence) -> SequenceDoc {
    SequenceDoc {
        num_items: sequence.num_items(),
        mode: Some(sequence.mode().as_str().to_string()),
        endianness: sequence.endianness.as_str().to_string(),
        data: sequence::encode_base64(sequence),
    }
}

fn shape_doc(shape: &Shape) -> ShapeDoc {
    let id = shape.id.unwrap_or_default();
    let transform_id = shape.transform_id;
    let attribute = shape.attribute;
    match shape.geometry {
        ShapeGeometry::Cone {
            height,
            bottom_radius,
        } => ShapeDoc::Cone {
            id,
            transform_id,
            attribute,
            height,
            bottom_radius,
        },
        ShapeGeometry::Cuboid { x, y, z } => ShapeDoc::Cuboid {
            id,
            transform_id,
            attribute,
            x,
            y,
            z,
        },
        ShapeGeometry::Cylinder { height, diameter } => ShapeDoc::Cylinder {
            id,
            transform_id,
            attribute,
            height,
            diameter,
        },
        ShapeGeometry::Ellipsoid { x, y, z } => ShapeDoc::Ellipsoid {
            id,
            transform_id,
            attribute,
            x,
            y,
            z,
        },
    }
}

fn segment(doc: SegmentDoc, descriptor: PrimaryDescriptor) -> SffResult<Segment> {
    let id = doc.id;
    let mut parts = RepresentationParts::default();
    if let Some(meshes) = doc.mesh_list {
        parts.meshes = Some(IdentifiedCollection::from_items(
            meshes
                .into_iter()
                .map(|m| mesh(m, id))
                .collect::<SffResult<Vec<_>>>()?,
        )?);
    }
    if let Some(shapes) = doc.shape_primitive_list {
        parts.shapes = Some(IdentifiedCollection::from_items(shapes.into_iter().map(shape))?);
    }
    if let Some(volume) = doc.three_d_volume {
        parts.volume = Some(ThreeDVolume {
            lattice_id: volume.lattice_id,
            value: volume.value,
            transform_id: volume.transform_id,
        });
    }
    let biological_annotation = match doc.biological_annotation {
        Some(a) => Some(BiologicalAnnotation {
            name: a.name,
            description: a.description,
            external_references: references(a.external_references)?,
            number_of_instances: a.number_of_instances,
        }),
        None => None,
    };
    let segment = Segment {
        id: Some(id),
        parent_id: if doc.parent_id == 0 {
            None
        } else {
            Some(doc.parent_id)
        },
        biological_annotation,
        colour: doc.colour.map(Colour::from),
        representation: parts.resolve(id, descriptor)?,
    };
    segment.validate()?;
    Ok(segment)
}

fn mesh(doc: MeshDoc, segment_id: Id) -> SffResult<Mesh> {
    let context = |part: &str| format!("segment {} mesh {} {}", segment_id, doc.id, part);
    let float32 = sffrw_core::ElementType::Float32;
    let uint32 = sffrw_core::ElementType::UInt32;
    let vertices = decode_sequence(&doc.vertices, float32, &context("vertices"))?;
    let triangles = decode_sequence(&doc.triangles, uint32, &context("triangles"))?;
    let mut mesh = Mesh::new(vertices, triangles);
    mesh.id = Some(doc.id);
    mesh.normals = doc
        .normals
        .as_ref()
        .map(|n| decode_sequence(n, float32, &context("normals")))
        .transpose()?;
    mesh.transform_id = doc.transform_id;
    mesh.validate()?;
    Ok(mesh)
}

fn decode_sequence(
    doc: &SequenceDoc,
    default_mode: sffrw_core::ElementType,
    context: &str,
) -> SffResult<EncodedSequence> {
    let header = SequenceHeader {
        mode: match &doc.mode {
            Some(mode) => mode.parse()?,
            None => default_mode,
        },
        endianness: doc.endianness.parse()?,
        num_items: doc.num_items,
    };
    sequence::decode_base64(&header, &doc.data, context)
}

fn shape(doc: ShapeDoc) -> Shape {
    let (id, transform_id, attribute, geometry) = match doc {
        ShapeDoc::Cone {
            id,
            transform_id,
            attribute,
            height,
            bottom_radius,
        } => (
            id,
            transform_id,
            attribute,
            ShapeGeometry::Cone {
                height,
                bottom_radius,
            },
        ),
        ShapeDoc::Cuboid {
            id,
            transform_id,
            attribute,
            x,
            y,
            z,
        } => (id, transform_id, attribute, ShapeGeometry::Cuboid { x, y, z }),
        ShapeDoc::Cylinder {
            id,
            transform_id,
            attribute,
            height,
            diameter,
        } => (
            id,
            transform_id,
            attribute,
            ShapeGeometry::Cylinder { height, diameter },
        ),
        ShapeDoc::Ellipsoid {
            id,
            transform_id,
            attribute,
            x,
            y,
            z,
        } => (id, transform_id, attribute, ShapeGeometry::Ellipsoid { x, y, z }),
    };
    let mut shape = Shape::new(geometry, transform_id);
    shape.id = Some(id);
    shape.attribute = attribute;
    shape
}
