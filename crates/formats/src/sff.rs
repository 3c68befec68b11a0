//! Schema-validated XML adapter (`.sff`)
//!
//! Load parses the document into an element tree, validates it against
//! `crate::schema`, converts it, and then requires referential integrity:
//! a document whose segments point at missing lattices, transforms or
//! parents fails with `DanglingReference`.

use crate::adapter::{Format, FormatAdapter, RepresentationParts};
use crate::config::FormatConfig;
use crate::schema::{self, ROOT};
use crate::tree::{self, Element};
use sffrw_codec::sequence::{self, SequenceHeader};
use sffrw_codec::{LatticeCodec, LatticeHeader};
use sffrw_core::{
    BiologicalAnnotation, BoundingBox, Colour, ElementType, EncodedSequence, Endianness,
    ExternalReference, Id, Identified, IdentifiedCollection, Lattice, Mesh, PrimaryDescriptor,
    Segment, Segmentation, SffError, SffResult, Shape, ShapeGeometry, ShapeKind,
    ShapeRepresentation, Software, ThreeDVolume, TransformationMatrix, VolumeIndex,
    VolumeStructure,
};
use std::io::{Read, Write};
use std::str::FromStr;
use tracing::{debug, info};

/// Reads and writes the XML tree
#[derive(Debug, Clone, Copy)]
pub struct SffAdapter {
    codec: LatticeCodec,
    indent: usize,
}

impl Default for SffAdapter {
    fn default() -> Self {
        Self {
            codec: LatticeCodec::default(),
            indent: 2,
        }
    }
}

impl SffAdapter {
    /// Adapter using the configured codec and indentation
    pub fn new(config: &FormatConfig) -> SffResult<Self> {
        Ok(Self {
            codec: config.lattice_codec()?,
            indent: config.xml_indent,
        })
    }

    /// Build the element tree for a segmentation
    pub fn to_tree(&self, segmentation: &Segmentation) -> SffResult<Element> {
        let mut root = Element::new(ROOT);
        root.push(Element::leaf("version", segmentation.version.as_str()));
        root.push(Element::leaf("name", segmentation.name.as_str()));

        let mut software_list = Element::new("software_list");
        for software in segmentation.software_list.iter() {
            let mut el = Element::new("software").with_attr("id", software.id.unwrap_or_default());
            el.push(Element::leaf("name", software.name.as_str()));
            el.push_opt_leaf("version", software.version.as_deref());
            el.push_opt_leaf("processing_details", software.processing_details.as_deref());
            software_list.push(el);
        }
        root.push(software_list);

        root.push(Element::leaf(
            "primary_descriptor",
            segmentation.primary_descriptor().as_str(),
        ));

        let mut transform_list = Element::new("transform_list");
        for transform in segmentation.transforms.iter() {
            let mut el = Element::new("transformation_matrix")
                .with_attr("id", transform.id.unwrap_or_default());
            el.push(Element::leaf("rows", transform.rows().to_string()));
            el.push(Element::leaf("cols", transform.cols().to_string()));
            el.push(Element::leaf("data", join(transform.data())));
            transform_list.push(el);
        }
        root.push(transform_list);

        if let Some(b) = &segmentation.bounding_box {
            let mut el = Element::new("bounding_box");
            for (name, value) in [
                ("xmin", b.xmin),
                ("xmax", b.xmax),
                ("ymin", b.ymin),
                ("ymax", b.ymax),
                ("zmin", b.zmin),
                ("zmax", b.zmax),
            ] {
                el.push(Element::leaf(name, value.to_string()));
            }
            root.push(el);
        }

        root.push(references_element(
            "global_external_references",
            &segmentation.global_external_references,
        ));

        let mut segment_list = Element::new("segment_list");
        for segment in segmentation.segments.iter() {
            segment_list.push(segment_element(segment));
        }
        root.push(segment_list);

        let mut lattice_list = Element::new("lattice_list");
        for lattice in segmentation.lattices.iter() {
            lattice_list.push(self.lattice_element(lattice)?);
        }
        root.push(lattice_list);

        root.push_opt_leaf("details", segmentation.details.as_deref());
        Ok(root)
    }

    /// Rebuild a segmentation from a validated element tree
    pub fn from_tree(&self, root: &Element) -> SffResult<Segmentation> {
        let mut segmentation = Segmentation::new(text(root, "name")?);
        segmentation.version = text(root, "version")?.to_string();
        segmentation.details = opt_text(root, "details").map(str::to_string);
        let descriptor: PrimaryDescriptor = parse_text(root, "primary_descriptor")?;

        if let Some(el) = root.child("software_list") {
            segmentation.software_list = collect(el, "software", |el| {
                Ok(Software {
                    id: Some(parse_attr(el, "id")?),
                    name: text(el, "name")?.to_string(),
                    version: opt_text(el, "version").map(str::to_string),
                    processing_details: opt_text(el, "processing_details").map(str::to_string),
                })
            })?;
        }
        if let Some(el) = root.child("transform_list") {
            segmentation.transforms = collect(el, "transformation_matrix", |el| {
                let data = text(el, "data")?
                    .split_whitespace()
                    .map(|v| parse_value(v, "transformation_matrix/data"))
                    .collect::<SffResult<Vec<f64>>>()?;
                Ok(TransformationMatrix::new(parse_text(el, "rows")?, parse_text(el, "cols")?, data)?
                    .with_id(parse_attr(el, "id")?))
            })?;
        }
        if let Some(el) = root.child("bounding_box") {
            segmentation.bounding_box = Some(BoundingBox {
                xmin: opt_parse_text(el, "xmin")?.unwrap_or(0.0),
                xmax: parse_text(el, "xmax")?,
                ymin: opt_parse_text(el, "ymin")?.unwrap_or(0.0),
                ymax: parse_text(el, "ymax")?,
                zmin: opt_parse_text(el, "zmin")?.unwrap_or(0.0),
                zmax: parse_text(el, "zmax")?,
            });
        }
        if let Some(el) = root.child("global_external_references") {
            segmentation.global_external_references = references(el)?;
        }
        if let Some(el) = root.child("lattice_list") {
            segmentation.lattices = collect(el, "lattice", |el| self.lattice(el))?;
        }
        if let Some(el) = root.child("segment_list") {
            segmentation.segments = collect(el, "segment", |el| segment(el, descriptor))?;
        }
        Ok(segmentation)
    }

    fn lattice_element(&self, lattice: &Lattice) -> SffResult<Element> {
        let id = lattice.id.unwrap_or_default();
        let data = self.codec.encode_base64(lattice)?;
        debug!(
            target: "sffrw::sff",
            lattice_id = id,
            mode = %lattice.mode(),
            encoded_len = data.len(),
            "Encoded lattice"
        );
        let size = lattice.size();
        let mut el = Element::new("lattice")
            .with_attr("id", id)
            .with_attr("mode", lattice.mode())
            .with_attr("endianness", lattice.endianness);
        el.push(
            Element::new("size")
                .with_attr("cols", size.cols)
                .with_attr("rows", size.rows)
                .with_attr("sections", size.sections),
        );
        el.push(
            Element::new("start")
                .with_attr("cols", lattice.start.cols)
                .with_attr("rows", lattice.start.rows)
                .with_attr("sections", lattice.start.sections),
        );
        el.push(Element::leaf("data", data));
        Ok(el)
    }

    fn lattice(&self, el: &Element) -> SffResult<Lattice> {
        let id: Id = parse_attr(el, "id")?;
        let size = required(el, "size")?;
        let start = match el.child("start") {
            Some(start) => VolumeIndex::new(
                parse_attr(start, "cols")?,
                parse_attr(start, "rows")?,
                parse_attr(start, "sections")?,
            ),
            None => VolumeIndex::default(),
        };
        let header = LatticeHeader {
            id: Some(id),
            mode: attr(el, "mode")?.parse()?,
            endianness: el
                .attr("endianness")
                .map(Endianness::from_str)
                .transpose()?
                .unwrap_or_default(),
            size: VolumeStructure::new(
                parse_attr(size, "cols")?,
                parse_attr(size, "rows")?,
                parse_attr(size, "sections")?,
            )?,
            start,
        };
        let data = text(el, "data")?;
        debug!(
            target: "sffrw::sff",
            lattice_id = id,
            mode = %header.mode,
            encoded_len = data.len(),
            "Decoding lattice"
        );
        self.codec.decode_base64(&header, data)
    }
}

impl FormatAdapter for SffAdapter {
    fn format(&self) -> Format {
        Format::Sff
    }

    fn read_from(&self, reader: &mut dyn Read) -> SffResult<Segmentation> {
        let mut document = String::new();
        reader.read_to_string(&mut document)?;
        info!(target: "sffrw::sff", bytes = document.len(), "Reading XML document");
        let root = tree::parse(&document)?;
        schema::validate(&root)?;
        let segmentation = self.from_tree(&root)?;
        segmentation.require_referential_integrity()?;
        Ok(segmentation)
    }

    fn write_to(&self, segmentation: &Segmentation, writer: &mut dyn Write) -> SffResult<()> {
        segmentation.validate()?;
        let root = self.to_tree(segmentation)?;
        info!(
            target: "sffrw::sff",
            segments = segmentation.segments.len(),
            lattices = segmentation.lattices.len(),
            indent = self.indent,
            "Writing XML document"
        );
        tree::write(&root, writer, self.indent)
    }
}

// ============================================================================
// Writing
// ============================================================================

fn join(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn references_element(name: &str, references: &IdentifiedCollection<ExternalReference>) -> Element {
    let mut list = Element::new(name);
    for reference in references.iter() {
        let mut el = Element::new(ExternalReference::KIND)
            .with_attr("id", reference.id.unwrap_or_default());
        el.push(Element::leaf("resource", reference.resource.as_str()));
        el.push(Element::leaf("url", reference.url.as_str()));
        el.push(Element::leaf("accession", reference.accession.as_str()));
        el.push_opt_leaf("label", reference.label.as_deref());
        el.push_opt_leaf("description", reference.description.as_deref());
        list.push(el);
    }
    list
}

fn segment_element(segment: &Segment) -> Element {
    let mut el = Element::new(Segment::KIND)
        .with_attr("id", segment.id.unwrap_or_default())
        .with_attr("parent_id", segment.parent_id.unwrap_or(0));

    if let Some(annotation) = &segment.biological_annotation {
        let mut bio = Element::new("biological_annotation");
        bio.push_opt_leaf("name", annotation.name.as_deref());
        bio.push_opt_leaf("description", annotation.description.as_deref());
        bio.push(references_element(
            "external_references",
            &annotation.external_references,
        ));
        bio.push(Element::leaf(
            "number_of_instances",
            annotation.number_of_instances.to_string(),
        ));
        el.push(bio);
    }

    if let Some(colour) = &segment.colour {
        let mut c = Element::new("colour");
        c.push(Element::leaf("red", colour.red.to_string()));
        c.push(Element::leaf("green", colour.green.to_string()));
        c.push(Element::leaf("blue", colour.blue.to_string()));
        c.push(Element::leaf("alpha", colour.alpha.to_string()));
        el.push(c);
    }

    let mut rep = Element::new(segment.representation.descriptor().as_str());
    match &segment.representation {
        ShapeRepresentation::Meshes(meshes) => {
            for mesh in meshes.iter() {
                let mut m = Element::new(Mesh::KIND).with_attr("id", mesh.id.unwrap_or_default());
                m.push(sequence_element("vertices", "num_vertices", &mesh.vertices));
                if let Some(normals) = &mesh.normals {
                    m.push(sequence_element("normals", "num_normals", normals));
                }
                m.push(sequence_element("triangles", "num_triangles", &mesh.triangles));
                m.push_opt_leaf("transform_id", mesh.transform_id);
                rep.push(m);
            }
        }
        ShapeRepresentation::Shapes(shapes) => {
            for shape in shapes.iter() {
                let mut s = Element::new(shape.kind().as_str())
                    .with_attr("id", shape.id.unwrap_or_default())
                    .with_attr("transform_id", shape.transform_id);
                if let Some(attribute) = shape.attribute {
                    s = s.with_attr("attribute", attribute);
                }
                for (name, value) in shape.geometry.dimensions() {
                    s.push(Element::leaf(name, value.to_string()));
                }
                rep.push(s);
            }
        }
        ShapeRepresentation::Volume(volume) => {
            rep.push(Element::leaf("lattice_id", volume.lattice_id.to_string()));
            rep.push(Element::leaf("value", volume.value.to_string()));
            rep.push_opt_leaf("transform_id", volume.transform_id);
        }
    }
    el.push(rep);
    el
}

fn sequence_element(name: &str, count: &str, sequence: &EncodedSequence) -> Element {
    Element::leaf(name, sequence::encode_base64(sequence))
        .with_attr(count, sequence.num_items())
        .with_attr("mode", sequence.mode())
        .with_attr("endianness", sequence.endianness)
}

// ============================================================================
// Reading
// ============================================================================

fn segment(el: &Element, descriptor: PrimaryDescriptor) -> SffResult<Segment> {
    let id: Id = parse_attr(el, "id")?;
    let parent_id: Id = match el.attr("parent_id") {
        Some(_) => parse_attr(el, "parent_id")?,
        None => 0,
    };

    let biological_annotation = match el.child("biological_annotation") {
        Some(bio) => Some(BiologicalAnnotation {
            name: opt_text(bio, "name").map(str::to_string),
            description: opt_text(bio, "description").map(str::to_string),
            external_references: match bio.child("external_references") {
                Some(refs) => references(refs)?,
                None => IdentifiedCollection::new(),
            },
            number_of_instances: opt_parse_text(bio, "number_of_instances")?.unwrap_or(1),
        }),
        None => None,
    };

    let colour = match el.child("colour") {
        Some(c) => Some(Colour::rgba(
            parse_text(c, "red")?,
            parse_text(c, "green")?,
            parse_text(c, "blue")?,
            opt_parse_text(c, "alpha")?.unwrap_or(1.0),
        )),
        None => None,
    };

    let mut parts = RepresentationParts::default();
    if let Some(list) = el.child(PrimaryDescriptor::MeshList.as_str()) {
        parts.meshes = Some(collect(list, Mesh::KIND, |m| mesh(m, id))?);
    }
    if let Some(list) = el.child(PrimaryDescriptor::ShapePrimitiveList.as_str()) {
        let mut shapes = IdentifiedCollection::new();
        for s in &list.children {
            shapes.append(shape(s)?)?;
        }
        parts.shapes = Some(shapes);
    }
    if let Some(v) = el.child(PrimaryDescriptor::ThreeDVolume.as_str()) {
        parts.volume = Some(ThreeDVolume {
            lattice_id: parse_text(v, "lattice_id")?,
            value: parse_text(v, "value")?,
            transform_id: opt_parse_text(v, "transform_id")?,
        });
    }

    Ok(Segment {
        id: Some(id),
        parent_id: if parent_id == 0 { None } else { Some(parent_id) },
        biological_annotation,
        colour,
        representation: parts.resolve(id, descriptor)?,
    })
}

fn mesh(el: &Element, segment_id: Id) -> SffResult<Mesh> {
    let id: Id = parse_attr(el, "id")?;
    let context = |part: &str| format!("segment {} mesh {} {}", segment_id, id, part);
    let vertices = sequence_of(
        required(el, "vertices")?,
        "num_vertices",
        ElementType::Float32,
        &context("vertices"),
    )?;
    let triangles = sequence_of(
        required(el, "triangles")?,
        "num_triangles",
        ElementType::UInt32,
        &context("triangles"),
    )?;
    let mut mesh = Mesh::new(vertices, triangles);
    mesh.id = Some(id);
    mesh.normals = el
        .child("normals")
        .map(|n| sequence_of(n, "num_normals", ElementType::Float32, &context("normals")))
        .transpose()?;
    mesh.transform_id = opt_parse_text(el, "transform_id")?;
    mesh.validate()?;
    Ok(mesh)
}

fn sequence_of(
    el: &Element,
    count: &str,
    default_mode: ElementType,
    context: &str,
) -> SffResult<EncodedSequence> {
    let header = SequenceHeader {
        mode: el
            .attr("mode")
            .map(ElementType::from_str)
            .transpose()?
            .unwrap_or(default_mode),
        endianness: el
            .attr("endianness")
            .map(Endianness::from_str)
            .transpose()?
            .unwrap_or_default(),
        num_items: parse_attr(el, count)?,
    };
    sequence::decode_base64(&header, &el.text, context)
}

fn shape(el: &Element) -> SffResult<Shape> {
    let kind: ShapeKind = el.name.parse()?;
    let mut missing = None;
    let geometry = ShapeGeometry::from_dimensions(kind, |name| match opt_parse_text(el, name) {
        Ok(value) => value,
        Err(e) => {
            missing = Some(e);
            None
        }
    });
    if let Some(e) = missing {
        return Err(e);
    }
    let mut shape = Shape::new(geometry?, parse_attr(el, "transform_id")?);
    shape.id = Some(parse_attr(el, "id")?);
    shape.attribute = el
        .attr("attribute")
        .map(|_| parse_attr(el, "attribute"))
        .transpose()?;
    Ok(shape)
}

fn references(el: &Element) -> SffResult<IdentifiedCollection<ExternalReference>> {
    collect(el, ExternalReference::KIND, |r| {
        Ok(ExternalReference {
            id: Some(parse_attr(r, "id")?),
            resource: text(r, "resource")?.to_string(),
            url: text(r, "url")?.to_string(),
            accession: text(r, "accession")?.to_string(),
            label: opt_text(r, "label").map(str::to_string),
            description: opt_text(r, "description").map(str::to_string),
        })
    })
}

fn collect<T, F>(list: &Element, tag: &str, mut convert: F) -> SffResult<IdentifiedCollection<T>>
where
    T: Identified,
    F: FnMut(&Element) -> SffResult<T>,
{
    let mut items = IdentifiedCollection::new();
    for el in list.children_named(tag) {
        items.append(convert(el)?)?;
    }
    Ok(items)
}

fn required<'a>(el: &'a Element, tag: &str) -> SffResult<&'a Element> {
    el.child(tag)
        .ok_or_else(|| SffError::schema(format!("{}/{}", el.name, tag), "missing required element"))
}

fn text<'a>(el: &'a Element, tag: &str) -> SffResult<&'a str> {
    Ok(required(el, tag)?.text.as_str())
}

fn opt_text<'a>(el: &'a Element, tag: &str) -> Option<&'a str> {
    el.child(tag).map(|c| c.text.as_str())
}

fn attr<'a>(el: &'a Element, name: &str) -> SffResult<&'a str> {
    el.attr(name).ok_or_else(|| {
        SffError::schema(format!("{}/@{}", el.name, name), "missing required attribute")
    })
}

fn parse_value<T: FromStr>(raw: &str, path: &str) -> SffResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| SffError::schema(path, format!("invalid value '{}'", raw.trim())))
}

fn parse_text<T: FromStr>(el: &Element, tag: &str) -> SffResult<T> {
    parse_value(text(el, tag)?, &format!("{}/{}", el.name, tag))
}

fn opt_parse_text<T: FromStr>(el: &Element, tag: &str) -> SffResult<Option<T>> {
    opt_text(el, tag)
        .map(|raw| parse_value(raw, &format!("{}/{}", el.name, tag)))
        .transpose()
}

fn parse_attr<T: FromStr>(el: &Element, name: &str) -> SffResult<T> {
    parse_value(attr(el, name)?, &format!("{}/@{}", el.name, name))
}
