//! HDF5 adapter (`.hff`, `.h5`, `.hdf5`)
//!
//! Maps a segmentation onto real HDF5 groups, attributes and datasets:
//!
//! ```text
//! /                                 name, version, details?, primary_descriptor, bounding_box?
//! ├── software/software00000000     name, version?, processing_details?
//! ├── transforms/transform00000000  data: f64 [rows, cols]
//! ├── global_external_references/external_reference00000000
//! ├── lattices/lattice00000000      mode, endianness, size, start; data: u8 (compressed)
//! └── segments/segment00000001      parent_id (0 = root), colour?
//!     ├── biological_annotation     name?, description?, number_of_instances
//!     │   └── external_references/external_reference00000000
//!     └── mesh_list | shape_primitive_list | three_d_volume
//! ```
//!
//! Ids come from the zero-padded group names. Referential integrity is
//! checked after load but only logged.
//!
//! Lattices are encoded straight into the output while the file is
//! written and decoded from the memory-mapped file one at a time, so
//! beyond the model itself only one lattice is ever held in memory.

use crate::adapter::{warn_dangling, Format, FormatAdapter, RepresentationParts};
use crate::config::FormatConfig;
use crate::hdf5::{self, DatasetData, DatasetNode, GroupNode, GroupView};
use crate::naming::{group_name, parse_group_name};
use sffrw_codec::sequence::{self, SequenceHeader};
use sffrw_codec::{LatticeCodec, LatticeHeader};
use sffrw_core::{
    BiologicalAnnotation, BoundingBox, Colour, EncodedSequence, ExternalReference, Id, Identified,
    IdentifiedCollection, Lattice, Mesh, PrimaryDescriptor, Segment, Segmentation, SffError,
    SffResult, Shape, ShapeGeometry, ShapeKind, ShapeRepresentation, Software, ThreeDVolume,
    TransformationMatrix, VolumeIndex, VolumeStructure,
};
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info};

const SOFTWARE: &str = "software";
const TRANSFORMS: &str = "transforms";
const GLOBAL_REFERENCES: &str = "global_external_references";
const LATTICES: &str = "lattices";
const SEGMENTS: &str = "segments";
const ANNOTATION: &str = "biological_annotation";
const REFERENCES: &str = "external_references";
const DATA: &str = "data";

/// Reads and writes HDF5 segmentation files
#[derive(Debug, Clone, Copy, Default)]
pub struct HffAdapter {
    codec: LatticeCodec,
}

impl HffAdapter {
    /// Adapter using the configured lattice codec
    pub fn new(config: &FormatConfig) -> SffResult<Self> {
        Ok(Self::with_codec(config.lattice_codec()?))
    }

    /// Adapter using an explicit lattice codec
    pub fn with_codec(codec: LatticeCodec) -> Self {
        Self { codec }
    }

    /// Describe the file for a segmentation.
    ///
    /// Lattice datasets borrow from `segmentation` and are only encoded
    /// when the tree is written.
    pub fn to_tree<'a>(&self, segmentation: &'a Segmentation) -> SffResult<GroupNode<'a>> {
        let mut root = GroupNode::new("");
        root.set_attr("name", segmentation.name.as_str());
        root.set_attr("version", segmentation.version.as_str());
        root.set_opt_attr("details", segmentation.details.as_deref());
        root.set_attr("primary_descriptor", segmentation.primary_descriptor().as_str());
        if let Some(bounding_box) = &segmentation.bounding_box {
            root.set_attr("bounding_box", bounding_box.to_array().to_vec());
        }

        root.push_group(list_group(SOFTWARE, &segmentation.software_list, encode_software));
        root.push_group(list_group(TRANSFORMS, &segmentation.transforms, encode_transform));
        root.push_group(list_group(
            GLOBAL_REFERENCES,
            &segmentation.global_external_references,
            encode_reference,
        ));

        let mut lattices = GroupNode::new(LATTICES);
        for lattice in segmentation.lattices.iter() {
            lattices.push_group(self.encode_lattice(lattice)?);
        }
        root.push_group(lattices);

        let mut segments = GroupNode::new(SEGMENTS);
        for segment in segmentation.segments.iter() {
            segments.push_group(encode_segment(segment));
        }
        root.push_group(segments);
        Ok(root)
    }

    /// Rebuild a segmentation from an open HDF5 file
    pub fn from_file(&self, file: &rustyhdf5::File) -> SffResult<Segmentation> {
        let root = GroupView::root(file)?;
        let mut segmentation = Segmentation::new(root.get_str("name")?);
        segmentation.version = root.get_str("version")?;
        segmentation.details = root.opt_str("details")?;
        segmentation.bounding_box = root
            .opt_float_array("bounding_box")?
            .map(|values| fixed::<_, 6>(&root, "bounding_box", &values).map(BoundingBox::from_array))
            .transpose()?;
        let descriptor: PrimaryDescriptor = root.get_str("primary_descriptor")?.parse()?;

        segmentation.software_list = decode_list(&root, SOFTWARE, decode_software)?;
        segmentation.transforms = decode_list(&root, TRANSFORMS, decode_transform)?;
        segmentation.global_external_references =
            decode_list(&root, GLOBAL_REFERENCES, decode_reference)?;
        segmentation.lattices = decode_list(&root, LATTICES, |group, id| {
            self.decode_lattice(group, id)
        })?;
        segmentation.segments = decode_list(&root, SEGMENTS, |group, id| {
            decode_segment(group, id, descriptor)
        })?;
        Ok(segmentation)
    }

    fn encode_lattice<'a>(&self, lattice: &'a Lattice) -> SffResult<GroupNode<'a>> {
        let id = lattice.id.unwrap_or_default();
        let mut group = GroupNode::new(group_name(Lattice::KIND, id));
        group.set_attr("mode", lattice.mode().as_str());
        group.set_attr("endianness", lattice.endianness.as_str());
        group.set_attr("size", int_array(&lattice.size().to_array())?);
        group.set_attr("start", lattice.start.to_array().to_vec());
        let codec = self.codec;
        group.push_dataset(DatasetNode::new(
            DATA,
            DatasetData::Streamed(Box::new(move |writer: &mut dyn Write| {
                codec.encode_raw_into(lattice, writer)
            })),
        ));
        Ok(group)
    }

    fn decode_lattice(&self, group: &GroupView<'_>, id: Id) -> SffResult<Lattice> {
        let size = fixed::<_, 3>(group, "size", &group.get_int_array("size")?)?;
        let start = fixed::<_, 3>(group, "start", &group.get_int_array("start")?)?;
        let header = LatticeHeader {
            id: Some(id),
            mode: group.get_str("mode")?.parse()?,
            endianness: group.get_str("endianness")?.parse()?,
            size: VolumeStructure::new(
                non_negative(group, "size", size[0])?,
                non_negative(group, "size", size[1])?,
                non_negative(group, "size", size[2])?,
            )?,
            start: VolumeIndex::new(start[0], start[1], start[2]),
        };
        let data = group.dataset(DATA)?.bytes()?;
        debug!(
            target: "sffrw::hff",
            lattice_id = id,
            mode = %header.mode,
            compressed_bytes = data.len(),
            "Decoding lattice"
        );
        self.codec.decode_raw(&header, data)
    }

    fn finish_load(&self, file: &rustyhdf5::File) -> SffResult<Segmentation> {
        let segmentation = self.from_file(file)?;
        warn_dangling(Format::Hff, &segmentation);
        Ok(segmentation)
    }
}

impl FormatAdapter for HffAdapter {
    fn format(&self) -> Format {
        Format::Hff
    }

    /// Streams cannot be mapped, so the whole input is read into memory
    /// first. `load` maps the file instead.
    fn read_from(&self, reader: &mut dyn Read) -> SffResult<Segmentation> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        info!(target: "sffrw::hff", bytes = bytes.len(), "Reading HDF5 stream");
        self.finish_load(&hdf5::from_bytes(bytes)?)
    }

    fn write_to(&self, segmentation: &Segmentation, writer: &mut dyn Write) -> SffResult<()> {
        segmentation.validate()?;
        let root = self.to_tree(segmentation)?;
        info!(
            target: "sffrw::hff",
            segments = segmentation.segments.len(),
            lattices = segmentation.lattices.len(),
            "Writing HDF5 file"
        );
        hdf5::write_to(&root, writer)
    }

    fn load(&self, path: &Path) -> SffResult<Segmentation> {
        let file = hdf5::open(path)?;
        let segmentation = self.finish_load(&file)?;
        info!(
            target: "sffrw::formats",
            path = %path.display(),
            format = %self.format(),
            segments = segmentation.segments.len(),
            lattices = segmentation.lattices.len(),
            "Loaded segmentation"
        );
        Ok(segmentation)
    }
}

// ============================================================================
// Encoding
// ============================================================================

fn list_group<'a, T, F>(name: &str, items: &'a IdentifiedCollection<T>, encode: F) -> GroupNode<'a>
where
    T: Identified,
    F: Fn(&'a T, &mut GroupNode<'a>),
{
    let mut list = GroupNode::new(name);
    for item in items.iter() {
        let mut group = GroupNode::new(group_name(T::KIND, item.id().unwrap_or_default()));
        encode(item, &mut group);
        list.push_group(group);
    }
    list
}

fn encode_software(software: &Software, group: &mut GroupNode<'_>) {
    group.set_attr("name", software.name.as_str());
    group.set_opt_attr("version", software.version.as_deref());
    group.set_opt_attr("processing_details", software.processing_details.as_deref());
}

fn encode_transform(transform: &TransformationMatrix, group: &mut GroupNode<'_>) {
    group.push_dataset(DatasetNode::new(
        DATA,
        DatasetData::Floats {
            values: transform.data().to_vec(),
            shape: vec![transform.rows() as u64, transform.cols() as u64],
        },
    ));
}

fn encode_reference(reference: &ExternalReference, group: &mut GroupNode<'_>) {
    group.set_attr("resource", reference.resource.as_str());
    group.set_attr("url", reference.url.as_str());
    group.set_attr("accession", reference.accession.as_str());
    group.set_opt_attr("label", reference.label.as_deref());
    group.set_opt_attr("description", reference.description.as_deref());
}

fn encode_segment(segment: &Segment) -> GroupNode<'_> {
    let mut group = GroupNode::new(group_name(Segment::KIND, segment.id.unwrap_or_default()));
    group.set_attr("parent_id", segment.parent_id.unwrap_or(0));
    if let Some(colour) = &segment.colour {
        let rgba: Vec<f64> = colour.to_array().iter().map(|c| f64::from(*c)).collect();
        group.set_attr("colour", rgba);
    }
    if let Some(annotation) = &segment.biological_annotation {
        let mut bio = GroupNode::new(ANNOTATION);
        bio.set_opt_attr("name", annotation.name.as_deref());
        bio.set_opt_attr("description", annotation.description.as_deref());
        bio.set_attr("number_of_instances", u64::from(annotation.number_of_instances));
        bio.push_group(list_group(
            REFERENCES,
            &annotation.external_references,
            encode_reference,
        ));
        group.push_group(bio);
    }

    let descriptor = segment.representation.descriptor().as_str();
    let mut rep = GroupNode::new(descriptor);
    match &segment.representation {
        ShapeRepresentation::Meshes(meshes) => {
            for mesh in meshes.iter() {
                rep.push_group(encode_mesh(mesh));
            }
        }
        ShapeRepresentation::Shapes(shapes) => {
            for shape in shapes.iter() {
                rep.push_group(encode_shape(shape));
            }
        }
        ShapeRepresentation::Volume(volume) => {
            rep.set_attr("lattice_id", volume.lattice_id);
            rep.set_attr("value", volume.value);
            rep.set_opt_attr("transform_id", volume.transform_id);
        }
    }
    group.push_group(rep);
    group
}

fn encode_mesh(mesh: &Mesh) -> GroupNode<'_> {
    let mut group = GroupNode::new(group_name(Mesh::KIND, mesh.id.unwrap_or_default()));
    group.set_opt_attr("transform_id", mesh.transform_id);
    group.push_dataset(encode_sequence("vertices", &mesh.vertices));
    if let Some(normals) = &mesh.normals {
        group.push_dataset(encode_sequence("normals", normals));
    }
    group.push_dataset(encode_sequence("triangles", &mesh.triangles));
    group
}

fn encode_sequence<'a>(name: &str, sequence: &'a EncodedSequence) -> DatasetNode<'a> {
    let mut dataset = DatasetNode::new(
        name,
        DatasetData::Streamed(Box::new(move |writer: &mut dyn Write| {
            let packed = sequence::encode_raw(sequence);
            writer.write_all(&packed)?;
            Ok(packed.len() as u64)
        })),
    );
    dataset.set_attr("mode", sequence.mode().as_str());
    dataset.set_attr("endianness", sequence.endianness.as_str());
    dataset.set_attr("num_items", sequence.num_items() as u64);
    dataset
}

fn encode_shape(shape: &Shape) -> GroupNode<'_> {
    let mut group = GroupNode::new(group_name(shape.kind().as_str(), shape.id.unwrap_or_default()));
    group.set_attr("transform_id", shape.transform_id);
    group.set_opt_attr("attribute", shape.attribute);
    for (name, value) in shape.geometry.dimensions() {
        group.set_attr(name, value);
    }
    group
}

fn int_array(values: &[u64]) -> SffResult<Vec<i64>> {
    values
        .iter()
        .map(|v| {
            i64::try_from(*v)
                .map_err(|_| SffError::invalid_shape("lattice", format!("size {} too large", v)))
        })
        .collect()
}

// ============================================================================
// Decoding
// ============================================================================

fn decode_list<T, F>(
    root: &GroupView<'_>,
    name: &str,
    mut decode: F,
) -> SffResult<IdentifiedCollection<T>>
where
    T: Identified,
    F: FnMut(&GroupView<'_>, Id) -> SffResult<T>,
{
    let list = root.group(name)?;
    let mut items = IdentifiedCollection::new();
    for group in list.groups()? {
        let id = parse_group_name(T::KIND, group.name()).ok_or_else(|| {
            SffError::corrupt(group.path(), format!("expected a {} group", T::KIND))
        })?;
        let mut item = decode(&group, id)?;
        item.set_id(id);
        items.append(item)?;
    }
    Ok(items)
}

fn decode_software(group: &GroupView<'_>, _id: Id) -> SffResult<Software> {
    Ok(Software {
        id: None,
        name: group.get_str("name")?,
        version: group.opt_str("version")?,
        processing_details: group.opt_str("processing_details")?,
    })
}

fn decode_transform(group: &GroupView<'_>, _id: Id) -> SffResult<TransformationMatrix> {
    let data = group.dataset(DATA)?;
    let shape = data.shape()?;
    let [rows, cols] = <[u64; 2]>::try_from(shape.as_slice()).map_err(|_| {
        SffError::corrupt(data.path(), format!("expected a 2-D dataset, found shape {:?}", shape))
    })?;
    TransformationMatrix::new(
        to_usize(group, "rows", rows)?,
        to_usize(group, "cols", cols)?,
        data.floats()?,
    )
}

fn decode_reference(group: &GroupView<'_>, _id: Id) -> SffResult<ExternalReference> {
    Ok(ExternalReference {
        id: None,
        resource: group.get_str("resource")?,
        url: group.get_str("url")?,
        accession: group.get_str("accession")?,
        label: group.opt_str("label")?,
        description: group.opt_str("description")?,
    })
}

fn decode_segment(group: &GroupView<'_>, id: Id, descriptor: PrimaryDescriptor) -> SffResult<Segment> {
    let parent_id = group.get_uint("parent_id")?;
    let colour = group
        .opt_float_array("colour")?
        .map(|values| fixed::<_, 4>(group, "colour", &values))
        .transpose()?
        .map(|[r, g, b, a]| Colour::rgba(r as f32, g as f32, b as f32, a as f32));

    let biological_annotation = match group.opt_group(ANNOTATION)? {
        Some(bio) => Some(BiologicalAnnotation {
            name: bio.opt_str("name")?,
            description: bio.opt_str("description")?,
            external_references: decode_list(&bio, REFERENCES, decode_reference)?,
            number_of_instances: u32::try_from(bio.get_uint("number_of_instances")?).map_err(
                |_| SffError::corrupt(bio.path(), "number_of_instances out of range"),
            )?,
        }),
        None => None,
    };

    let mut parts = RepresentationParts::default();
    if let Some(list) = group.opt_group(PrimaryDescriptor::MeshList.as_str())? {
        let mut meshes = IdentifiedCollection::new();
        for mesh_group in list.groups()? {
            meshes.append(decode_mesh(&mesh_group, id)?)?;
        }
        parts.meshes = Some(meshes);
    }
    if let Some(list) = group.opt_group(PrimaryDescriptor::ShapePrimitiveList.as_str())? {
        let mut shapes = IdentifiedCollection::new();
        for shape_group in list.groups()? {
            shapes.append(decode_shape(&shape_group)?)?;
        }
        parts.shapes = Some(shapes);
    }
    if let Some(volume) = group.opt_group(PrimaryDescriptor::ThreeDVolume.as_str())? {
        parts.volume = Some(ThreeDVolume {
            lattice_id: volume.get_uint("lattice_id")?,
            value: volume.get_float("value")?,
            transform_id: volume.opt_uint("transform_id")?,
        });
    }

    let segment = Segment {
        id: Some(id),
        parent_id: if parent_id == 0 { None } else { Some(parent_id) },
        biological_annotation,
        colour,
        representation: parts.resolve(id, descriptor)?,
    };
    segment.validate()?;
    Ok(segment)
}

fn decode_mesh(group: &GroupView<'_>, segment_id: Id) -> SffResult<Mesh> {
    let id = parse_group_name(Mesh::KIND, group.name())
        .ok_or_else(|| SffError::corrupt(group.path(), "expected a mesh group"))?;
    let context = |part: &str| format!("segment {} mesh {} {}", segment_id, id, part);
    let component = |part: &str| -> SffResult<Option<EncodedSequence>> {
        match group.opt_dataset(part)? {
            Some(dataset) => {
                let header = SequenceHeader {
                    mode: dataset.get_str("mode")?.parse()?,
                    endianness: dataset.get_str("endianness")?.parse()?,
                    num_items: to_usize(group, "num_items", dataset.get_uint("num_items")?)?,
                };
                sequence::decode_raw(&header, dataset.bytes()?, &context(part)).map(Some)
            }
            None => Ok(None),
        }
    };
    let vertices = component("vertices")?
        .ok_or_else(|| SffError::corrupt(context("vertices"), "missing dataset"))?;
    let triangles = component("triangles")?
        .ok_or_else(|| SffError::corrupt(context("triangles"), "missing dataset"))?;
    let mut mesh = Mesh::new(vertices, triangles);
    mesh.id = Some(id);
    mesh.normals = component("normals")?;
    mesh.transform_id = group.opt_uint("transform_id")?;
    mesh.validate()?;
    Ok(mesh)
}

fn decode_shape(group: &GroupView<'_>) -> SffResult<Shape> {
    let (kind, id) = ShapeKind::ALL
        .iter()
        .find_map(|kind| parse_group_name(kind.as_str(), group.name()).map(|id| (*kind, id)))
        .ok_or_else(|| SffError::corrupt(group.path(), "expected a shape group"))?;
    let mut failure = None;
    let geometry = ShapeGeometry::from_dimensions(kind, |name| match group.opt_float(name) {
        Ok(value) => value,
        Err(e) => {
            failure.get_or_insert(e);
            None
        }
    });
    if let Some(e) = failure {
        return Err(e);
    }
    let mut shape = Shape::new(geometry?, group.get_uint("transform_id")?);
    shape.id = Some(id);
    shape.attribute = group.opt_float("attribute")?;
    Ok(shape)
}

fn fixed<T: Copy, const N: usize>(group: &GroupView<'_>, attr: &str, values: &[T]) -> SffResult<[T; N]> {
    values.try_into().map_err(|_| {
        SffError::corrupt(
            group.path(),
            format!("'{}' has {} values, expected {}", attr, values.len(), N),
        )
    })
}

fn non_negative(group: &GroupView<'_>, attr: &str, value: i64) -> SffResult<u64> {
    u64::try_from(value)
        .map_err(|_| SffError::corrupt(group.path(), format!("negative {} {}", attr, value)))
}

fn to_usize(group: &GroupView<'_>, attr: &str, value: u64) -> SffResult<usize> {
    usize::try_from(value)
        .map_err(|_| SffError::corrupt(group.path(), format!("{} {} out of range", attr, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hdf5::HDF5_SIGNATURE;
    use sffrw_codec::Compression;

    fn volume_segmentation() -> Segmentation {
        let mut seg = Segmentation::new("emd_1014");
        seg.details = Some("two-level volume".to_string());
        seg.bounding_box = Some(BoundingBox::from_max(2.0, 2.0, 2.0));
        seg.add_software(Software::new("segger", "2.5").with_details("threshold 0.5"))
            .unwrap();
        seg.add_transform(TransformationMatrix::identity()).unwrap();
        let size = VolumeStructure::new(2, 2, 2).unwrap();
        seg.add_lattice(Lattice::from_array(size, vec![0u8, 1, 1, 0, 2, 2, 0, 1]).unwrap())
            .unwrap();
        seg.add_segment(
            Segment::from_volume(ThreeDVolume::new(0, 1.0).with_transform(0))
                .with_colour(Colour::rgba(1.0, 0.0, 0.0, 0.5))
                .with_annotation(BiologicalAnnotation::named("ribosome")),
        )
        .unwrap();
        seg.add_segment(Segment::from_volume(ThreeDVolume::new(0, 2.0)).with_parent(1))
            .unwrap();
        seg
    }

    fn to_bytes(adapter: &HffAdapter, seg: &Segmentation) -> Vec<u8> {
        let mut bytes = Vec::new();
        adapter.write_to(seg, &mut bytes).unwrap();
        bytes
    }

    fn with_tree<F>(seg: &Segmentation, edit: F) -> Vec<u8>
    where
        F: FnOnce(&mut GroupNode<'_>),
    {
        let mut root = HffAdapter::default().to_tree(seg).unwrap();
        edit(&mut root);
        let mut bytes = Vec::new();
        hdf5::write_to(&root, &mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_file_layout() {
        let seg = volume_segmentation();
        let bytes = to_bytes(&HffAdapter::default(), &seg);
        assert_eq!(bytes[..8], HDF5_SIGNATURE);

        let file = rustyhdf5::File::from_bytes(bytes).unwrap();
        let root = GroupView::root(&file).unwrap();
        assert_eq!(root.get_str("primary_descriptor").unwrap(), "three_d_volume");
        assert_eq!(
            root.group_names().unwrap(),
            vec![SOFTWARE, TRANSFORMS, GLOBAL_REFERENCES, LATTICES, SEGMENTS]
        );
        let segments = root.group(SEGMENTS).unwrap();
        assert_eq!(
            segments.group_names().unwrap(),
            vec!["segment00000001", "segment00000002"]
        );
        assert_eq!(segments.group("segment00000001").unwrap().get_uint("parent_id").unwrap(), 0);
        assert_eq!(segments.group("segment00000002").unwrap().get_uint("parent_id").unwrap(), 1);

        let lattice = root.group(LATTICES).unwrap().group("lattice00000000").unwrap();
        assert_eq!(lattice.get_str("mode").unwrap(), "uint8");
        assert_eq!(lattice.get_int_array("size").unwrap(), vec![2, 2, 2]);
        let data = lattice.dataset(DATA).unwrap().bytes().unwrap();
        let expected = LatticeCodec::default()
            .encode_raw(seg.lattices.get_by_id(0).unwrap())
            .unwrap();
        assert_eq!(data, expected.as_slice());

        let transform = root.group(TRANSFORMS).unwrap().group("transform00000000").unwrap();
        assert_eq!(transform.dataset(DATA).unwrap().shape().unwrap(), vec![3, 4]);
    }

    #[test]
    fn test_round_trip_through_bytes() {
        let adapter = HffAdapter::default();
        let seg = volume_segmentation();
        let bytes = to_bytes(&adapter, &seg);
        let back = adapter.read_from(&mut bytes.as_slice()).unwrap();
        assert_eq!(back, seg);
        assert_eq!(back.segments.get_by_id(2).unwrap().parent_id, Some(1));
        assert_eq!(back.segments.next_id(), 3);
    }

    #[test]
    fn test_compression_mismatch_is_corrupt() {
        let seg = volume_segmentation();
        let zstd = HffAdapter::with_codec(LatticeCodec::new(Compression::Zstd, 3));
        let bytes = to_bytes(&zstd, &seg);
        let err = HffAdapter::default()
            .read_from(&mut bytes.as_slice())
            .unwrap_err();
        assert!(matches!(err, SffError::CorruptPayload { .. }), "{err}");
    }

    #[test]
    fn test_two_representations_rejected() {
        let bytes = with_tree(&volume_segmentation(), |root| {
            let segment = root
                .group_mut(SEGMENTS)
                .and_then(|segments| segments.group_mut("segment00000001"))
                .unwrap();
            segment.push_group(GroupNode::new("mesh_list"));
        });
        let err = HffAdapter::default()
            .read_from(&mut bytes.as_slice())
            .unwrap_err();
        assert!(
            matches!(err, SffError::AmbiguousShapeRepresentation { segment_id: 1, .. }),
            "{err}"
        );
    }

    #[test]
    fn test_dangling_reference_is_tolerated() {
        let mut seg = volume_segmentation();
        seg.add_segment(Segment::from_volume(ThreeDVolume::new(7, 1.0).with_transform(3)))
            .unwrap();
        let adapter = HffAdapter::default();
        let bytes = to_bytes(&adapter, &seg);
        let back = adapter.read_from(&mut bytes.as_slice()).unwrap();
        assert_eq!(back.check_referential_integrity().len(), 2);
    }

    #[test]
    fn test_meshes_and_shapes() {
        let mut seg = Segmentation::new("surfaces");
        seg.add_transform(TransformationMatrix::identity()).unwrap();
        let vertices = EncodedSequence::new(vec![0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]).unwrap();
        let triangles = EncodedSequence::new(vec![0u32, 1, 2]).unwrap();
        let mesh = Mesh::new(vertices.clone(), triangles)
            .with_normals(vertices)
            .with_transform(0);
        seg.add_segment(Segment::from_meshes(IdentifiedCollection::from_items([mesh]).unwrap()))
            .unwrap();
        let shapes = IdentifiedCollection::from_items([
            Shape::cone(2.0, 1.0, 0),
            Shape::ellipsoid(1.0, 2.0, 3.0, 0).with_attribute(0.75),
        ])
        .unwrap();
        seg.add_segment(Segment::from_shapes(shapes)).unwrap();

        let adapter = HffAdapter::default();
        let bytes = to_bytes(&adapter, &seg);
        let back = adapter.read_from(&mut bytes.as_slice()).unwrap();
        assert_eq!(back, seg);
        let shapes = back.segments.get_by_id(2).unwrap().representation.shapes().unwrap();
        assert_eq!(shapes.count_of(ShapeKind::Ellipsoid), 1);
        assert_eq!(shapes.get_by_id(1).unwrap().attribute, Some(0.75));

        let file = rustyhdf5::File::from_bytes(bytes).unwrap();
        let mesh = GroupView::root(&file)
            .and_then(|root| root.group(SEGMENTS))
            .and_then(|segments| segments.group("segment00000001"))
            .and_then(|segment| segment.group("mesh_list"))
            .and_then(|list| list.group("mesh00000000"))
            .unwrap();
        let vertices = mesh.dataset("vertices").unwrap();
        assert_eq!(vertices.get_uint("num_items").unwrap(), 3);
        assert_eq!(vertices.shape().unwrap(), vec![36]);
    }

    #[test]
    fn test_mistyped_shape_dimension_is_reported() {
        let mut seg = Segmentation::new("shapes");
        seg.add_transform(TransformationMatrix::identity()).unwrap();
        seg.add_segment(Segment::from_shapes(
            IdentifiedCollection::from_items([Shape::cone(2.0, 1.0, 0)]).unwrap(),
        ))
        .unwrap();
        let bytes = with_tree(&seg, |root| {
            let cone = root
                .group_mut(SEGMENTS)
                .and_then(|segments| segments.group_mut("segment00000001"))
                .and_then(|segment| segment.group_mut("shape_primitive_list"))
                .and_then(|list| list.group_mut("cone00000000"))
                .unwrap();
            cone.set_attr("height", "tall");
        });
        let err = HffAdapter::default()
            .read_from(&mut bytes.as_slice())
            .unwrap_err();
        match err {
            SffError::CorruptPayload { context, reason, .. } => {
                assert!(context.ends_with("/cone00000000"), "{context}");
                assert!(reason.contains("'height' should be float but is string"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_out_of_range_colour_rejected_both_ways() {
        let mut seg = volume_segmentation();
        seg.segments.get_by_id_mut(1).unwrap().colour = Some(Colour::rgba(1.5, 0.0, 0.0, 1.0));
        let mut bytes = Vec::new();
        let err = HffAdapter::default().write_to(&seg, &mut bytes).unwrap_err();
        assert!(matches!(err, SffError::InvalidColour { channel: "red", .. }), "{err}");
        assert!(bytes.is_empty());

        let bytes = with_tree(&volume_segmentation(), |root| {
            let segment = root
                .group_mut(SEGMENTS)
                .and_then(|segments| segments.group_mut("segment00000001"))
                .unwrap();
            segment.set_attr("colour", vec![1.5f64, 0.0, 0.0, 1.0]);
        });
        let err = HffAdapter::default()
            .read_from(&mut bytes.as_slice())
            .unwrap_err();
        assert!(matches!(err, SffError::InvalidColour { channel: "red", .. }), "{err}");
    }

    #[test]
    fn test_short_input_is_corrupt() {
        let err = HffAdapter::default()
            .read_from(&mut &b"\x89HDF"[..])
            .unwrap_err();
        assert!(matches!(err, SffError::CorruptPayload { .. }), "{err}");
    }
}
