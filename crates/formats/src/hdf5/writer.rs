//! Forward-only HDF5 writer
//!
//! Object headers are sized first with placeholder addresses. Link,
//! layout and attribute messages have fixed widths for 8-byte offsets,
//! so the sizes hold once real addresses are filled in.

use super::{AttrValue, DatasetData, DatasetNode, GroupNode};
use byteorder::{LittleEndian, WriteBytesExt};
use rustyhdf5_format::attribute::AttributeMessage;
use rustyhdf5_format::dataspace::{Dataspace, DataspaceType};
use rustyhdf5_format::datatype::{CharacterSet, Datatype, DatatypeByteOrder, StringPadding};
use rustyhdf5_format::link_message::{LinkMessage, LinkTarget};
use rustyhdf5_format::message_type::MessageType;
use rustyhdf5_format::object_header_writer::ObjectHeaderWriter;
use rustyhdf5_format::superblock::Superblock;
use rustyhdf5_format::type_builders::{make_f64_type, make_i64_type, make_u8_type};
use sffrw_core::{SffError, SffResult};
use std::io::{self, Write};
use tracing::debug;

const OFFSET_SIZE: u8 = 8;
const LENGTH_SIZE: u8 = 8;

/// Header message flag: constant message
const CONSTANT: u8 = 0x01;

enum Object<'n, 'a> {
    Group(&'n GroupNode<'a>),
    Dataset(&'n DatasetNode<'a>),
}

struct Entry<'n, 'a> {
    object: Object<'n, 'a>,
    path: String,
    /// Link name and entry index of each child, datasets first
    links: Vec<(&'n str, usize)>,
}

/// Write `root` as the root group of a complete HDF5 file
pub fn write_to(root: &GroupNode<'_>, writer: &mut dyn Write) -> SffResult<()> {
    let mut entries = Vec::new();
    flatten(root, String::new(), &mut entries);

    let lengths = entries
        .iter()
        .map(|entry| match entry.object {
            Object::Group(_) => Ok(0),
            Object::Dataset(dataset) => dataset.data().byte_len(),
        })
        .collect::<SffResult<Vec<u64>>>()?;

    let placeholders = vec![0u64; entries.len()];
    let mut cursor = superblock(0, 0).serialize().len() as u64;
    let mut addresses = Vec::with_capacity(entries.len());
    for (entry, len) in entries.iter().zip(&lengths) {
        addresses.push(cursor);
        cursor += object_header(entry, &placeholders, 0, *len)?.len() as u64;
    }
    let mut data_addresses = Vec::with_capacity(entries.len());
    for len in &lengths {
        data_addresses.push(cursor);
        cursor += len;
    }

    writer.write_all(&superblock(addresses[0], cursor).serialize())?;
    for (i, entry) in entries.iter().enumerate() {
        writer.write_all(&object_header(entry, &addresses, data_addresses[i], lengths[i])?)?;
    }
    for (entry, planned) in entries.iter().zip(&lengths) {
        if let Object::Dataset(dataset) = entry.object {
            let written = dataset.data().write(writer)?;
            if written != *planned {
                return Err(SffError::corrupt(
                    entry.path.as_str(),
                    format!("wrote {} bytes but {} were planned", written, planned),
                ));
            }
        }
    }
    debug!(
        target: "sffrw::hff",
        objects = entries.len(),
        eof = cursor,
        "Wrote HDF5 file"
    );
    Ok(())
}

fn flatten<'n, 'a>(group: &'n GroupNode<'a>, path: String, entries: &mut Vec<Entry<'n, 'a>>) -> usize {
    let index = entries.len();
    let prefix = path.clone();
    entries.push(Entry {
        object: Object::Group(group),
        path: if path.is_empty() { "/".to_string() } else { path },
        links: Vec::new(),
    });
    let mut links = Vec::new();
    for dataset in group.datasets() {
        links.push((dataset.name(), entries.len()));
        entries.push(Entry {
            object: Object::Dataset(dataset),
            path: format!("{}/{}", prefix, dataset.name()),
            links: Vec::new(),
        });
    }
    for child in group.groups() {
        let child_index = flatten(child, format!("{}/{}", prefix, child.name()), entries);
        links.push((child.name(), child_index));
    }
    entries[index].links = links;
    index
}

fn superblock(root_group_address: u64, eof_address: u64) -> Superblock {
    Superblock {
        version: 3,
        offset_size: OFFSET_SIZE,
        length_size: LENGTH_SIZE,
        base_address: 0,
        eof_address,
        root_group_address,
        group_leaf_node_k: None,
        group_internal_node_k: None,
        indexed_storage_internal_node_k: None,
        free_space_address: None,
        driver_info_address: None,
        consistency_flags: 0,
        superblock_extension_address: Some(u64::MAX),
        checksum: None,
    }
}

fn object_header(entry: &Entry<'_, '_>, addresses: &[u64], data_address: u64, data_len: u64) -> SffResult<Vec<u8>> {
    let mut header = ObjectHeaderWriter::new();
    match entry.object {
        Object::Group(group) => {
            // Compact storage: no fractal heap, no name index.
            let mut link_info = vec![0u8, 0u8];
            link_info.extend_from_slice(&u64::MAX.to_le_bytes());
            link_info.extend_from_slice(&u64::MAX.to_le_bytes());
            header.add_message(MessageType::LinkInfo, link_info);
            for (name, target) in &entry.links {
                let link = LinkMessage {
                    name: name.to_string(),
                    link_target: LinkTarget::Hard {
                        object_header_address: addresses[*target],
                    },
                    creation_order: None,
                    charset: CharacterSet::Ascii,
                };
                add_message(&mut header, entry, MessageType::Link, link.serialize(OFFSET_SIZE), 0)?;
            }
            add_attributes(&mut header, entry, group.attrs())?;
        }
        Object::Dataset(dataset) => {
            let data = dataset.data();
            add_message(&mut header, entry, MessageType::Datatype, data.datatype().serialize(), CONSTANT)?;
            let dataspace = simple(data.shape(data_len));
            add_message(&mut header, entry, MessageType::Dataspace, dataspace.serialize(LENGTH_SIZE), 0)?;
            header.add_message_with_flags(MessageType::FillValue, vec![3, 0x0a], CONSTANT);
            let mut layout = vec![4u8, 1u8];
            layout.extend_from_slice(&data_address.to_le_bytes());
            layout.extend_from_slice(&data_len.to_le_bytes());
            header.add_message(MessageType::DataLayout, layout);
            add_attributes(&mut header, entry, dataset.attrs())?;
        }
    }
    Ok(header.serialize())
}

/// Header messages carry a 16-bit length
fn add_message(
    header: &mut ObjectHeaderWriter,
    entry: &Entry<'_, '_>,
    kind: MessageType,
    data: Vec<u8>,
    flags: u8,
) -> SffResult<()> {
    if data.len() > usize::from(u16::MAX) {
        return Err(SffError::invalid_shape(
            entry.path.as_str(),
            format!("{:?} message of {} bytes exceeds the header limit", kind, data.len()),
        ));
    }
    header.add_message_with_flags(kind, data, flags);
    Ok(())
}

fn add_attributes(
    header: &mut ObjectHeaderWriter,
    entry: &Entry<'_, '_>,
    attrs: &[(String, AttrValue)],
) -> SffResult<()> {
    for (name, value) in attrs {
        let message = attribute_message(name, value);
        add_message(header, entry, MessageType::Attribute, message.serialize(LENGTH_SIZE), 0)?;
    }
    Ok(())
}

fn attribute_message(name: &str, value: &AttrValue) -> AttributeMessage {
    let (datatype, dataspace, raw_data) = match value {
        AttrValue::F64(v) => (make_f64_type(), scalar(), v.to_le_bytes().to_vec()),
        AttrValue::F64Array(values) => (
            make_f64_type(),
            simple(vec![values.len() as u64]),
            values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        ),
        AttrValue::I64(v) => (make_i64_type(), scalar(), v.to_le_bytes().to_vec()),
        AttrValue::I64Array(values) => (
            make_i64_type(),
            simple(vec![values.len() as u64]),
            values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        ),
        AttrValue::U64(v) => (
            Datatype::FixedPoint {
                size: 8,
                byte_order: DatatypeByteOrder::LittleEndian,
                signed: false,
                bit_offset: 0,
                bit_precision: 64,
            },
            scalar(),
            v.to_le_bytes().to_vec(),
        ),
        AttrValue::String(s) => {
            // Zero-length string types are not valid HDF5; pad to one NUL.
            let mut raw = s.as_bytes().to_vec();
            if raw.is_empty() {
                raw.push(0);
            }
            (string_type(raw.len()), scalar(), raw)
        }
        AttrValue::StringArray(strings) => {
            let width = strings.iter().map(String::len).max().unwrap_or(0).max(1);
            let mut raw = Vec::with_capacity(width * strings.len());
            for s in strings {
                raw.extend_from_slice(s.as_bytes());
                raw.resize(raw.len() + width - s.len(), 0);
            }
            (string_type(width), simple(vec![strings.len() as u64]), raw)
        }
    };
    AttributeMessage {
        name: name.to_string(),
        datatype,
        dataspace,
        raw_data,
    }
}

fn string_type(size: usize) -> Datatype {
    Datatype::String {
        size: size as u32,
        padding: StringPadding::NullPad,
        charset: CharacterSet::Utf8,
    }
}

fn scalar() -> Dataspace {
    Dataspace {
        space_type: DataspaceType::Scalar,
        rank: 0,
        dimensions: Vec::new(),
        max_dimensions: None,
    }
}

fn simple(dimensions: Vec<u64>) -> Dataspace {
    Dataspace {
        space_type: DataspaceType::Simple,
        rank: dimensions.len() as u8,
        dimensions,
        max_dimensions: None,
    }
}

impl DatasetData<'_> {
    fn datatype(&self) -> Datatype {
        match self {
            DatasetData::Floats { .. } => make_f64_type(),
            DatasetData::Streamed(_) => make_u8_type(),
        }
    }

    fn shape(&self, byte_len: u64) -> Vec<u64> {
        match self {
            DatasetData::Floats { shape, .. } => shape.clone(),
            DatasetData::Streamed(_) => vec![byte_len],
        }
    }

    fn byte_len(&self) -> SffResult<u64> {
        match self {
            DatasetData::Floats { values, .. } => Ok(values.len() as u64 * 8),
            DatasetData::Streamed(produce) => produce(&mut io::sink()),
        }
    }

    fn write(&self, writer: &mut dyn Write) -> SffResult<u64> {
        match self {
            DatasetData::Floats { values, .. } => {
                for value in values {
                    writer.write_f64::<LittleEndian>(*value)?;
                }
                Ok(values.len() as u64 * 8)
            }
            DatasetData::Streamed(produce) => produce(writer),
        }
    }
}
