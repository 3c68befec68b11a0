//! HDF5 files built and read through rustyhdf5
//!
//! The write side describes a file as a tree of `GroupNode`s holding
//! attributes and `DatasetNode`s, then lays it out in one forward pass:
//!
//! ```text
//! +------------+ 0
//! | superblock | v3, 8-byte offsets and lengths
//! +------------+ 48
//! | headers    | v2 object headers, groups and datasets in pre-order
//! +------------+
//! | data       | contiguous dataset bytes in the same order
//! +------------+ eof
//! ```
//!
//! Group links are compact link messages and attributes are compact
//! attribute messages, so every object fits in a single header chunk.
//! Dataset bytes may come from a `DatasetData::Streamed` producer, which
//! is run once to learn its length and once more straight into the
//! output. Nothing bigger than one producer's working set is buffered.
//!
//! The read side wraps `rustyhdf5::File` with typed attribute accessors
//! that fail with `CorruptPayload` naming the object path.

mod reader;
mod writer;

pub use reader::{from_bytes, open, DatasetView, GroupView};
pub use rustyhdf5::AttrValue;
pub use writer::write_to;

use sffrw_core::SffResult;
use std::fmt;
use std::io::Write;

/// HDF5 format signature
pub const HDF5_SIGNATURE: [u8; 8] = [0x89, b'H', b'D', b'F', b'\r', b'\n', 0x1a, b'\n'];

/// Values that can be stored as an HDF5 attribute
pub trait IntoAttr {
    /// Attribute value for `self`
    fn into_attr(self) -> AttrValue;
}

impl IntoAttr for AttrValue {
    fn into_attr(self) -> AttrValue {
        self
    }
}

impl IntoAttr for &str {
    fn into_attr(self) -> AttrValue {
        AttrValue::String(self.to_string())
    }
}

impl IntoAttr for String {
    fn into_attr(self) -> AttrValue {
        AttrValue::String(self)
    }
}

impl IntoAttr for u64 {
    fn into_attr(self) -> AttrValue {
        AttrValue::U64(self)
    }
}

impl IntoAttr for f64 {
    fn into_attr(self) -> AttrValue {
        AttrValue::F64(self)
    }
}

impl IntoAttr for Vec<f64> {
    fn into_attr(self) -> AttrValue {
        AttrValue::F64Array(self)
    }
}

impl IntoAttr for Vec<i64> {
    fn into_attr(self) -> AttrValue {
        AttrValue::I64Array(self)
    }
}

/// Produces dataset bytes on demand, returning how many it wrote
pub type Producer<'a> = Box<dyn Fn(&mut dyn Write) -> SffResult<u64> + 'a>;

/// Where a dataset's bytes come from
pub enum DatasetData<'a> {
    /// Little-endian `f64` values with an explicit shape
    Floats {
        /// Values in row-major order
        values: Vec<f64>,
        /// Dimensions; their product is `values.len()`
        shape: Vec<u64>,
    },
    /// 1-D `u8` dataset written by a producer that must be repeatable
    Streamed(Producer<'a>),
}

impl fmt::Debug for DatasetData<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetData::Floats { shape, .. } => write!(f, "Floats({:?})", shape),
            DatasetData::Streamed(_) => f.write_str("Streamed"),
        }
    }
}

/// Dataset to be written
#[derive(Debug)]
pub struct DatasetNode<'a> {
    name: String,
    attrs: Vec<(String, AttrValue)>,
    data: DatasetData<'a>,
}

impl<'a> DatasetNode<'a> {
    /// Dataset without attributes
    pub fn new(name: impl Into<String>, data: DatasetData<'a>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            data,
        }
    }

    /// Dataset name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set an attribute, replacing any previous value
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl IntoAttr) {
        set_attr(&mut self.attrs, name.into(), value.into_attr());
    }

    pub(crate) fn attrs(&self) -> &[(String, AttrValue)] {
        &self.attrs
    }

    pub(crate) fn data(&self) -> &DatasetData<'a> {
        &self.data
    }
}

/// Group to be written
#[derive(Debug, Default)]
pub struct GroupNode<'a> {
    name: String,
    attrs: Vec<(String, AttrValue)>,
    groups: Vec<GroupNode<'a>>,
    datasets: Vec<DatasetNode<'a>>,
}

impl<'a> GroupNode<'a> {
    /// Empty group
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Group name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set an attribute, replacing any previous value
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl IntoAttr) {
        set_attr(&mut self.attrs, name.into(), value.into_attr());
    }

    /// Set an attribute only when `value` is present
    pub fn set_opt_attr<V: IntoAttr>(&mut self, name: &str, value: Option<V>) {
        if let Some(value) = value {
            self.set_attr(name, value);
        }
    }

    /// Append a child group
    pub fn push_group(&mut self, group: GroupNode<'a>) {
        self.groups.push(group);
    }

    /// Append a dataset
    pub fn push_dataset(&mut self, dataset: DatasetNode<'a>) {
        self.datasets.push(dataset);
    }

    /// Child group by name
    pub fn group_mut(&mut self, name: &str) -> Option<&mut GroupNode<'a>> {
        self.groups.iter_mut().find(|g| g.name == name)
    }

    pub(crate) fn attrs(&self) -> &[(String, AttrValue)] {
        &self.attrs
    }

    pub(crate) fn groups(&self) -> &[GroupNode<'a>] {
        &self.groups
    }

    pub(crate) fn datasets(&self) -> &[DatasetNode<'a>] {
        &self.datasets
    }
}

fn set_attr(attrs: &mut Vec<(String, AttrValue)>, name: String, value: AttrValue) {
    match attrs.iter_mut().find(|(n, _)| *n == name) {
        Some(slot) => slot.1 = value,
        None => attrs.push((name, value)),
    }
}
