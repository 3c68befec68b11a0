//! Typed views over a `rustyhdf5::File`

use super::AttrValue;
use rustyhdf5::{Dataset, Error as H5Error, File, Group};
use sffrw_core::{SffError, SffResult};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Superblock v3 is the smallest thing worth handing to the parser
const MIN_FILE_SIZE: u64 = 48;

/// Memory-map an HDF5 file.
///
/// A missing file is `Io`; anything too short to hold a superblock is
/// `CorruptPayload` before the mapping is attempted.
pub fn open(path: &Path) -> SffResult<File> {
    let len = fs::metadata(path)?.len();
    let context = path.display().to_string();
    if len < MIN_FILE_SIZE {
        return Err(SffError::corrupt_at(
            context,
            len,
            format!("{} bytes is too short for an HDF5 superblock", len),
        ));
    }
    File::open(path).map_err(|e| h5_error(&context, e))
}

/// Parse an HDF5 file held in memory
pub fn from_bytes(bytes: Vec<u8>) -> SffResult<File> {
    let len = bytes.len() as u64;
    if len < MIN_FILE_SIZE {
        return Err(SffError::corrupt_at(
            "hdf5 file",
            len,
            format!("{} bytes is too short for an HDF5 superblock", len),
        ));
    }
    File::from_bytes(bytes).map_err(|e| h5_error("hdf5 file", e))
}

fn h5_error(context: &str, err: H5Error) -> SffError {
    match err {
        H5Error::Io(e) => SffError::Io(e),
        other => SffError::corrupt(context, other.to_string()),
    }
}

macro_rules! typed_getters {
    ($get:ident, $opt:ident, $expected:literal, $ret:ty, $convert:ident) => {
        /// Required attribute of this type
        pub fn $get(&self, name: &str) -> SffResult<$ret> {
            self.$opt(name)?.ok_or_else(|| self.missing(name))
        }

        /// Optional attribute of this type; wrong type is still an error
        pub fn $opt(&self, name: &str) -> SffResult<Option<$ret>> {
            match self.attrs.get(name) {
                None => Ok(None),
                Some(value) => $convert(value)
                    .map(Some)
                    .ok_or_else(|| self.wrong_type(name, $expected, value)),
            }
        }
    };
}

/// Attributes of one object, keyed by name
#[derive(Debug)]
struct Attrs {
    path: String,
    attrs: HashMap<String, AttrValue>,
}

impl Attrs {
    typed_getters!(get_str, opt_str, "string", String, as_string);
    typed_getters!(get_uint, opt_uint, "uint", u64, as_uint);
    typed_getters!(get_float, opt_float, "float", f64, as_float);
    typed_getters!(get_int_array, opt_int_array, "int array", Vec<i64>, as_int_array);
    typed_getters!(get_float_array, opt_float_array, "float array", Vec<f64>, as_float_array);

    fn missing(&self, attr: &str) -> SffError {
        SffError::corrupt(self.path.as_str(), format!("missing attribute '{}'", attr))
    }

    fn wrong_type(&self, attr: &str, expected: &str, found: &AttrValue) -> SffError {
        SffError::corrupt(
            self.path.as_str(),
            format!("attribute '{}' should be {} but is {}", attr, expected, type_name(found)),
        )
    }
}

// Single-element arrays decode as scalars, so array getters take both.
fn as_string(value: &AttrValue) -> Option<String> {
    match value {
        AttrValue::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn as_uint(value: &AttrValue) -> Option<u64> {
    match value {
        AttrValue::U64(v) => Some(*v),
        AttrValue::I64(v) => u64::try_from(*v).ok(),
        _ => None,
    }
}

fn as_float(value: &AttrValue) -> Option<f64> {
    match value {
        AttrValue::F64(v) => Some(*v),
        _ => None,
    }
}

fn as_int_array(value: &AttrValue) -> Option<Vec<i64>> {
    match value {
        AttrValue::I64Array(v) => Some(v.clone()),
        AttrValue::I64(v) => Some(vec![*v]),
        _ => None,
    }
}

fn as_float_array(value: &AttrValue) -> Option<Vec<f64>> {
    match value {
        AttrValue::F64Array(v) => Some(v.clone()),
        AttrValue::F64(v) => Some(vec![*v]),
        _ => None,
    }
}

fn type_name(value: &AttrValue) -> &'static str {
    match value {
        AttrValue::F64(_) => "float",
        AttrValue::F64Array(_) => "float array",
        AttrValue::I64(_) => "int",
        AttrValue::I64Array(_) => "int array",
        AttrValue::U64(_) => "uint",
        AttrValue::String(_) => "string",
        AttrValue::StringArray(_) => "string array",
    }
}

macro_rules! forward_getters {
    ($($get:ident, $opt:ident, $ret:ty;)*) => {
        $(
            /// Required attribute of this type
            pub fn $get(&self, name: &str) -> SffResult<$ret> {
                self.attrs.$get(name)
            }

            /// Optional attribute of this type; wrong type is still an error
            pub fn $opt(&self, name: &str) -> SffResult<Option<$ret>> {
                self.attrs.$opt(name)
            }
        )*
    };
}

/// A group of an open file with its attributes decoded
pub struct GroupView<'f> {
    group: Group<'f>,
    attrs: Attrs,
}

impl std::fmt::Debug for GroupView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupView")
            .field("attrs", &self.attrs)
            .finish_non_exhaustive()
    }
}

impl<'f> GroupView<'f> {
    /// Root group
    pub fn root(file: &'f File) -> SffResult<Self> {
        Self::new(file.root(), "/".to_string())
    }

    fn new(group: Group<'f>, path: String) -> SffResult<Self> {
        let attrs = group.attrs().map_err(|e| h5_error(&path, e))?;
        Ok(Self {
            group,
            attrs: Attrs { path, attrs },
        })
    }

    /// Absolute path within the file
    pub fn path(&self) -> &str {
        &self.attrs.path
    }

    /// Last path component
    pub fn name(&self) -> &str {
        let path = self.path();
        path.rsplit('/').next().filter(|n| !n.is_empty()).unwrap_or(path)
    }

    /// Names of the child groups, in link order
    pub fn group_names(&self) -> SffResult<Vec<String>> {
        self.group.groups().map_err(|e| h5_error(self.path(), e))
    }

    /// Child groups, in link order
    pub fn groups(&self) -> SffResult<Vec<GroupView<'f>>> {
        self.group_names()?
            .iter()
            .map(|name| self.group(name))
            .collect()
    }

    /// Required child group
    pub fn group(&self, name: &str) -> SffResult<GroupView<'f>> {
        let group = self.group.group(name).map_err(|e| h5_error(self.path(), e))?;
        GroupView::new(group, self.child_path(name))
    }

    /// Child group, if one with this name exists
    pub fn opt_group(&self, name: &str) -> SffResult<Option<GroupView<'f>>> {
        if self.group_names()?.iter().any(|n| n == name) {
            self.group(name).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Required dataset
    pub fn dataset(&self, name: &str) -> SffResult<DatasetView<'f>> {
        let path = self.child_path(name);
        let dataset = self.group.dataset(name).map_err(|e| h5_error(self.path(), e))?;
        let attrs = dataset.attrs().map_err(|e| h5_error(&path, e))?;
        Ok(DatasetView {
            dataset,
            attrs: Attrs { path, attrs },
        })
    }

    /// Dataset, if one with this name exists
    pub fn opt_dataset(&self, name: &str) -> SffResult<Option<DatasetView<'f>>> {
        let names = self.group.datasets().map_err(|e| h5_error(self.path(), e))?;
        if names.iter().any(|n| n == name) {
            self.dataset(name).map(Some)
        } else {
            Ok(None)
        }
    }

    fn child_path(&self, name: &str) -> String {
        if self.path() == "/" {
            format!("/{}", name)
        } else {
            format!("{}/{}", self.path(), name)
        }
    }

    forward_getters! {
        get_str, opt_str, String;
        get_uint, opt_uint, u64;
        get_float, opt_float, f64;
        get_int_array, opt_int_array, Vec<i64>;
        get_float_array, opt_float_array, Vec<f64>;
    }
}

/// A dataset of an open file with its attributes decoded
pub struct DatasetView<'f> {
    dataset: Dataset<'f>,
    attrs: Attrs,
}

impl<'f> DatasetView<'f> {
    /// Absolute path within the file
    pub fn path(&self) -> &str {
        &self.attrs.path
    }

    /// Dimensions
    pub fn shape(&self) -> SffResult<Vec<u64>> {
        self.dataset.shape().map_err(|e| h5_error(self.path(), e))
    }

    /// Raw contiguous bytes, borrowed from the file without copying
    pub fn bytes(&self) -> SffResult<&'f [u8]> {
        self.dataset
            .read_raw_ref()
            .map_err(|e| h5_error(self.path(), e))?
            .ok_or_else(|| SffError::corrupt(self.path(), "dataset is not stored contiguously"))
    }

    /// Values as `f64`
    pub fn floats(&self) -> SffResult<Vec<f64>> {
        self.dataset.read_f64().map_err(|e| h5_error(self.path(), e))
    }

    forward_getters! {
        get_str, opt_str, String;
        get_uint, opt_uint, u64;
    }
}
