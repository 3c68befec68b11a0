//! Voxel lattices
//!
//! A lattice is a dense 3-D array of one element type. The payload is kept
//! flat in C order over `(sections, rows, cols)`: the column index varies
//! fastest.

use crate::collection::identified;
use crate::error::{SffError, SffResult};
use crate::types::{ElementType, Endianness, Id, Payload};

/// Grid dimensions of a lattice; every dimension is positive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VolumeStructure {
    /// Number of columns (x)
    pub cols: u64,
    /// Number of rows (y)
    pub rows: u64,
    /// Number of sections (z)
    pub sections: u64,
}

impl VolumeStructure {
    /// Create a structure, rejecting zero dimensions
    pub fn new(cols: u64, rows: u64, sections: u64) -> SffResult<Self> {
        let size = Self {
            cols,
            rows,
            sections,
        };
        size.validate()?;
        Ok(size)
    }

    /// Fail with `InvalidShape` if any dimension is zero
    pub fn validate(&self) -> SffResult<()> {
        if self.cols == 0 || self.rows == 0 || self.sections == 0 {
            return Err(SffError::invalid_shape(
                "lattice size",
                format!(
                    "dimensions must be positive, got {}x{}x{}",
                    self.cols, self.rows, self.sections
                ),
            ));
        }
        Ok(())
    }

    /// Total number of voxels, or `None` on overflow
    pub fn voxel_count(&self) -> Option<usize> {
        let count = self
            .cols
            .checked_mul(self.rows)?
            .checked_mul(self.sections)?;
        usize::try_from(count).ok()
    }

    /// Array shape as `(sections, rows, cols)`
    pub fn shape(&self) -> (u64, u64, u64) {
        (self.sections, self.rows, self.cols)
    }

    /// As `[cols, rows, sections]`, the persisted attribute order
    pub fn to_array(&self) -> [u64; 3] {
        [self.cols, self.rows, self.sections]
    }
}

/// Offset of a lattice's first voxel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VolumeIndex {
    /// Column offset
    pub cols: i64,
    /// Row offset
    pub rows: i64,
    /// Section offset
    pub sections: i64,
}

impl VolumeIndex {
    /// Create an index
    pub fn new(cols: i64, rows: i64, sections: i64) -> Self {
        Self {
            cols,
            rows,
            sections,
        }
    }

    /// As `[cols, rows, sections]`
    pub fn to_array(&self) -> [i64; 3] {
        [self.cols, self.rows, self.sections]
    }
}

/// Identified voxel array
///
/// Invariant: `data().len() == size().voxel_count()`. The only ways to set
/// the payload check it.
#[derive(Debug, Clone, PartialEq)]
pub struct Lattice {
    /// Id within the segmentation's lattice collection
    pub id: Option<Id>,
    /// Byte order used when the payload is packed
    pub endianness: Endianness,
    /// Offset of the first voxel
    pub start: VolumeIndex,
    size: VolumeStructure,
    data: Payload,
}

identified!(Lattice, "lattice");

impl Lattice {
    /// Build a lattice from an already-typed flat array
    pub fn from_array(size: VolumeStructure, data: impl Into<Payload>) -> SffResult<Self> {
        let data = data.into();
        check_len(&size, &data)?;
        Ok(Self {
            id: None,
            endianness: Endianness::default(),
            start: VolumeIndex::default(),
            size,
            data,
        })
    }

    /// Set the id
    pub fn with_id(mut self, id: Id) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the byte order
    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    /// Set the start offset
    pub fn with_start(mut self, start: VolumeIndex) -> Self {
        self.start = start;
        self
    }

    /// Grid dimensions
    pub fn size(&self) -> VolumeStructure {
        self.size
    }

    /// Element type of the payload
    pub fn mode(&self) -> ElementType {
        self.data.element_type()
    }

    /// Flat payload
    pub fn data(&self) -> &Payload {
        &self.data
    }

    /// Consume the lattice, returning its payload
    pub fn into_data(self) -> Payload {
        self.data
    }

    /// Replace size and payload together
    pub fn set_data(&mut self, size: VolumeStructure, data: Payload) -> SffResult<()> {
        check_len(&size, &data)?;
        self.size = size;
        self.data = data;
        Ok(())
    }

    /// Voxel value at `(col, row, section)`, widened to `f64`
    pub fn get(&self, col: u64, row: u64, section: u64) -> Option<f64> {
        if col >= self.size.cols || row >= self.size.rows || section >= self.size.sections {
            return None;
        }
        let index = (section * self.size.rows + row) * self.size.cols + col;
        self.data.get_f64(usize::try_from(index).ok()?)
    }

    /// True if any voxel equals `value`
    pub fn contains_value(&self, value: f64) -> bool {
        (0..self.data.len()).any(|i| self.data.get_f64(i) == Some(value))
    }
}

fn check_len(size: &VolumeStructure, data: &Payload) -> SffResult<()> {
    size.validate()?;
    let expected = size.voxel_count().ok_or_else(|| {
        SffError::invalid_shape("lattice size", "voxel count overflows the address space")
    })?;
    if data.len() != expected {
        return Err(SffError::invalid_shape(
            "lattice",
            format!(
                "payload has {} elements but size {}x{}x{} needs {}",
                data.len(),
                size.cols,
                size.rows,
                size.sections,
                expected
            ),
        ));
    }
    Ok(())
}
