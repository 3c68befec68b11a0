//! Scalar vocabulary shared by lattices and meshes
//!
//! - `Id`: entity identifier, unique within one collection
//! - `ElementType`: the fixed set of numeric element tags (`mode`)
//! - `Endianness`: byte order tag
//! - `Payload`: a flat, typed numeric sequence

use crate::error::SffError;
use std::fmt;
use std::str::FromStr;

/// Entity identifier, unique within the scope of one collection
pub type Id = u64;

/// Numeric element type of a packed payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ElementType {
    /// Signed 8-bit integer
    Int8,
    /// Unsigned 8-bit integer
    UInt8,
    /// Signed 16-bit integer
    Int16,
    /// Unsigned 16-bit integer
    UInt16,
    /// Signed 32-bit integer
    Int32,
    /// Unsigned 32-bit integer
    #[default]
    UInt32,
    /// Signed 64-bit integer
    Int64,
    /// Unsigned 64-bit integer
    UInt64,
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
}

impl ElementType {
    /// All element types, in tag order
    pub const ALL: [ElementType; 10] = [
        ElementType::Int8,
        ElementType::UInt8,
        ElementType::Int16,
        ElementType::UInt16,
        ElementType::Int32,
        ElementType::UInt32,
        ElementType::Int64,
        ElementType::UInt64,
        ElementType::Float32,
        ElementType::Float64,
    ];

    /// Persisted tag (e.g. "uint8")
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Int8 => "int8",
            ElementType::UInt8 => "uint8",
            ElementType::Int16 => "int16",
            ElementType::UInt16 => "uint16",
            ElementType::Int32 => "int32",
            ElementType::UInt32 => "uint32",
            ElementType::Int64 => "int64",
            ElementType::UInt64 => "uint64",
            ElementType::Float32 => "float32",
            ElementType::Float64 => "float64",
        }
    }

    /// Width of one element in bytes
    pub fn size_bytes(&self) -> usize {
        match self {
            ElementType::Int8 | ElementType::UInt8 => 1,
            ElementType::Int16 | ElementType::UInt16 => 2,
            ElementType::Int32 | ElementType::UInt32 | ElementType::Float32 => 4,
            ElementType::Int64 | ElementType::UInt64 | ElementType::Float64 => 8,
        }
    }

    /// True for `float32` and `float64`
    pub fn is_float(&self) -> bool {
        matches!(self, ElementType::Float32 | ElementType::Float64)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = SffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ElementType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| SffError::UnsupportedElementType(s.to_string()))
    }
}

/// Byte order of a packed payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Endianness {
    /// Least significant byte first
    #[default]
    Little,
    /// Most significant byte first
    Big,
}

impl Endianness {
    /// Persisted tag ("little" or "big")
    pub fn as_str(&self) -> &'static str {
        match self {
            Endianness::Little => "little",
            Endianness::Big => "big",
        }
    }
}

impl fmt::Display for Endianness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Endianness {
    type Err = SffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "little" => Ok(Endianness::Little),
            "big" => Ok(Endianness::Big),
            other => Err(SffError::UnsupportedByteOrder(other.to_string())),
        }
    }
}

/// Flat numeric sequence tagged with its element type
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// `int8` values
    Int8(Vec<i8>),
    /// `uint8` values
    UInt8(Vec<u8>),
    /// `int16` values
    Int16(Vec<i16>),
    /// `uint16` values
    UInt16(Vec<u16>),
    /// `int32` values
    Int32(Vec<i32>),
    /// `uint32` values
    UInt32(Vec<u32>),
    /// `int64` values
    Int64(Vec<i64>),
    /// `uint64` values
    UInt64(Vec<u64>),
    /// `float32` values
    Float32(Vec<f32>),
    /// `float64` values
    Float64(Vec<f64>),
}

/// Expands `$body` once per variant with `$v` bound to the inner vector.
#[macro_export]
macro_rules! with_payload {
    ($payload:expr, $v:ident => $body:expr) => {
        match $payload {
            $crate::Payload::Int8($v) => $body,
            $crate::Payload::UInt8($v) => $body,
            $crate::Payload::Int16($v) => $body,
            $crate::Payload::UInt16($v) => $body,
            $crate::Payload::Int32($v) => $body,
            $crate::Payload::UInt32($v) => $body,
            $crate::Payload::Int64($v) => $body,
            $crate::Payload::UInt64($v) => $body,
            $crate::Payload::Float32($v) => $body,
            $crate::Payload::Float64($v) => $body,
        }
    };
}

impl Payload {
    /// Empty payload of the given element type
    pub fn empty(mode: ElementType) -> Self {
        Self::with_capacity(mode, 0)
    }

    /// Empty payload with room for `capacity` elements
    pub fn with_capacity(mode: ElementType, capacity: usize) -> Self {
        match mode {
            ElementType::Int8 => Payload::Int8(Vec::with_capacity(capacity)),
            ElementType::UInt8 => Payload::UInt8(Vec::with_capacity(capacity)),
            ElementType::Int16 => Payload::Int16(Vec::with_capacity(capacity)),
            ElementType::UInt16 => Payload::UInt16(Vec::with_capacity(capacity)),
            ElementType::Int32 => Payload::Int32(Vec::with_capacity(capacity)),
            ElementType::UInt32 => Payload::UInt32(Vec::with_capacity(capacity)),
            ElementType::Int64 => Payload::Int64(Vec::with_capacity(capacity)),
            ElementType::UInt64 => Payload::UInt64(Vec::with_capacity(capacity)),
            ElementType::Float32 => Payload::Float32(Vec::with_capacity(capacity)),
            ElementType::Float64 => Payload::Float64(Vec::with_capacity(capacity)),
        }
    }

    /// Element type of this payload
    pub fn element_type(&self) -> ElementType {
        match self {
            Payload::Int8(_) => ElementType::Int8,
            Payload::UInt8(_) => ElementType::UInt8,
            Payload::Int16(_) => ElementType::Int16,
            Payload::UInt16(_) => ElementType::UInt16,
            Payload::Int32(_) => ElementType::Int32,
            Payload::UInt32(_) => ElementType::UInt32,
            Payload::Int64(_) => ElementType::Int64,
            Payload::UInt64(_) => ElementType::UInt64,
            Payload::Float32(_) => ElementType::Float32,
            Payload::Float64(_) => ElementType::Float64,
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        with_payload!(self, v => v.len())
    }

    /// True if there are no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the packed representation in bytes
    pub fn byte_len(&self) -> usize {
        self.len() * self.element_type().size_bytes()
    }

    /// Element at `index` widened to `f64`
    ///
    /// 64-bit integers above 2^53 lose precision.
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        with_payload!(self, v => v.get(index).map(|x| *x as f64))
    }
}

macro_rules! payload_from_vec {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Vec<$ty>> for Payload {
                fn from(v: Vec<$ty>) -> Self {
                    Payload::$variant(v)
                }
            }
        )*
    };
}

payload_from_vec!(
    i8 => Int8,
    u8 => UInt8,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
);
