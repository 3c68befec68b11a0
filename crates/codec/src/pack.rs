//! Element packing
//!
//! Converts a typed `Payload` to its fixed-width byte representation in a
//! chosen byte order, and back. No framing: the element type and byte
//! order travel separately.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use sffrw_core::{ElementType, Endianness, Payload, SffError, SffResult};

/// Pack every element of `payload` in `endianness` order
pub fn pack(payload: &Payload, endianness: Endianness) -> Vec<u8> {
    match endianness {
        Endianness::Little => pack_with::<LittleEndian>(payload),
        Endianness::Big => pack_with::<BigEndian>(payload),
    }
}

/// Reinterpret `bytes` as elements of `mode` in `endianness` order.
///
/// Fails with `CorruptPayload` if the length is not a whole number of
/// elements; the offset points at the first trailing byte.
pub fn unpack(
    bytes: &[u8],
    mode: ElementType,
    endianness: Endianness,
    context: &str,
) -> SffResult<Payload> {
    let width = mode.size_bytes();
    let trailing = bytes.len() % width;
    if trailing != 0 {
        return Err(SffError::corrupt_at(
            context,
            (bytes.len() - trailing) as u64,
            format!(
                "{} bytes is not a whole number of {} elements",
                bytes.len(),
                mode
            ),
        ));
    }
    Ok(match endianness {
        Endianness::Little => unpack_with::<LittleEndian>(bytes, mode),
        Endianness::Big => unpack_with::<BigEndian>(bytes, mode),
    })
}

macro_rules! write_into {
    ($order:ty, $values:expr, $method:ident, $width:expr) => {{
        let mut out = vec![0u8; $values.len() * $width];
        <$order>::$method($values, &mut out);
        out
    }};
}

fn pack_with<B: ByteOrder>(payload: &Payload) -> Vec<u8> {
    match payload {
        Payload::Int8(v) => v.iter().map(|x| *x as u8).collect(),
        Payload::UInt8(v) => v.clone(),
        Payload::Int16(v) => write_into!(B, v, write_i16_into, 2),
        Payload::UInt16(v) => write_into!(B, v, write_u16_into, 2),
        Payload::Int32(v) => write_into!(B, v, write_i32_into, 4),
        Payload::UInt32(v) => write_into!(B, v, write_u32_into, 4),
        Payload::Int64(v) => write_into!(B, v, write_i64_into, 8),
        Payload::UInt64(v) => write_into!(B, v, write_u64_into, 8),
        Payload::Float32(v) => write_into!(B, v, write_f32_into, 4),
        Payload::Float64(v) => write_into!(B, v, write_f64_into, 8),
    }
}

macro_rules! read_into {
    ($order:ty, $bytes:expr, $zero:expr, $method:ident, $width:expr) => {{
        let mut values = vec![$zero; $bytes.len() / $width];
        <$order>::$method($bytes, &mut values);
        values.into()
    }};
}

fn unpack_with<B: ByteOrder>(bytes: &[u8], mode: ElementType) -> Payload {
    match mode {
        ElementType::Int8 => bytes.iter().map(|b| *b as i8).collect::<Vec<_>>().into(),
        ElementType::UInt8 => bytes.to_vec().into(),
        ElementType::Int16 => read_into!(B, bytes, 0i16, read_i16_into, 2),
        ElementType::UInt16 => read_into!(B, bytes, 0u16, read_u16_into, 2),
        ElementType::Int32 => read_into!(B, bytes, 0i32, read_i32_into, 4),
        ElementType::UInt32 => read_into!(B, bytes, 0u32, read_u32_into, 4),
        ElementType::Int64 => read_into!(B, bytes, 0i64, read_i64_into, 8),
        ElementType::UInt64 => read_into!(B, bytes, 0u64, read_u64_into, 8),
        ElementType::Float32 => read_into!(B, bytes, 0f32, read_f32_into, 4),
        ElementType::Float64 => read_into!(B, bytes, 0f64, read_f64_into, 8),
    }
}
