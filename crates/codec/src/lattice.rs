//! Lattice payload codec
//!
//! Encode is `pack -> compress`, optionally followed by base64 for text
//! representations. Decode is the exact inverse and checks the element
//! count against the declared size.
//!
//! # Standalone blob
//!
//! `to_blob`/`from_blob` produce a fully self-describing byte string for
//! transports that carry a lattice on its own:
//!
//! ```text
//! +------------------+ 0
//! | Magic "SFFL"     | 4 bytes
//! | Format version   | u16 LE
//! | Compression tag  | u8
//! | Mode tag         | u8 (index into ElementType::ALL)
//! | Endianness tag   | u8 (0 little, 1 big)
//! | Has id           | u8
//! | Id               | u64 LE
//! | Size             | 3 x u64 LE (cols, rows, sections)
//! | Start            | 3 x i64 LE (cols, rows, sections)
//! | Payload length   | u64 LE
//! +------------------+ 74
//! | Payload          | compressed packed elements
//! +------------------+
//! | CRC32            | u32 LE over everything above
//! +------------------+
//! ```

use crate::compression::{Compression, DEFAULT_LEVEL};
use crate::pack::{pack, unpack};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use sffrw_core::{
    ElementType, Endianness, Id, Lattice, Payload, SffError, SffResult, VolumeIndex,
    VolumeStructure,
};
use std::io::{Cursor, Write};
use tracing::debug;

/// Magic bytes: "SFFL"
pub const BLOB_MAGIC: [u8; 4] = *b"SFFL";

/// Blob format version
pub const BLOB_FORMAT_VERSION: u16 = 1;

/// Size of the fixed blob header in bytes
pub const BLOB_HEADER_SIZE: usize = 74;

/// Everything needed to decode a lattice payload besides the bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatticeHeader {
    /// Lattice id
    pub id: Option<Id>,
    /// Element type
    pub mode: ElementType,
    /// Byte order
    pub endianness: Endianness,
    /// Grid dimensions
    pub size: VolumeStructure,
    /// Start offset
    pub start: VolumeIndex,
}

impl LatticeHeader {
    /// Header describing an existing lattice
    pub fn of(lattice: &Lattice) -> Self {
        Self {
            id: lattice.id,
            mode: lattice.mode(),
            endianness: lattice.endianness,
            size: lattice.size(),
            start: lattice.start,
        }
    }

    fn context(&self) -> String {
        match self.id {
            Some(id) => format!("lattice {} data", id),
            None => "lattice data".to_string(),
        }
    }
}

/// Packs, compresses and encodes lattice payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatticeCodec {
    compression: Compression,
    level: i32,
}

impl Default for LatticeCodec {
    fn default() -> Self {
        Self::new(Compression::default(), DEFAULT_LEVEL)
    }
}

impl LatticeCodec {
    /// Create a codec
    pub fn new(compression: Compression, level: i32) -> Self {
        Self { compression, level }
    }

    /// Compression algorithm
    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Compression level
    pub fn level(&self) -> i32 {
        self.level
    }

    /// Packed, compressed bytes for binary attributes
    pub fn encode_raw(&self, lattice: &Lattice) -> SffResult<Vec<u8>> {
        let mut compressed = Vec::new();
        self.encode_raw_into(lattice, &mut compressed)?;
        Ok(compressed)
    }

    /// Stream the packed, compressed bytes into `writer`.
    ///
    /// Only the packed copy of this one lattice is held in memory; the
    /// compressed output goes straight to `writer`. Returns its length.
    pub fn encode_raw_into(&self, lattice: &Lattice, writer: &mut dyn Write) -> SffResult<u64> {
        let packed = pack(lattice.data(), lattice.endianness);
        let compressed = self.compression.compress_into(&packed, self.level, writer)?;
        debug!(
            target: "sffrw::codec",
            lattice_id = ?lattice.id,
            mode = %lattice.mode(),
            packed_bytes = packed.len(),
            compressed_bytes = compressed,
            "Encoded lattice"
        );
        Ok(compressed)
    }

    /// Base64 text of the packed, compressed bytes
    pub fn encode_base64(&self, lattice: &Lattice) -> SffResult<String> {
        Ok(STANDARD.encode(self.encode_raw(lattice)?))
    }

    /// Decompress and unpack into a lattice described by `header`
    pub fn decode_raw(&self, header: &LatticeHeader, bytes: &[u8]) -> SffResult<Lattice> {
        let context = header.context();
        let packed = self.compression.decompress(bytes, &context)?;
        let payload = unpack(&packed, header.mode, header.endianness, &context)?;
        let expected = header.size.voxel_count();
        if expected != Some(payload.len()) {
            return Err(SffError::corrupt(
                context,
                format!(
                    "decoded {} elements but size {}x{}x{} needs {}",
                    payload.len(),
                    header.size.cols,
                    header.size.rows,
                    header.size.sections,
                    expected.map_or_else(|| "more than addressable".to_string(), |n| n.to_string())
                ),
            ));
        }
        debug!(
            target: "sffrw::codec",
            lattice_id = ?header.id,
            mode = %header.mode,
            packed_bytes = packed.len(),
            "Decoded lattice"
        );
        build(header, payload)
    }

    /// Base64-decode, then `decode_raw`
    pub fn decode_base64(&self, header: &LatticeHeader, text: &str) -> SffResult<Lattice> {
        let bytes = decode_base64_text(text, &header.context())?;
        self.decode_raw(header, &bytes)
    }

    /// Self-describing standalone blob
    pub fn to_blob(&self, lattice: &Lattice) -> SffResult<Vec<u8>> {
        let header = LatticeHeader::of(lattice);
        let payload = self.encode_raw(lattice)?;
        let mut buf = Vec::with_capacity(BLOB_HEADER_SIZE + payload.len() + 4);
        buf.extend_from_slice(&BLOB_MAGIC);
        buf.write_u16::<LittleEndian>(BLOB_FORMAT_VERSION)?;
        buf.write_u8(self.compression.tag())?;
        buf.write_u8(mode_tag(header.mode))?;
        buf.write_u8(match header.endianness {
            Endianness::Little => 0,
            Endianness::Big => 1,
        })?;
        buf.write_u8(u8::from(header.id.is_some()))?;
        buf.write_u64::<LittleEndian>(header.id.unwrap_or_default())?;
        for dim in header.size.to_array() {
            buf.write_u64::<LittleEndian>(dim)?;
        }
        for offset in header.start.to_array() {
            buf.write_i64::<LittleEndian>(offset)?;
        }
        buf.write_u64::<LittleEndian>(payload.len() as u64)?;
        buf.extend_from_slice(&payload);
        let crc = crc32fast::hash(&buf);
        buf.write_u32::<LittleEndian>(crc)?;
        Ok(buf)
    }

    /// Parse a standalone blob.
    ///
    /// The blob records its own compression; a blob whose payload does not
    /// match the recorded algorithm fails with `CorruptPayload`.
    pub fn from_blob(bytes: &[u8]) -> SffResult<Lattice> {
        const CONTEXT: &str = "lattice blob";
        if bytes.len() < BLOB_HEADER_SIZE + 4 {
            return Err(SffError::corrupt_at(
                CONTEXT,
                bytes.len() as u64,
                format!("blob too short: {} bytes", bytes.len()),
            ));
        }
        if bytes[..4] != BLOB_MAGIC {
            return Err(SffError::corrupt_at(CONTEXT, 0, "bad magic"));
        }
        let body_len = bytes.len() - 4;
        let stored_crc = u32::from_le_bytes([
            bytes[body_len],
            bytes[body_len + 1],
            bytes[body_len + 2],
            bytes[body_len + 3],
        ]);
        let actual_crc = crc32fast::hash(&bytes[..body_len]);
        if stored_crc != actual_crc {
            return Err(SffError::corrupt_at(
                CONTEXT,
                body_len as u64,
                format!(
                    "checksum mismatch: expected {:08x}, got {:08x}",
                    stored_crc, actual_crc
                ),
            ));
        }

        let mut cursor = Cursor::new(&bytes[4..body_len]);
        let truncated = |e: std::io::Error| SffError::corrupt(CONTEXT, e.to_string());
        let version = cursor.read_u16::<LittleEndian>().map_err(truncated)?;
        if version != BLOB_FORMAT_VERSION {
            return Err(SffError::corrupt_at(
                CONTEXT,
                4,
                format!("unsupported blob version {}", version),
            ));
        }
        let compression_tag = cursor.read_u8().map_err(truncated)?;
        let compression = Compression::from_tag(compression_tag).ok_or_else(|| {
            SffError::corrupt_at(CONTEXT, 6, format!("unknown compression tag {}", compression_tag))
        })?;
        let mode_byte = cursor.read_u8().map_err(truncated)?;
        let mode = ElementType::ALL
            .get(usize::from(mode_byte))
            .copied()
            .ok_or_else(|| SffError::UnsupportedElementType(format!("tag {}", mode_byte)))?;
        let endianness = match cursor.read_u8().map_err(truncated)? {
            0 => Endianness::Little,
            1 => Endianness::Big,
            other => return Err(SffError::UnsupportedByteOrder(format!("tag {}", other))),
        };
        let has_id = cursor.read_u8().map_err(truncated)? != 0;
        let raw_id = cursor.read_u64::<LittleEndian>().map_err(truncated)?;
        let mut dims = [0u64; 3];
        for dim in dims.iter_mut() {
            *dim = cursor.read_u64::<LittleEndian>().map_err(truncated)?;
        }
        let mut offsets = [0i64; 3];
        for offset in offsets.iter_mut() {
            *offset = cursor.read_i64::<LittleEndian>().map_err(truncated)?;
        }
        let payload_len = cursor.read_u64::<LittleEndian>().map_err(truncated)?;
        let payload_start = 4 + cursor.position() as usize;
        if payload_start as u64 + payload_len != body_len as u64 {
            return Err(SffError::corrupt_at(
                CONTEXT,
                payload_start as u64,
                format!(
                    "payload length {} does not match blob size",
                    payload_len
                ),
            ));
        }

        let size = VolumeStructure {
            cols: dims[0],
            rows: dims[1],
            sections: dims[2],
        };
        size.validate()?;
        let header = LatticeHeader {
            id: has_id.then_some(raw_id),
            mode,
            endianness,
            size,
            start: VolumeIndex::new(offsets[0], offsets[1], offsets[2]),
        };
        LatticeCodec::new(compression, DEFAULT_LEVEL).decode_raw(&header, &bytes[payload_start..body_len])
    }
}

/// Build a lattice from raw, uncompressed packed bytes plus type metadata
pub fn lattice_from_bytes(header: &LatticeHeader, bytes: &[u8]) -> SffResult<Lattice> {
    let payload = unpack(bytes, header.mode, header.endianness, &header.context())?;
    build(header, payload)
}

/// Build a lattice directly from a typed array; no decode step
pub fn lattice_from_array(size: VolumeStructure, data: impl Into<Payload>) -> SffResult<Lattice> {
    Lattice::from_array(size, data)
}

/// Decode base64 text, ignoring embedded whitespace
pub fn decode_base64_text(text: &str, context: &str) -> SffResult<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact.as_bytes()).map_err(|e| match e {
        base64::DecodeError::InvalidByte(offset, _)
        | base64::DecodeError::InvalidLastSymbol(offset, _) => {
            SffError::corrupt_at(context, offset as u64, format!("invalid base64: {}", e))
        }
        other => SffError::corrupt(context, format!("invalid base64: {}", other)),
    })
}

fn build(header: &LatticeHeader, payload: Payload) -> SffResult<Lattice> {
    let mut lattice = Lattice::from_array(header.size, payload)?
        .with_endianness(header.endianness)
        .with_start(header.start);
    lattice.id = header.id;
    Ok(lattice)
}

fn mode_tag(mode: ElementType) -> u8 {
    ElementType::ALL
        .iter()
        .position(|m| *m == mode)
        .map_or(u8::MAX, |i| i as u8)
}
