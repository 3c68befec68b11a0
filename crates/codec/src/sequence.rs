//! Mesh component codec
//!
//! Vertices, normals and triangles are packed like lattice payloads but
//! never compressed. Text formats carry them as base64; HDF5 files
//! store the packed bytes as datasets.

use crate::lattice::decode_base64_text;
use crate::pack::{pack, unpack};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sffrw_core::{ElementType, EncodedSequence, Endianness, SffError, SffResult};

/// Declared shape of a packed sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceHeader {
    /// Element type
    pub mode: ElementType,
    /// Byte order
    pub endianness: Endianness,
    /// Number of triples
    pub num_items: usize,
}

impl SequenceHeader {
    /// Header describing an existing sequence
    pub fn of(sequence: &EncodedSequence) -> Self {
        Self {
            mode: sequence.mode(),
            endianness: sequence.endianness,
            num_items: sequence.num_items(),
        }
    }
}

/// Packed bytes of a sequence
pub fn encode_raw(sequence: &EncodedSequence) -> Vec<u8> {
    pack(sequence.data(), sequence.endianness)
}

/// Base64 text of the packed bytes
pub fn encode_base64(sequence: &EncodedSequence) -> String {
    STANDARD.encode(encode_raw(sequence))
}

/// Unpack bytes and check the triple count
pub fn decode_raw(header: &SequenceHeader, bytes: &[u8], context: &str) -> SffResult<EncodedSequence> {
    let payload = unpack(bytes, header.mode, header.endianness, context)?;
    if payload.len() != header.num_items * 3 {
        return Err(SffError::corrupt(
            context,
            format!(
                "decoded {} values but {} triples were declared",
                payload.len(),
                header.num_items
            ),
        ));
    }
    Ok(EncodedSequence::new(payload)?.with_endianness(header.endianness))
}

/// Base64-decode, then `decode_raw`
pub fn decode_base64(header: &SequenceHeader, text: &str, context: &str) -> SffResult<EncodedSequence> {
    let bytes = decode_base64_text(text, context)?;
    decode_raw(header, &bytes, context)
}
