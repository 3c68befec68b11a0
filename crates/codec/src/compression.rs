//! Lossless payload compression
//!
//! Two algorithms are supported. Both leave a recognisable signature at the
//! start of their output, which lets `decompress` tell a payload compressed
//! with the other algorithm apart from plain corruption.

use sffrw_core::{SffError, SffResult};
use std::fmt;
use std::io::{self, Read, Write};
use std::str::FromStr;

/// zstd frame magic
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Default compression level
pub const DEFAULT_LEVEL: i32 = 6;

/// Compression algorithm applied to packed payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Compression {
    /// zlib (deflate with zlib framing)
    #[default]
    Zlib,
    /// Zstandard
    Zstd,
}

impl Compression {
    /// Config/persisted name
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::Zlib => "zlib",
            Compression::Zstd => "zstd",
        }
    }

    /// Single-byte tag used in binary framing
    pub fn tag(&self) -> u8 {
        match self {
            Compression::Zlib => 0,
            Compression::Zstd => 1,
        }
    }

    /// Inverse of `tag`
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Compression::Zlib),
            1 => Some(Compression::Zstd),
            _ => None,
        }
    }

    /// Guess the algorithm from the leading bytes of a compressed buffer
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.len() >= 4 && data[..4] == ZSTD_MAGIC {
            return Some(Compression::Zstd);
        }
        if data.len() >= 2 {
            let cmf = data[0];
            let flg = data[1];
            if cmf & 0x0F == 8 && (u16::from(cmf) * 256 + u16::from(flg)) % 31 == 0 {
                return Some(Compression::Zlib);
            }
        }
        None
    }

    /// Compress `data` at `level` (clamped to the algorithm's range)
    pub fn compress(&self, data: &[u8], level: i32) -> SffResult<Vec<u8>> {
        let mut out = Vec::new();
        self.compress_into(data, level, &mut out)?;
        Ok(out)
    }

    /// Compress `data` straight into `writer`, returning the bytes written
    pub fn compress_into(&self, data: &[u8], level: i32, writer: &mut dyn Write) -> SffResult<u64> {
        let counter = CountingWriter::new(writer);
        let counter = match self {
            Compression::Zlib => {
                let level = level.clamp(0, 9) as u32;
                let mut encoder =
                    flate2::write::ZlibEncoder::new(counter, flate2::Compression::new(level));
                encoder.write_all(data)?;
                encoder.finish()?
            }
            Compression::Zstd => {
                let mut encoder = zstd::stream::write::Encoder::new(counter, level.clamp(1, 22))?;
                encoder.write_all(data)?;
                encoder.finish()?
            }
        };
        Ok(counter.count)
    }

    /// Decompress `data`, failing with `CorruptPayload` on mismatch or damage
    pub fn decompress(&self, data: &[u8], context: &str) -> SffResult<Vec<u8>> {
        match Compression::detect(data) {
            Some(found) if found != *self => {
                return Err(SffError::corrupt_at(
                    context,
                    0,
                    format!(
                        "payload is {}-compressed but {} was expected",
                        found, self
                    ),
                ));
            }
            None => {
                return Err(SffError::corrupt_at(
                    context,
                    0,
                    format!("missing {} signature", self),
                ));
            }
            Some(_) => {}
        }

        let mut out = Vec::new();
        let result = match self {
            Compression::Zlib => flate2::read::ZlibDecoder::new(data).read_to_end(&mut out),
            Compression::Zstd => {
                zstd::Decoder::new(data).and_then(|mut decoder| decoder.read_to_end(&mut out))
            }
        };
        result.map_err(|e| SffError::corrupt(context, format!("{} decode failed: {}", self, e)))?;
        Ok(out)
    }
}

/// Forwards writes and tallies the bytes that went through
struct CountingWriter<'w> {
    inner: &'w mut dyn Write,
    count: u64,
}

impl<'w> CountingWriter<'w> {
    fn new(inner: &'w mut dyn Write) -> Self {
        Self { inner, count: 0 }
    }
}

impl Write for CountingWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.count += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Compression {
    type Err = SffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zlib" => Ok(Compression::Zlib),
            "zstd" => Ok(Compression::Zstd),
            other => Err(SffError::Config(format!(
                "unknown compression '{}'; expected \"zlib\" or \"zstd\"",
                other
            ))),
        }
    }
}
