//! Adapter configuration via `sffrw.toml`
//!
//! Controls how lattice payloads are compressed and how text formats are
//! indented. Every field has a default, so an empty file is valid.

use serde::{Deserialize, Serialize};
use sffrw_codec::{Compression, LatticeCodec, DEFAULT_LEVEL};
use sffrw_core::{SffError, SffResult};
use std::path::Path;

/// Config file name looked up next to segmentation files.
pub const CONFIG_FILE_NAME: &str = "sffrw.toml";

/// Format adapter configuration loaded from `sffrw.toml`.
///
/// # Example
///
/// ```toml
/// # Lattice compression: "zlib" (default) or "zstd"
/// compression = "zlib"
/// compression_level = 6
/// json_indent = 2
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormatConfig {
    /// Lattice compression: `"zlib"` or `"zstd"`.
    #[serde(default = "default_compression_str")]
    pub compression: String,
    /// Compression level; clamped to the codec's valid range.
    #[serde(default = "default_compression_level")]
    pub compression_level: i32,
    /// Spaces per indent level in JSON output; 0 writes compact JSON.
    #[serde(default = "default_indent")]
    pub json_indent: usize,
    /// Spaces per indent level in XML output; 0 writes a single line.
    #[serde(default = "default_indent")]
    pub xml_indent: usize,
}

fn default_compression_str() -> String {
    Compression::default().as_str().to_string()
}

fn default_compression_level() -> i32 {
    DEFAULT_LEVEL
}

fn default_indent() -> usize {
    2
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            compression: default_compression_str(),
            compression_level: default_compression_level(),
            json_indent: default_indent(),
            xml_indent: default_indent(),
        }
    }
}

impl FormatConfig {
    /// Use a different lattice compression.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression.as_str().to_string();
        self
    }

    /// Use a different compression level.
    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    /// Parse the compression string.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the string is not `"zlib"` or `"zstd"`.
    pub fn compression(&self) -> SffResult<Compression> {
        self.compression.parse().map_err(|_| {
            SffError::Config(format!(
                "Invalid compression '{}' in {}. Expected \"zlib\" or \"zstd\".",
                self.compression, CONFIG_FILE_NAME
            ))
        })
    }

    /// Lattice codec for these settings.
    pub fn lattice_codec(&self) -> SffResult<LatticeCodec> {
        Ok(LatticeCodec::new(self.compression()?, self.compression_level))
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# sffrw format configuration
#
# Lattice compression: "zlib" (default) or "zstd"
# Files must be read with the compression they were written with.
compression = "zlib"

# Compression level (zlib 0-9, zstd 1-22; out-of-range values are clamped)
compression_level = 6

# Indentation of JSON output in spaces (0 = compact)
json_indent = 2

# Indentation of XML output in spaces (0 = single line)
xml_indent = 2
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> SffResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SffError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: FormatConfig = toml::from_str(&content).map_err(|e| {
            SffError::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.compression()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> SffResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                SffError::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> SffResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SffError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            SffError::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
