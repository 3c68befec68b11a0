//! Format adapters
//!
//! One `FormatAdapter` per representation. Adapters translate between the
//! in-memory `Segmentation` and a byte stream; file handling (opening,
//! atomic replacement) is shared through the trait's provided methods.

use crate::config::FormatConfig;
use crate::hff::HffAdapter;
use crate::json::JsonAdapter;
use crate::sff::SffAdapter;
use sffrw_core::{
    IdentifiedCollection, Id, Mesh, PrimaryDescriptor, Segmentation, SffError, SffResult, Shape,
    ShapeRepresentation, ThreeDVolume,
};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Persisted representation of a segmentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Schema-validated XML tree (`.sff`)
    Sff,
    /// HDF5 file (`.hff`, `.h5`, `.hdf5`)
    Hff,
    /// Plain JSON tree (`.json`)
    Json,
}

impl Format {
    /// All formats
    pub const ALL: [Format; 3] = [Format::Sff, Format::Hff, Format::Json];

    /// Short name
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Sff => "sff",
            Format::Hff => "hff",
            Format::Json => "json",
        }
    }

    /// Recognised file extensions, canonical first
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Format::Sff => &["sff", "xml"],
            Format::Hff => &["hff", "h5", "hdf5"],
            Format::Json => &["json"],
        }
    }

    /// Format for an extension, ignoring case
    pub fn from_extension(ext: &str) -> SffResult<Self> {
        let ext = ext.to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.extensions().contains(&ext.as_str()))
            .ok_or_else(|| SffError::UnsupportedFormat(format!("unknown extension '.{}'", ext)))
    }

    /// Format for a path, by extension
    pub fn from_path(path: &Path) -> SffResult<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            SffError::UnsupportedFormat(format!("'{}' has no file extension", path.display()))
        })?;
        Self::from_extension(ext)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reads and writes segmentations in one representation
pub trait FormatAdapter {
    /// Representation handled by this adapter
    fn format(&self) -> Format;

    /// Decode a segmentation from a stream
    fn read_from(&self, reader: &mut dyn Read) -> SffResult<Segmentation>;

    /// Encode a segmentation to a stream.
    ///
    /// Implementations call `Segmentation::validate` before writing.
    fn write_to(&self, segmentation: &Segmentation, writer: &mut dyn Write) -> SffResult<()>;

    /// Load a segmentation from a file
    fn load(&self, path: &Path) -> SffResult<Segmentation> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let segmentation = self.read_from(&mut reader)?;
        info!(
            target: "sffrw::formats",
            path = %path.display(),
            format = %self.format(),
            segments = segmentation.segments.len(),
            lattices = segmentation.lattices.len(),
            "Loaded segmentation"
        );
        Ok(segmentation)
    }

    /// Save a segmentation to a file.
    ///
    /// The file is written to a sibling temporary path and renamed into
    /// place, so an existing file is either fully replaced or untouched.
    /// A model that fails `Segmentation::validate` is rejected before any
    /// file is created.
    fn save(&self, segmentation: &Segmentation, path: &Path) -> SffResult<()> {
        segmentation.validate()?;
        let temp_path = temp_path_for(path);
        let written = write_file(self, segmentation, &temp_path)
            .and_then(|()| fs::rename(&temp_path, path).map_err(SffError::from));
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
        info!(
            target: "sffrw::formats",
            path = %path.display(),
            format = %self.format(),
            segments = segmentation.segments.len(),
            lattices = segmentation.lattices.len(),
            "Saved segmentation"
        );
        Ok(())
    }
}

fn write_file<A: FormatAdapter + ?Sized>(
    adapter: &A,
    segmentation: &Segmentation,
    path: &Path,
) -> SffResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    adapter.write_to(segmentation, &mut writer)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Adapter for `format` configured by `config`
pub fn adapter_for(format: Format, config: &FormatConfig) -> SffResult<Box<dyn FormatAdapter>> {
    Ok(match format {
        Format::Sff => Box::new(SffAdapter::new(config)?),
        Format::Hff => Box::new(HffAdapter::new(config)?),
        Format::Json => Box::new(JsonAdapter::new(config)?),
    })
}

/// Load a file, choosing the adapter by extension, with default settings
pub fn load(path: &Path) -> SffResult<Segmentation> {
    load_with(path, &FormatConfig::default())
}

/// Load a file, choosing the adapter by extension
pub fn load_with(path: &Path, config: &FormatConfig) -> SffResult<Segmentation> {
    adapter_for(Format::from_path(path)?, config)?.load(path)
}

/// Save a file, choosing the adapter by extension, with default settings
pub fn save(segmentation: &Segmentation, path: &Path) -> SffResult<()> {
    save_with(segmentation, path, &FormatConfig::default())
}

/// Save a file, choosing the adapter by extension
pub fn save_with(segmentation: &Segmentation, path: &Path, config: &FormatConfig) -> SffResult<()> {
    adapter_for(Format::from_path(path)?, config)?.save(segmentation, path)
}

// ============================================================================
// Shared load helpers
// ============================================================================

/// Shape representations found on one persisted segment
#[derive(Debug, Default)]
pub(crate) struct RepresentationParts {
    pub meshes: Option<IdentifiedCollection<Mesh>>,
    pub shapes: Option<IdentifiedCollection<Shape>>,
    pub volume: Option<ThreeDVolume>,
}

impl RepresentationParts {
    /// Exactly one representation, or an empty one of the file's kind
    pub fn resolve(
        self,
        segment_id: Id,
        descriptor: PrimaryDescriptor,
    ) -> SffResult<ShapeRepresentation> {
        let mut present = Vec::new();
        if self.meshes.is_some() {
            present.push(PrimaryDescriptor::MeshList.as_str());
        }
        if self.shapes.is_some() {
            present.push(PrimaryDescriptor::ShapePrimitiveList.as_str());
        }
        if self.volume.is_some() {
            present.push(PrimaryDescriptor::ThreeDVolume.as_str());
        }
        if present.len() > 1 {
            return Err(SffError::AmbiguousShapeRepresentation {
                segment_id,
                reason: format!("populates {}", present.join(" and ")),
            });
        }
        if let Some(meshes) = self.meshes {
            return Ok(ShapeRepresentation::Meshes(meshes));
        }
        if let Some(shapes) = self.shapes {
            return Ok(ShapeRepresentation::Shapes(shapes));
        }
        if let Some(volume) = self.volume {
            return Ok(ShapeRepresentation::Volume(volume));
        }
        ShapeRepresentation::empty(descriptor).ok_or_else(|| SffError::AmbiguousShapeRepresentation {
            segment_id,
            reason: format!(
                "no shape representation and primary descriptor is {}",
                descriptor
            ),
        })
    }
}

/// Log dangling references left by a tolerant load
pub(crate) fn warn_dangling(format: Format, segmentation: &Segmentation) {
    let dangling = segmentation.check_referential_integrity();
    if let Some(first) = dangling.first() {
        warn!(
            target: "sffrw::formats",
            format = %format,
            count = dangling.len(),
            first = %first,
            "Loaded segmentation has dangling references"
        );
    }
}
