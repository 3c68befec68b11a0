//! Annotation and provenance records
//!
//! - `Colour`: RGBA in the unit interval
//! - `ExternalReference`: pointer to an ontology or archive term
//! - `BiologicalAnnotation`: free text, references and instance count
//! - `Software`: a processing step that produced the segmentation
//! - `BoundingBox`: spatial extent

use crate::collection::{identified, IdentifiedCollection};
use crate::error::{SffError, SffResult};
use crate::types::Id;

/// RGBA colour, each channel in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Colour {
    /// Red channel
    pub red: f32,
    /// Green channel
    pub green: f32,
    /// Blue channel
    pub blue: f32,
    /// Opacity
    pub alpha: f32,
}

impl Colour {
    /// Opaque colour
    pub fn new(red: f32, green: f32, blue: f32) -> Self {
        Self::rgba(red, green, blue, 1.0)
    }

    /// Colour with explicit opacity
    pub fn rgba(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Channels as `[r, g, b, a]`
    pub fn to_array(&self) -> [f32; 4] {
        [self.red, self.green, self.blue, self.alpha]
    }

    /// True if every channel lies in `[0, 1]`
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Reject the first channel outside `[0, 1]`; NaN is out of range
    pub fn validate(&self) -> SffResult<()> {
        const CHANNELS: [&str; 4] = ["red", "green", "blue", "alpha"];
        for (channel, value) in CHANNELS.iter().copied().zip(self.to_array()) {
            if !(0.0..=1.0).contains(&value) {
                return Err(SffError::InvalidColour { channel, value });
            }
        }
        Ok(())
    }
}

impl From<[f32; 4]> for Colour {
    fn from(c: [f32; 4]) -> Self {
        Self::rgba(c[0], c[1], c[2], c[3])
    }
}

/// Reference to an external ontology or database term
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExternalReference {
    /// Id within its reference list
    pub id: Option<Id>,
    /// Ontology or archive name (e.g. "ncbitaxon")
    pub resource: String,
    /// IRI or URL of the term
    pub url: String,
    /// Accession within the resource
    pub accession: String,
    /// Short label
    pub label: Option<String>,
    /// Long description
    pub description: Option<String>,
}

identified!(ExternalReference, "external_reference");

impl ExternalReference {
    /// Create a reference without label or description
    pub fn new(
        resource: impl Into<String>,
        url: impl Into<String>,
        accession: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            resource: resource.into(),
            url: url.into(),
            accession: accession.into(),
            label: None,
            description: None,
        }
    }

    /// Set the label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Biological meaning of a segment
#[derive(Debug, Clone, PartialEq)]
pub struct BiologicalAnnotation {
    /// Name of the segment
    pub name: Option<String>,
    /// Free-text description
    pub description: Option<String>,
    /// Ontology terms
    pub external_references: IdentifiedCollection<ExternalReference>,
    /// How many copies of the structure the segment represents
    pub number_of_instances: u32,
}

impl Default for BiologicalAnnotation {
    fn default() -> Self {
        Self {
            name: None,
            description: None,
            external_references: IdentifiedCollection::new(),
            number_of_instances: 1,
        }
    }
}

impl BiologicalAnnotation {
    /// Annotation with a name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Software used to produce the segmentation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Software {
    /// Id within the software list
    pub id: Option<Id>,
    /// Program name
    pub name: String,
    /// Program version
    pub version: Option<String>,
    /// What was done with it
    pub processing_details: Option<String>,
}

identified!(Software, "software");

impl Software {
    /// Create a record
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            version: Some(version.into()),
            processing_details: None,
        }
    }

    /// Set processing details
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.processing_details = Some(details.into());
        self
    }
}

/// Axis-aligned extent of the segmentation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    /// Minimum x
    pub xmin: f64,
    /// Maximum x
    pub xmax: f64,
    /// Minimum y
    pub ymin: f64,
    /// Maximum y
    pub ymax: f64,
    /// Minimum z
    pub zmin: f64,
    /// Maximum z
    pub zmax: f64,
}

impl BoundingBox {
    /// Box from the origin to `(xmax, ymax, zmax)`
    pub fn from_max(xmax: f64, ymax: f64, zmax: f64) -> Self {
        Self {
            xmax,
            ymax,
            zmax,
            ..Self::default()
        }
    }

    /// As `[xmin, xmax, ymin, ymax, zmin, zmax]`
    pub fn to_array(&self) -> [f64; 6] {
        [
            self.xmin, self.xmax, self.ymin, self.ymax, self.zmin, self.zmax,
        ]
    }

    /// From `[xmin, xmax, ymin, ymax, zmin, zmax]`
    pub fn from_array(a: [f64; 6]) -> Self {
        Self {
            xmin: a[0],
            xmax: a[1],
            ymin: a[2],
            ymax: a[3],
            zmin: a[4],
            zmax: a[5],
        }
    }
}
