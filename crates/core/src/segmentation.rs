//! The segmentation aggregate
//!
//! `Segmentation` owns every collection; cross-references between them are
//! plain ids. Aggregate-level mutations delegate to the collections, and
//! the annotation batch operations are all-or-nothing: every pair is
//! validated before anything is written.

use crate::annotation::{BiologicalAnnotation, BoundingBox, ExternalReference, Software};
use crate::collection::IdentifiedCollection;
use crate::error::{SffError, SffResult};
use crate::geometry::PrimaryDescriptor;
use crate::lattice::Lattice;
use crate::segment::Segment;
use crate::transform::TransformationMatrix;
use crate::types::Id;
use tracing::debug;

/// Schema version written by this library
pub const SCHEMA_VERSION: &str = "0.8.0.dev1";

/// Which external reference list an annotation operation acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationScope {
    /// The segmentation's global external references
    Global,
    /// The external references of one segment's biological annotation
    Segment(Id),
}

/// Root aggregate of a segmentation file
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    /// Name of the segmentation
    pub name: String,
    /// Schema version
    pub version: String,
    /// Free-text details
    pub details: Option<String>,
    /// Spatial extent
    pub bounding_box: Option<BoundingBox>,
    /// Provenance
    pub software_list: IdentifiedCollection<Software>,
    /// Transforms referenced by meshes, shapes and volumes
    pub transforms: IdentifiedCollection<TransformationMatrix>,
    /// References annotating the segmentation as a whole
    pub global_external_references: IdentifiedCollection<ExternalReference>,
    /// Segments
    pub segments: IdentifiedCollection<Segment>,
    /// Lattices referenced by volumes
    pub lattices: IdentifiedCollection<Lattice>,
}

impl Default for Segmentation {
    fn default() -> Self {
        Self::new("")
    }
}

impl Segmentation {
    /// Empty segmentation at the current schema version
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: SCHEMA_VERSION.to_string(),
            details: None,
            bounding_box: None,
            software_list: IdentifiedCollection::new(),
            transforms: IdentifiedCollection::new(),
            global_external_references: IdentifiedCollection::new(),
            segments: IdentifiedCollection::new(),
            lattices: IdentifiedCollection::new(),
        }
    }

    /// Representation used by the first segment; `mesh_list` when empty
    pub fn primary_descriptor(&self) -> PrimaryDescriptor {
        self.segments
            .get(0)
            .map(|s| s.representation.descriptor())
            .unwrap_or_default()
    }

    // ========================================================================
    // Aggregate mutations
    // ========================================================================

    /// Add a segment, returning its id.
    ///
    /// Fails with `InvalidColour` or `InvalidParent` if the segment could not
    /// be saved in every format.
    pub fn add_segment(&mut self, segment: Segment) -> SffResult<Id> {
        segment.validate()?;
        self.segments.append(segment)
    }

    /// Remove a segment by id
    pub fn remove_segment(&mut self, id: Id) -> SffResult<Segment> {
        self.segments.remove_by_id(id)
    }

    /// Add a lattice, returning its id
    pub fn add_lattice(&mut self, lattice: Lattice) -> SffResult<Id> {
        self.lattices.append(lattice)
    }

    /// Remove a lattice by id
    pub fn remove_lattice(&mut self, id: Id) -> SffResult<Lattice> {
        self.lattices.remove_by_id(id)
    }

    /// Add a transform, returning its id
    pub fn add_transform(&mut self, transform: TransformationMatrix) -> SffResult<Id> {
        self.transforms.append(transform)
    }

    /// Remove a transform by id
    pub fn remove_transform(&mut self, id: Id) -> SffResult<TransformationMatrix> {
        self.transforms.remove_by_id(id)
    }

    /// Add a global external reference, returning its id
    pub fn add_global_external_reference(&mut self, reference: ExternalReference) -> SffResult<Id> {
        self.global_external_references.append(reference)
    }

    /// Remove a global external reference by id
    pub fn remove_global_external_reference(&mut self, id: Id) -> SffResult<ExternalReference> {
        self.global_external_references.remove_by_id(id)
    }

    /// Add a software record, returning its id
    pub fn add_software(&mut self, software: Software) -> SffResult<Id> {
        self.software_list.append(software)
    }

    /// Check everything a save must be able to persist.
    ///
    /// Adapters call this before writing a single byte, so a model that
    /// one format would reject is rejected by all of them.
    pub fn validate(&self) -> SffResult<()> {
        for segment in self.segments.iter() {
            segment.validate()?;
        }
        Ok(())
    }

    // ========================================================================
    // Segment tree
    // ========================================================================

    /// Segments without a parent, in order
    pub fn roots(&self) -> impl Iterator<Item = &Segment> + '_ {
        self.segments.iter().filter(|s| s.is_root())
    }

    /// Direct children of `parent_id`, in order
    pub fn children_of(&self, parent_id: Id) -> impl Iterator<Item = &Segment> + '_ {
        self.segments
            .iter()
            .filter(move |s| s.parent_id == Some(parent_id))
    }

    // ========================================================================
    // Annotation batches
    // ========================================================================

    /// Copy annotation and colour from `other`'s segments onto ours.
    ///
    /// Each pair is `(source_id in other, target_id in self)`. Geometry is
    /// untouched. If any id is missing, nothing is applied and every failure
    /// is returned in `AnnotationBatch`.
    pub fn copy_annotations_from(&mut self, other: &Segmentation, pairs: &[(Id, Id)]) -> SffResult<()> {
        self.check_pairs(other, pairs)?;
        for &(source_id, target_id) in pairs {
            let source = other.segments.get_by_id(source_id)?;
            let target = self.segments.get_by_id_mut(target_id)?;
            target.biological_annotation = source.biological_annotation.clone();
            target.colour = source.colour;
        }
        debug!(target: "sffrw::model", pairs = pairs.len(), "Copied annotations");
        Ok(())
    }

    /// Merge annotation and colour from `other`'s segments into ours.
    ///
    /// Like `copy_annotations_from`, except external references are
    /// appended (with fresh ids, no dedup) rather than replaced. Scalar
    /// fields present on the source overwrite the target.
    pub fn merge_annotations_from(&mut self, other: &Segmentation, pairs: &[(Id, Id)]) -> SffResult<()> {
        self.check_pairs(other, pairs)?;
        for &(source_id, target_id) in pairs {
            let source = other.segments.get_by_id(source_id)?;
            let target = self.segments.get_by_id_mut(target_id)?;
            if let Some(incoming) = &source.biological_annotation {
                let annotation = target
                    .biological_annotation
                    .get_or_insert_with(BiologicalAnnotation::default);
                merge_annotation(annotation, incoming)?;
            }
            if source.colour.is_some() {
                target.colour = source.colour;
            }
        }
        debug!(target: "sffrw::model", pairs = pairs.len(), "Merged annotations");
        Ok(())
    }

    /// Reset annotation and colour of the given segments.
    ///
    /// All-or-nothing like the other batch operations.
    pub fn clear_annotations(&mut self, segment_ids: &[Id]) -> SffResult<()> {
        let failures: Vec<SffError> = segment_ids
            .iter()
            .filter(|id| !self.segments.contains_id(**id))
            .map(|id| SffError::not_found("segment", *id))
            .collect();
        if !failures.is_empty() {
            return Err(SffError::AnnotationBatch { failures });
        }
        for &id in segment_ids {
            let segment = self.segments.get_by_id_mut(id)?;
            segment.biological_annotation = None;
            segment.colour = None;
        }
        Ok(())
    }

    /// Append copies of the external references of `from` to `to`.
    ///
    /// Copies get fresh ids in the target list. A target segment without an
    /// annotation gets a default one first.
    pub fn copy_external_references(&mut self, from: AnnotationScope, to: AnnotationScope) -> SffResult<()> {
        let copies = self.reference_copies(from)?;
        let target = self.references_mut(to)?;
        for mut reference in copies {
            reference.id = None;
            target.append(reference)?;
        }
        debug!(target: "sffrw::model", ?from, ?to, "Copied external references");
        Ok(())
    }

    /// Drop every external reference in `scope`
    pub fn clear_external_references(&mut self, scope: AnnotationScope) -> SffResult<()> {
        match scope {
            AnnotationScope::Global => self.global_external_references.clear(),
            AnnotationScope::Segment(id) => {
                let segment = self.segments.get_by_id_mut(id)?;
                if let Some(annotation) = &mut segment.biological_annotation {
                    annotation.external_references.clear();
                }
            }
        }
        debug!(target: "sffrw::model", ?scope, "Cleared external references");
        Ok(())
    }

    /// Take `other`'s global metadata and per-segment annotations.
    ///
    /// Name, details, software and global references are replaced by
    /// `other`'s. Every segment here takes the annotation of the segment
    /// with the same id in `other`. If any of our segment ids is missing
    /// from `other`, nothing is applied.
    pub fn merge_annotation_from(&mut self, other: &Segmentation) -> SffResult<()> {
        let failures: Vec<SffError> = self
            .segments
            .ids()
            .filter(|id| !other.segments.contains_id(*id))
            .map(|id| SffError::not_found("segment", id))
            .collect();
        if !failures.is_empty() {
            return Err(SffError::AnnotationBatch { failures });
        }
        self.name = other.name.clone();
        self.details = other.details.clone();
        self.software_list = other.software_list.clone();
        self.global_external_references = other.global_external_references.clone();
        let ids: Vec<Id> = self.segments.ids().collect();
        for id in &ids {
            let source = other.segments.get_by_id(*id)?;
            self.segments.get_by_id_mut(*id)?.biological_annotation =
                source.biological_annotation.clone();
        }
        debug!(target: "sffrw::model", segments = ids.len(), "Merged annotation");
        Ok(())
    }

    fn reference_copies(&self, scope: AnnotationScope) -> SffResult<Vec<ExternalReference>> {
        let references = match scope {
            AnnotationScope::Global => Some(&self.global_external_references),
            AnnotationScope::Segment(id) => self
                .segments
                .get_by_id(id)?
                .biological_annotation
                .as_ref()
                .map(|annotation| &annotation.external_references),
        };
        Ok(references
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn references_mut(&mut self, scope: AnnotationScope) -> SffResult<&mut IdentifiedCollection<ExternalReference>> {
        Ok(match scope {
            AnnotationScope::Global => &mut self.global_external_references,
            AnnotationScope::Segment(id) => {
                &mut self
                    .segments
                    .get_by_id_mut(id)?
                    .biological_annotation
                    .get_or_insert_with(BiologicalAnnotation::default)
                    .external_references
            }
        })
    }

    fn check_pairs(&self, other: &Segmentation, pairs: &[(Id, Id)]) -> SffResult<()> {
        let mut failures = Vec::new();
        for &(source_id, target_id) in pairs {
            if !other.segments.contains_id(source_id) {
                failures.push(SffError::not_found("segment", source_id));
            }
            if !self.segments.contains_id(target_id) {
                failures.push(SffError::not_found("segment", target_id));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(SffError::AnnotationBatch { failures })
        }
    }
}

fn merge_annotation(into: &mut BiologicalAnnotation, from: &BiologicalAnnotation) -> SffResult<()> {
    if from.name.is_some() {
        into.name = from.name.clone();
    }
    if from.description.is_some() {
        into.description = from.description.clone();
    }
    into.number_of_instances = from.number_of_instances;
    for reference in from.external_references.iter() {
        let mut reference = reference.clone();
        reference.id = None;
        into.external_references.append(reference)?;
    }
    Ok(())
}
