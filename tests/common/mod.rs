//! Shared fixtures for the integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]

use std::path::PathBuf;
pub use sffrw::*;
use tempfile::TempDir;

// ============================================================================
// Scratch directories
// ============================================================================

/// Temp directory that hands out file paths by extension
pub struct Scratch {
    pub dir: TempDir,
}

impl Scratch {
    pub fn new() -> Self {
        Scratch {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    /// Path `<dir>/<stem>.<ext>`
    pub fn file(&self, stem: &str, ext: &str) -> PathBuf {
        self.dir.path().join(format!("{}.{}", stem, ext))
    }

    /// Names of every entry in the directory, sorted
    pub fn entries(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dir.path())
            .expect("Failed to list temp dir")
            .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

/// Extension per format, in `Format::ALL` order
pub const EXTENSIONS: [&str; 3] = ["sff", "hff", "json"];

// ============================================================================
// Fixtures
// ============================================================================

/// Segmentation using meshes, with an annotated root and a child
pub fn mesh_segmentation() -> Segmentation {
    let mut seg = Segmentation::new("emd_1014 meshes");
    seg.details = Some("Segmented with Segger".to_string());
    seg.bounding_box = Some(BoundingBox::from_max(64.0, 64.0, 32.0));
    seg.add_software(Software::new("segger", "2.5.3").with_details("threshold 0.5"))
        .unwrap();
    let transform = seg.add_transform(TransformationMatrix::identity()).unwrap();
    seg.add_global_external_reference(ExternalReference::new("EMDB", "https://www.ebi.ac.uk/emdb", "EMD-1014"))
        .unwrap();

    let annotation = BiologicalAnnotation {
        name: Some("ribosome".to_string()),
        description: Some("large subunit".to_string()),
        external_references: IdentifiedCollection::from_items([ExternalReference::new(
            "GO",
            "http://purl.obolibrary.org/obo/GO_0015934",
            "GO:0015934",
        )
        .with_label("large ribosomal subunit")])
        .unwrap(),
        number_of_instances: 2,
    };
    let root = seg
        .add_segment(
            Segment::from_meshes(IdentifiedCollection::from_items([triangle_mesh(transform)]).unwrap())
                .with_annotation(annotation)
                .with_colour(Colour::rgba(0.25, 0.5, 0.75, 1.0)),
        )
        .unwrap();
    seg.add_segment(
        Segment::from_meshes(IdentifiedCollection::from_items([triangle_mesh(transform)]).unwrap())
            .with_parent(root)
            .with_colour(Colour::new(1.0, 0.0, 0.0)),
    )
    .unwrap();
    seg
}

/// Single-triangle mesh with normals
pub fn triangle_mesh(transform_id: Id) -> Mesh {
    let vertices = EncodedSequence::new(vec![0.0f32, 0.0, 0.0, 1.5, 0.0, 0.0, 0.0, 2.25, 0.0]).unwrap();
    let normals = EncodedSequence::new(vec![0.0f32, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]).unwrap();
    let triangles = EncodedSequence::new(vec![0u32, 1, 2]).unwrap();
    Mesh::new(vertices, triangles)
        .with_normals(normals)
        .with_transform(transform_id)
}

/// Segmentation using shape primitives of every kind
pub fn shape_segmentation() -> Segmentation {
    let mut seg = Segmentation::new("primitives");
    let t0 = seg.add_transform(TransformationMatrix::identity()).unwrap();
    let t1 = seg
        .add_transform(
            TransformationMatrix::new(3, 4, vec![2.0, 0.0, 0.0, 10.0, 0.0, 2.0, 0.0, -5.5, 0.0, 0.0, 2.0, 0.125])
                .unwrap(),
        )
        .unwrap();
    let shapes = IdentifiedCollection::from_items([
        Shape::cone(10.0, 2.5, t0),
        Shape::cuboid(1.0, 2.0, 3.0, t1).with_attribute(0.75),
        Shape::cylinder(4.0, 1.0, t0),
        Shape::ellipsoid(3.0, 2.0, 1.0, t1),
    ])
    .unwrap();
    seg.add_segment(Segment::from_shapes(shapes).with_annotation(BiologicalAnnotation::named("primitives")))
        .unwrap();
    seg
}

/// Segmentation with one 2x2x2 `uint8` lattice and two labeled regions
pub fn volume_segmentation() -> Segmentation {
    let mut seg = Segmentation::new("volume");
    let size = VolumeStructure::new(2, 2, 2).unwrap();
    let lattice = seg
        .add_lattice(Lattice::from_array(size, vec![0u8, 1, 1, 0, 2, 2, 0, 1]).unwrap())
        .unwrap();
    let transform = seg.add_transform(TransformationMatrix::identity()).unwrap();
    seg.add_segment(Segment::from_volume(ThreeDVolume::new(lattice, 1.0).with_transform(transform)))
        .unwrap();
    seg.add_segment(Segment::from_volume(ThreeDVolume::new(lattice, 2.0)))
        .unwrap();
    seg
}

/// Larger `float32` big-endian lattice with a non-zero start
pub fn float_lattice(cols: u64, rows: u64, sections: u64) -> Lattice {
    let size = VolumeStructure::new(cols, rows, sections).unwrap();
    let count = size.voxel_count().unwrap();
    let data: Vec<f32> = (0..count).map(|i| (i as f32) * 0.5 - 3.0).collect();
    Lattice::from_array(size, data)
        .unwrap()
        .with_endianness(Endianness::Big)
        .with_start(VolumeIndex::new(-4, 0, 12))
}

/// Every fixture, named
pub fn all_fixtures() -> Vec<(&'static str, Segmentation)> {
    vec![
        ("meshes", mesh_segmentation()),
        ("shapes", shape_segmentation()),
        ("volume", volume_segmentation()),
    ]
}

/// Save then load through the extension's adapter
pub fn round_trip(seg: &Segmentation, scratch: &Scratch, ext: &str) -> Segmentation {
    let path = scratch.file("round_trip", ext);
    save(seg, &path).unwrap_or_else(|e| panic!("save .{ext} failed: {e}"));
    load(&path).unwrap_or_else(|e| panic!("load .{ext} failed: {e}"))
}
