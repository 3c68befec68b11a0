//! Referential-integrity policy on load

use crate::common::*;
use std::fs;

fn dangling_segmentation() -> Segmentation {
    let mut seg = Segmentation::new("dangling");
    seg.add_transform(TransformationMatrix::identity().with_id(3))
        .unwrap();
    seg.add_segment(Segment::from_volume(ThreeDVolume::new(7, 1.0).with_transform(3)))
        .unwrap();
    seg
}

#[test]
fn test_scenario_reports_only_missing_lattice() {
    let dangling = dangling_segmentation().check_referential_integrity();
    assert_eq!(dangling.len(), 1);
    assert_eq!(dangling[0].segment_id, 1);
    assert_eq!(dangling[0].target_kind, "lattice");
    assert_eq!(dangling[0].target_id, 7);
}

#[test]
fn test_xml_load_rejects_dangling_references() {
    let scratch = Scratch::new();
    let path = scratch.file("dangling", "sff");
    // saving does not check integrity
    save(&dangling_segmentation(), &path).unwrap();
    match load(&path).unwrap_err() {
        SffError::DanglingReference(refs) => {
            assert_eq!(refs.len(), 1);
            assert_eq!(refs[0].target_kind, "lattice");
            assert_eq!(refs[0].target_id, 7);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_binary_and_json_loads_tolerate_dangling_references() {
    let scratch = Scratch::new();
    for ext in ["hff", "json"] {
        let back = round_trip(&dangling_segmentation(), &scratch, ext);
        let dangling = back.check_referential_integrity();
        assert_eq!(dangling.len(), 1, ".{ext}");
        assert!(matches!(back.require_referential_integrity(), Err(SffError::DanglingReference(_))));
    }
}

#[test]
fn test_missing_parent_is_dangling() {
    let scratch = Scratch::new();
    let mut seg = shape_segmentation();
    seg.add_segment(Segment::from_shapes(IdentifiedCollection::new()).with_parent(42))
        .unwrap();
    let path = scratch.file("orphan", "xml");
    save(&seg, &path).unwrap();
    match load(&path).unwrap_err() {
        SffError::DanglingReference(refs) => {
            assert_eq!(refs[0].target_kind, "segment");
            assert_eq!(refs[0].target_id, 42);
        }
        other => panic!("unexpected error: {other}"),
    }

    let json = scratch.file("orphan", "json");
    save(&seg, &json).unwrap();
    assert_eq!(load(&json).unwrap().check_referential_integrity().len(), 1);
}

#[test]
fn test_two_representations_rejected_in_json() {
    let scratch = Scratch::new();
    let path = scratch.file("ambiguous", "json");
    save(&volume_segmentation(), &path).unwrap();

    let mut doc: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    doc["segment_list"][1]["mesh_list"] = serde_json::json!([]);
    fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();

    match load(&path).unwrap_err() {
        SffError::AmbiguousShapeRepresentation { segment_id, .. } => assert_eq!(segment_id, 2),
        other => panic!("unexpected error: {other}"),
    }
}
