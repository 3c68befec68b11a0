//! Fields no format can carry are rejected before a file is created

use crate::common::*;
use sffrw::formats::hdf5::{self, GroupView, HDF5_SIGNATURE};
use std::fs;

fn with_out_of_range_colour() -> Segmentation {
    let mut seg = mesh_segmentation();
    seg.segments.get_by_id_mut(2).unwrap().colour = Some(Colour::rgba(0.5, 0.5, 0.5, -0.25));
    seg
}

#[test]
fn test_out_of_range_colour_rejected_in_every_format() {
    let scratch = Scratch::new();
    let seg = with_out_of_range_colour();
    for ext in EXTENSIONS {
        let err = save(&seg, &scratch.file("colour", ext)).unwrap_err();
        assert!(
            matches!(err, SffError::InvalidColour { channel: "alpha", .. }),
            ".{ext}: {err}"
        );
    }
    assert!(scratch.entries().is_empty());
}

#[test]
fn test_out_of_range_colour_rejected_by_stream_writers() {
    let seg = with_out_of_range_colour();
    for format in Format::ALL {
        let adapter = adapter_for(format, &FormatConfig::default()).unwrap();
        let mut bytes = Vec::new();
        let err = adapter.write_to(&seg, &mut bytes).unwrap_err();
        assert!(matches!(err, SffError::InvalidColour { .. }), "{format}: {err}");
        assert!(bytes.is_empty(), "{format}");
    }
}

#[test]
fn test_boundary_colours_are_kept() {
    let scratch = Scratch::new();
    let mut seg = mesh_segmentation();
    seg.segments.get_by_id_mut(1).unwrap().colour = Some(Colour::rgba(0.0, 1.0, 0.0, 0.0));
    for ext in EXTENSIONS {
        let back = round_trip(&seg, &scratch, ext);
        assert_eq!(
            back.segments.get_by_id(1).unwrap().colour,
            Some(Colour::rgba(0.0, 1.0, 0.0, 0.0)),
            ".{ext}"
        );
    }
}

#[test]
fn test_parent_zero_rejected_in_every_format() {
    let scratch = Scratch::new();
    let mut seg = volume_segmentation();
    seg.segments.get_by_id_mut(2).unwrap().parent_id = Some(0);
    for ext in EXTENSIONS {
        let err = save(&seg, &scratch.file("parent", ext)).unwrap_err();
        assert!(
            matches!(err, SffError::InvalidParent { segment_id: Some(2), parent_id: 0 }),
            ".{ext}: {err}"
        );
    }
    assert!(scratch.entries().is_empty());
    assert!(matches!(
        seg.add_segment(Segment::from_volume(ThreeDVolume::new(0, 3.0)).with_parent(0)),
        Err(SffError::InvalidParent { .. })
    ));
}

#[test]
fn test_binary_files_are_hdf5() {
    let scratch = Scratch::new();
    let seg = volume_segmentation();
    for ext in ["hff", "h5", "hdf5"] {
        let path = scratch.file("volume", ext);
        save(&seg, &path).unwrap();
        let bytes = fs::read(&path).unwrap();
        assert_eq!(bytes[..8], HDF5_SIGNATURE, ".{ext}");

        let file = hdf5::open(&path).unwrap();
        let root = GroupView::root(&file).unwrap();
        assert_eq!(root.get_str("name").unwrap(), "volume");
        let lattice = root.group("lattices").unwrap().group("lattice00000000").unwrap();
        assert_eq!(lattice.get_int_array("size").unwrap(), vec![2, 2, 2]);
        assert!(!lattice.dataset("data").unwrap().bytes().unwrap().is_empty());
    }
}
