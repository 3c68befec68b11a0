//! Saves replace the target in one step

use crate::common::*;
use std::fs;

#[test]
fn test_no_temporary_file_left_behind() {
    let scratch = Scratch::new();
    for ext in EXTENSIONS {
        save(&mesh_segmentation(), &scratch.file("seg", ext)).unwrap();
    }
    assert_eq!(scratch.entries(), vec!["seg.hff", "seg.json", "seg.sff"]);
}

#[test]
fn test_overwrite_replaces_whole_file() {
    let scratch = Scratch::new();
    for ext in EXTENSIONS {
        let path = scratch.file("overwrite", ext);
        save(&mesh_segmentation(), &path).unwrap();
        save(&Segmentation::new("smaller"), &path).unwrap();
        let back = load(&path).unwrap();
        assert_eq!(back.name, "smaller", ".{ext}");
        assert!(back.segments.is_empty(), ".{ext}");
    }
}

#[test]
fn test_failed_rename_cleans_up() {
    let scratch = Scratch::new();
    let target = scratch.file("occupied", "json");
    fs::create_dir(&target).unwrap();
    fs::write(target.join("keep"), b"x").unwrap();

    let err = save(&shape_segmentation(), &target).unwrap_err();
    assert!(matches!(err, SffError::Io(_)), "{err}");
    assert_eq!(scratch.entries(), vec!["occupied.json"]);
    assert!(target.join("keep").exists());
}
