//! Damaged, mismatched and unreadable inputs

use crate::common::*;
use std::fs;

#[test]
fn test_truncated_binary_file() {
    let scratch = Scratch::new();
    let path = scratch.file("truncated", "hff");
    save(&volume_segmentation(), &path).unwrap();
    let bytes = fs::read(&path).unwrap();
    for len in [0, 5, bytes.len() / 2, bytes.len() - 1] {
        fs::write(&path, &bytes[..len]).unwrap();
        let err = load(&path).unwrap_err();
        assert!(matches!(err, SffError::CorruptPayload { .. }), "len {len}: {err}");
    }
}

#[test]
fn test_flipped_header_byte_in_binary_file() {
    let scratch = Scratch::new();
    let path = scratch.file("flipped", "hff");
    save(&mesh_segmentation(), &path).unwrap();
    let mut bytes = fs::read(&path).unwrap();
    // Link names live in checksummed object headers.
    let at = bytes.windows(8).position(|w| w == b"segments").unwrap();
    bytes[at] ^= 0x40;
    fs::write(&path, &bytes).unwrap();
    let err = load(&path).unwrap_err();
    assert!(matches!(err, SffError::CorruptPayload { .. }), "{err}");
}

#[test]
fn test_flipped_lattice_byte_in_binary_file() {
    let scratch = Scratch::new();
    let path = scratch.file("flipped", "h5");
    save(&volume_segmentation(), &path).unwrap();
    let mut bytes = fs::read(&path).unwrap();
    // The lattice dataset is the last one written.
    let last = bytes.len() - 1;
    bytes[last] ^= 0x40;
    fs::write(&path, &bytes).unwrap();
    let err = load(&path).unwrap_err();
    assert!(matches!(err, SffError::CorruptPayload { .. }), "{err}");
}

#[test]
fn test_compression_mismatch_is_corrupt_payload() {
    let scratch = Scratch::new();
    let zstd = FormatConfig::default().with_compression(Compression::Zstd);
    for ext in EXTENSIONS {
        let path = scratch.file("mismatch", ext);
        save_with(&volume_segmentation(), &path, &zstd).unwrap();
        let err = load(&path).unwrap_err();
        assert!(matches!(err, SffError::CorruptPayload { .. }), ".{ext}: {err}");
    }
}

#[test]
fn test_malformed_text_files() {
    let scratch = Scratch::new();
    let xml = scratch.file("broken", "sff");
    fs::write(&xml, "<segmentation><name>x</segmentation>").unwrap();
    assert!(matches!(load(&xml), Err(SffError::Xml(_))));

    let json = scratch.file("broken", "json");
    fs::write(&json, "{\"name\": \"x\", ").unwrap();
    assert!(matches!(load(&json), Err(SffError::Json(_))));
}

#[test]
fn test_damaged_lattice_text() {
    let scratch = Scratch::new();
    let path = scratch.file("lattice", "sff");
    save(&volume_segmentation(), &path).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    let start = text.rfind("<data>").unwrap() + "<data>".len();
    let end = text[start..].find("</data>").unwrap() + start;
    let damaged = format!("{}AAAA{}", &text[..start], &text[end..]);
    fs::write(&path, damaged).unwrap();
    let err = load(&path).unwrap_err();
    assert!(matches!(err, SffError::CorruptPayload { .. }), "{err}");
}

#[test]
fn test_schema_violation_in_file() {
    let scratch = Scratch::new();
    let path = scratch.file("invalid", "sff");
    save(&mesh_segmentation(), &path).unwrap();
    let text = fs::read_to_string(&path)
        .unwrap()
        .replace("<number_of_instances>2</number_of_instances>", "<number_of_instances>-2</number_of_instances>");
    fs::write(&path, text).unwrap();
    match load(&path).unwrap_err() {
        SffError::SchemaViolation { path, reason } => {
            assert_eq!(
                path,
                "segmentation/segment_list/segment[0]/biological_annotation/number_of_instances"
            );
            assert!(reason.contains("unsigned integer"), "{reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unknown_extension_and_missing_file() {
    let scratch = Scratch::new();
    let seg = shape_segmentation();
    assert!(matches!(
        save(&seg, &scratch.file("seg", "txt")),
        Err(SffError::UnsupportedFormat(_))
    ));
    assert!(scratch.entries().is_empty());
    assert!(matches!(load(&scratch.file("absent", "hff")), Err(SffError::Io(_))));
}
