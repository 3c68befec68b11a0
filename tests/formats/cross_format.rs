//! The same model through different representations

use crate::common::*;

#[test]
fn test_chain_through_every_format() {
    let scratch = Scratch::new();
    for (name, seg) in all_fixtures() {
        let mut current = seg.clone();
        for (step, ext) in ["sff", "hff", "json", "sff"].iter().enumerate() {
            let path = scratch.file(&format!("{name}_{step}"), ext);
            save(&current, &path).unwrap();
            current = load(&path).unwrap();
        }
        assert!(current.approx_eq(&seg), "{name} drifted through the format chain");
    }
}

#[test]
fn test_loads_agree_across_formats() {
    let scratch = Scratch::new();
    let seg = mesh_segmentation();
    let loaded: Vec<Segmentation> = EXTENSIONS
        .iter()
        .map(|ext| round_trip(&seg, &scratch, ext))
        .collect();
    for pair in loaded.windows(2) {
        assert!(pair[0].approx_eq(&pair[1]));
    }
}

#[test]
fn test_adapter_for_every_format() {
    let config = FormatConfig::default();
    let seg = shape_segmentation();
    for format in Format::ALL {
        let adapter = adapter_for(format, &config).unwrap();
        assert_eq!(adapter.format(), format);
        let mut bytes = Vec::new();
        adapter.write_to(&seg, &mut bytes).unwrap();
        let back = adapter.read_from(&mut bytes.as_slice()).unwrap();
        assert!(back.approx_eq(&seg), "{format}");
    }
}

#[test]
fn test_annotations_copied_between_loaded_files() {
    let scratch = Scratch::new();
    let annotated = round_trip(&mesh_segmentation(), &scratch, "json");
    let mut plain = round_trip(&mesh_segmentation(), &scratch, "hff");
    plain.clear_annotations(&[1, 2]).unwrap();
    assert!(plain.segments.iter().all(|s| s.biological_annotation.is_none()));

    plain.copy_annotations_from(&annotated, &[(1, 2)]).unwrap();
    let target = plain.segments.get_by_id(2).unwrap();
    assert_eq!(
        target.biological_annotation.as_ref().and_then(|a| a.name.as_deref()),
        Some("ribosome")
    );
    assert_eq!(target.colour, Some(Colour::rgba(0.25, 0.5, 0.75, 1.0)));

    let path = scratch.file("copied", "sff");
    save(&plain, &path).unwrap();
    assert!(load(&path).unwrap().approx_eq(&plain));
}

#[test]
fn test_global_annotation_merged_between_loaded_files() {
    let scratch = Scratch::new();
    let annotated = round_trip(&mesh_segmentation(), &scratch, "sff");
    let mut plain = mesh_segmentation();
    plain.name = "unannotated".to_string();
    plain.details = None;
    plain.clear_external_references(AnnotationScope::Global).unwrap();
    plain.clear_annotations(&[1, 2]).unwrap();
    let plain = round_trip(&plain, &scratch, "h5");
    assert!(plain.global_external_references.is_empty());

    let mut merged = plain.clone();
    merged.merge_annotation_from(&annotated).unwrap();
    assert_eq!(merged.name, "emd_1014 meshes");
    assert_eq!(merged.details.as_deref(), Some("Segmented with Segger"));
    assert_eq!(merged.global_external_references.len(), 1);
    assert_eq!(merged.software_list.len(), 1);
    assert_eq!(
        merged.segments.get_by_id(1).unwrap().biological_annotation,
        annotated.segments.get_by_id(1).unwrap().biological_annotation
    );

    // Global references onto a segment, then cleared at the source.
    merged
        .copy_external_references(AnnotationScope::Global, AnnotationScope::Segment(2))
        .unwrap();
    merged.clear_external_references(AnnotationScope::Global).unwrap();
    let back = round_trip(&merged, &scratch, "json");
    assert!(back.global_external_references.is_empty());
    let references = &back
        .segments
        .get_by_id(2)
        .unwrap()
        .biological_annotation
        .as_ref()
        .unwrap()
        .external_references;
    assert_eq!(references.len(), 1);
    assert_eq!(references.get(0).unwrap().accession, "EMD-1014");
}
