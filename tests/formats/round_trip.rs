//! Save then load through each adapter

use crate::common::*;

#[test]
fn test_every_fixture_round_trips_in_every_format() {
    let scratch = Scratch::new();
    for (name, seg) in all_fixtures() {
        for ext in EXTENSIONS {
            let back = round_trip(&seg, &scratch, ext);
            assert!(back.approx_eq(&seg), "{name} via .{ext}:\n{back:#?}\n!=\n{seg:#?}");
            assert_eq!(back.primary_descriptor(), seg.primary_descriptor(), "{name} via .{ext}");
        }
    }
}

#[test]
fn test_volume_lattice_values_survive() {
    let scratch = Scratch::new();
    let seg = volume_segmentation();
    for ext in EXTENSIONS {
        let back = round_trip(&seg, &scratch, ext);
        let lattice = back.lattices.get_by_id(0).unwrap();
        assert_eq!(lattice.mode(), ElementType::UInt8, ".{ext}");
        assert_eq!(lattice.size(), VolumeStructure::new(2, 2, 2).unwrap(), ".{ext}");
        assert_eq!(lattice.data(), &Payload::UInt8(vec![0, 1, 1, 0, 2, 2, 0, 1]), ".{ext}");

        let values: Vec<f64> = back
            .segments
            .iter()
            .filter_map(|s| s.representation.volume().map(|v| v.value))
            .collect();
        assert_eq!(values, vec![1.0, 2.0], ".{ext}");
        assert!(values.iter().all(|v| lattice.contains_value(*v)));
    }
}

#[test]
fn test_big_endian_lattice_with_offset() {
    let scratch = Scratch::new();
    let mut seg = Segmentation::new("float lattice");
    let id = seg.add_lattice(float_lattice(5, 4, 3)).unwrap();
    seg.add_segment(Segment::from_volume(ThreeDVolume::new(id, -3.0))).unwrap();
    for ext in EXTENSIONS {
        let back = round_trip(&seg, &scratch, ext);
        let lattice = back.lattices.get_by_id(id).unwrap();
        assert_eq!(lattice, seg.lattices.get_by_id(id).unwrap(), ".{ext}");
        assert_eq!(lattice.endianness, Endianness::Big);
        assert_eq!(lattice.start, VolumeIndex::new(-4, 0, 12));
        assert_eq!(lattice.get(4, 3, 2), Some(26.5));
    }
}

#[test]
fn test_hierarchy_and_annotations_survive() {
    let scratch = Scratch::new();
    let seg = mesh_segmentation();
    for ext in EXTENSIONS {
        let back = round_trip(&seg, &scratch, ext);
        let roots: Vec<Id> = back.roots().filter_map(|s| s.id).collect();
        assert_eq!(roots, vec![1], ".{ext}");
        let children: Vec<Id> = back.children_of(1).filter_map(|s| s.id).collect();
        assert_eq!(children, vec![2], ".{ext}");

        let annotation = back
            .segments
            .get_by_id(1)
            .unwrap()
            .biological_annotation
            .clone()
            .unwrap();
        assert_eq!(annotation.name.as_deref(), Some("ribosome"));
        assert_eq!(annotation.number_of_instances, 2);
        let reference = annotation.external_references.get(0).unwrap();
        assert_eq!(reference.accession, "GO:0015934");
        assert_eq!(reference.label.as_deref(), Some("large ribosomal subunit"));
        assert_eq!(back.software_list.get(0).unwrap().processing_details.as_deref(), Some("threshold 0.5"));
    }
}

#[test]
fn test_empty_segmentation() {
    let scratch = Scratch::new();
    let seg = Segmentation::new("empty");
    for ext in EXTENSIONS {
        let back = round_trip(&seg, &scratch, ext);
        assert_eq!(back.name, "empty");
        assert!(back.segments.is_empty());
        assert_eq!(back.version, SCHEMA_VERSION);
    }
}

#[test]
fn test_extension_aliases() {
    let scratch = Scratch::new();
    let seg = shape_segmentation();
    for ext in ["xml", "h5", "hdf5"] {
        let back = round_trip(&seg, &scratch, ext);
        assert!(back.approx_eq(&seg), ".{ext}");
    }
}

#[test]
fn test_zstd_round_trip_with_matching_config() {
    let scratch = Scratch::new();
    let config = FormatConfig::default().with_compression(Compression::Zstd);
    let seg = volume_segmentation();
    for ext in EXTENSIONS {
        let path = scratch.file("zstd", ext);
        save_with(&seg, &path, &config).unwrap();
        let back = load_with(&path, &config).unwrap();
        assert!(back.approx_eq(&seg), ".{ext}");
    }
}
