//! Stored ids survive reloads

use crate::common::*;

fn ids<T: Identified>(items: &IdentifiedCollection<T>) -> Vec<Id> {
    items.ids().collect()
}

#[test]
fn test_sparse_ids_are_kept() {
    let scratch = Scratch::new();
    let mut seg = volume_segmentation();
    seg.remove_segment(1).unwrap();
    seg.add_segment(Segment::from_volume(ThreeDVolume::new(0, 1.0)).with_id(40))
        .unwrap();
    seg.add_lattice(float_lattice(2, 2, 1).with_id(9)).unwrap();
    for ext in EXTENSIONS {
        let back = round_trip(&seg, &scratch, ext);
        assert_eq!(ids(&back.segments), vec![2, 40], ".{ext}");
        assert_eq!(ids(&back.lattices), vec![0, 9], ".{ext}");
        // new entities continue past the highest stored id
        assert_eq!(back.segments.next_id(), 41, ".{ext}");
    }
}

#[test]
fn test_clear_then_reload_reproduces_ids() {
    let scratch = Scratch::new();
    let seg = mesh_segmentation();
    for ext in EXTENSIONS {
        let mut loaded = round_trip(&seg, &scratch, ext);
        let before = ids(&loaded.segments);
        loaded.segments.clear();
        assert!(loaded.segments.is_empty());

        let reloaded = round_trip(&seg, &scratch, ext);
        assert_eq!(ids(&reloaded.segments), before, ".{ext}");
        for segment in reloaded.segments.iter() {
            loaded.segments.append(segment.clone()).unwrap();
        }
        assert_eq!(ids(&loaded.segments), before, ".{ext}");
    }
}

#[test]
fn test_mesh_and_shape_ids_are_per_segment() {
    let scratch = Scratch::new();
    let mut seg = shape_segmentation();
    let again = seg.segments.get(0).unwrap().clone().with_id(7);
    seg.add_segment(again).unwrap();
    for ext in EXTENSIONS {
        let back = round_trip(&seg, &scratch, ext);
        for segment in back.segments.iter() {
            let shapes = segment.representation.shapes().unwrap();
            assert_eq!(ids(shapes), vec![0, 1, 2, 3], ".{ext}");
            assert_eq!(shapes.count_of(ShapeKind::Cuboid), 1);
        }
    }
}
