//! Randomized save/load cycles

use crate::common::*;
use proptest::prelude::*;

fn lattice_strategy() -> impl Strategy<Value = Lattice> {
    (1u64..4, 1u64..4, 1u64..4, any::<bool>()).prop_flat_map(|(cols, rows, sections, big)| {
        let count = (cols * rows * sections) as usize;
        prop::collection::vec(any::<u16>(), count).prop_map(move |data| {
            let size = VolumeStructure::new(cols, rows, sections).unwrap();
            let endianness = if big { Endianness::Big } else { Endianness::Little };
            Lattice::from_array(size, data).unwrap().with_endianness(endianness)
        })
    })
}

fn colour_strategy() -> impl Strategy<Value = Option<Colour>> {
    prop::option::of((0.0f32..=1.0, 0.0f32..=1.0, 0.0f32..=1.0, 0.0f32..=1.0))
        .prop_map(|c| c.map(|(r, g, b, a)| Colour::rgba(r, g, b, a)))
}

fn volume_strategy() -> impl Strategy<Value = Segmentation> {
    (
        "[a-zA-Z0-9_.-]{0,20}",
        lattice_strategy(),
        prop::collection::vec((colour_strategy(), -1.0e6f64..1.0e6), 1..5),
    )
        .prop_map(|(name, lattice, segments)| {
            let mut seg = Segmentation::new(name);
            let lattice_id = seg.add_lattice(lattice).unwrap();
            let mut parent = None;
            for (colour, value) in segments {
                let mut segment = Segment::from_volume(ThreeDVolume::new(lattice_id, value));
                segment.colour = colour;
                segment.parent_id = parent;
                parent = Some(seg.add_segment(segment).unwrap());
            }
            seg
        })
}

fn mesh_strategy() -> impl Strategy<Value = Segmentation> {
    prop::collection::vec(
        (
            prop::collection::vec(-1.0e3f32..1.0e3, 1..6),
            prop::collection::vec(any::<u32>(), 1..6),
        ),
        0..4,
    )
    .prop_map(|meshes| {
        let mut seg = Segmentation::new("meshes");
        let items = meshes.into_iter().map(|(points, corners)| {
            let vertices: Vec<f32> = points.iter().flat_map(|p| [*p, -p, p * 0.5]).collect();
            let triangles: Vec<u32> = corners.iter().flat_map(|c| [*c, c / 2, c / 3]).collect();
            Mesh::new(
                EncodedSequence::new(vertices).unwrap(),
                EncodedSequence::new(triangles).unwrap(),
            )
        });
        seg.add_segment(Segment::from_meshes(IdentifiedCollection::from_items(items).unwrap()))
            .unwrap();
        seg
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_volume_segmentations_round_trip(seg in volume_strategy()) {
        let scratch = Scratch::new();
        for ext in EXTENSIONS {
            let back = round_trip(&seg, &scratch, ext);
            prop_assert!(back.approx_eq(&seg), ".{}", ext);
            prop_assert_eq!(back.lattices.get(0), seg.lattices.get(0));
        }
    }

    #[test]
    fn test_mesh_segmentations_round_trip(seg in mesh_strategy()) {
        let scratch = Scratch::new();
        for ext in EXTENSIONS {
            let back = round_trip(&seg, &scratch, ext);
            prop_assert_eq!(&back.segments, &seg.segments);
        }
    }
}
