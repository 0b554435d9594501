//! Property-based tests for sequences of plane cuts.
//!
//! Every plane keeps the origin strictly inside, so no sequence can empty the
//! cell and every cut must succeed.

#![allow(clippy::unwrap_used)]

mod common;

use facets::math::Vector3;
use facets::NeighborCell;
use proptest::prelude::*;

/// A plane `n·v <= rs / 2` with `rs > 0`.
fn plane() -> impl Strategy<Value = (Vector3, f64)> {
    (
        prop::array::uniform3(-1.0..1.0f64)
            .prop_map(Vector3::from)
            .prop_filter("normal must not vanish", |n| n.norm() > 0.1),
        0.05..3.0f64,
    )
}

fn planes() -> impl Strategy<Value = Vec<(Vector3, f64)>> {
    prop::collection::vec(plane(), 1..40)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: V - E + F = 2 after every cut.
    #[test]
    fn prop_euler_relation_holds(sequence in planes()) {
        let mut cell = common::cube();
        for (normal, rs) in sequence {
            cell.plane(normal, rs).unwrap();
            prop_assert_eq!(cell.euler_characteristic(), 2);
        }
    }

    /// Property: adjacency stays symmetric and free of duplicates.
    #[test]
    fn prop_relations_hold(sequence in planes()) {
        let mut cell = common::cube();
        for (normal, rs) in sequence {
            cell.plane(normal, rs).unwrap();
            prop_assert!(cell.check_relations().is_ok());
            prop_assert!(cell.check_duplicates().is_ok());
        }
    }

    /// Property: volume never increases and stays positive.
    #[test]
    fn prop_volume_is_monotone(sequence in planes()) {
        let mut cell = common::cube();
        let mut previous = cell.volume();
        for (normal, rs) in sequence {
            let cut = cell.plane(normal, rs).unwrap();
            let volume = cell.volume();
            prop_assert!(volume <= previous + 1e-12);
            prop_assert!(volume > 0.0);
            if !cut {
                prop_assert!((volume - previous).abs() <= 1e-12);
            }
            previous = volume;
        }
    }

    /// Property: every kept vertex satisfies every applied plane.
    #[test]
    fn prop_vertices_satisfy_all_planes(sequence in planes()) {
        let mut cell = common::cube();
        for (normal, rs) in &sequence {
            cell.plane(*normal, *rs).unwrap();
        }
        for p in cell.vertex_positions() {
            for (normal, rs) in &sequence {
                prop_assert!(normal.dot(&p.coords) <= 0.5 * rs + 1e-9);
            }
        }
    }

    /// Property: every face of a neighbor cell carries one id, and the ids of
    /// faces that survive are among those applied.
    #[test]
    fn prop_face_ids_are_consistent(sequence in planes()) {
        let mut cell = NeighborCell::new();
        cell.init_box(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0).unwrap();
        for (id, (normal, rs)) in (1..).zip(&sequence) {
            cell.nplane(*normal, *rs, id).unwrap();
        }
        prop_assert!(cell.check_facets().is_ok());
        let applied = i32::try_from(sequence.len()).unwrap();
        for id in cell.neighbors() {
            prop_assert!((-6..=-1).contains(&id) || (1..=applied).contains(&id));
        }
        prop_assert_eq!(cell.neighbors().len(), cell.face_count());
    }
}
