use proptest::prelude::*;

/// Strategy for generating street capacities, including the saturating zero
pub fn capacity_strategy() -> impl Strategy<Value = u32> {
    prop_oneof![Just(0u32), 1u32..=200]
}

/// Strategy for generating per-camera predicted car counts (negative predictions included)
pub fn camera_counts_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(-5i64..=500, 0..12)
}

/// Strategy for generating per-camera emergency counts
pub fn emergency_counts_strategy() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(0u32..=4, 0..12)
}

/// Strategy for generating distinct, valid entity ids
pub fn entity_ids_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[a-z][a-z0-9_]{0,11}", 0..60)
        .prop_map(|ids| ids.into_iter().collect())
}

/// Strategy for generating store page sizes
pub fn page_size_strategy() -> impl Strategy<Value = usize> {
    1usize..=25
}
