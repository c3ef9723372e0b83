//! Reciprocal Rank Fusion (spec §4.4 step 2): combine a dense ranking
//! and a sparse ranking into one score per candidate, without needing
//! the two rankings' raw scores to be on comparable scales.

use std::collections::HashMap;

use moduly_core::ChunkId;

/// RRF's smoothing constant (spec §4.4: "constant `c=60`"), matching
/// the teacher's `_rrf_fusion(..., k=60)`.
pub const RRF_CONSTANT: f32 = 60.0;

/// Fuse a dense ranking and a sparse ranking for one query variant.
///
/// Each list is assumed already sorted best-first; rank is each
/// candidate's zero-based position. A candidate present in both lists
/// accumulates both contributions.
#[must_use]
pub fn fuse(
    dense: &[(ChunkId, f32)],
    sparse: &[(ChunkId, f32)],
    c: f32,
) -> HashMap<ChunkId, f32> {
    let mut fused: HashMap<ChunkId, f32> = HashMap::new();
    for (rank, (chunk_id, _score)) in dense.iter().enumerate() {
        *fused.entry(*chunk_id).or_insert(0.0) += 1.0 / (c + rank as f32 + 1.0);
    }
    for (rank, (chunk_id, _score)) in sparse.iter().enumerate() {
        *fused.entry(*chunk_id).or_insert(0.0) += 1.0 / (c + rank as f32 + 1.0);
    }
    fused
}

/// Merge per-variant fused-score maps (spec §4.4 step 3), keeping the
/// maximum score any variant assigned a candidate.
#[must_use]
pub fn merge_max(variants: impl IntoIterator<Item = HashMap<ChunkId, f32>>) -> HashMap<ChunkId, f32> {
    let mut merged: HashMap<ChunkId, f32> = HashMap::new();
    for variant in variants {
        for (chunk_id, score) in variant {
            let entry = merged.entry(chunk_id).or_insert(score);
            if score > *entry {
                *entry = score;
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn candidate_in_both_lists_accumulates_both_contributions() {
        let a = ChunkId::v4();
        let b = ChunkId::v4();
        let dense = vec![(a, 0.9), (b, 0.5)];
        let sparse = vec![(a, 5.0)];
        let fused = fuse(&dense, &sparse, RRF_CONSTANT);
        let expected_a = 1.0 / (RRF_CONSTANT + 1.0) + 1.0 / (RRF_CONSTANT + 1.0);
        let expected_b = 1.0 / (RRF_CONSTANT + 2.0);
        assert!((fused[&a] - expected_a).abs() < 1e-6);
        assert!((fused[&b] - expected_b).abs() < 1e-6);
    }

    #[test]
    fn top_rank_scores_higher_than_lower_rank() {
        let a = ChunkId::v4();
        let b = ChunkId::v4();
        let fused = fuse(&[(a, 1.0), (b, 0.9)], &[], RRF_CONSTANT);
        assert!(fused[&a] > fused[&b]);
    }

    #[test]
    fn merge_max_keeps_the_higher_variant_score() {
        let a = ChunkId::v4();
        let mut v1 = HashMap::new();
        v1.insert(a, 0.2);
        let mut v2 = HashMap::new();
        v2.insert(a, 0.8);
        let merged = merge_max([v1, v2]);
        assert_eq!(merged[&a], 0.8);
    }

    #[test]
    fn merge_max_unions_candidates_present_in_only_one_variant() {
        let a = ChunkId::v4();
        let b = ChunkId::v4();
        let mut v1 = HashMap::new();
        v1.insert(a, 0.2);
        let mut v2 = HashMap::new();
        v2.insert(b, 0.4);
        let merged = merge_max([v1, v2]);
        assert_eq!(merged.len(), 2);
    }
}
