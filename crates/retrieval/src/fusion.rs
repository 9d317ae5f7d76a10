//! Score normalization and weighted fusion.
//!
//! Each backend's native scores are normalized to [0, 1] within its own
//! result set, anchored at zero so relative magnitudes survive (sets
//! containing negative scores are shifted into range). Candidates are then
//! combined as a weighted sum, with the configured weights renormalized over
//! the backends participating in the call: a document found by only one
//! backend takes that backend's full share and is never diluted by the
//! weight of backends that were skipped or unavailable.

use std::collections::HashMap;

use quorum_core::{BackendKind, BackendScores, SearchResult, SearchWeights};

use crate::backend::BackendHit;

/// One backend's hits after normalization, still in native rank order.
#[derive(Debug, Clone)]
pub struct RankedList {
    pub kind: BackendKind,
    pub hits: Vec<BackendHit>,
}

/// Normalize a backend's native scores to [0, 1] within its own result set.
///
/// Scores are anchored at zero (`s / max`) so a backend's relative
/// magnitudes survive; sets containing negatives fall back to a min-max
/// shift. Degenerate sets (all scores equal to the anchor) normalize to 1.0.
/// The mapping is monotonic, so the backend's own ranking is preserved.
pub fn normalize_scores(hits: &mut [BackendHit]) {
    let Some(first) = hits.first() else { return };
    let mut min = first.score;
    let mut max = first.score;
    for hit in hits.iter() {
        min = min.min(hit.score);
        max = max.max(hit.score);
    }

    let anchor = min.min(0.0);
    let range = max - anchor;
    for hit in hits.iter_mut() {
        hit.score = if range > f64::EPSILON {
            (hit.score - anchor) / range
        } else {
            1.0
        };
    }
}

/// Fuse normalized per-backend rankings into a single candidate list, best
/// first. Weights are renormalized over the kinds present in `lists`; a
/// backend a document does not appear in simply contributes nothing. Exact
/// fused-score ties break by ascending document id so repeated calls against
/// unchanged backend state return identical order.
pub fn fuse(lists: &[RankedList], weights: &SearchWeights) -> Vec<SearchResult> {
    let active_weight: f64 = lists.iter().map(|list| weights.get(list.kind)).sum();
    if active_weight <= f64::EPSILON {
        return Vec::new();
    }

    struct Candidate {
        content: String,
        scores: BackendScores,
        metadata: HashMap<String, String>,
    }

    let mut candidates: HashMap<String, Candidate> = HashMap::new();

    for list in lists {
        if weights.get(list.kind) <= 0.0 {
            continue;
        }
        for hit in &list.hits {
            let entry = candidates
                .entry(hit.document_id.clone())
                .or_insert_with(|| Candidate {
                    content: hit.content.clone(),
                    scores: BackendScores::default(),
                    metadata: HashMap::new(),
                });
            entry.scores.set(list.kind, hit.score);
            if entry.content.is_empty() {
                entry.content = hit.content.clone();
            }
            for (key, value) in &hit.metadata {
                entry.metadata.entry(key.clone()).or_insert(value.clone());
            }
        }
    }

    let mut results: Vec<SearchResult> = candidates
        .into_iter()
        .map(|(document_id, candidate)| {
            let weighted_sum: f64 = BackendKind::all()
                .iter()
                .filter_map(|kind| {
                    candidate
                        .scores
                        .get(*kind)
                        .map(|score| weights.get(*kind) * score)
                })
                .sum();
            SearchResult {
                document_id,
                content: candidate.content,
                scores: candidate.scores,
                fused_score: weighted_sum / active_weight,
                metadata: candidate.metadata,
            }
        })
        .collect();

    results.sort_by(|a, b| {
        b.fused_score
            .partial_cmp(&a.fused_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.document_id.cmp(&b.document_id))
    });

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn list(kind: BackendKind, hits: Vec<(&str, f64)>) -> RankedList {
        let mut hits: Vec<BackendHit> = hits
            .into_iter()
            .map(|(id, score)| BackendHit::new(id, score))
            .collect();
        normalize_scores(&mut hits);
        RankedList { kind, hits }
    }

    #[test]
    fn test_normalize_anchored_at_zero() {
        let mut hits = vec![
            BackendHit::new("a", 10.0),
            BackendHit::new("b", 5.0),
            BackendHit::new("c", 2.0),
        ];
        normalize_scores(&mut hits);
        assert_eq!(hits[0].score, 1.0);
        assert_eq!(hits[1].score, 0.5);
        assert_eq!(hits[2].score, 0.2);
    }

    #[test]
    fn test_normalize_shifts_negative_sets() {
        let mut hits = vec![BackendHit::new("a", 0.5), BackendHit::new("b", -0.5)];
        normalize_scores(&mut hits);
        assert_eq!(hits[0].score, 1.0);
        assert_eq!(hits[1].score, 0.0);
    }

    #[test]
    fn test_normalize_degenerate_sets() {
        let mut single = vec![BackendHit::new("a", 42.0)];
        normalize_scores(&mut single);
        assert_eq!(single[0].score, 1.0);

        let mut zeros = vec![BackendHit::new("a", 0.0), BackendHit::new("b", 0.0)];
        normalize_scores(&mut zeros);
        assert!(zeros.iter().all(|h| h.score == 1.0));
    }

    #[test]
    fn test_cross_backend_support_outranks_single_backend_top_hit() {
        // Vector sees only A; keyword ranks B above A. A's support from two
        // backends outweighs B's single contribution.
        let lists = vec![
            list(BackendKind::Vector, vec![("A", 0.9)]),
            list(BackendKind::Keyword, vec![("A", 0.4), ("B", 0.8)]),
        ];
        let weights = SearchWeights {
            vector: 0.5,
            keyword: 0.5,
            graph: 0.0,
        };

        let results = fuse(&lists, &weights);
        assert_eq!(results[0].document_id, "A");
        assert_eq!(results[1].document_id, "B");
        assert!(results[0].fused_score > results[1].fused_score);
    }

    #[test]
    fn test_single_backend_doc_takes_full_share() {
        // Graph is absent from the call entirely; its weight is renormalized
        // away rather than diluting everyone.
        let lists = vec![
            list(BackendKind::Vector, vec![("A", 1.0)]),
            list(BackendKind::Keyword, vec![("C", 0.7)]),
        ];
        let weights = SearchWeights {
            vector: 0.6,
            keyword: 0.2,
            graph: 0.2,
        };

        let results = fuse(&lists, &weights);
        let c = results.iter().find(|r| r.document_id == "C").unwrap();
        // keyword share of the participating weight: 0.2 / (0.6 + 0.2)
        assert!((c.fused_score - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_tie_breaks_by_ascending_document_id() {
        let lists = vec![list(
            BackendKind::Vector,
            vec![("zeta", 0.5), ("alpha", 0.5), ("mid", 0.5)],
        )];
        let results = fuse(&lists, &SearchWeights::only(BackendKind::Vector));
        let ids: Vec<&str> = results.iter().map(|r| r.document_id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_all_weights_zero_yields_nothing() {
        let lists = vec![list(BackendKind::Graph, vec![("G", 0.9)])];
        let weights = SearchWeights {
            vector: 1.0,
            keyword: 0.0,
            graph: 0.0,
        };
        assert!(fuse(&lists, &weights).is_empty());
    }

    #[test]
    fn test_single_backend_mode_reproduces_native_ranking() {
        let lists = vec![list(
            BackendKind::Keyword,
            vec![("x", 12.0), ("y", 7.5), ("z", 3.0)],
        )];
        let results = fuse(&lists, &SearchWeights::only(BackendKind::Keyword));
        let ids: Vec<&str> = results.iter().map(|r| r.document_id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y", "z"]);
    }

    proptest! {
        #[test]
        fn prop_normalized_scores_in_unit_range(scores in proptest::collection::vec(-100.0f64..100.0, 1..20)) {
            let mut hits: Vec<BackendHit> = scores
                .iter()
                .enumerate()
                .map(|(i, s)| BackendHit::new(format!("doc{}", i), *s))
                .collect();
            normalize_scores(&mut hits);
            for hit in &hits {
                prop_assert!((0.0..=1.0).contains(&hit.score));
            }
        }

        #[test]
        fn prop_normalization_preserves_order(scores in proptest::collection::vec(0.0f64..100.0, 2..20)) {
            let mut hits: Vec<BackendHit> = scores
                .iter()
                .enumerate()
                .map(|(i, s)| BackendHit::new(format!("doc{}", i), *s))
                .collect();
            let before: Vec<f64> = hits.iter().map(|h| h.score).collect();
            normalize_scores(&mut hits);
            for i in 0..before.len() {
                for j in 0..before.len() {
                    if before[i] > before[j] {
                        prop_assert!(hits[i].score >= hits[j].score);
                    }
                }
            }
        }

        #[test]
        fn prop_fused_scores_in_unit_range(
            vector_scores in proptest::collection::vec(0.0f64..10.0, 0..10),
            keyword_scores in proptest::collection::vec(0.0f64..10.0, 0..10),
        ) {
            let lists = vec![
                list(BackendKind::Vector, vector_scores.iter().enumerate().map(|(i, s)| {
                    // overlapping ids so some docs appear in both lists
                    (["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"][i], *s)
                }).collect()),
                list(BackendKind::Keyword, keyword_scores.iter().enumerate().map(|(i, s)| {
                    (["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"][i], *s)
                }).collect()),
            ];
            let results = fuse(&lists, &SearchWeights::default());
            for result in &results {
                prop_assert!((0.0..=1.0).contains(&result.fused_score));
            }
        }
    }
}
