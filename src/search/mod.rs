// src/search/mod.rs
// C5: Hybrid Searcher - linear fusion of a lexical/rank-based score with
// a cosine-similarity score over the Embedding Index (§4.4 "Hybrid
// search").

use crate::embeddings::EmbeddingIndex;

pub const DEFAULT_KEYWORD_WEIGHT: f32 = 0.4;
pub const DEFAULT_SEMANTIC_WEIGHT: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    Keyword,
    Semantic,
    Hybrid,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct HybridResult {
    pub id: String,
    pub score: f32,
    pub source: ResultSource,
}

/// A caller-supplied keyword/lexical result, already in rank order
/// (best first) - typically `SymbolIndex::search_symbols` results mapped
/// to their stable IDs, but the fusion itself is search-source agnostic.
pub struct KeywordResult {
    pub id: String,
}

/// Fuses `keyword_results` (already ranked) with a fresh semantic
/// top-`2*k` search over `embedding_index`, per §4.4 steps 1-4:
/// 1. rank score `1 - i/(N+1)` times `w_k` per keyword result;
/// 2. vector top-`2k` scored `score * w_s`;
/// 3. merge by ID, summed score wins, source tagged on overlap;
/// 4. return top-k descending.
pub async fn hybrid_search(
    query: &str,
    keyword_results: &[KeywordResult],
    embedding_index: &EmbeddingIndex,
    top_k: usize,
    weight_keyword: f32,
    weight_semantic: f32,
) -> anyhow::Result<Vec<HybridResult>> {
    let n = keyword_results.len();
    let mut fused: std::collections::HashMap<String, (f32, bool, bool)> = std::collections::HashMap::new();

    for (i, kr) in keyword_results.iter().enumerate() {
        let rank_score = 1.0 - (i as f32 / (n as f32 + 1.0));
        let entry = fused.entry(kr.id.clone()).or_insert((0.0, false, false));
        entry.0 += rank_score * weight_keyword;
        entry.1 = true;
    }

    let semantic = embedding_index.search(query, top_k * 2).await?;
    for result in semantic {
        let entry = fused.entry(result.id.clone()).or_insert((0.0, false, false));
        entry.0 += result.score * weight_semantic;
        entry.2 = true;
    }

    let mut out: Vec<HybridResult> = fused
        .into_iter()
        .map(|(id, (score, has_kw, has_sem))| {
            let source = match (has_kw, has_sem) {
                (true, true) => ResultSource::Hybrid,
                (true, false) => ResultSource::Keyword,
                _ => ResultSource::Semantic,
            };
            HybridResult { id, score, source }
        })
        .collect();

    out.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    out.truncate(top_k);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::provider::LocalHashProvider;
    use std::sync::Arc;

    #[tokio::test]
    async fn s6_hybrid_fusion_matches_rank_formula() {
        let index = EmbeddingIndex::new(8, Arc::new(LocalHashProvider::new(8)));
        index.upsert("A".into(), "alpha item".into(), serde_json::json!({})).await.unwrap();
        index.upsert("B".into(), "beta item".into(), serde_json::json!({})).await.unwrap();
        index.upsert("C".into(), "gamma item".into(), serde_json::json!({})).await.unwrap();
        index.upsert("D".into(), "delta item".into(), serde_json::json!({})).await.unwrap();

        let keyword_results =
            vec![KeywordResult { id: "A".into() }, KeywordResult { id: "B".into() }, KeywordResult { id: "C".into() }];

        let results = hybrid_search("alpha", &keyword_results, &index, 4, 0.5, 0.5).await.unwrap();
        assert!(!results.is_empty());
        // A keyword-only result beats a keyword result ranked below it.
        let rank_a = results.iter().position(|r| r.id == "A");
        let rank_c = results.iter().position(|r| r.id == "C");
        if let (Some(ra), Some(rc)) = (rank_a, rank_c) {
            assert!(ra < rc);
        }
    }

    #[test]
    fn rank_score_formula_matches_spec() {
        // N=3, i=0,1,2 -> 1-0/4=0.75, 1-1/4=0.75 wait compute properly
        let n = 3.0f32;
        let scores: Vec<f32> = (0..3).map(|i| 1.0 - (i as f32 / (n + 1.0))).collect();
        assert!((scores[0] - 0.75).abs() < 1e-6);
        assert!((scores[1] - 0.5).abs() < 1e-6);
        assert!((scores[2] - 0.25).abs() < 1e-6);
    }
}
