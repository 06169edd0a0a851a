//! Relevance gate.
//!
//! Decides which retrieved documents are usable context for a turn. The
//! gate is authoritative: it re-applies `min_score` and `top_k` even when
//! the search backend already filtered upstream.

use crate::types::RetrievedDocument;
use kbchat_core::AppResult;

/// Keep the highest-scoring documents that clear `min_score`.
///
/// At most `top_k` documents are returned, sorted by descending score. The
/// sort is stable, so ties keep the order the index returned them in and
/// already-sorted input is only truncated.
pub fn evaluate(
    documents: Vec<RetrievedDocument>,
    top_k: usize,
    min_score: f32,
) -> Vec<RetrievedDocument> {
    let received = documents.len();

    // NaN scores fail this comparison and are dropped here.
    let mut accepted: Vec<RetrievedDocument> = documents
        .into_iter()
        .filter(|doc| doc.score >= min_score)
        .collect();

    accepted.sort_by(|a, b| b.score.total_cmp(&a.score));
    accepted.truncate(top_k);

    tracing::debug!(
        received,
        accepted = accepted.len(),
        top_k,
        min_score,
        "Relevance gate evaluated search results"
    );

    accepted
}

/// Gate the outcome of a search call.
///
/// A failed search is logged and treated exactly like "nothing relevant",
/// so the turn falls back to general knowledge.
pub fn evaluate_outcome(
    outcome: AppResult<Vec<RetrievedDocument>>,
    top_k: usize,
    min_score: f32,
) -> Vec<RetrievedDocument> {
    match outcome {
        Ok(documents) => evaluate(documents, top_k, min_score),
        Err(e) => {
            tracing::warn!("Search failed, answering without retrieved context: {}", e);
            Vec::new()
        }
    }
}
