//! Topic-overlap heuristic against recent posts.
//!
//! The result is advisory: a post flagged as too similar is still published.

/// How many of the most recent posts are compared.
pub const RECENT_WINDOW: usize = 3;

/// Overlap ratio above which a post counts as too similar.
pub const SIMILARITY_THRESHOLD: f64 = 0.5;

/// Share of `new_topics` that match some topic in `old_topics`, where two
/// topics match if either contains the other. Empty old topics never match.
pub fn overlap_ratio(new_topics: &[String], old_topics: &[String]) -> f64 {
    let overlapping = new_topics
        .iter()
        .filter(|topic| {
            old_topics
                .iter()
                .filter(|old| !old.is_empty())
                .any(|old| old.contains(topic.as_str()) || topic.contains(old.as_str()))
        })
        .count();

    overlapping as f64 / new_topics.len().max(1) as f64
}

/// Returns `true` when the new topics are varied enough compared to the last
/// [`RECENT_WINDOW`] topic lists in `history` (oldest first).
pub fn check_variety(new_topics: &[String], history: &[&[String]]) -> bool {
    let start = history.len().saturating_sub(RECENT_WINDOW);

    for old_topics in &history[start..] {
        let overlap = overlap_ratio(new_topics, old_topics);
        if overlap > SIMILARITY_THRESHOLD {
            tracing::warn!(
                new_topics = ?new_topics,
                old_topics = ?old_topics,
                overlap,
                "Post too similar to recent post"
            );
            return false;
        }
    }

    true
}
