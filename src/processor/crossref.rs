//! Cross-referencing between policies via shared related topics.

use crate::record::PolicyRecord;

/// Another policy that shares subject matter with a target policy.
#[derive(Debug, Clone)]
pub struct CrossReference {
    pub policy: PolicyRecord,
    /// Topics of the target that also appear among the candidate's topics.
    pub common_topics: Vec<String>,
    pub score: usize,
}

/// Policies from `corpus` related to `target` by topic overlap. The target
/// itself is excluded by title equality. Results are sorted by descending
/// overlap count, stable so ties keep corpus order.
pub fn find_cross_references(target: &PolicyRecord, corpus: &[PolicyRecord]) -> Vec<CrossReference> {
    let mut refs: Vec<CrossReference> = corpus
        .iter()
        .filter(|candidate| candidate.title != target.title)
        .filter_map(|candidate| {
            let common = common_topics(target, candidate);
            if common.is_empty() {
                return None;
            }
            let score = common.len();
            Some(CrossReference {
                policy: candidate.clone(),
                common_topics: common,
                score,
            })
        })
        .collect();

    refs.sort_by(|a, b| b.score.cmp(&a.score));
    refs
}

/// Topic overlap is a case-folded substring match in either direction, so
/// "leave" and "parental leave" are counted as common ground.
fn common_topics(target: &PolicyRecord, candidate: &PolicyRecord) -> Vec<String> {
    target
        .related_topics
        .iter()
        .filter(|topic| {
            let topic_lower = topic.to_lowercase();
            candidate.related_topics.iter().any(|other| {
                let other_lower = other.to_lowercase();
                other_lower.contains(&topic_lower) || topic_lower.contains(&other_lower)
            })
        })
        .cloned()
        .collect()
}
