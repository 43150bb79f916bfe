//! Lexical relevance ranking and confidence
//!
//! A pure substring-overlap heuristic, not a statistical model: scores are
//! match counts and must not be read as probabilities. The constants are
//! empirical and kept overridable rather than re-derived.

use crate::record::{PolicyRecord, RankedPolicy};

/// Scoring constants. The defaults are the tuned values the engine ships
/// with; treat them as knobs, not laws.
#[derive(Debug, Clone)]
pub struct RankingWeights {
    /// Added once per question word found in the combined lexical field.
    pub word_match: u32,
    /// Added when the title contains the head of the question.
    pub title_bonus: u32,
    /// Added per related topic appearing in the question.
    pub topic_bonus: u32,
    /// How many leading question characters the title bonus compares.
    pub title_prefix_chars: usize,
    /// Question words at or under this length are ignored.
    pub min_word_chars: usize,
    /// Normalization divisor for confidence.
    pub confidence_divisor: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            word_match: 1,
            title_bonus: 5,
            topic_bonus: 2,
            title_prefix_chars: 20,
            min_word_chars: 2,
            confidence_divisor: 20.0,
        }
    }
}

/// Rank `corpus` against `question`. Records scoring zero are dropped; the
/// rest are sorted non-increasing by score, stable so equal scores keep
/// input order.
pub fn find_relevant_policies(
    question: &str,
    corpus: &[PolicyRecord],
    weights: &RankingWeights,
) -> Vec<RankedPolicy> {
    let question_lower = question.to_lowercase();
    let question_words: Vec<&str> = question_lower
        .split_whitespace()
        .filter(|w| w.chars().count() > weights.min_word_chars)
        .collect();
    let question_head: String = question_lower
        .chars()
        .take(weights.title_prefix_chars)
        .collect();

    let mut ranked: Vec<RankedPolicy> = corpus
        .iter()
        .filter_map(|record| {
            let score = score_record(record, &question_lower, &question_words, &question_head, weights);
            (score > 0).then(|| RankedPolicy {
                record: record.clone(),
                score,
            })
        })
        .collect();

    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}

fn score_record(
    record: &PolicyRecord,
    question_lower: &str,
    question_words: &[&str],
    question_head: &str,
    weights: &RankingWeights,
) -> u32 {
    let field = format!(
        "{} {} {}",
        record.title,
        record.summary,
        record.key_points.join(" ")
    )
    .to_lowercase();

    let mut score = 0;

    for word in question_words {
        if field.contains(word) {
            score += weights.word_match;
        }
    }

    if !question_head.is_empty() && record.title.to_lowercase().contains(question_head) {
        score += weights.title_bonus;
    }

    for topic in &record.related_topics {
        if !topic.is_empty() && question_lower.contains(&topic.to_lowercase()) {
            score += weights.topic_bonus;
        }
    }

    score
}

/// Confidence over a ranked candidate list: 0 when empty, otherwise
/// `min(1, (max + mean) / divisor)`.
pub fn calculate_confidence(ranked: &[RankedPolicy], weights: &RankingWeights) -> f64 {
    if ranked.is_empty() {
        return 0.0;
    }

    let max = ranked.iter().map(|r| r.score).max().unwrap_or(0) as f64;
    let mean = ranked.iter().map(|r| r.score as f64).sum::<f64>() / ranked.len() as f64;

    ((max + mean) / weights.confidence_divisor).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::EnrichmentSource;
    use chrono::Utc;

    fn record(title: &str, summary: &str, topics: &[&str]) -> PolicyRecord {
        PolicyRecord {
            title: title.into(),
            department: "General".into(),
            content: String::new(),
            summary: summary.into(),
            key_points: vec![],
            related_topics: topics.iter().map(|t| t.to_string()).collect(),
            last_processed: Utc::now(),
            summary_source: EnrichmentSource::Heuristic,
            key_points_source: EnrichmentSource::Heuristic,
            topics_source: EnrichmentSource::Heuristic,
        }
    }

    #[test]
    fn only_matching_record_is_returned() {
        let corpus = vec![
            record("Vacation Policy", "Employees get 15 days PTO annually.", &[]),
            record("Dress Code", "Business casual on weekdays.", &[]),
        ];
        // No query word may be a substring of the Dress Code record
        // ("days" would hit "weekdays").
        let ranked = find_relevant_policies("policy about pto allowance", &corpus, &RankingWeights::default());
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].record.title, "Vacation Policy");
    }

    #[test]
    fn pto_scenario_single_match() {
        let corpus = vec![
            record("Leave", "Employees get 15 days PTO annually.", &[]),
            record("Dress", "Business casual on weekdays.", &[]),
        ];
        let ranked = find_relevant_policies("What is the PTO policy?", &corpus, &RankingWeights::default());
        assert_eq!(ranked.len(), 1);
        assert!(ranked[0].score >= 1);
        assert!(calculate_confidence(&ranked, &RankingWeights::default()) > 0.0);
    }

    #[test]
    fn zero_scores_are_dropped_and_order_non_increasing() {
        let corpus = vec![
            record("Alpha", "nothing relevant at all", &[]),
            record("Expense Policy", "submit expense reports monthly with receipts", &[]),
            record("Travel", "travel expense booking and reports", &[]),
        ];
        let ranked = find_relevant_policies(
            "how do I submit expense reports",
            &corpus,
            &RankingWeights::default(),
        );
        assert!(ranked.iter().all(|r| r.score > 0));
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(!ranked.iter().any(|r| r.record.title == "Alpha"));
    }

    #[test]
    fn title_bonus_applies_to_question_head() {
        let corpus = vec![record("Remote work", "", &[])];
        let weights = RankingWeights::default();
        let ranked = find_relevant_policies("Remote work", &corpus, &weights);
        assert!(ranked[0].score >= weights.title_bonus);
    }

    #[test]
    fn topic_bonus_counts_per_topic() {
        let corpus = vec![record(
            "Benefits",
            "",
            &["parental leave", "insurance"],
        )];
        let ranked = find_relevant_policies(
            "does insurance cover parental leave",
            &corpus,
            &RankingWeights::default(),
        );
        // insurance (+2) + parental leave (+2) + word matches on topics? none in field
        assert!(ranked[0].score >= 4);
    }

    #[test]
    fn confidence_bounds() {
        let weights = RankingWeights::default();
        assert_eq!(calculate_confidence(&[], &weights), 0.0);

        let corpus = vec![record("Security Policy Handbook Guide", "security badge access policy for the security office", &[])];
        let ranked = find_relevant_policies(
            "security badge access policy office handbook guide",
            &corpus,
            &weights,
        );
        let confidence = calculate_confidence(&ranked, &weights);
        assert!(confidence > 0.0 && confidence <= 1.0);
    }

    #[test]
    fn custom_weights_are_honored() {
        let weights = RankingWeights {
            word_match: 10,
            ..RankingWeights::default()
        };
        let corpus = vec![record("Badge", "badge rules", &[])];
        let ranked = find_relevant_policies("badge", &corpus, &weights);
        assert_eq!(ranked[0].score, 10 + weights.title_bonus);
    }
}
