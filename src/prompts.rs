//! Prompt templates and context assembly
//!
//! Fixed instruction templates for the three enrichment calls and the
//! question-answering call, plus the context-block builder that turns
//! ranked records into the grounding text the generator is allowed to use.

use crate::record::RankedPolicy;

/// Token budgets per call type.
pub const SUMMARY_MAX_TOKENS: u32 = 300;
pub const KEY_POINTS_MAX_TOKENS: u32 = 400;
pub const RELATED_TOPICS_MAX_TOKENS: u32 = 250;
pub const ANSWER_MAX_TOKENS: u32 = 600;

/// Related-topic prompts only see the head of the document.
pub const TOPIC_CONTENT_CHARS: usize = 1000;

/// How many ranked records ground an answer.
pub const ANSWER_CONTEXT_RECORDS: usize = 3;

pub fn summary_prompt(content: &str, max_words: usize) -> String {
    format!(
        "You are a policy expert. Provide a clear, concise summary of this policy document \
         that highlights the most important information for employees. Keep it under {max_words} words.\n\n\
         Policy Document:\n{content}\n\nSummary:"
    )
}

pub fn key_points_prompt(content: &str) -> String {
    format!(
        "Extract the most important key points from this policy document. \
         Return them as a JSON array of strings (5-7 key points maximum).\n\n\
         Policy Document:\n{content}\n\nKey Points (JSON format):"
    )
}

pub fn related_topics_prompt(content: &str) -> String {
    let head: String = content.chars().take(TOPIC_CONTENT_CHARS).collect();
    format!(
        "Identify related topics and policies that might be connected to this policy document. \
         Return them as a JSON array of topic names (5-8 topics maximum).\n\n\
         Policy Document:\n{head}\n\nRelated Topics (JSON format):"
    )
}

/// Build the question-answering prompt: fixed instructions, optional hint
/// sentences, the question, and the grounding context block.
pub fn answer_prompt(question: &str, context_block: &str, hints: &[String]) -> String {
    format!(
        "You are a policy assistant. Answer questions about organizational policies based on \
         the provided policy information. Be helpful, accurate, and cite specific policies when \
         relevant. If you cannot find the answer in the provided policies, say so clearly.\n\n\
         {hints}\n\nQuestion: {question}\n\nRelevant Policies:\n{context_block}\n\nAnswer:",
        hints = hints.join(" "),
    )
}

/// Textual context block for the top ranked records:
/// `Policy / Department / Summary / Key Points` per record.
pub fn policy_context_block(ranked: &[RankedPolicy]) -> String {
    ranked
        .iter()
        .take(ANSWER_CONTEXT_RECORDS)
        .map(|r| {
            format!(
                "Policy: {}\nDepartment: {}\nSummary: {}\nKey Points: {}",
                r.record.title,
                r.record.department,
                r.record.summary,
                r.record.key_points.join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
