//! Question answering over the ranked policy corpus.

use crate::record::RankedPolicy;

/// Optional caller hints that steer the answer prompt.
#[derive(Debug, Clone, Default)]
pub struct QuestionContext {
    pub department: Option<String>,
    pub policy_type: Option<String>,
}

/// Whether the answer came from the generator or from the canned fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Generated,
    Degraded,
}

/// The full response to a question: the text, the evidence it was grounded
/// on, and a confidence estimate over that evidence.
#[derive(Debug, Clone)]
pub struct PolicyAnswer {
    pub answer: String,
    pub relevant_policies: Vec<RankedPolicy>,
    pub confidence: f64,
    pub outcome: AnswerOutcome,
}

pub const FALLBACK_ANSWER: &str = "I'm sorry, I encountered an error while processing your question. \
     Please try again or rephrase your question.";

pub const NO_MATCH_ANSWER: &str = "I couldn't find any policies related to your question. \
     Please try rephrasing or ask about a different topic.";

/// Render the hint lines appended to the answer prompt.
pub fn context_hints(context: &QuestionContext) -> Vec<String> {
    let mut hints = Vec::new();
    if let Some(department) = &context.department {
        hints.push(format!(
            "The user is asking from the {department} department perspective."
        ));
    }
    if let Some(policy_type) = &context.policy_type {
        hints.push(format!("Focus on {policy_type} related policies."));
    }
    hints
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hints_render_in_order() {
        let context = QuestionContext {
            department: Some("Engineering".into()),
            policy_type: Some("leave".into()),
        };
        let hints = context_hints(&context);
        assert_eq!(hints.len(), 2);
        assert!(hints[0].contains("Engineering department perspective"));
        assert!(hints[1].contains("Focus on leave related policies"));
    }

    #[test]
    fn empty_context_renders_nothing() {
        assert!(context_hints(&QuestionContext::default()).is_empty());
    }
}
