//! Grounding context assembly for the strict-citation answering service.
//!
//! The grounding context is the sole permitted source of authority for the
//! external model collaborator: a fixed citation policy, an optional
//! higher-authority Act, and the combined Rules corpus, each wrapped in
//! explicit markers. The core never invokes a model itself — it only
//! produces the text and hands it across the [`AnswerProvider`] seam.

use tracing::debug;

/// Fixed citation policy. The answering service must treat the wrapped
/// text as its only source; the Act prevails over the Rules on conflict.
const POLICY_PREAMBLE: &str = "\
You answer questions about the regulatory provisions supplied below. \
These instructions are absolute:

1. Cite only the supplied text. Every statement of law must carry a \
citation naming the document identifier it comes from, in the form \
(Document NNN).
2. Quote the operative text verbatim. Wrap every quotation in a markdown \
blockquote so quoted words are visibly fenced from your own.
3. When an answer draws on several documents, present them in ascending \
identifier order.
4. Where the higher-authority text and the document corpus conflict, the \
higher-authority text prevails; say so explicitly when it happens.
5. If the supplied text does not answer the question, state that plainly. \
Never supplement from outside knowledge.";

const ACT_BEGIN: &str = "===== BEGIN HIGHER AUTHORITY (PREVAILS ON CONFLICT) =====";
const ACT_END: &str = "===== END HIGHER AUTHORITY =====";
const CORPUS_BEGIN: &str = "===== BEGIN DOCUMENT CORPUS =====";
const CORPUS_END: &str = "===== END DOCUMENT CORPUS =====";

/// Assemble the grounding context from the combined corpus and an optional
/// higher-authority document.
pub fn assemble_grounding(corpus: &str, act: Option<&str>) -> String {
    let mut grounding = String::new();

    grounding.push_str(POLICY_PREAMBLE);
    grounding.push_str("\n\n");

    if let Some(act_text) = act {
        grounding.push_str(ACT_BEGIN);
        grounding.push('\n');
        grounding.push_str(act_text.trim());
        grounding.push('\n');
        grounding.push_str(ACT_END);
        grounding.push_str("\n\n");
    }

    grounding.push_str(CORPUS_BEGIN);
    grounding.push('\n');
    grounding.push_str(corpus.trim());
    grounding.push('\n');
    grounding.push_str(CORPUS_END);
    grounding.push('\n');

    debug!(
        bytes = grounding.len(),
        with_act = act.is_some(),
        "grounding context assembled"
    );

    grounding
}

// ---------------------------------------------------------------------------
// The model-invocation seam
// ---------------------------------------------------------------------------

/// The complete input handed to the external model collaborator.
#[derive(Debug, Clone)]
pub struct GroundingRequest {
    /// Assembled grounding context (policy + authorities).
    pub grounding: String,
    /// The caller's question.
    pub question: String,
}

impl GroundingRequest {
    /// Build the request for one question.
    pub fn new(corpus: &str, act: Option<&str>, question: impl Into<String>) -> Self {
        Self {
            grounding: assemble_grounding(corpus, act),
            question: question.into(),
        }
    }
}

/// Usage metadata reported back by the collaborator.
#[derive(Debug, Clone, Default)]
pub struct AnswerUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// An answer produced by the collaborator.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub usage: AnswerUsage,
}

/// External model-invocation collaborator. Authentication, transport, and
/// response rendering live behind this trait, outside the core.
pub trait AnswerProvider: Send + Sync {
    fn answer(&self, request: &GroundingRequest) -> regcorpus_shared::Result<Answer>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
