//! Document summarization pipeline
//!
//! Turns crawled documentation text into an [`Insights`] object in two
//! stages: the document is split into fixed-size chunks which are
//! summarized one by one, then a final aggregation call condenses those
//! summaries into structured JSON. The pipeline degrades instead of
//! failing: chunks whose completion fails are dropped, and if the
//! aggregation result is missing or unparseable a canned insights object
//! is returned.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::config::prompts;
use crate::conversation::{Insights, Persona};
use crate::providers::{ChatMessage, CompletionParams, ProviderChain};
use crate::text::truncate_chars;

/// Characters per summarization chunk.
pub const CHUNK_CHARS: usize = 15_000;

/// At most this many chunks are summarized per document.
pub const MAX_CHUNKS: usize = 5;

const CHUNK_PARAMS: CompletionParams = CompletionParams {
    temperature: 0.5,
    max_tokens: 800,
};

const AGGREGATE_PARAMS: CompletionParams = CompletionParams {
    temperature: 0.7,
    max_tokens: 1500,
};

static JSON_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```json\n?").expect("valid regex"));
static BARE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```\n?").expect("valid regex"));

/// Split text into consecutive chunks of at most `chunk_chars` characters.
///
/// The chunks are a partition: concatenating them reproduces the input
/// exactly. Counted in characters so multi-byte input never splits
/// mid-codepoint.
pub fn chunk_text(text: &str, chunk_chars: usize) -> Vec<&str> {
    if chunk_chars == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let chunk = truncate_chars(rest, chunk_chars);
        chunks.push(chunk);
        rest = &rest[chunk.len()..];
    }
    chunks
}

/// Summarize crawled documentation into structured insights.
///
/// Only the first [`MAX_CHUNKS`] chunks are summarized; chunk prompts
/// still report the document's full chunk count so the model knows when
/// it is seeing a partial document.
pub async fn summarize_document(
    chain: &ProviderChain,
    content: &str,
    persona: Persona,
) -> Insights {
    let chunks = chunk_text(content, CHUNK_CHARS);
    let total = chunks.len();

    let mut summaries: Vec<String> = Vec::new();
    for (index, chunk) in chunks.into_iter().take(MAX_CHUNKS).enumerate() {
        let messages = [
            ChatMessage::system(prompts::chunk_summary_system(persona)),
            ChatMessage::user(prompts::chunk_summary_request(index, total, chunk)),
        ];
        match chain.complete(&messages, CHUNK_PARAMS).await {
            Ok(summary) => summaries.push(summary),
            Err(err) => {
                warn!(chunk = index + 1, error = %err, "chunk summary failed, skipping");
            }
        }
    }

    let messages = [
        ChatMessage::system(prompts::insights_system(persona)),
        ChatMessage::user(prompts::insights_request(&summaries)),
    ];
    match chain.complete(&messages, AGGREGATE_PARAMS).await {
        Ok(raw) => parse_insights(&raw),
        Err(err) => {
            warn!(error = %err, "insights aggregation failed, using fallback");
            fallback_insights()
        }
    }
}

/// Remove markdown code fences the model tends to wrap JSON in.
pub fn strip_code_fences(raw: &str) -> String {
    let without_json = JSON_FENCE.replace_all(raw, "");
    BARE_FENCE.replace_all(&without_json, "").trim().to_string()
}

/// Parse the aggregation output, falling back to canned insights when the
/// model did not produce usable JSON.
pub fn parse_insights(raw: &str) -> Insights {
    let cleaned = strip_code_fences(raw);
    match serde_json::from_str::<Insights>(&cleaned) {
        Ok(insights) => insights,
        Err(err) => {
            debug!(error = %err, "unparseable insights payload, using fallback");
            fallback_insights()
        }
    }
}

/// Insights used when summarization produced nothing usable.
pub fn fallback_insights() -> Insights {
    Insights {
        summary: "Documentation loaded and analyzed successfully.".to_string(),
        key_points: vec![
            "Crawled sections of documentation".to_string(),
            "Ready to answer questions".to_string(),
        ],
        suggested_questions: vec![
            "What are the main features?".to_string(),
            "How do I get started?".to_string(),
        ],
    }
}
