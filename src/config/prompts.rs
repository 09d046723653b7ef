//! Persona prompt text and builders
//!
//! Two fixed personas drive every prompt in the pipeline: the developer
//! persona answers implementation questions against documentation, the
//! learner persona teaches and quizzes from the same material. Only the
//! wording changes between them; the call sequence is identical.

use crate::conversation::Persona;
use crate::providers::CompletionParams;
use crate::text::truncate_chars;

/// Document text folded into a chat system prompt is capped at this many
/// characters to stay inside the completion context window.
pub const DOC_CONTEXT_CHARS: usize = 30_000;

/// Extracted file text handed to the analysis pass is capped separately.
pub const ANALYSIS_INPUT_CHARS: usize = 15_000;

/// Chat system prompt for a turn, with the cached document folded in when
/// one exists.
pub fn chat_system_prompt(persona: Persona, doc_context: Option<&str>) -> String {
    let doc = doc_context
        .map(|d| truncate_chars(d, DOC_CONTEXT_CHARS))
        .filter(|d| !d.is_empty());

    match (persona, doc) {
        (Persona::Learner, Some(doc)) => format!(
            r#"You are an Expert Tutor AI. Your task is to teach and quiz the user based exclusively on the content provided.

DOCUMENT CONTENT:
{doc}

Your responsibilities:
1. Explain concepts clearly and thoroughly, step by step
2. Generate quizzes, practice exercises, and example questions based solely on the content
3. Answer any questions from the user strictly using the provided content
4. Provide hints, detailed reasoning, and clarifications for answers
5. Make it interactive and educational, simulating a personal tutor
6. Act like a teaching assistant preparing the user for exams or tests

When providing responses:
- Break down complex topics into digestible parts
- Use examples and analogies to clarify concepts
- Create practice questions to test understanding
- Provide explanations with step-by-step reasoning
- Encourage learning with positive reinforcement
- If asked about something not in the content, politely say so and offer to explain related topics that are covered"#
        ),
        (Persona::Learner, None) => r#"You are an Expert Tutor AI designed to help students learn effectively.

Your approach:
- Break down complex topics into simple, understandable parts
- Provide clear explanations with examples
- Create quizzes and practice questions to reinforce learning
- Give step-by-step solutions with reasoning
- Use analogies and real-world examples to clarify concepts
- Encourage critical thinking and deeper understanding
- Provide positive feedback and constructive guidance

Make learning engaging, interactive, and effective."#
            .to_string(),
        (Persona::Developer, Some(doc)) => format!(
            r#"You are a helpful documentation assistant for developers. You have read and understood the following technical documentation:

{doc}

Your responsibilities:
- Answer technical questions clearly and concisely based on this documentation
- Provide code examples when relevant, with proper syntax highlighting
- Explain implementation details and best practices
- Point out potential pitfalls and common mistakes to avoid
- Reference specific sections of the docs when applicable
- Use markdown formatting for better readability
- If asked about something not in the docs, say so politely and suggest related topics that are covered

Always prioritize accuracy and practical implementation guidance."#
        ),
        (Persona::Developer, None) => r#"You are a helpful technical assistant for developers.

Your approach:
- Provide clear, concise technical explanations
- Include code examples with proper syntax
- Explain best practices and common patterns
- Highlight potential issues and how to avoid them
- Use markdown formatting for code blocks
- Be practical and implementation-focused

Help developers understand and implement solutions effectively."#
            .to_string(),
    }
}

/// Sampling for conversational replies; the learner persona runs warmer.
pub fn chat_params(persona: Persona) -> CompletionParams {
    match persona {
        Persona::Developer => CompletionParams::new(0.7, 2000),
        Persona::Learner => CompletionParams::new(0.8, 2000),
    }
}

/// System instruction for the per-chunk summarization calls.
pub fn chunk_summary_system(persona: Persona) -> &'static str {
    match persona {
        Persona::Developer => {
            "You are a documentation expert. Summarize key developer-focused information concisely."
        }
        Persona::Learner => {
            "You are an expert tutor AI. Teach, explain, and quiz the user strictly based on the content provided. Make it interactive, educational, and exam-prep ready."
        }
    }
}

/// User message carrying one chunk, identified by position.
pub fn chunk_summary_request(index: usize, total: usize, chunk: &str) -> String {
    format!(
        "Summarize or explain this documentation section (chunk {} of {}):\n\n{}",
        index + 1,
        total,
        chunk
    )
}

/// System instruction for the final aggregation call, requesting the
/// structured insights object.
pub fn insights_system(persona: Persona) -> String {
    let framing = match persona {
        Persona::Developer => {
            "You are a documentation expert. Provide a concise summary, key points, and common developer questions in JSON format."
        }
        Persona::Learner => {
            "You are an expert tutor AI. Provide a comprehensive teaching summary, key concepts, quizzes, and explanations based strictly on the provided content in JSON format."
        }
    };
    format!(
        "{framing} Respond with a single JSON object with the keys \"summary\" (string), \"keyPoints\" (array of strings) and \"suggestedQuestions\" (array of strings)."
    )
}

/// User message for the aggregation call.
pub fn insights_request(chunk_summaries: &[String]) -> String {
    format!("Based on these summaries:\n\n{}", chunk_summaries.join("\n\n"))
}

/// Persona-specific analysis prompt run over freshly extracted file text.
pub fn file_analysis_prompt(persona: Persona, extracted_text: &str) -> String {
    let text = truncate_chars(extracted_text, ANALYSIS_INPUT_CHARS);
    match persona {
        Persona::Learner => format!(
            r#"You are an AI tutor. Analyze this educational content and provide:

1. **📚 Summary** (3-4 sentences): Brief overview of what this content covers
2. **🎯 Key Topics** (4-6 bullet points): Main concepts and ideas
3. **💡 Suggested Questions** (5 questions): Questions a student might ask about this content
4. **📝 Study Actions**: Suggest what the student can do (e.g., "Ask me to create flashcards", "Request a practice quiz", "Get detailed explanations")

Keep it organized with clear sections and emojis.

Content to analyze:
{text}"#
        ),
        Persona::Developer => format!(
            r#"Analyze this technical document and provide:

1. **Summary** (2-3 sentences): What this documentation covers
2. **Key Concepts** (4-5 bullet points): Important APIs, functions, or patterns
3. **Implementation Notes** (2-3 points): Critical details for implementation
4. **Warnings** (if any): Common pitfalls or important considerations

Keep it concise and technical.

Document content:
{text}"#
        ),
    }
}

/// Instruction sent with an image to the vision model.
pub const OCR_INSTRUCTION: &str = "Extract all text from this image. If it contains code, preserve the formatting. If it contains documentation or instructions, extract everything clearly and accurately.";

/// Request that rewrites technical text into a speakable script.
pub fn tts_script_request(content: &str) -> String {
    format!(
        "Convert this technical message into a natural, conversational script for text-to-speech. Remove code symbols, replace \"//\" with \"comment\", make it sound natural and easy to listen to:\n\n{}",
        content
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_context_is_truncated() {
        let doc = "x".repeat(DOC_CONTEXT_CHARS + 500);
        let prompt = chat_system_prompt(Persona::Developer, Some(&doc));
        assert!(prompt.contains(&"x".repeat(DOC_CONTEXT_CHARS)));
        assert!(!prompt.contains(&"x".repeat(DOC_CONTEXT_CHARS + 1)));
    }

    #[test]
    fn personas_get_distinct_framing() {
        let dev = chat_system_prompt(Persona::Developer, None);
        let learner = chat_system_prompt(Persona::Learner, None);
        assert!(dev.contains("developers"));
        assert!(learner.contains("Tutor"));
        assert_ne!(dev, learner);
    }

    #[test]
    fn empty_doc_context_falls_back_to_plain_prompt() {
        let with_empty = chat_system_prompt(Persona::Developer, Some(""));
        let without = chat_system_prompt(Persona::Developer, None);
        assert_eq!(with_empty, without);
    }

    #[test]
    fn chunk_request_is_one_indexed() {
        let request = chunk_summary_request(0, 3, "body");
        assert!(request.contains("chunk 1 of 3"));
        assert!(request.ends_with("body"));
    }

    #[test]
    fn insights_system_names_the_json_keys() {
        for persona in [Persona::Developer, Persona::Learner] {
            let system = insights_system(persona);
            assert!(system.contains("\"keyPoints\""));
            assert!(system.contains("\"suggestedQuestions\""));
        }
    }
}
