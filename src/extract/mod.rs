//! Text extraction from uploaded files
//!
//! Images go through the vision model as base64 data URLs, PDFs through
//! the PDF.co conversion API. Whatever text comes back is run through a
//! persona-specific analysis completion so the reply shown in chat is a
//! digest rather than a raw dump; the raw text rides along separately for
//! reuse as document context. Every backend failure past the transport
//! layer degrades to a friendly notice instead of an error.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::prompts::{file_analysis_prompt, OCR_INSTRUCTION};
use crate::conversation::Persona;
use crate::providers::{
    ChatMessage, CompletionParams, OpenAICompatProvider, ProviderChain, ProviderError,
};
use crate::text::truncate_chars;

/// PDF text is capped at the same character budget as crawled content.
pub const PDF_TEXT_CHARS: usize = 50_000;

/// Raw preview length used when the analysis completion fails.
pub const PREVIEW_CHARS: usize = 2_000;

const OCR_PARAMS: CompletionParams = CompletionParams {
    temperature: 0.2,
    max_tokens: 2000,
};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("extraction request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// PDF.co conversion service configuration.
#[derive(Debug, Clone)]
pub struct PdfCoConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl PdfCoConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.pdf.co/v1".to_string(),
            api_key: api_key.into(),
            timeout_secs: 60,
        }
    }
}

/// Extraction result: `text` is the formatted notice shown in chat,
/// `full_content` the raw extracted text kept for document context.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFile {
    pub text: String,
    pub full_content: String,
}

#[derive(Serialize)]
struct UploadRequest<'a> {
    file: &'a str,
    name: &'a str,
}

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(default)]
    error: bool,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Serialize)]
struct ConvertRequest<'a> {
    url: &'a str,
    inline: bool,
    lang: &'a str,
}

#[derive(Deserialize)]
struct ConvertResponse {
    #[serde(default)]
    error: bool,
    #[serde(default)]
    body: Option<String>,
}

enum PdfText {
    Extracted(String),
    /// Conversion never ran; carries the notice explaining what to do.
    Unavailable(String),
}

/// Turns uploaded files into chat-ready text.
pub struct FileExtractor {
    vision: Option<OpenAICompatProvider>,
    chain: Arc<ProviderChain>,
    pdfco: Option<PdfCoConfig>,
    client: Client,
}

impl FileExtractor {
    pub fn new(
        vision: Option<OpenAICompatProvider>,
        chain: Arc<ProviderChain>,
        pdfco: Option<PdfCoConfig>,
    ) -> Self {
        let timeout_secs = pdfco.as_ref().map(|c| c.timeout_secs).unwrap_or(60);
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            vision,
            chain,
            pdfco,
            client,
        }
    }

    /// Extract text from an uploaded file and format it for the chat.
    ///
    /// Only transport-level failures surface as errors; a backend that
    /// answers but produces no usable text falls back to a generic notice.
    pub async fn extract(
        &self,
        file_name: &str,
        content_type: &str,
        data: &[u8],
        persona: Persona,
    ) -> Result<ExtractedFile, ExtractError> {
        info!(
            file = %file_name,
            content_type = %content_type,
            size = data.len(),
            "extracting file content"
        );

        let text = if content_type.starts_with("image/") {
            self.ocr_image(content_type, data).await?
        } else if content_type == "application/pdf" {
            match self.pdf_text(file_name, data).await? {
                PdfText::Extracted(text) => text,
                PdfText::Unavailable(notice) => {
                    return Ok(ExtractedFile {
                        text: notice,
                        full_content: String::new(),
                    });
                }
            }
        } else {
            String::new()
        };

        if text.is_empty() {
            return Ok(ExtractedFile {
                text: format!("📄 **{file_name}**\n\nFile uploaded. What would you like to know?"),
                full_content: String::new(),
            });
        }

        let notice = match self.analyze(&text, persona).await {
            Ok(analysis) => analysis_text(file_name, persona, &analysis),
            Err(err) => {
                warn!(error = %err, "file analysis failed, returning raw preview");
                preview_text(file_name, &text)
            }
        };

        Ok(ExtractedFile {
            text: notice,
            full_content: text,
        })
    }

    /// Run the vision model over an image shipped as a base64 data URL.
    async fn ocr_image(&self, content_type: &str, data: &[u8]) -> Result<String, ExtractError> {
        let vision = match &self.vision {
            Some(provider) => provider,
            None => {
                warn!("no vision provider configured, skipping image OCR");
                return Ok(String::new());
            }
        };

        let data_url = format!("data:{};base64,{}", content_type, BASE64.encode(data));

        match vision
            .complete_with_image(&data_url, OCR_INSTRUCTION, OCR_PARAMS)
            .await
        {
            Ok(text) => Ok(text),
            Err(ProviderError::RequestFailed(err)) => Err(ExtractError::Request(err)),
            Err(err) => {
                warn!(error = %err, "image OCR produced no text");
                Ok(String::new())
            }
        }
    }

    /// Upload a PDF to PDF.co and convert it to text.
    async fn pdf_text(&self, file_name: &str, data: &[u8]) -> Result<PdfText, ExtractError> {
        let pdfco = match &self.pdfco {
            Some(config) => config,
            None => {
                warn!("PDFCO_API_KEY not configured, skipping PDF conversion");
                return Ok(PdfText::Unavailable(format!(
                    "📄 **{file_name}**\n\nPDF uploaded successfully. Please describe what information you need from this document."
                )));
            }
        };

        let upload = self
            .client
            .post(format!("{}/file/upload/base64", pdfco.base_url))
            .header("x-api-key", &pdfco.api_key)
            .json(&UploadRequest {
                file: &BASE64.encode(data),
                name: file_name,
            })
            .send()
            .await?;

        if !upload.status().is_success() {
            let status = upload.status();
            let body = upload.text().await.unwrap_or_default();
            warn!(%status, body = %body, "PDF upload failed");
            return Ok(PdfText::Unavailable(format!(
                "📄 **{file_name}**\n\nPDF uploaded. Please describe what you need help with."
            )));
        }

        let upload: UploadResponse = upload.json().await?;
        let hosted_url = match upload.url {
            Some(url) if !upload.error => url,
            _ => {
                warn!("PDF upload response carried no file URL");
                return Ok(PdfText::Extracted(String::new()));
            }
        };

        let convert = self
            .client
            .post(format!("{}/pdf/convert/to/text", pdfco.base_url))
            .header("x-api-key", &pdfco.api_key)
            .json(&ConvertRequest {
                url: &hosted_url,
                inline: true,
                lang: "eng",
            })
            .send()
            .await?;

        let converted: ConvertResponse = convert.json().await?;
        match converted.body {
            Some(body) if !converted.error => Ok(PdfText::Extracted(
                truncate_chars(&body, PDF_TEXT_CHARS).to_string(),
            )),
            _ => {
                warn!("PDF text conversion returned no body");
                Ok(PdfText::Extracted(String::new()))
            }
        }
    }

    /// One persona-specific completion over the extracted text.
    async fn analyze(&self, text: &str, persona: Persona) -> Result<String, ProviderError> {
        let prompt = file_analysis_prompt(persona, text);
        let params = match persona {
            Persona::Learner => CompletionParams::new(0.7, 1500),
            Persona::Developer => CompletionParams::new(0.6, 1000),
        };

        self.chain
            .complete(&[ChatMessage::user(prompt)], params)
            .await
    }
}

fn analysis_text(file_name: &str, persona: Persona, analysis: &str) -> String {
    match persona {
        Persona::Learner => format!(
            "📎 **{file_name}** has been analyzed!\n\n{analysis}\n\n---\n\n✨ **What would you like to do?**\n• Create flashcards from this content\n• Generate a practice quiz\n• Get detailed explanations of any topic\n• Ask specific questions\n\nJust let me know!"
        ),
        Persona::Developer => format!(
            "📎 **{file_name}**\n\n{analysis}\n\n---\n\n💬 Ask me anything about this documentation!"
        ),
    }
}

fn preview_text(file_name: &str, text: &str) -> String {
    format!(
        "📎 **{file_name}**\n\n{}...",
        truncate_chars(text, PREVIEW_CHARS)
    )
}
