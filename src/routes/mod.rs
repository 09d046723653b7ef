//! HTTP API routes
//!
//! The JSON surface is stateless: chat requests carry their own message
//! history and an optional document, so nothing here touches the
//! conversation store. Crawled documents are cached in [`DocCache`] keyed
//! by URL, which lets follow-up chat requests send just the URL instead
//! of the full document body.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, warn};

use crate::config::prompts;
use crate::conversation::{Insights, Persona};
use crate::core::DocCache;
use crate::crawler::Crawler;
use crate::extract::{ExtractedFile, FileExtractor};
use crate::providers::{ChatMessage, CompletionParams, ProviderChain};
use crate::summarizer;

/// Crawls yielding less text than this are treated as failures.
const MIN_CONTENT_CHARS: usize = 100;

/// Upload cap for `/api/extract-file`.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

const SCRAPE_FAILED: &str = "Failed to analyze documentation. Please check the URL and try again.";
const CHAT_FAILED: &str = "Failed to process your message. Please try again.";
const EXTRACT_FAILED: &str = "Failed to extract text from file";

/// Shared state handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub chain: Arc<ProviderChain>,
    pub crawler: Arc<Crawler>,
    pub cache: Arc<DocCache>,
    pub extractor: Arc<FileExtractor>,
}

/// Error reply in the fixed `{ "error": "<message>" }` shape.
struct ApiError {
    status: StatusCode,
    message: &'static str,
}

impl ApiError {
    fn bad_request(message: &'static str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message,
        }
    }

    fn internal(message: &'static str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ScrapeDocsRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default, alias = "mode")]
    pub persona: Persona,
}

#[derive(Debug, Serialize)]
pub struct ScrapeDocsResponse {
    pub insights: Insights,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatDocsRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub doc_content: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default, alias = "mode")]
    pub persona: Persona,
}

#[derive(Debug, Serialize)]
pub struct ChatDocsResponse {
    pub response: String,
}

#[derive(Debug, Deserialize)]
pub struct TtsScriptRequest {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct TtsScriptResponse {
    pub script: String,
}

#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_voice")]
    pub voice: String,
}

fn default_voice() -> String {
    "x_Catherine".into()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsResponse {
    pub error: &'static str,
    pub use_fallback: bool,
    pub voice: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Crawl a documentation site, summarize it, and cache the text by URL.
async fn scrape_docs(
    State(state): State<AppState>,
    Json(request): Json<ScrapeDocsRequest>,
) -> Result<Json<ScrapeDocsResponse>, ApiError> {
    if request.url.is_empty() {
        return Err(ApiError::bad_request("URL is required"));
    }

    let content = match state.crawler.crawl(&request.url).await {
        Ok(content) => content,
        Err(err) => {
            error!(url = %request.url, error = %err, "documentation crawl failed");
            return Err(ApiError::internal(SCRAPE_FAILED));
        }
    };

    if content.chars().count() < MIN_CONTENT_CHARS {
        warn!(url = %request.url, "crawl produced too little content");
        return Err(ApiError::internal(SCRAPE_FAILED));
    }

    let insights = summarizer::summarize_document(&state.chain, &content, request.persona).await;
    state.cache.insert(request.url, content.clone());

    Ok(Json(ScrapeDocsResponse { insights, content }))
}

/// Answer a chat turn against an optional document context.
///
/// The context comes from the request's `docContent` when present,
/// otherwise from the cache entry for the request's `url`.
async fn chat_docs(
    State(state): State<AppState>,
    Json(request): Json<ChatDocsRequest>,
) -> Result<Json<ChatDocsResponse>, ApiError> {
    if request.messages.is_empty() {
        return Err(ApiError::bad_request("Messages array is required"));
    }

    let context = request
        .doc_content
        .filter(|content| !content.is_empty())
        .or_else(|| {
            request
                .url
                .as_deref()
                .and_then(|url| state.cache.get(url))
        });

    let system = prompts::chat_system_prompt(request.persona, context.as_deref());
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    messages.push(ChatMessage::system(system));
    messages.extend(request.messages);

    match state
        .chain
        .complete(&messages, prompts::chat_params(request.persona))
        .await
    {
        Ok(response) => Ok(Json(ChatDocsResponse { response })),
        Err(err) => {
            error!(error = %err, "chat completion failed");
            Err(ApiError::internal(CHAT_FAILED))
        }
    }
}

/// Extract text from an uploaded file (multipart `file` + `persona`).
async fn extract_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ExtractedFile>, ApiError> {
    let mut file: Option<(String, String, axum::body::Bytes)> = None;
    let mut persona = Persona::default();

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        warn!(error = %err, "malformed multipart request");
        ApiError::internal(EXTRACT_FAILED)
    })? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field.bytes().await.map_err(|err| {
                    warn!(error = %err, "failed to read uploaded file");
                    ApiError::internal(EXTRACT_FAILED)
                })?;
                file = Some((file_name, content_type, data));
            }
            Some("persona") | Some("mode") => {
                if let Ok(value) = field.text().await {
                    persona = match value.as_str() {
                        "user" => Persona::Learner,
                        _ => Persona::Developer,
                    };
                }
            }
            _ => {}
        }
    }

    let (file_name, content_type, data) =
        file.ok_or_else(|| ApiError::bad_request("No file provided"))?;

    match state
        .extractor
        .extract(&file_name, &content_type, &data, persona)
        .await
    {
        Ok(extracted) => Ok(Json(extracted)),
        Err(err) => {
            error!(file = %file_name, error = %err, "file extraction failed");
            Err(ApiError::internal(EXTRACT_FAILED))
        }
    }
}

/// Rewrite technical text into a speakable script.
///
/// Never fails: when the rewrite completion is unavailable the original
/// content comes back unchanged.
async fn generate_tts_script(
    State(state): State<AppState>,
    Json(request): Json<TtsScriptRequest>,
) -> Result<Json<TtsScriptResponse>, ApiError> {
    if request.content.is_empty() {
        return Err(ApiError::bad_request("Content is required"));
    }

    let prompt = prompts::tts_script_request(&request.content);
    let script = match state
        .chain
        .complete(&[ChatMessage::user(prompt)], CompletionParams::new(0.7, 1000))
        .await
    {
        Ok(script) => script,
        Err(err) => {
            warn!(error = %err, "TTS script rewrite failed, returning original content");
            request.content
        }
    };

    Ok(Json(TtsScriptResponse { script }))
}

/// Synthesis happens in the browser; the server only validates the text
/// and echoes the chosen voice back.
async fn tts(Json(request): Json<TtsRequest>) -> Result<Json<TtsResponse>, ApiError> {
    if request.text.is_empty() {
        return Err(ApiError::bad_request("Text is required"));
    }

    Ok(Json(TtsResponse {
        error: "Using browser TTS",
        use_fallback: true,
        voice: request.voice,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/scrape-docs", post(scrape_docs))
        .route("/api/chat-docs", post(chat_docs))
        .route(
            "/api/extract-file",
            post(extract_file).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/generate-tts-script", post(generate_tts_script))
        .route("/api/tts", post(tts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::CrawlerConfig;
    use crate::providers::{OpenAICompatConfig, OpenAICompatProvider};
    use axum::body::Body;
    use axum::http::Request;
    use mockito::{Matcher, Server, ServerGuard};
    use tower::ServiceExt;

    fn provider_for(server: &ServerGuard) -> OpenAICompatProvider {
        OpenAICompatProvider::new(
            "test",
            OpenAICompatConfig {
                base_url: server.url(),
                api_key: Some("test-key".to_string()),
                model: "test-model".to_string(),
                timeout_secs: 5,
            },
        )
    }

    fn state_with(chain: ProviderChain) -> AppState {
        let chain = Arc::new(chain);
        AppState {
            chain: chain.clone(),
            crawler: Arc::new(Crawler::new(CrawlerConfig::default())),
            cache: Arc::new(DocCache::default()),
            extractor: Arc::new(FileExtractor::new(None, chain, None)),
        }
    }

    fn bare_state() -> AppState {
        state_with(ProviderChain::new())
    }

    fn completion_body(content: &str) -> String {
        json!({
            "choices": [{ "message": { "content": content } }]
        })
        .to_string()
    }

    async fn send(state: AppState, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router().with_state(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap();
        (status, value)
    }

    async fn post_json(
        state: AppState,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(state, request).await
    }

    fn multipart_request(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/extract-file")
            .header(
                "content-type",
                "multipart/form-data; boundary=test-boundary",
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_version() {
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(bare_state(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn scrape_docs_requires_a_url() {
        let (status, body) = post_json(bare_state(), "/api/scrape-docs", json!({})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "URL is required");
    }

    #[tokio::test]
    async fn scrape_docs_caches_the_crawled_content() {
        let mut server = Server::new_async().await;
        let docs_text = "install ".repeat(60);
        server
            .mock("GET", "/docs")
            .with_body(format!(
                "<html><body><main>{docs_text}</main></body></html>"
            ))
            .create_async()
            .await;
        server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::Regex("chunk 1 of 1".to_string()))
            .with_body(completion_body("S1"))
            .create_async()
            .await;
        server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::Regex("Based on these summaries".to_string()))
            .with_body(completion_body(
                "{\"summary\":\"Install guide\",\"keyPoints\":[\"K1\"],\"suggestedQuestions\":[\"Q1\"]}",
            ))
            .create_async()
            .await;

        let state = state_with(ProviderChain::new().with(provider_for(&server)));
        let url = format!("{}/docs", server.url());
        let (status, body) = post_json(
            state.clone(),
            "/api/scrape-docs",
            json!({ "url": url, "persona": "dev" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["insights"]["summary"], "Install guide");
        assert!(body["content"].as_str().unwrap().contains("### Page"));
        assert!(state.cache.get(&url).is_some());
    }

    #[tokio::test]
    async fn scrape_docs_rejects_thin_content() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/docs")
            .with_status(404)
            .create_async()
            .await;

        let url = format!("{}/docs", server.url());
        let (status, body) = post_json(bare_state(), "/api/scrape-docs", json!({ "url": url })).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body["error"],
            "Failed to analyze documentation. Please check the URL and try again."
        );
    }

    #[tokio::test]
    async fn chat_docs_requires_messages() {
        let (status, body) =
            post_json(bare_state(), "/api/chat-docs", json!({ "messages": [] })).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Messages array is required");
    }

    #[tokio::test]
    async fn chat_docs_folds_the_document_into_the_system_prompt() {
        let mut server = Server::new_async().await;
        let completion = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("Sprockets turn widgets".to_string()),
                Matcher::Regex("What is a sprocket".to_string()),
            ]))
            .with_body(completion_body("A sprocket turns widgets."))
            .expect(1)
            .create_async()
            .await;

        let state = state_with(ProviderChain::new().with(provider_for(&server)));
        let (status, body) = post_json(
            state,
            "/api/chat-docs",
            json!({
                "docContent": "Sprockets turn widgets.",
                "messages": [{ "role": "user", "content": "What is a sprocket?" }],
                "persona": "dev"
            }),
        )
        .await;

        completion.assert_async().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "A sprocket turns widgets.");
    }

    #[tokio::test]
    async fn chat_docs_falls_back_to_the_document_cache() {
        let mut server = Server::new_async().await;
        let completion = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::Regex("cached sprocket manual".to_string()))
            .with_body(completion_body("From the manual."))
            .expect(1)
            .create_async()
            .await;

        let state = state_with(ProviderChain::new().with(provider_for(&server)));
        state
            .cache
            .insert("https://docs.example.com", "cached sprocket manual");

        let (status, body) = post_json(
            state,
            "/api/chat-docs",
            json!({
                "url": "https://docs.example.com",
                "messages": [{ "role": "user", "content": "Summarize the manual" }]
            }),
        )
        .await;

        completion.assert_async().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "From the manual.");
    }

    #[tokio::test]
    async fn chat_docs_reports_provider_failure() {
        let (status, body) = post_json(
            bare_state(),
            "/api/chat-docs",
            json!({ "messages": [{ "role": "user", "content": "hi" }] }),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to process your message. Please try again.");
    }

    #[tokio::test]
    async fn extract_file_requires_a_file_part() {
        let body = "--test-boundary\r\n\
                    Content-Disposition: form-data; name=\"persona\"\r\n\r\n\
                    dev\r\n\
                    --test-boundary--\r\n"
            .to_string();

        let (status, value) = send(bare_state(), multipart_request(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "No file provided");
    }

    #[tokio::test]
    async fn extract_file_answers_for_unsupported_types() {
        let body = "--test-boundary\r\n\
                    Content-Disposition: form-data; name=\"file\"; filename=\"notes.txt\"\r\n\
                    Content-Type: text/plain\r\n\r\n\
                    plain notes\r\n\
                    --test-boundary--\r\n"
            .to_string();

        let (status, value) = send(bare_state(), multipart_request(body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            value["text"],
            "📄 **notes.txt**\n\nFile uploaded. What would you like to know?"
        );
        assert_eq!(value["fullContent"], "");
    }

    #[tokio::test]
    async fn tts_script_requires_content() {
        let (status, body) =
            post_json(bare_state(), "/api/generate-tts-script", json!({})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Content is required");
    }

    #[tokio::test]
    async fn tts_script_rewrites_content() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::Regex("Convert this technical message".to_string()))
            .with_body(completion_body("here is a friendly script"))
            .create_async()
            .await;

        let state = state_with(ProviderChain::new().with(provider_for(&server)));
        let (status, body) = post_json(
            state,
            "/api/generate-tts-script",
            json!({ "content": "let x = 5; // init" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["script"], "here is a friendly script");
    }

    #[tokio::test]
    async fn tts_script_returns_the_original_when_rewrite_fails() {
        let (status, body) = post_json(
            bare_state(),
            "/api/generate-tts-script",
            json!({ "content": "let x = 5; // init" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["script"], "let x = 5; // init");
    }

    #[tokio::test]
    async fn tts_always_directs_to_the_browser_fallback() {
        let (status, body) = post_json(bare_state(), "/api/tts", json!({ "text": "hello" })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"], "Using browser TTS");
        assert_eq!(body["useFallback"], true);
        assert_eq!(body["voice"], "x_Catherine");

        let (_, body) = post_json(
            bare_state(),
            "/api/tts",
            json!({ "text": "hello", "voice": "x_Aiden" }),
        )
        .await;
        assert_eq!(body["voice"], "x_Aiden");
    }

    #[tokio::test]
    async fn tts_requires_text() {
        let (status, body) = post_json(bare_state(), "/api/tts", json!({})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Text is required");
    }
}
