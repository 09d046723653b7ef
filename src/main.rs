//! DocScout API server
//!
//! Crawls documentation sites, distills them with LLMs, and answers
//! questions grounded in the crawled text over a stateless JSON API.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docscout::config::Config;
use docscout::core::DocCache;
use docscout::crawler::{Crawler, CrawlerConfig};
use docscout::extract::{FileExtractor, PdfCoConfig};
use docscout::providers::{OpenAICompatProvider, ProviderChain};
use docscout::routes::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docscout=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let mut chain = ProviderChain::new();
    if let Some(key) = config.groq_api_key.clone() {
        chain.push(OpenAICompatProvider::groq(key));
    }
    if let Some(key) = config.siliconflow_api_key.clone() {
        chain.push(OpenAICompatProvider::siliconflow(key));
    }
    if chain.is_empty() {
        tracing::warn!("no completion providers configured, chat requests will fail");
    }
    let chain = Arc::new(chain);

    let vision = config
        .siliconflow_api_key
        .clone()
        .map(OpenAICompatProvider::siliconflow_vision);
    let pdfco = config.pdfco_api_key.clone().map(PdfCoConfig::new);
    let extractor = Arc::new(FileExtractor::new(vision, chain.clone(), pdfco));

    let state = AppState {
        chain,
        crawler: Arc::new(Crawler::new(CrawlerConfig::default())),
        cache: Arc::new(DocCache::default()),
        extractor,
    };

    let app = Router::new()
        .merge(routes::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("🔍 DocScout API running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
