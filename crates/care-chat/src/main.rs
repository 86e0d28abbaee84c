mod api;
mod classify;
mod config;
mod error;
mod gateway;
mod indexer;
mod lang;
mod pipeline;
mod rag;
mod resources;
mod server;
mod topics;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use care_common::translate::{LibreTranslateClient, LibreTranslateConfig, Translator};

use config::Config;
use gateway::TranslationGateway;
use pipeline::AnswerPipeline;
use topics::TopicCatalog;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = Config::from_env()?;
    info!(
        lancedb_path = %config.lancedb_path,
        corpus = config.corpus_path.is_some(),
        "configuration loaded"
    );

    if std::env::args().nth(1).as_deref() == Some("index") {
        indexer::run(&config).await?;
        return Ok(());
    }

    let translator: Arc<dyn Translator> =
        Arc::new(LibreTranslateClient::new(LibreTranslateConfig::from_env())?);
    let gateway = TranslationGateway::new(translator);

    // Heavy generation resources load lazily on the first request; the
    // OnceCell inside guarantees a single construction under concurrent
    // first calls.
    let resources = resources::production_cache(&config);

    let pipeline = Arc::new(AnswerPipeline::new(
        gateway,
        TopicCatalog::default(),
        resources,
    ));

    let app = server::router(pipeline);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "care-chat server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
