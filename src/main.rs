use std::sync::{Arc, Mutex};

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use smart_health_assistant::config::AppConfig;
use smart_health_assistant::db::{self, seed};
use smart_health_assistant::handlers;
use smart_health_assistant::services::ai::embeddings::OllamaEmbedder;
use smart_health_assistant::services::ai::ollama::OllamaProvider;
use smart_health_assistant::services::ai::openai::{OpenAiCompatibleProvider, GROQ_BASE_URL};
use smart_health_assistant::services::ai::{DecisionOracle, LlmProvider};
use smart_health_assistant::services::recommend::ActivityRecommender;
use smart_health_assistant::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;
    seed::seed_if_empty(&conn, &config.availability_csv)?;

    let llm: Box<dyn LlmProvider> = match config.llm_provider.as_str() {
        "groq" => {
            anyhow::ensure!(
                !config.groq_api_key.is_empty(),
                "GROQ_API_KEY must be set when LLM_PROVIDER=groq"
            );
            tracing::info!("using Groq LLM provider (model: {})", config.groq_model);
            Box::new(OpenAiCompatibleProvider::new(
                GROQ_BASE_URL.to_string(),
                config.groq_api_key.clone(),
                config.groq_model.clone(),
            ))
        }
        "ollama" => {
            tracing::info!("using Ollama LLM provider (url: {})", config.ollama_url);
            Box::new(OllamaProvider::new(
                config.ollama_url.clone(),
                config.ollama_model.clone(),
            ))
        }
        "openai" => {
            anyhow::ensure!(
                !config.openai_api_key.is_empty(),
                "OPENAI_API_KEY must be set when LLM_PROVIDER=openai"
            );
            tracing::info!("using OpenAI LLM provider (model: {})", config.openai_model);
            Box::new(OpenAiCompatibleProvider::new(
                config.openai_base_url.clone(),
                config.openai_api_key.clone(),
                config.openai_model.clone(),
            ))
        }
        other => anyhow::bail!("unknown LLM_PROVIDER: {other} (expected openai, groq or ollama)"),
    };

    let oracle = DecisionOracle::new(llm, config.oracle_timeout, config.oracle_retries);
    let embedder = OllamaEmbedder::new(config.ollama_url.clone(), config.embedding_model.clone());

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        oracle,
        embedder: Box::new(embedder),
        recommender: ActivityRecommender::new(),
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/execute", post(handlers::execute::execute))
        .route("/chat", post(handlers::chat::chat))
        .route("/chat/reset", post(handlers::chat::reset))
        .route(
            "/availability.csv",
            get(handlers::availability::download_csv),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
