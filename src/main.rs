use axum::{
    http::{header, Method},
    routing::get,
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use trackdrop::api::{self, AppState};
use trackdrop::config::Config;
use trackdrop::services::normalizer::{GeminiClient, LanguageModel};
use trackdrop::services::{AddOrchestrator, CredentialManager, QueryNormalizer, SpotifyClient};
use trackdrop::store::PgAccountStore;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,trackdrop=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Connect to database
    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations").run(&db).await?;
    tracing::info!("Database migrations completed");

    // Initialize services
    let store = Arc::new(PgAccountStore::new(db));
    let spotify = Arc::new(SpotifyClient::new(
        config.spotify_client_id.clone(),
        config.spotify_client_secret.clone(),
    ));

    let model: Option<Arc<dyn LanguageModel>> = config
        .gemini_api_key
        .clone()
        .map(|key| Arc::new(GeminiClient::new(key)) as Arc<dyn LanguageModel>);
    if model.is_none() {
        tracing::warn!("GEMINI_API_KEY not set, AI query normalization disabled");
    }

    let credentials = Arc::new(CredentialManager::new(spotify.clone(), store.clone()));
    let orchestrator = AddOrchestrator::new(
        credentials,
        QueryNormalizer::new(model),
        spotify.clone(),
    );

    let app_state = Arc::new(AppState {
        config: config.clone(),
        store,
        spotify,
        orchestrator,
    });

    // Build router
    let app = Router::new()
        .route(
            "/",
            get(|| async { "trackdrop: link your Spotify account at /login" }),
        )
        .merge(api::auth_routes())
        .merge(api::account_routes())
        .merge(api::add_routes())
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        );

    // Start server
    let addr = format!("{}:{}", config.server_host, config.server_port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
