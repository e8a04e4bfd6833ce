use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use tably_context::{Geocoder, KnowledgeBase, KnowledgeStore, WeatherService};
use tably_core::chat::BusinessProfile;
use tably_core::config::Settings;
use tably_llm::CompletionProvider;
use tably_net::{ResilientClient, TtlCache};

use crate::chat::ChatCore;
use crate::handlers;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub core: Arc<ChatCore>,
    pub weather: Arc<WeatherService>,
    pub geocoder: Arc<Geocoder>,
}

impl AppState {
    /// Wires the full pipeline from settings: one HTTP client and one
    /// cache shared by the geocoding and weather services.
    pub fn build(settings: &Settings, provider: Arc<dyn CompletionProvider>) -> Self {
        let http = Arc::new(ResilientClient::new());
        let cache = Arc::new(TtlCache::new());
        let geocoder = Arc::new(Geocoder::new(http.clone(), cache.clone(), settings));
        let weather = Arc::new(WeatherService::new(http, cache, geocoder.clone(), settings));
        let knowledge = Arc::new(KnowledgeStore::new(KnowledgeBase::load(
            &settings.knowledge_path,
        )));
        let core = Arc::new(ChatCore::new(
            weather.clone(),
            knowledge,
            provider,
            BusinessProfile::default(),
            settings.default_business_location.clone(),
        ));
        Self {
            core,
            weather,
            geocoder,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/chat", post(handlers::chat))
        .route("/chat/stream", post(handlers::chat_stream))
        .route("/chat/simple", post(handlers::chat_simple))
        .route("/chat/simple/stream", post(handlers::chat_simple_stream))
        .route("/route", post(handlers::route))
        .route("/weather", get(handlers::weather))
        .route("/geocode", get(handlers::geocode))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Running server. The listener task is detached; dropping the handle
/// does not stop it.
pub struct ServerHandle {
    pub port: u16,
    _server: JoinHandle<()>,
}

/// Binds `0.0.0.0:port` (port 0 picks a free port, reported back on
/// the handle) and serves until the process exits.
pub async fn start(config: ServerConfig, state: AppState) -> std::io::Result<ServerHandle> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    let port = listener.local_addr()?.port();
    let router = build_router(state);

    info!(port, "listening");
    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "server exited");
        }
    });

    Ok(ServerHandle {
        port,
        _server: server,
    })
}
