//! LexAid consultation backend entry point.
//!
//! Wires the adapters together and serves the REST + WebSocket surface:
//! configuration from the environment, a PostgreSQL-backed consultation
//! store, the in-process event bus with the push bridge subscribed, and
//! an axum server with graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lexaid::adapters::http::{consultation_routes, ConsultationHandlers};
use lexaid::adapters::websocket::{websocket_router, PushEventBridge, WebSocketState};
use lexaid::adapters::{InProcessEventBus, PostgresConsultationRepository, RoomRegistry};
use lexaid::application::handlers::consultation::{
    AttachRecordingHandler, CancelConsultationHandler, EndConsultationHandler,
    GetConsultationHandler, ScheduleConsultationHandler, SetConsentHandler,
    StartConsultationHandler, SubmitFeedbackHandler,
};
use lexaid::config::AppConfig;
use lexaid::ports::{ConsultationRepository, EventPublisher};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(&config.server.log_level)
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        environment = ?config.server.environment,
        "Starting consultation backend"
    );

    // Persistence
    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .idle_timeout(config.database.idle_timeout())
        .connect(&config.database.url)
        .await?;
    let repository: Arc<dyn ConsultationRepository> =
        Arc::new(PostgresConsultationRepository::new(pool));

    // Real-time plumbing: registry, event bus, push bridge
    let registry = Arc::new(RoomRegistry::new());
    let event_bus = Arc::new(InProcessEventBus::new());
    let bridge = PushEventBridge::new_shared(registry.clone());
    bridge.register(event_bus.as_ref());
    let event_publisher: Arc<dyn EventPublisher> = event_bus;

    // Command/query handlers
    let handlers = ConsultationHandlers {
        schedule_handler: Arc::new(ScheduleConsultationHandler::new(
            repository.clone(),
            event_publisher.clone(),
        )),
        get_handler: Arc::new(GetConsultationHandler::new(repository.clone())),
        start_handler: Arc::new(StartConsultationHandler::new(
            repository.clone(),
            event_publisher.clone(),
        )),
        end_handler: Arc::new(EndConsultationHandler::new(
            repository.clone(),
            event_publisher.clone(),
        )),
        cancel_handler: Arc::new(CancelConsultationHandler::new(
            repository.clone(),
            event_publisher.clone(),
        )),
        consent_handler: Arc::new(SetConsentHandler::new(
            repository.clone(),
            event_publisher.clone(),
        )),
        recording_handler: Arc::new(AttachRecordingHandler::new(
            repository.clone(),
            event_publisher.clone(),
        )),
        feedback_handler: Arc::new(SubmitFeedbackHandler::new(repository, event_publisher)),
    };

    let ws_state = WebSocketState::with_config(registry, &config.websocket);

    let mut app = Router::new()
        .nest("/api/consultations", consultation_routes(handlers))
        .nest("/api", websocket_router().with_state(ws_state))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )));

    if !config.server.cors_origins_list().is_empty() {
        let origins: Vec<axum::http::HeaderValue> = config
            .server
            .cors_origins_list()
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        app = app.layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        );
    }

    let addr = config.server.socket_addr()?;
    tracing::info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
