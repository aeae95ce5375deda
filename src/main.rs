//! Binary entry point: configuration, wiring and the axum server.

use std::sync::Arc;
use std::time::Duration;

use http::HeaderValue;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use carelink_rtc::adapters::auth::JwtSessionValidator;
use carelink_rtc::adapters::postgres::{
    PostgresCallSessionRepository, PostgresConversationStore,
};
use carelink_rtc::adapters::websocket::{
    router, CallChannel, ChatChannel, ConnectionGateway, NotificationChannel, RealtimeApp,
    RoomManager,
};
use carelink_rtc::application::{CallLifecycleCoordinator, MessageRelay};
use carelink_rtc::config::AppConfig;
use carelink_rtc::ports::{CallSessionRepository, ConversationStore, SessionValidator};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone())),
        )
        .init();

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .idle_timeout(config.database.idle_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("database migrations applied");
    }

    let store: Arc<dyn ConversationStore> =
        Arc::new(PostgresConversationStore::new(pool.clone()));
    let sessions: Arc<dyn CallSessionRepository> =
        Arc::new(PostgresCallSessionRepository::new(pool));
    let validator: Arc<dyn SessionValidator> = Arc::new(JwtSessionValidator::new(&config.auth));

    // One room manager per channel space; only the call space feeds the
    // lifecycle coordinator's emptiness signal.
    let chat_rooms = Arc::new(RoomManager::new(Arc::clone(&store)));
    let notification_rooms = Arc::new(RoomManager::new(Arc::clone(&store)));
    let (call_rooms, empty_rooms) = RoomManager::with_empty_signal(Arc::clone(&store));
    let call_rooms = Arc::new(call_rooms);

    let relay = Arc::new(MessageRelay::new(Arc::clone(&chat_rooms), Arc::clone(&store)));
    let lifecycle = Arc::new(CallLifecycleCoordinator::new(
        Arc::clone(&call_rooms),
        sessions,
    ));
    tokio::spawn(Arc::clone(&lifecycle).run(empty_rooms));

    let app = Arc::new(RealtimeApp {
        gateway: ConnectionGateway::new(validator, &config.auth),
        chat: Arc::new(ChatChannel::new(chat_rooms, relay)),
        notifications: Arc::new(NotificationChannel::new(notification_rooms)),
        call: Arc::new(CallChannel::new(call_rooms, lifecycle)),
    });

    let router = router(app)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )));

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, environment = ?config.server.environment, "realtime server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("realtime server stopped");
    Ok(())
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
