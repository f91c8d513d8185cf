use axum::Router;
use std::panic;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use talentflow_live::auth::{AuthGate, JwtVerifier, TokenVerifier};
use talentflow_live::config::Config;
use talentflow_live::db::{DbNotes, MemoryGateway, PersistenceGateway};
use talentflow_live::hub::Hub;
use talentflow_live::routes::{create_api_routes, create_socket_routes};
use talentflow_live::AppState;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "talentflow_live=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });

    // Initialize the persistence gateway
    let gateway: Arc<dyn PersistenceGateway> = if let Some(db_url) = &config.db_url {
        match DbNotes::new(db_url).await {
            Ok(db) => {
                info!("Database initialized successfully");
                Arc::new(db)
            }
            Err(e) => {
                error!("Failed to initialize database: {}", e);
                warn!("Falling back to in-memory note storage");
                Arc::new(MemoryGateway::new())
            }
        }
    } else {
        warn!("No database URL configured - notes will not be durable");
        Arc::new(MemoryGateway::new())
    };

    // Credential verification for the socket handshakes
    let secret = config.auth_jwt_secret.clone().unwrap_or_else(|| {
        warn!("AUTH_JWT_SECRET not configured - using insecure development secret");
        "dev-secret".to_string()
    });
    let verifier: Arc<dyn TokenVerifier> = Arc::new(JwtVerifier::new(&secret));
    let gate = Arc::new(AuthGate::new(verifier));

    // Start the hub actor that owns all live state
    let debounce = Duration::from_millis(config.autosave_debounce_ms);
    let (hub, handle) = Hub::new(gateway, debounce);
    tokio::spawn(hub.run());

    let state = AppState { hub: handle, gate };

    // Combine all routes
    let app_routes = Router::new()
        // Mount API routes
        .nest("/api", create_api_routes(state.clone()))
        // Mount the event and document-sync sockets
        .merge(create_socket_routes(state))
        // Add tracing layer
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start the HTTP server carrying both socket surfaces
    let listener = tokio::net::TcpListener::bind(config.server_address())
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", config.server_address()));

    info!("🚀 Server running on http://{}", config.server_address());
    info!(
        "📡 Event socket available at ws://{}/ws",
        config.server_address()
    );
    info!(
        "📡 Document sync available at ws://{}/sync/:note_id",
        config.server_address()
    );

    axum::serve(listener, app_routes)
        .await
        .expect("Server failed to start");
}
