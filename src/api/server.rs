//! HTTP API server

use axum::{
    http::{header, HeaderName, HeaderValue, Method, Uri},
    middleware,
    routing::{get, post},
    Router,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{require_auth, AuthLayer, AuthService, MemorySessionStore, SessionStore};
use crate::config::{Config, CorsConfig, SessionBackend, SessionConfig};
use crate::error::{Error, Result};

use super::routes;

/// Application state shared across handlers
pub struct AppState {
    pub auth: Arc<AuthService>,
}

pub type SharedState = Arc<AppState>;

/// Run the HTTP API server
pub async fn run_server(config: Config, host: &str, port: u16) -> Result<()> {
    let store = build_store(&config.session).await?;
    let app = build_app(&config, store)?;

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Open the configured session store
pub async fn build_store(config: &SessionConfig) -> Result<Arc<dyn SessionStore>> {
    match config.backend {
        SessionBackend::Memory => {
            let store = MemorySessionStore::new();
            store.spawn_sweeper(Duration::from_secs(config.sweep_interval.max(1)));
            tracing::info!("using in-memory session store");
            Ok(Arc::new(store))
        }
        #[cfg(feature = "redis")]
        SessionBackend::Redis => {
            let store = crate::auth::session::RedisSessionStore::connect(
                &config.redis_url,
                Duration::from_millis(config.op_timeout_ms),
            )
            .await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "redis"))]
        SessionBackend::Redis => Err(Error::Config(
            "session.backend = \"redis\" requires building with the `redis` feature".to_string(),
        )),
    }
}

/// Wire the auth service, middleware and routes together
pub fn build_app(config: &Config, store: Arc<dyn SessionStore>) -> Result<Router> {
    let auth = Arc::new(AuthService::from_config(config, Arc::clone(&store))?);
    let layer = AuthLayer::from_config(&config.middleware, auth.access_codec().clone(), store)?;
    let cors = cors_layer(&config.cors, &config.middleware.header)?;

    if config.middleware.strict_session_check {
        tracing::info!("strict session check enabled: every request consults the session store");
    }
    if config.users.is_empty() {
        tracing::warn!("no users configured; every login will be rejected");
    }

    Ok(create_router(Arc::new(AppState { auth }), layer, cors))
}

/// Credentialed CORS restricted to the configured origin hostnames
pub fn cors_layer(config: &CorsConfig, token_header: &str) -> Result<CorsLayer> {
    let token_header = HeaderName::try_from(token_header)
        .map_err(|e| Error::Config(format!("invalid middleware.header: {}", e)))?;
    let hostnames: Arc<BTreeSet<String>> = Arc::new(
        config
            .hostnames
            .iter()
            .map(|h| h.to_ascii_lowercase())
            .collect(),
    );

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin_allowed(&hostnames, origin)
        }))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::CONTENT_LENGTH,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
            token_header,
        ])
        .max_age(Duration::from_secs(config.max_age)))
}

fn origin_allowed(hostnames: &BTreeSet<String>, origin: &HeaderValue) -> bool {
    let Ok(origin) = origin.to_str() else {
        return false;
    };
    origin
        .parse::<Uri>()
        .ok()
        .and_then(|uri| uri.host().map(|host| host.to_ascii_lowercase()))
        .is_some_and(|host| hostnames.contains(&host))
}

/// Create the router with all routes
pub fn create_router(state: SharedState, layer: AuthLayer, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        // User routes
        .route("/user/login", post(routes::login))
        .route("/user/refresh_token", post(routes::refresh_token))
        .route("/user/logout", get(routes::logout))
        // Middleware
        .layer(middleware::from_fn_with_state(layer, require_auth))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
