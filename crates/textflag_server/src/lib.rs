//! HTTP server wiring for textflag (API routes, handlers, and shared state).

/// HTTP error mapping for API handlers.
pub mod error;
/// HTTP handlers for document, flag, selection and render endpoints.
pub mod handlers;

pub use textflag_core::{config, db, models, AppError, Config, Database};

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' data:; frame-ancestors 'none'; base-uri 'self'; form-action 'self'";

/// Shared state passed to HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Construct shared application state.
    ///
    /// # Arguments
    /// - `config`: Loaded configuration.
    /// - `db`: Open database handle.
    pub fn new(config: Config, db: Database) -> Self {
        Self {
            db: Arc::new(db),
            config: Arc::new(config),
        }
    }
}

/// Create the application router with all routes and middleware.
///
/// # Arguments
/// - `state`: Shared application state.
/// - `allow_public_access`: Whether to allow cross-origin requests from any origin.
pub fn create_app(state: AppState, allow_public_access: bool) -> Router {
    let cors_port = state.config.port;
    create_app_with_cors_port(state, allow_public_access, cors_port)
}

/// Resolve the listener address from the `BIND` override and security policy.
///
/// # Returns
/// A socket address that stays on loopback unless public access is enabled.
pub fn resolve_bind_address(config: &Config, allow_public_access: bool) -> SocketAddr {
    let default_bind = SocketAddr::from(([127, 0, 0, 1], config.port));
    let requested = match std::env::var("BIND") {
        Ok(value) => match value.trim().parse::<SocketAddr>() {
            Ok(addr) => addr,
            Err(err) => {
                tracing::warn!(
                    "Invalid BIND='{}': {}. Falling back to {}",
                    value,
                    err,
                    default_bind
                );
                default_bind
            }
        },
        Err(_) => default_bind,
    };

    if allow_public_access || requested.ip().is_loopback() {
        return requested;
    }

    tracing::warn!(
        "Non-loopback bind {} requested without ALLOW_PUBLIC_ACCESS; forcing 127.0.0.1",
        requested
    );
    SocketAddr::from(([127, 0, 0, 1], requested.port()))
}

fn cors_layer(allow_public_access: bool, cors_port: u16) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::DELETE];
    if allow_public_access {
        return CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(methods)
            .allow_headers(tower_http::cors::Any);
    }

    let origins: Vec<HeaderValue> = ["localhost", "127.0.0.1"]
        .iter()
        .filter_map(|host| HeaderValue::from_str(&format!("http://{}:{}", host, cors_port)).ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

fn create_app_with_cors_port(state: AppState, allow_public_access: bool, cors_port: u16) -> Router {
    use handlers::{document, flag, selection};

    let body_limit = state.config.max_document_size;
    Router::new()
        .route(
            "/api/documents",
            get(document::list_documents).post(document::create_document),
        )
        .route("/api/documents/:id", get(document::get_document))
        .route("/api/documents/:id/plain", get(document::get_plain_text))
        .route("/api/documents/:id/rendered", get(document::get_rendered))
        .route(
            "/api/documents/:id/selection",
            post(selection::resolve_selection),
        )
        .route(
            "/api/documents/:id/flags",
            get(flag::list_flags)
                .post(flag::create_flag)
                .delete(flag::clear_flags),
        )
        .route("/api/documents/:id/flags/import", post(flag::import_flags))
        .route("/api/documents/:id/flags/export", get(flag::export_flags))
        .route("/api/flags/:id", delete(flag::delete_flag))
        .with_state(state)
        .layer(
            tower::ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(body_limit))
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors_layer(allow_public_access, cors_port))
                .layer(SetResponseHeaderLayer::overriding(
                    header::CONTENT_SECURITY_POLICY,
                    HeaderValue::from_static(CONTENT_SECURITY_POLICY),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                )),
        )
}

fn listener_cors_port(listener: &tokio::net::TcpListener, fallback_port: u16) -> u16 {
    listener
        .local_addr()
        .map(|addr| addr.port())
        .unwrap_or(fallback_port)
}

/// Run the server until `shutdown_signal` resolves.
///
/// # Errors
/// Returns any I/O error produced by `axum::serve`.
pub async fn serve_router(
    listener: tokio::net::TcpListener,
    state: AppState,
    allow_public_access: bool,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let cors_port = listener_cors_port(&listener, state.config.port);
    let app = create_app_with_cors_port(state, allow_public_access, cors_port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
}

#[cfg(test)]
mod tests {
    use super::{listener_cors_port, resolve_bind_address};
    use std::net::SocketAddr;
    use textflag_core::constants::{DEFAULT_MAX_DOCUMENT_SIZE, DEFAULT_MAX_IMPORT_ROWS, DEFAULT_PORT};
    use textflag_core::env::{env_lock, EnvGuard};
    use textflag_core::Config;

    fn config(port: u16) -> Config {
        Config {
            db_path: String::from("/tmp/textflag-db"),
            port,
            max_document_size: DEFAULT_MAX_DOCUMENT_SIZE,
            max_import_rows: DEFAULT_MAX_IMPORT_ROWS,
        }
    }

    #[tokio::test]
    async fn listener_cors_port_uses_bound_listener_port() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener");
        let expected = listener.local_addr().expect("listener addr").port();
        assert_eq!(listener_cors_port(&listener, DEFAULT_PORT), expected);
    }

    #[test]
    fn resolve_bind_address_enforces_loopback_when_public_access_disabled() {
        let _lock = env_lock().lock().expect("env lock");
        let _bind = EnvGuard::set("BIND", "0.0.0.0:4040");
        let resolved = resolve_bind_address(&config(4040), false);
        assert_eq!(resolved, SocketAddr::from(([127, 0, 0, 1], 4040)));

        let public = resolve_bind_address(&config(4040), true);
        assert_eq!(public, SocketAddr::from(([0, 0, 0, 0], 4040)));
    }

    #[test]
    fn resolve_bind_address_falls_back_on_missing_or_invalid_bind() {
        let _lock = env_lock().lock().expect("env lock");
        {
            let _bind = EnvGuard::remove("BIND");
            assert_eq!(
                resolve_bind_address(&config(4041), false),
                SocketAddr::from(([127, 0, 0, 1], 4041))
            );
        }
        let _bind = EnvGuard::set("BIND", "bad:host");
        assert_eq!(
            resolve_bind_address(&config(4041), false),
            SocketAddr::from(([127, 0, 0, 1], 4041))
        );
    }
}
