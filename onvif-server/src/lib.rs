//! ONVIF Server Library
//!
//! Presents a single RTSP stream as an ONVIF Profile S camera. SOAP POSTs to
//! the service paths go through the [`ServiceRegistry`]; everything else on
//! the listener is plain HTTP.
//!
//! Faults are in-band: a SOAP request to a registered path always gets HTTP
//! 200. Paths without a service get 404.

mod registry;
pub mod services;
mod templates;

pub use registry::{
    Access, Handler, Operation, OperationContext, OperationTable, ServiceCapability, ServiceKind,
    ServiceRegistry, SoapResponse,
};
pub use services::default_registry;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use config_manager::AuthConfig;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use ws_security::{Authenticator, Credentials};

/// Body of a GET on a service path
pub const SERVICE_NOTICE: &str = "ONVIF Service Endpoint - Use POST for SOAP requests";

/// Build the authentication policy, or `None` when no credentials are set
pub fn authenticator(auth: &AuthConfig) -> Option<Authenticator> {
    let (username, password) = auth.credentials()?;
    let max_age =
        (auth.max_token_age_secs > 0).then(|| Duration::from_secs(auth.max_token_age_secs));

    Some(
        Authenticator::new(Credentials {
            username: username.to_string(),
            password: password.to_string(),
        })
        .required(auth.required)
        .max_age(max_age)
        .allow_password_text(auth.allow_password_text),
    )
}

/// Bind the HTTP listener. Failing here is fatal for the bridge.
pub async fn bind(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind ONVIF listener on {}", addr))
}

/// HTTP routes: `/health` plus every registered service path
pub fn router(registry: Arc<ServiceRegistry>) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .fallback(handle_service)
        .with_state(registry)
}

/// Serve until `shutdown` is cancelled, then drain in-flight requests
pub async fn run_onvif_server(
    listener: TcpListener,
    registry: Arc<ServiceRegistry>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!("ONVIF server listening on {}", addr);

    axum::serve(listener, router(registry))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    info!("ONVIF server stopped");
    Ok(())
}

/// Unauthenticated liveness probe
async fn handle_health(State(registry): State<Arc<ServiceRegistry>>) -> impl IntoResponse {
    let device = registry.device();
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "camera_name": device.name,
        "onvif_port": device.http_port,
        "stream_uri": device.stream_uri_masked(),
    }))
}

/// SOAP dispatch for POST, a notice for GET, 404 for anything else
async fn handle_service(
    State(registry): State<Arc<ServiceRegistry>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let path = uri.path();

    match method {
        Method::POST => match registry.handle_request(path, &body) {
            Some(response) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, response.content_type())],
                response.xml,
            )
                .into_response(),
            None => {
                debug!("POST to unknown path {}", path);
                StatusCode::NOT_FOUND.into_response()
            }
        },
        Method::GET if registry.is_service_path(path) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            SERVICE_NOTICE,
        )
            .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}
