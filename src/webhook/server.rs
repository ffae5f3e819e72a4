// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP surface of the webhook.
//!
//! Endpoints:
//! - `GET /healthz` - liveness (always 200)
//! - `GET /readyz` - readiness (200 once solvers are initialized)
//! - `GET /metrics` - Prometheus metrics in text format
//! - `GET /apis`, `GET /apis/{group}`, `GET /apis/{group}/v1alpha1` - API discovery
//!   for the kube-apiserver aggregation layer
//! - `POST /apis/{group}/v1alpha1/{solver}` - challenge requests (also accepted
//!   under `.../namespaces/{namespace}/{solver}`)

use super::{SolverRegistry, WebhookError};
use crate::challenge::{ChallengeAction, ChallengePayload, ChallengeResponse};
use crate::constants::{KIND_CHALLENGE_PAYLOAD, VERB_CREATE, WEBHOOK_API_VERSION};
use crate::metrics::gather_metrics;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{
    APIGroup, APIGroupList, APIResource, APIResourceList, GroupVersionForDiscovery, Status,
};
use rustls::ServerConfig;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, warn};

/// Shared state of the HTTP handlers.
pub struct AppState {
    /// API group served, e.g. `acme.example.com`
    pub group_name: String,
    /// Solvers addressable under the group
    pub registry: SolverRegistry,
    /// Flipped once every solver has been initialized
    pub ready: Arc<AtomicBool>,
}

impl AppState {
    #[must_use]
    pub fn new(group_name: &str, registry: SolverRegistry) -> Self {
        Self {
            group_name: group_name.to_string(),
            registry,
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    fn group_version(&self) -> String {
        format!("{}/{WEBHOOK_API_VERSION}", self.group_name)
    }
}

#[derive(Debug, Deserialize)]
struct GroupPath {
    group: String,
}

#[derive(Debug, Deserialize)]
struct VersionPath {
    group: String,
    version: String,
}

#[derive(Debug, Deserialize)]
struct SolverPath {
    group: String,
    version: String,
    solver: String,
    #[serde(default)]
    namespace: Option<String>,
}

/// Build the webhook router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .route("/metrics", get(metrics_handler))
        .route("/apis", get(api_group_list_handler))
        .route("/apis/{group}", get(api_group_handler))
        .route("/apis/{group}/{version}", get(api_resource_list_handler))
        .route("/apis/{group}/{version}/{solver}", post(challenge_handler))
        .route(
            "/apis/{group}/{version}/namespaces/{namespace}/{solver}",
            post(challenge_handler),
        )
        .with_state(state)
}

/// Bind `addr` and serve `app` until `stop` flips to `true`.
///
/// Serves HTTPS when `tls` is given, plain HTTP otherwise.
///
/// # Errors
///
/// Returns [`WebhookError::Io`] if the address cannot be bound or the plain
/// HTTP server fails.
pub async fn serve(
    addr: SocketAddr,
    tls: Option<Arc<ServerConfig>>,
    app: Router,
    stop: watch::Receiver<bool>,
) -> Result<(), WebhookError> {
    let listener = TcpListener::bind(addr).await?;
    serve_listener(listener, tls, app, stop).await
}

/// Serve `app` on an already bound listener until `stop` flips to `true`.
///
/// # Errors
///
/// Returns [`WebhookError::Io`] if the plain HTTP server fails.
pub async fn serve_listener(
    listener: TcpListener,
    tls: Option<Arc<ServerConfig>>,
    app: Router,
    stop: watch::Receiver<bool>,
) -> Result<(), WebhookError> {
    let addr = listener.local_addr()?;
    match tls {
        None => {
            info!(%addr, "Webhook listening (HTTP)");
            axum::serve(listener, app)
                .with_graceful_shutdown(stopped(stop))
                .await?;
        }
        Some(config) => {
            info!(%addr, "Webhook listening (HTTPS)");
            serve_tls(listener, TlsAcceptor::from(config), app, stop).await;
        }
    }
    info!("Webhook server stopped");
    Ok(())
}

async fn stopped(mut stop: watch::Receiver<bool>) {
    // A dropped sender also ends the wait
    let _ = stop.wait_for(|stopped| *stopped).await;
}

async fn serve_tls(
    listener: TcpListener,
    acceptor: TlsAcceptor,
    app: Router,
    stop: watch::Receiver<bool>,
) {
    let shutdown = stopped(stop);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => return,
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "Failed to accept connection");
                        continue;
                    }
                };

                let acceptor = acceptor.clone();
                let service = TowerToHyperService::new(app.clone());
                tokio::spawn(async move {
                    let stream = match acceptor.accept(stream).await {
                        Ok(stream) => stream,
                        Err(e) => {
                            debug!(%peer, error = %e, "TLS handshake failed");
                            return;
                        }
                    };
                    if let Err(e) = auto::Builder::new(TokioExecutor::new())
                        .serve_connection(TokioIo::new(stream), service)
                        .await
                    {
                        debug!(%peer, error = %e, "Connection ended with error");
                    }
                });
            }
        }
    }
}

async fn healthz_handler() -> impl IntoResponse {
    StatusCode::OK
}

async fn readyz_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.ready.load(Ordering::Relaxed) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn metrics_handler() -> impl IntoResponse {
    match gather_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        ),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {e}"),
            )
        }
    }
}

fn api_group(state: &AppState) -> APIGroup {
    let version = GroupVersionForDiscovery {
        group_version: state.group_version(),
        version: WEBHOOK_API_VERSION.to_string(),
    };
    APIGroup {
        name: state.group_name.clone(),
        preferred_version: Some(version.clone()),
        versions: vec![version],
        ..Default::default()
    }
}

async fn api_group_list_handler(State(state): State<Arc<AppState>>) -> Json<APIGroupList> {
    Json(APIGroupList {
        groups: vec![api_group(&state)],
    })
}

async fn api_group_handler(
    State(state): State<Arc<AppState>>,
    Path(path): Path<GroupPath>,
) -> Response {
    if path.group != state.group_name {
        return not_found(&format!("API group {} is not served", path.group));
    }
    Json(api_group(&state)).into_response()
}

async fn api_resource_list_handler(
    State(state): State<Arc<AppState>>,
    Path(path): Path<VersionPath>,
) -> Response {
    if path.group != state.group_name || path.version != WEBHOOK_API_VERSION {
        return not_found(&format!(
            "API version {}/{} is not served",
            path.group, path.version
        ));
    }

    let resources = state
        .registry
        .names()
        .into_iter()
        .map(|name| APIResource {
            name: name.to_string(),
            singular_name: name.to_string(),
            kind: KIND_CHALLENGE_PAYLOAD.to_string(),
            namespaced: false,
            verbs: vec![VERB_CREATE.to_string()],
            ..Default::default()
        })
        .collect();

    Json(APIResourceList {
        group_version: state.group_version(),
        resources,
    })
    .into_response()
}

async fn challenge_handler(
    State(state): State<Arc<AppState>>,
    Path(path): Path<SolverPath>,
    body: Bytes,
) -> Response {
    if path.group != state.group_name || path.version != WEBHOOK_API_VERSION {
        return not_found(&format!(
            "API version {}/{} is not served",
            path.group, path.version
        ));
    }
    let Some(solver) = state.registry.get(&path.solver) else {
        return not_found(&format!("solver {} is not registered", path.solver));
    };

    let mut payload: ChallengePayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => return bad_request(&format!("failed to decode ChallengePayload: {e}")),
    };
    let Some(request) = payload.request.take() else {
        return bad_request("ChallengePayload has no request");
    };
    let Some(action) = request.action else {
        return bad_request("challenge request has no action");
    };

    info!(
        solver = %path.solver,
        action = %action,
        uid = %request.uid,
        fqdn = %request.resolved_fqdn,
        namespace = path.namespace.as_deref().unwrap_or_default(),
        "Handling challenge request"
    );

    let start = Instant::now();
    let result = match action {
        ChallengeAction::Present => solver.present(&request).await,
        ChallengeAction::CleanUp => solver.clean_up(&request).await,
    };

    let response = match result {
        Ok(()) => {
            info!(
                action = %action,
                uid = %request.uid,
                duration_ms = start.elapsed().as_millis(),
                "Challenge request succeeded"
            );
            ChallengeResponse {
                uid: request.uid.clone(),
                success: true,
                status: None,
            }
        }
        Err(e) => {
            error!(
                action = %action,
                uid = %request.uid,
                error = %e,
                "Challenge request failed"
            );
            ChallengeResponse {
                uid: request.uid.clone(),
                success: false,
                status: Some(Status {
                    status: Some("Failure".to_string()),
                    message: Some(e.to_string()),
                    ..Default::default()
                }),
            }
        }
    };

    Json(ChallengePayload {
        api_version: state.group_version(),
        kind: KIND_CHALLENGE_PAYLOAD.to_string(),
        request: Some(request),
        response: Some(response),
    })
    .into_response()
}

fn failure(code: StatusCode, reason: &str, message: &str) -> Response {
    warn!(code = code.as_u16(), reason, message, "Rejecting webhook request");
    let status = Status {
        status: Some("Failure".to_string()),
        code: Some(i32::from(code.as_u16())),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        ..Default::default()
    };
    (code, Json(status)).into_response()
}

fn not_found(message: &str) -> Response {
    failure(StatusCode::NOT_FOUND, "NotFound", message)
}

fn bad_request(message: &str) -> Response {
    failure(StatusCode::BAD_REQUEST, "BadRequest", message)
}
