// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admin REST API built on axum.
//!
//! Every endpoint answers with an [`ApiResponse`] envelope. Failures carry an
//! error code and message and no `data`.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use pubreward_config::model::AdminConfig;
use pubreward_core::PubrewardError;
use pubreward_core::types::{DealTag, UserTaskFilter, ViolationFilter};

use crate::service::AdminService;

/// Response envelope shared by all endpoints.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub error_code: String,
    pub error_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            error_code: "ok".into(),
            error_message: "success".into(),
            data: Some(data),
        }
    }
}

fn status_for(err: &PubrewardError) -> StatusCode {
    match err {
        PubrewardError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        PubrewardError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        PubrewardError::NotFound(_) => StatusCode::NOT_FOUND,
        PubrewardError::Duplicate(_) => StatusCode::CONFLICT,
        PubrewardError::Busy(_) => StatusCode::SERVICE_UNAVAILABLE,
        PubrewardError::Ledger { .. }
        | PubrewardError::ChannelTimeout { .. }
        | PubrewardError::Timeout { .. }
        | PubrewardError::Publish { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: PubrewardError) -> Response {
    let status = status_for(&err);
    if status.is_server_error() {
        warn!(error = %err, "admin request failed");
    }
    let body: ApiResponse<()> = ApiResponse {
        error_code: err.code().to_string(),
        error_message: err.to_string(),
        data: None,
    };
    (status, Json(body)).into_response()
}

fn respond<T: Serialize>(result: Result<T, PubrewardError>) -> Response {
    match result {
        Ok(data) => Json(ApiResponse::ok(data)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Unwraps a JSON body, answering malformed input with the envelope.
macro_rules! body {
    ($payload:expr) => {
        match $payload {
            Ok(Json(body)) => body,
            Err(rejection) => {
                return error_response(PubrewardError::InvalidInput(rejection.body_text()));
            }
        }
    };
}

type AppState = Arc<AdminService>;

#[derive(Debug, Deserialize)]
pub struct ClientRequest {
    pub client_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub client_id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub ledger_address: String,
}

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub plaintiff: String,
    pub defendant: String,
    pub message_key: String,
    #[serde(default)]
    pub reasons: String,
}

#[derive(Debug, Deserialize)]
pub struct DealViolationRequest {
    pub plaintiff: String,
    pub defendant: String,
    pub message_key: String,
    pub deal_tag: DealTag,
}

#[derive(Debug, Default, Deserialize)]
pub struct SensitiveQuery {
    #[serde(default)]
    pub deal_tag: Option<DealTag>,
}

#[derive(Debug, Deserialize)]
pub struct DealSensitiveRequest {
    pub message_key: String,
    pub deal_tag: DealTag,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub client_id: String,
    pub login_time: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreatedNftRequest {
    pub client_id: String,
    pub nft_created_time: i64,
    pub nft_tx_hash: String,
    #[serde(default)]
    pub nft_token_id: String,
    #[serde(default)]
    pub nft_stored_url: String,
}

async fn all_likes(State(svc): State<AppState>) -> Response {
    respond(svc.like_sums(None).await)
}

async fn someone_likes(
    State(svc): State<AppState>,
    payload: Result<Json<ClientRequest>, JsonRejection>,
) -> Response {
    let req = body!(payload);
    respond(svc.like_sums(Some(&req.client_id)).await)
}

async fn all_given_likes(State(svc): State<AppState>) -> Response {
    respond(svc.given_like_sums(None).await)
}

async fn someone_given_likes(
    State(svc): State<AppState>,
    payload: Result<Json<ClientRequest>, JsonRejection>,
) -> Response {
    let req = body!(payload);
    respond(svc.given_like_sums(Some(&req.client_id)).await)
}

async fn profiles(State(svc): State<AppState>) -> Response {
    respond(svc.profiles().await)
}

async fn profile(
    State(svc): State<AppState>,
    payload: Result<Json<ClientRequest>, JsonRejection>,
) -> Response {
    let req = body!(payload);
    respond(svc.profile(&req.client_id).await)
}

async fn register_address(
    State(svc): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Response {
    let req = body!(payload);
    respond(
        svc.register_address(&req.client_id, req.name.as_deref(), &req.ledger_address)
            .await
            .map(|()| "success"),
    )
}

async fn report_violation(
    State(svc): State<AppState>,
    payload: Result<Json<ReportRequest>, JsonRejection>,
) -> Response {
    let req = body!(payload);
    respond(
        svc.report_violation(&req.plaintiff, &req.defendant, &req.message_key, &req.reasons)
            .await,
    )
}

async fn list_violations(
    State(svc): State<AppState>,
    payload: Result<Json<ViolationFilter>, JsonRejection>,
) -> Response {
    let filter = body!(payload);
    respond(svc.list_violations(&filter).await)
}

async fn deal_violation(
    State(svc): State<AppState>,
    payload: Result<Json<DealViolationRequest>, JsonRejection>,
) -> Response {
    let req = body!(payload);
    respond(
        svc.deal_violation(&req.plaintiff, &req.defendant, &req.message_key, req.deal_tag)
            .await
            .map(|()| "success"),
    )
}

async fn sensitive_words(
    State(svc): State<AppState>,
    payload: Result<Json<SensitiveQuery>, JsonRejection>,
) -> Response {
    let req = body!(payload);
    respond(svc.list_sensitive_words(req.deal_tag).await)
}

async fn deal_sensitive_word(
    State(svc): State<AppState>,
    payload: Result<Json<DealSensitiveRequest>, JsonRejection>,
) -> Response {
    let req = body!(payload);
    respond(
        svc.deal_sensitive_word(&req.message_key, req.deal_tag)
            .await
            .map(|()| "success"),
    )
}

async fn notify_login(
    State(svc): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let req = body!(payload);
    respond(
        svc.notify_login(&req.client_id, req.login_time)
            .await
            .map(|()| "success"),
    )
}

async fn notify_created_nft(
    State(svc): State<AppState>,
    payload: Result<Json<CreatedNftRequest>, JsonRejection>,
) -> Response {
    let req = body!(payload);
    respond(
        svc.notify_created_nft(
            &req.client_id,
            req.nft_created_time,
            &req.nft_tx_hash,
            &req.nft_token_id,
            &req.nft_stored_url,
        )
        .await
        .map(|()| "success"),
    )
}

async fn user_tasks(
    State(svc): State<AppState>,
    payload: Result<Json<UserTaskFilter>, JsonRejection>,
) -> Response {
    let filter = body!(payload);
    respond(svc.user_tasks(&filter).await)
}

async fn whoami(State(svc): State<AppState>) -> Response {
    Json(ApiResponse::ok(svc.whoami())).into_response()
}

/// Builds the admin router under `/ssb/api`.
pub fn build_router(service: Arc<AdminService>) -> Router {
    Router::new()
        .route("/ssb/api/likes", get(all_likes).post(someone_likes))
        .route("/ssb/api/set-likes", get(all_given_likes).post(someone_given_likes))
        .route("/ssb/api/node-infos", get(profiles))
        .route("/ssb/api/id2profile", post(profile))
        .route("/ssb/api/register-address", post(register_address))
        .route("/ssb/api/tipped-who-off", post(report_violation))
        .route("/ssb/api/tipped-off-info", post(list_violations))
        .route("/ssb/api/deal-tipped-off", post(deal_violation))
        .route("/ssb/api/sensitive-word-events", post(sensitive_words))
        .route("/ssb/api/deal-sensitive-word", post(deal_sensitive_word))
        .route("/ssb/api/notify-login", post(notify_login))
        .route("/ssb/api/notify-created-nft", post(notify_created_nft))
        .route("/ssb/api/user-daily-tasks", post(user_tasks))
        .route("/ssb/api/pub-whoami", get(whoami))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(service)
}

/// Serves `router` until `cancel` fires.
pub async fn serve(
    config: &AdminConfig,
    router: Router,
    cancel: CancellationToken,
) -> Result<(), PubrewardError> {
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| PubrewardError::Internal(format!("failed to bind admin API to {addr}: {e}")))?;

    info!("admin API listening on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| PubrewardError::Internal(format!("admin API server error: {e}")))
}
