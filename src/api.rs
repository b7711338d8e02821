//! REST API Server for the Loan Advisory Agent
//!
//! Exposes the advisor via HTTP endpoints
//! Integrates with frontend UI

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use uuid::Uuid;

use crate::agent::LoanAdvisor;
use crate::applications::{ApplicationStatus, ApplicationStore, NewLoanApplication};
use crate::error::AdvisorError;
use crate::models::LoanType;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub user_id: Option<String>,
    pub conversation_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitApplicationRequest {
    pub user_id: Option<String>,
    pub loan_type: LoanType,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub employment_type: String,
    pub monthly_income: f64,
    pub loan_amount: f64,
    pub purpose: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: ApplicationStatus,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub advisor: Arc<LoanAdvisor>,
    pub applications: Arc<dyn ApplicationStore>,
}

/// =============================
/// Helpers — String → UUID Mapping
/// =============================

fn stable_uuid_from_string(input: &str) -> Uuid {
    use sha2::{Digest, Sha256};

    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes)
}

fn parse_or_stable_uuid(value: Option<&str>, fallback_seed: &str) -> Uuid {
    match value {
        Some(v) if !v.trim().is_empty() => {
            Uuid::parse_str(v).unwrap_or_else(|_| stable_uuid_from_string(v))
        }
        _ => stable_uuid_from_string(fallback_seed),
    }
}

fn error_status(error: &AdvisorError) -> StatusCode {
    match error {
        AdvisorError::DatabaseError(_) | AdvisorError::StateError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        AdvisorError::ApplicationError(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    }
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Chat Endpoint
/// =============================

async fn chat_handler(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let user_id = parse_or_stable_uuid(req.user_id.as_deref(), "anonymous-user");

    // A missing conversation id starts a fresh conversation.
    let conversation_id = match req.conversation_id.as_deref() {
        Some(v) if !v.trim().is_empty() => parse_or_stable_uuid(Some(v), "conversation-fallback"),
        _ => Uuid::new_v4(),
    };

    info!(
        "chat_handler ids => conversation_id={} user_id={}",
        conversation_id, user_id
    );

    match state
        .advisor
        .handle_turn(conversation_id, user_id, &req.message)
        .await
    {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "conversation_id": outcome.conversation_id,
                "user_id": user_id,
                "reply": outcome.reply_text,
                "agent": outcome.agent_tag.to_string(),
                "context": outcome.updated_context,
            }))),
        ),
        Err(e) => (
            error_status(&e),
            Json(ApiResponse::error(format!("Turn failed: {}", e))),
        ),
    }
}

/// =============================
/// Conversation Endpoints
/// =============================

async fn list_conversations(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> (StatusCode, Json<ApiResponse>) {
    let user_id = parse_or_stable_uuid(Some(&user_id), "anonymous-user");

    match state.advisor.store().list_conversations(user_id).await {
        Ok(conversations) => (StatusCode::OK, Json(ApiResponse::success(conversations))),
        Err(e) => (
            error_status(&e),
            Json(ApiResponse::error(format!("Listing failed: {}", e))),
        ),
    }
}

async fn delete_conversation(
    State(state): State<ApiState>,
    Path(conversation_id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse>) {
    match state
        .advisor
        .store()
        .delete_conversation(conversation_id)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "deleted": conversation_id
            }))),
        ),
        Err(e) => (
            error_status(&e),
            Json(ApiResponse::error(format!("Delete failed: {}", e))),
        ),
    }
}

/// =============================
/// Loan Application Endpoints
/// =============================

async fn submit_application(
    State(state): State<ApiState>,
    Json(req): Json<SubmitApplicationRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let application = NewLoanApplication {
        user_id: parse_or_stable_uuid(req.user_id.as_deref(), "anonymous-user"),
        loan_type: req.loan_type,
        full_name: req.full_name,
        email: req.email,
        phone: req.phone,
        employment_type: req.employment_type,
        monthly_income: req.monthly_income,
        loan_amount: req.loan_amount,
        purpose: req.purpose,
    };

    match state.applications.submit(application).await {
        Ok(record) => (StatusCode::OK, Json(ApiResponse::success(record))),
        Err(e) => (
            error_status(&e),
            Json(ApiResponse::error(format!("Submission failed: {}", e))),
        ),
    }
}

async fn list_applications(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> (StatusCode, Json<ApiResponse>) {
    let user_id = parse_or_stable_uuid(Some(&user_id), "anonymous-user");

    match state.applications.list(user_id).await {
        Ok(records) => (StatusCode::OK, Json(ApiResponse::success(records))),
        Err(e) => (
            error_status(&e),
            Json(ApiResponse::error(format!("Listing failed: {}", e))),
        ),
    }
}

async fn get_application(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse>) {
    match state.applications.get(id).await {
        Ok(Some(record)) => (StatusCode::OK, Json(ApiResponse::success(record))),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Application not found".to_string())),
        ),
        Err(e) => (
            error_status(&e),
            Json(ApiResponse::error(format!("Lookup failed: {}", e))),
        ),
    }
}

async fn update_application_status(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusUpdateRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    match state.applications.update_status(id, req.status).await {
        Ok(record) => (StatusCode::OK, Json(ApiResponse::success(record))),
        Err(e) => (
            error_status(&e),
            Json(ApiResponse::error(format!("Status update failed: {}", e))),
        ),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(advisor: Arc<LoanAdvisor>, applications: Arc<dyn ApplicationStore>) -> Router {
    let state = ApiState {
        advisor,
        applications,
    };

    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat_handler))
        .route("/api/conversations/:user_id", get(list_conversations))
        .route(
            "/api/conversation/:conversation_id",
            axum::routing::delete(delete_conversation),
        )
        .route("/api/applications", post(submit_application))
        .route("/api/applications/user/:user_id", get(list_applications))
        .route("/api/applications/:id", get(get_application))
        .route(
            "/api/applications/:id/status",
            post(update_application_status),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    advisor: Arc<LoanAdvisor>,
    applications: Arc<dyn ApplicationStore>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(advisor, applications);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_uuid_is_deterministic() {
        let a = stable_uuid_from_string("user-42");
        let b = stable_uuid_from_string("user-42");
        let c = stable_uuid_from_string("user-43");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.get_version_num(), 4);
    }

    #[test]
    fn test_parse_or_stable_uuid() {
        let real = Uuid::new_v4();
        assert_eq!(
            parse_or_stable_uuid(Some(&real.to_string()), "fallback"),
            real
        );
        assert_eq!(
            parse_or_stable_uuid(Some("not-a-uuid"), "fallback"),
            stable_uuid_from_string("not-a-uuid")
        );
        assert_eq!(
            parse_or_stable_uuid(None, "fallback"),
            stable_uuid_from_string("fallback")
        );
        assert_eq!(
            parse_or_stable_uuid(Some("   "), "fallback"),
            stable_uuid_from_string("fallback")
        );
    }
}
