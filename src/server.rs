//! REST endpoints for the practice-activation integrations.
//!
//! Route layout mirrors the vendor split: `/api/zoho/*` for CRM sync,
//! `/api/pandadoc/*` for e-signature, `/api/twilio/*` for telephony,
//! `/api/eligibility/*` for the eligibility engine. Handlers are thin:
//! validate, normalize, delegate to the vendor client, shape JSON.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ZohoConfig;
use crate::crm::{CrmRecordTriple, CrmSync, LeadRecord, ZohoClient, token};
use crate::eligibility::{PatientInput, evaluate_patient_eligibility};
use crate::error::{ConfigError, CrmError, Error};
use crate::esign::{DocumentType, DocumentWebhookEvent, PandaDocClient};
use crate::practice::{ContractStatus, Practice};
use crate::telephony::{CallOptions, SmsReplyAction, TwilioClient, TwilioWebhookPayload};

/// Shared state for all API routes.
#[derive(Clone)]
pub struct AppState {
    pub http: reqwest::Client,
    pub zoho: Option<ZohoConfig>,
    pub esign: Option<Arc<PandaDocClient>>,
    pub telephony: Option<Arc<TwilioClient>>,
}

/// Build the full API router.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/zoho/sync-full", post(sync_full))
        .route("/api/zoho/sync-provider", post(sync_provider))
        .route("/api/zoho/oauth/callback", get(zoho_oauth_callback))
        .route("/api/zoho/webhook", post(zoho_webhook))
        .route("/api/pandadoc/create-document", post(create_document))
        .route("/api/pandadoc/document-status", get(document_status))
        .route("/api/pandadoc/webhook", post(pandadoc_webhook))
        .route("/api/twilio/send-sms", post(send_sms))
        .route("/api/twilio/make-call", post(make_call))
        .route("/api/twilio/webhooks/call-status", post(call_status))
        .route("/api/twilio/webhooks/sms-status", post(sms_status))
        .route("/api/twilio/webhooks/sms-reply", post(sms_reply))
        .route("/api/eligibility/evaluate", post(evaluate_eligibility))
        .with_state(state)
}

// ── Error mapping ──────────────────────────────────────────────────

/// JSON error response with an HTTP status.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn unconfigured(subsystem: &str, hint: &str) -> Self {
        ConfigError::SubsystemDisabled {
            subsystem: subsystem.to_string(),
            hint: hint.to_string(),
        }
        .into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({"success": false, "error": self.message})),
        )
            .into_response()
    }
}

impl From<ConfigError> for ApiError {
    fn from(e: ConfigError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: e.to_string(),
        }
    }
}

impl From<CrmError> for ApiError {
    fn from(e: CrmError) -> Self {
        // Terminal sync errors surface the vendor's own message, not a
        // generic wrapper, so operators can see the exact complaint.
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: e.to_string(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: e.to_string(),
        }
    }
}

impl From<crate::error::EsignError> for ApiError {
    fn from(e: crate::error::EsignError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: e.to_string(),
        }
    }
}

// ── CRM sync ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncFullRequest {
    #[serde(default)]
    practice_name: String,
    #[serde(default)]
    provider_name: String,
    #[serde(default)]
    provider_email: String,
    phone: Option<String>,
    address: Option<String>,
    npi: Option<String>,
    #[serde(alias = "providerURL")]
    provider_url: Option<String>,
    medicare_potential: Option<String>,
    other_potential: Option<String>,
    status: Option<String>,
    contract_status: Option<String>,
    internal_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct SyncFullResponse {
    success: bool,
    message: &'static str,
    details: CrmRecordTriple,
}

/// Full hierarchy sync: Account, Contact, and Deal for one practice.
async fn sync_full(
    State(state): State<AppState>,
    Json(req): Json<SyncFullRequest>,
) -> Result<Json<SyncFullResponse>, ApiError> {
    if req.practice_name.is_empty() || req.provider_email.is_empty() {
        return Err(ApiError::bad_request("Missing required sync data"));
    }
    let sync = crm_sync(&state).await?;

    let practice = Practice {
        practice_name: req.practice_name,
        internal_practice_id: req
            .internal_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| req.provider_email.clone()),
        provider_name: req.provider_name,
        provider_email: req.provider_email,
        provider_phone: req.phone,
        provider_address: req.address,
        provider_npi: req.npi,
        provider_url: req.provider_url,
        medicare_potential: req.medicare_potential,
        other_potential: req.other_potential,
        onboarding_status: req.status.unwrap_or_else(|| "Initiated".to_string()),
        contract_status: ContractStatus::parse(req.contract_status.as_deref()),
    };

    let details = sync.upsert_hierarchy(&practice).await?;
    Ok(Json(SyncFullResponse {
        success: true,
        message: "Full sync complete",
        details,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncProviderRequest {
    #[serde(default)]
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    practice_name: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    npi: Option<String>,
    status: Option<String>,
    contract_status: Option<String>,
}

/// Flat single-record lead sync keyed on email.
async fn sync_provider(
    State(state): State<AppState>,
    Json(req): Json<SyncProviderRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.email.is_empty() {
        return Err(ApiError::bad_request("Email is required"));
    }
    let config = zoho_config(&state)?;
    let sync = crm_sync(&state).await?;

    let lead = LeadRecord {
        email: req.email,
        first_name: req.first_name,
        last_name: req.last_name,
        practice_name: req.practice_name,
        phone: req.phone,
        address: req.address,
        npi: req.npi,
        status: req.status,
        contract_status: req.contract_status,
    };
    let record_id = sync.upsert_lead(&config.lead_module, &lead).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "recordId": record_id,
        "message": "Record synced",
    })))
}

#[derive(Debug, Deserialize)]
struct OAuthCallbackQuery {
    code: Option<String>,
}

/// One-time authorization-code exchange; returns the vendor token
/// payload so the operator can copy the refresh token into the env.
async fn zoho_oauth_callback(
    State(state): State<AppState>,
    Query(query): Query<OAuthCallbackQuery>,
) -> Result<Json<Value>, ApiError> {
    let Some(code) = query.code else {
        return Err(ApiError::bad_request("Missing authorization code"));
    };
    let config = zoho_config(&state)?;
    let tokens = token::exchange_authorization_code(&state.http, config, &code).await?;
    Ok(Json(tokens))
}

/// Inbound CRM webhook: log and acknowledge.
async fn zoho_webhook(Json(event): Json<Value>) -> Json<Value> {
    tracing::info!(
        module = %event.get("module").and_then(serde_json::Value::as_str).unwrap_or("?"),
        record = ?event.get("record"),
        changes = ?event.get("changes"),
        "CRM webhook received"
    );
    Json(serde_json::json!({
        "success": true,
        "message": "CRM notification received and logged",
    }))
}

fn zoho_config(state: &AppState) -> Result<&ZohoConfig, ApiError> {
    state.zoho.as_ref().ok_or_else(|| {
        ApiError::unconfigured("CRM sync", "Set the ZOHO_* environment variables.")
    })
}

/// Build a request-scoped sync orchestrator: token refreshed fresh,
/// client owned by this invocation, nothing shared across requests.
async fn crm_sync(state: &AppState) -> Result<CrmSync, ApiError> {
    let config = zoho_config(state)?;
    let client = ZohoClient::connect(config, state.http.clone()).await?;
    Ok(CrmSync::new(Arc::new(client)))
}

// ── E-signature ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateDocumentRequest {
    document_type: DocumentType,
    #[serde(default)]
    user_email: String,
    #[serde(default)]
    user_name: String,
    #[serde(default)]
    practice_name: String,
}

async fn create_document(
    State(state): State<AppState>,
    Json(req): Json<CreateDocumentRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.user_email.is_empty() || req.user_name.is_empty() {
        return Err(ApiError::bad_request("Missing required fields"));
    }
    let esign = esign_client(&state)?;
    let session = esign
        .create_and_send(
            req.document_type,
            &req.user_email,
            &req.user_name,
            &req.practice_name,
        )
        .await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "documentId": session.document_id,
        "sessionUrl": session.session_id,
    })))
}

#[derive(Debug, Deserialize)]
struct DocumentStatusQuery {
    #[serde(rename = "documentId")]
    document_id: Option<String>,
}

async fn document_status(
    State(state): State<AppState>,
    Query(query): Query<DocumentStatusQuery>,
) -> Result<Json<Value>, ApiError> {
    let Some(document_id) = query.document_id else {
        return Err(ApiError::bad_request("Missing documentId parameter"));
    };
    let esign = esign_client(&state)?;
    let report = esign.document_status(&document_id).await?;
    Ok(Json(serde_json::to_value(report).unwrap_or_default()))
}

/// E-signature webhook: acknowledge everything, log completions.
async fn pandadoc_webhook(Json(event): Json<DocumentWebhookEvent>) -> Json<Value> {
    if event.event == "document_completed" {
        tracing::info!(
            document_id = %event.data.get("id").and_then(serde_json::Value::as_str).unwrap_or("?"),
            "document completed"
        );
        return Json(serde_json::json!({
            "success": true,
            "message": "Webhook processed successfully",
        }));
    }
    Json(serde_json::json!({"success": true, "message": "Event acknowledged"}))
}

fn esign_client(state: &AppState) -> Result<&Arc<PandaDocClient>, ApiError> {
    state.esign.as_ref().ok_or_else(|| {
        ApiError::unconfigured("E-signature", "Set the PANDADOC_* environment variables.")
    })
}

// ── Telephony ──────────────────────────────────────────────────────

/// Accepts a single recipient or a list, as the frontend sends both.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendSmsRequest {
    to: OneOrMany,
    #[serde(default)]
    body: String,
    status_callback: Option<String>,
}

async fn send_sms(
    State(state): State<AppState>,
    Json(req): Json<SendSmsRequest>,
) -> Result<Json<Value>, ApiError> {
    let recipients = req.to.into_vec();
    if recipients.is_empty() || req.body.is_empty() {
        return Err(ApiError::bad_request("Missing required fields: to, body"));
    }
    let telephony = telephony_client(&state)?;
    let messages = telephony
        .send_sms(&recipients, &req.body, req.status_callback.as_deref())
        .await;
    Ok(Json(serde_json::json!({"success": true, "messages": messages})))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MakeCallRequest {
    to: OneOrMany,
    twiml_url: Option<String>,
    #[serde(default)]
    record_call: bool,
    machine_detection: Option<String>,
}

async fn make_call(
    State(state): State<AppState>,
    Json(req): Json<MakeCallRequest>,
) -> Result<Json<Value>, ApiError> {
    let recipients = req.to.into_vec();
    if recipients.is_empty() {
        return Err(ApiError::bad_request("Missing required field: to"));
    }
    let Some(twiml_url) = req.twiml_url else {
        return Err(ApiError::bad_request("twimlUrl must be provided"));
    };
    let telephony = telephony_client(&state)?;
    let options = CallOptions {
        twiml_url,
        record: req.record_call,
        machine_detection: req.machine_detection,
        status_callback: None,
    };
    let calls = telephony.make_call(&recipients, &options).await;
    Ok(Json(serde_json::json!({"success": true, "calls": calls})))
}

/// Call lifecycle updates. Always 200 so the vendor stops retrying.
async fn call_status(Form(payload): Form<TwilioWebhookPayload>) -> Json<Value> {
    let status = payload.call_status.as_deref().unwrap_or("?");
    tracing::info!(
        call_sid = %payload.call_sid.as_deref().unwrap_or("?"),
        %status,
        duration = %payload.call_duration.as_deref().unwrap_or("-"),
        answered_by = %payload.answered_by.as_deref().unwrap_or("-"),
        "call status update"
    );
    if matches!(status, "failed" | "busy" | "no-answer") {
        tracing::warn!(
            call_sid = %payload.call_sid.as_deref().unwrap_or("?"),
            %status,
            "call not successful"
        );
    }
    Json(serde_json::json!({"received": true}))
}

/// SMS delivery status updates. Always 200 so the vendor stops retrying.
async fn sms_status(Form(payload): Form<TwilioWebhookPayload>) -> Json<Value> {
    let status = payload.message_status.as_deref().unwrap_or("?");
    tracing::info!(
        message_sid = %payload.message_sid.as_deref().unwrap_or("?"),
        %status,
        "sms status update"
    );
    if matches!(status, "failed" | "undelivered") {
        tracing::error!(
            message_sid = %payload.message_sid.as_deref().unwrap_or("?"),
            error_code = %payload.error_code.as_deref().unwrap_or("-"),
            "sms delivery failed"
        );
    }
    Json(serde_json::json!({"received": true}))
}

/// Inbound SMS reply: classify the keyword and answer with TwiML.
async fn sms_reply(Form(payload): Form<TwilioWebhookPayload>) -> Response {
    let body = payload.body.as_deref().unwrap_or("");
    let action = SmsReplyAction::classify(body);
    tracing::info!(
        from = %payload.from.as_deref().unwrap_or("?"),
        ?action,
        status_update = action.status_update().unwrap_or("-"),
        "inbound sms reply"
    );

    let twiml = crate::telephony::twiml_message(action.auto_response());
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/xml")],
        twiml,
    )
        .into_response()
}

fn telephony_client(state: &AppState) -> Result<&Arc<TwilioClient>, ApiError> {
    state.telephony.as_ref().ok_or_else(|| {
        ApiError::unconfigured("Telephony", "Set the TWILIO_* environment variables.")
    })
}

// ── Eligibility ────────────────────────────────────────────────────

async fn evaluate_eligibility(Json(patient): Json<PatientInput>) -> Json<Value> {
    let result = evaluate_patient_eligibility(&patient, Utc::now().date_naive());
    Json(serde_json::to_value(result).unwrap_or_default())
}
