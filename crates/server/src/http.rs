//! HTTP endpoints
//!
//! REST surface over the lead store, call tracker, and conversation
//! engine. Provider webhook handlers always ack with 200: duplicates,
//! late events, and unknown identifiers are logged and dropped, since a
//! webhook cannot be meaningfully rejected to its sender.

use std::time::Duration;

use axum::{
    extract::{Form, Path, Query, State},
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use leadline_core::{ContactAddress, LeadRow, LeadStatus, MediaStreamHandle, PipelineOutcome};
use leadline_telephony::{stream_twiml, CallEvent, CallbackUrls, ProviderEvent, ProviderKind};

use crate::state::AppState;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(&state.settings.server.cors_origins);

    Router::new()
        // Lead endpoints
        .route("/api/leads/import", post(import_leads))
        .route("/api/leads", get(list_leads))
        .route("/api/leads/stats", get(lead_stats))
        .route("/api/leads/:id", get(get_lead))
        .route("/api/leads/:id/enqueue", post(enqueue_lead))
        .route("/api/queue/enqueue-all", post(enqueue_all))
        // Call endpoints
        .route("/api/calls/start", post(start_call))
        .route("/api/calls", get(list_calls))
        .route("/api/calls/:id", get(get_call))
        // Provider webhooks
        .route("/api/calls/answer", post(call_answer))
        .route("/api/calls/status", post(call_status))
        .route("/api/calls/telnyx", post(telnyx_events))
        .route("/api/calls/stream-start", post(stream_start))
        // Texting
        .route("/api/sms/send", post(sms_send))
        .route("/api/sms/webhook", post(sms_webhook))
        // Conversations
        .route("/api/conversations", get(list_conversations))
        .route("/api/conversations/:address", get(get_conversation))
        // Health
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        tracing::warn!("no CORS origins configured, allowing all origins (dev only)");
        return CorsLayer::permissive();
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!(%origin, "invalid CORS origin");
                None
            })
        })
        .collect();

    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

// --- Leads ---

#[derive(Debug, Deserialize)]
struct ImportRequest {
    rows: Vec<LeadRow>,
}

async fn import_leads(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> Json<serde_json::Value> {
    let outcome = state.leads.import(request.rows);
    Json(json!({
        "imported": outcome.imported,
        "count": outcome.imported.len(),
        "rejected": outcome.rejected,
    }))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<LeadStatus>,
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
}

fn default_limit() -> usize {
    100
}

async fn list_leads(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<serde_json::Value> {
    let leads = state.leads.list(query.status, query.limit, query.offset);
    Json(json!({ "count": leads.len(), "leads": leads }))
}

async fn lead_stats(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::to_value(state.leads.stats()).unwrap_or_default())
}

async fn get_lead(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let lead = state.leads.get(id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(serde_json::to_value(lead).unwrap_or_default()))
}

async fn enqueue_lead(State(state): State<AppState>, Path(id): Path<Uuid>) -> Json<serde_json::Value> {
    Json(json!({ "queued": state.leads.enqueue(id) }))
}

async fn enqueue_all(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "enqueued": state.leads.enqueue_all_pending() }))
}

// --- Calls ---

/// Pop the next queued lead and place a call to it
async fn start_call(State(state): State<AppState>) -> Result<Json<serde_json::Value>, StatusCode> {
    let Some(lead) = state.leads.dequeue_next() else {
        return Ok(Json(json!({ "dispatched": false, "reason": "queue empty" })));
    };

    let contact = ContactAddress::normalize(&lead.phone);
    let session = state
        .tracker
        .create_outbound(state.provider.kind(), contact.clone(), lead.id);
    if let Err(err) = state.leads.set_call(lead.id, session.id) {
        tracing::error!(lead_id = %lead.id, %err, "failed to link call to lead");
    }

    let callbacks = CallbackUrls::for_session(&state.settings.telephony.base_url, session.id);
    match state.provider.create_call(&contact, &callbacks).await {
        Ok(provider_call_id) => {
            let _ = state
                .tracker
                .apply_event(session.id, CallEvent::ProviderAccepted { provider_call_id });
            Ok(Json(json!({
                "dispatched": true,
                "session_id": session.id,
                "lead_id": lead.id,
            })))
        }
        Err(err) => {
            tracing::error!(session_id = %session.id, %err, "provider rejected call");
            let _ = state.tracker.apply_event(
                session.id,
                CallEvent::ForcedFailure {
                    reason: format!("provider error: {}", err),
                },
            );
            Err(StatusCode::BAD_GATEWAY)
        }
    }
}

async fn list_calls(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<serde_json::Value> {
    let calls = state.tracker.list(query.limit, query.offset);
    Json(json!({ "count": calls.len(), "calls": calls }))
}

async fn get_call(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let session = state.tracker.get(id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(serde_json::to_value(session).unwrap_or_default()))
}

// --- Provider webhooks ---

#[derive(Debug, Deserialize)]
struct SessionQuery {
    session_id: Uuid,
}

/// Answer webhook: the provider asks what to do with the connected call.
/// Replies with instructions bridging it into our media stream.
async fn call_answer(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> impl IntoResponse {
    let ws_base = state
        .settings
        .telephony
        .base_url
        .replacen("https://", "wss://", 1)
        .replacen("http://", "ws://", 1);
    let stream_url = format!("{}/ws/media/{}", ws_base.trim_end_matches('/'), query.session_id);

    let body = match state.provider.kind() {
        ProviderKind::Twilio => stream_twiml(&stream_url),
        // Telnyx streaming is attached via the REST action instead
        ProviderKind::Telnyx => String::new(),
    };

    ([("content-type", "application/xml")], body)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TwilioStatusCallback {
    call_sid: String,
    call_status: String,
}

/// Twilio status callback. Always acks.
async fn call_status(
    State(state): State<AppState>,
    Form(form): Form<TwilioStatusCallback>,
) -> Json<serde_json::Value> {
    let event = ProviderEvent {
        provider: ProviderKind::Twilio,
        event_type: form.call_status,
        provider_call_id: form.call_sid,
        payload: serde_json::Value::Null,
    };

    if let Err(err) = state.tracker.apply_provider_event(&event) {
        tracing::warn!(%err, "status callback for unknown call");
    }
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct TelnyxEnvelope {
    data: TelnyxEventData,
}

#[derive(Debug, Deserialize)]
struct TelnyxEventData {
    event_type: String,
    payload: TelnyxPayload,
}

#[derive(Debug, Deserialize)]
struct TelnyxPayload {
    call_control_id: String,
}

/// Telnyx webhook. Always acks.
async fn telnyx_events(
    State(state): State<AppState>,
    Json(envelope): Json<TelnyxEnvelope>,
) -> Json<serde_json::Value> {
    let event = ProviderEvent {
        provider: ProviderKind::Telnyx,
        event_type: envelope.data.event_type,
        provider_call_id: envelope.data.payload.call_control_id,
        payload: serde_json::Value::Null,
    };

    if let Err(err) = state.tracker.apply_provider_event(&event) {
        tracing::warn!(%err, "telnyx event for unknown call");
    }
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct StreamStartRequest {
    session_id: Uuid,
    stream_id: String,
}

/// Media-stream handshake: marks the session in progress and hands the
/// stream to the speech pipeline
async fn stream_start(
    State(state): State<AppState>,
    Json(request): Json<StreamStartRequest>,
) -> Json<serde_json::Value> {
    let applied = state
        .tracker
        .apply_event(
            request.session_id,
            CallEvent::StreamStarted {
                stream_id: request.stream_id.clone(),
            },
        )
        .map(|t| t.is_applied())
        .unwrap_or(false);

    if applied {
        spawn_pipeline(state, request.session_id, request.stream_id);
    }
    Json(json!({ "status": "ok" }))
}

/// Run the speech pipeline for a connected stream. Completion and error
/// both drive the session to completed; a produced summary is bridged
/// into the conversation thread and extracted.
fn spawn_pipeline(state: AppState, session_id: Uuid, stream_id: String) {
    let Some(pipeline) = state.pipeline.clone() else {
        return;
    };

    tokio::spawn(async move {
        let bound = Duration::from_secs(state.settings.telephony.max_in_flight_seconds);
        let handle = MediaStreamHandle {
            call_id: session_id,
            stream_id,
        };

        let outcome = match tokio::time::timeout(bound, pipeline.run(handle)).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => {
                tracing::error!(%session_id, %err, "pipeline error");
                PipelineOutcome::default()
            }
            Err(_) => {
                tracing::error!(%session_id, "pipeline timed out");
                PipelineOutcome::default()
            }
        };

        let summary = outcome.summary.clone();
        let _ = state
            .tracker
            .apply_event(session_id, CallEvent::PipelineFinished { outcome });

        if let Some(summary) = summary {
            if let Some(session) = state.tracker.get(session_id) {
                if let Err(err) = state.engine.record_call_summary(&session.contact, "", &summary).await {
                    tracing::warn!(%session_id, %err, "failed to record call summary");
                }
            }
        }
    });
}

// --- Texting ---

#[derive(Debug, Deserialize)]
struct SmsSendRequest {
    lead_phone: String,
    lead_name: String,
    #[serde(default = "default_area")]
    area: String,
}

fn default_area() -> String {
    "Dubai".to_string()
}

/// Trigger an outbound text to start qualification
async fn sms_send(
    State(state): State<AppState>,
    Json(request): Json<SmsSendRequest>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let address = ContactAddress::normalize(&request.lead_phone);

    let opener = state
        .engine
        .start_outreach(&address, &request.lead_name, &request.area)
        .await
        .map_err(|err| {
            tracing::error!(%address, %err, "failed to open outreach thread");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    state
        .provider
        .send_message(&address, &opener)
        .await
        .map_err(|err| {
            tracing::error!(%address, %err, "outbound message failed");
            StatusCode::BAD_GATEWAY
        })?;

    Ok(Json(json!({ "status": "sent", "phone": address, "message": opener })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SmsInbound {
    from: String,
    #[serde(default)]
    body: String,
}

/// Inbound SMS/WhatsApp webhook. Always acks; reply delivery failures are
/// logged, not surfaced.
async fn sms_webhook(State(state): State<AppState>, Form(form): Form<SmsInbound>) -> String {
    let body = form.body.trim();
    if body.is_empty() {
        return String::new();
    }

    let address = ContactAddress::normalize(&form.from);
    tracing::info!(%address, "inbound message");

    let reply = match state.engine.handle_inbound(&address, body).await {
        Ok(reply) => reply,
        Err(err) => {
            tracing::error!(%address, %err, "inbound handling failed");
            return String::new();
        }
    };

    if let Err(err) = state.provider.send_message(&address, &reply).await {
        tracing::warn!(%address, %err, "reply delivery failed");
    }

    reply
}

// --- Conversations ---

async fn list_conversations(State(state): State<AppState>) -> Result<Json<serde_json::Value>, StatusCode> {
    let addresses = state.engine.list().await.map_err(|err| {
        tracing::error!(%err, "conversation listing failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let mut conversations = Vec::with_capacity(addresses.len());
    for address in addresses {
        if let Ok(conversation) = state.engine.get(&address).await {
            conversations.push(json!({
                "address": conversation.address,
                "display_name": conversation.display_name,
                "message_count": conversation.turns.len(),
                "qualification": conversation.qualification,
                "last_message": conversation.turns.last(),
            }));
        }
    }

    Ok(Json(json!({ "count": conversations.len(), "conversations": conversations })))
}

async fn get_conversation(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let address = ContactAddress::normalize(&address);
    let conversation = state
        .engine
        .get(&address)
        .await
        .map_err(|_| StatusCode::NOT_FOUND)?;
    Ok(Json(serde_json::to_value(conversation).unwrap_or_default()))
}

// --- Health ---

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn readiness_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ready",
        "sessions": state.tracker.count(),
        "leads": state.leads.stats().total,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use http_body_util::BodyExt;
    use leadline_config::Settings;
    use leadline_telephony::{CallError, TelephonyProvider};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct StubProvider;

    #[async_trait]
    impl TelephonyProvider for StubProvider {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Twilio
        }

        async fn create_call(
            &self,
            _to: &ContactAddress,
            _callbacks: &CallbackUrls,
        ) -> Result<String, CallError> {
            Ok("CA-stub".to_string())
        }

        async fn start_media_stream(&self, _id: &str, _url: &str) -> Result<(), CallError> {
            Ok(())
        }

        async fn hangup(&self, _id: &str) -> Result<(), CallError> {
            Ok(())
        }

        async fn send_message(&self, _to: &ContactAddress, _body: &str) -> Result<(), CallError> {
            Ok(())
        }
    }

    fn test_state() -> AppState {
        AppState::new(Settings::default(), Arc::new(StubProvider), None).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let router = create_router(test_state());

        let response = router
            .oneshot(
                axum::http::Request::builder()
                    .uri("/health")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["status"], "healthy");
    }

    #[tokio::test]
    async fn test_import_then_list() {
        let router = create_router(test_state());

        let import = axum::http::Request::builder()
            .method("POST")
            .uri("/api/leads/import")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(
                json!({
                    "rows": [
                        { "name": "Aisha", "phone": "+971501111111" },
                        { "name": "No Phone" },
                    ]
                })
                .to_string(),
            ))
            .unwrap();

        let response = router.clone().oneshot(import).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["count"], 1);
        assert_eq!(value["rejected"], 1);

        let list = axum::http::Request::builder()
            .uri("/api/leads?status=pending")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = router.oneshot(list).await.unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["count"], 1);
        assert_eq!(value["leads"][0]["name"], "Aisha");
    }

    #[tokio::test]
    async fn test_status_webhook_acks_unknown_call() {
        let router = create_router(test_state());

        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/calls/status")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(axum::body::Body::from("CallSid=CA-unknown&CallStatus=completed"))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_start_call_on_empty_queue() {
        let router = create_router(test_state());

        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/calls/start")
            .body(axum::body::Body::empty())
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["dispatched"], false);
    }

    #[tokio::test]
    async fn test_conversation_not_found() {
        let router = create_router(test_state());

        let request = axum::http::Request::builder()
            .uri("/api/conversations/+971509999999")
            .body(axum::body::Body::empty())
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
