//! Slack channel: Events API webhook in, Web API `chat.postMessage` out.
//!
//! Every request to `/slack/events` must carry a valid `X-Slack-Signature`
//! (HMAC-SHA256 over `v0:<timestamp>:<body>` with the app signing secret).
//! Events are acknowledged immediately and handled on a spawned task, since
//! Slack retries anything not acknowledged within three seconds. Redeliveries
//! are recognised by `event_id`, so an event is handled at most once.

use std::collections::{HashSet, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use hmac::{Hmac, Mac};
use parking_lot::Mutex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::agent::Dispatcher;
use crate::channels::{IncomingMessage, ReplySink};
use crate::config::SlackConfig;
use crate::error::ChannelError;

const CHANNEL_NAME: &str = "slack";

/// Requests older (or newer) than this are rejected as replays.
pub const MAX_CLOCK_SKEW_SECS: u64 = 60 * 5;

/// How many recent `event_id`s are remembered for redelivery checks.
pub const RECENT_EVENT_CAPACITY: usize = 1024;

type HmacSha256 = Hmac<Sha256>;

// --- Outbound ---

#[derive(Debug, Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SlackApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Minimal Slack Web API client.
pub struct SlackClient {
    http: reqwest::Client,
    api_token: SecretString,
    api_base_url: String,
}

impl SlackClient {
    pub fn new(config: &SlackConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_token: config.api_token.clone(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn send_failed(reason: impl Into<String>) -> ChannelError {
        ChannelError::SendFailed {
            name: CHANNEL_NAME.to_string(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ReplySink for SlackClient {
    fn name(&self) -> &str {
        CHANNEL_NAME
    }

    async fn post_message(&self, channel: &str, text: &str) -> Result<(), ChannelError> {
        let response = self
            .http
            .post(format!("{}/chat.postMessage", self.api_base_url))
            .bearer_auth(self.api_token.expose_secret())
            .json(&PostMessageRequest { channel, text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::send_failed(format!("HTTP {status}")));
        }

        let body: SlackApiResponse = response.json().await?;
        if !body.ok {
            return Err(Self::send_failed(
                body.error.unwrap_or_else(|| "unknown_error".to_string()),
            ));
        }
        Ok(())
    }
}

// --- Request signing ---

fn auth_failed(reason: impl Into<String>) -> ChannelError {
    ChannelError::AuthFailed {
        name: CHANNEL_NAME.to_string(),
        reason: reason.into(),
    }
}

fn signature_bytes(
    signing_secret: &[u8],
    timestamp: &str,
    body: &[u8],
) -> Result<Vec<u8>, ChannelError> {
    let mut mac = HmacSha256::new_from_slice(signing_secret)
        .map_err(|e| auth_failed(format!("invalid signing secret: {e}")))?;
    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// `v0=<hex>` signature Slack would send for this request.
pub fn sign_request(
    signing_secret: &[u8],
    timestamp: &str,
    body: &[u8],
) -> Result<String, ChannelError> {
    Ok(format!(
        "v0={}",
        hex::encode(signature_bytes(signing_secret, timestamp, body)?)
    ))
}

/// Check `signature` against the body and reject stale timestamps.
pub fn verify_signature(
    signing_secret: &[u8],
    timestamp: &str,
    body: &[u8],
    signature: &str,
    now: i64,
) -> Result<(), ChannelError> {
    let sent_at: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| auth_failed("invalid request timestamp"))?;
    if now.abs_diff(sent_at) > MAX_CLOCK_SKEW_SECS {
        return Err(auth_failed("request timestamp outside allowed window"));
    }

    let provided = signature
        .strip_prefix("v0=")
        .and_then(|hex_sig| hex::decode(hex_sig).ok())
        .ok_or_else(|| auth_failed("malformed signature"))?;
    let expected = signature_bytes(signing_secret, timestamp, body)?;

    if bool::from(expected.as_slice().ct_eq(provided.as_slice())) {
        Ok(())
    } else {
        Err(auth_failed("signature mismatch"))
    }
}

// --- Inbound ---

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SlackEnvelope {
    UrlVerification {
        challenge: String,
    },
    EventCallback {
        #[serde(default)]
        event_id: Option<String>,
        event: SlackEvent,
    },
    #[serde(other)]
    Other,
}

/// The `event` object of an `event_callback`.
#[derive(Debug, Deserialize)]
pub struct SlackEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
}

impl SlackEvent {
    /// Convert a `message` event; other event types are not commands.
    pub fn into_incoming(self) -> Option<IncomingMessage> {
        if self.kind != "message" {
            return None;
        }
        Some(IncomingMessage {
            channel: self.channel?,
            user: self.user.unwrap_or_default(),
            text: self.text,
            subtype: self.subtype,
            bot_id: self.bot_id,
        })
    }
}

#[derive(Debug, Serialize)]
struct UrlVerificationResponse {
    challenge: String,
}

/// Bounded set of recently seen event ids, oldest evicted first.
pub struct RecentEvents {
    capacity: usize,
    inner: Mutex<RecentEventsInner>,
}

#[derive(Default)]
struct RecentEventsInner {
    ids: HashSet<String>,
    order: VecDeque<String>,
}

impl RecentEvents {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(RecentEventsInner::default()),
        }
    }

    /// Record `event_id`. Returns false if it was already recorded.
    pub fn insert(&self, event_id: &str) -> bool {
        let mut inner = self.inner.lock();
        if inner.ids.contains(event_id) {
            return false;
        }
        if inner.order.len() >= self.capacity
            && let Some(oldest) = inner.order.pop_front()
        {
            inner.ids.remove(&oldest);
        }
        inner.ids.insert(event_id.to_string());
        inner.order.push_back(event_id.to_string());
        true
    }
}

/// Shared state for the webhook handlers.
pub struct SlackState {
    dispatcher: Arc<Dispatcher>,
    sink: Arc<dyn ReplySink>,
    signing_secret: SecretString,
    recent_events: RecentEvents,
}

impl SlackState {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        sink: Arc<dyn ReplySink>,
        signing_secret: SecretString,
    ) -> Self {
        Self {
            dispatcher,
            sink,
            signing_secret,
            recent_events: RecentEvents::new(RECENT_EVENT_CAPACITY),
        }
    }
}

/// Routes: `POST /slack/events`, `GET /health`.
pub fn slack_router(state: Arc<SlackState>) -> Router {
    Router::new()
        .route("/slack/events", post(events_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "ok"
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

async fn events_handler(
    State(state): State<Arc<SlackState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let (Some(timestamp), Some(signature)) = (
        header_str(&headers, "x-slack-request-timestamp"),
        header_str(&headers, "x-slack-signature"),
    ) else {
        return (StatusCode::UNAUTHORIZED, "missing signature").into_response();
    };

    if let Err(e) = verify_signature(
        state.signing_secret.expose_secret().as_bytes(),
        timestamp,
        &body,
        signature,
        chrono::Utc::now().timestamp(),
    ) {
        tracing::warn!("Rejected Slack request: {}", e);
        return (StatusCode::UNAUTHORIZED, "invalid signature").into_response();
    }

    let envelope: SlackEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!("Malformed Slack payload: {}", e);
            return (StatusCode::BAD_REQUEST, "malformed payload").into_response();
        }
    };

    match envelope {
        SlackEnvelope::UrlVerification { challenge } => {
            Json(UrlVerificationResponse { challenge }).into_response()
        }
        SlackEnvelope::EventCallback { event_id, event } => {
            // A retry is only a duplicate if the original delivery reached us.
            if let Some(event_id) = event_id.as_deref()
                && !state.recent_events.insert(event_id)
            {
                tracing::debug!(
                    event_id,
                    retry = ?header_str(&headers, "x-slack-retry-num"),
                    "skipping redelivered Slack event"
                );
                return StatusCode::OK.into_response();
            }
            tracing::trace!(?event, "Slack event");
            if let Some(message) = event.into_incoming() {
                let dispatcher = Arc::clone(&state.dispatcher);
                let sink = Arc::clone(&state.sink);
                let sink_name = sink.name().to_string();
                tokio::spawn(async move {
                    match dispatcher.handle(&message, sink).await {
                        Ok(outcome) => tracing::debug!(?outcome, "Slack message handled"),
                        Err(e) => tracing::error!(sink = %sink_name, "Failed to reply: {}", e),
                    }
                });
            }
            StatusCode::OK.into_response()
        }
        SlackEnvelope::Other => StatusCode::OK.into_response(),
    }
}

/// Running webhook server.
pub struct SlackServer {
    addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl SlackServer {
    /// Actual bound address (useful when binding to port 0).
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting requests and wait for in-flight ones.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.handle.await;
    }
}

/// Bind `addr` and serve the Slack routes in the background.
pub async fn start_server(
    addr: SocketAddr,
    state: Arc<SlackState>,
) -> Result<SlackServer, ChannelError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ChannelError::StartupFailed {
            name: CHANNEL_NAME.to_string(),
            reason: format!("Failed to bind to {}: {}", addr, e),
        })?;
    let bound_addr = listener
        .local_addr()
        .map_err(|e| ChannelError::StartupFailed {
            name: CHANNEL_NAME.to_string(),
            reason: format!("Failed to get local addr: {}", e),
        })?;

    let app = slack_router(state);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Slack webhook shutting down");
            })
            .await
        {
            tracing::error!("Slack webhook server error: {}", e);
        }
    });

    tracing::info!("Slack webhook listening on {}", bound_addr);
    Ok(SlackServer {
        addr: bound_addr,
        shutdown_tx,
        handle,
    })
}
