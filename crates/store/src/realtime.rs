//! Realtime change feed over server-sent events.
//!
//! The server opens the stream with a `PB_CONNECT` event carrying a client
//! id. The client then registers its topic with a `POST` to the same
//! endpoint, after which every change in the topic's collection arrives as
//! an event whose data is `{"action": ..., "record": {...}}`.
//!
//! A feed runs on its own task, reconnecting with backoff and registering
//! the topic again on every new connection, until its [`Subscription`] is
//! dropped.

use std::fmt::Display;
use std::pin::Pin;

use bytes::Bytes;
use eventsource_stream::{Event, Eventsource};
use futures::{Stream, StreamExt};
use reqwest::Method;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use pinboard_events::{Record, RecordAction, RecordEvent};

use crate::error::StoreError;
use crate::pocketbase::{ensure_success, HttpContext};
use crate::reconnect::{reconnect_loop, ReconnectConfig};
use crate::store::Filter;
use crate::subscription::Subscription;

/// Name of the handshake event that opens every stream.
pub const CONNECT_EVENT: &str = "PB_CONNECT";

const REALTIME_PATH: &str = "/api/realtime";

/// Realtime topic covering every record of `collection`.
pub fn topic(collection: &str) -> String {
    format!("{collection}/*")
}

// ---------------------------------------------------------------------------
// SSE framing
// ---------------------------------------------------------------------------

/// Decoded server-sent events, with transport and framing errors flattened
/// into [`StoreError::Realtime`].
type EventStream = Pin<Box<dyn Stream<Item = Result<Event, StoreError>> + Send>>;

/// Frame a raw byte stream into server-sent events.
fn event_stream<S, E>(bytes: S) -> EventStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    Box::pin(
        bytes
            .eventsource()
            .map(|event| event.map_err(|e| StoreError::Realtime(e.to_string()))),
    )
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ConnectPayload {
    #[serde(rename = "clientId")]
    client_id: String,
}

#[derive(Debug, Deserialize)]
struct RawChange {
    action: String,
    record: Record,
}

/// Decode a change event. Unknown actions yield `Ok(None)`.
pub fn decode_change(data: &str) -> Result<Option<RecordEvent>, StoreError> {
    let raw: RawChange = serde_json::from_str(data)?;
    Ok(RecordAction::parse(&raw.action).map(|action| RecordEvent::new(action, raw.record)))
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A connected, registered event stream.
struct Session {
    client_id: String,
    events: EventStream,
}

impl Session {
    fn new(events: EventStream) -> Self {
        Self {
            client_id: String::new(),
            events,
        }
    }

    /// Next complete event, or `None` when the server closes the stream.
    async fn next_event(&mut self) -> Result<Option<Event>, StoreError> {
        self.events.next().await.transpose()
    }
}

enum PumpEnd {
    /// Cancelled or the subscriber went away.
    Stopped,
    Disconnected(String),
}

// ---------------------------------------------------------------------------
// RealtimeClient
// ---------------------------------------------------------------------------

/// Spawns and drives realtime feeds against one server.
#[derive(Clone)]
pub(crate) struct RealtimeClient {
    http: HttpContext,
    reconnect: ReconnectConfig,
}

impl RealtimeClient {
    pub(crate) fn new(http: HttpContext, reconnect: ReconnectConfig) -> Self {
        Self { http, reconnect }
    }

    /// Start a feed for `collection` on a background task.
    pub(crate) fn spawn(&self, collection: &str, filter: Option<Filter>) -> Subscription {
        let cancel = CancellationToken::new();
        let (tx, subscription) = Subscription::channel(cancel.clone());
        let client = self.clone();
        let topic = topic(collection);

        tokio::spawn(async move {
            tracing::info!(topic = %topic, "Starting realtime feed");
            client.run(&topic, filter.as_ref(), &tx, &cancel).await;
            tracing::info!(topic = %topic, "Realtime feed stopped");
        });

        subscription
    }

    /// Connect, pump events, reconnect. Runs until cancelled.
    async fn run(
        &self,
        topic: &str,
        filter: Option<&Filter>,
        tx: &mpsc::Sender<RecordEvent>,
        cancel: &CancellationToken,
    ) {
        loop {
            let Some(mut session) =
                reconnect_loop(topic, &self.reconnect, cancel, || self.connect(topic)).await
            else {
                return;
            };

            tracing::info!(topic, client_id = %session.client_id, "Realtime feed connected");

            match pump(&mut session, topic, filter, tx, cancel).await {
                PumpEnd::Stopped => return,
                PumpEnd::Disconnected(reason) => {
                    tracing::warn!(topic, reason = %reason, "Realtime feed disconnected");
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(self.reconnect.initial_delay) => {}
            }
        }
    }

    /// Open the stream, wait for the handshake and register `topic`.
    async fn connect(&self, topic: &str) -> Result<Session, StoreError> {
        let response = self
            .http
            .request(Method::GET, self.http.url(REALTIME_PATH))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let mut session = Session::new(event_stream(response.bytes_stream()));

        let first = tokio::time::timeout(self.http.request_timeout, session.next_event())
            .await
            .map_err(|_| StoreError::Realtime(format!("no {CONNECT_EVENT} before timeout")))??;

        session.client_id = match first {
            Some(event) if event.event == CONNECT_EVENT => {
                serde_json::from_str::<ConnectPayload>(&event.data)?.client_id
            }
            Some(event) => {
                return Err(StoreError::Realtime(format!(
                    "expected {CONNECT_EVENT}, got {}",
                    event.event
                )))
            }
            None => {
                return Err(StoreError::Realtime(format!(
                    "stream closed before {CONNECT_EVENT}"
                )))
            }
        };

        let body = serde_json::json!({
            "clientId": session.client_id,
            "subscriptions": [topic],
        });
        let response = self
            .http
            .request(Method::POST, self.http.url(REALTIME_PATH))
            .timeout(self.http.request_timeout)
            .json(&body)
            .send()
            .await?;
        ensure_success(response).await?;

        Ok(session)
    }
}

/// Forward change events from `session` to `tx` until the stream ends or
/// the feed is stopped.
async fn pump(
    session: &mut Session,
    topic: &str,
    filter: Option<&Filter>,
    tx: &mpsc::Sender<RecordEvent>,
    cancel: &CancellationToken,
) -> PumpEnd {
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return PumpEnd::Stopped,
            next = session.next_event() => next,
        };

        let event = match next {
            Ok(Some(event)) => event,
            Ok(None) => return PumpEnd::Disconnected("stream ended".to_string()),
            Err(e) => return PumpEnd::Disconnected(e.to_string()),
        };

        if event.event == CONNECT_EVENT {
            continue;
        }

        let change = match decode_change(&event.data) {
            Ok(Some(change)) => change,
            Ok(None) => {
                tracing::debug!(topic, "Ignoring realtime event with unknown action");
                continue;
            }
            Err(e) => {
                tracing::warn!(topic, error = %e, "Ignoring undecodable realtime event");
                continue;
            }
        };

        if filter.is_some_and(|f| !f.matches(&change.record)) {
            continue;
        }

        tokio::select! {
            _ = cancel.cancelled() => return PumpEnd::Stopped,
            sent = tx.send(change) => {
                if sent.is_err() {
                    return PumpEnd::Stopped;
                }
            }
        }
    }
}
