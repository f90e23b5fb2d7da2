/*
[INPUT]:  WebSocket base URL and a task identifier
[OUTPUT]: Decoded status frames and connection-lifecycle events via channels
[POS]:    WebSocket layer - per-task subscription with supervised reconnect
[UPDATE]: When the subscription protocol or reconnect policy changes
*/

use crate::http::{Result, VidraError};
use crate::types::TaskId;
use crate::ws::frame::{StatusFrame, decode_frame};
use crate::ws::retry::RetryPolicy;
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info};

/// Default base URL for the Vidra status stream
const DEFAULT_WS_BASE_URL: &str = "ws://localhost:8000";
const EVENT_BUFFER: usize = 64;
const DECODE_FAIL_LOG_LIMIT: usize = 3;
const RAW_LOG_MAX_BYTES: usize = 1024;

static DECODE_FAIL_LOG_COUNT: AtomicUsize = AtomicUsize::new(0);

/// WebSocket subscription configuration
#[derive(Debug, Clone)]
pub struct WsConfig {
    pub base_url: String,
    pub retry: RetryPolicy,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WS_BASE_URL.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl WsConfig {
    /// Config pointing at a non-default status-stream host.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Events emitted by an open status channel.
///
/// Delivery is at-least-once: duplicates and reordering are possible
/// across a reconnect boundary and must be tolerated downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Connection established; `attempt` is 1 for the initial connect
    Opened { attempt: u32 },
    /// One validated status frame
    Frame(StatusFrame),
    /// Connection lost (server close or transport drop)
    Closed,
    /// Connect attempt failed
    Errored(String),
    /// Retry policy exhausted; the subscription is abandoned
    GaveUp,
}

/// How one connection ended.
enum Disconnect {
    /// `close()` was called or every event receiver is gone
    Deliberate,
    /// Server close or transport failure; the supervisor reconnects
    Lost,
}

/// Handle to one open status subscription.
///
/// Dropping the handle closes the channel.
#[derive(Debug)]
pub struct StatusChannelHandle {
    task_id: TaskId,
    events: Option<mpsc::Receiver<ChannelEvent>>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl StatusChannelHandle {
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// Take the event receiver (once).
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<ChannelEvent>> {
        self.events.take()
    }

    /// Deliberately terminate the subscription. No reconnect follows.
    pub fn close(&self) {
        let _ = self.shutdown.send(true);
    }

    /// A detached closer usable from the task draining the events.
    pub fn closer(&self) -> ChannelCloser {
        ChannelCloser(self.shutdown.clone())
    }
}

impl Drop for StatusChannelHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

/// Detached handle that can deliberately close the channel.
#[derive(Debug, Clone)]
pub struct ChannelCloser(Arc<watch::Sender<bool>>);

impl ChannelCloser {
    pub fn close(&self) {
        let _ = self.0.send(true);
    }
}

/// Per-task status subscription with supervised reconnect.
#[derive(Debug)]
pub struct StatusChannel;

impl StatusChannel {
    /// Open a subscription for one task.
    ///
    /// Connects to `{base}/ws/task_status/{task_id}` and spawns a
    /// supervisor that reconnects on any non-deliberate close, consulting
    /// the configured `RetryPolicy`. A reconnect resumes the same
    /// subscription; it never resets downstream task state.
    ///
    /// One subscription per session: the caller replacing a live handle
    /// must close the old one first (see `TaskSession`).
    pub fn open(config: &WsConfig, task_id: TaskId) -> Result<StatusChannelHandle> {
        let url = subscription_url(&config.base_url, &task_id)?;
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(task_id = %task_id, url = %url, "status channel opening");
        tokio::spawn(supervise(
            url,
            task_id.clone(),
            config.retry.clone(),
            event_tx,
            shutdown_rx,
        ));

        Ok(StatusChannelHandle {
            task_id,
            events: Some(event_rx),
            shutdown: Arc::new(shutdown_tx),
        })
    }
}

/// Canonical subscription path: `/ws/task_status/{task_id}`.
fn subscription_url(base_url: &str, task_id: &TaskId) -> Result<Url> {
    let base = base_url.trim_end_matches('/');
    let url = Url::parse(&format!("{base}/ws/task_status/{task_id}"))?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(VidraError::Config(format!(
            "status channel requires ws:// or wss:// base URL, got {other}://"
        ))),
    }
}

/// Connect/read/reconnect loop. Runs until the handle is closed, the
/// retry policy is exhausted, or every event receiver is dropped.
async fn supervise(
    url: Url,
    task_id: TaskId,
    retry: RetryPolicy,
    events: mpsc::Sender<ChannelEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut attempt: u32 = 0;
    let mut consecutive_failures: u32 = 0;

    loop {
        attempt += 1;
        let connected = tokio::select! {
            result = connect_async(url.as_str()) => result,
            _ = shutdown.changed() => return,
        };

        match connected {
            Ok((stream, _response)) => {
                consecutive_failures = 0;
                info!(task_id = %task_id, attempt, "status channel connected");
                if events.send(ChannelEvent::Opened { attempt }).await.is_err() {
                    return;
                }

                match run_connection(stream, &events, &mut shutdown).await {
                    Disconnect::Deliberate => {
                        let _ = events.send(ChannelEvent::Closed).await;
                        info!(task_id = %task_id, "status channel closed");
                        return;
                    }
                    Disconnect::Lost => {
                        info!(task_id = %task_id, "status channel connection lost");
                        if events.send(ChannelEvent::Closed).await.is_err() {
                            return;
                        }
                    }
                }
            }
            Err(err) => {
                info!(task_id = %task_id, attempt, error = %err, "status channel connect failed");
                if events.send(ChannelEvent::Errored(err.to_string())).await.is_err() {
                    return;
                }
            }
        }

        consecutive_failures += 1;
        match retry.delay(consecutive_failures) {
            Some(delay) => {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shutdown.changed() => return,
                }
            }
            None => {
                info!(task_id = %task_id, failures = consecutive_failures, "status channel giving up");
                let _ = events.send(ChannelEvent::GaveUp).await;
                return;
            }
        }
    }
}

async fn run_connection(
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    events: &mpsc::Sender<ChannelEvent>,
    shutdown: &mut watch::Receiver<bool>,
) -> Disconnect {
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                let _ = write.send(WsMessage::Close(None)).await;
                return Disconnect::Deliberate;
            }
            incoming = read.next() => match incoming {
                Some(Ok(WsMessage::Close(_))) | None => return Disconnect::Lost,
                Some(Ok(WsMessage::Ping(_))) | Some(Ok(WsMessage::Pong(_))) => {}
                Some(Ok(message)) => {
                    if let Some(frame) = parse_frame(message)
                        && events.send(ChannelEvent::Frame(frame)).await.is_err()
                    {
                        // Receiver gone: close gracefully, same as shutdown.
                        let _ = write.send(WsMessage::Close(None)).await;
                        return Disconnect::Deliberate;
                    }
                }
                Some(Err(_)) => return Disconnect::Lost,
            }
        }
    }
}

/// Decode one inbound message; malformed payloads are dropped here and
/// never reach the state machine.
fn parse_frame(message: WsMessage) -> Option<StatusFrame> {
    let text: String = match message {
        WsMessage::Text(text) => text.to_string(),
        WsMessage::Binary(bytes) => String::from_utf8(bytes.to_vec()).ok()?,
        _ => return None,
    };

    match decode_frame(&text) {
        Ok(frame) => Some(frame),
        Err(err) => {
            log_decode_fail_once(&err, &text);
            None
        }
    }
}

fn log_decode_fail_once(err: &crate::ws::frame::DecodeError, raw: &str) {
    let count = DECODE_FAIL_LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count < DECODE_FAIL_LOG_LIMIT {
        info!(
            sample_index = count + 1,
            sample_limit = DECODE_FAIL_LOG_LIMIT,
            error = %err,
            bytes = raw.len(),
            "status frame dropped"
        );
        let preview = truncate_for_log(raw, RAW_LOG_MAX_BYTES);
        debug!(
            sample_index = count + 1,
            sample_limit = DECODE_FAIL_LOG_LIMIT,
            error = %err,
            message = %preview,
            "status frame dropped"
        );
    }
}

fn truncate_for_log(value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }
    // Cut must land on a char boundary; raw payloads are arbitrary UTF-8.
    let mut end = max_len;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = String::with_capacity(end + 3);
    out.push_str(&value[..end]);
    out.push_str("...");
    out
}
