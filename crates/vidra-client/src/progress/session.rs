/*
[INPUT]:  File submissions and status-channel events
[OUTPUT]: Canonical TaskState snapshots via a watch channel
[POS]:    State layer - per-session supervision and supersession
[UPDATE]: When the submission flow or supersession rules change
*/

use crate::http::{Result, VidraClient};
use crate::progress::state::{ConnectionState, TaskEvent, TaskState, apply};
use crate::types::TaskId;
use crate::ws::channel::{ChannelCloser, ChannelEvent, StatusChannel, StatusChannelHandle, WsConfig};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, watch};
use tracing::info;

/// One client session: at most one live task subscription at a time.
///
/// The session owns the canonical `TaskState` fold. A new submission
/// supersedes the previous one: the old channel is closed and its driver
/// stops publishing. Presenters read snapshots through `watch()` and
/// never mutate state.
#[derive(Debug)]
pub struct TaskSession {
    client: VidraClient,
    ws: WsConfig,
    snapshot: watch::Sender<TaskState>,
    channel: Option<StatusChannelHandle>,
    epoch: Arc<AtomicU64>,
}

impl TaskSession {
    pub fn new(client: VidraClient, ws: WsConfig) -> Self {
        let (snapshot, _) = watch::channel(TaskState::idle());
        Self {
            client,
            ws,
            snapshot,
            channel: None,
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Presenter-facing snapshot stream.
    pub fn watch(&self) -> watch::Receiver<TaskState> {
        self.snapshot.subscribe()
    }

    /// Current snapshot.
    pub fn state(&self) -> TaskState {
        self.snapshot.borrow().clone()
    }

    /// Submit a file from disk; see `submit_bytes`.
    pub async fn submit_file(&mut self, path: impl AsRef<Path>) -> Result<TaskId> {
        let (file_name, bytes) = crate::http::upload::read_file_for_upload(path.as_ref()).await?;
        self.submit_bytes(&file_name, bytes).await
    }

    /// Submit an in-memory file and subscribe to its status stream.
    ///
    /// Supersedes any in-flight task: the previous subscription is closed
    /// and its state discarded. Returns once the intake call has resolved
    /// and the subscription (on success) is running; progress then flows
    /// through the watch snapshots until a terminal phase.
    pub async fn submit_bytes(&mut self, file_name: &str, bytes: Vec<u8>) -> Result<TaskId> {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = self.channel.take() {
            info!(task_id = %previous.task_id(), "superseding active subscription");
            previous.close();
        }

        let mut state = apply(&TaskState::idle(), &TaskEvent::UploadStarted);
        self.publish(epoch, &state);

        let task_id = match self.client.upload_bytes(file_name, bytes).await {
            Ok(task_id) => task_id,
            Err(err) => {
                state = apply(&state, &TaskEvent::UploadFailed(err.to_string()));
                self.publish(epoch, &state);
                return Err(err);
            }
        };

        state = apply(&state, &TaskEvent::UploadAccepted(task_id.clone()));
        state = apply(&state, &TaskEvent::Connection(ConnectionState::Connecting));
        self.publish(epoch, &state);

        let mut handle = match StatusChannel::open(&self.ws, task_id.clone()) {
            Ok(handle) => handle,
            Err(err) => {
                state = apply(
                    &state,
                    &TaskEvent::Fatal(format!("status subscription failed: {err}")),
                );
                self.publish(epoch, &state);
                return Err(err);
            }
        };
        let Some(events) = handle.take_events() else {
            return Err(crate::http::VidraError::Config(
                "status channel events already taken".to_string(),
            ));
        };
        let closer = handle.closer();
        self.channel = Some(handle);

        tokio::spawn(drive(
            epoch,
            self.epoch.clone(),
            state,
            events,
            closer,
            self.snapshot.clone(),
        ));

        Ok(task_id)
    }

    /// Close any live subscription. The last published snapshot remains
    /// visible to watchers.
    pub fn shutdown(&mut self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(channel) = self.channel.take() {
            channel.close();
        }
    }

    fn publish(&self, epoch: u64, state: &TaskState) {
        if self.epoch.load(Ordering::SeqCst) == epoch {
            self.snapshot.send_replace(state.clone());
        }
    }
}

/// Fold channel events into the canonical state until the stream ends,
/// the task reaches a terminal phase, or a newer submission supersedes
/// this one.
async fn drive(
    epoch: u64,
    live: Arc<AtomicU64>,
    mut state: TaskState,
    mut events: mpsc::Receiver<ChannelEvent>,
    closer: ChannelCloser,
    snapshot: watch::Sender<TaskState>,
) {
    while let Some(event) = events.recv().await {
        if live.load(Ordering::SeqCst) != epoch {
            return;
        }

        let task_event = match event {
            ChannelEvent::Opened { .. } => TaskEvent::Connection(ConnectionState::Open),
            ChannelEvent::Frame(frame) => TaskEvent::Frame(frame),
            ChannelEvent::Closed => TaskEvent::Connection(ConnectionState::Closed),
            // Transient: the supervisor is still retrying.
            ChannelEvent::Errored(_) => TaskEvent::Connection(ConnectionState::Connecting),
            ChannelEvent::GaveUp => {
                TaskEvent::Fatal("status subscription abandoned after retry exhaustion".to_string())
            }
        };

        let next = apply(&state, &task_event);
        if next != state {
            state = next;
            if live.load(Ordering::SeqCst) != epoch {
                return;
            }
            snapshot.send_replace(state.clone());
        }

        if state.phase.is_terminal() {
            info!(phase = %state.phase, progress = state.progress, "task reached terminal phase");
            closer.close();
            // Keep draining so the supervisor's final Closed event still
            // lands in the connection field.
        }
    }
}
