/*
[INPUT]:  Task lifecycle events (upload outcomes, status frames, connection changes)
[OUTPUT]: The canonical TaskState, folded deterministically
[POS]:    State layer - task lifecycle state machine
[UPDATE]: When lifecycle phases or frame-acceptance rules change
*/

use crate::types::TaskId;
use crate::ws::frame::StatusFrame;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskPhase {
    /// No submission yet
    #[default]
    Idle,
    /// Intake call in flight
    Uploading,
    /// Task id assigned, no frame received yet
    AwaitingStatus,
    /// At least one frame accepted
    Processing,
    /// Result URL received; terminal
    Completed,
    /// Upload or subscription failed; terminal
    Failed,
}

impl TaskPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPhase::Idle => "idle",
            TaskPhase::Uploading => "uploading",
            TaskPhase::AwaitingStatus => "awaiting_status",
            TaskPhase::Processing => "processing",
            TaskPhase::Completed => "completed",
            TaskPhase::Failed => "failed",
        }
    }

    /// Terminal phases accept no further task mutation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskPhase::Completed | TaskPhase::Failed)
    }
}

impl fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport state of the status channel, independent of task progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No channel opened yet
    #[default]
    Uninstantiated,
    /// Connect or reconnect attempt in flight
    Connecting,
    Open,
    Closing,
    Closed,
}

/// The canonical aggregate for one task. Mutated only through `apply`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TaskState {
    pub task_id: Option<TaskId>,
    pub phase: TaskPhase,
    /// Monotonically non-decreasing while Processing
    pub progress: u8,
    /// Set at most once; presence implies Completed
    pub result_url: Option<String>,
    pub connection: ConnectionState,
    /// Human-readable reason when `phase` is Failed
    pub failure: Option<String>,
}

impl TaskState {
    /// Fresh state for a new submission.
    pub fn idle() -> Self {
        Self::default()
    }
}

/// One input to the fold: a decoded frame, a connection transition, or an
/// upload-lifecycle signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    /// Submission started (intake call dispatched)
    UploadStarted,
    /// Intake accepted the file and assigned a task id
    UploadAccepted(TaskId),
    /// Intake call failed; terminal for this submission
    UploadFailed(String),
    /// One validated status frame
    Frame(StatusFrame),
    /// Transport transition; never affects the task phase
    Connection(ConnectionState),
    /// Classified-fatal condition (e.g. reconnect attempts exhausted)
    Fatal(String),
}

/// Deterministic fold of one event into the canonical state.
///
/// Acceptance rules:
/// - a frame with lower progress than held is stale and dropped silently
///   (out-of-order or duplicate delivery across reconnects);
/// - a frame carrying a result URL completes the task regardless of its
///   progress value, and progress is forced to 100;
/// - terminal phases ignore everything except connection transitions;
/// - re-applying the last-applied frame is a no-op.
pub fn apply(state: &TaskState, event: &TaskEvent) -> TaskState {
    let mut next = state.clone();

    if let TaskEvent::Connection(connection) = event {
        next.connection = *connection;
        return next;
    }

    if state.phase.is_terminal() {
        return next;
    }

    match event {
        TaskEvent::UploadStarted => {
            if state.phase == TaskPhase::Idle {
                next.phase = TaskPhase::Uploading;
            }
        }
        TaskEvent::UploadAccepted(task_id) => {
            if state.phase == TaskPhase::Uploading {
                next.task_id = Some(task_id.clone());
                next.phase = TaskPhase::AwaitingStatus;
                next.progress = 0;
                next.result_url = None;
            }
        }
        TaskEvent::UploadFailed(reason) | TaskEvent::Fatal(reason) => {
            next.phase = TaskPhase::Failed;
            next.failure = Some(reason.clone());
        }
        TaskEvent::Frame(frame) => {
            if !matches!(
                state.phase,
                TaskPhase::AwaitingStatus | TaskPhase::Processing
            ) {
                // No live task id; nothing to attribute the frame to.
                return next;
            }
            if let Some(url) = &frame.result_url {
                // Completion outranks the monotonic-progress gate.
                next.phase = TaskPhase::Completed;
                next.progress = 100;
                next.result_url = Some(url.clone());
            } else if frame.progress >= state.progress {
                next.phase = TaskPhase::Processing;
                next.progress = frame.progress;
            }
            // else: stale frame, dropped
        }
        // Connection transitions were handled before the terminal gate.
        TaskEvent::Connection(_) => {}
    }

    next
}
