/*
[INPUT]:  Raw WebSocket message text
[OUTPUT]: Validated StatusFrame structs or decode errors
[POS]:    WebSocket layer - message parsing and validation
[UPDATE]: When the status frame schema changes
*/

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One point-in-time snapshot of a job, as reported by the processing
/// service. A frame is a snapshot, not a delta.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StatusFrame {
    /// Progress percentage, 0..=100
    pub progress: u8,
    /// Location of the finished result, present only on completion
    #[serde(rename = "videoUrl", skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
}

impl StatusFrame {
    /// Progress-only frame.
    pub fn progress(progress: u8) -> Self {
        Self {
            progress,
            result_url: None,
        }
    }

    /// Terminal frame carrying the result location.
    pub fn completed(progress: u8, result_url: impl Into<String>) -> Self {
        Self {
            progress,
            result_url: Some(result_url.into()),
        }
    }
}

/// A status frame failed validation and was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed status frame: {0}")]
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct RawStatusFrame {
    progress: i64,
    #[serde(default, rename = "videoUrl", alias = "resultUrl")]
    video_url: Option<String>,
}

/// Validate and parse one inbound message into a typed status frame.
///
/// Wire shape: `{"progress": <int 0..=100>, "videoUrl": <string|null>}`.
/// The `resultUrl` key is accepted as an alias. Anything failing
/// validation yields `DecodeError::Malformed` and must be dropped by the
/// caller; it never terminates the subscription.
pub fn decode_frame(text: &str) -> Result<StatusFrame, DecodeError> {
    let raw: RawStatusFrame =
        serde_json::from_str(text).map_err(|err| DecodeError::Malformed(err.to_string()))?;

    if !(0..=100).contains(&raw.progress) {
        return Err(DecodeError::Malformed(format!(
            "progress {} out of range",
            raw.progress
        )));
    }
    if let Some(url) = &raw.video_url
        && url.is_empty()
    {
        return Err(DecodeError::Malformed("empty result url".to_string()));
    }

    Ok(StatusFrame {
        progress: raw.progress as u8,
        result_url: raw.video_url,
    })
}
