/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public Vidra client crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod http;
pub mod progress;
pub mod types;
pub mod ws;

// Re-export commonly used types from http
pub use http::{ClientConfig, Result, VidraClient, VidraError};

// Re-export the state machine and session surface
pub use progress::{ConnectionState, TaskEvent, TaskPhase, TaskSession, TaskState, apply};

// Re-export all types
pub use types::*;

// Re-export commonly used types from ws
pub use ws::{
    ChannelEvent,
    DecodeError,
    RetryPolicy,
    StatusChannel,
    StatusChannelHandle,
    StatusFrame,
    WsConfig,
    decode_frame,
};
