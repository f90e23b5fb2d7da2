/*
[INPUT]:  WebSocket configuration and a task identifier
[OUTPUT]: Decoded status frames and connection-lifecycle events
[POS]:    WebSocket layer - per-task status subscription
[UPDATE]: When the subscription protocol or reconnect policy changes
*/

pub mod channel;
pub mod frame;
pub mod retry;

pub use channel::{ChannelCloser, ChannelEvent, StatusChannel, StatusChannelHandle, WsConfig};
pub use frame::{DecodeError, StatusFrame, decode_frame};
pub use retry::RetryPolicy;
