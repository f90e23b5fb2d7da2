/*
[INPUT]:  Decoded frames and connection-lifecycle events
[OUTPUT]: Canonical task state and snapshot subscriptions
[POS]:    State layer - lifecycle fold and session supervision
[UPDATE]: When lifecycle semantics or the session surface change
*/

pub mod session;
pub mod state;

pub use session::TaskSession;
pub use state::{ConnectionState, TaskEvent, TaskPhase, TaskState, apply};
