/*
[INPUT]:  Serialized identifiers and API response bodies
[OUTPUT]: Typed task identifiers and intake responses
[POS]:    Types layer - shared data model
[UPDATE]: When the intake API schema changes
*/

pub mod models;

pub use models::{TaskId, UploadResponse};
