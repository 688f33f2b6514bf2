use thiserror::Error;

use crate::meter::MeterKind;

/// A field being aggregated by a [`crate::StructRecorder`] collided with
/// an existing registration of a different meter kind at the same path.
///
/// The observation that triggered it is dropped; the recorder keeps
/// running so one bad field doesn't take the rest of the struct down.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("telemetry path `{path}` is already a {expected}, but this value needs a {found}")]
pub struct AggregateError {
    pub path: String,
    pub expected: MeterKind,
    pub found: MeterKind,
}
