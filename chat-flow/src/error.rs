use thiserror::Error;

pub type Result<T> = std::result::Result<T, FlowError>;

/// Structural failures of the flow engine.
///
/// Validation rejections are deliberately NOT part of this taxonomy: a
/// rejected response is an expected, recoverable outcome and is returned as a
/// value (see [`crate::flow::FlowStatus::Rejected`]). Everything here points
/// at a defect in the flow definition or its surroundings, not at user input.
#[derive(Error, Debug)]
pub enum FlowError {
    /// A step id was requested that does not exist in the flow graph.
    #[error("Step not found: {0}")]
    UnknownStep(String),

    /// A transition resolved to a step id that is absent from the graph.
    /// This is a flow definition defect; callers must treat it as fatal.
    #[error("Transition from '{from}' resolved to unknown step '{to}'")]
    InvalidTransition { from: String, to: String },

    /// No session exists under the given id.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// A storage backend failed to read or write a session.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
