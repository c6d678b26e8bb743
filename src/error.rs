//! Error handling for ETL Studio
//!
//! This module defines the crate-wide error type, a Result alias, and the
//! classification used by the editor session to decide where an error is
//! surfaced (inline, notification channel, or page boundary).

use crate::pipeline::id::NodeId;
use thiserror::Error;

/// Main error type for ETL Studio operations
#[derive(Error, Debug)]
pub enum StudioError {
    /// A local edit was attempted on a read-only (historical) graph
    #[error("Version is read-only: cannot {operation}")]
    ReadOnly { operation: &'static str },

    /// A node id does not exist in the working graph
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// Connecting the two nodes would close a cycle
    #[error("Edge {from} -> {to} would create a cycle")]
    CycleDetected { from: NodeId, to: NodeId },

    /// An edge from a node to itself
    #[error("Cannot connect node {0} to itself")]
    SelfLoop(NodeId),

    /// Local validation failures (malformed config JSON, bad field input)
    #[error("Validation error: {0}")]
    Validation(String),

    /// The operation needs a pipeline that has been created on the backend
    #[error("Pipeline has not been created yet")]
    NoPipeline,

    /// Resource missing on the backend
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Transport-level failures (connection refused, timeout, TLS)
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The version was created but publishing it failed
    #[error("Version {version_id} was saved but not published: {message}")]
    PublishFailed { version_id: i64, message: String },

    /// Someone else saved a newer version since this one was loaded
    #[error("Version conflict: editing on top of v{base} but latest is v{latest}")]
    Conflict { base: u32, latest: u32 },

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<StudioError>,
    },
}

/// Where an error belongs according to the propagation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Caught locally, blocks the mutation, shown inline
    Validation,
    /// Request failure, shown as a transient notification
    Network,
    /// A multi-step operation partly succeeded
    PartialFailure,
    /// Concurrent edit detected
    Conflict,
    /// Anything else (IO, config)
    Internal,
}

impl StudioError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        StudioError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Classify the error for routing
    pub fn class(&self) -> ErrorClass {
        match self {
            StudioError::ReadOnly { .. }
            | StudioError::UnknownNode(_)
            | StudioError::CycleDetected { .. }
            | StudioError::SelfLoop(_)
            | StudioError::Validation(_)
            | StudioError::NoPipeline => ErrorClass::Validation,
            StudioError::NotFound(_)
            | StudioError::Api { .. }
            | StudioError::Transport(_)
            | StudioError::Serialization(_) => ErrorClass::Network,
            StudioError::PublishFailed { .. } => ErrorClass::PartialFailure,
            StudioError::Conflict { .. } => ErrorClass::Conflict,
            StudioError::Config(_) | StudioError::Io(_) => ErrorClass::Internal,
            StudioError::WithContext { source, .. } => source.class(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        StudioError::Validation(message.into())
    }
}

/// Result type alias for ETL Studio operations
pub type Result<T> = std::result::Result<T, StudioError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StudioError::Validation("config must be a JSON object".to_string());
        assert_eq!(
            err.to_string(),
            "Validation error: config must be a JSON object"
        );
    }

    #[test]
    fn test_error_with_context() {
        let err = StudioError::NotFound("pipeline 7".to_string());
        let with_ctx = err.with_context("Failed to load pipeline");
        assert!(with_ctx.to_string().contains("Failed to load pipeline"));
        assert_eq!(with_ctx.class(), ErrorClass::Network);
    }

    #[test]
    fn test_error_classes() {
        assert_eq!(
            StudioError::ReadOnly { operation: "add node" }.class(),
            ErrorClass::Validation
        );
        assert_eq!(
            StudioError::Api {
                status: 500,
                message: "boom".into()
            }
            .class(),
            ErrorClass::Network
        );
        assert_eq!(
            StudioError::PublishFailed {
                version_id: 3,
                message: "timeout".into()
            }
            .class(),
            ErrorClass::PartialFailure
        );
        assert_eq!(
            StudioError::Conflict { base: 1, latest: 2 }.class(),
            ErrorClass::Conflict
        );
    }

    #[test]
    fn test_cycle_error_names_both_nodes() {
        let err = StudioError::CycleDetected {
            from: NodeId::from("a"),
            to: NodeId::from("b"),
        };
        let text = err.to_string();
        assert!(text.contains("a -> b"));
    }
}
