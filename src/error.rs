//! Error types for proctor

use serde_json::Value;
use thiserror::Error;

/// Result type for proctor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Which operation catalog a lookup was scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogScope {
    /// Operations dispatched against a resolved DOM node
    Element,
    /// Operations dispatched against the page's global object
    Page,
}

impl std::fmt::Display for CatalogScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogScope::Element => f.write_str("element"),
            CatalogScope::Page => f.write_str("page"),
        }
    }
}

/// Error type for proctor
#[derive(Debug, Error)]
pub enum Error {
    /// Session is closed or otherwise unable to carry commands
    #[error("Invalid session: {0}")]
    InvalidSession(String),

    /// Operation name not present in the scoped catalog.
    /// This is a security rejection, not a lookup miss: nothing outside the
    /// catalog may ever reach the remote side.
    #[error("Unknown {scope} operation: '{name}'")]
    UnknownOperation { scope: CatalogScope, name: String },

    /// Argument list does not match the operation's declared parameters
    #[error("Operation '{operation}' expects {expected} argument(s), got {got}")]
    InvalidArguments {
        operation: String,
        expected: usize,
        got: usize,
    },

    /// Target handle absent or the CDP "no node" sentinel
    #[error("Invalid target handle: {0}")]
    InvalidTarget(i32),

    /// Target handle could not be resolved to a live remote object
    /// (node detached or removed since the handle was obtained)
    #[error("Failed to resolve node {node_id}: {message}")]
    NodeResolution { node_id: i32, message: String },

    /// The remote side accepted the call but execution failed
    #[error("Operation '{operation}' failed (target: {target:?}, arguments: {arguments:?}): {message}")]
    OperationFailed {
        operation: String,
        target: Option<i32>,
        arguments: Vec<Value>,
        message: String,
    },

    /// Element not found in DOM
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Timeout
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Transport error
    #[error("Transport error: {context}")]
    Transport {
        context: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// CDP protocol error
    #[error("CDP error in {method}: {message} (code {code})")]
    Cdp {
        method: String,
        code: i64,
        message: String,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a transport error with context
    pub fn transport(context: impl Into<String>) -> Self {
        Self::Transport {
            context: context.into(),
            source: None,
        }
    }

    /// Create a transport error with IO source
    pub fn transport_io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Transport {
            context: context.into(),
            source: Some(source),
        }
    }

    /// Create a CDP error with full context
    pub fn cdp(method: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
        Self::Cdp {
            method: method.into(),
            code,
            message: message.into(),
        }
    }

    /// Create a node resolution error
    pub fn resolution(node_id: i32, message: impl Into<String>) -> Self {
        Self::NodeResolution {
            node_id,
            message: message.into(),
        }
    }

    /// Whether the caller may retry after re-querying the DOM for a fresh
    /// handle. All other kinds are either usage errors or transport-level
    /// failures that a fresh handle would not fix.
    pub fn is_stale_target(&self) -> bool {
        matches!(self, Error::NodeResolution { .. })
    }
}
