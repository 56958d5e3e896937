//! Error types shared across the compositor.

use std::sync::Arc;

use thiserror::Error;

use crate::symbol::SymbolId;

/// Result type for compositor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A failure raised by a channel observer.
///
/// Shared so the same failure can be handed to every remaining subscriber.
pub type Fault = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Build a [`Fault`] from a plain message.
pub fn fault(message: impl Into<String>) -> Fault {
    Arc::new(Message(message.into()))
}

#[derive(Debug, Error)]
#[error("{0}")]
struct Message(String);

/// Errors that can occur in the compositor.
#[derive(Debug, Error)]
pub enum Error {
    /// A required argument was missing or malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The symbol is not registered with this layout manager.
    #[error("Symbol `{name}` ({id}) is not registered with this layout manager")]
    SymbolNotFound { name: String, id: SymbolId },

    /// The operation is not allowed in the current state.
    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    /// A subscriber failed while handling a notification.
    #[error("Observer failed: {0}")]
    Observer(Fault),

    /// Several failures collected during teardown.
    #[error("{} failure(s) during teardown: {}", .0.len(), join(.0))]
    Aggregate(Vec<Error>),

    /// An I/O operation on the terminal failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Collapse a list of teardown failures into one result.
    pub fn collect(mut errors: Vec<Error>) -> Result<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Error::Aggregate(errors)),
        }
    }

    /// The observer failure carried by this error, if any.
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Self::Observer(fault) => Some(fault),
            _ => None,
        }
    }
}

fn join(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
