//! Centralized error types for the respool workspace.

use crate::types::{ResourceId, ResourceState, Transition};
use std::time::Duration;
use thiserror::Error;

/// Top-level error enum. Variants map to pool and journal failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PoolError {
    /// The journal could not be opened or a write to it failed.
    #[error("Journal unavailable ({context}): {source}")]
    JournalUnavailable {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No available resources")]
    PoolExhausted,

    #[error("Unknown resource ID: {0}")]
    UnknownResource(ResourceId),

    #[error("Resource ID {0} is already seeded")]
    DuplicateResource(ResourceId),

    /// Seeding was attempted after the first allocate/release.
    #[error("Pool is sealed; cannot seed resource ID {0}")]
    PoolSealed(ResourceId),

    #[error("Resource ID {id}: cannot {transition} while {from}")]
    InvalidTransition {
        id: ResourceId,
        from: ResourceState,
        transition: Transition,
    },

    #[error("Timed out after {0:?} waiting for an idle resource")]
    WaitTimedOut(Duration),

    #[error("Invalid journal line: {0:?}")]
    InvalidJournalLine(String),
}

impl PoolError {
    /// Wraps an I/O failure on the journal with a short description of the
    /// operation that failed.
    pub fn journal(context: impl Into<String>, source: std::io::Error) -> Self {
        PoolError::JournalUnavailable {
            context: context.into(),
            source,
        }
    }

    /// Exhaustion and wait timeouts are normal outcomes under load; the
    /// caller may retry. Everything else indicates a bug or broken journal.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PoolError::PoolExhausted | PoolError::WaitTimedOut(_))
    }
}

pub type PoolResult<T> = Result<T, PoolError>;
