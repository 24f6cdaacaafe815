//! Domain models, state transitions, and error definitions.
//!
//! Foundation crate -- no async or I/O dependencies.

pub mod error;
pub mod types;

pub use error::{PoolError, PoolResult};
pub use types::{JournalEntry, Resource, ResourceId, ResourceState, Transition};
