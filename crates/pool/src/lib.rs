//! Resource pool manager: first-fit allocation, validated state
//! transitions, and a journal append for every allocation and release.

pub mod config;
pub mod index;
pub mod manager;
pub mod shared;

pub use config::{PoolConfig, ReleasePolicy};
pub use manager::{PoolManager, PoolSnapshot, ResourceHandle};
pub use shared::SharedPool;
