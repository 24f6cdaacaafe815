//! The pool manager.
//!
//! Owns the seeded resources and the journal. Every allocation and release
//! goes through the same commit path:
//!
//! ```text
//! resolve slot -> check transition -> append journal line -> apply state
//! ```
//!
//! The journal line is written before the state changes, so a failed append
//! leaves the pool exactly as it was and a successful return always has a
//! durable record behind it.
//!
//! A journal that fails mid-append refuses every later append (see
//! [`TextJournal`](respool_journal::TextJournal)), so after the first
//! `JournalUnavailable` the pool stops committing. The failed record may or
//! may not be in the file; it is never written a second time.

use crate::config::PoolConfig;
use crate::index::IdleIndex;
use respool_core::{
    JournalEntry, PoolError, PoolResult, Resource, ResourceId, ResourceState, Transition,
};
use respool_journal::{Durability, FileJournal, JournalSink};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Non-owning reference to an allocated resource.
///
/// Carries the resource's seeding slot for O(1) lookup. It is validated on
/// release, so a handle from another pool yields `UnknownResource`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    id: ResourceId,
    slot: usize,
}

impl ResourceHandle {
    #[inline]
    pub fn id(&self) -> ResourceId {
        self.id
    }
}

/// Point-in-time view of the pool, in seeding order.
#[derive(Debug, Clone, Serialize)]
pub struct PoolSnapshot {
    pub resources: Vec<Resource>,
    pub total: usize,
    pub idle: usize,
    pub in_use: usize,
    pub under_maintenance: usize,
}

pub struct PoolManager<J: JournalSink> {
    /// Seeding order is scan order.
    resources: Vec<Resource>,
    slots: HashMap<ResourceId, usize>,
    idle: IdleIndex,
    journal: J,
    config: PoolConfig,
    sealed: bool,
    closed: bool,
}

impl PoolManager<FileJournal> {
    /// Opens the file journal at `path` in append mode. Fails fast with
    /// `JournalUnavailable` if it cannot be opened.
    pub fn open(
        path: impl AsRef<Path>,
        durability: Durability,
        config: PoolConfig,
    ) -> PoolResult<Self> {
        let journal = FileJournal::open(path, durability)?;
        Ok(Self::new(journal, config))
    }
}

impl<J: JournalSink> PoolManager<J> {
    pub fn new(journal: J, config: PoolConfig) -> Self {
        Self {
            resources: Vec::new(),
            slots: HashMap::new(),
            idle: IdleIndex::new(),
            journal,
            config,
            sealed: false,
            closed: false,
        }
    }

    // -----------------------------------------------------------------------
    // Seeding
    // -----------------------------------------------------------------------

    /// Adds an `Idle` resource. Only allowed before the first
    /// allocate/release. Not journaled.
    pub fn seed(&mut self, id: ResourceId) -> PoolResult<()> {
        if self.sealed {
            return Err(PoolError::PoolSealed(id));
        }
        if self.slots.contains_key(&id) {
            return Err(PoolError::DuplicateResource(id));
        }

        let slot = self.resources.len();
        self.resources.push(Resource::new(id));
        self.slots.insert(id, slot);
        self.idle.insert(slot);

        tracing::debug!(resource_id = %id, slot, "seeded resource");
        Ok(())
    }

    pub fn seed_many(&mut self, ids: impl IntoIterator<Item = ResourceId>) -> PoolResult<()> {
        for id in ids {
            self.seed(id)?;
        }
        Ok(())
    }

    fn seal(&mut self) {
        if !self.sealed {
            self.sealed = true;
            tracing::info!(resources = self.resources.len(), "pool sealed");
        }
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    /// Moves the earliest-seeded `Idle` resource to `InUse`.
    ///
    /// Fails with `PoolExhausted` when nothing is idle. Never waits or
    /// retries.
    pub fn allocate(&mut self) -> PoolResult<ResourceHandle> {
        self.seal();

        let Some(slot) = self.idle.first() else {
            tracing::debug!(resources = self.resources.len(), "pool exhausted");
            return Err(PoolError::PoolExhausted);
        };

        let id = self.commit(slot, Transition::Allocate)?;
        Ok(ResourceHandle { id, slot })
    }

    /// Returns the resource to `Idle` according to the configured
    /// [`ReleasePolicy`](crate::ReleasePolicy). Releasing an already idle
    /// resource succeeds and is journaled.
    pub fn release(&mut self, handle: ResourceHandle) -> PoolResult<()> {
        let slot = self.resolve_handle(handle)?;
        self.release_slot(slot)
    }

    /// Like [`release`](Self::release), looked up by ID.
    pub fn release_id(&mut self, id: ResourceId) -> PoolResult<()> {
        let slot = self.resolve_id(id)?;
        self.release_slot(slot)
    }

    fn release_slot(&mut self, slot: usize) -> PoolResult<()> {
        self.seal();
        self.commit(slot, self.config.release_policy.transition())?;
        Ok(())
    }

    /// Takes an idle resource out of the allocatable set. Not journaled.
    pub fn begin_maintenance(&mut self, id: ResourceId) -> PoolResult<()> {
        let slot = self.resolve_id(id)?;
        self.commit(slot, Transition::BeginMaintenance)?;
        Ok(())
    }

    /// Returns a resource under maintenance to `Idle`. Not journaled.
    pub fn end_maintenance(&mut self, id: ResourceId) -> PoolResult<()> {
        let slot = self.resolve_id(id)?;
        self.commit(slot, Transition::EndMaintenance)?;
        Ok(())
    }

    /// Validates, journals, then applies `transition` to the resource at
    /// `slot`, keeping the idle index in step with the new state.
    fn commit(&mut self, slot: usize, transition: Transition) -> PoolResult<ResourceId> {
        let resource = &self.resources[slot];
        let id = resource.id();
        let from = resource.state();

        let next = resource.check(transition).map_err(|e| {
            tracing::warn!(resource_id = %id, %from, %transition, "rejected transition");
            e
        })?;

        let entry = match transition {
            Transition::Allocate => Some(JournalEntry::Allocated(id)),
            Transition::Release | Transition::ForceRelease => Some(JournalEntry::Released(id)),
            Transition::BeginMaintenance | Transition::EndMaintenance => None,
        };

        if let Some(entry) = entry {
            self.journal.append(&entry).map_err(|e| {
                tracing::warn!(resource_id = %id, error = %e, "journal append failed");
                PoolError::journal(format!("append {entry:?}"), e)
            })?;
        }

        debug_assert_eq!(self.idle.contains(slot), from.is_idle());
        self.resources[slot].transition(transition)?;
        if next.is_idle() {
            self.idle.insert(slot);
        } else {
            self.idle.remove(slot);
        }

        tracing::debug!(
            resource_id = %id,
            %from,
            to = %next,
            idle = self.idle.len(),
            "transition committed"
        );
        Ok(id)
    }

    fn resolve_handle(&self, handle: ResourceHandle) -> PoolResult<usize> {
        match self.resources.get(handle.slot) {
            Some(r) if r.id() == handle.id => Ok(handle.slot),
            _ => Err(PoolError::UnknownResource(handle.id)),
        }
    }

    fn resolve_id(&self, id: ResourceId) -> PoolResult<usize> {
        self.slots
            .get(&id)
            .copied()
            .ok_or(PoolError::UnknownResource(id))
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn state_of(&self, id: ResourceId) -> Option<ResourceState> {
        self.slots.get(&id).map(|&slot| self.resources[slot].state())
    }

    /// Resources in seeding order.
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn journal(&self) -> &J {
        &self.journal
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        let count = |s: ResourceState| self.resources.iter().filter(|r| r.state() == s).count();

        PoolSnapshot {
            resources: self.resources.clone(),
            total: self.resources.len(),
            idle: count(ResourceState::Idle),
            in_use: count(ResourceState::InUse),
            under_maintenance: count(ResourceState::UnderMaintenance),
        }
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    /// Flushes and closes the journal, reporting any failure. Dropping the
    /// manager does the same but can only log errors.
    pub fn close(mut self) -> PoolResult<()> {
        self.closed = true;
        self.journal
            .close()
            .map_err(|e| PoolError::journal("close", e))
    }
}

impl<J: JournalSink> Drop for PoolManager<J> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.journal.close() {
            tracing::warn!(error = %e, "failed to close journal on drop");
        }
    }
}
