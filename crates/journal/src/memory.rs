//! In-memory journal for tests and embedding.

use crate::JournalSink;
use parking_lot::Mutex;
use respool_core::JournalEntry;
use std::io;
use std::sync::Arc;

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<JournalEntry>,
    fail_after: Option<usize>,
    closed: bool,
}

/// Cloneable handle onto a shared entry list. Hand one clone to the pool
/// and keep another to inspect what was journaled.
#[derive(Debug, Clone, Default)]
pub struct MemoryJournal {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `n` more appends, then fail every subsequent one.
    pub fn fail_after(&self, n: usize) {
        let mut inner = self.inner.lock();
        let accepted = inner.entries.len();
        inner.fail_after = Some(accepted + n);
    }

    pub fn entries(&self) -> Vec<JournalEntry> {
        self.inner.lock().entries.clone()
    }

    /// The journal as it would appear on disk.
    pub fn lines(&self) -> Vec<String> {
        self.inner
            .lock()
            .entries
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

impl JournalSink for MemoryJournal {
    fn append(&mut self, entry: &JournalEntry) -> io::Result<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "journal already closed",
            ));
        }
        if inner.fail_after.is_some_and(|limit| inner.entries.len() >= limit) {
            return Err(io::Error::new(io::ErrorKind::Other, "injected journal failure"));
        }
        inner.entries.push(*entry);
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.inner.lock().closed = true;
        Ok(())
    }
}
