//! Journal sink abstraction, concrete sinks, and journal replay/audit.

pub mod audit;
pub mod file;
pub mod memory;
pub mod replay;
pub mod text;

use respool_core::JournalEntry;
use std::io;

pub use audit::{AuditReport, ResourceActivity};
pub use file::{Durability, FileJournal};
pub use memory::MemoryJournal;
pub use replay::{replay, replay_file};
pub use text::TextJournal;

/// Append-only destination for committed pool transactions.
///
/// `append` must not return `Ok` until the entry's line has been handed to
/// the underlying storage (flushed), so a caller that sees success can rely
/// on the record surviving the process.
pub trait JournalSink: Send {
    fn append(&mut self, entry: &JournalEntry) -> io::Result<()>;

    /// Flushes and releases the sink. Must be safe to call more than once.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<J: JournalSink + ?Sized> JournalSink for Box<J> {
    fn append(&mut self, entry: &JournalEntry) -> io::Result<()> {
        (**self).append(entry)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}
