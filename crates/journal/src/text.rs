//! Line-oriented text journal over any writer.
//!
//! ```ignore
//! let mut journal = TextJournal::new(Vec::new());
//! journal.append(&JournalEntry::Allocated(ResourceId(1)))?;
//! ```

use crate::JournalSink;
use respool_core::JournalEntry;
use std::io::{self, Write};

/// Writes one `Display`-formatted entry per line and flushes after each.
///
/// No `BufWriter`: every line must reach the writer before `append`
/// returns. Each line is rendered into a reused buffer first so it hits
/// the writer as a single `write_all`.
///
/// A failed write or flush poisons the journal. The failed line may be
/// partially or fully on disk, so every later append is refused rather
/// than risk gluing a new entry onto a torn line or journaling a retry of
/// a transition that was already recorded.
pub struct TextJournal<W: Write> {
    writer: W,
    line: String,
    lines_written: usize,
    poisoned: bool,
}

impl<W: Write> TextJournal<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            line: String::with_capacity(64),
            lines_written: 0,
            poisoned: false,
        }
    }

    pub fn write_entry(&mut self, entry: &JournalEntry) -> io::Result<()> {
        if self.poisoned {
            return Err(poisoned_error());
        }

        self.line.clear();
        self.line.push_str(&entry.to_string());
        self.line.push('\n');

        let result = self
            .writer
            .write_all(self.line.as_bytes())
            .and_then(|()| self.writer.flush());
        if let Err(e) = result {
            self.poison();
            return Err(e);
        }

        self.lines_written += 1;
        Ok(())
    }

    /// Refuse every later append. Used when a failure happens after the
    /// line was handed over, e.g. a failed `fdatasync`.
    pub fn poison(&mut self) {
        if !self.poisoned {
            self.poisoned = true;
            tracing::warn!(lines = self.lines_written, "journal poisoned");
        }
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Number of lines written through this handle.
    pub fn lines_written(&self) -> usize {
        self.lines_written
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn poisoned_error() -> io::Error {
    io::Error::new(
        io::ErrorKind::Other,
        "journal poisoned by an earlier write failure",
    )
}

impl<W: Write + Send> JournalSink for TextJournal<W> {
    fn append(&mut self, entry: &JournalEntry) -> io::Result<()> {
        self.write_entry(entry)
    }

    fn close(&mut self) -> io::Result<()> {
        self.flush()
    }
}
