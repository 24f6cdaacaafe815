//! Append-mode file journal.

use crate::text::TextJournal;
use crate::JournalSink;
use respool_core::{JournalEntry, PoolError, PoolResult};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// How far each appended line is pushed before `append` returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Durability {
    /// Flush to the OS after every line.
    #[default]
    Flush,
    /// Flush and `fdatasync` after every line. Survives power loss.
    Fsync,
}

/// Journal backed by a file opened in append mode. Existing history is
/// never truncated.
///
/// If a previous process left a torn final line (no trailing newline), it
/// is terminated on open so the next entry starts on its own line.
pub struct FileJournal {
    inner: TextJournal<File>,
    path: PathBuf,
    durability: Durability,
    closed: bool,
}

impl FileJournal {
    /// Opens (creating if needed) `path` for appending.
    pub fn open(path: impl AsRef<Path>, durability: Durability) -> PoolResult<Self> {
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| PoolError::journal(format!("open {}", path.display()), e))?;

        if terminate_torn_tail(&mut file)
            .map_err(|e| PoolError::journal(format!("repair {}", path.display()), e))?
        {
            tracing::warn!(path = %path.display(), "terminated torn journal line");
        }

        tracing::info!(path = %path.display(), ?durability, "journal opened");

        Ok(Self {
            inner: TextJournal::new(file),
            path,
            durability,
            closed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn durability(&self) -> Durability {
        self.durability
    }

    /// Lines appended since this handle was opened.
    pub fn lines_written(&self) -> usize {
        self.inner.lines_written()
    }
}

impl JournalSink for FileJournal {
    fn append(&mut self, entry: &JournalEntry) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "journal already closed",
            ));
        }
        self.inner.write_entry(entry)?;
        if self.durability == Durability::Fsync {
            // The line is already in the file; whether it survives is now
            // unknown, so nothing more may be committed on this handle.
            if let Err(e) = self.inner.get_ref().sync_data() {
                self.inner.poison();
                return Err(e);
            }
        }
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.inner.flush()?;
        self.inner.get_ref().sync_all()?;
        tracing::info!(
            path = %self.path.display(),
            lines = self.inner.lines_written(),
            "journal closed"
        );
        Ok(())
    }
}

/// Appends `\n` if the file is non-empty and does not end with one.
/// Returns whether a repair was made.
fn terminate_torn_tail(file: &mut File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    if last[0] == b'\n' {
        return Ok(false);
    }

    file.write_all(b"\n")?;
    file.flush()?;
    Ok(true)
}

impl Drop for FileJournal {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to close journal");
        }
    }
}
