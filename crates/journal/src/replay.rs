//! Reading a journal back into entries.

use respool_core::{JournalEntry, PoolError, PoolResult};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Parses a journal stream line by line. Blank lines are skipped, as are
/// torn fragments of an entry prefix left by an interrupted write (see
/// [`FileJournal`](crate::FileJournal)). Any other unrecognized line fails
/// with `InvalidJournalLine`.
pub fn replay<R: BufRead>(reader: R) -> PoolResult<Vec<JournalEntry>> {
    let mut entries = Vec::new();

    for line in reader.lines() {
        let line = line.map_err(|e| PoolError::journal("read", e))?;
        if line.trim().is_empty() {
            continue;
        }
        if JournalEntry::is_torn_fragment(&line) {
            tracing::warn!(line = %line, "skipping torn journal line");
            continue;
        }
        entries.push(line.parse()?);
    }

    tracing::debug!(entries = entries.len(), "journal replayed");
    Ok(entries)
}

pub fn replay_file(path: impl AsRef<Path>) -> PoolResult<Vec<JournalEntry>> {
    let path = path.as_ref();
    let file =
        File::open(path).map_err(|e| PoolError::journal(format!("open {}", path.display()), e))?;
    replay(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use respool_core::ResourceId;

    #[test]
    fn parses_lines_in_order() {
        let text = "Allocated resource ID: 1\n\nReleased resource ID: 1\r\nAllocated resource ID: 2\n";
        let entries = replay(text.as_bytes()).unwrap();
        assert_eq!(
            entries,
            vec![
                JournalEntry::Allocated(ResourceId(1)),
                JournalEntry::Released(ResourceId(1)),
                JournalEntry::Allocated(ResourceId(2)),
            ]
        );
    }

    #[test]
    fn skips_torn_fragment() {
        let text = "Allocated resource ID: 1\nAlloc\nReleased resource ID: 1\n";
        assert_eq!(
            replay(text.as_bytes()).unwrap(),
            vec![
                JournalEntry::Allocated(ResourceId(1)),
                JournalEntry::Released(ResourceId(1)),
            ]
        );
    }

    #[test]
    fn rejects_garbage() {
        let err = replay("Allocated resource ID: 1\nhello\n".as_bytes()).unwrap_err();
        assert!(matches!(err, PoolError::InvalidJournalLine(ref l) if l == "hello"));
    }

    #[test]
    fn missing_file_is_journal_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = replay_file(dir.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, PoolError::JournalUnavailable { .. }));
    }
}
