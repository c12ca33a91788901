//! Incremental log-file tailing.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sorsim_protocol::SimLogRecord;

/// Reads a log file incrementally; each poll returns only the records that
/// appeared since the previous one. A trailing partial line is buffered
/// until its newline arrives.
pub struct LogTail {
    path: PathBuf,
    offset: u64,
    partial: String,
}

impl LogTail {
    pub fn new(path: impl AsRef<Path>) -> LogTail {
        LogTail {
            path: path.as_ref().to_path_buf(),
            offset: 0,
            partial: String::new(),
        }
    }

    /// Parse everything appended since the last poll. Unparseable lines are
    /// skipped — the renderer should survive a torn or foreign line rather
    /// than die mid-run.
    pub fn poll(&mut self) -> Result<Vec<SimLogRecord>> {
        let mut file = File::open(&self.path)
            .with_context(|| format!("cannot open log file {}", self.path.display()))?;
        file.seek(SeekFrom::Start(self.offset))
            .context("seek failed")?;

        let mut chunk = String::new();
        let read = file.read_to_string(&mut chunk).context("read failed")?;
        self.offset += read as u64;

        let mut records = Vec::new();
        self.partial.push_str(&chunk);
        while let Some(newline) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=newline).collect();
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            if let Ok(record) = line.parse::<SimLogRecord>() {
                records.push(record);
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn poll_returns_only_new_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "1;2;director;first").unwrap();

        let mut tail = LogTail::new(&path);
        assert_eq!(tail.poll().unwrap().len(), 1);
        assert_eq!(tail.poll().unwrap().len(), 0);

        writeln!(file, "2;2;director;second").unwrap();
        let records = tail.poll().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "second");
    }

    #[test]
    fn partial_line_waits_for_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let mut file = File::create(&path).unwrap();
        write!(file, "1;2;director;torn").unwrap();
        file.flush().unwrap();

        let mut tail = LogTail::new(&path);
        assert!(tail.poll().unwrap().is_empty());

        writeln!(file, " line").unwrap();
        let records = tail.poll().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "torn line");
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "not a record").unwrap();
        writeln!(file, "3;4;triage;valid").unwrap();

        let mut tail = LogTail::new(&path);
        let records = tail.poll().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "valid");
    }
}
