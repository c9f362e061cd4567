//! Append-only chat-history log: one flat `{ts, role, content}` object per
//! line, tail reads, and atomic append-then-trim.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

pub const ROLE_HUMAN: &str = "human";
pub const ROLE_YOU: &str = "you";

/// One logged turn entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub ts: String,
    pub role: String,
    pub content: String,
}

/// Append-only JSONL chat history for one conversation.
pub struct ChatHistory {
    path: PathBuf,
}

impl ChatHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Appends one `{ts, role, content}` record, then atomically trims the
    /// log to the most recent `max_turns` entries.
    pub fn append(&self, role: impl Into<String>, content: impl Into<String>, max_turns: usize) -> Result<(), EngineError> {
        if let Some(dir) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let entry = HistoryEntry {
            ts: now_iso_seconds(),
            role: role.into(),
            content: content.into(),
        };
        let line = serde_json::to_string(&entry)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        drop(file);
        self.trim(max_turns)
    }

    /// Reads every well-formed entry, skipping lines that fail to parse
    /// (e.g. a torn write from a crash mid-append).
    pub fn read_all(&self) -> Result<Vec<HistoryEntry>, EngineError> {
        read_lines(&self.path)
    }

    /// Reads the last `limit` well-formed entries, in order.
    pub fn tail(&self, limit: usize) -> Result<Vec<HistoryEntry>, EngineError> {
        let mut entries = self.read_all()?;
        if entries.len() > limit {
            entries = entries.split_off(entries.len() - limit);
        }
        Ok(entries)
    }

    /// Atomically rewrites the log keeping only the last `keep` entries.
    pub fn trim(&self, keep: usize) -> Result<(), EngineError> {
        let entries = self.tail(keep)?;
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        for entry in &entries {
            let line = serde_json::to_string(entry)?;
            writeln!(tmp, "{line}")?;
        }
        tmp.persist(&self.path)
            .map_err(|e| EngineError::Io(e.to_string()))?;
        Ok(())
    }
}

fn now_iso_seconds() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn read_lines(path: &Path) -> Result<Vec<HistoryEntry>, EngineError> {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let reader = std::io::BufReader::new(file);
    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if let Ok(entry) = serde_json::from_str::<HistoryEntry>(&line) {
            entries.push(entry);
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_then_read_all_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let history = ChatHistory::new(dir.path().join("history.jsonl"));
        history.append(ROLE_HUMAN, "hi", 100).unwrap();
        history.append(ROLE_YOU, "hello", 100).unwrap();
        let entries = history.read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].role, ROLE_HUMAN);
        assert_eq!(entries[0].content, "hi");
        assert_eq!(entries[1].role, ROLE_YOU);
        assert!(entries[0].ts.ends_with('Z'));
    }

    #[test]
    fn tail_returns_most_recent_n() {
        let dir = tempfile::tempdir().unwrap();
        let history = ChatHistory::new(dir.path().join("history.jsonl"));
        for i in 0..5 {
            history.append(ROLE_HUMAN, format!("msg {i}"), 100).unwrap();
        }
        let tail = history.tail(2).unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].content, "msg 3");
        assert_eq!(tail[1].content, "msg 4");
    }

    #[test]
    fn read_all_skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        std::fs::write(&path, "not json\n{\"ts\":\"now\",\"role\":\"human\",\"content\":\"ok\"}\n").unwrap();
        let history = ChatHistory::new(&path);
        let entries = history.read_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].content, "ok");
    }

    #[test]
    fn append_trims_to_max_turns() {
        let dir = tempfile::tempdir().unwrap();
        let history = ChatHistory::new(dir.path().join("history.jsonl"));
        for i in 0..5 {
            history.append(ROLE_HUMAN, format!("msg {i}"), 2).unwrap();
        }
        let entries = history.read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].content, "msg 3");
        assert_eq!(entries[1].content, "msg 4");
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let history = ChatHistory::new(dir.path().join("missing.jsonl"));
        assert!(history.read_all().unwrap().is_empty());
    }
}
