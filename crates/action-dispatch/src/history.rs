//! Chat history sink

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

use crate::sink::SelectionSink;
use crate::SinkError;

/// Default retained entries
pub const DEFAULT_MAX_ENTRIES: usize = 500;

/// One selected phrase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub text: String,
    /// Time of day, `HH:MM:SS`
    pub timestamp: String,
}

/// Ordered, bounded history of selected phrases
#[derive(Debug)]
pub struct ChatHistory {
    entries: RwLock<VecDeque<ChatEntry>>,
    max_entries: usize,
}

impl ChatHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Entries newest first
    pub fn entries(&self) -> Vec<ChatEntry> {
        self.entries.read().iter().rev().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Newest-first transcript, one `HH:MM:SS:\t<text>` line per entry
    pub fn render(&self) -> String {
        self.entries
            .read()
            .iter()
            .rev()
            .map(|entry| format!("{}:\t{}\n", entry.timestamp, entry.text))
            .collect()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl Default for ChatHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl SelectionSink for ChatHistory {
    fn append(&self, text: String, timestamp: String) -> Result<(), SinkError> {
        debug!("Chat updated: {}", text);
        let mut entries = self.entries.write();
        entries.push_back(ChatEntry { text, timestamp });
        while entries.len() > self.max_entries {
            entries.pop_front();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newest_first() {
        let history = ChatHistory::default();
        history.append("Yes".into(), "10:00:00".into()).unwrap();
        history.append("No".into(), "10:00:05".into()).unwrap();

        let entries = history.entries();
        assert_eq!(entries[0].text, "No");
        assert_eq!(entries[1].text, "Yes");
        assert_eq!(history.render(), "10:00:05:\tNo\n10:00:00:\tYes\n");
    }

    #[test]
    fn test_bounded() {
        let history = ChatHistory::new(2);
        for i in 0..5 {
            history.append(format!("m{}", i), "00:00:00".into()).unwrap();
        }

        let texts: Vec<_> = history.entries().into_iter().map(|e| e.text).collect();
        assert_eq!(texts, vec!["m4", "m3"]);
    }
}
