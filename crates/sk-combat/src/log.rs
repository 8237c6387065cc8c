use std::collections::VecDeque;

use tracing::debug;

/// Bounded combat message log, newest first.
///
/// When full, adding a message evicts the oldest one. Every line is also
/// emitted as a `debug` tracing event.
#[derive(Debug, Clone)]
pub struct CombatLog {
    messages: VecDeque<String>,
    capacity: usize,
    added: u64,
}

impl Default for CombatLog {
    fn default() -> Self {
        Self::new(20)
    }
}

impl CombatLog {
    /// Create an empty log holding at most `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
            added: 0,
        }
    }

    /// Prepend a message, evicting the oldest when over capacity.
    pub fn add_message(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!(target: "combat_log", "{message}");
        self.added += 1;
        if self.capacity == 0 {
            return;
        }
        self.messages.push_front(message);
        self.messages.truncate(self.capacity);
    }

    /// Up to `count` messages, newest first.
    pub fn recent(&self, count: usize) -> Vec<&str> {
        self.messages
            .iter()
            .take(count)
            .map(String::as_str)
            .collect()
    }

    /// All messages, newest first.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(String::as_str)
    }

    /// The most recent message.
    pub fn latest(&self) -> Option<&str> {
        self.messages.front().map(String::as_str)
    }

    /// Messages ever added, evicted and cleared ones included.
    ///
    /// Lets a reader that remembers the previous value fetch only the lines
    /// added since.
    pub fn total_added(&self) -> u64 {
        self.added
    }

    /// Stored lines added after [`total_added`](CombatLog::total_added)
    /// returned `mark`, oldest first.
    pub fn since(&self, mark: u64) -> Vec<&str> {
        let fresh = self.added.saturating_sub(mark);
        let fresh =
            usize::try_from(fresh).map_or(self.messages.len(), |n| n.min(self.messages.len()));
        let mut lines = self.recent(fresh);
        lines.reverse();
        lines
    }

    /// Remove every message.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Number of stored messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Maximum number of stored messages.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
