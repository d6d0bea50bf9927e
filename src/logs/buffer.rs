/*!
 * Log Buffer
 * Per-unit bounded log sequences with concurrent append and snapshot reads
 *
 * Each unit owns its own lock, so a noisy unit never contends with the
 * log traffic of unrelated units. Sequences are bounded: once `capacity`
 * entries are held, the oldest entry is evicted for every new one.
 */

use super::types::{LogEntry, LogLevel};
use crate::core::limits::MAX_LOG_LINE_BYTES;
use crate::core::UnitId;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug)]
struct LogSequence {
    entries: VecDeque<LogEntry>,
    evicted: u64,
}

/// Concurrent store of log sequences keyed by unit id
#[derive(Debug, Clone)]
pub struct LogBuffer {
    sequences: Arc<DashMap<UnitId, Arc<Mutex<LogSequence>>>>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            sequences: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Create an empty sequence for `id`; existing sequences are kept
    pub fn register(&self, id: &UnitId) {
        self.sequences.entry(id.clone()).or_insert_with(|| {
            Arc::new(Mutex::new(LogSequence {
                entries: VecDeque::with_capacity(self.capacity.min(64)),
                evicted: 0,
            }))
        });
    }

    /// Append an entry stamped with the current time
    ///
    /// Returns false when `id` has no sequence (never registered or already
    /// discarded); the entry is dropped rather than resurrecting the unit.
    pub fn append(&self, id: &UnitId, level: LogLevel, text: impl Into<String>) -> bool {
        let Some(sequence) = self.sequence(id) else {
            return false;
        };

        let mut text = text.into();
        truncate_line(&mut text);

        let mut seq = sequence.lock();
        // Stamp under the lock so timestamps follow sequence order
        let entry = LogEntry::new(level, text);
        if seq.entries.len() >= self.capacity {
            seq.entries.pop_front();
            seq.evicted += 1;
        }
        seq.entries.push_back(entry);
        true
    }

    /// Copy of the entries held at call time; empty for unknown ids
    pub fn snapshot(&self, id: &UnitId) -> Vec<LogEntry> {
        self.sequence(id)
            .map(|sequence| sequence.lock().entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot rendered as flat `[LEVEL] text` strings
    pub fn formatted(&self, id: &UnitId) -> Vec<String> {
        self.sequence(id)
            .map(|sequence| {
                sequence
                    .lock()
                    .entries
                    .iter()
                    .map(LogEntry::formatted)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of entries dropped from the front of `id`'s sequence
    pub fn evicted(&self, id: &UnitId) -> u64 {
        self.sequence(id).map(|s| s.lock().evicted).unwrap_or(0)
    }

    /// Discard the sequence for `id`
    pub fn discard(&self, id: &UnitId) -> bool {
        self.sequences.remove(id).is_some()
    }

    pub fn contains(&self, id: &UnitId) -> bool {
        self.sequences.contains_key(id)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn sequence(&self, id: &UnitId) -> Option<Arc<Mutex<LogSequence>>> {
        // Clone the Arc so the shard lock is released before locking the sequence
        self.sequences.get(id).map(|entry| Arc::clone(entry.value()))
    }
}

/// Cut a line to the storage limit on a char boundary
fn truncate_line(text: &mut String) {
    if text.len() <= MAX_LOG_LINE_BYTES {
        return;
    }
    let mut cut = MAX_LOG_LINE_BYTES;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
    text.push('…');
}
