use std::collections::VecDeque;

use serde::{Serialize, Serializer};

use super::job::JobLogEntry;

/// Fixed-capacity job log. Once full, the oldest line is dropped for each new one.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    entries: VecDeque<JobLogEntry>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    pub fn push(&mut self, entry: JobLogEntry) {
        // VecDeque::pop_front is O(1)
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &JobLogEntry> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&JobLogEntry> {
        self.entries.back()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Serialize for LogBuffer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_drops_oldest_when_full() {
        let mut buf = LogBuffer::new(3);
        for i in 0..5 {
            buf.push(JobLogEntry::info(format!("line {i}")));
        }
        assert_eq!(buf.len(), 3);
        let messages: Vec<_> = buf.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["line 2", "line 3", "line 4"]);
        assert_eq!(buf.last().unwrap().message, "line 4");
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let mut buf = LogBuffer::new(0);
        buf.push(JobLogEntry::info("a"));
        buf.push(JobLogEntry::info("b"));
        assert_eq!(buf.capacity(), 1);
        assert_eq!(buf.last().unwrap().message, "b");
    }

    #[test]
    fn test_serializes_as_array() {
        let mut buf = LogBuffer::new(2);
        buf.push(JobLogEntry::warn("careful"));
        let value = serde_json::to_value(&buf).unwrap();
        assert_eq!(value[0]["level"], "warn");
        assert_eq!(value[0]["message"], "careful");
    }
}
