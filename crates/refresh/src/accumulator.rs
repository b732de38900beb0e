use crate::RecordId;
use std::collections::BTreeMap;

/// Citee -> count dictionary built up during a pass and flushed once at its
/// end.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Accumulator {
    counts: BTreeMap<RecordId, u64>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, citee: RecordId, count: u64) {
        self.counts.insert(citee, count);
    }

    pub fn get(&self, citee: RecordId) -> Option<u64> {
        self.counts.get(&citee).copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn counts(&self) -> &BTreeMap<RecordId, u64> {
        &self.counts
    }
}

impl From<BTreeMap<RecordId, u64>> for Accumulator {
    fn from(counts: BTreeMap<RecordId, u64>) -> Self {
        Self { counts }
    }
}
