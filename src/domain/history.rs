use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard},
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{profile::SourceBackend, search_filters::SearchFilters};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SearchOrigin {
    Http,
    Bot { chat_id: i64 },
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHistoryRecord {
    pub id: Uuid,
    pub searched_at: DateTime<Utc>,
    pub origin: SearchOrigin,
    pub backend: SourceBackend,
    pub query: String,
    pub filters: SearchFilters,
    pub result_count: usize,
    pub elapsed_ms: u64,
    pub profile_urls: Vec<String>,
}

/// Capped log of past searches. Appending past capacity evicts the oldest record.
pub struct SearchHistory {
    records: Mutex<VecDeque<SearchHistoryRecord>>,
    capacity: usize,
}

impl SearchHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        SearchHistory {
            records: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    fn records(&self) -> MutexGuard<'_, VecDeque<SearchHistoryRecord>> {
        // every mutation leaves the deque consistent, so poisoning is ignored
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn append(&self, record: SearchHistoryRecord) {
        let mut records = self.records();
        while records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Most recent first.
    pub fn recent(&self, limit: usize) -> Vec<SearchHistoryRecord> {
        self.records().iter().rev().take(limit).cloned().collect()
    }

    pub fn recent_for_chat(&self, chat_id: i64, limit: usize) -> Vec<SearchHistoryRecord> {
        self.records()
            .iter()
            .rev()
            .filter(|r| r.origin == SearchOrigin::Bot { chat_id })
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
