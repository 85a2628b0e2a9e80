//! In-memory candidate store.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use scout_core::{CandidateFilter, CandidateRecord, CandidateStore, Error, Result};

use crate::filter::CompiledFilter;

/// Thread-safe candidate store holding records in insertion order.
///
/// Records are keyed for upsert by `(name, phone)`, the identity a parsed
/// resume carries before it has an id.
#[derive(Debug, Default)]
pub struct MemoryCandidateStore {
    records: RwLock<Vec<CandidateRecord>>,
}

impl MemoryCandidateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = CandidateRecord>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().collect()),
        }
    }

    /// Insert or replace a record. Returns `true` when a record was replaced.
    ///
    /// A replaced record keeps its position and its id unless the incoming
    /// record carries one.
    pub async fn upsert(&self, mut record: CandidateRecord) -> Result<bool> {
        if record.name.as_deref().map_or(true, |n| n.trim().is_empty()) {
            return Err(Error::InvalidInput("candidate record has no name".into()));
        }

        let mut records = self.records.write().await;
        let existing = records
            .iter_mut()
            .find(|r| r.name == record.name && r.phone == record.phone);

        match existing {
            Some(slot) => {
                if record.id.is_empty() {
                    record.id = slot.id.clone();
                }
                debug!(candidate_id = %record.id, "Replaced candidate record");
                *slot = record;
                Ok(true)
            }
            None => {
                if record.id.is_empty() {
                    record.id = format!("cand-{:06}", records.len() + 1);
                }
                info!(candidate_id = %record.id, "Inserted candidate record");
                records.push(record);
                Ok(false)
            }
        }
    }

    pub async fn find_by_phone(&self, phone: &str) -> Option<CandidateRecord> {
        let phone = phone.trim();
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.phone.as_deref().map(str::trim) == Some(phone))
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl CandidateStore for MemoryCandidateStore {
    async fn find(
        &self,
        filter: &CandidateFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CandidateRecord>> {
        let compiled = CompiledFilter::compile(filter)?;
        let records = self.records.read().await;
        let found: Vec<CandidateRecord> = records
            .iter()
            .filter(|r| compiled.matches(r))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        debug!(
            clause_count = filter.len(),
            offset,
            pool_size = found.len(),
            "Candidate query executed"
        );
        Ok(found)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<CandidateRecord>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }
}
