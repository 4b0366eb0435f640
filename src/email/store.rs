use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::storage::StoreError;

use super::types::{LogFilter, SendRecord, SendStatus, StatusCounts};

/// Storage for send records.
///
/// The `mark_*` methods apply a status transition only when the record is in
/// one of the allowed source states and report whether it was applied.
#[async_trait]
pub trait SendRecordRepository: Send + Sync {
    async fn insert(&self, record: &SendRecord) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<SendRecord>, StoreError>;

    /// One page of a user's records, newest first, plus the filtered total
    async fn list(
        &self,
        user_id: &str,
        filter: &LogFilter,
        offset: u64,
        limit: u32,
    ) -> Result<(Vec<SendRecord>, u64), StoreError>;

    async fn status_counts(&self, user_id: &str) -> Result<StatusCounts, StoreError>;

    async fn mark_pending(&self, id: Uuid, attempts: u32) -> Result<bool, StoreError>;

    async fn mark_sent(
        &self,
        id: Uuid,
        external_id: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    async fn mark_failed(&self, id: Uuid, error: &str, attempts: u32) -> Result<bool, StoreError>;

    fn backend_name(&self) -> &'static str;
}

#[derive(Default)]
pub struct MemorySendRecordRepository {
    records: DashMap<Uuid, SendRecord>,
}

impl MemorySendRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn transition(
        &self,
        id: Uuid,
        next: SendStatus,
        apply: impl FnOnce(&mut SendRecord),
    ) -> bool {
        match self.records.get_mut(&id) {
            Some(mut record) if record.status.can_transition_to(next) => {
                record.status = next;
                record.updated_at = Utc::now();
                apply(&mut record);
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl SendRecordRepository for MemorySendRecordRepository {
    async fn insert(&self, record: &SendRecord) -> Result<(), StoreError> {
        match self.records.entry(record.id) {
            dashmap::Entry::Occupied(_) => Err(StoreError::Conflict(record.id.to_string())),
            dashmap::Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<SendRecord>, StoreError> {
        Ok(self.records.get(&id).map(|r| r.clone()))
    }

    async fn list(
        &self,
        user_id: &str,
        filter: &LogFilter,
        offset: u64,
        limit: u32,
    ) -> Result<(Vec<SendRecord>, u64), StoreError> {
        let mut records: Vec<SendRecord> = self
            .records
            .iter()
            .filter(|entry| entry.user_id == user_id && filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = records.len() as u64;

        let page = records
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();

        Ok((page, total))
    }

    async fn status_counts(&self, user_id: &str) -> Result<StatusCounts, StoreError> {
        let mut counts = StatusCounts::default();
        for entry in self.records.iter().filter(|e| e.user_id == user_id) {
            counts.add(entry.status, 1);
        }
        Ok(counts)
    }

    async fn mark_pending(&self, id: Uuid, attempts: u32) -> Result<bool, StoreError> {
        Ok(self.transition(id, SendStatus::Pending, |record| {
            record.attempts = attempts;
        }))
    }

    async fn mark_sent(
        &self,
        id: Uuid,
        external_id: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        Ok(self.transition(id, SendStatus::Sent, |record| {
            record.external_id = Some(external_id.to_string());
            record.sent_at = Some(sent_at);
            record.error_message = None;
        }))
    }

    async fn mark_failed(&self, id: Uuid, error: &str, attempts: u32) -> Result<bool, StoreError> {
        Ok(self.transition(id, SendStatus::Failed, |record| {
            record.error_message = Some(error.to_string());
            record.attempts = attempts;
        }))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::Variables;

    fn record(user_id: &str, template_id: &str) -> SendRecord {
        let now = Utc::now();
        SendRecord {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            template_id: template_id.to_string(),
            api_key_id: None,
            recipient_email: "ana@example.com".to_string(),
            from_email: "noreply@edunotifysim.com".to_string(),
            reply_to_email: None,
            subject: "[SIMULATION] Hi".to_string(),
            html_body: "<p>Hi</p>".to_string(),
            text_body: None,
            variables: Variables::new(),
            status: SendStatus::Queued,
            external_id: None,
            error_message: None,
            attempts: 0,
            created_at: now,
            updated_at: now,
            sent_at: None,
        }
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let repo = MemorySendRecordRepository::new();
        let rec = record("alice", "t1");
        repo.insert(&rec).await.unwrap();

        assert!(!repo.mark_sent(rec.id, "msg-1", Utc::now()).await.unwrap());
        assert!(repo.mark_pending(rec.id, 1).await.unwrap());
        assert!(repo.mark_sent(rec.id, "msg-1", Utc::now()).await.unwrap());
        assert!(!repo.mark_failed(rec.id, "late", 2).await.unwrap());

        let stored = repo.get(rec.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SendStatus::Sent);
        assert_eq!(stored.external_id.as_deref(), Some("msg-1"));
        assert!(stored.sent_at.is_some());
        assert_eq!(stored.attempts, 1);
    }

    #[tokio::test]
    async fn test_list_pagination_and_filter() {
        let repo = MemorySendRecordRepository::new();
        for i in 0..5 {
            let mut rec = record("alice", if i % 2 == 0 { "even" } else { "odd" });
            rec.created_at = Utc::now() + chrono::Duration::seconds(i);
            repo.insert(&rec).await.unwrap();
        }
        repo.insert(&record("bob", "even")).await.unwrap();

        let (page, total) = repo.list("alice", &LogFilter::default(), 0, 2).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
        assert!(page[0].created_at >= page[1].created_at);

        let filter = LogFilter {
            template_id: Some("even".to_string()),
            ..Default::default()
        };
        let (page, total) = repo.list("alice", &filter, 0, 10).await.unwrap();
        assert_eq!(total, 3);
        assert!(page.iter().all(|r| r.template_id == "even"));
    }

    #[tokio::test]
    async fn test_status_counts() {
        let repo = MemorySendRecordRepository::new();
        let a = record("alice", "t1");
        let b = record("alice", "t1");
        repo.insert(&a).await.unwrap();
        repo.insert(&b).await.unwrap();
        repo.mark_pending(b.id, 1).await.unwrap();
        repo.mark_failed(b.id, "boom", 3).await.unwrap();

        let counts = repo.status_counts("alice").await.unwrap();
        assert_eq!(counts.queued, 1);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.total(), 2);
    }
}
