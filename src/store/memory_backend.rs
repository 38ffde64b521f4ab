//! In-memory store backends using DashMap.
//!
//! Records are lost on restart. Ids come from a per-store atomic counter
//! and are never reused, including after a soft delete.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::channel::Channel;
use crate::notification::{Notification, NotificationFilter, NotificationPatch, NotificationStatus};
use crate::template::Template;

use super::backend::{ChannelStore, NotificationStore, StoreError, StoreResult, TemplateStore};

/// In-memory notification store
pub struct MemoryNotificationStore {
    records: DashMap<i64, Notification>,
    next_id: AtomicI64,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    fn live(&self) -> Vec<Notification> {
        self.records
            .iter()
            .filter(|entry| !entry.is_deleted())
            .map(|entry| entry.value().clone())
            .collect()
    }
}

impl Default for MemoryNotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn create(&self, mut notification: Notification) -> StoreResult<Notification> {
        notification.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.records.insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn get(&self, id: i64) -> StoreResult<Option<Notification>> {
        Ok(self
            .records
            .get(&id)
            .filter(|n| !n.is_deleted())
            .map(|n| n.value().clone()))
    }

    async fn complete(
        &self,
        id: i64,
        status: NotificationStatus,
        sent_at: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Notification>> {
        match self.records.get_mut(&id) {
            Some(mut existing)
                if !existing.is_deleted() && existing.status == NotificationStatus::Pending =>
            {
                existing.status = status;
                existing.sent_at = sent_at;
                existing.updated_at = at;
                Ok(Some(existing.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn patch(
        &self,
        id: i64,
        patch: NotificationPatch,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Notification>> {
        match self.records.get_mut(&id) {
            Some(mut existing) if !existing.is_deleted() => {
                patch.apply(&mut existing, at);
                Ok(Some(existing.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn soft_delete(&self, id: i64, at: DateTime<Utc>) -> StoreResult<bool> {
        match self.records.get_mut(&id) {
            Some(mut existing) if !existing.is_deleted() => {
                existing.deleted_at = Some(at);
                existing.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn query(
        &self,
        filter: &NotificationFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<(Vec<Notification>, i64)> {
        let mut matched: Vec<Notification> = self
            .live()
            .into_iter()
            .filter(|n| filter.matches(n))
            .collect();
        matched.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = matched.len() as i64;
        let page = matched
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();

        Ok((page, total))
    }

    async fn due(&self, now: DateTime<Utc>) -> StoreResult<Vec<Notification>> {
        let mut due: Vec<Notification> = self
            .live()
            .into_iter()
            .filter(|n| {
                n.status == NotificationStatus::Scheduled
                    && n.scheduled_at.is_some_and(|at| at <= now)
            })
            .collect();
        due.sort_by(|a, b| a.scheduled_at.cmp(&b.scheduled_at).then_with(|| a.id.cmp(&b.id)));
        Ok(due)
    }

    async fn claim_scheduled(
        &self,
        id: i64,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Notification>> {
        match self.records.get_mut(&id) {
            Some(mut existing)
                if !existing.is_deleted() && existing.status == NotificationStatus::Scheduled =>
            {
                existing.status = NotificationStatus::Pending;
                existing.updated_at = at;
                Ok(Some(existing.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn requeue_stale(&self, cutoff: DateTime<Utc>, at: DateTime<Utc>) -> StoreResult<u64> {
        let mut requeued = 0;
        for mut record in self.records.iter_mut() {
            if !record.is_deleted()
                && record.status == NotificationStatus::Pending
                && record.scheduled_at.is_some()
                && record.updated_at < cutoff
            {
                record.status = NotificationStatus::Scheduled;
                record.updated_at = at;
                requeued += 1;
            }
        }
        Ok(requeued)
    }
}

/// In-memory template store
pub struct MemoryTemplateStore {
    records: DashMap<i64, Template>,
    /// Live template name -> id
    names: DashMap<String, i64>,
    next_id: AtomicI64,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            names: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for MemoryTemplateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TemplateStore for MemoryTemplateStore {
    async fn create(&self, mut template: Template) -> StoreResult<Template> {
        match self.names.entry(template.name.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "template name already exists: {}",
                template.name
            ))),
            Entry::Vacant(slot) => {
                template.id = self.next_id.fetch_add(1, Ordering::SeqCst);
                slot.insert(template.id);
                self.records.insert(template.id, template.clone());
                Ok(template)
            }
        }
    }

    async fn get(&self, id: i64) -> StoreResult<Option<Template>> {
        Ok(self
            .records
            .get(&id)
            .filter(|t| t.deleted_at.is_none())
            .map(|t| t.value().clone()))
    }

    async fn list(&self) -> StoreResult<Vec<Template>> {
        let mut templates: Vec<Template> = self
            .records
            .iter()
            .filter(|t| t.deleted_at.is_none())
            .map(|t| t.value().clone())
            .collect();
        templates.sort_by_key(|t| t.id);
        Ok(templates)
    }

    async fn update(&self, template: Template) -> StoreResult<Option<Template>> {
        let previous_name = match self.records.get(&template.id) {
            Some(existing) if existing.deleted_at.is_none() => existing.name.clone(),
            _ => return Ok(None),
        };

        if previous_name != template.name {
            match self.names.entry(template.name.clone()) {
                Entry::Occupied(_) => {
                    return Err(StoreError::Conflict(format!(
                        "template name already exists: {}",
                        template.name
                    )))
                }
                Entry::Vacant(slot) => {
                    slot.insert(template.id);
                }
            }
            self.names.remove(&previous_name);
        }

        self.records.insert(template.id, template.clone());
        Ok(Some(template))
    }

    async fn soft_delete(&self, id: i64, at: DateTime<Utc>) -> StoreResult<bool> {
        let name = match self.records.get_mut(&id) {
            Some(mut existing) if existing.deleted_at.is_none() => {
                existing.deleted_at = Some(at);
                existing.updated_at = at;
                existing.name.clone()
            }
            _ => return Ok(false),
        };

        self.names.remove(&name);
        Ok(true)
    }

    async fn count(&self) -> StoreResult<i64> {
        Ok(self.names.len() as i64)
    }
}

/// In-memory channel store
pub struct MemoryChannelStore {
    records: DashMap<i64, Channel>,
    names: DashMap<String, i64>,
    next_id: AtomicI64,
}

impl MemoryChannelStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            names: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for MemoryChannelStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelStore for MemoryChannelStore {
    async fn create(&self, mut channel: Channel) -> StoreResult<Channel> {
        match self.names.entry(channel.name.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "channel name already exists: {}",
                channel.name
            ))),
            Entry::Vacant(slot) => {
                channel.id = self.next_id.fetch_add(1, Ordering::SeqCst);
                slot.insert(channel.id);
                self.records.insert(channel.id, channel.clone());
                Ok(channel)
            }
        }
    }

    async fn list(&self) -> StoreResult<Vec<Channel>> {
        let mut channels: Vec<Channel> = self
            .records
            .iter()
            .filter(|c| c.deleted_at.is_none())
            .map(|c| c.value().clone())
            .collect();
        channels.sort_by_key(|c| c.id);
        Ok(channels)
    }

    async fn count(&self) -> StoreResult<i64> {
        Ok(self.names.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{Metadata, NotificationType};
    use crate::template::CreateTemplateRequest;
    use chrono::Duration;

    fn notification(status: NotificationStatus, created_at: DateTime<Utc>) -> Notification {
        Notification {
            id: 0,
            notification_type: NotificationType::InApp,
            status,
            title: "Title".to_string(),
            message: "Body".to_string(),
            recipient: "user-1".to_string(),
            channel: None,
            template_id: None,
            scheduled_at: (status == NotificationStatus::Scheduled).then_some(created_at),
            sent_at: None,
            metadata: Metadata::new(),
            created_at,
            updated_at: created_at,
            deleted_at: None,
        }
    }

    fn template(name: &str) -> Template {
        CreateTemplateRequest {
            name: name.to_string(),
            notification_type: NotificationType::Email,
            subject: None,
            content: "Hello {{.Name}}".to_string(),
            variables: None,
        }
        .into_template(Utc::now())
    }

    #[tokio::test]
    async fn test_ids_are_monotonic_and_not_reused() {
        let store = MemoryNotificationStore::new();
        let now = Utc::now();

        let first = store.create(notification(NotificationStatus::Pending, now)).await.unwrap();
        assert!(store.soft_delete(first.id, now).await.unwrap());
        let second = store.create(notification(NotificationStatus::Pending, now)).await.unwrap();

        assert!(second.id > first.id);
        assert!(store.get(first.id).await.unwrap().is_none());
        assert!(!store.soft_delete(first.id, now).await.unwrap());
    }

    #[tokio::test]
    async fn test_query_orders_newest_first_with_total() {
        let store = MemoryNotificationStore::new();
        let base = Utc::now();
        for i in 0..5 {
            store
                .create(notification(NotificationStatus::Pending, base + Duration::seconds(i)))
                .await
                .unwrap();
        }
        store
            .create(notification(NotificationStatus::Sent, base))
            .await
            .unwrap();

        let filter = NotificationFilter {
            status: Some(NotificationStatus::Pending),
            ..Default::default()
        };
        let (page, total) = store.query(&filter, 2, 1).await.unwrap();

        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].created_at, base + Duration::seconds(3));
        assert_eq!(page[1].created_at, base + Duration::seconds(2));
    }

    #[tokio::test]
    async fn test_due_and_claim() {
        let store = MemoryNotificationStore::new();
        let now = Utc::now();

        let due = store
            .create(notification(NotificationStatus::Scheduled, now - Duration::minutes(1)))
            .await
            .unwrap();
        store
            .create(notification(NotificationStatus::Scheduled, now + Duration::hours(1)))
            .await
            .unwrap();

        let found = store.due(now).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, due.id);

        let claimed = store.claim_scheduled(due.id, now).await.unwrap().unwrap();
        assert_eq!(claimed.status, NotificationStatus::Pending);
        assert!(store.claim_scheduled(due.id, now).await.unwrap().is_none());
        assert!(store.due(now).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_complete_only_touches_pending_outcome_fields() {
        let store = MemoryNotificationStore::new();
        let now = Utc::now();
        let record = store.create(notification(NotificationStatus::Pending, now)).await.unwrap();

        let patch = NotificationPatch {
            title: Some("Edited while sending".to_string()),
            ..Default::default()
        };
        store.patch(record.id, patch, now).await.unwrap().unwrap();

        let done = store
            .complete(record.id, NotificationStatus::Sent, Some(now), now)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(done.status, NotificationStatus::Sent);
        assert_eq!(done.sent_at, Some(now));
        assert_eq!(done.title, "Edited while sending");

        // Terminal records are never resolved again
        assert!(store
            .complete(record.id, NotificationStatus::Failed, None, now)
            .await
            .unwrap()
            .is_none());
        let stored = store.get(record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, NotificationStatus::Sent);
    }

    #[tokio::test]
    async fn test_requeue_stale_claims() {
        let store = MemoryNotificationStore::new();
        let now = Utc::now();
        let long_ago = now - Duration::hours(2);

        let stale = store
            .create(notification(NotificationStatus::Scheduled, long_ago))
            .await
            .unwrap();
        store.claim_scheduled(stale.id, long_ago).await.unwrap().unwrap();

        let fresh = store
            .create(notification(NotificationStatus::Scheduled, now))
            .await
            .unwrap();
        store.claim_scheduled(fresh.id, now).await.unwrap().unwrap();

        let requeued = store
            .requeue_stale(now - Duration::minutes(10), now)
            .await
            .unwrap();
        assert_eq!(requeued, 1);

        let found = store.due(now).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, stale.id);
        assert_eq!(
            store.get(fresh.id).await.unwrap().unwrap().status,
            NotificationStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_complete_skips_deleted() {
        let store = MemoryNotificationStore::new();
        let now = Utc::now();
        let record = store.create(notification(NotificationStatus::Pending, now)).await.unwrap();
        store.soft_delete(record.id, now).await.unwrap();

        assert!(store
            .complete(record.id, NotificationStatus::Sent, Some(now), now)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .patch(record.id, NotificationPatch::default(), now)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_template_names_are_unique() {
        let store = MemoryTemplateStore::new();

        let welcome = store.create(template("welcome_email")).await.unwrap();
        let reset = store.create(template("password_reset")).await.unwrap();
        assert!(matches!(
            store.create(template("welcome_email")).await,
            Err(StoreError::Conflict(_))
        ));

        let mut renamed = reset.clone();
        renamed.name = "welcome_email".to_string();
        assert!(matches!(
            store.update(renamed).await,
            Err(StoreError::Conflict(_))
        ));

        assert!(store.soft_delete(welcome.id, Utc::now()).await.unwrap());
        assert_eq!(store.count().await.unwrap(), 1);
        assert!(store.create(template("welcome_email")).await.is_ok());
    }

    #[tokio::test]
    async fn test_template_rename_releases_old_name() {
        let store = MemoryTemplateStore::new();
        let mut created = store.create(template("alpha")).await.unwrap();

        created.name = "beta".to_string();
        store.update(created).await.unwrap().unwrap();

        assert!(store.create(template("alpha")).await.is_ok());
        assert_eq!(store.list().await.unwrap().len(), 2);
    }
}
