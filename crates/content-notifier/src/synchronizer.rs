//! 发布状态同步
//!
//! 来源实体的发布状态变化后，将新状态写回所有引用它的通知记录，
//! 保证记录的 `published` 与来源实体一致（在每次来源更新时修正）。

use std::sync::Arc;

use tracing::{debug, info, instrument};

use notify_shared::error::Result;
use notify_shared::observability::metrics;

use crate::models::Publishable;
use crate::repository::NotificationRecordStore;

/// 状态同步器
pub struct StatusSynchronizer {
    records: Arc<dyn NotificationRecordStore>,
}

impl StatusSynchronizer {
    pub fn new(records: Arc<dyn NotificationRecordStore>) -> Self {
        Self { records }
    }

    /// 同步来源实体的发布状态，返回被更新的记录数
    ///
    /// 没有旧快照或发布状态未变化时不做任何读写。
    #[instrument(skip(self, entity), fields(source = ?entity.source_ref()))]
    pub async fn sync_status<E>(&self, entity: &E) -> Result<usize>
    where
        E: Publishable + Sync,
    {
        let published = entity.is_published();
        let Some(previous) = entity.previous_published() else {
            debug!("没有旧快照，跳过状态同步");
            return Ok(0);
        };

        if previous == published {
            return Ok(0);
        }

        let source = entity.source_ref();
        let records = self
            .records
            .find_by_source(source.field_name(), source.entity_id())
            .await?;

        let mut updated = 0;
        for mut record in records {
            // 只有状态确实不同的记录才需要写回
            if record.published == published {
                continue;
            }
            record.published = published;
            self.records.save(&record).await?;
            updated += 1;
        }

        if updated > 0 {
            info!(published, updated, "通知记录发布状态已同步");
            metrics::record_status_sync(updated);
        }

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Action, NotificationRecord, SourceRef};
    use crate::repository::MockNotificationRecordStore;
    use notify_shared::error::NotifyError;
    use notify_shared::events::TemplateKind;
    use notify_shared::test_utils::{ContentBuilder, comment};

    fn record(source: SourceRef, published: bool) -> NotificationRecord {
        NotificationRecord::from_action(&Action {
            template: TemplateKind::PublishContent,
            source,
            owner_id: 10,
            published,
            revisions: None,
        })
    }

    #[tokio::test]
    async fn test_no_original_is_noop() {
        let mut store = MockNotificationRecordStore::new();
        store.expect_find_by_source().never();
        store.expect_save().never();

        let sync = StatusSynchronizer::new(Arc::new(store));
        let entity = ContentBuilder::new(1).build();

        assert_eq!(sync.sync_status(&entity).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unchanged_state_is_noop() {
        let mut store = MockNotificationRecordStore::new();
        store.expect_find_by_source().never();
        store.expect_save().never();

        let sync = StatusSynchronizer::new(Arc::new(store));
        let entity = ContentBuilder::new(1)
            .published(false)
            .updated(|b| b.revision(2))
            .build();

        assert_eq!(sync.sync_status(&entity).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unpublish_updates_matching_records() {
        let mut store = MockNotificationRecordStore::new();
        store
            .expect_find_by_source()
            .withf(|field, id| field.to_string() == SourceRef::CONTENT_FIELD && *id == 42)
            .times(1)
            .returning(|_, _| {
                Ok(vec![
                    record(SourceRef::Content(42), true),
                    record(SourceRef::Content(42), true),
                ])
            });
        store
            .expect_save()
            .withf(|r| !r.published)
            .times(2)
            .returning(|_| Ok(()));

        let sync = StatusSynchronizer::new(Arc::new(store));
        let entity = ContentBuilder::new(42).updated(|b| b.published(false)).build();

        assert_eq!(sync.sync_status(&entity).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_comment_uses_comment_reference_field() {
        let mut store = MockNotificationRecordStore::new();
        store
            .expect_find_by_source()
            .withf(|field, id| field.to_string() == SourceRef::COMMENT_FIELD && *id == 3)
            .times(1)
            .returning(|_, _| Ok(vec![]));
        store.expect_save().never();

        let sync = StatusSynchronizer::new(Arc::new(store));
        let mut unpublished = comment(3, 42, 8);
        unpublished.published = false;
        let updated = unpublished.with_original(comment(3, 42, 8));

        assert_eq!(sync.sync_status(&updated).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_save_failure_propagates() {
        let mut store = MockNotificationRecordStore::new();
        store
            .expect_find_by_source()
            .returning(|_, _| Ok(vec![record(SourceRef::Content(42), false)]));
        store
            .expect_save()
            .returning(|_| Err(NotifyError::Storage("write failed".to_string())));

        let sync = StatusSynchronizer::new(Arc::new(store));
        let entity = ContentBuilder::new(42)
            .published(false)
            .updated(|b| b.published(true))
            .build();

        assert!(sync.sync_status(&entity).await.is_err());
    }
}
