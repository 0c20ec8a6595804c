//! 内存存储
//!
//! 使用 DashMap 实现的内存仓储，适用于内置宿主和测试环境。

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use notify_shared::config::{DirectoryConfig, NotificationConfig};
use notify_shared::error::{NotifyError, Result};
use notify_shared::events::{ContentEntity, EntityId, UserId};
use serde_json::Value;

use super::traits::{ConfigProvider, EntityStore, NotificationRecordStore, UserDirectory};
use crate::models::{NotificationRecord, SourceRef};

impl ConfigProvider for NotificationConfig {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let value = serde_json::to_value(self)?;
        Ok(value.get(key).cloned())
    }
}

// ---------------------------------------------------------------------------
// 通知记录
// ---------------------------------------------------------------------------

/// 内存通知记录存储
///
/// 记录写入次数，便于验证状态同步的幂等性
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    records: Arc<DashMap<Uuid, NotificationRecord>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有记录，按创建顺序排列
    pub fn list(&self) -> Vec<NotificationRecord> {
        let mut records: Vec<_> = self.records.iter().map(|e| e.value().clone()).collect();
        // UUID v7 按时间有序
        records.sort_by_key(|r| r.id);
        records
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// 累计写入次数（创建与更新）
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationRecordStore for MemoryRecordStore {
    async fn create(&self, record: &NotificationRecord) -> Result<()> {
        if self.records.contains_key(&record.id) {
            return Err(NotifyError::Storage(format!(
                "notification record {} already exists",
                record.id
            )));
        }
        self.records.insert(record.id, record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<NotificationRecord>> {
        Ok(self.records.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_source(
        &self,
        field: &str,
        entity_id: EntityId,
    ) -> Result<Vec<NotificationRecord>> {
        let matches = |source: &SourceRef| {
            source.field_name() == field && source.entity_id() == entity_id
        };

        let mut records: Vec<_> = self
            .records
            .iter()
            .filter(|entry| matches(&entry.value().source))
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|r| r.id);
        Ok(records)
    }

    async fn save(&self, record: &NotificationRecord) -> Result<()> {
        match self.records.get_mut(&record.id) {
            Some(mut existing) => {
                *existing = record.clone();
                self.writes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            None => Err(NotifyError::not_found("notification_record", record.id)),
        }
    }
}

// ---------------------------------------------------------------------------
// 内容实体
// ---------------------------------------------------------------------------

/// 内存实体存储，只保留每个实体的最新快照
#[derive(Debug, Clone, Default)]
pub struct MemoryEntityStore {
    entities: Arc<DashMap<EntityId, ContentEntity>>,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    async fn load_content(&self, id: EntityId) -> Result<Option<ContentEntity>> {
        Ok(self.entities.get(&id).map(|e| e.value().clone()))
    }

    async fn save_content(&self, entity: &ContentEntity) -> Result<()> {
        // 旧快照只在事件内有意义，不随实体持久化
        let mut snapshot = entity.clone();
        snapshot.original = None;
        self.entities.insert(entity.id, snapshot);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// 用户目录
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct DirectoryEntry {
    email: Option<String>,
    active: bool,
}

/// 内存用户目录
#[derive(Debug, Clone, Default)]
pub struct MemoryUserDirectory {
    users: Arc<DashMap<UserId, DirectoryEntry>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &DirectoryConfig) -> Self {
        let directory = Self::new();
        for user in &config.users {
            directory.insert(user.id, user.email.clone(), user.active);
        }
        directory
    }

    pub fn insert(&self, uid: UserId, email: Option<String>, active: bool) {
        self.users.insert(uid, DirectoryEntry { email, active });
    }

    /// 添加一个激活用户，邮箱按 user{uid}@example.com 生成
    pub fn add_active(&self, uid: UserId) {
        self.insert(uid, Some(format!("user{uid}@example.com")), true);
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn active_user_ids(&self) -> Result<Vec<UserId>> {
        let mut ids: Vec<_> = self
            .users
            .iter()
            .filter(|entry| entry.value().active)
            .map(|entry| *entry.key())
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn email_address(&self, uid: UserId) -> Result<Option<String>> {
        Ok(self.users.get(&uid).and_then(|e| e.value().email.clone()))
    }
}
