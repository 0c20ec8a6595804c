//! 外部协作方 Trait 定义
//!
//! 配置、实体存储、通知记录存储与用户目录均由宿主系统提供，
//! 服务层只依赖这些抽象，便于替换实现与 mock 测试。

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use notify_shared::error::Result;
use notify_shared::events::{ContentEntity, EntityId, UserId};

use crate::models::NotificationRecord;

/// 分类器读取的全局跳过开关
pub const SKIP_PROCESSING_KEY: &str = "skip_processing";

/// 配置提供者
#[cfg_attr(test, mockall::automock)]
pub trait ConfigProvider: Send + Sync {
    /// 读取配置项，不存在时返回 None
    fn get(&self, key: &str) -> Result<Option<Value>>;
}

/// 实体存储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn load_content(&self, id: EntityId) -> Result<Option<ContentEntity>>;
    async fn save_content(&self, entity: &ContentEntity) -> Result<()>;
}

/// 通知记录存储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRecordStore: Send + Sync {
    async fn create(&self, record: &NotificationRecord) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<NotificationRecord>>;
    /// 按引用字段与来源实体 ID 查询记录
    async fn find_by_source(&self, field: &str, entity_id: EntityId)
    -> Result<Vec<NotificationRecord>>;
    async fn save(&self, record: &NotificationRecord) -> Result<()>;
}

/// 用户目录接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// 所有处于激活状态的用户
    async fn active_user_ids(&self) -> Result<Vec<UserId>>;
    async fn email_address(&self, uid: UserId) -> Result<Option<String>>;
}
