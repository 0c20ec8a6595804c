//! 测试工具模块
//!
//! 提供实体快照构建器，简化分类、分发与状态同步相关测试的数据准备。

use crate::config::NotificationConfig;
use crate::events::{Comment, ContentEntity, EntityId, RevisionId, UserId};

// ==================== 测试配置辅助 ====================

/// 创建跟踪指定内容类型的通知配置
pub fn tracked_config(bundles: &[&str]) -> NotificationConfig {
    NotificationConfig {
        tracked_bundles: bundles.iter().map(|b| b.to_string()).collect(),
        ..Default::default()
    }
}

// ==================== 实体构建器 ====================

/// 内容实体构建器
///
/// 默认构建一个已发布、默认修订、翻译受影响的 blog 内容
#[derive(Debug, Clone)]
pub struct ContentBuilder {
    entity: ContentEntity,
}

impl ContentBuilder {
    pub fn new(id: EntityId) -> Self {
        Self {
            entity: ContentEntity {
                id,
                bundle: "blog".to_string(),
                label: format!("Content {id}"),
                published: true,
                owner_id: 10,
                revision_id: 1,
                default_revision: true,
                translation_affected: true,
                original: None,
            },
        }
    }

    pub fn bundle(mut self, bundle: &str) -> Self {
        self.entity.bundle = bundle.to_string();
        self
    }

    pub fn label(mut self, label: &str) -> Self {
        self.entity.label = label.to_string();
        self
    }

    pub fn published(mut self, published: bool) -> Self {
        self.entity.published = published;
        self
    }

    pub fn owner(mut self, owner_id: UserId) -> Self {
        self.entity.owner_id = owner_id;
        self
    }

    pub fn revision(mut self, revision_id: RevisionId) -> Self {
        self.entity.revision_id = revision_id;
        self
    }

    pub fn default_revision(mut self, default_revision: bool) -> Self {
        self.entity.default_revision = default_revision;
        self
    }

    pub fn translation_affected(mut self, affected: bool) -> Self {
        self.entity.translation_affected = affected;
        self
    }

    /// 以当前状态为基础派生一个更新后的快照，原快照作为 `original`
    ///
    /// 闭包修改的是新快照
    pub fn updated(self, change: impl FnOnce(ContentBuilder) -> ContentBuilder) -> Self {
        let original = self.entity.clone();
        let mut next = change(self);
        next.entity.original = Some(Box::new(original));
        next
    }

    pub fn build(self) -> ContentEntity {
        self.entity
    }
}

/// 构建评论快照
pub fn comment(id: EntityId, entity_id: EntityId, author_id: UserId) -> Comment {
    Comment {
        id,
        entity_id,
        author_id,
        subject: format!("Comment {id}"),
        published: true,
        original: None,
    }
}
