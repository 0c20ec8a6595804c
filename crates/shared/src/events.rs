//! 实体生命周期事件定义
//!
//! 宿主 CMS 在内容/评论的创建、更新时产生事件，通知服务据此决定是否生成通知。
//! 所有结构体使用 camelCase 序列化，与宿主系统的 JSON 约定保持一致。

use serde::{Deserialize, Serialize};

/// 内容实体 ID
pub type EntityId = u64;
/// 用户 ID
pub type UserId = u64;
/// 修订版本 ID
pub type RevisionId = u64;

fn default_true() -> bool {
    true
}

/// 内容实体快照
///
/// 由外部实体存储创建和修改，对通知服务只读。
/// `original` 为本次变更之前的快照，新建实体时为空。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentEntity {
    pub id: EntityId,
    /// 内容类型标签（如 blog、article）
    pub bundle: String,
    /// 标题，用于渲染通知正文
    #[serde(default)]
    pub label: String,
    pub published: bool,
    pub owner_id: UserId,
    pub revision_id: RevisionId,
    /// 是否为默认（当前生效的）修订版本
    #[serde(default = "default_true")]
    pub default_revision: bool,
    /// 本次编辑是否影响了当前翻译
    #[serde(default = "default_true")]
    pub translation_affected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<Box<ContentEntity>>,
}

impl ContentEntity {
    /// 变更前的快照，不存在时返回自身
    pub fn original_or_self(&self) -> &ContentEntity {
        self.original.as_deref().unwrap_or(self)
    }

    /// 附加变更前的快照
    pub fn with_original(mut self, original: ContentEntity) -> Self {
        self.original = Some(Box::new(original));
        self
    }

    /// 站内相对路径
    pub fn path(&self) -> String {
        format!("/node/{}", self.id)
    }
}

/// 评论快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: EntityId,
    /// 被评论的内容实体 ID
    pub entity_id: EntityId,
    pub author_id: UserId,
    #[serde(default)]
    pub subject: String,
    pub published: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<Box<Comment>>,
}

impl Comment {
    pub fn with_original(mut self, original: Comment) -> Self {
        self.original = Some(Box::new(original));
        self
    }

    pub fn path(&self) -> String {
        format!("/comment/{}", self.id)
    }
}

/// 通知模板类型
///
/// 决定通知记录使用的标题/正文模板
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateKind {
    CreateContent,
    PublishContent,
    UpdateContent,
    CreateComment,
}

impl TemplateKind {
    /// 指标与日志使用的稳定名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateContent => "create_content",
            Self::PublishContent => "publish_content",
            Self::UpdateContent => "update_content",
            Self::CreateComment => "create_comment",
        }
    }
}

/// 通知投递渠道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationChannel {
    Email,
}

/// 实体生命周期事件
///
/// 宿主系统在对应生命周期节点产生，按到达顺序逐条处理
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityEvent {
    ContentCreated { entity: ContentEntity },
    ContentUpdated { entity: ContentEntity },
    CommentCreated { comment: Comment },
    CommentUpdated { comment: Comment },
}

impl EntityEvent {
    /// 事件类型名称（用于日志）
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ContentCreated { .. } => "CONTENT_CREATED",
            Self::ContentUpdated { .. } => "CONTENT_UPDATED",
            Self::CommentCreated { .. } => "COMMENT_CREATED",
            Self::CommentUpdated { .. } => "COMMENT_UPDATED",
        }
    }
}
