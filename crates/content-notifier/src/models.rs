//! 领域模型定义
//!
//! 通知记录、分类动作以及投递时使用的订阅目标。

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use notify_shared::events::{
    Comment, ContentEntity, EntityId, NotificationChannel, RevisionId, TemplateKind, UserId,
};

/// 通知记录的来源引用
///
/// 记录既可能来自内容实体，也可能来自评论；
/// 存储按来源类型对应的引用字段查询。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceRef {
    Content(EntityId),
    Comment(EntityId),
}

impl SourceRef {
    pub const CONTENT_FIELD: &'static str = "content_reference";
    pub const COMMENT_FIELD: &'static str = "comment_reference";

    /// 来源类型对应的引用字段名
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Content(_) => Self::CONTENT_FIELD,
            Self::Comment(_) => Self::COMMENT_FIELD,
        }
    }

    pub fn entity_id(&self) -> EntityId {
        match self {
            Self::Content(id) | Self::Comment(id) => *id,
        }
    }
}

/// 修订对，用于生成修订差异
///
/// `original` 为空表示新建内容，此时没有可比较的旧修订。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionPair {
    pub original: Option<RevisionId>,
    pub new: RevisionId,
}

impl RevisionPair {
    pub fn created(new: RevisionId) -> Self {
        Self {
            original: None,
            new,
        }
    }

    pub fn changed(original: RevisionId, new: RevisionId) -> Self {
        Self {
            original: Some(original),
            new,
        }
    }

    pub fn is_create(&self) -> bool {
        self.original.is_none()
    }

    /// 是否产生了新的修订版本
    pub fn is_new_revision(&self) -> bool {
        self.original.is_some_and(|original| original != self.new)
    }
}

/// 分类器输出的通知动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub template: TemplateKind,
    pub source: SourceRef,
    /// 内容所有者（评论通知同样指向被评论内容的所有者，而非评论作者）
    pub owner_id: UserId,
    pub published: bool,
    pub revisions: Option<RevisionPair>,
}

/// 通知记录
///
/// 每个符合条件的事件只创建一条；之后仅由状态同步修改 `published`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: Uuid,
    pub template: TemplateKind,
    pub source: SourceRef,
    pub owner_id: UserId,
    /// 与来源实体当前的发布状态保持一致
    pub published: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revisions: Option<RevisionPair>,
    pub created_at: DateTime<Utc>,
}

impl NotificationRecord {
    pub fn from_action(action: &Action) -> Self {
        Self {
            id: Uuid::now_v7(),
            template: action.template,
            source: action.source,
            owner_id: action.owner_id,
            published: action.published,
            revisions: action.revisions,
            created_at: Utc::now(),
        }
    }
}

/// 单个收件人的订阅目标，仅在分发时临时构造
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionTarget {
    pub uid: UserId,
    pub channels: Vec<NotificationChannel>,
    /// 为 true 时，若收件人恰为记录所有者则不投递
    pub suppress_self: bool,
}

impl SubscriptionTarget {
    /// 只走邮件渠道、且不做自我通知抑制的目标
    pub fn email_only(uid: UserId) -> Self {
        Self {
            uid,
            channels: vec![NotificationChannel::Email],
            suppress_self: false,
        }
    }

    pub fn wants(&self, channel: NotificationChannel) -> bool {
        self.channels.contains(&channel)
    }
}

/// 订阅选项：显式指定收件人，覆盖投递服务默认的收件人计算
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscribeOptions {
    pub uids: BTreeMap<UserId, SubscriptionTarget>,
}

impl SubscribeOptions {
    pub fn single(target: SubscriptionTarget) -> Self {
        let mut uids = BTreeMap::new();
        uids.insert(target.uid, target);
        Self { uids }
    }
}

/// 投递附加选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyOptions {
    /// 为 false 时只发送纯文本正文
    pub render_html: bool,
}

impl Default for NotifyOptions {
    fn default() -> Self {
        Self { render_html: true }
    }
}

/// 可同步发布状态的来源实体
pub trait Publishable {
    fn source_ref(&self) -> SourceRef;

    fn is_published(&self) -> bool;

    /// 变更前的发布状态，不存在旧快照时为 None
    fn previous_published(&self) -> Option<bool>;
}

impl Publishable for ContentEntity {
    fn source_ref(&self) -> SourceRef {
        SourceRef::Content(self.id)
    }

    fn is_published(&self) -> bool {
        self.published
    }

    fn previous_published(&self) -> Option<bool> {
        self.original.as_ref().map(|o| o.published)
    }
}

impl Publishable for Comment {
    fn source_ref(&self) -> SourceRef {
        SourceRef::Comment(self.id)
    }

    fn is_published(&self) -> bool {
        self.published
    }

    fn previous_published(&self) -> Option<bool> {
        self.original.as_ref().map(|o| o.published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify_shared::test_utils::{ContentBuilder, comment};

    #[test]
    fn test_source_ref_field_names() {
        assert_eq!(SourceRef::Content(1).field_name(), "content_reference");
        assert_eq!(SourceRef::Comment(1).field_name(), "comment_reference");
        assert_eq!(SourceRef::Comment(7).entity_id(), 7);
    }

    #[test]
    fn test_revision_pair() {
        let created = RevisionPair::created(5);
        assert!(created.is_create());
        assert!(!created.is_new_revision());

        assert!(RevisionPair::changed(4, 5).is_new_revision());
        assert!(!RevisionPair::changed(5, 5).is_new_revision());
    }

    #[test]
    fn test_record_from_action() {
        let action = Action {
            template: TemplateKind::UpdateContent,
            source: SourceRef::Content(42),
            owner_id: 9,
            published: true,
            revisions: Some(RevisionPair::changed(1, 2)),
        };

        let record = NotificationRecord::from_action(&action);
        assert_eq!(record.template, TemplateKind::UpdateContent);
        assert_eq!(record.source, SourceRef::Content(42));
        assert_eq!(record.owner_id, 9);
        assert!(record.published);
        assert_eq!(record.revisions, Some(RevisionPair::changed(1, 2)));
    }

    #[test]
    fn test_record_serialization_omits_missing_revisions() {
        let action = Action {
            template: TemplateKind::CreateComment,
            source: SourceRef::Comment(3),
            owner_id: 9,
            published: true,
            revisions: None,
        };
        let record = NotificationRecord::from_action(&action);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["source"]["type"], "COMMENT");
        assert_eq!(json["source"]["id"], 3);
        assert!(json.get("revisions").is_none());
    }

    #[test]
    fn test_publishable_previous_state() {
        let inserted = ContentBuilder::new(1).build();
        assert_eq!(inserted.previous_published(), None);

        let updated = ContentBuilder::new(1)
            .published(false)
            .updated(|b| b.published(true))
            .build();
        assert_eq!(updated.previous_published(), Some(false));
        assert!(updated.is_published());

        let c = comment(3, 1, 8);
        assert_eq!(c.source_ref(), SourceRef::Comment(3));
        assert_eq!(c.previous_published(), None);
    }

    #[test]
    fn test_subscribe_options_single() {
        let options = SubscribeOptions::single(SubscriptionTarget::email_only(5));
        assert_eq!(options.uids.len(), 1);

        let target = &options.uids[&5];
        assert!(target.wants(NotificationChannel::Email));
        assert!(!target.suppress_self);
    }
}
