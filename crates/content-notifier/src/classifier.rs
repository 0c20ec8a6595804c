//! 变更分类器
//!
//! 根据实体的生命周期变化（新建/更新、发布状态、修订版本）判断是否需要生成通知，
//! 以及使用哪种模板。分类本身不产生副作用，状态同步与分发由调用方执行。

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use notify_shared::error::{NotifyError, Result};
use notify_shared::events::{Comment, ContentEntity, TemplateKind};

use crate::models::{Action, RevisionPair, SourceRef};
use crate::repository::{ConfigProvider, EntityStore, SKIP_PROCESSING_KEY};

/// 生命周期阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Insert,
    Update,
}

/// 不生成通知的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// 内容类型不在跟踪范围内
    UntrackedBundle,
    /// 全局跳过开关已打开
    ProcessingDisabled,
    /// 新建时未发布
    NotPublished,
    /// 更新的不是默认修订版本
    NotDefaultRevision,
    /// 既没有产生新修订，也不是首次发布
    NoNewRevision,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UntrackedBundle => "untracked_bundle",
            Self::ProcessingDisabled => "processing_disabled",
            Self::NotPublished => "not_published",
            Self::NotDefaultRevision => "not_default_revision",
            Self::NoNewRevision => "no_new_revision",
        }
    }
}

/// 分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// 生成通知
    Notify(Action),
    /// 更新后处于未发布状态：只同步已有记录的发布状态
    SyncOnly,
    Skip(SkipReason),
}

impl Decision {
    pub fn action(&self) -> Option<&Action> {
        match self {
            Self::Notify(action) => Some(action),
            _ => None,
        }
    }

    /// 该结果是否要求同步已有记录的发布状态
    ///
    /// 通过默认修订检查的更新都可能改变发布状态。
    pub fn requires_status_sync(&self) -> bool {
        matches!(
            self,
            Self::Notify(_) | Self::SyncOnly | Self::Skip(SkipReason::NoNewRevision)
        )
    }
}

/// 变更分类器
pub struct ChangeClassifier {
    tracked_bundles: BTreeSet<String>,
    config: Arc<dyn ConfigProvider>,
    entities: Arc<dyn EntityStore>,
}

impl ChangeClassifier {
    pub fn new(
        tracked_bundles: impl IntoIterator<Item = String>,
        config: Arc<dyn ConfigProvider>,
        entities: Arc<dyn EntityStore>,
    ) -> Self {
        Self {
            tracked_bundles: tracked_bundles.into_iter().collect(),
            config,
            entities,
        }
    }

    pub fn is_tracked(&self, bundle: &str) -> bool {
        self.tracked_bundles.contains(bundle)
    }

    /// 读取全局跳过开关
    ///
    /// 读取失败或配置缺失均视为不跳过。
    fn processing_disabled(&self) -> bool {
        match self.config.get(SKIP_PROCESSING_KEY) {
            Ok(Some(Value::Bool(skip))) => skip,
            Ok(_) => false,
            Err(e) => {
                warn!(error = %e, key = SKIP_PROCESSING_KEY, "读取跳过开关失败，继续处理");
                false
            }
        }
    }

    /// 对内容实体的新建/更新进行分类
    pub fn classify_content(&self, entity: &ContentEntity, transition: Transition) -> Decision {
        if !self.is_tracked(&entity.bundle) {
            return Decision::Skip(SkipReason::UntrackedBundle);
        }

        if self.processing_disabled() {
            return Decision::Skip(SkipReason::ProcessingDisabled);
        }

        let decision = match transition {
            Transition::Insert => Self::classify_insert(entity),
            Transition::Update => Self::classify_update(entity),
        };

        debug!(
            entity_id = entity.id,
            bundle = %entity.bundle,
            ?transition,
            ?decision,
            "内容变更分类完成"
        );

        decision
    }

    fn classify_insert(entity: &ContentEntity) -> Decision {
        if !entity.published {
            return Decision::Skip(SkipReason::NotPublished);
        }

        // 新建内容没有旧修订，修订对标记为新建
        Decision::Notify(Action {
            template: TemplateKind::PublishContent,
            source: SourceRef::Content(entity.id),
            owner_id: entity.owner_id,
            published: true,
            revisions: Some(RevisionPair::created(entity.revision_id)),
        })
    }

    fn classify_update(entity: &ContentEntity) -> Decision {
        if !entity.default_revision {
            return Decision::Skip(SkipReason::NotDefaultRevision);
        }

        if !entity.published {
            return Decision::SyncOnly;
        }

        let original = entity.original_or_self();
        let template = if original.published {
            TemplateKind::UpdateContent
        } else {
            TemplateKind::PublishContent
        };

        // 翻译未受影响的编辑不算产生新修订
        let revisions = if entity.translation_affected {
            RevisionPair::changed(original.revision_id, entity.revision_id)
        } else {
            RevisionPair::changed(entity.revision_id, entity.revision_id)
        };

        if !revisions.is_new_revision() && template != TemplateKind::PublishContent {
            return Decision::Skip(SkipReason::NoNewRevision);
        }

        Decision::Notify(Action {
            template,
            source: SourceRef::Content(entity.id),
            owner_id: entity.owner_id,
            published: true,
            revisions: Some(revisions),
        })
    }

    /// 对新建评论进行分类
    ///
    /// 返回分类结果与被评论的内容实体（作为投递上下文）。
    /// 被评论内容不存在时直接返回错误。
    /// 全局跳过开关只作用于内容事件，评论不受其影响。
    pub async fn classify_comment(&self, comment: &Comment) -> Result<(Decision, ContentEntity)> {
        let parent = self
            .entities
            .load_content(comment.entity_id)
            .await?
            .ok_or_else(|| NotifyError::not_found("content", comment.entity_id))?;

        if !self.is_tracked(&parent.bundle) {
            return Ok((Decision::Skip(SkipReason::UntrackedBundle), parent));
        }

        let decision = Decision::Notify(Action {
            template: TemplateKind::CreateComment,
            source: SourceRef::Comment(comment.id),
            owner_id: parent.owner_id,
            published: comment.published,
            revisions: None,
        });

        debug!(
            comment_id = comment.id,
            entity_id = parent.id,
            ?decision,
            "评论分类完成"
        );

        Ok((decision, parent))
    }
}
