//! 实体生命周期监听
//!
//! 宿主在实体新建/更新、评论新建/更新时调用对应方法，
//! 监听器依次执行分类、状态同步与扇出。

use tracing::{debug, instrument};

use notify_shared::error::Result;
use notify_shared::events::{Comment, ContentEntity};
use notify_shared::observability::metrics;

use crate::classifier::{ChangeClassifier, Decision, Transition};
use crate::dispatcher::{DispatchReport, FanoutDispatcher};
use crate::synchronizer::StatusSynchronizer;

/// 内容通知监听器
pub struct ContentNotifier {
    classifier: ChangeClassifier,
    dispatcher: FanoutDispatcher,
    synchronizer: StatusSynchronizer,
}

impl ContentNotifier {
    pub fn new(
        classifier: ChangeClassifier,
        dispatcher: FanoutDispatcher,
        synchronizer: StatusSynchronizer,
    ) -> Self {
        Self {
            classifier,
            dispatcher,
            synchronizer,
        }
    }

    /// 内容实体新建
    #[instrument(skip_all, fields(entity_id = entity.id, bundle = %entity.bundle))]
    pub async fn on_entity_created(&self, entity: &ContentEntity) -> Result<Option<DispatchReport>> {
        let decision = self.classifier.classify_content(entity, Transition::Insert);
        self.dispatch(decision, entity).await
    }

    /// 内容实体更新
    ///
    /// 通过默认修订检查的更新先同步已有记录的发布状态，再视分类结果扇出。
    #[instrument(skip_all, fields(entity_id = entity.id, bundle = %entity.bundle))]
    pub async fn on_entity_updated(&self, entity: &ContentEntity) -> Result<Option<DispatchReport>> {
        let decision = self.classifier.classify_content(entity, Transition::Update);

        if decision.requires_status_sync() {
            self.synchronizer.sync_status(entity).await?;
        }

        self.dispatch(decision, entity).await
    }

    /// 评论新建，以被评论的内容作为投递上下文
    #[instrument(skip_all, fields(comment_id = comment.id, entity_id = comment.entity_id))]
    pub async fn on_comment_created(&self, comment: &Comment) -> Result<Option<DispatchReport>> {
        let (decision, parent) = self.classifier.classify_comment(comment).await?;
        self.dispatch(decision, &parent).await
    }

    /// 评论更新：同步评论来源记录的发布状态
    #[instrument(skip_all, fields(comment_id = comment.id))]
    pub async fn on_comment_updated(&self, comment: &Comment) -> Result<usize> {
        self.synchronizer.sync_status(comment).await
    }

    async fn dispatch(
        &self,
        decision: Decision,
        context: &ContentEntity,
    ) -> Result<Option<DispatchReport>> {
        match decision {
            Decision::Notify(action) => {
                let report = self.dispatcher.dispatch(&action, context).await?;
                Ok(Some(report))
            }
            Decision::SyncOnly => {
                debug!("内容未发布，仅同步状态");
                Ok(None)
            }
            Decision::Skip(reason) => {
                debug!(reason = reason.as_str(), "事件无需通知");
                metrics::record_skipped(reason.as_str());
                Ok(None)
            }
        }
    }
}
