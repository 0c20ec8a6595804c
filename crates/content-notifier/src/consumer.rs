//! 生命周期事件消费者
//!
//! 从异步输入中逐行读取 JSON 格式的 `EntityEvent`，写入实体快照后交给监听器处理。
//! 单条事件处理失败只记录错误，不会中断消费。

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::watch;
use tracing::{error, info, warn};

use notify_shared::events::EntityEvent;

use crate::error::NotifierError;
use crate::listener::ContentNotifier;
use crate::repository::EntityStore;

/// 消费统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumeStats {
    pub processed: usize,
    pub failed: usize,
}

/// 事件消费者
pub struct EventConsumer {
    notifier: Arc<ContentNotifier>,
    entities: Arc<dyn EntityStore>,
}

impl EventConsumer {
    pub fn new(notifier: Arc<ContentNotifier>, entities: Arc<dyn EntityStore>) -> Self {
        Self { notifier, entities }
    }

    /// 启动消费循环，直到输入结束或收到 shutdown 信号
    pub async fn run<R>(
        &self,
        reader: R,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<ConsumeStats, NotifierError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut stats = ConsumeStats::default();

        info!("事件消费者已启动");

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() {
                        warn!("关闭信号发送端已释放，事件消费者退出");
                        break;
                    }
                    if *shutdown.borrow() {
                        info!("收到关闭信号，事件消费者退出");
                        break;
                    }
                }

                line = lines.next_line() => {
                    let Some(line) = line? else {
                        info!("事件输入已结束");
                        break;
                    };

                    if line.trim().is_empty() {
                        continue;
                    }

                    match self.handle_line(&line).await {
                        Ok(()) => stats.processed += 1,
                        Err(e) => {
                            stats.failed += 1;
                            error!(error = %e, "处理生命周期事件失败");
                        }
                    }
                }
            }
        }

        info!(
            processed = stats.processed,
            failed = stats.failed,
            "事件消费者已停止"
        );
        Ok(stats)
    }

    /// 处理单行事件
    pub async fn handle_line(&self, line: &str) -> Result<(), NotifierError> {
        let event: EntityEvent = serde_json::from_str(line)
            .map_err(|e| NotifierError::DeserializationFailed(e.to_string()))?;
        self.handle_event(&event).await
    }

    /// 按事件类型路由到监听器
    pub async fn handle_event(&self, event: &EntityEvent) -> Result<(), NotifierError> {
        info!(event = event.kind(), "收到生命周期事件");

        match event {
            EntityEvent::ContentCreated { entity } => {
                self.entities.save_content(entity).await?;
                self.notifier.on_entity_created(entity).await?;
            }
            EntityEvent::ContentUpdated { entity } => {
                self.entities.save_content(entity).await?;
                self.notifier.on_entity_updated(entity).await?;
            }
            EntityEvent::CommentCreated { comment } => {
                self.notifier.on_comment_created(comment).await?;
            }
            EntityEvent::CommentUpdated { comment } => {
                self.notifier.on_comment_updated(comment).await?;
            }
        }

        Ok(())
    }
}
