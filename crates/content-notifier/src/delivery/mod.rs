//! 通知投递
//!
//! 定义投递服务 trait。分发器只依赖该抽象，
//! 具体渠道（当前为邮件）负责渲染与发送。
//!
//! ## 支持的渠道
//!
//! - **Email**: 模板渲染 → CSS 内联 → 绝对地址改写 → 邮件传输

mod email;
mod transport;

pub use email::EmailDelivery;
pub use transport::{LogTransport, MailMessage, MailTransport, MemoryTransport};

use async_trait::async_trait;

use notify_shared::error::Result;
use notify_shared::events::{ContentEntity, UserId};

use crate::models::{NotificationRecord, NotifyOptions, SubscribeOptions};

/// 单个收件人的投递状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    Sent,
    /// 收件人未订阅该渠道、被自我通知抑制或没有可用地址
    Skipped,
}

impl SendStatus {
    /// 指标中的投递结果标签
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Sent => "success",
            Self::Skipped => "skipped",
        }
    }
}

/// 投递失败时的指标标签
pub const FAILED_OUTCOME: &str = "failed";

/// 投递回执
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub uid: UserId,
    pub status: SendStatus,
    /// 传输层返回的消息标识，用于追踪投递状态
    pub message_id: Option<String>,
}

impl DeliveryReceipt {
    pub fn sent(uid: UserId, message_id: String) -> Self {
        Self {
            uid,
            status: SendStatus::Sent,
            message_id: Some(message_id),
        }
    }

    pub fn skipped(uid: UserId) -> Self {
        Self {
            uid,
            status: SendStatus::Skipped,
            message_id: None,
        }
    }
}

/// 投递服务 trait
///
/// `subscribe.uids` 显式给出收件人及其订阅目标，覆盖默认的收件人计算。
/// 任一收件人发送失败时返回 Err，由调用方决定是否影响其他收件人。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeliveryService: Send + Sync {
    async fn send(
        &self,
        context: &ContentEntity,
        record: &NotificationRecord,
        options: &NotifyOptions,
        subscribe: &SubscribeOptions,
    ) -> Result<Vec<DeliveryReceipt>>;
}
