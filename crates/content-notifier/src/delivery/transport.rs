//! 邮件传输
//!
//! 通过 `MailTransport` trait 抽象实际的邮件发送。内置两种实现：
//! 仅记录日志的模拟传输，以及把邮件保存在内存中的记录传输。
//! 接入 SMTP 或邮件服务商时只需实现同一 trait。

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use lettre::Message;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use parking_lot::Mutex;
use tracing::info;
use uuid::Uuid;

use notify_shared::error::{NotifyError, Result};

/// 待发送的邮件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: Mailbox,
    pub from: Mailbox,
    pub subject: String,
    pub html: Option<String>,
    pub text: String,
}

impl MailMessage {
    /// 组装 MIME 邮件：有 HTML 正文时为 multipart/alternative，否则为纯文本
    pub fn to_message(&self) -> Result<Message> {
        let builder = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(self.subject.clone());

        let message = match &self.html {
            Some(html) => builder.multipart(MultiPart::alternative_plain_html(
                self.text.clone(),
                html.clone(),
            )),
            None => builder.singlepart(SinglePart::plain(self.text.clone())),
        };

        message.map_err(|e| NotifyError::Render(format!("failed to build mail: {e}")))
    }
}

/// 邮件传输 trait
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// 发送邮件，返回传输层的消息标识
    async fn send(&self, message: &MailMessage) -> Result<String>;
}

/// 模拟传输，只记录日志
pub struct LogTransport;

#[async_trait]
impl MailTransport for LogTransport {
    async fn send(&self, message: &MailMessage) -> Result<String> {
        let formatted = message.to_message()?.formatted();
        let message_id = format!("mail_{}", Uuid::now_v7());

        info!(
            message_id = %message_id,
            to = %message.to,
            from = %message.from,
            subject = %message.subject,
            size = formatted.len(),
            "模拟发送邮件"
        );

        Ok(message_id)
    }
}

/// 内存记录传输
///
/// 保存所有已发送的邮件；对指定地址返回发送失败。
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    sent: Arc<Mutex<Vec<MailMessage>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 之后发往该地址的邮件都会失败
    pub fn fail_for(&self, address: impl Into<String>) {
        self.failing.lock().insert(address.into());
    }

    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl MailTransport for MemoryTransport {
    async fn send(&self, message: &MailMessage) -> Result<String> {
        let address = message.to.email.to_string();
        if self.failing.lock().contains(&address) {
            return Err(NotifyError::Internal(format!(
                "mailbox unavailable: {address}"
            )));
        }

        self.sent.lock().push(message.clone());
        Ok(format!("memory_{}", Uuid::new_v4()))
    }
}
