//! Email 邮件投递
//!
//! 按模板类型渲染标题与正文，经邮件渲染器处理后交给传输层，逐个收件人发送。

use std::sync::Arc;

use async_trait::async_trait;
use lettre::Address;
use lettre::message::Mailbox;
use tracing::{debug, info, warn};

use notify_shared::config::MailConfig;
use notify_shared::error::{NotifyError, Result};
use notify_shared::events::{ContentEntity, NotificationChannel};

use super::transport::{MailMessage, MailTransport};
use super::{DeliveryReceipt, DeliveryService};
use crate::mail::MailRenderer;
use crate::models::{NotificationRecord, NotifyOptions, SourceRef, SubscribeOptions};
use crate::repository::UserDirectory;
use crate::template::{TemplateContext, TemplateEngine};

/// Email 投递服务
pub struct EmailDelivery {
    engine: TemplateEngine,
    renderer: MailRenderer,
    directory: Arc<dyn UserDirectory>,
    transport: Arc<dyn MailTransport>,
    from: Mailbox,
}

/// 解析邮件地址，失败时返回校验错误
fn parse_address(address: &str) -> Result<Address> {
    address
        .trim()
        .parse()
        .map_err(|e| NotifyError::Validation(format!("invalid email address {address:?}: {e}")))
}

impl EmailDelivery {
    /// 创建投递服务，发件地址无效时返回校验错误
    pub fn new(
        config: &MailConfig,
        engine: TemplateEngine,
        renderer: MailRenderer,
        directory: Arc<dyn UserDirectory>,
        transport: Arc<dyn MailTransport>,
    ) -> Result<Self> {
        let name = config.from_name.trim();
        let from = Mailbox::new(
            (!name.is_empty()).then(|| name.to_string()),
            parse_address(&config.from_address)?,
        );

        Ok(Self {
            engine,
            renderer,
            directory,
            transport,
            from,
        })
    }

    /// 使用默认模板创建
    pub fn with_defaults(
        config: &MailConfig,
        directory: Arc<dyn UserDirectory>,
        transport: Arc<dyn MailTransport>,
    ) -> Result<Self> {
        let renderer = MailRenderer::from_config(config)?;
        Self::new(
            config,
            TemplateEngine::with_defaults(),
            renderer,
            directory,
            transport,
        )
    }

    /// 构建模板变量
    ///
    /// `escape` 为 true 时变量值按 HTML 转义，用于正文；标题使用原文。
    fn build_context(
        &self,
        context: &ContentEntity,
        record: &NotificationRecord,
        escape: bool,
    ) -> TemplateContext {
        let value = |text: &str| {
            if escape {
                ammonia::clean_text(text)
            } else {
                text.to_string()
            }
        };

        let mut variables = TemplateContext::new();
        variables.set("site_name", value(self.renderer.site_name()));
        variables.set("label", value(&context.label));
        variables.set("url", context.path());
        variables.set("owner_id", record.owner_id.to_string());

        if let Some(revisions) = record.revisions {
            let original = revisions.original.unwrap_or(revisions.new);
            variables.set("original_revision", original.to_string());
            variables.set("new_revision", revisions.new.to_string());
            let diff_url = if revisions.is_new_revision() {
                format!("{}/revisions/view/{}/{}", context.path(), original, revisions.new)
            } else {
                context.path()
            };
            variables.set("diff_url", diff_url);
        }

        if let SourceRef::Comment(id) = record.source {
            variables.set("comment_url", format!("/comment/{id}"));
        }

        variables
    }

    /// 渲染（标题, HTML 正文, 纯文本正文）
    fn render(
        &self,
        context: &ContentEntity,
        record: &NotificationRecord,
        options: &NotifyOptions,
    ) -> Result<(String, Option<String>, String)> {
        let (subject_template, body_template) =
            self.engine.get_template(record.template).ok_or_else(|| {
                NotifyError::Render(format!("no template for {}", record.template.as_str()))
            })?;

        let subject = self
            .engine
            .render(subject_template, &self.build_context(context, record, false));
        let body = self
            .engine
            .render(body_template, &self.build_context(context, record, true));

        let html = if options.render_html {
            Some(self.renderer.render_html(&subject, &body)?)
        } else {
            None
        };
        let text = self.renderer.render_text(&body);

        Ok((subject, html, text))
    }
}

#[async_trait]
impl DeliveryService for EmailDelivery {
    async fn send(
        &self,
        context: &ContentEntity,
        record: &NotificationRecord,
        options: &NotifyOptions,
        subscribe: &SubscribeOptions,
    ) -> Result<Vec<DeliveryReceipt>> {
        let mut receipts = Vec::with_capacity(subscribe.uids.len());
        if subscribe.uids.is_empty() {
            debug!(record_id = %record.id, "没有指定收件人");
            return Ok(receipts);
        }

        let (subject, html, text) = self.render(context, record, options)?;

        for (&uid, target) in &subscribe.uids {
            if !target.wants(NotificationChannel::Email) {
                receipts.push(DeliveryReceipt::skipped(uid));
                continue;
            }

            if target.suppress_self && uid == record.owner_id {
                debug!(record_id = %record.id, uid, "收件人为记录所有者，已抑制");
                receipts.push(DeliveryReceipt::skipped(uid));
                continue;
            }

            let Some(address) = self.directory.email_address(uid).await? else {
                warn!(record_id = %record.id, uid, "用户未绑定邮箱，跳过 Email");
                receipts.push(DeliveryReceipt::skipped(uid));
                continue;
            };

            let message = MailMessage {
                to: Mailbox::new(None, parse_address(&address)?),
                from: self.from.clone(),
                subject: subject.clone(),
                html: html.clone(),
                text: text.clone(),
            };

            let message_id = self
                .transport
                .send(&message)
                .await
                .map_err(|e| NotifyError::Delivery {
                    recipient: uid,
                    reason: e.to_string(),
                })?;

            info!(
                record_id = %record.id,
                uid,
                message_id = %message_id,
                "Email 发送成功"
            );
            receipts.push(DeliveryReceipt::sent(uid, message_id));
        }

        Ok(receipts)
    }
}
