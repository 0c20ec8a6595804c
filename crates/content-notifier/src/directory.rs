//! 订阅者目录适配
//!
//! 从用户目录解析当前可接收通知的用户，排除系统账户与超级管理员等保留用户。

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use notify_shared::error::Result;
use notify_shared::events::UserId;

use crate::repository::UserDirectory;

/// 默认保留用户：匿名/系统账户 (0) 与超级管理员 (1)
pub const RESERVED_USER_IDS: [UserId; 2] = [0, 1];

/// 收件人解析器
pub struct RecipientResolver {
    directory: Arc<dyn UserDirectory>,
    reserved: BTreeSet<UserId>,
}

impl RecipientResolver {
    pub fn new(directory: Arc<dyn UserDirectory>, reserved: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            directory,
            reserved: reserved.into_iter().collect(),
        }
    }

    pub fn with_default_reserved(directory: Arc<dyn UserDirectory>) -> Self {
        Self::new(directory, RESERVED_USER_IDS)
    }

    /// 当前所有符合条件的收件人，去重且按 ID 升序
    pub async fn resolve(&self) -> Result<Vec<UserId>> {
        let active = self.directory.active_user_ids().await?;
        let total = active.len();

        let recipients: Vec<UserId> = active
            .into_iter()
            .filter(|uid| !self.reserved.contains(uid))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        debug!(active = total, eligible = recipients.len(), "解析通知收件人");
        Ok(recipients)
    }

    /// 用户目录，供投递服务查询邮箱
    pub fn directory(&self) -> &Arc<dyn UserDirectory> {
        &self.directory
    }
}
