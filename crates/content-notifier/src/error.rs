//! 通知服务错误类型
//!
//! 在共享错误之上补充事件消费场景的错误分类，
//! 便于宿主根据错误类型决定跳过该事件还是停止消费。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("事件反序列化失败: {0}")]
    DeserializationFailed(String),

    #[error("事件读取失败: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Shared(#[from] notify_shared::error::NotifyError),
}
