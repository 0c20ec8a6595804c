//! 内容通知服务
//!
//! 监听内容与评论的生命周期事件，判断是否生成通知，持久化通知记录后逐个收件人投递邮件，
//! 并在来源实体的发布状态变化时同步已有记录。单个收件人投递失败不影响其他收件人。

pub mod classifier;
pub mod consumer;
pub mod delivery;
pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod listener;
pub mod mail;
pub mod models;
pub mod repository;
pub mod synchronizer;
pub mod template;

pub use classifier::{ChangeClassifier, Decision, SkipReason, Transition};
pub use dispatcher::{DispatchReport, FanoutDispatcher};
pub use listener::ContentNotifier;
pub use synchronizer::StatusSynchronizer;
