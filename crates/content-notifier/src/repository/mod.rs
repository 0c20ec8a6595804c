//! 仓储层
//!
//! 外部协作方的抽象接口，以及基于 DashMap 的内存实现（供内置宿主与测试使用）。

pub mod memory;
pub mod traits;

pub use memory::{MemoryEntityStore, MemoryRecordStore, MemoryUserDirectory};
pub use traits::{ConfigProvider, EntityStore, NotificationRecordStore, SKIP_PROCESSING_KEY, UserDirectory};

#[cfg(test)]
pub use traits::{MockConfigProvider, MockEntityStore, MockNotificationRecordStore, MockUserDirectory};
