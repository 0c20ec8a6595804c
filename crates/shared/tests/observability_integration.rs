//! 可观测性模块集成测试
//!
//! 未安装 recorder 时指标记录应为空操作；日志只能初始化一次。

// ============================================================================
// 指标记录测试
// ============================================================================

mod metrics_tests {
    use notify_shared::observability::metrics::{
        record_created, record_delivery, record_skipped, record_status_sync,
    };

    #[test]
    fn test_record_created() {
        for template in ["create_content", "publish_content", "update_content", "create_comment"] {
            record_created(template);
        }
    }

    #[test]
    fn test_record_delivery() {
        record_delivery("success");
        record_delivery("skipped");
        record_delivery("failed");
    }

    #[test]
    fn test_record_status_sync() {
        record_status_sync(0);
        record_status_sync(3);
    }

    #[test]
    fn test_record_skipped() {
        record_skipped("untracked_bundle");
        record_skipped("no_new_revision");
    }
}

// ============================================================================
// 日志初始化测试
// ============================================================================

mod tracing_tests {
    use notify_shared::config::ObservabilityConfig;
    use notify_shared::observability;

    #[test]
    fn test_tracing_init_only_once() {
        let config = ObservabilityConfig {
            log_level: "debug".to_string(),
            json_logs: true,
            ..Default::default()
        };

        assert!(observability::tracing::init(&config).is_ok());
        // 全局订阅者已存在
        assert!(observability::tracing::init(&config).is_err());
    }
}
