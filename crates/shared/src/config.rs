//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 通知处理配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// 需要生成通知的内容类型
    pub tracked_bundles: Vec<String>,
    /// 全局开关：为 true 时跳过所有内容事件处理
    pub skip_processing: bool,
    /// 不参与通知投递的保留用户（系统账户与超级管理员）
    pub reserved_user_ids: Vec<u64>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            tracked_bundles: Vec::new(),
            skip_processing: false,
            reserved_user_ids: vec![0, 1],
        }
    }
}

/// 邮件渲染配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub from_address: String,
    pub from_name: String,
    /// 站点根地址，邮件正文中的相对链接据此改写为绝对地址
    pub base_url: String,
    /// 需要内联到邮件 HTML 的样式表路径
    pub stylesheet: Option<String>,
    pub inline_css: bool,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from_address: "noreply@example.com".to_string(),
            from_name: "Content Notify".to_string(),
            base_url: "http://localhost".to_string(),
            stylesheet: None,
            inline_css: true,
        }
    }
}

/// 目录中的预置用户（供内置宿主使用）
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryUser {
    pub id: u64,
    pub email: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// 用户目录配置
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub users: Vec<DirectoryUser>,
}

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// 是否输出 JSON 格式日志（否则为人类可读格式）
    pub json_logs: bool,
    pub metrics_enabled: bool,
    pub metrics_port: u16,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_port: 9090,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub notification: NotificationConfig,
    pub mail: MailConfig,
    pub directory: DirectoryConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. config/{service_name}.toml（服务特定配置）
    /// 4. 环境变量（NOTIFY_ 前缀，层级用双下划线分隔，
    ///    如 NOTIFY_NOTIFICATION__SKIP_PROCESSING -> notification.skip_processing）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("NOTIFY_ENV").unwrap_or_else(|_| "development".to_string());

        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        Self::load_from(service_name, &env, Path::new(&config_dir))
    }

    /// 从指定目录加载配置
    pub fn load_from(service_name: &str, env: &str, config_dir: &Path) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", env))).required(false))
            .add_source(
                File::from(config_dir.join(format!("{}.toml", service_name))).required(false),
            )
            // 字段名本身含下划线，层级分隔符使用双下划线
            .add_source(
                Environment::with_prefix("NOTIFY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("notification.tracked_bundles")
                    .with_list_parse_key("notification.reserved_user_ids"),
            );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.notification.reserved_user_ids, vec![0, 1]);
        assert!(!config.notification.skip_processing);
        assert!(config.mail.inline_css);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_load_from_directory() {
        let dir = std::env::temp_dir().join(format!("notify-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let mut file = std::fs::File::create(dir.join("default.toml")).unwrap();
        writeln!(
            file,
            r#"
[notification]
tracked_bundles = ["blog"]

[mail]
base_url = "https://example.org"

[[directory.users]]
id = 2
email = "editor@example.org"
"#
        )
        .unwrap();

        let config = AppConfig::load_from("content-notifier", "test", &dir).unwrap();
        assert_eq!(config.service_name, "content-notifier");
        assert_eq!(config.environment, "test");
        assert_eq!(config.notification.tracked_bundles, vec!["blog".to_string()]);
        // 未配置的字段回落到默认值
        assert_eq!(config.notification.reserved_user_ids, vec![0, 1]);
        assert_eq!(config.mail.base_url, "https://example.org");
        assert_eq!(config.directory.users.len(), 1);
        assert!(config.directory.users[0].active);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
