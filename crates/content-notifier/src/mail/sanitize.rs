//! 正文清洗
//!
//! 邮件在站点之外阅读：正文片段经 ammonia 清洗（去掉脚本、注释与不允许的属性），
//! 同时把相对链接改写为基于站点根地址的绝对链接。

use ammonia::{Builder, UrlRelative};
use url::Url;

use notify_shared::error::{NotifyError, Result};

/// 正文片段清洗器
#[derive(Debug, Clone)]
pub struct BodySanitizer {
    base: Url,
}

impl BodySanitizer {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| NotifyError::Render(format!("invalid base url {base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(NotifyError::Render(format!(
                "base url cannot be used for joining: {base_url}"
            )));
        }
        Ok(Self { base })
    }

    /// 清洗 HTML 片段，`href` / `src` 中的相对地址改写为绝对地址
    pub fn clean(&self, html: &str) -> String {
        let mut builder = Builder::default();
        builder
            .url_relative(UrlRelative::RewriteWithBase(self.base.clone()))
            .add_generic_attributes(&["class"])
            .link_rel(None);
        builder.clean(html).to_string()
    }
}
