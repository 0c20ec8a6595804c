//! 邮件渲染
//!
//! 模板渲染出的 HTML 片段先经过清洗与绝对地址改写，再套入邮件布局并内联 CSS；
//! 纯文本正文由清洗后的片段转换得到。

pub mod sanitize;

use tracing::debug;

use notify_shared::config::MailConfig;
use notify_shared::error::{NotifyError, Result};

pub use sanitize::BodySanitizer;

/// 纯文本正文的折行宽度
const TEXT_WIDTH: usize = 80;

/// 邮件布局的基础样式
const BASE_STYLESHEET: &str = r#"
body { font-family: Arial, sans-serif; line-height: 1.6; color: #333333; }
.container { max-width: 600px; margin: 0 auto; padding: 20px; }
.header { background: #2d3e50; color: #ffffff; padding: 16px 20px; }
.content { background: #f9f9f9; padding: 20px; }
.lead { font-size: 16px; }
a { color: #1a73e8; }
a.button { display: inline-block; padding: 8px 16px; background: #1a73e8; color: #ffffff; text-decoration: none; }
.footer { text-align: center; color: #888888; font-size: 12px; margin-top: 20px; }
"#;

/// HTML 转纯文本，链接以脚注形式保留地址
pub fn html_to_text(html: &str) -> String {
    let text = html2text::from_read(html.as_bytes(), TEXT_WIDTH);
    text.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// 邮件渲染器
#[derive(Debug, Clone)]
pub struct MailRenderer {
    sanitizer: BodySanitizer,
    /// 基础样式加附加样式表
    stylesheet: String,
    /// 为 false 时 `<style>` 块原样保留在邮件中
    inline_css: bool,
    site_name: String,
}

impl MailRenderer {
    /// 以附加样式表创建渲染器，附加样式在基础样式之后生效
    pub fn new(config: &MailConfig, extra_stylesheet: Option<&str>) -> Result<Self> {
        let mut stylesheet = BASE_STYLESHEET.to_string();
        if let Some(css) = extra_stylesheet {
            stylesheet.push_str(css);
        }

        Ok(Self {
            sanitizer: BodySanitizer::new(&config.base_url)?,
            stylesheet,
            inline_css: config.inline_css,
            site_name: config.from_name.clone(),
        })
    }

    /// 从配置创建，读取配置的样式表文件
    pub fn from_config(config: &MailConfig) -> Result<Self> {
        let stylesheet = match &config.stylesheet {
            Some(path) => Some(std::fs::read_to_string(path).map_err(|e| {
                NotifyError::Render(format!("failed to read stylesheet {path}: {e}"))
            })?),
            None => None,
        };

        debug!(
            stylesheet = ?config.stylesheet,
            inline_css = config.inline_css,
            "邮件渲染器已初始化"
        );

        Self::new(config, stylesheet.as_deref())
    }

    pub fn site_name(&self) -> &str {
        &self.site_name
    }

    /// 套入邮件布局
    fn wrap(&self, subject: &str, body_html: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<title>{title}</title>
<style>{stylesheet}</style>
</head>
<body>
<div class="container">
<div class="header"><h1>{title}</h1></div>
<div class="content">
{body_html}
</div>
<div class="footer"><p>此邮件由 {site} 自动发送，请勿回复。</p></div>
</div>
</body>
</html>"#,
            title = ammonia::clean_text(subject),
            stylesheet = self.stylesheet,
            site = ammonia::clean_text(&self.site_name),
        )
    }

    /// 渲染完整的 HTML 邮件正文
    pub fn render_html(&self, subject: &str, body_html: &str) -> Result<String> {
        let body = self.sanitizer.clean(body_html);
        let html = self.wrap(subject, &body);

        if !self.inline_css {
            return Ok(html);
        }

        css_inline::inline(&html)
            .map_err(|e| NotifyError::Render(format!("failed to inline css: {e}")))
    }

    /// 渲染纯文本正文，链接保留为绝对地址
    pub fn render_text(&self, body_html: &str) -> String {
        html_to_text(&self.sanitizer.clean(body_html))
    }
}
