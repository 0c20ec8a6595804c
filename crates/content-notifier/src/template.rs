//! 通知模板引擎
//!
//! 按模板类型管理邮件标题与正文，支持 `{{variable}}` 语法的变量替换。
//!
//! ## 使用示例
//!
//! ```ignore
//! let engine = TemplateEngine::with_defaults();
//!
//! let mut context = TemplateContext::new();
//! context.set("label", "Rust 入门");
//! context.set("url", "/node/42");
//!
//! let (subject, body) = engine.get_template(TemplateKind::PublishContent).unwrap();
//! let subject = engine.render(subject, &context);
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use notify_shared::events::TemplateKind;

/// 匹配 {{variable_name}} 格式，变量名支持字母、数字、下划线
static VARIABLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("variable pattern is valid"));

/// 模板变量上下文
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    variables: HashMap<String, String>,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(|s| s.as_str())
    }
}

/// 模板引擎
pub struct TemplateEngine {
    /// 标题模板（按模板类型）
    subject_templates: HashMap<TemplateKind, String>,
    /// HTML 正文模板（按模板类型）
    body_templates: HashMap<TemplateKind, String>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    /// 创建空的模板引擎
    pub fn new() -> Self {
        Self {
            subject_templates: HashMap::new(),
            body_templates: HashMap::new(),
        }
    }

    /// 创建带有默认模板的引擎
    pub fn with_defaults() -> Self {
        let mut engine = Self::new();
        engine.register_default_templates();
        engine
    }

    fn register_default_templates(&mut self) {
        self.register_template(
            TemplateKind::CreateContent,
            "[{{site_name}}] 新内容：{{label}}",
            r#"<p class="lead">新内容「{{label}}」已创建。</p>
<p><a class="button" href="{{url}}">查看内容</a></p>"#,
        );

        self.register_template(
            TemplateKind::PublishContent,
            "[{{site_name}}] 内容已发布：{{label}}",
            r#"<p class="lead">「{{label}}」已发布。</p>
<p><a class="button" href="{{url}}">阅读全文</a></p>"#,
        );

        self.register_template(
            TemplateKind::UpdateContent,
            "[{{site_name}}] 内容已更新：{{label}}",
            r#"<p class="lead">「{{label}}」已更新（修订 {{original_revision}} → {{new_revision}}）。</p>
<p><a class="button" href="{{url}}">查看内容</a> <a href="{{diff_url}}">查看修订差异</a></p>"#,
        );

        self.register_template(
            TemplateKind::CreateComment,
            "[{{site_name}}] 新评论：{{label}}",
            r#"<p class="lead">「{{label}}」收到一条新评论。</p>
<p><a class="button" href="{{comment_url}}">查看评论</a></p>"#,
        );
    }

    /// 注册模板
    pub fn register_template(
        &mut self,
        kind: TemplateKind,
        subject_template: impl Into<String>,
        body_template: impl Into<String>,
    ) {
        self.subject_templates.insert(kind, subject_template.into());
        self.body_templates.insert(kind, body_template.into());
    }

    /// 获取模板
    pub fn get_template(&self, kind: TemplateKind) -> Option<(&str, &str)> {
        let subject = self.subject_templates.get(&kind)?;
        let body = self.body_templates.get(&kind)?;
        Some((subject, body))
    }

    /// 渲染模板
    ///
    /// 将模板中的 `{{variable}}` 替换为上下文中的对应值。
    /// 未找到的变量会保留原样并记录警告日志。
    pub fn render(&self, template: &str, context: &TemplateContext) -> String {
        let result = VARIABLE_REGEX.replace_all(template, |caps: &regex::Captures| {
            let var_name = &caps[1];
            match context.get(var_name) {
                Some(value) => value.to_string(),
                None => {
                    warn!(variable = var_name, "模板变量未找到，保留原样");
                    caps[0].to_string()
                }
            }
        });

        result.into_owned()
    }
}
