use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tera::Context as TeraContext;
use tracing::debug;

use crate::core::error::{ListerError, ListerResult};
use crate::models::{ContentItem, ContentType, FieldMap, Fragment, ViewConfig};
use crate::theme::renderer::ThemeRenderer;

/// 视图渲染器：把条目和已解析的字段转换为HTML片段。
/// 条目总是显式传入，渲染器不依赖任何“当前条目”的全局状态。
pub trait ViewRenderer: Send + Sync {
    fn render(&self, item: &ContentItem, fields: &FieldMap) -> ListerResult<Fragment>;
}

impl<F> ViewRenderer for F
where
    F: Fn(&ContentItem, &FieldMap) -> ListerResult<Fragment> + Send + Sync,
{
    fn render(&self, item: &ContentItem, fields: &FieldMap) -> ListerResult<Fragment> {
        self(item, fields)
    }
}

/// 基于 tera 模板的视图
pub struct TemplateView {
    renderer: Arc<ThemeRenderer>,
    template: String,
}

impl TemplateView {
    pub fn new(renderer: Arc<ThemeRenderer>, template: impl Into<String>) -> Self {
        Self {
            renderer,
            template: template.into(),
        }
    }
}

impl ViewRenderer for TemplateView {
    fn render(&self, item: &ContentItem, fields: &FieldMap) -> ListerResult<Fragment> {
        let mut context = TeraContext::new();
        context.insert("item", item);
        context.insert("fields", fields);

        self.renderer
            .render_template(&self.template, &context)
            .map(Fragment::new)
            .map_err(|e| ListerError::Render {
                content_type: item.content_type.to_string(),
                message: format!("{:#}", e),
            })
    }
}

/// 视图模式：列表中的摘要或单条目页面
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Listing,
    Single,
}

impl ViewMode {
    fn template_dir(&self) -> &'static str {
        match self {
            ViewMode::Listing => "views",
            ViewMode::Single => "single",
        }
    }
}

/// 一个内容类型的视图：渲染器、需要解析的字段和门控字段
pub struct View {
    renderer: Box<dyn ViewRenderer>,
    fields: Vec<String>,
    gates: Vec<String>,
}

impl View {
    pub fn new(renderer: impl ViewRenderer + 'static) -> Self {
        Self {
            renderer: Box::new(renderer),
            fields: Vec::new(),
            gates: Vec::new(),
        }
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_gates<I, S>(mut self, gates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.gates = gates.into_iter().map(Into::into).collect();
        self
    }

    pub fn renderer(&self) -> &dyn ViewRenderer {
        self.renderer.as_ref()
    }

    pub fn gates(&self) -> &[String] {
        &self.gates
    }

    /// 需要解析的全部字段：视图字段加上门控字段
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fields.iter().map(String::as_str).collect();
        for gate in &self.gates {
            if !names.contains(&gate.as_str()) {
                names.push(gate);
            }
        }
        names
    }
}

/// 内容类型到视图的映射
#[derive(Default)]
pub struct ViewRegistry {
    views: HashMap<ContentType, View>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, content_type: ContentType, view: View) -> &mut Self {
        self.views.insert(content_type, view);
        self
    }

    pub fn with(mut self, content_type: ContentType, view: View) -> Self {
        self.register(content_type, view);
        self
    }

    pub fn get(&self, content_type: ContentType) -> Option<&View> {
        self.views.get(&content_type)
    }

    /// 为所有内容类型创建模板视图，配置中的字段、门控和模板覆盖默认值
    pub fn from_config(
        renderer: Arc<ThemeRenderer>,
        overrides: &BTreeMap<ContentType, ViewConfig>,
        mode: ViewMode,
    ) -> ListerResult<Self> {
        let mut registry = Self::new();
        for content_type in ContentType::ALL {
            let config = overrides.get(&content_type).cloned().unwrap_or_default();

            let template = config.template.unwrap_or_else(|| {
                format!("{}/{}.html", mode.template_dir(), content_type)
            });
            if !renderer.has_layout(&template) {
                return Err(ListerError::invalid_query(format!(
                    "{} 的视图模板不存在: {} (可用模板: {})",
                    content_type,
                    template,
                    renderer.available_layouts().join(", ")
                )));
            }

            let fields = config
                .fields
                .unwrap_or_else(|| default_fields(content_type).iter().map(|s| s.to_string()).collect());
            let gates = config.gates.unwrap_or_else(|| match mode {
                ViewMode::Listing => default_gates(content_type).iter().map(|s| s.to_string()).collect(),
                ViewMode::Single => Vec::new(),
            });

            debug!(
                "注册视图 {} ({:?}): 模板 {}, 字段 {:?}, 门控 {:?}",
                content_type, mode, template, fields, gates
            );
            registry.register(
                content_type,
                View::new(TemplateView::new(renderer.clone(), template))
                    .with_fields(fields)
                    .with_gates(gates),
            );
        }
        Ok(registry)
    }
}

/// 各内容类型默认解析的字段
pub fn default_fields(content_type: ContentType) -> &'static [&'static str] {
    match content_type {
        ContentType::Event => &["image", "start_date", "end_date", "location", "map"],
        ContentType::Employee => &["photo", "position", "email", "phone"],
        ContentType::Slide => &["image", "caption", "link"],
        ContentType::Page | ContentType::Post => &["thumbnail", "excerpt"],
    }
}

/// 各内容类型默认的门控字段：幻灯片没有图片时不渲染
pub fn default_gates(content_type: ContentType) -> &'static [&'static str] {
    match content_type {
        ContentType::Slide => &["image"],
        _ => &[],
    }
}
