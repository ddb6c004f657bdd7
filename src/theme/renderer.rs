use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tera::{Context as TeraContext, Tera};
use tracing::{debug, error, info};
use chrono::DateTime;
use walkdir::WalkDir;

/// 内置模板，主题目录中的同名文件会覆盖它们
const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("layout.html", include_str!("../../embed/theme/layout.html")),
    ("views/event.html", include_str!("../../embed/theme/views/event.html")),
    ("views/employee.html", include_str!("../../embed/theme/views/employee.html")),
    ("views/slide.html", include_str!("../../embed/theme/views/slide.html")),
    ("views/page.html", include_str!("../../embed/theme/views/page.html")),
    ("views/post.html", include_str!("../../embed/theme/views/post.html")),
    ("single/event.html", include_str!("../../embed/theme/single/event.html")),
    ("single/employee.html", include_str!("../../embed/theme/single/employee.html")),
    ("single/slide.html", include_str!("../../embed/theme/single/slide.html")),
    ("single/page.html", include_str!("../../embed/theme/single/page.html")),
    ("single/post.html", include_str!("../../embed/theme/single/post.html")),
];

pub struct ThemeRenderer {
    /// 主题目录
    pub theme_dir: Option<PathBuf>,
    /// 模板引擎
    pub tera: Tera,
}

impl ThemeRenderer {
    /// 创建新的主题渲染器：先注册内置模板，再加载主题目录中的覆盖模板
    pub fn new(theme_dir: Option<&Path>) -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(BUILTIN_TEMPLATES.to_vec())
            .context("注册内置模板失败")?;

        if let Some(dir) = theme_dir {
            if !dir.exists() {
                return Err(anyhow!("主题目录不存在: {}", dir.display()));
            }
            let mut overrides = Vec::new();
            for entry in WalkDir::new(dir).sort_by_file_name() {
                let entry = entry?;
                let path = entry.path();
                if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("html") {
                    continue;
                }
                let name = path
                    .strip_prefix(dir)?
                    .to_string_lossy()
                    .replace('\\', "/");
                debug!("加载主题模板: {}", name);
                overrides.push((path.to_path_buf(), Some(name)));
            }
            info!("从 {} 加载了 {} 个主题模板", dir.display(), overrides.len());
            tera.add_template_files(overrides)
                .with_context(|| format!("加载主题模板失败: {}", dir.display()))?;
        }

        // 注册过滤器
        Self::register_filters(&mut tera);
        tera.set_escape_fn(escape_html);

        Ok(ThemeRenderer {
            theme_dir: theme_dir.map(Path::to_path_buf),
            tera,
        })
    }

    /// 注册模板过滤器
    fn register_filters(tera: &mut Tera) {
        // 注册日期格式化过滤器
        tera.register_filter("date_format", Self::date_format_filter);
        // 注册Markdown过滤器
        tera.register_filter("markdown", Self::markdown_filter);
        // 图片字段可能是URL字符串也可能是图片对象
        tera.register_filter("image_url", Self::image_url_filter);
    }

    /// 渲染模板
    pub fn render_template(&self, template_name: &str, context: &TeraContext) -> Result<String> {
        match self.tera.render(template_name, context) {
            Ok(result) => Ok(result),
            Err(e) => {
                error!("模板渲染失败: {} - {}", template_name, e);
                Err(anyhow!(e).context(format!("渲染模板 {} 失败", template_name)))
            }
        }
    }

    /// 获取可用的模板列表
    pub fn available_layouts(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tera.get_template_names().map(String::from).collect();
        names.sort();
        names
    }

    /// 检查模板是否存在
    pub fn has_layout(&self, layout: &str) -> bool {
        self.tera.get_template_names().any(|name| name == layout)
    }

    fn date_format_filter(value: &tera::Value, args: &HashMap<String, tera::Value>) -> tera::Result<tera::Value> {
        if let Some(date) = value.as_str().and_then(|s| DateTime::parse_from_rfc3339(s).ok()) {
            let format = args.get("format")
                .and_then(|f| f.as_str())
                .unwrap_or("%Y-%m-%d");
            Ok(tera::Value::String(date.format(format).to_string()))
        } else {
            Ok(value.clone())
        }
    }

    fn markdown_filter(value: &tera::Value, _args: &HashMap<String, tera::Value>) -> tera::Result<tera::Value> {
        if let Some(text) = value.as_str() {
            Ok(tera::Value::String(crate::utils::markdown::render(text)))
        } else {
            Ok(value.clone())
        }
    }

    fn image_url_filter(value: &tera::Value, _args: &HashMap<String, tera::Value>) -> tera::Result<tera::Value> {
        match value {
            tera::Value::String(_) => Ok(value.clone()),
            tera::Value::Object(map) => Ok(map.get("url").cloned().unwrap_or(tera::Value::Null)),
            _ => Ok(tera::Value::Null),
        }
    }
}

/// HTML转义，不转义 `/`，保证模板中的URL保持原样。
/// 与 `tera::escape_html` 的区别只在于 `/` 不转成 `&#x2F;`
fn escape_html(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#x27;"),
            _ => output.push(c),
        }
    }
    output
}
