use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

/// 内容类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Event,
    Employee,
    Slide,
    Page,
    Post,
}

/// 过滤条件的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Category,
    Id,
    NotIn,
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterKind::Category => "category",
            FilterKind::Id => "id",
            FilterKind::NotIn => "not_in",
        };
        f.write_str(name)
    }
}

impl ContentType {
    pub const ALL: [ContentType; 5] = [
        ContentType::Event,
        ContentType::Employee,
        ContentType::Slide,
        ContentType::Page,
        ContentType::Post,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Event => "event",
            ContentType::Employee => "employee",
            ContentType::Slide => "slide",
            ContentType::Page => "page",
            ContentType::Post => "post",
        }
    }

    /// 源文件子目录，例如 `_events`
    pub fn source_dir_name(&self) -> String {
        format!("_{}s", self.as_str())
    }

    /// 该类型允许使用的过滤条件
    pub fn legal_filters(&self) -> &'static [FilterKind] {
        match self {
            ContentType::Event | ContentType::Post => {
                &[FilterKind::Category, FilterKind::Id, FilterKind::NotIn]
            }
            ContentType::Employee | ContentType::Slide | ContentType::Page => {
                &[FilterKind::Id, FilterKind::NotIn]
            }
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let singular = normalized.strip_suffix('s').unwrap_or(&normalized);
        ContentType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == singular)
            .ok_or_else(|| format!("未知的内容类型: {}", s))
    }
}

/// 排序方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// 存储的自然顺序：最新的在前
    #[default]
    Default,
    /// 最早的在前
    Ascending,
}

/// 分类引用，可以是数字 ID 也可以是别名
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryRef {
    Id(u64),
    Slug(String),
}

impl From<u64> for CategoryRef {
    fn from(id: u64) -> Self {
        CategoryRef::Id(id)
    }
}

impl From<&str> for CategoryRef {
    fn from(slug: &str) -> Self {
        CategoryRef::Slug(slug.to_string())
    }
}

impl FromStr for CategoryRef {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<u64>() {
            Ok(id) => CategoryRef::Id(id),
            Err(_) => CategoryRef::Slug(s.to_string()),
        })
    }
}

/// 查询过滤条件
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFilter {
    /// 按分类过滤
    #[serde(default)]
    pub category: Option<CategoryRef>,
    /// 只取指定 ID 的条目
    #[serde(default)]
    pub id: Option<u64>,
    /// 排除的条目 ID
    #[serde(default)]
    pub not_in: BTreeSet<u64>,
}

impl ContentFilter {
    pub fn category(category: impl Into<CategoryRef>) -> Self {
        Self {
            category: Some(category.into()),
            ..Self::default()
        }
    }

    pub fn id(id: u64) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn not_in(ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            not_in: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    /// 实际使用到的过滤种类
    pub fn kinds(&self) -> Vec<FilterKind> {
        let mut kinds = Vec::new();
        if self.category.is_some() {
            kinds.push(FilterKind::Category);
        }
        if self.id.is_some() {
            kinds.push(FilterKind::Id);
        }
        if !self.not_in.is_empty() {
            kinds.push(FilterKind::NotIn);
        }
        kinds
    }
}

/// 一次内容查询
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentQuery {
    /// 内容类型
    #[serde(rename = "type")]
    pub content_type: ContentType,
    /// 过滤条件
    #[serde(default)]
    pub filter: Option<ContentFilter>,
    /// 排序方式
    #[serde(default)]
    pub order: SortOrder,
    /// 返回条目数上限
    pub limit: usize,
}

impl ContentQuery {
    pub fn new(content_type: ContentType, limit: usize) -> Self {
        Self {
            content_type,
            filter: None,
            order: SortOrder::Default,
            limit,
        }
    }

    pub fn with_filter(mut self, filter: ContentFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    /// 检查查询是否合法：limit 必须大于 0，过滤条件必须属于该类型允许的集合
    pub fn validate(&self) -> Result<(), String> {
        if self.limit == 0 {
            return Err("limit 必须大于 0".to_string());
        }
        if let Some(filter) = &self.filter {
            let legal = self.content_type.legal_filters();
            for kind in filter.kinds() {
                if !legal.contains(&kind) {
                    return Err(format!(
                        "内容类型 {} 不支持 {} 过滤",
                        self.content_type, kind
                    ));
                }
            }
        }
        Ok(())
    }
}

/// 分类
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    pub slug: String,
}

impl Category {
    /// 按 ID、别名或名称匹配
    pub fn matches(&self, category: &CategoryRef) -> bool {
        match category {
            CategoryRef::Id(id) => self.id == *id,
            CategoryRef::Slug(slug) => self.slug == *slug || self.name == *slug,
        }
    }
}

/// 图片描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl ImageRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            width: None,
            height: None,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}

/// 字段值。`Empty` 序列化为 `null`，模板中的 `if` 判断会跳过它。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    ImageRef(ImageRef),
    Empty,
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            FieldValue::Empty
        } else {
            FieldValue::Text(value)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageRef> {
        match self {
            FieldValue::ImageRef(image) => Some(image),
            _ => None,
        }
    }

    /// 将前置元数据中的 YAML 值转换为字段值
    pub fn from_yaml(value: &serde_yaml::Value) -> Self {
        use serde_yaml::Value;

        match value {
            Value::Null => FieldValue::Empty,
            Value::Bool(b) => FieldValue::Text(b.to_string()),
            Value::Number(n) => FieldValue::Text(n.to_string()),
            Value::String(s) => FieldValue::text(s.as_str()),
            Value::Sequence(seq) => {
                let parts: Vec<String> = seq
                    .iter()
                    .filter_map(|v| match FieldValue::from_yaml(v) {
                        FieldValue::Text(s) => Some(s),
                        _ => None,
                    })
                    .collect();
                FieldValue::text(parts.join(", "))
            }
            Value::Mapping(_) => match serde_yaml::from_value::<ImageRef>(value.clone()) {
                Ok(image) if !image.url.trim().is_empty() => FieldValue::ImageRef(image),
                _ => FieldValue::Empty,
            },
            Value::Tagged(tagged) => FieldValue::from_yaml(&tagged.value),
        }
    }
}

/// 已解析的字段集合，按名称排序
pub type FieldMap = BTreeMap<String, FieldValue>;

/// 内容条目
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentItem {
    pub id: u64,
    pub content_type: ContentType,
    pub title: String,
    pub slug: String,
    /// 站内路径，例如 `/event/open-day/`
    pub path: String,
    /// 完整URL
    pub permalink: String,
    pub date: DateTime<Utc>,
    /// 渲染后的HTML正文
    pub body: String,
    /// 所属分类 ID
    pub categories: Vec<u64>,
    /// 特色图片
    pub featured_image: Option<ImageRef>,
    /// 自定义字段
    pub custom_fields: HashMap<String, FieldValue>,
}

impl ContentItem {
    pub fn new(id: u64, content_type: ContentType, title: impl Into<String>, date: DateTime<Utc>) -> Self {
        let title = title.into();
        let slug = crate::utils::slugify(&title);
        let path = format!("/{}/{}/", content_type, slug);
        Self {
            id,
            content_type,
            permalink: path.clone(),
            path,
            slug,
            title,
            date,
            body: String::new(),
            categories: Vec::new(),
            featured_image: None,
            custom_fields: HashMap::new(),
        }
    }

    pub fn with_category(mut self, category: u64) -> Self {
        self.categories.push(category);
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.custom_fields.insert(name.into(), value);
        self
    }

    pub fn with_featured_image(mut self, image: ImageRef) -> Self {
        self.featured_image = Some(image);
        self
    }

    pub fn has_featured_image(&self) -> bool {
        self.featured_image.is_some()
    }
}

/// 查询结果：有序、可能为空
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ListResult {
    items: Vec<ContentItem>,
}

impl ListResult {
    pub fn new(items: Vec<ContentItem>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ContentItem> {
        self.items.iter()
    }

    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    pub fn ids(&self) -> Vec<u64> {
        self.items.iter().map(|item| item.id).collect()
    }
}

impl IntoIterator for ListResult {
    type Item = ContentItem;
    type IntoIter = std::vec::IntoIter<ContentItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a ListResult {
    type Item = &'a ContentItem;
    type IntoIter = std::slice::Iter<'a, ContentItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// 视图渲染出的HTML片段
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Fragment(String);

impl Fragment {
    pub fn new(html: impl Into<String>) -> Self {
        Fragment(html.into())
    }

    pub fn empty() -> Self {
        Fragment(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// 拼接多个片段
    pub fn concat<I: IntoIterator<Item = Fragment>>(fragments: I) -> Self {
        Fragment(fragments.into_iter().map(|f| f.0).collect::<Vec<_>>().join("\n"))
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
