use std::collections::HashSet;

use tracing::debug;

use crate::core::error::{ListerError, ListerResult};
use crate::models::{
    Category, CategoryRef, ContentFilter, ContentItem, ContentQuery, ContentType, FieldValue,
    SortOrder,
};

/// 特色图片对应的字段名
pub const THUMBNAIL_FIELD: &str = "thumbnail";

/// 内容存储接口。列表组件只读取存储，从不修改它。
pub trait ContentStore: Send + Sync {
    /// 按类型、过滤条件、排序和数量上限查询条目
    fn query(&self, query: &ContentQuery) -> ListerResult<Vec<ContentItem>>;

    /// 按别名查找单个条目
    fn find(&self, content_type: ContentType, slug: &str) -> ListerResult<Option<ContentItem>>;

    /// 解析条目的字段，字段不存在时返回 `FieldResolutionMiss`
    fn resolve_field(&self, item: &ContentItem, name: &str) -> ListerResult<FieldValue> {
        if name == THUMBNAIL_FIELD {
            return Ok(item
                .featured_image
                .clone()
                .map(FieldValue::ImageRef)
                .unwrap_or(FieldValue::Empty));
        }
        item.custom_fields
            .get(name)
            .cloned()
            .ok_or_else(|| ListerError::FieldResolutionMiss {
                item_id: item.id,
                field: name.to_string(),
            })
    }

    fn has_featured_image(&self, item: &ContentItem) -> bool {
        item.has_featured_image()
    }

    fn permalink(&self, item: &ContentItem) -> String {
        item.permalink.clone()
    }
}

/// 内存中的内容快照
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    items: Vec<ContentItem>,
    categories: Vec<Category>,
}

impl MemoryStore {
    pub fn new(items: Vec<ContentItem>, categories: Vec<Category>) -> Self {
        Self { items, categories }
    }

    pub fn insert(&mut self, item: ContentItem) {
        self.items.push(item);
    }

    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// 将分类引用解析为分类 ID，分类不存在时返回 `None`
    pub fn resolve_category(&self, category: &CategoryRef) -> Option<u64> {
        self.categories
            .iter()
            .find(|c| c.matches(category))
            .map(|c| c.id)
    }

    fn matches(&self, item: &ContentItem, filter: &ContentFilter, category: Option<u64>) -> bool {
        if let Some(category) = category {
            if !item.categories.contains(&category) {
                return false;
            }
        }
        if let Some(id) = filter.id {
            if item.id != id {
                return false;
            }
        }
        !filter.not_in.contains(&item.id)
    }
}

impl ContentStore for MemoryStore {
    fn query(&self, query: &ContentQuery) -> ListerResult<Vec<ContentItem>> {
        query.validate().map_err(ListerError::invalid_query)?;

        let default_filter = ContentFilter::default();
        let filter = query.filter.as_ref().unwrap_or(&default_filter);

        // 分类不存在时与 CMS 的行为一致：返回空结果而不是报错
        let category = match &filter.category {
            Some(category_ref) => match self.resolve_category(category_ref) {
                Some(id) => Some(id),
                None => {
                    debug!("分类 {:?} 不存在，返回空结果", category_ref);
                    return Ok(Vec::new());
                }
            },
            None => None,
        };

        let mut matched: Vec<&ContentItem> = self
            .items
            .iter()
            .filter(|item| item.content_type == query.content_type)
            .filter(|item| self.matches(item, filter, category))
            .collect();

        match query.order {
            SortOrder::Default => {
                matched.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)))
            }
            SortOrder::Ascending => {
                matched.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)))
            }
        }

        Ok(matched.into_iter().take(query.limit).cloned().collect())
    }

    fn find(&self, content_type: ContentType, slug: &str) -> ListerResult<Option<ContentItem>> {
        Ok(self
            .items
            .iter()
            .find(|item| item.content_type == content_type && item.slug == slug)
            .cloned())
    }
}

/// 检查条目 ID 是否重复
pub(crate) fn ensure_unique_ids(items: &[ContentItem]) -> ListerResult<()> {
    let mut seen = HashSet::new();
    for item in items {
        if !seen.insert(item.id) {
            return Err(ListerError::store_unavailable(format!(
                "条目 ID {} 重复 ({})",
                item.id, item.title
            )));
        }
    }
    Ok(())
}

/// 检查同一内容类型中的别名是否重复，重复的别名会生成相同的页面路径
pub(crate) fn ensure_unique_slugs(items: &[ContentItem]) -> ListerResult<()> {
    let mut seen = HashSet::new();
    for item in items {
        if !seen.insert((item.content_type, item.slug.as_str())) {
            return Err(ListerError::store_unavailable(format!(
                "{} 的别名 {} 重复 (条目 {})",
                item.content_type, item.slug, item.id
            )));
        }
    }
    Ok(())
}
