use tracing::{debug, error, warn};

use crate::core::error::{ListerError, ListerResult};
use crate::core::store::ContentStore;
use crate::models::{ContentItem, ContentQuery, FieldMap, FieldValue, Fragment, ListResult};
use crate::theme::views::ViewRegistry;

/// 内容列表组件：按查询取出有限数量的条目，再通过各类型的视图渲染。
///
/// 组件本身没有状态，每次调用都是一次全新的前 N 条查询，不保留分页位置。
pub struct ContentLister<'a> {
    store: &'a dyn ContentStore,
    views: &'a ViewRegistry,
}

impl<'a> ContentLister<'a> {
    pub fn new(store: &'a dyn ContentStore, views: &'a ViewRegistry) -> Self {
        Self { store, views }
    }

    /// 执行查询。空结果不是错误；`limit` 是返回数量的硬上限。
    pub fn list(&self, query: &ContentQuery) -> ListerResult<ListResult> {
        query.validate().map_err(ListerError::invalid_query)?;

        let mut items = self.store.query(query)?;
        items.truncate(query.limit);

        debug!(
            "查询 {} (limit {}, {:?}) 返回 {} 个条目",
            query.content_type,
            query.limit,
            query.order,
            items.len()
        );
        Ok(ListResult::new(items))
    }

    /// 解析字段。单个字段解析失败时记为 `Empty`，不影响其他字段
    pub fn resolve_fields(&self, item: &ContentItem, names: &[&str]) -> FieldMap {
        names
            .iter()
            .map(|name| {
                let value = match self.store.resolve_field(item, name) {
                    Ok(value) => value,
                    Err(e) if e.is_fatal() => {
                        warn!("条目 {} 的字段 {} 解析失败: {}", item.id, name, e);
                        FieldValue::Empty
                    }
                    Err(e) => {
                        debug!("{}", e);
                        FieldValue::Empty
                    }
                };
                (name.to_string(), value)
            })
            .collect()
    }

    /// 渲染单个条目。门控字段为空时跳过该条目并返回 `None`
    pub fn render_item(&self, item: &ContentItem) -> ListerResult<Option<Fragment>> {
        let view = self.views.get(item.content_type).ok_or_else(|| {
            ListerError::invalid_query(format!("没有为 {} 注册视图", item.content_type))
        })?;

        let fields = self.resolve_fields(item, &view.field_names());

        if let Some(gate) = view
            .gates()
            .iter()
            .find(|gate| fields.get(gate.as_str()).map_or(true, FieldValue::is_empty))
        {
            debug!("条目 {} ({}) 的门控字段 {} 为空，跳过", item.id, item.title, gate);
            return Ok(None);
        }

        view.renderer().render(item, &fields).map(Some)
    }

    /// 执行查询并渲染每个条目
    pub fn render(&self, query: &ContentQuery) -> ListerResult<Vec<Fragment>> {
        let result = self.list(query)?;
        let mut fragments = Vec::with_capacity(result.len());
        for item in &result {
            if let Some(fragment) = self.render_item(item)? {
                fragments.push(fragment);
            }
        }
        Ok(fragments)
    }

    /// 渲染页面中的一个区块。致命错误只影响本区块：记录日志并返回空片段
    pub fn render_section(&self, name: &str, query: &ContentQuery) -> Fragment {
        match self.render(query) {
            Ok(fragments) => Fragment::concat(fragments),
            Err(e) => {
                error!("区块 {} 渲染失败: {}", name, e);
                Fragment::empty()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use crate::models::{ContentType, ImageRef};
    use crate::theme::views::View;
    use chrono::{Duration, TimeZone, Utc};

    /// 每次查询都返回超过 limit 的条目
    struct GreedyStore(MemoryStore);

    impl ContentStore for GreedyStore {
        fn query(&self, _query: &ContentQuery) -> ListerResult<Vec<ContentItem>> {
            Ok(self.0.items().to_vec())
        }

        fn find(&self, content_type: ContentType, slug: &str) -> ListerResult<Option<ContentItem>> {
            self.0.find(content_type, slug)
        }
    }

    /// 字段解析总是失败的存储
    struct BrokenFieldStore(MemoryStore);

    impl ContentStore for BrokenFieldStore {
        fn query(&self, query: &ContentQuery) -> ListerResult<Vec<ContentItem>> {
            self.0.query(query)
        }

        fn find(&self, content_type: ContentType, slug: &str) -> ListerResult<Option<ContentItem>> {
            self.0.find(content_type, slug)
        }

        fn resolve_field(&self, _item: &ContentItem, _name: &str) -> ListerResult<FieldValue> {
            Err(ListerError::store_unavailable("field backend down"))
        }
    }

    fn posts(count: u64) -> MemoryStore {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let items = (1..=count)
            .map(|i| ContentItem::new(i, ContentType::Post, format!("Post {}", i), base + Duration::hours(i as i64)))
            .collect();
        MemoryStore::new(items, Vec::new())
    }

    fn title_views() -> ViewRegistry {
        ViewRegistry::new().with(
            ContentType::Post,
            View::new(|item: &ContentItem, fields: &FieldMap| {
                let subtitle = fields.get("subtitle").and_then(FieldValue::as_text).unwrap_or("-");
                Ok::<_, ListerError>(Fragment::new(format!("{}|{}", item.title, subtitle)))
            })
            .with_fields(["subtitle"]),
        )
    }

    #[test]
    fn limit_is_enforced_even_if_store_over_returns() {
        let store = GreedyStore(posts(6));
        let views = title_views();
        let lister = ContentLister::new(&store, &views);
        let result = lister.list(&ContentQuery::new(ContentType::Post, 2)).unwrap();
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn invalid_query_is_reported_before_touching_store() {
        let store = posts(1);
        let views = title_views();
        let lister = ContentLister::new(&store, &views);
        let err = lister.list(&ContentQuery::new(ContentType::Post, 0)).unwrap_err();
        assert!(matches!(err, ListerError::InvalidQuery { .. }));
    }

    #[test]
    fn field_failures_degrade_to_empty() {
        let store = BrokenFieldStore(posts(2));
        let views = title_views();
        let lister = ContentLister::new(&store, &views);
        let fragments = lister.render(&ContentQuery::new(ContentType::Post, 5)).unwrap();
        let html: Vec<&str> = fragments.iter().map(Fragment::as_str).collect();
        assert_eq!(html, vec!["Post 2|-", "Post 1|-"]);
    }

    #[test]
    fn missing_view_is_fatal_to_render() {
        let store = posts(1);
        let views = ViewRegistry::new();
        let lister = ContentLister::new(&store, &views);
        assert!(lister.render(&ContentQuery::new(ContentType::Post, 1)).is_err());
        assert!(lister
            .render_section("latest", &ContentQuery::new(ContentType::Post, 1))
            .is_empty());
    }

    #[test]
    fn gate_uses_thumbnail_field() {
        let date = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let store = MemoryStore::new(
            vec![
                ContentItem::new(1, ContentType::Post, "With", date)
                    .with_featured_image(ImageRef::new("/a.png")),
                ContentItem::new(2, ContentType::Post, "Without", date),
            ],
            Vec::new(),
        );
        let views = ViewRegistry::new().with(
            ContentType::Post,
            View::new(|item: &ContentItem, _: &FieldMap| Ok::<_, ListerError>(Fragment::new(item.title.clone())))
                .with_gates(["thumbnail"]),
        );
        let lister = ContentLister::new(&store, &views);
        let fragments = lister.render(&ContentQuery::new(ContentType::Post, 5)).unwrap();
        assert_eq!(fragments, vec![Fragment::new("With")]);
    }
}
