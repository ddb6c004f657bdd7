use anyhow::{Context, Result};
use serde::Serialize;
use tera::Context as TeraContext;
use tracing::{debug, info};

use crate::core::lister::ContentLister;
use crate::core::store::ContentStore;
use crate::models::{Config, ContentFilter, ContentItem, ContentQuery, ContentType};
use crate::theme::renderer::ThemeRenderer;
use crate::theme::views::ViewRegistry;

/// 页面外壳模板
pub const LAYOUT_TEMPLATE: &str = "layout.html";

/// 页面类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    Home,
    Listing,
    Single,
}

/// 渲染后的页面
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// 站内路径
    pub path: String,
    pub html: String,
}

#[derive(Debug, Serialize)]
struct SiteInfo<'a> {
    title: &'a str,
    subtitle: Option<&'a str>,
    description: Option<&'a str>,
    url: &'a str,
    root: String,
}

#[derive(Debug, Serialize)]
struct RenderedSection {
    name: String,
    title: Option<String>,
    html: String,
}

/// 页面组合器：每个页面由若干“查询 + 渲染”区块拼接而成
pub struct PageComposer<'a> {
    store: &'a dyn ContentStore,
    listing_views: &'a ViewRegistry,
    single_views: &'a ViewRegistry,
    theme: &'a ThemeRenderer,
    config: &'a Config,
}

impl<'a> PageComposer<'a> {
    pub fn new(
        store: &'a dyn ContentStore,
        listing_views: &'a ViewRegistry,
        single_views: &'a ViewRegistry,
        theme: &'a ThemeRenderer,
        config: &'a Config,
    ) -> Self {
        Self {
            store,
            listing_views,
            single_views,
            theme,
            config,
        }
    }

    fn lister(&self) -> ContentLister<'a> {
        ContentLister::new(self.store, self.listing_views)
    }

    /// 首页：按配置顺序渲染所有区块
    pub fn home(&self) -> Result<String> {
        let lister = self.lister();
        let sections = self
            .config
            .home
            .iter()
            .map(|section| RenderedSection {
                name: section.name.clone(),
                title: section.title.clone(),
                html: lister.render_section(&section.name, &section.query).into_string(),
            })
            .collect();
        self.layout(PageKind::Home, None, sections)
    }

    /// 列表页，别名未配置时返回 `None`
    pub fn listing(&self, slug: &str) -> Result<Option<String>> {
        let Some(listing) = self.config.listings.get(slug) else {
            return Ok(None);
        };
        let html = self.lister().render_section(slug, &listing.query).into_string();
        let section = RenderedSection {
            name: slug.to_string(),
            title: Some(listing.title.clone()),
            html,
        };
        self.layout(PageKind::Listing, Some(&listing.title), vec![section])
            .map(Some)
    }

    /// 单条目页面，条目不存在或被门控字段过滤时返回 `None`
    pub fn single(&self, content_type: ContentType, slug: &str) -> Result<Option<String>> {
        let Some(item) = self
            .store
            .find(content_type, slug)
            .with_context(|| format!("查找 {} {} 失败", content_type, slug))?
        else {
            return Ok(None);
        };
        self.render_single(&item)
    }

    fn render_single(&self, item: &ContentItem) -> Result<Option<String>> {
        let single = ContentLister::new(self.store, self.single_views);
        let Some(fragment) = single
            .render_item(item)
            .with_context(|| format!("渲染条目 {} 失败", item.id))?
        else {
            debug!("条目 {} 被门控字段过滤", item.id);
            return Ok(None);
        };

        let mut sections = vec![RenderedSection {
            name: item.content_type.to_string(),
            title: None,
            html: fragment.into_string(),
        }];

        if let Some(limit) = self.config.related.get(&item.content_type) {
            let query = ContentQuery::new(item.content_type, *limit)
                .with_filter(ContentFilter::not_in([item.id]));
            let name = format!("related-{}", item.content_type);
            sections.push(RenderedSection {
                html: self.lister().render_section(&name, &query).into_string(),
                name,
                title: None,
            });
        }

        self.layout(PageKind::Single, Some(&item.title), sections)
            .map(Some)
    }

    /// 站点的所有页面：首页、列表页和每个条目的单独页面
    pub fn all_pages(&self) -> Result<Vec<RenderedPage>> {
        let root = self.config.root_path();
        let mut pages = vec![RenderedPage {
            path: root.clone(),
            html: self.home()?,
        }];

        for slug in self.config.listings.keys() {
            if let Some(html) = self.listing(slug)? {
                pages.push(RenderedPage {
                    path: format!("{}{}/", root, slug),
                    html,
                });
            }
        }

        for content_type in ContentType::ALL {
            let items = self
                .store
                .query(&ContentQuery::new(content_type, usize::MAX))
                .with_context(|| format!("查询 {} 失败", content_type))?;
            for item in items {
                if let Some(html) = self.render_single(&item)? {
                    pages.push(RenderedPage {
                        path: item.path.clone(),
                        html,
                    });
                }
            }
        }

        info!("共渲染 {} 个页面", pages.len());
        Ok(pages)
    }

    fn layout(
        &self,
        kind: PageKind,
        title: Option<&str>,
        sections: Vec<RenderedSection>,
    ) -> Result<String> {
        let site = SiteInfo {
            title: &self.config.title,
            subtitle: self.config.subtitle.as_deref(),
            description: self.config.description.as_deref(),
            url: &self.config.url,
            root: self.config.root_path(),
        };

        let mut context = TeraContext::new();
        context.insert("site", &site);
        context.insert("page_kind", &kind);
        context.insert("page_title", &title);
        context.insert("sections", &sections);

        self.theme.render_template(LAYOUT_TEMPLATE, &context)
    }
}
