use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context as AnyhowContext, Result};
use tracing::{info, warn};

use crate::core::file_store::FileStore;
use crate::core::lister::ContentLister;
use crate::core::page::PageComposer;
use crate::core::store::ContentStore;
use crate::models::config::Config;
use crate::models::{ContentQuery, Fragment, ListResult};
use crate::theme::renderer::ThemeRenderer;
use crate::theme::views::{ViewMode, ViewRegistry};

/// 站点引擎：把配置、内容存储、主题和视图绑定在一起
#[derive(Clone)]
pub struct Engine {
    /// 基础目录
    pub base_dir: PathBuf,
    /// 公共目录（输出）
    pub public_dir: PathBuf,
    /// 站点配置
    pub config: Arc<Config>,
    /// 内容存储
    pub store: Arc<FileStore>,
    /// 主题渲染器
    pub theme: Arc<ThemeRenderer>,
    /// 列表视图
    pub listing_views: Arc<ViewRegistry>,
    /// 单条目视图
    pub single_views: Arc<ViewRegistry>,
}

impl Engine {
    /// 创建一个新的引擎实例
    pub fn new(base_dir: PathBuf) -> Result<Self> {
        info!("初始化引擎...");
        info!("工作目录: {}", base_dir.display());

        // 配置文件
        let config_path = base_dir.join("_config.yml");
        if !config_path.exists() {
            warn!("未找到 {}，使用默认配置", config_path.display());
        }
        let config = Config::load(&config_path)?;

        Self::with_config(base_dir, config)
    }

    /// 使用给定配置创建引擎
    pub fn with_config(base_dir: PathBuf, config: Config) -> Result<Self> {
        let public_dir = base_dir.join(&config.public_dir);
        let store = FileStore::from_config(&base_dir, &config);

        let theme_dir = config.theme_dir.as_ref().map(|dir| base_dir.join(dir));
        let theme = Arc::new(ThemeRenderer::new(theme_dir.as_deref())?);

        let listing_views = ViewRegistry::from_config(theme.clone(), &config.views, ViewMode::Listing)
            .context("创建列表视图失败")?;
        let single_views = ViewRegistry::from_config(theme.clone(), &config.single_views, ViewMode::Single)
            .context("创建单条目视图失败")?;

        Ok(Self {
            base_dir,
            public_dir,
            config: Arc::new(config),
            store: Arc::new(store),
            theme,
            listing_views: Arc::new(listing_views),
            single_views: Arc::new(single_views),
        })
    }

    pub fn lister(&self) -> ContentLister<'_> {
        ContentLister::new(self.store.as_ref(), &self.listing_views)
    }

    pub fn composer(&self) -> PageComposer<'_> {
        self.composer_over(self.store.as_ref())
    }

    /// 在给定的存储上组合页面
    pub fn composer_over<'a>(&'a self, store: &'a dyn ContentStore) -> PageComposer<'a> {
        PageComposer::new(
            store,
            &self.listing_views,
            &self.single_views,
            &self.theme,
            &self.config,
        )
    }

    /// 读取一次源文件目录，所有区块共享同一份快照。
    /// 读取失败时退回到直接查询存储，由各区块自行隔离错误。
    pub fn with_snapshot<T>(&self, render: impl FnOnce(&PageComposer<'_>) -> Result<T>) -> Result<T> {
        match self.store.snapshot() {
            Ok(snapshot) => render(&self.composer_over(&snapshot)),
            Err(e) => {
                warn!("读取内容失败: {}", e);
                render(&self.composer())
            }
        }
    }

    /// 执行查询
    pub fn list(&self, query: &ContentQuery) -> Result<ListResult> {
        self.lister()
            .list(query)
            .with_context(|| format!("查询 {} 失败", query.content_type))
    }

    /// 执行查询并渲染片段
    pub fn render(&self, query: &ContentQuery) -> Result<Vec<Fragment>> {
        self.lister()
            .render(query)
            .with_context(|| format!("渲染 {} 失败", query.content_type))
    }

    /// 生成静态文件
    pub fn generate(&self, output_dir: &Path) -> Result<usize> {
        info!("开始生成静态网站...");

        fs::create_dir_all(output_dir)
            .with_context(|| format!("创建目录失败: {}", output_dir.display()))?;

        let snapshot = self
            .store
            .snapshot()
            .with_context(|| format!("读取源文件失败: {}", self.store.source_dir.display()))?;
        let pages = self.composer_over(&snapshot).all_pages()?;
        let root = self.config.root_path();
        for page in &pages {
            let relative = page.path.strip_prefix(&root).unwrap_or(&page.path);
            let relative = Path::new(relative.trim_matches('/'));
            // 页面路径只能落在输出目录内
            if relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
            {
                bail!("页面路径越出输出目录: {}", page.path);
            }
            let target = output_dir.join(relative).join("index.html");
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, &page.html)
                .with_context(|| format!("写入文件失败: {}", target.display()))?;
        }

        self.copy_theme_assets(output_dir)?;

        info!("生成了 {} 个页面到 {}", pages.len(), output_dir.display());
        Ok(pages.len())
    }

    /// 复制主题的静态资源（theme_dir/source）
    fn copy_theme_assets(&self, output_dir: &Path) -> Result<()> {
        let Some(source) = self.theme_source_dir() else {
            return Ok(());
        };
        for entry in walkdir::WalkDir::new(&source) {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let target = output_dir.join(path.strip_prefix(&source)?);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &target)
                .with_context(|| format!("复制资源失败: {}", path.display()))?;
        }
        Ok(())
    }

    /// 主题静态资源目录
    pub fn theme_source_dir(&self) -> Option<PathBuf> {
        self.theme
            .theme_dir
            .as_ref()
            .map(|dir| dir.join("source"))
            .filter(|dir| dir.is_dir())
    }

    /// 清理生成的文件
    pub fn clean(&self) -> Result<()> {
        if self.public_dir.exists() {
            info!("清理生成的文件: {}", self.public_dir.display());
            fs::remove_dir_all(&self.public_dir)
                .with_context(|| format!("删除目录失败: {}", self.public_dir.display()))?;
        }
        Ok(())
    }

    /// 启动本地服务器
    pub async fn server(&self, port: u16) -> Result<()> {
        let server = super::server::Server::new(self.clone(), port);
        info!("启动Web服务器在 http://localhost:{}", port);
        server.start().await
    }
}
