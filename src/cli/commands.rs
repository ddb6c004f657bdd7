use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use content_lister::core::{file_store, ContentStore, Engine};
use content_lister::models::{CategoryRef, ContentFilter, ContentQuery, ContentType, SortOrder};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// 指定站点目录
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 初始化新的站点
    Init(InitArgs),

    /// 列出匹配查询的条目
    List(QueryArgs),

    /// 渲染匹配查询的条目并输出HTML片段
    Render(QueryArgs),

    /// 生成静态文件
    Generate,

    /// 启动本地服务器
    Server(ServerArgs),

    /// 清理生成的文件
    Clean,
}

#[derive(Args)]
pub struct InitArgs {
    /// 站点目录名称
    #[arg(value_name = "NAME")]
    pub name: String,

    /// 站点标题
    #[arg(short, long)]
    pub title: Option<String>,
}

#[derive(Args)]
pub struct QueryArgs {
    /// 内容类型：event、employee、slide、page、post
    #[arg(value_name = "TYPE")]
    pub content_type: ContentType,

    /// 返回条目数上限
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// 按分类过滤（ID 或别名）
    #[arg(short, long)]
    pub category: Option<CategoryRef>,

    /// 只取指定 ID 的条目
    #[arg(long)]
    pub id: Option<u64>,

    /// 排除的条目 ID，逗号分隔
    #[arg(long, value_delimiter = ',')]
    pub not_in: Vec<u64>,

    /// 最早的条目在前
    #[arg(short, long)]
    pub ascending: bool,
}

impl QueryArgs {
    fn to_query(&self) -> ContentQuery {
        let filter = ContentFilter {
            category: self.category.clone(),
            id: self.id,
            not_in: self.not_in.iter().copied().collect(),
        };
        let mut query = ContentQuery::new(self.content_type, self.limit);
        if filter != ContentFilter::default() {
            query = query.with_filter(filter);
        }
        if self.ascending {
            query = query.with_order(SortOrder::Ascending);
        }
        query
    }
}

#[derive(Args)]
pub struct ServerArgs {
    /// 服务器端口，默认使用配置中的端口
    #[arg(short, long)]
    pub port: Option<u16>,
}

// 嵌入的默认配置模板
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# 站点信息
title: {title}
subtitle: 'A content-lister site'
url: http://localhost:4000
root: /
permalink: :type/:title/

# 目录配置
source_dir: source
public_dir: public
theme_dir: themes/default

# 分类
categories:
  - { id: 1, name: News, slug: news }
  - { id: 2, name: Workshops, slug: workshops }

# 视图：字段和门控字段
views:
  slide:
    fields: [image, caption, link]
    gates: [image]

# 首页区块
home:
  - name: slider
    query: { type: slide, limit: 5 }
  - name: events
    title: Upcoming events
    query: { type: event, limit: 3 }
  - name: news
    title: News
    query: { type: post, limit: 3, filter: { category: news } }

# 列表页
listings:
  events:
    title: Events
    query: { type: event, limit: 20 }
  staff:
    title: Our team
    query: { type: employee, limit: 50, order: ascending }
  news:
    title: News
    query: { type: post, limit: 10 }

# 单条目页面下方的更多条目
related:
  event: 3
  post: 3

server:
  port: 4000
"#;

// 嵌入的示例内容
const SAMPLE_CONTENT: &[(&str, &str)] = &[
    ("_slides/welcome.md", "---\ntitle: Welcome\nimage: { url: /images/welcome.jpg, width: 1200, height: 400 }\ncaption: Welcome to our site\nlink: /events/\n---\n"),
    ("_slides/draft.md", "---\ntitle: Draft slide\ncaption: This slide has no image and is not shown\n---\n"),
    ("_events/open-day.md", "---\ntitle: Open Day\ndate: 2024-05-01 10:00:00\ncategories: [workshops]\nlocation: Main Hall\nstart_date: 1 May 2024\n---\n\nJoin us for our open day.\n"),
    ("_employees/ada.md", "---\ntitle: Ada Lovelace\ndate: 2020-01-01 09:00:00\nposition: Analyst\nemail: ada@example.com\n---\n\nAda works on the analytical engine.\n"),
    ("_employees/charles.md", "---\ntitle: Charles Babbage\ndate: 2021-01-01 09:00:00\nposition: Engineer\nemail: ''\n---\n\nCharles designs engines.\n"),
    ("_posts/hello-world.md", "---\ntitle: Hello World\ndate: 2024-01-01 12:00:00\ncategories: [news]\nexcerpt: Our first post.\n---\n\n# Hello\n\nThis is the first post.\n"),
    ("_pages/about.md", "---\ntitle: About\n---\n\nAbout this site.\n"),
];

const STYLE_CSS: &str = include_str!("../../embed/theme/source/css/style.css");

// 初始化网站文件结构，包括配置文件、示例内容和主题资源
fn initialize_site_structure(site_path: &Path, site_title: &str) -> Result<()> {
    let source_dir = site_path.join("source");
    let css_dir = site_path.join("themes").join("default").join("source").join("css");
    fs::create_dir_all(&source_dir)?;
    fs::create_dir_all(&css_dir)?;

    // 创建默认配置文件
    let config_content = DEFAULT_CONFIG_TEMPLATE.replace("{title}", site_title);
    fs::write(site_path.join("_config.yml"), config_content)?;

    // 创建示例内容
    for (relative, content) in SAMPLE_CONTENT {
        let target = source_dir.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(target, content)?;
    }

    fs::write(css_dir.join("style.css"), STYLE_CSS)?;
    Ok(())
}

/// 执行命令
pub async fn execute(cli: Cli) -> Result<()> {
    let site_path = cli.path.clone();

    match cli.command {
        Commands::Init(args) => {
            // 使用提供的目录名称
            let site_path = site_path.join(&args.name);

            if site_path.exists() && site_path.read_dir()?.next().is_some() {
                bail!("目录不为空: {}", site_path.display());
            }

            fs::create_dir_all(&site_path)?;
            let site_title = args.title.unwrap_or_else(|| args.name.clone());
            initialize_site_structure(&site_path, &site_title)?;

            info!("Initialized new site at: {}", site_path.display());
        }
        Commands::List(args) => {
            let engine = Engine::new(site_path)?;
            let result = engine.list(&args.to_query())?;

            if result.is_empty() {
                println!("{}", "没有匹配的条目".yellow());
            }
            for item in &result {
                println!(
                    "{:>5}  {}  {}  {}",
                    item.id.to_string().bright_green(),
                    item.date.format("%Y-%m-%d"),
                    item.title.bold(),
                    engine.store.permalink(item).dimmed()
                );
            }
        }
        Commands::Render(args) => {
            let engine = Engine::new(site_path)?;
            for fragment in engine.render(&args.to_query())? {
                println!("{}", fragment);
            }
        }
        Commands::Generate => {
            let engine = Engine::new(site_path)?;
            for (content_type, count) in file_store::summarize(&engine.store)? {
                println!("  {:<10} {}", content_type.to_string().bright_white(), count);
            }
            let count = engine.generate(&engine.public_dir)?;
            println!("{} {}", "已生成页面:".bright_green(), count);
        }
        Commands::Server(args) => {
            let engine = Engine::new(site_path)?;
            let port = args.port.unwrap_or(engine.config.server.port);
            engine.server(port).await?;
        }
        Commands::Clean => {
            let engine = Engine::new(site_path)?;
            engine.clean()?;
        }
    }

    Ok(())
}
