use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use anyhow::{Context, Result};

use crate::models::types::{Category, ContentQuery, ContentType};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub url: String,
    pub root: String,
    /// 永久链接格式，支持 :type :year :month :day :title
    pub permalink: String,
    pub source_dir: String,
    pub public_dir: String,
    /// 覆盖内置模板的主题目录
    pub theme_dir: Option<String>,
    pub categories: Vec<Category>,
    /// 列表视图配置
    pub views: BTreeMap<ContentType, ViewConfig>,
    /// 单条目页面视图配置
    pub single_views: BTreeMap<ContentType, ViewConfig>,
    /// 首页区块
    pub home: Vec<SectionConfig>,
    /// 列表页面，键为URL别名
    pub listings: BTreeMap<String, ListingConfig>,
    /// 单条目页面下方“更多”区块的条目数
    pub related: BTreeMap<ContentType, usize>,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// 需要解析的字段
    pub fields: Option<Vec<String>>,
    /// 门控字段：任一为空时跳过整个条目
    pub gates: Option<Vec<String>>,
    /// 自定义模板名
    pub template: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionConfig {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    pub query: ContentQuery,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    pub title: String,
    pub query: ContentQuery,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 4000 }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "My Site".to_string(),
            subtitle: None,
            description: None,
            url: "http://localhost:4000".to_string(),
            root: "/".to_string(),
            permalink: ":type/:title/".to_string(),
            source_dir: "source".to_string(),
            public_dir: "public".to_string(),
            theme_dir: None,
            categories: Vec::new(),
            views: BTreeMap::new(),
            single_views: BTreeMap::new(),
            home: Vec::new(),
            listings: BTreeMap::new(),
            related: BTreeMap::new(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("解析配置文件失败: {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 加载配置，文件不存在时使用默认配置
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// 检查配置中的所有查询
    pub fn validate(&self) -> Result<()> {
        for section in &self.home {
            section
                .query
                .validate()
                .map_err(|e| anyhow::anyhow!("首页区块 {} 的查询无效: {}", section.name, e))?;
        }
        for (slug, listing) in &self.listings {
            listing
                .query
                .validate()
                .map_err(|e| anyhow::anyhow!("列表页 {} 的查询无效: {}", slug, e))?;
        }
        if let Some((content_type, _)) = self.related.iter().find(|(_, limit)| **limit == 0) {
            anyhow::bail!("{} 的相关条目数必须大于 0", content_type);
        }
        Ok(())
    }

    /// 站点根路径，保证以斜杠开头和结尾
    pub fn root_path(&self) -> String {
        crate::utils::ensure_trailing_slash(&crate::utils::ensure_leading_slash(&self.root))
    }
}
