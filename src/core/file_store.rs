use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use gray_matter::engine::YAML;
use gray_matter::{Matter, Pod};
use serde_yaml::{Mapping, Value};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::core::error::{ListerError, ListerResult};
use crate::core::store::{
    ensure_unique_ids, ensure_unique_slugs, ContentStore, MemoryStore, THUMBNAIL_FIELD,
};
use crate::models::{
    Category, CategoryRef, Config, ContentItem, ContentQuery, ContentType, FieldValue, ImageRef,
};
use crate::utils;

/// 前置元数据中有固定含义的键，其余键都作为自定义字段
const RESERVED_KEYS: &[&str] = &["id", "title", "slug", "date", "categories", THUMBNAIL_FIELD];

/// 基于源文件目录的内容存储。每次查询都会重新读取目录，
/// 因此外部对内容的修改在下一次请求时即可见。
#[derive(Debug, Clone)]
pub struct FileStore {
    /// 源文件目录
    pub source_dir: PathBuf,
    categories: Vec<Category>,
    permalink: String,
    site_url: String,
    root: String,
    /// 读取源文件目录的次数
    loads: Arc<AtomicUsize>,
}

/// 尚未分配 ID 的源文件
struct SourceDocument {
    content_type: ContentType,
    path: PathBuf,
    id: Option<u64>,
    front_matter: Mapping,
    body: String,
}

impl FileStore {
    pub fn new(source_dir: PathBuf, config: &Config) -> Self {
        Self {
            source_dir,
            categories: config.categories.clone(),
            permalink: config.permalink.clone(),
            site_url: config.url.clone(),
            root: config.root_path(),
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 源文件目录被完整读取的次数
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    /// 从基础目录和配置创建存储
    pub fn from_config(base_dir: &Path, config: &Config) -> Self {
        Self::new(base_dir.join(&config.source_dir), config)
    }

    /// 读取源文件目录，生成内存快照
    pub fn snapshot(&self) -> ListerResult<MemoryStore> {
        if !self.source_dir.is_dir() {
            return Err(ListerError::store_unavailable(format!(
                "源文件目录不存在: {}",
                self.source_dir.display()
            )));
        }

        let load = self.loads.fetch_add(1, Ordering::Relaxed) + 1;
        let mut documents = Vec::new();
        let matter = Matter::<YAML>::new();

        for content_type in ContentType::ALL {
            let dir = self.source_dir.join(content_type.source_dir_name());
            if !dir.exists() {
                continue;
            }
            for entry in WalkDir::new(&dir).sort_by_file_name() {
                let entry = entry.map_err(|e| {
                    ListerError::store_unavailable(format!("遍历目录失败: {}", e))
                })?;
                let path = entry.path();
                if !path.is_file() || !utils::is_markdown_file(path) {
                    continue;
                }
                documents.push(self.read_document(&matter, content_type, path)?);
            }
        }

        // 没有显式 ID 的条目按路径顺序排在最大 ID 之后
        let mut next_id = documents.iter().filter_map(|d| d.id).max().unwrap_or(0) + 1;
        let mut items = Vec::with_capacity(documents.len());
        for document in documents {
            let id = match document.id {
                Some(id) => id,
                None => {
                    let id = next_id;
                    next_id += 1;
                    id
                }
            };
            items.push(self.build_item(id, document)?);
        }
        ensure_unique_ids(&items)?;
        ensure_unique_slugs(&items)?;

        debug!(
            "从 {} 加载了 {} 个条目 (第 {} 次读取)",
            self.source_dir.display(),
            items.len(),
            load
        );
        Ok(MemoryStore::new(items, self.categories.clone()))
    }

    fn read_document(
        &self,
        matter: &Matter<YAML>,
        content_type: ContentType,
        path: &Path,
    ) -> ListerResult<SourceDocument> {
        let content = fs::read_to_string(path).map_err(|e| {
            ListerError::store_unavailable(format!("读取文件失败: {} - {}", path.display(), e))
        })?;
        let parsed = matter.parse(&content);

        let front_matter = match parsed.data.map(pod_to_value) {
            Some(Value::Mapping(mapping)) => mapping,
            Some(Value::Null) | None => Mapping::new(),
            Some(_) => {
                return Err(ListerError::store_unavailable(format!(
                    "前置元数据必须是映射: {}",
                    path.display()
                )))
            }
        };

        let id = match front_matter.get("id") {
            None | Some(Value::Null) => None,
            Some(value) => Some(value.as_u64().ok_or_else(|| {
                ListerError::store_unavailable(format!("无效的条目 ID: {}", path.display()))
            })?),
        };

        Ok(SourceDocument {
            content_type,
            path: path.to_path_buf(),
            id,
            front_matter,
            body: parsed.content,
        })
    }

    fn build_item(&self, id: u64, document: SourceDocument) -> ListerResult<ContentItem> {
        let SourceDocument {
            content_type,
            path,
            front_matter,
            body,
            ..
        } = document;

        let title = front_matter
            .get("title")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("Untitled")
                    .to_string()
            });
        // 别名会成为输出路径的一部分，显式指定的别名同样要规范化
        let slug = front_matter
            .get("slug")
            .and_then(Value::as_str)
            .map(utils::slugify)
            .filter(|slug| !slug.is_empty())
            .unwrap_or_else(|| utils::slugify(&title));
        if slug.is_empty() {
            return Err(ListerError::store_unavailable(format!(
                "无法为条目生成别名: {}",
                path.display()
            )));
        }
        let date = parse_date(front_matter.get("date"), &path)?;

        let site_path = utils::create_permalink(content_type.as_str(), &date, &slug, &self.permalink);
        let permalink = utils::absolute_url(&self.site_url, &self.root, &site_path);

        let categories = self.resolve_categories(front_matter.get("categories"), &path);
        let featured_image = front_matter.get(THUMBNAIL_FIELD).and_then(parse_image);

        let custom_fields = front_matter
            .iter()
            .filter_map(|(key, value)| {
                let key = key.as_str()?;
                if RESERVED_KEYS.contains(&key) {
                    return None;
                }
                Some((key.to_string(), FieldValue::from_yaml(value)))
            })
            .collect();

        Ok(ContentItem {
            id,
            content_type,
            title,
            slug,
            path: site_path,
            permalink,
            date,
            body: utils::markdown::render(&body),
            categories,
            featured_image,
            custom_fields,
        })
    }

    fn resolve_categories(&self, value: Option<&Value>, path: &Path) -> Vec<u64> {
        let refs: Vec<CategoryRef> = match value {
            Some(Value::Sequence(seq)) => seq.iter().filter_map(category_ref).collect(),
            Some(value) => category_ref(value).into_iter().collect(),
            None => Vec::new(),
        };

        refs.iter()
            .filter_map(|category| {
                let found = self.categories.iter().find(|c| c.matches(category));
                if found.is_none() {
                    warn!("{} 引用了未知的分类 {:?}", path.display(), category);
                }
                found.map(|c| c.id)
            })
            .collect()
    }
}

impl ContentStore for FileStore {
    fn query(&self, query: &ContentQuery) -> ListerResult<Vec<ContentItem>> {
        self.snapshot()?.query(query)
    }

    fn find(&self, content_type: ContentType, slug: &str) -> ListerResult<Option<ContentItem>> {
        self.snapshot()?.find(content_type, slug)
    }
}

/// 加载站点源文件并输出统计信息
pub fn summarize(store: &FileStore) -> ListerResult<Vec<(ContentType, usize)>> {
    let snapshot = store.snapshot()?;
    let counts = ContentType::ALL
        .iter()
        .map(|t| {
            let count = snapshot.items().iter().filter(|i| i.content_type == *t).count();
            (*t, count)
        })
        .collect();
    info!("内容存储: {}", store.source_dir.display());
    Ok(counts)
}

fn category_ref(value: &Value) -> Option<CategoryRef> {
    match value {
        Value::Number(n) => n.as_u64().map(CategoryRef::Id),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn parse_image(value: &Value) -> Option<ImageRef> {
    match FieldValue::from_yaml(value) {
        FieldValue::ImageRef(image) => Some(image),
        FieldValue::Text(url) => Some(ImageRef::new(url)),
        FieldValue::Empty => None,
    }
}

fn parse_date(value: Option<&Value>, path: &Path) -> ListerResult<DateTime<Utc>> {
    if let Some(date_str) = value.and_then(Value::as_str) {
        if let Ok(dt) = DateTime::parse_from_str(date_str, "%Y-%m-%d %H:%M:%S %z") {
            return Ok(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(date_str, "%Y-%m-%d %H:%M:%S") {
            return Ok(Utc.from_utc_datetime(&dt));
        }
        if let Ok(d) = chrono::NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return Ok(Utc.from_utc_datetime(&dt));
            }
        }
        warn!("无法解析日期 {:?}，使用文件修改时间: {}", date_str, path.display());
    }

    // 如果没有日期，使用文件的修改时间
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| {
            ListerError::store_unavailable(format!("读取文件元数据失败: {} - {}", path.display(), e))
        })?;
    Ok(modified.into())
}

// 工具函数：将Pod值转换为serde_yaml::Value
fn pod_to_value(pod: Pod) -> Value {
    match pod {
        Pod::String(s) => Value::String(s),
        Pod::Integer(i) => Value::Number(serde_yaml::Number::from(i)),
        Pod::Float(f) => Value::Number(serde_yaml::Number::from(f)),
        Pod::Boolean(b) => Value::Bool(b),
        Pod::Array(arr) => Value::Sequence(arr.into_iter().map(pod_to_value).collect()),
        Pod::Hash(map) => {
            let mut mapping = Mapping::new();
            for (k, v) in map {
                mapping.insert(Value::String(k), pod_to_value(v));
            }
            Value::Mapping(mapping)
        }
        Pod::Null => Value::Null,
    }
}
