use chrono::{DateTime, Utc};
use std::path::Path;
use url::Url;

/// 从标题生成 URL 友好的别名
pub fn slugify(text: &str) -> String {
    slug::slugify(text)
}

/// 从类型、日期和别名创建站内路径
pub fn create_permalink(
    content_type: &str,
    date: &DateTime<Utc>,
    slug: &str,
    pattern: &str,
) -> String {
    let path = pattern
        .replace(":type", content_type)
        .replace(":year", &date.format("%Y").to_string())
        .replace(":month", &date.format("%m").to_string())
        .replace(":day", &date.format("%d").to_string())
        .replace(":title", slug);

    ensure_leading_slash(&path)
}

/// 将站内路径拼接到站点URL上，站点URL无效时原样返回路径
pub fn absolute_url(site_url: &str, root: &str, path: &str) -> String {
    let base = ensure_trailing_slash(&format!(
        "{}{}",
        site_url.trim_end_matches('/'),
        ensure_leading_slash(root)
    ));
    match Url::parse(&base).and_then(|base| base.join(path.trim_start_matches('/'))) {
        Ok(url) => url.to_string(),
        Err(_) => path.to_string(),
    }
}

/// 检查文件是否为 Markdown 文件
pub fn is_markdown_file<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    if let Some(ext) = path.extension() {
        ext == "md" || ext == "markdown"
    } else {
        false
    }
}

/// 确保路径以斜杠结尾
pub fn ensure_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

/// 确保路径以斜杠开头
pub fn ensure_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

pub mod markdown;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn permalink_pattern_placeholders() {
        let date = Utc.with_ymd_and_hms(2024, 3, 7, 10, 0, 0).unwrap();
        assert_eq!(
            create_permalink("event", &date, "open-day", ":type/:year/:month/:title/"),
            "/event/2024/03/open-day/"
        );
    }

    #[test]
    fn absolute_url_respects_root() {
        assert_eq!(
            absolute_url("http://example.com", "/blog/", "/event/open-day/"),
            "http://example.com/blog/event/open-day/"
        );
        assert_eq!(
            absolute_url("http://example.com/", "/", "post/hello/"),
            "http://example.com/post/hello/"
        );
    }

    #[test]
    fn markdown_extension_check() {
        assert!(is_markdown_file("a/b.md"));
        assert!(!is_markdown_file("a/b.html"));
    }
}
