use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::core::engine::Engine;
use crate::models::ContentType;

/// HTTP 预览服务器：每个请求读取一次内容存储并渲染页面
pub struct Server {
    engine: Engine,
    /// 端口
    port: u16,
}

impl Server {
    /// 创建新的服务器
    pub fn new(engine: Engine, port: u16) -> Self {
        Self { engine, port }
    }

    /// 构建路由
    pub fn router(engine: Engine) -> Router {
        let mut router = Router::new()
            .route("/", get(home))
            .route("/:listing/", get(listing))
            .route("/:content_type/:slug/", get(single));

        // 提供主题静态资源
        router = match engine.theme_source_dir() {
            Some(dir) => router.fallback_service(ServeDir::new(dir)),
            None => router.fallback(not_found),
        };

        router.layer(TraceLayer::new_for_http()).with_state(engine)
    }

    /// 启动服务器
    pub async fn start(self) -> Result<()> {
        let app = Self::router(self.engine);

        let addr: SocketAddr = format!("0.0.0.0:{}", self.port).parse()?;
        info!("Server started at http://localhost:{}", self.port);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// 在阻塞线程池中渲染页面，`None` 表示页面不存在
async fn render_page<F>(engine: Engine, render: F) -> Response
where
    F: FnOnce(&Engine) -> Result<Option<String>> + Send + 'static,
{
    match tokio::task::spawn_blocking(move || render(&engine)).await {
        Ok(Ok(Some(html))) => Html(html).into_response(),
        Ok(Ok(None)) => not_found().await.into_response(),
        Ok(Err(e)) => {
            error!("页面渲染失败: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
        Err(e) => {
            error!("渲染任务失败: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

async fn home(State(engine): State<Engine>) -> Response {
    render_page(engine, |engine| engine.with_snapshot(|pages| pages.home().map(Some))).await
}

async fn listing(State(engine): State<Engine>, Path(slug): Path<String>) -> Response {
    render_page(engine, move |engine| engine.with_snapshot(|pages| pages.listing(&slug))).await
}

async fn single(
    State(engine): State<Engine>,
    Path((content_type, slug)): Path<(String, String)>,
) -> Response {
    let Ok(content_type) = content_type.parse::<ContentType>() else {
        return not_found().await.into_response();
    };
    render_page(engine, move |engine| {
        engine.with_snapshot(|pages| pages.single(content_type, &slug))
    })
    .await
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Config;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn engine(dir: &std::path::Path) -> Engine {
        let events = dir.join("source/_events");
        std::fs::create_dir_all(&events).unwrap();
        std::fs::write(
            events.join("open-day.md"),
            "---\ntitle: Open Day\ndate: 2024-05-01 10:00:00\nlocation: Main Hall\n---\nCome along.\n",
        )
        .unwrap();
        let config = Config::from_yaml(
            "title: Test\nlistings:\n  events:\n    title: Events\n    query: { type: event, limit: 5 }\n",
        )
        .unwrap();
        Engine::with_config(dir.to_path_buf(), config).unwrap()
    }

    async fn get_path(router: Router, path: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn serves_listing_and_single_pages() {
        let dir = tempfile::tempdir().unwrap();
        let router = Server::router(engine(dir.path()));

        let (status, body) = get_path(router.clone(), "/events/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Open Day"));

        let (status, body) = get_path(router.clone(), "/event/open-day/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Come along."));
        assert!(body.contains("Main Hall"));
    }

    #[tokio::test]
    async fn unknown_pages_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let router = Server::router(engine(dir.path()));

        let (status, _) = get_path(router.clone(), "/nothing/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = get_path(router.clone(), "/widget/thing/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = get_path(router, "/event/missing/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn each_request_reads_source_once() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());
        let router = Server::router(engine.clone());

        let (status, _) = get_path(router.clone(), "/event/open-day/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(engine.store.load_count(), 1);

        let (status, _) = get_path(router, "/events/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(engine.store.load_count(), 2);
    }

    #[tokio::test]
    async fn missing_source_dir_still_serves_home() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::with_config(dir.path().to_path_buf(), Config::default()).unwrap();
        let (status, body) = get_path(Server::router(engine), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("My Site"));
    }
}
