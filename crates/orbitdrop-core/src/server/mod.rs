//! HTTP 服务
//!
//! 手机浏览器直接访问的上传服务。
//!
//! # 路由
//!
//! - `GET /` 移动端上传页，`GET /desktop` 桌面看板页
//! - `POST /upload` multipart 文件批次
//! - `GET /status` 文件清单与全部会话进度
//! - `GET /progress/:session_id` 单个会话进度
//! - `GET /uploads/*path` 回读已存文件

pub mod routes;
pub mod wire;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use log::{error, info};
use tokio::net::TcpListener;

use crate::config::AppSettings;
use crate::ingest::IngestService;
use crate::net;
use crate::session::UploadTracker;

/// 注入到所有请求处理器的共享状态
#[derive(Clone)]
pub struct AppState {
    pub ingest: IngestService,
    pub tracker: UploadTracker,
    pub ip_address: String,
    pub max_upload_size: usize,
}

/// 上传服务器
pub struct UploadServer {
    settings: AppSettings,
    state: AppState,
    port: u16,
}

impl UploadServer {
    pub fn new(settings: AppSettings) -> Self {
        let tracker = UploadTracker::new(settings.max_sessions);
        let mut ingest = IngestService::new(settings.upload_dir.clone(), tracker.clone());
        if let Some(extensions) = &settings.allowed_extensions {
            ingest = ingest.with_allowed_extensions(extensions);
        }
        let state = AppState {
            ingest,
            tracker,
            ip_address: net::local_ip_string(),
            max_upload_size: settings.max_upload_size,
        };
        let port = settings.listen_port;
        Self {
            settings,
            state,
            port,
        }
    }

    /// 实际监听端口（`start` 之后才是绑定到的端口）
    pub fn port(&self) -> u16 {
        self.port
    }

    /// 手机端应打开的地址
    pub fn connect_url(&self) -> String {
        format!("http://{}:{}", self.state.ip_address, self.port)
    }

    /// 完整路由表
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// 启动服务器并转入后台，返回实际监听端口
    ///
    /// 端口配成 0 时由系统分配，测试用这个模式。
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        tokio::fs::create_dir_all(self.state.ingest.upload_root()).await?;

        let app = self.router();
        let listener = TcpListener::bind(("0.0.0.0", self.settings.listen_port)).await?;
        let port = listener.local_addr()?.port();
        self.port = port;

        info!("Upload server listening on port {}", port);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("Server error: {}", e);
            }
        });

        Ok(port)
    }

    /// 前台运行直到出错或进程退出
    pub async fn serve(self) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(self.state.ingest.upload_root()).await?;

        let listener = TcpListener::bind(("0.0.0.0", self.settings.listen_port)).await?;
        info!(
            "Upload server listening on http://{}:{}",
            self.state.ip_address,
            listener.local_addr()?.port()
        );

        let app = build_router(self.state);
        axum::serve(listener, app).await?;
        Ok(())
    }
}

fn build_router(state: AppState) -> Router {
    let body_limit = state.max_upload_size;
    Router::new()
        .route("/", get(routes::index_page))
        .route("/desktop", get(routes::desktop_page))
        .route("/upload", post(routes::handle_upload))
        .route("/status", get(routes::handle_status))
        .route("/progress/:session_id", get(routes::handle_progress))
        .route("/uploads/*path", get(routes::handle_stored_file))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
