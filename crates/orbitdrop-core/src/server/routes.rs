//! HTTP 请求处理器

use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use log::{debug, info, warn};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::ingest::{IncomingFile, IngestError};
use crate::server::AppState;
use crate::server::wire::{
    FailureResponse, NotStartedResponse, RejectionResponse, StatusResponse, UploadResponse,
};
use crate::storage::inventory;

/// 移动端上传页
const INDEX_PAGE: &str = include_str!("../../assets/index.html");
/// 桌面看板页
const DESKTOP_PAGE: &str = include_str!("../../assets/desktop.html");

pub(crate) async fn index_page() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

pub(crate) async fn desktop_page() -> Html<&'static str> {
    Html(DESKTOP_PAGE)
}

/// POST /upload: 接收一个 multipart 文件批次
pub(crate) async fn handle_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    // 声明长度超限的请求整体拒绝，一个字节都不读
    if let Some(length) = content_length(&headers) {
        if length > state.max_upload_size as u64 {
            warn!(
                "Rejecting upload: declared size {} exceeds limit {}",
                length, state.max_upload_size
            );
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(FailureResponse::new(format!(
                    "Request body exceeds the {} byte limit",
                    state.max_upload_size
                ))),
            )
                .into_response();
        }
    }

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    debug!("Upload request from {:?}", user_agent);

    let mut files = Vec::new();
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("files") {
                    continue;
                }
                let name = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(data) => files.push(IncomingFile { name, data }),
                    Err(e) => return multipart_failure(&e),
                }
            }
            Ok(None) => break,
            Err(e) => return multipart_failure(&e),
        }
    }

    match state.ingest.ingest(&user_agent, files).await {
        Ok(report) => {
            let message = report.message();
            Json(UploadResponse {
                success: true,
                session_id: report.session_id,
                device_folder: report.device_folder,
                message,
                files: report.files,
            })
            .into_response()
        }
        Err(IngestError::NoFiles) => (
            StatusCode::BAD_REQUEST,
            Json(RejectionResponse::new("No files provided")),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(FailureResponse::new(e.to_string())),
        )
            .into_response(),
    }
}

/// body 读取中途出错（断开或超限）按拒绝处理，此时还没有任何写盘
fn multipart_failure(e: &axum::extract::multipart::MultipartError) -> Response {
    warn!("Multipart read failed: {}", e);
    (
        StatusCode::BAD_REQUEST,
        Json(FailureResponse::new(e.to_string())),
    )
        .into_response()
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// GET /status: 文件清单加全部会话进度
pub(crate) async fn handle_status(State(state): State<AppState>) -> Response {
    let snapshot = match inventory::scan(state.ingest.upload_root()).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("Inventory scan failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FailureResponse::new(e.to_string())),
            )
                .into_response();
        }
    };

    let total_files = snapshot.total_files();
    Json(StatusResponse {
        ip_address: state.ip_address.clone(),
        connected: true,
        files: snapshot.files,
        device_folders: snapshot.device_folders,
        total_files,
        upload_progress: state.tracker.all().await,
    })
    .into_response()
}

/// GET /progress/:session_id: 单个会话进度，未知 id 给哨兵
pub(crate) async fn handle_progress(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.tracker.snapshot(&session_id).await {
        Some(progress) => Json(progress).into_response(),
        None => Json(NotStartedResponse::sentinel()).into_response(),
    }
}

/// GET /uploads/*path: 回读一个已存文件
///
/// 相对路径只允许普通片段，规范化后还必须落在上传根目录内。
pub(crate) async fn handle_stored_file(
    State(state): State<AppState>,
    Path(rel_path): Path<String>,
) -> Response {
    if rel_path
        .split(['/', '\\'])
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return invalid_path();
    }

    let root = match tokio::fs::canonicalize(state.ingest.upload_root()).await {
        Ok(root) => root,
        Err(_) => return not_found(),
    };
    let full = match tokio::fs::canonicalize(root.join(&rel_path)).await {
        Ok(full) => full,
        Err(_) => return not_found(),
    };
    if !full.starts_with(&root) {
        return invalid_path();
    }

    let is_file = tokio::fs::metadata(&full)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false);
    if !is_file {
        return not_found();
    }

    match File::open(&full).await {
        Ok(file) => {
            let mime = mime_guess::from_path(&full).first_or_octet_stream();
            info!("Serving stored file {}", rel_path);
            let body = Body::from_stream(ReaderStream::new(file));
            ([(header::CONTENT_TYPE, mime.to_string())], body).into_response()
        }
        Err(_) => not_found(),
    }
}

fn invalid_path() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(RejectionResponse::new("Invalid file path")),
    )
        .into_response()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(RejectionResponse::new("File not found")),
    )
        .into_response()
}
