//! 对外 JSON 类型
//!
//! 每个 HTTP 响应体都是这里某个具体类型的序列化结果，
//! 字段名就是线上格式，改动要同步页面脚本和 CLI。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::session::{UploadProgress, UploadedFile};
use crate::storage::inventory::{DeviceFolder, FileInfo};

/// POST /upload 成功响应
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub session_id: String,
    pub device_folder: String,
    pub message: String,
    pub files: Vec<UploadedFile>,
}

/// 请求不合法时的拒绝响应（400）
#[derive(Debug, Serialize)]
pub struct RejectionResponse {
    pub error: String,
}

impl RejectionResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// 处理中途失败的响应（413/500）
#[derive(Debug, Serialize)]
pub struct FailureResponse {
    pub success: bool,
    pub error: String,
}

impl FailureResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// GET /status 响应
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub ip_address: String,
    pub connected: bool,
    /// 直接散落在上传根目录下的文件
    pub files: Vec<FileInfo>,
    pub device_folders: Vec<DeviceFolder>,
    pub total_files: usize,
    pub upload_progress: HashMap<String, UploadProgress>,
}

/// 未知会话的哨兵响应
///
/// 轮询端把它当作"还没开始"，而不是错误。
#[derive(Debug, Serialize)]
pub struct NotStartedResponse {
    pub progress: u8,
    pub status: &'static str,
}

impl NotStartedResponse {
    pub fn sentinel() -> Self {
        Self {
            progress: 0,
            status: "not started",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 哨兵的线上形状固定为两个字段
    #[test]
    fn test_not_started_sentinel_shape() {
        let json = serde_json::to_value(NotStartedResponse::sentinel()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"progress": 0, "status": "not started"})
        );
    }

    #[test]
    fn test_failure_response_shape() {
        let json = serde_json::to_value(FailureResponse::new("boom")).unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "error": "boom"}));
    }

    /// 拒绝响应只有 error 一个字段
    #[test]
    fn test_rejection_response_shape() {
        let json = serde_json::to_value(RejectionResponse::new("No files provided")).unwrap();
        assert_eq!(json, serde_json::json!({"error": "No files provided"}));
    }
}
