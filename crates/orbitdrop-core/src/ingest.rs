//! 上传批次处理
//!
//! 一次上传请求的完整编排: 设备分类一次，之后按到达顺序逐个
//! 文件解析路径并落盘，同步推进会话进度。批内第一个不可恢复
//! 的错误让会话进入失败状态并中止剩余文件；已写入的文件保留
//! 原样，不做回滚。

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::Utc;
use log::{error, info};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::device::DeviceCategory;
use crate::session::{UploadTracker, UploadedFile};
use crate::storage::paths;

/// 待落盘的单个上传文件
#[derive(Debug, Clone)]
pub struct IncomingFile {
    /// 客户端报告的原始文件名，落盘前会先清洗
    pub name: String,
    pub data: Bytes,
}

/// 批次成功的结果
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub session_id: String,
    pub device_folder: String,
    pub files: Vec<UploadedFile>,
}

impl IngestReport {
    /// 上传响应里的人类可读摘要
    pub fn message(&self) -> String {
        format!(
            "{} file(s) uploaded successfully to {}",
            self.files.len(),
            self.device_folder
        )
    }
}

/// 批次失败的各种情况
#[derive(Debug, Error)]
pub enum IngestError {
    /// 请求里一个文件部件都没有
    #[error("No files provided")]
    NoFiles,
    /// 文件名清洗后不剩任何可用字符
    #[error("invalid filename: {0:?}")]
    InvalidFilename(String),
    /// 落盘过程中的 I/O 失败
    #[error("failed to store {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// 上传批次处理器
///
/// 持有上传根目录和会话跟踪器，本身可廉价克隆，
/// 每个请求处理器拿到的是同一套状态。
#[derive(Clone)]
pub struct IngestService {
    upload_root: PathBuf,
    tracker: UploadTracker,
    allowed_extensions: Option<HashSet<String>>,
}

impl IngestService {
    pub fn new(upload_root: PathBuf, tracker: UploadTracker) -> Self {
        Self {
            upload_root,
            tracker,
            allowed_extensions: None,
        }
    }

    /// 限制可接收的扩展名（不区分大小写）
    ///
    /// 名单外的文件会被静默跳过而不是判为失败: 会话总数照常
    /// 统计它们，但既不落盘也不出现在结果列表里。
    pub fn with_allowed_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_extensions = Some(
            extensions
                .into_iter()
                .map(|ext| ext.as_ref().to_ascii_lowercase())
                .collect(),
        );
        self
    }

    pub fn upload_root(&self) -> &Path {
        &self.upload_root
    }

    /// 处理一个上传批次
    ///
    /// 空批次直接拒绝，此时不登记会话。返回的报告带会话 id，
    /// 调用方可以继续轮询；失败时会话快照才是部分成功的权威
    /// 记录，响应本身只携带错误信息。
    pub async fn ingest(
        &self,
        client_identifier: &str,
        files: Vec<IncomingFile>,
    ) -> Result<IngestReport, IngestError> {
        if files.is_empty() {
            return Err(IngestError::NoFiles);
        }

        let category = DeviceCategory::classify(client_identifier);
        let device_folder = category.dir_name();
        let category_dir = self.upload_root.join(&device_folder);
        let session_id = self.tracker.begin(files.len()).await;

        info!(
            "Ingesting {} file(s) from {} into {}",
            files.len(),
            category.label(),
            category_dir.display()
        );

        let mut stored = Vec::new();
        for (index, file) in files.into_iter().enumerate() {
            self.tracker.file_start(&session_id, index, &file.name).await;

            if self.is_filtered(&file.name) {
                info!("Skipping {} (extension not allowed)", file.name);
                continue;
            }

            match self.store_one(&category_dir, &device_folder, file).await {
                Ok(entry) => {
                    self.tracker.file_complete(&session_id, entry.clone()).await;
                    stored.push(entry);
                }
                Err(e) => {
                    error!("Upload batch aborted: {}", e);
                    self.tracker.fail(&session_id, &e.to_string()).await;
                    return Err(e);
                }
            }
        }

        self.tracker.finish(&session_id).await;
        Ok(IngestReport {
            session_id,
            device_folder,
            files: stored,
        })
    }

    /// 落盘单个文件，返回线上格式的文件描述
    async fn store_one(
        &self,
        category_dir: &Path,
        device_folder: &str,
        file: IncomingFile,
    ) -> Result<UploadedFile, IngestError> {
        let safe = paths::safe_filename(&file.name);
        if safe.is_empty() {
            return Err(IngestError::InvalidFilename(file.name));
        }

        let (path, mut handle) = paths::resolve_destination(category_dir, &safe)
            .await
            .map_err(|source| IngestError::Io {
                name: safe.clone(),
                source,
            })?;

        handle
            .write_all(&file.data)
            .await
            .map_err(|source| IngestError::Io {
                name: safe.clone(),
                source,
            })?;
        handle.sync_all().await.map_err(|source| IngestError::Io {
            name: safe.clone(),
            source,
        })?;

        // 冲突后缀可能改写了最终文件名，以磁盘上的为准
        let stored_name = path
            .file_name()
            .map_or(safe, |n| n.to_string_lossy().into_owned());

        info!(
            "Stored {} ({} bytes) in {}",
            stored_name,
            file.data.len(),
            device_folder
        );

        Ok(UploadedFile {
            filename: stored_name,
            size: file.data.len() as u64,
            device_folder: device_folder.to_string(),
            timestamp: Utc::now(),
        })
    }

    fn is_filtered(&self, name: &str) -> bool {
        let Some(allowed) = &self.allowed_extensions else {
            return false;
        };
        match name.rsplit_once('.') {
            Some((_, ext)) => !allowed.contains(&ext.to_ascii_lowercase()),
            None => true,
        }
    }
}
