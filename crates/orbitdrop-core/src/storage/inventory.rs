//! 上传目录快照
//!
//! 对上传根目录做非递归的两层扫描: 根下的目录视为设备目录
//! （其内容再列一层），根下的普通文件归入 "root" 类别。
//! 扫描是只读投影，与写入并发时给出尽力而为的快照。

use std::io;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

/// 单个已存文件的元数据（状态接口里的清单条目）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    pub timestamp: DateTime<Utc>,
    pub device_folder: String,
}

/// 一个设备目录与其直接包含的文件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceFolder {
    pub name: String,
    pub files: Vec<FileInfo>,
}

/// 上传根目录的一次快照
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventorySnapshot {
    /// 直接散落在根目录下的文件
    pub files: Vec<FileInfo>,
    /// 设备目录分组
    pub device_folders: Vec<DeviceFolder>,
}

impl InventorySnapshot {
    /// 散落文件与各设备目录文件的总数
    pub fn total_files(&self) -> usize {
        self.files.len()
            + self
                .device_folders
                .iter()
                .map(|folder| folder.files.len())
                .sum::<usize>()
    }
}

/// 扫描上传根目录
///
/// 根目录不存在时返回空快照而不是报错。条目按名称排序，
/// 同一棵目录树的重复扫描结果一致。扫描期间消失的条目直接跳过。
pub async fn scan(root: &Path) -> io::Result<InventorySnapshot> {
    let mut snapshot = InventorySnapshot::default();

    let mut entries = match fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(snapshot),
        Err(e) => return Err(e),
    };

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let Ok(meta) = entry.metadata().await else {
            continue;
        };
        if meta.is_dir() {
            let files = scan_folder(&entry.path(), &name).await.unwrap_or_default();
            snapshot.device_folders.push(DeviceFolder { name, files });
        } else if meta.is_file() {
            snapshot.files.push(file_info(&name, &meta, "root"));
        }
    }

    snapshot.files.sort_by(|a, b| a.name.cmp(&b.name));
    snapshot.device_folders.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(snapshot)
}

/// 列出一个设备目录内的文件（只看一层，忽略子目录）
async fn scan_folder(dir: &Path, folder: &str) -> io::Result<Vec<FileInfo>> {
    let mut files = Vec::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let Ok(meta) = entry.metadata().await else {
            continue;
        };
        if meta.is_file() {
            let name = entry.file_name().to_string_lossy().into_owned();
            files.push(file_info(&name, &meta, folder));
        }
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

fn file_info(name: &str, meta: &std::fs::Metadata, folder: &str) -> FileInfo {
    let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    FileInfo {
        name: name.to_string(),
        size: meta.len(),
        timestamp: DateTime::<Utc>::from(modified),
        device_folder: folder.to_string(),
    }
}
