//! 上传会话跟踪
//!
//! 进程内共享的会话注册表: 每个上传请求开始时登记一个会话，
//! 逐文件推进进度，轮询端只读快照。注册表不持久化，进程重启
//! 即清空；容量有上限，满员时优先淘汰最老的已结束会话。

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

/// 一次上传中成功落盘的单个文件
///
/// 同时出现在上传响应的 `files` 列表和会话进度的
/// `uploaded_files` 里，字段名即线上格式。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    pub filename: String,
    pub size: u64,
    pub device_folder: String,
    pub timestamp: DateTime<Utc>,
}

/// 会话进度快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadProgress {
    /// 0 到 100，按已完成文件数推进
    pub progress: u8,
    pub status: String,
    pub total_files: usize,
    pub uploaded_files: Vec<UploadedFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_file: Option<String>,
}

struct SessionState {
    snapshot: UploadProgress,
    finished: bool,
}

struct TrackerInner {
    sessions: HashMap<String, SessionState>,
    /// 插入顺序，淘汰时从最老的开始找
    order: VecDeque<String>,
    capacity: usize,
}

/// 会话跟踪器句柄
///
/// 廉价克隆，注入到各请求处理器里共享同一张注册表。
#[derive(Clone)]
pub struct UploadTracker {
    inner: Arc<RwLock<TrackerInner>>,
}

impl UploadTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(TrackerInner {
                sessions: HashMap::new(),
                order: VecDeque::new(),
                capacity: capacity.max(1),
            })),
        }
    }

    /// 登记一个新会话，返回生成的会话 id
    pub async fn begin(&self, total_files: usize) -> String {
        let id = Uuid::new_v4().to_string();
        let mut inner = self.inner.write().await;
        if inner.sessions.len() >= inner.capacity {
            evict_one(&mut inner);
        }
        inner.order.push_back(id.clone());
        inner.sessions.insert(
            id.clone(),
            SessionState {
                snapshot: UploadProgress {
                    progress: 0,
                    status: "starting".to_string(),
                    total_files,
                    uploaded_files: Vec::new(),
                    current_file: None,
                },
                finished: false,
            },
        );
        debug!("Upload session {} started ({} files)", id, total_files);
        id
    }

    /// 标记第 `index` 个文件（从 0 计）开始接收
    pub async fn file_start(&self, id: &str, index: usize, filename: &str) {
        let mut inner = self.inner.write().await;
        if let Some(state) = inner.sessions.get_mut(id) {
            state.snapshot.status = format!(
                "Processing file {} of {}",
                index + 1,
                state.snapshot.total_files
            );
            state.snapshot.current_file = Some(filename.to_string());
        }
    }

    /// 记录一个文件完成，进度按已完成数推进
    pub async fn file_complete(&self, id: &str, file: UploadedFile) {
        let mut inner = self.inner.write().await;
        if let Some(state) = inner.sessions.get_mut(id) {
            state.snapshot.uploaded_files.push(file);
            let done = state.snapshot.uploaded_files.len();
            let total = state.snapshot.total_files.max(1);
            state.snapshot.progress = (done * 100 / total) as u8;
        }
    }

    /// 标记会话失败
    ///
    /// 已完成文件的记录保留，进度不回退，轮询端据此判断
    /// 哪些文件在失败前已经落盘。
    pub async fn fail(&self, id: &str, message: &str) {
        let mut inner = self.inner.write().await;
        if let Some(state) = inner.sessions.get_mut(id) {
            state.snapshot.status = format!("error: {message}");
            state.finished = true;
        }
    }

    /// 会话成功收尾: 进度 100，状态 completed
    pub async fn finish(&self, id: &str) {
        let mut inner = self.inner.write().await;
        if let Some(state) = inner.sessions.get_mut(id) {
            state.snapshot.progress = 100;
            state.snapshot.status = "completed".to_string();
            state.snapshot.current_file = None;
            state.finished = true;
        }
    }

    /// 读取单个会话快照，未知 id 返回 `None`
    pub async fn snapshot(&self, id: &str) -> Option<UploadProgress> {
        self.inner
            .read()
            .await
            .sessions
            .get(id)
            .map(|state| state.snapshot.clone())
    }

    /// 全部会话的快照（状态接口用）
    pub async fn all(&self) -> HashMap<String, UploadProgress> {
        self.inner
            .read()
            .await
            .sessions
            .iter()
            .map(|(id, state)| (id.clone(), state.snapshot.clone()))
            .collect()
    }

    /// 当前登记的会话数
    pub async fn len(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.sessions.is_empty()
    }
}

/// 淘汰一个会话: 最老的已结束会话优先，没有就淘汰最老的
fn evict_one(inner: &mut TrackerInner) {
    let position = inner
        .order
        .iter()
        .position(|id| inner.sessions.get(id).is_none_or(|state| state.finished))
        .unwrap_or(0);
    if let Some(id) = inner.order.remove(position) {
        inner.sessions.remove(&id);
        debug!("Evicted upload session {}", id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_file(name: &str) -> UploadedFile {
        UploadedFile {
            filename: name.to_string(),
            size: 1,
            device_folder: "iPhone".to_string(),
            timestamp: Utc::now(),
        }
    }

    /// 进度单调不减，全部完成后恰好为 100
    #[tokio::test]
    async fn test_progress_monotonic_until_complete() {
        let tracker = UploadTracker::new(16);
        let id = tracker.begin(3).await;

        let mut last = 0;
        for (i, name) in ["a.jpg", "b.jpg", "c.jpg"].iter().enumerate() {
            tracker.file_start(&id, i, name).await;
            tracker.file_complete(&id, dummy_file(name)).await;
            let p = tracker.snapshot(&id).await.unwrap();
            assert!(p.progress >= last, "progress went backwards");
            last = p.progress;
        }
        assert_eq!(last, 100);

        tracker.finish(&id).await;
        let done = tracker.snapshot(&id).await.unwrap();
        assert_eq!(done.progress, 100);
        assert_eq!(done.status, "completed");
        assert_eq!(done.uploaded_files.len(), 3);
        assert!(done.current_file.is_none());
    }

    #[tokio::test]
    async fn test_status_strings() {
        let tracker = UploadTracker::new(16);
        let id = tracker.begin(2).await;
        assert_eq!(tracker.snapshot(&id).await.unwrap().status, "starting");

        tracker.file_start(&id, 0, "a.jpg").await;
        let p = tracker.snapshot(&id).await.unwrap();
        assert_eq!(p.status, "Processing file 1 of 2");
        assert_eq!(p.current_file.as_deref(), Some("a.jpg"));
    }

    /// 未知 id 不报错，返回 None
    #[tokio::test]
    async fn test_snapshot_unknown_is_none() {
        let tracker = UploadTracker::new(16);
        assert!(tracker.snapshot("no-such-session").await.is_none());
    }

    /// 失败保留已完成文件，进度不回退
    #[tokio::test]
    async fn test_fail_keeps_completed_files() {
        let tracker = UploadTracker::new(16);
        let id = tracker.begin(2).await;
        tracker.file_start(&id, 0, "a.jpg").await;
        tracker.file_complete(&id, dummy_file("a.jpg")).await;
        tracker.file_start(&id, 1, "b.jpg").await;
        tracker.fail(&id, "disk full").await;

        let p = tracker.snapshot(&id).await.unwrap();
        assert_eq!(p.status, "error: disk full");
        assert_eq!(p.progress, 50);
        assert_eq!(p.uploaded_files.len(), 1);
        assert_eq!(p.uploaded_files[0].filename, "a.jpg");
    }

    /// 满员时优先淘汰已结束的会话
    #[tokio::test]
    async fn test_eviction_prefers_finished() {
        let tracker = UploadTracker::new(2);
        let done = tracker.begin(1).await;
        tracker.finish(&done).await;
        let active = tracker.begin(1).await;

        let newcomer = tracker.begin(1).await;

        assert_eq!(tracker.len().await, 2);
        assert!(tracker.snapshot(&done).await.is_none());
        assert!(tracker.snapshot(&active).await.is_some());
        assert!(tracker.snapshot(&newcomer).await.is_some());
    }

    /// 没有已结束会话时淘汰最老的
    #[tokio::test]
    async fn test_eviction_falls_back_to_oldest() {
        let tracker = UploadTracker::new(1);
        let first = tracker.begin(1).await;
        let second = tracker.begin(1).await;

        assert!(tracker.snapshot(&first).await.is_none());
        assert!(tracker.snapshot(&second).await.is_some());
        assert_eq!(tracker.len().await, 1);
    }

    /// 哨兵语义由各接口负责，跟踪器本身序列化保持字段名
    #[tokio::test]
    async fn test_progress_wire_fields() {
        let tracker = UploadTracker::new(4);
        let id = tracker.begin(1).await;
        let json = serde_json::to_value(tracker.snapshot(&id).await.unwrap()).unwrap();

        assert_eq!(json["progress"], 0);
        assert_eq!(json["status"], "starting");
        assert_eq!(json["total_files"], 1);
        assert!(json["uploaded_files"].as_array().unwrap().is_empty());
        // current_file 为空时不出现在序列化结果里
        assert!(json.get("current_file").is_none());
    }
}
