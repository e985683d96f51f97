//! HTTP Client - 与守护进程通信

use anyhow::{Context, Result, bail};
use orbitdrop_core::server::wire::{StatusResponse, UploadResponse};
use reqwest::multipart::{Form, Part};
use std::path::PathBuf;

pub struct DaemonClient {
    base: String,
    http: reqwest::Client,
}

impl DaemonClient {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub async fn status(&self) -> Result<StatusResponse> {
        let resp = self.get("/status").await?;
        Ok(resp.json().await?)
    }

    pub async fn progress(&self, session_id: &str) -> Result<serde_json::Value> {
        let resp = self.get(&format!("/progress/{session_id}")).await?;
        Ok(resp.json().await?)
    }

    /// 读取本地文件并以 multipart 推送给守护进程
    pub async fn send_files(&self, paths: &[PathBuf]) -> Result<UploadResponse> {
        let mut form = Form::new();
        for path in paths {
            let data = tokio::fs::read(path)
                .await
                .with_context(|| format!("读取文件失败: {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "file".to_string());
            form = form.part("files", Part::bytes(data).file_name(name));
        }

        let resp = self
            .http
            .post(format!("{}/upload", self.base))
            .header(reqwest::header::USER_AGENT, "OrbitDrop-CLI")
            .multipart(form)
            .send()
            .await
            .map_err(connect_hint)?;

        if !resp.status().is_success() {
            let code = resp.status();
            let body: serde_json::Value = resp.json().await.unwrap_or_default();
            bail!(
                "上传失败 ({}): {}",
                code,
                body["error"].as_str().unwrap_or("unknown error")
            );
        }
        Ok(resp.json().await?)
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response> {
        self.http
            .get(format!("{}{}", self.base, path))
            .send()
            .await
            .map_err(connect_hint)
    }
}

fn connect_hint(e: reqwest::Error) -> anyhow::Error {
    if e.is_connect() {
        eprintln!("❌ 无法连接到守护进程: {}", e);
        eprintln!("   请确保 orbitdrop-daemon 正在运行");
    }
    e.into()
}
