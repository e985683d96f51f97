//! OrbitDrop Daemon
//!
//! 桌面端后台进程，负责：
//! - 启动局域网 HTTP 上传服务
//! - 维护上传会话进度
//! - 把收到的文件按设备类别落盘

use anyhow::Result;
use orbitdrop_core::{AppSettings, UploadServer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 桥接 log crate（orbitdrop-core 使用）到 tracing
    let _ = tracing_log::LogTracer::init();

    let settings = AppSettings::load();

    // 初始化日志
    let default_filter = if settings.verbose {
        "debug,orbitdrop_core=debug"
    } else {
        "info,orbitdrop_core=debug"
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .try_init();

    tracing::info!("OrbitDrop Daemon starting...");
    tracing::info!("设备名称: {}", settings.device_name);
    tracing::info!("上传目录: {}", settings.upload_dir.display());

    let server = UploadServer::new(settings);
    tracing::info!("手机浏览器访问: {}", server.connect_url());

    tokio::select! {
        res = server.serve() => {
            tracing::error!("Upload server exited: {:?}", res);
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("收到 Ctrl-C，正在退出...");
        }
    }

    Ok(())
}
