//! OrbitDrop CLI
//!
//! 命令行客户端，通过 HTTP 与守护进程通信

mod client;

use anyhow::Result;
use clap::{Parser, Subcommand};
use orbitdrop_core::AppSettings;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "orbitdrop", version, about = "OrbitDrop - 局域网手机传文件工具")]
struct Cli {
    /// 守护进程地址 (默认: http://127.0.0.1:<配置端口>)
    #[arg(short, long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 发送文件到桌面端
    Send {
        /// 要发送的文件路径
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// 查看服务状态与文件清单
    Status,
    /// 查询某次上传的进度
    Progress {
        /// 上传响应里返回的会话 id
        session_id: String,
    },
    /// 显示手机浏览器用的访问地址
    Url,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let base = cli
        .server
        .unwrap_or_else(|| format!("http://127.0.0.1:{}", AppSettings::load().listen_port));
    let client = client::DaemonClient::new(&base);

    match cli.command {
        Commands::Send { files } => {
            println!("📤 发送 {} 个文件", files.len());
            let resp = client.send_files(&files).await?;
            println!("✅ {}", resp.message);
            println!("   会话: {}", resp.session_id);
            for file in &resp.files {
                println!(
                    "   {} ({} bytes) -> {}",
                    file.filename, file.size, file.device_folder
                );
            }
        }
        Commands::Status => {
            let status = client.status().await?;
            println!("IP 地址: {}", status.ip_address);
            println!("文件总数: {}", status.total_files);
            for folder in &status.device_folders {
                println!("   {}: {} 个文件", folder.name, folder.files.len());
            }
            if !status.upload_progress.is_empty() {
                println!("会话:");
                for (id, progress) in &status.upload_progress {
                    println!(
                        "   [{}] {}% {}",
                        id.get(..8).unwrap_or(id),
                        progress.progress,
                        progress.status
                    );
                }
            }
        }
        Commands::Progress { session_id } => {
            let progress = client.progress(&session_id).await?;
            if progress.get("total_files").is_none() {
                println!("会话不存在或尚未开始");
            } else {
                println!("进度: {}%", progress["progress"]);
                println!("状态: {}", progress["status"].as_str().unwrap_or("?"));
                if let Some(current) = progress["current_file"].as_str() {
                    println!("当前文件: {}", current);
                }
                if let Some(files) = progress["uploaded_files"].as_array() {
                    for file in files {
                        println!(
                            "   {} ({} bytes)",
                            file["filename"].as_str().unwrap_or("?"),
                            file["size"]
                        );
                    }
                }
            }
        }
        Commands::Url => {
            let status = client.status().await?;
            let port = reqwest::Url::parse(&base)?
                .port_or_known_default()
                .unwrap_or(80);
            println!("📱 手机浏览器访问: http://{}:{}", status.ip_address, port);
        }
    }

    Ok(())
}
