//! OrbitDrop Core Library
//!
//! 局域网文件投递服务的核心实现库: 手机浏览器打开桌面端展示的
//! 地址，通过 HTTP multipart 把文件推给桌面端；桌面端按设备
//! 类别落盘（同名自动加后缀），并提供清单与进度轮询接口。
//!
//! # 模块
//!
//! - **device**: 客户端标识串到设备类别的分类
//! - **storage**: 文件名清洗、防冲突落盘、目录清单快照
//! - **session**: 上传会话进度跟踪
//! - **ingest**: 上传批次编排
//! - **server**: HTTP 服务与对外 JSON 类型
//! - **config**: 设置持久化
//! - **net**: 局域网地址发现
//!
//! # 使用示例
//!
//! ```ignore
//! use orbitdrop_core::{AppSettings, UploadServer};
//!
//! let settings = AppSettings::load();
//! let server = UploadServer::new(settings);
//! println!("Open {} on your phone", server.connect_url());
//! server.serve().await?;
//! ```

pub mod config;
pub mod device;
pub mod ingest;
pub mod net;
pub mod server;
pub mod session;
pub mod storage;

pub use config::AppSettings;
pub use device::DeviceCategory;
pub use ingest::{IncomingFile, IngestError, IngestReport, IngestService};
pub use server::{AppState, UploadServer};
pub use session::{UploadProgress, UploadTracker, UploadedFile};
pub use storage::inventory::{DeviceFolder, FileInfo, InventorySnapshot};
