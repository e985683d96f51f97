//! 存储层
//!
//! 包含:
//! - 文件名清洗与防冲突落盘路径解析
//! - 上传目录的清单快照

pub mod inventory;
pub mod paths;

pub use inventory::{DeviceFolder, FileInfo, InventorySnapshot};
pub use paths::{resolve_destination, safe_filename};
