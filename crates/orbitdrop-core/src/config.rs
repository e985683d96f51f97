//! 应用配置和持久化
//!
//! 提供监听端口、上传目录、请求大小上限等设置的存储和读取。

use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// 默认请求体大小上限: 100 MiB
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 100 * 1024 * 1024;

/// 应用设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// 设备名称（启动横幅中显示）
    pub device_name: String,
    /// HTTP 监听端口
    pub listen_port: u16,
    /// 上传根目录
    pub upload_dir: PathBuf,
    /// 单次请求体大小上限（字节）
    pub max_upload_size: usize,
    /// 会话注册表容量上限
    pub max_sessions: usize,
    /// 允许接收的扩展名，不设置则不限制
    #[serde(default)]
    pub allowed_extensions: Option<Vec<String>>,
    /// 详细日志模式
    pub verbose: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            device_name: get_default_device_name(),
            listen_port: 5000,
            upload_dir: default_upload_dir(),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            max_sessions: 256,
            allowed_extensions: None,
            verbose: false,
        }
    }
}

impl AppSettings {
    /// 获取配置文件路径
    fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("orbitdrop");
        config_dir.join("settings.toml")
    }

    /// 加载设置（如果文件不存在则使用默认值）
    pub fn load() -> Self {
        let path = Self::config_path();
        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(settings) => {
                        debug!("Loaded settings from {:?}", path);
                        return settings;
                    }
                    Err(e) => {
                        log::warn!("Failed to parse settings: {}, using defaults", e);
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read settings file: {}, using defaults", e);
                }
            }
        }
        Self::default()
    }

    /// 保存设置
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        debug!("Saved settings to {:?}", path);
        Ok(())
    }
}

/// 获取默认设备名称（主机名）
fn get_default_device_name() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "OrbitDrop".to_string())
}

/// 默认上传根目录: 下载目录下的 orbitdrop 子目录
fn default_upload_dir() -> PathBuf {
    dirs::download_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("orbitdrop")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = AppSettings::default();
        assert_eq!(settings.listen_port, 5000);
        assert_eq!(settings.max_upload_size, 100 * 1024 * 1024);
        assert_eq!(settings.max_sessions, 256);
        assert!(settings.allowed_extensions.is_none());
        assert!(!settings.device_name.is_empty());
    }

    /// TOML 往返保持所有字段
    #[test]
    fn test_settings_roundtrip() {
        let settings = AppSettings {
            listen_port: 8080,
            allowed_extensions: Some(vec!["jpg".to_string(), "png".to_string()]),
            ..Default::default()
        };

        let text = toml::to_string_pretty(&settings).unwrap();
        let parsed: AppSettings = toml::from_str(&text).unwrap();

        assert_eq!(parsed.listen_port, 8080);
        assert_eq!(parsed.upload_dir, settings.upload_dir);
        assert_eq!(
            parsed.allowed_extensions.as_deref(),
            Some(["jpg".to_string(), "png".to_string()].as_slice())
        );
    }

    /// 白名单字段缺省时解析为 None
    #[test]
    fn test_settings_parse_without_whitelist() {
        let settings = AppSettings {
            allowed_extensions: None,
            ..Default::default()
        };
        let text = toml::to_string_pretty(&settings).unwrap();
        assert!(!text.contains("allowed_extensions"));

        let parsed: AppSettings = toml::from_str(&text).unwrap();
        assert!(parsed.allowed_extensions.is_none());
    }
}
