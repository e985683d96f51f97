//! 设备分类
//!
//! 根据客户端标识串（通常是 HTTP User-Agent）推断设备类别，
//! 类别名直接用作上传根目录下的分组目录名。

use std::sync::LazyLock;

use regex::Regex;

/// 目录名白名单之外的字符统一替换为下划线
static UNSAFE_LABEL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]").unwrap());

/// 设备类别
///
/// 分类只做子串匹配，且对顺序敏感: iPhone 的 UA 同样包含
/// "Mac OS X"，所以 iOS 检查必须排在 Mac 之前。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCategory {
    IPhone,
    Android,
    WindowsPc,
    Mac,
    /// 标识串非空但无法识别
    Unknown,
    /// 标识串缺失或为空
    Missing,
}

impl DeviceCategory {
    /// 从客户端标识串推断类别，永不失败
    pub fn classify(identifier: &str) -> Self {
        if identifier.is_empty() {
            return Self::Missing;
        }
        if identifier.contains("iPhone") || identifier.contains("iPad") {
            Self::IPhone
        } else if identifier.contains("Android") {
            Self::Android
        } else if identifier.contains("Windows") {
            Self::WindowsPc
        } else if identifier.contains("Macintosh") || identifier.contains("Mac OS X") {
            Self::Mac
        } else {
            Self::Unknown
        }
    }

    /// 类别显示名，同时是磁盘目录名的原始形式
    pub fn label(self) -> &'static str {
        match self {
            Self::IPhone => "iPhone",
            Self::Android => "Android",
            Self::WindowsPc => "Windows_PC",
            Self::Mac => "Mac",
            Self::Unknown => "Unknown_Device",
            Self::Missing => "unknown_device",
        }
    }

    /// 清洗后的目录名，保证可以安全用作路径段
    pub fn dir_name(self) -> String {
        sanitize_label(self.label())
    }
}

/// 把任意标签清洗成安全路径段
///
/// 字母、数字、`-`、`_`、`.` 之外的字符全部替换为 `_`。
pub fn sanitize_label(label: &str) -> String {
    UNSAFE_LABEL_CHARS.replace_all(label, "_").into_owned()
}
