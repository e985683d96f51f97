//! 局域网地址发现
//!
//! 状态接口和启动横幅需要一个手机能直接访问的本机地址。

use log::warn;

/// 本机局域网 IP 的字符串形式
///
/// 查询失败时退回环回地址，保证状态接口始终有值可报。
pub fn local_ip_string() -> String {
    match local_ip_address::local_ip() {
        Ok(ip) => ip.to_string(),
        Err(e) => {
            warn!("Local IP discovery failed, falling back to loopback: {}", e);
            "127.0.0.1".to_string()
        }
    }
}
