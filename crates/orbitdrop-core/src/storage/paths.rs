//! 落盘路径处理
//!
//! 客户端提交的文件名先清洗成安全形式，再在目标目录内解析出
//! 一个不冲突的路径。解析用 `create_new` 原子抢占，并发请求
//! 不可能拿到同一个落盘路径。

use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use tokio::fs::{self, File, OpenOptions};

/// 清洗客户端提交的文件名
///
/// 只保留最后一个路径段，丢弃控制字符、空白以外的不安全字符
/// （空白替换为下划线）。清洗是幂等的。输入完全不可用时返回
/// 空串，由调用方决定如何报错。
pub fn safe_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let mut cleaned = String::with_capacity(base.len());
    for ch in base.chars() {
        if ch.is_whitespace() {
            cleaned.push('_');
        } else if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
            cleaned.push(ch);
        }
    }

    if cleaned == "." || cleaned == ".." {
        return String::new();
    }
    cleaned
}

/// 在类别目录内为期望文件名解析一个独占的落盘路径
///
/// 目录不存在时自动创建（幂等）。命名冲突时在扩展名前插入递增
/// 后缀（`name_1.ext`、`name_2.ext`…）直到抢占成功。返回的文件
/// 句柄就是 `create_new` 打开的句柄，调用方直接写入即可。
pub async fn resolve_destination(
    category_dir: &Path,
    desired: &str,
) -> io::Result<(PathBuf, File)> {
    fs::create_dir_all(category_dir).await?;

    let (stem, ext) = split_name(desired);
    let mut counter: u32 = 0;
    loop {
        let candidate = if counter == 0 {
            desired.to_string()
        } else if ext.is_empty() {
            format!("{stem}_{counter}")
        } else {
            format!("{stem}_{counter}.{ext}")
        };
        let path = category_dir.join(&candidate);

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => {
                if counter > 0 {
                    debug!("Name collision resolved: {} -> {}", desired, candidate);
                }
                return Ok((path, file));
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                counter += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// 按最后一个 `.` 拆分主名与扩展名，隐藏文件（如 `.env`）视为无扩展名
fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx + 1..]),
        _ => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_filename_strips_path_components() {
        assert_eq!(safe_filename("photo.jpg"), "photo.jpg");
        assert_eq!(safe_filename("dir/sub/photo.jpg"), "photo.jpg");
        assert_eq!(safe_filename("..\\..\\evil.exe"), "evil.exe");
        assert_eq!(safe_filename("../../etc/passwd"), "passwd");
    }

    #[test]
    fn test_safe_filename_replaces_whitespace_and_drops_specials() {
        assert_eq!(safe_filename("my photo.jpg"), "my_photo.jpg");
        assert_eq!(safe_filename("a<b>c?.png"), "abc.png");
        assert_eq!(safe_filename("报告.pdf"), ".pdf");
    }

    /// 清洗是幂等的
    #[test]
    fn test_safe_filename_idempotent() {
        for name in ["my photo.jpg", "a<b>c?.png", "dir/x.txt", "plain.gif"] {
            let once = safe_filename(name);
            assert_eq!(safe_filename(&once), once, "input: {name}");
        }
    }

    /// 完全不可用的输入清洗为空串
    #[test]
    fn test_safe_filename_rejects_garbage() {
        assert_eq!(safe_filename(""), "");
        assert_eq!(safe_filename("???"), "");
        assert_eq!(safe_filename(".."), "");
        assert_eq!(safe_filename("dir/"), "");
    }

    #[tokio::test]
    async fn test_resolve_creates_missing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("iPhone");
        assert!(!dir.exists());

        let (path, _file) = resolve_destination(&dir, "photo.jpg").await.unwrap();
        assert!(dir.is_dir());
        assert_eq!(path, dir.join("photo.jpg"));
        assert!(path.is_file());
    }

    /// 重复解析同名文件得到严格递增的后缀序列
    #[tokio::test]
    async fn test_resolve_collision_sequence() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();

        let (first, _f1) = resolve_destination(&dir, "photo.jpg").await.unwrap();
        let (second, _f2) = resolve_destination(&dir, "photo.jpg").await.unwrap();
        let (third, _f3) = resolve_destination(&dir, "photo.jpg").await.unwrap();

        assert_eq!(first.file_name().unwrap(), "photo.jpg");
        assert_eq!(second.file_name().unwrap(), "photo_1.jpg");
        assert_eq!(third.file_name().unwrap(), "photo_2.jpg");
    }

    /// 无扩展名与多段扩展名的后缀位置
    #[tokio::test]
    async fn test_resolve_suffix_placement() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();

        let (_, _f) = resolve_destination(&dir, "README").await.unwrap();
        let (plain, _f) = resolve_destination(&dir, "README").await.unwrap();
        assert_eq!(plain.file_name().unwrap(), "README_1");

        let (_, _f) = resolve_destination(&dir, "logs.tar.gz").await.unwrap();
        let (tar, _f) = resolve_destination(&dir, "logs.tar.gz").await.unwrap();
        assert_eq!(tar.file_name().unwrap(), "logs.tar_1.gz");

        let (_, _f) = resolve_destination(&dir, ".env").await.unwrap();
        let (hidden, _f) = resolve_destination(&dir, ".env").await.unwrap();
        assert_eq!(hidden.file_name().unwrap(), ".env_1");
    }
}
