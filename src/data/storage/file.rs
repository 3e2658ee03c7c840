//! 文件存储后端
//!
//! 每个槽位对应目录下的一个 `.json` 文件：
//! - 自动创建目录
//! - 先写临时文件再重命名，避免读到半截快照
//! - Unix 权限设置（0o600）

use super::DurableStorage;
use crate::data::{CacheError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 槽位对应的文件路径
    ///
    /// 槽位名中文件系统不安全的字符替换为 `_`。
    pub fn slot_path(&self, slot: &str) -> PathBuf {
        let file_name: String = slot
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file_name}.json"))
    }
}

impl DurableStorage for FileStorage {
    fn get(&self, slot: &str) -> Result<Option<String>> {
        let path = self.slot_path(slot);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::io(path, e)),
        }
    }

    fn set(&self, slot: &str, contents: &str) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| CacheError::io(self.dir.clone(), e))?;

        let path = self.slot_path(slot);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, contents).map_err(|e| CacheError::io(tmp_path.clone(), e))?;
        set_permissions(&tmp_path)?;
        fs::rename(&tmp_path, &path).map_err(|e| CacheError::io(path.clone(), e))?;

        Ok(())
    }

    fn remove(&self, slot: &str) -> Result<()> {
        let path = self.slot_path(slot);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::io(path, e)),
        }
    }
}

/// 设置文件权限（Unix 平台 0o600）
#[cfg(unix)]
fn set_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let metadata = fs::metadata(path).map_err(|e| CacheError::io(path.to_path_buf(), e))?;
    let mut perms = metadata.permissions();
    perms.set_mode(0o600);
    fs::set_permissions(path, perms).map_err(|e| CacheError::io(path.to_path_buf(), e))
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
