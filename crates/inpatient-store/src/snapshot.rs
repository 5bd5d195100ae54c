//! 快照持久化
//!
//! 将整个 [`WardStore`] 序列化为JSON文件

use crate::store::WardStore;
use inpatient_core::Result;
use std::path::{Path, PathBuf};

/// 快照文件
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取快照，文件不存在时返回空存储
    pub async fn load(&self) -> Result<WardStore> {
        if !tokio::fs::try_exists(&self.path).await? {
            tracing::info!("Snapshot {} not found, starting with an empty store", self.path.display());
            return Ok(WardStore::default());
        }

        let data = tokio::fs::read(&self.path).await?;
        let store: WardStore = serde_json::from_slice(&data)?;
        tracing::debug!("Loaded snapshot from {}", self.path.display());
        Ok(store)
    }

    /// 先写临时文件再改名
    pub async fn save(&self, store: &WardStore) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let data = serde_json::to_vec_pretty(store)?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, data).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        tracing::debug!("Saved snapshot to {}", self.path.display());
        Ok(())
    }
}
