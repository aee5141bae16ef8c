//! 证据快照存储 (Evidence store)

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use image::RgbImage;
use tracing::debug;

use super::event::EvidenceRef;
use crate::detection::types::TrackedIdentity;
use crate::error::Result;

/// 证据存储接口: 保存帧图像,返回之后可取回的引用
pub trait EvidenceStore: Send + Sync {
    fn save(
        &self,
        identity: TrackedIdentity,
        timestamp: DateTime<Utc>,
        frame: &RgbImage,
    ) -> Result<EvidenceRef>;
}

/// 以JPEG文件保存: `<dir>/Worker{id}_{unix秒}.jpg`
pub struct FileEvidenceStore {
    dir: PathBuf,
}

impl FileEvidenceStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, identity: TrackedIdentity, timestamp: DateTime<Utc>) -> PathBuf {
        self.dir
            .join(format!("Worker{}_{}.jpg", identity.0, timestamp.timestamp()))
    }
}

impl EvidenceStore for FileEvidenceStore {
    fn save(
        &self,
        identity: TrackedIdentity,
        timestamp: DateTime<Utc>,
        frame: &RgbImage,
    ) -> Result<EvidenceRef> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(identity, timestamp);
        frame.save(&path)?;
        debug!("📸 快照已保存: {}", path.display());
        Ok(EvidenceRef(path.to_string_lossy().into_owned()))
    }
}
