//! 错误类型 (Error types)
//!
//! 合规判定核心本身没有致命错误,这里只覆盖外部协作方:
//! 事件存储 (SQLite / 内存) 与证据快照 (JPEG 文件)。

use thiserror::Error;

/// 协作方错误
#[derive(Debug, Error)]
pub enum SentinelError {
    #[error("I/O错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("图像编码失败: {0}")]
    Image(#[from] image::ImageError),

    #[error("数据库错误: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 帧记录不可用 (例如画布尺寸超限)
    #[error("帧记录无效: {0}")]
    InvalidFrame(String),

    /// 存储中的记录无法还原为事件
    #[error("存储记录损坏: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, SentinelError>;
