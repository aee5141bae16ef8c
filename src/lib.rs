// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod compliance; // 合规判定与事件节流
pub mod config; // 监控配置参数
pub mod detection; // 检测输入与几何工具
pub mod error; // 协作方错误类型
pub mod events; // 违规事件与存储
pub mod pipeline; // 逐帧监控流水线

pub use crate::compliance::{
    ComplianceClassifier, ComplianceVerdict, EquipmentItem, EventThrottle, Violation,
};
pub use crate::config::MonitorConfig;
pub use crate::detection::{
    BBox, BodyPart, GearClass, GearDetection, GearFilter, Keypoint, PersonPose, Point2,
    RawDetection, TrackedIdentity,
};
pub use crate::error::{Result, SentinelError};
pub use crate::events::{
    EventEmitter, EventStore, EvidenceRef, EvidenceStore, FileEvidenceStore, MemoryEventStore,
    SqliteEventStore, ViolationEvent,
};
pub use crate::pipeline::{FrameInput, FrameReport, PersonInput, SafetyMonitor};
