/// 合规判定系统 (Compliance decision engine)
///
/// - classifier: 单人单帧的装备规则判定 (无状态)
/// - verdict:    判定结果
/// - throttle:   按跟踪ID的事件冷却 (唯一跨帧状态)
pub mod classifier;
pub mod throttle;
pub mod verdict;

pub use classifier::ComplianceClassifier;
pub use throttle::{EventThrottle, ThrottleState};
pub use verdict::{ComplianceVerdict, EquipmentItem, Violation};
