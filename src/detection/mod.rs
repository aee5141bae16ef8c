/// 检测输入层 (Detection inputs)
///
/// 上游检测器/跟踪器输出的数据结构,以及判定前的预处理:
/// - types:    检测框、关键点、装备类别、跟踪ID
/// - geometry: IOU / 点在框内 / 外接框
/// - filter:   按类别的置信度过滤
pub mod filter;
pub mod geometry;
pub mod types;

pub use filter::GearFilter;
pub use geometry::{enclosing_box, iou, point_in_box};
pub use types::{
    BBox, BodyPart, GearClass, GearDetection, Keypoint, PersonPose, Point2, RawDetection,
    TrackedIdentity,
};
