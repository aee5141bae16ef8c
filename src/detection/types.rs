/// 检测数据结构定义
/// Data structures consumed from the upstream detector / tracker
use std::fmt;

use serde::{Deserialize, Serialize};

// ========== 几何基础类型 ==========

/// 二维点
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 检测框 (Detection bounding box), 左上角 (x1, y1) 右下角 (x2, y2)
///
/// JSON中表示为 `[x1, y1, x2, y2]`
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// 以 `center` 为中心、边长为 `size` 的正方形
    pub fn centered(center: Point2, size: f32) -> Self {
        let half = size / 2.0;
        Self::new(center.x - half, center.y - half, center.x + half, center.y + half)
    }

    /// 宽度 (畸形框记为0)
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    /// 高度 (畸形框记为0)
    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Point2 {
        Point2::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// 四边各向外扩展 `margin` 像素
    pub fn expand(&self, margin: f32) -> Self {
        Self::new(
            self.x1 - margin,
            self.y1 - margin,
            self.x2 + margin,
            self.y2 + margin,
        )
    }
}

impl From<[f32; 4]> for BBox {
    fn from([x1, y1, x2, y2]: [f32; 4]) -> Self {
        Self::new(x1, y1, x2, y2)
    }
}

impl From<BBox> for [f32; 4] {
    fn from(b: BBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

// ========== 姿态关键点 ==========

/// 姿态估计器的"已检测"判定: 两个坐标都严格大于0
///
/// 上游姿态模型用 (0, 0) 表示未检测到的关键点,只在构造边界调用一次
pub fn is_detected(x: f32, y: f32) -> bool {
    x > 0.0 && y > 0.0
}

/// 单个关键点,显式区分"存在/缺失"
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Keypoint(Option<Point2>);

impl Keypoint {
    pub const MISSING: Self = Self(None);

    /// 已知存在的关键点 (不做坐标判定)
    pub fn at(x: f32, y: f32) -> Self {
        Self(Some(Point2::new(x, y)))
    }

    /// 从检测器原始坐标构造,应用 [`is_detected`] 判定
    pub fn from_raw(x: f32, y: f32) -> Self {
        if is_detected(x, y) {
            Self::at(x, y)
        } else {
            Self::MISSING
        }
    }

    pub fn point(&self) -> Option<Point2> {
        self.0
    }

    pub fn is_present(&self) -> bool {
        self.0.is_some()
    }
}

/// COCO 17 关键点 (身体部位)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum BodyPart {
    Nose = 0,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl BodyPart {
    pub const COUNT: usize = 17;

    pub fn index(self) -> usize {
        self as usize
    }
}

/// 单人姿态: COCO 17 关键点 + 人体检测框
#[derive(Clone, Debug, PartialEq)]
pub struct PersonPose {
    keypoints: [Keypoint; BodyPart::COUNT],
    bbox: BBox,
}

impl PersonPose {
    /// 所有关键点缺失的姿态
    pub fn new(bbox: BBox) -> Self {
        Self {
            keypoints: [Keypoint::MISSING; BodyPart::COUNT],
            bbox,
        }
    }

    /// 从检测器输出构造 (按COCO顺序), 多余的点忽略, 不足的视为缺失
    pub fn from_coco(bbox: BBox, points: &[[f32; 2]]) -> Self {
        let mut pose = Self::new(bbox);
        for (slot, [x, y]) in pose.keypoints.iter_mut().zip(points) {
            *slot = Keypoint::from_raw(*x, *y);
        }
        pose
    }

    pub fn with(mut self, part: BodyPart, keypoint: Keypoint) -> Self {
        self.keypoints[part.index()] = keypoint;
        self
    }

    pub fn keypoint(&self, part: BodyPart) -> Keypoint {
        self.keypoints[part.index()]
    }

    /// 关键点坐标 (缺失返回None)
    pub fn point(&self, part: BodyPart) -> Option<Point2> {
        self.keypoint(part).point()
    }

    pub fn bbox(&self) -> &BBox {
        &self.bbox
    }
}

// ========== 装备检测 ==========

/// 检测类别 (装备模型输出的类别ID)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GearClass {
    Person,
    Helmet,
    Vest,
    Goggles,
    Boots,
    Gloves,
}

impl GearClass {
    /// 类别ID → 类别, 未知ID返回None
    pub fn from_class_id(class_id: u32) -> Option<Self> {
        match class_id {
            0 => Some(Self::Person),
            1 => Some(Self::Helmet),
            2 => Some(Self::Vest),
            3 => Some(Self::Goggles),
            4 => Some(Self::Boots),
            5 => Some(Self::Gloves),
            _ => None,
        }
    }

    pub fn class_id(self) -> u32 {
        match self {
            Self::Person => 0,
            Self::Helmet => 1,
            Self::Vest => 2,
            Self::Goggles => 3,
            Self::Boots => 4,
            Self::Gloves => 5,
        }
    }
}

/// 检测器原始输出 (类别ID未经校验)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub class_id: u32,
    pub bbox: BBox,
    pub confidence: f32,
}

/// 已通过置信度过滤的装备检测
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GearDetection {
    pub class: GearClass,
    pub bbox: BBox,
    pub confidence: f32,
}

impl GearDetection {
    pub fn new(class: GearClass, bbox: BBox, confidence: f32) -> Self {
        Self {
            class,
            bbox,
            confidence,
        }
    }
}

// ========== 跟踪身份 ==========

/// 跟踪器分配的稳定ID
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackedIdentity(pub u32);

impl fmt::Display for TrackedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Worker {}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypoint_presence_rule() {
        assert!(Keypoint::from_raw(10.0, 20.0).is_present());
        assert!(!Keypoint::from_raw(0.0, 20.0).is_present());
        assert!(!Keypoint::from_raw(10.0, -1.0).is_present());
        // 显式构造不受坐标判定影响
        assert!(Keypoint::at(0.0, 0.0).is_present());
    }

    #[test]
    fn test_from_coco_short_input() {
        let pose = PersonPose::from_coco(BBox::new(0.0, 0.0, 10.0, 10.0), &[[5.0, 5.0]]);
        assert_eq!(pose.point(BodyPart::Nose), Some(Point2::new(5.0, 5.0)));
        assert!(!pose.keypoint(BodyPart::RightAnkle).is_present());
    }

    #[test]
    fn test_class_id_mapping() {
        for id in 0..6 {
            let class = GearClass::from_class_id(id).unwrap();
            assert_eq!(class.class_id(), id);
        }
        assert_eq!(GearClass::from_class_id(7), None);
    }

    #[test]
    fn test_bbox_json_is_array() {
        let b: BBox = serde_json::from_str("[1, 2, 3, 4]").unwrap();
        assert_eq!(b, BBox::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(serde_json::to_string(&b).unwrap(), "[1.0,2.0,3.0,4.0]");
    }
}
