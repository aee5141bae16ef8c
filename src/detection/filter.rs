//! 装备信号过滤 (Gear signal filter)
//!
//! 按类别设置置信度下限: 人/安全帽误判代价高,用高阈值;
//! 背心/护目镜/安全鞋/手套纹理与遮挡变化大,用低阈值保召回。

use tracing::trace;

use super::types::{GearClass, GearDetection, RawDetection};
use crate::config::FilterConfig;

#[derive(Clone, Debug)]
pub struct GearFilter {
    primary_floor: f32,
    secondary_floor: f32,
}

impl Default for GearFilter {
    fn default() -> Self {
        Self::new(&FilterConfig::default())
    }
}

impl GearFilter {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            primary_floor: config.primary_floor,
            secondary_floor: config.secondary_floor,
        }
    }

    /// 类别对应的置信度下限
    pub fn floor(&self, class: GearClass) -> f32 {
        match class {
            GearClass::Person | GearClass::Helmet => self.primary_floor,
            GearClass::Vest | GearClass::Goggles | GearClass::Boots | GearClass::Gloves => {
                self.secondary_floor
            }
        }
    }

    /// 过滤单帧原始检测,返回可参与判定的装备
    ///
    /// 未知类别ID直接丢弃; 置信度恰好等于下限的保留
    pub fn apply(&self, detections: &[RawDetection]) -> Vec<GearDetection> {
        detections
            .iter()
            .filter_map(|det| {
                let Some(class) = GearClass::from_class_id(det.class_id) else {
                    trace!("丢弃未知类别 {}", det.class_id);
                    return None;
                };
                if det.confidence < self.floor(class) {
                    return None;
                }
                Some(GearDetection::new(class, det.bbox, det.confidence))
            })
            .collect()
    }
}
