//! 防护装备合规判定 (PPE compliance classifier)
//!
//! 每种装备一条独立规则,每次调用全部执行:
//! 1. 安全帽: 中心在头部附近 → 佩戴; 手腕在帽框内 → 手持
//! 2. 背心:   与肩-髋躯干框的IOU,关键点不足时退化为人体框上部判定
//! 3. 安全鞋: 脚踝外扩区域的IOU,无脚踝关键点时不判定
//! 4. 护目镜: 鼻子周围方框的IOU,无鼻子关键点时不判定
//!
//! 手套不参与判定: 仅凭手腕关键点无法区分戴/未戴,规则保留为空。
//!
//! 判定使用调用方传入的全部装备检测,不按人分组 (分组见 `pipeline`)。
//! 关键点缺失只会让单条规则退化或跳过,不会产生错误。

use tracing::trace;

use super::verdict::{ComplianceVerdict, EquipmentItem, Violation};
use crate::config::RuleConfig;
use crate::detection::geometry::{enclosing_box, iou, point_in_box};
use crate::detection::types::{BBox, BodyPart, GearClass, GearDetection, PersonPose, Point2};

const TORSO: [BodyPart; 4] = [
    BodyPart::LeftShoulder,
    BodyPart::RightShoulder,
    BodyPart::LeftHip,
    BodyPart::RightHip,
];
const WRISTS: [BodyPart; 2] = [BodyPart::LeftWrist, BodyPart::RightWrist];
const ANKLES: [BodyPart; 2] = [BodyPart::LeftAnkle, BodyPart::RightAnkle];

/// 合规判定器 (无状态,可多线程共享)
#[derive(Clone, Debug, Default)]
pub struct ComplianceClassifier {
    rules: RuleConfig,
}

impl ComplianceClassifier {
    pub fn new(rules: RuleConfig) -> Self {
        Self { rules }
    }

    /// 判定单人合规情况
    pub fn evaluate(&self, pose: &PersonPose, gear: &[GearDetection]) -> ComplianceVerdict {
        let mut verdict = ComplianceVerdict::new();

        self.check_helmet(pose, gear, &mut verdict);
        self.check_vest(pose, gear, &mut verdict);
        self.check_boots(pose, gear, &mut verdict);
        self.check_goggles(pose, gear, &mut verdict);

        trace!(
            missing = ?verdict.missing_labels(),
            violations = ?verdict.violation_labels(),
            "判定完成"
        );
        verdict
    }

    fn check_helmet(
        &self,
        pose: &PersonPose,
        gear: &[GearDetection],
        verdict: &mut ComplianceVerdict,
    ) {
        let person = pose.bbox();
        // 头部参考高度: 鼻子,缺失时用人体框顶边
        let head_y = pose.point(BodyPart::Nose).map_or(person.y1, |p| p.y);
        let wrists: Vec<Point2> = WRISTS.iter().filter_map(|&w| pose.point(w)).collect();

        let mut worn = false;
        let mut carried = false;
        for helmet in of_class(gear, GearClass::Helmet) {
            let c = helmet.bbox.center();
            if c.y < head_y + self.rules.head_tolerance && person.x1 < c.x && c.x < person.x2 {
                worn = true;
            }
            if wrists.iter().any(|w| point_in_box(*w, &helmet.bbox)) {
                carried = true;
            }
        }

        if !worn {
            verdict.add_missing(EquipmentItem::Helmet);
            if carried {
                verdict.add_violation(Violation::CarryingHelmet);
            }
        }
    }

    fn check_vest(
        &self,
        pose: &PersonPose,
        gear: &[GearDetection],
        verdict: &mut ComplianceVerdict,
    ) {
        let torso = TORSO
            .iter()
            .map(|&part| pose.point(part))
            .collect::<Option<Vec<_>>>()
            .and_then(enclosing_box);

        let mut vests = of_class(gear, GearClass::Vest);
        let worn = match torso {
            Some(torso) => vests.any(|v| iou(&v.bbox, &torso) > self.rules.vest_iou),
            None => {
                // 肩/髋不全: 背心中心落在人体框上部即可
                let person = pose.bbox();
                let limit = person.y1 + person.height() * self.rules.vest_fallback_ratio;
                vests.any(|v| {
                    let cy = v.bbox.center().y;
                    person.y1 < cy && cy < limit
                })
            }
        };

        if !worn {
            verdict.add_missing(EquipmentItem::Vest);
        }
    }

    fn check_boots(
        &self,
        pose: &PersonPose,
        gear: &[GearDetection],
        verdict: &mut ComplianceVerdict,
    ) {
        let Some(ankles) = enclosing_box(ANKLES.iter().filter_map(|&a| pose.point(a))) else {
            return;
        };
        let feet = ankles.expand(self.rules.feet_margin);

        if !matches_any(gear, GearClass::Boots, &feet, self.rules.boots_iou) {
            verdict.add_missing(EquipmentItem::Boots);
        }
    }

    fn check_goggles(
        &self,
        pose: &PersonPose,
        gear: &[GearDetection],
        verdict: &mut ComplianceVerdict,
    ) {
        let Some(nose) = pose.point(BodyPart::Nose) else {
            return;
        };
        let eyes = BBox::centered(nose, self.rules.goggles_box);

        if !matches_any(gear, GearClass::Goggles, &eyes, self.rules.goggles_iou) {
            verdict.add_missing(EquipmentItem::Goggles);
        }
    }
}

fn of_class(gear: &[GearDetection], class: GearClass) -> impl Iterator<Item = &GearDetection> {
    gear.iter().filter(move |g| g.class == class)
}

fn matches_any(gear: &[GearDetection], class: GearClass, region: &BBox, threshold: f32) -> bool {
    of_class(gear, class).any(|g| iou(&g.bbox, region) > threshold)
}
