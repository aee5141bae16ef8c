/// 合规监控流水线 (Safety monitoring pipeline)
///
/// 每帧流程:
/// 1. 装备置信度过滤
/// 2. 逐人合规判定 (rayon并行,判定器无状态)
/// 3. 不合规 → 按跟踪ID节流 → 保存证据快照 → 写入事件
///
/// - annotate: 快照标注 (框 + 状态色条)
/// - worker:   独立工作线程
pub mod annotate;
pub mod worker;

use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use image::RgbImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::compliance::{ComplianceClassifier, ComplianceVerdict, EventThrottle};
use crate::config::{GearScope, MonitorConfig};
use crate::detection::geometry::point_in_box;
use crate::detection::types::{BBox, GearDetection, PersonPose, RawDetection, TrackedIdentity};
use crate::detection::GearFilter;
use crate::error::{Result, SentinelError};
use crate::events::{EventEmitter, EventStore, EvidenceStore, ViolationEvent};

pub use annotate::{verdict_label, Annotator};
pub use worker::{spawn_worker, FrameJob, MonitorWorker};

// ========== 输入 (检测器 + 跟踪器输出) ==========

/// 空白画布的最大边长 (8K)
pub const MAX_CANVAS_SIDE: u32 = 8192;

/// 单个人: 跟踪ID + 人体框 + 可选的COCO关键点
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersonInput {
    pub worker_id: TrackedIdentity,
    pub bbox: BBox,
    #[serde(default)]
    pub keypoints: Option<Vec<[f32; 2]>>,
}

impl PersonInput {
    /// 无关键点时返回None (该人不参与判定)
    pub fn pose(&self) -> Option<PersonPose> {
        self.keypoints
            .as_deref()
            .map(|points| PersonPose::from_coco(self.bbox, points))
    }
}

/// 单帧输入
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameInput {
    #[serde(default)]
    pub frame_id: u64,
    /// 缺省时使用处理时刻
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// 帧图像路径 (证据快照来源)
    #[serde(default)]
    pub image: Option<PathBuf>,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub gear: Vec<RawDetection>,
    #[serde(default)]
    pub persons: Vec<PersonInput>,
}

impl FrameInput {
    /// 加载帧图像; 没有图像路径时返回同尺寸的空白画布
    ///
    /// 画布任一边超过 [`MAX_CANVAS_SIDE`] 时返回错误
    pub fn load_image(&self) -> Result<RgbImage> {
        if let Some(path) = &self.image {
            return Ok(image::open(path)?.to_rgb8());
        }
        if self.width > MAX_CANVAS_SIDE || self.height > MAX_CANVAS_SIDE {
            return Err(SentinelError::InvalidFrame(format!(
                "帧 {} 画布尺寸 {}x{} 超过上限 {}",
                self.frame_id, self.width, self.height, MAX_CANVAS_SIDE
            )));
        }
        Ok(RgbImage::new(self.width.max(1), self.height.max(1)))
    }
}

// ========== 输出 ==========

/// 事件发送结果
#[derive(Clone, Debug, PartialEq)]
pub enum Emission {
    /// 合规或未判定
    NotRequired,
    /// 冷却中
    Suppressed,
    Emitted(ViolationEvent),
    /// 证据或存储失败 (节流状态保持不变,不重试)
    Failed(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct PersonReport {
    pub identity: TrackedIdentity,
    pub bbox: BBox,
    /// None: 无姿态,未判定
    pub verdict: Option<ComplianceVerdict>,
    pub emission: Emission,
}

impl PersonReport {
    pub fn is_violation(&self) -> bool {
        self.verdict.as_ref().is_some_and(|v| !v.is_compliant())
    }

    /// 状态文字: `SAFE` / `VIOLATION [...]` / `UNASSESSED`
    pub fn label(&self) -> String {
        match &self.verdict {
            Some(v) => verdict_label(v),
            None => "UNASSESSED".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    pub frame_id: u64,
    pub timestamp: DateTime<Utc>,
    pub persons: Vec<PersonReport>,
}

impl FrameReport {
    pub fn violation_count(&self) -> usize {
        self.persons.iter().filter(|p| p.is_violation()).count()
    }

    pub fn emitted(&self) -> impl Iterator<Item = &ViolationEvent> {
        self.persons.iter().filter_map(|p| match &p.emission {
            Emission::Emitted(event) => Some(event),
            _ => None,
        })
    }
}

// ========== 监控器 ==========

pub struct SafetyMonitor {
    filter: GearFilter,
    classifier: ComplianceClassifier,
    throttle: EventThrottle,
    emitter: EventEmitter,
    evidence: Arc<dyn EvidenceStore>,
    annotator: Annotator,
    gear_scope: GearScope,
    scope_margin: f32,
}

impl SafetyMonitor {
    pub fn new(
        config: &MonitorConfig,
        store: Arc<dyn EventStore>,
        evidence: Arc<dyn EvidenceStore>,
    ) -> Self {
        Self {
            filter: GearFilter::new(&config.filter),
            classifier: ComplianceClassifier::new(config.rules.clone()),
            throttle: EventThrottle::new(config.throttle.cooldown()),
            emitter: EventEmitter::new(store),
            evidence,
            annotator: Annotator::new(&config.annotate),
            gear_scope: config.pipeline.gear_scope,
            scope_margin: config.pipeline.scope_margin,
        }
    }

    pub fn throttle(&self) -> &EventThrottle {
        &self.throttle
    }

    /// 判定阶段 (无副作用): 每人一个结果,顺序与输入一致
    pub fn evaluate(&self, frame: &FrameInput) -> Vec<Option<ComplianceVerdict>> {
        let gear = self.filter.apply(&frame.gear);
        frame
            .persons
            .par_iter()
            .map(|person| {
                let pose = person.pose()?;
                let scoped = self.scope_gear(&gear, &person.bbox);
                Some(self.classifier.evaluate(&pose, &scoped))
            })
            .collect()
    }

    /// 完整处理一帧: 判定 + 节流 + 证据 + 事件
    pub fn process_frame(&self, frame: &FrameInput, image: &RgbImage) -> FrameReport {
        let timestamp = frame.timestamp.unwrap_or_else(Utc::now);
        let verdicts = self.evaluate(frame);

        // 标注后的快照,只有真正需要保存证据时才生成
        let mut snapshot: Option<RgbImage> = None;
        let mut emissions = Vec::with_capacity(verdicts.len());

        for (person, verdict) in frame.persons.iter().zip(&verdicts) {
            let emission = match verdict {
                None => {
                    debug!("❔ {} 无姿态关键点,跳过判定", person.worker_id);
                    Emission::NotRequired
                }
                Some(v) if v.is_compliant() => Emission::NotRequired,
                Some(v) => {
                    if self.throttle.should_emit(person.worker_id, timestamp) {
                        let snapshot = snapshot.get_or_insert_with(|| {
                            self.annotate_snapshot(image, &frame.persons, &verdicts)
                        });
                        self.emit(person.worker_id, v, timestamp, snapshot)
                    } else {
                        debug!("⏳ {} 冷却中,跳过事件", person.worker_id);
                        Emission::Suppressed
                    }
                }
            };
            emissions.push(emission);
        }

        let persons = frame
            .persons
            .iter()
            .zip(verdicts)
            .zip(emissions)
            .map(|((person, verdict), emission)| PersonReport {
                identity: person.worker_id,
                bbox: person.bbox,
                verdict,
                emission,
            })
            .collect();

        // 水位线单调递增,乱序帧不会提前清理冷却中的ID
        self.throttle.prune(timestamp);

        FrameReport {
            frame_id: frame.frame_id,
            timestamp,
            persons,
        }
    }

    fn emit(
        &self,
        identity: TrackedIdentity,
        verdict: &ComplianceVerdict,
        timestamp: DateTime<Utc>,
        snapshot: &RgbImage,
    ) -> Emission {
        let evidence = match self.evidence.save(identity, timestamp, snapshot) {
            Ok(evidence) => evidence,
            Err(e) => {
                error!("❌ {} 证据保存失败: {}", identity, e);
                return Emission::Failed(e.to_string());
            }
        };
        match self.emitter.emit(verdict, identity, timestamp, evidence) {
            Ok(Some(event)) => Emission::Emitted(event),
            Ok(None) => Emission::NotRequired,
            Err(e) => {
                error!("❌ {} 事件写入失败: {}", identity, e);
                Emission::Failed(e.to_string())
            }
        }
    }

    /// 复制帧图像并画出所有已判定的人
    fn annotate_snapshot(
        &self,
        image: &RgbImage,
        persons: &[PersonInput],
        verdicts: &[Option<ComplianceVerdict>],
    ) -> RgbImage {
        let mut snapshot = image.clone();
        for (person, verdict) in persons.iter().zip(verdicts) {
            if let Some(v) = verdict {
                self.annotator.annotate_person(&mut snapshot, &person.bbox, v);
            }
        }
        snapshot
    }

    /// 装备关联范围
    fn scope_gear<'a>(&self, gear: &'a [GearDetection], person: &BBox) -> Cow<'a, [GearDetection]> {
        match self.gear_scope {
            GearScope::WholeFrame => Cow::Borrowed(gear),
            GearScope::NearPerson => {
                let region = person.expand(self.scope_margin);
                Cow::Owned(
                    gear.iter()
                        .filter(|g| point_in_box(g.bbox.center(), &region))
                        .copied()
                        .collect(),
                )
            }
        }
    }
}
