//! 监控流水线: 节流 / 证据 / 存储 / 工作线程

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use image::{Rgb, RgbImage};
use parking_lot::Mutex;

use ppe_sentinel::config::GearScope;
use ppe_sentinel::pipeline::{spawn_worker, Emission, FrameJob, MAX_CANVAS_SIDE};
use ppe_sentinel::{
    BBox, EquipmentItem, EventStore, EvidenceRef, EvidenceStore, FrameInput, MemoryEventStore,
    MonitorConfig, PersonInput, RawDetection, SafetyMonitor, SentinelError, TrackedIdentity,
};

// ========== 测试用协作方 ==========

/// 只计数、不落盘的证据存储 (保留最后一张快照)
#[derive(Default)]
struct CountingEvidence {
    saved: AtomicUsize,
    last: Mutex<Option<RgbImage>>,
}

impl EvidenceStore for CountingEvidence {
    fn save(
        &self,
        identity: TrackedIdentity,
        timestamp: DateTime<Utc>,
        frame: &RgbImage,
    ) -> ppe_sentinel::Result<EvidenceRef> {
        self.saved.fetch_add(1, Ordering::SeqCst);
        *self.last.lock() = Some(frame.clone());
        Ok(EvidenceRef(format!("mem://{}/{}", identity.0, timestamp.timestamp())))
    }
}

struct BrokenEvidence;

impl EvidenceStore for BrokenEvidence {
    fn save(
        &self,
        _: TrackedIdentity,
        _: DateTime<Utc>,
        _: &RgbImage,
    ) -> ppe_sentinel::Result<EvidenceRef> {
        Err(SentinelError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "磁盘只读",
        )))
    }
}

// ========== 帧构造 ==========

fn t(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap() + Duration::seconds(secs)
}

/// 以 dx 平移的全身姿态
fn keypoints(dx: f32) -> Vec<[f32; 2]> {
    let base = [
        [100.0, 60.0],
        [90.0, 50.0],
        [110.0, 50.0],
        [80.0, 55.0],
        [120.0, 55.0],
        [60.0, 120.0],
        [140.0, 120.0],
        [50.0, 190.0],
        [150.0, 190.0],
        [40.0, 250.0],
        [160.0, 250.0],
        [70.0, 300.0],
        [130.0, 300.0],
        [75.0, 430.0],
        [125.0, 430.0],
        [80.0, 560.0],
        [120.0, 560.0],
    ];
    base.iter().map(|[x, y]| [x + dx, *y]).collect()
}

fn person(worker: u32, dx: f32) -> PersonInput {
    PersonInput {
        worker_id: TrackedIdentity(worker),
        bbox: BBox::new(dx, 0.0, dx + 200.0, 600.0),
        keypoints: Some(keypoints(dx)),
    }
}

fn raw(class_id: u32, bbox: BBox) -> RawDetection {
    RawDetection {
        class_id,
        bbox,
        confidence: 0.9,
    }
}

/// worker 1 只戴安全帽和背心
fn violating_frame(frame_id: u64, secs: i64) -> FrameInput {
    FrameInput {
        frame_id,
        timestamp: Some(t(secs)),
        width: 640,
        height: 640,
        gear: vec![
            raw(1, BBox::new(60.0, -10.0, 140.0, 50.0)),
            raw(2, BBox::new(60.0, 120.0, 140.0, 138.0)),
        ],
        persons: vec![person(1, 0.0)],
        ..Default::default()
    }
}

fn monitor_with(
    config: &MonitorConfig,
) -> (SafetyMonitor, Arc<MemoryEventStore>, Arc<CountingEvidence>) {
    let store = Arc::new(MemoryEventStore::new());
    let evidence = Arc::new(CountingEvidence::default());
    let monitor = SafetyMonitor::new(config, store.clone(), evidence.clone());
    (monitor, store, evidence)
}

fn canvas() -> RgbImage {
    RgbImage::new(640, 640)
}

// ========== 测试 ==========

#[test]
fn cooldown_gates_events_across_frames() {
    let (monitor, store, evidence) = monitor_with(&MonitorConfig::default());

    let first = monitor.process_frame(&violating_frame(1, 0), &canvas());
    let second = monitor.process_frame(&violating_frame(2, 2), &canvas());
    let third = monitor.process_frame(&violating_frame(3, 6), &canvas());

    assert!(matches!(first.persons[0].emission, Emission::Emitted(_)));
    assert_eq!(second.persons[0].emission, Emission::Suppressed);
    assert!(matches!(third.persons[0].emission, Emission::Emitted(_)));

    // 冷却中的帧仍然给出判定
    assert_eq!(second.violation_count(), 1);
    assert_eq!(evidence.saved.load(Ordering::SeqCst), 2);

    let recent = store.recent(10).unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].timestamp(), t(6));
    assert_eq!(recent[0].labels(), ["Boots", "Goggles"]);
    assert_eq!(recent[0].evidence().0, format!("mem://1/{}", t(6).timestamp()));
}

/// 与 `violating_frame` 相同的违规场景,换成指定的跟踪ID
fn frame_with_worker(frame_id: u64, secs: i64, worker: u32) -> FrameInput {
    let mut frame = violating_frame(frame_id, secs);
    frame.persons[0].worker_id = TrackedIdentity(worker);
    frame
}

#[test]
fn out_of_order_frame_stays_in_cooldown() {
    let (monitor, store, _) = monitor_with(&MonitorConfig::default());

    let first = monitor.process_frame(&frame_with_worker(1, 0, 1), &canvas());
    let jump = monitor.process_frame(&frame_with_worker(2, 100, 2), &canvas());
    // 时间戳回退的旧帧: worker 1 仍在 t=0 开始的冷却窗口内
    let stale = monitor.process_frame(&frame_with_worker(3, 2, 1), &canvas());

    assert!(matches!(first.persons[0].emission, Emission::Emitted(_)));
    assert!(matches!(jump.persons[0].emission, Emission::Emitted(_)));
    assert_eq!(stale.persons[0].emission, Emission::Suppressed);
    assert_eq!(store.len(), 2);
    assert_eq!(monitor.throttle().tracked_count(), 1);
}

#[test]
fn evidence_snapshot_has_label_bar() {
    let (monitor, _, evidence) = monitor_with(&MonitorConfig::default());
    monitor.process_frame(&violating_frame(1, 0), &canvas());

    let snapshot = evidence.last.lock().take().unwrap();
    let black = Rgb([0, 0, 0]);
    // 人体框贴着顶边,色条画在框内左上角 (有字体时叠白字,都不会是黑色)
    for y in 2..18 {
        for x in 2..40 {
            assert_ne!(*snapshot.get_pixel(x, y), black, "({}, {})", x, y);
        }
    }
    // 框内色条以下、框外保持原样
    assert_eq!(*snapshot.get_pixel(100, 300), black);
    assert_eq!(*snapshot.get_pixel(400, 300), black);
}

#[test]
fn oversized_canvas_is_rejected() {
    let line = r#"{"frame_id": 7, "width": 4294967295, "height": 4294967295}"#;
    let frame: FrameInput = serde_json::from_str(line).unwrap();
    assert!(matches!(frame.load_image(), Err(SentinelError::InvalidFrame(_))));

    let wide = FrameInput {
        width: MAX_CANVAS_SIDE + 1,
        height: 10,
        ..Default::default()
    };
    assert!(matches!(wide.load_image(), Err(SentinelError::InvalidFrame(_))));

    let max = FrameInput {
        width: MAX_CANVAS_SIDE,
        height: 1,
        ..Default::default()
    };
    assert_eq!(max.load_image().unwrap().width(), MAX_CANVAS_SIDE);
}

#[test]
fn duplicate_identity_in_one_frame_emits_once() {
    let (monitor, store, _) = monitor_with(&MonitorConfig::default());
    let mut frame = violating_frame(1, 0);
    frame.persons.push(person(1, 0.0));

    let report = monitor.process_frame(&frame, &canvas());
    assert_eq!(report.emitted().count(), 1);
    assert_eq!(store.len(), 1);
}

#[test]
fn compliant_and_unassessed_people_emit_nothing() {
    let (monitor, store, _) = monitor_with(&MonitorConfig::default());
    let mut frame = violating_frame(1, 0);
    frame.gear.push(raw(4, BBox::new(30.0, 520.0, 170.0, 610.0)));
    frame.gear.push(raw(3, BBox::new(75.0, 45.0, 125.0, 75.0)));
    frame.persons.push(PersonInput {
        worker_id: TrackedIdentity(9),
        bbox: BBox::new(300.0, 0.0, 500.0, 600.0),
        keypoints: None,
    });

    let report = monitor.process_frame(&frame, &canvas());
    assert_eq!(report.persons[0].label(), "SAFE");
    assert_eq!(report.persons[1].verdict, None);
    assert_eq!(report.persons[1].label(), "UNASSESSED");
    assert!(report
        .persons
        .iter()
        .all(|p| p.emission == Emission::NotRequired));
    assert!(store.is_empty());
}

#[test]
fn failed_evidence_keeps_throttle_state() {
    let store = Arc::new(MemoryEventStore::new());
    let monitor = SafetyMonitor::new(
        &MonitorConfig::default(),
        store.clone(),
        Arc::new(BrokenEvidence),
    );

    let first = monitor.process_frame(&violating_frame(1, 0), &canvas());
    assert!(matches!(first.persons[0].emission, Emission::Failed(_)));

    // 失败不重试,冷却照常生效
    let second = monitor.process_frame(&violating_frame(2, 1), &canvas());
    assert_eq!(second.persons[0].emission, Emission::Suppressed);
    assert!(store.is_empty());
}

#[test]
fn gear_scope_whole_frame_vs_near_person() {
    // worker 2 在右侧,只有鼻子关键点 → 背心走退化规则
    let frame = FrameInput {
        frame_id: 1,
        timestamp: Some(t(0)),
        gear: vec![raw(2, BBox::new(60.0, 120.0, 140.0, 138.0))],
        persons: vec![PersonInput {
            worker_id: TrackedIdentity(2),
            bbox: BBox::new(400.0, 0.0, 600.0, 600.0),
            keypoints: Some(vec![[500.0, 60.0]]),
        }],
        ..Default::default()
    };

    // 整帧范围: worker 1 的背心也被计入
    let (whole, _, _) = monitor_with(&MonitorConfig::default());
    let verdicts = whole.evaluate(&frame);
    let v = verdicts[0].as_ref().unwrap();
    assert!(!v.missing().contains(&EquipmentItem::Vest));

    // 按人分组: 背心中心不在 worker 2 附近
    let mut config = MonitorConfig::default();
    config.pipeline.gear_scope = GearScope::NearPerson;
    let (near, _, _) = monitor_with(&config);
    let verdicts = near.evaluate(&frame);
    let v = verdicts[0].as_ref().unwrap();
    assert!(v.missing().contains(&EquipmentItem::Vest));
}

#[test]
fn worker_thread_processes_in_order() {
    let (monitor, store, _) = monitor_with(&MonitorConfig::default());
    let worker = spawn_worker(Arc::new(monitor), 4);

    for (i, secs) in [0, 1, 7].into_iter().enumerate() {
        worker
            .frames
            .send(FrameJob {
                frame: violating_frame(i as u64, secs),
                image: canvas(),
            })
            .unwrap();
    }
    drop(worker.frames);

    let reports: Vec<_> = worker.reports.iter().collect();
    worker.handle.join().unwrap();

    assert_eq!(reports.iter().map(|r| r.frame_id).collect::<Vec<_>>(), vec![0, 1, 2]);
    assert_eq!(store.len(), 2);
}

#[test]
fn frame_record_from_json_line() {
    let line = r#"{
        "frame_id": 12,
        "timestamp": "2024-05-01T08:30:00Z",
        "width": 640, "height": 480,
        "gear": [{"class_id": 1, "bbox": [60, -10, 140, 50], "confidence": 0.8}],
        "persons": [{"worker_id": 3, "bbox": [0, 0, 200, 600], "keypoints": [[100, 60]]}]
    }"#;
    let frame: FrameInput = serde_json::from_str(line).unwrap();
    assert_eq!(frame.frame_id, 12);
    assert_eq!(frame.persons[0].worker_id, TrackedIdentity(3));

    let image = frame.load_image().unwrap();
    assert_eq!((image.width(), image.height()), (640, 480));

    let (monitor, _, _) = monitor_with(&MonitorConfig::default());
    let report = monitor.process_frame(&frame, &image);
    // 安全帽已戴; 无躯干/脚踝: 背心走退化规则, 安全鞋不判定
    assert_eq!(report.persons[0].label(), "VIOLATION [Vest,Goggles]");
}
