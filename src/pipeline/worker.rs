//! 监控工作线程 (Monitor worker)
//! 职责: 接收FrameJob → 合规判定 + 事件 → 发送FrameReport

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use image::RgbImage;
use tracing::{debug, info};

use super::{FrameInput, FrameReport, SafetyMonitor};

/// 待处理帧 (帧数据 + 图像)
pub struct FrameJob {
    pub frame: FrameInput,
    pub image: RgbImage,
}

/// 工作线程句柄
///
/// 丢弃 `frames` 发送端后线程自然退出
pub struct MonitorWorker {
    pub frames: Sender<FrameJob>,
    pub reports: Receiver<FrameReport>,
    pub handle: JoinHandle<()>,
}

/// 启动工作线程, `capacity` 为帧队列容量
pub fn spawn_worker(monitor: Arc<SafetyMonitor>, capacity: usize) -> MonitorWorker {
    let (tx_frame, rx_frame) = crossbeam_channel::bounded::<FrameJob>(capacity);
    let (tx_report, rx_report) = crossbeam_channel::bounded::<FrameReport>(capacity);

    let handle = std::thread::spawn(move || run(monitor, rx_frame, tx_report));

    MonitorWorker {
        frames: tx_frame,
        reports: rx_report,
        handle,
    }
}

fn run(monitor: Arc<SafetyMonitor>, rx: Receiver<FrameJob>, tx: Sender<FrameReport>) {
    info!("🔍 监控线程启动");

    let mut count: u64 = 0;
    let mut last = Instant::now();

    while let Ok(job) = rx.recv() {
        let report = monitor.process_frame(&job.frame, &job.image);

        count += 1;
        let elapsed = last.elapsed().as_secs_f64();
        if elapsed >= 1.0 {
            debug!(
                "📊 处理速度: {:.1} FPS, 冷却中ID: {}",
                count as f64 / elapsed,
                monitor.throttle().tracked_count()
            );
            count = 0;
            last = Instant::now();
        }

        if tx.send(report).is_err() {
            // 报告接收端已关闭
            break;
        }
    }

    info!("🛑 监控线程退出");
}
