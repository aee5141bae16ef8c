/// 防护装备卫兵 (PPE Sentinel)
///
/// 回放上游检测器/跟踪器输出 (JSON Lines, 每行一帧),
/// 逐人判定安全帽/背心/安全鞋/护目镜,违规写入事件库。
///
/// 系统架构:
/// 1. 读取线程: 解析帧记录,加载帧图像
/// 2. 监控线程: 合规判定 + 事件节流 + 证据快照
/// 3. 主线程:   输出每人状态
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ppe_sentinel::pipeline::{spawn_worker, Emission, FrameJob};
use ppe_sentinel::{
    EventStore, FileEvidenceStore, FrameInput, MonitorConfig, SafetyMonitor, SqliteEventStore,
};

/// 防护装备卫兵参数
#[derive(Parser, Debug)]
#[command(author, version, about = "防护装备卫兵 - PPE合规监控", long_about = None)]
struct Args {
    /// 配置文件 (不存在时自动创建)
    #[arg(short, long, global = true, default_value = "sentinel.json")]
    config: String,

    /// 事件数据库 (覆盖配置文件)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 回放检测结果并记录违规
    Run {
        /// 帧记录文件 (JSON Lines)
        #[arg(short, long)]
        input: PathBuf,

        /// 证据快照目录 (覆盖配置文件)
        #[arg(long)]
        alerts: Option<PathBuf>,
    },
    /// 查看最近的违规事件
    Logs {
        /// 条数 (默认取配置文件)
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG 优先, 否则 info (--debug 时 debug)
    let default_level = if args.debug { "debug" } else { "info" };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = MonitorConfig::load(&args.config);
    if let Some(db) = args.db {
        config.storage.database = db;
    }

    let store = SqliteEventStore::open(&config.storage.database).with_context(|| {
        format!("打开事件库 {} 失败", config.storage.database.display())
    })?;

    match args.command {
        Command::Run { input, alerts } => {
            if let Some(alerts) = alerts {
                config.storage.alerts_dir = alerts;
            }
            run(config, Arc::new(store), input)
        }
        Command::Logs { limit } => {
            let limit = limit.unwrap_or(config.storage.recent_limit);
            let events = store.recent(limit).context("查询事件失败")?;
            println!("{}", serde_json::to_string_pretty(&events)?);
            Ok(())
        }
    }
}

fn run(config: MonitorConfig, store: Arc<SqliteEventStore>, input: PathBuf) -> Result<()> {
    config.print_summary();

    let file = File::open(&input).with_context(|| format!("打开 {} 失败", input.display()))?;
    let evidence = Arc::new(FileEvidenceStore::new(config.storage.alerts_dir.clone()));
    let monitor = Arc::new(SafetyMonitor::new(&config, store, evidence));
    let worker = spawn_worker(monitor, config.pipeline.worker_capacity);

    info!("🚀 防护装备卫兵启动");
    info!("📂 输入: {}", input.display());

    // ========== 读取线程 ==========
    let frames = worker.frames;
    let reader = std::thread::spawn(move || {
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    error!("❌ 读取第 {} 行失败: {}", line_no + 1, e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let frame: FrameInput = match serde_json::from_str(&line) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("⚠️  第 {} 行解析失败: {}", line_no + 1, e);
                    continue;
                }
            };
            let image = match frame.load_image() {
                Ok(image) => image,
                Err(e) => {
                    warn!("⚠️  第 {} 帧图像加载失败: {}", frame.frame_id, e);
                    continue;
                }
            };
            if frames.send(FrameJob { frame, image }).is_err() {
                break;
            }
        }
        // frames 在此处释放,监控线程随之退出
    });

    // ========== 主线程: 输出状态 ==========
    let mut total_frames = 0u64;
    let mut total_events = 0usize;
    for report in worker.reports.iter() {
        total_frames += 1;
        for person in &report.persons {
            let suffix = match &person.emission {
                Emission::Emitted(event) => format!(" → 📸 {}", event.evidence()),
                Emission::Suppressed => " (冷却中)".to_string(),
                Emission::Failed(e) => format!(" ❌ {}", e),
                Emission::NotRequired => String::new(),
            };
            println!(
                "[帧 {}] {}: {}{}",
                report.frame_id,
                person.identity,
                person.label(),
                suffix
            );
        }
        total_events += report.emitted().count();
    }

    if reader.join().is_err() {
        error!("❌ 读取线程异常退出");
    }
    if worker.handle.join().is_err() {
        error!("❌ 监控线程异常退出");
    }

    info!("✅ 处理完成: {} 帧, {} 条违规事件", total_frames, total_events);
    Ok(())
}
