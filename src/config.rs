//! 监控配置 - 通过JSON文件调整参数

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// 装备置信度过滤参数
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub primary_floor: f32,   // 人/安全帽 (误判代价高)
    pub secondary_floor: f32, // 背心/护目镜/安全鞋/手套
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            primary_floor: 0.5,
            secondary_floor: 0.25,
        }
    }
}

/// 合规规则参数 (像素 / IOU)
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    pub head_tolerance: f32,      // 安全帽中心允许低于头部的像素
    pub vest_iou: f32,            // 背心与躯干框IOU阈值
    pub vest_fallback_ratio: f32, // 无躯干关键点时,人体框上部比例
    pub feet_margin: f32,         // 脚踝外扩像素
    pub boots_iou: f32,           // 安全鞋与脚部区域IOU阈值
    pub goggles_box: f32,         // 鼻子周围方框边长
    pub goggles_iou: f32,         // 护目镜IOU阈值
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            head_tolerance: 40.0,
            vest_iou: 0.05,
            vest_fallback_ratio: 0.6,
            feet_margin: 60.0,
            boots_iou: 0.05,
            goggles_box: 60.0,
            goggles_iou: 0.01,
        }
    }
}

/// 事件节流参数
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    pub cooldown_secs: f64, // 同一工人两次事件的最小间隔
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self { cooldown_secs: 5.0 }
    }
}

impl ThrottleConfig {
    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::milliseconds((self.cooldown_secs.max(0.0) * 1000.0) as i64)
    }
}

/// 多人场景下装备检测的关联范围
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GearScope {
    /// 整帧装备都参与每个人的判定
    #[default]
    WholeFrame,
    /// 只保留中心落在人体框(外扩 scope_margin)内的装备
    NearPerson,
}

/// 流水线参数
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub gear_scope: GearScope,
    pub scope_margin: f32,
    pub worker_capacity: usize, // 工作线程帧队列容量
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            gear_scope: GearScope::WholeFrame,
            scope_margin: 80.0,
            worker_capacity: 120,
        }
    }
}

/// 存储参数
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub alerts_dir: PathBuf,
    pub database: PathBuf,
    pub recent_limit: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            alerts_dir: PathBuf::from("alerts"),
            database: PathBuf::from("safety_system.db"),
            recent_limit: 10,
        }
    }
}

/// 快照标注参数
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotateConfig {
    pub font_path: PathBuf, // 标签字体 (找不到时只画色条)
    pub font_size: f32,     // 标签字号 (像素)
}

impl Default for AnnotateConfig {
    fn default() -> Self {
        Self {
            font_path: PathBuf::from("assets/font/msyh.ttc"),
            font_size: 16.0,
        }
    }
}

/// 监控系统总配置
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub filter: FilterConfig,
    pub rules: RuleConfig,
    pub throttle: ThrottleConfig,
    pub pipeline: PipelineConfig,
    pub storage: StorageConfig,
    pub annotate: AnnotateConfig,
}

impl MonitorConfig {
    /// 从JSON文件加载配置
    ///
    /// 文件不存在时写出默认配置; 解析失败时使用默认值
    pub fn load(path: &str) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(config) => {
                    info!("✅ 配置已从 {} 加载", path);
                    config
                }
                Err(e) => {
                    warn!("⚠️  配置文件解析失败: {}, 使用默认值", e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("📝 配置文件不存在,创建默认配置...");
                let config = Self::default();
                if let Err(e) = config.save(path) {
                    warn!("❌ 保存配置失败: {:#}", e);
                }
                config
            }
        }
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        use anyhow::Context;

        let json = serde_json::to_string_pretty(self).context("序列化配置失败")?;
        fs::write(path, json).with_context(|| format!("写入 {} 失败", path))?;
        info!("💾 配置已保存到 {}", path);
        Ok(())
    }

    /// 打印当前配置
    pub fn print_summary(&self) {
        info!("🎛️  当前监控配置:");
        info!(
            "  置信度下限: 安全帽 {:.2} / 其他装备 {:.2}",
            self.filter.primary_floor, self.filter.secondary_floor
        );
        info!("  头部容差: {:.0}px", self.rules.head_tolerance);
        info!("  事件冷却: {:.1}s", self.throttle.cooldown_secs);
        info!("  装备关联范围: {:?}", self.pipeline.gear_scope);
        info!("  证据目录: {}", self.storage.alerts_dir.display());
    }
}
