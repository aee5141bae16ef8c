//! 事件节流 (Per-identity event throttle)
//!
//! 每个跟踪ID两种状态:
//! - Eligible: 从未记录,或距上次事件已超过冷却时间
//! - Cooling:  冷却中,违规不再产生新事件
//!
//! 检查与记录在同一把锁内完成,同一ID在一个冷却窗口内最多放行一次。
//! 时间由调用方传入,便于测试。
//!
//! 清理以单调递增的水位线为准: 被清理的记录都早于 `水位线 - 冷却时间`,
//! 因此没有记录的ID在早于水位线的时刻一律视为冷却中。

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tracing::debug;

use crate::config::ThrottleConfig;
use crate::detection::types::TrackedIdentity;

/// 节流状态
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThrottleState {
    Eligible,
    Cooling,
}

#[derive(Default)]
struct Ledger {
    last_emit: HashMap<TrackedIdentity, DateTime<Utc>>,
    /// 历次清理时刻的最大值
    high_water: Option<DateTime<Utc>>,
}

impl Ledger {
    fn is_cooling(
        &self,
        identity: TrackedIdentity,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> bool {
        match self.last_emit.get(&identity) {
            Some(prev) => now - *prev < cooldown,
            None => self.high_water.is_some_and(|mark| now < mark),
        }
    }
}

pub struct EventThrottle {
    cooldown: Duration,
    ledger: Mutex<Ledger>,
}

impl Default for EventThrottle {
    fn default() -> Self {
        Self::new(ThrottleConfig::default().cooldown())
    }
}

impl EventThrottle {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            ledger: Mutex::new(Ledger::default()),
        }
    }

    /// 是否应为该ID生成事件; 放行时同时记录 `now`
    ///
    /// `now` 早于上次记录 (时钟回拨) 视为仍在冷却
    pub fn should_emit(&self, identity: TrackedIdentity, now: DateTime<Utc>) -> bool {
        let mut ledger = self.ledger.lock();
        if ledger.is_cooling(identity, now, self.cooldown) {
            return false;
        }
        ledger.last_emit.insert(identity, now);
        true
    }

    /// 查询状态 (不修改)
    pub fn state(&self, identity: TrackedIdentity, now: DateTime<Utc>) -> ThrottleState {
        if self.ledger.lock().is_cooling(identity, now, self.cooldown) {
            ThrottleState::Cooling
        } else {
            ThrottleState::Eligible
        }
    }

    /// 清理冷却已结束的ID,返回清理数量
    ///
    /// 以 `now` 与历史水位线中较晚者为准,乱序到达的旧帧不会提前清理记录
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let mut ledger = self.ledger.lock();
        let mark = ledger.high_water.map_or(now, |prev| prev.max(now));
        ledger.high_water = Some(mark);

        let cooldown = self.cooldown;
        let before = ledger.last_emit.len();
        ledger.last_emit.retain(|_, prev| mark - *prev < cooldown);
        let removed = before - ledger.last_emit.len();
        if removed > 0 {
            debug!("🧹 清理 {} 个冷却结束的跟踪ID", removed);
        }
        removed
    }

    /// 移除某个ID (例如跟踪器确认目标离开)
    pub fn forget(&self, identity: TrackedIdentity) {
        self.ledger.lock().last_emit.remove(&identity);
    }

    pub fn tracked_count(&self) -> usize {
        self.ledger.lock().last_emit.len()
    }
}
