//! 事件存储 (Event store)
//!
//! - MemoryEventStore: 进程内存储,测试与演示用
//! - SqliteEventStore: SQLite `events` 表

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::{Mutex, RwLock};
use rusqlite::{params, Connection};

use super::event::{EvidenceRef, ViolationEvent};
use crate::detection::types::TrackedIdentity;
use crate::error::{Result, SentinelError};

/// 事件存储接口
///
/// 实现方负责持久化,并能按时间倒序取回最近N条
pub trait EventStore: Send + Sync {
    fn append(&self, event: &ViolationEvent) -> Result<()>;

    /// 最近 `limit` 条事件,按时间从新到旧
    fn recent(&self, limit: usize) -> Result<Vec<ViolationEvent>>;
}

// ========== 内存存储 ==========

#[derive(Default)]
pub struct MemoryEventStore {
    events: RwLock<Vec<ViolationEvent>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

impl EventStore for MemoryEventStore {
    fn append(&self, event: &ViolationEvent) -> Result<()> {
        self.events.write().push(event.clone());
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<ViolationEvent>> {
        // 时间相同时后写入的在前
        let mut events: Vec<ViolationEvent> = self.events.read().iter().rev().cloned().collect();
        events.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
        events.truncate(limit);
        Ok(events)
    }
}

// ========== SQLite存储 ==========

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS events (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp       TEXT    NOT NULL,
    worker_id       INTEGER NOT NULL,
    person_name     TEXT    NOT NULL,
    violation_type  TEXT    NOT NULL,
    snapshot_path   TEXT    NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events (timestamp);
";

/// 标签在 `violation_type` 列中以逗号连接
const LABEL_SEPARATOR: &str = ",";

pub struct SqliteEventStore {
    conn: Mutex<Connection>,
}

impl SqliteEventStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// 定长UTC格式 (微秒),字符串排序即时间排序
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| SentinelError::Corrupt(format!("时间戳 {:?}: {}", raw, e)))
}

impl EventStore for SqliteEventStore {
    fn append(&self, event: &ViolationEvent) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO events (timestamp, worker_id, person_name, violation_type, snapshot_path)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                format_timestamp(event.timestamp()),
                event.identity().0,
                event.person_name(),
                event.labels().join(LABEL_SEPARATOR),
                event.evidence().0,
            ],
        )?;
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<ViolationEvent>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT timestamp, worker_id, violation_type, snapshot_path
             FROM events ORDER BY timestamp DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (timestamp, worker_id, violation_type, snapshot_path) = row?;
            let labels = violation_type
                .split(LABEL_SEPARATOR)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect();
            events.push(ViolationEvent::new(
                TrackedIdentity(worker_id),
                labels,
                EvidenceRef(snapshot_path),
                parse_timestamp(&timestamp)?,
            ));
        }
        Ok(events)
    }
}
