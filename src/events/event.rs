//! 违规事件 (Violation event)

use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::compliance::ComplianceVerdict;
use crate::detection::types::TrackedIdentity;

/// 证据快照的引用 (文件路径或对象ID)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceRef(pub String);

impl fmt::Display for EvidenceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 事件时间戳精度 (小数秒位数), 与存储格式一致
pub const TIMESTAMP_DIGITS: u16 = 6;

/// 交给事件存储的记录,构造后不可修改
///
/// 时间戳截断到微秒,存储读回的事件与写入时相等
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViolationEvent {
    identity: TrackedIdentity,
    labels: Vec<String>,
    evidence: EvidenceRef,
    timestamp: DateTime<Utc>,
}

impl ViolationEvent {
    pub fn new(
        identity: TrackedIdentity,
        labels: Vec<String>,
        evidence: EvidenceRef,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            identity,
            labels,
            evidence,
            timestamp: timestamp.trunc_subsecs(TIMESTAMP_DIGITS),
        }
    }

    /// 由不合规的判定结果构造; 合规时返回None
    pub fn from_verdict(
        verdict: &ComplianceVerdict,
        identity: TrackedIdentity,
        evidence: EvidenceRef,
        timestamp: DateTime<Utc>,
    ) -> Option<Self> {
        if verdict.is_compliant() {
            return None;
        }
        Some(Self::new(identity, verdict.labels(), evidence, timestamp))
    }

    pub fn identity(&self) -> TrackedIdentity {
        self.identity
    }

    /// 显示名称, 例如 `Worker 3`
    pub fn person_name(&self) -> String {
        self.identity.to_string()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn evidence(&self) -> &EvidenceRef {
        &self.evidence
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
