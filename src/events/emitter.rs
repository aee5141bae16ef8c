//! 事件发送 (Event emitter)
//!
//! 只负责打包事件并交给存储; 不重试,存储失败原样返回给调用方

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use super::event::{EvidenceRef, ViolationEvent};
use super::store::EventStore;
use crate::compliance::ComplianceVerdict;
use crate::detection::types::TrackedIdentity;
use crate::error::Result;

#[derive(Clone)]
pub struct EventEmitter {
    store: Arc<dyn EventStore>,
}

impl EventEmitter {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// 构造事件并写入存储; 合规判定不产生事件
    pub fn emit(
        &self,
        verdict: &ComplianceVerdict,
        identity: TrackedIdentity,
        timestamp: DateTime<Utc>,
        evidence: EvidenceRef,
    ) -> Result<Option<ViolationEvent>> {
        let Some(event) = ViolationEvent::from_verdict(verdict, identity, evidence, timestamp)
        else {
            return Ok(None);
        };

        self.store.append(&event)?;
        info!(
            "🚨 [DB] 已记录违规 {}: {}",
            event.person_name(),
            event.labels().join(",")
        );
        Ok(Some(event))
    }
}
