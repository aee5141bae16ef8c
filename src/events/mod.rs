/// 违规事件系统 (Violation events)
///
/// - event:    事件与证据引用
/// - emitter:  事件打包并写入存储
/// - store:    事件存储 (内存 / SQLite)
/// - evidence: 证据快照 (JPEG)
pub mod emitter;
pub mod event;
pub mod evidence;
pub mod store;

pub use emitter::EventEmitter;
pub use event::{EvidenceRef, ViolationEvent};
pub use evidence::{EvidenceStore, FileEvidenceStore};
pub use store::{EventStore, MemoryEventStore, SqliteEventStore};
