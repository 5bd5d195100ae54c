//! # 住院数据存储模块
//!
//! 负责住院记录、手术记录、床位/病房/手术室资源和账务数据的进程内存储，
//! 并支持整体快照持久化为JSON文件。

pub mod ledger;
pub mod resources;
pub mod sequence;
pub mod snapshot;
pub mod store;

// 重新导出主要类型
pub use ledger::MemoryLedger;
pub use resources::{PlacementDirectory, ResourceEffect};
pub use sequence::PrefixedSequence;
pub use snapshot::SnapshotFile;
pub use store::WardStore;
