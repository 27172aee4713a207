//! In-process кластер для courier: реализует `Connector` / `BrokerLink`
//! поверх памяти процесса. Используется в тестах и для dry-run CLI.

mod cluster;
mod link;

pub use cluster::{MemoryCluster, MemoryClusterBuilder, StoredRecord};
pub use link::MemoryLink;
