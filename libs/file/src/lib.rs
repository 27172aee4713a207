//! Файловый single-node кластер для локальной разработки.
//!
//! Раскладка каталога:
//!
//! ```text
//! <data_dir>/
//!   topics/<name>/meta.json        — TopicMetadata
//!   topics/<name>/<partition>.jsonl — лог партиции, одна запись на строку
//!   staging/                        — временные каталоги createTopics
//! ```
//!
//! Offset записи — номер её строки в логе партиции.

mod cluster;
mod link;
mod record;

pub use cluster::FileCluster;
pub use link::FileLink;
pub use record::DiskRecord;
