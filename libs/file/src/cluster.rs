use std::future::Future;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use courier_api::{BrokerLink, ClusterConfig, ConnectionError, Connector, DefaultPartitioner};

use crate::link::FileLink;
use crate::record::DiskRecord;

const DEFAULT_MAX_MESSAGE_BYTES: usize = 1_048_576;

/// Состояние записи, общее для всех link'ов одного `FileCluster`.
///
/// Offset'ы здесь не кэшируются: каталог может писать другой процесс
/// или другой `FileCluster`, поэтому следующий offset считается заново
/// под файловой блокировкой партиции.
#[derive(Default)]
pub(crate) struct LogState {
    pub(crate) partitioner: DefaultPartitioner,
}

// ════════════════════════════════════════════════════════════════
//  FileCluster
// ════════════════════════════════════════════════════════════════

/// Кластер из одного брокера поверх каталога на диске.
///
/// Append в партицию идёт под эксклюзивным `flock` на её файле, так что
/// offset'ы уникальны и между процессами. Создание topic'а тоже атомарно
/// между процессами: каталог собирается в `staging/` и переименовывается
/// в `topics/<name>`.
#[derive(Clone)]
pub struct FileCluster {
    data_dir: PathBuf,
    max_message_bytes: usize,
    log: Arc<tokio::sync::Mutex<LogState>>,
}

impl FileCluster {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            log: Arc::new(tokio::sync::Mutex::new(LogState::default())),
        }
    }

    pub fn with_max_message_bytes(mut self, max: usize) -> Self {
        self.max_message_bytes = max;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub(crate) fn max_message_bytes(&self) -> usize {
        self.max_message_bytes
    }

    pub(crate) fn log(&self) -> &tokio::sync::Mutex<LogState> {
        &self.log
    }

    // ── Layout ──

    pub(crate) fn topics_dir(&self) -> PathBuf {
        self.data_dir.join("topics")
    }

    pub(crate) fn staging_dir(&self) -> PathBuf {
        self.data_dir.join("staging")
    }

    pub(crate) fn topic_dir(&self, topic: &str) -> PathBuf {
        self.topics_dir().join(topic)
    }

    pub(crate) fn meta_path(&self, topic: &str) -> PathBuf {
        self.topic_dir(topic).join("meta.json")
    }

    pub(crate) fn partition_path(&self, topic: &str, partition: u32) -> PathBuf {
        self.topic_dir(topic).join(format!("{partition}.jsonl"))
    }

    /// Прочитать лог партиции целиком.
    pub fn read_partition(&self, topic: &str, partition: u32) -> std::io::Result<Vec<DiskRecord>> {
        let path = self.partition_path(topic, partition);
        let f = std::fs::File::open(&path)?;
        let reader = std::io::BufReader::new(f);

        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let record: DiskRecord = serde_json::from_str(&line).map_err(|e| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("{}: {e}", path.display()),
                )
            })?;
            records.push(record);
        }
        Ok(records)
    }

    fn prepare_dirs(&self) -> Result<(), ConnectionError> {
        if !self.data_dir.is_dir() {
            return Err(ConnectionError::unreachable(format!(
                "data directory {} does not exist",
                self.data_dir.display()
            )));
        }
        for dir in [self.topics_dir(), self.staging_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                ConnectionError::unreachable(format!("mkdir {}: {e}", dir.display()))
            })?;
        }
        Ok(())
    }
}

impl Connector for FileCluster {
    fn connect<'a>(
        &'a self,
        config: &'a ClusterConfig,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn BrokerLink>, ConnectionError>> + Send + 'a>> {
        Box::pin(async move {
            self.prepare_dirs()?;
            tracing::debug!(
                client_id = %config.client_id,
                data_dir = %self.data_dir.display(),
                "file cluster: connection accepted"
            );
            Ok(Box::new(FileLink::new(self.clone())) as Box<dyn BrokerLink>)
        })
    }
}
