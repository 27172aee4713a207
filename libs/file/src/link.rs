use std::future::Future;
use std::io::{BufRead, Write};
use std::path::Path;
use std::pin::Pin;

use courier_api::{
    now_ms, validate_topic_name, BrokerLink, ConnectionError, DeliveryError, DeliveryErrorKind,
    DeliveryReport, Message, ProvisionErrorKind, TopicMetadata, TopicProvisionError, TopicSpec,
};

use crate::cluster::{FileCluster, LogState};
use crate::record::DiskRecord;

fn io_err(context: String, e: std::io::Error) -> TopicProvisionError {
    TopicProvisionError::new(ProvisionErrorKind::Other, format!("{context}: {e}"))
}

/// Соединение с `FileCluster`.
pub struct FileLink {
    cluster: FileCluster,
    open: bool,
}

impl FileLink {
    pub(crate) fn new(cluster: FileCluster) -> Self {
        Self { cluster, open: true }
    }

    // ── createTopics ──

    fn create_one(&self, spec: &TopicSpec) -> Result<(), TopicProvisionError> {
        let name = spec.name();
        let target = self.cluster.topic_dir(name);
        if target.exists() {
            return Err(TopicProvisionError::already_exists(name));
        }
        if spec.replication_factor() > 1 {
            return Err(TopicProvisionError::new(
                ProvisionErrorKind::InvalidSpec,
                format!(
                    "replication factor {} larger than available brokers 1",
                    spec.replication_factor()
                ),
            ));
        }

        let staging = self
            .cluster
            .staging_dir()
            .join(format!("{name}.{}.{}", std::process::id(), now_ms()));
        std::fs::create_dir_all(&staging).map_err(|e| io_err(format!("mkdir {}", staging.display()), e))?;

        if let Err(e) = write_topic_files(&staging, spec) {
            let _ = std::fs::remove_dir_all(&staging);
            return Err(e);
        }

        if let Err(e) = std::fs::rename(&staging, &target) {
            let _ = std::fs::remove_dir_all(&staging);
            // Другой процесс успел создать topic между проверкой и rename.
            if target.exists() {
                return Err(TopicProvisionError::already_exists(name));
            }
            return Err(io_err(format!("rename to {}", target.display()), e));
        }
        Ok(())
    }

    // ── Metadata ──

    fn read_meta(&self, topic: &str) -> std::io::Result<Option<TopicMetadata>> {
        let path = self.cluster.meta_path(topic);
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, format!("{}: {e}", path.display())))
    }

    fn list_metadata(&self, filter: Option<&[String]>) -> Result<Vec<TopicMetadata>, TopicProvisionError> {
        let dir = self.cluster.topics_dir();
        let entries = std::fs::read_dir(&dir).map_err(|e| io_err(format!("read_dir {}", dir.display()), e))?;

        let mut found = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_err(format!("read_dir {}", dir.display()), e))?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if let Some(names) = filter {
                if !names.contains(&name) {
                    continue;
                }
            }
            if let Some(meta) = self.read_meta(&name).map_err(|e| io_err(format!("topic '{name}'"), e))? {
                found.push(meta);
            }
        }
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    // ── Produce ──

    fn append(&self, log: &mut LogState, message: &Message) -> Result<DeliveryReport, DeliveryError> {
        message.validate()?;
        validate_topic_name(&message.topic).map_err(|e| DeliveryError::invalid_topic(e.to_string()))?;

        let meta = self
            .read_meta(&message.topic)
            .map_err(|e| DeliveryError::broker_unavailable(format!("read metadata: {e}")))?
            .ok_or_else(|| DeliveryError::invalid_topic(format!("unknown topic '{}'", message.topic)))?;

        let size = message.encoded_len();
        let max = self.cluster.max_message_bytes();
        if size > max {
            return Err(DeliveryError::new(
                DeliveryErrorKind::MessageTooLarge,
                format!("message is {size} bytes, broker limit is {max}"),
            ));
        }

        let partition = log.partitioner.partition(message, meta.partitions)?;
        let path = self.cluster.partition_path(&message.topic, partition);
        let unavailable = |op: &str, e: std::io::Error| {
            DeliveryError::broker_unavailable(format!("{op} {}: {e}", path.display()))
        };

        let file = std::fs::OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .map_err(|e| unavailable("open", e))?;
        let mut lock = fd_lock::RwLock::new(file);
        let mut guard = lock.write().map_err(|e| unavailable("lock", e))?;

        let offset = count_records(&guard).map_err(|e| unavailable("read", e))?;
        let timestamp_ms = message.timestamp_ms.unwrap_or_else(now_ms);
        let line = serde_json::to_string(&DiskRecord {
            offset,
            timestamp_ms,
            key: message.key.clone(),
            value: message.value.clone(),
            headers: message.headers.clone(),
        })
        .map_err(|e| DeliveryError::invalid_message(format!("json serialize: {e}")))?;
        writeln!(&mut *guard, "{line}").map_err(|e| unavailable("write", e))?;
        drop(guard);

        Ok(DeliveryReport {
            topic: message.topic.clone(),
            partition,
            offset,
            timestamp_ms,
        })
    }
}

fn write_topic_files(dir: &Path, spec: &TopicSpec) -> Result<(), TopicProvisionError> {
    let meta = serde_json::to_vec_pretty(&TopicMetadata::from(spec))
        .map_err(|e| TopicProvisionError::new(ProvisionErrorKind::Other, format!("json serialize: {e}")))?;
    let meta_path = dir.join("meta.json");
    std::fs::write(&meta_path, meta).map_err(|e| io_err(format!("write {}", meta_path.display()), e))?;

    for partition in 0..spec.num_partitions() {
        let path = dir.join(format!("{partition}.jsonl"));
        std::fs::File::create(&path).map_err(|e| io_err(format!("create {}", path.display()), e))?;
    }
    Ok(())
}

/// Число записей в логе партиции. Вызывается под блокировкой файла.
fn count_records(file: &std::fs::File) -> std::io::Result<u64> {
    let mut count = 0;
    for line in std::io::BufReader::new(file).lines() {
        if !line?.is_empty() {
            count += 1;
        }
    }
    Ok(count)
}

impl BrokerLink for FileLink {
    fn create_topics<'a>(
        &'a mut self,
        specs: &'a [TopicSpec],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Result<(), TopicProvisionError>>, TopicProvisionError>> + Send + 'a>>
    {
        Box::pin(async move {
            let _log = self.cluster.log().lock().await;
            let results = specs
                .iter()
                .map(|spec| {
                    let res = self.create_one(spec);
                    if res.is_ok() {
                        tracing::debug!(topic = %spec.name(), partitions = spec.num_partitions(), "file cluster: topic created");
                    }
                    res
                })
                .collect();
            Ok(results)
        })
    }

    fn fetch_metadata<'a>(
        &'a mut self,
        topics: Option<&'a [String]>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<TopicMetadata>, TopicProvisionError>> + Send + 'a>> {
        Box::pin(async move { self.list_metadata(topics) })
    }

    fn produce<'a>(
        &'a mut self,
        messages: &'a [Message],
    ) -> Pin<Box<dyn Future<Output = Vec<Result<DeliveryReport, DeliveryError>>> + Send + 'a>> {
        Box::pin(async move {
            let mut log = self.cluster.log().lock().await;
            let log = &mut *log;
            messages.iter().map(|m| self.append(log, m)).collect()
        })
    }

    fn disconnect(&mut self) -> Pin<Box<dyn Future<Output = Result<(), ConnectionError>> + Send + '_>> {
        Box::pin(async move {
            if self.open {
                self.open = false;
                tracing::debug!(data_dir = %self.cluster.data_dir().display(), "file cluster: connection closed");
            }
            Ok(())
        })
    }
}
