use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DeliveryError;

/// Максимальная длина имени topic'а (как у Kafka).
pub const MAX_TOPIC_NAME_LEN: usize = 249;

// ════════════════════════════════════════════════════════════════
//  TopicSpec
// ════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopicSpecError {
    #[error("topic name is empty")]
    EmptyName,

    #[error("topic name is {0} chars, limit is {MAX_TOPIC_NAME_LEN}")]
    NameTooLong(usize),

    #[error("topic name '{0}' contains characters outside [A-Za-z0-9._-]")]
    InvalidName(String),

    #[error("partition count must be at least 1")]
    ZeroPartitions,

    #[error("replication factor must be at least 1")]
    ZeroReplicationFactor,
}

/// Проверить имя topic'а: непустое, не длиннее 249, только `[A-Za-z0-9._-]`,
/// не `.` и не `..`.
pub fn validate_topic_name(name: &str) -> Result<(), TopicSpecError> {
    if name.is_empty() {
        return Err(TopicSpecError::EmptyName);
    }
    if name.len() > MAX_TOPIC_NAME_LEN {
        return Err(TopicSpecError::NameTooLong(name.len()));
    }
    if name == "." || name == ".." {
        return Err(TopicSpecError::InvalidName(name.to_string()));
    }
    let legal = name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'_' || b == b'-');
    if !legal {
        return Err(TopicSpecError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Декларация topic'а для createTopics.
///
/// Поля приватные: после успешного `new` спецификация неизменяема,
/// инварианты (имя, partition count ≥ 1) проверены один раз.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSpec {
    name: String,
    num_partitions: u32,
    replication_factor: u16,
    config_entries: BTreeMap<String, String>,
}

impl TopicSpec {
    pub fn new(name: impl Into<String>, num_partitions: u32) -> Result<Self, TopicSpecError> {
        let name = name.into();
        validate_topic_name(&name)?;
        if num_partitions == 0 {
            return Err(TopicSpecError::ZeroPartitions);
        }
        Ok(Self {
            name,
            num_partitions,
            replication_factor: 1,
            config_entries: BTreeMap::new(),
        })
    }

    pub fn with_replication_factor(mut self, replication_factor: u16) -> Result<Self, TopicSpecError> {
        if replication_factor == 0 {
            return Err(TopicSpecError::ZeroReplicationFactor);
        }
        self.replication_factor = replication_factor;
        Ok(self)
    }

    /// Topic-level config entry (`retention.ms`, `cleanup.policy`, ...).
    /// Значения opaque — интерпретирует брокер.
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config_entries.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_partitions(&self) -> u32 {
        self.num_partitions
    }

    pub fn replication_factor(&self) -> u16 {
        self.replication_factor
    }

    pub fn config_entries(&self) -> &BTreeMap<String, String> {
        &self.config_entries
    }
}

// ════════════════════════════════════════════════════════════════
//  TopicMetadata
// ════════════════════════════════════════════════════════════════

/// Метаданные существующего topic'а, как их видит кластер.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicMetadata {
    pub name: String,
    pub partitions: u32,
    pub replication_factor: u16,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
}

impl From<&TopicSpec> for TopicMetadata {
    fn from(spec: &TopicSpec) -> Self {
        Self {
            name: spec.name.clone(),
            partitions: spec.num_partitions,
            replication_factor: spec.replication_factor,
            config: spec.config_entries.clone(),
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  Message
// ════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub key: String,
    #[serde(with = "crate::util::b64")]
    pub value: Vec<u8>,
}

/// Сообщение для публикации. Key и value — opaque байты.
///
/// `partition = None` — партицию выбирает брокер (default partitioner).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub key: Option<Vec<u8>>,
    pub value: Vec<u8>,
    pub partition: Option<u32>,
    pub headers: Vec<Header>,
    pub timestamp_ms: Option<i64>,
}

impl Message {
    pub fn new(topic: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            key: None,
            value: value.into(),
            partition: None,
            headers: Vec::new(),
            timestamp_ms: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_partition(mut self, partition: u32) -> Self {
        self.partition = Some(partition);
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.headers.push(Header { key: key.into(), value: value.into() });
        self
    }

    pub fn with_timestamp(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }

    /// Локальная проверка до отправки на wire.
    pub fn validate(&self) -> Result<(), DeliveryError> {
        if self.topic.is_empty() {
            return Err(DeliveryError::invalid_message("message has no target topic"));
        }
        Ok(())
    }

    /// Approximate encoded size: key + value + headers.
    pub fn encoded_len(&self) -> usize {
        let key = self.key.as_ref().map_or(0, Vec::len);
        let headers: usize = self.headers.iter().map(|h| h.key.len() + h.value.len()).sum();
        key + self.value.len() + headers
    }
}

// ════════════════════════════════════════════════════════════════
//  DeliveryReport
// ════════════════════════════════════════════════════════════════

/// Подтверждение брокера: куда легло сообщение.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub topic: String,
    pub partition: u32,
    pub offset: u64,
    pub timestamp_ms: i64,
}
