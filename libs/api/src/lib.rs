//! Общие типы и контракты courier: модель данных (topic, message,
//! delivery report), таксономия ошибок, конфиг кластера и трейты
//! брокерного коллаборатора, за которыми спрятан wire-протокол.

pub mod broker;
pub mod config;
pub mod error;
pub mod partitioner;
pub mod types;
pub mod util;

pub use broker::{BrokerLink, Connector};
pub use config::{ClusterConfig, Credentials, SaslMechanism};
pub use error::{
    ConnectionError, ConnectionErrorKind, DeliveryError, DeliveryErrorKind, ProvisionErrorKind,
    TopicProvisionError,
};
pub use partitioner::{murmur2, DefaultPartitioner};
pub use types::{
    validate_topic_name, DeliveryReport, Header, Message, TopicMetadata, TopicSpec, TopicSpecError,
    MAX_TOPIC_NAME_LEN,
};
pub use util::now_ms;
