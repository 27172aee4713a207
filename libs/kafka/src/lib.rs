//! Kafka-backend для courier поверх librdkafka.
//!
//! `KafkaCluster` открывает `AdminClient` (createTopics) и
//! `FutureProducer` (produce с ожиданием ack, metadata). Вызовы librdkafka,
//! которые блокируют поток, уходят в `spawn_blocking`.

mod cluster;
mod errors;
mod link;

pub use cluster::KafkaCluster;
pub use link::KafkaLink;
