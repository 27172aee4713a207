use std::future::Future;
use std::pin::Pin;

use crate::{
    ClusterConfig, ConnectionError, DeliveryError, DeliveryReport, Message, TopicMetadata,
    TopicProvisionError, TopicSpec,
};

// ════════════════════════════════════════════════════════════════
//  Broker collaborator traits
// ════════════════════════════════════════════════════════════════

/// Фабрика соединений с кластером.
///
/// Wire-протокол, bootstrap и SASL — забота реализации. Сессии видят
/// только opaque RPC: connect → createTopics / metadata / produce → disconnect.
///
/// Реализации: `KafkaCluster` (librdkafka), `MemoryCluster` (in-process),
/// `FileCluster` (single-node dev).
pub trait Connector: Send + Sync {
    /// Установить соединение. Не выполняет никаких доменных операций.
    fn connect<'a>(
        &'a self,
        config: &'a ClusterConfig,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn BrokerLink>, ConnectionError>> + Send + 'a>>;
}

/// Открытый канал к кластеру. Принадлежит ровно одному `ConnectionHandle`.
///
/// Не reentrant: все методы берут `&mut self`.
pub trait BrokerLink: Send {
    /// createTopics одним запросом.
    ///
    /// Внешний `Err` — отказ всего запроса (controller недоступен).
    /// Внутренний — результат по каждому topic'у в порядке `specs`;
    /// существующий topic возвращается как `ProvisionErrorKind::AlreadyExists`
    /// и не модифицируется.
    #[allow(clippy::type_complexity)]
    fn create_topics<'a>(
        &'a mut self,
        specs: &'a [TopicSpec],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Result<(), TopicProvisionError>>, TopicProvisionError>> + Send + 'a>>;

    /// Метаданные topic'ов. `None` — все topic'и кластера.
    /// Неизвестные имена в ответ не попадают.
    fn fetch_metadata<'a>(
        &'a mut self,
        topics: Option<&'a [String]>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<TopicMetadata>, TopicProvisionError>> + Send + 'a>>;

    /// Produce с ожиданием ack. Ответ — по одному результату на сообщение,
    /// в порядке `messages`.
    fn produce<'a>(
        &'a mut self,
        messages: &'a [Message],
    ) -> Pin<Box<dyn Future<Output = Vec<Result<DeliveryReport, DeliveryError>>> + Send + 'a>>;

    /// Закрыть соединение.
    fn disconnect(&mut self) -> Pin<Box<dyn Future<Output = Result<(), ConnectionError>> + Send + '_>>;
}
