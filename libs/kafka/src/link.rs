use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::message::{Header as KafkaHeader, OwnedHeaders};
use rdkafka::metadata::Metadata;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;

use courier_api::{
    now_ms, BrokerLink, ConnectionError, DeliveryError, DeliveryErrorKind, DeliveryReport, Message,
    ProvisionErrorKind, TopicMetadata, TopicProvisionError, TopicSpec,
};

use crate::errors::{delivery_error, request_error, topic_error};

/// Соединение с Kafka-кластером: admin-клиент и producer с общими настройками.
pub struct KafkaLink {
    producer: FutureProducer,
    admin: AdminClient<DefaultClientContext>,
    request_timeout: Duration,
    open: bool,
}

impl KafkaLink {
    pub(crate) fn new(
        producer: FutureProducer,
        admin: AdminClient<DefaultClientContext>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            producer,
            admin,
            request_timeout,
            open: true,
        }
    }

    fn new_topic(spec: &TopicSpec) -> Result<NewTopic<'_>, TopicProvisionError> {
        let partitions = i32::try_from(spec.num_partitions()).map_err(|_| {
            TopicProvisionError::new(
                ProvisionErrorKind::InvalidSpec,
                format!("topic '{}': {} partitions is out of range", spec.name(), spec.num_partitions()),
            )
        })?;
        let replication = TopicReplication::Fixed(i32::from(spec.replication_factor()));
        let mut topic = NewTopic::new(spec.name(), partitions, replication);
        for (k, v) in spec.config_entries() {
            topic = topic.set(k, v);
        }
        Ok(topic)
    }

    async fn send_one(&self, message: &Message) -> Result<DeliveryReport, DeliveryError> {
        let mut headers = OwnedHeaders::new();
        for h in &message.headers {
            headers = headers.insert(KafkaHeader {
                key: &h.key,
                value: Some(h.value.as_slice()),
            });
        }

        let mut record: FutureRecord<'_, [u8], [u8]> = FutureRecord::to(&message.topic)
            .payload(message.value.as_slice())
            .headers(headers);
        if let Some(key) = &message.key {
            record = record.key(key.as_slice());
        }
        if let Some(partition) = message.partition {
            let partition = i32::try_from(partition).map_err(|_| {
                DeliveryError::new(
                    DeliveryErrorKind::InvalidPartition,
                    format!("partition {partition} is out of range"),
                )
            })?;
            record = record.partition(partition);
        }
        if let Some(ts) = message.timestamp_ms {
            record = record.timestamp(ts);
        }

        let (partition, offset) = self
            .producer
            .send(record, Timeout::After(self.request_timeout))
            .await
            .map_err(|(e, _)| delivery_error(&e))?;

        // librdkafka сообщает -1, если ack пришёл без offset'а (acks=0).
        let (Ok(partition), Ok(offset)) = (u32::try_from(partition), u64::try_from(offset)) else {
            return Err(DeliveryError::broker_unavailable(format!(
                "broker acknowledged without a position (partition {partition}, offset {offset})"
            )));
        };
        Ok(DeliveryReport {
            topic: message.topic.clone(),
            partition,
            offset,
            timestamp_ms: message.timestamp_ms.unwrap_or_else(now_ms),
        })
    }
}

/// Metadata → `TopicMetadata`, отсортированные по имени.
///
/// Topic'и с ошибкой в ответе (неизвестные, без доступа) пропускаются.
fn collect_metadata(metadata: &Metadata, filter: Option<&[String]>) -> Vec<TopicMetadata> {
    let mut found: Vec<TopicMetadata> = metadata
        .topics()
        .iter()
        .filter(|t| t.error().is_none())
        .filter(|t| filter.is_none_or(|names| names.iter().any(|n| n == t.name())))
        .map(|t| TopicMetadata {
            name: t.name().to_string(),
            partitions: u32::try_from(t.partitions().len()).unwrap_or(u32::MAX),
            replication_factor: t
                .partitions()
                .first()
                .map_or(0, |p| u16::try_from(p.replicas().len()).unwrap_or(u16::MAX)),
            config: Default::default(),
        })
        .collect();
    found.sort_by(|a, b| a.name.cmp(&b.name));
    found
}

impl BrokerLink for KafkaLink {
    fn create_topics<'a>(
        &'a mut self,
        specs: &'a [TopicSpec],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Result<(), TopicProvisionError>>, TopicProvisionError>> + Send + 'a>>
    {
        Box::pin(async move {
            let topics = specs.iter().map(Self::new_topic).collect::<Result<Vec<_>, _>>()?;
            let opts = AdminOptions::new()
                .request_timeout(Some(self.request_timeout))
                .operation_timeout(Some(self.request_timeout));

            let results = self
                .admin
                .create_topics(topics.iter(), &opts)
                .await
                .map_err(|e| request_error(&e))?;

            // Ответ брокера не обязан сохранять порядок запроса.
            let mut by_name: HashMap<String, Result<(), TopicProvisionError>> = results
                .into_iter()
                .map(|r| match r {
                    Ok(name) => (name, Ok(())),
                    Err((name, code)) => {
                        let e = topic_error(&name, code);
                        (name, Err(e))
                    }
                })
                .collect();

            Ok(specs
                .iter()
                .map(|spec| {
                    let res = by_name.remove(spec.name()).unwrap_or_else(|| {
                        Err(TopicProvisionError::new(
                            ProvisionErrorKind::Other,
                            format!("no result for topic '{}'", spec.name()),
                        ))
                    });
                    if res.is_ok() {
                        tracing::debug!(topic = %spec.name(), partitions = spec.num_partitions(), "kafka: topic created");
                    }
                    res
                })
                .collect())
        })
    }

    fn fetch_metadata<'a>(
        &'a mut self,
        topics: Option<&'a [String]>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<TopicMetadata>, TopicProvisionError>> + Send + 'a>> {
        Box::pin(async move {
            let producer = self.producer.clone();
            let timeout = self.request_timeout;
            let filter: Option<Vec<String>> = topics.map(<[String]>::to_vec);

            tokio::task::spawn_blocking(move || {
                producer
                    .client()
                    .fetch_metadata(None, timeout)
                    .map(|md| collect_metadata(&md, filter.as_deref()))
            })
            .await
            .map_err(|e| TopicProvisionError::new(ProvisionErrorKind::Other, format!("metadata task aborted: {e}")))?
            .map_err(|e| request_error(&e))
        })
    }

    fn produce<'a>(
        &'a mut self,
        messages: &'a [Message],
    ) -> Pin<Box<dyn Future<Output = Vec<Result<DeliveryReport, DeliveryError>>> + Send + 'a>> {
        Box::pin(async move {
            let this = &*self;
            // Все сообщения уходят в очередь producer'а сразу; join_all
            // сохраняет порядок результатов.
            futures::future::join_all(messages.iter().map(|m| this.send_one(m))).await
        })
    }

    fn disconnect(&mut self) -> Pin<Box<dyn Future<Output = Result<(), ConnectionError>> + Send + '_>> {
        Box::pin(async move {
            if !self.open {
                return Ok(());
            }
            self.open = false;

            let producer = self.producer.clone();
            let timeout = self.request_timeout;
            tokio::task::spawn_blocking(move || producer.flush(timeout))
                .await
                .map_err(|e| ConnectionError::unreachable(format!("flush task aborted: {e}")))?
                .map_err(|e| ConnectionError::unreachable(format!("flush before disconnect: {e}")))?;
            tracing::debug!("kafka: disconnected");
            Ok(())
        })
    }
}
