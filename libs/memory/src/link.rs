use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use courier_api::{
    now_ms, BrokerLink, ConnectionError, DeliveryError, DeliveryErrorKind, DeliveryReport, Message,
    ProvisionErrorKind, TopicMetadata, TopicProvisionError, TopicSpec,
};

use crate::cluster::{ClusterState, MemTopic, StoredRecord};

/// Соединение с `MemoryCluster`.
pub struct MemoryLink {
    state: Arc<ClusterState>,
    principal: String,
    open: bool,
}

impl MemoryLink {
    pub(crate) fn new(state: Arc<ClusterState>, principal: String) -> Self {
        Self { state, principal, open: true }
    }

    fn release(&mut self) {
        if self.open {
            self.open = false;
            self.state.open_links.fetch_sub(1, Ordering::SeqCst);
        }
    }

    async fn request_delay(&self) {
        if let Some(delay) = self.state.faults().request_delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn check_spec(&self, spec: &TopicSpec) -> Result<(), TopicProvisionError> {
        if self.state.create_denied.iter().any(|p| *p == self.principal) {
            return Err(TopicProvisionError::new(
                ProvisionErrorKind::PermissionDenied,
                format!("principal User:{} is not authorized to CREATE Topic:{}", self.principal, spec.name()),
            ));
        }
        if spec.replication_factor() > self.state.brokers {
            return Err(TopicProvisionError::new(
                ProvisionErrorKind::InvalidSpec,
                format!(
                    "replication factor {} larger than available brokers {}",
                    spec.replication_factor(),
                    self.state.brokers
                ),
            ));
        }
        Ok(())
    }
}

impl Drop for MemoryLink {
    fn drop(&mut self) {
        self.release();
    }
}

impl BrokerLink for MemoryLink {
    fn create_topics<'a>(
        &'a mut self,
        specs: &'a [TopicSpec],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Result<(), TopicProvisionError>>, TopicProvisionError>> + Send + 'a>>
    {
        Box::pin(async move {
            self.request_delay().await;
            if self.state.faults().controller_down {
                return Err(TopicProvisionError::new(
                    ProvisionErrorKind::ControllerUnavailable,
                    "no active controller",
                ));
            }

            let mut catalog = self.state.catalog.write().await;
            let mut results = Vec::with_capacity(specs.len());
            for spec in specs {
                if catalog.topics.contains_key(spec.name()) {
                    results.push(Err(TopicProvisionError::already_exists(spec.name())));
                    continue;
                }
                if let Err(e) = self.check_spec(spec) {
                    results.push(Err(e));
                    continue;
                }
                catalog.topics.insert(
                    spec.name().to_string(),
                    MemTopic {
                        meta: TopicMetadata::from(spec),
                        partitions: vec![Vec::new(); spec.num_partitions() as usize],
                    },
                );
                tracing::debug!(topic = %spec.name(), partitions = spec.num_partitions(), "memory cluster: topic created");
                results.push(Ok(()));
            }
            Ok(results)
        })
    }

    fn fetch_metadata<'a>(
        &'a mut self,
        topics: Option<&'a [String]>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<TopicMetadata>, TopicProvisionError>> + Send + 'a>> {
        Box::pin(async move {
            self.request_delay().await;
            if self.state.faults().controller_down {
                return Err(TopicProvisionError::new(
                    ProvisionErrorKind::ControllerUnavailable,
                    "no active controller",
                ));
            }

            let catalog = self.state.catalog.read().await;
            let mut out: Vec<TopicMetadata> = match topics {
                Some(names) => names
                    .iter()
                    .filter_map(|n| catalog.topics.get(n).map(|t| t.meta.clone()))
                    .collect(),
                None => catalog.topics.values().map(|t| t.meta.clone()).collect(),
            };
            out.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(out)
        })
    }

    fn produce<'a>(
        &'a mut self,
        messages: &'a [Message],
    ) -> Pin<Box<dyn Future<Output = Vec<Result<DeliveryReport, DeliveryError>>> + Send + 'a>> {
        Box::pin(async move {
            self.request_delay().await;
            if self.state.faults().brokers_down {
                return messages
                    .iter()
                    .map(|m| {
                        Err(DeliveryError::broker_unavailable(format!(
                            "leader not available for topic '{}'",
                            m.topic
                        )))
                    })
                    .collect();
            }

            let max = self.state.max_message_bytes;
            let mut catalog = self.state.catalog.write().await;
            let catalog = &mut *catalog;
            let mut results = Vec::with_capacity(messages.len());

            for message in messages {
                if let Err(e) = message.validate() {
                    results.push(Err(e));
                    continue;
                }
                let Some(topic) = catalog.topics.get_mut(&message.topic) else {
                    results.push(Err(DeliveryError::invalid_topic(format!(
                        "unknown topic '{}'",
                        message.topic
                    ))));
                    continue;
                };
                let size = message.encoded_len();
                if size > max {
                    results.push(Err(DeliveryError::new(
                        DeliveryErrorKind::MessageTooLarge,
                        format!("message is {size} bytes, broker limit is {max}"),
                    )));
                    continue;
                }
                let partition = match catalog.partitioner.partition(message, topic.meta.partitions) {
                    Ok(p) => p,
                    Err(e) => {
                        results.push(Err(e));
                        continue;
                    }
                };

                let log = &mut topic.partitions[partition as usize];
                let offset = log.len() as u64;
                let timestamp_ms = message.timestamp_ms.unwrap_or_else(now_ms);
                log.push(StoredRecord {
                    offset,
                    key: message.key.clone(),
                    value: message.value.clone(),
                    headers: message.headers.clone(),
                    timestamp_ms,
                });
                results.push(Ok(DeliveryReport {
                    topic: message.topic.clone(),
                    partition,
                    offset,
                    timestamp_ms,
                }));
            }
            results
        })
    }

    fn disconnect(&mut self) -> Pin<Box<dyn Future<Output = Result<(), ConnectionError>> + Send + '_>> {
        Box::pin(async move {
            self.release();
            if self.state.faults().fail_disconnect {
                return Err(ConnectionError::unreachable("broker went away during disconnect"));
            }
            Ok(())
        })
    }
}
