use std::sync::Arc;

use courier_api::{
    ClusterConfig, ConnectionError, Connector, DeliveryError, DeliveryErrorKind, DeliveryReport,
    Message,
};

use crate::handle::ConnectionHandle;

/// Публикация сообщений с ожиданием ack.
///
/// `send` / `send_batch` возвращаются только после ответа брокера. Сессия
/// не ретраит: transient-ошибки помечены `DeliveryError::is_retryable`,
/// решение за вызывающим.
pub struct PublisherSession {
    config: ClusterConfig,
    connector: Arc<dyn Connector>,
}

impl PublisherSession {
    pub fn new(config: ClusterConfig, connector: Arc<dyn Connector>) -> Self {
        Self { config, connector }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub async fn connect(&self) -> Result<ConnectionHandle, ConnectionError> {
        tracing::info!(client_id = %self.config.client_id, "producer connecting");
        let mut handle = ConnectionHandle::new(&self.config);
        if let Err(e) = handle.open(self.connector.as_ref()).await {
            handle.close().await;
            tracing::warn!(client_id = %self.config.client_id, error = %e, "producer connect failed");
            return Err(e);
        }
        tracing::info!(client_id = %self.config.client_id, "producer connected");
        Ok(handle)
    }

    /// Отправить одно сообщение и дождаться ack.
    pub async fn send(&self, handle: &mut ConnectionHandle, message: Message) -> Result<DeliveryReport, DeliveryError> {
        let mut reports = self.send_batch(handle, vec![message]).await;
        reports
            .pop()
            .unwrap_or_else(|| Err(no_ack("broker returned no acknowledgment")))
    }

    /// Отправить пачку одним запросом.
    ///
    /// Результаты — по одному на сообщение, в порядке отправки. Сообщения,
    /// не прошедшие локальную валидацию, на wire не уходят.
    pub async fn send_batch(
        &self,
        handle: &mut ConnectionHandle,
        messages: Vec<Message>,
    ) -> Vec<Result<DeliveryReport, DeliveryError>> {
        let total = messages.len();
        let mut results: Vec<Option<Result<DeliveryReport, DeliveryError>>> = vec![None; total];

        let mut wire = Vec::with_capacity(total);
        let mut wire_index = Vec::with_capacity(total);
        for (i, message) in messages.into_iter().enumerate() {
            match message.validate() {
                Ok(()) => {
                    wire_index.push(i);
                    wire.push(message);
                }
                Err(e) => results[i] = Some(Err(e)),
            }
        }

        if !wire.is_empty() {
            self.produce(handle, &wire, &wire_index, &mut results).await;
        }

        let reports: Vec<Result<DeliveryReport, DeliveryError>> = results
            .into_iter()
            .map(|r| r.unwrap_or_else(|| Err(no_ack("broker acknowledged fewer messages than sent"))))
            .collect();

        for report in &reports {
            match report {
                Ok(r) => tracing::debug!(
                    topic = %r.topic,
                    partition = r.partition,
                    offset = r.offset,
                    "message acknowledged"
                ),
                Err(e) => tracing::warn!(error = %e, retryable = e.is_retryable(), "message not delivered"),
            }
        }
        reports
    }

    async fn produce(
        &self,
        handle: &mut ConnectionHandle,
        wire: &[Message],
        wire_index: &[usize],
        results: &mut [Option<Result<DeliveryReport, DeliveryError>>],
    ) {
        let timeout = handle.request_timeout();
        let state = handle.state();
        let Some(link) = handle.link_mut() else {
            let e = DeliveryError::new(
                DeliveryErrorKind::NotConnected,
                format!("connection handle is {state}"),
            );
            for &i in wire_index {
                results[i] = Some(Err(e.clone()));
            }
            return;
        };

        let outcome = tokio::time::timeout(timeout, link.produce(wire)).await;
        match outcome {
            Ok(acks) => {
                if acks.len() != wire.len() {
                    tracing::warn!(sent = wire.len(), acked = acks.len(), "ack count mismatch");
                }
                for (&i, ack) in wire_index.iter().zip(acks) {
                    results[i] = Some(ack);
                }
            }
            Err(_) => {
                handle.mark_failed();
                let e = no_ack(format!("no acknowledgment within {}ms", timeout.as_millis()));
                for &i in wire_index {
                    results[i] = Some(Err(e.clone()));
                }
            }
        }
    }

    /// connect → send_batch → disconnect. Handle закрывается на любом исходе.
    pub async fn publish(
        &self,
        messages: Vec<Message>,
    ) -> Result<Vec<Result<DeliveryReport, DeliveryError>>, ConnectionError> {
        let mut handle = self.connect().await?;
        let reports = self.send_batch(&mut handle, messages).await;
        tracing::info!(client_id = %self.config.client_id, "disconnecting producer");
        handle.close().await;
        Ok(reports)
    }
}

fn no_ack(reason: impl Into<String>) -> DeliveryError {
    DeliveryError::new(DeliveryErrorKind::Timeout, reason)
}

#[cfg(test)]
mod tests {
    use courier_api::TopicSpec;
    use courier_memory::MemoryCluster;

    use super::*;

    async fn publisher_with_topic(cluster: &MemoryCluster, topic: &str, partitions: u32) -> PublisherSession {
        let cfg = ClusterConfig::new(["memory:9092"]);
        let mut handle = ConnectionHandle::new(&cfg);
        handle.open(cluster).await.unwrap();
        let link = handle.link_mut().unwrap();
        link.create_topics(&[TopicSpec::new(topic, partitions).unwrap()]).await.unwrap();
        handle.close().await;
        PublisherSession::new(cfg, Arc::new(cluster.clone()))
    }

    #[tokio::test]
    async fn invalid_messages_never_reach_the_broker() {
        let cluster = MemoryCluster::new();
        let publisher = publisher_with_topic(&cluster, "t", 1).await;
        let mut handle = publisher.connect().await.unwrap();

        let reports = publisher
            .send_batch(&mut handle, vec![Message::new("", "x"), Message::new("t", "ok")])
            .await;
        assert_eq!(reports[0].as_ref().unwrap_err().kind(), DeliveryErrorKind::InvalidMessage);
        assert_eq!(reports[1].as_ref().unwrap().offset, 0);
        assert_eq!(cluster.records("t", 0).await.len(), 1);

        handle.close().await;
    }

    #[tokio::test]
    async fn empty_batch_yields_no_reports() {
        let cluster = MemoryCluster::new();
        let publisher = publisher_with_topic(&cluster, "t", 1).await;
        let mut handle = publisher.connect().await.unwrap();

        assert!(publisher.send_batch(&mut handle, Vec::new()).await.is_empty());
        handle.close().await;
    }

    #[tokio::test]
    async fn send_on_closed_handle_is_not_connected() {
        let cluster = MemoryCluster::new();
        let publisher = publisher_with_topic(&cluster, "t", 1).await;
        let mut handle = publisher.connect().await.unwrap();
        handle.close().await;

        let err = publisher.send(&mut handle, Message::new("t", "late")).await.unwrap_err();
        assert_eq!(err.kind(), DeliveryErrorKind::NotConnected);
        assert!(!err.is_retryable());
        assert!(cluster.records("t", 0).await.is_empty());
    }
}
