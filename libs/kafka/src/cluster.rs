use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use rdkafka::admin::AdminClient;
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, Producer};

use courier_api::{BrokerLink, ClusterConfig, ConnectionError, Connector};

use crate::errors::connection_error;
use crate::link::KafkaLink;

// ════════════════════════════════════════════════════════════════
//  KafkaCluster
// ════════════════════════════════════════════════════════════════

/// Connector к настоящему Kafka-кластеру.
///
/// Bootstrap, client.id, таймауты и SASL берутся из `ClusterConfig`;
/// `with_property` добавляет произвольные свойства librdkafka поверх них.
#[derive(Debug, Clone, Default)]
pub struct KafkaCluster {
    properties: BTreeMap<String, String>,
}

impl KafkaCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Свойства librdkafka для данного `ClusterConfig`.
    pub fn client_config(&self, config: &ClusterConfig) -> ClientConfig {
        let mut cc = ClientConfig::new();
        cc.set("bootstrap.servers", config.brokers.join(","))
            .set("client.id", config.client_id.as_str())
            .set("socket.connection.setup.timeout.ms", config.connect_timeout_ms.to_string())
            .set("request.timeout.ms", config.request_timeout_ms.to_string())
            .set("message.timeout.ms", config.request_timeout_ms.to_string())
            .set("acks", "all")
            // Тот же murmur2, что у Java-клиента и DefaultPartitioner.
            .set("partitioner", "murmur2_random");

        if let Some(creds) = &config.credentials {
            cc.set("security.protocol", "SASL_PLAINTEXT")
                .set("sasl.mechanism", creds.mechanism.to_string())
                .set("sasl.username", creds.username.as_str())
                .set("sasl.password", creds.password.as_str());
        }

        for (k, v) in &self.properties {
            cc.set(k.as_str(), v.as_str());
        }
        cc
    }
}

impl Connector for KafkaCluster {
    fn connect<'a>(
        &'a self,
        config: &'a ClusterConfig,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn BrokerLink>, ConnectionError>> + Send + 'a>> {
        Box::pin(async move {
            let cc = self.client_config(config);
            let producer: FutureProducer = cc.create().map_err(|e| connection_error(&e))?;
            let admin: AdminClient<DefaultClientContext> = cc.create().map_err(|e| connection_error(&e))?;

            // Клиенты librdkafka ленивые: без запроса metadata недоступный
            // кластер обнаружится только на первой операции.
            let metadata_client = producer.clone();
            let timeout = config.connect_timeout();
            let brokers = tokio::task::spawn_blocking(move || {
                metadata_client
                    .client()
                    .fetch_metadata(None, timeout)
                    .map(|md| md.brokers().len())
            })
            .await
            .map_err(|e| ConnectionError::unreachable(format!("metadata request aborted: {e}")))?
            .map_err(|e| connection_error(&e))?;

            tracing::debug!(
                client_id = %config.client_id,
                bootstrap = %config.brokers.join(","),
                brokers,
                "kafka: connected"
            );
            Ok(Box::new(KafkaLink::new(producer, admin, config.request_timeout())) as Box<dyn BrokerLink>)
        })
    }
}
