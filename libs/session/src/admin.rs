use std::sync::Arc;

use courier_api::{
    ClusterConfig, ConnectionError, Connector, ProvisionErrorKind, TopicMetadata,
    TopicProvisionError, TopicSpec,
};

use crate::handle::{ConnectionHandle, ConnectionState};

// ═══════════════════════════════════════════════════════════════
//  TopicCreationResult
// ═══════════════════════════════════════════════════════════════

/// Итог createTopic для одного topic'а.
///
/// `AlreadyExists` — не ошибка: повторный provisioning (рестарт сервиса)
/// должен быть безопасен.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicCreationResult {
    Created,
    AlreadyExists,
    Failed(TopicProvisionError),
}

impl TopicCreationResult {
    /// `Created` или `AlreadyExists`.
    pub fn is_success(&self) -> bool {
        !matches!(self, TopicCreationResult::Failed(_))
    }

    /// Нормализовать ответ брокера: "topic already exists" → `AlreadyExists`,
    /// любая другая ошибка → `Failed`.
    fn classify(outcome: Result<(), TopicProvisionError>) -> Self {
        match outcome {
            Ok(()) => TopicCreationResult::Created,
            Err(e) if e.is_already_exists() => TopicCreationResult::AlreadyExists,
            Err(e) => TopicCreationResult::Failed(e),
        }
    }
}

impl std::fmt::Display for TopicCreationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopicCreationResult::Created => f.write_str("created"),
            TopicCreationResult::AlreadyExists => f.write_str("already exists"),
            TopicCreationResult::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

fn not_connected(state: ConnectionState) -> TopicProvisionError {
    TopicProvisionError::new(
        ProvisionErrorKind::NotConnected,
        format!("connection handle is {state}"),
    )
}

// ═══════════════════════════════════════════════════════════════
//  AdminSession
// ═══════════════════════════════════════════════════════════════

/// Администрирование topic'ов: идемпотентный createTopics и чтение
/// метаданных.
pub struct AdminSession {
    config: ClusterConfig,
    connector: Arc<dyn Connector>,
}

impl AdminSession {
    pub fn new(config: ClusterConfig, connector: Arc<dyn Connector>) -> Self {
        Self { config, connector }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Открыть новый handle к controller'у.
    pub async fn connect(&self) -> Result<ConnectionHandle, ConnectionError> {
        tracing::info!(client_id = %self.config.client_id, "admin connecting");
        let mut handle = ConnectionHandle::new(&self.config);
        if let Err(e) = handle.open(self.connector.as_ref()).await {
            handle.close().await;
            tracing::warn!(client_id = %self.config.client_id, error = %e, "admin connect failed");
            return Err(e);
        }
        tracing::info!(client_id = %self.config.client_id, "admin connected");
        Ok(handle)
    }

    /// Создать topic. Существующий topic не модифицируется.
    pub async fn create_topic(&self, handle: &mut ConnectionHandle, spec: &TopicSpec) -> TopicCreationResult {
        let mut results = self.create_topics(handle, std::slice::from_ref(spec)).await;
        results.pop().unwrap_or_else(|| {
            TopicCreationResult::Failed(TopicProvisionError::new(
                ProvisionErrorKind::Other,
                format!("broker returned no result for topic '{}'", spec.name()),
            ))
        })
    }

    /// Создать несколько topic'ов одним запросом. Результаты — в порядке `specs`.
    pub async fn create_topics(
        &self,
        handle: &mut ConnectionHandle,
        specs: &[TopicSpec],
    ) -> Vec<TopicCreationResult> {
        if specs.is_empty() {
            return Vec::new();
        }

        let timeout = handle.request_timeout();
        let state = handle.state();
        let Some(link) = handle.link_mut() else {
            let e = not_connected(state);
            return specs.iter().map(|_| TopicCreationResult::Failed(e.clone())).collect();
        };

        let outcome = tokio::time::timeout(timeout, link.create_topics(specs)).await;
        let results: Vec<TopicCreationResult> = match outcome {
            Ok(Ok(outcomes)) if outcomes.len() == specs.len() => {
                outcomes.into_iter().map(TopicCreationResult::classify).collect()
            }
            Ok(Ok(outcomes)) => {
                let e = TopicProvisionError::new(
                    ProvisionErrorKind::Other,
                    format!(
                        "broker answered {} results for {} topics",
                        outcomes.len(),
                        specs.len()
                    ),
                );
                specs.iter().map(|_| TopicCreationResult::Failed(e.clone())).collect()
            }
            // Отказ всего запроса ничего не говорит о существовании
            // отдельных topic'ов: AlreadyExists здесь не нормализуется.
            Ok(Err(e)) => specs.iter().map(|_| TopicCreationResult::Failed(e.clone())).collect(),
            Err(_) => {
                handle.mark_failed();
                let e = TopicProvisionError::new(
                    ProvisionErrorKind::Timeout,
                    format!("createTopics exceeded {}ms", timeout.as_millis()),
                );
                specs.iter().map(|_| TopicCreationResult::Failed(e.clone())).collect()
            }
        };

        for (spec, result) in specs.iter().zip(&results) {
            match result {
                TopicCreationResult::Created => tracing::info!(
                    topic = %spec.name(),
                    partitions = spec.num_partitions(),
                    replication_factor = spec.replication_factor(),
                    "topic created"
                ),
                TopicCreationResult::AlreadyExists => {
                    tracing::info!(topic = %spec.name(), "topic already exists, left unchanged")
                }
                TopicCreationResult::Failed(e) => {
                    tracing::error!(topic = %spec.name(), error = %e, "topic creation failed")
                }
            }
        }
        results
    }

    /// Метаданные topic'а; `None`, если его нет.
    pub async fn describe_topic(
        &self,
        handle: &mut ConnectionHandle,
        name: &str,
    ) -> Result<Option<TopicMetadata>, TopicProvisionError> {
        let names = [name.to_string()];
        let found = self.fetch_metadata(handle, Some(&names[..])).await?;
        Ok(found.into_iter().find(|m| m.name == name))
    }

    /// Имена всех topic'ов кластера, отсортированные.
    pub async fn list_topics(&self, handle: &mut ConnectionHandle) -> Result<Vec<String>, TopicProvisionError> {
        let all = self.fetch_metadata(handle, None).await?;
        let mut names: Vec<String> = all.into_iter().map(|m| m.name).collect();
        names.sort();
        Ok(names)
    }

    async fn fetch_metadata(
        &self,
        handle: &mut ConnectionHandle,
        topics: Option<&[String]>,
    ) -> Result<Vec<TopicMetadata>, TopicProvisionError> {
        let timeout = handle.request_timeout();
        let state = handle.state();
        let Some(link) = handle.link_mut() else {
            return Err(not_connected(state));
        };
        let outcome = tokio::time::timeout(timeout, link.fetch_metadata(topics)).await;
        match outcome {
            Ok(res) => res,
            Err(_) => {
                handle.mark_failed();
                Err(TopicProvisionError::new(
                    ProvisionErrorKind::Timeout,
                    format!("metadata request exceeded {}ms", timeout.as_millis()),
                ))
            }
        }
    }

    /// connect → createTopic → disconnect. Handle закрывается на любом исходе.
    pub async fn provision(&self, spec: &TopicSpec) -> Result<TopicCreationResult, ConnectionError> {
        let mut handle = self.connect().await?;
        let result = self.create_topic(&mut handle, spec).await;
        tracing::info!(client_id = %self.config.client_id, "disconnecting admin");
        handle.close().await;
        Ok(result)
    }
}
