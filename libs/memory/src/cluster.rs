use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::RwLock;

use courier_api::{
    BrokerLink, ClusterConfig, ConnectionError, Connector, DefaultPartitioner, Header,
    TopicMetadata,
};

use crate::link::MemoryLink;

fn default_max_message_bytes() -> usize {
    1_048_576
}

// ═══════════════════════════════════════════════════════════════
//  Stored state
// ═══════════════════════════════════════════════════════════════

/// Запись в логе партиции.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub offset: u64,
    pub key: Option<Vec<u8>>,
    pub value: Vec<u8>,
    pub headers: Vec<Header>,
    pub timestamp_ms: i64,
}

pub(crate) struct MemTopic {
    pub(crate) meta: TopicMetadata,
    pub(crate) partitions: Vec<Vec<StoredRecord>>,
}

/// Всё, что мутирует createTopics / produce. Один lock — один порядок.
#[derive(Default)]
pub(crate) struct Catalog {
    pub(crate) topics: HashMap<String, MemTopic>,
    pub(crate) partitioner: DefaultPartitioner,
}

/// Runtime-переключаемые отказы для тестов.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Faults {
    pub(crate) unreachable: bool,
    pub(crate) refuse_connections: bool,
    pub(crate) controller_down: bool,
    pub(crate) brokers_down: bool,
    pub(crate) fail_disconnect: bool,
    pub(crate) connect_delay: Option<Duration>,
    pub(crate) request_delay: Option<Duration>,
}

pub(crate) struct ClusterState {
    pub(crate) brokers: u16,
    pub(crate) max_message_bytes: usize,
    /// username → password. Пусто — аутентификация не требуется.
    pub(crate) users: HashMap<String, String>,
    /// Principals без права CREATE на topic'и.
    pub(crate) create_denied: Vec<String>,
    pub(crate) catalog: RwLock<Catalog>,
    faults: Mutex<Faults>,
    pub(crate) open_links: AtomicUsize,
    pub(crate) total_connects: AtomicUsize,
}

impl ClusterState {
    pub(crate) fn faults(&self) -> Faults {
        *self.lock_faults()
    }

    fn lock_faults(&self) -> MutexGuard<'_, Faults> {
        match self.faults.lock() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("memory cluster fault lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Builder
// ═══════════════════════════════════════════════════════════════

pub struct MemoryClusterBuilder {
    brokers: u16,
    max_message_bytes: usize,
    users: HashMap<String, String>,
    create_denied: Vec<String>,
}

impl MemoryClusterBuilder {
    /// Количество брокеров — верхняя граница replication factor.
    pub fn brokers(mut self, brokers: u16) -> Self {
        self.brokers = brokers.max(1);
        self
    }

    pub fn max_message_bytes(mut self, max: usize) -> Self {
        self.max_message_bytes = max;
        self
    }

    /// Требовать SASL credentials; можно вызвать несколько раз.
    pub fn user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.users.insert(username.into(), password.into());
        self
    }

    /// Запретить principal'у создавать topic'и.
    /// Анонимный principal называется `ANONYMOUS`.
    pub fn deny_topic_creation(mut self, principal: impl Into<String>) -> Self {
        self.create_denied.push(principal.into());
        self
    }

    pub fn build(self) -> MemoryCluster {
        MemoryCluster {
            state: Arc::new(ClusterState {
                brokers: self.brokers,
                max_message_bytes: self.max_message_bytes,
                users: self.users,
                create_denied: self.create_denied,
                catalog: RwLock::new(Catalog::default()),
                faults: Mutex::new(Faults::default()),
                open_links: AtomicUsize::new(0),
                total_connects: AtomicUsize::new(0),
            }),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  MemoryCluster
// ═══════════════════════════════════════════════════════════════

/// In-process кластер: topic'и, партиции и логи живут в памяти.
///
/// Клонирование дешёвое — все клоны видят одно и то же состояние, так
/// что admin и publisher в тесте работают с одним "кластером".
#[derive(Clone)]
pub struct MemoryCluster {
    state: Arc<ClusterState>,
}

impl Default for MemoryCluster {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> MemoryClusterBuilder {
        MemoryClusterBuilder {
            brokers: 1,
            max_message_bytes: default_max_message_bytes(),
            users: HashMap::new(),
            create_denied: Vec::new(),
        }
    }

    // ── Fault injection ──

    pub fn set_unreachable(&self, on: bool) {
        self.state.lock_faults().unreachable = on;
    }

    pub fn set_refuse_connections(&self, on: bool) {
        self.state.lock_faults().refuse_connections = on;
    }

    pub fn set_controller_available(&self, available: bool) {
        self.state.lock_faults().controller_down = !available;
    }

    pub fn set_brokers_available(&self, available: bool) {
        self.state.lock_faults().brokers_down = !available;
    }

    pub fn set_fail_disconnect(&self, on: bool) {
        self.state.lock_faults().fail_disconnect = on;
    }

    pub fn set_connect_delay(&self, delay: Option<Duration>) {
        self.state.lock_faults().connect_delay = delay;
    }

    pub fn set_request_delay(&self, delay: Option<Duration>) {
        self.state.lock_faults().request_delay = delay;
    }

    // ── Inspection ──

    pub async fn topic(&self, name: &str) -> Option<TopicMetadata> {
        let catalog = self.state.catalog.read().await;
        catalog.topics.get(name).map(|t| t.meta.clone())
    }

    pub async fn topic_names(&self) -> Vec<String> {
        let catalog = self.state.catalog.read().await;
        let mut names: Vec<String> = catalog.topics.keys().cloned().collect();
        names.sort();
        names
    }

    /// Лог партиции. Пусто, если topic'а или партиции нет.
    pub async fn records(&self, topic: &str, partition: u32) -> Vec<StoredRecord> {
        let catalog = self.state.catalog.read().await;
        catalog
            .topics
            .get(topic)
            .and_then(|t| t.partitions.get(partition as usize))
            .cloned()
            .unwrap_or_default()
    }

    /// Соединения, которые ещё не закрыты.
    pub fn open_connections(&self) -> usize {
        self.state.open_links.load(Ordering::SeqCst)
    }

    /// Сколько раз connect завершился успехом за всё время.
    pub fn total_connections(&self) -> usize {
        self.state.total_connects.load(Ordering::SeqCst)
    }

    fn authenticate(&self, config: &ClusterConfig) -> Result<String, ConnectionError> {
        if self.state.users.is_empty() {
            return Ok(config
                .credentials
                .as_ref()
                .map_or_else(|| "ANONYMOUS".to_string(), |c| c.username.clone()));
        }
        let creds = config.credentials.as_ref().ok_or_else(|| {
            ConnectionError::auth_failed("cluster requires SASL authentication, no credentials given")
        })?;
        match self.state.users.get(&creds.username) {
            Some(password) if *password == creds.password => Ok(creds.username.clone()),
            _ => Err(ConnectionError::auth_failed(format!(
                "{} authentication failed for user '{}'",
                creds.mechanism, creds.username
            ))),
        }
    }
}

impl Connector for MemoryCluster {
    fn connect<'a>(
        &'a self,
        config: &'a ClusterConfig,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn BrokerLink>, ConnectionError>> + Send + 'a>> {
        Box::pin(async move {
            let faults = self.state.faults();
            if let Some(delay) = faults.connect_delay {
                tokio::time::sleep(delay).await;
            }
            if faults.unreachable {
                return Err(ConnectionError::unreachable(format!(
                    "no response from bootstrap brokers [{}]",
                    config.brokers.join(", ")
                )));
            }
            if faults.refuse_connections {
                return Err(ConnectionError::refused(format!(
                    "connection refused by {}",
                    config.brokers.first().map(String::as_str).unwrap_or("<none>")
                )));
            }

            let principal = self.authenticate(config)?;
            self.state.open_links.fetch_add(1, Ordering::SeqCst);
            self.state.total_connects.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(client_id = %config.client_id, %principal, "memory cluster: connection accepted");

            Ok(Box::new(MemoryLink::new(self.state.clone(), principal)) as Box<dyn BrokerLink>)
        })
    }
}
