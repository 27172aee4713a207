use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use serde::Deserialize;

use courier_api::{ClusterConfig, Connector};
use courier_file::FileCluster;
use courier_kafka::KafkaCluster;
use courier_memory::MemoryCluster;

use super::error::CliError;

const DEFAULT_BROKER: &str = "localhost:9092";
const DEFAULT_DATA_DIR: &str = "courier-data";

// ═══════════════════════════════════════════════════════════════
//  Config file (TOML)
// ═══════════════════════════════════════════════════════════════

/// `courier.toml`:
///
/// ```toml
/// [cluster]
/// client_id = "rider-service"
/// brokers = ["localhost:9092"]
///
/// [backend]
/// kind = "kafka"
///
/// [backend.properties]          # свойства librdkafka поверх [cluster]
/// "compression.type" = "lz4"
/// ```
///
/// `kind = "file"` + `data_dir` — локальный single-node кластер в каталоге.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    pub cluster: Option<ClusterConfig>,
    #[serde(default)]
    pub backend: BackendConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct BackendConfig {
    pub kind: Option<BackendKind>,
    pub data_dir: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Kafka-кластер по адресам из --brokers
    Kafka,
    /// Каталог на диске, переживает перезапуск
    File,
    /// Кластер в памяти процесса; только для пробного provision-topic
    Memory,
}

pub fn load_config(path: &str) -> Result<Config, CliError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| CliError::Config(format!("cannot read config {path}: {e}")))?;
    parse_config(&content).map_err(|e| CliError::Config(format!("bad config {path}: {e}")))
}

fn parse_config(content: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(content)
}

// ═══════════════════════════════════════════════════════════════
//  CLI args
// ═══════════════════════════════════════════════════════════════

#[derive(Args, Clone, Debug, Default)]
pub struct CommonArgs {
    /// Путь к courier.toml
    #[arg(long, global = true, default_value = "courier.toml", env = "COURIER_CONFIG")]
    pub config: String,

    /// Bootstrap-брокеры через запятую
    #[arg(long, global = true, env = "COURIER_BROKERS", value_delimiter = ',')]
    pub brokers: Vec<String>,

    /// client_id для логов брокера
    #[arg(long, global = true)]
    pub client_id: Option<String>,

    /// Backend кластера
    #[arg(long, global = true, value_enum)]
    pub backend: Option<BackendKind>,

    /// Каталог данных для file backend
    #[arg(long, global = true, env = "COURIER_DATA_DIR")]
    pub data_dir: Option<String>,
}

// ═══════════════════════════════════════════════════════════════
//  Effective — merged config
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Kafka { properties: BTreeMap<String, String> },
    File { data_dir: PathBuf },
    Memory,
}

/// Итоговая конфигурация после мержа: courier.toml < env/CLI
#[derive(Debug)]
pub struct Effective {
    pub cluster: ClusterConfig,
    pub backend: Backend,
}

impl Effective {
    pub fn new(args: &CommonArgs) -> Result<Self, CliError> {
        let cfg = match load_config(&args.config) {
            Ok(c) => c,
            Err(e) => {
                if std::path::Path::new(&args.config).exists() {
                    return Err(e);
                }
                Config::default()
            }
        };
        Self::merge(args, cfg)
    }

    fn merge(args: &CommonArgs, cfg: Config) -> Result<Self, CliError> {
        let mut cluster = cfg
            .cluster
            .unwrap_or_else(|| ClusterConfig::new(Vec::<String>::new()));
        if !args.brokers.is_empty() {
            cluster.brokers = args.brokers.clone();
        }
        if cluster.brokers.is_empty() {
            cluster.brokers = vec![DEFAULT_BROKER.to_string()];
        }
        if let Some(client_id) = &args.client_id {
            cluster.client_id = client_id.clone();
        }
        cluster
            .validate()
            .map_err(|e| CliError::Config(format!("[cluster]: {}", e.reason())))?;

        let kind = args.backend.or(cfg.backend.kind).unwrap_or(BackendKind::Kafka);
        let backend = match kind {
            BackendKind::Kafka => Backend::Kafka {
                properties: cfg.backend.properties,
            },
            BackendKind::Memory => Backend::Memory,
            BackendKind::File => {
                let data_dir = args
                    .data_dir
                    .clone()
                    .or(cfg.backend.data_dir)
                    .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
                if data_dir.trim().is_empty() {
                    return Err(CliError::Config("[backend]: data_dir is empty".into()));
                }
                Backend::File { data_dir: PathBuf::from(data_dir) }
            }
        };

        Ok(Self { cluster, backend })
    }

    /// Connector для выбранного backend'а. Каталог file backend'а
    /// создаётся при первом запуске.
    pub fn connector(&self) -> Result<Arc<dyn Connector>, CliError> {
        match &self.backend {
            Backend::Kafka { properties } => {
                let cluster = properties
                    .iter()
                    .fold(KafkaCluster::new(), |c, (k, v)| c.with_property(k, v));
                Ok(Arc::new(cluster))
            }
            Backend::Memory => {
                tracing::warn!("memory backend: state is discarded when the process exits");
                Ok(Arc::new(MemoryCluster::new()))
            }
            Backend::File { data_dir } => {
                std::fs::create_dir_all(data_dir)
                    .map_err(|e| CliError::Config(format!("cannot create data_dir {}: {e}", data_dir.display())))?;
                Ok(Arc::new(FileCluster::new(data_dir.clone())))
            }
        }
    }

    /// Memory backend живёт один процесс: topic'а из прошлого запуска
    /// в нём нет, publish заведомо упал бы с unknown topic.
    pub fn require_persistent(&self, command: &str) -> Result<(), CliError> {
        if self.backend == Backend::Memory {
            return Err(CliError::Config(format!(
                "{command} needs a persistent backend (kafka or file); memory backend only supports a dry-run provision-topic"
            )));
        }
        Ok(())
    }
}
