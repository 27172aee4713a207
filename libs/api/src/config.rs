use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConnectionError;

// ════════════════════════════════════════════════════════════════
//  Credentials
// ════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SaslMechanism {
    Plain,
    ScramSha256,
    ScramSha512,
}

impl std::fmt::Display for SaslMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaslMechanism::Plain => f.write_str("PLAIN"),
            SaslMechanism::ScramSha256 => f.write_str("SCRAM-SHA-256"),
            SaslMechanism::ScramSha512 => f.write_str("SCRAM-SHA-512"),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub mechanism: SaslMechanism,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("mechanism", &self.mechanism)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

// ════════════════════════════════════════════════════════════════
//  ClusterConfig
// ════════════════════════════════════════════════════════════════

fn default_client_id() -> String {
    "courier".into()
}
fn default_connect_timeout_ms() -> u64 {
    10_000
}
fn default_request_timeout_ms() -> u64 {
    30_000
}

/// Параметры подключения к кластеру.
///
/// Передаётся явно в конструктор каждой сессии — общего клиента
/// на процесс нет.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Bootstrap-адреса (`host:port`).
    #[serde(default)]
    pub brokers: Vec<String>,
    #[serde(default)]
    pub credentials: Option<Credentials>,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ClusterConfig {
    pub fn new<I, S>(brokers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            client_id: default_client_id(),
            brokers: brokers.into_iter().map(Into::into).collect(),
            credentials: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConnectionError> {
        if self.client_id.trim().is_empty() {
            return Err(ConnectionError::invalid_config("client_id is empty"));
        }
        if self.brokers.is_empty() {
            return Err(ConnectionError::invalid_config("no bootstrap brokers configured"));
        }
        if let Some(addr) = self.brokers.iter().find(|b| b.trim().is_empty()) {
            return Err(ConnectionError::invalid_config(format!("blank broker address '{addr}'")));
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConnectionError::invalid_config("connect_timeout_ms must be positive"));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConnectionError::invalid_config("request_timeout_ms must be positive"));
        }
        if let Some(creds) = &self.credentials {
            if creds.username.is_empty() {
                return Err(ConnectionError::invalid_config(format!(
                    "{} credentials without username",
                    creds.mechanism
                )));
            }
        }
        Ok(())
    }
}
