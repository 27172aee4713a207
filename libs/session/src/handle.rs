use std::time::Duration;

use courier_api::{BrokerLink, ClusterConfig, ConnectionError, Connector};

/// Состояние соединения.
///
/// ```text
/// Disconnected ──open()──▶ Connecting ──ok──▶ Connected ──close()──▶ Closing ──▶ Disconnected
///                              │                  │
///                              └──err/timeout──▶ Failed ◀──request timeout
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
    Failed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => f.write_str("disconnected"),
            ConnectionState::Connecting => f.write_str("connecting"),
            ConnectionState::Connected => f.write_str("connected"),
            ConnectionState::Closing => f.write_str("closing"),
            ConnectionState::Failed => f.write_str("failed"),
        }
    }
}

/// Одна живая сессия с кластером.
///
/// Открывается не более одного раза. `close()` идемпотентен и безопасен
/// после неудачного `open()`. Handle не `Clone` и требует `&mut` на
/// каждую операцию, так что две операции на одном handle одновременно
/// выполнить нельзя — для конкурентности нужны отдельные handle'ы.
pub struct ConnectionHandle {
    config: ClusterConfig,
    state: ConnectionState,
    link: Option<Box<dyn BrokerLink>>,
    used: bool,
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("client_id", &self.config.client_id)
            .field("endpoints", &self.config.brokers)
            .field("state", &self.state)
            .finish()
    }
}

impl ConnectionHandle {
    /// Handle в состоянии `Disconnected`; сеть не трогается.
    pub fn new(config: &ClusterConfig) -> Self {
        Self {
            config: config.clone(),
            state: ConnectionState::Disconnected,
            link: None,
            used: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn endpoints(&self) -> &[String] {
        &self.config.brokers
    }

    pub fn client_id(&self) -> &str {
        &self.config.client_id
    }

    /// Установить соединение. Повторный вызов на том же handle — ошибка
    /// `InvalidState`, даже если первый завершился неудачей.
    pub async fn open(&mut self, connector: &dyn Connector) -> Result<(), ConnectionError> {
        if self.used {
            return Err(ConnectionError::invalid_state(format!(
                "handle already opened (state: {})",
                self.state
            )));
        }
        self.used = true;

        if let Err(e) = self.config.validate() {
            self.state = ConnectionState::Failed;
            return Err(e);
        }

        self.state = ConnectionState::Connecting;
        let timeout = self.config.connect_timeout();
        let outcome = tokio::time::timeout(timeout, connector.connect(&self.config)).await;

        match outcome {
            Ok(Ok(link)) => {
                self.link = Some(link);
                self.state = ConnectionState::Connected;
                Ok(())
            }
            Ok(Err(e)) => {
                self.state = ConnectionState::Failed;
                Err(e)
            }
            Err(_) => {
                self.state = ConnectionState::Failed;
                Err(ConnectionError::timeout(format!(
                    "connect to [{}] exceeded {}ms",
                    self.config.brokers.join(", "),
                    timeout.as_millis()
                )))
            }
        }
    }

    /// Закрыть соединение.
    ///
    /// Ошибки disconnect логируются и проглатываются: они не должны
    /// перекрывать результат основной операции.
    pub async fn close(&mut self) {
        let Some(mut link) = self.link.take() else {
            self.state = ConnectionState::Disconnected;
            return;
        };

        self.state = ConnectionState::Closing;
        let timeout = self.config.request_timeout();
        match tokio::time::timeout(timeout, link.disconnect()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(client_id = %self.config.client_id, error = %e, "disconnect failed");
            }
            Err(_) => {
                tracing::warn!(
                    client_id = %self.config.client_id,
                    timeout_ms = timeout.as_millis() as u64,
                    "disconnect timed out"
                );
            }
        }
        self.state = ConnectionState::Disconnected;
    }

    pub(crate) fn request_timeout(&self) -> Duration {
        self.config.request_timeout()
    }

    /// Link для доменной операции; `None`, если handle не `Connected`.
    pub(crate) fn link_mut(&mut self) -> Option<&mut Box<dyn BrokerLink>> {
        if self.state != ConnectionState::Connected {
            return None;
        }
        self.link.as_mut()
    }

    /// Запрос не уложился в дедлайн: соединение больше не считается рабочим.
    /// Link остаётся, чтобы `close()` мог его освободить.
    pub(crate) fn mark_failed(&mut self) {
        self.state = ConnectionState::Failed;
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        if self.link.is_some() {
            tracing::warn!(
                client_id = %self.config.client_id,
                state = %self.state,
                "connection handle dropped without close()"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use courier_api::ConnectionErrorKind;
    use courier_memory::MemoryCluster;

    use super::*;

    fn config() -> ClusterConfig {
        ClusterConfig::new(["memory:9092"])
    }

    #[tokio::test]
    async fn open_then_close() {
        let cluster = MemoryCluster::new();
        let mut handle = ConnectionHandle::new(&config());
        assert_eq!(handle.state(), ConnectionState::Disconnected);

        handle.open(&cluster).await.expect("open");
        assert!(handle.is_connected());
        assert_eq!(cluster.open_connections(), 1);

        handle.close().await;
        assert_eq!(handle.state(), ConnectionState::Disconnected);
        assert_eq!(cluster.open_connections(), 0);
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let cluster = MemoryCluster::new();
        let mut handle = ConnectionHandle::new(&config());
        handle.open(&cluster).await.unwrap();

        handle.close().await;
        handle.close().await;
        assert_eq!(handle.state(), ConnectionState::Disconnected);
        assert_eq!(cluster.open_connections(), 0);
    }

    #[tokio::test]
    async fn close_on_never_opened_handle_is_noop() {
        let mut handle = ConnectionHandle::new(&config());
        handle.close().await;
        assert_eq!(handle.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn close_after_failed_open() {
        let cluster = MemoryCluster::new();
        cluster.set_unreachable(true);

        let mut handle = ConnectionHandle::new(&config());
        let err = handle.open(&cluster).await.unwrap_err();
        assert_eq!(err.kind(), ConnectionErrorKind::Unreachable);
        assert_eq!(handle.state(), ConnectionState::Failed);

        handle.close().await;
        handle.close().await;
        assert_eq!(handle.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn open_at_most_once() {
        let cluster = MemoryCluster::new();
        let mut handle = ConnectionHandle::new(&config());
        handle.open(&cluster).await.unwrap();

        let err = handle.open(&cluster).await.unwrap_err();
        assert_eq!(err.kind(), ConnectionErrorKind::InvalidState);
        assert_eq!(cluster.total_connections(), 1);

        handle.close().await;
        let err = handle.open(&cluster).await.unwrap_err();
        assert_eq!(err.kind(), ConnectionErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn invalid_config_never_reaches_connector() {
        let cluster = MemoryCluster::new();
        let mut handle = ConnectionHandle::new(&ClusterConfig::new(Vec::<String>::new()));

        let err = handle.open(&cluster).await.unwrap_err();
        assert_eq!(err.kind(), ConnectionErrorKind::InvalidConfig);
        assert_eq!(cluster.total_connections(), 0);
        handle.close().await;
    }

    #[tokio::test]
    async fn connect_timeout_fails_the_handle() {
        let cluster = MemoryCluster::new();
        cluster.set_connect_delay(Some(Duration::from_millis(500)));

        let cfg = config().with_connect_timeout(Duration::from_millis(20));
        let mut handle = ConnectionHandle::new(&cfg);
        let err = handle.open(&cluster).await.unwrap_err();
        assert_eq!(err.kind(), ConnectionErrorKind::Timeout);
        assert_eq!(handle.state(), ConnectionState::Failed);
        assert_eq!(cluster.open_connections(), 0);

        handle.close().await;
        assert_eq!(handle.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn disconnect_errors_are_swallowed() {
        let cluster = MemoryCluster::new();
        cluster.set_fail_disconnect(true);

        let mut handle = ConnectionHandle::new(&config());
        handle.open(&cluster).await.unwrap();
        handle.close().await;
        assert_eq!(handle.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn operations_need_connected_state() {
        let cluster = MemoryCluster::new();
        let mut handle = ConnectionHandle::new(&config());
        assert!(handle.link_mut().is_none());

        handle.open(&cluster).await.unwrap();
        assert!(handle.link_mut().is_some());

        handle.mark_failed();
        assert!(handle.link_mut().is_none());
        handle.close().await;
        assert_eq!(cluster.open_connections(), 0);
    }
}
