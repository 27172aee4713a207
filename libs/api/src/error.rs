// ════════════════════════════════════════════════════════════════
//  Connection errors
// ════════════════════════════════════════════════════════════════

/// Категория ошибки установки соединения с кластером.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Ни один bootstrap-адрес не ответил.
    Unreachable,
    /// Брокер отклонил соединение.
    Refused,
    /// Неверные credentials / SASL handshake не прошёл.
    AuthFailed,
    /// Connect не уложился в `connect_timeout_ms`.
    Timeout,
    /// Конфигурация не прошла валидацию, сеть не трогали.
    InvalidConfig,
    /// Handle уже открывался: один handle — одно соединение.
    InvalidState,
}

impl std::fmt::Display for ConnectionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionErrorKind::Unreachable => f.write_str("unreachable"),
            ConnectionErrorKind::Refused => f.write_str("refused"),
            ConnectionErrorKind::AuthFailed => f.write_str("auth failed"),
            ConnectionErrorKind::Timeout => f.write_str("timeout"),
            ConnectionErrorKind::InvalidConfig => f.write_str("invalid config"),
            ConnectionErrorKind::InvalidState => f.write_str("invalid state"),
        }
    }
}

/// Connection failure with the reason reported by the broker client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("connection {kind}: {reason}")]
pub struct ConnectionError {
    kind: ConnectionErrorKind,
    reason: String,
}

impl ConnectionError {
    pub fn new(kind: ConnectionErrorKind, reason: impl Into<String>) -> Self {
        Self { kind, reason: reason.into() }
    }

    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self::new(ConnectionErrorKind::Unreachable, reason)
    }

    pub fn refused(reason: impl Into<String>) -> Self {
        Self::new(ConnectionErrorKind::Refused, reason)
    }

    pub fn auth_failed(reason: impl Into<String>) -> Self {
        Self::new(ConnectionErrorKind::AuthFailed, reason)
    }

    pub fn timeout(reason: impl Into<String>) -> Self {
        Self::new(ConnectionErrorKind::Timeout, reason)
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::new(ConnectionErrorKind::InvalidConfig, reason)
    }

    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::new(ConnectionErrorKind::InvalidState, reason)
    }

    pub fn kind(&self) -> ConnectionErrorKind {
        self.kind
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

// ════════════════════════════════════════════════════════════════
//  Topic provisioning errors
// ════════════════════════════════════════════════════════════════

/// Категория ошибки, которую вернул controller на createTopics / metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionErrorKind {
    /// Topic уже существует. На уровне сессии нормализуется в успех.
    AlreadyExists,
    PermissionDenied,
    /// Невалидные параметры (partition count, replication factor, имя).
    InvalidSpec,
    ControllerUnavailable,
    Timeout,
    /// Handle не в состоянии Connected, запрос не отправлялся.
    NotConnected,
    Other,
}

impl std::fmt::Display for ProvisionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProvisionErrorKind::AlreadyExists => f.write_str("already exists"),
            ProvisionErrorKind::PermissionDenied => f.write_str("permission denied"),
            ProvisionErrorKind::InvalidSpec => f.write_str("invalid spec"),
            ProvisionErrorKind::ControllerUnavailable => f.write_str("controller unavailable"),
            ProvisionErrorKind::Timeout => f.write_str("timeout"),
            ProvisionErrorKind::NotConnected => f.write_str("not connected"),
            ProvisionErrorKind::Other => f.write_str("other"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("topic provisioning {kind}: {reason}")]
pub struct TopicProvisionError {
    kind: ProvisionErrorKind,
    reason: String,
}

impl TopicProvisionError {
    pub fn new(kind: ProvisionErrorKind, reason: impl Into<String>) -> Self {
        Self { kind, reason: reason.into() }
    }

    pub fn already_exists(topic: &str) -> Self {
        Self::new(ProvisionErrorKind::AlreadyExists, format!("topic '{topic}' already exists"))
    }

    pub fn kind(&self) -> ProvisionErrorKind {
        self.kind
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn is_already_exists(&self) -> bool {
        self.kind == ProvisionErrorKind::AlreadyExists
    }
}

// ════════════════════════════════════════════════════════════════
//  Delivery errors
// ════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryErrorKind {
    /// Leader партиции недоступен — transient.
    BrokerUnavailable,
    /// Ack не пришёл за `request_timeout_ms` — transient.
    Timeout,
    InvalidTopic,
    MessageTooLarge,
    InvalidPartition,
    /// Сообщение не прошло локальную валидацию.
    InvalidMessage,
    NotConnected,
}

impl std::fmt::Display for DeliveryErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryErrorKind::BrokerUnavailable => f.write_str("broker unavailable"),
            DeliveryErrorKind::Timeout => f.write_str("timeout"),
            DeliveryErrorKind::InvalidTopic => f.write_str("invalid topic"),
            DeliveryErrorKind::MessageTooLarge => f.write_str("message too large"),
            DeliveryErrorKind::InvalidPartition => f.write_str("invalid partition"),
            DeliveryErrorKind::InvalidMessage => f.write_str("invalid message"),
            DeliveryErrorKind::NotConnected => f.write_str("not connected"),
        }
    }
}

/// Failed delivery of a single message.
///
/// The publisher never retries on its own; `is_retryable` tells the caller
/// whether resubmitting the same message can succeed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("delivery {kind}: {reason}")]
pub struct DeliveryError {
    kind: DeliveryErrorKind,
    reason: String,
}

impl DeliveryError {
    pub fn new(kind: DeliveryErrorKind, reason: impl Into<String>) -> Self {
        Self { kind, reason: reason.into() }
    }

    pub fn broker_unavailable(reason: impl Into<String>) -> Self {
        Self::new(DeliveryErrorKind::BrokerUnavailable, reason)
    }

    pub fn invalid_topic(reason: impl Into<String>) -> Self {
        Self::new(DeliveryErrorKind::InvalidTopic, reason)
    }

    pub fn invalid_message(reason: impl Into<String>) -> Self {
        Self::new(DeliveryErrorKind::InvalidMessage, reason)
    }

    pub fn kind(&self) -> DeliveryErrorKind {
        self.kind
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, DeliveryErrorKind::BrokerUnavailable | DeliveryErrorKind::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_broker_reason() {
        let e = TopicProvisionError::new(
            ProvisionErrorKind::PermissionDenied,
            "principal User:rider lacks CREATE on Topic:rider-updates",
        );
        assert_eq!(
            e.to_string(),
            "topic provisioning permission denied: principal User:rider lacks CREATE on Topic:rider-updates"
        );

        let e = ConnectionError::refused("broker:29092 closed the socket");
        assert_eq!(e.to_string(), "connection refused: broker:29092 closed the socket");
    }

    #[test]
    fn only_transient_delivery_failures_are_retryable() {
        assert!(DeliveryError::broker_unavailable("leader not available").is_retryable());
        assert!(DeliveryError::new(DeliveryErrorKind::Timeout, "no ack").is_retryable());
        assert!(!DeliveryError::invalid_topic("unknown topic").is_retryable());
        assert!(!DeliveryError::new(DeliveryErrorKind::MessageTooLarge, "2 MiB").is_retryable());
        assert!(!DeliveryError::invalid_message("empty topic").is_retryable());
    }

    #[test]
    fn already_exists_is_recognised() {
        assert!(TopicProvisionError::already_exists("rider-updates").is_already_exists());
        assert!(
            !TopicProvisionError::new(ProvisionErrorKind::InvalidSpec, "0 partitions")
                .is_already_exists()
        );
    }
}
