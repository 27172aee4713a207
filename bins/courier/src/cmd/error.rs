use courier_api::{ConnectionError, DeliveryError, TopicProvisionError, TopicSpecError};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    Usage(String),

    #[error("{0}")]
    Spec(#[from] TopicSpecError),

    #[error("{0}")]
    Connection(#[from] ConnectionError),

    #[error("{0}")]
    Provision(#[from] TopicProvisionError),

    #[error("{0}")]
    Delivery(#[from] DeliveryError),
}

impl CliError {
    /// 2 — конфигурация/аргументы, 1 — отказ кластера.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::Usage(_) | CliError::Spec(_) => 2,
            CliError::Connection(e) if e.kind() == courier_api::ConnectionErrorKind::InvalidConfig => 2,
            _ => 1,
        }
    }
}
