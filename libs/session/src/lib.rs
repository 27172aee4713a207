//! Клиентское ядро courier: жизненный цикл соединения, provisioning
//! topic'ов и публикация с подтверждением.
//!
//! Обе сессии работают через [`ConnectionHandle`]: connect → операции →
//! close. Транспорт подставляется через [`courier_api::Connector`].

mod admin;
mod handle;
mod publisher;

pub use admin::{AdminSession, TopicCreationResult};
pub use handle::{ConnectionHandle, ConnectionState};
pub use publisher::PublisherSession;
