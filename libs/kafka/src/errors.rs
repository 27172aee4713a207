//! Ошибки librdkafka → ошибки courier-api.

use rdkafka::error::{KafkaError, RDKafkaErrorCode};

use courier_api::{
    ConnectionError, ConnectionErrorKind, DeliveryError, DeliveryErrorKind, ProvisionErrorKind,
    TopicProvisionError,
};

pub(crate) fn connection_error(e: &KafkaError) -> ConnectionError {
    if let KafkaError::ClientCreation(reason) = e {
        return ConnectionError::invalid_config(reason.clone());
    }
    let kind = match e.rdkafka_error_code() {
        Some(RDKafkaErrorCode::Authentication | RDKafkaErrorCode::SaslAuthenticationFailed) => {
            ConnectionErrorKind::AuthFailed
        }
        Some(RDKafkaErrorCode::OperationTimedOut | RDKafkaErrorCode::RequestTimedOut) => ConnectionErrorKind::Timeout,
        Some(RDKafkaErrorCode::BrokerNotAvailable) => ConnectionErrorKind::Refused,
        _ => ConnectionErrorKind::Unreachable,
    };
    ConnectionError::new(kind, e.to_string())
}

/// Ошибка createTopics для одного topic'а.
pub(crate) fn topic_error(topic: &str, code: RDKafkaErrorCode) -> TopicProvisionError {
    let kind = match code {
        RDKafkaErrorCode::TopicAlreadyExists => return TopicProvisionError::already_exists(topic),
        RDKafkaErrorCode::TopicAuthorizationFailed | RDKafkaErrorCode::ClusterAuthorizationFailed => {
            ProvisionErrorKind::PermissionDenied
        }
        RDKafkaErrorCode::InvalidPartitions
        | RDKafkaErrorCode::InvalidReplicationFactor
        | RDKafkaErrorCode::InvalidReplicaAssignment
        | RDKafkaErrorCode::InvalidConfig
        | RDKafkaErrorCode::InvalidTopic
        | RDKafkaErrorCode::PolicyViolation => ProvisionErrorKind::InvalidSpec,
        code => request_kind(code),
    };
    TopicProvisionError::new(kind, format!("topic '{topic}': {code}"))
}

/// Отказ всего admin/metadata-запроса.
pub(crate) fn request_error(e: &KafkaError) -> TopicProvisionError {
    let kind = e.rdkafka_error_code().map_or(ProvisionErrorKind::Other, request_kind);
    TopicProvisionError::new(kind, e.to_string())
}

fn request_kind(code: RDKafkaErrorCode) -> ProvisionErrorKind {
    match code {
        RDKafkaErrorCode::TopicAuthorizationFailed | RDKafkaErrorCode::ClusterAuthorizationFailed => {
            ProvisionErrorKind::PermissionDenied
        }
        RDKafkaErrorCode::NotController
        | RDKafkaErrorCode::BrokerNotAvailable
        | RDKafkaErrorCode::AllBrokersDown
        | RDKafkaErrorCode::BrokerTransportFailure => ProvisionErrorKind::ControllerUnavailable,
        RDKafkaErrorCode::OperationTimedOut | RDKafkaErrorCode::RequestTimedOut => ProvisionErrorKind::Timeout,
        _ => ProvisionErrorKind::Other,
    }
}

pub(crate) fn delivery_error(e: &KafkaError) -> DeliveryError {
    let kind = match e.rdkafka_error_code() {
        Some(RDKafkaErrorCode::MessageSizeTooLarge) => DeliveryErrorKind::MessageTooLarge,
        Some(
            RDKafkaErrorCode::UnknownTopicOrPartition
            | RDKafkaErrorCode::UnknownTopic
            | RDKafkaErrorCode::InvalidTopic
            | RDKafkaErrorCode::TopicAuthorizationFailed,
        ) => DeliveryErrorKind::InvalidTopic,
        Some(RDKafkaErrorCode::UnknownPartition) => DeliveryErrorKind::InvalidPartition,
        Some(RDKafkaErrorCode::InvalidMessage | RDKafkaErrorCode::InvalidMessageSize) => {
            DeliveryErrorKind::InvalidMessage
        }
        Some(
            RDKafkaErrorCode::MessageTimedOut | RDKafkaErrorCode::RequestTimedOut | RDKafkaErrorCode::OperationTimedOut,
        ) => DeliveryErrorKind::Timeout,
        _ => DeliveryErrorKind::BrokerUnavailable,
    };
    DeliveryError::new(kind, e.to_string())
}
