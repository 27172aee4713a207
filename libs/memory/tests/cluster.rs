use std::time::Duration;

use courier_api::{
    BrokerLink, ClusterConfig, ConnectionErrorKind, Connector, Credentials, DeliveryErrorKind, Message,
    ProvisionErrorKind, SaslMechanism, TopicSpec,
};
use courier_memory::MemoryCluster;

fn config() -> ClusterConfig {
    ClusterConfig::new(["memory:9092"])
}

fn scram(user: &str, password: &str) -> Credentials {
    Credentials {
        mechanism: SaslMechanism::ScramSha512,
        username: user.into(),
        password: password.into(),
    }
}

#[tokio::test]
async fn create_topics_reports_existing_without_touching_it() {
    let cluster = MemoryCluster::new();
    let cfg = config();
    let mut link = cluster.connect(&cfg).await.expect("connect");

    let first = [TopicSpec::new("rider-updates", 2).unwrap()];
    let res = link.create_topics(&first).await.expect("request");
    assert_eq!(res, vec![Ok(())]);

    let again = [TopicSpec::new("rider-updates", 5).unwrap()];
    let res = link.create_topics(&again).await.expect("request");
    assert_eq!(res.len(), 1);
    assert_eq!(res[0].as_ref().unwrap_err().kind(), ProvisionErrorKind::AlreadyExists);

    let meta = cluster.topic("rider-updates").await.expect("exists");
    assert_eq!(meta.partitions, 2);
}

#[tokio::test]
async fn replication_factor_is_bounded_by_brokers() {
    let cluster = MemoryCluster::builder().brokers(2).build();
    let cfg = config();
    let mut link = cluster.connect(&cfg).await.unwrap();

    let specs = [
        TopicSpec::new("ok", 1).unwrap().with_replication_factor(2).unwrap(),
        TopicSpec::new("too-wide", 1).unwrap().with_replication_factor(3).unwrap(),
    ];
    let res = link.create_topics(&specs).await.unwrap();
    assert!(res[0].is_ok());
    assert_eq!(res[1].as_ref().unwrap_err().kind(), ProvisionErrorKind::InvalidSpec);
    assert!(cluster.topic("too-wide").await.is_none());
}

#[tokio::test]
async fn produce_assigns_sequential_offsets() {
    let cluster = MemoryCluster::new();
    let cfg = config();
    let mut link = cluster.connect(&cfg).await.unwrap();
    link.create_topics(&[TopicSpec::new("t", 3).unwrap()]).await.unwrap();

    let batch: Vec<Message> = (0..5)
        .map(|i| Message::new("t", format!("v{i}")).with_key("same-key"))
        .collect();
    let reports: Vec<_> = link.produce(&batch).await.into_iter().map(Result::unwrap).collect();

    let partition = reports[0].partition;
    assert!(reports.iter().all(|r| r.partition == partition));
    let offsets: Vec<u64> = reports.iter().map(|r| r.offset).collect();
    assert_eq!(offsets, vec![0, 1, 2, 3, 4]);

    let log = cluster.records("t", partition).await;
    assert_eq!(log.len(), 5);
    assert_eq!(log[4].value, b"v4");
}

#[tokio::test]
async fn produce_rejects_unknown_topic_and_oversized_messages() {
    let cluster = MemoryCluster::builder().max_message_bytes(8).build();
    let cfg = config();
    let mut link = cluster.connect(&cfg).await.unwrap();
    link.create_topics(&[TopicSpec::new("t", 1).unwrap()]).await.unwrap();

    let batch = vec![
        Message::new("nope", "x"),
        Message::new("t", "0123456789"),
        Message::new("t", "ok"),
    ];
    let res = link.produce(&batch).await;
    assert_eq!(res[0].as_ref().unwrap_err().kind(), DeliveryErrorKind::InvalidTopic);
    assert_eq!(res[1].as_ref().unwrap_err().kind(), DeliveryErrorKind::MessageTooLarge);
    assert_eq!(res[2].as_ref().unwrap().offset, 0);
}

#[tokio::test]
async fn authentication_is_enforced_when_users_exist() {
    let cluster = MemoryCluster::builder().user("admin", "secret").build();

    let err = cluster.connect(&config()).await.err().expect("anonymous rejected");
    assert_eq!(err.kind(), ConnectionErrorKind::AuthFailed);

    let bad = config().with_credentials(scram("admin", "wrong"));
    let err = cluster.connect(&bad).await.err().expect("bad password rejected");
    assert_eq!(err.kind(), ConnectionErrorKind::AuthFailed);

    let good = config().with_credentials(scram("admin", "secret"));
    assert!(cluster.connect(&good).await.is_ok());
}

#[tokio::test]
async fn open_connections_track_disconnect_and_drop() {
    let cluster = MemoryCluster::new();
    let cfg = config();

    let mut a = cluster.connect(&cfg).await.unwrap();
    let b = cluster.connect(&cfg).await.unwrap();
    assert_eq!(cluster.open_connections(), 2);

    a.disconnect().await.unwrap();
    a.disconnect().await.unwrap();
    assert_eq!(cluster.open_connections(), 1);

    drop(b);
    assert_eq!(cluster.open_connections(), 0);
    assert_eq!(cluster.total_connections(), 2);
}

#[tokio::test]
async fn faults_surface_as_typed_errors() {
    let cluster = MemoryCluster::new();
    let cfg = config();

    cluster.set_refuse_connections(true);
    let err = cluster.connect(&cfg).await.err().unwrap();
    assert_eq!(err.kind(), ConnectionErrorKind::Refused);
    cluster.set_refuse_connections(false);

    let mut link = cluster.connect(&cfg).await.unwrap();
    cluster.set_controller_available(false);
    let err = link.create_topics(&[TopicSpec::new("t", 1).unwrap()]).await.unwrap_err();
    assert_eq!(err.kind(), ProvisionErrorKind::ControllerUnavailable);
    cluster.set_controller_available(true);

    link.create_topics(&[TopicSpec::new("t", 1).unwrap()]).await.unwrap();
    cluster.set_brokers_available(false);
    let res = link.produce(&[Message::new("t", "v")]).await;
    let err = res[0].as_ref().unwrap_err();
    assert_eq!(err.kind(), DeliveryErrorKind::BrokerUnavailable);
    assert!(err.is_retryable());
    assert!(cluster.records("t", 0).await.is_empty());
}

#[tokio::test]
async fn connect_delay_is_observable() {
    let cluster = MemoryCluster::new();
    cluster.set_connect_delay(Some(Duration::from_millis(50)));
    let started = std::time::Instant::now();
    let _link = cluster.connect(&config()).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(50));
}
