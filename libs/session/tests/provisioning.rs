use std::sync::Arc;
use std::time::Duration;

use courier_api::{ClusterConfig, ConnectionErrorKind, Credentials, ProvisionErrorKind, SaslMechanism, TopicSpec};
use courier_memory::MemoryCluster;
use courier_session::{AdminSession, ConnectionState, TopicCreationResult};

fn admin(cluster: &MemoryCluster) -> AdminSession {
    AdminSession::new(ClusterConfig::new(["broker:29092"]), Arc::new(cluster.clone()))
}

#[tokio::test]
async fn create_is_idempotent() {
    let cluster = MemoryCluster::new();
    let admin = admin(&cluster);
    let mut handle = admin.connect().await.expect("connect");

    let spec = TopicSpec::new("rider-updates", 2).unwrap();
    assert_eq!(admin.create_topic(&mut handle, &spec).await, TopicCreationResult::Created);
    assert_eq!(admin.create_topic(&mut handle, &spec).await, TopicCreationResult::AlreadyExists);

    let wider = TopicSpec::new("rider-updates", 8).unwrap();
    let again = admin.create_topic(&mut handle, &wider).await;
    assert_eq!(again, TopicCreationResult::AlreadyExists);
    assert!(again.is_success());

    let meta = admin
        .describe_topic(&mut handle, "rider-updates")
        .await
        .expect("metadata")
        .expect("topic exists");
    assert_eq!(meta.partitions, 2);

    handle.close().await;
    assert_eq!(cluster.open_connections(), 0);
}

#[tokio::test]
async fn batch_results_follow_request_order() {
    let cluster = MemoryCluster::builder().brokers(1).build();
    let admin = admin(&cluster);
    let mut handle = admin.connect().await.unwrap();

    admin
        .create_topic(&mut handle, &TopicSpec::new("existing", 1).unwrap())
        .await;

    let specs = vec![
        TopicSpec::new("fresh", 3).unwrap(),
        TopicSpec::new("existing", 1).unwrap(),
        TopicSpec::new("replicated", 1).unwrap().with_replication_factor(3).unwrap(),
    ];
    let results = admin.create_topics(&mut handle, &specs).await;
    assert_eq!(results.len(), 3);
    assert_eq!(results[0], TopicCreationResult::Created);
    assert_eq!(results[1], TopicCreationResult::AlreadyExists);
    match &results[2] {
        TopicCreationResult::Failed(e) => assert_eq!(e.kind(), ProvisionErrorKind::InvalidSpec),
        other => panic!("expected failure, got {other:?}"),
    }

    assert_eq!(
        admin.list_topics(&mut handle).await.unwrap(),
        vec!["existing".to_string(), "fresh".to_string()]
    );
    assert!(admin.describe_topic(&mut handle, "replicated").await.unwrap().is_none());

    handle.close().await;
}

#[tokio::test]
async fn permission_denied_carries_broker_reason() {
    let cluster = MemoryCluster::builder()
        .user("rider-svc", "pw")
        .deny_topic_creation("rider-svc")
        .build();
    let cfg = ClusterConfig::new(["broker:29092"]).with_credentials(Credentials {
        mechanism: SaslMechanism::Plain,
        username: "rider-svc".into(),
        password: "pw".into(),
    });
    let admin = AdminSession::new(cfg, Arc::new(cluster.clone()));
    let mut handle = admin.connect().await.unwrap();

    let result = admin
        .create_topic(&mut handle, &TopicSpec::new("rider-updates", 2).unwrap())
        .await;
    let TopicCreationResult::Failed(e) = result else {
        panic!("expected failure, got {result:?}");
    };
    assert_eq!(e.kind(), ProvisionErrorKind::PermissionDenied);
    assert!(e.reason().contains("rider-svc"));
    assert!(cluster.topic("rider-updates").await.is_none());

    handle.close().await;
}

#[tokio::test]
async fn controller_outage_fails_every_topic() {
    let cluster = MemoryCluster::new();
    let admin = admin(&cluster);
    let mut handle = admin.connect().await.unwrap();
    cluster.set_controller_available(false);

    let specs = vec![TopicSpec::new("a", 1).unwrap(), TopicSpec::new("b", 1).unwrap()];
    let results = admin.create_topics(&mut handle, &specs).await;
    for result in &results {
        match result {
            TopicCreationResult::Failed(e) => assert_eq!(e.kind(), ProvisionErrorKind::ControllerUnavailable),
            other => panic!("expected failure, got {other:?}"),
        }
    }
    assert!(handle.is_connected());
    handle.close().await;
}

#[tokio::test]
async fn request_timeout_fails_the_handle() {
    let cluster = MemoryCluster::new();
    let cfg = ClusterConfig::new(["broker:29092"]).with_request_timeout(Duration::from_millis(20));
    let admin = AdminSession::new(cfg, Arc::new(cluster.clone()));
    let mut handle = admin.connect().await.unwrap();
    cluster.set_request_delay(Some(Duration::from_millis(500)));

    let result = admin
        .create_topic(&mut handle, &TopicSpec::new("slow", 1).unwrap())
        .await;
    match result {
        TopicCreationResult::Failed(e) => assert_eq!(e.kind(), ProvisionErrorKind::Timeout),
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(handle.state(), ConnectionState::Failed);

    let next = admin
        .create_topic(&mut handle, &TopicSpec::new("after", 1).unwrap())
        .await;
    match next {
        TopicCreationResult::Failed(e) => assert_eq!(e.kind(), ProvisionErrorKind::NotConnected),
        other => panic!("expected not connected, got {other:?}"),
    }

    cluster.set_request_delay(None);
    handle.close().await;
    assert_eq!(handle.state(), ConnectionState::Disconnected);
    assert_eq!(cluster.open_connections(), 0);
}

#[tokio::test]
async fn provision_closes_connection_on_every_outcome() {
    let cluster = MemoryCluster::new();
    let admin = admin(&cluster);
    let spec = TopicSpec::new("rider-updates", 2).unwrap();

    assert_eq!(admin.provision(&spec).await.unwrap(), TopicCreationResult::Created);
    assert_eq!(admin.provision(&spec).await.unwrap(), TopicCreationResult::AlreadyExists);
    assert_eq!(cluster.open_connections(), 0);
    assert_eq!(cluster.total_connections(), 2);

    cluster.set_controller_available(false);
    assert!(!admin.provision(&spec).await.unwrap().is_success());
    assert_eq!(cluster.open_connections(), 0);
}

#[tokio::test]
async fn unreachable_cluster_surfaces_connection_error() {
    let cluster = MemoryCluster::new();
    cluster.set_unreachable(true);
    let admin = admin(&cluster);

    let err = admin.connect().await.unwrap_err();
    assert_eq!(err.kind(), ConnectionErrorKind::Unreachable);
    assert!(err.reason().contains("broker:29092"));

    let err = admin
        .provision(&TopicSpec::new("rider-updates", 2).unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ConnectionErrorKind::Unreachable);
    assert_eq!(cluster.open_connections(), 0);
}
