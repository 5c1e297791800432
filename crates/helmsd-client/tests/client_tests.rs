//! REST client and daemon-handle tests against the in-process fake daemon

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::time::timeout;

use helmsd_client::testing::{wait_for, TestDaemon};
use helmsd_client::{resolve, ClientError, ControlClient, Daemon, EndpointOptions};
use helmsd_core::{ConfigPatch, LogLevel};

const WAIT: Duration = Duration::from_secs(5);

fn client_for(daemon: &TestDaemon) -> ControlClient {
    let endpoint = resolve(&daemon.endpoint_options()).unwrap();
    ControlClient::new(&endpoint).unwrap()
}

#[tokio::test]
async fn test_config_round_trip() {
    let daemon = TestDaemon::start().await.unwrap();
    let client = client_for(&daemon);

    let config = client.get_config().await.unwrap();
    assert_eq!(config.port, 7890);
    assert_eq!(config.mode, "rule");

    client
        .patch_config(&ConfigPatch {
            mode: Some("global".into()),
            log_level: Some(LogLevel::Debug),
            ..Default::default()
        })
        .await
        .unwrap();

    let config = client.get_config().await.unwrap();
    assert_eq!(config.mode, "global");
    assert_eq!(config.log_level, LogLevel::Debug);
    // Unpatched fields are untouched.
    assert_eq!(config.port, 7890);
}

#[tokio::test]
async fn test_version() {
    let daemon = TestDaemon::start().await.unwrap();
    let version = client_for(&daemon).get_version().await.unwrap();
    assert_eq!(version.version, "1.9.0-test");
    assert_eq!(version.premium, Some(true));
}

#[tokio::test]
async fn test_rules_in_order() {
    let daemon = TestDaemon::start().await.unwrap();
    let rules = client_for(&daemon).get_rules().await.unwrap();

    assert_eq!(rules.rules.len(), 2);
    assert_eq!(rules.rules[0].rule_type, "DomainSuffix");
    assert_eq!(rules.rules[1].proxy, "DIRECT");
}

#[tokio::test]
async fn test_proxies_and_groups() {
    let daemon = TestDaemon::start().await.unwrap();
    let client = client_for(&daemon);

    let proxies = client.get_proxies().await.unwrap();
    assert!(proxies.proxies.contains_key("DIRECT"));

    let relay = client.get_proxy("relay").await.unwrap();
    assert!(relay.is_group());
    assert_eq!(relay.now.as_deref(), Some("jp-1"));

    let missing = client.get_proxy("nope").await;
    assert!(matches!(
        missing,
        Err(ClientError::Daemon { status: 404, .. })
    ));
}

#[tokio::test]
async fn test_select_proxy() {
    let daemon = TestDaemon::start().await.unwrap();
    let client = client_for(&daemon);

    client.select_proxy("relay", "us-2").await.unwrap();
    assert_eq!(daemon.selected("relay").as_deref(), Some("us-2"));

    let relay = client.get_proxy("relay").await.unwrap();
    assert_eq!(relay.now.as_deref(), Some("us-2"));

    // Plain proxies are not selectable.
    let err = client.select_proxy("jp-1", "us-2").await;
    assert!(matches!(err, Err(ClientError::Daemon { status: 400, .. })));
}

#[tokio::test]
async fn test_delay_probe() {
    let daemon = TestDaemon::start().await.unwrap();
    let delay = client_for(&daemon).test_delay("jp-1", 5000).await.unwrap();
    assert_eq!(delay.delay, 42);
}

#[tokio::test]
async fn test_providers() {
    let daemon = TestDaemon::start().await.unwrap();
    let client = client_for(&daemon);

    let providers = client.get_providers().await.unwrap();
    let main = &providers.providers["main"];
    assert_eq!(main.vehicle_type, "HTTP");
    assert!(!main.proxies.is_empty());

    client.update_provider("main").await.unwrap();
}

#[tokio::test]
async fn test_connections_snapshot_and_close() {
    let daemon = TestDaemon::start().await.unwrap();
    let client = client_for(&daemon);

    // One URL serves the snapshot and the feed; the client must get the
    // single-response form.
    let snapshot = client.get_connections().await.unwrap();
    assert_eq!(snapshot.download_total, 2048);
    assert_eq!(snapshot.connections.len(), 1);

    let id = snapshot.connections[0].id.clone();
    client.close_connection(&id).await.unwrap();
    assert_eq!(daemon.closed_connections(), vec![id]);

    client.close_all_connections().await.unwrap();
    assert!(daemon.closed_connections().contains(&"*".to_string()));
    assert!(client.get_connections().await.unwrap().connections.is_empty());
}

#[tokio::test]
async fn test_bearer_secret_enforced() {
    let daemon = TestDaemon::start_with_secret(Some("s3cret".into()))
        .await
        .unwrap();

    let unauthed = {
        let mut options = daemon.endpoint_options();
        options.secret = None;
        ControlClient::new(&resolve(&options).unwrap()).unwrap()
    };
    let err = unauthed.get_version().await;
    assert!(matches!(err, Err(ClientError::Daemon { status: 401, .. })));

    let authed = client_for(&daemon);
    assert!(authed.get_version().await.is_ok());
}

#[tokio::test]
async fn test_daemon_handle_caches_client_and_streams() {
    let fake = TestDaemon::start().await.unwrap();
    let daemon = Daemon::new(fake.endpoint_options());

    let (c1, c2) = tokio::join!(daemon.client(), daemon.client());
    assert!(Arc::ptr_eq(&c1.unwrap(), &c2.unwrap()));

    // Concurrent first use still builds exactly one log reader.
    let (l1, l2) = tokio::join!(daemon.logs_stream(), daemon.logs_stream());
    let (l1, l2) = (l1.unwrap(), l2.unwrap());
    assert!(Arc::ptr_eq(&l1, &l2));
    assert!(wait_for(|| async { fake.log_feed_connections() >= 1 }, WAIT).await);

    let conns = daemon.connections_stream().await.unwrap();
    assert!(wait_for(|| async { fake.connections_feed_connections() >= 1 }, WAIT).await);

    daemon.close_streams();
    assert!(l1.is_closed());
    assert!(conns.is_closed());
}

#[tokio::test]
async fn test_daemon_handle_caches_failure() {
    let daemon = Daemon::new(EndpointOptions {
        hostname: Some("   ".into()),
        ..Default::default()
    });

    let first = daemon.client().await.unwrap_err();
    let second = daemon.client().await.unwrap_err();
    // The same settled error, not a retried resolution.
    assert!(Arc::ptr_eq(&first, &second));
    assert!(matches!(&*first, ClientError::Resolve(_)));
}

#[tokio::test]
async fn test_logs_stream_uses_configured_level() {
    let fake = TestDaemon::start().await.unwrap();
    let daemon = Daemon::new(fake.endpoint_options());

    let logs = daemon.logs_stream().await.unwrap();
    let query = logs.config().url.query().unwrap_or_default();
    assert!(query.contains("level=info"), "got query {:?}", query);
}

#[tokio::test]
async fn test_version_probe_failure_does_not_block_streams() {
    let fake = TestDaemon::start().await.unwrap();
    fake.fail_version_probes(1);

    let daemon = Daemon::new(fake.endpoint_options());
    let logs = daemon.logs_stream().await;
    assert!(logs.is_ok(), "stream setup must survive a version failure");
    assert!(wait_for(|| async { fake.log_feed_connections() >= 1 }, WAIT).await);
}

#[tokio::test]
async fn test_stream_cursor_end_to_end_through_daemon() {
    let fake = TestDaemon::start().await.unwrap();
    let daemon = Daemon::new(fake.endpoint_options());

    let logs = daemon.logs_stream().await.unwrap();
    assert!(wait_for(|| async { fake.log_feed_connections() >= 1 }, WAIT).await);

    let mut cursor = logs.subscribe();
    fake.push_log(LogLevel::Info, "via handle");

    let record = timeout(WAIT, cursor.next()).await.unwrap().unwrap();
    assert_eq!(record.payload.payload, "via handle");
}
