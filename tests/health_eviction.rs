//! Active health checking against a running balancer.

use std::time::Duration;

use service_balancer::config::PingKind;
use service_balancer::discovery::{ServiceInstance, StaticServerList};
use service_balancer::{HealthStatus, LbError, LoadBalancer, RequestContext};
use std::sync::Arc;

mod common;

fn status_of(lb: &LoadBalancer, host: &str) -> HealthStatus {
    lb.registry()
        .current()
        .endpoints()
        .iter()
        .find(|e| e.id().host == host)
        .map(|e| e.status())
        .unwrap_or(HealthStatus::Unknown)
}

#[tokio::test]
async fn test_failing_endpoint_evicted_and_restored() {
    let ping = common::ScriptedPing::new();
    let lb = LoadBalancer::builder("users", common::fast_config())
        .ping(ping.clone())
        .build(common::static_list(&["a", "b", "c"]))
        .unwrap();
    lb.start().await.unwrap();

    assert!(
        common::wait_until(Duration::from_secs(2), || {
            status_of(&lb, "b") == HealthStatus::Up
        })
        .await
    );
    assert_eq!(common::hosts(&lb, 3), vec!["a", "b", "c"]);

    ping.fail("b");
    assert!(
        common::wait_until(Duration::from_secs(2), || {
            status_of(&lb, "b") == HealthStatus::Down
        })
        .await,
        "b should go down after three failed probes"
    );
    assert_eq!(common::hosts(&lb, 4), vec!["a", "c", "a", "c"]);

    ping.recover("b");
    assert!(
        common::wait_until(Duration::from_secs(2), || {
            status_of(&lb, "b") == HealthStatus::Up
        })
        .await,
        "b should come back after two successful probes"
    );
    assert_eq!(common::hosts(&lb, 3), vec!["a", "b", "c"]);

    lb.stop().await.unwrap();
}

#[tokio::test]
async fn test_all_down_is_no_available_endpoint() {
    let ping = common::ScriptedPing::new();
    ping.fail("a");
    ping.fail("b");
    let lb = LoadBalancer::builder("users", common::fast_config())
        .ping(ping.clone())
        .build(common::static_list(&["a", "b"]))
        .unwrap();
    lb.start().await.unwrap();

    assert!(
        common::wait_until(Duration::from_secs(2), || {
            lb.stats().available() == 0
        })
        .await
    );
    assert!(matches!(
        lb.choose(&RequestContext::default()),
        Err(LbError::NoAvailableEndpoint { .. })
    ));
    // Still running; the registry is unchanged.
    assert_eq!(lb.registry().current().len(), 2);

    lb.stop().await.unwrap();
}

#[tokio::test]
async fn test_tcp_ping_against_real_listeners() {
    let live = common::start_mock_backend(200).await;
    let closed = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let mut config = common::fast_config();
    config.health_check.ping = PingKind::Tcp;
    config.health_check.timeout_ms = 20;

    let list = StaticServerList::new(vec![
        ServiceInstance::new("127.0.0.1", live.port()),
        ServiceInstance::new("127.0.0.1", closed.port()),
    ]);
    let lb = LoadBalancer::builder("tcp", config)
        .build(Arc::new(list))
        .unwrap();
    lb.start().await.unwrap();

    let port_status = |port: u16| {
        lb.registry()
            .current()
            .endpoints()
            .iter()
            .find(|e| e.id().port == port)
            .map(|e| e.status())
    };

    assert!(
        common::wait_until(Duration::from_secs(3), || {
            port_status(closed.port()) == Some(HealthStatus::Down)
                && port_status(live.port()) == Some(HealthStatus::Up)
        })
        .await
    );

    for _ in 0..4 {
        let chosen = lb.choose(&RequestContext::default()).unwrap();
        assert_eq!(chosen.id().port, live.port());
    }

    lb.stop().await.unwrap();
}

#[tokio::test]
async fn test_http_ping_follows_status_code() {
    let healthy = common::start_mock_backend(200).await;
    let failing = common::start_mock_backend(503).await;

    let mut config = common::fast_config();
    config.health_check.ping = PingKind::Http;
    config.health_check.interval_ms = 50;
    config.health_check.timeout_ms = 50;

    let list = StaticServerList::new(vec![
        ServiceInstance::new("127.0.0.1", healthy.port()),
        ServiceInstance::new("127.0.0.1", failing.port()),
    ]);
    let lb = LoadBalancer::builder("http", config)
        .build(Arc::new(list))
        .unwrap();
    lb.start().await.unwrap();

    assert!(
        common::wait_until(Duration::from_secs(3), || {
            let stats = lb.stats();
            stats.endpoints.iter().any(|e| e.status == HealthStatus::Down)
                && stats.endpoints.iter().any(|e| e.status == HealthStatus::Up)
        })
        .await
    );

    let chosen = lb.choose(&RequestContext::default()).unwrap();
    assert_eq!(chosen.id().port, healthy.port());

    lb.stop().await.unwrap();
}
