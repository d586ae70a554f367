mod helpers;

use bastion_dns_domain::{DnsError, DnsProtocol, RecordType};
use bastion_dns_infrastructure::dns::upstream::{ServerStatus, UpstreamPool, UpstreamServer};
use helpers::{spawn_mock_dns_server, spawn_silent_socket};
use std::str::FromStr;
use std::time::Duration;

fn server_for(addr: std::net::SocketAddr) -> UpstreamServer {
    UpstreamServer::new(DnsProtocol::from_str(&format!("udp://{}", addr)).unwrap())
}

#[tokio::test]
async fn unreachable_primary_fails_over_to_healthy_secondary() {
    let (_silent_socket, silent_addr) = spawn_silent_socket().await;
    let healthy_addr = spawn_mock_dns_server("203.0.113.99".parse().unwrap(), 120).await;

    let primary = server_for(silent_addr);
    // Make the dead server look fast so the weighted pick prefers it and
    // the failover path is actually exercised.
    for _ in 0..8 {
        primary.record_success(100);
    }
    let secondary = server_for(healthy_addr);

    let pool = UpstreamPool::new(vec![primary, secondary], Duration::from_millis(250), 3, 100, 5_000);

    let mut primary_degraded = false;
    for _ in 0..10 {
        let (answer, _server) = pool
            .resolve("failover.test", &RecordType::A, false)
            .await
            .expect("resolution must succeed via the healthy secondary");
        assert_eq!(answer.answers.len(), 1);

        let primary_state = pool.servers()[0].status();
        if primary_state != ServerStatus::Healthy {
            primary_degraded = true;
            break;
        }
    }

    assert!(
        primary_degraded,
        "the unresponsive primary must end up degraded"
    );
}

#[tokio::test]
async fn all_servers_down_exhausts_the_attempt_budget() {
    let (_s1, addr1) = spawn_silent_socket().await;
    let (_s2, addr2) = spawn_silent_socket().await;

    let pool = UpstreamPool::new(vec![server_for(addr1), server_for(addr2)], Duration::from_millis(150), 2, 100, 5_000);

    let err = pool
        .resolve("exhausted.test", &RecordType::A, false)
        .await
        .unwrap_err();
    assert!(matches!(err, DnsError::UpstreamExhausted));

    for server in pool.servers() {
        assert_ne!(
            server.status(),
            ServerStatus::Healthy,
            "every attempted server carries the failure"
        );
    }
}

#[tokio::test]
async fn degraded_server_recovers_after_a_success() {
    let healthy_addr = spawn_mock_dns_server("203.0.113.50".parse().unwrap(), 60).await;
    let server = server_for(healthy_addr);
    server.record_failure(1, 1); // 1 ms cool-down, expires immediately

    let pool = UpstreamPool::new(vec![server], Duration::from_millis(250), 2, 100, 5_000);
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    let (answer, _server) = pool
        .resolve("recovery.test", &RecordType::A, false)
        .await
        .unwrap();
    assert_eq!(answer.answers.len(), 1);
    assert_eq!(pool.servers()[0].status(), ServerStatus::Healthy);
}

#[tokio::test]
async fn resolution_reports_the_answering_server() {
    let addr = spawn_mock_dns_server("203.0.113.42".parse().unwrap(), 60).await;
    let pool = UpstreamPool::new(vec![server_for(addr)], Duration::from_millis(250), 1, 100, 5_000);

    let (_, server_display) = pool
        .resolve("who-answered.test", &RecordType::A, false)
        .await
        .unwrap();
    assert!(server_display.contains(&addr.port().to_string()));
}
