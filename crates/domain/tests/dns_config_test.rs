use bastion_dns_domain::{CliOverrides, Config};

#[test]
fn default_config_is_valid() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.server.dns_port, 53);
    assert!(!config.dns.upstream.servers.is_empty());
}

#[test]
fn parses_minimal_toml() {
    let config = Config::from_toml_str(
        r#"
        [server]
        bind_address = "127.0.0.1"
        dns_port = 5353

        [dns.upstream]
        servers = ["udp://9.9.9.9:53", "tls://dns.quad9.net:853"]
        attempt_budget = 2

        [dns.cache]
        max_entries = 10000
        min_ttl = 10
        max_ttl = 3600
        "#,
    )
    .unwrap();

    assert_eq!(config.server.dns_port, 5353);
    assert_eq!(config.dns.upstream.servers.len(), 2);
    assert_eq!(config.dns.upstream.attempt_budget, 2);
    assert_eq!(config.dns.cache.max_entries, 10000);
    assert_eq!(config.dns.cache.min_ttl, 10);
}

#[test]
fn rejects_empty_upstream_list() {
    let result = Config::from_toml_str(
        r#"
        [dns.upstream]
        servers = []
        "#,
    );
    assert!(result.is_err());
}

#[test]
fn rejects_non_power_of_two_shards() {
    let result = Config::from_toml_str(
        r#"
        [dns.cache]
        shard_amount = 6
        "#,
    );
    assert!(result.is_err());
}

#[test]
fn rejects_inverted_ttl_bounds() {
    let result = Config::from_toml_str(
        r#"
        [dns.cache]
        min_ttl = 600
        max_ttl = 60
        "#,
    );
    assert!(result.is_err());
}

#[test]
fn cli_overrides_take_precedence() {
    let overrides = CliOverrides {
        bind_address: Some("0.0.0.0".into()),
        dns_port: Some(10053),
        udp_workers: Some(2),
        log_level: Some("debug".into()),
    };
    let config = Config::load(None, overrides).unwrap();
    assert_eq!(config.server.dns_port, 10053);
    assert_eq!(config.server.udp_workers, 2);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn rotate_threshold_defaults_to_capacity() {
    let config = Config::from_toml_str(
        r#"
        [dns.cache]
        max_entries = 5000
        "#,
    )
    .unwrap();
    assert_eq!(config.dns.cache.effective_rotate_insert_threshold(), 5000);
}
