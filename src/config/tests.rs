use std::io::Write;

use tempfile::NamedTempFile;

use super::*;
use crate::policy::{EvictionPolicy, Resolution, TimeUnit};

fn raw_from_toml(source: &str) -> RawSettings {
    toml::from_str(source).expect("valid raw settings")
}

#[test]
fn defaults_produce_valid_settings() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert_eq!(settings.cluster.network.port, 5701);
    assert_eq!(settings.cluster.network.port_count.get(), 100);
    assert!(settings.cluster.network.port_auto_increment);
    assert!(!settings.cluster.network.join.multicast.enabled);
    assert!(settings.cluster.network.join.tcp_ip.enabled);
    assert_eq!(
        settings
            .cluster
            .network
            .join
            .tcp_ip
            .connection_timeout_seconds
            .get(),
        10
    );
    assert!(settings.cluster.shutdown_on_teardown);
    assert!(!settings.management_center.enabled);
    assert_eq!(settings.management_center.update_interval_seconds.get(), 5);
    assert!(settings.listeners.logging.enabled);
    assert_eq!(
        settings.listeners.logging.key_only_prefixes,
        vec!["ImagesCache".to_string()]
    );
    assert!(settings.cache_config.contains_key("DEFAULT"));
    assert!(settings.policy_table().is_ok());
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.cluster.network.port = Some(5801);
    raw.logging.level = Some("info".to_string());

    let overrides = SettingsOverrides {
        network_port: Some(6001),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.cluster.network.port, 6001);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = SettingsOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn cli_members_replace_configured_members() {
    let mut raw = raw_from_toml(
        r#"
        [cluster.network.join.tcp_ip]
        members = ["10.0.0.1", "10.0.0.2"]
        "#,
    );
    let overrides = SettingsOverrides {
        tcp_ip_members: vec!["10.0.0.9".to_string()],
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(
        settings.cluster.network.join.tcp_ip.members,
        vec!["10.0.0.9".to_string()]
    );
}

#[test]
fn invalid_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());
    let err = Settings::from_raw(raw).unwrap_err();
    assert!(matches!(err, LoadError::Invalid { ref key, .. } if key == "logging.level"));
}

#[test]
fn cache_config_parses_partial_policies() {
    let raw = raw_from_toml(
        r#"
        [cache_config.DEFAULT]
        max_entries = 50000
        eviction_policy = "LRU"
        duration_amount = 30
        time_unit = "MINUTES"

        [cache_config.OrdersCache]
        max_entries = 1000

        [cache_config."com.example.domain.Customer"]
        eviction_policy = "LFU"
        time_unit = "HOURS"
        "#,
    );
    let settings = Settings::from_raw(raw).expect("valid settings");
    let table = settings.policy_table().expect("valid table");

    let orders = table.resolve("OrdersCache");
    assert_eq!(orders.max_entries, 1000);
    assert_eq!(orders.eviction_policy, EvictionPolicy::Lru);

    let customer = table.resolve("com.example.domain.Customer");
    assert_eq!(customer.eviction_policy, EvictionPolicy::Lfu);
    assert_eq!(customer.expiry.amount, 30);
    assert_eq!(customer.expiry.unit, TimeUnit::Hours);

    assert_eq!(table.resolve("UnknownCache"), table.resolve("DEFAULT"));
}

#[test]
fn cache_config_without_default_fails_table_construction() {
    let raw = raw_from_toml(
        r#"
        [cache_config.OrdersCache]
        max_entries = 1000
        "#,
    );
    let settings = Settings::from_raw(raw).expect("settings load");
    assert_eq!(
        settings.policy_table().unwrap_err(),
        ConfigurationError::MissingDefault { key: "DEFAULT" }
    );
}

#[test]
fn management_center_requires_url_when_enabled() {
    let raw = raw_from_toml(
        r#"
        [management_center]
        enabled = true
        "#,
    );
    let err = Settings::from_raw(raw).unwrap_err();
    assert!(matches!(err, LoadError::Invalid { ref key, .. } if key == "management_center.url"));

    let raw = raw_from_toml(
        r#"
        [management_center]
        enabled = true
        url = "http://mancenter:8080/mancenter"
        update_interval = 3
        "#,
    );
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.management_center.enabled);
    assert_eq!(settings.management_center.update_interval_seconds.get(), 3);
}

#[test]
fn multicast_and_tcp_ip_are_mutually_exclusive() {
    let raw = raw_from_toml(
        r#"
        [cluster.network.join.multicast]
        enabled = true
        "#,
    );
    assert!(Settings::from_raw(raw).is_err());

    let raw = raw_from_toml(
        r#"
        [cluster.network.join.multicast]
        enabled = true
        [cluster.network.join.tcp_ip]
        enabled = false
        "#,
    );
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.cluster.network.join.multicast.enabled);
    assert!(!settings.cluster.network.join.tcp_ip.enabled);
}

#[test]
fn tcp_ip_members_are_trimmed_and_deduplicated() {
    let raw = raw_from_toml(
        r#"
        [cluster.network.join.tcp_ip]
        members = [" 10.0.0.1 ", "10.0.0.1", "10.0.0.2:5701"]
        required_member = "  "
        "#,
    );
    let settings = Settings::from_raw(raw).expect("valid settings");
    let tcp_ip = &settings.cluster.network.join.tcp_ip;
    assert_eq!(tcp_ip.members, vec!["10.0.0.1", "10.0.0.2:5701"]);
    assert_eq!(tcp_ip.required_member, None);
}

#[test]
fn blank_member_is_rejected() {
    let raw = raw_from_toml(
        r#"
        [cluster.network.join.tcp_ip]
        members = [""]
        "#,
    );
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn zero_port_count_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cluster.network.port_count = Some(0);
    let err = Settings::from_raw(raw).unwrap_err();
    assert!(err.to_string().contains("cluster.network.port_count"));
}

#[test]
fn group_password_is_masked() {
    let raw = raw_from_toml(
        r#"
        [cluster.group]
        name = "orders"
        password = "s3cret"
        "#,
    );
    let settings = Settings::from_raw(raw).expect("valid settings");
    let group = settings.cluster.group.as_ref().expect("group configured");
    assert_eq!(group.name, "orders");
    assert_eq!(
        group.password.as_ref().map(Secret::expose),
        Some("s3cret")
    );

    let rendered = serde_json::to_string(&settings.cluster).expect("serializable cluster");
    assert!(!rendered.contains("s3cret"));
    assert!(rendered.contains("\"password\":\"***\""));
    assert!(!format!("{group:?}").contains("s3cret"));
}

#[test]
fn group_password_without_name_is_rejected() {
    let raw = raw_from_toml(
        r#"
        [cluster.group]
        password = "s3cret"
        "#,
    );
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn maps_are_validated() {
    let raw = raw_from_toml(
        r#"
        [maps."PlayingDevices.*"]
        max_idle_seconds = 1800

        [maps."sessions:web"]
        attributes = [{ name = "principalName", extractor = "com.example.PrincipalNameExtractor" }]
        indexes = [{ attribute = "principalName" }]
        "#,
    );
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.maps["PlayingDevices.*"].max_idle_seconds, Some(1800));
    assert!(!settings.maps["sessions:web"].indexes[0].ordered);

    let raw = raw_from_toml(
        r#"
        [maps.broken]
        max_idle_seconds = 0
        "#,
    );
    let err = Settings::from_raw(raw).unwrap_err();
    assert!(err.to_string().contains("maps.broken.max_idle_seconds"));
}

#[test]
fn listener_prefixes_can_be_cleared() {
    let raw = raw_from_toml(
        r#"
        [listeners.logging]
        enabled = false
        key_only_prefixes = []
        "#,
    );
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(!settings.listeners.logging.enabled);
    assert!(settings.listeners.logging.key_only_prefixes.is_empty());
}

#[test]
fn manifest_section_is_parsed() {
    let raw = raw_from_toml(
        r#"
        [manifest]
        entities = ["com.example.domain.Order"]
        collections = [{ owner = "com.example.domain.Order", field = "lines" }]
        query_regions = ["orders-by-customer"]
        include_hibernate_regions = false
        "#,
    );
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.manifest.entities, vec!["com.example.domain.Order"]);
    assert_eq!(settings.manifest.collections[0].cache_name(), "com.example.domain.Order.lines");
    assert!(settings.manifest.include_collections);
    assert!(!settings.manifest.include_hibernate_regions);
}

#[test]
fn load_reads_explicit_config_file() {
    let mut file = NamedTempFile::with_suffix(".toml").expect("tmp file");
    file.write_all(
        br#"
        [logging]
        level = "warn"

        [cluster]
        instance_name = "orders-node"

        [cache_config.DEFAULT]
        max_entries = 2000
        "#,
    )
    .expect("write config");

    let args = CliArgs::parse_from([
        "cachewire",
        "--config-file",
        file.path().to_str().expect("utf-8 path"),
        "--cluster-instance-name",
        "override-node",
        "caches",
    ]);
    let settings = load(&args).expect("settings load");

    assert_eq!(settings.logging.level, LevelFilter::WARN);
    assert_eq!(settings.cluster.instance_name.as_deref(), Some("override-node"));
    let table = settings.policy_table().expect("valid table");
    assert_eq!(table.resolve("anything").max_entries, 2000);
}

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(".toml").expect("tmp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

fn cli_with_file(file: &NamedTempFile, extra: &[&str]) -> CliArgs {
    let mut args = vec![
        "cachewire",
        "--config-file",
        file.path().to_str().expect("utf-8 path"),
    ];
    args.extend_from_slice(extra);
    CliArgs::parse_from(args)
}

fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[test]
fn env_adjusts_builtin_default_policy() {
    let args = CliArgs::parse_from(["cachewire"]);
    let settings = load_with_env(
        &args,
        vars(&[("CACHEWIRE__CACHE_CONFIG__DEFAULT__MAX_ENTRIES", "33")]),
    )
    .expect("settings load");

    let names: Vec<&String> = settings.cache_config.keys().collect();
    assert_eq!(names, vec!["DEFAULT"]);
    let table = settings.policy_table().expect("DEFAULT kept");
    assert_eq!(table.resolve("anything").max_entries, 33);
    assert_eq!(table.resolve("anything").eviction_policy, EvictionPolicy::Lru);
}

#[test]
fn env_policies_layer_over_file_policies_ignoring_case() {
    let file = config_file(
        r#"
        [cache_config.DEFAULT]
        max_entries = 2000

        [cache_config.OrdersCache]
        max_entries = 1000
        eviction_policy = "LFU"
        "#,
    );

    let settings = load_with_env(
        &cli_with_file(&file, &[]),
        vars(&[
            ("CACHEWIRE__CACHE_CONFIG__DEFAULT__MAX_ENTRIES", "33"),
            ("CACHEWIRE__CACHE_CONFIG__ORDERSCACHE__MAX_ENTRIES", "5"),
        ]),
    )
    .expect("settings load");

    let mut names: Vec<&str> = settings.cache_config.keys().map(String::as_str).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["DEFAULT", "OrdersCache"]);

    let table = settings.policy_table().expect("valid table");
    let orders = table.resolve("OrdersCache");
    assert_eq!(orders.max_entries, 5);
    assert_eq!(orders.eviction_policy, EvictionPolicy::Lfu);
    assert_eq!(table.resolve("Unknown").max_entries, 33);
}

#[test]
fn env_overrides_file_and_cli_overrides_env() {
    let file = config_file(
        r#"
        [cluster]
        instance_name = "file-node"
        "#,
    );
    let env = vars(&[
        ("CACHEWIRE__CLUSTER__INSTANCE_NAME", "env-node"),
        ("CACHEWIRE__LOGGING__LEVEL", "debug"),
    ]);

    let settings = load_with_env(&cli_with_file(&file, &[]), env.clone()).expect("settings load");
    assert_eq!(settings.cluster.instance_name.as_deref(), Some("env-node"));
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);

    let settings = load_with_env(
        &cli_with_file(&file, &["--cluster-instance-name", "cli-node"]),
        env,
    )
    .expect("settings load");
    assert_eq!(settings.cluster.instance_name.as_deref(), Some("cli-node"));
}

#[test]
fn file_policy_for_dotted_entity_name_resolves_exactly() {
    let file = config_file(
        r#"
        [cache_config.DEFAULT]
        max_entries = 2000

        [cache_config."com.example.domain.Customer"]
        max_entries = 7
        time_unit = "HOURS"
        "#,
    );

    let settings = load_with_env(&cli_with_file(&file, &[]), Vec::new()).expect("settings load");
    let table = settings.policy_table().expect("valid table");

    let (policy, resolution) = table.resolve_with_origin("com.example.domain.Customer");
    assert_eq!(resolution, Resolution::Exact);
    assert_eq!(policy.max_entries, 7);
    assert_eq!(policy.expiry.unit, TimeUnit::Hours);
    assert_eq!(policy.expiry.amount, 30);
}

#[test]
fn missing_explicit_config_file_fails() {
    let args = CliArgs::parse_from([
        "cachewire",
        "--config-file",
        "/nonexistent/cachewire-config.toml",
    ]);
    assert!(matches!(load(&args), Err(LoadError::Build(_))));
}

#[test]
fn default_command_is_none() {
    let args = CliArgs::parse_from(["cachewire"]);
    assert!(args.command.is_none());
}

#[test]
fn parse_plan_arguments() {
    let args = CliArgs::parse_from(["cachewire", "plan", "--format", "toml"]);
    match args.command.expect("plan command") {
        Command::Plan(plan) => assert_eq!(plan.format, OutputFormat::Toml),
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_resolve_arguments() {
    let args = CliArgs::parse_from(["cachewire", "resolve", "OrdersCache", "--log-level", "debug"]);
    assert_eq!(args.overrides.log_level.as_deref(), Some("debug"));
    match args.command.expect("resolve command") {
        Command::Resolve(resolve) => assert_eq!(resolve.name, "OrdersCache"),
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_dispatch_arguments() {
    let args = CliArgs::parse_from(["cachewire", "dispatch", "/tmp/events.json"]);
    match args.command.expect("dispatch command") {
        Command::Dispatch(dispatch) => {
            assert_eq!(dispatch.file, std::path::Path::new("/tmp/events.json"));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_repeated_members() {
    let args = CliArgs::parse_from([
        "cachewire",
        "--tcp-ip-member",
        "10.0.0.1",
        "--tcp-ip-member",
        "10.0.0.2",
        "caches",
    ]);
    assert_eq!(args.overrides.tcp_ip_members, vec!["10.0.0.1", "10.0.0.2"]);
    assert!(matches!(args.command, Some(Command::Caches)));
}
