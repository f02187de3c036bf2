//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fmt,
    num::NonZeroU32,
    str::FromStr,
};

use clap::Parser;
use config::{Config, Environment, File, Map};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::listeners::DEFAULT_KEY_ONLY_PREFIXES;
use crate::plan::CacheManifest;
use crate::policy::{ConfigurationError, PolicyOverride, PolicyTable};

pub use cli::{
    CliArgs, Command, DispatchArgs, OutputFormat, PlanArgs, ResolveArgs, SettingsOverrides,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "cachewire";
const ENV_PREFIX: &str = "CACHEWIRE";
const ENV_SEPARATOR: &str = "__";
const ENV_CACHE_CONFIG_PREFIX: &str = "CACHEWIRE__CACHE_CONFIG__";
const DEFAULT_NETWORK_PORT: u16 = 5701;
const DEFAULT_NETWORK_PORT_COUNT: u32 = 100;
const DEFAULT_TCP_IP_CONNECTION_TIMEOUT_SECS: u32 = 10;
const DEFAULT_MANAGEMENT_CENTER_UPDATE_INTERVAL_SECS: u32 = 5;

/// Fully validated runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub cluster: ClusterSettings,
    pub management_center: ManagementCenterSettings,
    /// Partial policies keyed by cache name. Holds `DEFAULT` unless a
    /// configuration source replaced the whole table without one.
    pub cache_config: HashMap<String, PolicyOverride>,
    pub manifest: CacheManifest,
    pub maps: BTreeMap<String, MapSettings>,
    pub listeners: ListenerSettings,
}

impl Settings {
    /// Build the policy table described by `cache_config`.
    pub fn policy_table(&self) -> Result<PolicyTable, ConfigurationError> {
        PolicyTable::from_overrides(&self.cache_config)
    }
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

/// Membership and network settings passed through to the cache runtime.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterSettings {
    pub instance_name: Option<String>,
    /// Whether the runtime instance is shut down when the process tears down.
    pub shutdown_on_teardown: bool,
    pub group: Option<GroupSettings>,
    pub network: NetworkSettings,
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupSettings {
    pub name: String,
    pub password: Option<Secret>,
}

/// A credential that never appears in logs or rendered output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("***")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkSettings {
    pub port: u16,
    pub port_count: NonZeroU32,
    pub port_auto_increment: bool,
    pub interfaces: BTreeSet<String>,
    pub public_address: Option<String>,
    pub join: JoinSettings,
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinSettings {
    pub multicast: MulticastSettings,
    pub tcp_ip: TcpIpSettings,
}

#[derive(Debug, Clone, Serialize)]
pub struct MulticastSettings {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TcpIpSettings {
    pub enabled: bool,
    pub connection_timeout_seconds: NonZeroU32,
    pub members: Vec<String>,
    pub required_member: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManagementCenterSettings {
    pub enabled: bool,
    pub url: Option<String>,
    pub update_interval_seconds: NonZeroU32,
}

/// Settings for a distributed map (as opposed to a JCache-style cache).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapSettings {
    pub max_idle_seconds: Option<u32>,
    pub attributes: Vec<MapAttribute>,
    pub indexes: Vec<MapIndex>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapAttribute {
    pub name: String,
    pub extractor: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapIndex {
    pub attribute: String,
    #[serde(default)]
    pub ordered: bool,
}

#[derive(Debug, Clone)]
pub struct ListenerSettings {
    pub logging: LoggingListenerSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingListenerSettings {
    pub enabled: bool,
    pub key_only_prefixes: Vec<String>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: String, reason: String },
}

impl LoadError {
    fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Resolve settings from defaults, files, the environment and `cli`, in that order.
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    load_with_env(cli, std::env::vars())
}

/// Like [`load`], reading `CACHEWIRE__*` variables from `vars` instead of
/// the process environment.
///
/// Environment keys arrive lowercased, so `cache_config` entries from the
/// environment are matched to configured cache names ignoring ASCII case.
pub fn load_with_env<I>(cli: &CliArgs, vars: I) -> Result<Settings, LoadError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let (policy_vars, other_vars): (Map<String, String>, Map<String, String>) = vars
        .into_iter()
        .partition(|(key, _)| is_cache_config_var(key));

    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(environment(other_vars));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    let env_policies: RawEnvPolicies = Config::builder()
        .add_source(environment(policy_vars))
        .build()?
        .try_deserialize()?;
    raw.layer_env_policies(env_policies.cache_config);
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

fn environment(vars: Map<String, String>) -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator(ENV_SEPARATOR)
        .source(Some(vars))
}

fn is_cache_config_var(key: &str) -> bool {
    key.get(..ENV_CACHE_CONFIG_PREFIX.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(ENV_CACHE_CONFIG_PREFIX))
}

/// Resolve configuration using the process arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    cluster: RawClusterSettings,
    management_center: RawManagementCenterSettings,
    cache_config: HashMap<String, PolicyOverride>,
    manifest: CacheManifest,
    maps: BTreeMap<String, MapSettings>,
    listeners: RawListenerSettings,
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            logging: RawLoggingSettings::default(),
            cluster: RawClusterSettings::default(),
            management_center: RawManagementCenterSettings::default(),
            cache_config: HashMap::from([(
                PolicyTable::DEFAULT_KEY.to_string(),
                PolicyOverride::default(),
            )]),
            manifest: CacheManifest::default(),
            maps: BTreeMap::new(),
            listeners: RawListenerSettings::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEnvPolicies {
    cache_config: HashMap<String, PolicyOverride>,
}

impl RawSettings {
    /// Layer environment policies over file policies. Names are matched
    /// ignoring ASCII case; an unmatched `default` becomes `DEFAULT`.
    fn layer_env_policies(&mut self, policies: HashMap<String, PolicyOverride>) {
        for (name, partial) in policies {
            let key = self
                .cache_config
                .keys()
                .find(|existing| existing.eq_ignore_ascii_case(&name))
                .cloned()
                .unwrap_or_else(|| {
                    if name.eq_ignore_ascii_case(PolicyTable::DEFAULT_KEY) {
                        PolicyTable::DEFAULT_KEY.to_string()
                    } else {
                        name
                    }
                });
            self.cache_config.entry(key).or_default().layer(partial);
        }
    }

    fn apply_overrides(&mut self, overrides: &SettingsOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(name) = overrides.cluster_instance_name.as_ref() {
            self.cluster.instance_name = Some(name.clone());
        }
        if let Some(port) = overrides.network_port {
            self.cluster.network.port = Some(port);
        }
        if let Some(address) = overrides.network_public_address.as_ref() {
            self.cluster.network.public_address = Some(address.clone());
        }
        if !overrides.tcp_ip_members.is_empty() {
            self.cluster.network.join.tcp_ip.members = overrides.tcp_ip_members.clone();
        }
        if let Some(enabled) = overrides.management_center_enabled {
            self.management_center.enabled = Some(enabled);
        }
        if let Some(url) = overrides.management_center_url.as_ref() {
            self.management_center.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        Ok(Self {
            logging: build_logging_settings(raw.logging)?,
            cluster: build_cluster_settings(raw.cluster)?,
            management_center: build_management_center_settings(raw.management_center)?,
            cache_config: raw.cache_config,
            manifest: raw.manifest,
            maps: build_map_settings(raw.maps)?,
            listeners: build_listener_settings(raw.listeners),
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_cluster_settings(cluster: RawClusterSettings) -> Result<ClusterSettings, LoadError> {
    let instance_name = non_blank(cluster.instance_name);

    let group = match non_blank(cluster.group.name) {
        Some(name) => Some(GroupSettings {
            name,
            password: cluster.group.password.filter(|p| !p.is_empty()).map(Secret),
        }),
        None if cluster.group.password.is_some() => {
            return Err(LoadError::invalid(
                "cluster.group.name",
                "a group password requires a group name",
            ));
        }
        None => None,
    };

    Ok(ClusterSettings {
        instance_name,
        shutdown_on_teardown: cluster.shutdown_on_teardown.unwrap_or(true),
        group,
        network: build_network_settings(cluster.network)?,
        properties: cluster.properties,
    })
}

fn build_network_settings(network: RawNetworkSettings) -> Result<NetworkSettings, LoadError> {
    let port = network.port.unwrap_or(DEFAULT_NETWORK_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "cluster.network.port",
            "must be greater than zero",
        ));
    }
    let port_count = non_zero_u32(
        network.port_count.unwrap_or(DEFAULT_NETWORK_PORT_COUNT),
        "cluster.network.port_count",
    )?;

    let mut interfaces = BTreeSet::new();
    for interface in network.interfaces {
        let trimmed = interface.trim();
        if trimmed.is_empty() {
            return Err(LoadError::invalid(
                "cluster.network.interfaces",
                "interface patterns must not be blank",
            ));
        }
        interfaces.insert(trimmed.to_string());
    }

    let join = build_join_settings(network.join)?;

    Ok(NetworkSettings {
        port,
        port_count,
        port_auto_increment: network.port_auto_increment.unwrap_or(true),
        interfaces,
        public_address: non_blank(network.public_address),
        join,
    })
}

fn build_join_settings(join: RawJoinSettings) -> Result<JoinSettings, LoadError> {
    let multicast_enabled = join.multicast.enabled.unwrap_or(false);
    let tcp_ip_enabled = join.tcp_ip.enabled.unwrap_or(true);
    if multicast_enabled && tcp_ip_enabled {
        return Err(LoadError::invalid(
            "cluster.network.join",
            "multicast and tcp_ip join cannot both be enabled",
        ));
    }

    let mut members = Vec::with_capacity(join.tcp_ip.members.len());
    for member in join.tcp_ip.members {
        let trimmed = member.trim();
        if trimmed.is_empty() {
            return Err(LoadError::invalid(
                "cluster.network.join.tcp_ip.members",
                "member addresses must not be blank",
            ));
        }
        if !members.iter().any(|existing| existing == trimmed) {
            members.push(trimmed.to_string());
        }
    }

    let connection_timeout_seconds = non_zero_u32(
        join.tcp_ip
            .connection_timeout_seconds
            .unwrap_or(DEFAULT_TCP_IP_CONNECTION_TIMEOUT_SECS),
        "cluster.network.join.tcp_ip.connection_timeout_seconds",
    )?;

    Ok(JoinSettings {
        multicast: MulticastSettings {
            enabled: multicast_enabled,
        },
        tcp_ip: TcpIpSettings {
            enabled: tcp_ip_enabled,
            connection_timeout_seconds,
            members,
            required_member: non_blank(join.tcp_ip.required_member),
        },
    })
}

fn build_management_center_settings(
    management_center: RawManagementCenterSettings,
) -> Result<ManagementCenterSettings, LoadError> {
    let enabled = management_center.enabled.unwrap_or(false);
    let url = non_blank(management_center.url);
    if enabled && url.is_none() {
        return Err(LoadError::invalid(
            "management_center.url",
            "required when the management center is enabled",
        ));
    }
    let update_interval_seconds = non_zero_u32(
        management_center
            .update_interval
            .unwrap_or(DEFAULT_MANAGEMENT_CENTER_UPDATE_INTERVAL_SECS),
        "management_center.update_interval",
    )?;

    Ok(ManagementCenterSettings {
        enabled,
        url,
        update_interval_seconds,
    })
}

fn build_map_settings(
    maps: BTreeMap<String, MapSettings>,
) -> Result<BTreeMap<String, MapSettings>, LoadError> {
    for (name, map) in &maps {
        if name.trim().is_empty() {
            return Err(LoadError::invalid("maps", "map names must not be blank"));
        }
        if map.max_idle_seconds == Some(0) {
            return Err(LoadError::invalid(
                format!("maps.{name}.max_idle_seconds"),
                "must be greater than zero",
            ));
        }
        for attribute in &map.attributes {
            if attribute.name.trim().is_empty() || attribute.extractor.trim().is_empty() {
                return Err(LoadError::invalid(
                    format!("maps.{name}.attributes"),
                    "attribute name and extractor must not be blank",
                ));
            }
        }
        for index in &map.indexes {
            if index.attribute.trim().is_empty() {
                return Err(LoadError::invalid(
                    format!("maps.{name}.indexes"),
                    "index attribute must not be blank",
                ));
            }
        }
    }
    Ok(maps)
}

fn build_listener_settings(listeners: RawListenerSettings) -> ListenerSettings {
    let key_only_prefixes = listeners.logging.key_only_prefixes.unwrap_or_else(|| {
        DEFAULT_KEY_ONLY_PREFIXES
            .iter()
            .map(|prefix| prefix.to_string())
            .collect()
    });

    ListenerSettings {
        logging: LoggingListenerSettings {
            enabled: listeners.logging.enabled.unwrap_or(true),
            key_only_prefixes,
        },
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawClusterSettings {
    instance_name: Option<String>,
    shutdown_on_teardown: Option<bool>,
    group: RawGroupSettings,
    network: RawNetworkSettings,
    properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawGroupSettings {
    name: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawNetworkSettings {
    port: Option<u16>,
    port_count: Option<u32>,
    port_auto_increment: Option<bool>,
    interfaces: Vec<String>,
    public_address: Option<String>,
    join: RawJoinSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawJoinSettings {
    multicast: RawMulticastSettings,
    tcp_ip: RawTcpIpSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawMulticastSettings {
    enabled: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawTcpIpSettings {
    enabled: Option<bool>,
    connection_timeout_seconds: Option<u32>,
    members: Vec<String>,
    required_member: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawManagementCenterSettings {
    enabled: Option<bool>,
    url: Option<String>,
    update_interval: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawListenerSettings {
    logging: RawLoggingListenerSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingListenerSettings {
    enabled: Option<bool>,
    key_only_prefixes: Option<Vec<String>>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn non_zero_u32(value: u32, key: &'static str) -> Result<NonZeroU32, LoadError> {
    NonZeroU32::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

#[cfg(test)]
mod tests;
