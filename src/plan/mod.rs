//! Cache plan.
//!
//! Expands the [`CacheManifest`] into one [`CacheDefinition`] per cache by
//! resolving every name through the [`PolicyTable`]. The plan, together with
//! the cluster and map settings, is everything the external cache runtime
//! needs to create its caches.

mod manifest;

use std::collections::{BTreeMap, BTreeSet};

use metrics::gauge;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{ClusterSettings, ManagementCenterSettings, MapSettings, Settings};
use crate::policy::{
    ConfigurationError, DEFAULT_LISTENER_FACTORY, EvictionPolicy, Expiry, Policy, PolicyOverride,
    PolicyTable, Resolution, TimeUnit,
};

pub use manifest::{
    CacheManifest, CacheOrigin, CollectionCache, QUERY_RESULTS_REGION, UPDATE_TIMESTAMPS_REGION,
};

const METRIC_PLAN_CACHES: &str = "cachewire_plan_caches";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaxSizePolicy {
    EntryCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpiryPolicyType {
    Created,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvictionDefinition {
    pub size: u32,
    pub max_size_policy: MaxSizePolicy,
    pub eviction_policy: EvictionPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiryDefinition {
    pub policy_type: ExpiryPolicyType,
    pub duration_amount: u64,
    pub time_unit: TimeUnit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryListenerDefinition {
    pub factory: String,
}

/// Configuration of one cache as handed to the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheDefinition {
    pub name: String,
    pub origin: CacheOrigin,
    /// True when no entry matched `name` and the `DEFAULT` policy was used.
    pub resolved_from_default: bool,
    pub statistics_enabled: bool,
    pub management_enabled: bool,
    pub read_through: bool,
    pub write_through: bool,
    pub eviction: EvictionDefinition,
    pub expiry: ExpiryDefinition,
    pub backup_count: u32,
    pub async_backup_count: u32,
    pub entry_listeners: Vec<EntryListenerDefinition>,
}

impl CacheDefinition {
    pub fn from_policy(
        name: impl Into<String>,
        origin: CacheOrigin,
        policy: &Policy,
        resolution: Resolution,
    ) -> Self {
        Self {
            name: name.into(),
            origin,
            resolved_from_default: resolution.is_fallback(),
            statistics_enabled: policy.statistics_enabled,
            management_enabled: policy.management_enabled,
            read_through: policy.read_through,
            write_through: policy.write_through,
            eviction: EvictionDefinition {
                size: policy.max_entries,
                max_size_policy: MaxSizePolicy::EntryCount,
                eviction_policy: policy.eviction_policy,
            },
            expiry: ExpiryDefinition {
                policy_type: ExpiryPolicyType::Created,
                duration_amount: policy.expiry.amount,
                time_unit: policy.expiry.unit,
            },
            backup_count: policy.backup_count,
            async_backup_count: policy.async_backup_count,
            entry_listeners: policy
                .entry_listener_factory
                .iter()
                .map(|factory| EntryListenerDefinition {
                    factory: factory.clone(),
                })
                .collect(),
        }
    }

    /// The policy this definition was built from.
    pub fn policy(&self) -> Policy {
        Policy {
            statistics_enabled: self.statistics_enabled,
            management_enabled: self.management_enabled,
            read_through: self.read_through,
            write_through: self.write_through,
            max_entries: self.eviction.size,
            eviction_policy: self.eviction.eviction_policy,
            expiry: Expiry::new(self.expiry.duration_amount, self.expiry.time_unit),
            backup_count: self.backup_count,
            async_backup_count: self.async_backup_count,
            entry_listener_factory: self
                .entry_listeners
                .first()
                .map(|listener| listener.factory.clone()),
        }
    }
}

/// Everything the runtime is configured with.
#[derive(Debug, Clone, Serialize)]
pub struct CachePlan {
    pub cluster: ClusterSettings,
    pub management_center: ManagementCenterSettings,
    pub caches: BTreeMap<String, CacheDefinition>,
    pub maps: BTreeMap<String, MapSettings>,
}

impl CachePlan {
    pub fn build(settings: &Settings, table: &PolicyTable) -> Result<Self, ConfigurationError> {
        let plan = Self {
            cluster: settings.cluster.clone(),
            management_center: settings.management_center.clone(),
            caches: plan_caches(&settings.manifest, table)?,
            maps: settings.maps.clone(),
        };

        for factory in plan.listener_factories() {
            if factory != DEFAULT_LISTENER_FACTORY {
                warn!(
                    factory,
                    served = DEFAULT_LISTENER_FACTORY,
                    "Cache references a listener factory this process does not serve"
                );
            }
        }

        gauge!(METRIC_PLAN_CACHES).set(plan.caches.len() as f64);
        info!(
            caches = plan.caches.len(),
            maps = plan.maps.len(),
            policies = table.len(),
            "Cache plan built"
        );

        Ok(plan)
    }

    pub fn cache(&self, name: &str) -> Option<&CacheDefinition> {
        self.caches.get(name)
    }

    pub fn cache_names(&self) -> impl Iterator<Item = &str> {
        self.caches.keys().map(String::as_str)
    }

    /// Distinct listener factory references across all caches.
    pub fn listener_factories(&self) -> BTreeSet<&str> {
        self.caches
            .values()
            .flat_map(|cache| cache.entry_listeners.iter())
            .map(|listener| listener.factory.as_str())
            .collect()
    }
}

/// Resolve every declared cache, in manifest order; later declarations of
/// the same name replace earlier ones.
pub fn plan_caches(
    manifest: &CacheManifest,
    table: &PolicyTable,
) -> Result<BTreeMap<String, CacheDefinition>, ConfigurationError> {
    let mut planner = Planner {
        table,
        caches: BTreeMap::new(),
    };

    for entity in &manifest.entities {
        let name = checked_name(entity, "manifest.entities")?;
        planner.add(name, CacheOrigin::Entity, None);
    }

    if manifest.include_collections {
        let no_write_through = PolicyOverride::write_through(false);
        for collection in &manifest.collections {
            checked_name(&collection.owner, "manifest.collections")?;
            checked_name(&collection.field, "manifest.collections")?;
            planner.add(
                collection.cache_name(),
                CacheOrigin::Collection,
                Some(&no_write_through),
            );
        }
    }

    for region in &manifest.query_regions {
        let name = checked_name(region, "manifest.query_regions")?;
        planner.add(name, CacheOrigin::QueryRegion, None);
    }

    for namespace in &manifest.namespaces {
        let name = checked_name(namespace, "manifest.namespaces")?;
        planner.add(name, CacheOrigin::Namespace, None);
    }

    if manifest.include_hibernate_regions {
        planner.add(QUERY_RESULTS_REGION.to_string(), CacheOrigin::BuiltIn, None);
        planner.add(
            UPDATE_TIMESTAMPS_REGION.to_string(),
            CacheOrigin::BuiltIn,
            Some(&PolicyOverride::expiry(Expiry::one_day())),
        );
    }

    Ok(planner.caches)
}

struct Planner<'a> {
    table: &'a PolicyTable,
    caches: BTreeMap<String, CacheDefinition>,
}

impl Planner<'_> {
    fn add(&mut self, name: String, origin: CacheOrigin, forced: Option<&PolicyOverride>) {
        let (policy, resolution) = self.table.resolve_with_origin(&name);
        if resolution.is_fallback() {
            debug!(cache = %name, ?origin, "No policy entry for cache; using DEFAULT");
        }
        let policy = match forced {
            Some(overrides) => policy.with_override(overrides),
            None => policy,
        };

        let definition = CacheDefinition::from_policy(name.clone(), origin, &policy, resolution);
        if let Some(previous) = self.caches.insert(name, definition) {
            debug!(
                cache = %previous.name,
                previous_origin = ?previous.origin,
                ?origin,
                "Cache declared more than once; later declaration wins"
            );
        }
    }
}

fn checked_name(raw: &str, section: &'static str) -> Result<String, ConfigurationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigurationError::invalid_manifest(
            section,
            "cache names must not be blank",
        ));
    }
    Ok(trimmed.to_string())
}
