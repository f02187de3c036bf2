//! Cache policies.
//!
//! A [`Policy`] is the behavioural contract the external runtime applies to
//! one named cache. Policies live in a [`PolicyTable`] keyed by cache name,
//! with a mandatory `DEFAULT` entry that every unknown name resolves to.
//!
//! ```toml
//! [cache_config.DEFAULT]
//! max_entries = 50000
//! eviction_policy = "LRU"
//! duration_amount = 30
//! time_unit = "MINUTES"
//!
//! [cache_config.OrdersCache]
//! max_entries = 1000
//! ```

mod error;
mod table;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use error::ConfigurationError;
pub use table::{PolicyTable, Resolution};

const DEFAULT_MAX_ENTRIES: u32 = 50_000;
const DEFAULT_EXPIRY_AMOUNT: u64 = 30;
const DEFAULT_BACKUP_COUNT: u32 = 0;
const DEFAULT_ASYNC_BACKUP_COUNT: u32 = 0;

/// Factory reference attached to every cache unless configured otherwise.
pub const DEFAULT_LISTENER_FACTORY: &str = "cachewire.composite";

/// Eviction strategy the runtime applies once `max_entries` is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EvictionPolicy {
    #[default]
    #[serde(alias = "lru")]
    Lru,
    #[serde(alias = "lfu")]
    Lfu,
    #[serde(alias = "random")]
    Random,
    #[serde(alias = "none")]
    None,
}

impl EvictionPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lru => "LRU",
            Self::Lfu => "LFU",
            Self::Random => "RANDOM",
            Self::None => "NONE",
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeUnit {
    #[serde(alias = "nanoseconds")]
    Nanoseconds,
    #[serde(alias = "microseconds")]
    Microseconds,
    #[serde(alias = "milliseconds")]
    Milliseconds,
    #[serde(alias = "seconds")]
    Seconds,
    #[default]
    #[serde(alias = "minutes")]
    Minutes,
    #[serde(alias = "hours")]
    Hours,
    #[serde(alias = "days")]
    Days,
}

impl TimeUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nanoseconds => "NANOSECONDS",
            Self::Microseconds => "MICROSECONDS",
            Self::Milliseconds => "MILLISECONDS",
            Self::Seconds => "SECONDS",
            Self::Minutes => "MINUTES",
            Self::Hours => "HOURS",
            Self::Days => "DAYS",
        }
    }

    /// Converts `amount` of this unit to a [`Duration`], saturating on overflow.
    pub fn duration(self, amount: u64) -> Duration {
        match self {
            Self::Nanoseconds => Duration::from_nanos(amount),
            Self::Microseconds => Duration::from_micros(amount),
            Self::Milliseconds => Duration::from_millis(amount),
            Self::Seconds => Duration::from_secs(amount),
            Self::Minutes => Duration::from_secs(amount.saturating_mul(60)),
            Self::Hours => Duration::from_secs(amount.saturating_mul(60 * 60)),
            Self::Days => Duration::from_secs(amount.saturating_mul(24 * 60 * 60)),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time-to-live measured from entry creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Expiry {
    pub amount: u64,
    pub unit: TimeUnit,
}

impl Expiry {
    pub const fn new(amount: u64, unit: TimeUnit) -> Self {
        Self { amount, unit }
    }

    /// Fixed one-day TTL used for the update-timestamps region.
    pub const fn one_day() -> Self {
        Self::new(1, TimeUnit::Days)
    }

    pub fn as_duration(&self) -> Duration {
        self.unit.duration(self.amount)
    }
}

impl Default for Expiry {
    fn default() -> Self {
        Self::new(DEFAULT_EXPIRY_AMOUNT, TimeUnit::Minutes)
    }
}

/// Behavioural parameters for one named cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub statistics_enabled: bool,
    pub management_enabled: bool,
    pub read_through: bool,
    pub write_through: bool,
    /// Capacity bound, counted in entries.
    pub max_entries: u32,
    pub eviction_policy: EvictionPolicy,
    pub expiry: Expiry,
    pub backup_count: u32,
    pub async_backup_count: u32,
    /// Listener factory the runtime attaches to the cache, if any.
    pub entry_listener_factory: Option<String>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            statistics_enabled: true,
            management_enabled: true,
            read_through: true,
            write_through: true,
            max_entries: DEFAULT_MAX_ENTRIES,
            eviction_policy: EvictionPolicy::Lru,
            expiry: Expiry::default(),
            backup_count: DEFAULT_BACKUP_COUNT,
            async_backup_count: DEFAULT_ASYNC_BACKUP_COUNT,
            entry_listener_factory: Some(DEFAULT_LISTENER_FACTORY.to_string()),
        }
    }
}

impl Policy {
    /// Returns a copy of this policy with every supplied field replaced.
    pub fn with_override(&self, overrides: &PolicyOverride) -> Policy {
        let mut policy = self.clone();
        if let Some(value) = overrides.statistics_enabled {
            policy.statistics_enabled = value;
        }
        if let Some(value) = overrides.management_enabled {
            policy.management_enabled = value;
        }
        if let Some(value) = overrides.read_through {
            policy.read_through = value;
        }
        if let Some(value) = overrides.write_through {
            policy.write_through = value;
        }
        if let Some(value) = overrides.max_entries {
            policy.max_entries = value;
        }
        if let Some(value) = overrides.eviction_policy {
            policy.eviction_policy = value;
        }
        if let Some(value) = overrides.duration_amount {
            policy.expiry.amount = value;
        }
        if let Some(value) = overrides.time_unit {
            policy.expiry.unit = value;
        }
        if let Some(value) = overrides.backup_count {
            policy.backup_count = value;
        }
        if let Some(value) = overrides.async_backup_count {
            policy.async_backup_count = value;
        }
        if let Some(factory) = overrides.entry_listener_factory.as_ref() {
            let trimmed = factory.trim();
            policy.entry_listener_factory = (!trimmed.is_empty()).then(|| trimmed.to_string());
        }
        policy
    }

    pub(crate) fn validate(&self, cache: &str) -> Result<(), ConfigurationError> {
        if self.max_entries == 0 {
            return Err(ConfigurationError::invalid_policy(
                cache,
                "max_entries must be greater than zero",
            ));
        }
        if self.expiry.amount == 0 {
            return Err(ConfigurationError::invalid_policy(
                cache,
                "expiry duration must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Equivalent to [`Policy::with_override`].
pub fn with_override(policy: &Policy, overrides: &PolicyOverride) -> Policy {
    policy.with_override(overrides)
}

/// A partial [`Policy`]: only the fields that are `Some` replace the base.
///
/// Field names follow the configuration document, so the expiry is split
/// into `duration_amount` and `time_unit`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyOverride {
    pub statistics_enabled: Option<bool>,
    pub management_enabled: Option<bool>,
    pub read_through: Option<bool>,
    pub write_through: Option<bool>,
    #[serde(alias = "size")]
    pub max_entries: Option<u32>,
    pub eviction_policy: Option<EvictionPolicy>,
    pub duration_amount: Option<u64>,
    pub time_unit: Option<TimeUnit>,
    pub backup_count: Option<u32>,
    pub async_backup_count: Option<u32>,
    /// A blank string removes the listener binding.
    #[serde(alias = "cache_entry_listener_factory")]
    pub entry_listener_factory: Option<String>,
}

impl PolicyOverride {
    pub fn write_through(value: bool) -> Self {
        Self {
            write_through: Some(value),
            ..Default::default()
        }
    }

    pub fn expiry(expiry: Expiry) -> Self {
        Self {
            duration_amount: Some(expiry.amount),
            time_unit: Some(expiry.unit),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Replace every field that `upper` sets, keeping the rest.
    pub fn layer(&mut self, upper: PolicyOverride) {
        fn take<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }
        take(&mut self.statistics_enabled, upper.statistics_enabled);
        take(&mut self.management_enabled, upper.management_enabled);
        take(&mut self.read_through, upper.read_through);
        take(&mut self.write_through, upper.write_through);
        take(&mut self.max_entries, upper.max_entries);
        take(&mut self.eviction_policy, upper.eviction_policy);
        take(&mut self.duration_amount, upper.duration_amount);
        take(&mut self.time_unit, upper.time_unit);
        take(&mut self.backup_count, upper.backup_count);
        take(&mut self.async_backup_count, upper.async_backup_count);
        take(&mut self.entry_listener_factory, upper.entry_listener_factory);
    }
}
