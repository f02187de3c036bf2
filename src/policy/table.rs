//! Name → policy lookup with a mandatory default entry.

use std::collections::HashMap;

use serde::Serialize;

use super::error::ConfigurationError;
use super::{Policy, PolicyOverride};

/// How a name was resolved by [`PolicyTable::resolve_with_origin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// The table holds an entry for exactly this name.
    Exact,
    /// No entry; the `DEFAULT` policy was returned.
    Fallback,
}

impl Resolution {
    pub fn is_fallback(self) -> bool {
        matches!(self, Self::Fallback)
    }
}

/// Immutable mapping from cache name to [`Policy`].
///
/// Construction fails unless an entry exists under [`PolicyTable::DEFAULT_KEY`],
/// so [`resolve`](PolicyTable::resolve) never has to.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    entries: HashMap<String, Policy>,
    default: Policy,
}

impl PolicyTable {
    pub const DEFAULT_KEY: &'static str = "DEFAULT";

    /// Builds a table from fully specified policies.
    pub fn new(mut entries: HashMap<String, Policy>) -> Result<Self, ConfigurationError> {
        let default = entries
            .remove(Self::DEFAULT_KEY)
            .ok_or(ConfigurationError::MissingDefault {
                key: Self::DEFAULT_KEY,
            })?;
        default.validate(Self::DEFAULT_KEY)?;
        for (name, policy) in &entries {
            policy.validate(name)?;
        }
        Ok(Self { entries, default })
    }

    /// Builds a table from partial policies as they appear in configuration.
    ///
    /// The `DEFAULT` entry is layered over [`Policy::default`]; every other
    /// entry is layered over the resulting default policy.
    pub fn from_overrides(
        overrides: &HashMap<String, PolicyOverride>,
    ) -> Result<Self, ConfigurationError> {
        let default_override =
            overrides
                .get(Self::DEFAULT_KEY)
                .ok_or(ConfigurationError::MissingDefault {
                    key: Self::DEFAULT_KEY,
                })?;
        let default = Policy::default().with_override(default_override);

        let entries = overrides
            .iter()
            .map(|(name, partial)| {
                let policy = if name == Self::DEFAULT_KEY {
                    default.clone()
                } else {
                    default.with_override(partial)
                };
                (name.clone(), policy)
            })
            .collect();

        Self::new(entries)
    }

    /// Effective policy for `name`, falling back to the default entry.
    pub fn resolve(&self, name: &str) -> Policy {
        self.resolve_with_origin(name).0
    }

    pub fn resolve_with_origin(&self, name: &str) -> (Policy, Resolution) {
        if name == Self::DEFAULT_KEY {
            return (self.default.clone(), Resolution::Exact);
        }
        match self.entries.get(name) {
            Some(policy) => (policy.clone(), Resolution::Exact),
            None => (self.default.clone(), Resolution::Fallback),
        }
    }

    pub fn default_policy(&self) -> &Policy {
        &self.default
    }

    pub fn contains(&self, name: &str) -> bool {
        name == Self::DEFAULT_KEY || self.entries.contains_key(name)
    }

    /// Configured names, `DEFAULT` included, in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .entries
            .keys()
            .map(String::as_str)
            .chain(std::iter::once(Self::DEFAULT_KEY))
            .collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}
