//! Resource provider trait definition

use crate::action::{ApplyResult, Plan};
use crate::error::Result;
use crate::state::{ProviderState, ResourceState};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resource provider abstraction
///
/// A provider owns the mapping between declared resources and one remote
/// service. It never persists anything itself: every operation receives the
/// host's [`ProviderState`] and mutates it in place, and the caller decides
/// when to save.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Returns the provider name (e.g., "openproject")
    fn name(&self) -> &str;

    /// Returns the provider display name for UI
    fn display_name(&self) -> &str;

    /// Re-read every managed resource and update the stored attributes.
    /// Resources that no longer exist remotely are dropped from `state`.
    async fn refresh(&self, state: &mut ProviderState) -> Result<RefreshReport>;

    /// Calculate the actions needed to move `current` to `desired`
    async fn plan(&self, desired: &ResourceSet, current: &ProviderState) -> Result<Plan>;

    /// Apply the planned actions, recording every completed step in `state`
    async fn apply(
        &self,
        plan: &Plan,
        desired: &ResourceSet,
        state: &mut ProviderState,
    ) -> Result<ApplyResult>;

    /// Adopt an existing remote resource under a local name
    async fn import(
        &self,
        resource_type: &str,
        name: &str,
        remote_id: &str,
        desired: &ResourceSet,
        state: &mut ProviderState,
    ) -> Result<ResourceState>;

    /// Destroy a single managed resource identified by its state key (type:name)
    async fn destroy(&self, key: &str, state: &mut ProviderState) -> Result<()>;
}

/// Outcome of a refresh pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshReport {
    /// Keys whose remote resource still exists
    pub refreshed: Vec<String>,

    /// Keys whose remote resource disappeared and were removed from state
    pub removed: Vec<String>,
}

impl RefreshReport {
    pub fn has_drift(&self) -> bool {
        !self.removed.is_empty()
    }
}

/// Set of desired resources
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceSet {
    /// Resources indexed by type:name
    pub resources: BTreeMap<String, ResourceConfig>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, resource: ResourceConfig) {
        self.resources.insert(resource.key(), resource);
    }

    pub fn get(&self, resource_type: &str, name: &str) -> Option<&ResourceConfig> {
        self.resources.get(&format!("{}:{}", resource_type, name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceConfig> {
        self.resources.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Declared configuration for one resource
///
/// `config` stays loosely typed here; providers decode it into their own
/// strongly typed spec once, at the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Resource type (e.g., "user")
    pub resource_type: String,

    /// Local resource name
    pub name: String,

    /// Provider name
    pub provider: String,

    /// Resource-specific configuration
    pub config: serde_json::Value,
}

impl ResourceConfig {
    pub fn new(
        resource_type: impl Into<String>,
        name: impl Into<String>,
        provider: impl Into<String>,
        config: serde_json::Value,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            provider: provider.into(),
            config,
        }
    }

    /// Get the full resource key (type:name)
    pub fn key(&self) -> String {
        format!("{}:{}", self.resource_type, self.name)
    }

    /// Decode the whole configuration into a typed spec
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.config.clone())?)
    }
}
