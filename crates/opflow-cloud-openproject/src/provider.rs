//! OpenProject provider implementation
//!
//! Adapts the user reconciler to the host's plan/apply loop. Users are never
//! updated in place: any attribute change plans a replace.

use crate::client::OpenProjectClient;
use crate::config::ConnectionContext;
use crate::model::{RemoteUserRecord, UserIdentity, UserSpec};
use crate::resource::{ReadOutcome, UserResource};
use crate::api::UserApi;
use async_trait::async_trait;
use opflow_cloud::{
    Action, ActionType, ApplyResult, CloudError, CloudProvider, Plan, ProviderState,
    RefreshReport, ResourceConfig, ResourceSet, ResourceState, ResourceStatus,
};
use serde_json::json;

pub const PROVIDER_NAME: &str = "openproject";
pub const USER_RESOURCE: &str = "user";

const ATTR_USERNAME: &str = "username";
const ATTR_EMAIL: &str = "email";
const ATTR_FIRSTNAME: &str = "firstname";
const ATTR_LASTNAME: &str = "lastname";
const ATTR_PASSWORD_SHA256: &str = "password_sha256";

/// OpenProject provider
pub struct OpenProjectProvider<A = OpenProjectClient> {
    ctx: ConnectionContext,
    users: UserResource<A>,
}

impl OpenProjectProvider<OpenProjectClient> {
    pub fn new(ctx: ConnectionContext) -> Self {
        Self::with_api(ctx, OpenProjectClient::new())
    }
}

impl<A: UserApi> OpenProjectProvider<A> {
    pub fn with_api(ctx: ConnectionContext, api: A) -> Self {
        Self {
            ctx,
            users: UserResource::new(api),
        }
    }

    pub fn context(&self) -> &ConnectionContext {
        &self.ctx
    }

    async fn create(&self, spec: &UserSpec) -> opflow_cloud::Result<ResourceState> {
        let created = self.users.create(&self.ctx, spec).await?;
        Ok(user_state(&created.snapshot, Some(spec.password_fingerprint())))
    }

    async fn delete(&self, state: &ResourceState) -> opflow_cloud::Result<()> {
        self.users
            .delete(&self.ctx, &UserIdentity::new(state.id.as_str()))
            .await?;
        Ok(())
    }
}

/// Decode and validate a declared user once, at the boundary
pub fn user_spec(resource: &ResourceConfig) -> opflow_cloud::Result<UserSpec> {
    if resource.resource_type != USER_RESOURCE {
        return Err(CloudError::UnsupportedResourceType(
            resource.resource_type.clone(),
        ));
    }
    let spec: UserSpec = resource.decode().map_err(|e| {
        CloudError::InvalidConfig(format!("user {}: {}", resource.name, e))
    })?;
    spec.validate().map_err(|e| {
        CloudError::InvalidConfig(format!("user {}: {}", resource.name, e))
    })?;
    Ok(spec)
}

/// Stored state of a user: identity, observed attributes, password fingerprint
fn user_state(record: &RemoteUserRecord, password_sha256: Option<String>) -> ResourceState {
    let mut state = ResourceState::new(record.id.as_str(), USER_RESOURCE)
        .with_status(ResourceStatus::Active);
    observe(&mut state, record);
    if let Some(fingerprint) = password_sha256 {
        state.set_attribute(ATTR_PASSWORD_SHA256, json!(fingerprint));
    }
    state
}

fn observe(state: &mut ResourceState, record: &RemoteUserRecord) {
    state.set_attribute(ATTR_USERNAME, json!(record.login));
    state.set_attribute(ATTR_EMAIL, json!(record.email));
    state.set_attribute(ATTR_FIRSTNAME, json!(record.firstname));
    state.set_attribute(ATTR_LASTNAME, json!(record.lastname));
    state.status = ResourceStatus::Active;
}

/// Attributes whose stored value differs from the desired spec.
/// A missing password fingerprint cannot be compared and is not a change.
fn changed_attributes(state: &ResourceState, spec: &UserSpec) -> Vec<&'static str> {
    let mut changed = Vec::new();
    for (name, desired) in [
        (ATTR_USERNAME, &spec.username),
        (ATTR_EMAIL, &spec.email),
        (ATTR_FIRSTNAME, &spec.firstname),
        (ATTR_LASTNAME, &spec.lastname),
    ] {
        if state.attribute_str(name) != desired.as_str() {
            changed.push(name);
        }
    }
    if let Some(stored) = state.get_attribute::<String>(ATTR_PASSWORD_SHA256)
        && stored != spec.password_fingerprint()
    {
        changed.push("password");
    }
    changed
}

#[async_trait]
impl<A: UserApi> CloudProvider for OpenProjectProvider<A> {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn display_name(&self) -> &str {
        "OpenProject"
    }

    async fn refresh(&self, state: &mut ProviderState) -> opflow_cloud::Result<RefreshReport> {
        let mut report = RefreshReport::default();

        for key in state.keys() {
            let Some(current) = state.get(&key) else {
                continue;
            };
            if current.resource_type != USER_RESOURCE {
                tracing::warn!("Skipping unsupported resource in state: {}", key);
                continue;
            }

            let identity = UserIdentity::new(current.id.as_str());
            match self.users.read(&self.ctx, &identity).await? {
                ReadOutcome::Found(record) => {
                    if let Some(entry) = state.get_mut(&key) {
                        observe(entry, &record);
                    }
                    report.refreshed.push(key);
                }
                ReadOutcome::Absent => {
                    tracing::warn!("{} (id {}) was deleted outside opflow", key, identity);
                    state.remove(&key);
                    report.removed.push(key);
                }
            }
        }

        Ok(report)
    }

    async fn plan(
        &self,
        desired: &ResourceSet,
        current: &ProviderState,
    ) -> opflow_cloud::Result<Plan> {
        let mut actions = Vec::new();

        for resource in desired.iter() {
            let spec = user_spec(resource)?;
            let key = resource.key();

            match current.get(&key) {
                None => {
                    actions.push(Action::new(
                        ActionType::Create,
                        USER_RESOURCE,
                        &resource.name,
                        format!("create user {} ({})", resource.name, spec.username),
                    ));
                }
                Some(existing) => {
                    let changed = changed_attributes(existing, &spec);
                    if changed.is_empty() {
                        actions.push(
                            Action::new(
                                ActionType::NoOp,
                                USER_RESOURCE,
                                &resource.name,
                                format!("user {} is up to date", resource.name),
                            )
                            .with_detail("id", json!(existing.id)),
                        );
                    } else {
                        actions.push(
                            Action::new(
                                ActionType::Replace,
                                USER_RESOURCE,
                                &resource.name,
                                format!(
                                    "replace user {} ({} changed)",
                                    resource.name,
                                    changed.join(", ")
                                ),
                            )
                            .with_detail("id", json!(existing.id))
                            .with_detail("changed", json!(changed)),
                        );
                    }
                }
            }
        }

        for (key, existing) in current.iter() {
            if desired.resources.contains_key(key) {
                continue;
            }
            if existing.resource_type != USER_RESOURCE {
                tracing::warn!("Skipping unsupported resource in state: {}", key);
                continue;
            }
            let name = key.split_once(':').map(|(_, n)| n).unwrap_or(key);
            actions.push(
                Action::new(
                    ActionType::Delete,
                    existing.resource_type.as_str(),
                    name,
                    format!("delete user {} (id {})", name, existing.id),
                )
                .with_detail("id", json!(existing.id)),
            );
        }

        Ok(Plan::new(actions))
    }

    async fn apply(
        &self,
        plan: &Plan,
        desired: &ResourceSet,
        state: &mut ProviderState,
    ) -> opflow_cloud::Result<ApplyResult> {
        let mut result = ApplyResult::new();
        let start = std::time::Instant::now();

        for action in &plan.actions {
            let key = action.resource_key();

            match action.action_type {
                ActionType::Create | ActionType::Replace => {
                    let spec = match desired
                        .get(&action.resource_type, &action.resource_name)
                        .ok_or_else(|| CloudError::ResourceNotFound(key.clone()))
                        .and_then(user_spec)
                    {
                        Ok(spec) => spec,
                        Err(e) => {
                            result.add_failure(action.id.clone(), e.to_string());
                            continue;
                        }
                    };

                    if action.action_type == ActionType::Replace
                        && let Some(existing) = state.get(&key).cloned()
                    {
                        tracing::info!("Replacing {}: deleting id {}", key, existing.id);
                        if let Err(e) = self.delete(&existing).await {
                            result.add_failure(action.id.clone(), e.to_string());
                            continue;
                        }
                        state.remove(&key);
                    }

                    tracing::info!("Creating {}", key);
                    match self.create(&spec).await {
                        Ok(created) => {
                            let message = format!("created {} (id {})", key, created.id);
                            state.add(key, created);
                            result.add_success(action.id.clone(), message);
                        }
                        Err(e) => result.add_failure(action.id.clone(), e.to_string()),
                    }
                }
                ActionType::Delete => {
                    let Some(existing) = state.get(&key).cloned() else {
                        result.add_failure(action.id.clone(), format!("{} is not in state", key));
                        continue;
                    };
                    tracing::info!("Deleting {} (id {})", key, existing.id);
                    match self.delete(&existing).await {
                        Ok(()) => {
                            state.remove(&key);
                            result.add_success(action.id.clone(), format!("deleted {}", key));
                        }
                        Err(e) => result.add_failure(action.id.clone(), e.to_string()),
                    }
                }
                ActionType::NoOp => {}
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }

    async fn import(
        &self,
        resource_type: &str,
        name: &str,
        remote_id: &str,
        desired: &ResourceSet,
        state: &mut ProviderState,
    ) -> opflow_cloud::Result<ResourceState> {
        if resource_type != USER_RESOURCE {
            return Err(CloudError::UnsupportedResourceType(resource_type.to_string()));
        }
        let key = format!("{}:{}", resource_type, name);
        // Only declared users can be adopted
        let spec = match desired.get(resource_type, name) {
            Some(resource) => user_spec(resource)?,
            None => {
                return Err(CloudError::InvalidConfig(format!(
                    "{} is not declared in the project file",
                    key
                )));
            }
        };
        if let Some(existing) = state.get(&key) {
            return Err(CloudError::ResourceAlreadyManaged(format!(
                "{} (id {})",
                key, existing.id
            )));
        }

        let record = self.users.import(&self.ctx, remote_id).await?;

        let imported = user_state(&record, Some(spec.password_fingerprint()));
        state.add(key, imported.clone());
        Ok(imported)
    }

    async fn destroy(&self, key: &str, state: &mut ProviderState) -> opflow_cloud::Result<()> {
        let existing = state
            .get(key)
            .cloned()
            .ok_or_else(|| CloudError::ResourceNotFound(key.to_string()))?;

        self.delete(&existing).await?;
        state.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeUserApi, jdoe};
    use std::sync::Arc;

    fn provider() -> (Arc<FakeUserApi>, OpenProjectProvider<Arc<FakeUserApi>>) {
        let api = Arc::new(FakeUserApi::new());
        let ctx = ConnectionContext::new("http://openproject.test", "key").unwrap();
        (api.clone(), OpenProjectProvider::with_api(ctx, api))
    }

    fn declare(name: &str, spec: &UserSpec) -> ResourceConfig {
        ResourceConfig::new(
            USER_RESOURCE,
            name,
            PROVIDER_NAME,
            json!({
                "username": spec.username,
                "email": spec.email,
                "firstname": spec.firstname,
                "lastname": spec.lastname,
                "password": spec.password,
            }),
        )
    }

    fn desired_with(resources: &[(&str, UserSpec)]) -> ResourceSet {
        let mut set = ResourceSet::new();
        for (name, spec) in resources {
            set.add(declare(name, spec));
        }
        set
    }

    #[tokio::test]
    async fn test_plan_apply_creates_and_records_identity() {
        let (api, provider) = provider();
        let desired = desired_with(&[("jdoe", jdoe())]);
        let mut state = ProviderState::new();

        let plan = provider.plan(&desired, &state).await.unwrap();
        assert_eq!(plan.summary().create, 1);

        let result = provider.apply(&plan, &desired, &mut state).await.unwrap();
        assert!(result.is_success());
        assert_eq!(api.user_count(), 1);

        let stored = state.get("user:jdoe").unwrap();
        assert_eq!(stored.id, "1");
        assert_eq!(stored.attribute_str("username"), "jdoe");
        assert_eq!(stored.status, ResourceStatus::Active);
        assert!(!stored.attributes.contains_key("password"));

        let plan = provider.plan(&desired, &state).await.unwrap();
        assert!(!plan.has_changes);
    }

    #[tokio::test]
    async fn test_changed_attribute_plans_replace() {
        let (api, provider) = provider();
        let mut state = ProviderState::new();
        let desired = desired_with(&[("jdoe", jdoe())]);
        let plan = provider.plan(&desired, &state).await.unwrap();
        provider.apply(&plan, &desired, &mut state).await.unwrap();

        let mut changed = jdoe();
        changed.email = "jdoe@example.org".to_string();
        changed.password = "new-pw".to_string();
        let desired = desired_with(&[("jdoe", changed)]);

        let plan = provider.plan(&desired, &state).await.unwrap();
        assert_eq!(plan.summary().replace, 1);
        assert_eq!(plan.actions[0].details["changed"], json!(["email", "password"]));

        let result = provider.apply(&plan, &desired, &mut state).await.unwrap();
        assert!(result.is_success());
        assert_eq!(api.user_count(), 1);
        let stored = state.get("user:jdoe").unwrap();
        assert_eq!(stored.id, "2");
        assert_eq!(stored.attribute_str("email"), "jdoe@example.org");
    }

    #[tokio::test]
    async fn test_undeclared_user_plans_delete() {
        let (api, provider) = provider();
        let mut state = ProviderState::new();
        let desired = desired_with(&[("jdoe", jdoe())]);
        let plan = provider.plan(&desired, &state).await.unwrap();
        provider.apply(&plan, &desired, &mut state).await.unwrap();

        let empty = ResourceSet::new();
        let plan = provider.plan(&empty, &state).await.unwrap();
        assert_eq!(plan.summary().delete, 1);
        assert_eq!(plan.actions[0].resource_name, "jdoe");

        let result = provider.apply(&plan, &empty, &mut state).await.unwrap();
        assert!(result.is_success());
        assert!(state.is_empty());
        assert_eq!(api.user_count(), 0);
    }

    #[tokio::test]
    async fn test_refresh_drops_users_deleted_out_of_band() {
        let (api, provider) = provider();
        let mut state = ProviderState::new();
        let desired = desired_with(&[("jdoe", jdoe())]);
        let plan = provider.plan(&desired, &state).await.unwrap();
        provider.apply(&plan, &desired, &mut state).await.unwrap();

        api.remove_out_of_band(&UserIdentity::new("1"));

        let report = provider.refresh(&mut state).await.unwrap();
        assert!(report.has_drift());
        assert_eq!(report.removed, vec!["user:jdoe"]);
        assert!(state.is_empty());

        let plan = provider.plan(&desired, &state).await.unwrap();
        assert_eq!(plan.summary().create, 1);
    }

    #[tokio::test]
    async fn test_refresh_detects_out_of_band_edit() {
        let (api, provider) = provider();
        let mut state = ProviderState::new();
        let desired = desired_with(&[("jdoe", jdoe())]);
        let plan = provider.plan(&desired, &state).await.unwrap();
        provider.apply(&plan, &desired, &mut state).await.unwrap();

        api.edit_out_of_band(&UserIdentity::new("1"), |r| r.lastname = "Smith".to_string());

        let report = provider.refresh(&mut state).await.unwrap();
        assert_eq!(report.refreshed, vec!["user:jdoe"]);
        assert_eq!(state.get("user:jdoe").unwrap().attribute_str("lastname"), "Smith");

        let plan = provider.plan(&desired, &state).await.unwrap();
        assert_eq!(plan.summary().replace, 1);
    }

    #[tokio::test]
    async fn test_failed_create_leaves_state_untouched() {
        let (api, provider) = provider();
        let mut state = ProviderState::new();
        let desired = desired_with(&[("jdoe", jdoe())]);
        api.fail_next_create(422, "Login has already been taken.");

        let plan = provider.plan(&desired, &state).await.unwrap();
        let result = provider.apply(&plan, &desired, &mut state).await.unwrap();

        assert!(!result.is_success());
        assert!(state.is_empty());
        assert!(result.failed[0].error.as_deref().unwrap().contains("status 422"));
    }

    #[tokio::test]
    async fn test_replace_stops_when_delete_fails() {
        let (api, provider) = provider();
        let mut state = ProviderState::new();
        let desired = desired_with(&[("jdoe", jdoe())]);
        let plan = provider.plan(&desired, &state).await.unwrap();
        provider.apply(&plan, &desired, &mut state).await.unwrap();

        let mut changed = jdoe();
        changed.firstname = "Jane".to_string();
        let desired = desired_with(&[("jdoe", changed)]);
        api.fail_next_delete(403, "forbidden");

        let plan = provider.plan(&desired, &state).await.unwrap();
        let result = provider.apply(&plan, &desired, &mut state).await.unwrap();

        assert!(!result.is_success());
        assert_eq!(state.get("user:jdoe").unwrap().id, "1");
        assert_eq!(api.user_count(), 1);
    }

    #[tokio::test]
    async fn test_import_adopts_existing_user() {
        let (api, provider) = provider();
        let id = api.insert(&jdoe());
        let desired = desired_with(&[("jdoe", jdoe())]);
        let mut state = ProviderState::new();

        let imported = provider
            .import(USER_RESOURCE, "jdoe", id.as_str(), &desired, &mut state)
            .await
            .unwrap();
        assert_eq!(imported.id, id.as_str());
        assert!(imported.attributes.contains_key(ATTR_PASSWORD_SHA256));

        let plan = provider.plan(&desired, &state).await.unwrap();
        assert!(!plan.has_changes);

        let again = provider
            .import(USER_RESOURCE, "jdoe", id.as_str(), &desired, &mut state)
            .await;
        assert!(matches!(again, Err(CloudError::ResourceAlreadyManaged(_))));
    }

    #[tokio::test]
    async fn test_import_errors_surface_as_provider_errors() {
        let (_, provider) = provider();
        let mut state = ProviderState::new();

        let desired = desired_with(&[("ghost", jdoe())]);
        let err = provider
            .import(USER_RESOURCE, "ghost", "", &desired, &mut state)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "import failed: missing identifier");

        let err = provider
            .import("group", "devs", "1", &ResourceSet::new(), &mut state)
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::UnsupportedResourceType(_)));
    }

    #[tokio::test]
    async fn test_import_requires_declared_user() {
        let (api, provider) = provider();
        let id = api.insert(&jdoe());
        let desired = desired_with(&[("jdoe", jdoe())]);
        let mut state = ProviderState::new();

        let err = provider
            .import(USER_RESOURCE, "typo", id.as_str(), &desired, &mut state)
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::InvalidConfig(_)));
        assert!(err.to_string().contains("user:typo"));
        assert!(state.is_empty());
        assert_eq!(api.call_count(), 0);

        // nothing is planned against the remote user
        let plan = provider.plan(&desired, &state).await.unwrap();
        assert_eq!(plan.summary().delete, 0);
        provider.apply(&plan, &desired, &mut state).await.unwrap();
        assert_eq!(api.user_count(), 2);
    }

    #[tokio::test]
    async fn test_plan_ignores_foreign_resource_types() {
        let (api, provider) = provider();
        let mut state = ProviderState::new();
        state.add(
            "group:devs",
            ResourceState::new("9", "group").with_status(ResourceStatus::Active),
        );

        let plan = provider.plan(&ResourceSet::new(), &state).await.unwrap();
        assert!(plan.actions.is_empty());
        assert!(!plan.has_changes);

        let result = provider
            .apply(&plan, &ResourceSet::new(), &mut state)
            .await
            .unwrap();
        assert!(result.is_success());
        assert!(state.get("group:devs").is_some());
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_destroy_removes_from_state() {
        let (api, provider) = provider();
        let mut state = ProviderState::new();
        let desired = desired_with(&[("jdoe", jdoe())]);
        let plan = provider.plan(&desired, &state).await.unwrap();
        provider.apply(&plan, &desired, &mut state).await.unwrap();

        provider.destroy("user:jdoe", &mut state).await.unwrap();
        assert!(state.is_empty());
        assert_eq!(api.user_count(), 0);

        let err = provider.destroy("user:jdoe", &mut state).await.unwrap_err();
        assert!(matches!(err, CloudError::ResourceNotFound(_)));
    }

    #[tokio::test]
    async fn test_plan_rejects_incomplete_user() {
        let (_, provider) = provider();
        let mut desired = ResourceSet::new();
        desired.add(ResourceConfig::new(
            USER_RESOURCE,
            "broken",
            PROVIDER_NAME,
            json!({"username": "x", "email": "x@y.z", "firstname": "X", "lastname": "Y"}),
        ));

        let err = provider.plan(&desired, &ProviderState::new()).await.unwrap_err();
        assert!(matches!(err, CloudError::InvalidConfig(_)));
        assert!(err.to_string().contains("user broken"));
    }
}
