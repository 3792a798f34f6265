use anyhow::Context;
use colored::Colorize;
use opflow_cloud::{
    ActionType, ApplyResult, CloudProvider, GlobalState, Plan, ProviderState, RefreshReport,
    ResourceConfig, ResourceSet, StateManager,
};
use opflow_cloud_openproject::{
    ConnectionContext, OpenProjectProvider, PROVIDER_NAME, USER_RESOURCE,
};
use opflow_config::Project;
use std::path::Path;

/// 読み込んだプロジェクトとステートの置き場所
pub struct Workspace {
    pub project: Project,
    pub resources: ResourceSet,
    pub state_manager: StateManager,
}

impl Workspace {
    /// プロジェクトファイルを読み込む（パス省略時は自動検索）
    pub fn load(config: Option<&Path>) -> anyhow::Result<Self> {
        let path = match config {
            Some(path) => path.to_path_buf(),
            None => opflow_config::find_config_file()?,
        };
        let project = opflow_config::load_project(&path)
            .with_context(|| format!("{} の読み込みに失敗しました", path.display()))?;

        println!("📄 読み込んだ設定ファイル:");
        println!("  • {}", path.display().to_string().cyan());

        let resources = resource_set(&project)?;
        let state_manager = StateManager::new(project.root_dir());

        Ok(Self {
            project,
            resources,
            state_manager,
        })
    }

    /// 接続設定を確定してプロバイダーを作る
    pub fn provider(&self) -> anyhow::Result<OpenProjectProvider> {
        let settings = self.project.provider.resolve()?;
        let ctx = ConnectionContext::new(settings.app_url, settings.apikey)?
            .with_timeout(settings.timeout);
        tracing::debug!("Connecting to {}", ctx.base_url());
        Ok(OpenProjectProvider::new(ctx))
    }

    pub async fn load_state(&self) -> anyhow::Result<(GlobalState, ProviderState)> {
        let global = self
            .state_manager
            .load()
            .await
            .context("ステートの読み込みに失敗しました")?;
        let state = global.provider_state(PROVIDER_NAME);
        Ok((global, state))
    }

    pub async fn save_state(
        &self,
        global: &mut GlobalState,
        state: &ProviderState,
    ) -> anyhow::Result<()> {
        global.set_provider_state(PROVIDER_NAME, state.clone());
        self.state_manager
            .save(global)
            .await
            .context("ステートの保存に失敗しました")?;
        tracing::debug!("State saved to {}", self.state_manager.state_path().display());
        Ok(())
    }

    /// 実行計画を1アクションずつ適用し、その都度ステートを保存する
    ///
    /// 途中で中断しても、作成済みユーザーの ID はディスク上に残る。
    pub async fn apply_each<P: CloudProvider + ?Sized>(
        &self,
        provider: &P,
        plan: &Plan,
        global: &mut GlobalState,
        state: &mut ProviderState,
    ) -> anyhow::Result<ApplyResult> {
        let mut result = ApplyResult::new();

        for action in &plan.actions {
            if action.action_type == ActionType::NoOp {
                continue;
            }
            let step = Plan::new(vec![action.clone()]);
            let outcome = provider.apply(&step, &self.resources, state).await;
            self.save_state(global, state).await?;

            let outcome = outcome?;
            result.succeeded.extend(outcome.succeeded);
            result.failed.extend(outcome.failed);
            result.duration_ms += outcome.duration_ms;
        }

        Ok(result)
    }
}

/// user ブロックを宣言済みリソースに変換
pub fn resource_set(project: &Project) -> anyhow::Result<ResourceSet> {
    let mut resources = ResourceSet::new();
    for (name, user) in &project.users {
        resources.add(ResourceConfig::new(
            USER_RESOURCE,
            name,
            PROVIDER_NAME,
            serde_json::to_value(user)?,
        ));
    }
    Ok(resources)
}

pub fn print_drift(report: &RefreshReport) {
    for key in &report.removed {
        println!(
            "  {} {} はリモートで削除されていました（ステートから除外）",
            "⚠".yellow(),
            key.yellow()
        );
    }
}

pub fn print_plan(plan: &Plan) {
    println!();
    println!("{}", "実行計画:".bold());

    for action in &plan.actions {
        let marker = match action.action_type {
            ActionType::Create => "+".green(),
            ActionType::Replace => "-/+".yellow(),
            ActionType::Delete => "-".red(),
            ActionType::NoOp => continue,
        };
        println!("  {} {}", marker, action.description);
    }

    println!();
    if plan.has_changes {
        println!("{}", plan.summary().to_string().bold());
    } else {
        println!("{}", "✓ 変更はありません".green());
    }
}

pub fn print_apply_result(result: &ApplyResult) {
    println!();
    for success in &result.succeeded {
        println!("  {} {}", "✓".green(), success.message);
    }
    for failure in &result.failed {
        println!(
            "  {} {}: {}",
            "✗".red(),
            failure.action_id,
            failure.error.as_deref().unwrap_or("unknown error")
        );
    }
    println!();
    println!(
        "完了: 成功 {} 件, 失敗 {} 件 ({}ms)",
        result.succeeded.len(),
        result.failed.len(),
        result.duration_ms
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use opflow_cloud::{Action, CloudError, ResourceState};
    use opflow_config::Project;

    /// 指定した名前の作成中に接続が切れるプロバイダー
    struct FlakyProvider {
        fail_on: &'static str,
    }

    #[async_trait]
    impl CloudProvider for FlakyProvider {
        fn name(&self) -> &str {
            PROVIDER_NAME
        }

        fn display_name(&self) -> &str {
            "Flaky"
        }

        async fn refresh(&self, _state: &mut ProviderState) -> opflow_cloud::Result<RefreshReport> {
            Ok(RefreshReport::default())
        }

        async fn plan(
            &self,
            _desired: &ResourceSet,
            _current: &ProviderState,
        ) -> opflow_cloud::Result<Plan> {
            Ok(Plan::empty())
        }

        async fn apply(
            &self,
            plan: &Plan,
            _desired: &ResourceSet,
            state: &mut ProviderState,
        ) -> opflow_cloud::Result<ApplyResult> {
            let mut result = ApplyResult::new();
            for action in &plan.actions {
                if action.resource_name == self.fail_on {
                    return Err(CloudError::Provider("connection reset".to_string()));
                }
                let id = format!("id-{}", action.resource_name);
                state.add(action.resource_key(), ResourceState::new(&id, USER_RESOURCE));
                result.add_success(action.id.clone(), format!("created {}", id));
            }
            Ok(result)
        }

        async fn import(
            &self,
            resource_type: &str,
            _name: &str,
            _remote_id: &str,
            _desired: &ResourceSet,
            _state: &mut ProviderState,
        ) -> opflow_cloud::Result<ResourceState> {
            Err(CloudError::UnsupportedResourceType(resource_type.to_string()))
        }

        async fn destroy(&self, key: &str, _state: &mut ProviderState) -> opflow_cloud::Result<()> {
            Err(CloudError::ResourceNotFound(key.to_string()))
        }
    }

    fn workspace_in(dir: &Path) -> Workspace {
        Workspace {
            project: Project {
                path: dir.join("opflow.kdl"),
                ..Default::default()
            },
            resources: ResourceSet::new(),
            state_manager: StateManager::new(dir),
        }
    }

    fn create(name: &str) -> Action {
        Action::new(ActionType::Create, USER_RESOURCE, name, format!("create user {}", name))
    }

    #[tokio::test]
    async fn test_apply_each_keeps_created_ids_on_disk_after_failure() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ws = workspace_in(temp_dir.path());
        let provider = FlakyProvider { fail_on: "bob" };
        let plan = Plan::new(vec![create("alice"), create("bob"), create("carol")]);

        let (mut global, mut state) = ws.load_state().await.unwrap();
        let err = ws
            .apply_each(&provider, &plan, &mut global, &mut state)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection reset"));

        // 別プロセスとして読み直しても alice の ID が残っている
        let (_, reloaded) = workspace_in(temp_dir.path()).load_state().await.unwrap();
        assert_eq!(reloaded.get("user:alice").unwrap().id, "id-alice");
        assert!(reloaded.get("user:bob").is_none());
        assert!(reloaded.get("user:carol").is_none());
    }

    #[tokio::test]
    async fn test_apply_each_merges_results() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ws = workspace_in(temp_dir.path());
        let provider = FlakyProvider { fail_on: "" };
        let plan = Plan::new(vec![create("alice"), create("carol")]);

        let (mut global, mut state) = ws.load_state().await.unwrap();
        let result = ws
            .apply_each(&provider, &plan, &mut global, &mut state)
            .await
            .unwrap();
        assert_eq!(result.succeeded.len(), 2);
        assert!(result.is_success());

        let (_, reloaded) = ws.load_state().await.unwrap();
        assert_eq!(reloaded.len(), 2);
    }

    #[test]
    fn test_resource_set_from_project() {
        let project = opflow_config::parse_project(
            r#"
user "jdoe" {
    username "jdoe"
    email "j@x.com"
    firstname "J"
    lastname "Doe"
    password "pw"
}
"#,
        )
        .unwrap();

        let resources = resource_set(&project).unwrap();
        assert_eq!(resources.len(), 1);

        let user = resources.get(USER_RESOURCE, "jdoe").unwrap();
        assert_eq!(user.key(), "user:jdoe");
        assert_eq!(user.provider, PROVIDER_NAME);

        let spec = opflow_cloud_openproject::provider::user_spec(user).unwrap();
        assert_eq!(spec.username, "jdoe");
        assert_eq!(spec.password, "pw");
    }
}
