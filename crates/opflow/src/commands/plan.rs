use crate::workspace::{self, Workspace};
use colored::Colorize;
use opflow_cloud::CloudProvider;
use std::path::Path;

pub async fn handle(config: Option<&Path>) -> anyhow::Result<()> {
    println!("{}", "実行計画を作成中...".blue());
    let ws = Workspace::load(config)?;
    let provider = ws.provider()?;

    // ステートは保存しない
    let (_, mut state) = ws.load_state().await?;
    let report = provider.refresh(&mut state).await?;
    workspace::print_drift(&report);

    let plan = provider.plan(&ws.resources, &state).await?;
    workspace::print_plan(&plan);

    Ok(())
}
