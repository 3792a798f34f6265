use crate::workspace::{self, Workspace};
use colored::Colorize;
use opflow_cloud::CloudProvider;
use std::path::Path;

pub async fn handle(config: Option<&Path>) -> anyhow::Result<()> {
    println!("{}", "リモートの状態を取得中...".blue());
    let ws = Workspace::load(config)?;
    let provider = ws.provider()?;

    let lock = ws.state_manager.acquire_lock().await?;
    let (mut global, mut state) = ws.load_state().await?;

    let report = provider.refresh(&mut state).await?;
    ws.save_state(&mut global, &state).await?;
    lock.release().await?;

    println!();
    for key in &report.refreshed {
        println!("  {} {}", "✓".green(), key.cyan());
    }
    workspace::print_drift(&report);

    println!();
    println!(
        "更新: {} 件, 除外: {} 件",
        report.refreshed.len(),
        report.removed.len()
    );
    Ok(())
}
