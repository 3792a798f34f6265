use crate::workspace::{self, Workspace};
use colored::Colorize;
use opflow_cloud::CloudProvider;
use std::path::Path;

pub async fn handle(config: Option<&Path>, yes: bool) -> anyhow::Result<()> {
    println!("{}", "実行計画を作成中...".blue());
    let ws = Workspace::load(config)?;
    let provider = ws.provider()?;

    let lock = ws.state_manager.acquire_lock().await?;
    let (mut global, mut state) = ws.load_state().await?;

    let report = provider.refresh(&mut state).await?;
    workspace::print_drift(&report);

    let plan = provider.plan(&ws.resources, &state).await?;
    workspace::print_plan(&plan);

    if !plan.has_changes {
        if report.has_drift() {
            ws.save_state(&mut global, &state).await?;
        }
        lock.release().await?;
        return Ok(());
    }

    // 確認（--yesが指定されていない場合）
    if !yes {
        println!();
        println!(
            "{}",
            "警告: replace 対象のユーザーは削除後に再作成されます。".yellow()
        );
        println!("実行するには --yes オプションを指定してください");
        lock.release().await?;
        return Ok(());
    }

    println!();
    println!("{}", "適用中...".green());
    // 1アクションごとに保存するので、中断しても成功分はステートに残る
    let result = ws
        .apply_each(&provider, &plan, &mut global, &mut state)
        .await?;
    lock.release().await?;

    workspace::print_apply_result(&result);
    if !result.is_success() {
        anyhow::bail!("{} 件のアクションが失敗しました", result.failed.len());
    }

    println!("{}", "✓ 適用が完了しました".green().bold());
    Ok(())
}
