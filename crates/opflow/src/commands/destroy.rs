use crate::workspace::Workspace;
use colored::Colorize;
use opflow_cloud::CloudProvider;
use opflow_cloud_openproject::USER_RESOURCE;
use std::path::Path;

pub async fn handle(config: Option<&Path>, name: Option<&str>, yes: bool) -> anyhow::Result<()> {
    let ws = Workspace::load(config)?;
    let provider = ws.provider()?;

    let lock = ws.state_manager.acquire_lock().await?;
    let (mut global, mut state) = ws.load_state().await?;

    let targets = match name {
        Some(name) => {
            let key = format!("{}:{}", USER_RESOURCE, name);
            if state.get(&key).is_none() {
                anyhow::bail!("user '{}' は管理されていません", name);
            }
            vec![key]
        }
        None => state.keys(),
    };

    if targets.is_empty() {
        println!("{}", "削除対象のユーザーはありません".green());
        lock.release().await?;
        return Ok(());
    }

    println!();
    println!("{}", format!("削除対象 ({} 件):", targets.len()).bold());
    for key in &targets {
        let id = state.get(key).map(|s| s.id.as_str()).unwrap_or("?");
        println!("  {} {} (id {})", "-".red(), key.cyan(), id);
    }

    // 確認（--yesが指定されていない場合）
    if !yes {
        println!();
        println!("{}", "警告: OpenProject からユーザーを削除します。".yellow());
        println!("実行するには --yes オプションを指定してください");
        lock.release().await?;
        return Ok(());
    }

    println!();
    let mut failed = 0;
    for key in &targets {
        match provider.destroy(key, &mut state).await {
            Ok(()) => {
                ws.save_state(&mut global, &state).await?;
                println!("  {} {} を削除しました", "✓".green(), key.cyan());
            }
            Err(e) => {
                failed += 1;
                println!("  {} {}: {}", "✗".red(), key, e);
            }
        }
    }

    lock.release().await?;

    if failed > 0 {
        anyhow::bail!("{} 件の削除が失敗しました", failed);
    }
    Ok(())
}
