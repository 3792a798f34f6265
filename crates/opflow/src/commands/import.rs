use crate::workspace::Workspace;
use colored::Colorize;
use opflow_cloud::CloudProvider;
use opflow_cloud_openproject::USER_RESOURCE;
use std::path::Path;

pub async fn handle(config: Option<&Path>, name: &str, id: &str) -> anyhow::Result<()> {
    println!(
        "{}",
        format!("user '{}' を ID {} で取り込み中...", name, id).blue()
    );
    let ws = Workspace::load(config)?;
    let provider = ws.provider()?;

    let lock = ws.state_manager.acquire_lock().await?;
    let (mut global, mut state) = ws.load_state().await?;

    let imported = provider
        .import(USER_RESOURCE, name, id, &ws.resources, &mut state)
        .await?;

    ws.save_state(&mut global, &state).await?;
    lock.release().await?;

    println!(
        "{} user '{}' を取り込みました (id {}, login {})",
        "✓".green(),
        name.cyan(),
        imported.id,
        imported.attribute_str("username")
    );
    Ok(())
}
