use crate::workspace::Workspace;
use colored::Colorize;
use std::path::Path;

pub async fn handle(config: Option<&Path>) -> anyhow::Result<()> {
    let ws = Workspace::load(config)?;
    let (global, state) = ws.load_state().await?;

    println!();
    if state.is_empty() {
        println!("管理中のリソースはありません");
        return Ok(());
    }

    println!(
        "{}",
        format!("管理中のリソース ({} 件):", state.len()).bold()
    );
    for (key, resource) in state.iter() {
        let declared = ws.resources.resources.contains_key(key);
        println!(
            "  • {} (id {}, {}){}",
            key.cyan(),
            resource.id,
            resource.status,
            if declared { "" } else { " [未宣言]" }
        );
        println!(
            "      {} <{}> {} {}",
            resource.attribute_str("username"),
            resource.attribute_str("email"),
            resource.attribute_str("firstname"),
            resource.attribute_str("lastname")
        );
    }
    println!();
    println!("最終更新: {}", global.updated_at.to_rfc3339());
    Ok(())
}
