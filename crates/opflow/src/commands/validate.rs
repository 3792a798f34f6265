use crate::workspace;
use colored::Colorize;
use opflow_cloud_openproject::ConnectionContext;
use opflow_cloud_openproject::provider::user_spec;
use std::path::Path;

pub fn handle(config: Option<&Path>) -> anyhow::Result<()> {
    println!("{}", "設定を検証中...".blue());

    let path = match config {
        Some(path) => path.to_path_buf(),
        None => match opflow_config::find_config_file() {
            Ok(path) => path,
            Err(e) => {
                eprintln!();
                eprintln!("{}", "✗ プロジェクトファイルが見つかりません".red().bold());
                eprintln!("  {}", e);
                std::process::exit(1);
            }
        },
    };
    println!("プロジェクトファイル: {}", path.display().to_string().cyan());

    if let Err(e) = check(&path) {
        eprintln!();
        eprintln!("{}", "✗ 設定エラー".red().bold());
        eprintln!("  {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn check(path: &Path) -> anyhow::Result<()> {
    let project = opflow_config::load_project(path)?;

    let settings = project.provider.resolve()?;
    let ctx = ConnectionContext::new(&settings.app_url, &settings.apikey)?;

    let resources = workspace::resource_set(&project)?;
    for resource in resources.iter() {
        user_spec(resource)?;
    }

    println!("{}", "✓ 設定ファイルは正常です！".green().bold());
    println!();
    println!("サマリー:");
    println!(
        "  プロバイダー: openproject ({}, timeout {}s)",
        ctx.base_url().cyan(),
        settings.timeout.as_secs()
    );
    println!("  ユーザー: {}個", project.users.len());
    for (name, user) in &project.users {
        println!("    - {} ({}, {})", name.cyan(), user.username, user.email);
    }
    Ok(())
}
