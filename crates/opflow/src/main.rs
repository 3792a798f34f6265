mod commands;
mod workspace;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "opflow")]
#[command(about = "OpenProject のユーザーを KDL で宣言的に管理する", long_about = None)]
struct Cli {
    /// 詳細ログを表示
    #[arg(short, long, global = true)]
    verbose: bool,

    /// プロジェクトファイルのパス（省略時は自動検索）
    #[arg(short, long, global = true, env = "OPFLOW_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 実行計画を表示（変更は行わない）
    Plan,
    /// 実行計画を適用
    Apply {
        /// 確認なしで実行
        #[arg(short, long)]
        yes: bool,
    },
    /// リモートの状態をステートに反映
    Refresh,
    /// 既存ユーザーを管理下に取り込む
    Import {
        /// user 名（プロジェクトファイルのブロック名）
        name: String,
        /// OpenProject のユーザーID
        id: String,
    },
    /// 管理中のユーザーを削除
    Destroy {
        /// user 名（省略時は全ユーザー）
        name: Option<String>,
        /// 確認なしで実行
        #[arg(short, long)]
        yes: bool,
    },
    /// ステートの内容を表示
    Show,
    /// プロジェクトファイルを検証
    Validate,
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("opflow {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Plan => commands::plan::handle(config).await,
        Commands::Apply { yes } => commands::apply::handle(config, yes).await,
        Commands::Refresh => commands::refresh::handle(config).await,
        Commands::Import { name, id } => commands::import::handle(config, &name, &id).await,
        Commands::Destroy { name, yes } => {
            commands::destroy::handle(config, name.as_deref(), yes).await
        }
        Commands::Show => commands::show::handle(config).await,
        Commands::Validate => commands::validate::handle(config),
        Commands::Version => Ok(()),
    }
}
