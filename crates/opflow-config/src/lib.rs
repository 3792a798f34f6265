//! opflow のプロジェクトファイル
//!
//! KDL で書かれたプロジェクトファイルを探索・パースし、
//! provider 設定と user 定義を取り出す。

pub mod error;
pub mod model;
pub mod parser;

pub use error::*;
pub use model::{
    APIKEY_ENV, APP_URL_ENV, DEFAULT_TIMEOUT_SECS, Project, ProviderSettings, ResolvedProvider,
    UserBlock,
};
pub use parser::{OPENPROJECT_PROVIDER, load_project, parse_project};

use std::path::PathBuf;

/// 設定ファイルのパスを直接指定する環境変数
pub const CONFIG_PATH_ENV: &str = "OPFLOW_CONFIG_PATH";

/// プロジェクトファイルを探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 環境変数 OPFLOW_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: opflow.local.kdl, .opflow.local.kdl, opflow.kdl, .opflow.kdl
/// 3. ./.opflow/ ディレクトリ内: 同様の順序
/// 4. ~/.config/opflow/opflow.kdl (グローバル設定)
pub fn find_config_file() -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!("{} points to a missing file: {}", CONFIG_PATH_ENV, path.display());
    }

    let current_dir = std::env::current_dir()?;
    let candidates = [
        "opflow.local.kdl",
        ".opflow.local.kdl",
        "opflow.kdl",
        ".opflow.kdl",
    ];

    // 2. カレントディレクトリで検索
    for filename in &candidates {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    // 3. ./.opflow/ ディレクトリで検索
    let project_dir = current_dir.join(".opflow");
    if project_dir.is_dir() {
        for filename in &candidates {
            let path = project_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    // 4. グローバル設定ファイル (~/.config/opflow/opflow.kdl)
    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("opflow").join("opflow.kdl");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    // どの設定ファイルも見つからなかった
    Err(ConfigError::ConfigFileNotFound)
}
