use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "設定ファイルが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: opflow.local.kdl, .opflow.local.kdl, opflow.kdl, .opflow.kdl\n\
        - ./.opflow/ ディレクトリ\n\
        - ~/.config/opflow/opflow.kdl\n\
        または OPFLOW_CONFIG_PATH 環境変数で直接指定できます"
    )]
    ConfigFileNotFound,

    #[error("KDLパースエラー: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("ファイル読み込みエラー: {path}\n理由: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("user '{user}' に {attribute} が指定されていません")]
    MissingAttribute { user: String, attribute: &'static str },

    #[error("user '{0}' が重複しています")]
    DuplicateUser(String),

    #[error("provider に {0} が指定されていません (環境変数 {1} でも指定できます)")]
    MissingProviderSetting(&'static str, &'static str),

    #[error("環境変数 {0} が設定されていません")]
    MissingEnvVar(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
