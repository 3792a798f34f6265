//! プロジェクトファイルのデータモデル

use crate::error::{ConfigError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// app_url を上書きする環境変数
pub const APP_URL_ENV: &str = "OPENPROJECT_APP_URL";
/// apikey を上書きする環境変数
pub const APIKEY_ENV: &str = "OPENPROJECT_APIKEY";

/// デフォルトのリクエストタイムアウト（秒）
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// パース済みのプロジェクト
#[derive(Debug, Clone, Default)]
pub struct Project {
    /// 読み込んだファイルのパス
    pub path: PathBuf,
    pub provider: ProviderSettings,
    /// user 名 → user 定義
    pub users: BTreeMap<String, UserBlock>,
}

impl Project {
    /// ステートを置くディレクトリ（プロジェクトファイルと同じ場所）
    pub fn root_dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// provider "openproject" { ... } ブロック
#[derive(Clone, Default)]
pub struct ProviderSettings {
    pub app_url: Option<String>,
    pub apikey: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("app_url", &self.app_url)
            .field("apikey", &self.apikey.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ProviderSettings {
    /// 環境変数を適用して接続設定を確定する
    ///
    /// OPENPROJECT_APP_URL / OPENPROJECT_APIKEY はファイルの値より優先される。
    pub fn resolve(&self) -> Result<ResolvedProvider> {
        let app_url = env_override(APP_URL_ENV)
            .or_else(|| self.app_url.clone())
            .ok_or(ConfigError::MissingProviderSetting("app_url", APP_URL_ENV))?;
        let apikey = env_override(APIKEY_ENV)
            .or_else(|| self.apikey.clone())
            .ok_or(ConfigError::MissingProviderSetting("apikey", APIKEY_ENV))?;

        Ok(ResolvedProvider {
            app_url,
            apikey,
            timeout: Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        })
    }
}

fn env_override(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 環境変数適用後の接続設定
#[derive(Clone)]
pub struct ResolvedProvider {
    pub app_url: String,
    pub apikey: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for ResolvedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedProvider")
            .field("app_url", &self.app_url)
            .field("apikey", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// user "name" { ... } ブロック
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct UserBlock {
    pub username: String,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub password: String,
}

impl std::fmt::Debug for UserBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserBlock")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("firstname", &self.firstname)
            .field("lastname", &self.lastname)
            .field("password", &"<redacted>")
            .finish()
    }
}
