//! KDL プロジェクトファイルのパース

use crate::error::{ConfigError, Result};
use crate::model::{Project, ProviderSettings, UserBlock};
use kdl::{KdlDocument, KdlNode};
use std::path::Path;

/// サポートしているプロバイダー名
pub const OPENPROJECT_PROVIDER: &str = "openproject";

/// ファイルを読み込んでパース
pub fn load_project(path: &Path) -> Result<Project> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!("Loading project file: {}", path.display());

    let mut project = parse_project(&content)?;
    project.path = path.to_path_buf();
    Ok(project)
}

/// KDL 文字列をパース
pub fn parse_project(content: &str) -> Result<Project> {
    let doc: KdlDocument = content.parse()?;
    let mut project = Project::default();
    let mut provider_seen = false;

    for node in doc.nodes() {
        match node.name().value() {
            "provider" => {
                if provider_seen {
                    return Err(ConfigError::InvalidConfig(
                        "provider は1つだけ指定できます".to_string(),
                    ));
                }
                project.provider = parse_provider(node)?;
                provider_seen = true;
            }
            "user" => {
                let (name, user) = parse_user(node)?;
                if project.users.insert(name.clone(), user).is_some() {
                    return Err(ConfigError::DuplicateUser(name));
                }
            }
            other => {
                tracing::warn!("Unknown node ignored: {}", other);
            }
        }
    }

    Ok(project)
}

/// provider ノードをパース
fn parse_provider(node: &KdlNode) -> Result<ProviderSettings> {
    let name = first_string(node)
        .ok_or_else(|| ConfigError::InvalidConfig("provider requires a name".to_string()))?;
    if name != OPENPROJECT_PROVIDER {
        return Err(ConfigError::InvalidConfig(format!(
            "未対応のプロバイダーです: {}",
            name
        )));
    }

    let mut provider = ProviderSettings::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "app_url" | "app-url" => {
                    provider.app_url = first_string(child).map(|s| s.to_string());
                }
                "apikey" => {
                    provider.apikey = first_string(child).map(|s| s.to_string());
                }
                "timeout" => {
                    let secs = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_integer())
                        .filter(|v| *v > 0)
                        .ok_or_else(|| {
                            ConfigError::InvalidConfig(
                                "timeout には正の整数（秒）を指定してください".to_string(),
                            )
                        })?;
                    provider.timeout_secs = Some(secs as u64);
                }
                other => {
                    tracing::warn!("Unknown provider setting ignored: {}", other);
                }
            }
        }
    }

    Ok(provider)
}

/// user ノードをパース
fn parse_user(node: &KdlNode) -> Result<(String, UserBlock)> {
    let name = first_string(node)
        .ok_or_else(|| ConfigError::InvalidConfig("user requires a name".to_string()))?
        .to_string();

    let mut username = None;
    let mut email = None;
    let mut firstname = None;
    let mut lastname = None;
    let mut password = None;

    if let Some(children) = node.children() {
        for child in children.nodes() {
            let slot = match child.name().value() {
                "username" => &mut username,
                "email" => &mut email,
                "firstname" => &mut firstname,
                "lastname" => &mut lastname,
                "password" => &mut password,
                other => {
                    tracing::warn!("Unknown attribute ignored in user '{}': {}", name, other);
                    continue;
                }
            };
            *slot = attribute_value(child)?;
        }
    }

    let require = |value: Option<String>, attribute: &'static str| {
        value
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingAttribute {
                user: name.clone(),
                attribute,
            })
    };

    let user = UserBlock {
        username: require(username, "username")?,
        email: require(email, "email")?,
        firstname: require(firstname, "firstname")?,
        lastname: require(lastname, "lastname")?,
        password: require(password, "password")?,
    };

    Ok((name, user))
}

/// 属性値を取得
///
/// `password "secret"` の直接指定と `password env="VAR"` の環境変数参照に対応する。
fn attribute_value(node: &KdlNode) -> Result<Option<String>> {
    for entry in node.entries() {
        match entry.name().map(|n| n.value()) {
            None => return Ok(entry.value().as_string().map(|s| s.to_string())),
            Some("env") => {
                let var = entry.value().as_string().ok_or_else(|| {
                    ConfigError::InvalidConfig("env には環境変数名を指定してください".to_string())
                })?;
                let value = std::env::var(var)
                    .map_err(|_| ConfigError::MissingEnvVar(var.to_string()))?;
                return Ok(Some(value));
            }
            Some(_) => {}
        }
    }
    Ok(None)
}

fn first_string(node: &KdlNode) -> Option<&str> {
    node.entries().first().and_then(|e| e.value().as_string())
}
