//! User resource model

use crate::error::{OpenProjectError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};

/// Identifier assigned by OpenProject to a user
///
/// Only ever built from a response body or from an explicit import id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct UserIdentity(String);

impl UserIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// OpenProject sends numeric ids; accept strings as well
impl<'de> Deserialize<'de> for UserIdentity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Number(n) => Ok(Self(n.to_string())),
            serde_json::Value::String(s) if !s.is_empty() => Ok(Self(s)),
            other => Err(serde::de::Error::custom(format!(
                "expected a non-empty user id, got {}",
                other
            ))),
        }
    }
}

/// Desired state of a user. Every field is creation-only.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct UserSpec {
    pub username: String,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub password: String,
}

impl UserSpec {
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("username", &self.username),
            ("email", &self.email),
            ("firstname", &self.firstname),
            ("lastname", &self.lastname),
            ("password", &self.password),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(OpenProjectError::InvalidSpec(format!(
                    "{} must not be empty",
                    name
                )));
            }
        }
        Ok(())
    }

    /// SHA-256 of the password, hex encoded. The only trace of the password
    /// kept in host state.
    pub fn password_fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.password.as_bytes()))
    }
}

impl std::fmt::Debug for UserSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserSpec")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("firstname", &self.firstname)
            .field("lastname", &self.lastname)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// User as observed on the remote side. The password is never returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteUserRecord {
    pub id: UserIdentity,
    pub login: String,
    pub email: String,
    #[serde(rename = "firstName")]
    pub firstname: String,
    #[serde(rename = "lastName")]
    pub lastname: String,
}

impl RemoteUserRecord {
    /// Snapshot of what a freshly created user looks like
    pub fn from_spec(id: UserIdentity, spec: &UserSpec) -> Self {
        Self {
            id,
            login: spec.username.clone(),
            email: spec.email.clone(),
            firstname: spec.firstname.clone(),
            lastname: spec.lastname.clone(),
        }
    }

    /// Attribute names of the user resource that do not match `spec`
    pub fn diff(&self, spec: &UserSpec) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.login != spec.username {
            changed.push("username");
        }
        if self.email != spec.email {
            changed.push("email");
        }
        if self.firstname != spec.firstname {
            changed.push("firstname");
        }
        if self.lastname != spec.lastname {
            changed.push("lastname");
        }
        changed
    }
}
