//! Lifecycle reconciler for the `user` resource
//!
//! Sequences client calls per entry point (create, read, delete, import) and
//! turns per-endpoint outcomes into the results the host applies to its
//! state. Nothing here persists anything.
//!
//! ```text
//! Unmanaged --create ok--> Managed --delete ok--> Unmanaged
//!                          Managed --read 404---> Unmanaged   (drift)
//! ```
//!
//! Errors never move a resource between states.

use crate::api::{CreateResponse, DeleteResponse, ReadResponse, UserApi};
use crate::config::ConnectionContext;
use crate::error::{ImportError, OpenProjectError, Result};
use crate::model::{RemoteUserRecord, UserIdentity, UserSpec};

/// Successful create: the new identity plus a snapshot of the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    pub identity: UserIdentity,
    pub snapshot: RemoteUserRecord,
}

/// Result of reading a managed user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Found(RemoteUserRecord),
    /// The user no longer exists; the host must forget the identity
    Absent,
}

impl ReadOutcome {
    pub fn into_record(self) -> Option<RemoteUserRecord> {
        match self {
            ReadOutcome::Found(record) => Some(record),
            ReadOutcome::Absent => None,
        }
    }
}

/// Reconciler for OpenProject users
pub struct UserResource<A> {
    api: A,
}

impl<A: UserApi> UserResource<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Create the user. The identity comes only from the 201 body.
    pub async fn create(&self, ctx: &ConnectionContext, spec: &UserSpec) -> Result<Created> {
        spec.validate()?;

        match self.api.create_user(ctx, spec).await? {
            CreateResponse::Created { id } => {
                tracing::info!("Created OpenProject user {} (id {})", spec.username, id);
                Ok(Created {
                    snapshot: RemoteUserRecord::from_spec(id.clone(), spec),
                    identity: id,
                })
            }
            CreateResponse::Failed { status, message } => {
                Err(OpenProjectError::CreateFailed { status, message })
            }
        }
    }

    /// Read the user. A missing user is [`ReadOutcome::Absent`], not an error.
    pub async fn read(&self, ctx: &ConnectionContext, id: &UserIdentity) -> Result<ReadOutcome> {
        match self.api.get_user(ctx, id).await? {
            ReadResponse::Found { record } => Ok(ReadOutcome::Found(record)),
            ReadResponse::Absent => {
                tracing::warn!("OpenProject user {} no longer exists", id);
                Ok(ReadOutcome::Absent)
            }
            ReadResponse::Failed { status, body } => {
                Err(OpenProjectError::ReadFailed { status, body })
            }
        }
    }

    /// Delete the user. A 404 is reported as `DeleteFailed` like any other
    /// non-success status.
    pub async fn delete(&self, ctx: &ConnectionContext, id: &UserIdentity) -> Result<()> {
        match self.api.delete_user(ctx, id).await? {
            DeleteResponse::Deleted => {
                tracing::info!("Deleted OpenProject user {}", id);
                Ok(())
            }
            DeleteResponse::Failed { status, message } => {
                Err(OpenProjectError::DeleteFailed { status, message })
            }
        }
    }

    /// Adopt an existing user by its remote id.
    /// The id is used as a path segment: ASCII letters, digits, `-` and `_` only.
    pub async fn import(&self, ctx: &ConnectionContext, id: &str) -> Result<RemoteUserRecord> {
        let id = id.trim();
        if id.is_empty() {
            return Err(ImportError::MissingIdentifier.into());
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ImportError::InvalidIdentifier(id.to_string()).into());
        }

        let identity = UserIdentity::new(id);
        match self.read(ctx, &identity).await {
            Ok(ReadOutcome::Found(record)) => {
                tracing::info!("Imported OpenProject user {} (id {})", record.login, identity);
                Ok(record)
            }
            Ok(ReadOutcome::Absent) => Err(ImportError::NotFound(id.to_string()).into()),
            Err(e) => Err(ImportError::Read(Box::new(e)).into()),
        }
    }
}
