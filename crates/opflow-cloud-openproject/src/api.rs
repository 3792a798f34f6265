//! Per-endpoint outcomes of the users API and the trait the reconciler drives
//!
//! Protocol outcomes (any HTTP status) are values; only transport and decode
//! failures are errors at this layer.

use crate::config::ConnectionContext;
use crate::error::Result;
use crate::model::{RemoteUserRecord, UserIdentity, UserSpec};
use async_trait::async_trait;

/// Outcome of `POST /api/v3/users`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateResponse {
    /// 201 with the identity taken from the body
    Created { id: UserIdentity },
    Failed { status: u16, message: String },
}

/// Outcome of `GET /api/v3/users/{id}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadResponse {
    Found { record: RemoteUserRecord },
    /// 404. The user does not exist (any more).
    Absent,
    /// Any other status, with the raw body text
    Failed { status: u16, body: String },
}

/// Outcome of `DELETE /api/v3/users/{id}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteResponse {
    /// 204 or 202
    Deleted,
    Failed { status: u16, message: String },
}

/// One HTTP call per lifecycle intent
#[async_trait]
pub trait UserApi: Send + Sync {
    async fn create_user(&self, ctx: &ConnectionContext, spec: &UserSpec)
    -> Result<CreateResponse>;

    async fn get_user(&self, ctx: &ConnectionContext, id: &UserIdentity) -> Result<ReadResponse>;

    async fn delete_user(&self, ctx: &ConnectionContext, id: &UserIdentity)
    -> Result<DeleteResponse>;
}

#[async_trait]
impl<T: UserApi + ?Sized> UserApi for std::sync::Arc<T> {
    async fn create_user(
        &self,
        ctx: &ConnectionContext,
        spec: &UserSpec,
    ) -> Result<CreateResponse> {
        (**self).create_user(ctx, spec).await
    }

    async fn get_user(&self, ctx: &ConnectionContext, id: &UserIdentity) -> Result<ReadResponse> {
        (**self).get_user(ctx, id).await
    }

    async fn delete_user(
        &self,
        ctx: &ConnectionContext,
        id: &UserIdentity,
    ) -> Result<DeleteResponse> {
        (**self).delete_user(ctx, id).await
    }
}
