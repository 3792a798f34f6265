//! OpenProject provider for opflow
//!
//! Manages OpenProject users through the REST API v3. The crate has two
//! layers:
//!
//! - [`client`]: one authenticated HTTP call per lifecycle intent, mapped to
//!   per-endpoint outcomes ([`CreateResponse`], [`ReadResponse`],
//!   [`DeleteResponse`]).
//! - [`resource`]: the lifecycle reconciler ([`UserResource`]) with the four
//!   entry points create, read, delete and import.
//!
//! [`provider`] plugs the reconciler into the host's plan/apply loop.
//!
//! # Example
//!
//! ```ignore
//! use opflow_cloud_openproject::{ConnectionContext, OpenProjectClient, UserResource, UserSpec};
//!
//! let ctx = ConnectionContext::new("https://op.example.com", api_key)?;
//! let users = UserResource::new(OpenProjectClient::new());
//!
//! let created = users.create(&ctx, &spec).await?;
//! match users.read(&ctx, &created.identity).await? {
//!     ReadOutcome::Found(record) => println!("{} is live", record.login),
//!     ReadOutcome::Absent => println!("deleted outside opflow"),
//! }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod resource;

#[cfg(test)]
mod testing;

pub use api::{CreateResponse, DeleteResponse, ReadResponse, UserApi};
pub use client::OpenProjectClient;
pub use config::ConnectionContext;
pub use error::{ImportError, OpenProjectError, Result};
pub use model::{RemoteUserRecord, UserIdentity, UserSpec};
pub use provider::{OpenProjectProvider, PROVIDER_NAME, USER_RESOURCE};
pub use resource::{Created, ReadOutcome, UserResource};
