//! OpenProject users API client
//!
//! Direct REST implementation against `/api/v3/users`, authenticated with
//! the `apikey` Basic scheme. One HTTP call per operation, no retries.

use crate::api::{CreateResponse, DeleteResponse, ReadResponse, UserApi};
use crate::config::ConnectionContext;
use crate::error::{OpenProjectError, Result};
use crate::model::{RemoteUserRecord, UserIdentity, UserSpec};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};

/// Fixed attributes of every user created through opflow
const DEFAULT_ADMIN: bool = false;
const DEFAULT_STATUS: &str = "active";
const DEFAULT_LANGUAGE: &str = "en";

/// HTTP client for the OpenProject users API
#[derive(Debug, Clone, Default)]
pub struct OpenProjectClient {
    client: reqwest::Client,
}

impl OpenProjectClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse an existing reqwest client (connection pool, proxies, TLS roots)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn request(
        &self,
        ctx: &ConnectionContext,
        method: Method,
        url: &str,
    ) -> reqwest::RequestBuilder {
        tracing::debug!("{} {}", method, url);

        let mut builder = self
            .client
            .request(method, url)
            .header(AUTHORIZATION, ctx.authorization())
            .header(CONTENT_TYPE, "application/json");
        if let Some(timeout) = ctx.timeout() {
            builder = builder.timeout(timeout);
        }
        builder
    }
}

#[async_trait]
impl UserApi for OpenProjectClient {
    async fn create_user(
        &self,
        ctx: &ConnectionContext,
        spec: &UserSpec,
    ) -> Result<CreateResponse> {
        let body = CreateUserRequest {
            login: &spec.username,
            password: &spec.password,
            first_name: &spec.firstname,
            last_name: &spec.lastname,
            email: &spec.email,
            admin: DEFAULT_ADMIN,
            status: DEFAULT_STATUS,
            language: DEFAULT_LANGUAGE,
        };

        let response = self
            .request(ctx, Method::POST, &ctx.users_url())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;

        if status != StatusCode::CREATED {
            return Ok(CreateResponse::Failed {
                status: status.as_u16(),
                message: error_message(&bytes),
            });
        }

        let created: CreatedUser = decode(status, &bytes)?;
        match created.id {
            Some(id) => Ok(CreateResponse::Created { id }),
            None => Err(OpenProjectError::MissingIdentity {
                status: status.as_u16(),
            }),
        }
    }

    async fn get_user(&self, ctx: &ConnectionContext, id: &UserIdentity) -> Result<ReadResponse> {
        let response = self
            .request(ctx, Method::GET, &ctx.user_url(id.as_str()))
            .send()
            .await?;

        let status = response.status();
        match status {
            StatusCode::NOT_FOUND => Ok(ReadResponse::Absent),
            StatusCode::OK => {
                let bytes = response.bytes().await?;
                let record: RemoteUserRecord = decode(status, &bytes)?;
                Ok(ReadResponse::Found { record })
            }
            _ => Ok(ReadResponse::Failed {
                status: status.as_u16(),
                body: response.text().await?,
            }),
        }
    }

    async fn delete_user(
        &self,
        ctx: &ConnectionContext,
        id: &UserIdentity,
    ) -> Result<DeleteResponse> {
        let response = self
            .request(ctx, Method::DELETE, &ctx.user_url(id.as_str()))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT || status == StatusCode::ACCEPTED {
            return Ok(DeleteResponse::Deleted);
        }

        let bytes = response.bytes().await?;
        Ok(DeleteResponse::Failed {
            status: status.as_u16(),
            message: error_message(&bytes),
        })
    }
}

fn decode<T: serde::de::DeserializeOwned>(status: StatusCode, bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|source| OpenProjectError::Decode {
        status: status.as_u16(),
        source,
    })
}

/// Best-effort `message` from an error body; empty when there is none
fn error_message(bytes: &[u8]) -> String {
    serde_json::from_slice::<ApiErrorBody>(bytes)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_default()
}

// ============ API Types ============

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateUserRequest<'a> {
    login: &'a str,
    password: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
    admin: bool,
    status: &'a str,
    language: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatedUser {
    #[serde(default)]
    id: Option<UserIdentity>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_body_shape() {
        let body = CreateUserRequest {
            login: "jdoe",
            password: "pw",
            first_name: "J",
            last_name: "Doe",
            email: "j@x.com",
            admin: DEFAULT_ADMIN,
            status: DEFAULT_STATUS,
            language: DEFAULT_LANGUAGE,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "login": "jdoe",
                "password": "pw",
                "firstName": "J",
                "lastName": "Doe",
                "email": "j@x.com",
                "admin": false,
                "status": "active",
                "language": "en"
            })
        );
    }

    #[test]
    fn test_error_message_is_best_effort() {
        assert_eq!(
            error_message(br#"{"_type":"Error","message":"The requested resource could not be found."}"#),
            "The requested resource could not be found."
        );
        assert_eq!(error_message(b"<html>bad gateway</html>"), "");
        assert_eq!(error_message(b""), "");
    }

    #[test]
    fn test_decode_keeps_status() {
        let err = decode::<RemoteUserRecord>(StatusCode::OK, b"not json").unwrap_err();
        assert!(matches!(err, OpenProjectError::Decode { status: 200, .. }));
    }
}
