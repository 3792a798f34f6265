//! In-memory stand-in for the users API, used by unit tests

use crate::api::{CreateResponse, DeleteResponse, ReadResponse, UserApi};
use crate::config::ConnectionContext;
use crate::error::Result;
use crate::model::{RemoteUserRecord, UserIdentity, UserSpec};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

pub fn jdoe() -> UserSpec {
    UserSpec {
        username: "jdoe".to_string(),
        email: "j@x.com".to_string(),
        firstname: "J".to_string(),
        lastname: "Doe".to_string(),
        password: "pw".to_string(),
    }
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    users: BTreeMap<String, RemoteUserRecord>,
    calls: usize,
    create_failure: Option<(u16, String)>,
    read_failure: Option<(u16, String)>,
    delete_failure: Option<(u16, String)>,
}

/// Behaves like OpenProject: sequential numeric ids, 404 for unknown ids
#[derive(Default)]
pub struct FakeUserApi {
    inner: Mutex<Inner>,
}

impl FakeUserApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.inner.lock().unwrap().calls
    }

    pub fn user_count(&self) -> usize {
        self.inner.lock().unwrap().users.len()
    }

    pub fn fail_next_create(&self, status: u16, message: &str) {
        self.inner.lock().unwrap().create_failure = Some((status, message.to_string()));
    }

    pub fn fail_next_read(&self, status: u16, body: &str) {
        self.inner.lock().unwrap().read_failure = Some((status, body.to_string()));
    }

    pub fn fail_next_delete(&self, status: u16, message: &str) {
        self.inner.lock().unwrap().delete_failure = Some((status, message.to_string()));
    }

    /// Delete a user behind the reconciler's back
    pub fn remove_out_of_band(&self, id: &UserIdentity) {
        self.inner.lock().unwrap().users.remove(id.as_str());
    }

    /// Edit a user behind the reconciler's back
    pub fn edit_out_of_band(&self, id: &UserIdentity, edit: impl FnOnce(&mut RemoteUserRecord)) {
        if let Some(record) = self.inner.lock().unwrap().users.get_mut(id.as_str()) {
            edit(record);
        }
    }

    /// Seed a user that opflow did not create
    pub fn insert(&self, spec: &UserSpec) -> UserIdentity {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = UserIdentity::new(inner.next_id.to_string());
        inner
            .users
            .insert(id.to_string(), RemoteUserRecord::from_spec(id.clone(), spec));
        id
    }
}

#[async_trait]
impl UserApi for FakeUserApi {
    async fn create_user(
        &self,
        _ctx: &ConnectionContext,
        spec: &UserSpec,
    ) -> Result<CreateResponse> {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.calls += 1;
            if let Some((status, message)) = inner.create_failure.take() {
                return Ok(CreateResponse::Failed { status, message });
            }
        }
        let id = self.insert(spec);
        Ok(CreateResponse::Created { id })
    }

    async fn get_user(&self, _ctx: &ConnectionContext, id: &UserIdentity) -> Result<ReadResponse> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls += 1;
        if let Some((status, body)) = inner.read_failure.take() {
            return Ok(ReadResponse::Failed { status, body });
        }
        Ok(match inner.users.get(id.as_str()) {
            Some(record) => ReadResponse::Found {
                record: record.clone(),
            },
            None => ReadResponse::Absent,
        })
    }

    async fn delete_user(
        &self,
        _ctx: &ConnectionContext,
        id: &UserIdentity,
    ) -> Result<DeleteResponse> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls += 1;
        if let Some((status, message)) = inner.delete_failure.take() {
            return Ok(DeleteResponse::Failed { status, message });
        }
        Ok(match inner.users.remove(id.as_str()) {
            Some(_) => DeleteResponse::Deleted,
            None => DeleteResponse::Failed {
                status: 404,
                message: "The requested resource could not be found.".to_string(),
            },
        })
    }
}
