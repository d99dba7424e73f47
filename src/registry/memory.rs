//! In-memory registry double for sweep tests.
//!
//! Records every call in order and fails `update`/`delete` for the SIDs it
//! was told to fail.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;

use super::{Account, Record, RegistryClient, RemoteError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Account,
    List,
    Update { sid: String, attributes: String },
    Delete { sid: String },
}

#[derive(Default)]
pub struct MemoryRegistry {
    records: Vec<Record>,
    update_failures: HashMap<String, RemoteError>,
    delete_failures: HashMap<String, RemoteError>,
    calls: Mutex<Vec<Call>>,
}

impl MemoryRegistry {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            ..Default::default()
        }
    }

    pub fn fail_update(mut self, sid: &str, error: RemoteError) -> Self {
        self.update_failures.insert(sid.to_string(), error);
        self
    }

    pub fn fail_delete(mut self, sid: &str, error: RemoteError) -> Self {
        self.delete_failures.insert(sid.to_string(), error);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().clone()
    }

    pub fn updated_sids(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|c| match c {
                Call::Update { sid, .. } => Some(sid.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn deleted_sids(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|c| match c {
                Call::Delete { sid } => Some(sid.clone()),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Call>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl RegistryClient for MemoryRegistry {
    async fn account(&self) -> Result<Account, RemoteError> {
        self.lock().push(Call::Account);
        Ok(Account {
            sid: "AC_TEST".to_string(),
            friendly_name: "Test Account".to_string(),
        })
    }

    async fn list_all(&self) -> Result<Vec<Record>, RemoteError> {
        self.lock().push(Call::List);
        Ok(self.records.clone())
    }

    async fn update(&self, sid: &str, attributes: &str) -> Result<(), RemoteError> {
        self.lock().push(Call::Update {
            sid: sid.to_string(),
            attributes: attributes.to_string(),
        });
        match self.update_failures.get(sid) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    async fn delete(&self, sid: &str) -> Result<(), RemoteError> {
        self.lock().push(Call::Delete {
            sid: sid.to_string(),
        });
        match self.delete_failures.get(sid) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}
