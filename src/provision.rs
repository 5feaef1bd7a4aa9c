//! Provisioning flows: create a namespace, re-issue a key for an existing one,
//! and the shared key-issuing step both end in.

use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{ProvisionError, ProvisionResult};
use crate::models::{DbName, IssuedCredential, NamespaceCreated, ISSUED_ROLES};
use crate::remote::{CreateOutcome, RemoteAccount};

/// Outcome of a key request for a caller-named namespace
#[derive(Debug)]
pub enum FetchOutcome {
    Issued(IssuedCredential),
    /// Name is malformed or the remote does not report it readable
    UnknownNamespace,
}

pub struct Provisioner {
    remote: Arc<dyn RemoteAccount>,
    max_create_attempts: u32,
}

impl Provisioner {
    pub fn new(remote: Arc<dyn RemoteAccount>, max_create_attempts: u32) -> Self {
        Self {
            remote,
            max_create_attempts: max_create_attempts.max(1),
        }
    }

    pub fn login(&self) -> &str {
        self.remote.login()
    }

    /// Create a database under a fresh random name and issue a key for it.
    ///
    /// Refused names (taken, or any other non-success status) are retried with
    /// a new name up to `max_create_attempts` times.
    pub async fn create_namespace(&self) -> ProvisionResult<NamespaceCreated> {
        let db_name = self.create_unique_database().await?;
        let credential = self.issue_credential(&db_name).await?;
        info!(db = %db_name, key = %credential.key, "namespace provisioned");
        Ok(NamespaceCreated { db_name, credential })
    }

    async fn create_unique_database(&self) -> ProvisionResult<DbName> {
        for attempt in 1..=self.max_create_attempts {
            let candidate = DbName::generate();
            match self.remote.create_database(&candidate).await? {
                CreateOutcome::Created => return Ok(candidate),
                CreateOutcome::Refused(status) => {
                    warn!(db = %candidate, status, attempt, "database name refused, retrying");
                }
            }
        }
        Err(ProvisionError::NamesExhausted {
            attempts: self.max_create_attempts,
        })
    }

    /// Issue a fresh key for an existing namespace. Each call mints a new key.
    pub async fn fetch_key(&self, raw_name: &str) -> ProvisionResult<FetchOutcome> {
        let Some(db_name) = DbName::parse(raw_name) else {
            warn!(db = raw_name, "rejected malformed database name");
            return Ok(FetchOutcome::UnknownNamespace);
        };
        if !self.remote.database_exists(&db_name).await? {
            warn!(db = %db_name, "key requested for unreadable database");
            return Ok(FetchOutcome::UnknownNamespace);
        }
        let credential = self.issue_credential(&db_name).await?;
        info!(db = %db_name, key = %credential.key, "key issued for existing namespace");
        Ok(FetchOutcome::Issued(credential))
    }

    /// Generate a key and grant it reader+writer on `login/db_name`.
    async fn issue_credential(&self, db_name: &DbName) -> ProvisionResult<IssuedCredential> {
        let api_key = self.remote.generate_api_key().await?;
        let database = format!("{}/{}", self.login(), db_name);

        self.remote
            .set_permissions(&database, &api_key.key, &ISSUED_ROLES)
            .await
            .map_err(|e| ProvisionError::PermissionGrant {
                database: database.clone(),
                reason: e.to_string(),
            })?;

        Ok(IssuedCredential {
            key: api_key.key,
            password: api_key.password,
            login: self.login().to_string(),
        })
    }
}
