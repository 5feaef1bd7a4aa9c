//! Seam between the provisioning flows and the remote account.
//!
//! `CloudantClient` is the production implementation; tests plug in an
//! in-memory account to count and script calls.

use async_trait::async_trait;

use crate::error::RemoteResult;
use crate::models::{ApiKey, DbName, Role};

/// Result of asking the remote account to create a database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// Name taken or otherwise refused; carries the remote status
    Refused(u16),
}

/// Calls the provisioning flows make against the remote account, all
/// authenticated as the administrator.
#[async_trait]
pub trait RemoteAccount: Send + Sync {
    /// Administrator login, used to scope grants as `login/db`
    fn login(&self) -> &str;

    async fn create_database(&self, name: &DbName) -> RemoteResult<CreateOutcome>;

    /// `true` when the database exists and is readable by the administrator
    async fn database_exists(&self, name: &DbName) -> RemoteResult<bool>;

    async fn generate_api_key(&self) -> RemoteResult<ApiKey>;

    /// Grant `roles` on `database` (`login/db`) to `key`. Errors when the
    /// remote does not confirm the grant.
    async fn set_permissions(&self, database: &str, key: &str, roles: &[Role]) -> RemoteResult<()>;
}
