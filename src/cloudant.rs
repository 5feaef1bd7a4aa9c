//! Cloudant implementation of [`RemoteAccount`].
//!
//! Two origins are involved:
//! - the account origin (`https://<login>.cloudant.com`): `PUT /<db>`, `GET /<db>`
//! - the control plane (`https://cloudant.com/api`): `POST /generate_api_key`,
//!   `POST /set_permissions`
//!
//! Every call carries basic auth for the administrator.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::RemoteConfig;
use crate::error::{RemoteError, RemoteResult};
use crate::models::{ApiKey, DbName, Role};
use crate::remote::{CreateOutcome, RemoteAccount};

/// Reply of `generate_api_key`; Cloudant adds `"ok": true` alongside the pair
#[derive(Deserialize)]
struct GeneratedKey {
    key: Option<String>,
    password: Option<String>,
}

/// Reply of `set_permissions`
#[derive(Deserialize)]
struct PermissionsReply {
    #[serde(default)]
    ok: Option<bool>,
    #[serde(default)]
    error: Option<String>,
}

pub struct CloudantClient {
    client: Client,
    config: RemoteConfig,
}

impl CloudantClient {
    pub fn new(config: RemoteConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("db-keyserver/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    fn database_url(&self, name: &DbName) -> String {
        format!("{}/{}", self.config.account_url, name)
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.config.api_url, endpoint)
    }

    fn expect_success(operation: &'static str, response: Response) -> RemoteResult<Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            warn!(operation, status = status.as_u16(), "remote call refused");
            Err(RemoteError::Status {
                operation,
                status: status.as_u16(),
            })
        }
    }

    async fn decode<T: DeserializeOwned>(operation: &'static str, response: Response) -> RemoteResult<T> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| RemoteError::Decode {
            operation,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl RemoteAccount for CloudantClient {
    fn login(&self) -> &str {
        self.config.admin.login()
    }

    async fn create_database(&self, name: &DbName) -> RemoteResult<CreateOutcome> {
        let url = self.database_url(name);
        debug!(db = %name, "PUT database");
        let response = self.config.admin.apply(self.client.put(&url)).send().await?;
        let outcome = match response.status() {
            StatusCode::CREATED | StatusCode::ACCEPTED => CreateOutcome::Created,
            other => CreateOutcome::Refused(other.as_u16()),
        };
        Ok(outcome)
    }

    async fn database_exists(&self, name: &DbName) -> RemoteResult<bool> {
        let url = self.database_url(name);
        debug!(db = %name, "GET database");
        let response = self.config.admin.apply(self.client.get(&url)).send().await?;
        Ok(response.status().is_success())
    }

    async fn generate_api_key(&self) -> RemoteResult<ApiKey> {
        const OP: &str = "generate_api_key";
        let response = self
            .config
            .admin
            .apply(self.client.post(self.api_url(OP)))
            .send()
            .await?;
        let response = Self::expect_success(OP, response)?;
        let generated: GeneratedKey = Self::decode(OP, response).await?;
        match (generated.key, generated.password) {
            (Some(key), Some(password)) => Ok(ApiKey { key, password }),
            _ => Err(RemoteError::Decode {
                operation: OP,
                message: "reply lacks key or password".to_string(),
            }),
        }
    }

    async fn set_permissions(&self, database: &str, key: &str, roles: &[Role]) -> RemoteResult<()> {
        const OP: &str = "set_permissions";
        let mut form: Vec<(&str, &str)> = vec![("database", database), ("username", key)];
        form.extend(roles.iter().map(|role| ("roles", role.as_str())));

        let response = self
            .config
            .admin
            .apply(self.client.post(self.api_url(OP)))
            .form(&form)
            .send()
            .await?;
        let response = Self::expect_success(OP, response)?;
        let reply: PermissionsReply = Self::decode(OP, response).await?;
        if reply.ok == Some(false) || reply.error.is_some() {
            return Err(RemoteError::Decode {
                operation: OP,
                message: reply.error.unwrap_or_else(|| "grant not confirmed".to_string()),
            });
        }
        Ok(())
    }
}
