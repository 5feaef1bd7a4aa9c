use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Random bytes behind every generated namespace name (hex-encoded to 20 chars)
const NAME_ENTROPY_BYTES: usize = 10;
const NAME_PREFIX: &str = "db";
/// Longest database name the remote account accepts
const MAX_NAME_LEN: usize = 238;

/// Name of a per-user database on the remote account.
///
/// Either freshly generated (`db` + 20 lowercase hex chars) or a caller-supplied
/// name that passed [`DbName::parse`], so it can always be used as a single
/// URL path segment.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct DbName(String);

impl DbName {
    /// Fresh candidate name; uniqueness is decided by the remote create call
    pub fn generate() -> Self {
        let mut bytes = [0u8; NAME_ENTROPY_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(format!("{}{}", NAME_PREFIX, hex::encode(bytes)))
    }

    /// Validate a caller-supplied name against the remote naming rule
    /// (`^[a-z][a-z0-9_$()+-]*$`). Returns `None` for anything else.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut chars = raw.chars();
        let first = chars.next()?;
        if !first.is_ascii_lowercase() || raw.len() > MAX_NAME_LEN {
            return None;
        }
        let valid = chars.all(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '$' | '(' | ')' | '+' | '-')
        });
        valid.then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DbName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role granted to an issued key on its namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Reader,
    Writer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Reader => "_reader",
            Role::Writer => "_writer",
        }
    }
}

/// Roles every issued key receives
pub const ISSUED_ROLES: [Role; 2] = [Role::Reader, Role::Writer];

/// Key/password pair minted by the remote control plane
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ApiKey {
    pub key: String,
    pub password: String,
}

/// Credential handed to the caller, tagged with the account it belongs to
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IssuedCredential {
    pub key: String,
    pub password: String,
    pub login: String,
}

/// Reply body for `GET /`
#[derive(Serialize, Debug, Clone)]
pub struct NamespaceCreated {
    pub db_name: DbName,
    #[serde(flatten)]
    pub credential: IssuedCredential,
}

/// Body of `PUT /get_key` (JSON or urlencoded form)
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FetchKeyRequest {
    pub db: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthResponse {
    pub status: String,
    pub login: String,
}
