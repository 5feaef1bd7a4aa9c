use reqwest::RequestBuilder;
use std::fmt;

/// Administrator identity for the remote account.
///
/// Built once at startup and shared read-only by every request; the password
/// never appears in `Debug` output or logs.
#[derive(Clone)]
pub struct AdminCredentials {
    login: String,
    password: String,
}

impl AdminCredentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    /// Attach HTTP basic auth for the administrator to an outbound request
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.login, Some(&self.password))
    }
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}
