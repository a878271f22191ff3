use serde::{Deserialize, Serialize};

use crate::environment::Environment;
use crate::models::upstream::LoginPayload;

/// Where the session's identity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionSource {
    /// Logged in against Element Pay; carries passthrough tokens.
    Upstream,
    /// Logged in against the local mock store.
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// Identity stored in the session under [`crate::constants::SESSION_USER_KEY`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub source: SessionSource,
    pub environment: Environment,
    pub tokens: Option<UpstreamTokens>,
}

impl SessionUser {
    /// Builds the session identity from an upstream login, falling back to
    /// the submitted email when the payload omits user details.
    #[must_use]
    pub fn from_login(login: LoginPayload, email: &str, environment: Environment) -> Self {
        let email = login.user.email.unwrap_or_else(|| email.to_string());
        Self {
            id: login.user.id.unwrap_or_else(|| email.clone()),
            email,
            name: login.user.name,
            source: SessionSource::Upstream,
            environment,
            tokens: Some(UpstreamTokens {
                access_token: login.access_token,
                refresh_token: login.refresh_token,
            }),
        }
    }

    #[must_use]
    pub fn view(&self) -> SessionView {
        SessionView {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            source: self.source,
            environment: self.environment,
        }
    }
}

/// What the frontend sees of a session. Tokens never leave the server.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub source: SessionSource,
    pub environment: Environment,
}
