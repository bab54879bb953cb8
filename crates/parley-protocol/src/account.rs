//! JSON bodies of the HTTP account endpoints (`POST /login`,
//! `POST /register`).
//!
//! These requests run before any persistent connection exists and are
//! served by an external account service. The client core only needs the
//! shapes so that an `AccountService` implementation (see
//! `parley-session`) can speak to it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The `client_type` every browser-style client reports.
pub const WEB_CLIENT_TYPE: &str = "web";

/// Body of `POST /login`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub client_type: String,
}

impl LoginRequest {
    /// Builds a login request tagged as a web client.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            client_type: WEB_CLIENT_TYPE.to_owned(),
        }
    }
}

// Hand-written so passwords never end up in logs.
impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("client_type", &self.client_type)
            .finish()
    }
}

/// Body of `POST /register`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub client_type: String,
}

impl RegisterRequest {
    /// Builds a registration request tagged as a web client.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        email: Option<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            email,
            client_type: WEB_CLIENT_TYPE.to_owned(),
        }
    }
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .field("client_type", &self.client_type)
            .finish()
    }
}

/// Response body of both account endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
