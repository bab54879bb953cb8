//! The seam to the HTTP account service.
//!
//! Signing up and signing in happen over plain request/response HTTP
//! (`POST /register`, `POST /login`) before any persistent connection is
//! opened. Parley doesn't ship an HTTP client; instead it defines the
//! [`AccountService`] trait and the caller plugs in whatever talks to
//! their account backend. Tests use a mock.
//!
//! After a successful `login` the caller opens the persistent connection
//! with the same username. The password never travels on that
//! connection.

use std::fmt;

use parley_protocol::{AccountResponse, Identity, LoginRequest, RegisterRequest};

use crate::SessionError;

/// A username and password as typed into the login form.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Body for `POST /login`.
    pub fn login_request(&self) -> LoginRequest {
        LoginRequest::new(&self.username, &self.password)
    }

    /// Body for `POST /register`.
    pub fn register_request(&self, email: Option<&str>) -> RegisterRequest {
        RegisterRequest::new(&self.username, &self.password, email.map(str::to_owned))
    }

    /// Interprets an account endpoint's response.
    ///
    /// # Errors
    /// [`SessionError::AuthFailed`] carrying the server's `error` text, or
    /// `fallback` when the server sent none.
    pub fn check_response(
        response: &AccountResponse,
        fallback: &str,
    ) -> Result<(), SessionError> {
        if response.success {
            return Ok(());
        }
        let reason = response
            .error
            .clone()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| fallback.to_owned());
        Err(SessionError::AuthFailed(reason))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Rejects credentials with a blank username or password.
///
/// # Errors
/// [`SessionError::Validation`] if either field is blank.
pub fn validate_credentials(credentials: &Credentials) -> Result<(), SessionError> {
    if credentials.username.trim().is_empty() || credentials.password.trim().is_empty() {
        return Err(SessionError::Validation(
            "username and password are required".into(),
        ));
    }
    Ok(())
}

/// Talks to the account service.
///
/// `Send + Sync + 'static` lets one service be shared by every sign-in
/// across tasks. The returned futures are `Send` so a sign-in can run on
/// any runtime worker.
///
/// # Example
///
/// ```rust
/// use parley_protocol::Identity;
/// use parley_session::{AccountService, Credentials, SessionError};
///
/// /// Accepts everyone. Only for local development.
/// struct OpenDoor;
///
/// impl AccountService for OpenDoor {
///     async fn login(&self, credentials: &Credentials) -> Result<Identity, SessionError> {
///         Identity::new(credentials.username.clone())
///             .map_err(|e| SessionError::AuthFailed(e.to_string()))
///     }
///
///     async fn register(
///         &self,
///         _credentials: &Credentials,
///         _email: Option<&str>,
///     ) -> Result<(), SessionError> {
///         Ok(())
///     }
/// }
/// ```
pub trait AccountService: Send + Sync + 'static {
    /// Signs in and returns the identity to use on the persistent
    /// connection.
    ///
    /// # Errors
    /// [`SessionError::AuthFailed`] if the service refuses the credentials
    /// or can't be reached.
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl std::future::Future<Output = Result<Identity, SessionError>> + Send;

    /// Creates an account. `email` is optional.
    ///
    /// # Errors
    /// [`SessionError::AuthFailed`] if the service refuses the request.
    fn register(
        &self,
        credentials: &Credentials,
        email: Option<&str>,
    ) -> impl std::future::Future<Output = Result<(), SessionError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_credentials_requires_both_fields() {
        assert!(validate_credentials(&Credentials::new("alice", "pw")).is_ok());
        assert!(matches!(
            validate_credentials(&Credentials::new("", "pw")),
            Err(SessionError::Validation(_))
        ));
        assert!(matches!(
            validate_credentials(&Credentials::new("alice", "  ")),
            Err(SessionError::Validation(_))
        ));
    }

    #[test]
    fn test_login_request_carries_web_client_type() {
        let req = Credentials::new("alice", "pw").login_request();

        assert_eq!(req.username, "alice");
        assert_eq!(req.client_type, parley_protocol::WEB_CLIENT_TYPE);
    }

    #[test]
    fn test_register_request_passes_email_through() {
        let req = Credentials::new("alice", "pw").register_request(Some("a@example.com"));
        assert_eq!(req.email.as_deref(), Some("a@example.com"));
    }

    #[test]
    fn test_check_response_success_is_ok() {
        let ok = AccountResponse {
            success: true,
            error: None,
        };
        assert!(Credentials::check_response(&ok, "Login failed").is_ok());
    }

    #[test]
    fn test_check_response_uses_server_error_text() {
        let failed = AccountResponse {
            success: false,
            error: Some("Invalid credentials".into()),
        };

        assert_eq!(
            Credentials::check_response(&failed, "Login failed"),
            Err(SessionError::AuthFailed("Invalid credentials".into()))
        );
    }

    #[test]
    fn test_check_response_falls_back_when_error_missing() {
        let failed = AccountResponse {
            success: false,
            error: None,
        };

        assert_eq!(
            Credentials::check_response(&failed, "Registration failed"),
            Err(SessionError::AuthFailed("Registration failed".into()))
        );
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", Credentials::new("alice", "hunter2"));
        assert!(!rendered.contains("hunter2"));
    }
}
