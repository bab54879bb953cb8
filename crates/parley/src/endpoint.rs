//! Endpoint resolution: which URL a session connects to.
//!
//! A browser client derives the chat server's address from the page it
//! was served from. [`PageOrigin`] reproduces those rules:
//!
//! | Page origin                  | Endpoint                    |
//! |------------------------------|-----------------------------|
//! | `http://localhost:5173`      | `ws://localhost:8080`       |
//! | `https://chat.example.com`   | `wss://chat.example.com`    |
//! | `http://10.0.0.5:3000`       | `ws://10.0.0.5:3000`        |
//!
//! The first row is the development override: a page on the dev server
//! port talks to the backend port on the same hostname. Both ports come
//! from [`ClientConfig`].
//!
//! Callers that already know the URL use [`FixedEndpoint`].

use crate::{ChatError, ClientConfig};

/// Produces the URL of the persistent connection.
pub trait EndpointResolver {
    fn resolve(&self, config: &ClientConfig) -> String;
}

/// A URL used as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedEndpoint(pub String);

impl FixedEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }
}

impl EndpointResolver for FixedEndpoint {
    fn resolve(&self, _config: &ClientConfig) -> String {
        self.0.clone()
    }
}

/// The origin of the page hosting the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOrigin {
    /// `true` for `https` pages.
    pub secure: bool,
    /// Host name without the port. May be empty.
    pub hostname: String,
    pub port: Option<u16>,
}

impl PageOrigin {
    /// Parses an origin such as `https://chat.example.com` or
    /// `http://localhost:5173`. Anything after the authority (path, query)
    /// is ignored.
    ///
    /// # Errors
    /// [`ChatError::InvalidOrigin`] if the scheme is not `http`/`https` or
    /// the port is not a number.
    pub fn parse(origin: &str) -> Result<Self, ChatError> {
        let invalid = || ChatError::InvalidOrigin(origin.to_owned());

        let (scheme, rest) = origin.split_once("://").ok_or_else(invalid)?;
        let secure = match scheme.to_ascii_lowercase().as_str() {
            "https" => true,
            "http" => false,
            _ => return Err(invalid()),
        };

        let authority = rest
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default();

        let (hostname, port) = split_host_port(authority).ok_or_else(invalid)?;
        Ok(Self {
            secure,
            hostname: hostname.to_owned(),
            port,
        })
    }

    /// `host[:port]` as it appears in the origin.
    fn host(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{port}", self.hostname),
            None => self.hostname.clone(),
        }
    }
}

impl EndpointResolver for PageOrigin {
    fn resolve(&self, config: &ClientConfig) -> String {
        if self.port == Some(config.dev_server_port) {
            let hostname = if self.hostname.is_empty() {
                "localhost"
            } else {
                &self.hostname
            };
            return format!("ws://{hostname}:{}", config.dev_backend_port);
        }

        let scheme = if self.secure { "wss" } else { "ws" };
        if self.hostname.is_empty() {
            return format!("{scheme}://localhost:{}", config.dev_backend_port);
        }
        format!("{scheme}://{}", self.host())
    }
}

/// Splits `host[:port]`, keeping bracketed IPv6 literals intact.
fn split_host_port(authority: &str) -> Option<(&str, Option<u16>)> {
    let (host, port) = if authority.starts_with('[') {
        let end = authority.find(']')?;
        let (host, tail) = authority.split_at(end + 1);
        match tail.strip_prefix(':') {
            Some(port) => (host, Some(port)),
            None if tail.is_empty() => (host, None),
            None => return None,
        }
    } else {
        match authority.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (authority, None),
        }
    };

    let port = match port {
        Some(p) => Some(p.parse().ok()?),
        None => None,
    };
    Some((host, port))
}
