//! Bearer token acquisition for the mail API

use std::fmt;

use async_trait::async_trait;

#[cfg(test)]
use mockall::mock;

use crate::domain::notification::{AuthError, Secret};

mod client_credentials;

pub use client_credentials::{ClientCredentials, ClientCredentialsAuthenticator};

/// An opaque bearer token
///
/// Its validity window is not tracked; it is renewed on demand or after
/// the mail API rejects it.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(Secret);

impl AccessToken {
    /// Wrap a raw token
    pub fn new(raw: impl Into<String>) -> Self {
        Self(Secret::new(raw))
    }

    /// The raw token for an `Authorization` header
    pub fn as_str(&self) -> &str {
        self.0.expose()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessToken").field(&self.0).finish()
    }
}

/// Source of bearer tokens
#[async_trait]
pub trait Authenticator: Send + Sync + 'static {
    /// The held token, obtaining one first if none is held
    async fn token(&self) -> Result<AccessToken, AuthError>;

    /// Fetch a fresh token and replace the held one unconditionally
    async fn renew(&self) -> Result<AccessToken, AuthError>;
}

#[cfg(test)]
mock! {
    pub Authenticator {}

    #[async_trait]
    impl Authenticator for Authenticator {
        async fn token(&self) -> Result<AccessToken, AuthError>;
        async fn renew(&self) -> Result<AccessToken, AuthError>;
    }
}
