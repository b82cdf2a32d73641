//! OAuth2 client-credentials authenticator

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    domain::notification::{errors::snippet, AuthError, Secret},
    infrastructure::http::{HttpClient, HttpResponse},
};

use super::{AccessToken, Authenticator};

/// Identity of the application registered with the identity provider
#[derive(Clone, Debug)]
pub struct ClientCredentials {
    /// Application (client) identifier
    pub client_id: String,

    /// Client secret
    pub client_secret: Secret,

    /// Tenant (directory) identifier
    pub tenant_id: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Obtains tokens with the client-credentials grant and holds the latest one
///
/// Readers share the held token; [`renew`](Authenticator::renew) is the only
/// writer and keeps the lock for the whole token request, so concurrent
/// renewals run one after another.
pub struct ClientCredentialsAuthenticator<H: HttpClient> {
    http: Arc<H>,
    credentials: ClientCredentials,
    token_url: String,
    scope: String,
    token: RwLock<Option<AccessToken>>,
}

impl<H: HttpClient> ClientCredentialsAuthenticator<H> {
    /// Create an authenticator.
    ///
    /// # Arguments
    /// * `http` - The client used for the token request.
    /// * `credentials` - The application's identity.
    /// * `login_base_url` - Identity host, e.g. `https://login.microsoftonline.com`.
    /// * `graph_base_url` - API host the token is scoped to, e.g. `https://graph.microsoft.com`.
    pub fn new(
        http: Arc<H>,
        credentials: ClientCredentials,
        login_base_url: &str,
        graph_base_url: &str,
    ) -> Self {
        let token_url = format!(
            "{}/{}/oauth2/v2.0/token",
            login_base_url.trim_end_matches('/'),
            credentials.tenant_id
        );
        let scope = format!("{}/.default", graph_base_url.trim_end_matches('/'));

        Self {
            http,
            credentials,
            token_url,
            scope,
            token: RwLock::new(None),
        }
    }

    /// The identity endpoint tokens are requested from
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Request a new token without touching the held one
    pub async fn authenticate(&self) -> Result<AccessToken, AuthError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.expose()),
            ("scope", self.scope.as_str()),
        ]
        .map(|(key, value)| (key.to_string(), value.to_string()));

        debug!(url = %self.token_url, "requesting access token");

        let response = self
            .http
            .post_form(&self.token_url, &form)
            .await
            .map_err(AuthError::Request)?;

        parse_token_response(response)
    }
}

fn parse_token_response(response: HttpResponse) -> Result<AccessToken, AuthError> {
    let HttpResponse { status, body } = response;

    if !(200..300).contains(&status) {
        return Err(AuthError::Rejected {
            status,
            body: snippet(&body),
        });
    }

    let parsed: TokenResponse =
        serde_json::from_str(&body).map_err(|source| AuthError::InvalidResponse {
            status,
            body: snippet(&body),
            source,
        })?;

    match parsed.access_token {
        Some(token) if !token.is_empty() => Ok(AccessToken::new(token)),
        _ => Err(AuthError::MissingAccessToken {
            status,
            body: snippet(&body),
        }),
    }
}

#[async_trait]
impl<H: HttpClient> Authenticator for ClientCredentialsAuthenticator<H> {
    async fn token(&self) -> Result<AccessToken, AuthError> {
        if let Some(token) = self.token.read().await.as_ref() {
            return Ok(token.clone());
        }

        let mut held = self.token.write().await;

        // Another caller may have fetched one while we waited for the lock
        if let Some(token) = held.as_ref() {
            return Ok(token.clone());
        }

        let token = self.authenticate().await?;
        *held = Some(token.clone());

        Ok(token)
    }

    async fn renew(&self) -> Result<AccessToken, AuthError> {
        let mut held = self.token.write().await;

        debug!("renewing access token");

        match self.authenticate().await {
            Ok(token) => {
                *held = Some(token.clone());
                Ok(token)
            }
            Err(err) => {
                *held = None;
                Err(err)
            }
        }
    }
}

impl<H: HttpClient> fmt::Debug for ClientCredentialsAuthenticator<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentialsAuthenticator")
            .field("credentials", &self.credentials)
            .field("token_url", &self.token_url)
            .field("scope", &self.scope)
            .finish()
    }
}
