//! HTTP client used by the token authenticator and the mail API transport

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

#[cfg(test)]
use mockall::mock;

/// Status and body of an HTTP response
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,

    /// Response body as text
    pub body: String,
}

impl HttpResponse {
    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The two requests this crate makes
///
/// Non-2xx responses are returned as [`Ok`]; only failures to complete
/// the exchange are errors.
#[async_trait]
pub trait HttpClient: Send + Sync + 'static {
    /// POST a form-encoded body
    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<HttpResponse>;

    /// POST a JSON body with a bearer token
    async fn post_json(&self, url: &str, bearer: &str, body: &Value) -> Result<HttpResponse>;
}

#[cfg(test)]
mock! {
    pub HttpClient {}

    #[async_trait]
    impl HttpClient for HttpClient {
        async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<HttpResponse>;
        async fn post_json(&self, url: &str, bearer: &str, body: &Value) -> Result<HttpResponse>;
    }
}

/// [`HttpClient`] backed by `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Create a client whose every request fails after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self { client })
    }

    async fn into_response(response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<HttpResponse> {
        let response = self.client.post(url).form(form).send().await?;

        Self::into_response(response).await
    }

    async fn post_json(&self, url: &str, bearer: &str, body: &Value) -> Result<HttpResponse> {
        let response = self
            .client
            .post(url)
            .bearer_auth(bearer)
            .json(body)
            .send()
            .await?;

        Self::into_response(response).await
    }
}
