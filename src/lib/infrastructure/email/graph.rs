//! Mail API transport
//!
//! Sends through the Microsoft Graph `sendMail` endpoint with a bearer
//! token from an [`Authenticator`]. The token is reused across sends until
//! the dispatcher asks for a renewal.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use clap::Parser;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::{
    domain::notification::{
        errors::snippet, Attachment, AuthError, EmailAddress, Message, NotifyError, Receipt,
        Secret, Transport, TransportError, TransportKind,
    },
    infrastructure::{
        auth::{Authenticator, ClientCredentials, ClientCredentialsAuthenticator},
        http::{HttpClient, ReqwestClient},
    },
};

mod payload;

pub use payload::SendMailRequest;

/// Characters escaped when the sender goes into the URL path. `@` stays as is.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Mail API configuration
#[derive(Clone, Debug, Parser)]
pub struct GraphConfig {
    /// Application (client) identifier
    #[clap(long, env = "GRAPH_CLIENT_ID")]
    pub client_id: String,

    /// Client secret
    #[clap(long, env = "GRAPH_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Secret,

    /// Tenant (directory) identifier
    #[clap(long, env = "GRAPH_TENANT_ID")]
    pub tenant_id: String,

    /// Mailbox the notifications are sent from
    #[clap(long, env = "GRAPH_SENDER_EMAIL")]
    pub sender_email: String,

    /// Identity endpoint base URL
    #[clap(
        long,
        env = "GRAPH_LOGIN_BASE_URL",
        default_value = "https://login.microsoftonline.com"
    )]
    pub login_base_url: String,

    /// Mail API base URL
    #[clap(long, env = "GRAPH_BASE_URL", default_value = "https://graph.microsoft.com")]
    pub graph_base_url: String,

    /// Timeout in seconds for each HTTP request
    #[clap(long, env = "GRAPH_TIMEOUT_SECS", default_value = "30")]
    pub timeout_secs: u64,
}

/// Transport over the mail API
pub struct GraphTransport<A: Authenticator, H: HttpClient> {
    authenticator: Arc<A>,
    http: Arc<H>,
    send_url: String,
}

impl GraphTransport<ClientCredentialsAuthenticator<ReqwestClient>, ReqwestClient> {
    /// Create a transport that authenticates with client credentials
    pub fn from_config(config: &GraphConfig) -> anyhow::Result<Self> {
        let sender = EmailAddress::new(&config.sender_email)?;
        let http = Arc::new(ReqwestClient::new(Duration::from_secs(config.timeout_secs))?);

        let authenticator = ClientCredentialsAuthenticator::new(
            http.clone(),
            ClientCredentials {
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                tenant_id: config.tenant_id.clone(),
            },
            &config.login_base_url,
            &config.graph_base_url,
        );

        Ok(Self::new(
            Arc::new(authenticator),
            http,
            &config.graph_base_url,
            &sender,
        ))
    }
}

impl<A: Authenticator, H: HttpClient> GraphTransport<A, H> {
    /// Create a transport sending as `sender`
    pub fn new(
        authenticator: Arc<A>,
        http: Arc<H>,
        graph_base_url: &str,
        sender: &EmailAddress,
    ) -> Self {
        let send_url = format!(
            "{}/v1.0/users/{}/sendMail",
            graph_base_url.trim_end_matches('/'),
            utf8_percent_encode(sender.as_str(), PATH_SEGMENT)
        );

        Self {
            authenticator,
            http,
            send_url,
        }
    }

    /// The endpoint messages are posted to
    pub fn send_url(&self) -> &str {
        &self.send_url
    }
}

#[async_trait]
impl<A: Authenticator, H: HttpClient> Transport for GraphTransport<A, H> {
    fn kind(&self) -> TransportKind {
        TransportKind::Graph
    }

    async fn send(
        &self,
        message: &Message,
        attachments: &[Attachment],
    ) -> Result<Receipt, NotifyError> {
        let payload = serde_json::to_value(SendMailRequest::new(message, attachments))
            .map_err(|e| TransportError::Request(e.into()))?;

        let token = self.authenticator.token().await?;

        let response = self
            .http
            .post_json(&self.send_url, token.as_str(), &payload)
            .await
            .map_err(TransportError::Request)?;

        match response.status {
            status if response.is_success() => Ok(Receipt {
                transport: TransportKind::Graph,
                status,
            }),
            status @ (401 | 403) => Err(TransportError::Unauthorized {
                status,
                body: snippet(&response.body),
            }
            .into()),
            status => Err(TransportError::Rejected {
                status,
                body: snippet(&response.body),
            }
            .into()),
        }
    }

    async fn renew(&self) -> Result<(), AuthError> {
        self.authenticator.renew().await.map(|_| ())
    }
}

impl<A: Authenticator, H: HttpClient> std::fmt::Debug for GraphTransport<A, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphTransport")
            .field("send_url", &self.send_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::Write,
        sync::{Arc, Mutex},
    };

    use anyhow::anyhow;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use testresult::TestResult;

    use crate::{
        domain::notification::{AttachmentError, Dispatcher},
        infrastructure::{
            auth::{AccessToken, MockAuthenticator},
            http::{HttpResponse, MockHttpClient},
        },
    };

    use super::*;

    const SEND_URL: &str = "https://graph.microsoft.com/v1.0/users/alerts@example.com/sendMail";
    const NO_ATTACHMENTS: [&str; 0] = [];

    fn response(status: u16, body: &str) -> anyhow::Result<HttpResponse> {
        Ok(HttpResponse {
            status,
            body: body.to_string(),
        })
    }

    fn sender() -> EmailAddress {
        EmailAddress::new("alerts@example.com").unwrap()
    }

    /// Expect `times` token requests, each issuing `token-1`, `token-2`, ...
    fn expect_tokens(http: &mut MockHttpClient, times: usize) {
        let mut issued = 0;

        http.expect_post_form().times(times).returning(move |_, _| {
            issued += 1;
            response(200, &format!(r#"{{"access_token": "token-{issued}"}}"#))
        });
    }

    /// Wire a dispatcher whose authenticator and transport share one mocked client
    fn dispatcher(
        http: MockHttpClient,
    ) -> Dispatcher<GraphTransport<ClientCredentialsAuthenticator<MockHttpClient>, MockHttpClient>>
    {
        let http = Arc::new(http);

        let authenticator = ClientCredentialsAuthenticator::new(
            http.clone(),
            ClientCredentials {
                client_id: "client-id".to_string(),
                client_secret: Secret::new("client-secret"),
                tenant_id: "tenant-id".to_string(),
            },
            "https://login.microsoftonline.com",
            "https://graph.microsoft.com",
        );

        Dispatcher::new(GraphTransport::new(
            Arc::new(authenticator),
            http,
            "https://graph.microsoft.com/",
            &sender(),
        ))
    }

    #[tokio::test]
    async fn test_send_returns_accepted_status() -> TestResult {
        let mut http = MockHttpClient::new();

        expect_tokens(&mut http, 1);
        http.expect_post_json()
            .times(1)
            .withf(|url, bearer, body| {
                url == SEND_URL
                    && bearer == "token-1"
                    && body["message"]["subject"] == "DQ FAIL: EMPTY FILE"
                    && body["saveToSentItems"] == true
            })
            .returning(|_, _, _| response(202, ""));

        let receipt = dispatcher(http)
            .send(
                ["ops@example.com"],
                "DQ FAIL: EMPTY FILE",
                "<p>orders.csv was empty</p>",
                NO_ATTACHMENTS,
            )
            .await?;

        assert_eq!(
            receipt,
            Receipt {
                transport: TransportKind::Graph,
                status: 202
            }
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_token_is_reused_across_sends() -> TestResult {
        let mut http = MockHttpClient::new();

        expect_tokens(&mut http, 1);
        http.expect_post_json()
            .times(2)
            .withf(|_, bearer, _| bearer == "token-1")
            .returning(|_, _, _| response(202, ""));

        let dispatcher = dispatcher(http);

        for _ in 0..2 {
            dispatcher
                .send(["ops@example.com"], "subject", "body", NO_ATTACHMENTS)
                .await?;
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_unauthorized_then_accepted_renews_once() -> TestResult {
        let mut http = MockHttpClient::new();
        let bearers = Arc::new(Mutex::new(Vec::new()));
        let seen = bearers.clone();

        expect_tokens(&mut http, 2);
        http.expect_post_json()
            .times(2)
            .returning(move |_, bearer, _| {
                let mut seen = seen.lock().unwrap();
                seen.push(bearer.to_string());

                if seen.len() == 1 {
                    response(401, r#"{"error":{"code":"InvalidAuthenticationToken"}}"#)
                } else {
                    response(202, "")
                }
            });

        let receipt = dispatcher(http)
            .send(["ops@example.com"], "subject", "body", NO_ATTACHMENTS)
            .await?;

        assert_eq!(receipt.status, 202);
        assert_eq!(*bearers.lock().unwrap(), vec!["token-1", "token-2"]);

        Ok(())
    }

    #[tokio::test]
    async fn test_unauthorized_twice_fails_after_one_retry() {
        let mut http = MockHttpClient::new();

        expect_tokens(&mut http, 2);
        http.expect_post_json()
            .times(2)
            .returning(|_, _, _| response(401, "expired"));

        let result = dispatcher(http)
            .send(["ops@example.com"], "subject", "body", NO_ATTACHMENTS)
            .await;

        assert!(matches!(
            result,
            Err(NotifyError::Transport(TransportError::Unauthorized { status: 401, ref body })) if body == "expired"
        ));
    }

    #[tokio::test]
    async fn test_forbidden_is_treated_as_unauthorized() -> TestResult {
        let mut http = MockHttpClient::new();
        let mut calls = 0;

        expect_tokens(&mut http, 2);
        http.expect_post_json().times(2).returning(move |_, _, _| {
            calls += 1;
            response(if calls == 1 { 403 } else { 202 }, "")
        });

        let receipt = dispatcher(http)
            .send(["ops@example.com"], "subject", "body", NO_ATTACHMENTS)
            .await?;

        assert_eq!(receipt.status, 202);

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_attachment_fails_before_any_request() {
        let mut http = MockHttpClient::new();

        http.expect_post_form().times(0);
        http.expect_post_json().times(0);

        let result = dispatcher(http)
            .send(["ops@example.com"], "subject", "body", ["/no/such/file"])
            .await;

        assert!(matches!(
            result,
            Err(NotifyError::Attachment(AttachmentError::Unreadable { .. }))
        ));
    }

    #[tokio::test]
    async fn test_attachment_is_sent_base64_encoded() -> TestResult {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile()?;
        let contents = b"order_id,amount\n1,\n\xff\x00".to_vec();
        file.write_all(&contents)?;

        let expected = contents.clone();
        let mut http = MockHttpClient::new();

        expect_tokens(&mut http, 1);
        http.expect_post_json()
            .times(1)
            .withf(move |_, _, body| {
                let encoded = body["message"]["attachments"][0]["contentBytes"]
                    .as_str()
                    .unwrap_or_default();

                STANDARD.decode(encoded).ok().as_ref() == Some(&expected)
            })
            .returning(|_, _, _| response(202, ""));

        dispatcher(http)
            .send(["ops@example.com"], "subject", "body", [file.path()])
            .await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let mut http = MockHttpClient::new();

        expect_tokens(&mut http, 1);
        http.expect_post_json()
            .times(1)
            .returning(|_, _, _| response(500, "internal"));

        let result = dispatcher(http)
            .send(["ops@example.com"], "subject", "body", NO_ATTACHMENTS)
            .await;

        assert!(matches!(
            result,
            Err(NotifyError::Transport(TransportError::Rejected { status: 500, .. }))
        ));
    }

    #[tokio::test]
    async fn test_token_failure_surfaces_as_transport_error() {
        let mut http = MockHttpClient::new();

        http.expect_post_form()
            .times(1)
            .returning(|_, _| response(200, "{}"));
        http.expect_post_json().times(0);

        let result = dispatcher(http)
            .send(["ops@example.com"], "subject", "body", NO_ATTACHMENTS)
            .await;

        assert!(matches!(
            result,
            Err(NotifyError::Transport(TransportError::Authentication(
                AuthError::MissingAccessToken { .. }
            )))
        ));
    }

    #[tokio::test]
    async fn test_request_failure_is_transport_error() {
        let mut authenticator = MockAuthenticator::new();
        let mut http = MockHttpClient::new();

        authenticator
            .expect_token()
            .times(1)
            .returning(|| Ok(AccessToken::new("abc123")));
        http.expect_post_json()
            .times(1)
            .returning(|_, _, _| Err(anyhow!("operation timed out")));

        let transport = GraphTransport::new(
            Arc::new(authenticator),
            Arc::new(http),
            "https://graph.microsoft.com",
            &sender(),
        );

        let message = Message::parse(["ops@example.com"], "subject", "body").unwrap();
        let result = transport.send(&message, &[]).await;

        assert!(matches!(
            result,
            Err(NotifyError::Transport(TransportError::Request(_)))
        ));
    }

    #[tokio::test]
    async fn test_renew_delegates_to_authenticator() -> TestResult {
        let mut authenticator = MockAuthenticator::new();

        authenticator
            .expect_renew()
            .times(1)
            .returning(|| Ok(AccessToken::new("fresh")));

        let transport = GraphTransport::new(
            Arc::new(authenticator),
            Arc::new(MockHttpClient::new()),
            "https://graph.microsoft.com",
            &sender(),
        );

        transport.renew().await?;

        assert_eq!(transport.send_url(), SEND_URL);

        Ok(())
    }

    #[test]
    fn test_from_config() -> TestResult {
        let config = GraphConfig {
            client_id: "client-id".to_string(),
            client_secret: Secret::new("client-secret"),
            tenant_id: "tenant-id".to_string(),
            sender_email: "alerts@example.com".to_string(),
            login_base_url: "https://login.microsoftonline.com".to_string(),
            graph_base_url: "https://graph.microsoft.com".to_string(),
            timeout_secs: 10,
        };

        let transport = GraphTransport::from_config(&config)?;

        assert_eq!(transport.send_url(), SEND_URL);
        assert_eq!(transport.kind(), TransportKind::Graph);

        Ok(())
    }

    #[test]
    fn test_sender_is_escaped_in_send_url() -> TestResult {
        let transport = GraphTransport::new(
            Arc::new(MockAuthenticator::new()),
            Arc::new(MockHttpClient::new()),
            "https://graph.microsoft.com",
            &EmailAddress::new("ops#team/eu@example.com")?,
        );

        assert_eq!(
            transport.send_url(),
            "https://graph.microsoft.com/v1.0/users/ops%23team%2Feu@example.com/sendMail"
        );

        Ok(())
    }

    #[test]
    fn test_from_config_rejects_invalid_sender() {
        let config = GraphConfig {
            client_id: "client-id".to_string(),
            client_secret: Secret::new("client-secret"),
            tenant_id: "tenant-id".to_string(),
            sender_email: "alerts".to_string(),
            login_base_url: "https://login.microsoftonline.com".to_string(),
            graph_base_url: "https://graph.microsoft.com".to_string(),
            timeout_secs: 10,
        };

        assert!(GraphTransport::from_config(&config).is_err());
    }

    #[test]
    fn test_config_from_args() -> TestResult {
        let config = GraphConfig::try_parse_from([
            "graph",
            "--client-id",
            "client-id",
            "--client-secret",
            "client-secret",
            "--tenant-id",
            "tenant-id",
            "--sender-email",
            "alerts@example.com",
        ])?;

        assert_eq!(config.client_secret.expose(), "client-secret");
        assert_eq!(config.login_base_url, "https://login.microsoftonline.com");
        assert_eq!(config.graph_base_url, "https://graph.microsoft.com");
        assert_eq!(config.timeout_secs, 30);

        Ok(())
    }
}
