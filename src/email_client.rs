use std::time;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::domain::EmailAddress;

/// Postmark header carrying the server token
const POSTMARK_TOKEN_HEADER: &str = "X-Postmark-Server-Token";

/// Outgoing message handed to a mail transport
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub from: EmailAddress,
    pub to: EmailAddress,
    pub bcc: Vec<EmailAddress>,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

/// Mail transport error type
#[derive(thiserror::Error, Debug)]
pub enum MailError {
    #[error("Failed to build the email API URL")]
    InvalidUrl(#[from] url::ParseError),
    #[error("The email API request failed")]
    Request(#[from] reqwest::Error),
    #[error("The email API did not answer within {0:?}")]
    Timeout(time::Duration),
}

/// Outbound mail transport
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Check that the transport is reachable and correctly configured
    async fn verify(&self) -> Result<(), MailError>;

    /// Send a single message
    async fn send(&self, message: &OutgoingMessage) -> Result<(), MailError>;

    /// Address used as sender (and as placeholder primary recipient)
    fn sender(&self) -> &EmailAddress;

    /// Upper bound on the duration of a single `send`
    fn timeout(&self) -> time::Duration;
}

/// Email client data
#[derive(Debug)]
pub struct EmailClient {
    http_client: Client,
    base_url: Url,
    sender: EmailAddress,
    authorization_token: SecretString,
    timeout: time::Duration,
}

/// Send email request body
#[derive(serde::Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    bcc: Option<String>,
    subject: &'a str,
    html_body: &'a str,
    text_body: &'a str,
}

impl EmailClient {
    pub fn new(
        base_url: Url,
        sender: EmailAddress,
        authorization_token: SecretString,
        timeout: time::Duration,
    ) -> Result<Self, MailError> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url,
            sender,
            authorization_token,
            timeout,
        })
    }
}

#[async_trait]
impl MailTransport for EmailClient {
    /// Query the Postmark server endpoint, which fails on a wrong token or an unreachable API
    /// <https://postmarkapp.com/developer/api/server-api>
    #[tracing::instrument(name = "Verify mail transport", skip(self))]
    async fn verify(&self) -> Result<(), MailError> {
        let url = self.base_url.join("/server")?;
        self.http_client
            .get(url)
            .header(POSTMARK_TOKEN_HEADER, self.authorization_token.expose_secret())
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Send an email using Postmark's REST API
    /// <https://postmarkapp.com/developer/user-guide/send-email-with-api>
    #[tracing::instrument(
        name = "Send email",
        skip(self, message),
        fields(subject = %message.subject, recipients = message.bcc.len())
    )]
    async fn send(&self, message: &OutgoingMessage) -> Result<(), MailError> {
        let url = self.base_url.join("/email")?;
        let bcc = (!message.bcc.is_empty()).then(|| {
            message
                .bcc
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<_>>()
                .join(",")
        });
        let request_body = SendEmailRequest {
            from: message.from.as_ref(),
            to: message.to.as_ref(),
            bcc,
            subject: &message.subject,
            html_body: &message.html_body,
            text_body: &message.text_body,
        };

        self.http_client
            .post(url)
            .header(POSTMARK_TOKEN_HEADER, self.authorization_token.expose_secret())
            .json(&request_body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    fn sender(&self) -> &EmailAddress {
        &self.sender
    }

    fn timeout(&self) -> time::Duration {
        self.timeout
    }
}
