//! REST client for the support-ticket API.
//!
//! # Security Note - Logging
//!
//! The bearer token is protected from being logged through reqwest's request
//! logging by the `RedactedHeader` wrapper type, which implements `Display`
//! and `Debug` to redact sensitive values. Even if debug logging is enabled,
//! the Authorization header value is displayed as `[REDACTED]`.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::config::AuthToken;
use crate::error::{ConsoleError, Result};
use crate::types::{Message, Ticket, TicketDraft};

/// Wrapper for sensitive header values that redacts the value when formatted.
struct RedactedHeader {
    value: String,
}

impl RedactedHeader {
    fn bearer(token: &AuthToken) -> Self {
        Self {
            value: format!("Bearer {}", token.expose()),
        }
    }

    fn as_header_value(&self) -> Result<header::HeaderValue> {
        header::HeaderValue::from_str(&self.value)
            .map_err(|_| ConsoleError::Auth("token is not a valid header value".to_string()))
    }
}

impl fmt::Display for RedactedHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Debug for RedactedHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedactedHeader")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

// Response envelopes used by the console API.

#[derive(Debug, Deserialize)]
struct TicketsEnvelope {
    tickets: Vec<Ticket>,
}

#[derive(Debug, Deserialize)]
struct TicketEnvelope {
    ticket: Ticket,
}

#[derive(Debug, Deserialize)]
struct RepliesEnvelope {
    replies: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct ReplyEnvelope {
    reply: Message,
}

#[derive(Debug, Deserialize)]
struct ErrorsEnvelope {
    errors: Vec<String>,
}

/// Backend interface for the support console.
///
/// The controller is generic over this trait so tests can substitute an
/// in-process mock for the HTTP client.
#[async_trait]
pub trait SupportTransport: Send + Sync {
    /// `GET /api/support/tickets`
    async fn list_tickets(&self, token: &AuthToken) -> Result<Vec<Ticket>>;

    /// `POST /api/support/tickets`
    async fn create_ticket(&self, token: &AuthToken, draft: &TicketDraft) -> Result<Ticket>;

    /// `GET /api/support/tickets/{id}/replies`
    async fn fetch_replies(&self, token: &AuthToken, ticket_id: &str) -> Result<Vec<Message>>;

    /// `POST /api/support/tickets/{id}/replies`
    async fn post_reply(&self, token: &AuthToken, ticket_id: &str, body: &str) -> Result<Message>;
}

/// HTTP implementation of [`SupportTransport`].
pub struct SupportApi {
    client: Client,
    base_url: Url,
}

impl SupportApi {
    /// Create a new API client.
    ///
    /// Configures the HTTP client with a 30s connect timeout and a 60s total
    /// timeout; a request that exceeds either surfaces as a transport error.
    pub fn new(base_url: Url) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                ConsoleError::Config("API base URL cannot be a base".to_string())
            })?;
            path.pop_if_empty();
            path.extend(["api", "support"]);
            path.extend(segments);
        }
        Ok(url)
    }

    async fn get(&self, url: Url, token: &AuthToken) -> Result<Response> {
        let auth = RedactedHeader::bearer(token);
        let response = self
            .client
            .get(url)
            .header(header::AUTHORIZATION, auth.as_header_value()?)
            .send()
            .await?;
        Ok(response)
    }

    async fn post<B: serde::Serialize + Sync>(
        &self,
        url: Url,
        token: &AuthToken,
        body: &B,
    ) -> Result<Response> {
        let auth = RedactedHeader::bearer(token);
        let response = self
            .client
            .post(url)
            .header(header::AUTHORIZATION, auth.as_header_value()?)
            .json(body)
            .send()
            .await?;
        Ok(response)
    }
}

/// Map a non-success response to the matching error kind. Validation
/// failures carry the server's field-level error list through unchanged.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ConsoleError::Auth(format!(
            "request rejected (HTTP {})",
            status.as_u16()
        )));
    }

    if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
        if let Ok(body) = response.json::<ErrorsEnvelope>().await {
            if !body.errors.is_empty() {
                return Err(ConsoleError::Validation(body.errors));
            }
        }
        return Err(ConsoleError::Api(format!("HTTP {}", status.as_u16())));
    }

    Err(ConsoleError::Api(format!("HTTP {}", status.as_u16())))
}

#[async_trait]
impl SupportTransport for SupportApi {
    async fn list_tickets(&self, token: &AuthToken) -> Result<Vec<Ticket>> {
        let url = self.endpoint(&["tickets"])?;
        let response = check(self.get(url, token).await?).await?;
        let body: TicketsEnvelope = response.json().await?;
        Ok(body.tickets)
    }

    async fn create_ticket(&self, token: &AuthToken, draft: &TicketDraft) -> Result<Ticket> {
        let url = self.endpoint(&["tickets"])?;
        let response = check(self.post(url, token, draft).await?).await?;
        let body: TicketEnvelope = response.json().await?;
        Ok(body.ticket)
    }

    async fn fetch_replies(&self, token: &AuthToken, ticket_id: &str) -> Result<Vec<Message>> {
        let url = self.endpoint(&["tickets", ticket_id, "replies"])?;
        let response = self.get(url, token).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ConsoleError::TicketNotFound(ticket_id.to_string()));
        }
        let body: RepliesEnvelope = check(response).await?.json().await?;
        Ok(body.replies)
    }

    async fn post_reply(&self, token: &AuthToken, ticket_id: &str, body: &str) -> Result<Message> {
        let url = self.endpoint(&["tickets", ticket_id, "replies"])?;
        let payload = serde_json::json!({ "message": body });
        let response = self.post(url, token, &payload).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ConsoleError::TicketNotFound(ticket_id.to_string()));
        }
        let body: ReplyEnvelope = check(response).await?.json().await?;
        Ok(body.reply)
    }
}
