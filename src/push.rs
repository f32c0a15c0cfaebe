//! Push channel adapter for ticket event streams.
//!
//! Opens one Server-Sent-Events subscription per open ticket and delivers
//! each decoded frame's payload verbatim to the caller's callback. The
//! adapter performs no interpretation of event kinds; routing and parsing
//! belong to the controller. Delivery is at-least-once, in wire arrival
//! order, with no gap filling.
//!
//! A dropped transport ends the subscription with a terminal
//! [`PushSignal::Closed`]; no automatic reconnection is attempted.

use std::time::Duration;

use futures::StreamExt;
use reqwest::{header, Client};
use tokio::task::JoinHandle;
use url::Url;

use crate::config::AuthToken;
use crate::error::{ConsoleError, Result};
use crate::sse::SseDecoder;

/// One decoded SSE frame. `ticket_id` is the subscription scope the frame
/// arrived on; the payload may reference a different ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushFrame {
    pub ticket_id: String,
    pub payload: String,
}

/// What the adapter delivers to its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushSignal {
    Frame(PushFrame),
    /// The transport ended, either cleanly or on error. Terminal for this
    /// subscription.
    Closed { ticket_id: String },
}

/// Factory for ticket-scoped push subscriptions.
pub struct PushChannel {
    client: Client,
    base_url: Url,
}

impl PushChannel {
    /// Create a push channel rooted at the API base URL.
    ///
    /// Only a connect timeout is set: a total-request timeout would cut the
    /// long-lived stream.
    pub fn new(base_url: Url) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, base_url })
    }

    fn stream_url(&self, ticket_id: &str, token: &AuthToken) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                ConsoleError::Config("API base URL cannot be a base".to_string())
            })?;
            path.pop_if_empty();
            path.extend(["api", "support", "tickets", ticket_id, "stream"]);
        }
        // The EventSource API cannot set headers, so the endpoint takes the
        // token as a query parameter.
        url.query_pairs_mut().append_pair("token", token.expose());
        Ok(url)
    }

    /// Open a subscription scoped to `ticket_id`.
    ///
    /// Each complete frame's payload is handed to `deliver` as text, followed
    /// by a final [`PushSignal::Closed`] when the transport ends. Opening a
    /// second subscription for the same ticket without cancelling the first
    /// is a caller error.
    pub fn subscribe<F>(&self, ticket_id: &str, token: &AuthToken, mut deliver: F) -> Result<Subscription>
    where
        F: FnMut(PushSignal) + Send + 'static,
    {
        let url = self.stream_url(ticket_id, token)?;
        let client = self.client.clone();
        let id = ticket_id.to_string();

        let task = tokio::spawn(async move {
            match open_stream(&client, url).await {
                Ok(response) => {
                    let mut decoder = SseDecoder::new();
                    let mut body = response.bytes_stream();
                    while let Some(chunk) = body.next().await {
                        match chunk {
                            Ok(bytes) => {
                                for payload in decoder.feed(&bytes) {
                                    deliver(PushSignal::Frame(PushFrame {
                                        ticket_id: id.clone(),
                                        payload,
                                    }));
                                }
                            }
                            Err(e) => {
                                tracing::warn!("push stream for ticket {id} dropped: {e}");
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("failed to open push stream for ticket {id}: {e}");
                }
            }
            deliver(PushSignal::Closed { ticket_id: id });
        });

        Ok(Subscription {
            ticket_id: ticket_id.to_string(),
            task: Some(task),
        })
    }
}

async fn open_stream(client: &Client, url: Url) -> Result<reqwest::Response> {
    let response = client
        .get(url)
        .header(header::ACCEPT, "text/event-stream")
        .send()
        .await?;

    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(ConsoleError::Auth(format!(
            "stream rejected (HTTP {})",
            status.as_u16()
        )));
    }
    if !status.is_success() {
        return Err(ConsoleError::Api(format!("HTTP {}", status.as_u16())));
    }
    Ok(response)
}

/// Handle for one live subscription. Dropping it cancels the transport.
#[derive(Debug)]
pub struct Subscription {
    ticket_id: String,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn ticket_id(&self) -> &str {
        &self.ticket_id
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    /// Cancel the subscription. Idempotent; safe to call on an
    /// already-closed handle.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
