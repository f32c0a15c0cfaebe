//! Conversation controller: the single source of truth for the currently
//! open ticket's message history.
//!
//! The controller merges one history fetch with an indefinite stream of push
//! events. All completions, the history result and every push frame alike,
//! are funneled through one event queue and applied by [`SupportConsole::handle_event`],
//! so the conversation has exactly one writer and needs no locks.
//!
//! The history fetch runs in the background and its completion is tagged
//! with the ticket id it was issued for; a slow fetch for ticket A resolving
//! after the user switched to ticket B is discarded.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::api::SupportTransport;
use crate::config::AuthToken;
use crate::conversation::Conversation;
use crate::error::{ConsoleError, Result};
use crate::events::PushEvent;
use crate::push::{PushChannel, PushFrame, PushSignal, Subscription};
use crate::tickets::TicketList;
use crate::types::{Message, Sender, Ticket, TicketDraft};

/// A completion waiting to be applied to the console state.
#[derive(Debug)]
pub enum ConsoleEvent {
    HistoryLoaded {
        ticket_id: String,
        result: Result<Vec<Message>>,
    },
    Push(PushSignal),
}

pub struct SupportConsole<T: SupportTransport> {
    transport: Arc<T>,
    push: PushChannel,
    tickets: TicketList,
    conversation: Conversation,
    subscription: Option<Subscription>,
    events_tx: mpsc::UnboundedSender<ConsoleEvent>,
    events_rx: mpsc::UnboundedReceiver<ConsoleEvent>,
    notices: Vec<String>,
}

impl<T: SupportTransport + 'static> SupportConsole<T> {
    pub fn new(transport: Arc<T>, push: PushChannel) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            transport,
            push,
            tickets: TicketList::new(),
            conversation: Conversation::new(),
            subscription: None,
            events_tx,
            events_rx,
            notices: Vec::new(),
        }
    }

    pub fn tickets(&self) -> &TicketList {
        &self.tickets
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Drain pending user-visible notices (history-fetch failures and the
    /// like). The caller renders them however it likes.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    /// Re-fetch the ticket list.
    pub async fn refresh(&mut self, token: &AuthToken) -> Result<()> {
        let tickets = self.transport.list_tickets(token).await?;
        self.tickets.replace(tickets);
        Ok(())
    }

    /// Submit a new ticket. Validation failures surface as
    /// [`ConsoleError::Validation`] with the server's field-level messages.
    pub async fn create_ticket(&mut self, token: &AuthToken, draft: &TicketDraft) -> Result<Ticket> {
        let ticket = self.transport.create_ticket(token, draft).await?;
        self.tickets.upsert(ticket.clone());
        Ok(ticket)
    }

    /// Open a ticket's conversation: reset state, start the history fetch in
    /// the background, and establish exactly one push subscription scoped to
    /// the ticket. Any previously open conversation is closed first.
    pub async fn open(&mut self, ticket_id: &str, token: &AuthToken) -> Result<()> {
        let ticket = self
            .tickets
            .get(ticket_id)
            .cloned()
            .ok_or_else(|| ConsoleError::TicketNotFound(ticket_id.to_string()))?;

        self.close();
        self.conversation.begin(ticket);

        let transport = Arc::clone(&self.transport);
        let events_tx = self.events_tx.clone();
        let id = ticket_id.to_string();
        let fetch_token = token.clone();
        tokio::spawn(async move {
            let result = transport.fetch_replies(&fetch_token, &id).await;
            let _ = events_tx.send(ConsoleEvent::HistoryLoaded {
                ticket_id: id,
                result,
            });
        });

        let events_tx = self.events_tx.clone();
        let subscription = self.push.subscribe(ticket_id, token, move |signal| {
            let _ = events_tx.send(ConsoleEvent::Push(signal));
        })?;
        self.subscription = Some(subscription);

        Ok(())
    }

    /// Tear down the push subscription and discard the conversation. Safe to
    /// call at any time; must be called before opening a different ticket.
    pub fn close(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
        self.conversation.reset();
    }

    /// Submit a reply to the open ticket. The server is the source of truth
    /// for the assigned id and timestamp; nothing is rendered optimistically.
    /// On failure nothing is appended and the caller's draft is untouched.
    pub async fn send_message(&mut self, token: &AuthToken, text: &str) -> Result<()> {
        let body = text.trim();
        if body.is_empty() {
            return Err(ConsoleError::EmptyMessage);
        }
        let ticket_id = self
            .conversation
            .ticket_id()
            .ok_or(ConsoleError::NoOpenTicket)?
            .to_string();
        if !self.conversation.can_send() {
            return Err(ConsoleError::TicketClosed);
        }

        let reply = self.transport.post_reply(token, &ticket_id, body).await?;
        // The push channel may redeliver this same reply; apply_message
        // deduplicates by id either way.
        self.conversation.apply_message(reply);
        Ok(())
    }

    /// Wait for the next completion. Returns `None` only if the console
    /// itself is gone (the sender side lives in `self`, so in practice this
    /// pends until an event arrives).
    pub async fn next_event(&mut self) -> Option<ConsoleEvent> {
        self.events_rx.recv().await
    }

    /// Wait for one completion and apply it. Returns `false` when the event
    /// queue is closed.
    pub async fn tick(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    /// Apply every completion that is already queued, without waiting.
    pub fn pump(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
        }
    }

    /// Apply one completion to the console state. This is the only writer of
    /// the conversation and the ticket list.
    pub fn handle_event(&mut self, event: ConsoleEvent) {
        match event {
            ConsoleEvent::HistoryLoaded { ticket_id, result } => {
                if !self.conversation.is_open_for(&ticket_id) {
                    tracing::debug!("discarding stale history result for ticket {ticket_id}");
                    return;
                }
                match result {
                    Ok(replies) => self.conversation.finish_load(replies),
                    Err(e) => {
                        tracing::warn!("history fetch for ticket {ticket_id} failed: {e}");
                        self.conversation.fail_load();
                        self.notices
                            .push(format!("failed to load conversation history: {e}"));
                    }
                }
            }
            ConsoleEvent::Push(PushSignal::Frame(frame)) => self.handle_frame(frame),
            ConsoleEvent::Push(PushSignal::Closed { ticket_id }) => {
                tracing::warn!("push channel for ticket {ticket_id} closed");
                let stale = self
                    .subscription
                    .as_ref()
                    .map(|s| s.ticket_id() == ticket_id)
                    .unwrap_or(false);
                if stale {
                    self.subscription = None;
                }
            }
        }
    }

    fn handle_frame(&mut self, frame: PushFrame) {
        // Malformed payloads are dropped inside decode; the subscription
        // stays up.
        let Some(event) = PushEvent::decode(&frame.payload) else {
            return;
        };

        match event {
            PushEvent::Connected => {}
            PushEvent::TicketMessage {
                ticket_id,
                message_id,
                is_staff_reply,
                message,
                created_at,
                sender_name,
            } => {
                if is_staff_reply {
                    self.tickets.mark_staff_reply(&ticket_id);
                }
                // Events for another ticket never touch the open
                // conversation.
                if !self.conversation.is_open_for(&ticket_id) {
                    return;
                }
                self.conversation.apply_message(Message {
                    id: message_id,
                    ticket_id,
                    sender: Sender::from_staff_flag(is_staff_reply),
                    sender_name,
                    body: message,
                    created_at,
                });
            }
            PushEvent::TicketStatusChange {
                ticket_id,
                new_status,
            } => {
                self.tickets.set_status(&ticket_id, new_status);
                if self.conversation.is_open_for(&ticket_id) {
                    self.conversation.set_status(new_status);
                }
            }
        }
    }
}
