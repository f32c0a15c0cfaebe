//! In-memory projection of one open ticket's conversation.
//!
//! Single-writer: only the controller mutates this state; the view layer
//! reads it. The first rendered message is synthesized from the ticket's own
//! description and is always first; server-assigned message identifiers are
//! the deduplication key for everything after it.

use crate::types::{Message, Sender, Ticket, TicketStatus};

/// Lifecycle of the open conversation.
///
/// `Loading` covers the history fetch; it resolves to `Active` on success
/// *and* on failure (degraded: empty history, subscription still live).
/// `Closed` blocks message composition but still accepts status and metadata
/// events. `Idle` is both the initial state and the state after every
/// explicit close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Active,
    Closed,
}

#[derive(Debug, Default)]
pub struct Conversation {
    phase: Phase,
    ticket: Option<Ticket>,
    opening: Option<Message>,
    replies: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn ticket(&self) -> Option<&Ticket> {
        self.ticket.as_ref()
    }

    pub fn ticket_id(&self) -> Option<&str> {
        self.ticket.as_ref().map(|t| t.id.as_str())
    }

    pub fn status(&self) -> Option<TicketStatus> {
        self.ticket.as_ref().map(|t| t.status)
    }

    /// True when `ticket_id` names the currently open ticket.
    pub fn is_open_for(&self, ticket_id: &str) -> bool {
        self.ticket_id() == Some(ticket_id)
    }

    /// All visible messages: the synthesized description first, then replies
    /// in their accumulated order.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.opening.iter().chain(self.replies.iter())
    }

    pub fn message_count(&self) -> usize {
        self.opening.iter().count() + self.replies.len()
    }

    /// Whether composing a reply is currently allowed. Sends are accepted
    /// while the history is still loading; `finish_load` merges rather than
    /// overwrites, so nothing sent in that window is lost.
    pub fn can_send(&self) -> bool {
        matches!(self.phase, Phase::Loading | Phase::Active)
    }

    /// Reset to `ticket` with an empty reply list and synthesize the opening
    /// message from its description.
    pub fn begin(&mut self, ticket: Ticket) {
        // The description is not a real message row; give it an identifier
        // no server-assigned id can collide with.
        self.opening = Some(Message {
            id: format!("{}/description", ticket.id),
            ticket_id: ticket.id.clone(),
            sender: Sender::User,
            sender_name: None,
            body: ticket.description.clone(),
            created_at: ticket.created_at.clone(),
        });
        self.replies.clear();
        self.phase = Phase::Loading;
        self.ticket = Some(ticket);
    }

    /// Populate from the history fetch, preserving server order. Messages
    /// that already arrived live (push frames or confirmed sends during the
    /// fetch) are kept, deduplicated by id.
    pub fn finish_load(&mut self, history: Vec<Message>) {
        let live = std::mem::take(&mut self.replies);
        for message in history.into_iter().chain(live) {
            if !self.contains(&message.id) {
                self.replies.push(message);
            }
        }
        self.phase = self.phase_for_status();
    }

    /// The history fetch failed; keep whatever arrived live and make the
    /// view usable anyway.
    pub fn fail_load(&mut self) {
        self.phase = self.phase_for_status();
    }

    /// Idempotent append: a message whose id is already present is ignored.
    /// Returns whether the message was added.
    pub fn apply_message(&mut self, message: Message) -> bool {
        if matches!(self.phase, Phase::Idle) {
            return false;
        }
        if self.contains(&message.id) {
            return false;
        }
        self.replies.push(message);
        true
    }

    pub fn contains(&self, message_id: &str) -> bool {
        self.opening.iter().any(|m| m.id == message_id)
            || self.replies.iter().any(|m| m.id == message_id)
    }

    /// Reflect a server-pushed status value. The conversation follows the
    /// value wherever it goes, including back out of `closed`.
    pub fn set_status(&mut self, status: TicketStatus) {
        if let Some(ticket) = &mut self.ticket {
            ticket.status = status;
        }
        if matches!(self.phase, Phase::Active | Phase::Closed) {
            self.phase = self.phase_for_status();
        }
    }

    /// Discard everything and return to `Idle`.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn phase_for_status(&self) -> Phase {
        match self.status() {
            Some(status) if status.is_closed() => Phase::Closed,
            _ => Phase::Active,
        }
    }
}
