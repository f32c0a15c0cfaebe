pub mod api;
pub mod config;
pub mod controller;
pub mod conversation;
pub mod error;
pub mod events;
pub mod push;
pub mod sse;
pub mod tickets;
pub mod types;

pub use api::{SupportApi, SupportTransport};
pub use config::{AuthToken, Config};
pub use controller::{ConsoleEvent, SupportConsole};
pub use conversation::{Conversation, Phase};
pub use error::{ConsoleError, Result};
pub use events::PushEvent;
pub use push::{PushChannel, PushFrame, PushSignal, Subscription};
pub use sse::SseDecoder;
pub use tickets::{TicketFilter, TicketList};
pub use types::{
    Message, Sender, Ticket, TicketCategory, TicketDraft, TicketPriority, TicketStatus,
    VALID_CATEGORIES, VALID_PRIORITIES, VALID_STATUSES,
};
