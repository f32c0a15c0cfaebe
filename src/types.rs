use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConsoleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    /// Closed tickets are read-only; no further replies can be composed.
    pub fn is_closed(&self) -> bool {
        matches!(self, TicketStatus::Closed)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicketStatus::Open => write!(f, "open"),
            TicketStatus::InProgress => write!(f, "in_progress"),
            TicketStatus::Resolved => write!(f, "resolved"),
            TicketStatus::Closed => write!(f, "closed"),
        }
    }
}

impl FromStr for TicketStatus {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(TicketStatus::Open),
            "in_progress" => Ok(TicketStatus::InProgress),
            "resolved" => Ok(TicketStatus::Resolved),
            "closed" => Ok(TicketStatus::Closed),
            _ => Err(ConsoleError::InvalidStatus(s.to_string())),
        }
    }
}

pub const VALID_STATUSES: &[&str] = &["open", "in_progress", "resolved", "closed"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Urgent,
    High,
    #[default]
    Medium,
    Low,
}

impl TicketPriority {
    /// Sort rank, most urgent first.
    pub fn rank(&self) -> u8 {
        match self {
            TicketPriority::Urgent => 0,
            TicketPriority::High => 1,
            TicketPriority::Medium => 2,
            TicketPriority::Low => 3,
        }
    }
}

impl fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicketPriority::Urgent => write!(f, "urgent"),
            TicketPriority::High => write!(f, "high"),
            TicketPriority::Medium => write!(f, "medium"),
            TicketPriority::Low => write!(f, "low"),
        }
    }
}

impl FromStr for TicketPriority {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "urgent" => Ok(TicketPriority::Urgent),
            "high" => Ok(TicketPriority::High),
            "medium" => Ok(TicketPriority::Medium),
            "low" => Ok(TicketPriority::Low),
            _ => Err(ConsoleError::InvalidPriority(s.to_string())),
        }
    }
}

pub const VALID_PRIORITIES: &[&str] = &["urgent", "high", "medium", "low"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TicketCategory {
    Technical,
    Billing,
    #[default]
    General,
    FeatureRequest,
}

impl fmt::Display for TicketCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicketCategory::Technical => write!(f, "technical"),
            TicketCategory::Billing => write!(f, "billing"),
            TicketCategory::General => write!(f, "general"),
            TicketCategory::FeatureRequest => write!(f, "feature_request"),
        }
    }
}

impl FromStr for TicketCategory {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "technical" => Ok(TicketCategory::Technical),
            "billing" => Ok(TicketCategory::Billing),
            "general" => Ok(TicketCategory::General),
            "feature_request" => Ok(TicketCategory::FeatureRequest),
            _ => Err(ConsoleError::InvalidCategory(s.to_string())),
        }
    }
}

pub const VALID_CATEGORIES: &[&str] = &["technical", "billing", "general", "feature_request"];

/// Message author classification. The push channel carries this as an
/// `is_staff_reply` boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Admin,
}

impl Sender {
    pub fn from_staff_flag(is_staff_reply: bool) -> Self {
        if is_staff_reply {
            Sender::Admin
        } else {
            Sender::User
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Sender::Admin)
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Admin => write!(f, "admin"),
        }
    }
}

/// One support conversation, as returned by the backend.
///
/// Status transitions are monotonic in practice (`open` → `in_progress` →
/// `resolved`/`closed`) but the client never enforces this; it reflects
/// whatever the server pushes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub subject: String,
    #[serde(default)]
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub category: TicketCategory,
    /// ISO-8601, server-authored.
    pub created_at: String,
    /// ISO-8601, server-authored.
    pub updated_at: String,
    #[serde(default)]
    pub has_staff_reply: bool,
}

/// One line of conversation within a ticket. Identifiers are unique within a
/// ticket and are the deduplication key for push redelivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub ticket_id: String,
    pub sender: Sender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(rename = "message")]
    pub body: String,
    /// ISO-8601, server-authored. Messages within a ticket are totally
    /// ordered by this field.
    pub created_at: String,
}

/// Payload for opening a new ticket. The server assigns the identifier and
/// the initial `open` status.
#[derive(Debug, Clone, Serialize)]
pub struct TicketDraft {
    pub subject: String,
    pub message: String,
    pub priority: TicketPriority,
    pub category: TicketCategory,
}
