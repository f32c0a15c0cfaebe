//! The caller's ticket list and its filters.

use crate::types::{Ticket, TicketCategory, TicketStatus};

/// Client-side filter over the ticket list.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub category: Option<TicketCategory>,
    /// Case-insensitive substring match on subject and description.
    pub search: Option<String>,
}

impl TicketFilter {
    pub fn matches(&self, ticket: &Ticket) -> bool {
        if let Some(status) = self.status {
            if ticket.status != status {
                return false;
            }
        }
        if let Some(category) = self.category {
            if ticket.category != category {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !ticket.subject.to_lowercase().contains(&needle)
                && !ticket.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

/// Holds the set of tickets belonging to the current user. Mutated by list
/// refreshes and by push events (status changes, staff-reply flags).
#[derive(Debug, Default)]
pub struct TicketList {
    tickets: Vec<Ticket>,
}

impl TicketList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole list with a fresh fetch.
    pub fn replace(&mut self, tickets: Vec<Ticket>) {
        self.tickets = tickets;
    }

    /// Insert a ticket, replacing any existing entry with the same id.
    pub fn upsert(&mut self, ticket: Ticket) {
        match self.tickets.iter_mut().find(|t| t.id == ticket.id) {
            Some(existing) => *existing = ticket,
            None => self.tickets.push(ticket),
        }
    }

    pub fn get(&self, ticket_id: &str) -> Option<&Ticket> {
        self.tickets.iter().find(|t| t.id == ticket_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ticket> {
        self.tickets.iter()
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    /// Reflect a pushed status value. Returns whether the ticket was found.
    pub fn set_status(&mut self, ticket_id: &str, status: TicketStatus) -> bool {
        match self.tickets.iter_mut().find(|t| t.id == ticket_id) {
            Some(ticket) => {
                ticket.status = status;
                true
            }
            None => false,
        }
    }

    /// Record that staff replied to a ticket, whether or not it is the one
    /// currently open. Returns whether the ticket was found.
    pub fn mark_staff_reply(&mut self, ticket_id: &str) -> bool {
        match self.tickets.iter_mut().find(|t| t.id == ticket_id) {
            Some(ticket) => {
                ticket.has_staff_reply = true;
                true
            }
            None => false,
        }
    }

    /// Tickets passing the filter, most recently updated first.
    pub fn filtered(&self, filter: &TicketFilter) -> Vec<&Ticket> {
        let mut matched: Vec<&Ticket> =
            self.tickets.iter().filter(|t| filter.matches(t)).collect();
        matched.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TicketPriority;

    fn ticket(id: &str, subject: &str, status: TicketStatus, updated_at: &str) -> Ticket {
        Ticket {
            id: id.to_string(),
            subject: subject.to_string(),
            description: String::new(),
            status,
            priority: TicketPriority::Medium,
            category: TicketCategory::General,
            created_at: "2026-08-01T00:00:00Z".to_string(),
            updated_at: updated_at.to_string(),
            has_staff_reply: false,
        }
    }

    fn sample() -> TicketList {
        let mut list = TicketList::new();
        list.replace(vec![
            ticket("T1", "VPS down", TicketStatus::Open, "2026-08-02T00:00:00Z"),
            ticket(
                "T2",
                "Invoice question",
                TicketStatus::Resolved,
                "2026-08-04T00:00:00Z",
            ),
            ticket(
                "T3",
                "Add IPv6",
                TicketStatus::Open,
                "2026-08-03T00:00:00Z",
            ),
        ]);
        list
    }

    #[test]
    fn test_filter_by_status() {
        let list = sample();
        let filter = TicketFilter {
            status: Some(TicketStatus::Open),
            ..Default::default()
        };
        let ids: Vec<&str> = list.filtered(&filter).iter().map(|t| t.id.as_str()).collect();
        // Most recently updated first.
        assert_eq!(ids, vec!["T3", "T1"]);
    }

    #[test]
    fn test_filter_by_search_is_case_insensitive() {
        let list = sample();
        let filter = TicketFilter {
            search: Some("vps".to_string()),
            ..Default::default()
        };
        let matched = list.filtered(&filter);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, "T1");
    }

    #[test]
    fn test_set_status_and_staff_reply() {
        let mut list = sample();
        assert!(list.set_status("T1", TicketStatus::Closed));
        assert_eq!(list.get("T1").unwrap().status, TicketStatus::Closed);

        assert!(list.mark_staff_reply("T3"));
        assert!(list.get("T3").unwrap().has_staff_reply);

        assert!(!list.set_status("T9", TicketStatus::Open));
        assert!(!list.mark_staff_reply("T9"));
    }

    #[test]
    fn test_upsert_replaces_existing() {
        let mut list = sample();
        let mut updated = ticket("T1", "VPS down", TicketStatus::InProgress, "2026-08-05T00:00:00Z");
        updated.has_staff_reply = true;
        list.upsert(updated);

        assert_eq!(list.len(), 3);
        let entry = list.get("T1").unwrap();
        assert_eq!(entry.status, TicketStatus::InProgress);
        assert!(entry.has_staff_reply);
    }
}
