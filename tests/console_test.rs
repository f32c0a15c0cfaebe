//! Controller-level tests driving `SupportConsole` against an in-process
//! mock backend. The push adapter is exercised separately; here push frames
//! are injected straight into the event queue, the same path a live
//! subscription uses.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use url::Url;

use stratus_console::{
    AuthToken, ConsoleError, ConsoleEvent, Message, Phase, PushChannel, PushFrame, PushSignal,
    Result, Sender, SupportConsole, SupportTransport, Ticket, TicketCategory, TicketDraft,
    TicketPriority, TicketStatus,
};

fn ticket(id: &str, status: TicketStatus) -> Ticket {
    Ticket {
        id: id.to_string(),
        subject: format!("Subject for {id}"),
        description: format!("Description for {id}"),
        status,
        priority: TicketPriority::Medium,
        category: TicketCategory::Technical,
        created_at: "2026-08-20T09:00:00Z".to_string(),
        updated_at: "2026-08-20T09:00:00Z".to_string(),
        has_staff_reply: false,
    }
}

fn message(id: &str, ticket_id: &str, body: &str) -> Message {
    Message {
        id: id.to_string(),
        ticket_id: ticket_id.to_string(),
        sender: Sender::User,
        sender_name: None,
        body: body.to_string(),
        created_at: "2026-08-20T10:00:00Z".to_string(),
    }
}

#[derive(Default)]
struct MockTransport {
    tickets: Vec<Ticket>,
    replies: HashMap<String, Vec<Message>>,
    /// History fetches for these tickets fail.
    fail_history_for: Option<String>,
    /// Reply submissions fail.
    fail_replies: bool,
    /// History fetches for these tickets block until notified.
    hold: Mutex<HashMap<String, Arc<Notify>>>,
    reply_counter: AtomicUsize,
}

impl MockTransport {
    fn with_tickets(tickets: Vec<Ticket>) -> Self {
        Self {
            tickets,
            ..Default::default()
        }
    }

    fn hold_history(&self, ticket_id: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.hold
            .lock()
            .unwrap()
            .insert(ticket_id.to_string(), Arc::clone(&gate));
        gate
    }
}

#[async_trait]
impl SupportTransport for MockTransport {
    async fn list_tickets(&self, _token: &AuthToken) -> Result<Vec<Ticket>> {
        Ok(self.tickets.clone())
    }

    async fn create_ticket(&self, _token: &AuthToken, draft: &TicketDraft) -> Result<Ticket> {
        let mut created = ticket("T-new", TicketStatus::Open);
        created.subject = draft.subject.clone();
        created.description = draft.message.clone();
        created.priority = draft.priority;
        created.category = draft.category;
        Ok(created)
    }

    async fn fetch_replies(&self, _token: &AuthToken, ticket_id: &str) -> Result<Vec<Message>> {
        let gate = self.hold.lock().unwrap().get(ticket_id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail_history_for.as_deref() == Some(ticket_id) {
            return Err(ConsoleError::Api("HTTP 500".to_string()));
        }
        Ok(self.replies.get(ticket_id).cloned().unwrap_or_default())
    }

    async fn post_reply(&self, _token: &AuthToken, ticket_id: &str, body: &str) -> Result<Message> {
        if self.fail_replies {
            return Err(ConsoleError::Api("HTTP 502".to_string()));
        }
        let n = self.reply_counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Message {
            id: format!("srv-{n}"),
            ticket_id: ticket_id.to_string(),
            sender: Sender::User,
            sender_name: None,
            body: body.to_string(),
            created_at: "2026-08-22T10:00:00Z".to_string(),
        })
    }
}

fn console(transport: MockTransport) -> SupportConsole<MockTransport> {
    // Nothing listens on the discard port; the subscription fails fast with
    // a warning, which the controller tolerates.
    let push = PushChannel::new(Url::parse("http://127.0.0.1:9/").unwrap()).unwrap();
    SupportConsole::new(Arc::new(transport), push)
}

fn token() -> AuthToken {
    AuthToken::new("tok_test")
}

/// Apply queued completions until the history fetch has settled.
async fn settle(console: &mut SupportConsole<MockTransport>) {
    while console.conversation().phase() == Phase::Loading {
        let progressed = tokio::time::timeout(Duration::from_secs(5), console.tick())
            .await
            .expect("timed out waiting for the history fetch");
        assert!(progressed);
    }
}

/// Apply queued completions until the console goes quiet.
async fn drain(console: &mut SupportConsole<MockTransport>) {
    while let Ok(progressed) =
        tokio::time::timeout(Duration::from_millis(250), console.tick()).await
    {
        if !progressed {
            break;
        }
    }
}

fn frame(ticket_id: &str, payload: &str) -> ConsoleEvent {
    ConsoleEvent::Push(PushSignal::Frame(PushFrame {
        ticket_id: ticket_id.to_string(),
        payload: payload.to_string(),
    }))
}

fn bodies(console: &SupportConsole<MockTransport>) -> Vec<String> {
    console
        .conversation()
        .messages()
        .map(|m| m.body.clone())
        .collect()
}

#[tokio::test]
async fn open_renders_description_then_history_in_order() {
    let mut transport = MockTransport::with_tickets(vec![ticket("T1", TicketStatus::Open)]);
    transport.replies.insert(
        "T1".to_string(),
        vec![
            message("m1", "T1", "one"),
            message("m2", "T1", "two"),
            message("m3", "T1", "three"),
        ],
    );
    let mut console = console(transport);

    console.refresh(&token()).await.unwrap();
    console.open("T1", &token()).await.unwrap();
    settle(&mut console).await;

    assert_eq!(console.conversation().phase(), Phase::Active);
    assert_eq!(
        bodies(&console),
        vec!["Description for T1", "one", "two", "three"]
    );
}

#[tokio::test]
async fn send_appends_only_the_server_confirmed_reply() {
    let transport = MockTransport::with_tickets(vec![ticket("T1", TicketStatus::Open)]);
    let mut console = console(transport);

    console.refresh(&token()).await.unwrap();
    console.open("T1", &token()).await.unwrap();
    settle(&mut console).await;

    console.send_message(&token(), "Hello").await.unwrap();
    assert_eq!(bodies(&console), vec!["Description for T1", "Hello"]);

    let last = console.conversation().messages().last().unwrap();
    assert_eq!(last.id, "srv-1");
}

#[tokio::test]
async fn send_failure_appends_nothing() {
    let mut transport = MockTransport::with_tickets(vec![ticket("T1", TicketStatus::Open)]);
    transport.fail_replies = true;
    let mut console = console(transport);

    console.refresh(&token()).await.unwrap();
    console.open("T1", &token()).await.unwrap();
    settle(&mut console).await;

    let result = console.send_message(&token(), "Hello").await;
    assert!(matches!(result, Err(ConsoleError::Api(_))));
    assert_eq!(bodies(&console), vec!["Description for T1"]);
}

#[tokio::test]
async fn send_is_blocked_on_a_closed_ticket() {
    let transport = MockTransport::with_tickets(vec![ticket("T1", TicketStatus::Closed)]);
    let mut console = console(transport);

    console.refresh(&token()).await.unwrap();
    console.open("T1", &token()).await.unwrap();
    settle(&mut console).await;

    assert_eq!(console.conversation().phase(), Phase::Closed);
    let result = console.send_message(&token(), "Hello").await;
    assert!(matches!(result, Err(ConsoleError::TicketClosed)));
    assert_eq!(console.conversation().message_count(), 1);
}

#[tokio::test]
async fn redelivered_push_message_is_applied_once() {
    let transport = MockTransport::with_tickets(vec![ticket("T1", TicketStatus::Open)]);
    let mut console = console(transport);

    console.refresh(&token()).await.unwrap();
    console.open("T1", &token()).await.unwrap();
    settle(&mut console).await;

    let payload = r#"{
        "type": "ticket_message",
        "ticket_id": "T1",
        "message_id": "m9",
        "is_staff_reply": true,
        "message": "We're looking into it",
        "created_at": "2026-08-21T14:02:00Z"
    }"#;
    console.handle_event(frame("T1", payload));
    console.handle_event(frame("T1", payload));

    assert_eq!(
        bodies(&console),
        vec!["Description for T1", "We're looking into it"]
    );
    let staff_reply = console.conversation().messages().last().unwrap();
    assert_eq!(staff_reply.sender, Sender::Admin);
    assert!(console.tickets().get("T1").unwrap().has_staff_reply);
}

#[tokio::test]
async fn foreign_ticket_event_updates_the_list_but_not_the_conversation() {
    let transport = MockTransport::with_tickets(vec![
        ticket("T1", TicketStatus::Open),
        ticket("T2", TicketStatus::Open),
    ]);
    let mut console = console(transport);

    console.refresh(&token()).await.unwrap();
    console.open("T1", &token()).await.unwrap();
    settle(&mut console).await;

    let payload = r#"{
        "type": "ticket_message",
        "ticket_id": "T2",
        "message_id": "m1",
        "is_staff_reply": true,
        "message": "About your other ticket",
        "created_at": "2026-08-21T14:02:00Z"
    }"#;
    console.handle_event(frame("T1", payload));

    assert_eq!(bodies(&console), vec!["Description for T1"]);
    assert!(console.tickets().get("T2").unwrap().has_staff_reply);
    assert!(!console.tickets().get("T1").unwrap().has_staff_reply);
}

#[tokio::test]
async fn status_change_closes_composition_without_appending() {
    let transport = MockTransport::with_tickets(vec![ticket("T1", TicketStatus::Open)]);
    let mut console = console(transport);

    console.refresh(&token()).await.unwrap();
    console.open("T1", &token()).await.unwrap();
    settle(&mut console).await;

    let payload = r#"{"type":"ticket_status_change","ticket_id":"T1","new_status":"closed"}"#;
    console.handle_event(frame("T1", payload));

    assert_eq!(console.conversation().status(), Some(TicketStatus::Closed));
    assert_eq!(console.conversation().phase(), Phase::Closed);
    assert_eq!(console.conversation().message_count(), 1);
    assert_eq!(
        console.tickets().get("T1").unwrap().status,
        TicketStatus::Closed
    );

    let result = console.send_message(&token(), "still there?").await;
    assert!(matches!(result, Err(ConsoleError::TicketClosed)));
}

#[tokio::test]
async fn stale_history_result_is_discarded_after_switching_tickets() {
    let mut transport = MockTransport::with_tickets(vec![
        ticket("T1", TicketStatus::Open),
        ticket("T2", TicketStatus::Open),
    ]);
    transport
        .replies
        .insert("T1".to_string(), vec![message("m1", "T1", "from T1")]);
    transport
        .replies
        .insert("T2".to_string(), vec![message("m2", "T2", "from T2")]);
    let gate = transport.hold_history("T1");
    let mut console = console(transport);

    console.refresh(&token()).await.unwrap();
    console.open("T1", &token()).await.unwrap();
    // Switch before T1's fetch resolves.
    console.open("T2", &token()).await.unwrap();
    settle(&mut console).await;
    assert_eq!(bodies(&console), vec!["Description for T2", "from T2"]);

    // Now let T1's fetch resolve; its result must be discarded.
    gate.notify_one();
    drain(&mut console).await;

    assert_eq!(console.conversation().ticket_id(), Some("T2"));
    assert_eq!(bodies(&console), vec!["Description for T2", "from T2"]);
    assert!(console
        .conversation()
        .messages()
        .all(|m| m.ticket_id == "T2"));
}

#[tokio::test]
async fn history_failure_degrades_but_keeps_the_view_usable() {
    let mut transport = MockTransport::with_tickets(vec![ticket("T1", TicketStatus::Open)]);
    transport.fail_history_for = Some("T1".to_string());
    let mut console = console(transport);

    console.refresh(&token()).await.unwrap();
    console.open("T1", &token()).await.unwrap();
    settle(&mut console).await;

    assert_eq!(console.conversation().phase(), Phase::Active);
    assert_eq!(bodies(&console), vec!["Description for T1"]);

    let notices = console.take_notices();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].contains("failed to load conversation history"));

    // A new message can still be sent without prior context.
    console.send_message(&token(), "Hello").await.unwrap();
    assert_eq!(bodies(&console), vec!["Description for T1", "Hello"]);
}

#[tokio::test]
async fn malformed_frames_are_dropped_without_fallout() {
    let transport = MockTransport::with_tickets(vec![ticket("T1", TicketStatus::Open)]);
    let mut console = console(transport);

    console.refresh(&token()).await.unwrap();
    console.open("T1", &token()).await.unwrap();
    settle(&mut console).await;

    console.handle_event(frame("T1", "not json at all"));
    console.handle_event(frame("T1", r#"{"type":"mystery"}"#));
    console.handle_event(frame("T1", r#"{"type":"connected"}"#));

    assert_eq!(console.conversation().phase(), Phase::Active);
    assert_eq!(bodies(&console), vec!["Description for T1"]);

    // The stream is still consumable after the bad frames.
    let payload = r#"{
        "type": "ticket_message",
        "ticket_id": "T1",
        "message_id": "m1",
        "is_staff_reply": false,
        "message": "still alive",
        "created_at": "2026-08-21T15:00:00Z"
    }"#;
    console.handle_event(frame("T1", payload));
    assert_eq!(bodies(&console), vec!["Description for T1", "still alive"]);
}

#[tokio::test]
async fn close_discards_the_conversation_and_ignores_late_events() {
    let transport = MockTransport::with_tickets(vec![ticket("T1", TicketStatus::Open)]);
    let mut console = console(transport);

    console.refresh(&token()).await.unwrap();
    console.open("T1", &token()).await.unwrap();
    settle(&mut console).await;

    console.close();
    assert_eq!(console.conversation().phase(), Phase::Idle);

    let payload = r#"{
        "type": "ticket_message",
        "ticket_id": "T1",
        "message_id": "m1",
        "is_staff_reply": true,
        "message": "late",
        "created_at": "2026-08-21T15:00:00Z"
    }"#;
    console.handle_event(frame("T1", payload));
    assert_eq!(console.conversation().message_count(), 0);

    let result = console.send_message(&token(), "anyone?").await;
    assert!(matches!(result, Err(ConsoleError::NoOpenTicket)));
}

#[tokio::test]
async fn create_ticket_joins_the_list() {
    let transport = MockTransport::with_tickets(Vec::new());
    let mut console = console(transport);

    let draft = TicketDraft {
        subject: "Need more RAM".to_string(),
        message: "Please resize my instance".to_string(),
        priority: TicketPriority::High,
        category: TicketCategory::Technical,
    };
    let created = console.create_ticket(&token(), &draft).await.unwrap();

    assert_eq!(created.status, TicketStatus::Open);
    assert_eq!(console.tickets().len(), 1);
    assert_eq!(
        console.tickets().get(&created.id).unwrap().subject,
        "Need more RAM"
    );
}
