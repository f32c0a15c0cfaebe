use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tabled::{Table, Tabled};
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;
use url::Url;

use stratus_console::{
    AuthToken, Config, ConsoleError, Message, Phase, PushChannel, Result, Sender, SupportApi,
    SupportConsole, TicketCategory, TicketDraft, TicketFilter, TicketPriority, TicketStatus,
    VALID_CATEGORIES, VALID_PRIORITIES, VALID_STATUSES,
};

#[derive(Parser)]
#[command(name = "stratus")]
#[command(about = "Support console for the Stratus platform")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List your support tickets
    #[command(visible_alias = "ls")]
    Tickets {
        /// Filter by status: open, in_progress, resolved, closed
        #[arg(short, long, value_parser = parse_status)]
        status: Option<TicketStatus>,

        /// Filter by category: technical, billing, general, feature_request
        #[arg(short, long, value_parser = parse_category)]
        category: Option<TicketCategory>,

        /// Substring match on subject and description
        #[arg(long)]
        search: Option<String>,
    },

    /// Open a new support ticket
    #[command(visible_alias = "c")]
    Create {
        /// Ticket subject
        #[arg(short, long)]
        subject: String,

        /// Description of the problem
        #[arg(short, long)]
        message: String,

        /// Priority: urgent, high, medium, low (default: medium)
        #[arg(short, long, default_value = "medium", value_parser = parse_priority)]
        priority: TicketPriority,

        /// Category: technical, billing, general, feature_request (default: general)
        #[arg(long, default_value = "general", value_parser = parse_category)]
        category: TicketCategory,
    },

    /// Open a ticket's conversation and follow live replies
    #[command(visible_alias = "o")]
    Open {
        /// Ticket ID
        id: String,
    },

    /// Show or edit configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the resolved configuration
    Show,
    /// Set a value (keys: api_url, token)
    Set { key: String, value: String },
    /// Print the config file path
    Path,
}

fn parse_status(s: &str) -> std::result::Result<TicketStatus, String> {
    s.parse()
        .map_err(|_| format!("valid values: {}", VALID_STATUSES.join(", ")))
}

fn parse_priority(s: &str) -> std::result::Result<TicketPriority, String> {
    s.parse()
        .map_err(|_| format!("valid values: {}", VALID_PRIORITIES.join(", ")))
}

fn parse_category(s: &str) -> std::result::Result<TicketCategory, String> {
    s.parse()
        .map_err(|_| format!("valid values: {}", VALID_CATEGORIES.join(", ")))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(errors) = e.field_errors() {
                eprintln!("Error: the server rejected the submission:");
                for error in errors {
                    eprintln!("  - {error}");
                }
            } else {
                eprintln!("Error: {e}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Config { action } = &cli.command {
        return cmd_config(action);
    }

    let config = Config::load()?;
    let base_url = Url::parse(&config.api_url())?;
    let token = config.auth_token().ok_or_else(|| {
        ConsoleError::Auth(
            "no API token configured. Set STRATUS_TOKEN or run: stratus config set token <token>"
                .to_string(),
        )
    })?;

    let api = Arc::new(SupportApi::new(base_url.clone())?);
    let push = PushChannel::new(base_url)?;
    let mut console = SupportConsole::new(api, push);

    match cli.command {
        Commands::Tickets {
            status,
            category,
            search,
        } => {
            console.refresh(&token).await?;
            let filter = TicketFilter {
                status,
                category,
                search,
            };
            cmd_tickets(&console, &filter);
            Ok(())
        }
        Commands::Create {
            subject,
            message,
            priority,
            category,
        } => {
            let draft = TicketDraft {
                subject,
                message,
                priority,
                category,
            };
            let ticket = console.create_ticket(&token, &draft).await?;
            println!("Created ticket {} ({})", ticket.id, ticket.subject);
            Ok(())
        }
        Commands::Open { id } => cmd_open(&mut console, &token, &id).await,
        Commands::Config { .. } => unreachable!("handled above"),
    }
}

#[derive(Tabled)]
struct TicketRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Subject")]
    subject: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Updated")]
    updated: String,
    #[tabled(rename = "Staff")]
    staff: String,
}

fn cmd_tickets<T: stratus_console::SupportTransport + 'static>(
    console: &SupportConsole<T>,
    filter: &TicketFilter,
) {
    let tickets = console.tickets().filtered(filter);
    if tickets.is_empty() {
        println!("No tickets found.");
        return;
    }

    let rows: Vec<TicketRow> = tickets
        .iter()
        .map(|t| TicketRow {
            id: t.id.clone(),
            subject: t.subject.clone(),
            status: t.status.to_string(),
            priority: t.priority.to_string(),
            category: t.category.to_string(),
            updated: t.updated_at.clone(),
            staff: if t.has_staff_reply { "replied" } else { "" }.to_string(),
        })
        .collect();

    println!("{}", Table::new(rows));
}

fn print_message(message: &Message) {
    let who = match (&message.sender, message.sender_name.as_deref()) {
        (Sender::Admin, Some(name)) => format!("{name} (staff)"),
        (Sender::Admin, None) => "staff".to_string(),
        (Sender::User, Some(name)) => name.to_string(),
        (Sender::User, None) => "you".to_string(),
    };
    println!("[{}] {}: {}", message.created_at, who, message.body);
}

async fn cmd_open<T: stratus_console::SupportTransport + 'static>(
    console: &mut SupportConsole<T>,
    token: &AuthToken,
    id: &str,
) -> Result<()> {
    console.refresh(token).await?;
    console.open(id, token).await?;

    // Wait for the history fetch to settle (success or degraded failure).
    while console.conversation().phase() == Phase::Loading {
        if !console.tick().await {
            break;
        }
    }
    for notice in console.take_notices() {
        eprintln!("! {notice}");
    }

    for message in console.conversation().messages() {
        print_message(message);
    }
    let mut shown = console.conversation().message_count();
    let mut status = console.conversation().status();
    if status.map(|s| s.is_closed()).unwrap_or(false) {
        println!("This ticket is closed; replies are disabled.");
    } else {
        println!("--- type a reply and press Enter; Ctrl-D to leave ---");
    }

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            event = console.next_event() => {
                let Some(event) = event else { break };
                console.handle_event(event);

                for message in console.conversation().messages().skip(shown) {
                    print_message(message);
                }
                shown = console.conversation().message_count();

                let current = console.conversation().status();
                if current != status {
                    if let Some(new_status) = current {
                        println!("--- ticket status is now {new_status} ---");
                    }
                    status = current;
                }
                for notice in console.take_notices() {
                    eprintln!("! {notice}");
                }
            }
            line = lines.next_line() => {
                let Some(text) = line? else { break };
                if text.trim().is_empty() {
                    continue;
                }
                match console.send_message(token, &text).await {
                    Ok(()) => {
                        for message in console.conversation().messages().skip(shown) {
                            print_message(message);
                        }
                        shown = console.conversation().message_count();
                    }
                    Err(ConsoleError::TicketClosed) => {
                        eprintln!("This ticket is closed; replies are disabled.");
                    }
                    Err(e) => {
                        eprintln!("Failed to send reply: {e}. Your text was not sent; try again.");
                    }
                }
            }
        }
    }

    console.close();
    Ok(())
}

fn cmd_config(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            println!("api_url: {}", config.api_url());
            println!(
                "token: {}",
                if config.auth_token().is_some() {
                    "(set)"
                } else {
                    "(not set)"
                }
            );
            Ok(())
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            match key.as_str() {
                "api_url" => config.api_url = Some(value.clone()),
                "token" => config.token = Some(value.clone()),
                _ => {
                    return Err(ConsoleError::Config(format!(
                        "unknown key '{key}', expected 'api_url' or 'token'"
                    )));
                }
            }
            config.save()?;
            println!("Updated {key}.");
            Ok(())
        }
        ConfigAction::Path => {
            match Config::config_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("(no config directory available)"),
            }
            Ok(())
        }
    }
}
