// myatri — terminal client for the Myatri ride-tracking stores
//
// Plays the passenger, driver and messaging screens against the durable
// on-disk store so state carries over between invocations.

mod config;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use colored::*;
use myatri_core::chat::conversation_for;
use myatri_core::{
    AuthSessionUser, ChatSender, ChatThread, MyatriCore, OutgoingMessage, PassengerHistoryEntry,
    RequestStatus, SimulatedBusProvider, UserRole,
};

#[derive(Parser)]
#[command(name = "myatri")]
#[command(about = "Myatri — ride tracking for passengers and drivers", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List nearby buses
    Buses,
    /// Ping the driver of a bus
    Ping { bus_id: u32 },
    /// Show your recent driver pings
    History,
    /// Show the driver request queue
    Requests {
        #[arg(short, long)]
        pending: bool,
    },
    /// Acknowledge a passenger request (driver)
    Ack { request_id: String },
    /// Mark a passenger request completed (driver)
    Complete { request_id: String },
    /// Clear history and the request queue
    Clear,
    /// Message drivers from your trip history
    Chat {
        #[command(subcommand)]
        action: ChatAction,
    },
    /// Remember the signed-in user
    Login {
        id: String,
        name: String,
        email: String,
        #[arg(short, long, default_value = "passenger")]
        role: UserRole,
    },
    /// Forget the signed-in user
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Configure settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ChatAction {
    /// Drivers you can message
    Drivers,
    /// All conversations
    Threads,
    /// One conversation
    Show { driver_id: String },
    /// Send a message
    Send {
        driver_id: String,
        text: String,
        /// Reply as the driver instead of the passenger
        #[arg(long, default_value = "passenger")]
        from: ChatSender,
    },
    /// Delete all conversations
    Clear,
}

#[derive(Subcommand)]
enum ConfigAction {
    Set { key: String, value: String },
    Get { key: String },
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = config::Config::load()?;

    let command = match cli.command {
        Commands::Config { action } => return cmd_config(config, action),
        command => command,
    };

    let storage_dir = config.storage_dir()?;
    let core = MyatriCore::with_storage(&storage_dir)
        .with_context(|| format!("Failed to open store at {}", storage_dir.display()))?;
    tracing::debug!(storage = %storage_dir.display(), "Store ready");

    let result = match command {
        Commands::Buses => cmd_buses(&core, &config).await,
        Commands::Ping { bus_id } => cmd_ping(&core, &config, bus_id).await,
        Commands::History => cmd_history(&core),
        Commands::Requests { pending } => cmd_requests(&core, pending),
        Commands::Ack { request_id } => {
            cmd_status(&core, &request_id, RequestStatus::Acknowledged)
        }
        Commands::Complete { request_id } => {
            cmd_status(&core, &request_id, RequestStatus::Completed)
        }
        Commands::Clear => cmd_clear(&core),
        Commands::Chat { action } => cmd_chat(&core, action),
        Commands::Login {
            id,
            name,
            email,
            role,
        } => cmd_login(&core, id, name, email, role),
        Commands::Logout => cmd_logout(&core),
        Commands::Whoami => cmd_whoami(&core),
        Commands::Config { .. } => Ok(()),
    };

    core.flush();
    result
}

async fn refresh_buses(core: &MyatriCore, config: &config::Config) -> Result<()> {
    let provider = SimulatedBusProvider::new(config.bus_fetch_delay());
    core.passengers
        .refresh_buses(&provider)
        .await
        .context("Failed to fetch bus listing")?;
    Ok(())
}

async fn cmd_buses(core: &MyatriCore, config: &config::Config) -> Result<()> {
    refresh_buses(core, config).await?;

    println!("{}", "Nearby buses".bold());
    println!();
    for bus in core.passengers.buses() {
        let driver = bus
            .driver()
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| "no driver on record".to_string());
        println!(
            "  {} {} {}",
            format!("#{}", bus.id).bright_cyan(),
            bus.number.bold(),
            bus.route
        );
        println!(
            "      ETA {} · {} · {} occupancy · {} seats · {}",
            bus.eta.bright_green(),
            bus.distance,
            bus.occupancy,
            bus.seats,
            driver.dimmed()
        );
    }

    Ok(())
}

async fn cmd_ping(core: &MyatriCore, config: &config::Config, bus_id: u32) -> Result<()> {
    refresh_buses(core, config).await?;

    let bus = core
        .passengers
        .bus(bus_id)
        .with_context(|| format!("No bus with id {bus_id}"))?;
    let entry = core.passengers.record_request(&bus);

    println!("  {} Driver notified", "✓".green());
    println!("  Request: {}", entry.request_id.bright_cyan());
    println!("  Bus:     {} ({})", entry.bus.number.bold(), entry.bus.route);
    Ok(())
}

fn cmd_history(core: &MyatriCore) -> Result<()> {
    let history = core.passengers.passenger_history();

    println!("{}", "Recent driver pings".bold());
    println!();
    if history.is_empty() {
        println!("  {}", "No requests yet".dimmed());
        return Ok(());
    }
    for entry in &history {
        print_entry(entry);
    }
    Ok(())
}

fn cmd_requests(core: &MyatriCore, pending_only: bool) -> Result<()> {
    let requests = if pending_only {
        core.passengers.pending_requests()
    } else {
        core.passengers.driver_requests()
    };

    println!("{}", "Passenger requests".bold());
    println!();
    if requests.is_empty() {
        println!("  {}", "No passenger requests".dimmed());
        return Ok(());
    }
    for request in &requests {
        print_entry(request);
    }
    Ok(())
}

fn cmd_status(core: &MyatriCore, request_id: &str, status: RequestStatus) -> Result<()> {
    let current = core
        .passengers
        .find_request(request_id)
        .with_context(|| format!("No request with id {request_id}"))?;

    if core.passengers.update_status(request_id, status) {
        println!("  {} {} → {}", "✓".green(), request_id.bright_cyan(), status.label());
    } else {
        println!(
            "  {} {} stays {}",
            "•".yellow(),
            request_id.bright_cyan(),
            current.status.label()
        );
    }
    Ok(())
}

fn cmd_clear(core: &MyatriCore) -> Result<()> {
    core.passengers.clear();
    println!("  {} History cleared", "✓".green());
    Ok(())
}

fn cmd_chat(core: &MyatriCore, action: ChatAction) -> Result<()> {
    match action {
        ChatAction::Drivers => {
            let drivers = core.eligible_drivers();
            println!("{}", "Drivers you can message".bold());
            println!();
            if drivers.is_empty() {
                println!("  {}", "Ping a bus first to start a conversation".dimmed());
            }
            for driver in drivers {
                println!(
                    "  {} {} (bus {})",
                    driver.driver_id.bright_cyan(),
                    driver.driver_name,
                    driver.bus_number
                );
            }
        }
        ChatAction::Threads => {
            let threads = core.chat.threads();
            println!("{}", "Conversations".bold());
            println!();
            if threads.is_empty() {
                println!("  {}", "No conversations yet".dimmed());
            }
            for thread in threads {
                let preview = thread
                    .last_message()
                    .map(|m| m.text.clone())
                    .unwrap_or_default();
                println!(
                    "  {} {} ({} messages) {}",
                    thread.driver_id.bright_cyan(),
                    thread.driver_name.bold(),
                    thread.messages.len(),
                    preview.dimmed()
                );
            }
        }
        ChatAction::Show { driver_id } => {
            let driver = core
                .eligible_drivers()
                .into_iter()
                .find(|d| d.driver_id == driver_id);
            let thread = match driver {
                Some(driver) => conversation_for(&driver, &core.chat.threads()),
                None => core
                    .chat
                    .thread(&driver_id)
                    .with_context(|| format!("No conversation with {driver_id}"))?,
            };
            print_thread(&thread);
        }
        ChatAction::Send {
            driver_id,
            text,
            from,
        } => {
            let message = match from {
                ChatSender::Passenger => core.message_driver(&driver_id, &text)?,
                ChatSender::Driver => {
                    let thread = core
                        .chat
                        .thread(&driver_id)
                        .with_context(|| format!("No conversation with {driver_id}"))?;
                    let text = myatri_core::chat::prepare_draft(&text)
                        .context("Message is empty")?
                        .to_string();
                    core.chat.send_message(OutgoingMessage {
                        driver_id: thread.driver_id,
                        driver_name: thread.driver_name,
                        sender: ChatSender::Driver,
                        text,
                    })
                }
            };
            println!("  {} Sent to {}", "✓".green(), message.driver_name.bold());
        }
        ChatAction::Clear => {
            core.chat.clear();
            println!("  {} Conversations cleared", "✓".green());
        }
    }
    Ok(())
}

fn cmd_login(
    core: &MyatriCore,
    id: String,
    name: String,
    email: String,
    role: UserRole,
) -> Result<()> {
    let user = AuthSessionUser {
        id,
        name,
        email,
        role,
    };
    core.session.set_user(&user);
    println!("  {} Signed in as {} ({})", "✓".green(), user.name.bold(), user.role);
    Ok(())
}

fn cmd_logout(core: &MyatriCore) -> Result<()> {
    core.session.clear();
    println!("  {} Signed out", "✓".green());
    Ok(())
}

fn cmd_whoami(core: &MyatriCore) -> Result<()> {
    match core.session.user() {
        Some(user) => {
            println!("{}", "Signed in".bold());
            println!("  ID:    {}", user.id.bright_cyan());
            println!("  Name:  {}", user.name);
            println!("  Email: {}", user.email);
            println!("  Role:  {}", user.role);
        }
        None => println!("  {}", "Not signed in".dimmed()),
    }
    Ok(())
}

fn cmd_config(mut config: config::Config, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Set { key, value } => {
            config.set(&key, &value)?;
            config.save()?;
            println!("  {} {} = {}", "✓".green(), key.bold(), value);
        }
        ConfigAction::Get { key } => match config.get(&key) {
            Some(value) => println!("{}", value),
            None => println!("  {}", format!("{} is not set", key).dimmed()),
        },
        ConfigAction::List => {
            println!("{}", "Configuration".bold());
            for (key, value) in config.list() {
                println!("  {:<20} {}", key, value);
            }
        }
    }
    Ok(())
}

fn print_entry(entry: &PassengerHistoryEntry) {
    let status = match entry.status {
        RequestStatus::Pending => entry.status.label().yellow(),
        RequestStatus::Acknowledged => entry.status.label().green(),
        RequestStatus::Completed => entry.status.label().dimmed(),
    };
    println!(
        "  {} {} {}",
        format_time(&entry.requested_at).dimmed(),
        entry.bus.number.bold(),
        entry.bus.route
    );
    println!("      {} · {}", entry.request_id.bright_cyan(), status);
}

fn print_thread(thread: &ChatThread) {
    println!("{}", thread.driver_name.bold());
    println!();
    if thread.messages.is_empty() {
        println!("  {}", "Say hello to your driver".dimmed());
    }
    for message in &thread.messages {
        let who = match message.sender {
            ChatSender::Passenger => "you".bright_blue(),
            ChatSender::Driver => "driver".bright_magenta(),
        };
        println!(
            "  {} {}: {}",
            format_time(&message.timestamp).dimmed(),
            who,
            message.text
        );
    }
}

fn format_time(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| dt.with_timezone(&Local).format("%b %-d, %-I:%M %p").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}
