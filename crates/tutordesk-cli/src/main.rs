use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use tutordesk_core::analytics;
use tutordesk_core::availability::AvailabilityManager;
use tutordesk_core::config::TutordeskConfig;
use tutordesk_core::grid;
use tutordesk_core::history::{ActivityAction, ActivityEvent, HistoryLogger};
use tutordesk_core::model::*;
use tutordesk_core::profile::ProfileStore;
use tutordesk_core::remote::{create_source, Source};
use tutordesk_core::sessions::SessionService;
use tutordesk_core::storage::{create_backend, Storage};

#[derive(Parser)]
#[command(name = "tutordesk", about = "Tutordesk: tutor availability and sessions", version)]
enum Cli {
    /// Manage availability slots
    #[command(subcommand)]
    Slots(SlotsCommand),
    /// Show the weekly availability grid
    Week {
        /// Any date in the week to show (YYYY-MM-DD, default: today)
        #[arg(long)]
        start: Option<String>,
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// List or accept tutoring sessions
    #[command(subcommand)]
    Sessions(SessionsCommand),
    /// Analytics over completed sessions
    Analytics {
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the tutor profile
    Profile {
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Show recent activity
    History {
        /// Maximum number of events to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Subcommand)]
enum SlotsCommand {
    /// List availability slots with their indexes
    List {
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a slot: a weekday name (recurring) or YYYY-MM-DD (one-time)
    Add {
        day: String,
        /// Start time, HH:MM
        start: String,
        /// End time, HH:MM
        end: String,
    },
    /// Remove the slot at an index shown by `slots list`
    Remove {
        #[arg(allow_negative_numbers = true)]
        index: i64,
    },
}

#[derive(Subcommand)]
enum SessionsCommand {
    /// List sessions
    List {
        /// Filter by student, subject or topic
        #[arg(short, long)]
        query: Option<String>,
        /// Status tab: all, upcoming, pending, completed
        #[arg(short, long, default_value = "all")]
        tab: String,
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Accept a pending session request
    Accept { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = TutordeskConfig::load(Some(&std::env::current_dir()?))
        .unwrap_or_else(|_| TutordeskConfig::default_config());

    run(cli, &config).await
}

async fn run(cli: Cli, config: &TutordeskConfig) -> Result<()> {
    let history = HistoryLogger::with_path(config.history_path(), config.history.enabled);
    match cli {
        Cli::Slots(cmd) => {
            let storage = make_storage(config)?;
            let mut manager =
                AvailabilityManager::load(storage, config.availability.storage_key.as_str());
            match cmd {
                SlotsCommand::List { json } => cmd_slots_list(&manager, json),
                SlotsCommand::Add { day, start, end } => {
                    cmd_slots_add(&mut manager, &history, &day, &start, &end)
                }
                SlotsCommand::Remove { index } => cmd_slots_remove(&mut manager, &history, index),
            }
        }
        Cli::Week { start, json } => {
            let storage = make_storage(config)?;
            let manager =
                AvailabilityManager::load(storage, config.availability.storage_key.as_str());
            let service = make_sessions(config)?;
            cmd_week(config, &manager, &service, start.as_deref(), json).await
        }
        Cli::Sessions(SessionsCommand::List { query, tab, json }) => {
            let service = make_sessions(config)?;
            cmd_sessions_list(&service, query, &tab, json).await
        }
        Cli::Sessions(SessionsCommand::Accept { id }) => {
            let service = make_sessions(config)?;
            cmd_sessions_accept(&service, &history, &id).await
        }
        Cli::Analytics { json } => {
            let service = make_sessions(config)?;
            cmd_analytics(&service, json).await
        }
        Cli::Profile { json } => {
            let profiles = ProfileStore::new(make_storage(config)?);
            cmd_profile(&profiles, json)
        }
        Cli::History { limit, json } => cmd_history(&history, limit, json),
        Cli::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn make_storage(config: &TutordeskConfig) -> Result<Storage> {
    create_backend(config).context("failed to open storage")
}

/// Session service with a fresh snapshot of the remote collection.
fn make_sessions(config: &TutordeskConfig) -> Result<SessionService<Source>> {
    let source = create_source(config).context("failed to create session source")?;
    Ok(SessionService::new(source))
}

async fn load_sessions(service: &SessionService<Source>) -> Result<()> {
    service
        .refresh()
        .await
        .context("failed to fetch sessions")?;
    Ok(())
}

// -- Slots --

fn cmd_slots_list(manager: &AvailabilityManager<Storage>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(manager.slots())?);
        return Ok(());
    }
    if manager.is_empty() {
        println!("{}", "No availability set.".dimmed());
        return Ok(());
    }
    println!(
        "{:<6} {:<16} {:<6} {:<6} {}",
        "Index".dimmed(),
        "Day".dimmed(),
        "Start".dimmed(),
        "End".dimmed(),
        "Repeats".dimmed()
    );
    for (i, slot) in manager.slots().iter().enumerate() {
        let repeats = if slot.day.is_recurring() {
            "weekly".green().to_string()
        } else {
            "once".yellow().to_string()
        };
        println!(
            "{:<6} {:<16} {:<6} {:<6} {}",
            i.cyan(),
            slot.day.label(),
            slot.start,
            slot.end,
            repeats
        );
    }
    Ok(())
}

fn cmd_slots_add(
    manager: &mut AvailabilityManager<Storage>,
    history: &HistoryLogger,
    day: &str,
    start: &str,
    end: &str,
) -> Result<()> {
    let slot = AvailabilitySlot::new(day.parse()?, start.parse()?, end.parse()?);
    manager.add_slot(slot.clone())?;
    history.log(&ActivityEvent::slot_added(&slot));
    println!(
        "{} {} {}-{}",
        "Availability added for".green(),
        slot.day.label().bold(),
        slot.start,
        slot.end
    );
    Ok(())
}

fn cmd_slots_remove(
    manager: &mut AvailabilityManager<Storage>,
    history: &HistoryLogger,
    index: i64,
) -> Result<()> {
    let removed = manager.remove_slot(index)?;
    history.log(&ActivityEvent::slot_removed(&removed));
    println!(
        "{} {} {}-{}",
        "Removed".green(),
        removed.day.label(),
        removed.start,
        removed.end
    );
    Ok(())
}

// -- Week grid --

async fn cmd_week(
    config: &TutordeskConfig,
    manager: &AvailabilityManager<Storage>,
    service: &SessionService<Source>,
    start: Option<&str>,
    json: bool,
) -> Result<()> {
    let anchor = match start {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid date: '{s}'"))?,
        None => chrono::Local::now().date_naive(),
    };
    // The grid still shows availability when sessions can't be fetched.
    if let Err(e) = load_sessions(service).await {
        tracing::warn!("{e:#}");
    }
    let week = grid::resolve_week(
        grid::week_start_of(anchor),
        &config.schedule.time_slots(),
        &service.scheduled().await,
        manager.slots(),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&week)?);
        return Ok(());
    }

    print!("{:<7}", "");
    for day in &week.days {
        print!(" {:<10}", day.date.format("%a %-d").to_string().bold());
    }
    println!();
    for row in &week.rows {
        print!("{:<7}", row.time.dimmed());
        for cell in &row.cells {
            let text = match &cell.session {
                Some(s) if cell.session_starts => {
                    let name: String = s.student_name.chars().take(10).collect();
                    format!("{name:<10}").magenta().to_string()
                }
                Some(_) => format!("{:<10}", "|").magenta().to_string(),
                None if cell.available => format!("{:<10}", "free").green().to_string(),
                None => format!("{:<10}", "·").dimmed().to_string(),
            };
            print!(" {text}");
        }
        println!();
    }
    Ok(())
}

// -- Sessions --

async fn cmd_sessions_list(
    service: &SessionService<Source>,
    query: Option<String>,
    tab: &str,
    json: bool,
) -> Result<()> {
    let tab: StatusTab = tab.parse().map_err(anyhow::Error::msg)?;
    load_sessions(service).await?;
    let sessions = service
        .filtered(&SessionFilter {
            query: query.unwrap_or_default(),
            tab,
        })
        .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }
    if sessions.is_empty() {
        println!("{}", "No sessions match.".dimmed());
        return Ok(());
    }
    println!(
        "{:<4} {:<16} {:<20} {:<12} {:<18} {}",
        "ID".dimmed(),
        "Student".dimmed(),
        "Subject".dimmed(),
        "Date".dimmed(),
        "Time".dimmed(),
        "Status".dimmed()
    );
    for s in &sessions {
        let status = s.status.to_string();
        let status = match s.status {
            SessionStatus::Upcoming => status.cyan().to_string(),
            SessionStatus::Pending => status.yellow().to_string(),
            SessionStatus::Completed => status.green().to_string(),
        };
        println!(
            "{:<4} {:<16} {:<20} {:<12} {:<18} {}",
            s.id.cyan(),
            s.student_name,
            s.subject,
            s.date,
            s.time,
            status
        );
    }
    Ok(())
}

async fn cmd_sessions_accept(
    service: &SessionService<Source>,
    history: &HistoryLogger,
    id: &str,
) -> Result<()> {
    load_sessions(service).await?;
    let session = service.accept(id).await?;
    history.log(&ActivityEvent::session_accepted(&session));
    println!(
        "{} {} with {} on {}",
        "Accepted".green(),
        session.subject.bold(),
        session.student_name,
        session.date
    );
    Ok(())
}

async fn cmd_analytics(service: &SessionService<Source>, json: bool) -> Result<()> {
    load_sessions(service).await?;
    let report = analytics::analyze(
        &service.snapshot().await,
        chrono::Local::now().date_naive(),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Session Analytics".bold());
    println!("  {}        {}", "Completed:".dimmed(), report.completed);
    println!(
        "  {}   {:.1}/5",
        "Average rating:".dimmed(),
        report.overall_rating
    );
    println!("  {}  {}", "Unique students:".dimmed(), report.unique_students);

    println!("\n{}", "Per subject".bold());
    for c in &report.per_subject {
        let rating = report
            .ratings
            .iter()
            .find(|r| r.subject == c.subject)
            .map(|r| format!("{:.1}", r.rating))
            .unwrap_or_else(|| "-".into());
        println!("  {:<22} {:>3} sessions  {} {}", c.subject, c.count, "rating".dimmed(), rating);
    }

    println!("\n{}", "Monthly active students".bold());
    for m in &report.monthly_active {
        println!(
            "  {} {}  {}",
            m.month,
            m.year,
            "#".repeat(m.students).cyan()
        );
    }
    Ok(())
}

// -- Profile & history --

fn cmd_profile(profiles: &ProfileStore<Storage>, json: bool) -> Result<()> {
    let profile = profiles.load();
    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }
    println!("{}", profile.name.bold());
    println!("  {}     {}", "Email:".dimmed(), profile.email);
    println!("  {}     {}", "Phone:".dimmed(), profile.phone);
    println!("  {}  {}", "Location:".dimmed(), profile.location);
    println!("  {}      {}/hour", "Rate:".dimmed(), profile.hourly_rate);
    let accepting = if profile.accepting_students {
        "accepting new students".green().to_string()
    } else {
        "not accepting students".yellow().to_string()
    };
    println!("  {}    {}", "Status:".dimmed(), accepting);
    println!("  {}  {}", "Subjects:".dimmed(), profile.subjects.join(", "));
    println!("\n{}", profile.bio);
    Ok(())
}

fn cmd_history(history: &HistoryLogger, limit: usize, json: bool) -> Result<()> {
    let events = history.recent(limit);
    if events.is_empty() {
        println!("{}", "No history events found.".dimmed());
        return Ok(());
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }
    println!(
        "{:<20} {:<18} {}",
        "Timestamp".dimmed(),
        "Action".dimmed(),
        "Summary".dimmed()
    );
    for event in &events {
        let action = event.action.to_string();
        let action = match event.action {
            ActivityAction::SlotAdded => action.green().to_string(),
            ActivityAction::SlotRemoved => action.red().to_string(),
            ActivityAction::SessionAccepted => action.cyan().to_string(),
            ActivityAction::ProfileUpdated => action.yellow().to_string(),
        };
        println!(
            "{:<20} {:<27} {}",
            event
                .timestamp
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
                .dimmed(),
            action,
            event.summary
        );
    }
    Ok(())
}
