use clap::{CommandFactory, Parser};
use colored::*;
use std::io::{self, Read};
use std::sync::Arc;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use roundtable::api::{ChatApi, HistoryEntry, HttpChatApi, Room, Statistics};
use roundtable::cli::{Args, Command};
use roundtable::config::ClientConfig;
use roundtable::coordinator::{RoomCoordinator, RoomEvent, RoomPhase, SubmitOutcome};
use roundtable::moderator::format_moderator_message;
use roundtable::processing::ProcessingStore;
use roundtable::roles::{display_name, RoleSelection};

/// Characters of the question used as the title of an implicitly created room.
const AUTO_TITLE_CHARS: usize = 30;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn sender_label(entry: &HistoryEntry) -> ColoredString {
    if entry.is_user() {
        "you".bright_green().bold()
    } else if entry.is_moderator() {
        "moderator".bright_magenta().bold()
    } else {
        display_name(&entry.sender).bright_cyan().bold()
    }
}

fn print_entry(entry: &HistoryEntry, raw: bool) {
    let text = if raw {
        entry.message.clone()
    } else {
        entry.display_text()
    };
    let stamp = entry.timestamp.as_deref().unwrap_or("");
    println!("{} {}", sender_label(entry), stamp.dimmed());
    println!("{}", text);
    println!();
}

fn print_room_line(room: &Room) {
    let status = if room.is_processing {
        "processing".bright_yellow()
    } else {
        "idle".dimmed()
    };
    println!(
        "{:>6}  {}  {}",
        room.id.to_string().bright_white(),
        room.display_title(),
        status
    );
}

fn print_statistics(stats: &Statistics) {
    println!(
        "{}: {}",
        "Messages".bright_yellow(),
        stats.total_messages
    );
    println!(
        "{}: {}",
        "Tokens".bright_yellow(),
        stats.total_tokens_used
    );
    let mut roles: Vec<(&String, &u64)> = stats.role_participation_count.iter().collect();
    roles.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (key, count) in roles {
        println!("  {:<16} {}", display_name(key), count);
    }
}

/// Entries newer than `last_id`, in history order.
fn new_entries(history: &[HistoryEntry], last_id: u64) -> impl Iterator<Item = &HistoryEntry> {
    history.iter().filter(move |e| e.id > last_id)
}

fn last_entry_id(history: &[HistoryEntry]) -> u64 {
    history.iter().map(|e| e.id).max().unwrap_or(0)
}

fn auto_title(question: &str) -> String {
    question.trim().chars().take(AUTO_TITLE_CHARS).collect()
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn ask(
    api: Arc<dyn ChatApi>,
    config: &ClientConfig,
    question: &str,
    room: Option<u64>,
    roles: &str,
    rounds: u32,
    no_wait: bool,
) -> CliResult<()> {
    let roles = RoleSelection::parse(roles)?;
    let room_id = match room {
        Some(id) => id,
        None => {
            let created = api.create_room(Some(&auto_title(question))).await?;
            println!("{} {}", "Created room".bright_green(), created.id);
            created.id
        }
    };

    let store = ProcessingStore::new();
    let coordinator = RoomCoordinator::new(api, store, room_id, config.clone());
    let room = coordinator.open().await?;

    println!("{}", room.display_title().bright_cyan().bold());
    println!("{}: {}", "Roles".bright_yellow(), roles);
    println!(
        "{}: {}",
        "Rounds".bright_yellow(),
        config.clamp_rounds(rounds)
    );

    if !coordinator.can_submit() {
        println!(
            "{}",
            "A round is already running in this room; waiting for it to finish...".bright_yellow()
        );
        coordinator.wait_for_completion().await;
    }

    let mut last_id = last_entry_id(&coordinator.view().history);
    let mut events = BroadcastStream::new(coordinator.subscribe());

    match coordinator.submit(question, &roles, rounds).await? {
        SubmitOutcome::Accepted { note } => {
            println!("{}", "Question accepted.".bright_green());
            if let Some(note) = note.filter(|_| no_wait) {
                println!("{note}");
            }
        }
        SubmitOutcome::AlreadyProcessing => {
            println!(
                "{}",
                "The server is already running a round; following it.".bright_yellow()
            );
        }
    }

    if no_wait {
        coordinator.stop_polling();
        return Ok(());
    }

    loop {
        tokio::select! {
            event = events.next() => {
                let Some(event) = event else { break };
                match event {
                    Ok(RoomEvent::HistoryRefreshed(history)) => {
                        for entry in new_entries(&history, last_id) {
                            print_entry(entry, false);
                        }
                        last_id = last_id.max(last_entry_id(&history));
                    }
                    Ok(RoomEvent::PollFailed(msg)) => {
                        eprintln!("{} {}", "poll failed:".dimmed(), msg.dimmed());
                    }
                    Ok(RoomEvent::PhaseChanged(RoomPhase::Idle)) => break,
                    Ok(other) => debug!(?other, "room event"),
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        warn!(skipped, "event stream lagged");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                coordinator.stop_polling();
                println!();
                println!("{}", "Stopped following; the round continues on the server.".bright_yellow());
                return Ok(());
            }
        }
    }

    let view = coordinator.view();
    for entry in new_entries(&view.history, last_id) {
        print_entry(entry, false);
    }
    println!("{}", "Round completed.".bright_green().bold());
    if !view.note.trim().is_empty() {
        println!();
        println!("{}", "Note".bright_yellow().bold());
        println!("{}", view.note);
    }
    Ok(())
}

async fn show(api: &dyn ChatApi, id: u64) -> CliResult<()> {
    let (room, stats) = tokio::join!(api.get_room(id), api.get_statistics(id));
    let room = room?;
    println!("{}", room.display_title().bright_cyan().bold());
    println!("{}: {}", "Id".bright_yellow(), room.id);
    if let Some(created) = &room.created_at {
        println!("{}: {}", "Created".bright_yellow(), created);
    }
    if let Some(updated) = &room.updated_at {
        println!("{}: {}", "Updated".bright_yellow(), updated);
    }
    println!(
        "{}: {}",
        "Processing".bright_yellow(),
        if room.is_processing { "yes" } else { "no" }
    );
    match stats {
        Ok(stats) => print_statistics(&stats),
        Err(e) => warn!(room_id = id, error = %e, "statistics unavailable"),
    }
    Ok(())
}

fn read_stdin() -> io::Result<String> {
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("roundtable=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing();

    // Commands that never touch the network.
    match &args.command {
        Command::Completions { shell } => {
            clap_complete::generate(*shell, &mut Args::command(), "roundtable", &mut io::stdout());
            return Ok(());
        }
        Command::Decode { text } => {
            let raw = match text {
                Some(t) => t.clone(),
                None => read_stdin()?,
            };
            println!("{}", format_moderator_message(raw.trim_end()));
            return Ok(());
        }
        _ => {}
    }

    let mut config = ClientConfig::load(args.config.as_deref())?;
    args.apply_overrides(&mut config);
    debug!(base_url = %config.base_url, "configuration loaded");

    let api: Arc<dyn ChatApi> = Arc::new(HttpChatApi::from_config(&config));

    match args.command {
        Command::Rooms => {
            let rooms = api.list_rooms().await?;
            if rooms.is_empty() {
                println!("{}", "No rooms yet.".dimmed());
            }
            for room in &rooms {
                print_room_line(room);
            }
        }
        Command::Create { title } => {
            let room = api.create_room(title.as_deref()).await?;
            print_room_line(&room);
        }
        Command::Show { id } => show(api.as_ref(), id).await?,
        Command::History { id, raw } => {
            let history = api.get_history(id).await?;
            for entry in &history {
                print_entry(entry, raw);
            }
        }
        Command::Ask {
            question,
            room,
            roles,
            rounds,
            no_wait,
        } => ask(api, &config, &question, room, &roles, rounds, no_wait).await?,
        Command::Note { id, text: None } => {
            let room = api.get_room(id).await?;
            println!("{}", room.note.unwrap_or_default());
        }
        Command::Note { id, text: Some(text) } => {
            api.update_note(id, &text).await?;
            println!("{}", "Note saved.".bright_green());
        }
        Command::Title { id, text } => {
            let room = api.update_title(id, &text).await?;
            print_room_line(&room);
        }
        Command::Delete { id } => {
            api.delete_room(id).await?;
            println!("{} {}", "Deleted room".bright_green(), id);
        }
        Command::Summarize { id } => {
            let resp = api.summarize(id).await?;
            println!("{}", resp.note_content().unwrap_or_default());
        }
        Command::Completions { .. } | Command::Decode { .. } => {}
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u64, sender: &str) -> HistoryEntry {
        HistoryEntry {
            id,
            sender: sender.to_string(),
            message: format!("m{id}"),
            timestamp: None,
            tokens_used: None,
        }
    }

    #[test]
    fn test_new_entries_skips_seen() {
        let history = vec![entry(1, "user"), entry(2, "critic"), entry(3, "moderator")];
        let ids: Vec<u64> = new_entries(&history, 1).map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_last_entry_id_empty_is_zero() {
        assert_eq!(last_entry_id(&[]), 0);
        assert_eq!(last_entry_id(&[entry(4, "user"), entry(9, "critic")]), 9);
    }

    #[test]
    fn test_auto_title_truncates_by_chars() {
        let q = "가".repeat(40);
        assert_eq!(auto_title(&q).chars().count(), AUTO_TITLE_CHARS);
        assert_eq!(auto_title("  short  "), "short");
    }
}
