use anyhow::Result;
use chrono::Utc;
use clap::{Parser, ValueEnum};
use futures::StreamExt;
use std::io::{self, BufRead, Write};
use stylus::archive::{ArchiveClient, HistoryFeed, SyncRecord};
use stylus::reconcile::{Selection, reconcile};
use stylus::styles::{self, StyleProfile};
use stylus::transcript::{MessageId, Transcript};
use stylus::{ChatModel, ChatRequest, ValidationError};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Shown in place of a reply when the completion request is rejected
/// outright; the conversation is never left dangling.
const CONNECTION_LOST: &str = "Connection lost. Check your network or configuration.";

#[derive(Copy, Clone, ValueEnum, Debug, PartialEq, Eq)]
#[clap(rename_all = "lowercase")]
enum Mode {
    Chat,
    Stream,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Coaching persona to start with
    #[arg(long, default_value = "minimalist")]
    style: String,

    #[arg(long, value_enum, default_value_t = Mode::Stream)]
    mode: Mode,

    /// Force the simulated backend
    #[arg(long)]
    simulated: bool,

    #[arg(long, short)]
    tracing: bool,
}

struct App {
    transcript: Transcript,
    selection: Selection,
    feed: HistoryFeed,
    archive: ArchiveClient,
    model: std::sync::Arc<dyn ChatModel + Send + Sync>,
    style: &'static StyleProfile,
    mode: Mode,
}

impl App {
    fn switch_style(&mut self, style: &'static StyleProfile) {
        self.style = style;
        self.transcript = Transcript::for_style(style);
        self.selection.clear();
        println!("{} {} • {}", style.emoji, style.name, style.description);
        println!("{}", style.opening_message);
    }

    fn visible_ids(&self) -> Vec<MessageId> {
        self.transcript.visible().map(|m| m.id).collect()
    }

    async fn send(&mut self, input: &str) -> Result<()> {
        self.transcript.push_user(input);
        let request = ChatRequest::new(self.transcript.request_messages());

        match self.mode {
            Mode::Stream => match self.model.stream_chat(&request).await {
                Ok(mut stream) => {
                    self.transcript.begin_streaming();
                    while let Some(chunk) = stream.next().await {
                        print!("{}", chunk.content);
                        io::stdout().flush()?;
                        self.transcript.push_chunk(&chunk.content);
                    }
                    self.transcript.finish_streaming();
                    println!();
                }
                Err(e) => {
                    tracing::error!(error = %e, "completion request rejected");
                    self.transcript.push_assistant(CONNECTION_LOST);
                    println!("{}", CONNECTION_LOST);
                }
            },
            Mode::Chat => match self.model.chat(&request).await {
                Ok(reply) => {
                    println!("{}", reply.content);
                    self.transcript.push_assistant(reply.content);
                }
                Err(e) => {
                    tracing::error!(error = %e, "completion request failed");
                    self.transcript.push_assistant(CONNECTION_LOST);
                    println!("{}", CONNECTION_LOST);
                }
            },
        }
        Ok(())
    }

    async fn sync_marks(&mut self) {
        let pairs = match reconcile(&self.transcript, &self.selection) {
            Ok(pairs) => pairs,
            Err(ValidationError::NoPairs) => {
                println!(
                    "Nothing to archive: mark a question together with its answer, \
                     or just the answers you liked."
                );
                return;
            }
        };

        let now = Utc::now();
        let records: Vec<SyncRecord> = pairs
            .into_iter()
            .map(|pair| SyncRecord::from_pair(pair, self.style.name, now))
            .collect();

        match self.archive.sync_all(&records).await {
            Ok(count) => {
                println!("Archived {} pair(s).", count);
                self.selection.clear();
                self.refresh_history().await;
            }
            Err(e) => {
                // Marks survive so the user can retry
                println!("Archive failed: {}", e);
            }
        }
    }

    async fn refresh_history(&mut self) {
        match self.archive.fetch_page(None).await {
            Ok(page) => self.feed.apply_refresh(page),
            Err(e) => {
                tracing::warn!(error = %e, "history refresh failed");
                println!("History refresh failed; showing what was already loaded.");
            }
        }
    }

    async fn load_more_history(&mut self) {
        let Some(token) = self.feed.next_page_token().map(String::from) else {
            println!("No more history to load.");
            return;
        };
        match self.archive.fetch_page(Some(&token)).await {
            Ok(page) => self.feed.apply_more(page),
            Err(e) => {
                tracing::warn!(error = %e, "history page fetch failed");
                println!("Loading more history failed; showing what was already loaded.");
            }
        }
    }

    fn print_history(&self) {
        if self.feed.is_empty() {
            println!("No archived records yet.");
            return;
        }
        for record in self.feed.records() {
            println!(
                "[{}] {} • {}",
                record.date.format("%m-%d %H:%M"),
                record.style,
                head_of(&record.original, 48)
            );
        }
        if self.feed.has_more() {
            println!("(/more for older records)");
        }
    }

    fn print_marks(&self) {
        let ids = self.visible_ids();
        if self.selection.is_empty() {
            println!("No entries marked. /mark <n> marks entry n below.");
        }
        for (idx, msg) in self.transcript.visible().enumerate() {
            let marker = if self.selection.contains(ids[idx]) { "*" } else { " " };
            println!(
                "{} {:>2} {:?}: {}",
                marker,
                idx,
                msg.role,
                head_of(&msg.content, 60)
            );
        }
    }

    fn toggle_mark(&mut self, index: usize) {
        let ids = self.visible_ids();
        match ids.get(index) {
            Some(&id) => {
                let marked = self.selection.toggle(id);
                println!(
                    "Entry {} {}.",
                    index,
                    if marked { "marked" } else { "unmarked" }
                );
            }
            None => println!("No entry {} (use /marks to list entries).", index),
        }
    }
}

fn head_of(text: &str, chars: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= chars {
        flat
    } else {
        let head: String = flat.chars().take(chars).collect();
        format!("{}…", head)
    }
}

fn setup_tracing(enable: bool) {
    if enable {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Setting default subscriber failed");
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::ERROR)
            .with_writer(io::sink)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Setting default subscriber failed");
    }
}

fn print_help() {
    println!("Commands:");
    println!("  /style <id>    switch persona (see /styles); resets the conversation");
    println!("  /styles        list available personas");
    println!("  /mark <n>      toggle entry n for archival (see /marks)");
    println!("  /marks         show entries and current marks");
    println!("  /sync          archive marked question/answer pairs");
    println!("  /history       refresh archived history");
    println!("  /more          load older archived history");
    println!("  /clear         restart the conversation");
    println!("  /quit          exit");
}

mod commands {
    use super::*;

    pub enum Command {
        Quit,
        Help,
        Clear,
        Styles,
        SetStyle(&'static StyleProfile),
        Mark(usize),
        Marks,
        Sync,
        History,
        More,
    }

    pub enum CommandResult {
        Continue,
        Exit,
    }

    impl Command {
        pub fn parse(input: &str) -> Result<Self, String> {
            let parts: Vec<&str> = input[1..].split_whitespace().collect();
            if parts.is_empty() {
                return Err("Empty command".to_string());
            }

            match parts[0] {
                "quit" | "exit" => Ok(Command::Quit),
                "help" => Ok(Command::Help),
                "clear" => Ok(Command::Clear),
                "styles" => Ok(Command::Styles),
                "style" => {
                    let id = parts
                        .get(1)
                        .ok_or_else(|| "Usage: /style <id>".to_string())?;
                    styles::by_id(id)
                        .map(Command::SetStyle)
                        .ok_or_else(|| format!("Unknown style: {}. See /styles.", id))
                }
                "mark" | "unmark" => {
                    let index = parts
                        .get(1)
                        .and_then(|n| n.parse().ok())
                        .ok_or_else(|| format!("Usage: /{} <entry number>", parts[0]))?;
                    Ok(Command::Mark(index))
                }
                "marks" => Ok(Command::Marks),
                "sync" => Ok(Command::Sync),
                "history" => Ok(Command::History),
                "more" => Ok(Command::More),
                _ => Err(format!(
                    "Unknown command: /{}. Type /help for available commands.",
                    parts[0]
                )),
            }
        }

        pub async fn execute(self, app: &mut App) -> CommandResult {
            match self {
                Command::Quit => {
                    println!("Goodbye!");
                    return CommandResult::Exit;
                }
                Command::Help => print_help(),
                Command::Clear => {
                    let style = app.style;
                    app.switch_style(style);
                }
                Command::Styles => {
                    for style in styles::STYLES {
                        println!(
                            "  {} {:<12} {} • {}",
                            style.emoji, style.id, style.name, style.description
                        );
                    }
                }
                Command::SetStyle(style) => app.switch_style(style),
                Command::Mark(index) => app.toggle_mark(index),
                Command::Marks => app.print_marks(),
                Command::Sync => app.sync_marks().await,
                Command::History => {
                    app.refresh_history().await;
                    app.print_history();
                }
                Command::More => {
                    app.load_more_history().await;
                    app.print_history();
                }
            }
            CommandResult::Continue
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    config::load_env_file();
    let args = Args::parse();
    setup_tracing(args.tracing);

    let mut settings = config::Settings::load();
    if args.simulated {
        settings.chat.use_simulated = true;
    }

    let style = styles::by_id(&args.style)
        .ok_or_else(|| anyhow::anyhow!("Unknown style: {} (see --help)", args.style))?;

    let model = stylus::providers::create_chat_model(&settings.chat);
    let mut app = App {
        transcript: Transcript::for_style(style),
        selection: Selection::new(),
        feed: HistoryFeed::new(),
        archive: ArchiveClient::new(&settings.archive),
        model,
        style,
        mode: args.mode,
    };

    println!("stylus • {} {} ({})", style.emoji, style.name, app.model.name());
    println!("{}", style.opening_message);
    println!("Type /help for commands.");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if input.starts_with('/') {
            match commands::Command::parse(input) {
                Ok(command) => match command.execute(&mut app).await {
                    commands::CommandResult::Continue => {}
                    commands::CommandResult::Exit => break,
                },
                Err(msg) => println!("{}", msg),
            }
            continue;
        }

        app.send(input).await?;
    }

    Ok(())
}
