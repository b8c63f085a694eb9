//! CLI interface for slackasme - Slack from the terminal, as yourself.

mod output;

use std::env;
use std::fs::OpenOptions;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{Context as _, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use env_logger::fmt::WriteStyle;
use log::{LevelFilter, debug};
use serde_json::{Value, json};
use slackasme_core::paginate::collect;
use slackasme_core::paths::write_default_config;
use slackasme_core::schema::REPO_URL;
use slackasme_core::validate;
use slackasme_core::{
    APP_NAME, AppConfig, AppPaths, LogLevel, PAGE_SIZE, SlackApi, SlackClient, TokenStore, User,
    generate_schema, resolve_channel, resolve_user, resolve_users, write_generated_files,
};

use crate::output::{
    Table, format_size, format_ts, format_unix, print_json, single_line, str_at, str_field,
};

fn main() -> anyhow::Result<()> {
    try_main()
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = RuntimeContext::new(cli.common.clone())?;
    ctx.init_logging()?;
    debug!("resolved paths: {}", ctx.paths);

    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Command::Auth { subcommand } => rt.block_on(handle_auth(&ctx, subcommand)),
        Command::Message { subcommand } => rt.block_on(handle_message(&ctx, subcommand)),
        Command::Channel { subcommand } => rt.block_on(handle_channel(&ctx, subcommand)),
        Command::User { subcommand } => rt.block_on(handle_user(&ctx, subcommand)),
        Command::Dm { subcommand } => rt.block_on(handle_dm(&ctx, subcommand)),
        Command::Reaction { subcommand } => rt.block_on(handle_reaction(&ctx, subcommand)),
        Command::File { subcommand } => rt.block_on(handle_file(&ctx, subcommand)),
        Command::Search { subcommand } => rt.block_on(handle_search(&ctx, subcommand)),
        Command::Init(cmd) => handle_init(&ctx, cmd),
        Command::Config { command } => handle_config(&ctx, command),
        Command::Completions { shell } => {
            handle_completions(shell);
            Ok(())
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "slackasme",
    author,
    version,
    about = "Slack from the terminal, as yourself",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    #[command(subcommand)]
    command: Command,
}

/// Common CLI options shared across all subcommands.
#[derive(Debug, Clone, Args)]
pub struct CommonOpts {
    /// Override the config file path.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,
    /// Reduce output to only errors.
    #[arg(short, long, action = clap::ArgAction::SetTrue, global = true)]
    pub quiet: bool,
    /// Increase logging verbosity (stackable).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Enable debug logging.
    #[arg(long, global = true)]
    pub debug: bool,
    /// Enable trace logging.
    #[arg(long, global = true)]
    pub trace: bool,
    /// Print the raw API response as JSON.
    #[arg(long, global = true)]
    pub json: bool,
    /// Disable ANSI colors in output.
    #[arg(long = "no-color", global = true, conflicts_with = "color")]
    pub no_color: bool,
    /// Control color output.
    #[arg(long, value_enum, default_value_t = ColorOption::Auto, global = true)]
    pub color: ColorOption,
    /// Do not change anything on disk.
    #[arg(long = "dry-run", global = true)]
    pub dry_run: bool,
    /// Assume "yes" for interactive prompts.
    #[arg(short = 'y', long = "yes", global = true)]
    pub assume_yes: bool,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorOption {
    /// Detect terminal capabilities automatically.
    Auto,
    /// Always emit ANSI color codes.
    Always,
    /// Never emit ANSI color codes.
    Never,
}

/// Which channels `channel list` shows.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum ChannelType {
    /// Public channels.
    #[default]
    Public,
    /// Private channels you are a member of.
    Private,
    /// Public and private channels.
    All,
}

impl ChannelType {
    const fn as_types(self) -> &'static str {
        match self {
            Self::Public => "public_channel",
            Self::Private => "private_channel",
            Self::All => "public_channel,private_channel",
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Authentication (login, test, logout).
    Auth {
        #[command(subcommand)]
        subcommand: AuthSubcommand,
    },
    /// Send, list, and delete messages.
    Message {
        #[command(subcommand)]
        subcommand: MessageSubcommand,
    },
    /// List channels and show channel details.
    Channel {
        #[command(subcommand)]
        subcommand: ChannelSubcommand,
    },
    /// List users and show user details.
    User {
        #[command(subcommand)]
        subcommand: UserSubcommand,
    },
    /// Open direct and group messages.
    Dm {
        #[command(subcommand)]
        subcommand: DmSubcommand,
    },
    /// Add and remove emoji reactions.
    Reaction {
        #[command(subcommand)]
        subcommand: ReactionSubcommand,
    },
    /// Upload and list files.
    File {
        #[command(subcommand)]
        subcommand: FileSubcommand,
    },
    /// Search messages and users.
    Search {
        #[command(subcommand)]
        subcommand: SearchSubcommand,
    },
    /// Create the config directory and default files.
    Init(InitCommand),
    /// Inspect and manage configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Generate shell completions.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Subcommand)]
enum AuthSubcommand {
    /// Store a user token after verifying it with Slack.
    Login {
        /// User token (xoxp-...). Prompted for when omitted.
        #[arg(long)]
        token: Option<String>,
    },
    /// Show who the configured token belongs to.
    Test,
    /// Remove the stored token.
    Logout,
}

#[derive(Debug, Clone, Subcommand)]
enum MessageSubcommand {
    /// Send a message to a channel, #name, or @user.
    Send {
        /// Channel name, ID, or @user.
        #[arg(value_parser = validate::channel)]
        channel: String,
        /// Message text.
        #[arg(value_parser = validate::text)]
        text: String,
        /// Reply in the thread of this message timestamp.
        #[arg(short, long, value_name = "TS", value_parser = validate::thread_timestamp)]
        thread: Option<String>,
    },
    /// Show recent messages in a channel.
    List {
        /// Channel name, ID, or @user.
        #[arg(value_parser = validate::channel)]
        channel: String,
        /// Number of messages to show.
        #[arg(short = 'n', long, value_parser = validate::limit)]
        limit: Option<usize>,
    },
    /// Delete one of your messages.
    Delete {
        /// Channel name, ID, or @user.
        #[arg(value_parser = validate::channel)]
        channel: String,
        /// Message timestamp.
        #[arg(value_parser = validate::timestamp)]
        ts: String,
    },
}

#[derive(Debug, Clone, Subcommand)]
enum ChannelSubcommand {
    /// List channels.
    List {
        /// Channel type to list.
        #[arg(short = 't', long = "type", value_enum, default_value_t = ChannelType::Public)]
        channel_type: ChannelType,
        /// Maximum number of channels.
        #[arg(short = 'n', long, value_parser = validate::limit)]
        limit: Option<usize>,
    },
    /// Show channel details.
    Info {
        /// Channel name or ID.
        #[arg(value_parser = validate::channel)]
        channel: String,
    },
}

#[derive(Debug, Clone, Subcommand)]
enum UserSubcommand {
    /// List workspace members.
    List {
        /// Maximum number of users.
        #[arg(short = 'n', long, value_parser = validate::limit)]
        limit: Option<usize>,
    },
    /// Show a user by ID, email, @name, or username.
    Info {
        /// User ID, email, @name, or username.
        user: String,
    },
}

#[derive(Debug, Clone, Subcommand)]
enum DmSubcommand {
    /// Open a DM with one user or a group DM with several.
    Open {
        /// User IDs, emails, @names, or usernames.
        #[arg(required = true, num_args = 1..)]
        users: Vec<String>,
    },
}

#[derive(Debug, Clone, Args)]
struct ReactionTarget {
    /// Channel name, ID, or @user.
    #[arg(value_parser = validate::channel)]
    channel: String,
    /// Message timestamp.
    #[arg(value_parser = validate::timestamp)]
    ts: String,
    /// Emoji name without colons (e.g. eyes, +1).
    #[arg(value_parser = validate::emoji)]
    emoji: String,
}

#[derive(Debug, Clone, Subcommand)]
enum ReactionSubcommand {
    /// React to a message.
    Add(ReactionTarget),
    /// Remove your reaction from a message.
    Remove(ReactionTarget),
}

#[derive(Debug, Clone, Subcommand)]
enum FileSubcommand {
    /// Upload a file to a channel.
    Upload {
        /// Channel name, ID, or @user.
        #[arg(value_parser = validate::channel)]
        channel: String,
        /// File to upload.
        #[arg(value_parser = validate::file_path)]
        path: PathBuf,
        /// Message to post with the file.
        #[arg(short, long, value_parser = validate::text)]
        message: Option<String>,
    },
    /// List files, optionally in one channel.
    List {
        /// Channel name, ID, or @user.
        #[arg(value_parser = validate::channel)]
        channel: Option<String>,
        /// Maximum number of files.
        #[arg(short = 'n', long, value_parser = validate::limit)]
        limit: Option<usize>,
    },
}

#[derive(Debug, Clone, Subcommand)]
enum SearchSubcommand {
    /// Search messages (Slack search syntax).
    Messages {
        /// Search query.
        #[arg(value_parser = validate::search_query)]
        query: String,
        /// Maximum number of results.
        #[arg(short = 'n', long, value_parser = validate::limit)]
        limit: Option<usize>,
    },
    /// Find users whose username or real name contains the query.
    Users {
        /// Search text (case-insensitive).
        #[arg(value_parser = validate::search_query)]
        query: String,
    },
}

#[derive(Debug, Clone, Copy, Args)]
struct InitCommand {
    /// Recreate configuration even if it already exists.
    #[arg(long = "force")]
    force: bool,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum ConfigCommand {
    /// Output the effective configuration.
    Show,
    /// Print the resolved config file path.
    Path,
    /// Print all resolved paths.
    Paths,
    /// Print the JSON schema.
    Schema,
    /// Regenerate the default configuration file.
    Reset,
}

// ─── Runtime ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct RuntimeContext {
    common: CommonOpts,
    paths: AppPaths,
    config: AppConfig,
}

impl RuntimeContext {
    fn new(common: CommonOpts) -> Result<Self> {
        let paths = AppPaths::discover(common.config.as_deref())?;
        let config = AppConfig::load(&paths, common.dry_run)?;
        let paths = paths.apply_overrides(&config)?;
        Ok(Self {
            common,
            paths,
            config,
        })
    }

    fn init_logging(&self) -> Result<()> {
        if self.common.quiet {
            log::set_max_level(LevelFilter::Off);
            return Ok(());
        }
        let mut builder =
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
        builder.filter_level(self.effective_log_level());

        if let Some(ref file) = self.config.logging.file {
            let sink = OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .with_context(|| format!("opening log file {file}"))?;
            builder.target(env_logger::Target::Pipe(Box::new(sink)));
            builder.write_style(WriteStyle::Never);
        } else if self.stderr_color() {
            builder.write_style(WriteStyle::Always);
        } else {
            builder.write_style(WriteStyle::Never);
        }

        builder.try_init().or_else(|err| {
            if self.common.verbose > 0 {
                eprintln!("logger already initialized: {err}");
            }
            Ok(())
        })
    }

    const fn effective_log_level(&self) -> LevelFilter {
        if self.common.trace {
            LevelFilter::Trace
        } else if self.common.debug {
            LevelFilter::Debug
        } else {
            match self.common.verbose {
                0 => match self.config.logging.level {
                    LogLevel::Error => LevelFilter::Error,
                    LogLevel::Warn => LevelFilter::Warn,
                    LogLevel::Info => LevelFilter::Info,
                    LogLevel::Debug => LevelFilter::Debug,
                    LogLevel::Trace => LevelFilter::Trace,
                },
                1 => LevelFilter::Info,
                2 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }

    fn color_for(&self, is_terminal: bool) -> bool {
        let force_color = matches!(self.common.color, ColorOption::Always)
            || env::var_os("FORCE_COLOR").is_some();
        let disable_color = self.common.no_color
            || matches!(self.common.color, ColorOption::Never)
            || env::var_os("NO_COLOR").is_some();
        !disable_color && (force_color || is_terminal)
    }

    fn stderr_color(&self) -> bool {
        self.color_for(io::stderr().is_terminal())
    }

    fn stdout_color(&self) -> bool {
        self.color_for(io::stdout().is_terminal())
    }

    fn token_store(&self) -> TokenStore {
        TokenStore::new(&self.paths.token_file)
    }

    fn client(&self) -> Result<SlackClient> {
        let token = self.token_store().require()?;
        Ok(SlackClient::from_config(token, &self.config)?)
    }

    fn limit(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.config.output.default_limit)
    }
}

/// Resolve a channel argument to a channel ID or fail with a clear message.
async fn channel_id(client: &SlackClient, channel: &str) -> Result<String> {
    resolve_channel(client, channel)
        .await?
        .ok_or_else(|| anyhow!("channel not found: {channel}"))
}

// ─── Handlers ────────────────────────────────────────────────────────

async fn handle_auth(ctx: &RuntimeContext, cmd: AuthSubcommand) -> Result<()> {
    let store = ctx.token_store();

    match cmd {
        AuthSubcommand::Login { token } => {
            let token = match token {
                Some(token) => token,
                None => prompt_token()?,
            };
            let token = token.trim();
            if token.is_empty() {
                return Err(anyhow!("no token given"));
            }

            let client = SlackClient::from_config(token, &ctx.config)?;
            let identity = client.auth_test().await.context("verifying token")?;

            if ctx.common.dry_run {
                log::info!("dry-run: would store token at {}", store.path().display());
            } else {
                store.save(token)?;
            }
            println!(
                "Authenticated as {} on {}",
                str_field(&identity, "user", "?"),
                str_field(&identity, "team", "?")
            );
            Ok(())
        }
        AuthSubcommand::Test => {
            let identity = ctx.client()?.auth_test().await?;
            if ctx.common.json {
                return print_json(&identity);
            }
            println!("User:    {}", str_field(&identity, "user", "-"));
            println!("User ID: {}", str_field(&identity, "user_id", "-"));
            println!("Team:    {}", str_field(&identity, "team", "-"));
            println!("URL:     {}", str_field(&identity, "url", "-"));
            Ok(())
        }
        AuthSubcommand::Logout => {
            if !store.path().exists() {
                println!("No token configured");
                return Ok(());
            }
            if ctx.common.dry_run {
                log::info!("dry-run: would remove {}", store.path().display());
                return Ok(());
            }
            store.delete()?;
            println!("Token removed");
            Ok(())
        }
    }
}

fn prompt_token() -> Result<String> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        eprint!("Slack user token (xoxp-...): ");
        io::stderr().flush()?;
    }
    let mut line = String::new();
    stdin.lock().read_line(&mut line).context("reading token")?;
    Ok(line)
}

async fn handle_message(ctx: &RuntimeContext, cmd: MessageSubcommand) -> Result<()> {
    let client = ctx.client()?;

    match cmd {
        MessageSubcommand::Send {
            channel,
            text,
            thread,
        } => {
            let channel_id = channel_id(&client, &channel).await?;
            let thread = thread.filter(|ts| !ts.is_empty());
            let sent = client
                .chat_post_message(&channel_id, &text, thread.as_deref())
                .await?;
            if ctx.common.json {
                return print_json(&sent);
            }
            println!(
                "Message sent to {channel} (ts: {})",
                str_field(&sent, "ts", "?")
            );
            Ok(())
        }
        MessageSubcommand::List { channel, limit } => {
            let channel_id = channel_id(&client, &channel).await?;
            let history = client
                .conversations_history(&channel_id, ctx.limit(limit))
                .await?;
            if ctx.common.json {
                return print_json(&history);
            }

            let messages = history["messages"].as_array().map_or(&[][..], Vec::as_slice);
            if messages.is_empty() {
                println!("No messages found");
                return Ok(());
            }
            let mut table = Table::new(&["Time", "TS", "User", "Text"]);
            for msg in messages.iter().rev() {
                let ts = str_field(msg, "ts", "");
                let author = msg
                    .get("user")
                    .or_else(|| msg.get("username"))
                    .or_else(|| msg.get("bot_id"))
                    .and_then(Value::as_str)
                    .unwrap_or("-");
                table.push(vec![
                    format_ts(ts),
                    ts.to_string(),
                    author.to_string(),
                    str_field(msg, "text", "").to_string(),
                ]);
            }
            table.print(ctx.stdout_color());
            Ok(())
        }
        MessageSubcommand::Delete { channel, ts } => {
            let channel_id = channel_id(&client, &channel).await?;
            let deleted = client.chat_delete(&channel_id, &ts).await?;
            if ctx.common.json {
                return print_json(&deleted);
            }
            println!("Message {ts} deleted");
            Ok(())
        }
    }
}

async fn handle_channel(ctx: &RuntimeContext, cmd: ChannelSubcommand) -> Result<()> {
    let client = ctx.client()?;

    match cmd {
        ChannelSubcommand::List {
            channel_type,
            limit,
        } => {
            let types = channel_type.as_types();
            let channels = collect(
                |cursor, page_size| client.conversations_list(cursor, page_size, types),
                "channels",
                Some(ctx.limit(limit)),
            )
            .await?;
            if ctx.common.json {
                return print_json(&json!({"ok": true, "channels": channels}));
            }
            if channels.is_empty() {
                println!("No channels found");
                return Ok(());
            }

            let mut table = Table::new(&["ID", "Name", "Members", "Private", "Purpose"]);
            for ch in &channels {
                table.push(vec![
                    str_field(ch, "id", "").to_string(),
                    format!("#{}", str_field(ch, "name", "")),
                    ch.get("num_members")
                        .and_then(Value::as_u64)
                        .map_or_else(|| "-".to_string(), |n| n.to_string()),
                    yes_no(ch.get("is_private")),
                    str_at(ch, "/purpose/value", "").to_string(),
                ]);
            }
            table.print(ctx.stdout_color());
            Ok(())
        }
        ChannelSubcommand::Info { channel } => {
            let channel_id = channel_id(&client, &channel).await?;
            let info = client.conversations_info(&channel_id).await?;
            if ctx.common.json {
                return print_json(&info);
            }

            let ch = &info["channel"];
            println!("ID:       {}", str_field(ch, "id", "-"));
            println!("Name:     #{}", str_field(ch, "name", "-"));
            println!("Private:  {}", yes_no(ch.get("is_private")));
            println!("Archived: {}", yes_no(ch.get("is_archived")));
            if let Some(members) = ch.get("num_members").and_then(Value::as_u64) {
                println!("Members:  {members}");
            }
            if let Some(created) = ch.get("created").and_then(Value::as_i64) {
                println!("Created:  {}", format_unix(created));
            }
            println!("Topic:    {}", single_line(str_at(ch, "/topic/value", "-")));
            println!("Purpose:  {}", single_line(str_at(ch, "/purpose/value", "-")));
            Ok(())
        }
    }
}

async fn handle_user(ctx: &RuntimeContext, cmd: UserSubcommand) -> Result<()> {
    let client = ctx.client()?;

    match cmd {
        UserSubcommand::List { limit } => {
            let members = collect(
                |cursor, page_size| client.users_list(cursor, page_size),
                "members",
                Some(ctx.limit(limit)),
            )
            .await?;
            if ctx.common.json {
                return print_json(&json!({"ok": true, "members": members}));
            }
            print_user_table(ctx, &members);
            Ok(())
        }
        UserSubcommand::Info { user } => {
            let found = resolve_user(&client, &user)
                .await?
                .ok_or_else(|| anyhow!("User not found: {user}"))?;
            if ctx.common.json {
                return print_json(&json!({"ok": true, "user": found.to_value()}));
            }
            print_user_details(&found);
            Ok(())
        }
    }
}

async fn handle_dm(ctx: &RuntimeContext, cmd: DmSubcommand) -> Result<()> {
    let client = ctx.client()?;

    match cmd {
        DmSubcommand::Open { users } => {
            let (resolved, not_found) = resolve_users(&client, users.as_slice()).await?;
            if !not_found.is_empty() {
                return Err(anyhow!("User(s) not found: {}", not_found.join(", ")));
            }

            let ids: Vec<String> = resolved.into_iter().map(|u| u.id).collect();
            let opened = client.conversations_open(&ids).await?;
            if ctx.common.json {
                return print_json(&opened);
            }
            let kind = if ids.len() == 1 {
                "Direct Message"
            } else {
                "Group DM"
            };
            println!("{kind}: {}", str_at(&opened, "/channel/id", "?"));
            Ok(())
        }
    }
}

async fn handle_reaction(ctx: &RuntimeContext, cmd: ReactionSubcommand) -> Result<()> {
    let client = ctx.client()?;

    let (adding, target) = match cmd {
        ReactionSubcommand::Add(target) => (true, target),
        ReactionSubcommand::Remove(target) => (false, target),
    };
    let channel_id = channel_id(&client, &target.channel).await?;
    let emoji = &target.emoji;

    let result = if adding {
        client.reactions_add(&channel_id, &target.ts, emoji).await
    } else {
        client.reactions_remove(&channel_id, &target.ts, emoji).await
    };

    match result {
        Ok(body) if ctx.common.json => print_json(&body),
        Ok(_) if adding => {
            println!("Added :{emoji}: to message {}", target.ts);
            Ok(())
        }
        Ok(_) => {
            println!("Removed :{emoji}: from message {}", target.ts);
            Ok(())
        }
        Err(e) if e.slack_code() == Some("already_reacted") => {
            println!("Already reacted with :{emoji}:");
            Ok(())
        }
        Err(e) if e.slack_code() == Some("no_reaction") => {
            println!("No :{emoji}: reaction to remove");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn handle_file(ctx: &RuntimeContext, cmd: FileSubcommand) -> Result<()> {
    let client = ctx.client()?;

    match cmd {
        FileSubcommand::Upload {
            channel,
            path,
            message,
        } => {
            let channel_id = channel_id(&client, &channel).await?;
            let uploaded = client
                .upload_file(&channel_id, &path, message.as_deref())
                .await?;
            if ctx.common.json {
                return print_json(&uploaded);
            }
            println!(
                "Uploaded {} ({}) to {channel}",
                path.display(),
                str_at(&uploaded, "/files/0/id", "?")
            );
            Ok(())
        }
        FileSubcommand::List { channel, limit } => {
            let channel_id = match channel {
                Some(ref channel) => Some(channel_id(&client, channel).await?),
                None => None,
            };
            let listing = client
                .files_list(channel_id.as_deref(), ctx.limit(limit))
                .await?;
            if ctx.common.json {
                return print_json(&listing);
            }

            let files = listing["files"].as_array().map_or(&[][..], Vec::as_slice);
            if files.is_empty() {
                println!("No files found");
                return Ok(());
            }
            let mut table = Table::new(&["ID", "Name", "Type", "Size", "Created"]);
            for file in files {
                table.push(vec![
                    str_field(file, "id", "").to_string(),
                    str_field(file, "name", "").to_string(),
                    str_field(file, "filetype", "").to_string(),
                    file.get("size")
                        .and_then(Value::as_u64)
                        .map_or_else(String::new, format_size),
                    file.get("created")
                        .and_then(Value::as_i64)
                        .map_or_else(String::new, format_unix),
                ]);
            }
            table.print(ctx.stdout_color());
            Ok(())
        }
    }
}

async fn handle_search(ctx: &RuntimeContext, cmd: SearchSubcommand) -> Result<()> {
    let client = ctx.client()?;

    match cmd {
        SearchSubcommand::Messages { query, limit } => {
            let results = client.search_messages(&query, ctx.limit(limit)).await?;
            if ctx.common.json {
                return print_json(&results);
            }

            let matches = results
                .pointer("/messages/matches")
                .and_then(Value::as_array)
                .map_or(&[][..], Vec::as_slice);
            if matches.is_empty() {
                println!("No results found");
                return Ok(());
            }
            let total = results
                .pointer("/messages/total")
                .and_then(Value::as_u64)
                .unwrap_or(matches.len() as u64);
            println!("Total matches: {total}");

            let mut table = Table::new(&["Time", "Channel", "User", "Text"]);
            for hit in matches {
                table.push(vec![
                    format_ts(str_field(hit, "ts", "")),
                    format!("#{}", str_at(hit, "/channel/name", "?")),
                    hit.get("username")
                        .or_else(|| hit.get("user"))
                        .and_then(Value::as_str)
                        .unwrap_or("-")
                        .to_string(),
                    str_field(hit, "text", "").to_string(),
                ]);
            }
            table.print(ctx.stdout_color());
            Ok(())
        }
        SearchSubcommand::Users { query } => {
            let needle = query.to_lowercase();
            let members = collect(
                |cursor, page_size| client.users_list(cursor, page_size),
                "members",
                None,
            )
            .await?;
            debug!("scanned {} members in pages of {PAGE_SIZE}", members.len());

            let matching: Vec<Value> = members
                .into_iter()
                .filter(|m| user_matches(m, &needle))
                .collect();
            if ctx.common.json {
                return print_json(&json!({"ok": true, "members": matching}));
            }
            println!("Found: {} users", matching.len());
            if !matching.is_empty() {
                print_user_table(ctx, &matching);
            }
            Ok(())
        }
    }
}

fn handle_init(ctx: &RuntimeContext, cmd: InitCommand) -> Result<()> {
    if ctx.paths.config_file.exists() && !(cmd.force || ctx.common.assume_yes) {
        return Err(anyhow!(
            "config already exists at {} (use --force to overwrite)",
            ctx.paths.config_file.display()
        ));
    }
    let config_dir = ctx
        .paths
        .config_file
        .parent()
        .ok_or_else(|| anyhow!("config file has no parent directory"))?;
    if ctx.common.dry_run {
        log::info!(
            "dry-run: would write default config and schema to {}",
            config_dir.display()
        );
        return Ok(());
    }
    let files = write_generated_files(config_dir, APP_NAME, REPO_URL)?;
    println!("Wrote {}", files.config.display());
    println!("Wrote {}", files.schema.display());
    Ok(())
}

fn handle_config(ctx: &RuntimeContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            if ctx.common.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&ctx.config)
                        .context("serializing config to JSON")?
                );
            } else {
                println!("{:#?}", ctx.config);
            }
            Ok(())
        }
        ConfigCommand::Path => {
            println!("{}", ctx.paths.config_file.display());
            Ok(())
        }
        ConfigCommand::Paths => {
            if ctx.common.json {
                let paths = json!({
                    "config": ctx.paths.config_file,
                    "token": ctx.paths.token_file,
                });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&paths).context("serializing paths to JSON")?
                );
            } else {
                println!("config: {}", ctx.paths.config_file.display());
                println!("token:  {}", ctx.paths.token_file.display());
            }
            Ok(())
        }
        ConfigCommand::Schema => {
            println!("{}", generate_schema(APP_NAME, REPO_URL)?);
            Ok(())
        }
        ConfigCommand::Reset => {
            if ctx.common.dry_run {
                log::info!(
                    "dry-run: would reset config at {}",
                    ctx.paths.config_file.display()
                );
                return Ok(());
            }
            write_default_config(&ctx.paths.config_file)
        }
    }
}

fn handle_completions(shell: Shell) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, APP_NAME, &mut io::stdout());
}

// ─── Formatting helpers ──────────────────────────────────────────────

fn print_user_table(ctx: &RuntimeContext, members: &[Value]) {
    if members.is_empty() {
        println!("No users found");
        return;
    }
    let mut table = Table::new(&["ID", "Username", "Real name", "Email"]);
    for member in members {
        let mut name = str_field(member, "name", "").to_string();
        if member.get("deleted").and_then(Value::as_bool) == Some(true) {
            name.push_str(" (deactivated)");
        }
        table.push(vec![
            str_field(member, "id", "").to_string(),
            name,
            str_field(member, "real_name", "").to_string(),
            str_at(member, "/profile/email", "").to_string(),
        ]);
    }
    table.print(ctx.stdout_color());
}

fn print_user_details(user: &User) {
    println!("ID:           {}", user.id);
    println!("Username:     {}", user.name);
    println!("Real name:    {}", user.field_or("real_name", "-"));
    println!(
        "Display name: {}",
        user.profile_field("display_name")
            .filter(|n| !n.is_empty())
            .unwrap_or("-")
    );
    println!("Email:        {}", user.profile_field("email").unwrap_or("-"));
    println!("Title:        {}", user.profile_field("title").unwrap_or("-"));
    println!("Timezone:     {}", user.field_or("tz", "-"));
    if let Some(status) = user.profile_field("status_text").filter(|s| !s.is_empty()) {
        let emoji = user.profile_field("status_emoji").unwrap_or("");
        println!("Status:       {emoji} {status}");
    }
}

/// Case-insensitive substring match on username and real name.
fn user_matches(member: &Value, needle: &str) -> bool {
    ["name", "real_name"].iter().any(|key| {
        str_field(member, key, "").to_lowercase().contains(needle)
    })
}

fn yes_no(flag: Option<&Value>) -> String {
    if flag.and_then(Value::as_bool).unwrap_or(false) {
        "yes".to_string()
    } else {
        "no".to_string()
    }
}
