use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use botdeck::bots::{find_template, BotRegistry, BotType, BOT_TEMPLATES, MODELS};
use botdeck::chat::{ChatSession, CycleOutcome, CycleRequest, Role, SessionOptions};
use botdeck::config::{load_config, AppConfig, ConfigError};
use botdeck::error::{ChatError, StoreError};
use botdeck::finance::metrics::category_ranking;
use botdeck::finance::{export_file_name, FinanceLedger};
use botdeck::observability::init_tracing;
use botdeck::storage::DirKvStore;
use botdeck::transport::{ChatTransport, HttpTransport};
use chrono::{Datelike, Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Debug, Parser)]
#[command(name = "botdeck", version, about = "Manage AI bots, chat with them, and track finances")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, env = "BOTDECK_CONFIG", default_value = "config.yaml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Chat with a bot. `/reset` clears the conversation, `/quit` exits.
    Chat {
        /// Bot name or id.
        #[arg(long)]
        bot: String,
        /// Override the bot's model for this session.
        #[arg(long)]
        model: Option<String>,
    },
    #[command(subcommand)]
    Bots(BotsCommand),
    #[command(subcommand)]
    Finance(FinanceCommand),
}

#[derive(Debug, Subcommand)]
enum BotsCommand {
    List {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long = "type")]
        bot_type: Option<BotType>,
    },
    Create {
        #[arg(long)]
        template: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },
    /// Flip a bot between active and inactive.
    Toggle { bot: String },
    Delete { bot: String },
    /// List bot templates and models.
    Templates,
}

#[derive(Debug, Subcommand)]
enum FinanceCommand {
    Summary {
        /// Month to report as YYYY-MM. Defaults to the current month.
        #[arg(long)]
        month: Option<String>,
    },
    Export {
        /// Output path. Defaults to financial-data-YYYY-MM-DD.json.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Usage(String),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = load_config(&cli.config).unwrap_or_else(|e: ConfigError| {
        eprintln!("Failed to load configuration: {e}");
        eprintln!("Please copy 'config.example.yaml' to 'config.yaml' and modify as needed.");
        std::process::exit(1);
    });

    init_tracing(&config.features.log_level, &config.features.log_format);
    let runtime = build_runtime();

    match runtime.block_on(run(cli.command, config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn build_runtime() -> tokio::runtime::Runtime {
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_io();
    runtime_builder.enable_time();
    runtime_builder.build().unwrap_or_else(|e| {
        eprintln!("Failed to initialize Tokio runtime: {e}");
        std::process::exit(1);
    })
}

async fn run(command: Command, config: AppConfig) -> Result<(), CliError> {
    let store = DirKvStore::new(&config.storage.data_dir);
    match command {
        Command::Chat { bot, model } => run_chat(&config, &store, &bot, model).await,
        Command::Bots(command) => run_bots(&config, &store, command),
        Command::Finance(command) => run_finance(&store, command),
    }
}

async fn run_chat(
    config: &AppConfig,
    store: &DirKvStore,
    bot_ref: &str,
    model: Option<String>,
) -> Result<(), CliError> {
    let registry = BotRegistry::open(store);
    let mut bot = registry
        .find(bot_ref)
        .ok_or_else(|| CliError::Usage(format!("no bot named '{bot_ref}'")))?;
    if let Some(model) = model {
        bot.model = model;
    }
    if !bot.is_active {
        tracing::warn!(bot = %bot.name, "chatting with an inactive bot");
    }

    let transport = HttpTransport::new(&config.endpoint)?;
    let session = ChatSession::new(transport, SessionOptions::from(&config.chat));
    tracing::info!(bot = %bot.name, model = %bot.model, endpoint = %session.transport().url(), "chat session ready");
    eprintln!("Chatting with {} ({}). /reset clears, /quit exits.", bot.name, bot.model);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let utterance = line.trim();
        match utterance {
            "" => continue,
            "/quit" => break,
            "/reset" => {
                session.reset();
                eprintln!("Conversation cleared.");
                continue;
            }
            _ => {}
        }

        let request = CycleRequest::for_bot(&bot, utterance, &config.chat.default_system_prompt);
        match run_cycle(&session, request).await? {
            CycleOutcome::Completed { .. } | CycleOutcome::Cancelled => {}
            CycleOutcome::Failed(_) => {
                if let Some(notice) = session.last_notice() {
                    eprintln!("{}: {}", notice.title, notice.description);
                }
            }
            CycleOutcome::Rejected => eprintln!("Still waiting for the previous reply."),
        }
    }
    Ok(())
}

/// Drive one cycle, printing assistant text as the session publishes it.
async fn run_cycle<T: ChatTransport>(
    session: &ChatSession<T>,
    request: CycleRequest,
) -> io::Result<CycleOutcome> {
    let mut views = session.subscribe();
    // The user message lands at this index; the reply follows it.
    let reply_index = session.messages().len() + 1;
    let mut stdout = tokio::io::stdout();
    let mut printed = 0;

    let mut cycle = std::pin::pin!(session.send(request));
    let outcome = loop {
        tokio::select! {
            outcome = &mut cycle => break outcome,
            Ok(()) = views.changed() => {
                printed = print_reply(session, reply_index, printed, &mut stdout).await?;
            }
        }
    };
    printed = print_reply(session, reply_index, printed, &mut stdout).await?;

    if let Some(reply) = session.messages().get(reply_index) {
        if let Some(image_url) = reply.image_url.as_deref() {
            stdout.write_all(format!("\n[image] {image_url}").as_bytes()).await?;
            printed += 1;
        }
    }
    if printed > 0 {
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }
    Ok(outcome)
}

/// Write the part of the reply not yet printed and return the new offset.
async fn print_reply<T: ChatTransport>(
    session: &ChatSession<T>,
    reply_index: usize,
    printed: usize,
    stdout: &mut tokio::io::Stdout,
) -> io::Result<usize> {
    let messages = session.messages();
    let Some(reply) = messages.get(reply_index) else {
        return Ok(printed);
    };
    if reply.role != Role::Assistant || reply.content.len() <= printed {
        return Ok(printed);
    }
    stdout.write_all(reply.content[printed..].as_bytes()).await?;
    stdout.flush().await?;
    Ok(reply.content.len())
}

fn run_bots(config: &AppConfig, store: &DirKvStore, command: BotsCommand) -> Result<(), CliError> {
    let registry = BotRegistry::open(store);
    match command {
        BotsCommand::List { search, bot_type } => {
            let bots = registry.filter(&search, bot_type);
            if bots.is_empty() {
                println!("No bots found.");
            }
            for bot in bots {
                let status = if bot.is_active { "active" } else { "inactive" };
                println!(
                    "{}  {:<24} {:<17} {:<24} {}",
                    bot.id, bot.name, bot.bot_type, bot.model, status
                );
            }
        }
        BotsCommand::Create {
            template,
            name,
            model,
        } => {
            let template = find_template(&template)
                .ok_or_else(|| CliError::Usage(format!("unknown template '{template}'")))?;
            let bot = registry.create_from_template(
                &config.identity.user_id,
                template,
                name.as_deref(),
                model.as_deref(),
            )?;
            println!("Created {} ({})", bot.name, bot.id);
        }
        BotsCommand::Toggle { bot } => {
            let id = resolve_bot(&registry, &bot)?;
            let bot = registry.toggle_active(id)?;
            let status = if bot.is_active { "active" } else { "inactive" };
            println!("{} is now {status}", bot.name);
        }
        BotsCommand::Delete { bot } => {
            let id = resolve_bot(&registry, &bot)?;
            registry.delete(id)?;
            println!("Deleted {bot}");
        }
        BotsCommand::Templates => {
            for template in BOT_TEMPLATES {
                println!(
                    "{:<16} {:<20} {:<17} {}",
                    template.id, template.name, template.bot_type, template.description
                );
            }
            println!();
            for model in MODELS {
                println!("{:<24} {}", model.id, model.label);
            }
        }
    }
    Ok(())
}

fn resolve_bot(registry: &BotRegistry<&DirKvStore>, bot_ref: &str) -> Result<uuid::Uuid, CliError> {
    registry
        .find(bot_ref)
        .map(|bot| bot.id)
        .ok_or_else(|| CliError::Usage(format!("no bot named '{bot_ref}'")))
}

fn run_finance(store: &DirKvStore, command: FinanceCommand) -> Result<(), CliError> {
    let ledger = FinanceLedger::open(store);
    match command {
        FinanceCommand::Summary { month } => {
            let day = match month.as_deref() {
                Some(month) => parse_month(month)?,
                None => Local::now().date_naive(),
            };
            let summary = ledger.summary(day);
            println!("{}-{:02}", day.year(), day.month());
            println!("  Income:    {:>12.2}", summary.month.total_income);
            println!("  Expenses:  {:>12.2}", summary.month.total_expenses);
            println!("  Net:       {:>12.2}", summary.month.net_profit);
            for (category, amount) in category_ranking(&summary.month) {
                println!("    {category:<24} {amount:>12.2}");
            }
            if !summary.budgets.is_empty() {
                println!("Budgets");
                for row in &summary.budgets {
                    println!(
                        "  {:<24} {:>12.2} of {:>12} ({:.0}%)",
                        row.budget.category, row.spent, row.budget.amount, row.percentage
                    );
                }
            }
            println!(
                "Pending invoices: {} totalling {:.2}",
                summary.pending.count, summary.pending.amount
            );
        }
        FinanceCommand::Export { out } => {
            let now = Utc::now();
            let path = out.unwrap_or_else(|| PathBuf::from(export_file_name(now.date_naive())));
            let json = serde_json::to_string_pretty(&ledger.export(now))?;
            std::fs::write(&path, json)?;
            println!("Exported to {}", path.display());
        }
    }
    Ok(())
}

fn parse_month(month: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
        .map_err(|_| CliError::Usage(format!("invalid month '{month}', expected YYYY-MM")))
}
