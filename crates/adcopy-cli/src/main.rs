mod config;
mod logging;
mod seed;
mod templates;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use adcopy_core::{
    count_tokens, ChatSession, CompletionProvider, HistoryCompactor, Message, TimeoutProvider,
    TokenAccountant,
};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use colored::Colorize;

use config::{AppConfig, Overrides};
use seed::SeedOptions;
use templates::{load_record, Category};

#[derive(Parser)]
#[command(name = "adcopy")]
#[command(about = "Polo ad copy assistant with token-budgeted chat history")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./adcopy.toml, then ~/.adcopy/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    debug: bool,

    /// Model identifier
    #[arg(long, global = true)]
    model: Option<String>,

    /// Token threshold that triggers history compaction
    #[arg(long, global = true)]
    threshold: Option<u32>,

    /// Sampling temperature
    #[arg(long, global = true)]
    temperature: Option<f32>,

    /// Per-call timeout in seconds (0 disables it)
    #[arg(long = "timeout", global = true)]
    timeout_secs: Option<u64>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, global = true)]
    api_base: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one ad caption for a record
    Generate {
        #[arg(long, value_enum)]
        category: Category,
        /// JSON file holding the record
        #[arg(long)]
        record: PathBuf,
    },
    /// Start interactive chat
    Chat {
        #[arg(long, value_enum)]
        category: Option<Category>,
        /// Record used to open the conversation (requires --category)
        #[arg(long)]
        record: Option<PathBuf>,
        /// Files pinned as context data
        #[arg(long = "context")]
        context: Vec<PathBuf>,
    },
    /// Send a single message on a fresh session
    Send {
        /// Message content
        message: String,
        #[arg(long, value_enum)]
        category: Option<Category>,
        #[arg(long = "context")]
        context: Vec<PathBuf>,
    },
    /// Count tokens of a JSON transcript
    Count {
        #[arg(long)]
        file: PathBuf,
    },
    /// Run one compaction pass over a JSON transcript and print the result
    Compact {
        #[arg(long)]
        file: PathBuf,
    },
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            api_base: self.api_base.clone(),
            model: self.model.clone(),
            token_threshold: self.threshold,
            temperature: self.temperature,
            request_timeout_secs: self.timeout_secs,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(cli.debug);

    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_overrides(cli.overrides());
    tracing::debug!(
        "Effective configuration: model={} temperature={}",
        config.model,
        config.temperature
    );

    match cli.command {
        Commands::Generate { category, record } => generate(&config, category, &record).await,
        Commands::Chat {
            category,
            record,
            context,
        } => run_interactive_chat(&config, category, record.as_deref(), context).await,
        Commands::Send {
            message,
            category,
            context,
        } => send_message(&config, category, context, &message).await,
        Commands::Count { file } => count(&config, &file).await,
        Commands::Compact { file } => compact(&config, &file).await,
    }
}

fn timed_provider(config: &AppConfig) -> anyhow::Result<Arc<dyn CompletionProvider>> {
    let provider = config.build_provider()?;
    let provider: Arc<dyn CompletionProvider> = match config.request_timeout() {
        Some(timeout) => Arc::new(TimeoutProvider::new(provider, timeout)),
        None => Arc::new(provider),
    };
    Ok(provider)
}

async fn new_session(config: &AppConfig, seed: &SeedOptions) -> anyhow::Result<ChatSession> {
    let provider = Arc::new(config.build_provider()?);
    let session = ChatSession::new(
        config.session_config().await?,
        provider,
        seed.conversation()?,
    )?;
    tracing::debug!(
        "Session {} seeded with {} pinned messages",
        session.id(),
        session.history().len()
    );
    Ok(session)
}

fn load_transcript(path: &Path) -> anyhow::Result<Vec<Message>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read transcript {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| {
        format!(
            "{} must be a JSON array of {{\"role\", \"content\"}} objects",
            path.display()
        )
    })
}

async fn generate(config: &AppConfig, category: Category, record: &Path) -> anyhow::Result<()> {
    let record = load_record(record)?;
    let provider = timed_provider(config)?;
    let messages = vec![
        Message::system(category.system_prompt()),
        Message::user(category.user_prompt(&record)),
    ];

    eprintln!("{}", format!("🚀 Generating {} ad with {}", category, config.model).cyan());
    let start = Instant::now();
    let reply = provider.complete(&messages, &config.model).await?;
    tracing::debug!("Generation took {:?}", start.elapsed());

    println!("{}", reply);
    Ok(())
}

async fn send_message(
    config: &AppConfig,
    category: Option<Category>,
    context: Vec<PathBuf>,
    message: &str,
) -> anyhow::Result<()> {
    let mut session = new_session(config, &SeedOptions::new(category, context)).await?;
    let reply = session.converse(message).await?;
    println!("{}", reply);
    Ok(())
}

async fn run_interactive_chat(
    config: &AppConfig,
    category: Option<Category>,
    record: Option<&Path>,
    context: Vec<PathBuf>,
) -> anyhow::Result<()> {
    let opening = match (category, record) {
        (Some(category), Some(path)) => Some(category.user_prompt(&load_record(path)?)),
        (None, Some(_)) => bail!("--record needs --category to pick a prompt template"),
        _ => None,
    };

    let mut session = new_session(config, &SeedOptions::new(category, context)).await?;

    println!("{}", "🏇 Polo Ad GPT Interactive Chat".cyan().bold());
    println!("{}", format!("Session ID: {}", session.id()).dimmed());
    println!(
        "{}",
        format!(
            "Model: {} · compaction threshold: {} tokens",
            session.config().model,
            session.config().token_threshold
        )
        .dimmed()
    );
    println!(
        "{}",
        "Type 'exit' or 'quit' to leave, '/history' or '/tokens' to inspect".dimmed()
    );
    println!();

    if let Some(opening) = opening {
        println!("{}", "Assistant:".green().bold());
        turn(&mut session, &opening).await;
    }

    loop {
        print!("{} ", "You:".cyan().bold());
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            println!("{}", "👋 Goodbye!".cyan());
            break;
        }

        if input.is_empty() {
            continue;
        }

        match input {
            "/history" => print_history(&session),
            "/tokens" => print_tokens(&session),
            _ => {
                println!("{}", "Assistant:".green().bold());
                turn(&mut session, input).await;
            }
        }
    }

    Ok(())
}

async fn turn(session: &mut ChatSession, input: &str) {
    match session.converse(input).await {
        Ok(reply) => {
            println!("{}", reply);
            if let Some(prepared) = session.last_prepared().filter(|p| p.compacted) {
                println!(
                    "{}",
                    format!(
                        "ℹ️  Earlier turns were summarized ({} → {} tokens)",
                        prepared.tokens_before,
                        prepared.effective_tokens()
                    )
                    .dimmed()
                );
            }
        }
        Err(e) => println!("{}", format!("❌ Error: {}", e).red()),
    }
    println!();
}

fn print_history(session: &ChatSession) {
    for message in session.history().messages() {
        let preview: String = message.content.chars().take(100).collect();
        let ellipsis = if message.content.chars().count() > 100 {
            "…"
        } else {
            ""
        };
        println!(
            "{} {}{}",
            format!("[{}]", message.role).dimmed(),
            preview.replace('\n', " "),
            ellipsis
        );
    }
    println!();
}

fn print_tokens(session: &ChatSession) {
    let threshold = session.config().token_threshold;
    let tokens = session.token_count();
    println!(
        "{}",
        format!(
            "History: {} tokens ({:.1}% of {} threshold)",
            tokens,
            tokens as f64 / threshold as f64 * 100.0,
            threshold
        )
        .yellow()
    );
    if let Some(prepared) = session.last_prepared() {
        println!(
            "{}",
            format!(
                "Last request: {} tokens sent, compacted: {}",
                prepared.effective_tokens(),
                prepared.compacted
            )
            .dimmed()
        );
    }
    println!();
}

async fn count(config: &AppConfig, file: &Path) -> anyhow::Result<()> {
    let messages = load_transcript(file)?;
    let tokens = count_tokens(&messages, &config.model);
    let threshold = config.effective_threshold().await?;

    println!("{}", tokens);
    eprintln!(
        "{}",
        format!(
            "{} messages, {} tokens for {} (threshold {}{})",
            messages.len(),
            tokens,
            config.model,
            threshold,
            if tokens > threshold {
                ", would compact"
            } else {
                ""
            }
        )
        .dimmed()
    );
    Ok(())
}

async fn compact(config: &AppConfig, file: &Path) -> anyhow::Result<()> {
    let messages = load_transcript(file)?;
    let threshold = config.effective_threshold().await?;
    let compactor =
        HistoryCompactor::new(timed_provider(config)?, Arc::new(TokenAccountant::new()));

    let prepared = compactor.prepare(&messages, threshold, &config.model).await?;

    println!("{}", serde_json::to_string_pretty(&prepared.messages)?);
    let summary = if prepared.compacted {
        format!(
            "✅ Summarized {} messages: {} → {} tokens (threshold {})",
            prepared.turns_summarized,
            prepared.tokens_before,
            prepared.effective_tokens(),
            threshold
        )
        .green()
    } else {
        format!(
            "Nothing to compact: {} tokens (threshold {})",
            prepared.tokens_before, threshold
        )
        .dimmed()
    };
    eprintln!("{}", summary);
    Ok(())
}
