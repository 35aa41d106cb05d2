//! CLI entry point for the NYC taxi question-answering tool.
//!
//! Questions are answered one at a time: the configured trip files are
//! loaded, the question is routed to an aggregation, and the answer is
//! printed and appended to the persisted chat session.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use taxi_query::{
    config::SourcesConfig,
    infra::openai::OpenAiChat,
    infra::store::{LocalStore, S3Store, WebHdfsStore},
    loader::{self, LoaderConfig},
    output::{QueryRecord, append_record, print_json, render},
    pipeline::{QueryContext, Response, handle_chat, handle_query},
    services::chat_api::ChatApi,
    services::file_store::FileStore,
    session::Session,
    source::SourceFile,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "taxi_query")]
#[command(about = "Ask questions about NYC TLC taxi trip data", long_about = None)]
struct Cli {
    /// Where trip files are read from
    #[arg(long, value_enum, default_value_t = StoreKind::Local, global = true)]
    store: StoreKind,

    /// Root directory for the local store
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// S3 bucket for the s3 store (falls back to S3_BUCKET)
    #[arg(long, global = true)]
    bucket: Option<String>,

    /// JSON file listing the trip files to load
    #[arg(short, long, global = true)]
    sources: Option<String>,

    /// Directory to discover trip files in, when no sources file is given
    #[arg(short, long, global = true)]
    dir: Option<String>,

    /// Rows per parsed chunk
    #[arg(long, default_value_t = taxi_query::parser::DEFAULT_CHUNK_SIZE, global = true)]
    chunk_size: usize,

    /// Per-file read timeout in seconds
    #[arg(long, default_value_t = 60, global = true)]
    read_timeout: u64,

    /// Attempts per file for transient store errors
    #[arg(long, default_value_t = 3, global = true)]
    attempts: u32,

    /// Chat session file
    #[arg(long, default_value = "chat_history.json", global = true)]
    history: PathBuf,

    /// Optional CSV file to append a record of every query to
    #[arg(long, global = true)]
    query_log: Option<String>,

    /// Also log each response as JSON
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum StoreKind {
    Local,
    Webhdfs,
    S3,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer one question with the keyword rules
    Ask {
        #[arg(value_name = "QUESTION")]
        question: String,
    },
    /// Send one message to the chat API with the current conversation
    Chat {
        #[arg(value_name = "MESSAGE")]
        message: String,
    },
    /// Interactive session: `/chat <msg>`, `/new`, `/quit`
    Repl,
    /// List the trip files found in a directory
    ListSources {
        #[arg(value_name = "DIR")]
        dir: String,
    },
    /// Show saved conversations
    History,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/taxi_query.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("taxi_query.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Ask { question } => {
            let store = build_store(&cli).await?;
            let sources = resolve_sources(&cli, store.as_ref()).await?;
            let loader = loader_config(&cli);
            let ctx = QueryContext {
                store: store.as_ref(),
                sources: &sources,
                loader: &loader,
            };

            let session = Session::load(&cli.history)?;
            let (session, response) = handle_query(session, &ctx, question).await;
            present(&cli, question, &response)?;
            session.save(&cli.history)?;
        }
        Commands::Chat { message } => {
            let api = OpenAiChat::from_env()?;
            let session = Session::load(&cli.history)?;
            let (session, response) =
                handle_chat(session, api.as_ref().map(|a| a as &dyn ChatApi), message).await;
            present(&cli, message, &response)?;
            session.save(&cli.history)?;
        }
        Commands::Repl => repl(&cli).await?,
        Commands::ListSources { dir } => {
            let store = build_store(&cli).await?;
            let sources = loader::discover(store.as_ref(), dir).await?;
            info!(dir = %dir, count = sources.len(), "Sources discovered");
            for source in &sources {
                println!(
                    "{}\t{}\t{}",
                    source.path,
                    source.class.map_or("unknown", |c| c.as_str()),
                    source.timestamp_column
                );
            }
        }
        Commands::History => {
            let session = Session::load(&cli.history)?;
            for (i, conversation) in session.history.iter().enumerate() {
                println!(
                    "{:>3}. {} ({} messages)",
                    i + 1,
                    conversation.title,
                    conversation.messages.len()
                );
            }
            if !session.active.is_empty() {
                println!("  *  current conversation ({} messages)", session.active.len());
            }
        }
    }

    Ok(())
}

/// Reads questions from stdin until EOF or `/quit`. The session is saved
/// after every exchange.
async fn repl(cli: &Cli) -> Result<()> {
    let store = build_store(cli).await?;
    let sources = resolve_sources(cli, store.as_ref()).await?;
    let loader = loader_config(cli);
    let ctx = QueryContext {
        store: store.as_ref(),
        sources: &sources,
        loader: &loader,
    };
    let api = OpenAiChat::from_env()?;
    let mut session = Session::load(&cli.history)?;

    println!("NYC Taxi Chatbot. Ask anything about NYC TLC trip data.");
    println!("Commands: /chat <message>, /new, /quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();

        let (next, response) = match line {
            "/quit" | "/exit" => break,
            "/new" => {
                session.new_chat();
                session.save(&cli.history)?;
                println!("Started a new conversation.");
                continue;
            }
            _ => match line.strip_prefix("/chat") {
                Some(message) => {
                    handle_chat(session, api.as_ref().map(|a| a as &dyn ChatApi), message.trim())
                        .await
                }
                None => handle_query(session, &ctx, line).await,
            },
        };

        session = next;
        present(cli, line, &response)?;
        session.save(&cli.history)?;
    }

    Ok(())
}

fn present(cli: &Cli, query: &str, response: &Response) -> Result<()> {
    print!("{}", render(response));
    if cli.json {
        print_json(response)?;
    }
    if let Some(path) = &cli.query_log {
        append_record(path, &QueryRecord::from_response(query, response))?;
    }
    Ok(())
}

fn loader_config(cli: &Cli) -> LoaderConfig {
    LoaderConfig {
        chunk_size: cli.chunk_size.max(1),
        read_timeout: Duration::from_secs(cli.read_timeout),
        max_attempts: cli.attempts.max(1),
        ..LoaderConfig::default()
    }
}

async fn build_store(cli: &Cli) -> Result<Box<dyn FileStore>> {
    let store: Box<dyn FileStore> = match cli.store {
        StoreKind::Local => Box::new(LocalStore::new(&cli.root)),
        StoreKind::Webhdfs => {
            let url = std::env::var("WEBHDFS_URL")
                .context("WEBHDFS_URL must be set for the webhdfs store")?;
            let user = std::env::var("WEBHDFS_USER").ok();
            info!(%url, user = user.as_deref().unwrap_or("-"), "Using WebHDFS store");
            Box::new(WebHdfsStore::connect(&url, user))
        }
        StoreKind::S3 => {
            let bucket = match &cli.bucket {
                Some(bucket) => bucket.clone(),
                None => std::env::var("S3_BUCKET")
                    .context("--bucket or S3_BUCKET must be set for the s3 store")?,
            };
            info!(bucket = %bucket, "Using S3 store");
            Box::new(S3Store::from_env(&bucket).await)
        }
    };
    Ok(store)
}

async fn resolve_sources(cli: &Cli, store: &dyn FileStore) -> Result<Vec<SourceFile>> {
    if let Some(path) = &cli.sources {
        return SourcesConfig::load(path)?.descriptors();
    }
    if let Some(dir) = &cli.dir {
        return Ok(loader::discover(store, dir).await?);
    }
    warn!("No --sources or --dir given; every query will report no data");
    Ok(Vec::new())
}
