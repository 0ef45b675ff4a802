//! HeartChat CLI entry point.
//!
//! Provides `init`, `chat`, and `ask` subcommands for creating the runtime
//! directory, running an interactive session, or answering a single message.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use heartchat::config::{self, Config, RuntimePaths};
use heartchat::credentials;
use heartchat::directive::DirectiveBundle;
use heartchat::logging;
use heartchat::prompt::FilePromptSource;
use heartchat::providers::router::build_provider;
use heartchat::session::{
    Collaborators, ConsoleNotifier, ConsoleTranscript, MemoryTranscript, NoticeKind, Notifier,
    Orchestrator, Personas, Transcript, TurnError,
};

/// HeartChat: emotion-steered two-stage chat.
#[derive(Parser)]
#[command(name = "heartchat", version, about)]
struct Cli {
    /// Runtime directory (default: ~/.heartchat).
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Create the runtime directory and a default config.toml.
    Init {
        /// Overwrite an existing config.toml.
        #[arg(long)]
        force: bool,
    },
    /// Start an interactive chat session.
    Chat {
        /// Append the transcript to every reply prompt.
        #[arg(long)]
        context: bool,
        /// Print the decoded directives after each turn.
        #[arg(long)]
        show_directives: bool,
    },
    /// Send one message and print the reply.
    Ask {
        /// The message to send.
        message: String,
        /// Append the transcript to the reply prompt.
        #[arg(long)]
        context: bool,
    },
}

const CHAT_HELP: &str = "Commands: /context on|off, /save, /help, /quit";

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let paths = match cli.home {
        Some(root) => RuntimePaths::under(root),
        None => config::runtime_paths()?,
    };

    match cli.command {
        Command::Init { force } => handle_init(&paths, force).map(|()| ExitCode::SUCCESS),
        Command::Chat {
            context,
            show_directives,
        } => handle_chat(&paths, context, show_directives)
            .await
            .map(|()| ExitCode::SUCCESS),
        Command::Ask { message, context } => handle_ask(&paths, &message, context).await,
    }
}

/// Create the runtime layout.
fn handle_init(paths: &RuntimePaths, force: bool) -> anyhow::Result<()> {
    logging::init_cli();

    std::fs::create_dir_all(&paths.prompts_dir)
        .with_context(|| format!("failed to create {}", paths.prompts_dir.display()))?;

    if paths.config_toml.exists() && !force {
        anyhow::bail!(
            "{} already exists, pass --force to overwrite",
            paths.config_toml.display()
        );
    }
    config::save_config(&paths.config_toml, &Config::default())?;

    println!("Wrote {}", paths.config_toml.display());
    println!(
        "Put steering prompt files in {} and your API key in {}",
        paths.prompts_dir.display(),
        paths.env_file.display()
    );
    Ok(())
}

/// Run the interactive loop over stdin.
async fn handle_chat(
    paths: &RuntimePaths,
    context: bool,
    show_directives: bool,
) -> anyhow::Result<()> {
    let _logging_guard = logging::init_production(&paths.logs_dir)?;

    let mut config = load_validated_config(paths)?;
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);
    let transcript: Arc<dyn Transcript> = Arc::new(ConsoleTranscript::new());
    let mut orchestrator = build_orchestrator(
        &config,
        paths,
        transcript,
        Arc::clone(&notifier),
        context || config.chat.context_enabled,
    )?;

    info!(model = %config.service.model, "chat session started");
    eprintln!("{CHAT_HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/help" => eprintln!("{CHAT_HELP}"),
            "/context on" => {
                orchestrator.set_context_enabled(true);
                notifier.notify(NoticeKind::Info, "Context enabled.");
            }
            "/context off" => {
                orchestrator.set_context_enabled(false);
                notifier.notify(NoticeKind::Info, "Context disabled.");
            }
            "/save" => {
                config.chat.context_enabled = orchestrator.context_enabled();
                match config::save_config(&paths.config_toml, &config) {
                    Ok(()) => notifier.notify(NoticeKind::Info, "Configuration saved."),
                    Err(e) => notifier.notify(
                        NoticeKind::Error,
                        &format!("Failed to save configuration: {e:#}"),
                    ),
                }
            }
            _ => match orchestrator.submit(&line).await {
                Ok(report) if show_directives => print_directives(&report.directives),
                // Failures were already surfaced by the notifier.
                Ok(_) | Err(_) => {}
            },
        }
    }

    info!("chat session ended");
    Ok(())
}

/// Run a single turn and print the labeled reply.
///
/// Turn failures were already shown by the notifier, so they only set the
/// exit code.
async fn handle_ask(
    paths: &RuntimePaths,
    message: &str,
    context: bool,
) -> anyhow::Result<ExitCode> {
    logging::init_cli();

    let config = load_validated_config(paths)?;
    let transcript: Arc<dyn Transcript> = Arc::new(MemoryTranscript::new());
    let mut orchestrator = build_orchestrator(
        &config,
        paths,
        transcript,
        Arc::new(ConsoleNotifier),
        context || config.chat.context_enabled,
    )?;

    match orchestrator.submit(message).await {
        Ok(report) => {
            println!("{}", report.reply_line);
            Ok(ExitCode::SUCCESS)
        }
        Err(TurnError::EmptyMessage) => anyhow::bail!("message must not be empty"),
        Err(_) => Ok(ExitCode::FAILURE),
    }
}

fn load_validated_config(paths: &RuntimePaths) -> anyhow::Result<Config> {
    let config = config::load_config_or_default(&paths.config_toml)?;
    config
        .validate()
        .with_context(|| format!("invalid config at {}", paths.config_toml.display()))?;
    Ok(config)
}

fn build_orchestrator(
    config: &Config,
    paths: &RuntimePaths,
    transcript: Arc<dyn Transcript>,
    notifier: Arc<dyn Notifier>,
    context_enabled: bool,
) -> anyhow::Result<Orchestrator> {
    let credentials = credentials::load_runtime_credentials(paths)?;
    let provider =
        build_provider(&config.service, &credentials).context("failed to create provider")?;

    let prompts = Arc::new(FilePromptSource::new(
        paths.prompts_dir.clone(),
        config.prompts.analysis_file.clone(),
        config.prompts.reply_file.clone(),
        config.persona.bot_name.clone(),
        Arc::clone(&notifier),
    ));

    let collaborators = Collaborators {
        provider,
        prompts,
        transcript,
        notifier,
    };
    let personas = Personas {
        user_name: config.persona.user_name.clone(),
        bot_name: config.persona.bot_name.clone(),
    };
    Ok(Orchestrator::new(collaborators, personas, context_enabled))
}

fn print_directives(directives: &DirectiveBundle) {
    println!(
        "  [analysis] temperature: {}  top_p: {}",
        directives.sampling.temperature, directives.sampling.top_p
    );
    for (name, weight) in directives.emotions.iter() {
        println!("  [analysis] {name}: {weight}");
    }
    if !directives.steering_prompt.is_empty() {
        println!("  [analysis] prompt: {}", directives.steering_prompt);
    }
}
