// linkedin-agent-cli/src/main.rs
mod models;

use anyhow::{anyhow, Context, Result};
use colored::*;
use futures::StreamExt;
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use rustyline::error::ReadlineError;
use rustyline::{Config as EditorConfig, DefaultEditor};

use linkedin_agent_core::{AgentError, Config, LinkedInAgent};

use clap::Parser;
use models::cli::{Cli, Commands};
use time::macros::format_description;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{
    fmt::{self, time::LocalTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const APP_DIR: &str = "linkedin-agent";
const LOG_FILE_NAME: &str = "linkedin-agent.log";
const HISTORY_FILE_NAME: &str = "cli_history.txt";

fn app_dir() -> Option<PathBuf> {
    dirs::cache_dir()
        .or_else(dirs::runtime_dir)
        .or_else(|| Some(env::temp_dir()))
        .map(|d| d.join(APP_DIR))
}

fn print_welcome_message(agent: &LinkedInAgent) {
    println!("\n{}", "LinkedIn Agent".cyan().bold());
    if let Ok(tools) = agent.tools() {
        println!("{}: {}", "Tools".cyan(), tools.join(", "));
    }
    println!(
        "{}\n{}",
        "Type 'exit', 'quit', Ctrl-D, or press Enter on an empty line to quit.".dimmed(),
        "Type 'reset' to start a fresh conversation, 'tools' to list tools.".dimmed()
    );
    println!();
}

fn print_reply(reply: &str) {
    println!("{}", reply);
}

fn print_tools(agent: &LinkedInAgent) -> Result<()> {
    let tools = agent.tools()?;
    if tools.is_empty() {
        println!("No tools available.");
        return Ok(());
    }
    println!("\n{}", "Available Tools:".bold());
    for name in tools {
        println!("  {}", name);
    }
    Ok(())
}

/// Prints the reply fragment by fragment as it arrives.
async fn stream_reply(agent: &mut LinkedInAgent, message: &str) -> Result<()> {
    let mut reply = agent.stream_chat(message).await?;
    let mut stdout = io::stdout();
    while let Some(fragment) = reply.next().await {
        let fragment = fragment?;
        write!(stdout, "{}", fragment).context("Failed to write to stdout")?;
        stdout.flush().context("Failed to flush stdout")?;
    }
    writeln!(stdout).context("Failed to write to stdout")?;
    Ok(())
}

fn report_agent_error(e: &anyhow::Error) {
    eprintln!("\n{}: {}", "Agent run encountered an error".red(), e);
    if let Some(AgentError::UpstreamAuth(_)) = e.downcast_ref::<AgentError>() {
        eprintln!(
            "{}",
            "The LinkedIn session was rejected. Refresh the session cookie of the MCP server and try again."
                .yellow()
        );
    }
}

/// Runs an interactive chat session using rustyline for a REPL experience.
async fn run_interactive(agent: &mut LinkedInAgent) -> Result<()> {
    print_welcome_message(agent);

    let rl_config = EditorConfig::builder()
        .history_ignore_space(true)
        .edit_mode(rustyline::EditMode::Emacs)
        .auto_add_history(true)
        .build();
    let mut rl = DefaultEditor::with_config(rl_config)?;

    let history_dir =
        app_dir().ok_or_else(|| anyhow!("Could not determine cache directory for history file"))?;
    fs::create_dir_all(&history_dir).context("Failed to create history directory")?;
    let history_file_path = history_dir.join(HISTORY_FILE_NAME);
    if rl.load_history(&history_file_path).is_err() {
        debug!(path = %history_file_path.display(), "No previous CLI history found or error loading.");
    }

    let prompt = format!("{} ", ">".green().bold());

    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let input = line.trim();
                let command = input.to_lowercase();

                if input.is_empty() || command == "exit" || command == "quit" {
                    info!("Exit command or empty line entered, exiting interactive mode.");
                    break;
                }
                if command == "reset" {
                    agent.reset_conversation()?;
                    println!("\n{}\n", "Starting a new conversation...".cyan());
                    continue;
                }
                if command == "tools" {
                    print_tools(agent)?;
                    continue;
                }

                println!();
                if let Err(e) = stream_reply(agent, input).await {
                    error!("Agent run encountered an error: {}", e);
                    report_agent_error(&e);
                }
                println!();
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".yellow());
                continue;
            }
            Err(ReadlineError::Eof) => {
                info!("EOF detected, exiting interactive mode.");
                break;
            }
            Err(err) => {
                error!("Readline error: {:?}", err);
                eprintln!("Error reading input: {}", err.to_string().red());
                break;
            }
        }
    }

    if let Err(e) = rl.save_history(&history_file_path) {
        warn!(path = %history_file_path.display(), error = %e, "Failed to save CLI history.");
    } else {
        debug!(path = %history_file_path.display(), "Saved CLI history.");
    }
    Ok(())
}

async fn run_command(agent: &mut LinkedInAgent, command: Commands) -> Result<()> {
    match command {
        Commands::Chat { message } => print_reply(&agent.chat(&message).await?),
        Commands::Stream { message } => stream_reply(agent, &message).await?,
        Commands::Jobs => print_reply(&agent.get_recommended_jobs().await?),
        Commands::Profile { url } => print_reply(&agent.get_profile_insights(&url).await?),
        Commands::Company { url } => print_reply(&agent.get_company_insights(&url).await?),
        Commands::Job { job } => print_reply(&agent.analyze_job(&job).await?),
        Commands::Search { keywords, location } => {
            print_reply(&agent.search_jobs(&keywords, &location).await?)
        }
        Commands::Tools => print_tools(agent)?,
        Commands::Interactive => run_interactive(agent).await?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    colored::control::set_override(true);

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // --- Logging Setup ---
    let default_level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(default_level.into()));

    let log_dir = match app_dir() {
        Some(dir) => dir,
        None => {
            eprintln!("{}", "Error: Could not determine a suitable directory for log files.".red());
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("{} Failed to create log directory {}: {}", "Error:".red(), log_dir.display(), e);
        return ExitCode::FAILURE;
    }
    let log_path = log_dir.join(LOG_FILE_NAME);

    let file_appender = tracing_appender::rolling::never(&log_dir, LOG_FILE_NAME);
    let (non_blocking_writer, _guard) = tracing_appender::non_blocking(file_appender);

    let local_timer = LocalTime::new(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
    ));
    let file_layer = fmt::layer()
        .with_writer(non_blocking_writer)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .with_timer(local_timer.clone());
    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_timer(local_timer)
        .with_target(false)
        .with_level(true);

    if let Err(e) = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
    {
        eprintln!("{} Failed to initialize logging: {}", "Error:".red(), e);
        return ExitCode::FAILURE;
    }
    colored::control::unset_override();

    info!(
        "Logging initialized. Level determined by RUST_LOG or -v flags (default: {}). Logging to stderr and {}",
        default_level,
        log_path.display()
    );
    // --- End Logging Setup ---

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("{} {}", "Error:".red(), e);
            return ExitCode::FAILURE;
        }
    };
    debug!(?config, "Configuration loaded");

    let mut agent = LinkedInAgent::new(config);
    if let Err(e) = agent.initialize().await {
        error!("Failed to initialize agent: {}", e);
        eprintln!("{} {}", "Error:".red(), e);
        return ExitCode::FAILURE;
    }

    let command = cli.command.unwrap_or(Commands::Interactive);
    let result = run_command(&mut agent, command).await;

    if let Err(e) = agent.close().await {
        warn!(error = %e, "Failed to close agent cleanly.");
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Operation failed: {}", e);
            report_agent_error(&e);
            ExitCode::FAILURE
        }
    }
}
