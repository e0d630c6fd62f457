// linkedin-agent-cli/src/models/cli.rs
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// LinkedIn agent: ask an LLM questions that it answers with live LinkedIn data
/// from an MCP server.
/// Starts an interactive session by default.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase message verbosity.
    ///
    /// Specify multiple times for more verbose output:
    ///  -v:  INFO level
    ///  -vv: DEBUG level
    ///  -vvv: TRACE level (most verbose)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Optional TOML file with agent settings. Environment variables take precedence.
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send one message and print the final answer.
    Chat { message: String },
    /// Send one message and print the answer as it is generated.
    Stream { message: String },
    /// Summarise your recommended jobs.
    Jobs,
    /// Insights about a person from their profile URL.
    Profile { url: String },
    /// Insights about a company from its LinkedIn page URL.
    Company { url: String },
    /// Analyze a job posting, given its URL or job ID.
    Job { job: String },
    /// Search jobs by keywords and location.
    Search { keywords: String, location: String },
    /// List the MCP tools available to the agent.
    Tools,
    /// Chat in a REPL (the default).
    Interactive,
}
