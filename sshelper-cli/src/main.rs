//! # sshelper CLI
//!
//! Command-line interface for the SSH assistant.
//!
//! Usage:
//!   sshelper --hostname <HOST> --port <PORT> --username <USER> --key_path <KEY>
//!   sshelper [CONNECTION] translate [--yes] [--analyze]
//!   sshelper ask <prompt>
//!
//! Examples:
//!   sshelper --hostname 10.0.0.7 --username ubuntu --key_path ~/.ssh/ec2.pem
//!   sshelper --hostname 10.0.0.7 --username ubuntu --key_path ~/.ssh/ec2.pem translate --analyze
//!   sshelper ask "How do I list open ports?"

use clap::{Parser, Subcommand, ValueEnum};
use sshelper_agent::{Agent, AgentConfig, StdTerminal};
use sshelper_error::Result;
use sshelper_llm::provider::DEFAULT_MODEL;
use sshelper_llm::{
    api_key_from_env, Assistant, LlmProvider, OpenAIProvider, ProviderConfig, ScriptDialect,
};
use sshelper_remote::{
    ConnectOptions, OpenSshExecutor, RemoteSession, ShellState, SshTarget, DEFAULT_SCRIPT_PATH,
};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sshelper")]
#[command(author, version, about = "sshelper - an LLM assistant for a remote shell")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// SSH hostname
    #[arg(long, env = "SSHELPER_HOST", global = true)]
    hostname: Option<String>,

    /// SSH port
    #[arg(long, env = "SSHELPER_PORT", default_value_t = 22, global = true)]
    port: u16,

    /// SSH username
    #[arg(long, env = "SSHELPER_USER", global = true)]
    username: Option<String>,

    /// Path to the SSH private key file
    #[arg(long = "key-path", alias = "key_path", env = "SSHELPER_KEY_PATH", global = true)]
    key_path: Option<PathBuf>,

    /// Chat model to use
    #[arg(long, env = "SSHELPER_MODEL", default_value = DEFAULT_MODEL, global = true)]
    model: String,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "SSHELPER_API_BASE", global = true)]
    api_base: Option<String>,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Clone, Debug, PartialEq)]
enum Commands {
    /// Run commands on the host and get help with their output (default)
    Assist {
        /// Only run commands, never ask the model
        #[arg(long)]
        no_assist: bool,
    },
    /// Describe tasks in plain language and run the generated scripts
    Translate {
        /// Run scripts without asking for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Ask the model to describe each script's output
        #[arg(long)]
        analyze: bool,

        /// Which scripts the model may write
        #[arg(long, value_enum, default_value_t = Dialect::Bash)]
        dialect: Dialect,

        /// Staging path, locally and on the host
        #[arg(long, default_value = DEFAULT_SCRIPT_PATH)]
        script_path: String,
    },
    /// Send one prompt to the model and print the reply
    Ask {
        #[arg(trailing_var_arg = true, required = true)]
        prompt: Vec<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Dialect {
    Bash,
    BashOrPython,
}

impl From<Dialect> for ScriptDialect {
    fn from(dialect: Dialect) -> Self {
        match dialect {
            Dialect::Bash => ScriptDialect::Bash,
            Dialect::BashOrPython => ScriptDialect::BashOrPython,
        }
    }
}

impl Cli {
    /// The subcommand, `assist` when none was given
    fn command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or(Commands::Assist { no_assist: false })
    }

    fn target(&self) -> SshTarget {
        SshTarget::new(
            self.hostname.clone().unwrap_or_default(),
            self.port,
            self.username.clone().unwrap_or_default(),
            self.key_path.clone().unwrap_or_default(),
        )
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn assistant(cli: &Cli) -> Result<Assistant<OpenAIProvider>> {
    let api_key = api_key_from_env()?;
    info!("OpenAI API key loaded");

    let mut config = ProviderConfig::openai(api_key).with_model(&cli.model);
    if let Some(base) = &cli.api_base {
        config = config.with_base_url(base);
    }
    Ok(Assistant::new(OpenAIProvider::new(config)?))
}

fn log_usage<P: LlmProvider>(agent: &Agent<P>) {
    let usage = agent.assistant().usage();
    let total = usage.total();
    debug!(
        calls = usage.calls(),
        prompt_tokens = total.prompt_tokens,
        completion_tokens = total.completion_tokens,
        "model usage"
    );
}

async fn run(cli: Cli) -> Result<()> {
    let assistant = assistant(&cli)?;

    match cli.command() {
        Commands::Ask { prompt } => {
            let mut agent = Agent::new(assistant);
            agent.run_ask(&prompt.join(" "), &mut StdTerminal::stdio()).await?;
            log_usage(&agent);
        }
        Commands::Assist { no_assist } => {
            let target = cli.target();
            target.validate()?;
            let session = RemoteSession::connect(&target, &ConnectOptions::default()).await?;

            let config = AgentConfig {
                assist: !no_assist,
                ..Default::default()
            };
            let mut agent = Agent::with_config(assistant, config);
            let mut term = StdTerminal::stdio();
            let result = agent.run_assist(&session, &mut term).await;

            session.close().await?;
            let report = result?;
            debug!(commands = report.commands, "assist loop finished");
            log_usage(&agent);
        }
        Commands::Translate {
            yes,
            analyze,
            dialect,
            script_path,
        } => {
            let target = cli.target();
            target.validate()?;

            let config = AgentConfig {
                auto_confirm: yes,
                analyze,
                dialect: dialect.into(),
                local_script_path: PathBuf::from(&script_path),
                remote_script_path: script_path,
                ..Default::default()
            };
            let mut agent = Agent::with_config(assistant, config);
            let executor = OpenSshExecutor::new(target.clone());
            let mut state = ShellState::new(target.home_dir());
            let mut term = StdTerminal::stdio();

            let report = agent
                .run_translate(&format!("{}> ", target), &executor, &mut state, &mut term)
                .await?;
            debug!(
                commands = report.commands,
                scripts_run = report.scripts_run,
                "translate loop finished"
            );
            log_usage(&agent);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli).await {
        debug!("{:?}", err);
        eprintln!("Error: {}", err.message());
        std::process::exit(1);
    }
}
