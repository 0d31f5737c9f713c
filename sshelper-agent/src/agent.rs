//! Agent implementation - the assist loop and shared configuration
//!
//! The translate loop lives in `translate.rs` and shares the same `Agent`.

use crate::command::Command;
use crate::terminal::Terminal;
use sshelper_error::Result;
use sshelper_llm::prompts::next_steps_prompt;
use sshelper_llm::{Assistant, ChatMessage, LlmProvider, ScriptDialect};
use sshelper_remote::{RemoteShell, DEFAULT_SCRIPT_PATH};
use std::path::PathBuf;
use tracing::{debug, error};

pub(crate) const ASSIST_PROMPT: &str = "Enter your command or type 'exit' to quit: ";
pub(crate) const EDIT_INSTRUCTIONS: &str =
    "Enter the new content for the file. End input with Ctrl-D:";

/// Configuration for the agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Ask the model for next steps after each successful command
    pub assist: bool,
    /// Run generated scripts without asking
    pub auto_confirm: bool,
    /// Have the model describe each script's output
    pub analyze: bool,
    pub dialect: ScriptDialect,
    /// Where scripts are written before copying
    pub local_script_path: PathBuf,
    /// Where scripts are copied to on the host
    pub remote_script_path: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            assist: true,
            auto_confirm: false,
            analyze: false,
            dialect: ScriptDialect::default(),
            local_script_path: PathBuf::from(DEFAULT_SCRIPT_PATH),
            remote_script_path: DEFAULT_SCRIPT_PATH.to_string(),
        }
    }
}

/// Counters from one run of a loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopReport {
    /// Non-empty lines handled, `exit` excluded
    pub commands: usize,
    /// Scripts that ran to completion on the host
    pub scripts_run: usize,
}

/// Drives the model and the remote host from typed input
pub struct Agent<P> {
    pub(crate) assistant: Assistant<P>,
    pub(crate) config: AgentConfig,
    /// Translate-mode chat history
    pub(crate) conversation: Vec<ChatMessage>,
}

impl<P: LlmProvider> Agent<P> {
    /// Create a new agent with default configuration
    pub fn new(assistant: Assistant<P>) -> Self {
        Self::with_config(assistant, AgentConfig::default())
    }

    /// Create a new agent with custom configuration
    pub fn with_config(assistant: Assistant<P>, config: AgentConfig) -> Self {
        Self {
            assistant,
            config,
            conversation: Vec::new(),
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn assistant(&self) -> &Assistant<P> {
        &self.assistant
    }

    pub fn conversation(&self) -> &[ChatMessage] {
        &self.conversation
    }

    /// One-shot question, no remote host involved
    pub async fn ask(&mut self, prompt: &str) -> String {
        self.assistant.get_assistance(prompt).await
    }

    /// `ask`, then print `Response from OpenAI: <reply>`
    pub async fn run_ask<T: Terminal>(&mut self, prompt: &str, term: &mut T) -> Result<()> {
        let reply = self.ask(prompt).await;
        term.say(&format!("Response from OpenAI: {}", reply))
    }

    /// Run commands on the host and ask for help with their output until
    /// `exit` or end of input.
    ///
    /// Remote failures are reported and the loop goes on; only terminal
    /// I/O errors end it early.
    pub async fn run_assist<S, T>(&mut self, shell: &S, term: &mut T) -> Result<LoopReport>
    where
        S: RemoteShell,
        T: Terminal,
    {
        let mut report = LoopReport::default();

        while let Some(line) = term.prompt(ASSIST_PROMPT)? {
            let command = Command::assist(&line);
            debug!(?command, "assist input");
            match command {
                Command::Exit => break,
                Command::Empty => continue,
                Command::Edit(path) => self.edit(shell, term, &path).await?,
                Command::Read(path) => match shell.read_file(&path).await {
                    Ok(content) => term.say(&format!("Content of {}:\n{}", path, content))?,
                    Err(err) => {
                        error!("Error reading {}: {}", path, err);
                        term.say(&format!("Error: {}", err.message()))?;
                    }
                },
                Command::Request(cmd) | Command::Chat(cmd) => self.run_remote(shell, term, &cmd).await?,
            }
            report.commands += 1;
        }

        Ok(report)
    }

    async fn edit<S: RemoteShell, T: Terminal>(&mut self, shell: &S, term: &mut T, path: &str) -> Result<()> {
        term.say(EDIT_INSTRUCTIONS)?;
        let content = term.read_to_end()?.join("\n");

        match shell.write_file(path, &content).await {
            Ok(()) => term.say(&format!("File {} updated.", path)),
            Err(err) => {
                error!("Error writing {}: {}", path, err);
                term.say(&format!("Error: {}", err.message()))
            }
        }
    }

    async fn run_remote<S: RemoteShell, T: Terminal>(&mut self, shell: &S, term: &mut T, cmd: &str) -> Result<()> {
        let output = match shell.run_command(cmd).await {
            Ok(output) => output,
            Err(err) => {
                error!("Error running command: {}", err);
                return term.say(&format!("Error: {}", err.message()));
            }
        };

        if !output.stderr.is_empty() {
            return term.say(&format!("Error: {}", output.stderr));
        }
        term.say(&format!("Output: {}", output.stdout))?;

        if self.config.assist {
            let assistance = self
                .assistant
                .get_assistance(&next_steps_prompt(cmd, &output.stdout))
                .await;
            term.say(&format!("Assistance: {}", assistance))?;
        }
        Ok(())
    }
}
