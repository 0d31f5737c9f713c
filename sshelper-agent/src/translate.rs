//! Translate loop - natural language in, scripts run on the host
//!
//! Lines starting with `!` are plain chat. Everything else asks the model
//! for a script, shows it, and after confirmation stages it with the current
//! shell state and runs it through a `ScriptExecutor`.

use crate::agent::{Agent, LoopReport};
use crate::command::Command;
use crate::terminal::Terminal;
use sshelper_error::Result;
use sshelper_llm::{ChatMessage, LlmProvider};
use sshelper_remote::{stage_script, ScriptExecutor, ShellState};
use tracing::{debug, error, info};

pub(crate) const CONFIRM_PROMPT: &str = "Do you want to proceed? [Y/n]: ";
pub(crate) const SCRIPT_HEADER: &str =
    "The following script will be created and executed on the remote system:";
pub(crate) const NO_SCRIPT: &str = "Error: Could not extract script from API response";

impl<P: LlmProvider> Agent<P> {
    /// Read requests at `prompt` until `exit` or end of input.
    ///
    /// `state` starts at the login directory and follows every script that
    /// ran successfully. Model and execution failures are logged and the
    /// loop goes on.
    pub async fn run_translate<E, T>(
        &mut self,
        prompt: &str,
        executor: &E,
        state: &mut ShellState,
        term: &mut T,
    ) -> Result<LoopReport>
    where
        E: ScriptExecutor,
        T: Terminal,
    {
        let mut report = LoopReport::default();

        while let Some(line) = term.prompt(prompt)? {
            match Command::translate(&line) {
                Command::Exit => {
                    term.say("Exiting...")?;
                    break;
                }
                Command::Empty => continue,
                Command::Chat(text) => self.chat(term, text).await?,
                Command::Request(text) | Command::Edit(text) | Command::Read(text) => {
                    if self.script(executor, state, term, text).await? {
                        report.scripts_run += 1;
                    }
                }
            }
            report.commands += 1;
        }

        Ok(report)
    }

    async fn chat<T: Terminal>(&mut self, term: &mut T, text: String) -> Result<()> {
        self.conversation.push(ChatMessage::user(text));
        match self.assistant.talk(&self.conversation).await {
            Ok(reply) => {
                term.say(&format!("Assistant: {}", reply))?;
                self.conversation.push(ChatMessage::assistant(reply));
            }
            Err(err) => error!("Error talking to assistant: {}", err),
        }
        Ok(())
    }

    /// Returns whether a script ran
    async fn script<E, T>(&mut self, executor: &E, state: &mut ShellState, term: &mut T, text: String) -> Result<bool>
    where
        E: ScriptExecutor,
        T: Terminal,
    {
        self.conversation.push(ChatMessage::user(text));
        let script = match self
            .assistant
            .request_script(&self.conversation, state.cwd(), self.config.dialect)
            .await
        {
            Ok(script) => script,
            Err(err) => {
                error!("Error getting commands from prompt: {}", err);
                return Ok(false);
            }
        };

        if script.lines.is_empty() {
            debug!(reply = %script.reply, "no fenced block in reply");
            term.say(NO_SCRIPT)?;
            return Ok(false);
        }

        term.say(&format!("{}\n{}", SCRIPT_HEADER, script.lines.join("\n")))?;
        if !self.config.auto_confirm && !confirm(term)? {
            term.say("Operation cancelled.")?;
            return Ok(false);
        }

        let staged = match stage_script(
            &script.lines,
            state,
            &self.config.local_script_path,
            &self.config.remote_script_path,
        ) {
            Ok(staged) => staged,
            Err(err) => {
                error!("Error creating local script: {}", err);
                return Ok(false);
            }
        };

        let output = match executor.execute(&staged).await {
            Ok(output) => output,
            Err(err) => {
                error!("Error executing remote script: {}", err);
                return Ok(false);
            }
        };
        term.say(&format!("Output:\n{}", output))?;

        if self.config.analyze {
            match self.assistant.analyze_output(&output).await {
                Ok(analysis) => term.say(&format!("Analysis:\n{}", analysis))?,
                Err(err) => error!("Error analyzing output: {}", err),
            }
        }

        state.apply(&script.lines);
        info!(cwd = state.cwd(), exports = state.env().len(), "shell state updated");
        Ok(true)
    }
}

/// Empty, `y` and `yes` accept; anything else, or end of input, declines
fn confirm<T: Terminal>(term: &mut T) -> Result<bool> {
    let answer = term.prompt(CONFIRM_PROMPT)?;
    Ok(match answer {
        Some(answer) => matches!(answer.trim().to_ascii_lowercase().as_str(), "" | "y" | "yes"),
        None => false,
    })
}
