//! # sshelper Agent
//!
//! The interactive loops that sit between the terminal, the model and the
//! remote host:
//! 1. **Assist**: run a command on the host, print its output, ask the model
//!    what to do next. `edit` and `read` work on remote files.
//! 2. **Translate**: describe a task, get a script back, confirm it, run it on
//!    the host, and keep the working directory and exports for the next one.
//!    Lines starting with `!` are chat.
//!
//! Both loops end on `exit` or end of input.

mod agent;
mod command;
mod terminal;
mod translate;

pub use agent::{Agent, AgentConfig, LoopReport};
pub use command::Command;
pub use terminal::{LineTerminal, StdTerminal, Terminal};
