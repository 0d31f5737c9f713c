//! # sshelper remote
//!
//! The remote half of sshelper:
//! - **Target**: who and where to log in (host, port, user, private key)
//! - **Session**: an authenticated libssh2 session - commands and SFTP file access
//! - **Shell state**: the working directory and exports carried between scripts
//! - **Script**: staging a generated script locally and running it with scp/ssh

pub mod script;
pub mod session;
pub mod state;
pub mod target;

pub use script::{
    shell_quote, stage_script, Interpreter, OpenSshExecutor, ScriptExecutor, StagedScript,
    DEFAULT_SCRIPT_PATH,
};
pub use session::{CommandOutput, RemoteSession, RemoteShell};
pub use sshelper_error::{Error, ErrorKind, Result};
pub use state::ShellState;
pub use target::{ConnectOptions, SshTarget};
