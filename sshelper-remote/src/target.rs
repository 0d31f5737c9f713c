//! Connection target

use sshelper_error::{Error, Result};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Where to log in and with which key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub key_path: PathBuf,
}

impl SshTarget {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        key_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            key_path: key_path.into(),
        }
    }

    /// All four fields are required; port 0 is rejected
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty()
            || self.port == 0
            || self.user.trim().is_empty()
            || self.key_path.as_os_str().is_empty()
        {
            return Err(Error::config_invalid(
                "hostname, port, username, and key_path are required",
            )
            .with_operation("target::validate"));
        }
        Ok(())
    }

    /// `user@host`, as ssh and scp expect it
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// The home directory the login most likely lands in
    pub fn home_dir(&self) -> String {
        if self.user == "root" {
            "/root".to_string()
        } else {
            format!("/home/{}", self.user)
        }
    }
}

impl fmt::Display for SshTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.user, self.host, self.port)
    }
}

/// Knobs for establishing the session
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub connect_timeout: Duration,
    /// libssh2 blocking timeout; zero waits forever
    pub io_timeout: Duration,
    pub keepalive_interval: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            io_timeout: Duration::ZERO,
            keepalive_interval: Duration::from_secs(30),
        }
    }
}
