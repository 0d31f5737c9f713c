//! Authenticated remote session over libssh2
//!
//! libssh2 is blocking, so every operation runs on the blocking pool and is
//! awaited before the next one starts. The session handle is cheap to clone
//! and only ever used by one operation at a time.

use crate::target::{ConnectOptions, SshTarget};
use ssh2::Session;
use sshelper_error::{Error, ErrorKind, Result};
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use tracing::{debug, info, warn};

/// What a remote command printed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// The operations the interactive loop needs from a remote host
#[allow(async_fn_in_trait)]
pub trait RemoteShell {
    /// Run a command and capture its output
    async fn run_command(&self, command: &str) -> Result<CommandOutput>;

    /// Read a whole remote file as text
    async fn read_file(&self, path: &str) -> Result<String>;

    /// Create or truncate a remote file with `content`
    async fn write_file(&self, path: &str, content: &str) -> Result<()>;
}

/// A connected, authenticated SSH session.
///
/// Valid from `connect` until `close`, which consumes it.
pub struct RemoteSession {
    session: Session,
    target: SshTarget,
}

impl RemoteSession {
    /// Connect, handshake and authenticate with the target's private key.
    ///
    /// Any host key is accepted.
    pub async fn connect(target: &SshTarget, options: &ConnectOptions) -> Result<Self> {
        target.validate()?;
        if !target.key_path.exists() {
            return Err(Error::new(
                ErrorKind::FileNotFound,
                format!("private key '{}' not found", target.key_path.display()),
            )
            .with_operation("session::connect"));
        }

        let owned_target = target.clone();
        let options = options.clone();
        let session = blocking("session::connect", move || {
            connect_blocking(&owned_target, &options)
        })
        .await?;

        info!(remote = %target, "connected");
        Ok(Self {
            session,
            target: target.clone(),
        })
    }

    pub fn target(&self) -> &SshTarget {
        &self.target
    }

    /// Disconnect from the server
    pub async fn close(self) -> Result<()> {
        let target = self.target.to_string();
        let session = self.session;
        blocking("session::close", move || {
            session
                .disconnect(None, "closing", None)
                .map_err(|e| map_ssh_error(ErrorKind::ConnectFailed, e))
        })
        .await?;
        debug!(remote = %target, "disconnected");
        Ok(())
    }
}

impl RemoteShell for RemoteSession {
    async fn run_command(&self, command: &str) -> Result<CommandOutput> {
        debug!(remote = %self.target, command, "running remote command");
        let session = self.session.clone();
        let owned = command.to_string();
        let output = blocking("session::run_command", move || exec_blocking(&session, &owned))
            .await
            .map_err(|e| e.with_context("command", command))?;
        debug!(exit_code = output.exit_code, "remote command finished");
        Ok(output)
    }

    async fn read_file(&self, path: &str) -> Result<String> {
        let session = self.session.clone();
        let owned = path.to_string();
        blocking("session::read_file", move || {
            let sftp = session
                .sftp()
                .map_err(|e| map_ssh_error(ErrorKind::TransferFailed, e))?;
            let mut file = sftp
                .open(Path::new(&owned))
                .map_err(|e| map_sftp_open_error(&owned, e))?;
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes)
                .map_err(|e| Error::transfer_failed(&owned, e.to_string()).set_source(e))?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        })
        .await
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        let session = self.session.clone();
        let owned = path.to_string();
        let content = content.to_string();
        blocking("session::write_file", move || {
            let sftp = session
                .sftp()
                .map_err(|e| map_ssh_error(ErrorKind::TransferFailed, e))?;
            let mut file = sftp
                .create(Path::new(&owned))
                .map_err(|e| map_sftp_open_error(&owned, e))?;
            file.write_all(content.as_bytes())
                .map_err(|e| Error::transfer_failed(&owned, e.to_string()).set_source(e))?;
            Ok(())
        })
        .await
    }
}

/// Run a libssh2 job on the blocking pool
async fn blocking<T, F>(operation: &'static str, job: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| Error::unexpected(format!("blocking task failed: {}", e)))
        .and_then(|result| result)
        .map_err(|e| e.with_operation(operation))
}

fn connect_blocking(target: &SshTarget, options: &ConnectOptions) -> Result<Session> {
    let addrs = (target.host.as_str(), target.port)
        .to_socket_addrs()
        .map_err(|e| Error::connect_failed(&target.host, format!("cannot resolve host: {}", e)))?;

    let mut last_error = None;
    let mut tcp = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, options.connect_timeout) {
            Ok(stream) => {
                tcp = Some(stream);
                break;
            }
            Err(e) => {
                warn!(%addr, error = %e, "tcp connect failed");
                last_error = Some(e);
            }
        }
    }
    let tcp = tcp.ok_or_else(|| {
        let reason = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "host resolved to no addresses".to_string());
        Error::connect_failed(&target.host, reason).with_context("port", target.port.to_string())
    })?;

    let mut session =
        Session::new().map_err(|e| map_ssh_error(ErrorKind::ConnectFailed, e))?;
    session.set_tcp_stream(tcp);
    session.set_timeout(options.io_timeout.as_millis().min(u32::MAX as u128) as u32);
    session
        .handshake()
        .map_err(|e| map_ssh_error(ErrorKind::ConnectFailed, e).with_context("host", &target.host))?;

    session
        .userauth_pubkey_file(&target.user, None, &target.key_path, None)
        .map_err(|e| Error::auth_failed(&target.user).set_source(e))?;
    if !session.authenticated() {
        return Err(Error::auth_failed(&target.user));
    }

    let keepalive = options.keepalive_interval.as_secs().max(1) as u32;
    session.set_keepalive(true, keepalive);

    Ok(session)
}

fn exec_blocking(session: &Session, command: &str) -> Result<CommandOutput> {
    let mut channel = session
        .channel_session()
        .map_err(|e| map_ssh_error(ErrorKind::CommandFailed, e))?;
    channel
        .exec(command)
        .map_err(|e| map_ssh_error(ErrorKind::CommandFailed, e))?;

    let mut stdout = Vec::new();
    channel
        .read_to_end(&mut stdout)
        .map_err(|e| Error::command_failed(command, e.to_string()).set_source(e))?;
    let mut stderr = Vec::new();
    channel
        .stderr()
        .read_to_end(&mut stderr)
        .map_err(|e| Error::command_failed(command, e.to_string()).set_source(e))?;

    channel
        .wait_close()
        .map_err(|e| map_ssh_error(ErrorKind::CommandFailed, e))?;
    let exit_code = channel.exit_status().unwrap_or(-1);

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        exit_code,
    })
}

fn map_ssh_error(kind: ErrorKind, err: ssh2::Error) -> Error {
    let message = err.message().to_string();
    Error::new(kind, message).set_source(err)
}

fn map_sftp_open_error(path: &str, err: ssh2::Error) -> Error {
    // LIBSSH2_FX_NO_SUCH_FILE / LIBSSH2_FX_PERMISSION_DENIED
    let kind = match err.code() {
        ssh2::ErrorCode::SFTP(2) => ErrorKind::FileNotFound,
        ssh2::ErrorCode::SFTP(3) => ErrorKind::PermissionDenied,
        _ => ErrorKind::TransferFailed,
    };
    Error::new(kind, format!("{}: {}", path, err.message()))
        .with_context("path", path)
        .set_source(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_command_output_success() {
        let ok = CommandOutput {
            stdout: "up 3 days".into(),
            ..Default::default()
        };
        assert!(ok.success());

        let failed = CommandOutput {
            exit_code: 127,
            stderr: "command not found".into(),
            ..Default::default()
        };
        assert!(!failed.success());
    }

    #[tokio::test]
    async fn test_connect_rejects_missing_key() {
        let target = SshTarget::new("127.0.0.1", 22, "ubuntu", PathBuf::from("/nonexistent/key.pem"));
        let err = RemoteSession::connect(&target, &ConnectOptions::default())
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_target() {
        let target = SshTarget::new("", 22, "ubuntu", "/k");
        let err = RemoteSession::connect(&target, &ConnectOptions::default())
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let key = tempfile::NamedTempFile::new().unwrap();
        // Bind then drop to get a local port nobody listens on
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let target = SshTarget::new("127.0.0.1", port, "ubuntu", key.path());

        let err = RemoteSession::connect(&target, &ConnectOptions::default())
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::ConnectFailed);
        assert_eq!(err.operation(), "session::connect");
    }
}
