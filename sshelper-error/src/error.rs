use crate::{ErrorKind, ErrorStatus};
use std::fmt;

/// Error returned by every fallible sshelper operation.
///
/// Built with [`Error::new`] or one of the named constructors, then decorated
/// as it travels up:
///
/// ```rust
/// use sshelper_error::{Error, ErrorKind, ErrorStatus};
///
/// let err = Error::new(ErrorKind::RateLimited, "quota exceeded")
///     .with_operation("provider::complete")
///     .with_context("model", "gpt-3.5-turbo");
///
/// assert_eq!(err.status(), ErrorStatus::Temporary);
/// assert_eq!(err.context()[0], ("model", "gpt-3.5-turbo".to_string()));
/// ```
pub struct Error {
    kind: ErrorKind,
    message: String,
    status: ErrorStatus,
    operation: &'static str,
    context: Vec<(&'static str, String)>,
    source: Option<anyhow::Error>,
}

impl Error {
    /// Status starts as `Temporary` for retryable kinds, `Permanent` otherwise
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: if kind.is_retryable() {
                ErrorStatus::Temporary
            } else {
                ErrorStatus::Permanent
            },
            operation: "",
            context: Vec::new(),
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> ErrorStatus {
        self.status
    }

    /// Innermost-last operation name, e.g. `session::connect`
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn context(&self) -> &[(&'static str, String)] {
        &self.context
    }

    pub fn source_ref(&self) -> Option<&anyhow::Error> {
        self.source.as_ref()
    }

    pub fn is_retryable(&self) -> bool {
        self.status.is_retryable()
    }

    pub fn with_status(mut self, status: ErrorStatus) -> Self {
        self.status = status;
        self
    }

    /// Record the operation that failed. A previously set operation is kept
    /// in the context under `called`.
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        if !self.operation.is_empty() {
            self.context.push(("called", self.operation.to_string()));
        }
        self.operation = operation;
        self
    }

    pub fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.push((key, value.into()));
        self
    }

    /// Attach the underlying error. Setting it twice is a bug and trips a
    /// debug assertion.
    pub fn set_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        debug_assert!(self.source.is_none(), "error source set twice");
        self.source = Some(source.into());
        self
    }

    /// Mark a temporary error that kept failing
    pub fn persist(mut self) -> Self {
        self.status = self.status.persist();
        self
    }
}

// Named constructors for the failures sshelper reports
impl Error {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }

    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// `<VAR> environment variable not set`
    pub fn missing_env(var: &'static str) -> Self {
        Self::config_invalid(format!("{} environment variable not set", var)).with_context("var", var)
    }

    pub fn connect_failed(host: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConnectFailed, reason).with_context("host", host)
    }

    pub fn auth_failed(user: impl Into<String>) -> Self {
        let user = user.into();
        let message = format!("public key authentication failed for '{}'", user);
        Self::new(ErrorKind::AuthFailed, message).with_context("user", user)
    }

    pub fn command_failed(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::CommandFailed, reason).with_context("command", command)
    }

    pub fn transfer_failed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransferFailed, reason).with_context("path", path)
    }

    /// `step` is `scp` or `ssh`; `output` is what the process printed
    pub fn script_failed(step: &'static str, output: impl Into<String>) -> Self {
        Self::new(ErrorKind::ScriptFailed, output).with_context("step", step)
    }
}

/// One line: `kind (status) at operation {k: v, ...}: message`
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.status)?;
        if !self.operation.is_empty() {
            write!(f, " at {}", self.operation)?;
        }
        if !self.context.is_empty() {
            let pairs: Vec<String> = self
                .context
                .iter()
                .map(|(key, value)| format!("{}: {}", key, value))
                .collect();
            write!(f, " {{{}}}", pairs.join(", "))?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({}) at {}", self.kind, self.status, self.operation)?;
        if !self.message.is_empty() {
            writeln!(f, "  message: {}", self.message)?;
        }
        for (key, value) in &self.context {
            writeln!(f, "  {}: {}", key, value)?;
        }
        if let Some(source) = &self.source {
            writeln!(f, "  source: {:#}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            _ => ErrorKind::IoFailed,
        };
        Error::new(kind, err.to_string()).with_operation("io").set_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sets_status_from_kind() {
        let err = Error::new(ErrorKind::AuthFailed, "bad key");
        assert_eq!(err.kind(), ErrorKind::AuthFailed);
        assert_eq!(err.message(), "bad key");
        assert_eq!(err.status(), ErrorStatus::Permanent);

        assert!(Error::new(ErrorKind::RateLimited, "quota").is_retryable());
        assert!(!Error::new(ErrorKind::FileNotFound, "no key").is_retryable());
    }

    #[test]
    fn test_operation_chain_moves_to_context() {
        let err = Error::new(ErrorKind::TransferFailed, "write failed")
            .with_operation("session::write_file")
            .with_operation("agent::edit");

        assert_eq!(err.operation(), "agent::edit");
        assert_eq!(err.context(), &[("called", "session::write_file".to_string())]);
    }

    #[test]
    fn test_persist() {
        let err = Error::new(ErrorKind::NetworkFailed, "connection refused");
        assert!(err.is_retryable());

        let err = err.persist();
        assert!(!err.is_retryable());
        assert_eq!(err.status(), ErrorStatus::Persistent);

        let err = Error::new(ErrorKind::NetworkFailed, "reset").with_status(ErrorStatus::Permanent);
        assert_eq!(err.persist().status(), ErrorStatus::Permanent);
    }

    #[test]
    fn test_display() {
        let err = Error::connect_failed("ec2.example.com", "connection refused")
            .with_operation("session::connect")
            .with_context("port", "22");

        assert_eq!(
            err.to_string(),
            "connect_failed (temporary) at session::connect {host: ec2.example.com, port: 22}: connection refused"
        );
        assert_eq!(Error::unexpected("").to_string(), "unexpected (permanent)");
    }

    #[test]
    fn test_named_constructors() {
        let err = Error::missing_env("OPENAI_API_KEY");
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert_eq!(err.message(), "OPENAI_API_KEY environment variable not set");

        let err = Error::auth_failed("ubuntu");
        assert_eq!(err.message(), "public key authentication failed for 'ubuntu'");

        let err = Error::script_failed("scp", "lost connection");
        assert_eq!(err.kind(), ErrorKind::ScriptFailed);
        assert_eq!(err.context()[0], ("step", "scp".to_string()));
        assert_eq!(err.message(), "lost connection");
    }

    #[test]
    fn test_io_conversion() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file").into();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
        assert_eq!(err.operation(), "io");
        assert!(err.source_ref().is_some());

        let err: Error = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe").into();
        assert_eq!(err.kind(), ErrorKind::IoFailed);
    }
}
