use std::fmt;

/// What went wrong, independent of where.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A bug or a case nobody planned for
    Unexpected,
    /// Missing or invalid settings: API key, host, port, user, key path
    ConfigInvalid,

    // Remote host
    /// TCP connect or SSH handshake failed
    ConnectFailed,
    /// The server rejected the key
    AuthFailed,
    /// A channel could not be opened or a command could not be run
    CommandFailed,
    /// SFTP read or write failed
    TransferFailed,
    /// Staging, copying or running a generated script failed
    ScriptFailed,

    // Model
    InferenceFailed,
    /// The endpoint answered with a server error
    ProviderUnavailable,
    /// Rate limit or exhausted quota
    RateLimited,
    /// The reply had no choices
    EmptyResponse,
    ParseFailed,

    // Local I/O
    FileNotFound,
    PermissionDenied,
    IoFailed,
    NetworkFailed,
}

impl ErrorKind {
    /// snake_case name used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unexpected => "unexpected",
            ErrorKind::ConfigInvalid => "config_invalid",
            ErrorKind::ConnectFailed => "connect_failed",
            ErrorKind::AuthFailed => "auth_failed",
            ErrorKind::CommandFailed => "command_failed",
            ErrorKind::TransferFailed => "transfer_failed",
            ErrorKind::ScriptFailed => "script_failed",
            ErrorKind::InferenceFailed => "inference_failed",
            ErrorKind::ProviderUnavailable => "provider_unavailable",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::EmptyResponse => "empty_response",
            ErrorKind::ParseFailed => "parse_failed",
            ErrorKind::FileNotFound => "file_not_found",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::IoFailed => "io_failed",
            ErrorKind::NetworkFailed => "network_failed",
        }
    }

    /// Kinds that start out `Temporary`
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::ConnectFailed
                | ErrorKind::InferenceFailed
                | ErrorKind::ProviderUnavailable
                | ErrorKind::RateLimited
                | ErrorKind::NetworkFailed
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_snake_case() {
        assert_eq!(ErrorKind::ConnectFailed.to_string(), "connect_failed");
        assert_eq!(ErrorKind::ProviderUnavailable.to_string(), "provider_unavailable");
    }

    #[test]
    fn test_is_retryable() {
        assert!(ErrorKind::NetworkFailed.is_retryable());
        assert!(ErrorKind::RateLimited.is_retryable());
        assert!(!ErrorKind::AuthFailed.is_retryable());
        assert!(!ErrorKind::ScriptFailed.is_retryable());
    }
}
