//! LLM error conversions
//!
//! Re-exports sshelper-error and maps provider failures onto it.

pub use sshelper_error::{Error, ErrorKind, ErrorStatus, Result};

use crate::provider::ProviderError;

impl From<ProviderError> for Error {
    fn from(err: ProviderError) -> Self {
        let kind = match &err {
            ProviderError::Network(_) => ErrorKind::NetworkFailed,
            ProviderError::RateLimited { .. } => ErrorKind::RateLimited,
            ProviderError::AuthenticationFailed => ErrorKind::ConfigInvalid,
            ProviderError::Parse(_) => ErrorKind::ParseFailed,
            ProviderError::EmptyResponse => ErrorKind::EmptyResponse,
            ProviderError::Api { status, .. } if *status >= 500 => ErrorKind::ProviderUnavailable,
            ProviderError::Api { .. } | ProviderError::Other(_) => ErrorKind::InferenceFailed,
        };
        let message = err.to_string();
        Error::new(kind, message)
            .with_operation("provider::complete")
            .set_source(err)
    }
}
