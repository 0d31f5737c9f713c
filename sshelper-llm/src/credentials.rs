//! API key loading

use crate::error::{Error, Result};

/// Environment variable carrying the model API key
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Read the API key from the process environment.
pub fn api_key_from_env() -> Result<String> {
    api_key_from(|var| std::env::var(var).ok())
}

/// Read the API key through `lookup`. An empty value counts as missing.
pub fn api_key_from(lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
    match lookup(API_KEY_VAR) {
        Some(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(Error::missing_env(API_KEY_VAR).with_operation("credentials::api_key")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_key_present() {
        let key = api_key_from(|var| (var == API_KEY_VAR).then(|| "sk-abc\n".to_string())).unwrap();
        assert_eq!(key, "sk-abc");
    }

    #[test]
    fn test_key_missing_or_blank() {
        let err = api_key_from(|_| None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert_eq!(err.message(), "OPENAI_API_KEY environment variable not set");

        assert!(api_key_from(|_| Some("  ".into())).is_err());
    }
}
