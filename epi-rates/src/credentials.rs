//! Credential handling for remote data providers.

use crate::error::{EpiError, Result};
use std::path::Path;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A secret string that clears its contents when dropped.
#[derive(Clone, ZeroizeOnDrop)]
pub struct SecureString(String);

impl std::fmt::Debug for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecureString(***)")
    }
}

impl SecureString {
    /// Create a new secure string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the string value. Use carefully and avoid storing the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Convert to a regular string. The SecureString will be zeroized.
    pub fn into_string(mut self) -> String {
        let value = std::mem::take(&mut self.0);
        self.0.zeroize();
        value
    }
}

impl From<String> for SecureString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SecureString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Reads an API key from the first non-empty line of `path`.
///
/// Fails with [`EpiError::CredentialLoad`] when the file cannot be read or
/// holds no key.
pub fn load_api_key(path: impl AsRef<Path>) -> Result<SecureString> {
    let path = path.as_ref();
    let mut content = std::fs::read_to_string(path)
        .map_err(|e| EpiError::credential_load(path.display().to_string(), e.to_string()))?;

    let key = content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(SecureString::from);
    content.zeroize();

    let key = key.ok_or_else(|| {
        EpiError::credential_load(path.display().to_string(), "file contains no key")
    })?;
    if key.expose().chars().any(char::is_whitespace) {
        return Err(EpiError::credential_load(
            path.display().to_string(),
            "key must not contain whitespace",
        ));
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_secure_string_debug_is_redacted() {
        let secure = SecureString::new("secret123");
        assert_eq!(format!("{secure:?}"), "SecureString(***)");
        assert_eq!(secure.expose(), "secret123");
        assert_eq!(secure.into_string(), "secret123");
    }

    #[test]
    fn test_load_api_key_skips_blank_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  abc123  ").unwrap();
        writeln!(file, "ignored").unwrap();
        file.flush().unwrap();

        let key = load_api_key(file.path()).unwrap();
        assert_eq!(key.expose(), "abc123");
    }

    #[test]
    fn test_load_api_key_errors() {
        let empty = NamedTempFile::new().unwrap();
        assert!(matches!(
            load_api_key(empty.path()),
            Err(EpiError::CredentialLoad { .. })
        ));

        let missing = empty.path().with_extension("missing");
        let err = load_api_key(&missing).unwrap_err();
        assert!(err.to_string().contains("Failed to load credentials"));

        let mut spaced = NamedTempFile::new().unwrap();
        writeln!(spaced, "abc 123").unwrap();
        spaced.flush().unwrap();
        assert!(load_api_key(spaced.path()).is_err());
    }
}
