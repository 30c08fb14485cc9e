//! API credential loading from a dotenv-format file
//!
//! The key is re-read from disk on every classification call so that a
//! user can fix the file without restarting. The process environment is
//! never mutated; the file is parsed in isolation.

use std::path::Path;

use thiserror::Error;
use tracing::debug;

/// Environment variable holding the OpenRouter bearer token
pub const API_KEY_VAR: &str = "OPENROUTER_API_KEY";

/// Failure modes of credential loading.
///
/// The display strings are surfaced verbatim in degraded intent results,
/// so they stay short and user-readable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("Env file missing")]
    EnvFileMissing,

    #[error("API key missing")]
    ApiKeyMissing,
}

/// Load the API key from the env file at `path`.
///
/// A missing or unreadable file maps to [`CredentialError::EnvFileMissing`];
/// a file without the key, or with an empty value, maps to
/// [`CredentialError::ApiKeyMissing`]. Malformed lines are skipped so a
/// stray entry cannot mask a valid key further down.
pub fn load_api_key(path: &Path) -> Result<String, CredentialError> {
    load_key(path, API_KEY_VAR)
}

/// Load an arbitrary key from the env file at `path`.
pub fn load_key(path: &Path, var: &str) -> Result<String, CredentialError> {
    let entries = dotenv::from_path_iter(path).map_err(|e| {
        debug!("Env file {} not readable: {}", path.display(), e);
        CredentialError::EnvFileMissing
    })?;

    for entry in entries {
        match entry {
            Ok((key, value)) if key == var => {
                let value = value.trim();
                if value.is_empty() {
                    return Err(CredentialError::ApiKeyMissing);
                }
                return Ok(value.to_string());
            }
            Ok(_) => {}
            Err(e) => {
                debug!("Skipping malformed env line in {}: {}", path.display(), e);
            }
        }
    }

    Err(CredentialError::ApiKeyMissing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    /// Temp env file removed on drop
    struct TempEnv {
        path: PathBuf,
    }

    impl TempEnv {
        fn new(contents: &str) -> Self {
            let path = std::env::temp_dir().join(format!("wayfinder-env-{}", uuid::Uuid::new_v4()));
            fs::write(&path, contents).unwrap();
            Self { path }
        }
    }

    impl Drop for TempEnv {
        fn drop(&mut self) {
            let _ = fs::remove_file(&self.path);
        }
    }

    #[test]
    fn test_missing_file() {
        let path = std::env::temp_dir().join(format!("wayfinder-missing-{}", uuid::Uuid::new_v4()));
        let result = load_api_key(&path);
        assert_eq!(result, Err(CredentialError::EnvFileMissing));
        assert_eq!(result.unwrap_err().to_string(), "Env file missing");
    }

    #[test]
    fn test_key_present() {
        let env = TempEnv::new("OPENROUTER_API_KEY=sk-or-v1-abc123\n");
        assert_eq!(load_api_key(&env.path).unwrap(), "sk-or-v1-abc123");
    }

    #[test]
    fn test_key_among_other_entries() {
        let env = TempEnv::new(
            "# credentials\nOTHER_SETTING=value\nOPENROUTER_API_KEY=sk-or-v1-xyz\nTRAILING=1\n",
        );
        assert_eq!(load_api_key(&env.path).unwrap(), "sk-or-v1-xyz");
    }

    #[test]
    fn test_key_absent() {
        let env = TempEnv::new("SOME_OTHER_KEY=value\n");
        let result = load_api_key(&env.path);
        assert_eq!(result, Err(CredentialError::ApiKeyMissing));
        assert_eq!(result.unwrap_err().to_string(), "API key missing");
    }

    #[test]
    fn test_empty_value() {
        let env = TempEnv::new("OPENROUTER_API_KEY=\n");
        assert_eq!(load_api_key(&env.path), Err(CredentialError::ApiKeyMissing));
    }

    #[test]
    fn test_empty_file() {
        let env = TempEnv::new("");
        assert_eq!(load_api_key(&env.path), Err(CredentialError::ApiKeyMissing));
    }

    #[test]
    fn test_custom_var_name() {
        let env = TempEnv::new("MY_TOKEN=tok\n");
        assert_eq!(load_key(&env.path, "MY_TOKEN").unwrap(), "tok");
        assert_eq!(
            load_key(&env.path, "OPENROUTER_API_KEY"),
            Err(CredentialError::ApiKeyMissing)
        );
    }
}
