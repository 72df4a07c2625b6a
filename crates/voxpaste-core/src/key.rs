//! Locating the OpenAI API key.
//!
//! The key is looked up in order: the `openai_key` config field, the
//! `OPENAI_API_KEY` environment variable, then a plain text key file.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::Config;

/// File name of the key file searched for when no explicit path is set.
pub const API_KEY_FILE: &str = "openai_api_key.txt";

/// Environment variable consulted before falling back to the key file.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Error)]
pub enum KeyError {
    /// None of the candidate key files exist
    #[error(
        "API key file not found. Create a file named 'openai_api_key.txt' containing your OpenAI \
         API key (looked in: {})",
        display_paths(.searched)
    )]
    NotFound { searched: Vec<PathBuf> },
    /// The key file exists but holds nothing but whitespace
    #[error("API key file {0:?} is empty")]
    Empty(PathBuf),
    /// The key file could not be read
    #[error("failed to read API key file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolve the API key for `config`. `config_dir` is the directory holding
/// the config file, searched for a key file after the current directory.
pub fn resolve_api_key(config: &Config, config_dir: &Path) -> Result<String, KeyError> {
    let env = std::env::var(API_KEY_ENV).ok();
    resolve_from(config, env, &key_file_candidates(config, config_dir))
}

fn key_file_candidates(config: &Config, config_dir: &Path) -> Vec<PathBuf> {
    if let Some(path) = config.api_key_file() {
        return vec![path.to_path_buf()];
    }
    let cwd = std::env::current_dir()
        .map(|dir| dir.join(API_KEY_FILE))
        .unwrap_or_else(|_| PathBuf::from(API_KEY_FILE));
    vec![cwd, config_dir.join(API_KEY_FILE)]
}

fn resolve_from(
    config: &Config,
    env: Option<String>,
    candidates: &[PathBuf],
) -> Result<String, KeyError> {
    if let Some(key) = config.key_openai().map(str::trim).filter(|k| !k.is_empty()) {
        return Ok(key.to_owned());
    }
    if let Some(key) = env.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        debug!("Using API key from {}", API_KEY_ENV);
        return Ok(key.to_owned());
    }

    let Some(path) = candidates.iter().find(|p| p.is_file()) else {
        return Err(KeyError::NotFound {
            searched: candidates.to_vec(),
        });
    };

    let content = fs::read_to_string(path).map_err(|source| KeyError::Read {
        path: path.clone(),
        source,
    })?;
    let key = content.trim();
    if key.is_empty() {
        return Err(KeyError::Empty(path.clone()));
    }

    debug!(path = ?path, "Using API key from file");
    Ok(key.to_owned())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_config_key_wins() {
        let config = Config {
            openai_key: Some("  from-config \n".to_string()),
            ..Default::default()
        };
        let key = resolve_from(&config, Some("from-env".to_string()), &[]).unwrap();
        assert_eq!(key, "from-config");
    }

    #[test]
    fn test_env_before_file() {
        let temp = tempdir().unwrap();
        let file = temp.path().join(API_KEY_FILE);
        fs::write(&file, "from-file").unwrap();

        let key = resolve_from(&Config::default(), Some("from-env".to_string()), &[file]).unwrap();
        assert_eq!(key, "from-env");
    }

    #[test]
    fn test_first_existing_file_is_trimmed() {
        let temp = tempdir().unwrap();
        let missing = temp.path().join("missing").join(API_KEY_FILE);
        let present = temp.path().join(API_KEY_FILE);
        fs::write(&present, "sk-test\n").unwrap();

        let key = resolve_from(&Config::default(), None, &[missing, present]).unwrap();
        assert_eq!(key, "sk-test");
    }

    #[test]
    fn test_missing_file_names_expected_file() {
        let temp = tempdir().unwrap();
        let missing = temp.path().join(API_KEY_FILE);

        let err = resolve_from(&Config::default(), None, &[missing.clone()]).unwrap_err();
        match &err {
            KeyError::NotFound { searched } => assert_eq!(searched, &vec![missing]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains(API_KEY_FILE));
    }

    #[test]
    fn test_empty_file_is_an_error() {
        let temp = tempdir().unwrap();
        let file = temp.path().join(API_KEY_FILE);
        fs::write(&file, "   \n").unwrap();

        let err = resolve_from(&Config::default(), Some(String::new()), &[file]).unwrap_err();
        assert!(matches!(err, KeyError::Empty(_)));
    }

    #[test]
    fn test_explicit_key_file_is_only_candidate() {
        let temp = tempdir().unwrap();
        let config = Config {
            api_key_file: Some(temp.path().join("custom.txt")),
            ..Default::default()
        };
        let candidates = key_file_candidates(&config, temp.path());
        assert_eq!(candidates, vec![temp.path().join("custom.txt")]);
    }

    #[test]
    fn test_default_candidates_end_in_config_dir() {
        let temp = tempdir().unwrap();
        let candidates = key_file_candidates(&Config::default(), temp.path());
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1], temp.path().join(API_KEY_FILE));
    }
}
