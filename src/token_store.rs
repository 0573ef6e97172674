use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;

/// On-disk shape of `config.yml`
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    github_token: Option<String>,
}

/// Single-file cache for the GitHub token
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored token. Any failure is treated as "no token".
    pub fn read(&self) -> Option<SecretString> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "No stored token");
                return None;
            }
        };

        match serde_yaml::from_str::<StoredConfig>(&contents) {
            Ok(StoredConfig { github_token: Some(token) }) if !token.trim().is_empty() => {
                Some(SecretString::from(token))
            }
            Ok(_) => {
                debug!(path = %self.path.display(), "Config file has no github_token");
                None
            }
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "Ignoring malformed config file");
                None
            }
        }
    }

    /// Replace the stored token, leaving the file readable by the owner only
    pub fn write(&self, token: &SecretString) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config = StoredConfig {
            github_token: Some(token.expose_secret().to_string()),
        };
        let yaml = serde_yaml::to_string(&config)
            .map_err(|e| Error::Config(format!("failed to serialize token: {}", e)))?;

        let mut file = open_private(&self.path)?;
        restrict_permissions(&file)?;
        file.write_all(yaml.as_bytes())?;
        file.flush()?;

        debug!(path = %self.path.display(), "Stored token");
        Ok(())
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

// `mode` only applies on creation; tighten an existing file before the token lands in it.
#[cfg(unix)]
fn restrict_permissions(file: &fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &fs::File) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> TokenStore {
        TokenStore::new(dir.path().join("wt").join("config.yml"))
    }

    #[test]
    fn test_write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let token = "ghp_AbC123!@#$%^&*() äöü";

        store.write(&SecretString::from(token)).unwrap();
        let read_back = store.read().expect("token should be stored");

        assert_eq!(read_back.expose_secret(), token);
    }

    #[cfg(unix)]
    #[test]
    fn test_written_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.write(&SecretString::from("ghp_secret")).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(mode & 0o077, 0, "group/other must have no access");
    }

    #[cfg(unix)]
    #[test]
    fn test_rewrite_tightens_existing_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "github_token: old\n").unwrap();
        fs::set_permissions(store.path(), fs::Permissions::from_mode(0o644)).unwrap();

        store.write(&SecretString::from("new")).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.read().unwrap().expose_secret(), "new");
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_file_is_private_before_token_is_written() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "github_token: old\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let file = open_private(&path).unwrap();
        restrict_permissions(&file).unwrap();

        let metadata = fs::metadata(&path).unwrap();
        assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
        assert_eq!(metadata.len(), 0, "old contents truncated, nothing written yet");
    }

    #[test]
    fn test_missing_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store_in(&dir).read().is_none());
    }

    #[test]
    fn test_malformed_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();

        fs::write(store.path(), "github_token: [unterminated").unwrap();
        assert!(store.read().is_none());

        fs::write(store.path(), "other_key: value\n").unwrap();
        assert!(store.read().is_none());

        fs::write(store.path(), "github_token: ''\n").unwrap();
        assert!(store.read().is_none());
    }
}
