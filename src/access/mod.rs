//! Folder-scoped access grants with persistent capability tokens.
//!
//! A grant maps a folder path to opaque token bytes obtained when the user
//! chose that folder. Tokens are persisted as a single JSON document and
//! resolved eagerly at load; any that fail to activate or report staleness
//! are pruned. Activation is paired with deactivation when the store is
//! dropped, so capabilities never outlive the process.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Opaque, persistable credential granting access to a folder beyond the
/// current process session.
pub type Token = Vec<u8>;

#[derive(Debug, Error)]
pub enum ActivationError {
    /// The token no longer resolves to the folder it was minted for.
    #[error("capability token is stale")]
    Stale,
    #[error("activation failed: {0}")]
    Failed(String),
}

/// Platform hook turning persisted token bytes into a live capability.
///
/// On sandboxed platforms this wraps security-scoped bookmark resolution;
/// [`PathActivator`] is the stock implementation everywhere else.
pub trait TokenActivator: Send + Sync {
    /// Materialize `token` as a live capability for `folder`.
    fn activate(&self, folder: &Path, token: &[u8]) -> Result<(), ActivationError>;
    /// Release a previously activated capability.
    fn deactivate(&self, folder: &Path);
    /// Produce a persistable token for a folder the user just granted.
    /// `None` means the platform could not mint one.
    fn mint(&self, folder: &Path) -> Option<Token>;
}

/// Activator for platforms without sandboxed folder capabilities: the token
/// is the folder path itself, and activation checks the directory still
/// exists (so vanished folders are pruned as stale).
pub struct PathActivator;

impl TokenActivator for PathActivator {
    fn activate(&self, folder: &Path, token: &[u8]) -> Result<(), ActivationError> {
        if token != folder.to_string_lossy().as_bytes() {
            return Err(ActivationError::Stale);
        }
        if folder.is_dir() {
            Ok(())
        } else {
            Err(ActivationError::Stale)
        }
    }

    fn deactivate(&self, _folder: &Path) {}

    fn mint(&self, folder: &Path) -> Option<Token> {
        Some(folder.to_string_lossy().into_owned().into_bytes())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct GrantFile {
    grants: BTreeMap<String, Token>,
}

struct Inner {
    persisted: BTreeMap<String, Token>,
    active: Vec<PathBuf>,
}

/// Persistent store of folder access grants.
pub struct GrantStore {
    activator: Arc<dyn TokenActivator>,
    store_path: PathBuf,
    inner: Mutex<Inner>,
}

impl GrantStore {
    /// Load the grant table from `store_path` and eagerly resolve every
    /// persisted token. Tokens that fail to activate are pruned and the
    /// table is rewritten. A missing or corrupt table starts empty.
    pub fn load(store_path: PathBuf, activator: Arc<dyn TokenActivator>) -> Self {
        let persisted = match std::fs::read(&store_path) {
            Ok(bytes) => match serde_json::from_slice::<GrantFile>(&bytes) {
                Ok(file) => file.grants,
                Err(e) => {
                    // Corrupt entries are dropped silently.
                    debug!(?store_path, error = %e, "Dropping unreadable grant table");
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };

        let store = Self {
            activator,
            store_path,
            inner: Mutex::new(Inner {
                persisted,
                active: Vec::new(),
            }),
        };
        store.resolve_all();
        store
    }

    /// Load from the default per-user config location.
    pub fn open_default(activator: Arc<dyn TokenActivator>) -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "ibex").context("Failed to determine project directories")?;
        let store_path = proj_dirs.config_dir().join("grants.json");
        Ok(Self::load(store_path, activator))
    }

    /// Activate every persisted token, pruning failures.
    fn resolve_all(&self) {
        let mut inner = self.inner.lock();
        let mut pruned = 0usize;

        let entries: Vec<(String, Token)> = inner
            .persisted
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (folder, token) in entries {
            let path = PathBuf::from(&folder);
            match self.activator.activate(&path, &token) {
                Ok(()) => inner.active.push(path),
                Err(e) => {
                    debug!(folder = %folder, error = %e, "Pruning grant");
                    inner.persisted.remove(&folder);
                    pruned += 1;
                }
            }
        }

        if pruned > 0 {
            self.save(&inner);
        }
        info!(
            active = inner.active.len(),
            pruned, "Resolved persisted access grants"
        );
    }

    /// Attempt to materialize a previously granted, non-stale token for
    /// `folder`, activating it for this process. A failed resolution prunes
    /// the entry and returns `None`, leaving the folder ungranted.
    pub fn resolve(&self, folder: &Path) -> Option<Token> {
        let key = folder.to_string_lossy().into_owned();
        let mut inner = self.inner.lock();
        let token = inner.persisted.get(&key)?.clone();

        if inner.active.iter().any(|f| f == folder) {
            return Some(token);
        }

        match self.activator.activate(folder, &token) {
            Ok(()) => {
                inner.active.push(folder.to_path_buf());
                Some(token)
            }
            Err(e) => {
                debug!(?folder, error = %e, "Pruning grant on failed resolve");
                inner.persisted.remove(&key);
                self.save(&inner);
                None
            }
        }
    }

    /// Persist a newly obtained token and activate it.
    pub fn grant(&self, folder: &Path, token: Token) {
        let mut inner = self.inner.lock();
        if let Err(e) = self.activator.activate(folder, &token) {
            warn!(?folder, error = %e, "Fresh grant failed to activate");
            return;
        }
        inner
            .persisted
            .insert(folder.to_string_lossy().into_owned(), token);
        if !inner.active.iter().any(|f| f == folder) {
            inner.active.push(folder.to_path_buf());
        }
        self.save(&inner);
        debug!(?folder, "Granted folder access");
    }

    /// Mint a token for a folder the user just chose and persist it.
    /// Returns false when the platform could not mint one.
    pub fn grant_minted(&self, folder: &Path) -> bool {
        match self.activator.mint(folder) {
            Some(token) => {
                self.grant(folder, token);
                self.is_granted(folder)
            }
            None => false,
        }
    }

    /// Whether `path` is covered by an already-activated grant. A grant on
    /// a parent folder satisfies any child path.
    pub fn is_granted(&self, path: &Path) -> bool {
        self.inner
            .lock()
            .active
            .iter()
            .any(|folder| path.starts_with(folder))
    }

    fn save(&self, inner: &Inner) {
        let file = GrantFile {
            grants: inner.persisted.clone(),
        };
        if let Some(parent) = self.store_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(?parent, error = %e, "Failed to create grant store directory");
                return;
            }
        }
        match serde_json::to_vec_pretty(&file) {
            Ok(bytes) => {
                if let Err(e) = std::fs::write(&self.store_path, bytes) {
                    warn!(path = ?self.store_path, error = %e, "Failed to write grant table");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize grant table"),
        }
    }
}

impl Drop for GrantStore {
    fn drop(&mut self) {
        let inner = self.inner.lock();
        for folder in &inner.active {
            self.activator.deactivate(folder);
        }
        debug!(count = inner.active.len(), "Deactivated access grants");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_in(dir: &Path) -> GrantStore {
        GrantStore::load(dir.join("grants.json"), Arc::new(PathActivator))
    }

    #[test]
    fn grant_then_is_granted_with_prefix_match() {
        let config = tempdir().unwrap();
        let folder = tempdir().unwrap();
        let store = store_in(config.path());

        assert!(!store.is_granted(folder.path()));
        assert!(store.grant_minted(folder.path()));
        assert!(store.is_granted(folder.path()));
        // A parent grant satisfies a child path.
        assert!(store.is_granted(&folder.path().join("sub/image.png")));
    }

    #[test]
    fn grants_persist_across_reload() {
        let config = tempdir().unwrap();
        let folder = tempdir().unwrap();

        {
            let store = store_in(config.path());
            assert!(store.grant_minted(folder.path()));
        }

        let store = store_in(config.path());
        assert!(store.is_granted(folder.path()));
        assert!(store.resolve(folder.path()).is_some());
    }

    #[test]
    fn stale_tokens_are_pruned_at_load() {
        let config = tempdir().unwrap();
        let doomed = tempdir().unwrap();
        let doomed_path = doomed.path().to_path_buf();

        {
            let store = store_in(config.path());
            assert!(store.grant_minted(&doomed_path));
        }
        // The folder disappears between sessions.
        drop(doomed);

        let store = store_in(config.path());
        assert!(!store.is_granted(&doomed_path));
        assert!(store.resolve(&doomed_path).is_none());

        // The pruned entry was rewritten out of the table.
        let bytes = std::fs::read(config.path().join("grants.json")).unwrap();
        let file: GrantFile = serde_json::from_slice(&bytes).unwrap();
        assert!(file.grants.is_empty());
    }

    #[test]
    fn corrupt_table_starts_empty() {
        let config = tempdir().unwrap();
        let path = config.path().join("grants.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let store = GrantStore::load(path, Arc::new(PathActivator));
        assert!(!store.is_granted(Path::new("/anywhere")));
    }
}
