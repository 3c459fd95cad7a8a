//! JSON state file: account records, each with its profile and streaks,
//! and the current session.

use crate::auth::Credential;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use vd_core::{ProfileError, ProfileStore, StreakBook, UserProfile};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("state file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One account's stored record. It outlives the session that created it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub credential: Credential,
    pub profile: UserProfile,
    #[serde(default)]
    pub streaks: StreakBook,
}

/// Everything the CLI persists between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    /// Email of the signed-in account.
    #[serde(default)]
    pub session: Option<String>,
    #[serde(default)]
    pub accounts: BTreeMap<String, Account>,
}

/// State file handle. Reads once on open; `persist` writes the whole file.
pub struct StateFile {
    path: PathBuf,
    pub state: AppState,
}

impl StateFile {
    /// Open the state file, starting empty when it does not exist yet.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let state = match std::fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text).map_err(|source| StoreError::Parse {
                path: path.to_path_buf(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no state file; starting fresh");
                AppState::default()
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            state,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The signed-in account, if any.
    pub fn account(&self) -> Option<&Account> {
        let email = self.state.session.as_ref()?;
        self.state.accounts.get(email)
    }

    pub fn account_mut(&mut self) -> Result<&mut Account, ProfileError> {
        let email = self.state.session.as_ref().ok_or(ProfileError::NotSignedIn)?;
        self.state
            .accounts
            .get_mut(email)
            .ok_or(ProfileError::NotSignedIn)
    }

    /// Store a new account and start a session for it.
    pub fn open_account(&mut self, account: Account) -> Result<(), StoreError> {
        let email = account.profile.email.clone();
        self.state.accounts.insert(email.clone(), account);
        self.state.session = Some(email);
        self.persist()
    }

    /// Start a session for an existing account.
    pub fn sign_in(&mut self, email: &str) -> Result<(), ProfileError> {
        if !self.state.accounts.contains_key(email) {
            return Err(ProfileError::InvalidCredentials);
        }
        self.state.session = Some(email.to_string());
        self.persist().map_err(|e| ProfileError::Store(Box::new(e)))
    }

    /// Write the state atomically (temp file + rename).
    pub fn persist(&self) -> Result<(), StoreError> {
        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_vec_pretty(&self.state).map_err(|e| io_err(e.into()))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        tracing::debug!(path = %self.path.display(), "state persisted");
        Ok(())
    }
}

impl ProfileStore for StateFile {
    fn load(&self) -> Result<Option<UserProfile>, ProfileError> {
        Ok(self.account().map(|a| a.profile.clone()))
    }

    fn save(&mut self, profile: &UserProfile) -> Result<(), ProfileError> {
        self.account_mut()?.profile = profile.clone();
        self.persist().map_err(|e| ProfileError::Store(Box::new(e)))
    }

    /// End the session. The account record stays on disk for the next login.
    fn clear(&mut self) -> Result<(), ProfileError> {
        self.state.session = None;
        self.persist().map_err(|e| ProfileError::Store(Box::new(e)))
    }
}
