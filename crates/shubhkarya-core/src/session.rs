use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Devotee,
    Pandit,
    Admin,
}

/// Logged-in identity handed to every view-model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub token: Option<String>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            email: None,
            role,
            token: None,
        }
    }
}

#[derive(Debug)]
pub struct SessionStore {
    pub path: PathBuf,
}

impl SessionStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;
        let path = data_dir.join(SESSION_FILE);
        debug!(session = %path.display(), "opened session store");
        Ok(Self { path })
    }

    #[tracing::instrument(skip(self))]
    pub fn load(&self) -> anyhow::Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed reading {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        let session = serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing {}", self.path.display()))?;
        Ok(Some(session))
    }

    /// Like [`SessionStore::load`] but fails when nobody is logged in.
    pub fn require(&self) -> anyhow::Result<Session> {
        self.load()?
            .ok_or_else(|| anyhow!("not logged in; run `shubhkarya login` first"))
    }

    #[tracing::instrument(skip(self, session), fields(user = %session.user_id))]
    pub fn save(&self, session: &Session) -> anyhow::Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        let serialized = serde_json::to_string_pretty(session)?;
        writeln!(temp, "{serialized}")?;
        temp.flush()?;
        temp.persist(&self.path)
            .map_err(|err| anyhow!("failed to persist {}: {}", self.path.display(), err))?;
        info!(user = %session.user_id, role = ?session.role, "session saved");
        Ok(())
    }

    /// Logout. Missing file is not an error.
    #[tracing::instrument(skip(self))]
    pub fn clear(&self) -> anyhow::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("session cleared");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("failed removing {}", self.path.display()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn save_load_clear_cycle() {
        let temp = tempdir().expect("tempdir");
        let store = SessionStore::open(temp.path()).expect("open store");
        assert_eq!(store.load().expect("load empty"), None);
        assert!(store.require().is_err());

        let mut session = Session::new("u1", "Asha", Role::Devotee);
        session.token = Some("t0k".to_string());
        store.save(&session).expect("save");

        assert_eq!(store.require().expect("require"), session);

        store.clear().expect("clear");
        store.clear().expect("clear twice");
        assert_eq!(store.load().expect("load after clear"), None);
    }
}
