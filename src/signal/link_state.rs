use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

const STATE_VERSION: u32 = 1;

/// Whether this installation has been linked to the account
pub trait LinkStore: Send {
    fn is_linked(&self) -> bool;
    fn set_linked(&mut self, linked: bool) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    version: u32,
    /// Keyed by account number
    linked: HashMap<String, bool>,
}

/// Link flag persisted as JSON under the data directory
#[derive(Debug)]
pub struct FileLinkStore {
    path: PathBuf,
    account: String,
}

impl FileLinkStore {
    pub fn new(path: PathBuf, account: impl Into<String>) -> Self {
        Self {
            path,
            account: account.into(),
        }
    }

    /// `$XDG_DATA_HOME/sparktui/link.json`, if a data dir is known
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|p| p.join("sparktui/link.json"))
    }

    /// Anything unreadable counts as "never linked"
    fn read(&self) -> StateFile {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return StateFile::default(),
        };

        match serde_json::from_str::<StateFile>(&content) {
            Ok(state) if state.version == STATE_VERSION => state,
            Ok(_) => StateFile::default(),
            Err(e) => {
                log::warn!("Ignoring corrupt link state {}: {}", self.path.display(), e);
                StateFile::default()
            }
        }
    }
}

impl LinkStore for FileLinkStore {
    fn is_linked(&self) -> bool {
        self.read().linked.get(&self.account).copied().unwrap_or(false)
    }

    fn set_linked(&mut self, linked: bool) -> Result<()> {
        let mut state = self.read();
        state.version = STATE_VERSION;
        state.linked.insert(self.account.clone(), linked);

        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&state)?)?;
        Ok(())
    }
}

/// Link flag that lives only as long as the process
#[derive(Debug, Default)]
pub struct MemoryLinkStore {
    linked: bool,
}

impl MemoryLinkStore {
    pub fn new(linked: bool) -> Self {
        Self { linked }
    }
}

impl LinkStore for MemoryLinkStore {
    fn is_linked(&self) -> bool {
        self.linked
    }

    fn set_linked(&mut self, linked: bool) -> Result<()> {
        self.linked = linked;
        Ok(())
    }
}
