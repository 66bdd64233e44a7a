use std::{
    collections::HashMap,
    fs::File,
    io::BufReader,
    path::Path,
};

use anyhow::Context;
use serde::{
    Deserialize,
    Serialize,
};

/// Accounts of interest mapped to the reason they are watched for.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Watchlist {
    entries: HashMap<String, String>,
}

impl Watchlist {
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open watchlist {}", path.display()))?;

        let watchlist: Self =
            serde_json::from_reader(BufReader::new(file)).context("invalid watchlist")?;
        log::debug!("Loaded {} watchlist entries", watchlist.len());
        Ok(watchlist)
    }

    pub fn insert(&mut self, account_id: impl Into<String>, reason: impl Into<String>) {
        self.entries.insert(account_id.into(), reason.into());
    }

    pub fn reason(&self, account_id: &str) -> Option<&str> {
        self.entries.get(account_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
