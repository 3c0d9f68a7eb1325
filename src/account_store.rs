use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    fsutil,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Account name to enabled flag. Names are not required to exist.
    #[serde(default, deserialize_with = "null_as_default")]
    pub accounts: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default, deserialize_with = "null_as_default")]
    pub accounts: BTreeMap<String, AccountRecord>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub active_account: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub profiles: BTreeMap<String, ProfileRecord>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub active_profile: String,
}

fn null_as_default<'de, D, T>(de: D) -> std::result::Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

impl ConfigDocument {
    /// Clears active references that point at nothing.
    pub fn heal(&mut self) {
        if !self.active_account.is_empty() && !self.accounts.contains_key(&self.active_account) {
            debug!(account = %self.active_account, "clearing dangling active account");
            self.active_account.clear();
        }
        if !self.active_profile.is_empty() && !self.profiles.contains_key(&self.active_profile) {
            debug!(profile = %self.active_profile, "clearing dangling active profile");
            self.active_profile.clear();
        }
    }

    pub fn active_account(&self) -> Result<(&str, &AccountRecord)> {
        if self.active_account.is_empty() {
            return Err(Error::NoActiveAccount);
        }
        self.accounts
            .get_key_value(&self.active_account)
            .map(|(name, account)| (name.as_str(), account))
            .ok_or_else(|| Error::ActiveAccountNotFound(self.active_account.clone()))
    }

    pub fn create_profile(&mut self, name: &str) -> Result<()> {
        if self.profiles.contains_key(name) {
            return Err(Error::DuplicateProfile(name.to_string()));
        }
        self.profiles.insert(
            name.to_string(),
            ProfileRecord {
                name: name.to_string(),
                accounts: BTreeMap::new(),
            },
        );
        Ok(())
    }

    pub fn delete_profile(&mut self, name: &str) -> Result<ProfileRecord> {
        let profile = self
            .profiles
            .remove(name)
            .ok_or_else(|| Error::ProfileNotFound(name.to_string()))?;
        if self.active_profile == name {
            self.active_profile.clear();
        }
        Ok(profile)
    }

    pub fn use_profile(&mut self, name: &str) -> Result<()> {
        if !self.profiles.contains_key(name) {
            return Err(Error::ProfileNotFound(name.to_string()));
        }
        self.active_profile = name.to_string();
        Ok(())
    }

    pub fn set_profile_member(&mut self, profile: &str, account: &str, enabled: bool) -> Result<()> {
        if !self.accounts.contains_key(account) {
            return Err(Error::AccountNotFound(account.to_string()));
        }
        let profile = self
            .profiles
            .get_mut(profile)
            .ok_or_else(|| Error::ProfileNotFound(profile.to_string()))?;
        profile.accounts.insert(account.to_string(), enabled);
        Ok(())
    }

    pub fn remove_profile_member(&mut self, profile: &str, account: &str) -> Result<bool> {
        let profile = self
            .profiles
            .get_mut(profile)
            .ok_or_else(|| Error::ProfileNotFound(profile.to_string()))?;
        Ok(profile.accounts.remove(account).is_some())
    }
}

/// Whole-document JSON persistence of accounts and profiles. Nothing is
/// cached: every `load` re-reads the file.
#[derive(Debug, Clone)]
pub struct AccountStore {
    path: PathBuf,
}

impl AccountStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Never fails: a missing, unreadable or malformed file yields an empty
    /// document.
    pub fn load(&self) -> ConfigDocument {
        match Self::load_from_file(&self.path) {
            Ok(document) => document,
            Err(Error::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                ConfigDocument::default()
            }
            Err(e) => {
                warn!("ignoring unusable config file: {e}");
                ConfigDocument::default()
            }
        }
    }

    pub fn save(&self, document: &ConfigDocument) -> Result<()> {
        Self::save_to_file(document, &self.path)
    }

    pub fn active_account(&self) -> Result<(String, AccountRecord)> {
        let document = self.load();
        let (name, account) = document.active_account()?;
        Ok((name.to_string(), account.clone()))
    }

    pub fn load_from_file(path: &Path) -> Result<ConfigDocument> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_str(&text).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to_file(document: &ConfigDocument, path: &Path) -> Result<()> {
        let mut document = document.clone();
        document.heal();

        fsutil::create_parent_dir(path)?;
        let text = serde_json::to_string_pretty(&document).map_err(Error::Serialize)?;
        fsutil::write_atomic(path, text.as_bytes(), fsutil::PRIVATE_FILE_MODE)?;
        debug!(path = %path.display(), accounts = document.accounts.len(), "saved config");
        Ok(())
    }
}
