//! Managed `Host` blocks inside the user's ssh config.
//!
//! Every identity owns one block delimited by comment markers:
//!
//! ```text
//! # Multigit managed config for work
//! Host github.com-work
//! 	HostName github.com
//! 	User git
//! 	IdentityFile /home/u/.ssh/id_ed25519_work
//! 	IdentitiesOnly yes
//! # End of Multigit config for work
//! ```
//!
//! Everything outside those blocks is preserved line for line. Bare
//! `Host github.com-<name>` stanzas written by older versions are recognised
//! and removed as well.

use std::{
    fs, io,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::{
    TOOL_NAME,
    error::{Error, Result},
    fsutil,
};

pub const UPSTREAM_HOST: &str = "github.com";

const BEGIN_MARKER: &str = "# Multigit managed config for ";
const END_MARKER: &str = "# End of Multigit config for ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    NotPresent,
}

pub struct HostAliasStore {
    path: PathBuf,
    host: String,
}

impl HostAliasStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            host: UPSTREAM_HOST.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Host token remotes use to select this identity, e.g. `github.com-work`.
    pub fn alias_host(&self, name: &str) -> String {
        format!("{}-{}", self.host, name)
    }

    pub fn contains_entry(&self, name: &str) -> Result<bool> {
        let document = self.read()?.unwrap_or_default();
        Ok(has_host(&document, &self.alias_host(name)))
    }

    pub fn add_entry(&self, name: &str, private_key_path: &Path) -> Result<()> {
        let original = self.read()?.unwrap_or_default();
        let alias = self.alias_host(name);
        if has_host(&original, &alias) {
            return Err(Error::DuplicateAliasEntry(name.to_string()));
        }

        let mut updated = original.clone();
        if !updated.is_empty() {
            if !updated.ends_with('\n') {
                updated.push('\n');
            }
            updated.push('\n');
        }
        updated.push_str(&render_block(name, &alias, &self.host, private_key_path));

        self.commit(&original, &updated)?;
        debug!(path = %self.path.display(), alias, "added ssh config entry");
        Ok(())
    }

    /// Drops the managed block (or legacy stanza) for `name`. The file is only
    /// rewritten when something was actually removed.
    pub fn remove_entry(&self, name: &str) -> Result<Removal> {
        let Some(original) = self.read()? else {
            return Ok(Removal::NotPresent);
        };

        match strip_identity(&original, name, &self.alias_host(name)) {
            Some(updated) => {
                self.commit(&original, &updated)?;
                debug!(path = %self.path.display(), name, "removed ssh config entry");
                Ok(Removal::Removed)
            }
            None => Ok(Removal::NotPresent),
        }
    }

    fn read(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::io(&self.path, e)),
        }
    }

    fn backup_path(&self) -> PathBuf {
        let mut path = self.path.as_os_str().to_owned();
        path.push(format!(".{TOOL_NAME}.bak"));
        PathBuf::from(path)
    }

    /// Backup, write a sibling temp file, rename it over the config, then drop
    /// the backup. A failed write leaves the backup behind.
    fn commit(&self, original: &str, updated: &str) -> Result<()> {
        self.commit_with(original, updated, fsutil::write_atomic)
    }

    fn commit_with(
        &self,
        original: &str,
        updated: &str,
        replace: impl FnOnce(&Path, &[u8], u32) -> Result<()>,
    ) -> Result<()> {
        let mode = match fs::metadata(&self.path) {
            Ok(metadata) => metadata.permissions().mode() & 0o777,
            Err(_) => fsutil::PRIVATE_FILE_MODE,
        };

        fsutil::create_parent_dir(&self.path)?;

        let backup = self.backup_path();
        let exists = self.path.exists();
        if exists {
            fsutil::write_with_mode(&backup, original.as_bytes(), fsutil::PRIVATE_FILE_MODE)?;
        }

        replace(&self.path, updated.as_bytes(), mode)?;

        if exists {
            if let Err(e) = fs::remove_file(&backup) {
                warn!(path = %backup.display(), "failed to remove ssh config backup: {e}");
            }
        }
        Ok(())
    }
}

/// Loose identity match: the name (or alias) only has to appear somewhere in
/// the marker or `Host` value, so `acct` also matches `acct2`.
fn mentions(text: &str, needle: &str) -> bool {
    text.contains(needle)
}

/// Value of a `Host` keyword line, if `line` is one.
fn host_value(line: &str) -> Option<&str> {
    keyword_value(line, "host")
}

fn keyword_value<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let line = line.trim();
    let (key, rest) = line.split_once(|c: char| c.is_whitespace() || c == '=')?;
    key.eq_ignore_ascii_case(keyword)
        .then(|| rest.trim_start_matches(|c: char| c.is_whitespace() || c == '='))
}

fn has_host(document: &str, alias: &str) -> bool {
    document
        .lines()
        .filter_map(host_value)
        .any(|hosts| mentions(hosts, alias))
}

fn render_block(name: &str, alias: &str, host: &str, private_key_path: &Path) -> String {
    format!(
        "{BEGIN_MARKER}{name}\n\
         Host {alias}\n\
         \tHostName {host}\n\
         \tUser git\n\
         \tIdentityFile {}\n\
         \tIdentitiesOnly yes\n\
         {END_MARKER}{name}\n",
        private_key_path.display()
    )
}

#[derive(PartialEq)]
enum Scan {
    Outside,
    Managed,
    Legacy,
}

/// Returns the document without `name`'s blocks, or `None` if nothing matched.
fn strip_identity(document: &str, name: &str, alias: &str) -> Option<String> {
    let mut kept: Vec<&str> = Vec::new();
    let mut removed = false;
    let mut state = Scan::Outside;

    for line in document.lines() {
        let trimmed = line.trim();

        if state == Scan::Managed {
            if trimmed
                .strip_prefix(END_MARKER)
                .is_some_and(|rest| mentions(rest, name))
            {
                state = Scan::Outside;
            }
            continue;
        }

        if state == Scan::Legacy {
            let next_stanza = host_value(trimmed).is_some()
                || keyword_value(trimmed, "match").is_some()
                || trimmed.starts_with('#');
            if !next_stanza {
                continue;
            }
            state = Scan::Outside;
        }

        if trimmed
            .strip_prefix(BEGIN_MARKER)
            .is_some_and(|rest| mentions(rest, name))
        {
            state = Scan::Managed;
            removed = true;
            continue;
        }

        if host_value(trimmed).is_some_and(|hosts| mentions(hosts, alias)) {
            state = Scan::Legacy;
            removed = true;
            continue;
        }

        kept.push(line);
    }

    if !removed {
        return None;
    }

    while kept.last().is_some_and(|line| line.trim().is_empty()) {
        kept.pop();
    }
    let mut updated = kept.join("\n");
    if !updated.is_empty() {
        updated.push('\n');
    }
    Some(updated)
}
