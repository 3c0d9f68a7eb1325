use std::process::Command;

use anyhow::{Context, Result, bail};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Global,
    /// The repository in the current working directory.
    Local,
}

pub trait GitConfig {
    fn set(&self, scope: Scope, key: &str, value: &str) -> Result<()>;
}

/// Shells out to `git config`.
pub struct GitCli {
    program: String,
}

impl GitCli {
    pub fn new() -> Self {
        Self {
            program: String::from("git"),
        }
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl GitConfig for GitCli {
    fn set(&self, scope: Scope, key: &str, value: &str) -> Result<()> {
        let mut command = Command::new(&self.program);
        command.arg("config");
        if scope == Scope::Global {
            command.arg("--global");
        }
        command.args([key, value]);

        debug!(?scope, key, value, "setting git config");
        let output = command
            .output()
            .with_context(|| format!("failed to run {}", self.program))?;
        if !output.status.success() {
            bail!(
                "git config {key} failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}
