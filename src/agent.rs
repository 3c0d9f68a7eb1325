use std::{
    env,
    ffi::OsStr,
    path::Path,
    process::{Command, Output},
};

use anyhow::{Context, Result, anyhow, bail};
use tracing::debug;

/// Loads identity keys into whatever key agent the user runs.
pub trait KeyAgent {
    fn register_key(&self, name: &str, private_key_path: &Path) -> Result<()>;

    fn forget_key(&self, name: &str, private_key_path: &Path) -> Result<()>;
}

/// `ssh-add` against the agent advertised in `SSH_AUTH_SOCK`.
pub struct SshAgent {
    program: String,
}

impl SshAgent {
    pub fn new() -> Self {
        Self {
            program: String::from("ssh-add"),
        }
    }

    fn run(&self, args: &[&OsStr]) -> Result<Output> {
        if env::var_os("SSH_AUTH_SOCK").is_none_or(|sock| sock.is_empty()) {
            bail!("SSH agent is not running, start it and try again");
        }
        debug!(program = %self.program, ?args, "running key agent command");
        Command::new(&self.program)
            .args(args)
            .output()
            .with_context(|| format!("failed to run {}", self.program))
    }
}

impl Default for SshAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyAgent for SshAgent {
    fn register_key(&self, _name: &str, private_key_path: &Path) -> Result<()> {
        if !private_key_path.is_file() {
            bail!(
                "private key file {} does not exist",
                private_key_path.display()
            );
        }
        let output = self.run(&[private_key_path.as_os_str()])?;
        check(output, "failed to add key to SSH agent")
    }

    fn forget_key(&self, _name: &str, private_key_path: &Path) -> Result<()> {
        let output = self.run(&[OsStr::new("-d"), private_key_path.as_os_str()])?;
        check(output, "failed to remove key from SSH agent")
    }
}

fn check(output: Output, what: &str) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    Err(anyhow!("{what}: {} ({})", text.trim(), output.status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_missing_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SshAgent::new()
            .register_key("work", &dir.path().join("id_ed25519_work"))
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn reports_failed_command_output() {
        let output = Command::new("sh")
            .args(["-c", "echo 'Could not open' >&2; exit 2"])
            .output()
            .unwrap();
        let err = check(output, "failed to add key to SSH agent").unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("failed to add key to SSH agent: Could not open"));
    }
}
