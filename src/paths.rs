use std::path::PathBuf;

use directories::BaseDirs;

use crate::{
    TOOL_NAME,
    crypto::Algorithm,
    error::{Error, Result},
};

/// Home-relative locations of every file the tool reads or writes.
#[derive(Debug, Clone)]
pub struct Paths {
    home: PathBuf,
}

impl Paths {
    pub fn from_home(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    pub fn from_user_home() -> Result<Self> {
        let base_dirs = BaseDirs::new().ok_or_else(|| {
            Error::io(
                "~",
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "failed to get user home directory",
                ),
            )
        })?;
        Ok(Self::from_home(base_dirs.home_dir()))
    }

    pub fn ssh_dir(&self) -> PathBuf {
        self.home.join(".ssh")
    }

    pub fn ssh_config(&self) -> PathBuf {
        self.ssh_dir().join("config")
    }

    pub fn key_path(&self, algorithm: Algorithm, name: &str) -> PathBuf {
        self.ssh_dir()
            .join(format!("id_{}_{}", algorithm.file_tag(), name))
    }

    /// Existing private key for `name`, preferring Ed25519 over RSA.
    pub fn find_key(&self, name: &str) -> Option<(Algorithm, PathBuf)> {
        Algorithm::ALL
            .into_iter()
            .map(|algorithm| (algorithm, self.key_path(algorithm, name)))
            .find(|(_, path)| path.is_file())
    }

    pub fn account_config(&self) -> PathBuf {
        self.home
            .join(".config")
            .join(TOOL_NAME)
            .join("config.json")
    }
}
