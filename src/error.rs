use std::{fmt, io, path::PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("account '{0}' already exists")]
    DuplicateAccount(String),

    #[error("ssh config entry for '{0}' already exists")]
    DuplicateAliasEntry(String),

    #[error("profile '{0}' already exists")]
    DuplicateProfile(String),

    #[error("key generation failed: {0}")]
    KeyGen(String),

    #[error("unsupported key type: {0}")]
    UnsupportedAlgorithm(String),

    #[error("account '{0}' does not exist")]
    AccountNotFound(String),

    #[error("profile '{0}' does not exist")]
    ProfileNotFound(String),

    #[error("active account '{0}' not found in config")]
    ActiveAccountNotFound(String),

    #[error("no active account")]
    NoActiveAccount,

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("key agent: {0}")]
    Agent(String),

    #[error("git: {0}")]
    Git(String),

    #[error("failed to {step}")]
    Step {
        step: Step,
        #[source]
        source: Box<Error>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// The innermost error, skipping any step wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Step { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Lifecycle stage a wrapped failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    GenerateKey,
    RegisterKey,
    AddAlias,
    ConfigureGit,
    Persist,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::GenerateKey => "create SSH key",
            Step::RegisterKey => "add SSH key to agent",
            Step::AddAlias => "add SSH config entry",
            Step::ConfigureGit => "set git config",
            Step::Persist => "save config",
        })
    }
}

pub trait StepExt<T> {
    fn step(self, step: Step) -> Result<T>;
}

impl<T> StepExt<T> for Result<T> {
    fn step(self, step: Step) -> Result<T> {
        self.map_err(|source| Error::Step {
            step,
            source: Box::new(source),
        })
    }
}
