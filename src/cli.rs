use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::crypto::Algorithm;

#[derive(Parser, Debug)]
#[command(version, about = "Manage multiple GitHub accounts and their SSH keys", long_about = None)]
pub struct Args {
    /// Account config file (default: ~/.config/multigit/config.json)
    #[arg(long, global = true, env = "MULTIGIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Home directory holding .ssh and .config
    #[arg(long, global = true, env = "MULTIGIT_HOME")]
    pub home: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an account: SSH key, agent entry, ssh config block
    Create {
        /// Account name
        name: String,

        /// Account email
        email: String,

        /// Passphrase for the private key
        #[arg(short, long, default_value = "")]
        passphrase: String,

        /// Key type
        #[arg(short = 't', long = "type", value_enum, default_value_t = Algorithm::Ed25519)]
        key_type: Algorithm,
    },

    /// Delete an account with its SSH keys and ssh config block
    #[command(visible_aliases = ["remove", "rm"])]
    Delete {
        name: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// List configured accounts
    #[command(visible_alias = "ls")]
    List,

    /// Switch to an account
    Use {
        name: String,

        /// Set git config for the current repository only
        #[arg(short, long)]
        local: bool,
    },

    /// Show the active account
    Status,

    /// Groups of accounts
    #[clap(subcommand)]
    Profile(Profile),
}

#[derive(Subcommand, Debug)]
pub enum Profile {
    /// Create an empty profile
    Create { name: String },

    /// List profiles
    #[command(visible_alias = "ls")]
    List,

    /// Set the active profile
    Use { name: String },

    /// Delete a profile
    #[command(visible_aliases = ["remove", "rm"])]
    Delete {
        name: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Add an account to a profile
    Add {
        profile: String,
        account: String,

        /// Add the account as disabled
        #[arg(long)]
        disabled: bool,
    },

    /// Remove an account from a profile
    Drop { profile: String, account: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_type(args: &[&str]) -> Result<Algorithm, clap::Error> {
        let args = Args::try_parse_from(
            ["multigit", "create", "work", "a@b.com"]
                .iter()
                .chain(args)
                .copied(),
        )?;
        match args.command {
            Commands::Create { key_type, .. } => Ok(key_type),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn key_type_is_validated_by_clap() {
        assert_eq!(key_type(&[]).unwrap(), Algorithm::Ed25519);
        assert_eq!(key_type(&["--type", "rsa"]).unwrap(), Algorithm::Rsa);
        assert_eq!(key_type(&["-t", "ed25519"]).unwrap(), Algorithm::Ed25519);

        let err = key_type(&["--type", "dsa"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }
}
