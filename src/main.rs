use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use account_store::AccountStore;
use paths::Paths;

mod account_store;
mod agent;
mod app;
mod cli;
mod crypto;
mod error;
mod fsutil;
mod git;
mod host_alias;
mod lifecycle;
mod paths;
mod util;

pub const TOOL_NAME: &str = "multigit";

fn main() -> Result<()> {
    let args = cli::Args::parse();

    let default_filter = if args.verbose {
        "warn,multigit=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let paths = match args.home {
        Some(home) => Paths::from_home(home),
        None => Paths::from_user_home()?,
    };
    let store = AccountStore::new(args.config.unwrap_or_else(|| paths.account_config()));
    tracing::debug!(config = %store.path().display(), home = %paths.ssh_dir().display(), "resolved paths");
    let app = app::App::new(paths, store);

    match args.command {
        cli::Commands::Create {
            name,
            email,
            passphrase,
            key_type,
        } => app.handle_create(&name, &email, &passphrase, key_type)?,
        cli::Commands::Delete { name, force } => app.handle_delete(&name, force)?,
        cli::Commands::List => app.handle_list()?,
        cli::Commands::Use { name, local } => app.handle_use(&name, local)?,
        cli::Commands::Status => app.handle_status()?,
        cli::Commands::Profile(profile) => match profile {
            cli::Profile::Create { name } => app.handle_profile_create(&name)?,
            cli::Profile::List => app.handle_profile_list()?,
            cli::Profile::Use { name } => app.handle_profile_use(&name)?,
            cli::Profile::Delete { name, force } => app.handle_profile_delete(&name, force)?,
            cli::Profile::Add {
                profile,
                account,
                disabled,
            } => app.handle_profile_add(&profile, &account, !disabled)?,
            cli::Profile::Drop { profile, account } => {
                app.handle_profile_drop(&profile, &account)?
            }
        },
    }

    Ok(())
}
