use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

use crate::{
    account_store::AccountStore,
    agent::SshAgent,
    crypto::{self, Algorithm},
    error::Error,
    git::{GitCli, Scope},
    host_alias::HostAliasStore,
    lifecycle::{IdentityLifecycle, NewIdentity},
    paths::Paths,
    util::file_age,
};

pub struct App {
    paths: Paths,
    store: AccountStore,
    agent: SshAgent,
    git: GitCli,
}

impl App {
    pub fn new(paths: Paths, store: AccountStore) -> Self {
        Self {
            paths,
            store,
            agent: SshAgent::new(),
            git: GitCli::new(),
        }
    }

    fn lifecycle(&self) -> IdentityLifecycle<'_> {
        IdentityLifecycle::new(
            self.paths.clone(),
            self.store.clone(),
            &self.agent,
            &self.git,
        )
    }

    pub fn handle_create(
        &self,
        name: &str,
        email: &str,
        passphrase: &str,
        algorithm: Algorithm,
    ) -> Result<()> {
        let created = match self.lifecycle().create_identity(NewIdentity {
            name,
            email,
            passphrase,
            algorithm,
        }) {
            Ok(created) => created,
            Err(e) => {
                if let Error::DuplicateAliasEntry(_) = e.root() {
                    let aliases = HostAliasStore::new(self.paths.ssh_config());
                    eprintln!(
                        "Remove the existing 'Host {}' entry from {} and run create again.",
                        aliases.alias_host(name),
                        aliases.path().display()
                    );
                }
                return Err(anyhow::Error::new(e).context("failed to create account"));
            }
        };

        println!("Account '{name}' created");
        println!("  Private key: {}", created.key_path.display());
        println!(
            "  Public key:  {}",
            crypto::public_key_path(&created.key_path).display()
        );
        println!("  Comment:     {}", created.comment);
        println!("  Remote host: git@{}:<owner>/<repo>.git", created.alias_host);
        println!();
        println!("{}", created.public_line);
        println!();
        println!("Add the public key above at https://github.com/settings/ssh/new");
        println!("then run: multigit use {name}");
        Ok(())
    }

    pub fn handle_delete(&self, name: &str, force: bool) -> Result<()> {
        if !force
            && !confirm(&format!(
                "This will permanently delete the account '{name}' and its SSH keys. Continue?"
            ))?
        {
            println!("Operation cancelled.");
            return Ok(());
        }

        self.lifecycle()
            .delete_identity(name)
            .context("failed to delete account")?;
        println!("Account '{name}' deleted");
        Ok(())
    }

    pub fn handle_list(&self) -> Result<()> {
        let document = self.store.load();
        if document.accounts.is_empty() {
            println!("No accounts configured. Use 'multigit create' to add one.");
            return Ok(());
        }

        for (name, account) in &document.accounts {
            let marker = if *name == document.active_account { "*" } else { " " };
            println!("{marker} {name}");
            println!("    Email:   {}", account.email);
            self.print_key(name);
        }

        match document.active_account() {
            Ok((name, account)) => println!("\nActive account: {name} <{}>", account.email),
            Err(_) => println!("\nNo active account. Use 'multigit use <account>' to set one."),
        }
        Ok(())
    }

    pub fn handle_use(&self, name: &str, local: bool) -> Result<()> {
        let scope = if local { Scope::Local } else { Scope::Global };
        let account = self
            .lifecycle()
            .switch_identity(name, scope)
            .with_context(|| format!("failed to switch to account '{name}'"))?;
        println!("Switched to account: {} <{}>", account.name, account.email);
        Ok(())
    }

    pub fn handle_status(&self) -> Result<()> {
        match self.store.active_account() {
            Ok((name, account)) => {
                println!("Active account:");
                println!("    Name:    {name}");
                println!("    Email:   {}", account.email);
                self.print_key(&name);
            }
            Err(e) => {
                tracing::debug!("no active account: {e}");
                println!("No active account. Use 'multigit use <account>' to set one.");
            }
        }
        Ok(())
    }

    fn print_key(&self, name: &str) {
        let Some((_, key_path)) = self.paths.find_key(name) else {
            println!(
                "    SSH key: {} (not found)",
                self.paths.key_path(Algorithm::Ed25519, name).display()
            );
            return;
        };

        println!("    SSH key: {}", key_path.display());
        let aliases = HostAliasStore::new(self.paths.ssh_config());
        if aliases.contains_entry(name).unwrap_or(false) {
            println!("    Host:    {}", aliases.alias_host(name));
        }
        let public_path = crypto::public_key_path(&key_path);
        if let Ok(line) = std::fs::read_to_string(&public_path) {
            if let Some(fingerprint) = crypto::fingerprint(&line) {
                println!("    Fingerprint: {fingerprint}");
            }
        }
        if let Some(age) = file_age(&public_path) {
            println!("    Created: {age}");
        }
    }

    pub fn handle_profile_create(&self, name: &str) -> Result<()> {
        let mut document = self.store.load();
        document.create_profile(name)?;
        self.store.save(&document).context("failed to save profile")?;
        println!("Created profile: {name}");
        Ok(())
    }

    pub fn handle_profile_list(&self) -> Result<()> {
        let document = self.store.load();
        if document.profiles.is_empty() {
            println!("No profiles found. Create one with 'multigit profile create <name>'.");
            return Ok(());
        }

        for (name, profile) in &document.profiles {
            let marker = if *name == document.active_profile { "*" } else { " " };
            let enabled = profile.accounts.values().filter(|enabled| **enabled).count();
            println!(
                "{marker} {name}  ({} accounts, {enabled} enabled)",
                profile.accounts.len()
            );
        }

        if document.active_profile.is_empty() {
            println!("\nNo active profile. Use 'multigit profile use <name>' to set one.");
        } else {
            println!("\nActive profile: {}", document.active_profile);
        }
        Ok(())
    }

    pub fn handle_profile_use(&self, name: &str) -> Result<()> {
        let mut document = self.store.load();
        document.use_profile(name)?;
        self.store
            .save(&document)
            .context("failed to update active profile")?;
        println!("Active profile set to: {name}");
        Ok(())
    }

    pub fn handle_profile_delete(&self, name: &str, force: bool) -> Result<()> {
        let mut document = self.store.load();
        if !document.profiles.contains_key(name) {
            return Err(Error::ProfileNotFound(name.to_string()).into());
        }
        if !force && !confirm(&format!("Delete profile '{name}'?"))? {
            println!("Operation cancelled.");
            return Ok(());
        }

        document.delete_profile(name)?;
        self.store.save(&document).context("failed to delete profile")?;
        println!("Deleted profile: {name}");
        Ok(())
    }

    pub fn handle_profile_add(&self, profile: &str, account: &str, enabled: bool) -> Result<()> {
        let mut document = self.store.load();
        document.set_profile_member(profile, account, enabled)?;
        self.store.save(&document).context("failed to save profile")?;
        println!("Added '{account}' to profile '{profile}'");
        Ok(())
    }

    pub fn handle_profile_drop(&self, profile: &str, account: &str) -> Result<()> {
        let mut document = self.store.load();
        if document.remove_profile_member(profile, account)? {
            self.store.save(&document).context("failed to save profile")?;
            println!("Removed '{account}' from profile '{profile}'");
        } else {
            println!("'{account}' is not in profile '{profile}'");
        }
        Ok(())
    }
}

fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y"))
}
