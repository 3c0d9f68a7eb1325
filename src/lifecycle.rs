//! Create, switch and delete identities: one key pair, one ssh config block
//! and one account record sharing a name.
//!
//! Multi-step operations stop at the first failing step and do not undo the
//! steps already taken. Re-running after a partial create requires deleting
//! the identity first.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::{
    account_store::{AccountRecord, AccountStore, ConfigDocument},
    agent::KeyAgent,
    crypto::{self, Algorithm, KeyPair},
    error::{Error, Result, Step, StepExt},
    git::{GitConfig, Scope},
    host_alias::{HostAliasStore, Removal, UPSTREAM_HOST},
    paths::Paths,
};

pub type Persist<'a> = Box<dyn Fn(&ConfigDocument) -> Result<()> + 'a>;

pub struct NewIdentity<'r> {
    pub name: &'r str,
    pub email: &'r str,
    pub passphrase: &'r str,
    pub algorithm: Algorithm,
}

#[derive(Debug)]
pub struct Created {
    pub key_path: PathBuf,
    pub comment: String,
    pub public_line: String,
    pub alias_host: String,
}

pub struct IdentityLifecycle<'a> {
    paths: Paths,
    store: AccountStore,
    aliases: HostAliasStore,
    agent: &'a dyn KeyAgent,
    git: &'a dyn GitConfig,
    persist: Option<Persist<'a>>,
}

impl<'a> IdentityLifecycle<'a> {
    pub fn new(
        paths: Paths,
        store: AccountStore,
        agent: &'a dyn KeyAgent,
        git: &'a dyn GitConfig,
    ) -> Self {
        let aliases = HostAliasStore::new(paths.ssh_config());
        Self {
            paths,
            store,
            aliases,
            agent,
            git,
            persist: None,
        }
    }

    /// Replaces `AccountStore::save` as the final step of every operation.
    pub fn with_persist(mut self, persist: impl Fn(&ConfigDocument) -> Result<()> + 'a) -> Self {
        self.persist = Some(Box::new(persist));
        self
    }

    pub fn aliases(&self) -> &HostAliasStore {
        &self.aliases
    }

    fn persist(&self, document: &ConfigDocument) -> Result<()> {
        match &self.persist {
            Some(persist) => persist(document),
            None => self.store.save(document),
        }
    }

    pub fn create_identity(&self, request: NewIdentity<'_>) -> Result<Created> {
        let NewIdentity {
            name,
            email,
            passphrase,
            algorithm,
        } = request;

        validate_name(name)?;
        validate_email(email)?;

        let mut document = self.store.load();
        if document.accounts.contains_key(name) {
            return Err(Error::DuplicateAccount(name.to_string()));
        }

        let key_path = self.paths.key_path(algorithm, name);
        let pair = KeyPair::generate(algorithm, &crypto::key_comment(name, email), passphrase)
            .step(Step::GenerateKey)?;
        pair.write_to_files(&key_path).step(Step::GenerateKey)?;
        info!(name, key = %key_path.display(), %algorithm, "created SSH key pair");

        self.agent
            .register_key(name, &key_path)
            .map_err(|e| Error::Agent(format!("{e:#}")))
            .step(Step::RegisterKey)?;

        self.aliases
            .add_entry(name, &key_path)
            .step(Step::AddAlias)?;
        info!(name, config = %self.aliases().path().display(), "added ssh config entry");

        document.accounts.insert(
            name.to_string(),
            AccountRecord {
                name: name.to_string(),
                email: email.to_string(),
            },
        );
        self.persist(&document).step(Step::Persist)?;
        info!(name, "account created");

        Ok(Created {
            key_path,
            comment: pair.comment().to_string(),
            public_line: pair.public_line().to_string(),
            alias_host: self.aliases.alias_host(name),
        })
    }

    /// Only saving the document can fail once the account is known to exist;
    /// key and ssh config cleanup failures are logged and skipped.
    pub fn delete_identity(&self, name: &str) -> Result<()> {
        let mut document = self.store.load();
        if !document.accounts.contains_key(name) {
            return Err(Error::AccountNotFound(name.to_string()));
        }

        for algorithm in Algorithm::ALL {
            let key_path = self.paths.key_path(algorithm, name);
            if key_path.is_file() {
                if let Err(e) = self.agent.forget_key(name, &key_path) {
                    debug!(name, "key was not removed from agent: {e:#}");
                }
            }
            if let Err(e) = crypto::delete_files(&key_path) {
                warn!(name, "failed to delete SSH key: {e}");
            }
        }

        match self.aliases.remove_entry(name) {
            Ok(Removal::Removed) => info!(name, "removed ssh config entry"),
            Ok(Removal::NotPresent) => debug!(name, "no ssh config entry to remove"),
            Err(e) => warn!(name, "failed to remove ssh config entry: {e}"),
        }

        document.accounts.remove(name);
        if document.active_account == name {
            document.active_account.clear();
        }
        self.persist(&document).step(Step::Persist)?;
        info!(name, "account deleted");
        Ok(())
    }

    /// Loads the identity's key into the agent, points git at it, and marks
    /// the account active.
    pub fn switch_identity(&self, name: &str, scope: Scope) -> Result<AccountRecord> {
        let mut document = self.store.load();
        let account = document
            .accounts
            .get(name)
            .cloned()
            .ok_or_else(|| Error::AccountNotFound(name.to_string()))?;

        let (_, key_path) = self
            .paths
            .find_key(name)
            .ok_or_else(|| {
                Error::Agent(format!(
                    "no SSH key found for account {name} in {}",
                    self.paths.ssh_dir().display()
                ))
            })
            .step(Step::RegisterKey)?;

        self.agent
            .register_key(name, &key_path)
            .map_err(|e| Error::Agent(format!("{e:#}")))
            .step(Step::RegisterKey)?;

        let ssh_command = format!("ssh -i '{}' -F /dev/null", key_path.display());
        let rewrite_key = format!("url.ssh://git@{UPSTREAM_HOST}/.insteadOf");
        let rewrite_from = format!("https://{UPSTREAM_HOST}/");
        let mut settings = vec![
            (scope, "user.name", account.name.as_str()),
            (scope, "user.email", account.email.as_str()),
        ];
        // https remotes are rewritten to ssh only in the global config.
        if scope == Scope::Global {
            settings.push((Scope::Global, rewrite_key.as_str(), rewrite_from.as_str()));
        }
        settings.push((Scope::Global, "push.default", "current"));
        settings.push((scope, "core.sshCommand", ssh_command.as_str()));

        settings
            .into_iter()
            .try_for_each(|(scope, key, value)| self.git.set(scope, key, value))
        .map_err(|e| Error::Git(format!("{e:#}")))
        .step(Step::ConfigureGit)?;

        document.active_account = name.to_string();
        self.persist(&document).step(Step::Persist)?;
        info!(name, ?scope, "switched account");
        Ok(account)
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::validation("name", "account name cannot be empty"));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.');
    if !name.chars().all(allowed) {
        return Err(Error::validation(
            "name",
            format!("'{name}' may only contain letters, digits, '-', '_' and '.'"),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<()> {
    if email.is_empty() {
        return Err(Error::validation("email", "email cannot be empty"));
    }
    if !email.contains('@') {
        return Err(Error::validation("email", "invalid email format"));
    }
    Ok(())
}
