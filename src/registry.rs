use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{BillingError, Result};
use crate::model::Direction;

/// A billed customer entity.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Account {
    /// Canonical account name; also its primary alias.
    pub name: String,
    /// Additional sender/receiver spellings that identify the account.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Numeric billing identifier used on export sheets.
    #[serde(default)]
    pub export_id: String,
    /// Numeric billing identifier used on import sheets.
    #[serde(default)]
    pub import_id: String,
    /// Multiplicative factor applied to carrier cost.
    pub markup: f64,
}

impl Account {
    /// Every spelling that identifies this account in the alias flow.
    pub fn alias_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Numeric identifiers, blank ones skipped.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        [self.export_id.as_str(), self.import_id.as_str()]
            .into_iter()
            .filter(|id| !id.trim().is_empty())
    }

    pub fn id_for(&self, direction: Direction) -> &str {
        match direction {
            Direction::Export => &self.export_id,
            Direction::Import => &self.import_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    accounts: Vec<Account>,
}

/// Immutable set of configured accounts.
///
/// Construction validates that no two accounts share an alias or a numeric
/// identifier, so every lookup has at most one answer. Accounts keep the
/// order they were configured in; reports iterate in that order.
#[derive(Debug, Clone)]
pub struct AccountRegistry {
    accounts: Vec<Account>,
    by_alias: HashMap<String, usize>,
    by_id: HashMap<String, usize>,
}

impl AccountRegistry {
    pub fn from_accounts(accounts: Vec<Account>) -> Result<Self> {
        let mut by_alias: HashMap<String, usize> = HashMap::new();
        let mut by_id: HashMap<String, usize> = HashMap::new();
        let mut names: BTreeSet<&str> = BTreeSet::new();

        for (index, account) in accounts.iter().enumerate() {
            if account.name.trim().is_empty() {
                return Err(BillingError::Configuration(format!(
                    "account #{} has an empty name",
                    index + 1
                )));
            }
            if !names.insert(account.name.as_str()) {
                return Err(BillingError::Configuration(format!(
                    "account '{}' is configured more than once",
                    account.name
                )));
            }
            if !(account.markup.is_finite() && account.markup > 0.0) {
                return Err(BillingError::Configuration(format!(
                    "account '{}' has invalid markup {}",
                    account.name, account.markup
                )));
            }

            for alias in account.alias_names() {
                let key = normalize_alias(alias);
                if key.is_empty() {
                    continue;
                }
                match by_alias.get(&key) {
                    Some(&owner) if owner != index => {
                        return Err(collision(&accounts[owner].name, &account.name, alias));
                    }
                    _ => {
                        by_alias.insert(key, index);
                    }
                }
            }

            for id in account.ids() {
                let key = id.trim().to_string();
                match by_id.get(&key) {
                    Some(&owner) if owner != index => {
                        return Err(collision(&accounts[owner].name, &account.name, id));
                    }
                    _ => {
                        by_id.insert(key, index);
                    }
                }
            }
        }

        debug!(account_count = accounts.len(), "account registry loaded");
        Ok(Self {
            accounts,
            by_alias,
            by_id,
        })
    }

    /// Decodes and validates a registry from its JSON document.
    pub fn from_json(source: &str, path: &Path) -> Result<Self> {
        let file: RegistryFile =
            serde_json::from_str(source).map_err(|source| BillingError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_accounts(file.accounts)
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn get(&self, name: &str) -> Option<&Account> {
        self.accounts.iter().find(|account| account.name == name)
    }

    /// Registration order of `account`, used to break ties deterministically.
    pub fn position(&self, account: &Account) -> usize {
        self.accounts
            .iter()
            .position(|candidate| candidate.name == account.name)
            .unwrap_or(usize::MAX)
    }

    /// Every identifying key of `account`: normalized aliases and numeric IDs.
    pub fn resolve_keys(&self, account: &Account) -> BTreeSet<String> {
        account
            .alias_names()
            .map(normalize_alias)
            .filter(|alias| !alias.is_empty())
            .chain(account.ids().map(|id| id.trim().to_string()))
            .collect()
    }

    /// Case-insensitive exact match against account aliases.
    pub fn lookup_by_alias(&self, name: &str) -> Option<&Account> {
        let key = normalize_alias(name);
        if key.is_empty() {
            return None;
        }
        self.by_alias.get(&key).map(|&index| &self.accounts[index])
    }

    /// Exact match against the identifier appropriate to `direction`.
    pub fn lookup_by_id(&self, id: &str, direction: Direction) -> Option<&Account> {
        let id = id.trim();
        self.by_id
            .get(id)
            .map(|&index| &self.accounts[index])
            .filter(|account| account.id_for(direction).trim() == id)
    }
}

fn normalize_alias(alias: &str) -> String {
    alias.trim().to_uppercase()
}

fn collision(first: &str, second: &str, key: &str) -> BillingError {
    BillingError::Configuration(format!(
        "accounts '{first}' and '{second}' share identity key '{key}'"
    ))
}
