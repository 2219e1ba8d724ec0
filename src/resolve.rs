use std::path::Path;

use crate::error::{BillingError, Result};
use crate::model::{Category, RawRecord, ResolvedRecord};
use crate::registry::{Account, AccountRegistry};

pub const SENDERS_NAME: &str = "Senders Name";
pub const SENDER_CONTACT: &str = "Sender Contact";
pub const RECEIVERS_NAME: &str = "Receivers Name";
pub const BILLING_ACCOUNT: &str = "Billing Account";

/// A record together with the account it was attributed to.
#[derive(Debug, Clone)]
pub struct Resolution<'a> {
    pub account: &'a Account,
    pub record: ResolvedRecord,
}

/// Attributes raw rows to exactly one configured account.
#[derive(Debug, Clone, Copy)]
pub struct RowResolver<'a> {
    registry: &'a AccountRegistry,
}

impl<'a> RowResolver<'a> {
    pub fn new(registry: &'a AccountRegistry) -> Self {
        Self { registry }
    }

    /// Alias flow: matches the sender and receiver fields against account
    /// aliases. When several fields match different accounts the one
    /// registered first wins.
    pub fn resolve_by_alias(&self, path: &Path, raw: RawRecord) -> Result<Resolution<'a>> {
        let candidates = [
            raw.text(SENDERS_NAME),
            raw.text(SENDER_CONTACT),
            raw.text(RECEIVERS_NAME),
        ];

        let account = candidates
            .iter()
            .filter_map(|candidate| self.registry.lookup_by_alias(candidate))
            .min_by_key(|account| self.registry.position(account));

        match account {
            Some(account) => Ok(Resolution {
                account,
                record: ResolvedRecord {
                    account_name: account.name.clone(),
                    category: None,
                    raw,
                },
            }),
            None => {
                let [senders_name, sender_contact, receivers_name] = candidates;
                Err(BillingError::UnresolvedAccount {
                    path: path.to_path_buf(),
                    senders_name,
                    sender_contact,
                    receivers_name,
                })
            }
        }
    }

    /// Numeric-ID flow: matches `Billing Account` against the identifier for
    /// the category's direction. `None` means the row belongs to an account
    /// that is not configured and is left out of every report.
    pub fn resolve_by_id(&self, raw: RawRecord, category: Category) -> Option<Resolution<'a>> {
        let id = raw.text(BILLING_ACCOUNT);
        let account: &'a Account = self.registry.lookup_by_id(&id, category.direction())?;
        Some(Resolution {
            account,
            record: ResolvedRecord {
                account_name: account.name.clone(),
                category: Some(category),
                raw,
            },
        })
    }
}
