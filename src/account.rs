use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::{AvatarError, Result};

pub type AccountId = u64;

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Account {
    pub id: AccountId,
    pub display_name: String,
    pub email: String,
    /// Set when the user uploaded an avatar, cleared on reset.
    pub avatar_upload_date: Option<SystemTime>,
}

impl Account {
    pub fn new(
        id: AccountId,
        display_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            email: email.into(),
            avatar_upload_date: None,
        }
    }

    /// Milliseconds since the epoch of the last upload, used to bust
    /// client caches whenever the uploaded file changes.
    pub fn avatar_version(&self) -> Option<u128> {
        self.avatar_upload_date
            .and_then(|date| date.duration_since(UNIX_EPOCH).ok())
            .map(|elapsed| elapsed.as_millis())
    }
}

/// Someone known only by name and email, e.g. a commit author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub name: String,
    pub email: String,
}

impl Person {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Persistence of accounts.
pub trait AccountStore {
    fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    fn save(&self, account: &Account) -> Result<()>;
}

impl<S: AccountStore + ?Sized> AccountStore for std::sync::Arc<S> {
    fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        (**self).find_by_email(email)
    }

    fn save(&self, account: &Account) -> Result<()> {
        (**self).save(account)
    }
}

/// Account store kept in memory, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: Mutex<HashMap<AccountId, Account>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: AccountId) -> Result<Option<Account>> {
        Ok(self.lock()?.get(&id).cloned())
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<AccountId, Account>>> {
        self.accounts
            .lock()
            .map_err(|_| AvatarError::Lock("memory account store".to_owned()))
    }
}

impl AccountStore for MemoryAccountStore {
    fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        Ok(self
            .lock()?
            .values()
            .find(|account| account.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    fn save(&self, account: &Account) -> Result<()> {
        self.lock()?
            .insert(account.id, account.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn avatar_version_is_epoch_millis() {
        let mut account = Account::new(1, "Ada Lovelace", "ada@example.com");
        assert_eq!(account.avatar_version(), None);

        account.avatar_upload_date =
            Some(UNIX_EPOCH + Duration::from_millis(1_500_000_000_123));
        assert_eq!(account.avatar_version(), Some(1_500_000_000_123));
    }

    #[test]
    fn memory_store_finds_by_email_ignoring_case() {
        let store = MemoryAccountStore::new();
        store
            .save(&Account::new(7, "Grace Hopper", "Grace@Example.com"))
            .unwrap();

        let found = store
            .find_by_email("grace@example.com")
            .unwrap()
            .unwrap();
        assert_eq!(found.id, 7);
        assert!(store
            .find_by_email("nobody@example.com")
            .unwrap()
            .is_none());
    }
}
