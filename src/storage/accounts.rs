use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::account::{Account, AccountId, AccountStore};
use crate::atomic::write_atomic;
use crate::{AvatarError, Result};

const LOG_PREFIX: &str = "[account-storage]";

/// Accounts persisted as a single JSON document.
///
/// Every write replaces the whole document through a temporary file, so
/// a crash mid-write keeps the previous version intact.
pub struct JsonAccountStore {
    label: String,
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonAccountStore {
    pub fn new(label: impl Into<String>, path: &Path) -> Result<Self> {
        let label = label.into();
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent)?
            }
            _ => {}
        }
        Ok(Self {
            label,
            path: PathBuf::from(path),
            write_lock: Mutex::new(()),
        })
    }

    fn error(&self, message: impl Into<String>) -> AvatarError {
        AvatarError::Store(self.label.clone(), message.into())
    }

    fn read_all(&self) -> Result<BTreeMap<AccountId, Account>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(BTreeMap::new())
            }
            Err(e) => return Err(e.into()),
        };
        let accounts: Vec<Account> = serde_json::from_slice(&bytes)
            .map_err(|e| self.error(format!("corrupted document: {e}")))?;
        Ok(accounts
            .into_iter()
            .map(|account| (account.id, account))
            .collect())
    }

    fn write_all(&self, accounts: &BTreeMap<AccountId, Account>) -> Result<()> {
        let list: Vec<&Account> = accounts.values().collect();
        let json = serde_json::to_vec_pretty(&list)
            .map_err(|e| self.error(e.to_string()))?;
        write_atomic(&self.path, &json)?;
        log::info!(
            "{} {} {} accounts have been written",
            LOG_PREFIX,
            self.label,
            accounts.len()
        );
        Ok(())
    }

    pub fn get(&self, id: AccountId) -> Result<Option<Account>> {
        Ok(self.read_all()?.remove(&id))
    }

    pub fn all(&self) -> Result<Vec<Account>> {
        Ok(self.read_all()?.into_values().collect())
    }

    pub fn delete(&self, id: AccountId) -> Result<bool> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| AvatarError::Lock(self.label.clone()))?;
        let mut accounts = self.read_all()?;
        if accounts.remove(&id).is_none() {
            return Ok(false);
        }
        self.write_all(&accounts)?;
        Ok(true)
    }
}

impl AccountStore for JsonAccountStore {
    fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        Ok(self
            .read_all()?
            .into_values()
            .find(|account| account.email.eq_ignore_ascii_case(email)))
    }

    fn save(&self, account: &Account) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| AvatarError::Lock(self.label.clone()))?;
        let mut accounts = self.read_all()?;
        accounts.insert(account.id, account.clone());
        self.write_all(&accounts)
    }
}
