use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use sha2::{Digest, Sha256};

use crate::account::{Account, AccountStore, Person};
use crate::atomic::{write_atomic, write_atomic_with};
use crate::config::{AvatarConfig, SystemSettings, DEFAULT_AVATAR};
use crate::locks::LockManager;
use crate::upload::Upload;
use crate::{generator, gravatar, Result};

/// Longest key used verbatim as a file name.
const MAX_KEY_LEN: usize = 200;
const HASHED_KEY_PREFIX: &str = "h-";

/// File name of the placeholder generated for `name`/`email` by generator
/// `version`.
///
/// The key is the URL-safe base64 of `name:email:version`, which never
/// contains a path separator. Keys too long for a file name are replaced
/// by the hex SHA-256 of the same string.
pub fn placeholder_key(name: &str, email: &str, version: u32) -> String {
    let concatenated = format!("{name}:{email}:{version}");
    let encoded = URL_SAFE_NO_PAD.encode(concatenated.as_bytes());
    if encoded.len() <= MAX_KEY_LEN {
        encoded
    } else {
        format!(
            "{HASHED_KEY_PREFIX}{}",
            hex::encode(Sha256::digest(concatenated.as_bytes()))
        )
    }
}

/// Computes avatar URLs and maintains the avatar files behind them.
///
/// Uploaded avatars live at `avatars/<account id>`, generated placeholders
/// at `avatars/<placeholder key>`, both under the configured site dir.
pub struct AvatarResolver<S, C> {
    config: AvatarConfig,
    accounts: S,
    settings: C,
    generation_locks: Arc<LockManager>,
    upload_locks: Arc<LockManager>,
}

impl<S: AccountStore> AvatarResolver<S, AvatarConfig> {
    /// Resolver whose gravatar switch is the static `config` value.
    pub fn from_config(config: AvatarConfig, accounts: S) -> Result<Self> {
        let settings = config.clone();
        Self::new(config, accounts, settings)
    }
}

impl<S, C> AvatarResolver<S, C>
where
    S: AccountStore,
    C: SystemSettings,
{
    pub fn new(config: AvatarConfig, accounts: S, settings: C) -> Result<Self> {
        Self::with_locks(
            config,
            accounts,
            settings,
            Arc::new(LockManager::new("avatars:generate")),
            Arc::new(LockManager::new("avatars:upload")),
        )
    }

    /// Like [`AvatarResolver::new`] but sharing lock registries with other
    /// resolvers working on the same site dir.
    pub fn with_locks(
        config: AvatarConfig,
        accounts: S,
        settings: C,
        generation_locks: Arc<LockManager>,
        upload_locks: Arc<LockManager>,
    ) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(config.avatars_dir())?;
        log::info!(
            "avatars: serving {} from {}",
            config.avatars_dir().display(),
            config.base_url()
        );
        Ok(Self {
            config,
            accounts,
            settings,
            generation_locks,
            upload_locks,
        })
    }

    pub fn config(&self) -> &AvatarConfig {
        &self.config
    }

    pub fn accounts(&self) -> &S {
        &self.accounts
    }

    pub fn default_url(&self) -> String {
        format!("{}{}", self.config.base_url(), DEFAULT_AVATAR)
    }

    /// Path of the avatar uploaded by `account`.
    pub fn uploaded_path(&self, account: &Account) -> PathBuf {
        self.config
            .avatars_dir()
            .join(account.id.to_string())
    }

    /// Avatar URL of `account`, or of an anonymous visitor when `None`.
    ///
    /// An upload date pointing at a missing file is cleared and persisted,
    /// then resolution carries on as if no avatar had been uploaded.
    pub fn url_for_account(&self, account: Option<&mut Account>) -> Result<String> {
        let account = match account {
            Some(account) => account,
            None => return Ok(self.default_url()),
        };

        if let Some(version) = account.avatar_version() {
            if self.uploaded_path(account).exists() {
                return Ok(format!(
                    "{}{}?version={}",
                    self.config.base_url(),
                    account.id,
                    version
                ));
            }
            log::warn!(
                "avatars: uploaded avatar of account {} is missing, resetting",
                account.id
            );
            account.avatar_upload_date = None;
            self.accounts.save(account)?;
        }

        self.external_or_placeholder(&account.display_name, &account.email)
    }

    /// Avatar URL of someone who may not have an account, e.g. a commit
    /// author. A matching account's own avatar takes precedence.
    pub fn url_for_person(&self, person: &Person) -> Result<String> {
        match self.accounts.find_by_email(&person.email)? {
            Some(mut account) => self.url_for_account(Some(&mut account)),
            None => self.external_or_placeholder(&person.name, &person.email),
        }
    }

    fn external_or_placeholder(&self, name: &str, email: &str) -> Result<String> {
        if self.settings.gravatar_enabled() {
            Ok(gravatar::url(email, self.config.gravatar_size))
        } else {
            self.placeholder_url(name, email)
        }
    }

    /// URL of the generated placeholder for `name`/`email`, rendering it
    /// first if it does not exist yet.
    pub fn placeholder_url(&self, name: &str, email: &str) -> Result<String> {
        self.ensure_placeholder(name, email)
            .map(|(url, _)| url)
    }

    /// Returns the placeholder URL and whether this call rendered the file.
    fn ensure_placeholder(&self, name: &str, email: &str) -> Result<(String, bool)> {
        let key = placeholder_key(name, email, self.config.generator_version);
        let url = format!("{}{}", self.config.base_url(), key);
        let path = self.config.avatars_dir().join(&key);
        if path.exists() {
            return Ok((url, false));
        }

        let generated = self.generation_locks.with_lock(&key, || {
            // Someone holding the lock before us may have rendered it.
            if path.exists() {
                return Ok(false);
            }
            let png = generator::generate(
                name,
                email,
                self.config.placeholder_size,
            )?;
            write_atomic(&path, &png)?;
            log::debug!("avatars: generated placeholder {}", key);
            Ok(true)
        })?;
        Ok((url, generated))
    }

    /// Store `upload` as the avatar of `account` and record the upload date.
    ///
    /// If writing the file fails the account is left untouched.
    pub fn use_avatar<U: Upload + ?Sized>(
        &self,
        account: &mut Account,
        upload: &U,
    ) -> Result<()> {
        let path = self.uploaded_path(account);
        self.upload_locks
            .with_lock(&account.id.to_string(), || {
                write_atomic_with(&path, |tmp| upload.write_to(tmp))?;
                Ok(())
            })?;

        let previous = account.avatar_upload_date;
        account.avatar_upload_date = Some(SystemTime::now());
        if let Err(e) = self.accounts.save(account) {
            account.avatar_upload_date = previous;
            return Err(e);
        }
        log::info!("avatars: account {} uploaded a new avatar", account.id);
        Ok(())
    }

    /// Forget the uploaded avatar of `account`. The file stays on disk.
    pub fn reset_avatar(&self, account: &mut Account) -> Result<()> {
        account.avatar_upload_date = None;
        self.accounts.save(account)?;
        log::info!("avatars: account {} reset its avatar", account.id);
        Ok(())
    }
}
