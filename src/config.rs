use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::generator::GENERATOR_VERSION;
use crate::{AvatarError, Result};

pub const AVATARS_FOLDER: &str = "avatars";
pub const DEFAULT_BASE_URL: &str = "site/avatars/";
pub const DEFAULT_AVATAR: &str = "default.png";
pub const GRAVATAR_SIZE: u32 = 256;
pub const PLACEHOLDER_SIZE: u32 = 128;
const MIN_PLACEHOLDER_SIZE: u32 = 16;
const MAX_PLACEHOLDER_SIZE: u32 = 1024;

/// Source of system settings which may change while the server runs.
pub trait SystemSettings {
    fn gravatar_enabled(&self) -> bool;
}

impl<C: SystemSettings + ?Sized> SystemSettings for std::sync::Arc<C> {
    fn gravatar_enabled(&self) -> bool {
        (**self).gravatar_enabled()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AvatarConfig {
    /// Directory holding the `avatars` folder.
    pub site_dir: PathBuf,
    /// URL prefix the `avatars` folder is served from.
    pub base_url: String,
    pub gravatar_enabled: bool,
    pub gravatar_size: u32,
    /// Side length of generated placeholders, in pixels.
    pub placeholder_size: u32,
    pub generator_version: u32,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            site_dir: PathBuf::from("site"),
            base_url: DEFAULT_BASE_URL.to_owned(),
            gravatar_enabled: false,
            gravatar_size: GRAVATAR_SIZE,
            placeholder_size: PLACEHOLDER_SIZE,
            generator_version: GENERATOR_VERSION,
        }
    }
}

impl AvatarConfig {
    pub fn new(site_dir: impl Into<PathBuf>) -> Self {
        Self {
            site_dir: site_dir.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a JSON file. Missing fields keep their
    /// default values.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path.as_ref())?;
        let config: Self = serde_json::from_slice(&bytes)?;
        config.validate()?;
        log::info!(
            "avatars: configuration loaded from {}",
            path.as_ref().display()
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_PLACEHOLDER_SIZE..=MAX_PLACEHOLDER_SIZE)
            .contains(&self.placeholder_size)
        {
            return Err(AvatarError::Config(format!(
                "placeholder size {} is outside {}..={}",
                self.placeholder_size,
                MIN_PLACEHOLDER_SIZE,
                MAX_PLACEHOLDER_SIZE
            )));
        }
        if self.gravatar_size == 0 || self.gravatar_size > 2048 {
            return Err(AvatarError::Config(format!(
                "gravatar size {} is outside 1..=2048",
                self.gravatar_size
            )));
        }
        Ok(())
    }

    pub fn avatars_dir(&self) -> PathBuf {
        self.site_dir.join(AVATARS_FOLDER)
    }

    /// `base_url` with exactly one trailing slash.
    pub fn base_url(&self) -> String {
        format!("{}/", self.base_url.trim_end_matches('/'))
    }
}

impl SystemSettings for AvatarConfig {
    fn gravatar_enabled(&self) -> bool {
        self.gravatar_enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempdir::TempDir;

    #[test]
    fn load_fills_missing_fields_with_defaults() {
        let dir = TempDir::new("config_load").unwrap();
        let path = dir.path().join("avatars.json");
        fs::write(&path, r#"{ "site_dir": "/srv/site", "gravatar_enabled": true }"#)
            .unwrap();

        let config = AvatarConfig::load(&path).unwrap();
        assert_eq!(config.site_dir, PathBuf::from("/srv/site"));
        assert!(config.gravatar_enabled());
        assert_eq!(config.gravatar_size, GRAVATAR_SIZE);
        assert_eq!(config.placeholder_size, PLACEHOLDER_SIZE);
        assert_eq!(config.avatars_dir(), PathBuf::from("/srv/site/avatars"));
    }

    #[test]
    fn load_rejects_bad_sizes() {
        let dir = TempDir::new("config_invalid").unwrap();
        let path = dir.path().join("avatars.json");
        fs::write(&path, r#"{ "placeholder_size": 4 }"#).unwrap();

        assert!(matches!(
            AvatarConfig::load(&path),
            Err(AvatarError::Config(_))
        ));
    }

    #[rstest]
    #[case(15)]
    #[case(1025)]
    #[case(100_000)]
    fn placeholder_size_out_of_range(#[case] size: u32) {
        let config = AvatarConfig {
            placeholder_size: size,
            ..AvatarConfig::default()
        };
        assert!(matches!(config.validate(), Err(AvatarError::Config(_))));
    }

    #[rstest]
    #[case(16)]
    #[case(1024)]
    fn placeholder_size_bounds_are_inclusive(#[case] size: u32) {
        let config = AvatarConfig {
            placeholder_size: size,
            ..AvatarConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_rejects_malformed_json() {
        let dir = TempDir::new("config_malformed").unwrap();
        let path = dir.path().join("avatars.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(AvatarConfig::load(&path).is_err());
    }

    #[rstest]
    #[case("site/avatars", "site/avatars/")]
    #[case("site/avatars/", "site/avatars/")]
    #[case("/static//", "/static/")]
    fn base_url_has_single_trailing_slash(
        #[case] configured: &str,
        #[case] expected: &str,
    ) {
        let config = AvatarConfig {
            base_url: configured.to_owned(),
            ..AvatarConfig::default()
        };
        assert_eq!(config.base_url(), expected);
    }
}
