//! Configuration loading for the self-citation cache.
//!
//! Configuration is layered with [`figment`]: a TOML file first, then
//! environment variables prefixed with `SELFCITES_` (nested keys separated by
//! `__`, e.g. `SELFCITES_METHOD__ALGORITHM=friends`).
//!
//! ```toml
//! [method]
//! algorithm = "friends"
//! friends_threshold = 3
//!
//! [database]
//! path = "/var/lib/selfcites/cache.sqlite"
//! ```
//!
//! `method.algorithm` and `method.friends_threshold` are required; every
//! other key has a default.

pub mod error;

use crate::error::{ErrorKind, Result};
use derive_more::Display;
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "SELFCITES_";
pub const DEFAULT_METHOD_NAME: &str = "selfcites";
pub const DEFAULT_BATCH_SIZE: NonZeroUsize = NonZeroUsize::new(1000).unwrap();

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub method: MethodConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl Config {
    /// Load the configuration file at `path`, overlaid with environment
    /// variables.
    ///
    /// A missing file is an error rather than an empty configuration.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        tracing::debug!(path = %path.display(), "Loading configuration");
        Self::from_figment(Figment::new().merge(Toml::file(path)).merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Extract and validate a configuration from an already-assembled
    /// [`Figment`].
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Invalid)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.method.name.trim().is_empty() {
            exn::bail!(ErrorKind::InvalidValue("method.name"));
        }
        Ok(())
    }
}

/// Settings of the self-citation ranking method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodConfig {
    /// Method name; keys the stored watermark and method data.
    #[serde(default = "default_method_name")]
    pub name: String,
    pub algorithm: Algorithm,
    /// Passed through to the `friends` detector.
    pub friends_threshold: u32,
    /// Records processed between two pacing checkpoints. Zero is rejected
    /// when deserializing.
    #[serde(default = "default_batch_size")]
    pub batch_size: NonZeroUsize,
    /// Whether the author-identity log bounds the incremental window.
    #[serde(default = "default_use_author_identity")]
    pub use_author_identity: bool,
    #[serde(default)]
    pub author_tags: AuthorTags,
}

fn default_method_name() -> String {
    DEFAULT_METHOD_NAME.to_string()
}
fn default_batch_size() -> NonZeroUsize {
    DEFAULT_BATCH_SIZE
}
fn default_use_author_identity() -> bool {
    true
}

/// Self-citation detection strategy.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Raw author-name matching.
    #[display("simple")]
    Simple,
    /// Matching on resolved author identities.
    #[display("friends")]
    Friends,
}

/// MARC fields that detectors read author names from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorTags {
    pub first_author: String,
    pub additional_author: String,
    pub alternative_author_name: String,
    pub collaboration_name: String,
}
impl Default for AuthorTags {
    fn default() -> Self {
        Self {
            first_author: "100__a".to_string(),
            additional_author: "700__a".to_string(),
            alternative_author_name: "100__q".to_string(),
            collaboration_name: "710__g".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}
impl Default for DatabaseConfig {
    fn default() -> Self {
        let path = ProjectDirs::from("", "", "selfcites")
            .map(|dirs| dirs.data_dir().join("cache.sqlite"))
            .unwrap_or_else(|| PathBuf::from("selfcites.sqlite"));
        Self { path }
    }
}
