use std::env;
use std::path::{Path, PathBuf};

use confik::{Configuration, EnvSource};
use serde::{Deserialize, Serialize};

use self::file::BanzaiFileSource;

pub const CONFIG_FILE: &str = "banzai.yml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Configuration)]
#[serde(rename_all = "lowercase")]
#[confik(forward(serde(rename_all = "lowercase")))]
pub enum CacheBackend {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Configuration)]
pub struct CacheConfig {
    #[confik(default)]
    pub backend: CacheBackend,
    #[confik(default = default_cache_directory())]
    pub directory: String,
    /// Zero keeps entries forever.
    #[confik(default)]
    pub ttl_seconds: u64,
}

fn default_cache_directory() -> String {
    ".banzai-cache".into()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            directory: default_cache_directory(),
            ttl_seconds: 0,
        }
    }
}

/// Inputs for a render from the command line.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Configuration)]
pub struct RenderConfig {
    #[confik(default)]
    pub pipeline: Option<String>,
    /// YAML fixture file backing the in-memory store.
    #[confik(default)]
    pub fixtures: Option<String>,
    /// Full path of the project references resolve against.
    #[confik(default)]
    pub project: Option<String>,
    /// Username of the viewer redaction runs for. Anonymous when unset.
    #[confik(default)]
    pub viewer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Configuration)]
pub struct BanzaiConfig {
    #[confik(default = default_base_url())]
    pub base_url: String,
    /// Emit path-only links instead of absolute URLs.
    #[confik(default = true)]
    pub only_path: bool,
    #[confik(default)]
    pub cache: CacheConfig,
    /// Log per-filter timings at debug level.
    #[confik(default = true)]
    pub instrumentation: bool,
    #[confik(default)]
    pub render: RenderConfig,
}

fn default_base_url() -> String {
    "http://localhost".into()
}

impl Default for BanzaiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            only_path: true,
            cache: CacheConfig::default(),
            instrumentation: true,
            render: RenderConfig::default(),
        }
    }
}

impl BanzaiConfig {
    /// Load `banzai.yml` from the working directory (or `BANZAI_CONFIG`) and
    /// environment overrides. Falls back to the compiled-in defaults when
    /// parsing fails.
    pub fn load() -> Self {
        let path = env::var_os("BANZAI_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
        Self::load_from(&path)
    }

    pub fn load_from(config_path: &Path) -> Self {
        let mut builder = BanzaiConfig::builder();

        if config_path.exists() {
            builder.override_with(BanzaiFileSource::new(config_path));
        }

        builder.override_with(EnvSource::new());

        match builder.try_build() {
            Ok(cfg) => cfg,
            Err(err) => {
                log::warn!(
                    "Failed to load {} or env overrides: {err}. Using defaults.",
                    config_path.display()
                );
                BanzaiConfig::default()
            }
        }
    }
}

mod file {
    use std::error::Error;
    use std::fs;
    use std::path::PathBuf;

    use anyhow::Context;
    use confik::{ConfigurationBuilder, Source};
    use serde::de::DeserializeOwned;

    /// `banzai.yml` as a confik source. A blank file sets nothing, so env
    /// overrides still apply on top of the defaults.
    #[derive(Debug)]
    pub struct BanzaiFileSource {
        path: PathBuf,
    }

    impl BanzaiFileSource {
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self { path: path.into() }
        }

        fn contents(&self) -> anyhow::Result<String> {
            let contents = fs::read_to_string(&self.path)
                .with_context(|| format!("reading banzai config {}", self.path.display()))?;
            if contents.trim().is_empty() {
                return Ok("{}".into());
            }
            Ok(contents)
        }
    }

    impl<T> Source<T> for BanzaiFileSource
    where
        T: DeserializeOwned + ConfigurationBuilder,
    {
        // Cache paths, pipeline names and fixture paths only.
        fn allows_secrets(&self) -> bool {
            false
        }

        fn provide(&self) -> Result<T, Box<dyn Error + Sync + Send>> {
            let contents = self.contents()?;
            serde_yaml::from_str(&contents).map_err(|err| {
                format!(
                    "{}: bad base_url, cache or render settings: {err}",
                    self.path.display()
                )
                .into()
            })
        }
    }
}
