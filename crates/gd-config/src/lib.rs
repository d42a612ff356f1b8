//! Plugin configuration: defaults, optional TOML file, validation.
//!
//! A [`PluginConfig`] is built once at startup and handed by reference to
//! every component that needs it. Nothing in the workspace keeps a global
//! copy.

use directories_next::BaseDirs;
use gd_core::DpiError;
use gd_core::DpiResult;
use gd_core::ErrorKind;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SCHEME: &str = "gemini";
pub const DEFAULT_PORT: u16 = 1965;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_META_BYTES: usize = 1024;

const PLUGIN_DIR: [&str; 2] = [".dillo", "gemini"];
const TRUST_STORE_FILE: &str = "pinned";
const CONFIG_FILE: &str = "config.toml";

/// Runtime configuration shared by the client and the navigator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginConfig {
    /// Scheme handled by the plugin; also prefixes the special pin/input URIs.
    pub scheme: String,
    pub default_port: u16,
    /// Bound on connect, read and write for a single request.
    pub request_timeout: Duration,
    pub trust_store_path: PathBuf,
    pub max_meta_bytes: usize,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_owned(),
            default_port: DEFAULT_PORT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            trust_store_path: plugin_dir_in(&fallback_home()).join(TRUST_STORE_FILE),
            max_meta_bytes: DEFAULT_MAX_META_BYTES,
        }
    }
}

/// On-disk shape of the configuration file. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub scheme: Option<String>,
    pub default_port: Option<u16>,
    pub request_timeout_secs: Option<u64>,
    pub trust_store_path: Option<PathBuf>,
    pub max_meta_bytes: Option<usize>,
}

impl PluginConfig {
    /// Defaults rooted in the user's home directory.
    pub fn for_home(home: &Path) -> Self {
        Self {
            trust_store_path: plugin_dir_in(home).join(TRUST_STORE_FILE),
            ..Self::default()
        }
    }

    /// Loads configuration from `explicit` or the default file location.
    ///
    /// A missing default file yields the defaults; a missing explicit file is
    /// an error.
    pub fn load(explicit: Option<&Path>) -> DpiResult<Self> {
        let home = home_dir()?;
        let base = Self::for_home(&home);

        let (path, required) = match explicit {
            Some(path) => (path.to_path_buf(), true),
            None => (plugin_dir_in(&home).join(CONFIG_FILE), false),
        };

        if !required && !path.exists() {
            tracing::debug!(path = %path.display(), "no configuration file, using defaults");
            base.validate()?;
            return Ok(base);
        }

        let file = read_config_file(&path)?;
        let config = base.merged_with(file);
        config.validate()?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Applies the fields present in `file` over `self`.
    pub fn merged_with(mut self, file: ConfigFile) -> Self {
        if let Some(scheme) = file.scheme {
            self.scheme = scheme.to_ascii_lowercase();
        }
        if let Some(port) = file.default_port {
            self.default_port = port;
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(path) = file.trust_store_path {
            self.trust_store_path = path;
        }
        if let Some(limit) = file.max_meta_bytes {
            self.max_meta_bytes = limit;
        }
        self
    }

    pub fn with_trust_store_path(mut self, path: PathBuf) -> Self {
        self.trust_store_path = path;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn validate(&self) -> DpiResult<()> {
        if self.scheme.is_empty() || !self.scheme.chars().all(|ch| ch.is_ascii_alphabetic()) {
            return Err(DpiError::new(
                ErrorKind::Config,
                format!("scheme `{}` must be non-empty ASCII letters", self.scheme),
            ));
        }

        if self.default_port == 0 {
            return Err(DpiError::new(
                ErrorKind::Config,
                "default_port must be greater than zero",
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(DpiError::new(
                ErrorKind::Config,
                "request timeout must be greater than zero",
            ));
        }

        if self.max_meta_bytes == 0 {
            return Err(DpiError::new(
                ErrorKind::Config,
                "max_meta_bytes must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Prefix of the pin-commit URI, e.g. `gemini:pin:`.
    pub fn pin_prefix(&self) -> String {
        format!("{}:pin:", self.scheme)
    }

    /// Prefix of the deferred-input URI, e.g. `gemini:input:`.
    pub fn input_prefix(&self) -> String {
        format!("{}:input:", self.scheme)
    }
}

fn read_config_file(path: &Path) -> DpiResult<ConfigFile> {
    let content = fs::read_to_string(path).map_err(|error| {
        DpiError::new(
            ErrorKind::Config,
            format!("failed to read config file `{}`: {error}", path.display()),
        )
    })?;

    toml::from_str(&content).map_err(|error| {
        DpiError::new(
            ErrorKind::Config,
            format!("failed to parse config file `{}`: {error}", path.display()),
        )
    })
}

fn home_dir() -> DpiResult<PathBuf> {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .ok_or_else(|| DpiError::new(ErrorKind::Config, "unable to determine home directory"))
}

fn fallback_home() -> PathBuf {
    home_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn plugin_dir_in(home: &Path) -> PathBuf {
    PLUGIN_DIR
        .iter()
        .fold(home.to_path_buf(), |path, part| path.join(part))
}
