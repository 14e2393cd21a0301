use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Which skeleton release gets downloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReleaseChannel {
    #[default]
    Stable,
    Dev,
}

impl ReleaseChannel {
    pub fn from_dev_flag(dev: bool) -> Self {
        if dev {
            ReleaseChannel::Dev
        } else {
            ReleaseChannel::Stable
        }
    }
}

impl fmt::Display for ReleaseChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseChannel::Stable => write!(f, "stable"),
            ReleaseChannel::Dev => write!(f, "dev"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OctoSettings {
    #[serde(default = "default_stable_url")]
    pub stable_url: String,
    #[serde(default = "default_dev_pointer_url")]
    pub dev_pointer_url: String,
    #[serde(default = "default_wrapper_dir")]
    pub wrapper_dir: String,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_php_binary")]
    pub php_binary: String,
}

fn default_stable_url() -> String {
    "https://github.com/rueduphp/skeleton/archive/master.zip".to_string()
}
fn default_dev_pointer_url() -> String {
    "http://www.rueduphp.com/dev.txt".to_string()
}
fn default_wrapper_dir() -> String {
    "skeleton-master".to_string()
}
fn default_http_timeout_secs() -> u64 {
    300
}
fn default_php_binary() -> String {
    "php".to_string()
}

impl Default for OctoSettings {
    fn default() -> Self {
        Self {
            stable_url: default_stable_url(),
            dev_pointer_url: default_dev_pointer_url(),
            wrapper_dir: default_wrapper_dir(),
            http_timeout_secs: default_http_timeout_secs(),
            php_binary: default_php_binary(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct OctoConfig {
    #[serde(default)]
    pub settings: OctoSettings,
}

/// Everything the pipeline needs, fixed before the first stage runs.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Directory the command was started from. The temporary archive and
    /// `composer.phar` are looked up here.
    pub working_dir: PathBuf,
    pub target_dir: PathBuf,
    pub channel: ReleaseChannel,
    pub settings: OctoSettings,
    pub allow_tty: bool,
}

impl InstallOptions {
    /// `name` is joined onto the working directory; no name means the
    /// working directory itself.
    pub fn new(
        working_dir: PathBuf,
        name: Option<&str>,
        channel: ReleaseChannel,
        settings: OctoSettings,
    ) -> Self {
        let target_dir = match name {
            Some(name) if !name.is_empty() => working_dir.join(name),
            _ => working_dir.clone(),
        };

        Self {
            working_dir,
            target_dir,
            channel,
            settings,
            allow_tty: true,
        }
    }

    pub fn with_tty(mut self, allow_tty: bool) -> Self {
        self.allow_tty = allow_tty;
        self
    }
}
