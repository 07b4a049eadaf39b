use std::{path::Path, sync::LazyLock, time::Duration};

use regex::{Captures, Regex};
use tracing::debug;

use crate::{error::HydraError, jobset::DEFAULT_HOST_URL};

pub static CONFIG_FILE: &str = ".hydra-status.json";

static ENV_VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{env\.([a-zA-Z_][a-zA-Z0-9_]*)\}").unwrap());

#[derive(Debug, serde::Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Config {
    pub host_url: String,
    pub arch: String,
    pub channel: String,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host_url: String::from(DEFAULT_HOST_URL),
            arch: String::from("x86_64-linux"),
            channel: String::from("unstable"),
            timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn substitute_variables(s: &str, replacer: fn(&str) -> Option<String>) -> String {
    ENV_VARIABLE
        .replace_all(s, |caps: &Captures| replacer(&caps[1]).unwrap_or_default())
        .into_owned()
}

pub fn env_replacer(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

pub fn load_config(s: &str, replacer: fn(&str) -> Option<String>) -> Result<Config, HydraError> {
    let sub = substitute_variables(s, replacer);
    serde_json::from_str::<Config>(&sub).map_err(|e| HydraError::Config(format!("JSON Error {e}")))
}

/// Reads an explicit config file, or the one in the home directory if present.
pub fn read_config(explicit: Option<&Path>) -> Result<Config, HydraError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match dirs::home_dir() {
            Some(home) => home.join(CONFIG_FILE),
            None => return Ok(Config::default()),
        },
    };
    match std::fs::read_to_string(&path) {
        Ok(content) => {
            debug!("loading config from {}", path.display());
            load_config(&content, env_replacer)
        }
        Err(e) if explicit.is_none() && e.kind() == std::io::ErrorKind::NotFound => {
            debug!("no config at {}, using defaults", path.display());
            Ok(Config::default())
        }
        Err(e) => Err(HydraError::Config(format!("{}: {e}", path.display()))),
    }
}
