//! Persistent settings: where data lives, file names, and logging defaults.

use serde::{Deserialize, Serialize};
use std::{
    env,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use crate::{
    core::errors::{FinanceError, Result},
    storage::json_backend::{DEFAULT_RULES_FILE, DEFAULT_TRANSACTIONS_FILE},
};

pub const HOME_ENV: &str = "FINANCE_CORE_HOME";
const DEFAULT_DIR_NAME: &str = ".finance_core";
const CONFIG_FILE: &str = "config.json";
const TMP_SUFFIX: &str = "tmp";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Directory holding the data files. Defaults to [`app_data_dir`].
    pub data_dir: Option<PathBuf>,
    #[serde(default = "Config::default_transactions_file")]
    pub transactions_file: String,
    #[serde(default = "Config::default_recurring_file")]
    pub recurring_file: String,
    /// How many per-row import errors a summary lists before eliding the rest.
    #[serde(default = "Config::default_import_error_preview")]
    pub import_error_preview: usize,
    #[serde(default = "Config::default_log_filter")]
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            transactions_file: Self::default_transactions_file(),
            recurring_file: Self::default_recurring_file(),
            import_error_preview: Self::default_import_error_preview(),
            log_filter: Self::default_log_filter(),
        }
    }
}

impl Config {
    pub fn default_transactions_file() -> String {
        DEFAULT_TRANSACTIONS_FILE.into()
    }

    pub fn default_recurring_file() -> String {
        DEFAULT_RULES_FILE.into()
    }

    pub fn default_import_error_preview() -> usize {
        5
    }

    pub fn default_log_filter() -> String {
        "finance_core=info".into()
    }

    pub fn resolve_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(app_data_dir)
    }
}

/// Returns the application data directory: `$FINANCE_CORE_HOME` or `~/.finance_core`.
pub fn app_data_dir() -> PathBuf {
    if let Some(custom) = env::var_os(HOME_ENV) {
        return PathBuf::from(custom);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

/// Loads and saves [`Config`] as JSON.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Manager for `config.json` inside `base`.
    pub fn with_base_dir(base: &Path) -> Self {
        Self::new(base.join(CONFIG_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the config file, falling back to defaults when it does not exist.
    pub fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            return Ok(Config::default());
        }
        let data = fs::read_to_string(&self.path).map_err(|err| self.config_error(err))?;
        serde_json::from_str(&data).map_err(|err| self.config_error(err))
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(config)?;
        let tmp = self.path.with_extension(format!("json.{}", TMP_SUFFIX));
        let mut file = File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.flush()?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn config_error(&self, err: impl std::fmt::Display) -> FinanceError {
        FinanceError::Config(format!("{}: {}", self.path.display(), err))
    }
}
