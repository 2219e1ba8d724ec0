use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::{BillingError, Result};
use crate::registry::AccountRegistry;

/// Environment variable pointing at a directory holding `accounts.json` and
/// `style.json`. When unset the embedded defaults are used.
pub const CONFIG_DIR_ENV: &str = "FREIGHT_BILLING_CONFIG_DIR";

const ACCOUNTS_FILE: &str = "accounts.json";
const STYLE_FILE: &str = "style.json";
const DEFAULT_ACCOUNTS: &str = include_str!("../config/accounts.json");
const DEFAULT_STYLE: &str = include_str!("../config/style.json");

/// How the values of a column are rendered in output workbooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Number,
    Currency,
    Date,
}

/// Cosmetic settings for output workbooks.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleConfig {
    pub min_column_width: usize,
    pub column_padding: usize,
    pub currency_format: String,
    pub date_format: String,
    columns: BTreeMap<String, ColumnType>,
}

#[derive(Debug, Deserialize)]
struct StyleFile {
    #[serde(default = "default_min_column_width")]
    min_column_width: usize,
    #[serde(default = "default_column_padding")]
    column_padding: usize,
    #[serde(default = "default_currency_format")]
    currency_format: String,
    #[serde(default = "default_date_format")]
    date_format: String,
    #[serde(default)]
    columns: BTreeMap<String, Option<ColumnType>>,
}

fn default_min_column_width() -> usize {
    10
}

fn default_column_padding() -> usize {
    4
}

fn default_currency_format() -> String {
    "$#,##0.00".to_string()
}

fn default_date_format() -> String {
    "yyyy-mm-dd".to_string()
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            min_column_width: default_min_column_width(),
            column_padding: default_column_padding(),
            currency_format: default_currency_format(),
            date_format: default_date_format(),
            columns: BTreeMap::new(),
        }
    }
}

impl StyleConfig {
    /// Decodes the style document. A column listed without a type is a
    /// configuration error.
    pub fn from_json(source: &str, path: &Path) -> Result<Self> {
        let file: StyleFile = serde_json::from_str(source).map_err(|source| BillingError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        let mut columns = BTreeMap::new();
        for (name, column_type) in file.columns {
            let column_type = column_type.ok_or_else(|| {
                BillingError::Configuration(format!("column '{name}' has no declared type"))
            })?;
            columns.insert(name, column_type);
        }

        Ok(Self {
            min_column_width: file.min_column_width,
            column_padding: file.column_padding,
            currency_format: file.currency_format,
            date_format: file.date_format,
            columns,
        })
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns.get(name).copied()
    }
}

/// Static configuration of a run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub registry: AccountRegistry,
    pub style: StyleConfig,
}

impl Settings {
    /// Loads from [`CONFIG_DIR_ENV`] when set, otherwise the embedded defaults.
    pub fn load() -> Result<Self> {
        match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => Self::from_dir(Path::new(&dir)),
            None => Self::embedded(),
        }
    }

    pub fn embedded() -> Result<Self> {
        Ok(Self {
            registry: AccountRegistry::from_json(DEFAULT_ACCOUNTS, Path::new(ACCOUNTS_FILE))?,
            style: StyleConfig::from_json(DEFAULT_STYLE, Path::new(STYLE_FILE))?,
        })
    }

    pub fn from_dir(dir: &Path) -> Result<Self> {
        let accounts_path = dir.join(ACCOUNTS_FILE);
        let style_path = dir.join(STYLE_FILE);
        info!(config_dir = %dir.display(), "loading configuration");

        let accounts = read_config(&accounts_path)?;
        let style = read_config(&style_path)?;
        Ok(Self {
            registry: AccountRegistry::from_json(&accounts, &accounts_path)?,
            style: StyleConfig::from_json(&style, &style_path)?,
        })
    }
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| BillingError::io(path, source))
}
