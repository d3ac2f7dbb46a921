use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::budget::{
    BudgetCalculator, ProfitAllocator, SupervisionRates, DEFAULT_GENERAL_CONDITIONS_PERCENTAGE,
    DEFAULT_GROSS_PROFIT_RATE,
};
use crate::core::retry::RetryPolicy;
use crate::currency::{CurrencyCode, Percent};
use crate::errors::{LedgerError, Result};
use crate::utils::{ensure_dir, resolve_base};

const CONFIG_DIR: &str = "config";
const CONFIG_FILE: &str = "config.json";
const TMP_SUFFIX: &str = "tmp";

/// Tunables for budget derivation, ledger policy and persistence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub currency: CurrencyCode,
    pub default_general_conditions_percentage: Percent,
    pub default_gross_profit_rate: Percent,
    pub supervision: SupervisionRates,
    /// Whether an expense that already has payments may be deleted.
    pub allow_delete_with_payments: bool,
    pub retry: RetryPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            currency: CurrencyCode::default(),
            default_general_conditions_percentage: DEFAULT_GENERAL_CONDITIONS_PERCENTAGE,
            default_gross_profit_rate: DEFAULT_GROSS_PROFIT_RATE,
            supervision: SupervisionRates::default(),
            allow_delete_with_payments: false,
            retry: RetryPolicy::default(),
            data_dir: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        for (label, rate) in [
            (
                "default_general_conditions_percentage",
                self.default_general_conditions_percentage,
            ),
            ("default_gross_profit_rate", self.default_gross_profit_rate),
        ] {
            if rate != rate.clamp_0_100() {
                return Err(LedgerError::Config(format!(
                    "{label} must be between 0 and 100, got {rate}"
                )));
            }
        }
        if self.supervision.full_time_weekly.is_negative()
            || self.supervision.part_time_weekly.is_negative()
        {
            return Err(LedgerError::Config(
                "supervision rates cannot be negative".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(LedgerError::Config(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.currency.as_str().len() != 3 {
            return Err(LedgerError::Config(format!(
                "currency `{}` is not an ISO 4217 code",
                self.currency.as_str()
            )));
        }
        Ok(())
    }

    pub fn calculator(&self) -> BudgetCalculator {
        BudgetCalculator::new(self.supervision, self.default_general_conditions_percentage)
    }

    pub fn allocator(&self) -> ProfitAllocator {
        ProfitAllocator::new(self.default_gross_profit_rate)
    }

    pub fn data_dir(&self) -> PathBuf {
        resolve_base(self.data_dir.clone())
    }
}

/// Handles persistence for [`Config`].
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `<base>/config/config.json`, with `base` defaulting to the app data dir.
    pub fn with_base_dir(base: Option<PathBuf>) -> Result<Self> {
        let config_dir = resolve_base(base).join(CONFIG_DIR);
        ensure_dir(&config_dir)?;
        Ok(Self::new(config_dir.join(CONFIG_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file means defaults; a present file must parse and validate.
    pub fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            return Ok(Config::default());
        }
        let data = fs::read_to_string(&self.path)?;
        let config: Config = serde_json::from_str(&data).map_err(|err| {
            LedgerError::Config(format!("{}: {}", self.path.display(), err))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        config.validate()?;
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        let json = serde_json::to_string_pretty(config)?;
        let tmp = tmp_path(&self.path);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        info!(path = %self.path.display(), "configuration saved");
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}
