// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const PROVIDER_URL_ENV: &str = "DASHBOARD_PROVIDER_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub catalog_path: PathBuf,
    /// Appended to catalog symbols when talking to the provider, e.g. ".SA"
    pub market_suffix: String,
    pub benchmark_symbol: String,
    pub benchmark_label: String,
    pub default_start: NaiveDate,
    pub output_dir: PathBuf,
    pub provider_base_url: String,
    /// Visited once per client to obtain the session cookie for fundamentals
    pub session_url: String,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("tickers_ibra.csv"),
            market_suffix: ".SA".to_string(),
            benchmark_symbol: "^BVSP".to_string(),
            benchmark_label: "IBOV".to_string(),
            default_start: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap_or_default(),
            output_dir: PathBuf::from("output"),
            provider_base_url: "https://query2.finance.yahoo.com".to_string(),
            session_url: "https://fc.yahoo.com".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Reads `path`, falling back to defaults when the file is missing or invalid.
    /// The provider URL can be overridden through the environment.
    pub fn load_or_default(path: &Path) -> Self {
        let mut config = match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::info!(path = %path.display(), error = %e, "using default configuration");
                Self::default()
            }
        };

        if let Ok(url) = std::env::var(PROVIDER_URL_ENV) {
            if !url.trim().is_empty() {
                config.provider_base_url = url.trim().to_string();
            }
        }

        config
    }
}

pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config_str = fs::read_to_string(path).map_err(|e| {
        tracing::debug!(path = %path.display(), error = %e, "failed to read config");
        e
    })?;

    match toml::from_str(&config_str) {
        Ok(config) => Ok(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to parse config");
            Err(e.into())
        }
    }
}

pub fn save_config(config: &Config, path: &Path) -> anyhow::Result<()> {
    let config_str = toml::to_string_pretty(config)?;
    fs::write(path, config_str)?;
    Ok(())
}
