use std::path::PathBuf;
use std::time::Duration;

use color_eyre::Result;
use color_eyre::eyre::{WrapErr, eyre};
use reqwest::Url;

use crate::query::QueryConfig;

const DEFAULT_PAGE_SIZE: u32 = 10;
const DEFAULT_CACHE_SECS: u64 = 60;
const DEFAULT_PROBE_SECS: u64 = 5;

/// Console configuration sourced from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub base_url: Url,
    pub page_size: u32,
    pub stale_time: Option<Duration>,
    pub cache_time: Duration,
    pub probe_interval: Duration,
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// # Errors
    ///
    /// Fails when `API_BASE_URL` is missing or any value does not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup` instead of the process environment.
    ///
    /// # Errors
    ///
    /// See [`Config::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base_url = lookup("API_BASE_URL").ok_or_else(|| eyre!("API_BASE_URL is not set"))?;
        let base_url = Url::parse(&base_url).wrap_err_with(|| format!("parse API_BASE_URL: {base_url}"))?;

        let page_size = lookup("ROSTER_PAGE_SIZE")
            .map(|value| value.parse::<u32>())
            .transpose()
            .wrap_err("parse ROSTER_PAGE_SIZE")?
            .unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            return Err(eyre!("ROSTER_PAGE_SIZE must be at least 1"));
        }

        let stale_time = lookup("ROSTER_STALE_SECS")
            .map(|value| value.parse::<u64>())
            .transpose()
            .wrap_err("parse ROSTER_STALE_SECS")?
            .map(Duration::from_secs);
        let cache_time = lookup("ROSTER_CACHE_SECS")
            .map(|value| value.parse::<u64>())
            .transpose()
            .wrap_err("parse ROSTER_CACHE_SECS")?
            .map_or(Duration::from_secs(DEFAULT_CACHE_SECS), Duration::from_secs);
        let probe_interval = lookup("ROSTER_PROBE_SECS")
            .map(|value| value.parse::<u64>())
            .transpose()
            .wrap_err("parse ROSTER_PROBE_SECS")?
            .map_or(Duration::from_secs(DEFAULT_PROBE_SECS), Duration::from_secs)
            .max(Duration::from_secs(1));
        let log_file = lookup("ROSTER_LOG_FILE").map(PathBuf::from);

        Ok(Self {
            base_url,
            page_size,
            stale_time,
            cache_time,
            probe_interval,
            log_file,
        })
    }

    #[must_use]
    pub const fn query_config(&self) -> QueryConfig {
        QueryConfig::new(self.stale_time, self.cache_time)
    }
}
