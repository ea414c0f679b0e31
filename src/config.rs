use anyhow::{Context, Result, bail};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub api_key: String,
    pub tenant_id: String,
    pub http_timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub draft_store_path: PathBuf,
    pub theme_cache_ttl: Duration,
    pub autosave_debounce: Duration,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// # Environment Variables
    /// - `API_BASE_URL`: Required - Base URL of the shipping API
    /// - `API_KEY`: Required - Sent as `X-API-KEY`
    /// - `TENANT_ID`: Required - Sent as `X-TENANT-ID`
    /// - `HTTP_TIMEOUT_SECS`: Optional - Request timeout (default: 30)
    /// - `MAX_RETRIES`: Optional - Retries for network and 5xx failures (default: 3)
    /// - `RETRY_DELAY_MS`: Optional - Linear backoff unit (default: 1000, waits capped at 60s)
    /// - `DRAFT_STORE_PATH`: Optional - Draft file (default: ".shipping-portal/drafts.json")
    /// - `THEME_CACHE_TTL_MINUTES`: Optional - Theme cache freshness (default: 30)
    /// - `AUTOSAVE_DEBOUNCE_MS`: Optional - Draft auto-save quiet period (default: 1000)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`Config::from_env`] but reads values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = required(&lookup, "API_BASE_URL")?
            .trim_end_matches('/')
            .to_string();
        let api_key = required(&lookup, "API_KEY")?;
        let tenant_id = required(&lookup, "TENANT_ID")?;

        let http_timeout = Duration::from_secs(optional_number(&lookup, "HTTP_TIMEOUT_SECS", 30)?);
        let max_retries = u32::try_from(optional_number(&lookup, "MAX_RETRIES", 3)?)
            .context("MAX_RETRIES is too large")?;
        let retry_delay = Duration::from_millis(optional_number(&lookup, "RETRY_DELAY_MS", 1000)?);

        let draft_store_path = lookup("DRAFT_STORE_PATH")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".shipping-portal/drafts.json"));

        let theme_cache_ttl = optional_number(&lookup, "THEME_CACHE_TTL_MINUTES", 30)?
            .checked_mul(60)
            .map(Duration::from_secs)
            .context("THEME_CACHE_TTL_MINUTES is too large")?;
        let autosave_debounce =
            Duration::from_millis(optional_number(&lookup, "AUTOSAVE_DEBOUNCE_MS", 1000)?);

        Ok(Config {
            api_base_url,
            api_key,
            tenant_id,
            http_timeout,
            max_retries,
            retry_delay,
            draft_store_path,
            theme_cache_ttl,
            autosave_debounce,
        })
    }
}

fn required<F>(lookup: &F, name: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(name).with_context(|| format!("{} not set", name))?;

    if value.trim().is_empty() {
        bail!("{} cannot be empty", name);
    }

    Ok(value)
}

fn optional_number<F>(lookup: &F, name: &str, default: u64) -> Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{} must be a non-negative integer, got {:?}", name, raw)),
        _ => Ok(default),
    }
}
