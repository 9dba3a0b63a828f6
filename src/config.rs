use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub webhook_secret: Option<String>,
    pub data_file: PathBuf,
    /// Number of newest leads included in `recentLeads` of the stats payload.
    pub recent_leads_limit: usize,
    /// Default page size for `GET /api/leads`.
    pub leads_page_size: usize,
    pub body_limit_bytes: usize,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            webhook_secret: None,
            data_file: PathBuf::from("data.json"),
            recent_leads_limit: 50,
            leads_page_size: 50,
            body_limit_bytes: 1024 * 1024,
            rate_limit_per_second: 10,
            rate_limit_burst: 20,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| defaults.port.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            webhook_secret: std::env::var("WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            data_file: std::env::var("DATA_FILE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.data_file),
            recent_leads_limit: parse_positive("RECENT_LEADS_LIMIT", defaults.recent_leads_limit)?,
            leads_page_size: parse_positive("LEADS_PAGE_SIZE", defaults.leads_page_size)?,
            body_limit_bytes: parse_positive("BODY_LIMIT_BYTES", defaults.body_limit_bytes)?,
            rate_limit_per_second: parse_positive(
                "RATE_LIMIT_PER_SECOND",
                defaults.rate_limit_per_second,
            )?,
            rate_limit_burst: parse_positive("RATE_LIMIT_BURST", defaults.rate_limit_burst)?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Data file: {}", config.data_file.display());
        tracing::debug!("Server Port: {}", config.port);
        if config.webhook_secret.is_none() {
            tracing::warn!("WEBHOOK_SECRET not set; write endpoints accept unauthenticated requests");
        }

        Ok(config)
    }
}

/// Reads a numeric variable that must be greater than zero, falling back to `default` when unset.
fn parse_positive<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr + PartialOrd + Default + Copy,
{
    let Ok(raw) = std::env::var(name) else {
        return Ok(default);
    };
    if raw.trim().is_empty() {
        return Ok(default);
    }
    parse_positive_value(name, &raw)
}

fn parse_positive_value<T>(name: &str, raw: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr + PartialOrd + Default + Copy,
{
    let value: T = raw
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("{} must be a positive number, got '{}'", name, raw))?;
    if value <= T::default() {
        anyhow::bail!("{} must be greater than zero", name);
    }
    Ok(value)
}
