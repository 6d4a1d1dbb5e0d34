use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration, assembled from environment variables. Every knob
/// has a default so startup never fails on configuration alone; optional
/// integrations (Telegram, remote store, word table source) simply stay
/// disabled when their variables are unset.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub telegram: TelegramConfig,
    pub storage: StorageConfig,
    pub bank: BankConfig,
    pub sync: SyncConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3000);

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            host,
            port,
            log_level,
            telegram: TelegramConfig::from_env(),
            storage: StorageConfig::from_env(),
            bank: BankConfig::from_env(),
            sync: SyncConfig::from_env(),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Chat transport settings. Without a token the polling loop is not
/// started and the rest of the service still runs.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub token: Option<String>,
    pub api_base: Option<String>,
    pub poll_timeout: Duration,
}

impl TelegramConfig {
    fn from_env() -> Self {
        Self {
            token: env_opt("TELEGRAM_BOT_TOKEN"),
            api_base: env_opt("TELEGRAM_API_BASE"),
            poll_timeout: Duration::from_secs(env_u64("TELEGRAM_POLL_TIMEOUT_SECS", 25)),
        }
    }
}

/// Progress storage tiers: the local SQLite cache is always present, the
/// remote store only when REMOTE_STORE_URL is set.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub local_path: PathBuf,
    pub remote_url: Option<String>,
    pub remote_token: Option<String>,
    pub remote_timeout: Duration,
}

impl StorageConfig {
    fn from_env() -> Self {
        let local_path = PathBuf::from(
            std::env::var("LOCAL_CACHE_PATH").unwrap_or_else(|_| "./data/progress.db".to_string()),
        );

        Self {
            local_path,
            remote_url: env_opt("REMOTE_STORE_URL"),
            remote_token: env_opt("REMOTE_STORE_TOKEN"),
            remote_timeout: Duration::from_millis(env_u64("REMOTE_TIMEOUT_MS", 10_000)),
        }
    }
}

/// Word table source and cache location.
#[derive(Debug, Clone)]
pub struct BankConfig {
    pub source_url: Option<String>,
    pub cache_path: PathBuf,
    pub fetch_timeout: Duration,
}

impl BankConfig {
    fn from_env() -> Self {
        let cache_path = PathBuf::from(
            std::env::var("WORDBANK_CACHE_PATH")
                .unwrap_or_else(|_| "./data/wordbank.csv".to_string()),
        );

        Self {
            source_url: env_opt("WORDBANK_URL"),
            cache_path,
            fetch_timeout: Duration::from_millis(env_u64("WORDBANK_TIMEOUT_MS", 15_000)),
        }
    }
}

/// Background reconciliation settings. The schedule is a six-field cron
/// expression; the default fires every five minutes.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub sweep_enabled: bool,
    pub sweep_schedule: String,
    pub enumeration_retries: u32,
    pub enumeration_backoff: Duration,
}

impl SyncConfig {
    fn from_env() -> Self {
        Self {
            sweep_enabled: env_bool("SYNC_SWEEP_ENABLED", true),
            sweep_schedule: std::env::var("SYNC_SWEEP_SCHEDULE")
                .unwrap_or_else(|_| "0 */5 * * * *".to_string()),
            enumeration_retries: env_u32("SYNC_ENUM_RETRY_COUNT", 3),
            enumeration_backoff: Duration::from_millis(env_u64("SYNC_ENUM_BACKOFF_MS", 30_000)),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sweep_enabled: true,
            sweep_schedule: "0 */5 * * * *".to_string(),
            enumeration_retries: 3,
            enumeration_backoff: Duration::from_millis(30_000),
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().as_deref() {
        Some("true") | Some("1") => true,
        Some("false") | Some("0") => false,
        _ => default,
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
