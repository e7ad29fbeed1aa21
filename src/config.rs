//! Application configuration loaded from environment variables.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Telegram ===
    /// Bot token from @BotFather.
    #[serde(default)]
    pub telegram_bot_token: Option<String>,

    /// Default chat id to auto-start a scan session for.
    #[serde(default)]
    pub telegram_chat_id: Option<i64>,

    // === Polymarket Credentials ===
    /// Wallet private key (hex, starts with 0x). Required for live trading.
    #[serde(default)]
    pub pk: Option<String>,

    /// Optional pre-generated API key.
    #[serde(default)]
    pub clob_api_key: Option<String>,

    /// Optional API secret.
    #[serde(default)]
    pub clob_secret: Option<String>,

    /// Optional API passphrase.
    #[serde(default)]
    pub clob_pass_phrase: Option<String>,

    // === Scan Parameters ===
    /// Maximum NO price to flag as an opportunity (e.g., 0.01).
    #[serde(default = "default_price_threshold")]
    pub max_price_no_tokens: Decimal,

    /// Seconds between scan iterations (floor-clamped to 5).
    #[serde(default = "default_scan_interval")]
    pub scan_interval_seconds: u64,

    /// Default order size in shares.
    #[serde(default = "default_order_size")]
    pub max_order_size: Decimal,

    /// Automatically place orders for discovered opportunities.
    #[serde(default)]
    pub auto_order: bool,

    /// Target price for eventual resale.
    #[serde(default = "default_sell_target")]
    pub sell_target_price: Decimal,

    // === Endpoints ===
    /// CLOB API base URL.
    #[serde(default = "default_clob_url")]
    pub host: String,

    /// Gamma API base URL.
    #[serde(default = "default_gamma_url")]
    pub polymarket_gamma_endpoint: String,

    // === Catalog Fetch ===
    /// Per-page item count for the paginated catalog.
    #[serde(default = "default_page_size")]
    pub catalog_page_size: u32,

    /// Ceiling on catalog pages per scan.
    #[serde(default = "default_max_pages")]
    pub catalog_max_pages: u32,

    /// Item ceiling for the fallback catalog listing.
    #[serde(default = "default_basic_limit")]
    pub catalog_basic_limit: u32,

    // === Settings Store ===
    /// Directory holding the per-chat settings file.
    #[serde(default = "default_settings_dir")]
    pub settings_dir: String,

    // === Server Configuration ===
    /// HTTP server port for health/status endpoints.
    #[serde(default = "default_port")]
    pub api_port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,
}

fn default_price_threshold() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

fn default_scan_interval() -> u64 {
    60
}

fn default_order_size() -> Decimal {
    Decimal::new(100, 0)
}

fn default_sell_target() -> Decimal {
    Decimal::new(5, 2) // 0.05
}

fn default_clob_url() -> String {
    "https://clob.polymarket.com".to_string()
}

fn default_gamma_url() -> String {
    "https://gamma-api.polymarket.com".to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_max_pages() -> u32 {
    50
}

fn default_basic_limit() -> u32 {
    1000
}

fn default_settings_dir() -> String {
    "data".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(pk) = &self.pk {
            if !pk.starts_with("0x") && !pk.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err("PK must be a hex private key".to_string());
            }
        }

        if self.max_price_no_tokens <= Decimal::ZERO || self.max_price_no_tokens >= Decimal::ONE {
            return Err("MAX_PRICE_NO_TOKENS must be in (0, 1)".to_string());
        }

        if self.max_order_size <= Decimal::ZERO {
            return Err("MAX_ORDER_SIZE must be positive".to_string());
        }

        url::Url::parse(&self.host).map_err(|e| format!("HOST is not a valid URL: {}", e))?;
        url::Url::parse(&self.polymarket_gamma_endpoint)
            .map_err(|e| format!("POLYMARKET_GAMMA_ENDPOINT is not a valid URL: {}", e))?;

        Ok(())
    }

    /// Gamma base URL without a trailing slash.
    pub fn gamma_base(&self) -> &str {
        self.polymarket_gamma_endpoint.trim_end_matches('/')
    }

    /// CLOB base URL without a trailing slash.
    pub fn clob_base(&self) -> &str {
        self.host.trim_end_matches('/')
    }

    /// Check whether credentials sufficient for order placement are present.
    pub fn can_trade(&self) -> bool {
        self.pk.is_some()
    }
}

#[cfg(test)]
impl Default for Config {
    fn default() -> Self {
        Self {
            telegram_bot_token: None,
            telegram_chat_id: None,
            pk: None,
            clob_api_key: None,
            clob_secret: None,
            clob_pass_phrase: None,
            max_price_no_tokens: default_price_threshold(),
            scan_interval_seconds: default_scan_interval(),
            max_order_size: default_order_size(),
            auto_order: false,
            sell_target_price: default_sell_target(),
            host: default_clob_url(),
            polymarket_gamma_endpoint: default_gamma_url(),
            catalog_page_size: default_page_size(),
            catalog_max_pages: default_max_pages(),
            catalog_basic_limit: default_basic_limit(),
            settings_dir: default_settings_dir(),
            api_port: default_port(),
            rust_log: default_log_level(),
        }
    }
}
