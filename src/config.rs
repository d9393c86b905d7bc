use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub enable_tracing: bool,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn load(env: &str) -> anyhow::Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {config_path}: {e}"))?;
        Ok(serde_yaml::from_str(&content)?)
    }
}

/// Engine configuration: the static market list plus ledger/analytics knobs.
///
/// Markets are configured externally and never created at runtime.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EngineConfig {
    pub assets: Vec<AssetConfig>,
    pub markets: Vec<MarketConfig>,
    /// Quote currency every first-seen user is granted.
    pub quote_asset: String,
    /// Initial grant of the quote currency (decimal string).
    pub initial_quote_grant: String,
    /// Initial grant of every tradable base asset (decimal string).
    pub initial_base_grant: String,
    /// Price levels per side in depth snapshots.
    pub depth_limit: usize,
    /// Closed candles retained per (symbol, interval).
    pub kline_history_cap: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AssetConfig {
    pub name: String,
    /// Internal scale (amounts stored as value * 10^decimals).
    pub decimals: u32,
    /// Max input/output precision; strictly below `decimals` so that
    /// settlement arithmetic stays exact (see `money`).
    pub display_decimals: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MarketConfig {
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub initial_price: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: "logs".to_string(),
            log_file: "spotx.log".to_string(),
            use_json: false,
            rotation: "daily".to_string(),
            enable_tracing: true,
            engine: EngineConfig::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            assets: vec![
                AssetConfig {
                    name: "USD".to_string(),
                    decimals: 6,
                    display_decimals: 2,
                },
                AssetConfig {
                    name: "CR7".to_string(),
                    decimals: 8,
                    display_decimals: 4,
                },
                AssetConfig {
                    name: "ELON".to_string(),
                    decimals: 8,
                    display_decimals: 4,
                },
            ],
            markets: vec![
                MarketConfig {
                    symbol: "CR7_USD".to_string(),
                    base_asset: "CR7".to_string(),
                    quote_asset: "USD".to_string(),
                    initial_price: "50000".to_string(),
                },
                MarketConfig {
                    symbol: "ELON_USD".to_string(),
                    base_asset: "ELON".to_string(),
                    quote_asset: "USD".to_string(),
                    initial_price: "50000".to_string(),
                },
            ],
            quote_asset: "USD".to_string(),
            initial_quote_grant: "100000".to_string(),
            initial_base_grant: "1000".to_string(),
            depth_limit: 20,
            kline_history_cap: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_engine_config_has_two_markets() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.markets.len(), 2);
        assert_eq!(cfg.markets[0].symbol, "CR7_USD");
        assert_eq!(cfg.quote_asset, "USD");
    }

    #[test]
    fn engine_config_yaml_round_trip() {
        let cfg = EngineConfig::default();
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let back: EngineConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.markets.len(), cfg.markets.len());
        assert_eq!(back.depth_limit, 20);
    }
}
