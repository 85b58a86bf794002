//! Application configuration.
//!
//! Loaded from a TOML file, overridable per-field through `XMAKER__`
//! environment variables (e.g. `XMAKER__VENUE__SECRET`). Credentials belong
//! in the environment, not the file.

use serde::Deserialize;

use crate::error::{AppError, AppResult};
use xmaker_core::Pair;
use xmaker_strategy::{ReconcilerConfig, SelectorConfig};

/// Venue REST connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct VenueConfig {
    /// Base URL of the trade API.
    pub base_url: String,
    /// API credential id.
    pub api_id: String,
    /// HMAC signing secret.
    pub secret: String,
    /// Call-weight capacity per minute for this credential.
    #[serde(default = "default_weight_capacity")]
    pub weight_capacity: i64,
}

/// Reference exchange stream settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceConfig {
    /// WebSocket stream base URL.
    pub ws_url: String,
}

/// One traded pair and its reference-exchange symbol.
#[derive(Debug, Clone, Deserialize)]
pub struct PairConfig {
    /// Venue pair, e.g. "BTC_USD".
    pub pair: String,
    /// Reference stream symbol, e.g. "BTCUSDT".
    pub reference_symbol: String,
}

impl PairConfig {
    pub fn parsed_pair(&self) -> AppResult<Pair> {
        Ok(Pair::new(self.pair.clone())?)
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub venue: VenueConfig,
    pub reference: ReferenceConfig,
    pub pairs: Vec<PairConfig>,
    pub selector: SelectorConfig,
    pub reconciler: ReconcilerConfig,
}

impl AppConfig {
    /// Load from a TOML file plus `XMAKER__*` environment overrides.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let config = ::config::Config::builder()
            .add_source(::config::File::with_name(path))
            .add_source(
                ::config::Environment::with_prefix("XMAKER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let config: AppConfig = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> AppResult<()> {
        if self.pairs.is_empty() {
            return Err(AppError::InvalidConfig("no pairs configured".to_string()));
        }
        for pair in &self.pairs {
            pair.parsed_pair()?;
        }
        if !self.reconciler.buy_enabled && !self.reconciler.sell_enabled {
            return Err(AppError::InvalidConfig(
                "both sides disabled; nothing to quote".to_string(),
            ));
        }
        if self.reconciler.amount <= rust_decimal::Decimal::ZERO {
            return Err(AppError::InvalidConfig(
                "reconciler.amount must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_weight_capacity() -> i64 {
    600
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_toml() -> &'static str {
        r#"
[venue]
base_url = "https://venue.example/api/trade"
api_id = "key"
secret = "shh"

[reference]
ws_url = "wss://stream.example:9443"

[[pairs]]
pair = "BTC_USD"
reference_symbol = "BTCUSDT"

[selector]
placement_value_offset = "5000"

[reconciler]
amount = "0.001"
replacement_value_offset = "3000"
"#
    }

    #[test]
    fn test_config_parses_with_defaults() {
        let config: AppConfig = toml::from_str(sample_toml()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.venue.weight_capacity, 600);
        assert_eq!(config.pairs.len(), 1);
        assert_eq!(config.pairs[0].parsed_pair().unwrap().base(), "BTC");
        assert_eq!(config.reconciler.min_hold_secs, 60);
    }

    #[test]
    fn test_config_rejects_bad_pair() {
        let toml_str = sample_toml().replace("BTC_USD", "BTCUSD");
        let config: AppConfig = toml::from_str(&toml_str).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_zero_amount() {
        let toml_str = sample_toml().replace("\"0.001\"", "\"0\"");
        let config: AppConfig = toml::from_str(&toml_str).unwrap();
        assert!(matches!(
            config.validate(),
            Err(AppError::InvalidConfig(_))
        ));
    }
}
