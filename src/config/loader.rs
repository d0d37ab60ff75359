use crate::config::fees::FeeConfig;
use crate::config::market::MarketConfig;
use crate::config::risk::RiskConfig;
use crate::config::*;
use crate::error::{Error, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub market: MarketConfig,
    pub risk: RiskConfig,
    pub fees: FeeConfig,
    pub funding: FundingConfig,
    pub keeper: KeeperConfig,
    pub snapshot: SnapshotConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct KeeperConfig {
    pub interval_ms: u64,
    /// Simulated reveal latency of the local coprocessor.
    pub reveal_delay_ms: u64,
    pub json_logs: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SnapshotConfig {
    pub dir: String,
    pub max_snapshots: usize,
}

impl AppConfig {
    pub fn load(env: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("CIPHERPERP").separator("__"))
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        config.try_deserialize()
            .map_err(|e| Error::ConfigError(e.to_string()))
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            risk: self.risk.clone(),
            fees: self.fees.clone(),
            funding: self.funding.clone(),
            market: self.market.clone(),
        }
    }
}
