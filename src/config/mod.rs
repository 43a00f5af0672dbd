//! Configuration loading and validation for the casualty-generation service
//! (§6). Environment-variable overrides only, matching the ambient pattern
//! of loading from a file carried over as a future extension point.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL_SECONDS, DEFAULT_CHUNK_SIZE, DEFAULT_CONCURRENCY_CAP,
    DEFAULT_MAX_CPU_SECONDS, DEFAULT_MAX_MEMORY_BYTES, DEFAULT_MAX_WALL_CLOCK_SECONDS,
    DEFAULT_WRITER_FLUSH_INTERVAL,
};
use crate::error::{SimError, SimResult};
use crate::resource::ResourceLimits;

/// Configuration loader: file and environment sources.
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> SimResult<AppConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SimError::Configuration(format!("failed to read config: {}", e)))?;
        Self::load_from_str(&content)
    }

    pub fn load_from_str(_content: &str) -> SimResult<AppConfig> {
        // FUTURE: Implement TOML parsing when a file-based deployment needs it
        let config = AppConfig::default();
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_env() -> SimResult<AppConfig> {
        let mut config = AppConfig::default();

        if let Ok(val) = std::env::var("CASTRA_LOG_LEVEL") {
            config.logging.level = val;
        }
        if let Ok(val) = std::env::var("CASTRA_SERVICE_NAME") {
            config.service.name = val;
        }
        if let Ok(val) = std::env::var("CASTRA_BIND_ADDR") {
            config.service.bind_addr = val;
        }
        if let Ok(val) = std::env::var("CASTRA_STORE_PATH") {
            config.runner.store_path = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("CASTRA_OUTPUT_DIR") {
            config.runner.output_dir = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("CASTRA_CONCURRENCY_CAP") {
            config.runner.concurrency_cap = val.parse().map_err(|_| {
                SimError::Configuration(format!("invalid CASTRA_CONCURRENCY_CAP: {val}"))
            })?;
        }
        if let Ok(val) = std::env::var("CASTRA_CHUNK_SIZE") {
            config.runner.chunk_size = val
                .parse()
                .map_err(|_| SimError::Configuration(format!("invalid CASTRA_CHUNK_SIZE: {val}")))?;
        }
        if let Ok(val) = std::env::var("CASTRA_MAX_MEMORY_BYTES") {
            config.runner.limits.max_memory_bytes = val.parse().map_err(|_| {
                SimError::Configuration(format!("invalid CASTRA_MAX_MEMORY_BYTES: {val}"))
            })?;
        }
        if let Ok(val) = std::env::var("CASTRA_MAX_CPU_SECONDS") {
            config.runner.limits.max_cpu_seconds = val.parse().map_err(|_| {
                SimError::Configuration(format!("invalid CASTRA_MAX_CPU_SECONDS: {val}"))
            })?;
        }
        if let Ok(val) = std::env::var("CASTRA_MAX_WALL_CLOCK_SECONDS") {
            config.runner.limits.max_wall_clock_seconds = val.parse().map_err(|_| {
                SimError::Configuration(format!("invalid CASTRA_MAX_WALL_CLOCK_SECONDS: {val}"))
            })?;
        }
        if let Ok(val) = std::env::var("CASTRA_WRITER_FLUSH_INTERVAL") {
            config.runner.writer_flush_interval = val.parse().map_err(|_| {
                SimError::Configuration(format!("invalid CASTRA_WRITER_FLUSH_INTERVAL: {val}"))
            })?;
        }
        if let Ok(val) = std::env::var("CASTRA_CACHE_CAPACITY") {
            config.runner.cache_capacity = val.parse().map_err(|_| {
                SimError::Configuration(format!("invalid CASTRA_CACHE_CAPACITY: {val}"))
            })?;
        }
        if let Ok(val) = std::env::var("CASTRA_CACHE_TTL_SECONDS") {
            config.runner.cache_ttl_seconds = val.parse().map_err(|_| {
                SimError::Configuration(format!("invalid CASTRA_CACHE_TTL_SECONDS: {val}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub logging: LoggingConfig,
    pub runner: RunnerConfig,
}

impl AppConfig {
    pub fn validate(&self) -> SimResult<()> {
        self.service.validate()?;
        self.logging.validate()?;
        self.runner.validate()?;
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            logging: LoggingConfig::default(),
            runner: RunnerConfig::default(),
        }
    }
}

/// Identity and transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub version: String,
    pub environment: String,
    pub bind_addr: String,
}

impl ServiceConfig {
    pub fn validate(&self) -> SimResult<()> {
        if self.name.is_empty() {
            return Err(SimError::Configuration(
                "service name cannot be empty".to_string(),
            ));
        }
        if self.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(SimError::Configuration(format!(
                "invalid bind address: {}",
                self.bind_addr
            )));
        }
        Ok(())
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "castra".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Structured-logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub structured: bool,
    pub json: bool,
}

impl LoggingConfig {
    pub fn validate(&self) -> SimResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.level.as_str()) {
            return Err(SimError::Configuration(format!(
                "invalid log level: {}",
                self.level
            )));
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            structured: true,
            json: false,
        }
    }
}

/// Runner-facing configuration: concurrency, per-job resource limits,
/// chunking, the output-writer flush cadence, and the persistence/output
/// paths (§5, §6, §7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    pub concurrency_cap: usize,
    pub chunk_size: usize,
    pub writer_flush_interval: usize,
    pub cache_capacity: usize,
    pub cache_ttl_seconds: u64,
    #[serde(with = "limits_serde")]
    pub limits: ResourceLimits,
    pub store_path: PathBuf,
    pub output_dir: PathBuf,
}

impl RunnerConfig {
    pub fn validate(&self) -> SimResult<()> {
        if self.concurrency_cap == 0 {
            return Err(SimError::Configuration(
                "concurrency cap must be at least 1".to_string(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(SimError::Configuration(
                "chunk size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            concurrency_cap: DEFAULT_CONCURRENCY_CAP,
            chunk_size: DEFAULT_CHUNK_SIZE,
            writer_flush_interval: DEFAULT_WRITER_FLUSH_INTERVAL,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            limits: ResourceLimits {
                max_memory_bytes: DEFAULT_MAX_MEMORY_BYTES,
                max_cpu_seconds: DEFAULT_MAX_CPU_SECONDS,
                max_wall_clock_seconds: DEFAULT_MAX_WALL_CLOCK_SECONDS,
            },
            store_path: PathBuf::from("./data/castra-jobs"),
            output_dir: PathBuf::from("./data/castra-output"),
        }
    }
}

mod limits_serde {
    use super::ResourceLimits;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Shadow {
        max_memory_bytes: u64,
        max_cpu_seconds: u64,
        max_wall_clock_seconds: u64,
    }

    pub fn serialize<S: Serializer>(limits: &ResourceLimits, s: S) -> Result<S::Ok, S::Error> {
        Shadow {
            max_memory_bytes: limits.max_memory_bytes,
            max_cpu_seconds: limits.max_cpu_seconds,
            max_wall_clock_seconds: limits.max_wall_clock_seconds,
        }
        .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<ResourceLimits, D::Error> {
        let shadow = Shadow::deserialize(d)?;
        Ok(ResourceLimits {
            max_memory_bytes: shadow.max_memory_bytes,
            max_cpu_seconds: shadow.max_cpu_seconds,
            max_wall_clock_seconds: shadow.max_wall_clock_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_concurrency_cap_rejected() {
        let mut config = AppConfig::default();
        config.runner.concurrency_cap = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_bind_addr_rejected() {
        let mut config = AppConfig::default();
        config.service.bind_addr = "not-an-addr".to_string();
        assert!(config.validate().is_err());
    }
}
