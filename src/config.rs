use crate::error::{Error, Result};
use crate::services::simulator::SimulationProfile;
use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub default_page_size: i64,
    pub simulation: SimulationProfile,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let defaults = SimulationProfile::default();
        let simulation = SimulationProfile {
            min_latency_ms: get_env_parse_or("SIM_MIN_LATENCY_MS", defaults.min_latency_ms)?,
            max_latency_ms: get_env_parse_or("SIM_MAX_LATENCY_MS", defaults.max_latency_ms)?,
            read_failure_rate: get_env_parse_or("SIM_READ_FAILURE_RATE", defaults.read_failure_rate)?,
            write_failure_rate: get_env_parse_or(
                "SIM_WRITE_FAILURE_RATE",
                defaults.write_failure_rate,
            )?,
        };
        simulation.validate()?;

        let default_page_size: i64 = get_env_parse_or("DEFAULT_PAGE_SIZE", 10)?;
        if default_page_size < 1 {
            return Err(Error::Config(
                "DEFAULT_PAGE_SIZE must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string()),
            default_page_size,
            simulation,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}
