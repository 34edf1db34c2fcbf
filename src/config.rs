use crate::error::ConfigError;
use crate::search::SearchLimits;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

pub const BIND_VAR: &str = "TIMETABLE_BIND";
pub const SNAPSHOT_VAR: &str = "TIMETABLE_SNAPSHOT";
pub const MAX_STEPS_VAR: &str = "TIMETABLE_MAX_SEARCH_STEPS";

const DEFAULT_BIND: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// JSON domain snapshot loaded at startup.
    pub snapshot_path: Option<PathBuf>,
    pub limits: SearchLimits,
}

fn parse<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = parse(
            BIND_VAR,
            lookup(BIND_VAR).unwrap_or_else(|| DEFAULT_BIND.to_string()),
        )?;
        let snapshot_path = lookup(SNAPSHOT_VAR)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        let limits = match lookup(MAX_STEPS_VAR) {
            Some(raw) => SearchLimits {
                max_steps: parse(MAX_STEPS_VAR, raw)?,
            },
            None => SearchLimits::default(),
        };
        Ok(Self {
            bind_addr,
            snapshot_path,
            limits,
        })
    }
}
