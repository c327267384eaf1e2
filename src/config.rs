//! Server configuration, read once from the environment at startup.
//!
//! | Variable                | Default                        |
//! |-------------------------|--------------------------------|
//! | `SURVEY_DATA_PATH`      | `data/policy_survey_data.csv`  |
//! | `HOST`                  | `0.0.0.0`                      |
//! | `PORT`                  | `8000`                         |
//! | `SUPPORT_RATE_DECIMALS` | `3`                            |

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use thiserror::Error;

pub const DEFAULT_DATA_PATH: &str = "data/policy_survey_data.csv";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_RATE_DECIMALS: u32 = 3;
const MAX_RATE_DECIMALS: u32 = 15;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid {name}='{value}': {reason}")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub data_path: PathBuf,
    pub addr: SocketAddr,
    pub rate_decimals: u32,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Unset or empty variables take
    /// their defaults; set but unparsable ones are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let data_path = get("SURVEY_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH));

        let host: IpAddr = match get("HOST") {
            Some(v) => v.trim().parse().map_err(|e| ConfigError {
                name: "HOST",
                value: v.clone(),
                reason: format!("{e}"),
            })?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        let port: u16 = match get("PORT") {
            Some(v) => v.trim().parse().map_err(|e| ConfigError {
                name: "PORT",
                value: v.clone(),
                reason: format!("{e}"),
            })?,
            None => DEFAULT_PORT,
        };

        let rate_decimals = match get("SUPPORT_RATE_DECIMALS") {
            Some(v) => {
                let n: u32 = v.trim().parse().map_err(|e| ConfigError {
                    name: "SUPPORT_RATE_DECIMALS",
                    value: v.clone(),
                    reason: format!("{e}"),
                })?;
                if n > MAX_RATE_DECIMALS {
                    return Err(ConfigError {
                        name: "SUPPORT_RATE_DECIMALS",
                        value: v,
                        reason: format!("must be at most {MAX_RATE_DECIMALS}"),
                    });
                }
                n
            }
            None => DEFAULT_RATE_DECIMALS,
        };

        Ok(ServerConfig {
            data_path,
            addr: SocketAddr::new(host, port),
            rate_decimals,
        })
    }
}
