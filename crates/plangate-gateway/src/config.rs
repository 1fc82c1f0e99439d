//! Runtime configuration, read once from the environment at startup.

use std::net::{AddrParseError, SocketAddr};

pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_ORIGIN: &str = "https://proofpixapp.com";
pub const DEFAULT_SIGNING_KEY: &str = "default_key";

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    /// Origin allowed by CORS.
    pub allowed_origin: String,
    /// Key mixed into response signatures.
    pub signing_key: String,
}

impl Config {
    pub fn from_env() -> Result<Config, AddrParseError> {
        let addr = std::env::var("PLANGATE_ADDR")
            .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
            .parse()?;
        Ok(Config {
            addr,
            allowed_origin: std::env::var("ALLOWED_ORIGIN")
                .unwrap_or_else(|_| DEFAULT_ORIGIN.to_string()),
            signing_key: std::env::var("RESPONSE_SIGNING_KEY")
                .unwrap_or_else(|_| DEFAULT_SIGNING_KEY.to_string()),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            allowed_origin: DEFAULT_ORIGIN.to_string(),
            signing_key: DEFAULT_SIGNING_KEY.to_string(),
        }
    }
}
