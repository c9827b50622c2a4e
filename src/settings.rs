// src/settings.rs

use std::{net::SocketAddr, path::Path};

use clap::Parser;
use config::{builder::DefaultState, ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};

const DEFAULT_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_LOGIN_URL: &str = "https://webhook-flows.intelectai.com.br/webhook/login-verification";

#[derive(Parser, Debug)]
#[command(version)]
pub struct Args {
    /// Path to the local configuration TOML file.
    #[arg(short, value_name = "CONFIG_PATH")]
    pub config: std::path::PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Web {
    #[serde(deserialize_with = "deserialize_socket_addr")]
    pub address: SocketAddr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Directus {
    pub api_url: String,
    pub token: String,
    /// Maximum number of analysis records fetched per request.
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Webhook {
    pub login_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Settings {
    pub web: Web,
    pub directus: Directus,
    pub webhook: Webhook,
}

impl Settings {
    /// Load settings from the given TOML file, with sane defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let builder = ConfigBuilder::<DefaultState>::default()
            .set_default("web.address", DEFAULT_ADDR)?
            .set_default("directus.api_url", "http://localhost:8055")?
            .set_default("directus.token", "")?
            .set_default("directus.limit", 100_i64)?
            .set_default("webhook.login_url", DEFAULT_LOGIN_URL)?;

        let cfg = builder.add_source(File::from(path)).build()?;

        cfg.try_deserialize()
    }
}

fn deserialize_socket_addr<'de, D>(deserializer: D) -> Result<SocketAddr, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}
