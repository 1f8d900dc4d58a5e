//! Listener configuration for the mock and admin servers.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

/// Default mock listener port
pub const DEFAULT_MOCK_PORT: u16 = 8080;

/// Default admin listener port
pub const DEFAULT_ADMIN_PORT: u16 = 2525;

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_mock_port() -> u16 {
    DEFAULT_MOCK_PORT
}

fn default_admin_port() -> u16 {
    DEFAULT_ADMIN_PORT
}

/// Mock listener
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ListenConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_mock_port")]
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: DEFAULT_MOCK_PORT,
        }
    }
}

/// Admin listener
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AdminConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_admin_port")]
    pub port: u16,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: DEFAULT_ADMIN_PORT,
        }
    }
}

pub(super) fn socket_addr(host: &str, port: u16) -> Result<SocketAddr, anyhow::Error> {
    let ip: IpAddr = host
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen host '{host}': {e}"))?;
    Ok(SocketAddr::new(ip, port))
}

impl ListenConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, anyhow::Error> {
        socket_addr(&self.host, self.port)
    }
}

impl AdminConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, anyhow::Error> {
        socket_addr(&self.host, self.port)
    }
}
