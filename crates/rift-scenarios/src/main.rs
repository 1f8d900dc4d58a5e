use anyhow::Context;
use clap::Parser;
use rift_scenarios::admin_api::AdminApiServer;
use rift_scenarios::config::{Config, DEFAULT_ADMIN_PORT, DEFAULT_MOCK_PORT};
use rift_scenarios::{MockEngine, MockServer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "rift-scenarios")]
#[command(
    author,
    version,
    about = "HTTP mock server with per-session scenario state"
)]
struct Args {
    /// Config file (YAML or JSON) with listeners and mappings
    #[arg(short, long, env = "RIFT_CONFIG")]
    config: Option<PathBuf>,

    /// Mock listener port [default: 8080]
    #[arg(short, long, env = "RIFT_PORT")]
    port: Option<u16>,

    /// Admin API port [default: 2525]
    #[arg(long, env = "RIFT_ADMIN_PORT")]
    admin_port: Option<u16>,

    /// Bind address for both listeners
    #[arg(long, env = "RIFT_HOST")]
    host: Option<String>,

    /// Log filter, overridden by RUST_LOG
    #[arg(long, env = "RIFT_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> Result<Config, anyhow::Error> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(port) = self.port {
            config.listen.port = port;
        }
        if let Some(port) = self.admin_port {
            config.admin.port = port;
        }
        if let Some(host) = self.host {
            config.listen.host = host.clone();
            config.admin.host = host;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    let config = args.into_config()?;

    let engine = Arc::new(MockEngine::new());
    for mapping in config.mappings.clone() {
        engine
            .add_mapping(mapping)
            .context("Failed to register mapping")?;
    }
    info!("Loaded {} mapping(s)", engine.mappings().len());

    let mock = MockServer::bind(config.listen.socket_addr()?, Arc::clone(&engine)).await?;
    let admin = AdminApiServer::bind(config.admin.socket_addr()?, Arc::clone(&engine)).await?;

    tokio::select! {
        result = mock.run() => {
            if let Err(e) = &result {
                error!("Mock server stopped: {}", e);
            }
            result
        }
        result = admin.run() => {
            if let Err(e) = &result {
                error!("Admin API stopped: {}", e);
            }
            result
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let args = Args::try_parse_from(["rift-scenarios"]).unwrap();
        let config = args.into_config().unwrap();
        assert_eq!(config.listen.port, DEFAULT_MOCK_PORT);
        assert_eq!(config.admin.port, DEFAULT_ADMIN_PORT);
    }

    #[test]
    fn test_cli_overrides() {
        let args = Args::try_parse_from([
            "rift-scenarios",
            "--port",
            "9000",
            "--admin-port",
            "9001",
            "--host",
            "127.0.0.1",
        ])
        .unwrap();
        let config = args.into_config().unwrap();
        assert_eq!(config.listen.port, 9000);
        assert_eq!(config.admin.port, 9001);
        assert_eq!(config.admin.host, "127.0.0.1");
    }

    #[test]
    fn test_cli_rejects_shared_port() {
        let args =
            Args::try_parse_from(["rift-scenarios", "--port", "9000", "--admin-port", "9000"])
                .unwrap();
        assert!(args.into_config().is_err());
    }
}
