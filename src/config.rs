// Condo Expenses - Configuration
// Every option can come from the command line or the environment

use clap::{Args, Parser};
use std::path::PathBuf;

/// Default page size of the expense listing
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Upper bound for the `page_size` query parameter
pub const MAX_PAGE_SIZE: usize = 100;

/// Log filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "condo_expenses=info,condo_server=info,tower_http=info";

/// Location of the SQLite database
#[derive(Debug, Clone, Args)]
pub struct DatabaseConfig {
    /// SQLite database file (created if missing)
    #[arg(
        long = "database",
        env = "CONDO_DB_PATH",
        default_value = "condo_expenses.db",
        global = true
    )]
    pub path: PathBuf,
}

/// Options of the HTTP server
#[derive(Debug, Clone, Parser)]
#[command(name = "condo-server", version, about = "Condominium expense tracking API")]
pub struct ServerConfig {
    #[command(flatten)]
    pub database: DatabaseConfig,

    /// Address to listen on
    #[arg(long, env = "CONDO_BIND_ADDR", default_value = "0.0.0.0:3000")]
    pub bind: String,

    /// Default number of expenses per page
    #[arg(long, env = "CONDO_PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,
}

impl ServerConfig {
    /// Page size clamped to `1..=MAX_PAGE_SIZE`
    pub fn effective_page_size(&self) -> usize {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }
}

/// Install the global `tracing` subscriber, honouring `RUST_LOG`
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_from_args() {
        let config = ServerConfig::try_parse_from([
            "condo-server",
            "--database",
            "/tmp/condo.db",
            "--bind",
            "127.0.0.1:8080",
            "--page-size",
            "500",
        ])
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/condo.db"));
        assert_eq!(config.bind, "127.0.0.1:8080");
        assert_eq!(config.effective_page_size(), MAX_PAGE_SIZE);
    }
}
