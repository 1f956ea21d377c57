use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::db::default_db_path;
use crate::quiz::options::{DEFAULT_OPTION_COUNT, MAX_OPTION_COUNT};
use crate::services::words::DEFAULT_GROUP_SIZE;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    /// Daily rolling log files go here when set (`ENABLE_FILE_LOGS`).
    pub log_dir: Option<PathBuf>,
    pub database_path: PathBuf,
    pub group_size: i64,
    pub option_count: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 3000,
            log_level: "info".to_string(),
            log_dir: None,
            database_path: default_db_path(),
            group_size: DEFAULT_GROUP_SIZE,
            option_count: DEFAULT_OPTION_COUNT,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(defaults.port);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(defaults.host);

        let log_level = std::env::var("RUST_LOG").unwrap_or(defaults.log_level);

        let log_dir = std::env::var("ENABLE_FILE_LOGS")
            .ok()
            .filter(|value| value == "true" || value == "1")
            .map(|_| {
                std::env::var("LOG_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./logs"))
            });

        let database_path = std::env::var("DATABASE_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.database_path);

        let group_size = std::env::var("GROUP_SIZE")
            .ok()
            .and_then(|value| value.parse::<i64>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(defaults.group_size);

        let option_count = std::env::var("QUIZ_OPTION_COUNT")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(defaults.option_count)
            .clamp(2, MAX_OPTION_COUNT);

        Self {
            host,
            port,
            log_level,
            log_dir,
            database_path,
            group_size,
            option_count,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
