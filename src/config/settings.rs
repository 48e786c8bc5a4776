//! Process settings read from the environment (`.env` is honoured).

use crate::error::ConfigError;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: String,
    /// Prefix for redirect targets, e.g. `https://www.myweb.com`. Empty means site-relative.
    pub root: String,
    pub app_name: String,
    pub debug: bool,
    pub upload_dir: PathBuf,
    pub max_connections: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: "postgres://localhost/andromeda".into(),
            bind_addr: "0.0.0.0:3000".into(),
            root: String::new(),
            app_name: "Andromeda Tech".into(),
            debug: true,
            upload_dir: PathBuf::from("assets/uploads"),
            max_connections: 5,
        }
    }
}

impl Settings {
    /// Load `.env` if present, then read each setting, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Settings::default();
        Ok(Settings {
            database_url: lookup("DATABASE_URL").unwrap_or(d.database_url),
            bind_addr: lookup("BIND_ADDR").unwrap_or(d.bind_addr),
            root: lookup("APP_ROOT")
                .map(|r| r.trim_end_matches('/').to_string())
                .unwrap_or(d.root),
            app_name: lookup("APP_NAME").unwrap_or(d.app_name),
            debug: parse_or("DEBUG", lookup("DEBUG"), d.debug)?,
            upload_dir: lookup("UPLOAD_DIR").map(PathBuf::from).unwrap_or(d.upload_dir),
            max_connections: parse_or("DB_MAX_CONNECTIONS", lookup("DB_MAX_CONNECTIONS"), d.max_connections)?,
        })
    }

    /// Absolute or site-relative location for a logical route.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.root, path.trim_start_matches('/'))
    }
}

fn parse_or<T: FromStr>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidSetting { name, value: v }),
    }
}
