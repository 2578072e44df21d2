use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::constants::{
    DEFAULT_DATABASE_URL, DEFAULT_MAX_IMAGES_PER_REQUEST, DEFAULT_MAX_IMAGE_BYTES,
    DEFAULT_SERVER_PORT, DEFAULT_UPLOAD_DIR,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: '{value}' ({reason})")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Which backend holds cars and contacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" | "in-memory" => Ok(StorageBackend::Memory),
            other => Err(format!("expected 'postgres' or 'memory', got '{}'", other)),
        }
    }
}

/// Where uploaded car images end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStorage {
    /// Embedded in the record as `data:` URIs.
    Inline,
    /// Written under `upload_dir` and served from `/uploads`.
    Filesystem,
}

impl FromStr for ImageStorage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" | "base64" => Ok(ImageStorage::Inline),
            "filesystem" | "disk" => Ok(ImageStorage::Filesystem),
            other => Err(format!("expected 'inline' or 'filesystem', got '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub storage_backend: StorageBackend,
    pub database_url: String,
    pub database_max_connections: u32,
    pub image_storage: ImageStorage,
    pub upload_dir: PathBuf,
    pub max_image_bytes: usize,
    pub max_images_per_request: usize,
    pub allowed_origins: Vec<String>,
    pub admin_token: Option<String>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_port: DEFAULT_SERVER_PORT,
            storage_backend: StorageBackend::Postgres,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            database_max_connections: 10,
            image_storage: ImageStorage::Inline,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            max_images_per_request: DEFAULT_MAX_IMAGES_PER_REQUEST,
            allowed_origins: Vec::new(),
            admin_token: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source. Unset and
    /// blank variables fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();

        Ok(Config {
            server_port: parse_or(&get, "SERVER_PORT", defaults.server_port)?,
            storage_backend: parse_or(&get, "STORAGE_BACKEND", defaults.storage_backend)?,
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            database_max_connections: parse_or(
                &get,
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )?,
            image_storage: parse_or(&get, "IMAGE_STORAGE", defaults.image_storage)?,
            upload_dir: get("UPLOAD_DIR").map(PathBuf::from).unwrap_or(defaults.upload_dir),
            max_image_bytes: parse_or(&get, "MAX_IMAGE_BYTES", defaults.max_image_bytes)?,
            max_images_per_request: parse_or(
                &get,
                "MAX_IMAGES_PER_REQUEST",
                defaults.max_images_per_request,
            )?,
            allowed_origins: get("ALLOWED_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|origin| !origin.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            admin_token: get("ADMIN_TOKEN"),
            log_level: get("RUST_LOG").unwrap_or(defaults.log_level),
        })
    }
}

fn parse_or<G, T>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: ToString,
{
    match get(name) {
        None => Ok(default),
        Some(value) => {
            let parsed = value.trim().parse::<T>();
            parsed.map_err(|e| ConfigError::InvalidValue {
                name,
                reason: e.to_string(),
                value,
            })
        }
    }
}
