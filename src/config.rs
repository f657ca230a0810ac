//! Configuration management for the ingest server

use std::env;
use std::path::PathBuf;

use axum::http::Method;

use crate::upload::{JsonResponder, StatusResponder, UploadConfig};

/// Default request body limit: 100MB
pub const DEFAULT_MAX_BODY_BYTES: usize = 100 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub upload: UploadSettings,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub storage_path: PathBuf,
    pub temp_dir: PathBuf,
    pub allowed_extensions: Vec<String>,
    pub allowed_methods: Vec<Method>,
    pub max_body_bytes: usize,
    pub response_format: ResponseFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Status code only, empty body
    Status,
    /// JSON body listing stored files
    Json,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            upload: UploadSettings::default(),
        }
    }
}

impl Default for UploadSettings {
    fn default() -> Self {
        UploadSettings {
            storage_path: PathBuf::from("./uploads"),
            temp_dir: env::temp_dir(),
            allowed_extensions: Vec::new(),
            allowed_methods: vec![Method::POST],
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            response_format: ResponseFormat::Status,
        }
    }
}

impl UploadSettings {
    /// Build the upload handler configuration
    pub fn to_upload_config(&self) -> UploadConfig {
        let config = UploadConfig::new(&self.storage_path)
            .with_temp_dir(&self.temp_dir)
            .allow_extensions(self.allowed_extensions.iter().cloned());

        match self.response_format {
            ResponseFormat::Status => config.with_responder(StatusResponder),
            ResponseFormat::Json => config.with_responder(JsonResponder),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port)?,
            },
            upload: UploadSettings {
                storage_path: env::var("UPLOAD_STORAGE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.upload.storage_path),
                temp_dir: env::var("UPLOAD_TEMP_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.upload.temp_dir),
                allowed_extensions: env::var("UPLOAD_ALLOWED_EXTENSIONS")
                    .map(|v| parse_list(&v))
                    .unwrap_or(defaults.upload.allowed_extensions),
                allowed_methods: match env::var("UPLOAD_ALLOWED_METHODS") {
                    Ok(v) => parse_methods(&v)?,
                    Err(_) => defaults.upload.allowed_methods,
                },
                max_body_bytes: parse_var("UPLOAD_MAX_BODY_BYTES", defaults.upload.max_body_bytes)?,
                response_format: match env::var("UPLOAD_RESPONSE_FORMAT") {
                    Ok(v) => parse_response_format(&v)?,
                    Err(_) => defaults.upload.response_format,
                },
            },
        })
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(default),
    }
}

/// Split a comma-separated list, dropping blanks. Items are kept verbatim
/// apart from surrounding whitespace.
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_methods(value: &str) -> Result<Vec<Method>, ConfigError> {
    parse_list(value)
        .into_iter()
        .map(|m| {
            Method::from_bytes(m.to_ascii_uppercase().as_bytes()).map_err(|_| ConfigError::Invalid {
                var: "UPLOAD_ALLOWED_METHODS",
                value: value.to_string(),
            })
        })
        .collect()
}

pub fn parse_response_format(value: &str) -> Result<ResponseFormat, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "status" => Ok(ResponseFormat::Status),
        "json" => Ok(ResponseFormat::Json),
        _ => Err(ConfigError::Invalid {
            var: "UPLOAD_RESPONSE_FORMAT",
            value: value.to_string(),
        }),
    }
}
