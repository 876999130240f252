// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for the Quarry server.
//!
//! Precedence (highest to lowest):
//! 1. Environment variables (`QUARRY_SERVER_*`)
//! 2. Config file (TOML, path given on the command line)
//! 3. Built-in defaults

use std::env;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read config file: {0}")]
	Io(#[from] std::io::Error),

	#[error("failed to parse config file: {0}")]
	Parse(#[from] toml::de::Error),

	#[error("invalid configuration: {0}")]
	Invalid(String),
}

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub database: DatabaseConfig,
	pub auth: Option<BasicAuthConfig>,
	pub logging: LoggingConfig,
}

impl ServerConfig {
	/// Get the socket address string for binding.
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// HTTP listener configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct HttpConfig {
	pub host: String,
	pub port: u16,
}

impl Default for HttpConfig {
	fn default() -> Self {
		Self {
			host: "127.0.0.1".to_string(),
			port: 8588,
		}
	}
}

/// Database configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
	pub url: String,
}

impl Default for DatabaseConfig {
	fn default() -> Self {
		Self {
			url: "sqlite:./quarry.db".to_string(),
		}
	}
}

/// Transport-level basic auth shared by the admin surface and the task
/// queue endpoints. Absent = no authentication required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuthConfig {
	pub username: String,
	pub password: String,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
	pub level: String,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
		}
	}
}

/// Partial configuration as read from one source, merged by precedence.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub http: HttpConfigLayer,
	#[serde(default)]
	pub database: DatabaseConfigLayer,
	#[serde(default)]
	pub auth: AuthConfigLayer,
	#[serde(default)]
	pub logging: LoggingConfigLayer,
}

impl ServerConfigLayer {
	pub fn merge(&mut self, other: ServerConfigLayer) {
		self.http.merge(other.http);
		self.database.merge(other.database);
		self.auth.merge(other.auth);
		self.logging.merge(other.logging);
	}

	pub fn finalize(self) -> Result<ServerConfig, ConfigError> {
		Ok(ServerConfig {
			http: self.http.finalize(),
			database: self.database.finalize(),
			auth: self.auth.finalize()?,
			logging: self.logging.finalize(),
		})
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpConfigLayer {
	#[serde(default)]
	pub host: Option<String>,
	#[serde(default)]
	pub port: Option<u16>,
}

impl HttpConfigLayer {
	pub fn merge(&mut self, other: HttpConfigLayer) {
		if other.host.is_some() {
			self.host = other.host;
		}
		if other.port.is_some() {
			self.port = other.port;
		}
	}

	pub fn finalize(self) -> HttpConfig {
		let defaults = HttpConfig::default();
		HttpConfig {
			host: self.host.unwrap_or(defaults.host),
			port: self.port.unwrap_or(defaults.port),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfigLayer {
	#[serde(default)]
	pub url: Option<String>,
}

impl DatabaseConfigLayer {
	pub fn merge(&mut self, other: DatabaseConfigLayer) {
		if other.url.is_some() {
			self.url = other.url;
		}
	}

	pub fn finalize(self) -> DatabaseConfig {
		DatabaseConfig {
			url: self.url.unwrap_or_else(|| DatabaseConfig::default().url),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfigLayer {
	#[serde(default)]
	pub username: Option<String>,
	#[serde(default)]
	pub password: Option<String>,
}

impl AuthConfigLayer {
	pub fn merge(&mut self, other: AuthConfigLayer) {
		if other.username.is_some() {
			self.username = other.username;
		}
		if other.password.is_some() {
			self.password = other.password;
		}
	}

	pub fn finalize(self) -> Result<Option<BasicAuthConfig>, ConfigError> {
		match (self.username, self.password) {
			(None, None) => Ok(None),
			(Some(username), Some(password)) => Ok(Some(BasicAuthConfig { username, password })),
			_ => Err(ConfigError::Invalid(
				"auth requires both username and password".to_string(),
			)),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfigLayer {
	#[serde(default)]
	pub level: Option<String>,
}

impl LoggingConfigLayer {
	pub fn merge(&mut self, other: LoggingConfigLayer) {
		if other.level.is_some() {
			self.level = other.level;
		}
	}

	pub fn finalize(self) -> LoggingConfig {
		LoggingConfig {
			level: self.level.unwrap_or_else(|| LoggingConfig::default().level),
		}
	}
}

/// Load configuration, optionally merging a TOML file under the env layer.
pub fn load_config(config_path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
	let mut merged = ServerConfigLayer::default();

	if let Some(path) = config_path {
		debug!(path = %path.display(), "loading configuration file");
		let raw = std::fs::read_to_string(path)?;
		merged.merge(toml::from_str(&raw)?);
	}

	merged.merge(env_layer()?);
	merged.finalize()
}

fn env_layer() -> Result<ServerConfigLayer, ConfigError> {
	let port = match env::var("QUARRY_SERVER_PORT") {
		Ok(raw) => Some(raw.parse::<u16>().map_err(|_| {
			ConfigError::Invalid(format!("QUARRY_SERVER_PORT is not a port number: {raw}"))
		})?),
		Err(_) => None,
	};

	Ok(ServerConfigLayer {
		http: HttpConfigLayer {
			host: env::var("QUARRY_SERVER_HOST").ok(),
			port,
		},
		database: DatabaseConfigLayer {
			url: env::var("QUARRY_SERVER_DATABASE_URL").ok(),
		},
		auth: AuthConfigLayer {
			username: env::var("QUARRY_SERVER_AUTH_USERNAME").ok(),
			password: env::var("QUARRY_SERVER_AUTH_PASSWORD").ok(),
		},
		logging: LoggingConfigLayer {
			level: env::var("QUARRY_SERVER_LOG_LEVEL").ok(),
		},
	})
}
