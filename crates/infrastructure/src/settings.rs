//! Layered configuration.
//!
//! Precedence, lowest first: built-in defaults, the config file
//! (`--config`, or `tally.toml` in the working directory), then `TALLY__`
//! environment variables (`TALLY__API__BASE_URL=https://...`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use tally_application::{ClientOptions, SessionOptions};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "TALLY";

/// Separator between nested keys in environment variable names.
pub const ENV_SEPARATOR: &str = "__";

/// Remote API settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiSettings {
    /// Base URL every request path is resolved against.
    pub base_url: String,
    /// Default per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// `User-Agent` header value.
    pub user_agent: String,
}

/// Session and auth endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionSettings {
    /// Credentials file; defaults to `<config dir>/tally/credentials.json`.
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,
    /// Sign-in endpoint.
    pub login_path: String,
    /// Sign-out endpoint.
    pub logout_path: String,
    /// Refresh endpoint.
    pub refresh_path: String,
    /// Route to send the user to when the session cannot be recovered.
    pub unauthenticated_route: String,
    /// Bound on one refresh call in milliseconds.
    pub refresh_timeout_ms: u64,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

/// All settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Remote API.
    pub api: ApiSettings,
    /// Session handling.
    pub session: SessionSettings,
    /// Logging.
    pub log: LogSettings,
}

impl Settings {
    /// Loads settings from defaults, the config file and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit `config_file` is missing, a source
    /// cannot be parsed, or a value is out of range.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(
            config_file,
            Environment::with_prefix(ENV_PREFIX).separator(ENV_SEPARATOR),
        )
    }

    /// Same as [`Settings::load`] with an explicit environment source.
    ///
    /// # Errors
    ///
    /// See [`Settings::load`].
    pub fn load_with_env(
        config_file: Option<&Path>,
        environment: Environment,
    ) -> Result<Self, ConfigError> {
        let file = config_file.map_or_else(
            || File::with_name("tally").required(false),
            |path| File::from(path).required(true),
        );

        let settings: Self = Config::builder()
            .set_default("api.base_url", "http://localhost:5000")?
            .set_default("api.request_timeout_ms", 30_000_i64)?
            .set_default(
                "api.user_agent",
                concat!("tally/", env!("CARGO_PKG_VERSION")),
            )?
            .set_default("session.login_path", "/api/auth/login")?
            .set_default("session.logout_path", "/api/auth/logout")?
            .set_default("session.refresh_path", "/api/auth/refresh-token")?
            .set_default("session.unauthenticated_route", "/")?
            .set_default("session.refresh_timeout_ms", 15_000_i64)?
            .set_default("log.filter", "info")?
            .add_source(file)
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::Message("api.base_url must not be empty".into()));
        }
        if self.api.request_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "api.request_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.session.refresh_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "session.refresh_timeout_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Default per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.api.request_timeout_ms)
    }

    /// Credentials file location.
    #[must_use]
    pub fn credentials_path(&self) -> PathBuf {
        self.session.credentials_path.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("tally")
                .join("credentials.json")
        })
    }

    /// Options for the authenticated client.
    #[must_use]
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            refresh_path: self.session.refresh_path.clone(),
            unauthenticated_route: self.session.unauthenticated_route.clone(),
            refresh_timeout: Duration::from_millis(self.session.refresh_timeout_ms),
        }
    }

    /// Options for the session service.
    #[must_use]
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            login_path: self.session.login_path.clone(),
            logout_path: self.session.logout_path.clone(),
        }
    }
}
