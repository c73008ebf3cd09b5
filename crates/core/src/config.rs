use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hours_cap::DEFAULT_MONTHLY_HOURS_CAP;
use crate::lifecycle::PaymentOrder;

pub const DEFAULT_MAX_DOCUMENT_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub workflow: WorkflowConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct WorkflowConfig {
    pub monthly_hours_cap: u32,
    pub max_hours_per_claim: u32,
    pub max_hourly_rate: u32,
    pub max_description_len: usize,
    pub payment_order: PaymentOrder,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub max_document_bytes: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub upload_dir: Option<PathBuf>,
    pub payment_order: Option<PaymentOrder>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://claimdesk.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            workflow: WorkflowConfig {
                monthly_hours_cap: DEFAULT_MONTHLY_HOURS_CAP,
                max_hours_per_claim: 300,
                max_hourly_rate: 500,
                max_description_len: 500,
                payment_order: PaymentOrder::Strict,
            },
            storage: StorageConfig {
                upload_dir: PathBuf::from("uploads"),
                max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

fn parse_payment_order(key: &str, value: &str) -> Result<PaymentOrder, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "strict" => Ok(PaymentOrder::Strict),
        "relaxed" => Ok(PaymentOrder::Relaxed),
        _ => Err(ConfigError::InvalidEnvOverride {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("claimdesk.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(workflow) = patch.workflow {
            if let Some(monthly_hours_cap) = workflow.monthly_hours_cap {
                self.workflow.monthly_hours_cap = monthly_hours_cap;
            }
            if let Some(max_hours_per_claim) = workflow.max_hours_per_claim {
                self.workflow.max_hours_per_claim = max_hours_per_claim;
            }
            if let Some(max_hourly_rate) = workflow.max_hourly_rate {
                self.workflow.max_hourly_rate = max_hourly_rate;
            }
            if let Some(max_description_len) = workflow.max_description_len {
                self.workflow.max_description_len = max_description_len;
            }
            if let Some(payment_order) = workflow.payment_order {
                self.workflow.payment_order = payment_order;
            }
        }

        if let Some(storage) = patch.storage {
            if let Some(upload_dir) = storage.upload_dir {
                self.storage.upload_dir = upload_dir;
            }
            if let Some(max_document_bytes) = storage.max_document_bytes {
                self.storage.max_document_bytes = max_document_bytes;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CLAIMDESK_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("CLAIMDESK_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("CLAIMDESK_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("CLAIMDESK_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("CLAIMDESK_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CLAIMDESK_WORKFLOW_MONTHLY_HOURS_CAP") {
            self.workflow.monthly_hours_cap =
                parse_u32("CLAIMDESK_WORKFLOW_MONTHLY_HOURS_CAP", &value)?;
        }
        if let Some(value) = read_env("CLAIMDESK_WORKFLOW_MAX_HOURS_PER_CLAIM") {
            self.workflow.max_hours_per_claim =
                parse_u32("CLAIMDESK_WORKFLOW_MAX_HOURS_PER_CLAIM", &value)?;
        }
        if let Some(value) = read_env("CLAIMDESK_WORKFLOW_MAX_HOURLY_RATE") {
            self.workflow.max_hourly_rate =
                parse_u32("CLAIMDESK_WORKFLOW_MAX_HOURLY_RATE", &value)?;
        }
        if let Some(value) = read_env("CLAIMDESK_WORKFLOW_PAYMENT_ORDER") {
            self.workflow.payment_order =
                parse_payment_order("CLAIMDESK_WORKFLOW_PAYMENT_ORDER", &value)?;
        }

        if let Some(value) = read_env("CLAIMDESK_STORAGE_UPLOAD_DIR") {
            self.storage.upload_dir = PathBuf::from(value);
        }
        if let Some(value) = read_env("CLAIMDESK_STORAGE_MAX_DOCUMENT_BYTES") {
            self.storage.max_document_bytes =
                parse_u64("CLAIMDESK_STORAGE_MAX_DOCUMENT_BYTES", &value)?;
        }

        let log_level =
            read_env("CLAIMDESK_LOGGING_LEVEL").or_else(|| read_env("CLAIMDESK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CLAIMDESK_LOGGING_FORMAT").or_else(|| read_env("CLAIMDESK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(upload_dir) = overrides.upload_dir {
            self.storage.upload_dir = upload_dir;
        }
        if let Some(payment_order) = overrides.payment_order {
            self.workflow.payment_order = payment_order;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_workflow(&self.workflow)?;
        validate_storage(&self.storage)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("claimdesk.toml"), PathBuf::from("config/claimdesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_workflow(workflow: &WorkflowConfig) -> Result<(), ConfigError> {
    if workflow.monthly_hours_cap == 0 {
        return Err(ConfigError::Validation(
            "workflow.monthly_hours_cap must be greater than zero".to_string(),
        ));
    }

    if workflow.max_hours_per_claim == 0
        || workflow.max_hours_per_claim > workflow.monthly_hours_cap
    {
        return Err(ConfigError::Validation(
            "workflow.max_hours_per_claim must be in range 1..=workflow.monthly_hours_cap"
                .to_string(),
        ));
    }

    if workflow.max_description_len == 0 {
        return Err(ConfigError::Validation(
            "workflow.max_description_len must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_storage(storage: &StorageConfig) -> Result<(), ConfigError> {
    if storage.upload_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation("storage.upload_dir must not be empty".to_string()));
    }

    if storage.max_document_bytes == 0 {
        return Err(ConfigError::Validation(
            "storage.max_document_bytes must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    workflow: Option<WorkflowPatch>,
    storage: Option<StoragePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct WorkflowPatch {
    monthly_hours_cap: Option<u32>,
    max_hours_per_claim: Option<u32>,
    max_hourly_rate: Option<u32>,
    max_description_len: Option<usize>,
    payment_order: Option<PaymentOrder>,
}

#[derive(Debug, Default, Deserialize)]
struct StoragePatch {
    upload_dir: Option<PathBuf>,
    max_document_bytes: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
    use crate::lifecycle::PaymentOrder;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_match_documented_limits() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.workflow.monthly_hours_cap == 300, "monthly cap defaults to 300")?;
        ensure(config.workflow.max_hourly_rate == 500, "rate ceiling defaults to 500")?;
        ensure(
            config.storage.max_document_bytes == 10 * 1024 * 1024,
            "document ceiling defaults to 10 MiB",
        )?;
        ensure(
            config.workflow.payment_order == PaymentOrder::Strict,
            "payment order defaults to strict",
        )?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_CLAIMDESK_UPLOADS", "/srv/claimdesk/uploads");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("claimdesk.toml");
            fs::write(
                &path,
                r#"
[storage]
upload_dir = "${TEST_CLAIMDESK_UPLOADS}"

[workflow]
monthly_hours_cap = 180
max_hours_per_claim = 180
payment_order = "relaxed"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.storage.upload_dir.to_string_lossy() == "/srv/claimdesk/uploads",
                "upload dir should be interpolated from environment",
            )?;
            ensure(config.workflow.monthly_hours_cap == 180, "file cap should apply")?;
            ensure(
                config.workflow.payment_order == PaymentOrder::Relaxed,
                "file payment order should apply",
            )
        })();

        clear_vars(&["TEST_CLAIMDESK_UPLOADS"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CLAIMDESK_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("CLAIMDESK_WORKFLOW_MONTHLY_HOURS_CAP", "200");
        env::set_var("CLAIMDESK_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("claimdesk.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[workflow]
monthly_hours_cap = 250
max_hours_per_claim = 40

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.workflow.monthly_hours_cap == 200, "env cap should win over file")?;
            ensure(config.workflow.max_hours_per_claim == 40, "file value should survive")?;
            ensure(matches!(config.logging.format, LogFormat::Json), "env alias sets format")
        })();

        clear_vars(&[
            "CLAIMDESK_DATABASE_URL",
            "CLAIMDESK_WORKFLOW_MONTHLY_HOURS_CAP",
            "CLAIMDESK_LOG_FORMAT",
        ]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CLAIMDESK_WORKFLOW_MONTHLY_HOURS_CAP", "0");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("monthly_hours_cap")
            );
            ensure(has_message, "validation failure should mention monthly_hours_cap")
        })();

        clear_vars(&["CLAIMDESK_WORKFLOW_MONTHLY_HOURS_CAP"]);
        result
    }

    #[test]
    fn unknown_payment_order_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CLAIMDESK_WORKFLOW_PAYMENT_ORDER", "eventually");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected invalid override".to_string()),
                Err(error) => error,
            };
            let reported_key = matches!(
                error,
                ConfigError::InvalidEnvOverride { ref key, .. }
                    if key == "CLAIMDESK_WORKFLOW_PAYMENT_ORDER"
            );
            ensure(reported_key, "invalid payment order should be reported against its env key")
        })();

        clear_vars(&["CLAIMDESK_WORKFLOW_PAYMENT_ORDER"]);
        result
    }
}
