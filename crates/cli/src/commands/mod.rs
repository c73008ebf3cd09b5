pub mod config;
pub mod migrate;
pub mod pay;
pub mod profile;
pub mod queue;
pub mod report;
pub mod review;
pub mod seed;
pub mod show;
pub mod submit;

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use claimdesk_core::audit::TracingAuditSink;
use claimdesk_core::auth::{RequestContext, Role, Subject};
use claimdesk_core::config::{AppConfig, LoadOptions};
use claimdesk_core::errors::{ErrorKind, WorkflowError};
use claimdesk_core::reports::TemplateReportGenerator;
use claimdesk_core::service::ClaimService;
use claimdesk_core::storage::LocalDirectorySink;
use claimdesk_db::{connect_with_config, migrations, sql_stores, DbPool};

/// Error class, message, and process exit code of a failed command.
pub type Failure = (&'static str, String, u8);

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Wraps a command's outcome, attaching the serialized value as `data` on success.
    pub fn from_outcome<T: Serialize>(
        command: &str,
        outcome: Result<T, Failure>,
        message: impl FnOnce(&T) -> String,
    ) -> Self {
        match outcome {
            Ok(value) => {
                let message = message(&value);
                match serde_json::to_value(&value) {
                    Ok(data) => Self::success_with_data(command, message, Some(data)),
                    Err(error) => Self::failure(command, "serialization", error.to_string(), 1),
                }
            }
            Err((error_class, message, exit_code)) => {
                Self::failure(command, error_class, message, exit_code)
            }
        }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Options shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config_path: Option<PathBuf>,
    pub user: Option<String>,
    pub role: Option<String>,
}

impl GlobalOptions {
    pub fn load_config(&self) -> Result<AppConfig, Failure> {
        let options = LoadOptions {
            config_path: self.config_path.clone(),
            require_file: self.config_path.is_some(),
            ..LoadOptions::default()
        };
        AppConfig::load(options).map_err(|error| {
            ("config_validation", format!("configuration issue: {error}"), EXIT_CONFIG)
        })
    }

    /// The caller named by `--user` and `--role`.
    pub fn request_context(&self) -> Result<RequestContext, Failure> {
        let user = self
            .user
            .as_deref()
            .map(str::trim)
            .filter(|user| !user.is_empty())
            .ok_or_else(|| invalid_argument("--user is required for this command"))?;
        let raw_role =
            self.role.as_deref().ok_or_else(|| invalid_argument("--role is required"))?;
        let role = Role::parse(raw_role).ok_or_else(|| {
            invalid_argument(format!(
                "unknown role `{raw_role}` (expected lecturer|coordinator|manager|hr|admin)"
            ))
        })?;

        Ok(RequestContext::new(Subject::new(user, [role])))
    }
}

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_RUNTIME: u8 = 3;
pub const EXIT_DATABASE: u8 = 4;
pub const EXIT_MIGRATION: u8 = 5;
pub const EXIT_SEED_VERIFICATION: u8 = 6;
pub const EXIT_INVALID_ARGUMENT: u8 = 7;
pub const EXIT_IO: u8 = 8;

pub fn exit_code_for(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::ValidationFailed => 10,
        ErrorKind::Unauthorized => 11,
        ErrorKind::Forbidden => 12,
        ErrorKind::NotFound => 13,
        ErrorKind::ProfileNotFound => 14,
        ErrorKind::InvalidTransition => 15,
        ErrorKind::Conflict => 16,
        ErrorKind::DependencyFailure => 17,
    }
}

pub fn workflow_failure(error: WorkflowError) -> Failure {
    let kind = error.kind();
    (kind.as_str(), error.to_string(), exit_code_for(kind))
}

pub fn invalid_argument(message: impl Into<String>) -> Failure {
    ("invalid_argument", message.into(), EXIT_INVALID_ARGUMENT)
}

pub fn build_runtime() -> Result<tokio::runtime::Runtime, Failure> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        ("runtime_init", format!("failed to initialize async runtime: {error}"), EXIT_RUNTIME)
    })
}

/// Connects to the configured database and applies any pending migrations.
pub async fn open_database(config: &AppConfig) -> Result<DbPool, Failure> {
    let pool = connect_with_config(&config.database)
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), EXIT_DATABASE))?;
    migrations::run_pending(&pool)
        .await
        .map_err(|error| ("migration", error.to_string(), EXIT_MIGRATION))?;
    Ok(pool)
}

/// Claim service over the SQLite stores, local upload directory, and tracing audit sink.
pub fn claim_service(config: &AppConfig, pool: DbPool) -> Result<ClaimService, Failure> {
    let reports = TemplateReportGenerator::new()
        .map_err(|error| ("report_templates", error.to_string(), EXIT_CONFIG))?;

    Ok(ClaimService::new(
        sql_stores(pool),
        Arc::new(LocalDirectorySink::new(config.storage.upload_dir.clone())),
        Arc::new(reports),
        Arc::new(TracingAuditSink),
    )
    .configured(config))
}

/// Loads config, builds the runtime, and runs `work` against a ready claim service.
pub fn with_service<T, F, Fut>(options: &GlobalOptions, work: F) -> Result<T, Failure>
where
    F: FnOnce(ClaimService, RequestContext) -> Fut,
    Fut: std::future::Future<Output = Result<T, Failure>>,
{
    let config = options.load_config()?;
    let ctx = options.request_context()?;
    let runtime = build_runtime()?;

    runtime.block_on(async {
        let pool = open_database(&config).await?;
        let service = claim_service(&config, pool.clone())?;
        let outcome = work(service, ctx).await;
        if let Err((error_class, message, _)) = &outcome {
            tracing::warn!(
                event_name = "cli.command.failed",
                error_class = *error_class,
                %message,
                "command failed"
            );
        }
        pool.close().await;
        outcome
    })
}
