use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use toml::Value;

use claimdesk_core::config::AppConfig;

use crate::commands::{CommandResult, GlobalOptions};

const COMMAND: &str = "config";

/// Reports every effective setting with the layer it came from.
pub fn run(options: &GlobalOptions) -> CommandResult {
    let config = match options.load_config() {
        Ok(config) => config,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure(COMMAND, error_class, message, exit_code);
        }
    };

    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, value) in effective_values(&config) {
        let source = field_source(
            key_path,
            &env_key_for(key_path),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(key_path, &value, source));
    }

    CommandResult::success(COMMAND, lines.join("\n"))
}

fn effective_values(config: &AppConfig) -> Vec<(&'static str, String)> {
    vec![
        ("database.url", config.database.url.clone()),
        ("database.max_connections", config.database.max_connections.to_string()),
        ("database.timeout_secs", config.database.timeout_secs.to_string()),
        ("workflow.monthly_hours_cap", config.workflow.monthly_hours_cap.to_string()),
        ("workflow.max_hours_per_claim", config.workflow.max_hours_per_claim.to_string()),
        ("workflow.max_hourly_rate", config.workflow.max_hourly_rate.to_string()),
        ("workflow.max_description_len", config.workflow.max_description_len.to_string()),
        ("workflow.payment_order", format!("{:?}", config.workflow.payment_order)),
        ("storage.upload_dir", config.storage.upload_dir.display().to_string()),
        ("storage.max_document_bytes", config.storage.max_document_bytes.to_string()),
        ("logging.level", config.logging.level.clone()),
        ("logging.format", format!("{:?}", config.logging.format)),
    ]
}

/// `workflow.payment_order` is read from `CLAIMDESK_WORKFLOW_PAYMENT_ORDER`.
fn env_key_for(key_path: &str) -> String {
    format!("CLAIMDESK_{}", key_path.replace('.', "_").to_ascii_uppercase())
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    let root = PathBuf::from("claimdesk.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/claimdesk.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
