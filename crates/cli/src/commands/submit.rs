use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;

use claimdesk_core::attachments::Upload;
use claimdesk_core::service::ClaimSubmission;

use crate::commands::{
    with_service, workflow_failure, CommandResult, Failure, GlobalOptions, EXIT_IO,
};

const COMMAND: &str = "submit";

#[derive(Debug, Clone, Args)]
pub struct SubmitArgs {
    #[arg(long, value_name = "YYYY-MM-DD", help = "Date the teaching took place")]
    pub date: NaiveDate,
    #[arg(long, help = "Hours worked, e.g. 7.5")]
    pub hours: Decimal,
    #[arg(long)]
    pub description: String,
    #[arg(long, help = "Defaults to the department on the lecturer profile")]
    pub department: Option<String>,
    #[arg(long = "attach", value_name = "PATH", help = "Supporting document; repeatable")]
    pub attachments: Vec<PathBuf>,
}

pub fn run(options: &GlobalOptions, args: SubmitArgs) -> CommandResult {
    let outcome = with_service(options, |service, ctx| async move {
        let uploads = read_uploads(&args.attachments).await?;
        let submission = ClaimSubmission {
            claim_date: args.date,
            hours_worked: args.hours,
            description: args.description,
            department: args.department,
            uploads,
        };
        service.submit_claim(&ctx, submission).await.map_err(workflow_failure)
    });

    CommandResult::from_outcome(COMMAND, outcome, |receipt| {
        let mut message = format!(
            "submitted claim {} for {} hours ({} total); {} hours left this month",
            receipt.claim.id,
            receipt.claim.hours_worked,
            receipt.total_amount.round_dp(2),
            receipt.hours_cap.remaining_after,
        );
        if !receipt.attachments.skipped.is_empty() {
            message.push_str(&format!(
                "; {} attachment(s) skipped",
                receipt.attachments.skipped.len()
            ));
        }
        message
    })
}

async fn read_uploads(paths: &[PathBuf]) -> Result<Vec<Upload>, Failure> {
    let mut uploads = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path).await.map_err(|error| {
            ("io", format!("could not read `{}`: {error}", path.display()), EXIT_IO)
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        uploads.push(Upload::new(file_name, content_type_for(path), bytes));
    }
    Ok(uploads)
}

fn content_type_for(path: &Path) -> &'static str {
    let extension =
        path.extension().map(|ext| ext.to_string_lossy().to_ascii_lowercase()).unwrap_or_default();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "txt" => "text/plain",
        "csv" => "text/csv",
        _ => "application/octet-stream",
    }
}
