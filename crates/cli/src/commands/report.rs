use std::path::PathBuf;

use clap::{Args, ValueEnum};
use serde::Serialize;

use claimdesk_core::domain::claim::ClaimId;
use claimdesk_core::service::{ReportOutput, ReportRequest};

use crate::commands::{
    invalid_argument, with_service, workflow_failure, CommandResult, GlobalOptions, EXIT_IO,
};

const COMMAND: &str = "report";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportChoice {
    Payroll,
    Financial,
    Mine,
    Coordinator,
    Manager,
    Invoice,
}

#[derive(Debug, Clone, Args)]
pub struct ReportArgs {
    #[arg(value_enum)]
    pub kind: ReportChoice,
    #[arg(long, value_name = "CLAIM_ID", help = "Claim to invoice; required for `invoice`")]
    pub claim: Option<String>,
    #[arg(long, value_name = "PATH", help = "Write the report here instead of inlining it")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct RenderedReport {
    #[serde(flatten)]
    report: ReportOutput,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

pub fn run(options: &GlobalOptions, args: ReportArgs) -> CommandResult {
    let request = match report_request(args.kind, args.claim) {
        Ok(request) => request,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure(COMMAND, error_class, message, exit_code);
        }
    };
    let output = args.output;

    let outcome = with_service(options, |service, ctx| async move {
        let report = service.generate_report(&ctx, request).await.map_err(workflow_failure)?;

        match output {
            Some(path) => {
                tokio::fs::write(&path, &report.bytes).await.map_err(|error| {
                    ("io", format!("could not write `{}`: {error}", path.display()), EXIT_IO)
                })?;
                let path = Some(path.display().to_string());
                Ok(RenderedReport { report, path, content: None })
            }
            None => {
                let content = Some(String::from_utf8_lossy(&report.bytes).into_owned());
                Ok(RenderedReport { report, path: None, content })
            }
        }
    });

    CommandResult::from_outcome(COMMAND, outcome, |rendered| {
        format!(
            "generated {} covering {} claim(s)",
            rendered.report.file_name, rendered.report.claim_count
        )
    })
}

fn report_request(
    kind: ReportChoice,
    claim: Option<String>,
) -> Result<ReportRequest, crate::commands::Failure> {
    Ok(match kind {
        ReportChoice::Payroll => ReportRequest::Payroll,
        ReportChoice::Financial => ReportRequest::Financial,
        ReportChoice::Mine => ReportRequest::MyClaims,
        ReportChoice::Coordinator => ReportRequest::CoordinatorReview,
        ReportChoice::Manager => ReportRequest::ManagerReview,
        ReportChoice::Invoice => {
            let claim_id =
                claim.ok_or_else(|| invalid_argument("--claim is required for invoice"))?;
            ReportRequest::Invoice(ClaimId(claim_id))
        }
    })
}
