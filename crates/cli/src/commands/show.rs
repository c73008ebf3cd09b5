use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use claimdesk_core::domain::claim::ClaimId;
use claimdesk_core::domain::document::{Document, DocumentId};
use claimdesk_core::errors::WorkflowError;

use crate::commands::{
    invalid_argument, with_service, workflow_failure, CommandResult, GlobalOptions, EXIT_IO,
};

const COMMAND: &str = "show";

#[derive(Debug, Clone, Args)]
pub struct ShowArgs {
    pub claim_id: String,
    #[arg(long, value_name = "DOCUMENT_ID", help = "Download one of the claim's documents")]
    pub document: Option<String>,
    #[arg(long, value_name = "PATH", help = "Where to write the downloaded document")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct SavedDocument {
    document: Document,
    path: String,
}

pub fn run(options: &GlobalOptions, args: ShowArgs) -> CommandResult {
    match args.document.clone() {
        Some(document_id) => download(options, args, DocumentId(document_id)),
        None => show(options, ClaimId(args.claim_id)),
    }
}

fn show(options: &GlobalOptions, claim_id: ClaimId) -> CommandResult {
    let outcome = with_service(options, |service, ctx| async move {
        service.get_claim(&ctx, &claim_id).await.map_err(workflow_failure)
    });

    CommandResult::from_outcome(COMMAND, outcome, |details| {
        format!(
            "claim {}: {} hours on {}, {} ({}), payment {}, {} document(s)",
            details.claim.id,
            details.claim.hours_worked,
            details.claim.claim_date,
            details.total_amount.round_dp(2),
            details.claim.status.as_str(),
            details.claim.payment_status.as_str(),
            details.documents.len()
        )
    })
}

fn download(options: &GlobalOptions, args: ShowArgs, document_id: DocumentId) -> CommandResult {
    let Some(output) = args.output else {
        let (error_class, message, exit_code) =
            invalid_argument("--output is required with --document");
        return CommandResult::failure(COMMAND, error_class, message, exit_code);
    };
    let claim_id = ClaimId(args.claim_id);

    let outcome = with_service(options, |service, ctx| async move {
        let download =
            service.download_document(&ctx, &document_id).await.map_err(workflow_failure)?;
        if download.document.claim_id != claim_id {
            return Err(workflow_failure(WorkflowError::not_found("document", document_id.0)));
        }

        tokio::fs::write(&output, &download.bytes).await.map_err(|error| {
            ("io", format!("could not write `{}`: {error}", output.display()), EXIT_IO)
        })?;
        Ok(SavedDocument { document: download.document, path: output.display().to_string() })
    });

    CommandResult::from_outcome(COMMAND, outcome, |saved| {
        format!("saved {} to {}", saved.document.file_name, saved.path)
    })
}
