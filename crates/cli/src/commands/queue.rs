use clap::{Args, ValueEnum};
use serde::Serialize;

use claimdesk_core::domain::claim::Claim;
use claimdesk_core::service::PaymentQueue;

use crate::commands::{with_service, workflow_failure, CommandResult, GlobalOptions};

const COMMAND: &str = "queue";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QueueKind {
    /// The caller's own claims, newest first.
    Mine,
    /// Claims waiting on a coordinator, oldest first.
    Coordinator,
    /// Coordinator-approved claims waiting on a manager.
    Manager,
    /// Fully approved claims awaiting payment, plus the recently paid.
    Payment,
}

#[derive(Debug, Clone, Args)]
pub struct QueueArgs {
    #[arg(value_enum)]
    pub queue: QueueKind,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum QueueListing {
    Claims { claims: Vec<Claim> },
    Payment(PaymentQueue),
}

impl QueueListing {
    fn summary(&self) -> String {
        match self {
            Self::Claims { claims } => format!("{} claim(s)", claims.len()),
            Self::Payment(queue) => format!(
                "{} claim(s) awaiting payment, {} recently paid",
                queue.awaiting_payment.len(),
                queue.recently_paid.len()
            ),
        }
    }
}

pub fn run(options: &GlobalOptions, args: QueueArgs) -> CommandResult {
    let outcome = with_service(options, |service, ctx| async move {
        let listing = match args.queue {
            QueueKind::Mine => service.my_claims(&ctx).await.map(wrap),
            QueueKind::Coordinator => service.coordinator_queue(&ctx).await.map(wrap),
            QueueKind::Manager => service.manager_queue(&ctx).await.map(wrap),
            QueueKind::Payment => service.payment_queue(&ctx).await.map(QueueListing::Payment),
        };
        listing.map_err(workflow_failure)
    });

    CommandResult::from_outcome(COMMAND, outcome, QueueListing::summary)
}

fn wrap(claims: Vec<Claim>) -> QueueListing {
    QueueListing::Claims { claims }
}
