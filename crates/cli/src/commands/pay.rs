use clap::{Args, ValueEnum};

use claimdesk_core::domain::claim::ClaimId;
use claimdesk_core::lifecycle::PaymentEvent;

use crate::commands::{with_service, workflow_failure, CommandResult, GlobalOptions};

const COMMAND: &str = "pay";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PaymentStage {
    Processing,
    Paid,
}

#[derive(Debug, Clone, Args)]
pub struct PayArgs {
    pub claim_id: String,
    #[arg(long, value_enum, default_value_t = PaymentStage::Paid)]
    pub stage: PaymentStage,
}

pub fn run(options: &GlobalOptions, args: PayArgs) -> CommandResult {
    let event = match args.stage {
        PaymentStage::Processing => PaymentEvent::ProcessingStarted,
        PaymentStage::Paid => PaymentEvent::PaymentCompleted,
    };

    let outcome = with_service(options, |service, ctx| async move {
        let claim_id = ClaimId(args.claim_id);
        service.update_payment(&ctx, &claim_id, event).await.map_err(workflow_failure)
    });

    CommandResult::from_outcome(COMMAND, outcome, |update| {
        format!(
            "claim {} payment moved from {} to {}",
            update.claim.id,
            update.payment.from.as_str(),
            update.payment.to.as_str()
        )
    })
}
