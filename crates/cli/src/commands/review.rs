use clap::{Args, ValueEnum};

use claimdesk_core::auth::Role;
use claimdesk_core::domain::claim::ClaimId;
use claimdesk_core::lifecycle::{CoordinatorVerdict, ManagerVerdict};

use crate::commands::{
    invalid_argument, with_service, workflow_failure, CommandResult, GlobalOptions,
};

const COMMAND: &str = "review";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Decision {
    Approve,
    Reject,
    /// Send back to the coordinator. Managers only.
    Return,
}

#[derive(Debug, Clone, Args)]
pub struct ReviewArgs {
    pub claim_id: String,
    #[arg(long, value_enum)]
    pub decision: Decision,
    #[arg(long)]
    pub notes: Option<String>,
}

/// Reviews at the caller's tier: managers give the second-tier verdict, everyone else the first.
pub fn run(options: &GlobalOptions, args: ReviewArgs) -> CommandResult {
    let outcome = with_service(options, |service, ctx| async move {
        let claim_id = ClaimId(args.claim_id);
        let reviewed = if ctx.subject.has_role(Role::Manager) {
            let verdict = match args.decision {
                Decision::Approve => ManagerVerdict::Approve,
                Decision::Return => ManagerVerdict::Return,
                Decision::Reject => ManagerVerdict::Reject,
            };
            service.manager_review(&ctx, &claim_id, verdict, args.notes).await
        } else {
            let verdict = match args.decision {
                Decision::Approve => CoordinatorVerdict::Approve,
                Decision::Reject => CoordinatorVerdict::Reject,
                Decision::Return => {
                    return Err(invalid_argument(
                        "only a manager can return a claim to the coordinator",
                    ));
                }
            };
            service.coordinator_review(&ctx, &claim_id, verdict, args.notes).await
        };
        reviewed.map_err(workflow_failure)
    });

    CommandResult::from_outcome(COMMAND, outcome, |reviewed| {
        format!(
            "claim {} moved from {} to {}",
            reviewed.claim.id,
            reviewed.transition.from.as_str(),
            reviewed.transition.to.as_str()
        )
    })
}
