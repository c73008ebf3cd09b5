use clap::{Args, Subcommand, ValueEnum};
use rust_decimal::Decimal;

use claimdesk_core::domain::profile::{LecturerId, UserId};
use claimdesk_core::service::{NewProfile, ProfileKind, RegisteredProfile};

use crate::commands::{with_service, workflow_failure, CommandResult, GlobalOptions};

const COMMAND: &str = "profile";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Lecturer,
    Coordinator,
    Manager,
}

impl From<KindArg> for ProfileKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Lecturer => Self::Lecturer,
            KindArg::Coordinator => Self::Coordinator,
            KindArg::Manager => Self::Manager,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: ProfileCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ProfileCommand {
    #[command(about = "Link a user to a lecturer, coordinator, or manager profile")]
    Register {
        #[arg(value_enum)]
        kind: KindArg,
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        department: String,
        #[arg(long, help = "Required for lecturers")]
        hourly_rate: Option<Decimal>,
    },
    #[command(about = "Change a lecturer's hourly rate; existing claims keep their rate")]
    Rate { lecturer_id: String, hourly_rate: Decimal },
    #[command(about = "Allow a profile to act again")]
    Activate {
        #[arg(value_enum)]
        kind: KindArg,
        user_id: String,
    },
    #[command(about = "Stop a profile from submitting or reviewing")]
    Deactivate {
        #[arg(value_enum)]
        kind: KindArg,
        user_id: String,
    },
}

pub fn run(options: &GlobalOptions, command: ProfileCommand) -> CommandResult {
    match command {
        ProfileCommand::Register {
            kind,
            user_id,
            first_name,
            last_name,
            email,
            department,
            hourly_rate,
        } => {
            let new = NewProfile {
                kind: kind.into(),
                user_id,
                first_name,
                last_name,
                email,
                department,
                hourly_rate,
            };
            let outcome = with_service(options, |service, ctx| async move {
                service.register_profile(&ctx, new).await.map_err(workflow_failure)
            });
            CommandResult::from_outcome(COMMAND, outcome, |profile| {
                format!("registered {} profile {}", profile.kind().as_str(), profile.id())
            })
        }
        ProfileCommand::Rate { lecturer_id, hourly_rate } => {
            let outcome = with_service(options, |service, ctx| async move {
                let lecturer_id = LecturerId(lecturer_id);
                service
                    .set_lecturer_rate(&ctx, &lecturer_id, hourly_rate)
                    .await
                    .map_err(workflow_failure)
            });
            CommandResult::from_outcome(COMMAND, outcome, |lecturer| {
                format!(
                    "lecturer {} now claims at {} per hour",
                    lecturer.id.0, lecturer.hourly_rate
                )
            })
        }
        ProfileCommand::Activate { kind, user_id } => set_active(options, kind, user_id, true),
        ProfileCommand::Deactivate { kind, user_id } => set_active(options, kind, user_id, false),
    }
}

fn set_active(
    options: &GlobalOptions,
    kind: KindArg,
    user_id: String,
    active: bool,
) -> CommandResult {
    let outcome = with_service(options, |service, ctx| async move {
        service
            .set_profile_active(&ctx, kind.into(), &UserId(user_id), active)
            .await
            .map_err(workflow_failure)
    });

    CommandResult::from_outcome(COMMAND, outcome, |profile: &RegisteredProfile| {
        let state = if profile.active() { "active" } else { "inactive" };
        format!("{} profile {} is now {state}", profile.kind().as_str(), profile.id())
    })
}
