pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::{
    pay::PayArgs, profile::ProfileArgs, queue::QueueArgs, report::ReportArgs,
    review::ReviewArgs, show::ShowArgs, submit::SubmitArgs, CommandResult, GlobalOptions,
};

#[derive(Debug, Parser)]
#[command(
    name = "claimdesk",
    about = "Claimdesk lecturer claim CLI",
    long_about = "Submit, review, and pay lecturer claims, and operate the claim database.",
    after_help = "Examples:\n  claimdesk migrate\n  claimdesk --user lecturer-1 --role lecturer \
                  submit --date 2026-03-02 --hours 12 --description \"Lectures\"\n  \
                  claimdesk --user coordinator-1 --role coordinator queue coordinator"
)]
pub struct Cli {
    #[arg(long, global = true, value_name = "PATH", help = "Config file to load")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "User id of the caller")]
    user: Option<String>,
    #[arg(long, global = true, help = "Role the caller acts in")]
    role: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo lecturer, coordinator, and manager profiles")]
    Seed {
        #[arg(long, help = "Remove the demo profiles and their claims instead")]
        clean: bool,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Submit a claim for hours worked")]
    Submit(SubmitArgs),
    #[command(about = "Approve, reject, or return a claim at the caller's review tier")]
    Review(ReviewArgs),
    #[command(about = "Advance a fully approved claim's payment status")]
    Pay(PayArgs),
    #[command(about = "Show a claim, or download one of its documents")]
    Show(ShowArgs),
    #[command(about = "List a work queue")]
    Queue(QueueArgs),
    #[command(about = "Render a payroll, financial, review, or invoice report")]
    Report(ReportArgs),
    #[command(about = "Administer lecturer, coordinator, and manager profiles")]
    Profile(ProfileArgs),
}

impl Cli {
    pub fn options(&self) -> GlobalOptions {
        GlobalOptions {
            config_path: self.config.clone(),
            user: self.user.clone(),
            role: self.role.clone(),
        }
    }

    pub fn execute(self) -> CommandResult {
        let options = self.options();

        match self.command {
            Command::Migrate => commands::migrate::run(&options),
            Command::Seed { clean } => commands::seed::run(&options, clean),
            Command::Config => commands::config::run(&options),
            Command::Submit(args) => commands::submit::run(&options, args),
            Command::Review(args) => commands::review::run(&options, args),
            Command::Pay(args) => commands::pay::run(&options, args),
            Command::Show(args) => commands::show::run(&options, args),
            Command::Queue(args) => commands::queue::run(&options, args),
            Command::Report(args) => commands::report::run(&options, args),
            Command::Profile(args) => commands::profile::run(&options, args.command),
        }
    }
}

pub fn run(cli: Cli) -> ExitCode {
    let result = cli.execute();
    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
