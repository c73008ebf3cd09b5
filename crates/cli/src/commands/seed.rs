use serde::Serialize;

use claimdesk_db::{DemoSeedDataset, SeedProfileInfo};

use crate::commands::{
    build_runtime, open_database, CommandResult, Failure, GlobalOptions, EXIT_DATABASE,
    EXIT_SEED_VERIFICATION,
};

const COMMAND: &str = "seed";

#[derive(Debug, Serialize)]
struct SeedOutput {
    profiles: Vec<SeedProfileInfo>,
}

/// Loads the demo profiles, or removes them again when `clean` is set.
pub fn run(options: &GlobalOptions, clean: bool) -> CommandResult {
    let config = match options.load_config() {
        Ok(config) => config,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure(COMMAND, error_class, message, exit_code);
        }
    };

    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure(COMMAND, error_class, message, exit_code);
        }
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;

        if clean {
            let cleaned = DemoSeedDataset::clean(&pool)
                .await
                .map_err(|error| ("seed_execution", error.to_string(), EXIT_DATABASE));
            pool.close().await;
            return cleaned.map(|()| None);
        }

        let seed_result = DemoSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), EXIT_DATABASE))?;

        let verification = DemoSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), EXIT_SEED_VERIFICATION))?;

        let run_result: Result<Option<SeedOutput>, Failure> = if !verification.all_present {
            let failed_checks = verification
                .checks
                .iter()
                .filter_map(|(check, passed)| (!passed).then_some(*check))
                .collect::<Vec<_>>();
            Err((
                "seed_verification",
                format!("Seed verification failed for profiles: {}", failed_checks.join(", ")),
                EXIT_SEED_VERIFICATION,
            ))
        } else {
            Ok(Some(SeedOutput { profiles: seed_result.profiles_seeded }))
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(None) => CommandResult::success(COMMAND, "removed demo profiles and their claims"),
        Ok(Some(output)) => {
            let lines: Vec<String> = output
                .profiles
                .iter()
                .map(|p| format!("  - {}: {} ({})", p.kind, p.user_id, p.description))
                .collect();
            let message = format!("Seeded demo profiles:\n{}", lines.join("\n"));
            CommandResult::from_outcome(COMMAND, Ok(output), |_| message)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure(COMMAND, error_class, message, exit_code)
        }
    }
}
