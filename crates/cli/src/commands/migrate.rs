use crate::commands::{build_runtime, open_database, CommandResult, GlobalOptions};

const COMMAND: &str = "migrate";

pub fn run(options: &GlobalOptions) -> CommandResult {
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
        pool.close().await;
        Ok::<(), crate::commands::Failure>(())
    });

    match result {
        Ok(()) => CommandResult::success(COMMAND, "applied pending migrations"),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure(COMMAND, error_class, message, exit_code)
        }
    }
}
