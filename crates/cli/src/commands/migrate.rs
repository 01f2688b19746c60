use crate::commands::CommandResult;
use swapdesk_core::config::{AppConfig, LoadOptions, SessionBackend};
use swapdesk_db::{connect_with_config, migrations};

pub fn run(options: LoadOptions) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        pool.close().await;
        Ok::<(), (&'static str, String, u8)>(())
    });

    match result {
        Ok(()) if config.session.backend == SessionBackend::Memory => CommandResult::success(
            "migrate",
            format!(
                "applied pending migrations to {}; note session.backend is memory, so the server will not use it",
                config.database.url
            ),
        ),
        Ok(()) => CommandResult::success(
            "migrate",
            format!("applied pending migrations to {}", config.database.url),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}
