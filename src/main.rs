use empenhos::commands::Cli;
use empenhos::libs::{config::Config, logger};
use std::process::ExitCode;

fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let config = match Config::read() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let _guard = match logger::init(&config.log) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match Cli::menu(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
