use std::process::ExitCode;

use custdb::CustdbConfig;
use tracing::{error, Level};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match CustdbConfig::load() {
        Ok(config) => {
            tracing_subscriber::fmt()
                .with_max_level(Level::from(&config.logger.level))
                .init();
            if let Err(error) = custdb_web::serve(&config).await {
                error!("Failed to start server: {}", error);
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(error) => {
            tracing_subscriber::fmt::init();
            error!("Failed to load configuration: {}", error);
            ExitCode::FAILURE
        }
    }
}
