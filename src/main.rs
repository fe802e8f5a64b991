//! This file defines the wellbore-provider binary entry point.

use wellbore_provider::app;
use wellbore_provider::cli;
use wellbore_provider::error;
use wellbore_provider::tracing;

/// Application entry point
#[tokio::main]
async fn main() {
    let args = cli::parse();
    tracing::init_tracing();
    if let Err(err) = app::run(&args).await {
        error::log_error(&err);
        std::process::exit(1);
    }
}
