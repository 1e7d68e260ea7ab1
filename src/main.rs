use std::process::ExitCode;

use bacstop::{cli, telemetry};

#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    cli::run().await
}
