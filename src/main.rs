#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

use clinic_agenda::cli::Cli;
use clinic_agenda::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::load();
    let telemetry_guard = telemetry::init_telemetry(&cli.config.telemetry)?;

    let result = cli.run().await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "Command failed");
    }

    telemetry_guard.shutdown();
    result
}
