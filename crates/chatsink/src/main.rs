mod factory;
mod fleet;
mod shutdown;
mod worker;

use anyhow::{Context, Result};

use chatsink_core::{config::Settings, logging};

use crate::fleet::FleetOrchestrator;

enum Mode {
    /// Top-level orchestrator: spawns one process per worker bucket.
    Fleet,
    /// Child process running one bucket of accounts.
    Worker(usize),
}

fn parse_mode() -> Result<Mode> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        None => Ok(Mode::Fleet),
        Some("--worker") => {
            let index = args
                .next()
                .context("--worker requires an index")?
                .parse::<usize>()
                .context("invalid worker index")?;
            Ok(Mode::Worker(index))
        }
        Some(other) => anyhow::bail!("unknown argument: {other}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init("chatsink")?;

    let settings = Settings::load().context("failed to load configuration")?;

    match parse_mode()? {
        Mode::Fleet => FleetOrchestrator::new(&settings).run().await,
        Mode::Worker(index) => worker::run(&settings, index).await,
    }
}
