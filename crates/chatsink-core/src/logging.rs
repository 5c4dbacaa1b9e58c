use crate::Result;

/// Initialize logging/tracing for one process.
///
/// Called once by the orchestrator and once by each worker process (workers
/// are separate OS processes with their own subscriber). `RUST_LOG`
/// overrides the default filter.
pub fn init(service_name: &str) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "info,chatsink=info,chatsink_core=info,{service_name}=info"
        ))
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .init();

    Ok(())
}
